//! Writing points into texel grids through a parallel dispatch.
//!
//! Point `i` lands on texel `(i % width, i / width)` of both grids.
//! Work-items are independent, so any partition of the grid that keeps this
//! mapping produces the same result.

pub mod cpu;
pub mod gpu;

use crate::{grid::Grid, plan, Error, FitPolicy, Plan, Result};

#[derive(Clone, Copy, Debug)]
pub enum Colors<'a> {
    Rgb(&'a [glam::Vec3]),
    Rgba(&'a [glam::Vec4]),
}

impl Colors<'_> {
    pub fn len(&self) -> usize {
        match *self {
            Self::Rgb(c) => c.len(),
            Self::Rgba(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channels(&self) -> u32 {
        match *self {
            Self::Rgb(_) => 3,
            Self::Rgba(_) => 4,
        }
    }

    /// Color of point `index`; RGB input is opaque.
    pub fn texel(&self, index: usize) -> [f32; 4] {
        match *self {
            Self::Rgb(c) => c[index].extend(1.0).into(),
            Self::Rgba(c) => c[index].into(),
        }
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        match *self {
            Self::Rgb(c) => bytemuck::cast_slice(c),
            Self::Rgba(c) => bytemuck::cast_slice(c),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct PointData<'a> {
    pub positions: &'a [glam::Vec3],
    pub colors: Colors<'a>,
}

impl PointData<'_> {
    /// Returns the point count, or the mismatch between the two streams.
    pub fn validate(&self) -> Result<usize> {
        let count = self.positions.len();
        if self.colors.len() != count {
            return Err(Error::LengthMismatch {
                what: "colors",
                expected: count,
                actual: self.colors.len(),
            });
        }
        Ok(count)
    }

    /// Position texel of point `index`. Channel A is left for the consumer.
    pub fn position_texel(&self, index: usize) -> [f32; 4] {
        self.positions[index].extend(0.0).into()
    }
}

pub struct PackedGrids {
    pub positions: Grid,
    pub colors: Grid,
}

/// A compute facility able to run the point-to-texel dispatch.
pub trait Packer {
    /// Largest grid edge the device supports.
    fn max_edge(&self) -> u32;
    /// Write every point that fits into a pair of `plan` sized grids.
    /// The call returns once all work-items have finished.
    fn pack(&mut self, points: &PointData, plan: Plan) -> Result<PackedGrids>;
}

/// Plan the grid against the packer's device limit and dispatch into it.
pub fn pack_points<P: Packer + ?Sized>(
    packer: &mut P,
    points: &PointData,
    policy: FitPolicy,
) -> Result<(Plan, PackedGrids)> {
    let count = points.validate()?;
    let plan = plan::plan(count, packer.max_edge(), policy)?;
    log::info!(
        "Packing {} points into {}x{} with {:?}",
        count,
        plan.width,
        plan.height,
        policy
    );
    let grids = packer.pack(points, plan)?;
    Ok((plan, grids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec3, Vec4};

    #[test]
    fn mismatched_streams_are_rejected() {
        let positions = [Vec3::ZERO; 3];
        let colors = [Vec4::ONE; 2];
        let points = PointData {
            positions: &positions,
            colors: Colors::Rgba(&colors),
        };
        match pack_points(&mut cpu::CpuPacker::new(4), &points, FitPolicy::ExactFit) {
            Err(Error::LengthMismatch {
                expected, actual, ..
            }) => assert_eq!((expected, actual), (3, 2)),
            other => panic!("unexpected {:?}", other.map(|(plan, _)| plan)),
        }
    }

    #[test]
    fn rgb_colors_are_opaque() {
        let colors = [Vec3::new(0.1, 0.2, 0.3)];
        let c = Colors::Rgb(&colors);
        assert_eq!(c.channels(), 3);
        assert_eq!(c.texel(0), [0.1, 0.2, 0.3, 1.0]);
        assert_eq!(c.as_bytes().len(), 12);
    }

    #[test]
    fn empty_cloud_is_an_invalid_argument() {
        let points = PointData {
            positions: &[],
            colors: Colors::Rgb(&[]),
        };
        assert!(matches!(
            pack_points(&mut cpu::CpuPacker::new(4), &points, FitPolicy::Truncate),
            Err(Error::InvalidArgument(_))
        ));
    }
}
