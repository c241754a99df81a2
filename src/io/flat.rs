//! Flat `x, y, z` float triples paired with `r, g, b` byte triples.

use rayon::prelude::*;

use super::{ColorBuffer, Model};
use crate::{Error, Result, DEFAULT_COLOR_DIVISOR};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecodeParameters {
    /// Byte colors are divided by this value.
    pub color_divisor: f32,
    /// Negate x and y to move into the packer's coordinate convention.
    pub flip_xy: bool,
}

impl Default for DecodeParameters {
    fn default() -> Self {
        Self {
            color_divisor: DEFAULT_COLOR_DIVISOR,
            flip_xy: true,
        }
    }
}

/// Source coordinates have x and y pointing the other way.
pub fn flip_xy(position: glam::Vec3) -> glam::Vec3 {
    glam::Vec3::new(-position.x, -position.y, position.z)
}

pub fn decode(positions: &[f32], colors: &[u8], params: &DecodeParameters) -> Result<Model> {
    if positions.len() % 3 != 0 {
        return Err(Error::LengthMismatch {
            what: "position components",
            expected: positions.len() / 3 * 3,
            actual: positions.len(),
        });
    }
    if colors.len() != positions.len() {
        return Err(Error::LengthMismatch {
            what: "color components",
            expected: positions.len(),
            actual: colors.len(),
        });
    }

    let positions = positions
        .par_chunks_exact(3)
        .map(|p| {
            let position = glam::Vec3::new(p[0], p[1], p[2]);
            if params.flip_xy {
                flip_xy(position)
            } else {
                position
            }
        })
        .collect();
    let colors = colors
        .par_chunks_exact(3)
        .map(|c| glam::Vec3::new(c[0] as f32, c[1] as f32, c[2] as f32) / params.color_divisor)
        .collect();

    Ok(Model {
        positions,
        colors: ColorBuffer::Rgb(colors),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn bytes_divide_by_256() {
        let model = decode(&[0.0; 3], &[0, 128, 255], &DecodeParameters::default()).unwrap();
        assert_eq!(
            model.colors,
            ColorBuffer::Rgb(vec![Vec3::new(0.0, 0.5, 0.99609375)])
        );
    }

    #[test]
    fn divisor_is_configurable() {
        let params = DecodeParameters {
            color_divisor: 255.0,
            ..Default::default()
        };
        let model = decode(&[0.0; 3], &[255, 255, 255], &params).unwrap();
        assert_eq!(model.colors, ColorBuffer::Rgb(vec![Vec3::ONE]));
    }

    #[test]
    fn x_and_y_are_negated() {
        let model = decode(
            &[1.0, 2.0, 3.0, -4.0, 5.0, -6.0],
            &[0; 6],
            &DecodeParameters::default(),
        )
        .unwrap();
        assert_eq!(
            model.positions,
            vec![Vec3::new(-1.0, -2.0, 3.0), Vec3::new(4.0, -5.0, -6.0)]
        );

        let raw = DecodeParameters {
            flip_xy: false,
            ..Default::default()
        };
        let model = decode(&[1.0, 2.0, 3.0], &[0; 3], &raw).unwrap();
        assert_eq!(model.positions, vec![Vec3::new(1.0, 2.0, 3.0)]);
    }

    #[test]
    fn ragged_input_is_rejected() {
        let params = DecodeParameters::default();
        assert!(matches!(
            decode(&[0.0; 4], &[0; 4], &params),
            Err(Error::LengthMismatch { .. })
        ));
        assert!(matches!(
            decode(&[0.0; 6], &[0; 3], &params),
            Err(Error::LengthMismatch {
                expected: 6,
                actual: 3,
                ..
            })
        ));
    }
}
