//! A single raw frame: `point_count` packed position triples followed by
//! `point_count` packed color triples, all little-endian `f32`.

use super::{ColorBuffer, Model};
use crate::{Error, Result};

const TRIPLE_SIZE: usize = 3 * std::mem::size_of::<f32>();

fn read_triples(bytes: &[u8]) -> Vec<glam::Vec3> {
    bytes
        .chunks_exact(TRIPLE_SIZE)
        .map(|t| {
            let bits: [u32; 3] = bytemuck::pod_read_unaligned(t);
            glam::Vec3::from(bits.map(|b| f32::from_bits(u32::from_le(b))))
        })
        .collect()
}

pub fn decode(frame: &[u8], point_count: usize) -> Result<Model> {
    let half = point_count
        .checked_mul(TRIPLE_SIZE)
        .filter(|half| half.checked_mul(2).is_some())
        .ok_or_else(|| {
            Error::InvalidArgument(format!("{} points overflow the frame size", point_count))
        })?;
    if frame.len() != 2 * half {
        return Err(Error::LengthMismatch {
            what: "frame bytes",
            expected: 2 * half,
            actual: frame.len(),
        });
    }
    let (positions, colors) = frame.split_at(half);
    Ok(Model {
        positions: read_triples(positions),
        colors: ColorBuffer::Rgb(read_triples(colors)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn encode(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn splits_at_the_midpoint() {
        let frame = encode(&[
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0, // positions
            0.1, 0.2, 0.3, 0.4, 0.5, 0.6, // colors
        ]);
        let model = decode(&frame, 2).unwrap();
        assert_eq!(
            model.positions,
            vec![Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0)]
        );
        assert_eq!(
            model.colors,
            ColorBuffer::Rgb(vec![Vec3::new(0.1, 0.2, 0.3), Vec3::new(0.4, 0.5, 0.6)])
        );
    }

    #[test]
    fn huge_point_count_is_rejected() {
        for count in [usize::MAX, usize::MAX / TRIPLE_SIZE] {
            assert!(matches!(
                decode(&[], count),
                Err(Error::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn short_frame_is_rejected() {
        let frame = encode(&[0.0; 11]);
        assert!(matches!(
            decode(&frame, 2),
            Err(Error::LengthMismatch {
                expected: 48,
                actual: 44,
                ..
            })
        ));
    }
}
