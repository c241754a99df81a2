//! Choosing the texel grid that a point cloud is written into.

use crate::{Error, Result};

/// How the planner trades exactness against search cost.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FitPolicy {
    /// Shrink the width until it divides the point count, so that
    /// `width * height == point_count` unless the height has to be clamped.
    ExactFit,
    /// Keep the widest row and truncate the height. Points past
    /// `width * height - 1` are dropped.
    Truncate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Plan {
    pub width: u32,
    pub height: u32,
}

impl Plan {
    pub fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Fails unless both edges lie in `1..=max_edge`.
    pub fn check(&self, max_edge: u32) -> Result<()> {
        let valid = 1..=max_edge;
        if valid.contains(&self.width) && valid.contains(&self.height) {
            Ok(())
        } else {
            Err(Error::InvalidArgument(format!(
                "grid {}x{} is outside 1..={}",
                self.width, self.height, max_edge
            )))
        }
    }

    /// Number of points that do not fit into the grid.
    pub fn dropped(&self, point_count: usize) -> usize {
        point_count.saturating_sub(self.texel_count())
    }
}

pub fn plan(point_count: usize, max_edge: u32, policy: FitPolicy) -> Result<Plan> {
    if point_count < 1 {
        return Err(Error::InvalidArgument(format!(
            "point count must be positive, got {}",
            point_count
        )));
    }
    if max_edge < 1 {
        return Err(Error::InvalidArgument(format!(
            "max edge must be positive, got {}",
            max_edge
        )));
    }

    let (width, height) = match policy {
        FitPolicy::ExactFit => {
            // no width above the point count can divide it
            let mut width = point_count.min(max_edge as usize);
            while point_count % width != 0 {
                width -= 1;
            }
            if width == 1 && point_count > 1 {
                log::warn!(
                    "No divisor of {} fits under {}, falling back to a single column",
                    point_count,
                    max_edge
                );
            }
            (width, point_count / width)
        }
        FitPolicy::Truncate => {
            let width = point_count.min(max_edge as usize);
            (width, point_count / width)
        }
    };

    let height = if height > max_edge as usize {
        max_edge as usize
    } else {
        height
    };

    let plan = Plan {
        width: width as u32,
        height: height as u32,
    };
    let dropped = plan.dropped(point_count);
    if dropped != 0 {
        log::warn!(
            "Grid {}x{} drops {} of {} points",
            plan.width,
            plan.height,
            dropped,
            point_count
        );
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_fit_searches_down_to_a_divisor() {
        let p = plan(6, 4, FitPolicy::ExactFit).unwrap();
        assert_eq!(p, Plan { width: 3, height: 2 });
        // texel (2, 1) holds point 5
        assert_eq!(2 + 1 * p.width, 5);
    }

    #[test]
    fn exact_fit_boundaries() {
        assert_eq!(
            plan(16 * 16, 16, FitPolicy::ExactFit).unwrap(),
            Plan { width: 16, height: 16 }
        );
        assert_eq!(
            plan(1, 16, FitPolicy::ExactFit).unwrap(),
            Plan { width: 1, height: 1 }
        );
    }

    #[test]
    fn exact_fit_covers_every_point_when_unclamped() {
        for max_edge in 1..=8u32 {
            for count in 1..=(max_edge * max_edge) as usize {
                let p = plan(count, max_edge, FitPolicy::ExactFit).unwrap();
                assert!(p.width <= max_edge && p.height <= max_edge);
                let width = p.width as usize;
                if count / width <= max_edge as usize {
                    assert_eq!(p.texel_count(), count, "count {} edge {}", count, max_edge);
                }
            }
        }
    }

    #[test]
    fn exact_fit_prime_degenerates_and_clamps() {
        let p = plan(7, 4, FitPolicy::ExactFit).unwrap();
        assert_eq!(p, Plan { width: 1, height: 4 });
        assert_eq!(p.dropped(7), 3);
    }

    #[test]
    fn exact_fit_search_starts_at_the_point_count() {
        assert_eq!(
            plan(3, u32::MAX, FitPolicy::ExactFit).unwrap(),
            Plan { width: 3, height: 1 }
        );
    }

    #[test]
    fn check_rejects_empty_and_oversized_edges() {
        assert!(Plan { width: 4, height: 1 }.check(4).is_ok());
        for bad in [
            Plan { width: 0, height: 1 },
            Plan { width: 1, height: 0 },
            Plan { width: 5, height: 1 },
        ] {
            assert!(matches!(bad.check(4), Err(Error::InvalidArgument(_))));
        }
    }

    #[test]
    fn truncate_drops_the_remainder() {
        let p = plan(10, 4, FitPolicy::Truncate).unwrap();
        assert_eq!(p, Plan { width: 4, height: 2 });
        assert_eq!(p.dropped(10), 2);
    }

    #[test]
    fn truncate_keeps_short_clouds_in_one_row() {
        assert_eq!(
            plan(3, 4, FitPolicy::Truncate).unwrap(),
            Plan { width: 3, height: 1 }
        );
    }

    #[test]
    fn truncate_clamps_height() {
        let p = plan(100, 4, FitPolicy::Truncate).unwrap();
        assert_eq!(p, Plan { width: 4, height: 4 });
        assert_eq!(p.dropped(100), 84);
    }

    #[test]
    fn rejects_empty_inputs() {
        for policy in [FitPolicy::ExactFit, FitPolicy::Truncate] {
            assert!(matches!(
                plan(0, 4, policy),
                Err(Error::InvalidArgument(_))
            ));
            assert!(matches!(
                plan(4, 0, policy),
                Err(Error::InvalidArgument(_))
            ));
        }
    }
}
