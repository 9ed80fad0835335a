//! Collision detection between placements.
//!
//! The layer engine proposes positions purely from fragment corners; the
//! collision test here is the authoritative guard that keeps committed
//! placements disjoint, regardless of which fragment suggested a spot.

use tracing::debug;

use crate::model::Placement;
use crate::types::BoundingBox;

/// A committed placement reduced to what collision checks need.
#[derive(Clone, Debug)]
pub struct OccupiedSpace {
    pub item: String,
    pub bounds: BoundingBox,
}

impl OccupiedSpace {
    pub fn from_placement(placement: &Placement) -> Self {
        Self {
            item: placement.product().item.clone(),
            bounds: placement.bounding_box(),
        }
    }
}

/// Checks a candidate placement against all committed placements.
///
/// Two placements collide iff their open intervals overlap on every axis;
/// coincident faces do not collide.
///
/// # Parameters
/// * `candidate` - The placement under consideration
/// * `existing` - Bounding boxes of everything already committed in the carton
///
/// # Returns
/// `true` if the candidate overlaps any committed placement
pub fn check_collision(candidate: &Placement, existing: &[OccupiedSpace]) -> bool {
    let bounds = candidate.bounding_box();

    for occupied in existing {
        if bounds.intersects(&occupied.bounds) {
            debug!(
                candidate = %candidate.product().item,
                committed = %occupied.item,
                "collision detected"
            );
            return true;
        }
    }

    false
}

/// Calculates the overlap of two intervals in one dimension.
///
/// # Returns
/// Length of the overlap, at least 0.0
#[inline]
#[allow(dead_code)]
pub fn overlap_1d(a1: f64, a2: f64, b1: f64, b2: f64) -> f64 {
    (a2.min(b2) - a1.max(b1)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Product;
    use crate::rotation::RotationType;
    use crate::types::EPSILON_GENERAL;

    fn placed(item: &str, pos: (f64, f64, f64), dims: (f64, f64, f64)) -> Placement {
        let product = Product::new(dims.0, dims.1, dims.2, 1.0, 100.0, item, "").unwrap();
        Placement::new(product, pos.0, pos.1, pos.2, RotationType::RT1)
    }

    #[test]
    fn test_collision_between_overlapping_placements() {
        let a = placed("a", (0.0, 0.0, 0.0), (10.0, 10.0, 10.0));
        let b = placed("b", (5.0, 5.0, 5.0), (10.0, 10.0, 10.0));
        let existing = vec![OccupiedSpace::from_placement(&a)];
        assert!(check_collision(&b, &existing));
    }

    #[test]
    fn test_no_collision_for_separated_placements() {
        let a = placed("a", (0.0, 0.0, 0.0), (10.0, 10.0, 10.0));
        let b = placed("b", (20.0, 0.0, 0.0), (10.0, 10.0, 10.0));
        let existing = vec![OccupiedSpace::from_placement(&a)];
        assert!(!check_collision(&b, &existing));
    }

    #[test]
    fn test_coincident_faces_do_not_collide() {
        let a = placed("a", (0.0, 0.0, 0.0), (10.0, 10.0, 10.0));
        let b = placed("b", (10.0, 0.0, 0.0), (10.0, 10.0, 10.0));
        let existing = vec![OccupiedSpace::from_placement(&a)];
        assert!(!check_collision(&b, &existing));
    }

    #[test]
    fn test_overlap_1d() {
        assert!((overlap_1d(0.0, 5.0, 3.0, 8.0) - 2.0).abs() < EPSILON_GENERAL);
        assert!((overlap_1d(0.0, 3.0, 5.0, 8.0) - 0.0).abs() < EPSILON_GENERAL);
        assert!((overlap_1d(0.0, 10.0, 2.0, 8.0) - 6.0).abs() < EPSILON_GENERAL);
    }
}
