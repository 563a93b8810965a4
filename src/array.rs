//! Pose propagation for a zone-plate array: one reference element, an
//! angular step and a count become N globally consistent placements, all
//! rotated about the point of the reference mirror plane closest to the
//! shared light source.

use itertools::Itertools;
use nalgebra::Vector3;

use crate::geometry::{project_onto_plane, rotate_about_y};
use crate::pose::Pose;

#[derive(thiserror::Error, Debug)]
pub enum ArrayError {
    #[error("an array needs at least 2 elements, got {0}")]
    InvalidCount(usize),
    #[error("the angular step must be a positive angle in radians, got {0}")]
    InvalidStep(f64),
}

/// Immutable input of one synthesis run: element count, angular step and the
/// reference pose, plus the shared source origin (world origin by default)
#[derive(Debug, Clone)]
pub struct ArraySpec {
    reference: Pose,
    count: usize,
    step: f64,
    source: Vector3<f64>,
}
impl ArraySpec {
    pub fn new(reference: Pose, count: usize, step: f64) -> Result<Self, ArrayError> {
        if count < 2 {
            return Err(ArrayError::InvalidCount(count));
        }
        if !step.is_finite() || step <= 0. {
            return Err(ArrayError::InvalidStep(step));
        }
        Ok(Self {
            reference,
            count,
            step,
            source: Vector3::zeros(),
        })
    }
    /// Overrides the shared source origin
    pub fn source_origin(self, source: Vector3<f64>) -> Self {
        Self { source, ..self }
    }

    /// Rotation center common to all array members: the source origin
    /// projected onto the reference mirror plane
    pub fn pivot(&self) -> Vector3<f64> {
        project_onto_plane(&self.source, &self.reference.frame.y, &self.reference.position)
    }

    /// Signed placement angle per element index.
    ///
    /// Odd counts keep element 0 unrotated and alternate outward from it,
    /// odd indices to the left (negative), even indices to the right, so
    /// indices 2k-1 and 2k carry exact negated angles. Even counts have no
    /// center element; the innermost pair sits at -+step/2 and pairs step
    /// outward by the full step with the same left-first convention.
    pub fn angles(&self) -> Vec<f64> {
        let half = self.count / 2;
        if self.count % 2 == 1 {
            let lefts = (1..=half).map(|k| -(k as f64) * self.step);
            let rights = (1..=half).map(|k| k as f64 * self.step);
            std::iter::once(0.).chain(lefts.interleave(rights)).collect()
        } else {
            let lefts = (0..half).map(|k| -(k as f64 + 0.5) * self.step);
            let rights = (0..half).map(|k| (k as f64 + 0.5) * self.step);
            lefts.interleave(rights).collect()
        }
    }

    /// Produces the N poses, ordered center-outward
    pub fn synthesize(&self) -> Vec<Pose> {
        let pivot = self.pivot();
        self.angles()
            .into_iter()
            .map(|angle| {
                if angle == 0. {
                    // the center element keeps the reference pose untouched
                    return self.reference.clone();
                }
                Pose {
                    position: rotate_about_y(&self.reference.position, angle, &pivot),
                    frame: self.reference.frame.rotate_about_y(angle),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Frame;

    fn reference() -> Pose {
        Pose {
            position: Vector3::new(0., 0., 90.),
            frame: Frame::identity(),
        }
    }

    fn tilted_reference() -> Pose {
        Pose {
            position: Vector3::new(0., 0., 90.),
            frame: Frame {
                x: Vector3::x(),
                y: Vector3::new(0., 0.999263, -0.0383878).normalize(),
                z: Vector3::new(0., 0.0383878, 0.999263).normalize(),
            },
        }
    }

    #[test]
    fn count_invariant() {
        for count in 2..=9 {
            let spec = ArraySpec::new(reference(), count, 0.1).unwrap();
            assert_eq!(spec.synthesize().len(), count);
        }
    }

    #[test]
    fn three_elements_around_an_untilted_reference() {
        let spec = ArraySpec::new(reference(), 3, 0.1).unwrap();
        let poses = spec.synthesize();
        // pivot: world origin projected onto the y-normal plane through
        // (0,0,90) is the origin itself
        assert_eq!(spec.pivot(), Vector3::zeros());
        assert_eq!(poses[0], reference());
        let expected = |angle: f64| Pose {
            position: rotate_about_y(&Vector3::new(0., 0., 90.), angle, &Vector3::zeros()),
            frame: Frame::identity().rotate_about_y(angle),
        };
        assert_eq!(poses[1], expected(-0.1));
        assert_eq!(poses[2], expected(0.1));
    }

    #[test]
    fn left_right_pairs_carry_negated_angles() {
        let spec = ArraySpec::new(reference(), 7, 0.05).unwrap();
        let angles = spec.angles();
        assert_eq!(angles[0], 0.);
        for k in 1..=3 {
            assert_eq!(angles[2 * k - 1], -angles[2 * k]);
            assert!((angles[2 * k].abs() - k as f64 * 0.05).abs() < 1e-15);
        }
    }

    #[test]
    fn even_count_has_no_center_element() {
        let spec = ArraySpec::new(reference(), 4, 0.2).unwrap();
        let angles = spec.angles();
        for (angle, expected) in angles.iter().zip([-0.1, 0.1, -0.3, 0.3]) {
            assert!((angle - expected).abs() < 1e-12);
        }
        for pose in spec.synthesize() {
            assert_ne!(pose.position, reference().position);
        }
    }

    #[test]
    fn synthesized_frames_stay_orthonormal() {
        let spec = ArraySpec::new(tilted_reference(), 9, 0.1).unwrap();
        for pose in spec.synthesize() {
            assert!(pose.frame.is_orthonormal(1e-9));
        }
    }

    #[test]
    fn pivot_lies_on_the_mirror_plane() {
        let spec = ArraySpec::new(tilted_reference(), 3, 0.1).unwrap();
        let pivot = spec.pivot();
        let reference = tilted_reference();
        assert!((pivot - reference.position).dot(&reference.frame.y).abs() < 1e-9);
    }

    #[test]
    fn source_origin_moves_the_pivot() {
        let spec = ArraySpec::new(reference(), 3, 0.1)
            .unwrap()
            .source_origin(Vector3::new(5., 2., -10.));
        // projection along y onto the y = 0 plane keeps x and z
        assert_eq!(spec.pivot(), Vector3::new(5., 0., -10.));
    }

    #[test]
    fn degenerate_inputs_are_rejected() {
        assert!(matches!(
            ArraySpec::new(reference(), 1, 0.1),
            Err(ArrayError::InvalidCount(1))
        ));
        assert!(matches!(
            ArraySpec::new(reference(), 0, 0.1),
            Err(ArrayError::InvalidCount(0))
        ));
        assert!(matches!(
            ArraySpec::new(reference(), 3, 0.),
            Err(ArrayError::InvalidStep(_))
        ));
        assert!(matches!(
            ArraySpec::new(reference(), 3, -0.1),
            Err(ArrayError::InvalidStep(_))
        ));
        assert!(matches!(
            ArraySpec::new(reference(), 3, f64::NAN),
            Err(ArrayError::InvalidStep(_))
        ));
    }
}
