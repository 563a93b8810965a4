use nalgebra::{Matrix3, Vector3};

/// Rotation matrix about the Y axis; a positive angle turns +X toward +Z.
fn y_rotation(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        c, 0., -s, //
        0., 1., 0., //
        s, 0., c,
    )
}

/// Orthogonal projection of `point` onto the plane through `origin` with
/// normal `normal`. The normal is normalized internally; a point already on
/// the plane is returned unchanged.
pub fn project_onto_plane(
    point: &Vector3<f64>,
    normal: &Vector3<f64>,
    origin: &Vector3<f64>,
) -> Vector3<f64> {
    let n = normal.normalize();
    point - n * (point - origin).dot(&n)
}

/// Rotates `point` about the Y axis through `pivot` by `angle` radians.
pub fn rotate_about_y(point: &Vector3<f64>, angle: f64, pivot: &Vector3<f64>) -> Vector3<f64> {
    pivot + y_rotation(angle) * (point - pivot)
}

/// Right-handed orthonormal basis of one optical element
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub x: Vector3<f64>,
    pub y: Vector3<f64>,
    pub z: Vector3<f64>,
}
impl Frame {
    /// The world-aligned basis
    pub fn identity() -> Self {
        Self {
            x: Vector3::x(),
            y: Vector3::y(),
            z: Vector3::z(),
        }
    }
    /// Applies the same Y-axis rotation to all three basis vectors
    pub fn rotate_about_y(&self, angle: f64) -> Self {
        let rot = y_rotation(angle);
        Self {
            x: rot * self.x,
            y: rot * self.y,
            z: rot * self.z,
        }
    }
    /// True if the axes are pairwise orthogonal and unit length within `tol`
    pub fn is_orthonormal(&self, tol: f64) -> bool {
        let unit = [&self.x, &self.y, &self.z]
            .iter()
            .all(|axis| (axis.norm() - 1.).abs() < tol);
        unit && self.x.dot(&self.y).abs() < tol
            && self.y.dot(&self.z).abs() < tol
            && self.z.dot(&self.x).abs() < tol
    }
}
