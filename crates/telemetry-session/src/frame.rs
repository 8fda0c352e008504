//! World-to-vehicle frame rotation.

use gt7_telemetry_protocol::{Quaternion, Vec3};

/// Double-precision 3-vector used for channel math.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector {
    pub const ZERO: Vector = Vector::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vector) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vector) -> Vector {
        Vector::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn scale(self, k: f64) -> Vector {
        Vector::new(self.x * k, self.y * k, self.z * k)
    }

    pub fn norm(self) -> f64 {
        self.dot(self).sqrt()
    }
}

impl std::ops::Add for Vector {
    type Output = Vector;
    fn add(self, rhs: Vector) -> Vector {
        Vector::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vector {
    type Output = Vector;
    fn sub(self, rhs: Vector) -> Vector {
        Vector::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl From<Vec3> for Vector {
    fn from(v: Vec3) -> Self {
        Vector::new(f64::from(v.x), f64::from(v.y), f64::from(v.z))
    }
}

/// Express a world-frame vector in the frame described by `orientation`.
///
/// Applies the inverse rotation `q* v q`. A zero or non-finite quaternion is
/// treated as the identity.
pub fn rotate_into_frame(orientation: Quaternion, v: Vector) -> Vector {
    let w = f64::from(orientation.w);
    let u = Vector::new(
        f64::from(orientation.x),
        f64::from(orientation.y),
        f64::from(orientation.z),
    );
    let norm = (w * w + u.dot(u)).sqrt();
    if norm <= f64::EPSILON || !norm.is_finite() {
        return v;
    }
    let w = w / norm;
    // Conjugate: rotate by the negated vector part.
    let u = u.scale(-1.0 / norm);

    // v' = v + 2w(u x v) + 2(u x (u x v))
    let t = u.cross(v).scale(2.0);
    v + t.scale(w) + u.cross(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vector, b: Vector) -> bool {
        (a - b).norm() < 1e-9
    }

    #[test]
    fn test_identity_leaves_vector_unchanged() {
        let v = Vector::new(1.0, -2.0, 3.5);
        assert!(close(rotate_into_frame(Quaternion::default(), v), v));
    }

    #[test]
    fn test_zero_quaternion_is_identity() {
        let q = Quaternion {
            w: 0.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        };
        let v = Vector::new(4.0, 5.0, 6.0);
        assert_eq!(rotate_into_frame(q, v), v);
    }

    #[test]
    fn test_yaw_quarter_turn() {
        // Vehicle yawed +90 degrees about Y: world +X appears as body +Z.
        let half = std::f32::consts::FRAC_PI_4;
        let q = Quaternion {
            w: half.cos(),
            x: 0.0,
            y: half.sin(),
            z: 0.0,
        };
        let body = rotate_into_frame(q, Vector::new(1.0, 0.0, 0.0));
        assert!((body.x).abs() < 1e-6, "{body:?}");
        assert!((body.z - 1.0).abs() < 1e-6, "{body:?}");
    }

    #[test]
    fn test_rotation_preserves_length() {
        let q = Quaternion {
            w: 0.3,
            x: -0.5,
            y: 0.7,
            z: 0.1,
        };
        let v = Vector::new(2.0, 3.0, -1.0);
        assert!((rotate_into_frame(q, v).norm() - v.norm()).abs() < 1e-6);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn quaternion() -> impl Strategy<Value = Quaternion> {
            (-1.0f32..1.0, -1.0f32..1.0, -1.0f32..1.0, -1.0f32..1.0)
                .prop_filter("non-degenerate", |(w, x, y, z)| w * w + x * x + y * y + z * z > 0.01)
                .prop_map(|(w, x, y, z)| Quaternion { w, x, y, z })
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(256))]

            #[test]
            fn prop_rotation_preserves_length(
                q in quaternion(),
                x in -100.0f64..100.0,
                y in -100.0f64..100.0,
                z in -100.0f64..100.0,
            ) {
                let v = Vector::new(x, y, z);
                let rotated = rotate_into_frame(q, v);
                prop_assert!((rotated.norm() - v.norm()).abs() < 1e-6 * (1.0 + v.norm()));
            }

            #[test]
            fn prop_conjugate_undoes_rotation(
                q in quaternion(),
                x in -100.0f64..100.0,
                y in -100.0f64..100.0,
                z in -100.0f64..100.0,
            ) {
                let v = Vector::new(x, y, z);
                let conjugate = Quaternion { w: q.w, x: -q.x, y: -q.y, z: -q.z };
                let back = rotate_into_frame(conjugate, rotate_into_frame(q, v));
                prop_assert!((back - v).norm() < 1e-6 * (1.0 + v.norm()));
            }
        }
    }
}
