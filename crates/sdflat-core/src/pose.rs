//! Poses and rigid transforms
//!
//! SDF and URDF both write poses as `x y z roll pitch yaw` with fixed-axis
//! XYZ Euler angles. Internally every pose is a [`Transform`]; composition
//! is `parent * child`, i.e. the child pose is expressed in the parent frame.

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

/// Rigid homogeneous transform (rotation + translation)
pub type Transform = Isometry3<f64>;

/// Pose in 3D space (x, y, z, roll, pitch, yaw)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl Pose {
    pub fn from_array(arr: [f64; 6]) -> Self {
        Self {
            x: arr[0],
            y: arr[1],
            z: arr[2],
            roll: arr[3],
            pitch: arr[4],
            yaw: arr[5],
        }
    }

    pub fn to_array(&self) -> [f64; 6] {
        [self.x, self.y, self.z, self.roll, self.pitch, self.yaw]
    }

    /// Parse a pose string "x y z roll pitch yaw"
    pub fn parse(s: &str) -> Result<Self, String> {
        let parts = parse_floats(s)?;
        match <[f64; 6]>::try_from(parts.as_slice()) {
            Ok(arr) => Ok(Self::from_array(arr)),
            Err(_) => Err(format!("expected 6 values, got {}", parts.len())),
        }
    }

    /// Decompose a transform into translation and fixed-axis XYZ angles
    pub fn from_transform(transform: &Transform) -> Self {
        let t = transform.translation.vector;
        let (roll, pitch, yaw) = transform.rotation.euler_angles();
        Self {
            x: t.x,
            y: t.y,
            z: t.z,
            roll,
            pitch,
            yaw,
        }
    }

    pub fn to_transform(&self) -> Transform {
        Isometry3::from_parts(
            Translation3::new(self.x, self.y, self.z),
            UnitQuaternion::from_euler_angles(self.roll, self.pitch, self.yaw),
        )
    }

    pub fn xyz(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn rpy(&self) -> [f64; 3] {
        [self.roll, self.pitch, self.yaw]
    }
}

/// Parse a pose string straight into a transform
pub fn parse_transform(s: &str) -> Result<Transform, String> {
    Pose::parse(s).map(|p| p.to_transform())
}

/// Parse three whitespace-separated floats ("x y z")
pub fn parse_vector3(s: &str) -> Result<Vector3<f64>, String> {
    let parts = parse_floats(s)?;
    match parts.as_slice() {
        [x, y, z] => Ok(Vector3::new(*x, *y, *z)),
        _ => Err(format!("expected 3 values, got {}", parts.len())),
    }
}

fn parse_floats(s: &str) -> Result<Vec<f64>, String> {
    s.split_whitespace()
        .map(|p| p.parse::<f64>().map_err(|e| format!("'{p}': {e}")))
        .collect()
}

/// Short human-readable form used by the tree dump
pub fn describe(transform: &Transform) -> String {
    let p = Pose::from_transform(transform);
    format!(
        "xyz=[{:.5} {:.5} {:.5}] rpy=[{:.5} {:.5} {:.5}]",
        p.x, p.y, p.z, p.roll, p.pitch, p.yaw
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_parse_pose() {
        let pose = Pose::parse("0 0 -0.005 3.14159 0 0").unwrap();
        assert!((pose.z - (-0.005)).abs() < 0.0001);
        assert!((pose.roll - 3.14159).abs() < 0.0001);

        assert!(Pose::parse("1 2 3").is_err());
        assert!(Pose::parse("1 2 3 a b c").is_err());
    }

    #[test]
    fn test_transform_decomposition_matches_authored_angles() {
        let pose = Pose::from_array([1.0, -2.0, 0.5, 0.1, -0.2, 0.3]);
        let back = Pose::from_transform(&pose.to_transform());
        for (a, b) in pose.to_array().iter().zip(back.to_array().iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_composition_expresses_child_in_parent_frame() {
        // Parent yawed by 90 degrees: child's +x offset lands on world +y
        let parent = Pose::from_array([1.0, 0.0, 0.0, 0.0, 0.0, FRAC_PI_2]).to_transform();
        let child = Pose::from_array([1.0, 0.0, 0.0, 0.0, 0.0, 0.0]).to_transform();
        let world = parent * child;
        assert_relative_eq!(world.translation.vector.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(world.translation.vector.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_parse_vector3() {
        let v = parse_vector3("0 0 1").unwrap();
        assert_eq!(v, Vector3::z());
        assert!(parse_vector3("0 1").is_err());
    }
}
