//! Capture predicates for active-bond formation and release.
//!
//! Two regions decide whether a candidate monomer may join a bond:
//! - Proximity shell: `inner <= |a - b| <= outer`
//! - Forward cone: truncated cone anchored at a polymer end,
//!   `r <= range` and `dot(v, axis) / r >= cos(half_angle)`
//!
//! Both predicates are pure; candidate enumeration belongs to the caller.

use std::f64::consts::FRAC_PI_2;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Axis lengths below this are treated as zero
const MIN_AXIS_LENGTH: f64 = 1e-12;

/// Annular separation shell between two monomers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProximityShell {
    /// Minimum admitted separation
    pub inner: f64,
    /// Maximum admitted separation
    pub outer: f64,
}

impl ProximityShell {
    /// Build a validated shell.
    pub fn new(inner: f64, outer: f64) -> Result<Self, ConfigError> {
        ConfigError::check_non_negative("inner radius", inner)?;
        ConfigError::check_non_negative("outer radius", outer)?;
        if inner > outer {
            return Err(ConfigError::InvertedShell { inner, outer });
        }
        Ok(Self { inner, outer })
    }

    /// Shell admitting any separation up to `outer`
    pub fn within(outer: f64) -> Result<Self, ConfigError> {
        Self::new(0.0, outer)
    }

    pub fn contains_separation(&self, separation: f64) -> bool {
        separation >= self.inner && separation <= self.outer
    }

    /// Whether the pair at positions `a` and `b` lies inside the shell
    pub fn contains(&self, a: DVec3, b: DVec3) -> bool {
        self.contains_separation(a.distance(b))
    }
}

/// Truncated cone with its apex on a polymer end monomer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForwardCone {
    /// Apex position
    pub apex: DVec3,
    /// Unit axis direction
    pub axis: DVec3,
    /// Maximum distance from the apex
    pub range: f64,
    /// Half-angle in radians
    pub half_angle_rad: f64,
    cos_half_angle: f64,
}

impl ForwardCone {
    /// Build a cone, normalizing the axis.
    pub fn new(apex: DVec3, axis: DVec3, range: f64, half_angle_rad: f64) -> Result<Self, ConfigError> {
        ConfigError::check_non_negative("cone range", range)?;
        if !(0.0..=FRAC_PI_2).contains(&half_angle_rad) {
            return Err(ConfigError::HalfAngleOutOfRange(half_angle_rad.to_degrees()));
        }
        let length = axis.length();
        if !length.is_finite() || length < MIN_AXIS_LENGTH {
            return Err(ConfigError::ZeroConeAxis);
        }

        Ok(Self {
            apex,
            axis: axis / length,
            range,
            half_angle_rad,
            cos_half_angle: half_angle_rad.cos(),
        })
    }

    /// Whether `point` lies inside the cone.
    ///
    /// The apex itself is excluded since it has no direction.
    pub fn contains(&self, point: DVec3) -> bool {
        let v = point - self.apex;
        let r = v.length();
        if r < MIN_AXIS_LENGTH || r > self.range {
            return false;
        }
        v.dot(self.axis) / r >= self.cos_half_angle
    }

    /// Angle between the axis and the apex-to-point vector
    pub fn angle_to(&self, point: DVec3) -> Option<f64> {
        let v = point - self.apex;
        let r = v.length();
        if r < MIN_AXIS_LENGTH {
            return None;
        }
        Some((v.dot(self.axis) / r).clamp(-1.0, 1.0).acos())
    }
}

/// Cone parameters owned by a growth event.
///
/// Angles are stored in degrees as configured; the axis is derived at
/// runtime from the end bond direction, tilted by `polar_angle_deg` and
/// rotated about the bond by `azimuth_deg`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConeSpec {
    /// Cone range
    pub range: f64,
    /// Half-angle (degrees)
    pub half_angle_deg: f64,
    /// Tilt of the axis away from the bond direction (degrees)
    #[serde(default)]
    pub polar_angle_deg: f64,
    /// Rotation of the tilt about the bond direction (degrees)
    #[serde(default)]
    pub azimuth_deg: f64,
}

impl ConeSpec {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_non_negative("cone range", self.range)?;
        if !(0.0..=90.0).contains(&self.half_angle_deg) {
            return Err(ConfigError::HalfAngleOutOfRange(self.half_angle_deg));
        }
        if !(0.0..=180.0).contains(&self.polar_angle_deg) {
            return Err(ConfigError::PolarAngleOutOfRange(self.polar_angle_deg));
        }
        if !(0.0..=360.0).contains(&self.azimuth_deg) {
            return Err(ConfigError::AzimuthOutOfRange(self.azimuth_deg));
        }
        Ok(())
    }

    /// Cone axis for an end bond pointing along `bond_direction`
    pub fn axis_for(&self, bond_direction: DVec3) -> Option<DVec3> {
        let length = bond_direction.length();
        if !length.is_finite() || length < MIN_AXIS_LENGTH {
            return None;
        }
        let d = bond_direction / length;
        if self.polar_angle_deg == 0.0 {
            return Some(d);
        }

        let (e1, e2) = orthonormal_pair(d);
        let (sin_t, cos_t) = self.polar_angle_deg.to_radians().sin_cos();
        let (sin_p, cos_p) = self.azimuth_deg.to_radians().sin_cos();
        Some(d * cos_t + (e1 * cos_p + e2 * sin_p) * sin_t)
    }

    /// Anchor the cone at `apex`; `None` for a degenerate bond direction.
    pub fn anchored_at(&self, apex: DVec3, bond_direction: DVec3) -> Option<ForwardCone> {
        let axis = self.axis_for(bond_direction)?;
        let half_angle_rad = self.half_angle_deg.to_radians().min(FRAC_PI_2);
        ForwardCone::new(apex, axis, self.range, half_angle_rad).ok()
    }
}

/// Geometric region an event tests candidates against
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaptureRegion {
    /// Shell around a fixed origin
    Shell { origin: DVec3, shell: ProximityShell },
    /// Forward cone
    Cone(ForwardCone),
}

impl CaptureRegion {
    pub fn admits(&self, point: DVec3) -> bool {
        match self {
            CaptureRegion::Shell { origin, shell } => shell.contains(*origin, point),
            CaptureRegion::Cone(cone) => cone.contains(point),
        }
    }

    /// Radius that bounds the region, used for the neighbour query
    pub fn search_radius(&self) -> f64 {
        match self {
            CaptureRegion::Shell { shell, .. } => shell.outer,
            CaptureRegion::Cone(cone) => cone.range,
        }
    }
}

/// Two unit vectors perpendicular to `d` and to each other
fn orthonormal_pair(d: DVec3) -> (DVec3, DVec3) {
    // Cross with the coordinate axis least aligned with d
    let helper = if d.x.abs() <= d.y.abs() && d.x.abs() <= d.z.abs() {
        DVec3::X
    } else if d.y.abs() <= d.z.abs() {
        DVec3::Y
    } else {
        DVec3::Z
    };
    let e1 = d.cross(helper).normalize();
    let e2 = d.cross(e1);
    (e1, e2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_shell_bounds_inclusive() {
        let shell = ProximityShell::new(0.5, 1.5).unwrap();
        assert!(shell.contains_separation(0.5));
        assert!(shell.contains_separation(1.5));
        assert!(!shell.contains_separation(0.49));
        assert!(!shell.contains_separation(1.51));
    }

    #[test]
    fn test_inverted_shell_rejected() {
        let err = ProximityShell::new(5.0, 3.0).unwrap_err();
        assert_eq!(err, ConfigError::InvertedShell { inner: 5.0, outer: 3.0 });
    }

    #[test]
    fn test_zero_axis_rejected() {
        let err = ForwardCone::new(DVec3::ZERO, DVec3::ZERO, 1.0, 0.3).unwrap_err();
        assert_eq!(err, ConfigError::ZeroConeAxis);
    }

    #[test]
    fn test_cone_excludes_apex() {
        let cone = ForwardCone::new(DVec3::ZERO, DVec3::Z, 2.0, 0.5).unwrap();
        assert!(!cone.contains(DVec3::ZERO));
    }

    #[test]
    fn test_axis_normalized() {
        let cone = ForwardCone::new(DVec3::ZERO, DVec3::new(0.0, 0.0, 4.0), 2.0, 0.5).unwrap();
        assert_relative_eq!(cone.axis.length(), 1.0);
    }

    #[test]
    fn test_untilted_axis_follows_bond() {
        let spec = ConeSpec { range: 1.0, half_angle_deg: 30.0, polar_angle_deg: 0.0, azimuth_deg: 0.0 };
        let axis = spec.axis_for(DVec3::new(0.0, 3.0, 0.0)).unwrap();
        assert_relative_eq!(axis.y, 1.0);
    }

    #[test]
    fn test_tilted_axis_angle() {
        let spec = ConeSpec { range: 1.0, half_angle_deg: 10.0, polar_angle_deg: 45.0, azimuth_deg: 120.0 };
        let axis = spec.axis_for(DVec3::Z).unwrap();
        assert_relative_eq!(axis.length(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(axis.dot(DVec3::Z).acos().to_degrees(), 45.0, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_bond_has_no_cone() {
        let spec = ConeSpec { range: 1.0, half_angle_deg: 30.0, polar_angle_deg: 0.0, azimuth_deg: 0.0 };
        assert!(spec.anchored_at(DVec3::ONE, DVec3::ZERO).is_none());
    }

    #[test]
    fn test_cone_spec_angle_limits() {
        let mut spec = ConeSpec { range: 1.0, half_angle_deg: 90.0, polar_angle_deg: 180.0, azimuth_deg: 360.0 };
        assert!(spec.validate().is_ok());
        spec.half_angle_deg = 100.0;
        assert_eq!(spec.validate(), Err(ConfigError::HalfAngleOutOfRange(100.0)));
        spec.half_angle_deg = 30.0;
        spec.polar_angle_deg = 181.0;
        assert!(spec.validate().is_err());
        spec.polar_angle_deg = 0.0;
        spec.azimuth_deg = -1.0;
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_region_search_radius() {
        let shell = ProximityShell::new(0.2, 0.8).unwrap();
        let region = CaptureRegion::Shell { origin: DVec3::ZERO, shell };
        assert_eq!(region.search_radius(), 0.8);
        assert!(region.admits(DVec3::new(0.5, 0.0, 0.0)));
        assert!(!region.admits(DVec3::new(0.1, 0.0, 0.0)));
    }
}
