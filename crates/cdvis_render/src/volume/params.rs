//! Tunable volume parameters

use cdvis_math::Vec3;

/// Everything that shapes how a volume looks.
///
/// Setting any field through [`Volume`](super::Volume) except `step_size`
/// and `display_sample_count` invalidates the baked texture.
#[derive(Clone, Debug, PartialEq)]
pub struct VolumeParameters {
    /// Raymarch step in object units
    pub step_size: f32,
    pub density: f32,
    pub threshold: f32,
    pub exposure: f32,
    /// Extinction scale of the light march
    pub light_density: f32,
    pub light_intensity: f32,
    pub light_ambient: f32,
    pub light_position: Vec3,
    pub light_direction: Vec3,
    pub light_angle: f32,
    pub plane_point: Vec3,
    pub plane_normal: Vec3,
    pub mask: bool,
    pub display_sample_count: bool,
}

impl VolumeParameters {
    pub const MIN_STEP_SIZE: f32 = 0.0001;

    /// Clamp every field into its valid range
    pub fn sanitized(mut self) -> Self {
        self.density = self.density.max(0.0);
        self.exposure = self.exposure.max(0.0);
        self.threshold = self.threshold.clamp(0.0, 1.0);
        self.step_size = self.step_size.max(Self::MIN_STEP_SIZE);
        self
    }

    /// True when the two differ in anything the bake reads
    pub fn affects_bake(&self, other: &VolumeParameters) -> bool {
        let mut a = self.clone();
        a.step_size = other.step_size;
        a.display_sample_count = other.display_sample_count;
        a != *other
    }
}

impl Default for VolumeParameters {
    fn default() -> Self {
        Self {
            step_size: 0.00135,
            density: 0.5,
            threshold: 0.2,
            exposure: 1.5,
            light_density: 300.0,
            light_intensity: 100.0,
            light_ambient: 0.2,
            light_position: Vec3::new(0.0, 0.1, 0.0),
            light_direction: Vec3::new(-1.0, -0.25, 0.0).normalize(),
            light_angle: 0.5,
            plane_point: Vec3::new(0.0, -2.0, 0.0),
            plane_normal: Vec3::Y,
            mask: false,
            display_sample_count: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitized_clamps() {
        let p = VolumeParameters {
            density: -1.0,
            exposure: -3.0,
            threshold: 5.0,
            step_size: 0.0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(p.density, 0.0);
        assert_eq!(p.exposure, 0.0);
        assert_eq!(p.threshold, 1.0);
        assert_eq!(p.step_size, VolumeParameters::MIN_STEP_SIZE);
    }

    #[test]
    fn test_affects_bake() {
        let base = VolumeParameters::default();
        let mut p = base.clone();
        p.step_size = 0.01;
        p.display_sample_count = true;
        assert!(!p.affects_bake(&base));
        p.light_ambient = 0.5;
        assert!(p.affects_bake(&base));
    }
}
