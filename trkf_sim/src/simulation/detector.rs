// trkf_sim/src/simulation/detector.rs

use crate::simulation::config::DetectorConfig;
use std::sync::Arc;
use trkf_core::services::{
    DetectorProperties, DetectorServices, Geometry, LArProperties, SimpleWireGeometry,
    StandardDetectorProperties, StandardLArProperties,
};
use trkf_core::types::Point3;

/// The simulated detector: the concrete geometry the generator walks through
/// and the service bundle the fitter consumes.
#[derive(Debug, Clone)]
pub struct Detector {
    pub geometry: Arc<SimpleWireGeometry>,
    pub services: DetectorServices,
}

impl Detector {
    pub fn from_config(config: &DetectorConfig) -> Self {
        let geometry = Arc::new(SimpleWireGeometry::new(
            Point3::from(config.min),
            Point3::from(config.max),
            config.planes.clone(),
        ));

        let lar = StandardLArProperties {
            efield: config.efield,
            ..StandardLArProperties::default()
        };
        let larprop: Arc<dyn LArProperties> = Arc::new(lar);
        let detprop = StandardDetectorProperties {
            sampling_rate: config.sampling_rate,
            trigger_offset: config.trigger_offset,
            temperature: config.temperature,
            plane_x_offsets: config.planes.iter().map(|p| p.x).collect(),
            ..StandardDetectorProperties::new(larprop.clone())
        };
        let detprop: Arc<dyn DetectorProperties> = Arc::new(detprop);

        let shared: Arc<dyn Geometry> = geometry.clone();
        Self {
            geometry,
            services: DetectorServices::new(shared, detprop, larprop),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_from_default_config() {
        let detector = Detector::from_config(&DetectorConfig::default());
        assert_eq!(detector.geometry.n_planes(), 3);
        assert_abs_diff_eq!(detector.services.geometry.wire_pitch(2, 0, 0), 0.3);
        assert_abs_diff_eq!(detector.services.detprop.temperature(), 87.);

        // Ticks and x invert each other.
        let detprop = &detector.services.detprop;
        let ticks = detprop.x_to_ticks(42., 1, 0, 0);
        assert_abs_diff_eq!(detprop.ticks_to_x(ticks, 1, 0, 0), 42., epsilon = 1e-9);
    }

    #[test]
    fn test_plane_offsets_follow_config() {
        let mut config = DetectorConfig::default();
        config.planes[0].x = -0.6;
        let detector = Detector::from_config(&config);
        let detprop = &detector.services.detprop;
        let t0 = detprop.x_to_ticks(10., 0, 0, 0);
        let t2 = detprop.x_to_ticks(10., 2, 0, 0);
        assert!(t0 > t2);
    }
}
