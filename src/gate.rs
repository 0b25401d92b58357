use crate::config::GateConfig;
use crate::detection::BackendKind;
use crate::region::FaceRegion;

/// Drops candidates whose confidence is below the bar for their backend.
///
/// Neural false positives at low confidence are common, so neural candidates
/// face a stricter threshold than heuristic ones.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceGate {
    neural_min_confidence: f32,
    heuristic_min_confidence: f32,
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self::new(&GateConfig::default())
    }
}

impl ConfidenceGate {
    pub fn new(config: &GateConfig) -> Self {
        Self {
            neural_min_confidence: config.neural_min_confidence,
            heuristic_min_confidence: config.heuristic_min_confidence,
        }
    }

    pub fn threshold(&self, kind: BackendKind) -> f32 {
        match kind {
            BackendKind::Neural => self.neural_min_confidence,
            BackendKind::Heuristic => self.heuristic_min_confidence,
        }
    }

    /// Keep the regions that meet the threshold for `kind`.
    ///
    /// Everything else is logged as detected but not acted upon.
    pub fn filter(&self, regions: Vec<FaceRegion>, kind: BackendKind) -> Vec<FaceRegion> {
        let threshold = self.threshold(kind);

        regions
            .into_iter()
            .filter(|region| {
                // NaN fails the comparison and is dropped with the rest
                let accepted = region.confidence >= threshold;
                if !accepted {
                    tracing::info!(
                        "Face detected but not acted upon: {} region {},{} {}x{} confidence {:.2} < {:.2}",
                        kind,
                        region.x,
                        region.y,
                        region.width,
                        region.height,
                        region.confidence,
                        threshold
                    );
                }
                accepted
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(confidence: f32) -> FaceRegion {
        FaceRegion::new(10, 10, 50, 50, confidence)
    }

    #[test]
    fn neural_threshold_is_half() {
        let gate = ConfidenceGate::default();
        let kept = gate.filter(vec![at(0.4), at(0.5), at(0.9)], BackendKind::Neural);
        assert_eq!(kept, vec![at(0.5), at(0.9)]);
    }

    #[test]
    fn heuristic_threshold_is_lower() {
        let gate = ConfidenceGate::default();
        let kept = gate.filter(vec![at(0.29), at(0.3), at(0.4)], BackendKind::Heuristic);
        assert_eq!(kept, vec![at(0.3), at(0.4)]);
    }

    #[test]
    fn same_confidence_passes_heuristic_but_not_neural() {
        let gate = ConfidenceGate::default();
        assert!(gate.filter(vec![at(0.4)], BackendKind::Neural).is_empty());
        assert_eq!(gate.filter(vec![at(0.4)], BackendKind::Heuristic).len(), 1);
    }

    #[test]
    fn nan_confidence_is_dropped() {
        let gate = ConfidenceGate::default();
        assert!(gate.filter(vec![at(f32::NAN)], BackendKind::Heuristic).is_empty());
    }

    #[test]
    fn thresholds_follow_config() {
        let gate = ConfidenceGate::new(&GateConfig {
            neural_min_confidence: 0.8,
            heuristic_min_confidence: 0.6,
        });
        assert_eq!(gate.threshold(BackendKind::Neural), 0.8);
        assert_eq!(gate.threshold(BackendKind::Heuristic), 0.6);
        assert!(gate.filter(vec![at(0.7)], BackendKind::Neural).is_empty());
    }
}
