//! Tracker configuration
//!
//! All fields are read once at construction time and stay fixed for the
//! lifetime of the tracker.

use anyhow::{bail, Result};
use appearance::{EmbeddingConfig, ObjectType};
use std::collections::HashSet;

use crate::motion::FilterGoal;

/// Assignment solver strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchType {
    /// Exact minimum-cost assignment (Kuhn-Munkres), O(n^3)
    #[default]
    Hungarian,
    /// Maximum matching on the gated bipartite graph; cheaper when most
    /// pairs are already ruled out by the gate
    Bipart,
}

/// Motion filter backend selector
///
/// Only the linear filter ships with this crate; the filter internals are an
/// external contract, so the selector exists for configuration compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KalmanType {
    #[default]
    Linear,
}

/// What happens to a track while it has no associated detection
///
/// Visual lost-track followers are external single-object trackers and are
/// not bundled; the built-in policy keeps predicting from the motion filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LostTrackType {
    #[default]
    None,
}

/// Non-negative weights of the five cost terms; a zero weight disables the
/// term (and, for the appearance terms, the corresponding extractor)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceWeights {
    /// Prediction-ellipse distance between centers
    pub centers: f32,
    /// Width/height mismatch, coupled with the ellipse distance
    pub rects: f32,
    /// 1 - IoU of the bounding boxes
    pub jaccard: f32,
    /// Bhattacharyya distance between color histograms
    pub hist: f32,
    /// Cosine distance between learned embeddings (same-class pairs only)
    pub feature_cos: f32,
}

impl Default for DistanceWeights {
    fn default() -> Self {
        Self {
            centers: 0.25,
            rects: 0.25,
            jaccard: 0.5,
            hist: 0.0,
            feature_cos: 0.0,
        }
    }
}

impl DistanceWeights {
    pub fn uses_appearance(&self) -> bool {
        self.hist > 0.0 || self.feature_cos > 0.0
    }
}

/// Configuration for the tracker core
#[derive(Debug, Clone)]
pub struct TrackerSettings {
    /// Assignment solver strategy
    pub match_type: MatchType,
    /// Post-solve gate: associations costlier than this are voided
    pub dist_threshold: f32,
    /// Cost term weights
    pub dist_weights: DistanceWeights,
    /// Motion filter backend
    pub kalman_type: KalmanType,
    /// Filter the full rectangle or the center point only
    pub filter_goal: FilterGoal,
    /// Motion filter time step
    pub dt: f32,
    /// Process noise magnitude of the motion filter
    pub accel_noise_mag: f32,
    /// Constant-acceleration motion model instead of constant-velocity
    pub use_acceleration: bool,
    /// Max retained trace points per track
    pub max_trace_length: usize,
    /// Frames without association before a track is retired
    pub maximum_allowed_skipped_frames: u32,
    /// Seconds of near-zero motion before an object counts as static
    pub min_static_time: f32,
    /// Seconds of static state before the track is retired
    pub max_static_time: f32,
    /// Displacement (pixels over the static window) below which a frame
    /// counts as static
    pub max_speed_for_static: f32,
    /// Enable the abandoned-object side channel
    pub use_abandoned_detection: bool,
    /// Minimum gating-ellipse radius in pixels; negative selects the
    /// relative variant below
    pub min_area_radius_pix: f32,
    /// Minimum gating-ellipse radius as a fraction of the last region size
    pub min_area_radius_k: f32,
    /// Lost-track follow policy
    pub lost_track_type: LostTrackType,
    /// EMA coefficient merging new histograms into the stored one, in (0, 1)
    pub hist_ema_alpha: f32,
    /// EMA coefficient merging new embeddings into the stored one, in (0, 1)
    pub embedding_ema_alpha: f32,
    /// Embedding backend configurations, one per model
    pub embeddings: Vec<EmbeddingConfig>,
    /// Class pairs allowed to associate across types; fill via
    /// [`TrackerSettings::add_near_types`]
    pub near_types: HashSet<(ObjectType, ObjectType)>,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            match_type: MatchType::Hungarian,
            dist_threshold: 0.8,
            dist_weights: DistanceWeights::default(),
            kalman_type: KalmanType::Linear,
            filter_goal: FilterGoal::Center,
            dt: 0.2,
            accel_noise_mag: 0.1,
            use_acceleration: false,
            max_trace_length: 10,
            maximum_allowed_skipped_frames: 25,
            min_static_time: 5.0,
            max_static_time: 25.0,
            max_speed_for_static: 10.0,
            use_abandoned_detection: false,
            min_area_radius_pix: 20.0,
            min_area_radius_k: 0.5,
            lost_track_type: LostTrackType::None,
            hist_ema_alpha: 0.25,
            embedding_ema_alpha: 0.1,
            embeddings: Vec::new(),
            near_types: HashSet::new(),
        }
    }
}

impl TrackerSettings {
    /// Allow association between two distinct classes (symmetric)
    pub fn add_near_types(&mut self, a: ObjectType, b: ObjectType) {
        self.near_types.insert((a, b));
        self.near_types.insert((b, a));
    }

    /// Type-compatibility predicate used by the cost matrix gate
    pub fn check_type(&self, a: ObjectType, b: ObjectType) -> bool {
        a == b || self.near_types.contains(&(a, b))
    }

    /// Reject configurations the tracker cannot run with
    pub fn validate(&self) -> Result<()> {
        let w = &self.dist_weights;
        if w.centers < 0.0 || w.rects < 0.0 || w.jaccard < 0.0 || w.hist < 0.0 || w.feature_cos < 0.0 {
            bail!("distance weights must be non-negative");
        }
        if w.centers == 0.0 && w.rects == 0.0 && w.jaccard == 0.0 && w.hist == 0.0 && w.feature_cos == 0.0 {
            bail!("at least one distance weight must be positive");
        }
        if self.dist_threshold <= 0.0 {
            bail!("dist_threshold must be positive, got {}", self.dist_threshold);
        }
        if self.dt <= 0.0 {
            bail!("dt must be positive, got {}", self.dt);
        }
        if self.min_static_time > self.max_static_time {
            bail!(
                "min_static_time ({}) must not exceed max_static_time ({})",
                self.min_static_time,
                self.max_static_time
            );
        }
        if !(0.0..=1.0).contains(&self.hist_ema_alpha)
            || self.hist_ema_alpha == 0.0
            || self.hist_ema_alpha == 1.0
        {
            bail!("hist_ema_alpha must lie in (0, 1), got {}", self.hist_ema_alpha);
        }
        if !(0.0..=1.0).contains(&self.embedding_ema_alpha)
            || self.embedding_ema_alpha == 0.0
            || self.embedding_ema_alpha == 1.0
        {
            bail!(
                "embedding_ema_alpha must lie in (0, 1), got {}",
                self.embedding_ema_alpha
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(TrackerSettings::default().validate().is_ok());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut settings = TrackerSettings::default();
        settings.dist_weights.jaccard = -0.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_all_zero_weights_rejected() {
        let mut settings = TrackerSettings::default();
        settings.dist_weights = DistanceWeights {
            centers: 0.0,
            rects: 0.0,
            jaccard: 0.0,
            hist: 0.0,
            feature_cos: 0.0,
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_ema_bounds_rejected() {
        let mut settings = TrackerSettings::default();
        settings.hist_ema_alpha = 1.0;
        assert!(settings.validate().is_err());

        let mut settings = TrackerSettings::default();
        settings.embedding_ema_alpha = 0.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_near_types_symmetric() {
        let mut settings = TrackerSettings::default();
        settings.add_near_types(ObjectType(2), ObjectType(7));

        assert!(settings.check_type(ObjectType(2), ObjectType(7)));
        assert!(settings.check_type(ObjectType(7), ObjectType(2)));
        assert!(settings.check_type(ObjectType(3), ObjectType(3)));
        assert!(!settings.check_type(ObjectType(2), ObjectType(3)));
    }
}
