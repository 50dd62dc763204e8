//! Multi-object visual tracker fusing geometric and appearance cues
//!
//! Frame by frame, the tracker assimilates a set of detected regions into a
//! set of persistent tracks: a fused cost matrix (prediction-ellipse
//! distance, rectangle agreement, IoU, color histograms, learned
//! embeddings) is solved as an assignment problem under a cost cap, then
//! tracks are born, updated, and retired.
//!
//! ```rust,ignore
//! use fusetrack::{Region, Tracker, TrackerSettings};
//! use appearance::EmbeddingExtractor;
//!
//! let mut tracker = Tracker::new(TrackerSettings::default(), EmbeddingExtractor::new())?;
//!
//! // Per frame: detections in, updated track set out
//! tracker.update(&regions, &frame, fps)?;
//! for track in tracker.tracks() {
//!     println!("#{} at {}", track.id(), track.last_region().brect);
//! }
//! ```

pub mod bipartite;
pub mod cost;
pub mod hungarian;
pub mod kalman;
pub mod motion;
pub mod region;
pub mod settings;
pub mod track;
pub mod tracker;

pub use bipartite::BipartSolver;
pub use hungarian::HungarianSolver;
pub use motion::{FilterGoal, MotionFilter};
pub use region::{calculate_iou, Bbox, Region, RotatedRect};
pub use settings::{DistanceWeights, KalmanType, LostTrackType, MatchType, TrackerSettings};
pub use track::Track;
pub use tracker::Tracker;

pub use appearance::{EmbeddingExtractor, ObjectType, RegionEmbedding};
