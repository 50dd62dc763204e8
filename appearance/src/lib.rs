//! Appearance descriptors for multi-object tracking
//!
//! This crate computes per-region appearance signals that a tracker fuses
//! into its association cost: normalized color histograms compared with the
//! Bhattacharyya distance, and learned embeddings compared with the cosine
//! distance. Embedding models are external; they plug in behind the
//! [`EmbeddingBackend`] trait and are routed per object class.
//!
//! ```rust,ignore
//! use appearance::{CropRect, EmbeddingExtractor, HistogramExtractor, ObjectType};
//!
//! let histograms = HistogramExtractor::default();
//! let embeddings = EmbeddingExtractor::from_configs(&configs, load_backend);
//!
//! let crop = CropRect::clamped(10.0, 10.0, 30.0, 30.0, frame.width(), frame.height());
//! let hist = crop.map(|c| histograms.extract(&frame, c));
//! let emb = crop.and_then(|c| embeddings.extract(&frame, c, ObjectType(0)));
//! ```

pub mod embedding;
pub mod error;
pub mod histogram;
pub mod types;

pub use embedding::{cosine_distance, Embedding, EmbeddingBackend, EmbeddingConfig, EmbeddingExtractor};
pub use error::{AppearanceError, Result};
pub use histogram::{bhattacharyya, Histogram, HistogramExtractor};
pub use types::{CropRect, ObjectType, RegionEmbedding};
