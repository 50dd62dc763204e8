//! Learned appearance embeddings behind a pluggable backend trait
//!
//! The tracker only relies on the `extract` contract: give a backend a frame
//! crop, get a fixed-dimension feature vector back. Concrete backends (ONNX
//! models and the like) live outside this crate; multiple object classes may
//! share one backend instance.

use image::RgbImage;
use ndarray::Array1;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::types::{CropRect, ObjectType};

/// A feature vector with its cached self-dot-product
///
/// The dot product is computed once at extraction time so that cosine
/// denominators never recompute `<v, v>` per candidate pair.
#[derive(Debug, Clone)]
pub struct Embedding {
    pub vector: Array1<f32>,
    pub dot: f32,
}

impl Embedding {
    pub fn new(vector: Array1<f32>) -> Self {
        let dot = vector.dot(&vector);
        Self { vector, dot }
    }

    pub fn len(&self) -> usize {
        self.vector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vector.is_empty()
    }
}

/// Contract for embedding model backends
///
/// `embed` must be callable sequentially from one thread; the extraction
/// phase of the tracker is single-threaded, so backends need no internal
/// locking.
pub trait EmbeddingBackend: Send + Sync {
    fn embed(&self, frame: &RgbImage, crop: CropRect) -> Result<Array1<f32>>;
}

/// Configuration for one embedding backend and the classes it serves
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    pub config_path: String,
    pub weights_path: String,
    pub input_layer: String,
    pub object_types: Vec<ObjectType>,
}

/// Per-class registry of embedding backends
///
/// Maps object classes to shared backend handles. Classes with no backend
/// silently produce no embedding, which downstream cost fusion treats as
/// "skip the cosine term".
#[derive(Default)]
pub struct EmbeddingExtractor {
    backends: HashMap<ObjectType, Arc<dyn EmbeddingBackend>>,
}

impl EmbeddingExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one backend for every listed object class
    pub fn register(&mut self, backend: Arc<dyn EmbeddingBackend>, object_types: &[ObjectType]) {
        for &object_type in object_types {
            self.backends.entry(object_type).or_insert_with(|| Arc::clone(&backend));
        }
    }

    /// Build a registry from backend configurations
    ///
    /// `loader` turns one config into a live backend. A failed load is
    /// reported once here and the backend is skipped; the affected classes
    /// fall back to empty embeddings. Never fatal.
    pub fn from_configs<F>(configs: &[EmbeddingConfig], loader: F) -> Self
    where
        F: Fn(&EmbeddingConfig) -> Result<Arc<dyn EmbeddingBackend>>,
    {
        let mut extractor = Self::new();
        for config in configs {
            match loader(config) {
                Ok(backend) => extractor.register(backend, &config.object_types),
                Err(err) => log::warn!(
                    "embedding backend init failed ({}, {}): {}",
                    config.config_path,
                    config.weights_path,
                    err
                ),
            }
        }
        extractor
    }

    pub fn has_backend(&self, object_type: ObjectType) -> bool {
        self.backends.contains_key(&object_type)
    }

    /// Extract the embedding of a region crop
    ///
    /// Returns `None` when no backend is registered for the class or the
    /// backend fails on this crop.
    pub fn extract(&self, frame: &RgbImage, crop: CropRect, object_type: ObjectType) -> Option<Embedding> {
        let backend = self.backends.get(&object_type)?;
        match backend.embed(frame, crop) {
            Ok(vector) if !vector.is_empty() => Some(Embedding::new(vector)),
            Ok(_) => None,
            Err(err) => {
                log::warn!("embedding extraction failed for {}: {}", object_type, err);
                None
            }
        }
    }
}

/// Cosine distance `1 - <u, v> / (|u| * |v|)` between embeddings, in [0, 1]
///
/// Uses the cached self-dot-products as the denominator. Degenerate vectors
/// (zero norm, mismatched dimension) score the maximum distance.
pub fn cosine_distance(a: &Embedding, b: &Embedding) -> f32 {
    if a.len() != b.len() || a.dot <= 0.0 || b.dot <= 0.0 {
        return 1.0;
    }
    let similarity = a.vector.dot(&b.vector) / (a.dot * b.dot).sqrt();
    (1.0 - similarity).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    struct MeanColorBackend;

    impl EmbeddingBackend for MeanColorBackend {
        fn embed(&self, frame: &RgbImage, crop: CropRect) -> Result<Array1<f32>> {
            let mut sums = [0.0f32; 3];
            let count = (crop.width * crop.height) as f32;
            for y in crop.y..crop.y + crop.height {
                for x in crop.x..crop.x + crop.width {
                    let px = frame.get_pixel(x, y);
                    for c in 0..3 {
                        sums[c] += px.0[c] as f32;
                    }
                }
            }
            Ok(Array1::from_iter(sums.iter().map(|s| s / count)))
        }
    }

    fn crop_16() -> CropRect {
        CropRect::clamped(0.0, 0.0, 16.0, 16.0, 16, 16).unwrap()
    }

    #[test]
    fn test_missing_backend_gives_none() {
        let extractor = EmbeddingExtractor::new();
        let frame = RgbImage::new(16, 16);
        assert!(extractor.extract(&frame, crop_16(), ObjectType(7)).is_none());
    }

    #[test]
    fn test_shared_backend_across_types() {
        let mut extractor = EmbeddingExtractor::new();
        let backend: Arc<dyn EmbeddingBackend> = Arc::new(MeanColorBackend);
        extractor.register(backend, &[ObjectType(0), ObjectType(1)]);

        let frame = RgbImage::from_pixel(16, 16, image::Rgb([100, 50, 25]));
        let a = extractor.extract(&frame, crop_16(), ObjectType(0)).unwrap();
        let b = extractor.extract(&frame, crop_16(), ObjectType(1)).unwrap();

        assert_eq!(a.len(), 3);
        assert_abs_diff_eq!(a.vector[0], 100.0, epsilon = 1e-4);
        assert_abs_diff_eq!(cosine_distance(&a, &b), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_failed_loader_is_skipped() {
        let configs = vec![EmbeddingConfig {
            config_path: "missing.cfg".into(),
            weights_path: "missing.weights".into(),
            input_layer: "data".into(),
            object_types: vec![ObjectType(2)],
        }];

        let extractor = EmbeddingExtractor::from_configs(&configs, |config| {
            Err(crate::error::AppearanceError::backend_init(config.config_path.clone()))
        });

        assert!(!extractor.has_backend(ObjectType(2)));
    }

    #[test]
    fn test_cosine_distance_bounds() {
        let a = Embedding::new(array![1.0, 0.0]);
        let b = Embedding::new(array![0.0, 1.0]);
        let c = Embedding::new(array![-1.0, 0.0]);

        assert_abs_diff_eq!(cosine_distance(&a, &a), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(cosine_distance(&a, &b), 1.0, epsilon = 1e-6);
        // Opposite vectors clamp at the maximum distance
        assert_abs_diff_eq!(cosine_distance(&a, &c), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cosine_distance_degenerate() {
        let a = Embedding::new(array![1.0, 2.0]);
        let zero = Embedding::new(array![0.0, 0.0]);
        let short = Embedding::new(array![1.0]);

        assert_abs_diff_eq!(cosine_distance(&a, &zero), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(cosine_distance(&a, &short), 1.0, epsilon = 1e-6);
    }
}
