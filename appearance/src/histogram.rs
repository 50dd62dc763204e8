//! Per-channel color histograms and the Bhattacharyya distance between them

use image::RgbImage;
use ndarray::Array1;

use crate::error::{AppearanceError, Result};
use crate::types::CropRect;

/// Concatenated per-channel color histogram, min-max normalized to [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram(pub Array1<f32>);

impl Histogram {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Color histogram extractor over rectangular region crops
///
/// Computes one `bins`-bucket histogram per channel over the pixel range
/// [0, 255], concatenates the channels in source order and min-max
/// normalizes the result to [0, 1].
#[derive(Debug, Clone)]
pub struct HistogramExtractor {
    pub bins: usize,
}

impl Default for HistogramExtractor {
    fn default() -> Self {
        Self { bins: 64 }
    }
}

impl HistogramExtractor {
    pub fn new(bins: usize) -> Self {
        Self { bins }
    }

    /// Extract the histogram of `crop` within `frame`
    ///
    /// A degenerate crop yields an empty histogram.
    pub fn extract(&self, frame: &RgbImage, crop: CropRect) -> Histogram {
        const CHANNELS: usize = 3;

        if crop.width == 0 || crop.height == 0 || self.bins == 0 {
            return Histogram(Array1::zeros(0));
        }

        let mut counts = Array1::<f32>::zeros(CHANNELS * self.bins);
        let bucket = 256.0 / self.bins as f32;

        for y in crop.y..crop.y + crop.height {
            for x in crop.x..crop.x + crop.width {
                let px = frame.get_pixel(x, y);
                for c in 0..CHANNELS {
                    let bin = ((px.0[c] as f32 / bucket) as usize).min(self.bins - 1);
                    counts[c * self.bins + bin] += 1.0;
                }
            }
        }

        normalize_min_max(&mut counts);
        Histogram(counts)
    }
}

/// Scale values into [0, 1]; a flat histogram collapses to all zeros
fn normalize_min_max(values: &mut Array1<f32>) {
    let min = values.iter().cloned().fold(f32::INFINITY, f32::min);
    let max = values.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    if range > 0.0 {
        values.mapv_inplace(|v| (v - min) / range);
    } else {
        values.fill(0.0);
    }
}

/// Bhattacharyya distance between two histograms, in [0, 1]
///
/// Uses the same formulation as OpenCV's `HISTCMP_BHATTACHARYYA`:
/// `sqrt(1 - sum(sqrt(a_i * b_i)) / sqrt(sum(a) * sum(b)))`. Zero means
/// identical distributions. Mismatched lengths are a programming fault and
/// are refused rather than fused into a garbage value.
pub fn bhattacharyya(a: &Histogram, b: &Histogram) -> Result<f32> {
    if a.len() != b.len() {
        return Err(AppearanceError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let sum_a: f32 = a.0.sum();
    let sum_b: f32 = b.0.sum();
    if sum_a <= 0.0 || sum_b <= 0.0 {
        return Ok(1.0);
    }

    let mut coeff = 0.0f32;
    for (&va, &vb) in a.0.iter().zip(b.0.iter()) {
        coeff += (va * vb).sqrt();
    }

    Ok((1.0 - coeff / (sum_a * sum_b).sqrt()).max(0.0).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use image::Rgb;

    fn solid_frame(w: u32, h: u32, color: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb(color))
    }

    #[test]
    fn test_histogram_shape() {
        let frame = solid_frame(64, 64, [255, 0, 128]);
        let crop = CropRect::clamped(0.0, 0.0, 64.0, 64.0, 64, 64).unwrap();
        let hist = HistogramExtractor::default().extract(&frame, crop);

        // 3 channels x 64 bins
        assert_eq!(hist.len(), 192);
        // Min-max normalization puts the populated bins at exactly 1.0
        assert_abs_diff_eq!(hist.0[63], 1.0, epsilon = 1e-6); // red channel, top bin
        assert_abs_diff_eq!(hist.0[64], 1.0, epsilon = 1e-6); // green channel, bottom bin
        assert_abs_diff_eq!(hist.0[0], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_empty_crop_gives_empty_histogram() {
        let frame = solid_frame(8, 8, [0, 0, 0]);
        let crop = CropRect {
            x: 0,
            y: 0,
            width: 0,
            height: 4,
        };
        assert!(HistogramExtractor::default().extract(&frame, crop).is_empty());
    }

    #[test]
    fn test_bhattacharyya_identical_is_zero() {
        let frame = solid_frame(16, 16, [10, 200, 40]);
        let crop = CropRect::clamped(0.0, 0.0, 16.0, 16.0, 16, 16).unwrap();
        let extractor = HistogramExtractor::default();
        let a = extractor.extract(&frame, crop);
        let b = extractor.extract(&frame, crop);

        assert_abs_diff_eq!(bhattacharyya(&a, &b).unwrap(), 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_bhattacharyya_disjoint_is_one() {
        let extractor = HistogramExtractor::default();
        let a = extractor.extract(
            &solid_frame(16, 16, [0, 0, 0]),
            CropRect::clamped(0.0, 0.0, 16.0, 16.0, 16, 16).unwrap(),
        );
        let b = extractor.extract(
            &solid_frame(16, 16, [255, 255, 255]),
            CropRect::clamped(0.0, 0.0, 16.0, 16.0, 16, 16).unwrap(),
        );

        assert_abs_diff_eq!(bhattacharyya(&a, &b).unwrap(), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_bhattacharyya_rejects_mismatched_lengths() {
        let a = Histogram(Array1::zeros(192));
        let b = Histogram(Array1::zeros(64));
        assert!(matches!(
            bhattacharyya(&a, &b),
            Err(AppearanceError::DimensionMismatch { expected: 192, actual: 64 })
        ));
    }
}
