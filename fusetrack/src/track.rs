//! One tracked identity: motion state, bounded trace, appearance memory

use anyhow::Result;
use appearance::{bhattacharyya, cosine_distance, Embedding, Histogram, RegionEmbedding};

use crate::motion::{ellipse_distance, MotionFilter};
use crate::region::{calculate_iou, Region, RotatedRect};
use crate::settings::TrackerSettings;

/// A persistent identity accumulating regions over time
///
/// Owned exclusively by the tracker; the public accessors are the read
/// surface exposed to callers after each frame.
#[derive(Debug, Clone)]
pub struct Track {
    id: u32,
    filter: MotionFilter,
    last_region: Region,
    trace: Vec<(f32, f32)>,
    skipped_frames: u32,
    static_frames: u32,
    stored_hist: Option<Histogram>,
    stored_embedding: Option<Embedding>,
    hist_ema_alpha: f32,
    embedding_ema_alpha: f32,
}

impl Track {
    /// Birth a track from an unassigned region
    pub fn new(region: Region, embedding: Option<&RegionEmbedding>, id: u32, settings: &TrackerSettings) -> Self {
        let filter = MotionFilter::new(
            &region,
            settings.filter_goal,
            settings.dt,
            settings.accel_noise_mag,
            settings.use_acceleration,
        );

        let mut track = Self {
            id,
            filter,
            trace: vec![(region.rrect.cx, region.rrect.cy)],
            last_region: region,
            skipped_frames: 0,
            static_frames: 0,
            stored_hist: None,
            stored_embedding: None,
            hist_ema_alpha: settings.hist_ema_alpha,
            embedding_ema_alpha: settings.embedding_ema_alpha,
        };
        if let Some(embedding) = embedding {
            track.stored_hist = embedding.hist.clone();
            track.stored_embedding = embedding.embedding.clone();
        }
        track
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn last_region(&self) -> &Region {
        &self.last_region
    }

    pub fn trace(&self) -> &[(f32, f32)] {
        &self.trace
    }

    pub fn skipped_frames(&self) -> u32 {
        self.skipped_frames
    }

    pub fn static_frames(&self) -> u32 {
        self.static_frames
    }

    pub fn object_type(&self) -> appearance::ObjectType {
        self.last_region.object_type
    }

    pub(crate) fn stored_embedding(&self) -> Option<&Embedding> {
        self.stored_embedding.as_ref()
    }

    /// Count one frame without an association (gating or empty frame)
    pub(crate) fn mark_skipped(&mut self) {
        self.skipped_frames += 1;
    }

    /// Gating ellipse around the predicted center for the next frame
    pub fn calc_prediction_ellipse(&self, min_radius: (f32, f32)) -> RotatedRect {
        self.filter.prediction_ellipse(min_radius)
    }

    /// Unit-normalized radial distance of a point from a gating ellipse
    pub fn is_inside_area(&self, point: (f32, f32), ellipse: &RotatedRect) -> f32 {
        ellipse_distance(point, ellipse)
    }

    /// Center displacement against the prediction, normalized by the last
    /// region's diagonal and saturating at 1
    pub fn dist_center(&self, region: &Region) -> f32 {
        let (px, py) = self.filter.predicted_center();
        let dx = region.rrect.cx - px;
        let dy = region.rrect.cy - py;
        let displacement = (dx * dx + dy * dy).sqrt();

        let diagonal = (self.last_region.brect.width().powi(2) + self.last_region.brect.height().powi(2)).sqrt();
        if diagonal > 0.0 {
            (displacement / diagonal).min(1.0)
        } else if displacement > 0.0 {
            1.0
        } else {
            0.0
        }
    }

    /// Width agreement in [0, 1]; 1 means identical widths
    pub fn width_ratio(&self, region: &Region) -> f32 {
        size_ratio(self.last_region.rrect.width, region.rrect.width)
    }

    /// Height agreement in [0, 1]; 1 means identical heights
    pub fn height_ratio(&self, region: &Region) -> f32 {
        size_ratio(self.last_region.rrect.height, region.rrect.height)
    }

    /// Combined width/height mismatch in [0, 1]
    pub fn dist_rect(&self, region: &Region) -> f32 {
        1.0 - (self.width_ratio(region) + self.height_ratio(region)) * 0.5
    }

    /// 1 - IoU of the bounding boxes
    pub fn dist_jaccard(&self, region: &Region) -> f32 {
        1.0 - calculate_iou(&self.last_region.brect, &region.brect)
    }

    /// Bhattacharyya distance against the stored histogram
    ///
    /// `None` when either histogram is missing or the dimensions disagree;
    /// the caller skips the term rather than fusing a garbage value.
    pub fn dist_hist(&self, embedding: &RegionEmbedding) -> Option<f32> {
        let stored = self.stored_hist.as_ref()?;
        let candidate = embedding.hist.as_ref()?;
        match bhattacharyya(stored, candidate) {
            Ok(dist) => Some(dist),
            Err(err) => {
                log::warn!("track {}: histogram fusion refused: {}", self.id, err);
                None
            }
        }
    }

    /// Cosine distance against the stored embedding, `None` when either
    /// side has no embedding
    pub fn dist_cosine(&self, embedding: &RegionEmbedding) -> Option<f32> {
        let stored = self.stored_embedding.as_ref()?;
        let candidate = embedding.embedding.as_ref()?;
        Some(cosine_distance(stored, candidate))
    }

    /// Per-frame state advance
    ///
    /// With a region: predict, ingest the measurement, reset the skipped
    /// counter and fold the region's appearance into the stored descriptors.
    /// Without: predict and coast (the skipped counter was already advanced
    /// during gating). Both paths append the smoothed center to the trace
    /// and refresh the static counter.
    pub fn update(
        &mut self,
        region: Option<&Region>,
        embedding: Option<&RegionEmbedding>,
        max_trace_length: usize,
        abandoned_window: usize,
        max_static_speed: f32,
    ) -> Result<()> {
        self.filter.predict();

        match region {
            Some(region) => {
                self.filter.update(region)?;
                self.skipped_frames = 0;

                let smoothed = self.filter.current_rect();
                self.last_region = Region {
                    rrect: RotatedRect::from_bbox(&smoothed),
                    brect: smoothed,
                    object_type: region.object_type,
                    confidence: region.confidence,
                };

                if let Some(embedding) = embedding {
                    self.merge_appearance(embedding);
                }
            }
            None => {
                self.filter.update_skipped()?;

                let smoothed = self.filter.current_rect();
                self.last_region.rrect = RotatedRect::from_bbox(&smoothed);
                self.last_region.brect = smoothed;
            }
        }

        let center = (self.last_region.rrect.cx, self.last_region.rrect.cy);
        self.trace.push(center);
        if self.trace.len() > max_trace_length {
            let excess = self.trace.len() - max_trace_length;
            self.trace.drain(..excess);
        }

        self.refresh_static_counter(abandoned_window, max_static_speed);
        Ok(())
    }

    /// True when the smoothed region left the frame entirely
    pub fn is_out_of_frame(&self, frame_width: f32, frame_height: f32) -> bool {
        self.last_region.brect.is_outside_frame(frame_width, frame_height)
    }

    /// True once the track has sat still for `window` frames
    pub fn is_static_timeout(&self, window: u32) -> bool {
        window > 0 && self.static_frames >= window
    }

    /// Abandoned-object side channel: the track counts as static after
    /// `min_window` near-motionless frames
    pub fn is_static(&self, min_window: u32) -> bool {
        min_window > 0 && self.static_frames >= min_window
    }

    fn refresh_static_counter(&mut self, abandoned_window: usize, max_static_speed: f32) {
        if abandoned_window == 0 || self.trace.len() < abandoned_window {
            self.static_frames = 0;
            return;
        }

        let oldest = self.trace[self.trace.len() - abandoned_window];
        let newest = self.trace[self.trace.len() - 1];
        let displacement = ((newest.0 - oldest.0).powi(2) + (newest.1 - oldest.1).powi(2)).sqrt();
        if displacement < max_static_speed {
            self.static_frames += 1;
        } else {
            self.static_frames = 0;
        }
    }

    fn merge_appearance(&mut self, embedding: &RegionEmbedding) {
        if let Some(new_hist) = &embedding.hist {
            match &mut self.stored_hist {
                Some(stored) if stored.len() == new_hist.len() => {
                    let alpha = self.hist_ema_alpha;
                    stored.0.zip_mut_with(&new_hist.0, |s, &n| *s = (1.0 - alpha) * *s + alpha * n);
                }
                Some(stored) => {
                    log::warn!(
                        "track {}: stored histogram length {} != new {}, replacing",
                        self.id,
                        stored.len(),
                        new_hist.len()
                    );
                    *stored = new_hist.clone();
                }
                None => self.stored_hist = Some(new_hist.clone()),
            }
        }

        if let Some(new_embedding) = &embedding.embedding {
            match &self.stored_embedding {
                Some(stored) if stored.len() == new_embedding.len() => {
                    let alpha = self.embedding_ema_alpha;
                    let merged = stored.vector.clone() * (1.0 - alpha) + &new_embedding.vector * alpha;
                    self.stored_embedding = Some(Embedding::new(merged));
                }
                _ => self.stored_embedding = Some(new_embedding.clone()),
            }
        }
    }
}

fn size_ratio(a: f32, b: f32) -> f32 {
    let max = a.max(b);
    if max <= 0.0 {
        1.0
    } else {
        a.min(b) / max
    }
}
