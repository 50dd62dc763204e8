//! Frame-loop orchestrator: association, lifecycle, parallel track updates

use anyhow::Result;
use appearance::{EmbeddingExtractor, HistogramExtractor, RegionEmbedding};
use image::RgbImage;
use rayon::prelude::*;

use crate::bipartite::BipartSolver;
use crate::cost::CostMatrixBuilder;
use crate::hungarian::HungarianSolver;
use crate::region::Region;
use crate::settings::{MatchType, TrackerSettings};
use crate::track::Track;

/// Multi-object tracker
///
/// Owns the full track set and assimilates one region set per frame:
/// extract appearance, build the fused cost matrix, solve the assignment,
/// gate, retire, birth, then update every surviving track. `update` is not
/// reentrant; callers serialize frames.
pub struct Tracker {
    settings: TrackerSettings,
    tracks: Vec<Track>,
    next_track_id: u32,
    prev_frame: Option<RgbImage>,
    histograms: HistogramExtractor,
    embeddings: EmbeddingExtractor,
}

impl Tracker {
    /// Build a tracker from validated settings and an embedding registry
    ///
    /// Backends for the registry come from `settings.embeddings` via
    /// `EmbeddingExtractor::from_configs`; a tracker without appearance
    /// terms can pass an empty registry.
    pub fn new(settings: TrackerSettings, embeddings: EmbeddingExtractor) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            tracks: Vec::new(),
            next_track_id: 0,
            prev_frame: None,
            histograms: HistogramExtractor::default(),
            embeddings,
        })
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    /// The frame handed to the previous `update` call, if any
    pub fn prev_frame(&self) -> Option<&RgbImage> {
        self.prev_frame.as_ref()
    }

    /// Assimilate one frame's detections
    pub fn update(&mut self, regions: &[Region], curr_frame: &RgbImage, fps: f32) -> Result<()> {
        let frame_width = curr_frame.width() as f32;
        let frame_height = curr_frame.height() as f32;

        // Step 1: appearance descriptors, only for enabled terms
        let region_embeddings = self.extract_embeddings(regions, curr_frame);

        let mut assignment: Vec<Option<usize>> = vec![None; self.tracks.len()];

        if !self.tracks.is_empty() {
            // Steps 2-3: cost fusion and assignment
            if !regions.is_empty() {
                let (cost, max_cost) = CostMatrixBuilder::build(
                    &self.tracks,
                    regions,
                    &region_embeddings,
                    &self.settings,
                    frame_width,
                    frame_height,
                );

                assignment = match self.settings.match_type {
                    MatchType::Hungarian => HungarianSolver::solve(cost.view(), max_cost),
                    MatchType::Bipart => BipartSolver::solve(cost.view(), self.settings.dist_threshold),
                };

                // Step 4: gate out expensive associations; a voided
                // assignment counts as a skipped frame
                for i in 0..assignment.len() {
                    match assignment[i] {
                        Some(j) => {
                            if cost[[i, j]] > self.settings.dist_threshold {
                                assignment[i] = None;
                                self.tracks[i].mark_skipped();
                            }
                        }
                        None => self.tracks[i].mark_skipped(),
                    }
                }
            } else {
                for track in &mut self.tracks {
                    track.mark_skipped();
                }
            }

            // Step 5: retirement, removing track and assignment slot in
            // lock-step
            let static_window =
                (fps * (self.settings.max_static_time - self.settings.min_static_time)).round() as u32;
            let mut i = 0;
            while i < self.tracks.len() {
                let track = &self.tracks[i];
                if track.skipped_frames() > self.settings.maximum_allowed_skipped_frames
                    || track.is_out_of_frame(frame_width, frame_height)
                    || track.is_static_timeout(static_window)
                {
                    log::info!("retiring track {} (skipped {})", track.id(), track.skipped_frames());
                    self.tracks.remove(i);
                    assignment.remove(i);
                } else {
                    i += 1;
                }
            }
        }

        // Step 6: birth a track for every region no survivor claimed
        for (j, region) in regions.iter().enumerate() {
            if !assignment.contains(&Some(j)) {
                self.tracks.push(Track::new(
                    region.clone(),
                    region_embeddings.get(j),
                    self.next_track_id,
                    &self.settings,
                ));
                self.next_track_id += 1;
            }
        }

        // Step 7: per-track state advance; disjoint indices, no shared
        // mutable state, so the loop parallelizes freely
        let abandoned_window = if self.settings.use_abandoned_detection {
            (self.settings.min_static_time * fps).round() as usize
        } else {
            0
        };
        let max_trace_length = self.settings.max_trace_length;
        let max_static_speed = self.settings.max_speed_for_static;

        let (survivors, _newborn) = self.tracks.split_at_mut(assignment.len());
        survivors
            .par_iter_mut()
            .zip(assignment.par_iter())
            .try_for_each(|(track, slot)| match slot {
                Some(j) => track.update(
                    Some(&regions[*j]),
                    region_embeddings.get(*j),
                    max_trace_length,
                    abandoned_window,
                    max_static_speed,
                ),
                None => track.update(None, None, max_trace_length, abandoned_window, max_static_speed),
            })?;

        // Step 8: keep the frame for the next call
        self.prev_frame = Some(curr_frame.clone());
        Ok(())
    }

    /// Per-region appearance descriptors for the terms that are enabled
    ///
    /// Returns an empty vector when both appearance weights are zero, so a
    /// purely geometric tracker never touches pixels.
    fn extract_embeddings(&self, regions: &[Region], curr_frame: &RgbImage) -> Vec<RegionEmbedding> {
        let want_hist = self.settings.dist_weights.hist > 0.0;
        let want_embedding = self.settings.dist_weights.feature_cos > 0.0;
        if regions.is_empty() || !self.settings.dist_weights.uses_appearance() {
            return Vec::new();
        }

        regions
            .iter()
            .map(|region| {
                let crop = region.brect.to_crop(curr_frame.width(), curr_frame.height());

                let hist = if want_hist {
                    crop.map(|c| self.histograms.extract(curr_frame, c))
                        .filter(|h| !h.is_empty())
                } else {
                    None
                };

                let embedding = if want_embedding {
                    crop.and_then(|c| self.embeddings.extract(curr_frame, c, region.object_type))
                } else {
                    None
                };

                RegionEmbedding { hist, embedding }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::Bbox;
    use appearance::ObjectType;

    fn frame() -> RgbImage {
        RgbImage::new(640, 480)
    }

    fn region(x: f32, y: f32) -> Region {
        Region::new(Bbox::from_xywh(x, y, 20.0, 20.0), ObjectType(0), 0.9)
    }

    fn tracker() -> Tracker {
        Tracker::new(TrackerSettings::default(), EmbeddingExtractor::new()).unwrap()
    }

    #[test]
    fn test_first_frame_births_all_regions() {
        let mut tracker = tracker();
        tracker
            .update(&[region(10.0, 10.0), region(200.0, 200.0)], &frame(), 25.0)
            .unwrap();

        assert_eq!(tracker.len(), 2);
        let ids: Vec<u32> = tracker.tracks().iter().map(Track::id).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn test_empty_frame_marks_all_skipped() {
        let mut tracker = tracker();
        tracker.update(&[region(10.0, 10.0)], &frame(), 25.0).unwrap();
        tracker.update(&[], &frame(), 25.0).unwrap();

        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.tracks()[0].skipped_frames(), 1);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut settings = TrackerSettings::default();
        settings.dt = 0.0;
        assert!(Tracker::new(settings, EmbeddingExtractor::new()).is_err());
    }

    #[test]
    fn test_no_pixels_touched_without_appearance_terms() {
        // Geometric-only settings must not allocate descriptors
        let tracker = tracker();
        let embeddings = tracker.extract_embeddings(&[region(10.0, 10.0)], &frame());
        assert!(embeddings.is_empty());
    }

    #[test]
    fn test_hist_weight_allocates_descriptors() {
        let mut settings = TrackerSettings::default();
        settings.dist_weights.hist = 0.5;
        let tracker = Tracker::new(settings, EmbeddingExtractor::new()).unwrap();

        let embeddings = tracker.extract_embeddings(&[region(10.0, 10.0)], &frame());
        assert_eq!(embeddings.len(), 1);
        assert!(embeddings[0].hist.is_some());
        assert!(embeddings[0].embedding.is_none());
    }
}
