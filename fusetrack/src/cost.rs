//! Fusion of geometric and appearance distances into the assignment cost matrix

use appearance::RegionEmbedding;
use ndarray::Array2;

use crate::region::Region;
use crate::settings::TrackerSettings;
use crate::track::Track;

/// Builds the N x M track-to-region cost matrix
///
/// Rows are tracks, columns are regions. Incompatible class pairs cost
/// `frame_width * frame_height`, a guaranteed upper bound on any fused
/// distance sum; everything else accumulates the enabled weighted terms in
/// the fixed order centers, rects, jaccard, hist, feature-cos.
pub struct CostMatrixBuilder;

impl CostMatrixBuilder {
    /// Returns the cost matrix together with the largest entry observed,
    /// which the Hungarian solver uses as its padding bound
    pub fn build(
        tracks: &[Track],
        regions: &[Region],
        embeddings: &[RegionEmbedding],
        settings: &TrackerSettings,
        frame_width: f32,
        frame_height: f32,
    ) -> (Array2<f32>, f32) {
        let num_tracks = tracks.len();
        let num_regions = regions.len();
        let max_possible_cost = frame_width * frame_height;
        let weights = &settings.dist_weights;

        let mut cost = Array2::<f32>::zeros((num_tracks, num_regions));
        let mut max_cost = 0.0f32;

        for (i, track) in tracks.iter().enumerate() {
            // Predicted gating area, shared by every candidate of this track
            let last_rrect = &track.last_region().rrect;
            let min_radius = if settings.min_area_radius_pix < 0.0 {
                (
                    settings.min_area_radius_k * last_rrect.width,
                    settings.min_area_radius_k * last_rrect.height,
                )
            } else {
                (settings.min_area_radius_pix, settings.min_area_radius_pix)
            };
            let ellipse = track.calc_prediction_ellipse(min_radius);

            for (j, region) in regions.iter().enumerate() {
                let mut dist = max_possible_cost;

                if settings.check_type(track.object_type(), region.object_type) {
                    dist = 0.0;
                    let ellipse_dist = track.is_inside_area(region.rrect.center(), &ellipse);

                    if weights.centers > 0.0 {
                        if ellipse_dist > 1.0 {
                            dist += weights.centers;
                        } else {
                            dist += weights.centers * ellipse_dist;
                        }
                    }

                    if weights.rects > 0.0 {
                        if ellipse_dist < 1.0 {
                            let dw = track.width_ratio(region);
                            let dh = track.height_ratio(region);
                            dist += weights.rects * (1.0 - (1.0 - ellipse_dist) * (dw + dh) * 0.5);
                        } else {
                            dist += weights.rects;
                        }
                    }

                    if weights.jaccard > 0.0 {
                        dist += weights.jaccard * track.dist_jaccard(region);
                    }

                    if weights.hist > 0.0 {
                        if let Some(d) = embeddings.get(j).and_then(|re| track.dist_hist(re)) {
                            dist += weights.hist * d;
                        }
                    }

                    if weights.feature_cos > 0.0 && region.object_type == track.object_type() {
                        if let Some(d) = embeddings.get(j).and_then(|re| track.dist_cosine(re)) {
                            dist += weights.feature_cos * d;
                        }
                    }
                }

                cost[[i, j]] = dist;
                if dist > max_cost {
                    max_cost = dist;
                }
            }
        }

        (cost, max_cost)
    }
}
