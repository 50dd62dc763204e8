//! Per-track motion filter: prediction, measurement updates, gating ellipse

use anyhow::Result;
use nalgebra::{DMatrix, DVector};

use crate::kalman::{KalmanFilter, KalmanFilterParams};
use crate::region::{Bbox, Region, RotatedRect};

/// What the motion filter estimates: the region center alone, or the full
/// `(x, y, w, h)` rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterGoal {
    #[default]
    Center,
    Rect,
}

/// Minimum speed (in 3-sigma displacement pixels) before the prediction
/// ellipse is stretched along the velocity direction
const ELLIPSE_SPEED_MIN: f32 = 4.0;

/// Motion filter for one track
///
/// Wraps a linear Kalman filter over one of four state layouts
/// (center/rect goal x constant-velocity/constant-acceleration) and exposes
/// the prediction ellipse used for association gating.
#[derive(Debug, Clone)]
pub struct MotionFilter {
    kf: KalmanFilter,
    goal: FilterGoal,
    use_acceleration: bool,
    /// Last measured size, carried for the center goal whose state holds no extent
    size: (f32, f32),
    /// Predicted center after the most recent `predict()`
    predicted: (f32, f32),
}

impl MotionFilter {
    pub fn new(region: &Region, goal: FilterGoal, dt: f32, accel_noise_mag: f32, use_acceleration: bool) -> Self {
        let center = (region.rrect.cx, region.rrect.cy);
        let size = (region.brect.width(), region.brect.height());

        let observed = match goal {
            FilterGoal::Center => vec![center.0, center.1],
            FilterGoal::Rect => vec![center.0, center.1, size.0, size.1],
        };
        let dim_z = observed.len();
        // Only the center coordinates get acceleration terms
        let dim_x = dim_z * 2 + if use_acceleration { 2 } else { 0 };

        let mut x = DVector::zeros(dim_x);
        for (i, &v) in observed.iter().enumerate() {
            x[i] = v;
        }

        // Transition: each observed coordinate integrates its velocity,
        // center coordinates additionally integrate acceleration
        let mut f = DMatrix::identity(dim_x, dim_x);
        for i in 0..dim_z {
            f[(i, dim_z + i)] = dt;
        }
        if use_acceleration {
            for i in 0..2 {
                f[(i, 2 * dim_z + i)] = 0.5 * dt * dt;
                f[(dim_z + i, 2 * dim_z + i)] = dt;
            }
        }

        let mut h = DMatrix::zeros(dim_z, dim_x);
        for i in 0..dim_z {
            h[(i, i)] = 1.0;
        }

        // Process noise driven by the configured acceleration magnitude
        let mag2 = accel_noise_mag * accel_noise_mag;
        let mut q_diag = DVector::zeros(dim_x);
        for i in 0..dim_z {
            q_diag[i] = mag2 * dt.powi(4) / 4.0;
            q_diag[dim_z + i] = mag2 * dt * dt;
        }
        for i in 2 * dim_z..dim_x {
            q_diag[i] = mag2;
        }

        let mut r_diag = DVector::from_element(dim_z, 1.0);
        if dim_z == 4 {
            // Size measurements are noisier than centers
            r_diag[2] = 10.0;
            r_diag[3] = 10.0;
        }

        let mut p_diag = DVector::from_element(dim_x, 10.0);
        for i in dim_z..dim_x {
            p_diag[i] = 10_000.0;
        }

        let kf = KalmanFilter::new(KalmanFilterParams {
            dim_x,
            dim_z,
            x,
            p: DMatrix::from_diagonal(&p_diag),
            f,
            h,
            r: DMatrix::from_diagonal(&r_diag),
            q: DMatrix::from_diagonal(&q_diag),
        });

        Self {
            kf,
            goal,
            use_acceleration,
            size,
            predicted: center,
        }
    }

    /// Advance the filter to the current time step
    pub fn predict(&mut self) {
        self.kf.predict();
        self.predicted = (self.kf.x[0], self.kf.x[1]);
    }

    /// Fold an observed region into the state
    pub fn update(&mut self, region: &Region) -> Result<()> {
        let center = (region.rrect.cx, region.rrect.cy);
        self.size = (region.brect.width(), region.brect.height());

        let z = match self.goal {
            FilterGoal::Center => DVector::from_vec(vec![center.0, center.1]),
            FilterGoal::Rect => DVector::from_vec(vec![center.0, center.1, self.size.0, self.size.1]),
        };
        self.kf.update(&z)?;
        self.predicted = (self.kf.x[0], self.kf.x[1]);
        Ok(())
    }

    /// Advance with no measurement: the prediction is fed back as a
    /// pseudo-observation so the covariance stays bounded over long gaps
    pub fn update_skipped(&mut self) -> Result<()> {
        let z = self.kf.measurement();
        self.kf.update(&z)?;
        self.predicted = (self.kf.x[0], self.kf.x[1]);
        Ok(())
    }

    pub fn predicted_center(&self) -> (f32, f32) {
        self.predicted
    }

    /// Smoothed center velocity, pixels per step
    pub fn velocity(&self) -> (f32, f32) {
        let dim_z = match self.goal {
            FilterGoal::Center => 2,
            FilterGoal::Rect => 4,
        };
        (self.kf.x[dim_z], self.kf.x[dim_z + 1])
    }

    /// Smoothed bounding rectangle of the current state
    pub fn current_rect(&self) -> Bbox<f32> {
        let (cx, cy) = (self.kf.x[0], self.kf.x[1]);
        let (w, h) = match self.goal {
            FilterGoal::Center => self.size,
            FilterGoal::Rect => (self.kf.x[2].max(0.0), self.kf.x[3].max(0.0)),
        };
        Bbox::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
    }

    /// Gating ellipse around the predicted center
    ///
    /// Half-axes are at least `min_radius` in each direction; once the
    /// 3-sigma displacement is significant the ellipse stretches along the
    /// velocity direction.
    pub fn prediction_ellipse(&self, min_radius: (f32, f32)) -> RotatedRect {
        let (vx, vy) = self.velocity();
        let dx = 3.0 * vx;
        let dy = 3.0 * vy;

        let mut half_x = min_radius.0.max(dx.abs());
        let mut half_y = min_radius.1.max(dy.abs());
        let mut angle_deg = 0.0;
        if dx.abs() + dy.abs() > ELLIPSE_SPEED_MIN {
            let reach = (dx * dx + dy * dy).sqrt();
            half_x = min_radius.0.max(reach);
            half_y = min_radius.1.max(reach / 2.0);
            angle_deg = dy.atan2(dx).to_degrees();
        }

        RotatedRect::new(self.predicted.0, self.predicted.1, 2.0 * half_x, 2.0 * half_y, angle_deg)
    }

    pub fn is_acceleration_model(&self) -> bool {
        self.use_acceleration
    }
}

/// Unit-normalized radial distance of `point` from the ellipse center
///
/// Values <= 1 are inside the ellipse; the value scales linearly with the
/// radial offset, so it doubles as a smooth closeness term in cost fusion.
pub fn ellipse_distance(point: (f32, f32), ellipse: &RotatedRect) -> f32 {
    let a = ellipse.width / 2.0;
    let b = ellipse.height / 2.0;
    if a <= 0.0 || b <= 0.0 {
        return f32::INFINITY;
    }

    let (sin, cos) = ellipse.angle_deg.to_radians().sin_cos();
    let dx = point.0 - ellipse.cx;
    let dy = point.1 - ellipse.cy;
    let u = dx * cos + dy * sin;
    let v = -dx * sin + dy * cos;

    ((u / a).powi(2) + (v / b).powi(2)).sqrt()
}
