//! Linear Kalman filter core used by the per-track motion filter

use anyhow::Result;
use nalgebra::{DMatrix, DVector};

/// Construction parameters for a linear Kalman filter
#[derive(Debug, Clone)]
pub struct KalmanFilterParams {
    pub dim_x: usize,    // State dimension
    pub dim_z: usize,    // Observation dimension
    pub x: DVector<f32>, // Initial state
    pub p: DMatrix<f32>, // Initial state covariance
    pub f: DMatrix<f32>, // State transition matrix
    pub h: DMatrix<f32>, // Observation matrix
    pub r: DMatrix<f32>, // Observation noise covariance
    pub q: DMatrix<f32>, // Process noise covariance
}

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    pub dim_x: usize,
    pub dim_z: usize,
    pub x: DVector<f32>, // State vector
    pub p: DMatrix<f32>, // State covariance matrix
    pub f: DMatrix<f32>, // State transition matrix
    pub h: DMatrix<f32>, // Observation matrix
    pub r: DMatrix<f32>, // Observation noise covariance
    pub q: DMatrix<f32>, // Process noise covariance
}

impl KalmanFilter {
    pub fn new(params: KalmanFilterParams) -> Self {
        Self {
            dim_x: params.dim_x,
            dim_z: params.dim_z,
            x: params.x,
            p: params.p,
            f: params.f,
            h: params.h,
            r: params.r,
            q: params.q,
        }
    }

    /// Advance the state one time step
    pub fn predict(&mut self) {
        // x = F * x
        self.x = &self.f * &self.x;

        // P = F * P * F^T + Q
        self.p = &self.f * &self.p * self.f.transpose() + &self.q;
    }

    /// Fold an observation into the state
    pub fn update(&mut self, z: &DVector<f32>) -> Result<()> {
        // Residual: y = z - H * x
        let y = z - &self.h * &self.x;

        // Innovation covariance: S = H * P * H^T + R
        let s = &self.h * &self.p * self.h.transpose() + &self.r;

        // Kalman gain: K = P * H^T * S^-1
        let s_inv = s
            .try_inverse()
            .ok_or_else(|| anyhow::anyhow!("Failed to invert innovation covariance matrix"))?;
        let k = &self.p * self.h.transpose() * s_inv;

        // State and covariance update
        self.x = &self.x + &k * y;
        let i = DMatrix::identity(self.dim_x, self.dim_x);
        self.p = (i - k * &self.h) * &self.p;

        Ok(())
    }

    /// Current measurement-space projection of the state
    pub fn measurement(&self) -> DVector<f32> {
        &self.h * &self.x
    }

    pub fn state(&self) -> &DVector<f32> {
        &self.x
    }
}
