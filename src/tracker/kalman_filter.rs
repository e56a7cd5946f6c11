//! Constant-velocity Kalman filter over a box center, using nalgebra fixed-size matrices.

use nalgebra::{Matrix2, Matrix2x4, Matrix4, Vector2, Vector4};

/// State is `(cx, cy, vx, vy)`; measurements are `(cx, cy)`.
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    motion_mat: Matrix4<f64>,
    update_mat: Matrix2x4<f64>,
    std_weight_position: f64,
    std_weight_velocity: f64,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl KalmanFilter {
    pub fn new() -> Self {
        let mut motion_mat = Matrix4::identity();
        motion_mat[(0, 2)] = 1.0;
        motion_mat[(1, 3)] = 1.0;

        let mut update_mat = Matrix2x4::zeros();
        update_mat[(0, 0)] = 1.0;
        update_mat[(1, 1)] = 1.0;

        Self {
            motion_mat,
            update_mat,
            std_weight_position: 1.0 / 20.0,
            std_weight_velocity: 1.0 / 160.0,
        }
    }

    /// Start a track at `center` with zero velocity. `scale` is the box height.
    pub fn initiate(&self, center: [f64; 2], scale: f64) -> (Vector4<f64>, Matrix4<f64>) {
        let mean = Vector4::new(center[0], center[1], 0.0, 0.0);
        let pos = 2.0 * self.std_weight_position * scale;
        let vel = 10.0 * self.std_weight_velocity * scale;
        let covariance = Matrix4::from_diagonal(&Vector4::new(
            pos * pos,
            pos * pos,
            vel * vel,
            vel * vel,
        ));
        (mean, covariance)
    }

    pub fn predict(
        &self,
        mean: &Vector4<f64>,
        covariance: &Matrix4<f64>,
        scale: f64,
    ) -> (Vector4<f64>, Matrix4<f64>) {
        let pos = self.std_weight_position * scale;
        let vel = self.std_weight_velocity * scale;
        let motion_cov =
            Matrix4::from_diagonal(&Vector4::new(pos * pos, pos * pos, vel * vel, vel * vel));

        let mean = self.motion_mat * mean;
        let covariance = self.motion_mat * covariance * self.motion_mat.transpose() + motion_cov;
        (mean, covariance)
    }

    /// Correct the state with a measured center. Returns the prior unchanged
    /// if the innovation covariance is singular.
    pub fn update(
        &self,
        mean: &Vector4<f64>,
        covariance: &Matrix4<f64>,
        measurement: [f64; 2],
        scale: f64,
    ) -> (Vector4<f64>, Matrix4<f64>) {
        let std = self.std_weight_position * scale;
        let innovation_cov = Matrix2::from_diagonal_element(std * std);

        let projected_mean = self.update_mat * mean;
        let projected_cov =
            self.update_mat * covariance * self.update_mat.transpose() + innovation_cov;

        let Some(inv) = projected_cov.try_inverse() else {
            return (*mean, *covariance);
        };
        let kalman_gain = covariance * self.update_mat.transpose() * inv;
        let innovation = Vector2::new(measurement[0], measurement[1]) - projected_mean;

        let new_mean = mean + kalman_gain * innovation;
        let new_cov = covariance - kalman_gain * projected_cov * kalman_gain.transpose();
        (new_mean, new_cov)
    }
}
