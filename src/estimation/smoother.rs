//! Backward pass — fixed-interval (Rauch–Tung–Striebel) smoother.
//!
//! Given the forward moments of [`filter`](crate::estimation::filter::filter),
//! computes for t = T−2..0 with gain `A_t = Σ_{t|t} Σ_{t+1|t}⁻¹`:
//!
//! - `θ_{t|T} = θ_{t|t} + A_t (θ_{t+1|T} − θ_{t+1|t})`
//! - `Σ_{t|T} = Σ_{t|t} + A_t (Σ_{t+1|T} − Σ_{t+1|t}) A_tᵀ`
//! - `Σ_{t+1,t|T} = Σ_{t+1|T} A_tᵀ` (lag-one cross-covariance)
//!
//! The last timestep is initialized with the filtered moments. Smoothed
//! covariances are symmetrized at every step. The gains reuse the predicted
//! precisions stored by the filter, so no factorization happens here.
use crate::{estimation::filter::FilterOutput, numerics::linalg::symmetrize};
use ndarray::{Array2, Array3, ArrayView2, Axis};

/// SmootherOutput — smoothed moments for every timestep.
///
/// - `theta_s`: `T × D` smoothed means.
/// - `sigma_s`: `T × D × D` smoothed covariances.
/// - `lag_one`: `T × D × D`; entry `t ≥ 1` is `Cov(θ_t, θ_{t−1} | y)`,
///   entry 0 is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct SmootherOutput {
    pub theta_s: Array2<f64>,
    pub sigma_s: Array3<f64>,
    pub lag_one: Array3<f64>,
}

impl SmootherOutput {
    pub fn timesteps(&self) -> usize {
        self.theta_s.nrows()
    }

    pub fn sigma_at(&self, t: usize) -> ArrayView2<'_, f64> {
        self.sigma_s.index_axis(Axis(0), t)
    }

    pub fn lag_one_at(&self, t: usize) -> ArrayView2<'_, f64> {
        self.lag_one.index_axis(Axis(0), t)
    }
}

/// smooth — run the backward pass over a completed forward pass.
pub fn smooth(filtered: &FilterOutput) -> SmootherOutput {
    let t_len = filtered.timesteps();
    let mut theta_s = filtered.theta_filt.clone();
    let mut sigma_s = filtered.sigma_filt.clone();
    let mut lag_one = Array3::<f64>::zeros(filtered.sigma_filt.raw_dim());

    for t in (0..t_len.saturating_sub(1)).rev() {
        let sigma_f = filtered.sigma_filt.index_axis(Axis(0), t);
        let gain = sigma_f.dot(&filtered.precision_pred.index_axis(Axis(0), t + 1));

        let innovation = &theta_s.row(t + 1) - &filtered.theta_pred.row(t + 1);
        let theta = &filtered.theta_filt.row(t) + &gain.dot(&innovation);

        let next = sigma_s.index_axis(Axis(0), t + 1).to_owned();
        let spread = &next - &filtered.sigma_pred.index_axis(Axis(0), t + 1);
        let mut sigma = &sigma_f + &gain.dot(&spread).dot(&gain.t());
        symmetrize(&mut sigma);
        let cross = next.dot(&gain.t());

        theta_s.row_mut(t).assign(&theta);
        sigma_s.index_axis_mut(Axis(0), t).assign(&sigma);
        lag_one.index_axis_mut(Axis(0), t + 1).assign(&cross);
    }
    SmootherOutput { theta_s, sigma_s, lag_one }
}
