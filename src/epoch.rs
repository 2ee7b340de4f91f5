//! Event-locked epochs with baseline correction.
//!
//! For an event at sample `sp` and sample rate `sr`:
//!
//! ```text
//!   start = sp − floor(baseline_secs × sr)
//!   end   = sp + floor(trial_secs × sr)
//!
//!   signal[:, start .. sp]    baseline window
//!   signal[:, start .. end]   full window
//! ```
//!
//! Windows, baseline means and the corrected window are computed on first
//! access and cached in the [`Epoch`]. The signal matrix is borrowed and
//! never changes after load, so nothing is invalidated.
//!
//! A NaN inside a window means the signal was decoded wrongly; it panics
//! instead of producing an epoch.
use std::cell::OnceCell;

use ndarray::{s, Array1, Array2, Array3, ArrayView2, Axis};

use crate::config::EpochConfig;
use crate::error::EpochError;

// ── Window bounds ────────────────────────────────────────────────────────

/// Sample bounds of one epoch, already checked against the recording.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochWindow {
    pub sample_point: usize,
    pub sample_rate:  f64,
    /// First sample of the baseline (inclusive).
    pub start: usize,
    /// One past the last sample of the trial.
    pub end:   usize,
}

impl EpochWindow {
    /// Bounds for an event at `sample_point` in a recording of `n_samples`.
    ///
    /// # Errors
    /// * [`EpochError::DegenerateSampleRate`] when the baseline would hold no
    ///   samples (rate ≤ 0, non-finite, or too low for the baseline length).
    /// * [`EpochError::OutOfBounds`] when the window does not fit the recording.
    pub fn new(
        sample_point: usize,
        sample_rate: f64,
        cfg: &EpochConfig,
        n_samples: usize,
    ) -> Result<Self, EpochError> {
        let n_base  = cfg.baseline_samples(sample_rate);
        let n_trial = cfg.trial_samples(sample_rate);
        if n_base == 0 {
            return Err(EpochError::DegenerateSampleRate(sample_rate));
        }
        let start = sample_point as i64 - n_base as i64;
        let end   = sample_point as i64 + n_trial as i64;
        if start < 0 || end > n_samples as i64 {
            return Err(EpochError::OutOfBounds { start, end, n_samples });
        }
        Ok(EpochWindow {
            sample_point,
            sample_rate,
            start: start as usize,
            end:   end as usize,
        })
    }

    /// Samples in the full window.
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// Samples in the baseline window.
    #[inline]
    pub fn baseline_len(&self) -> usize {
        self.sample_point - self.start
    }

    /// Time of each window sample relative to the event, in seconds.
    pub fn times(&self) -> Array1<f64> {
        (self.start..self.end)
            .map(|t| (t as f64 - self.sample_point as f64) / self.sample_rate)
            .collect()
    }
}

// ── Epoch ────────────────────────────────────────────────────────────────

/// One event-locked epoch over a borrowed `[C, T]` signal.
#[derive(Debug)]
pub struct Epoch<'a> {
    pub window: EpochWindow,
    signal: ArrayView2<'a, f64>,
    baseline:              OnceCell<ArrayView2<'a, f64>>,
    full:                  OnceCell<ArrayView2<'a, f64>>,
    baseline_channel_mean: OnceCell<Array1<f64>>,
    baseline_mean:         OnceCell<f64>,
    corrected:             OnceCell<Array2<f64>>,
}

impl<'a> Epoch<'a> {
    /// Cut an epoch around `sample_point` from `signal` (`[C, T]`).
    pub fn new(
        signal: ArrayView2<'a, f64>,
        sample_point: usize,
        sample_rate: f64,
        cfg: &EpochConfig,
    ) -> Result<Self, EpochError> {
        let window = EpochWindow::new(sample_point, sample_rate, cfg, signal.ncols())?;
        Ok(Epoch {
            window,
            signal,
            baseline: OnceCell::new(),
            full: OnceCell::new(),
            baseline_channel_mean: OnceCell::new(),
            baseline_mean: OnceCell::new(),
            corrected: OnceCell::new(),
        })
    }

    /// `signal[:, start .. sample_point]`.
    ///
    /// # Panics
    /// If the window contains NaN.
    pub fn baseline(&self) -> ArrayView2<'a, f64> {
        *self.baseline.get_or_init(|| {
            let w = &self.window;
            let view = self.signal.slice_move(s![.., w.start..w.sample_point]);
            assert_no_nan(&view, "baseline", w.sample_point);
            view
        })
    }

    /// `signal[:, start .. end]`.
    ///
    /// # Panics
    /// If the window contains NaN.
    pub fn full(&self) -> ArrayView2<'a, f64> {
        *self.full.get_or_init(|| {
            let w = &self.window;
            let view = self.signal.slice_move(s![.., w.start..w.end]);
            assert_no_nan(&view, "epoch", w.sample_point);
            view
        })
    }

    /// Mean of the baseline over time, one value per channel.
    pub fn baseline_channel_mean(&self) -> &Array1<f64> {
        self.baseline_channel_mean.get_or_init(|| {
            // Baseline has ≥ 1 sample by construction of the window.
            self.baseline()
                .mean_axis(Axis(1))
                .unwrap_or_else(|| Array1::zeros(self.signal.nrows()))
        })
    }

    /// Mean of the whole baseline window.
    pub fn baseline_mean(&self) -> f64 {
        *self.baseline_mean.get_or_init(|| self.baseline().mean().unwrap_or(0.0))
    }

    /// Full window minus the per-channel baseline mean.
    pub fn corrected(&self) -> &Array2<f64> {
        self.corrected.get_or_init(|| {
            let means = self.baseline_channel_mean();
            let mut out = self.full().to_owned();
            for (mut row, &m) in out.rows_mut().into_iter().zip(means.iter()) {
                row.mapv_inplace(|v| v - m);
            }
            out
        })
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.window.sample_rate
    }

    #[inline]
    pub fn start_sample(&self) -> usize {
        self.window.start
    }

    #[inline]
    pub fn end_sample(&self) -> usize {
        self.window.end
    }
}

/// Stack the corrected windows of equally long epochs into `[E, C, T]`.
///
/// Returns `None` when the epochs differ in shape.
pub fn stack_corrected(epochs: &[Epoch<'_>]) -> Option<Array3<f64>> {
    let Some(first) = epochs.first() else {
        return Some(Array3::zeros((0, 0, 0)));
    };
    let (n_ch, n_t) = first.corrected().dim();
    let mut out = Array3::<f64>::zeros((epochs.len(), n_ch, n_t));
    for (e, ep) in epochs.iter().enumerate() {
        let c = ep.corrected();
        if c.dim() != (n_ch, n_t) {
            return None;
        }
        out.slice_mut(s![e, .., ..]).assign(c);
    }
    Some(out)
}

/// True when any element is NaN.
pub fn has_nan(view: &ArrayView2<'_, f64>) -> bool {
    view.iter().any(|v| v.is_nan())
}

fn assert_no_nan(view: &ArrayView2<'_, f64>, what: &str, sample_point: usize) {
    assert!(
        !has_nan(view),
        "data integrity: NaN in {what} window of event at sample {sample_point}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ramp(n_ch: usize, n_t: usize) -> Array2<f64> {
        Array2::from_shape_fn((n_ch, n_t), |(c, t)| (c * 1000 + t) as f64)
    }

    #[test]
    fn window_bounds_at_1000_hz() {
        let w = EpochWindow::new(500, 1000.0, &EpochConfig::default(), 2000).unwrap();
        assert_eq!((w.start, w.end), (400, 1200));
        assert_eq!(w.baseline_len(), 100);
        assert_eq!(w.len(), 800);
        let t = w.times();
        assert_abs_diff_eq!(t[0], -0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(t[100], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_sample_rates_are_rejected() {
        let cfg = EpochConfig::default();
        for sr in [0.0, -256.0, 5.0, f64::NAN, f64::INFINITY] {
            let err = EpochWindow::new(500, sr, &cfg, 2000).unwrap_err();
            assert!(matches!(err, EpochError::DegenerateSampleRate(_)), "sr={sr}: {err:?}");
        }
    }

    #[test]
    fn out_of_bounds_windows_are_rejected() {
        let cfg = EpochConfig::default();
        assert_eq!(
            EpochWindow::new(50, 1000.0, &cfg, 2000).unwrap_err(),
            EpochError::OutOfBounds { start: -50, end: 750, n_samples: 2000 },
        );
        assert!(EpochWindow::new(1500, 1000.0, &cfg, 2000).is_err());
        // Exactly fitting at both ends is fine.
        assert!(EpochWindow::new(100, 1000.0, &cfg, 800).is_ok());
    }

    #[test]
    fn windows_slice_the_signal() {
        let sig = ramp(3, 1000);
        let ep = Epoch::new(sig.view(), 200, 100.0, &EpochConfig::default()).unwrap();
        // 10 baseline samples, 70 trial samples.
        assert_eq!(ep.baseline().dim(), (3, 10));
        assert_eq!(ep.full().dim(), (3, 80));
        assert_eq!(ep.full()[[1, 0]], 1190.0);
        assert_eq!(ep.start_sample(), 190);
        assert_eq!(ep.end_sample(), 270);
    }

    #[test]
    fn baseline_means() {
        let sig = ramp(2, 1000);
        let ep = Epoch::new(sig.view(), 200, 100.0, &EpochConfig::default()).unwrap();
        // Channel 0 baseline = 190..200 → mean 194.5; channel 1 → 1194.5.
        let m = ep.baseline_channel_mean();
        assert_abs_diff_eq!(m[0], 194.5, epsilon = 1e-9);
        assert_abs_diff_eq!(m[1], 1194.5, epsilon = 1e-9);
        assert_abs_diff_eq!(ep.baseline_mean(), 694.5, epsilon = 1e-9);
    }

    #[test]
    fn corrected_baseline_is_zero_mean() {
        let sig = Array2::from_shape_fn((4, 500), |(c, t)| c as f64 * 3.0 + (t as f64 * 0.3).sin());
        let ep = Epoch::new(sig.view(), 250, 100.0, &EpochConfig::default()).unwrap();
        let c = ep.corrected();
        let n_base = ep.window.baseline_len();
        for ch in 0..4 {
            let m = c.slice(s![ch, ..n_base]).mean().unwrap();
            assert_abs_diff_eq!(m, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn cached_values_are_reused() {
        let sig = ramp(2, 1000);
        let ep = Epoch::new(sig.view(), 200, 100.0, &EpochConfig::default()).unwrap();
        let a = ep.corrected() as *const Array2<f64>;
        let b = ep.corrected() as *const Array2<f64>;
        assert_eq!(a, b);
        assert!(std::ptr::eq(ep.baseline_channel_mean(), ep.baseline_channel_mean()));
    }

    #[test]
    #[should_panic(expected = "NaN in baseline window")]
    fn nan_in_baseline_panics() {
        let mut sig = ramp(2, 1000);
        sig[[1, 195]] = f64::NAN;
        let ep = Epoch::new(sig.view(), 200, 100.0, &EpochConfig::default()).unwrap();
        let _ = ep.baseline();
    }

    #[test]
    #[should_panic(expected = "NaN in epoch window")]
    fn nan_in_trial_panics() {
        let mut sig = ramp(2, 1000);
        sig[[0, 260]] = f64::NAN;
        let ep = Epoch::new(sig.view(), 200, 100.0, &EpochConfig::default()).unwrap();
        // Baseline is clean; only the full window sees the NaN.
        let _ = ep.baseline();
        let _ = ep.full();
    }

    #[test]
    fn stack_shapes() {
        let sig = ramp(3, 1000);
        let cfg = EpochConfig::default();
        let eps: Vec<_> = [200, 400, 600]
            .iter()
            .map(|&sp| Epoch::new(sig.view(), sp, 100.0, &cfg).unwrap())
            .collect();
        let stacked = stack_corrected(&eps).unwrap();
        assert_eq!(stacked.shape(), &[3, 3, 80]);
        // Ramp minus baseline mean: first sample sits 4.5 below the mean.
        assert_abs_diff_eq!(stacked[[2, 1, 0]], -4.5, epsilon = 1e-9);
    }
}
