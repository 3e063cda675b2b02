//! Exponential smoothing of per-frame posture scores.

use std::collections::VecDeque;

use crate::config::AnalyzerConfig;

/// EMA smoothing of per-frame posture scores
///
/// Until `warmup` raw scores have been seen the output follows the raw score
/// directly; from then on `smoothed = α·raw + (1-α)·smoothed_prev`.
#[derive(Debug, Clone)]
pub struct ScoreSmoother {
    alpha: f64,
    warmup: usize,
    history: VecDeque<f64>,
    capacity: usize,
    smoothed: f64,
}

impl ScoreSmoother {
    pub fn new(alpha: f64, warmup: usize, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            alpha,
            warmup,
            history: VecDeque::with_capacity(capacity),
            capacity,
            smoothed: 10.0,
        }
    }

    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self::new(config.ema_alpha, config.ema_warmup, config.history_size)
    }

    pub fn push(&mut self, raw: f64) -> f64 {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(raw);

        self.smoothed = if self.history.len() >= self.warmup {
            self.alpha * raw + (1.0 - self.alpha) * self.smoothed
        } else {
            raw
        };
        self.smoothed
    }

    pub fn current(&self) -> f64 {
        self.smoothed
    }

    pub fn history(&self) -> &VecDeque<f64> {
        &self.history
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.smoothed = 10.0;
    }
}

impl Default for ScoreSmoother {
    fn default() -> Self {
        Self::from_config(&AnalyzerConfig::default())
    }
}
