use std::collections::VecDeque;

use crate::config::{HISTORY_CAP, SEED_LIMIT};
use crate::types::Sample;

/// Bounded trailing window of observations used for trend fitting.
/// Strictly insertion-ordered; eviction is FIFO; no sample is mutated
/// after insertion.
#[derive(Debug, Default)]
pub struct SampleHistory {
    samples: VecDeque<Sample>,
}

impl SampleHistory {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(HISTORY_CAP),
        }
    }

    pub fn append(&mut self, sample: Sample) {
        self.samples.push_back(sample);
        while self.samples.len() > HISTORY_CAP {
            self.samples.pop_front();
        }
    }

    /// One-time startup backfill so the forecast engine has data immediately.
    /// Accepts at most `SEED_LIMIT` samples and drops any with non-finite
    /// speed or Bz. Returns the number actually inserted.
    pub fn seed(&mut self, samples: Vec<Sample>) -> usize {
        let mut inserted = 0;
        for sample in samples
            .into_iter()
            .filter(|s| s.speed.is_finite() && s.bz.is_finite())
            .take(SEED_LIMIT)
        {
            self.append(sample);
            inserted += 1;
        }
        inserted
    }

    /// Last `n` entries, oldest first (fewer if the history is shorter).
    pub fn window(&self, n: usize) -> Vec<Sample> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip).copied().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(t_ms: i64, speed: f64, bz: f64) -> Sample {
        Sample { t_ms, speed, bz }
    }

    #[test]
    fn append_never_exceeds_cap_and_evicts_oldest_first() {
        let mut history = SampleHistory::new();
        for i in 0..(HISTORY_CAP as i64 + 50) {
            history.append(sample(i, 400.0, -1.0));
        }
        assert_eq!(history.len(), HISTORY_CAP);
        let window = history.window(HISTORY_CAP);
        assert_eq!(window.first().map(|s| s.t_ms), Some(50));
        assert_eq!(window.last().map(|s| s.t_ms), Some(HISTORY_CAP as i64 + 49));
    }

    #[test]
    fn window_returns_fewer_when_short() {
        let mut history = SampleHistory::new();
        history.append(sample(1, 360.0, 0.0));
        history.append(sample(2, 361.0, 0.1));
        let window = history.window(40);
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].t_ms, 1);
    }

    #[test]
    fn seed_filters_non_finite_and_respects_limit() {
        let mut history = SampleHistory::new();
        let mut batch: Vec<Sample> = (0..SEED_LIMIT as i64 + 10)
            .map(|i| sample(i, 400.0, -2.0))
            .collect();
        batch[3].speed = f64::NAN;
        batch[7].bz = f64::INFINITY;

        let inserted = history.seed(batch);
        assert_eq!(inserted, SEED_LIMIT);
        assert_eq!(history.len(), SEED_LIMIT);
        assert!(history
            .window(SEED_LIMIT)
            .iter()
            .all(|s| s.speed.is_finite() && s.bz.is_finite()));
    }
}
