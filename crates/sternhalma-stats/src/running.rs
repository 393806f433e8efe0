use serde::{Deserialize, Serialize};

/// Incrementally updated arithmetic mean.
///
/// Each new sample moves the mean by `(x - mean) / n`, so the full sample
/// history never has to be kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningAverage {
    mean: f64,
    count: u64,
}

impl RunningAverage {
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// `None` until the first sample.
    #[must_use]
    pub fn get(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    #[expect(clippy::cast_precision_loss)]
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.mean += (value - self.mean) / self.count as f64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_batch_mean() {
        let values = [3.0, -1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0];
        let mut avg = RunningAverage::default();
        assert_eq!(avg.get(), None);
        for v in values {
            avg.push(v);
        }
        let batch = values.iter().sum::<f64>() / 8.0;
        assert!((avg.mean() - batch).abs() < 1e-12);
        assert_eq!(avg.count(), 8);
    }

    #[test]
    fn test_serde_roundtrip_keeps_count() {
        let mut avg = RunningAverage::default();
        avg.push(2.0);
        avg.push(4.0);
        let json = serde_json::to_string(&avg).unwrap();
        let mut back: RunningAverage = serde_json::from_str(&json).unwrap();
        back.push(6.0);
        assert!((back.mean() - 4.0).abs() < 1e-12);
    }
}
