//! Aggregate counts and timing over a batch's results

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::JobResult;

/// Totals over a finished result set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Number of results
    pub total: usize,
    /// Results with `success == true`
    pub successful: usize,
    /// Results with `success == false`
    pub failed: usize,
    /// Sum of per-job durations
    pub total_duration: Duration,
}

impl BatchSummary {
    /// Reduce a result set. Order does not matter.
    pub fn from_results(results: &[JobResult]) -> Self {
        let successful = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            successful,
            failed: results.len() - successful,
            total_duration: results.iter().map(|r| r.duration).sum(),
        }
    }

    /// Percentage of successful jobs, 0.0 for an empty batch
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.successful as f64 / self.total as f64 * 100.0
    }

    /// Mean job duration, zero for an empty batch
    pub fn average_duration(&self) -> Duration {
        match u32::try_from(self.total) {
            Ok(0) => Duration::ZERO,
            Ok(total) => self.total_duration / total,
            Err(_) => {
                Duration::from_secs_f64(self.total_duration.as_secs_f64() / self.total as f64)
            }
        }
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} jobs: {} succeeded, {} failed ({:.1}% success), total {:.1}s, avg {:.1}s",
            self.total,
            self.successful,
            self.failed,
            self.success_rate(),
            self.total_duration.as_secs_f64(),
            self.average_duration().as_secs_f64(),
        )
    }
}
