use std::num::NonZeroUsize;

/// Defines when to report progress and when to evaluate.
#[derive(Debug, Clone)]
pub struct Schedule {
    pub report_every: NonZeroUsize,
    pub eval_every: NonZeroUsize,
}

impl Schedule {
    pub fn new(report_every: NonZeroUsize, eval_every: NonZeroUsize) -> Self {
        Self {
            report_every,
            eval_every,
        }
    }

    /// Returns true if this batch ends a reporting window.
    #[inline]
    pub fn should_report(&self, batch: usize) -> bool {
        (batch + 1) % self.report_every.get() == 0
    }

    /// Returns true if this epoch ends an evaluation window.
    #[inline]
    pub fn should_evaluate(&self, epoch: usize) -> bool {
        (epoch + 1) % self.eval_every.get() == 0
    }
}
