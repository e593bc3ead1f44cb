use std::path::PathBuf;

/// The losses of a single batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressRecord {
    pub epoch: usize,
    pub batch: usize,
    pub batches_per_epoch: usize,
    /// Discriminator loss on the real half batch.
    pub d_loss1: f32,
    /// Discriminator loss on the generated half batch.
    pub d_loss2: f32,
    pub g_loss: f32,
}

/// What the periodic evaluation measured and wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalRecord {
    pub epoch: usize,
    pub real_accuracy: f32,
    pub fake_accuracy: f32,
    pub checkpoint: PathBuf,
    pub grid: PathBuf,
}

/// Everything a training run reported, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    pub progress: Vec<ProgressRecord>,
    pub evaluations: Vec<EvalRecord>,
    pub d_updates: u64,
    pub g_updates: u64,
}

impl History {
    #[inline]
    pub fn bump_d_updates(&mut self, n: u64) {
        self.d_updates += n;
    }

    #[inline]
    pub fn bump_g_updates(&mut self) {
        self.g_updates += 1;
    }

    /// The checkpoint written by the last evaluation, if any.
    pub fn last_checkpoint(&self) -> Option<&PathBuf> {
        self.evaluations.last().map(|e| &e.checkpoint)
    }
}
