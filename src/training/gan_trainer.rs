use std::{fs, num::NonZeroUsize, path::PathBuf};

use machine_learning::dataset::Dataset;
use rand::Rng;

use super::{EvalRecord, History, ProgressRecord, Schedule};
use crate::{
    GanErr, Result,
    adversarial::AdversarialPair,
    checkpoint::{generator_checkpoint_name, grid_name},
    config::GanConfig,
    plot::save_grid,
    sampling::{fake_batch, latent_batch, real_batch, real_labels},
};

/// Runs the alternating discriminator and generator updates.
pub struct GanTrainer<R: Rng> {
    schedule: Schedule,
    epochs: usize,
    batch_size: usize,
    latent_dim: usize,
    eval_samples: usize,
    grid_side: usize,
    output_dir: PathBuf,
    rng: R,
}

impl<R: Rng> GanTrainer<R> {
    /// Creates a new `GanTrainer`.
    ///
    /// # Arguments
    /// * `config` - The run's configuration, validated here.
    /// * `rng` - Draws every real, latent and generated batch.
    ///
    /// # Returns
    /// A new `GanTrainer` or `InvalidConfig`.
    pub fn new(config: &GanConfig, rng: R) -> Result<Self> {
        config.validate()?;

        let nonzero = |field: &str, value: usize| {
            NonZeroUsize::new(value)
                .ok_or_else(|| GanErr::InvalidConfig(format!("{field} must be greater than zero")))
        };

        Ok(Self {
            schedule: Schedule::new(
                nonzero("report_every", config.report_every)?,
                nonzero("eval_every", config.eval_every)?,
            ),
            epochs: config.epochs,
            batch_size: config.batch_size,
            latent_dim: config.latent_dim,
            eval_samples: config.eval_samples,
            grid_side: config.grid_side,
            output_dir: config.output_dir.clone(),
            rng,
        })
    }

    /// Trains `pair` on `dataset` for every configured epoch.
    ///
    /// Each batch updates the discriminator on half a batch of real images, then on half a
    /// batch of generated ones, then updates the generator on a full batch through the frozen
    /// discriminator. Every `eval_every` epochs the discriminator is scored on fresh real and
    /// generated sets, a grid of the generated set is plotted and the generator is saved.
    ///
    /// # Arguments
    /// * `pair` - The networks to train.
    /// * `dataset` - The real images, normalized to `[-1, 1]`.
    ///
    /// # Returns
    /// Every progress and evaluation record, or the first error, which aborts the run. A
    /// non finite loss aborts it with `NumericInstability`.
    pub fn train<P>(&mut self, pair: &mut P, dataset: &Dataset) -> Result<History>
    where
        P: AdversarialPair + ?Sized,
    {
        if pair.latent_dim() != self.latent_dim {
            return Err(GanErr::ShapeMismatch {
                what: "generator latent dimension",
                got: vec![pair.latent_dim()],
                expected: vec![self.latent_dim],
            });
        }

        fs::create_dir_all(&self.output_dir)?;

        let batches_per_epoch = dataset.len() / self.batch_size;
        if batches_per_epoch == 0 {
            log::warn!(
                images = dataset.len(),
                batch_size = self.batch_size;
                "dataset holds less than a batch, no update will run"
            );
        }

        log::info!(
            epochs = self.epochs,
            batches_per_epoch = batches_per_epoch,
            batch_size = self.batch_size;
            "starting gan training"
        );

        let mut history = History::default();

        for epoch in 0..self.epochs {
            for batch in 0..batches_per_epoch {
                let record = self.train_batch(pair, dataset, epoch, batch, batches_per_epoch)?;
                history.bump_d_updates(2);
                history.bump_g_updates();

                if self.schedule.should_report(batch) {
                    log::info!(
                        epoch = epoch + 1,
                        batch = batch + 1,
                        batches_per_epoch = batches_per_epoch,
                        d_loss1 = record.d_loss1,
                        d_loss2 = record.d_loss2,
                        g_loss = record.g_loss;
                        "progress"
                    );
                    history.progress.push(record);
                }
            }

            if self.schedule.should_evaluate(epoch) {
                let record = self.summarize_performance(pair, dataset, epoch)?;
                history.evaluations.push(record);
            }
        }

        log::info!(
            d_updates = history.d_updates,
            g_updates = history.g_updates;
            "gan training finished"
        );

        Ok(history)
    }

    fn train_batch<P>(
        &mut self,
        pair: &mut P,
        dataset: &Dataset,
        epoch: usize,
        batch: usize,
        batches_per_epoch: usize,
    ) -> Result<ProgressRecord>
    where
        P: AdversarialPair + ?Sized,
    {
        let half_batch = self.batch_size / 2;
        let finite = |what: &'static str, value: f32| {
            if value.is_finite() {
                Ok(value)
            } else {
                Err(GanErr::NumericInstability {
                    what,
                    epoch,
                    batch,
                    value,
                })
            }
        };

        let (x_real, y_real) = real_batch(dataset, half_batch, &mut self.rng)?;
        let d_loss1 = finite("d_loss1", pair.train_discriminator(x_real, y_real.view())?.loss)?;

        let (x_fake, y_fake) = fake_batch(&*pair, self.latent_dim, half_batch, &mut self.rng)?;
        let d_loss2 = finite("d_loss2", pair.train_discriminator(x_fake, y_fake.view())?.loss)?;

        let latent = latent_batch(self.latent_dim, self.batch_size, &mut self.rng);
        let y_gan = real_labels(self.batch_size);
        let g_loss = finite("g_loss", pair.train_generator(latent, y_gan.view())?)?;

        Ok(ProgressRecord {
            epoch,
            batch,
            batches_per_epoch,
            d_loss1,
            d_loss2,
            g_loss,
        })
    }

    fn summarize_performance<P>(
        &mut self,
        pair: &mut P,
        dataset: &Dataset,
        epoch: usize,
    ) -> Result<EvalRecord>
    where
        P: AdversarialPair + ?Sized,
    {
        let n = self.eval_samples;

        let (x_real, y_real) = real_batch(dataset, n, &mut self.rng)?;
        let real = pair.evaluate_discriminator(x_real, y_real.view())?;

        let (x_fake, y_fake) = fake_batch(&*pair, self.latent_dim, n, &mut self.rng)?;
        let grid = self.output_dir.join(grid_name(epoch));
        save_grid(&grid, x_fake.view(), self.grid_side)?;
        let fake = pair.evaluate_discriminator(x_fake, y_fake.view())?;

        let checkpoint = self.output_dir.join(generator_checkpoint_name(epoch));
        pair.save_generator(&checkpoint, epoch)?;

        log::info!(
            epoch = epoch + 1,
            real_accuracy = real.accuracy,
            fake_accuracy = fake.accuracy,
            checkpoint:? = checkpoint;
            "discriminator evaluated"
        );

        Ok(EvalRecord {
            epoch,
            real_accuracy: real.accuracy,
            fake_accuracy: fake.accuracy,
            checkpoint,
            grid,
        })
    }
}
