use std::{fs, path::PathBuf};

use machine_learning::{
    arch::{Model, ModelBuilder, Sequential, loss::CategoricalCrossEntropy},
    dataset::Dataset,
    metrics::Metric,
    optimization::GradientDescentWithMomentum,
    training::{ModelTrainer, StepStats},
};
use rand::Rng;

use crate::{
    Result,
    checkpoint::{CLASSIFIER_CHECKPOINT, save_model},
    config::ClassifierConfig,
    topology::classifier_spec,
};

type ClassifierTrainer = ModelTrainer<Sequential, GradientDescentWithMomentum, CategoricalCrossEntropy>;

/// What a classifier training run measured and wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierReport {
    /// The training stats of every epoch.
    pub epochs: Vec<StepStats>,
    pub test: StepStats,
    pub checkpoint: PathBuf,
}

/// Trains the classifier from scratch and saves it.
///
/// # Arguments
/// * `config` - The run's configuration, validated here.
/// * `train` - One hot labeled images in `[0, 1]`.
/// * `test` - Held out images scored once training ends.
/// * `rng` - Shuffles every epoch.
///
/// # Returns
/// The per epoch and test stats along with the checkpoint's path.
pub fn train_classifier<R: Rng>(
    config: &ClassifierConfig,
    train: &Dataset,
    test: &Dataset,
    rng: &mut R,
) -> Result<ClassifierReport> {
    config.validate()?;
    fs::create_dir_all(&config.output_dir)?;

    let (model, params) = ModelBuilder::new(config.seed).build(&classifier_spec(&config.topology))?;
    let optimizer =
        GradientDescentWithMomentum::new(model.size(), config.learning_rate, config.momentum);
    let mut trainer = ModelTrainer::new(
        model,
        params,
        optimizer,
        CategoricalCrossEntropy::new(),
        Metric::CategoricalAccuracy,
    )?;

    log::info!(
        params = trainer.params().len(),
        images = train.len(),
        epochs = config.epochs;
        "starting classifier training"
    );

    let mut epochs = Vec::with_capacity(config.epochs);
    for epoch in 0..config.epochs {
        let stats = trainer.fit_epoch(train, config.batch_size, rng)?;
        log::info!(
            epoch = epoch + 1,
            loss = stats.loss,
            accuracy = stats.accuracy;
            "classifier epoch"
        );
        epochs.push(stats);
    }

    let test_stats = evaluate_in_batches(&trainer, test, config.batch_size)?;
    log::info!(
        loss = test_stats.loss,
        accuracy = test_stats.accuracy;
        "classifier test accuracy"
    );

    let checkpoint = config.output_dir.join(CLASSIFIER_CHECKPOINT);
    let metadata = [("role", "classifier".to_string()), ("epoch", config.epochs.to_string())];
    save_model(&checkpoint, trainer.model(), trainer.params(), &metadata)?;

    Ok(ClassifierReport {
        epochs,
        test: test_stats,
        checkpoint,
    })
}

/// Scores a whole dataset a batch at a time, weighting every batch by its size.
fn evaluate_in_batches(
    trainer: &ClassifierTrainer,
    dataset: &Dataset,
    batch_size: usize,
) -> Result<StepStats> {
    let mut total = StepStats::default();
    let indices: Vec<usize> = (0..dataset.len()).collect();

    for batch in indices.chunks(batch_size.max(1)) {
        let (x, y) = dataset.gather(batch)?;
        let stats = trainer.evaluate(x, y.view())?;

        let weight = batch.len() as f32;
        total.loss += stats.loss * weight;
        total.accuracy += stats.accuracy * weight;
    }

    let n = dataset.len().max(1) as f32;
    Ok(StepStats {
        loss: total.loss / n,
        accuracy: total.accuracy / n,
    })
}
