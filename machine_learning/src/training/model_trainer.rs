use ndarray::{Array2, ArrayD, ArrayView2, Ix2};
use rand::Rng;

use super::{FrozenModel, ParamManager};
use crate::{
    MlErr, Result,
    arch::{Model, layers::expect_shape, loss::LossFn},
    dataset::Dataset,
    metrics::Metric,
    optimization::Optimizer,
};

/// The loss and metric of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepStats {
    pub loss: f32,
    pub accuracy: f32,
}

/// Contains the relevant components needed for training a model, including the model itself,
/// its parameters and its optimizer state.
pub struct ModelTrainer<M, O, L>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
{
    model: M,
    params: ParamManager,
    optimizer: O,
    loss_fn: L,
    metric: Metric,
    steps: usize,
}

impl<M, O, L> ModelTrainer<M, O, L>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
{
    /// Returns a new `ModelTrainer`.
    ///
    /// # Arguments
    /// * `model` - The model that will be trained.
    /// * `params` - The model's initial parameters.
    /// * `optimizer` - The optimizer that dictates how to update the parameters on each step.
    /// * `loss_fn` - Measures the difference between the model's output and the expected one.
    /// * `metric` - The score reported along with the loss.
    ///
    /// # Returns
    /// A new `ModelTrainer` or an error if `params` doesn't fit the model.
    pub fn new(model: M, params: Vec<f32>, optimizer: O, loss_fn: L, metric: Metric) -> Result<Self> {
        if params.len() != model.size() {
            return Err(MlErr::SizeMismatch {
                what: "trainer params",
                got: params.len(),
                expected: model.size(),
            });
        }

        Ok(Self {
            model,
            params: ParamManager::new(params),
            optimizer,
            loss_fn,
            metric,
            steps: 0,
        })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn params(&self) -> &[f32] {
        self.params.params()
    }

    /// The amount of parameter updates applied so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Runs one gradient update over a batch.
    ///
    /// # Arguments
    /// * `x` - The input batch.
    /// * `y` - The expected output for each sample of the batch.
    ///
    /// # Returns
    /// The loss and metric of the batch, measured before the update.
    pub fn train_step(&mut self, x: ArrayD<f32>, y: ArrayView2<f32>) -> Result<StepStats> {
        self.params.zero_grad();

        let y_pred = self.model.forward(self.params.params(), x)?;
        let (y_pred, stats) = score(&self.loss_fn, self.metric, y_pred, y)?;
        let d = self.loss_fn.loss_prime(y_pred.view(), y);

        let (params, grad) = self.params.split_mut();
        self.model.backward(params, Some(grad), d.into_dyn())?;
        self.apply()?;

        Ok(stats)
    }

    /// Runs one gradient update of this model stacked under a frozen `head`: the loss is
    /// measured at the head's output but only this model's parameters change.
    ///
    /// # Arguments
    /// * `head` - The model fed with this model's output.
    /// * `x` - The input batch.
    /// * `y` - The expected output of the head.
    ///
    /// # Returns
    /// The loss and metric of the stacked models, measured before the update.
    pub fn train_step_through<H: Model>(
        &mut self,
        head: &mut FrozenModel<'_, H>,
        x: ArrayD<f32>,
        y: ArrayView2<f32>,
    ) -> Result<StepStats> {
        self.params.zero_grad();

        let hidden = self.model.forward(self.params.params(), x)?;
        let y_pred = head.forward(hidden)?;
        let (y_pred, stats) = score(&self.loss_fn, self.metric, y_pred, y)?;
        let d = self.loss_fn.loss_prime(y_pred.view(), y);
        let d = head.input_gradient(d.into_dyn())?;

        let (params, grad) = self.params.split_mut();
        self.model.backward(params, Some(grad), d)?;
        self.apply()?;

        Ok(stats)
    }

    /// Scores a batch without updating anything.
    pub fn evaluate(&self, x: ArrayD<f32>, y: ArrayView2<f32>) -> Result<StepStats> {
        let y_pred = self.predict(x)?;
        Ok(score(&self.loss_fn, self.metric, y_pred, y)?.1)
    }

    /// Runs the model in inference mode.
    pub fn predict(&self, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        self.model.predict(self.params.params(), x)
    }

    /// Trains over every sample of `dataset` once, in shuffled batches.
    ///
    /// # Arguments
    /// * `dataset` - A labeled dataset.
    /// * `batch_size` - The amount of samples per update, the last batch may be smaller.
    /// * `rng` - Shuffles the dataset.
    ///
    /// # Returns
    /// The sample weighted mean of every batch's stats.
    pub fn fit_epoch<R: Rng>(
        &mut self,
        dataset: &Dataset,
        batch_size: usize,
        rng: &mut R,
    ) -> Result<StepStats> {
        let mut total = StepStats::default();

        for batch in dataset.shuffled_batches(batch_size, rng) {
            let (x, y) = dataset.gather(&batch)?;
            let stats = self.train_step(x, y.view())?;

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

    /// Borrows the model with its parameters frozen.
    pub fn frozen(&mut self) -> FrozenModel<'_, M> {
        FrozenModel::new(&mut self.model, self.params.params())
    }

    fn apply(&mut self) -> Result<()> {
        self.params.optimize(&mut self.optimizer)?;
        self.steps += 1;
        Ok(())
    }
}

fn score<L: LossFn>(
    loss_fn: &L,
    metric: Metric,
    y_pred: ArrayD<f32>,
    y: ArrayView2<f32>,
) -> Result<(Array2<f32>, StepStats)> {
    let y_pred = y_pred.into_dimensionality::<Ix2>()?;
    expect_shape("prediction", y_pred.shape(), y.shape())?;

    let stats = StepStats {
        loss: loss_fn.loss(y_pred.view(), y),
        accuracy: metric.score(y_pred.view(), y),
    };

    Ok((y_pred, stats))
}
