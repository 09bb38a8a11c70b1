//! Supervised fine-tuning of an RBM's weight matrix.
//!
//! Treats the weights as a single dense linear layer with sigmoid output and
//! applies the logistic-derivative delta rule toward teacher-supplied labels:
//!
//! ```text
//! output = sigmoid(input W)
//! delta  = (teacher - output) * output * (1 - output)
//! W     += lr * inputT delta
//! ```
//!
//! No Gibbs sampling is involved; this is a pure gradient step. Because the
//! RBM graph is not a strict feed-forward stack, it is not expected to
//! converge identically to a layered back-propagation network.

use log::info;
use std::time::Instant;

use crate::matrix::{Matrix, MatrixError};
use crate::rbm::{Rbm, RbmError, RbmResult};
use crate::LearningParameters;

pub struct BackErrorPropagation {
    params: LearningParameters,
}

impl BackErrorPropagation {
    pub fn new(params: LearningParameters) -> Self {
        Self { params }
    }

    /// Fine-tune toward paired `(input, teacher_signal)` rows.
    ///
    /// Returns the final epoch's error: the per-sample mean squared errors
    /// summed over the dataset. On failure the RBM is untouched.
    pub fn learn<M: Matrix>(
        &self,
        rbm: &mut Rbm<M>,
        train_data: &[M],
        teacher_signals: &[M],
    ) -> RbmResult<f64> {
        if train_data.len() != teacher_signals.len() {
            return Err(RbmError::Matrix(MatrixError::DimensionMismatch(format!(
                "{} inputs vs {} teacher signals",
                train_data.len(),
                teacher_signals.len()
            ))));
        }

        let mut weights = rbm.weights().clone();
        let mut error = 0.0;
        let clock = Instant::now();

        for epoch in 0..self.params.epochs {
            error = 0.0;
            for (input, teacher) in train_data.iter().zip(teacher_signals) {
                let output = input.dot(&weights)?.apply(self.params.logistic);

                error += output.clone().subtract(teacher)?.pow(2.0).sum() / output.cols() as f64;

                // delta = (teacher - output) * output * (1 - output)
                let one_minus_output = output.clone().multiply_scalar(-1.0).add_scalar(1.0);
                let delta = teacher
                    .clone()
                    .subtract(&output)?
                    .multiply(&output)?
                    .multiply(&one_minus_output)?;

                let updates = input
                    .transpose()
                    .dot(&delta)?
                    .multiply_scalar(self.params.learning_rate);
                weights = weights.add(&updates)?;
            }

            if self.params.log && epoch > 0 && epoch % 10 == 0 {
                info!(
                    "epoch {}/{}, error: {:.6}, time: {}ms",
                    epoch,
                    self.params.epochs,
                    error / train_data.len() as f64,
                    clock.elapsed().as_millis()
                );
            }
        }

        rbm.set_weights(weights)?;
        Ok(error)
    }

    /// The forward half on its own: `sigmoid(input W)`.
    pub fn feed_forward<M: Matrix>(&self, rbm: &Rbm<M>, input: &M) -> RbmResult<M> {
        Ok(input.dot(rbm.weights())?.apply(self.params.logistic))
    }
}
