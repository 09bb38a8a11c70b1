//! Temporal Contrastive Divergence over a sliding event window.
//!
//! For event index `t` the training input is
//! `concat(event[t], event[t+1], ..., event[t+memory])`: the RBM learns to
//! jointly represent an event and the `memory` events that follow it, which
//! is what lets it guess "what comes next". The RBM's visible width is fixed
//! at construction to `event_width * (1 + memory)`; windows running off the
//! end of the sequence are zero-padded.
//!
//! There is no built-in generation loop. Callers seed [`Self::run_visible`]
//! with one event (a zero block stands in for the unknown future), sample the
//! visible layer back with [`Self::run_hidden`], trim off the recurrent block
//! and feed the prediction back in, as many cycles as wanted.

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Instant;

use crate::matrix::{BinaryFunction, Matrix, MatrixError, MatrixResult};
use crate::rbm::{Rbm, RbmError, RbmResult};
use crate::LearningParameters;

pub struct RecurrentContrastiveDivergence {
    params: LearningParameters,
    memory: usize,
    rng: StdRng,
}

impl RecurrentContrastiveDivergence {
    pub fn new(params: LearningParameters) -> Self {
        let memory = params.memory;
        Self {
            params,
            memory,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(params: LearningParameters, seed: u64) -> Self {
        let memory = params.memory;
        Self {
            params,
            memory,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Train on an ordered sequence of events (each a matrix of equal
    /// shape). Returns the final epoch's summed squared reconstruction
    /// error; on failure the RBM is untouched.
    pub fn learn<M: Matrix>(&mut self, rbm: &mut Rbm<M>, events: &[M]) -> RbmResult<f64> {
        let (rows, width) = check_events(events)?;
        let expected = width * (1 + self.memory);
        if rbm.visible_size() != expected {
            return Err(RbmError::InvalidConfig(format!(
                "recurrent training needs visible width {} ({} event columns x (1 + memory {})), model has {}",
                expected,
                width,
                self.memory,
                rbm.visible_size()
            )));
        }

        let number_events = events.len() as f64;
        let mut weights = rbm.weights().clone();
        let mut error = 0.0;
        let mut clock = Instant::now();

        for epoch in 0..self.params.epochs {
            error = 0.0;
            for t in 0..events.len() {
                let temporal = self.temporal_input(t, events, rows, width)?;

                let positive_hidden_probabilities =
                    temporal.dot(&weights)?.apply(self.params.logistic);
                let thresholds = M::random(temporal.rows(), rbm.hidden_size(), &mut self.rng);
                let positive_hidden_states = positive_hidden_probabilities
                    .clone()
                    .apply_binary(&thresholds, BinaryFunction::ActivationState)?;
                let positive_associations =
                    temporal.transpose().dot(&positive_hidden_probabilities)?;

                let negative_visible_probabilities = positive_hidden_states
                    .dot(&weights.transpose())?
                    .apply(self.params.logistic);
                let negative_hidden_probabilities = negative_visible_probabilities
                    .dot(&weights)?
                    .apply(self.params.logistic);
                let negative_associations = negative_visible_probabilities
                    .transpose()
                    .dot(&negative_hidden_probabilities)?;

                let updates = positive_associations
                    .subtract(&negative_associations)?
                    .divide_scalar(number_events)?
                    .multiply_scalar(self.params.learning_rate);
                weights = weights.add(&updates)?;

                error += temporal
                    .subtract(&negative_visible_probabilities)?
                    .pow(2.0)
                    .sum();
            }

            if self.params.log && epoch > 0 && epoch % 10 == 0 {
                info!(
                    "epoch {}/{}, error: {:.6}, time: {}ms",
                    epoch,
                    self.params.epochs,
                    error,
                    clock.elapsed().as_millis()
                );
                clock = Instant::now();
            }
        }

        rbm.set_weights(weights)?;
        Ok(error)
    }

    /// Sample hidden states for one event. A zero block of the full memory
    /// width is appended in place of the future events that are unknown at
    /// inference time.
    pub fn run_visible<M: Matrix>(&mut self, rbm: &Rbm<M>, event: &M) -> RbmResult<M> {
        let width = event.cols();
        let expected = width * (1 + self.memory);
        if rbm.visible_size() != expected {
            return Err(RbmError::InvalidConfig(format!(
                "event has {} columns; model visible width {} is not {} x (1 + memory {})",
                width,
                rbm.visible_size(),
                width,
                self.memory
            )));
        }

        let temporal = event.append_columns(&M::zeros(event.rows(), width * self.memory))?;
        let hidden_probabilities = temporal.dot(rbm.weights())?.apply(self.params.logistic);
        let thresholds = M::random(event.rows(), rbm.hidden_size(), &mut self.rng);
        Ok(hidden_probabilities.apply_binary(&thresholds, BinaryFunction::ActivationState)?)
    }

    /// Sample visible states (over the full temporal width) from hidden
    /// states. The leading `event_width` columns are the current event, the
    /// rest is the window — callers trim it before feeding the prediction
    /// back.
    pub fn run_hidden<M: Matrix>(&mut self, rbm: &Rbm<M>, hidden: &M) -> RbmResult<M> {
        let visible_probabilities = hidden
            .dot(&rbm.weights().transpose())?
            .apply(self.params.logistic);
        let thresholds = M::random(hidden.rows(), rbm.visible_size(), &mut self.rng);
        Ok(visible_probabilities.apply_binary(&thresholds, BinaryFunction::ActivationState)?)
    }

    fn temporal_input<M: Matrix>(
        &self,
        t: usize,
        events: &[M],
        rows: usize,
        width: usize,
    ) -> MatrixResult<M> {
        let mut pieces = Vec::with_capacity(1 + self.memory);
        pieces.push(events[t].clone());
        for i in t + 1..=t + self.memory {
            if i < events.len() {
                pieces.push(events[i].clone());
            } else {
                // Window runs off the end of the sequence.
                pieces.push(M::zeros(rows, width));
            }
        }
        M::concat_columns(&pieces)
    }
}

fn check_events<M: Matrix>(events: &[M]) -> RbmResult<(usize, usize)> {
    let first = events
        .first()
        .ok_or_else(|| RbmError::InvalidConfig("no events to train on".to_string()))?;
    let (rows, width) = (first.rows(), first.cols());
    if events.iter().any(|e| e.rows() != rows || e.cols() != width) {
        return Err(RbmError::Matrix(MatrixError::DimensionMismatch(
            "events have unequal shapes".to_string(),
        )));
    }
    Ok((rows, width))
}
