//! Contrastive Divergence (CD-1) for a single RBM.
//!
//! One training step runs a single round of alternating Gibbs sampling:
//!
//! ```text
//! positive phase:  h_prob = sigmoid(v  W),  h_state = sample(h_prob)
//! negative phase:  v' = sigmoid(h_state Wt),  h' = sigmoid(v' W)
//! update:          W += lr * (vt h_prob - v't h') / samples
//! ```
//!
//! Associations use the activation *probabilities*, not the sampled states —
//! the lower-variance gradient from section 3 of Hinton's "A Practical Guide
//! to Training Restricted Boltzmann Machines".

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Instant;

use crate::matrix::{BinaryFunction, Matrix};
use crate::rbm::{Rbm, RbmResult};
use crate::LearningParameters;

pub struct ContrastiveDivergence {
    params: LearningParameters,
    rng: StdRng,
}

impl ContrastiveDivergence {
    pub fn new(params: LearningParameters) -> Self {
        Self {
            params,
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeded variant; identical seeds and call order give identical sampled
    /// states.
    pub fn with_seed(params: LearningParameters, seed: u64) -> Self {
        Self {
            params,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn params(&self) -> &LearningParameters {
        &self.params
    }

    /// Train on one dataset matrix: each row is a training vector.
    ///
    /// Returns the final epoch's summed squared reconstruction error. On any
    /// failure the RBM's weights are left exactly as they were.
    pub fn learn<M: Matrix>(&mut self, rbm: &mut Rbm<M>, data: &M) -> RbmResult<f64> {
        self.learn_all(rbm, std::slice::from_ref(data))
    }

    /// Train on several dataset matrices; every epoch passes over all of
    /// them and the reported error sums across them.
    ///
    /// Large datasets are better split into reasonably sized matrices: each
    /// one is a simultaneous batch, so the per-epoch cost is a handful of
    /// products on matrices of that size.
    pub fn learn_all<M: Matrix>(&mut self, rbm: &mut Rbm<M>, datasets: &[M]) -> RbmResult<f64> {
        // Stage the weights; commit only after every epoch succeeded.
        let mut weights = rbm.weights().clone();
        let mut error = 0.0;
        let mut clock = Instant::now();

        for epoch in 0..self.params.epochs {
            error = 0.0;
            for data in datasets {
                let samples = data.rows() as f64;

                // Positive phase: sample hidden units from the data.
                let positive_hidden_probabilities =
                    data.dot(&weights)?.apply(self.params.logistic);
                let thresholds = M::random(data.rows(), rbm.hidden_size(), &mut self.rng);
                let positive_hidden_states = positive_hidden_probabilities
                    .clone()
                    .apply_binary(&thresholds, BinaryFunction::ActivationState)?;
                let positive_associations =
                    data.transpose().dot(&positive_hidden_probabilities)?;

                // Negative phase: reconstruct the visible units and sample
                // the hidden units again.
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
                    .divide_scalar(samples)?
                    .multiply_scalar(self.params.learning_rate);
                weights = weights.add(&updates)?;

                error += data
                    .clone()
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

    /// Run trained weights forward: sample hidden states from rows of
    /// visible states.
    pub fn run_visible<M: Matrix>(&mut self, rbm: &Rbm<M>, data: &M) -> RbmResult<M> {
        let hidden_probabilities = data.dot(rbm.weights())?.apply(self.params.logistic);
        let thresholds = M::random(data.rows(), rbm.hidden_size(), &mut self.rng);
        Ok(hidden_probabilities.apply_binary(&thresholds, BinaryFunction::ActivationState)?)
    }

    /// Run trained weights backward: sample visible states from rows of
    /// hidden states.
    pub fn run_hidden<M: Matrix>(&mut self, rbm: &Rbm<M>, data: &M) -> RbmResult<M> {
        let visible_probabilities = data
            .dot(&rbm.weights().transpose())?
            .apply(self.params.logistic);
        let thresholds = M::random(data.rows(), rbm.visible_size(), &mut self.rng);
        Ok(visible_probabilities.apply_binary(&thresholds, BinaryFunction::ActivationState)?)
    }

    /// Alternating Gibbs sampling from a seed: update all hidden units, then
    /// all visible units, recording the visible states visited.
    ///
    /// The network is seeded *once*, so successive samples are correlated.
    /// Returns the visited states in visit order, the seed first; identical
    /// intermediate states are kept, so callers wanting unique states dedup
    /// themselves.
    pub fn day_dream<M: Matrix>(
        &mut self,
        rbm: &Rbm<M>,
        data: &M,
        dream_samples: usize,
    ) -> RbmResult<Vec<M>> {
        let weights = rbm.weights();
        let mut sample = data.clone();
        let mut samples = Vec::with_capacity(dream_samples);

        for _ in 0..dream_samples {
            samples.push(sample.clone());

            let hidden_probabilities = sample.dot(weights)?.apply(self.params.logistic);
            let thresholds = M::random(sample.rows(), rbm.hidden_size(), &mut self.rng);
            let hidden_states =
                hidden_probabilities.apply_binary(&thresholds, BinaryFunction::ActivationState)?;

            let visible_probabilities = hidden_states
                .dot(&weights.transpose())?
                .apply(self.params.logistic);
            let thresholds = M::random(sample.rows(), sample.cols(), &mut self.rng);
            sample =
                visible_probabilities.apply_binary(&thresholds, BinaryFunction::ActivationState)?;
        }

        Ok(samples)
    }

    /// Summed squared reconstruction error of one positive+negative pass,
    /// without touching the weights. Diagnostic only.
    pub fn reconstruction_error<M: Matrix>(&mut self, rbm: &Rbm<M>, data: &M) -> RbmResult<f64> {
        let weights = rbm.weights();
        let positive_hidden_probabilities = data.dot(weights)?.apply(self.params.logistic);
        let thresholds = M::random(data.rows(), rbm.hidden_size(), &mut self.rng);
        let positive_hidden_states =
            positive_hidden_probabilities.apply_binary(&thresholds, BinaryFunction::ActivationState)?;
        let negative_visible_probabilities = positive_hidden_states
            .dot(&weights.transpose())?
            .apply(self.params.logistic);
        Ok(data
            .clone()
            .subtract(&negative_visible_probabilities)?
            .pow(2.0)
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::{ImmutableMatrix, MutableMatrix};
    use crate::rbm::RandomRbmFactory;

    fn sample_training_data<M: Matrix>() -> M {
        M::from_rows(&[
            vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0],
            vec![1.0, 0.0, 1.0, 0.0, 0.0, 0.0],
            vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0],
            vec![0.0, 0.0, 1.0, 1.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0],
            vec![0.0, 0.0, 1.0, 1.0, 1.0, 0.0],
        ])
        .unwrap()
    }

    fn quick_params(epochs: usize) -> LearningParameters {
        LearningParameters::default()
            .with_epochs(epochs)
            .with_log(false)
    }

    #[test]
    fn run_visible_shape_and_binary_states() {
        let mut factory = RandomRbmFactory::seeded(1);
        let rbm = factory.build::<ImmutableMatrix>(6, 3);
        let mut cd = ContrastiveDivergence::with_seed(quick_params(1), 2);

        let hidden = cd
            .run_visible(&rbm, &sample_training_data::<ImmutableMatrix>())
            .unwrap();
        assert_eq!(hidden.rows(), 6);
        assert_eq!(hidden.cols(), 3);
        assert!(hidden.as_array().iter().all(|&v| v == 0.0 || v == 1.0));
    }

    #[test]
    fn run_hidden_mirrors_back_to_visible_width() {
        let mut factory = RandomRbmFactory::seeded(1);
        let rbm = factory.build::<ImmutableMatrix>(6, 3);
        let mut cd = ContrastiveDivergence::with_seed(quick_params(1), 2);

        let hidden = ImmutableMatrix::from_rows(&[vec![1.0, 0.0, 1.0]]).unwrap();
        let visible = cd.run_hidden(&rbm, &hidden).unwrap();
        assert_eq!(visible.rows(), 1);
        assert_eq!(visible.cols(), 6);
        assert!(visible.as_array().iter().all(|&v| v == 0.0 || v == 1.0));
    }

    #[test]
    fn learn_reduces_reconstruction_error() {
        let mut factory = RandomRbmFactory::seeded(17);
        let mut rbm = factory.build::<MutableMatrix>(6, 3);
        let data = sample_training_data::<MutableMatrix>();
        let mut cd = ContrastiveDivergence::with_seed(quick_params(3000), 23);

        let before = cd.reconstruction_error(&rbm, &data).unwrap();
        let after = cd.learn(&mut rbm, &data).unwrap();
        assert!(
            after < before,
            "error did not drop: before {} vs after {}",
            before,
            after
        );
    }

    #[test]
    fn learn_rejects_mismatched_data_without_touching_weights() {
        let mut factory = RandomRbmFactory::seeded(5);
        let mut rbm = factory.build::<ImmutableMatrix>(6, 3);
        let before = rbm.weights().clone();
        let bad = ImmutableMatrix::zeros(2, 5);
        let mut cd = ContrastiveDivergence::with_seed(quick_params(10), 5);

        assert!(cd.learn(&mut rbm, &bad).is_err());
        assert_eq!(rbm.weights(), &before);
    }

    #[test]
    fn day_dream_returns_requested_sequence() {
        let mut factory = RandomRbmFactory::seeded(2);
        let mut rbm = factory.build::<ImmutableMatrix>(6, 4);
        let data = sample_training_data::<ImmutableMatrix>();
        let mut cd = ContrastiveDivergence::with_seed(quick_params(200), 3);
        cd.learn(&mut rbm, &data).unwrap();

        let dreams = cd.day_dream(&rbm, &data, 10).unwrap();
        assert_eq!(dreams.len(), 10);
        assert_eq!(dreams[0], data); // the seed comes first
        for dream in &dreams[1..] {
            assert_eq!(dream.rows(), 6);
            assert_eq!(dream.cols(), 6);
            assert!(dream.as_array().iter().all(|&v| v == 0.0 || v == 1.0));
        }
    }

    #[test]
    fn seeded_trainers_are_reproducible() {
        let data = sample_training_data::<ImmutableMatrix>();
        let mut weights = Vec::new();
        for _ in 0..2 {
            let mut factory = RandomRbmFactory::seeded(17);
            let mut rbm = factory.build::<ImmutableMatrix>(6, 3);
            let mut cd = ContrastiveDivergence::with_seed(quick_params(50), 99);
            cd.learn(&mut rbm, &data).unwrap();
            weights.push(rbm.weights().clone());
        }
        assert_eq!(weights[0], weights[1]);
    }
}
