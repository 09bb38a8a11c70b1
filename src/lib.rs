//! # rbm
//!
//! Restricted Boltzmann Machines trained with Contrastive Divergence, from
//! first principles: a dense matrix core, single-layer CD-1 training with
//! recurrent/temporal and supervised fine-tuning variants, greedy layer-wise
//! deep stacks, a multi-threaded layer scheduler, and plain-text weight
//! persistence.
//!
//! ## Structure
//!
//! - [`matrix`] — `Matrix` trait plus immutable/mutable ownership variants
//! - [`rbm`] — the single-layer model and its random factory
//! - [`learn`] — Contrastive Divergence and its recurrent, supervised and
//!   deep variants, plus the multi-threaded deep scheduler
//! - [`deep`] — column-partitioned layer stacks
//! - [`persist`] — comma-delimited text weight files
//!
//! ## Data contract
//!
//! Training and inference data are plain numeric matrices: rows are samples,
//! columns are a fixed feature width. Producers (image encoders, dataset
//! loaders, vocabularies) are external collaborators; sigmoid-based CD
//! assumes inputs normalized to roughly `[0, 1]`.

pub mod deep;
pub mod learn;
pub mod matrix;
pub mod persist;
pub mod rbm;

pub use deep::{DeepRbm, LayerParameters, RbmLayer};
pub use learn::{
    BackErrorPropagation, ContrastiveDivergence, DeepContrastiveDivergence,
    MultiThreadedDeepContrastiveDivergence, RecurrentContrastiveDivergence,
};
pub use matrix::{
    BinaryFunction, ImmutableMatrix, Matrix, MatrixError, MatrixResult, MutableMatrix,
    UnaryFunction,
};
pub use persist::{load_deep_rbm, load_rbm, save_deep_rbm, save_rbm};
pub use rbm::{RandomRbmFactory, Rbm, RbmError, RbmResult};

/// Training configuration shared by every trainer in [`learn`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearningParameters {
    /// Step size of the weight update.
    pub learning_rate: f64,
    /// Full passes of the update rule over the training batch.
    pub epochs: usize,
    /// Logistic function applied to unit activations.
    pub logistic: UnaryFunction,
    /// Temporal window length used by the recurrent trainer: how many
    /// following events are concatenated onto each input.
    pub memory: usize,
    /// Emit progress at `info` level every 10 epochs.
    pub log: bool,
}

impl Default for LearningParameters {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            epochs: 15_000,
            logistic: UnaryFunction::Sigmoid,
            memory: 1,
            log: true,
        }
    }
}

impl LearningParameters {
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_logistic(mut self, logistic: UnaryFunction) -> Self {
        self.logistic = logistic;
        self
    }

    pub fn with_memory(mut self, memory: usize) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_log(mut self, log: bool) -> Self {
        self.log = log;
        self
    }
}
