//! The Restricted Boltzmann Machine model and its factory.
//!
//! An RBM is a bipartite stochastic layer pair: `visible_size` input units,
//! `hidden_size` latent units, and one dense `visible x hidden` weight matrix
//! between them. The model holds no other state; trainers in [`crate::learn`]
//! mutate the weights, persisters in [`crate::persist`] serialize them.

use ndarray::Array2;
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;

use crate::matrix::{Matrix, MatrixError};

/// Initial weights are drawn from N(0, 1) and scaled down by this factor;
/// CD-1 diverges when starting weights are large.
const WEIGHT_SCALE: f64 = 0.1;

/// Error type for model construction and training.
#[derive(Debug, Clone, PartialEq)]
pub enum RbmError {
    /// A matrix operation failed (shape mismatch, scalar divide by zero).
    Matrix(MatrixError),
    /// Adjacent deep layers disagree on their shared width.
    LayerMismatch {
        layer: usize,
        hidden_out: usize,
        visible_in: usize,
    },
    /// Invalid model or trainer configuration.
    InvalidConfig(String),
}

impl fmt::Display for RbmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RbmError::Matrix(e) => write!(f, "matrix: {}", e),
            RbmError::LayerMismatch {
                layer,
                hidden_out,
                visible_in,
            } => write!(
                f,
                "layer {}: previous layer hidden width ({}) does not match visible width in ({})",
                layer, hidden_out, visible_in
            ),
            RbmError::InvalidConfig(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for RbmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RbmError::Matrix(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MatrixError> for RbmError {
    fn from(e: MatrixError) -> Self {
        RbmError::Matrix(e)
    }
}

pub type RbmResult<T> = Result<T, RbmError>;

/// A single-layer RBM: visible and hidden unit counts plus the weight matrix
/// connecting them.
#[derive(Debug, Clone)]
pub struct Rbm<M: Matrix> {
    visible_size: usize,
    hidden_size: usize,
    weights: M,
}

impl<M: Matrix> Rbm<M> {
    /// Wrap an existing weight matrix; sizes derive from its shape.
    pub fn new(weights: M) -> Self {
        Self {
            visible_size: weights.rows(),
            hidden_size: weights.cols(),
            weights,
        }
    }

    pub fn visible_size(&self) -> usize {
        self.visible_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn weights(&self) -> &M {
        &self.weights
    }

    /// Replace the weight matrix. Fails when the replacement's shape does not
    /// match `visible_size x hidden_size`, leaving the model untouched.
    pub fn set_weights(&mut self, weights: M) -> RbmResult<()> {
        if weights.rows() != self.visible_size || weights.cols() != self.hidden_size {
            return Err(RbmError::Matrix(MatrixError::DimensionMismatch(format!(
                "set_weights: model is {}x{}, replacement is {}x{}",
                self.visible_size,
                self.hidden_size,
                weights.rows(),
                weights.cols()
            ))));
        }
        self.weights = weights;
        Ok(())
    }

    /// Widen the visible layer by `extra` units.
    ///
    /// Existing weights are kept; the new rows are initialized like fresh
    /// factory weights. Used to retrofit a plain RBM with the feedback block
    /// the recurrent trainer expects.
    pub fn grow_visible<R: Rng + ?Sized>(&mut self, extra: usize, rng: &mut R) -> RbmResult<()> {
        let new_rows = M::from_array(gaussian_weights(extra, self.hidden_size, rng));
        self.weights = self.weights.append_rows(&new_rows)?;
        self.visible_size += extra;
        Ok(())
    }
}

fn gaussian_weights<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Array2<f64> {
    Array2::<f64>::random_using((rows, cols), StandardNormal, rng).mapv(|z| z * WEIGHT_SCALE)
}

/// Builds RBMs with small-variance Gaussian starting weights.
///
/// Owns its generator so weight streams are reproducible: two factories built
/// with [`RandomRbmFactory::seeded`] on the same seed produce identical
/// models in identical call order.
#[derive(Debug)]
pub struct RandomRbmFactory {
    rng: StdRng,
}

impl RandomRbmFactory {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Build a `visible x hidden` RBM with every weight ~ N(0, 1) * 0.1.
    pub fn build<M: Matrix>(&mut self, visible: usize, hidden: usize) -> Rbm<M> {
        Rbm::new(M::from_array(gaussian_weights(visible, hidden, &mut self.rng)))
    }
}

impl Default for RandomRbmFactory {
    fn default() -> Self {
        Self::new()
    }
}
