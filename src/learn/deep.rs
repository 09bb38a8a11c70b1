//! Greedy layer-wise deep training and inference.
//!
//! DBN factorization: `P(v,h1,...,hn) = P(v|h1) P(h1|h2) ... P(hn-1|hn)`.
//! Train `P(v|h1)`, feed each `v` forward to get `h1` samples, use those to
//! train `P(h1|h2)`, and so on up the stack.
//!
//! Within a layer the dataset's columns are split evenly across the layer's
//! RBMs; each trains independently on its slice. Between layers the sampled
//! hidden activations are concatenated and re-split for the next layer's RBM
//! count. `split_columns` and `concat_columns` invert each other exactly,
//! which is what keeps the column partition consistent across the stack.

use log::info;
use std::time::Instant;

use crate::deep::DeepRbm;
use crate::matrix::{Matrix, MatrixError};
use crate::rbm::{RbmError, RbmResult};
use crate::LearningParameters;

use super::ContrastiveDivergence;

pub struct DeepContrastiveDivergence {
    cd: ContrastiveDivergence,
}

impl DeepContrastiveDivergence {
    pub fn new(params: LearningParameters) -> Self {
        Self {
            cd: ContrastiveDivergence::new(params),
        }
    }

    pub fn with_seed(params: LearningParameters, seed: u64) -> Self {
        Self {
            cd: ContrastiveDivergence::with_seed(params, seed),
        }
    }

    /// Train the whole stack, layer by layer, bottom up.
    pub fn learn<M: Matrix>(&mut self, deep_rbm: &mut DeepRbm<M>, data: &M) -> RbmResult<()> {
        check_width("training data", data, deep_rbm.visible_size())?;

        let clock = Instant::now();
        let layer_count = deep_rbm.layers().len();
        let mut pieces = data.split_columns(deep_rbm.layers()[0].size())?;

        for l in 0..layer_count {
            if l > 0 {
                // Feed the just-trained layer forward to build this layer's
                // training inputs.
                let outputs = {
                    let previous = &deep_rbm.layers()[l - 1];
                    let mut outputs = Vec::with_capacity(previous.size());
                    for (r, rbm) in previous.rbms().iter().enumerate() {
                        outputs.push(self.cd.run_visible(rbm, &pieces[r])?);
                    }
                    outputs
                };
                pieces =
                    M::concat_columns(&outputs)?.split_columns(deep_rbm.layers()[l].size())?;
            }

            let layer = deep_rbm.layer_mut(l);
            for (r, rbm) in layer.rbms_mut().iter_mut().enumerate() {
                self.cd.learn(rbm, &pieces[r])?;
            }
        }

        if self.cd.params().log {
            info!(
                "all {} layers finished training in {}ms",
                layer_count,
                clock.elapsed().as_millis()
            );
        }
        Ok(())
    }

    /// Feed visible data forward through every layer; returns the sampled
    /// hidden codes of the last layer.
    pub fn run_visible<M: Matrix>(&mut self, deep_rbm: &DeepRbm<M>, data: &M) -> RbmResult<M> {
        check_width("visible data", data, deep_rbm.visible_size())?;

        let layers = deep_rbm.layers();
        let mut pieces = data.split_columns(layers[0].size())?;
        let mut outputs: Vec<M> = Vec::new();

        for (l, layer) in layers.iter().enumerate() {
            if l > 0 {
                pieces = M::concat_columns(&outputs)?.split_columns(layer.size())?;
            }
            outputs = layer
                .rbms()
                .iter()
                .enumerate()
                .map(|(r, rbm)| self.cd.run_visible(rbm, &pieces[r]))
                .collect::<RbmResult<Vec<M>>>()?;
        }

        Ok(M::concat_columns(&outputs)?)
    }

    /// Feed hidden codes backward from the last layer to the first; returns
    /// the sampled visible reconstruction.
    pub fn run_hidden<M: Matrix>(&mut self, deep_rbm: &DeepRbm<M>, data: &M) -> RbmResult<M> {
        check_width("hidden data", data, deep_rbm.hidden_size())?;

        let layers = deep_rbm.layers();
        let last = layers.len() - 1;
        let mut pieces = data.split_columns(layers[last].size())?;
        let mut outputs: Vec<M> = Vec::new();

        for l in (0..layers.len()).rev() {
            if l < last {
                pieces = M::concat_columns(&outputs)?.split_columns(layers[l].size())?;
            }
            outputs = layers[l]
                .rbms()
                .iter()
                .enumerate()
                .map(|(r, rbm)| self.cd.run_hidden(rbm, &pieces[r]))
                .collect::<RbmResult<Vec<M>>>()?;
        }

        Ok(M::concat_columns(&outputs)?)
    }
}

pub(super) fn check_width<M: Matrix>(what: &str, data: &M, expected: usize) -> RbmResult<()> {
    if data.cols() != expected {
        return Err(RbmError::Matrix(MatrixError::DimensionMismatch(format!(
            "{} has {} columns, stack expects {}",
            what,
            data.cols(),
            expected
        ))));
    }
    Ok(())
}
