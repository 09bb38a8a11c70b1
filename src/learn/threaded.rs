//! Multi-threaded greedy layer-wise training.
//!
//! Same algorithm as [`super::DeepContrastiveDivergence`], except that within
//! a layer each RBM's full CD run is submitted to a fixed-size worker pool.
//! Every task exclusively owns its RBM and its column slice of the dataset,
//! so no locks are needed; the parallel iterator's join is the barrier that
//! keeps layer L+1 from starting before all of layer L has finished.
//!
//! A failed task aborts the whole layer and the error propagates — a
//! silently skipped RBM would corrupt the next layer's column partition.
//!
//! Each task trains with its own generator, seeded from the scheduler's base
//! seed and the task's (layer, index) coordinates: runs are reproducible per
//! seed with streams independent across workers.

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::time::Instant;

use crate::deep::DeepRbm;
use crate::matrix::Matrix;
use crate::rbm::{RbmError, RbmResult};
use crate::LearningParameters;

use super::deep::check_width;
use super::{ContrastiveDivergence, DeepContrastiveDivergence};

const DEFAULT_WORKERS: usize = 8;

pub struct MultiThreadedDeepContrastiveDivergence {
    params: LearningParameters,
    pool: ThreadPool,
    base_seed: u64,
    /// Feeds activations between layers (sequential, outside the pool).
    cd: ContrastiveDivergence,
    /// Inference is delegated; it is not worth parallelizing.
    deep_cd: DeepContrastiveDivergence,
}

impl MultiThreadedDeepContrastiveDivergence {
    pub fn new(params: LearningParameters) -> RbmResult<Self> {
        Self::with_workers(params, DEFAULT_WORKERS)
    }

    pub fn with_workers(params: LearningParameters, workers: usize) -> RbmResult<Self> {
        let seed = StdRng::from_entropy().gen();
        Self::with_workers_and_seed(params, workers, seed)
    }

    /// Fully seeded variant: the base seed determines every task's sampling
    /// stream, so identical inputs give identical weights.
    pub fn with_workers_and_seed(
        params: LearningParameters,
        workers: usize,
        base_seed: u64,
    ) -> RbmResult<Self> {
        if workers == 0 {
            return Err(RbmError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| RbmError::InvalidConfig(format!("worker pool: {}", e)))?;
        Ok(Self {
            params,
            pool,
            base_seed,
            cd: ContrastiveDivergence::with_seed(params, task_seed(base_seed, usize::MAX, 0)),
            deep_cd: DeepContrastiveDivergence::with_seed(
                params,
                task_seed(base_seed, usize::MAX, 1),
            ),
        })
    }

    /// Train the stack; within each layer the per-RBM CD runs execute on the
    /// worker pool and the layer completes only when all of them have.
    pub fn learn<M: Matrix>(&mut self, deep_rbm: &mut DeepRbm<M>, data: &M) -> RbmResult<()> {
        check_width("training data", data, deep_rbm.visible_size())?;

        let clock = Instant::now();
        let layer_count = deep_rbm.layers().len();
        let mut pieces = data.split_columns(deep_rbm.layers()[0].size())?;

        for l in 0..layer_count {
            if l > 0 {
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

            let params = self.params;
            let base_seed = self.base_seed;
            let layer_pieces = &pieces;
            let layer = deep_rbm.layer_mut(l);

            // Barrier: install() returns only after every task in the layer
            // has finished; the first Err cancels the rest and propagates.
            self.pool.install(|| {
                layer
                    .rbms_mut()
                    .par_iter_mut()
                    .enumerate()
                    .try_for_each(|(r, rbm)| {
                        let mut cd =
                            ContrastiveDivergence::with_seed(params, task_seed(base_seed, l, r));
                        cd.learn(rbm, &layer_pieces[r]).map(|_| ())
                    })
            })?;
        }

        if self.params.log {
            info!(
                "all {} layers finished training in {}ms",
                layer_count,
                clock.elapsed().as_millis()
            );
        }
        Ok(())
    }

    /// See [`DeepContrastiveDivergence::run_visible`].
    pub fn run_visible<M: Matrix>(&mut self, deep_rbm: &DeepRbm<M>, data: &M) -> RbmResult<M> {
        self.deep_cd.run_visible(deep_rbm, data)
    }

    /// See [`DeepContrastiveDivergence::run_hidden`].
    pub fn run_hidden<M: Matrix>(&mut self, deep_rbm: &DeepRbm<M>, data: &M) -> RbmResult<M> {
        self.deep_cd.run_hidden(deep_rbm, data)
    }
}

/// splitmix64 over the task coordinates keeps per-task streams apart even
/// for adjacent (layer, index) pairs.
fn task_seed(base: u64, layer: usize, r: usize) -> u64 {
    let coords = ((layer as u64) << 32) | (r as u64 & 0xFFFF_FFFF);
    let mut z = base ^ coords.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
