//! Training and inference engines.
//!
//! Every trainer consumes a [`crate::LearningParameters`] and mutates RBM
//! weight matrices in place; nothing here holds model state of its own beyond
//! a random generator for Gibbs sampling.
//!
//! - [`ContrastiveDivergence`] — CD-1 for a single RBM
//! - [`RecurrentContrastiveDivergence`] — CD over a sliding temporal window
//! - [`BackErrorPropagation`] — supervised fine-tuning of the weight matrix
//! - [`DeepContrastiveDivergence`] — greedy layer-wise deep training
//! - [`MultiThreadedDeepContrastiveDivergence`] — the same, with each layer's
//!   independent RBMs trained on a worker pool

mod backprop;
mod cd;
mod deep;
mod recurrent;
mod threaded;

pub use backprop::BackErrorPropagation;
pub use cd::ContrastiveDivergence;
pub use deep::DeepContrastiveDivergence;
pub use recurrent::RecurrentContrastiveDivergence;
pub use threaded::MultiThreadedDeepContrastiveDivergence;
