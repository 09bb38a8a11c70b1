//! Single-owner matrix variant.

use ndarray::Array2;

use super::Matrix;

/// Matrix that owns its buffer outright.
///
/// Element-wise operations consume `self` and update the buffer in place, so
/// a chain like `m.subtract(&n)?.pow(2.0).sum()` allocates nothing beyond the
/// original. Cloning copies the full buffer; for cheap sharing use
/// [`super::ImmutableMatrix`].
#[derive(Debug, Clone, PartialEq)]
pub struct MutableMatrix {
    values: Array2<f64>,
}

impl Matrix for MutableMatrix {
    fn from_array(values: Array2<f64>) -> Self {
        Self { values }
    }

    fn as_array(&self) -> &Array2<f64> {
        &self.values
    }

    fn as_array_mut(&mut self) -> &mut Array2<f64> {
        &mut self.values
    }
}
