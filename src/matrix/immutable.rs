//! Shared-ownership matrix variant.

use ndarray::Array2;
use std::sync::Arc;

use super::Matrix;

/// Matrix with persistent value semantics.
///
/// The backing array sits behind an [`Arc`], so cloning a handle is a pointer
/// bump and handles can be shared freely across threads. Operations that
/// would write (`set`, the consuming element-wise ops) copy-on-write first,
/// so no operation is ever observable through another handle.
#[derive(Debug, Clone, PartialEq)]
pub struct ImmutableMatrix {
    values: Arc<Array2<f64>>,
}

impl Matrix for ImmutableMatrix {
    fn from_array(values: Array2<f64>) -> Self {
        Self {
            values: Arc::new(values),
        }
    }

    fn as_array(&self) -> &Array2<f64> {
        &self.values
    }

    fn as_array_mut(&mut self) -> &mut Array2<f64> {
        Arc::make_mut(&mut self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_do_not_leak_to_clones() {
        let a = ImmutableMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let mut b = a.clone();
        b.set(0, 0, 9.0);
        assert_eq!(a.get(0, 0), 1.0);
        assert_eq!(b.get(0, 0), 9.0);
    }

    #[test]
    fn consuming_ops_leave_siblings_alone() {
        let a = ImmutableMatrix::from_rows(&[vec![1.0, 2.0]]).unwrap();
        let b = a.clone();
        let doubled = b.multiply_scalar(2.0);
        assert_eq!(a.get(0, 1), 2.0);
        assert_eq!(doubled.get(0, 1), 4.0);
    }
}
