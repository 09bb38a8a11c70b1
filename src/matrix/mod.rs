//! Dense numeric matrix core.
//!
//! Everything above this module (RBMs, trainers, persistence) speaks in terms
//! of the [`Matrix`] trait, so callers pick the ownership variant that fits:
//!
//! - [`ImmutableMatrix`] — `Arc`-backed, cheap to clone and safe to hand
//!   across threads; operations never touch storage another handle can see.
//! - [`MutableMatrix`] — owns its buffer outright; element-wise operations
//!   consume `self` and update in place, the single-owner fast path.
//!
//! Element-wise operations take `self` by value and return `Self`: the
//! immutable variant copies-on-write, the mutable variant mutates its own
//! buffer. Allocating operations (`dot`, `transpose`, splits and concats)
//! take `&self`.
//!
//! Dimension violations and scalar division by zero surface as
//! [`MatrixError`] before any storage is modified.

use ndarray::{concatenate, s, Array2, Axis};
use ndarray_rand::RandomExt;
use rand::distributions::Uniform;
use rand::Rng;
use std::fmt;

mod immutable;
mod mutable;

pub use immutable::ImmutableMatrix;
pub use mutable::MutableMatrix;

/// Error type for matrix operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatrixError {
    /// Incompatible shapes for a product, element-wise op, split or append.
    DimensionMismatch(String),
    /// Scalar division by zero.
    DivideByZero,
}

impl fmt::Display for MatrixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatrixError::DimensionMismatch(msg) => write!(f, "dimension mismatch: {}", msg),
            MatrixError::DivideByZero => write!(f, "scalar division by zero"),
        }
    }
}

impl std::error::Error for MatrixError {}

pub type MatrixResult<T> = Result<T, MatrixError>;

/// Closed set of element-wise unary functions.
///
/// The trainers only ever need these four shapes, so they are named variants
/// rather than boxed closures; `LearningParameters` carries one by value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryFunction {
    /// `1 / (1 + e^-x)`
    Sigmoid,
    /// `min + (max - min) / (1 + e^-x)`
    RangedSigmoid { min: f64, max: f64 },
    /// `1.0` if `x >= threshold`, else `0.0`
    Round { threshold: f64 },
    /// `x^p`
    Power(f64),
}

impl UnaryFunction {
    /// Binarization with the conventional 0.8 cutoff.
    pub fn round() -> Self {
        UnaryFunction::Round { threshold: 0.8 }
    }

    pub fn apply(&self, x: f64) -> f64 {
        match *self {
            UnaryFunction::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            UnaryFunction::RangedSigmoid { min, max } => min + (max - min) / (1.0 + (-x).exp()),
            UnaryFunction::Round { threshold } => {
                if x >= threshold {
                    1.0
                } else {
                    0.0
                }
            }
            UnaryFunction::Power(p) => x.powf(p),
        }
    }
}

/// Closed set of element-wise binary functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryFunction {
    /// Stochastic activation threshold: `1.0` if `x >= y`, else `0.0`.
    ///
    /// Pairing an activation-probability matrix with a uniform-random matrix
    /// turns probabilities into sampled binary unit states.
    ActivationState,
}

impl BinaryFunction {
    pub fn apply(&self, x: f64, y: f64) -> f64 {
        match self {
            BinaryFunction::ActivationState => {
                if x >= y {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

fn check_same_shape<M: Matrix>(op: &str, a: &M, b: &M) -> MatrixResult<()> {
    if a.rows() != b.rows() || a.cols() != b.cols() {
        return Err(MatrixError::DimensionMismatch(format!(
            "{}: left is {}x{}, right is {}x{}",
            op,
            a.rows(),
            a.cols(),
            b.rows(),
            b.cols()
        )));
    }
    Ok(())
}

/// Dense 2-D matrix of `f64`.
///
/// Backed by an [`Array2<f64>`]; implementors only supply storage access
/// (`from_array`, `as_array`, `as_array_mut`) and inherit the full operation
/// set. `as_array_mut` is where the ownership variants differ: the mutable
/// variant hands out its buffer directly, the immutable variant
/// copies-on-write so sibling handles are never disturbed.
pub trait Matrix: Clone + Send + Sync + Sized + fmt::Debug {
    /// Wrap an owned array.
    fn from_array(values: Array2<f64>) -> Self;

    /// Read-only view of the backing array.
    fn as_array(&self) -> &Array2<f64>;

    /// Writable access to the backing array, never visible to other handles.
    fn as_array_mut(&mut self) -> &mut Array2<f64>;

    /// Build from row slices. All rows must have equal length.
    fn from_rows(rows: &[Vec<f64>]) -> MatrixResult<Self> {
        let nrows = rows.len();
        let ncols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != ncols) {
            return Err(MatrixError::DimensionMismatch(
                "from_rows: rows have unequal lengths".to_string(),
            ));
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        Array2::from_shape_vec((nrows, ncols), flat)
            .map(Self::from_array)
            .map_err(|e| MatrixError::DimensionMismatch(format!("from_rows: {}", e)))
    }

    /// Zero-filled `rows x cols` matrix.
    fn zeros(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Uniform-random `[0, 1)` matrix, drawn from the supplied generator.
    fn random<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Self {
        Self::from_array(Array2::random_using(
            (rows, cols),
            Uniform::new(0.0, 1.0),
            rng,
        ))
    }

    fn rows(&self) -> usize {
        self.as_array().nrows()
    }

    fn cols(&self) -> usize {
        self.as_array().ncols()
    }

    /// Total element count.
    fn dim(&self) -> usize {
        self.rows() * self.cols()
    }

    fn get(&self, i: usize, j: usize) -> f64 {
        self.as_array()[(i, j)]
    }

    fn set(&mut self, i: usize, j: usize, value: f64) {
        self.as_array_mut()[(i, j)] = value;
    }

    /// Copy of row `i`. A copy, not a view, so callers can never alias the
    /// backing storage.
    fn row(&self, i: usize) -> Vec<f64> {
        self.as_array().row(i).to_vec()
    }

    fn sum(&self) -> f64 {
        self.as_array().sum()
    }

    /// Standard matrix product. Fails when `self.cols() != other.rows()`.
    fn dot(&self, other: &Self) -> MatrixResult<Self> {
        if self.cols() != other.rows() {
            return Err(MatrixError::DimensionMismatch(format!(
                "dot: left is {}x{}, right is {}x{}",
                self.rows(),
                self.cols(),
                other.rows(),
                other.cols()
            )));
        }
        Ok(Self::from_array(self.as_array().dot(other.as_array())))
    }

    fn transpose(&self) -> Self {
        Self::from_array(self.as_array().t().to_owned())
    }

    fn add(mut self, other: &Self) -> MatrixResult<Self> {
        check_same_shape("add", &self, other)?;
        *self.as_array_mut() += other.as_array();
        Ok(self)
    }

    fn subtract(mut self, other: &Self) -> MatrixResult<Self> {
        check_same_shape("subtract", &self, other)?;
        *self.as_array_mut() -= other.as_array();
        Ok(self)
    }

    fn multiply(mut self, other: &Self) -> MatrixResult<Self> {
        check_same_shape("multiply", &self, other)?;
        *self.as_array_mut() *= other.as_array();
        Ok(self)
    }

    fn divide(mut self, other: &Self) -> MatrixResult<Self> {
        check_same_shape("divide", &self, other)?;
        *self.as_array_mut() /= other.as_array();
        Ok(self)
    }

    fn add_scalar(mut self, s: f64) -> Self {
        self.as_array_mut().mapv_inplace(|v| v + s);
        self
    }

    fn subtract_scalar(mut self, s: f64) -> Self {
        self.as_array_mut().mapv_inplace(|v| v - s);
        self
    }

    fn multiply_scalar(mut self, s: f64) -> Self {
        self.as_array_mut().mapv_inplace(|v| v * s);
        self
    }

    /// Scalar division. Fails with [`MatrixError::DivideByZero`] when `s == 0`.
    fn divide_scalar(mut self, s: f64) -> MatrixResult<Self> {
        if s == 0.0 {
            return Err(MatrixError::DivideByZero);
        }
        self.as_array_mut().mapv_inplace(|v| v / s);
        Ok(self)
    }

    /// Element-wise power.
    fn pow(mut self, exponent: f64) -> Self {
        self.as_array_mut().mapv_inplace(|v| v.powf(exponent));
        self
    }

    /// Element-wise unary function application.
    fn apply(mut self, f: UnaryFunction) -> Self {
        self.as_array_mut().mapv_inplace(|v| f.apply(v));
        self
    }

    /// Element-wise binary function against a second matrix of equal shape.
    fn apply_binary(mut self, other: &Self, f: BinaryFunction) -> MatrixResult<Self> {
        check_same_shape("apply_binary", &self, other)?;
        ndarray::Zip::from(self.as_array_mut())
            .and(other.as_array())
            .for_each(|a, &b| *a = f.apply(*a, b));
        Ok(self)
    }

    fn fill(mut self, value: f64) -> Self {
        self.as_array_mut().fill(value);
        self
    }

    /// Horizontal append: `self` on the left, `other` on the right.
    fn append_columns(&self, other: &Self) -> MatrixResult<Self> {
        if self.rows() != other.rows() {
            return Err(MatrixError::DimensionMismatch(format!(
                "append_columns: {} rows vs {} rows",
                self.rows(),
                other.rows()
            )));
        }
        concatenate(Axis(1), &[self.as_array().view(), other.as_array().view()])
            .map(Self::from_array)
            .map_err(|e| MatrixError::DimensionMismatch(format!("append_columns: {}", e)))
    }

    /// Vertical append: `self` on top, `other` below.
    fn append_rows(&self, other: &Self) -> MatrixResult<Self> {
        if self.cols() != other.cols() {
            return Err(MatrixError::DimensionMismatch(format!(
                "append_rows: {} cols vs {} cols",
                self.cols(),
                other.cols()
            )));
        }
        concatenate(Axis(0), &[self.as_array().view(), other.as_array().view()])
            .map(Self::from_array)
            .map_err(|e| MatrixError::DimensionMismatch(format!("append_rows: {}", e)))
    }

    /// Partition into `pieces` equal column blocks, left to right.
    ///
    /// Fails when the column count is not evenly divisible; inverts
    /// [`Matrix::concat_columns`] exactly.
    fn split_columns(&self, pieces: usize) -> MatrixResult<Vec<Self>> {
        if pieces == 0 || self.cols() % pieces != 0 {
            return Err(MatrixError::DimensionMismatch(format!(
                "split_columns: {} columns into {} pieces",
                self.cols(),
                pieces
            )));
        }
        let width = self.cols() / pieces;
        Ok((0..pieces)
            .map(|p| {
                Self::from_array(
                    self.as_array()
                        .slice(s![.., p * width..(p + 1) * width])
                        .to_owned(),
                )
            })
            .collect())
    }

    /// Join column blocks left to right. Inverts [`Matrix::split_columns`].
    fn concat_columns(pieces: &[Self]) -> MatrixResult<Self> {
        if pieces.is_empty() {
            return Err(MatrixError::DimensionMismatch(
                "concat_columns: no pieces".to_string(),
            ));
        }
        let views: Vec<_> = pieces.iter().map(|p| p.as_array().view()).collect();
        concatenate(Axis(1), &views)
            .map(Self::from_array)
            .map_err(|e| MatrixError::DimensionMismatch(format!("concat_columns: {}", e)))
    }

    /// Stack row blocks top to bottom.
    fn concat_rows(pieces: &[Self]) -> MatrixResult<Self> {
        if pieces.is_empty() {
            return Err(MatrixError::DimensionMismatch(
                "concat_rows: no pieces".to_string(),
            ));
        }
        let views: Vec<_> = pieces.iter().map(|p| p.as_array().view()).collect();
        concatenate(Axis(0), &views)
            .map(Self::from_array)
            .map_err(|e| MatrixError::DimensionMismatch(format!("concat_rows: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_midpoint_and_limits() {
        let f = UnaryFunction::Sigmoid;
        assert!((f.apply(0.0) - 0.5).abs() < 1e-12);
        assert!(f.apply(20.0) > 0.999);
        assert!(f.apply(-20.0) < 0.001);
    }

    #[test]
    fn ranged_sigmoid_stays_in_range() {
        let f = UnaryFunction::RangedSigmoid {
            min: -1.0,
            max: 1.0,
        };
        assert!((f.apply(0.0) - 0.0).abs() < 1e-12);
        assert!(f.apply(50.0) <= 1.0);
        assert!(f.apply(-50.0) >= -1.0);
    }

    #[test]
    fn round_threshold() {
        let f = UnaryFunction::Round { threshold: 0.6 };
        assert_eq!(f.apply(0.6), 1.0);
        assert_eq!(f.apply(0.59), 0.0);
        assert_eq!(UnaryFunction::round().apply(0.8), 1.0);
    }

    #[test]
    fn power() {
        let f = UnaryFunction::Power(2.0);
        assert_eq!(f.apply(3.0), 9.0);
    }

    #[test]
    fn activation_state_thresholds() {
        let f = BinaryFunction::ActivationState;
        assert_eq!(f.apply(0.7, 0.5), 1.0);
        assert_eq!(f.apply(0.3, 0.5), 0.0);
        assert_eq!(f.apply(0.5, 0.5), 1.0);
    }
}
