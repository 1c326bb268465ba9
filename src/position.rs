//! Coordinate tuples of fixed or run-time dimension
//!
//! A [`Position`] stores its components in a type implementing [`Axes`]:
//! `[i64; N]` when the dimension is known at compile time, `Vec<i64>` when it is
//! only known at run time. Both share every algorithm, including the linear
//! index computation of [`linear_index`].

use crate::error::{FitsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::ops::{Add, Index, IndexMut, Sub};

/// Sentinel component meaning "up to the natural bound of the other side".
pub const MAX: i64 = -1;

/// Storage of the components of a position
pub trait Axes: Clone + fmt::Debug + PartialEq + Eq + Hash + Send + Sync + 'static {
    /// Compile-time dimension, if any
    const RANK: Option<usize>;

    /// Create components all equal to `value`
    fn filled(dimension: usize, value: i64) -> Result<Self>;

    /// Create components from a slice
    fn from_slice(values: &[i64]) -> Result<Self>;

    fn as_slice(&self) -> &[i64];

    fn as_mut_slice(&mut self) -> &mut [i64];
}

impl<const N: usize> Axes for [i64; N] {
    const RANK: Option<usize> = Some(N);

    fn filled(dimension: usize, value: i64) -> Result<Self> {
        if dimension != N {
            return Err(FitsError::DimensionMismatch(format!(
                "Expected dimension {}, got {}",
                N, dimension
            )));
        }
        Ok([value; N])
    }

    fn from_slice(values: &[i64]) -> Result<Self> {
        <[i64; N]>::try_from(values).map_err(|_| {
            FitsError::DimensionMismatch(format!(
                "Expected dimension {}, got {}",
                N,
                values.len()
            ))
        })
    }

    fn as_slice(&self) -> &[i64] {
        self
    }

    fn as_mut_slice(&mut self) -> &mut [i64] {
        self
    }
}

impl Axes for Vec<i64> {
    const RANK: Option<usize> = None;

    fn filled(dimension: usize, value: i64) -> Result<Self> {
        Ok(vec![value; dimension])
    }

    fn from_slice(values: &[i64]) -> Result<Self> {
        Ok(values.to_vec())
    }

    fn as_slice(&self) -> &[i64] {
        self
    }

    fn as_mut_slice(&mut self) -> &mut [i64] {
        self
    }
}

/// Linear offset of `position` in a buffer of given `shape`.
///
/// Axis 0 varies fastest: `p[0] + s[0] * (p[1] + s[1] * (p[2] + ...))`.
pub fn linear_index(shape: &[i64], position: &[i64]) -> i64 {
    debug_assert_eq!(shape.len(), position.len());
    shape
        .iter()
        .zip(position)
        .rev()
        .fold(0, |acc, (&s, &p)| p + s * acc)
}

/// Ordered sequence of signed coordinates, one per axis
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position<A: Axes = [i64; 2]> {
    coords: A,
}

/// Position of compile-time dimension `N`
pub type FixedPosition<const N: usize> = Position<[i64; N]>;

/// Position of run-time dimension
pub type DynPosition = Position<Vec<i64>>;

impl<A: Axes> Position<A> {
    pub fn new(coords: A) -> Self {
        Self { coords }
    }

    pub fn from_slice(values: &[i64]) -> Result<Self> {
        Ok(Self::new(A::from_slice(values)?))
    }

    /// Position of given dimension with all components equal to `value`
    pub fn filled(dimension: usize, value: i64) -> Result<Self> {
        Ok(Self::new(A::filled(dimension, value)?))
    }

    /// Zero position of the same dimension as `self`
    pub fn zero_like(&self) -> Self {
        self.map(|_| 0)
    }

    pub fn dimension(&self) -> usize {
        self.coords.as_slice().len()
    }

    pub fn as_slice(&self) -> &[i64] {
        self.coords.as_slice()
    }

    pub fn as_mut_slice(&mut self) -> &mut [i64] {
        self.coords.as_mut_slice()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, i64> {
        self.as_slice().iter()
    }

    pub fn into_inner(self) -> A {
        self.coords
    }

    /// Check whether all components are [`MAX`]
    pub fn is_max(&self) -> bool {
        self.iter().all(|&c| c == MAX)
    }

    /// Check whether any component is [`MAX`]
    pub fn has_max(&self) -> bool {
        self.iter().any(|&c| c == MAX)
    }

    pub fn is_zero(&self) -> bool {
        self.iter().all(|&c| c == 0)
    }

    /// Product of the components, i.e. the number of values of a shape
    pub fn shape_size(&self) -> Result<usize> {
        crate::utils::shape_size(self.as_slice())
    }

    /// Apply `f` to each component
    pub fn map(&self, f: impl Fn(i64) -> i64) -> Self {
        let mut out = self.clone();
        for c in out.as_mut_slice() {
            *c = f(*c);
        }
        out
    }

    fn combine(&self, rhs: &Self, f: impl Fn(i64, i64) -> i64) -> Self {
        let mut out = self.clone();
        for (c, &r) in out.as_mut_slice().iter_mut().zip(rhs.iter()) {
            *c = f(*c, r);
        }
        out
    }

    fn zip_with(&self, rhs: &Self, op: &str, f: impl Fn(i64, i64) -> i64) -> Result<Self> {
        if self.dimension() != rhs.dimension() {
            return Err(FitsError::DimensionMismatch(format!(
                "Cannot {} positions of dimensions {} and {}",
                op,
                self.dimension(),
                rhs.dimension()
            )));
        }
        Ok(self.combine(rhs, f))
    }

    /// Component-wise sum
    pub fn try_add(&self, rhs: &Self) -> Result<Self> {
        self.zip_with(rhs, "add", |a, b| a + b)
    }

    /// Component-wise difference
    pub fn try_sub(&self, rhs: &Self) -> Result<Self> {
        self.zip_with(rhs, "subtract", |a, b| a - b)
    }

    /// Keep the first `dimension` components (all of them for a dynamic target)
    pub fn slice_as<B: Axes>(&self) -> Result<Position<B>> {
        let dimension = B::RANK.unwrap_or(self.dimension());
        if dimension > self.dimension() {
            return Err(FitsError::DimensionMismatch(format!(
                "Cannot slice a position of dimension {} to dimension {}",
                self.dimension(),
                dimension
            )));
        }
        Position::from_slice(&self.as_slice()[..dimension])
    }

    /// Extend to the dimension of `padding`, taking trailing components from it
    pub fn extend<B: Axes>(&self, padding: &Position<B>) -> Result<Position<B>> {
        if self.dimension() > padding.dimension() {
            return Err(FitsError::DimensionMismatch(format!(
                "Cannot extend a position of dimension {} to dimension {}",
                self.dimension(),
                padding.dimension()
            )));
        }
        let mut out = padding.clone();
        out.as_mut_slice()[..self.dimension()].copy_from_slice(self.as_slice());
        Ok(out)
    }

    pub fn to_dyn(&self) -> DynPosition {
        Position::new(self.as_slice().to_vec())
    }
}

impl<const N: usize> Position<[i64; N]> {
    pub fn zero() -> Self {
        Self::new([0; N])
    }

    pub fn one() -> Self {
        Self::new([1; N])
    }

    pub fn max() -> Self {
        Self::new([MAX; N])
    }
}

impl Position<Vec<i64>> {
    pub fn zero(dimension: usize) -> Self {
        Self::new(vec![0; dimension])
    }

    pub fn one(dimension: usize) -> Self {
        Self::new(vec![1; dimension])
    }

    pub fn max(dimension: usize) -> Self {
        Self::new(vec![MAX; dimension])
    }
}

impl<const N: usize> From<[i64; N]> for Position<[i64; N]> {
    fn from(coords: [i64; N]) -> Self {
        Self::new(coords)
    }
}

impl From<Vec<i64>> for Position<Vec<i64>> {
    fn from(coords: Vec<i64>) -> Self {
        Self::new(coords)
    }
}

impl<A: Axes> fmt::Debug for Position<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_slice())
    }
}

impl<A: Axes> fmt::Display for Position<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|c| c.to_string()).collect();
        write!(f, "({})", parts.join(", "))
    }
}

impl<A: Axes> Index<usize> for Position<A> {
    type Output = i64;

    fn index(&self, axis: usize) -> &i64 {
        &self.as_slice()[axis]
    }
}

impl<A: Axes> IndexMut<usize> for Position<A> {
    fn index_mut(&mut self, axis: usize) -> &mut i64 {
        &mut self.as_mut_slice()[axis]
    }
}

// Operators panic on mismatched dimensions, like slice indexing does;
// use `try_add` and `try_sub` to get an error instead.

impl<A: Axes> Add for &Position<A> {
    type Output = Position<A>;

    fn add(self, rhs: Self) -> Position<A> {
        assert_eq!(self.dimension(), rhs.dimension(), "dimension mismatch");
        self.combine(rhs, |a, b| a + b)
    }
}

impl<A: Axes> Sub for &Position<A> {
    type Output = Position<A>;

    fn sub(self, rhs: Self) -> Position<A> {
        assert_eq!(self.dimension(), rhs.dimension(), "dimension mismatch");
        self.combine(rhs, |a, b| a - b)
    }
}

impl<A: Axes> Add for Position<A> {
    type Output = Position<A>;

    fn add(self, rhs: Self) -> Position<A> {
        &self + &rhs
    }
}

impl<A: Axes> Sub for Position<A> {
    type Output = Position<A>;

    fn sub(self, rhs: Self) -> Position<A> {
        &self - &rhs
    }
}

impl<A: Axes> Add<i64> for &Position<A> {
    type Output = Position<A>;

    fn add(self, rhs: i64) -> Position<A> {
        self.map(|c| c + rhs)
    }
}

impl<A: Axes> Sub<i64> for &Position<A> {
    type Output = Position<A>;

    fn sub(self, rhs: i64) -> Position<A> {
        self.map(|c| c - rhs)
    }
}

impl<A: Axes> Add<i64> for Position<A> {
    type Output = Position<A>;

    fn add(self, rhs: i64) -> Position<A> {
        &self + rhs
    }
}

impl<A: Axes> Sub<i64> for Position<A> {
    type Output = Position<A>;

    fn sub(self, rhs: i64) -> Position<A> {
        &self - rhs
    }
}
