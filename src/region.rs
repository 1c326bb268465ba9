//! Axis-aligned boxes and row ranges

use crate::error::{FitsError, Result};
use crate::position::{Axes, Position, MAX};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Closed box between two positions, both included
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region<A: Axes = [i64; 2]> {
    pub front: Position<A>,
    pub back: Position<A>,
}

/// Region of compile-time dimension `N`
pub type FixedRegion<const N: usize> = Region<[i64; N]>;

/// Region of run-time dimension
pub type DynRegion = Region<Vec<i64>>;

impl<A: Axes> Region<A> {
    pub fn new(front: Position<A>, back: Position<A>) -> Result<Self> {
        if front.dimension() != back.dimension() {
            return Err(FitsError::DimensionMismatch(format!(
                "Front {} and back {} differ in dimension",
                front, back
            )));
        }
        Ok(Self { front, back })
    }

    /// Region starting at `front` with given `shape`
    pub fn from_shape(front: Position<A>, shape: &Position<A>) -> Result<Self> {
        let back = front.try_add(shape)? - 1;
        Ok(Self { front, back })
    }

    /// Region from the origin to an unresolved back position
    pub fn whole_of(dimension: usize) -> Result<Self> {
        Ok(Self {
            front: Position::filled(dimension, 0)?,
            back: Position::filled(dimension, MAX)?,
        })
    }

    pub fn dimension(&self) -> usize {
        self.front.dimension()
    }

    /// `back - front + 1`
    pub fn shape(&self) -> Position<A> {
        &(&self.back - &self.front) + 1
    }

    /// Number of positions in the region
    pub fn size(&self) -> Result<usize> {
        self.shape().shape_size()
    }

    /// Check whether no back component is left open
    pub fn is_resolved(&self) -> bool {
        !self.back.has_max()
    }

    /// Replace open back components with the last index of `shape`
    pub fn resolve_within(&self, shape: &Position<A>) -> Result<Self> {
        if shape.dimension() != self.dimension() {
            return Err(FitsError::DimensionMismatch(format!(
                "Region of dimension {} cannot be resolved against shape {}",
                self.dimension(),
                shape
            )));
        }
        let mut out = self.clone();
        for (b, &s) in out.back.as_mut_slice().iter_mut().zip(shape.iter()) {
            if *b == MAX {
                *b = s - 1;
            }
        }
        Ok(out)
    }

    /// Check whether a resolved region lies inside `[0, shape)`
    pub fn is_within(&self, shape: &Position<A>) -> bool {
        self.dimension() == shape.dimension()
            && self
                .front
                .iter()
                .zip(self.back.iter())
                .zip(shape.iter())
                .all(|((&f, &b), &s)| 0 <= f && f <= b && b < s)
    }

    pub fn contains(&self, position: &Position<A>) -> bool {
        position.dimension() == self.dimension()
            && position
                .iter()
                .zip(self.front.iter().zip(self.back.iter()))
                .all(|(&p, (&f, &b))| f <= p && p <= b)
    }

    /// Region shifted by `delta`
    pub fn translate(&self, delta: &Position<A>) -> Result<Self> {
        Ok(Self {
            front: self.front.try_add(delta)?,
            back: self.back.try_add(delta)?,
        })
    }

    /// Iterate over the positions of a resolved region, axis 0 fastest
    pub fn positions(&self) -> PositionIter<A> {
        PositionIter::new(self.clone())
    }
}

impl<const N: usize> Region<[i64; N]> {
    pub fn whole() -> Self {
        Self {
            front: Position::<[i64; N]>::zero(),
            back: Position::<[i64; N]>::max(),
        }
    }
}

impl Region<Vec<i64>> {
    pub fn whole(dimension: usize) -> Self {
        Self {
            front: Position::<Vec<i64>>::zero(dimension),
            back: Position::<Vec<i64>>::max(dimension),
        }
    }
}

/// Iterator over the positions of a region, axis 0 varying fastest
#[derive(Debug, Clone)]
pub struct PositionIter<A: Axes> {
    region: Region<A>,
    current: Option<Position<A>>,
}

impl<A: Axes> PositionIter<A> {
    fn new(region: Region<A>) -> Self {
        let empty = region
            .front
            .iter()
            .zip(region.back.iter())
            .any(|(&f, &b)| b < f);
        let current = if empty {
            None
        } else {
            Some(region.front.clone())
        };
        Self { region, current }
    }
}

impl<A: Axes> Iterator for PositionIter<A> {
    type Item = Position<A>;

    fn next(&mut self) -> Option<Position<A>> {
        let current = self.current.take()?;
        let mut next = current.clone();
        let mut exhausted = true;
        for axis in 0..next.dimension() {
            if next[axis] < self.region.back[axis] {
                next[axis] += 1;
                exhausted = false;
                break;
            }
            next[axis] = self.region.front[axis];
        }
        if !exhausted {
            self.current = Some(next);
        }
        Some(current)
    }
}

/// Half-open range of table rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    /// First row (0-based)
    pub first: usize,
    /// Number of rows
    pub count: usize,
}

impl Segment {
    pub fn from_size(first: usize, count: usize) -> Self {
        Self { first, count }
    }

    pub fn size(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Past-the-last row
    pub fn end(&self) -> usize {
        self.first + self.count
    }

    pub fn rows(&self) -> Range<usize> {
        self.first..self.end()
    }
}
