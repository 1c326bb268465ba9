//! N-dimensional contiguous arrays and their contiguous views
//!
//! A [`Raster`] pairs a shape with a flat buffer in which axis 0 varies
//! fastest. The buffer type is a parameter:
//!
//! - [`VecRaster`] owns a `Vec<T>`;
//! - [`PtrRaster`] and [`PtrRasterMut`] borrow a slice of some parent buffer
//!   and therefore cannot outlive it.
//!
//! Slices and sections are contiguous views; see [`crate::subraster`] for
//! non-contiguous ones.

use crate::error::{FitsError, Result};
use crate::position::{linear_index, Axes, Position};
use crate::region::Region;
use crate::utils::{resolve_backward, to_usize};
use ndarray::{ArrayD, IxDyn, ShapeBuilder};
use num_traits::Zero;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut, Range};

/// Shape and contiguous buffer of values
#[derive(Debug, Clone, PartialEq)]
pub struct Raster<T, A: Axes = [i64; 2], S = Vec<T>> {
    shape: Position<A>,
    data: S,
    _value: PhantomData<T>,
}

/// Raster which owns its values
pub type VecRaster<T, A = [i64; 2]> = Raster<T, A, Vec<T>>;

/// Read-only view on the values of another buffer
pub type PtrRaster<'a, T, A = [i64; 2]> = Raster<T, A, &'a [T]>;

/// Read-write view on the values of another buffer
pub type PtrRasterMut<'a, T, A = [i64; 2]> = Raster<T, A, &'a mut [T]>;

/// Owned raster of run-time dimension
pub type DynRaster<T> = VecRaster<T, Vec<i64>>;

impl<T, A: Axes, S: AsRef<[T]>> Raster<T, A, S> {
    /// Bind a shape to a buffer of exactly `product(shape)` values
    pub fn new(shape: Position<A>, data: S) -> Result<Self> {
        let size = shape.shape_size()?;
        if data.as_ref().len() != size {
            return Err(FitsError::Validation(format!(
                "Shape {} requires {} values, got {}",
                shape,
                size,
                data.as_ref().len()
            )));
        }
        Ok(Self {
            shape,
            data,
            _value: PhantomData,
        })
    }

    pub fn shape(&self) -> &Position<A> {
        &self.shape
    }

    pub fn dimension(&self) -> usize {
        self.shape.dimension()
    }

    /// Number of values
    pub fn size(&self) -> usize {
        self.data.as_ref().len()
    }

    pub fn data(&self) -> &[T] {
        self.data.as_ref()
    }

    /// Region spanning from the first to the last position.
    ///
    /// Only meaningful for non-empty rasters: a zero-length axis gives a back
    /// of -1, which reads as [`MAX`](crate::position::MAX).
    pub fn domain(&self) -> Region<A> {
        Region {
            front: self.shape.zero_like(),
            back: &self.shape - 1,
        }
    }

    /// Raw index of a position, without bounds checking
    pub fn index(&self, position: &Position<A>) -> i64 {
        linear_index(self.shape.as_slice(), position.as_slice())
    }

    /// Offset of an in-bounds position
    fn offset(&self, position: &Position<A>) -> Result<usize> {
        if position.dimension() != self.dimension() {
            return Err(FitsError::DimensionMismatch(format!(
                "Position {} does not match raster shape {}",
                position, self.shape
            )));
        }
        let inside = position
            .iter()
            .zip(self.shape.iter())
            .all(|(&p, &s)| 0 <= p && p < s);
        if !inside {
            return Err(FitsError::OutOfBounds(format!(
                "Position {} outside of shape {}",
                position, self.shape
            )));
        }
        to_usize(self.index(position), "offset")
    }

    /// Offset used by indexing operators; out of range maps past the buffer
    fn raw_offset(&self, position: &Position<A>) -> usize {
        usize::try_from(self.index(position)).unwrap_or(usize::MAX)
    }

    /// Value at a position, `None` if out of bounds
    pub fn get(&self, position: &Position<A>) -> Option<&T> {
        let offset = self.offset(position).ok()?;
        self.data.as_ref().get(offset)
    }

    /// Resolve negative components as backward indices, then check bounds
    pub fn resolve_position(&self, position: &Position<A>) -> Result<Position<A>> {
        if position.dimension() != self.dimension() {
            return Err(FitsError::DimensionMismatch(format!(
                "Position {} does not match raster shape {}",
                position, self.shape
            )));
        }
        let mut resolved = position.clone();
        for (p, &s) in resolved.as_mut_slice().iter_mut().zip(self.shape.iter()) {
            *p = resolve_backward(*p, s)?;
        }
        Ok(resolved)
    }

    /// Bounds-checked access with backward indexing
    pub fn at(&self, position: &Position<A>) -> Result<&T> {
        let offset = self.offset(&self.resolve_position(position)?)?;
        Ok(&self.data.as_ref()[offset])
    }

    /// Resolve open back components and check the region fits the shape
    pub fn resolve_region(&self, region: &Region<A>) -> Result<Region<A>> {
        let resolved = region.resolve_within(&self.shape)?;
        if !resolved.is_within(&self.shape) {
            return Err(FitsError::OutOfBounds(format!(
                "Region {}-{} outside of shape {}",
                resolved.front, resolved.back, self.shape
            )));
        }
        Ok(resolved)
    }

    /// Check whether a region maps to contiguous values once viewed in `dimension` axes.
    ///
    /// This holds when axes below `dimension - 1` span the whole extent and
    /// axes from `dimension` on are reduced to a single index.
    pub fn is_contiguous(&self, region: &Region<A>, dimension: usize) -> bool {
        match self.resolve_region(region) {
            Ok(resolved) => self.is_contiguous_resolved(&resolved, dimension),
            Err(_) => false,
        }
    }

    fn is_contiguous_resolved(&self, region: &Region<A>, dimension: usize) -> bool {
        if dimension > self.dimension() {
            return false;
        }
        (0..self.dimension()).all(|axis| {
            let front = region.front[axis];
            let back = region.back[axis];
            if axis + 1 < dimension {
                front == 0 && back == self.shape[axis] - 1
            } else if axis >= dimension {
                front == back
            } else {
                true
            }
        })
    }

    /// Shape and buffer range of a contiguous region viewed in `dimension` axes
    fn slice_bounds<B: Axes>(
        &self,
        region: &Region<A>,
        dimension: usize,
    ) -> Result<(Position<B>, Range<usize>)> {
        if B::RANK.is_some_and(|rank| rank != dimension) {
            return Err(FitsError::DimensionMismatch(format!(
                "Cannot view {} axes with a position type of rank {:?}",
                dimension,
                B::RANK
            )));
        }
        if dimension > self.dimension() {
            return Err(FitsError::DimensionMismatch(format!(
                "Slice dimension {} exceeds raster dimension {}",
                dimension,
                self.dimension()
            )));
        }
        let region = self.resolve_region(region)?;
        if !self.is_contiguous_resolved(&region, dimension) {
            return Err(FitsError::Validation(format!(
                "Region {}-{} is not contiguous in a raster of shape {}",
                region.front, region.back, self.shape
            )));
        }
        let shape = region.shape();
        let shape = Position::<B>::from_slice(&shape.as_slice()[..dimension])?;
        let start = self.offset(&region.front)?;
        let len = shape.shape_size()?;
        Ok((shape, start..start + len))
    }

    /// Contiguous view on a region, of dimension `B::RANK` (the raster's for `Vec<i64>`)
    pub fn slice<B: Axes>(&self, region: &Region<A>) -> Result<PtrRaster<'_, T, B>> {
        self.slice_dyn_rank(region, B::RANK.unwrap_or(self.dimension()))
    }

    /// Contiguous view on a region, of explicit dimension
    pub fn slice_dyn_rank<B: Axes>(
        &self,
        region: &Region<A>,
        dimension: usize,
    ) -> Result<PtrRaster<'_, T, B>> {
        let (shape, range) = self.slice_bounds::<B>(region, dimension)?;
        Raster::new(shape, &self.data.as_ref()[range])
    }

    fn section_region(&self, front: i64, back: i64) -> Result<Region<A>> {
        let last = self.dimension().checked_sub(1).ok_or_else(|| {
            FitsError::DimensionMismatch("Cannot take a section of a 0-dimensional raster".into())
        })?;
        let mut region = self.domain();
        region.front[last] = front;
        region.back[last] = back;
        Ok(region)
    }

    /// Maximal slice between two indices of the last axis
    pub fn section(&self, front: i64, back: i64) -> Result<PtrRaster<'_, T, A>> {
        let region = self.section_region(front, back)?;
        self.slice_dyn_rank(&region, self.dimension())
    }

    /// Maximal slice at one index of the last axis, which is dropped
    pub fn section_at<B: Axes>(&self, index: i64) -> Result<PtrRaster<'_, T, B>> {
        let region = self.section_region(index, index)?;
        self.slice_dyn_rank(&region, self.dimension() - 1)
    }

    /// Borrow the whole raster
    pub fn view(&self) -> PtrRaster<'_, T, A> {
        Raster {
            shape: self.shape.clone(),
            data: self.data.as_ref(),
            _value: PhantomData,
        }
    }

    /// Copy into an owned raster
    pub fn to_vec_raster(&self) -> VecRaster<T, A>
    where
        T: Clone,
    {
        Raster {
            shape: self.shape.clone(),
            data: self.data.as_ref().to_vec(),
            _value: PhantomData,
        }
    }

    /// Copy into an ndarray, axis 0 being the fastest-varying (Fortran order)
    pub fn to_ndarray(&self) -> Result<ArrayD<T>>
    where
        T: Clone,
    {
        let dims = self
            .shape
            .iter()
            .map(|&s| to_usize(s, "axis length"))
            .collect::<Result<Vec<_>>>()?;
        ArrayD::from_shape_vec(IxDyn(&dims).f(), self.data.as_ref().to_vec())
            .map_err(|e| FitsError::DimensionMismatch(e.to_string()))
    }
}

impl<T, A: Axes, S: AsRef<[T]> + AsMut<[T]>> Raster<T, A, S> {
    pub fn data_mut(&mut self) -> &mut [T] {
        self.data.as_mut()
    }

    pub fn get_mut(&mut self, position: &Position<A>) -> Option<&mut T> {
        let offset = self.offset(position).ok()?;
        self.data.as_mut().get_mut(offset)
    }

    /// Bounds-checked mutable access with backward indexing
    pub fn at_mut(&mut self, position: &Position<A>) -> Result<&mut T> {
        let offset = self.offset(&self.resolve_position(position)?)?;
        Ok(&mut self.data.as_mut()[offset])
    }

    pub fn slice_mut<B: Axes>(&mut self, region: &Region<A>) -> Result<PtrRasterMut<'_, T, B>> {
        let dimension = B::RANK.unwrap_or(self.dimension());
        self.slice_dyn_rank_mut(region, dimension)
    }

    pub fn slice_dyn_rank_mut<B: Axes>(
        &mut self,
        region: &Region<A>,
        dimension: usize,
    ) -> Result<PtrRasterMut<'_, T, B>> {
        let (shape, range) = self.slice_bounds::<B>(region, dimension)?;
        Raster::new(shape, &mut self.data.as_mut()[range])
    }

    pub fn section_mut(&mut self, front: i64, back: i64) -> Result<PtrRasterMut<'_, T, A>> {
        let region = self.section_region(front, back)?;
        let dimension = self.dimension();
        self.slice_dyn_rank_mut(&region, dimension)
    }

    pub fn section_at_mut<B: Axes>(&mut self, index: i64) -> Result<PtrRasterMut<'_, T, B>> {
        let region = self.section_region(index, index)?;
        let dimension = self.dimension() - 1;
        self.slice_dyn_rank_mut(&region, dimension)
    }

    pub fn view_mut(&mut self) -> PtrRasterMut<'_, T, A> {
        Raster {
            shape: self.shape.clone(),
            data: self.data.as_mut(),
            _value: PhantomData,
        }
    }

    /// Fill with a value
    pub fn fill(&mut self, value: T)
    where
        T: Clone,
    {
        self.data.as_mut().fill(value);
    }
}

impl<T, A: Axes> Raster<T, A, Vec<T>> {
    /// Raster of given shape filled with zeros
    pub fn zeros(shape: Position<A>) -> Result<Self>
    where
        T: Zero + Clone,
    {
        let size = shape.shape_size()?;
        Raster::new(shape, vec![T::zero(); size])
    }

    /// Raster of given shape filled with default values
    pub fn with_default(shape: Position<A>) -> Result<Self>
    where
        T: Default + Clone,
    {
        let size = shape.shape_size()?;
        Raster::new(shape, vec![T::default(); size])
    }

    /// Move the buffer out without copying
    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// Build from an ndarray, whatever its memory order
    pub fn from_ndarray(array: &ArrayD<T>) -> Result<Self>
    where
        T: Clone,
    {
        let shape = array
            .shape()
            .iter()
            .map(|&s| crate::utils::to_i64(s))
            .collect::<Result<Vec<_>>>()?;
        let data = array.t().iter().cloned().collect();
        Raster::new(Position::from_slice(&shape)?, data)
    }
}

impl<T, A: Axes, S: AsRef<[T]>> Index<&Position<A>> for Raster<T, A, S> {
    type Output = T;

    fn index(&self, position: &Position<A>) -> &T {
        &self.data.as_ref()[self.raw_offset(position)]
    }
}

impl<T, A: Axes, S: AsRef<[T]> + AsMut<[T]>> IndexMut<&Position<A>> for Raster<T, A, S> {
    fn index_mut(&mut self, position: &Position<A>) -> &mut T {
        let offset = self.raw_offset(position);
        &mut self.data.as_mut()[offset]
    }
}

impl<T, A: Axes, S: AsRef<[T]>> Index<usize> for Raster<T, A, S> {
    type Output = T;

    fn index(&self, offset: usize) -> &T {
        &self.data.as_ref()[offset]
    }
}

impl<T, A: Axes, S: AsRef<[T]> + AsMut<[T]>> IndexMut<usize> for Raster<T, A, S> {
    fn index_mut(&mut self, offset: usize) -> &mut T {
        &mut self.data.as_mut()[offset]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::{DynPosition, FixedPosition};
    use rand::Rng;

    fn iota<const N: usize>(shape: [i64; N]) -> VecRaster<i32, [i64; N]> {
        let size: i64 = shape.iter().product();
        Raster::new(Position::from(shape), (0..size as i32).collect()).unwrap()
    }

    fn check_index_equivalence<const N: usize>(rng: &mut impl Rng) {
        for _ in 0..50 {
            let mut shape = [0i64; N];
            let mut position = [0i64; N];
            for axis in 0..N {
                shape[axis] = rng.gen_range(1..8);
                position[axis] = rng.gen_range(0..shape[axis]);
            }
            let size = shape.iter().product::<i64>() as usize;
            let fixed: VecRaster<u8, [i64; N]> =
                Raster::new(Position::from(shape), vec![0; size]).unwrap();
            let dynamic: DynRaster<u8> =
                Raster::new(DynPosition::from(shape.to_vec()), vec![0; size]).unwrap();

            let mut stride = 1;
            let mut expected = 0;
            for axis in 0..N {
                expected += position[axis] * stride;
                stride *= shape[axis];
            }

            let fixed_index = fixed.index(&Position::from(position));
            let dynamic_index = dynamic.index(&DynPosition::from(position.to_vec()));
            assert_eq!(fixed_index, dynamic_index);
            assert_eq!(fixed_index, expected);
        }
    }

    #[test]
    fn test_index_equivalence() {
        let mut rng = rand::thread_rng();
        check_index_equivalence::<1>(&mut rng);
        check_index_equivalence::<2>(&mut rng);
        check_index_equivalence::<3>(&mut rng);
        check_index_equivalence::<5>(&mut rng);
    }

    #[test]
    fn test_new_checks_size() {
        let result: Result<VecRaster<f32>> = Raster::new(Position::from([2, 3]), vec![0.0; 5]);
        assert!(matches!(result, Err(FitsError::Validation(_))));
    }

    #[test]
    fn test_backward_indexing() {
        let raster = iota([4, 3]);
        assert_eq!(
            raster.at(&Position::from([-1, -1])).unwrap(),
            raster.at(&Position::from([3, 2])).unwrap()
        );
        assert_eq!(*raster.at(&Position::from([-4, 0])).unwrap(), 0);
        assert!(matches!(
            raster.at(&Position::from([4, 0])),
            Err(FitsError::OutOfBounds(_))
        ));
        assert!(matches!(
            raster.at(&Position::from([0, -4])),
            Err(FitsError::OutOfBounds(_))
        ));
    }

    #[test]
    fn test_at_mut_and_index() {
        let mut raster = iota([4, 3]);
        *raster.at_mut(&Position::from([-1, 0])).unwrap() = 100;
        assert_eq!(raster[&Position::from([3, 0])], 100);
        raster[&Position::from([0, 1])] = 200;
        assert_eq!(raster[4], 200);
        assert!(raster.get(&Position::from([0, 3])).is_none());
    }

    #[test]
    fn test_contiguity_predicate() {
        let raster = iota([4, 3, 2]);
        let full_plane = Region::new(Position::from([0, 0, 1]), Position::from([3, 2, 1])).unwrap();
        assert!(raster.is_contiguous(&full_plane, 2));
        assert!(raster.is_contiguous(&full_plane, 3));

        let rows = Region::new(Position::from([0, 1, 0]), Position::from([3, 2, 0])).unwrap();
        assert!(raster.is_contiguous(&rows, 2));

        let partial_line = Region::new(Position::from([1, 1, 0]), Position::from([2, 1, 0])).unwrap();
        assert!(raster.is_contiguous(&partial_line, 1));
        assert!(!raster.is_contiguous(&partial_line, 2));

        let block = Region::new(Position::from([1, 0, 0]), Position::from([2, 1, 0])).unwrap();
        assert!(!raster.is_contiguous(&block, 2));
        assert!(!raster.is_contiguous(&block, 3));

        let outside = Region::new(Position::from([0, 0, 0]), Position::from([4, 0, 0])).unwrap();
        assert!(!raster.is_contiguous(&outside, 1));
    }

    #[test]
    fn test_slice_matches_parent() {
        let raster = iota([4, 3, 2]);
        let region = Region::new(Position::from([0, 1, 1]), Position::from([3, 2, 1])).unwrap();
        let slice = raster.slice::<[i64; 2]>(&region).unwrap();
        assert_eq!(slice.shape(), &Position::from([4, 2]));
        for position in slice.domain().positions() {
            let parent = Position::from([position[0], position[1] + 1, 1]);
            assert_eq!(slice[&position], raster[&parent]);
        }

        let block = Region::new(Position::from([1, 0, 0]), Position::from([2, 1, 0])).unwrap();
        assert!(matches!(
            raster.slice::<[i64; 2]>(&block),
            Err(FitsError::Validation(_))
        ));
    }

    #[test]
    fn test_slice_of_whole_region() {
        let raster = iota([4, 3]);
        let slice = raster.slice::<[i64; 2]>(&Region::<[i64; 2]>::whole()).unwrap();
        assert_eq!(slice.data(), raster.data());
    }

    #[test]
    fn test_sections() {
        let raster = iota([4, 3, 2]);
        let section = raster.section(1, 1).unwrap();
        assert_eq!(section.shape(), &Position::from([4, 3, 1]));
        assert_eq!(section.data()[0], 12);

        let plane = raster.section_at::<[i64; 2]>(1).unwrap();
        assert_eq!(plane.shape(), &Position::from([4, 3]));
        assert_eq!(plane[&Position::from([1, 2])], 21);

        let line = plane.section_at::<[i64; 1]>(2).unwrap();
        assert_eq!(line.data(), &[20, 21, 22, 23]);

        assert!(matches!(
            raster.section_at::<[i64; 3]>(0),
            Err(FitsError::DimensionMismatch(_))
        ));

        let dynamic = raster.section_at::<Vec<i64>>(0).unwrap();
        assert_eq!(dynamic.dimension(), 2);
    }

    #[test]
    fn test_slice_mut_writes_parent() {
        let mut raster = iota([4, 3]);
        {
            let mut line = raster.section_at_mut::<[i64; 1]>(1).unwrap();
            line.fill(-1);
        }
        assert_eq!(&raster.data()[4..8], &[-1, -1, -1, -1]);
        assert_eq!(raster.data()[3], 3);
    }

    #[test]
    fn test_view_lifetime_and_move() {
        let raster = iota([2, 2]);
        let sum: i32 = {
            let view = raster.view();
            view.data().iter().sum()
        };
        assert_eq!(sum, 6);
        let data = raster.into_data();
        assert_eq!(data, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_ndarray_interop() {
        let raster = iota([3, 2]);
        let array = raster.to_ndarray().unwrap();
        assert_eq!(array.shape(), &[3, 2]);
        assert_eq!(array[IxDyn(&[2, 1])], raster[&Position::from([2, 1])]);

        let back: VecRaster<i32, [i64; 2]> = Raster::from_ndarray(&array).unwrap();
        assert_eq!(back, raster);

        let standard = ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![1, 2, 3, 4]).unwrap();
        let converted: DynRaster<i32> = Raster::from_ndarray(&standard).unwrap();
        assert_eq!(converted[&DynPosition::from(vec![0, 1])], 2);
    }

    #[test]
    fn test_zeros() {
        let raster: VecRaster<f64, [i64; 3]> = Raster::zeros(FixedPosition::<3>::one() + 1).unwrap();
        assert_eq!(raster.size(), 8);
        assert!(raster.data().iter().all(|&v| v == 0.0));
    }
}
