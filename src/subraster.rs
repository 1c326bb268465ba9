//! Non-contiguous views on a region of a raster
//!
//! A subraster keeps the parent's buffer and shape, and re-derives the parent
//! offset of each element. Values are visited as runs along axis 0, which are
//! the longest contiguous pieces a region can be made of.

use crate::error::{FitsError, Result};
use crate::position::{linear_index, Axes, Position};
use crate::raster::{Raster, VecRaster};
use crate::region::Region;
use crate::utils::resolve_backward;
use std::ops::{Index, IndexMut};

/// Geometry shared by read-only and read-write subrasters
#[derive(Debug, Clone)]
struct Geometry<A: Axes> {
    parent_shape: Position<A>,
    region: Region<A>,
    shape: Position<A>,
    size: usize,
    run_length: usize,
}

impl<A: Axes> Geometry<A> {
    fn new<T, S: AsRef<[T]>>(parent: &Raster<T, A, S>, region: &Region<A>) -> Result<Self> {
        let region = parent.resolve_region(region)?;
        let shape = region.shape();
        let size = shape.shape_size()?;
        let run_length = match shape.as_slice().first() {
            Some(&length) => crate::utils::to_usize(length, "run length")?,
            None => 1,
        };
        Ok(Self {
            parent_shape: parent.shape().clone(),
            region,
            shape,
            size,
            run_length,
        })
    }

    /// Parent offset of a parent position known to lie in the region
    fn parent_offset(&self, position: &Position<A>) -> usize {
        linear_index(self.parent_shape.as_slice(), position.as_slice()) as usize
    }

    /// Parent offset of an in-bounds subraster position
    fn offset_of(&self, position: &Position<A>) -> Option<usize> {
        self.to_parent(position)
            .map(|parent| self.parent_offset(&parent))
    }

    /// Parent position of an in-bounds subraster position
    fn to_parent(&self, position: &Position<A>) -> Option<Position<A>> {
        let inside = position.dimension() == self.shape.dimension()
            && position
                .iter()
                .zip(self.shape.iter())
                .all(|(&p, &s)| 0 <= p && p < s);
        inside.then(|| &self.region.front + position)
    }

    fn resolve(&self, position: &Position<A>) -> Result<Position<A>> {
        if position.dimension() != self.shape.dimension() {
            return Err(FitsError::DimensionMismatch(format!(
                "Position {} does not match subraster shape {}",
                position, self.shape
            )));
        }
        let mut resolved = position.clone();
        for (p, &s) in resolved.as_mut_slice().iter_mut().zip(self.shape.iter()) {
            *p = resolve_backward(*p, s)?;
        }
        Ok(&self.region.front + &resolved)
    }

    /// Front positions of the axis-0 runs, in parent order
    fn run_fronts(&self) -> impl Iterator<Item = Position<A>> {
        let mut locus = self.region.clone();
        if locus.dimension() > 0 {
            locus.back[0] = locus.front[0];
        }
        locus.positions()
    }
}

/// Read-only view on a region of a raster
#[derive(Debug, Clone)]
pub struct Subraster<'a, T, A: Axes = [i64; 2]> {
    data: &'a [T],
    geometry: Geometry<A>,
}

impl<'a, T, A: Axes> Subraster<'a, T, A> {
    /// Region in parent coordinates, resolved
    pub fn region(&self) -> &Region<A> {
        &self.geometry.region
    }

    pub fn shape(&self) -> &Position<A> {
        &self.geometry.shape
    }

    pub fn dimension(&self) -> usize {
        self.geometry.shape.dimension()
    }

    pub fn size(&self) -> usize {
        self.geometry.size
    }

    /// Value at a position relative to the region front
    pub fn get(&self, position: &Position<A>) -> Option<&'a T> {
        let offset = self.geometry.offset_of(position)?;
        self.data.get(offset)
    }

    /// Bounds-checked access with backward indexing
    pub fn at(&self, position: &Position<A>) -> Result<&'a T> {
        let parent = self.geometry.resolve(position)?;
        Ok(&self.data[self.geometry.parent_offset(&parent)])
    }

    /// Axis-0 runs with their front position in parent coordinates
    pub fn runs(&self) -> impl Iterator<Item = (Position<A>, &'a [T])> + '_ {
        let data = self.data;
        self.geometry.run_fronts().map(move |front| {
            let start = self.geometry.parent_offset(&front);
            (front, &data[start..start + self.geometry.run_length])
        })
    }

    /// Values in subraster order
    pub fn iter(&self) -> impl Iterator<Item = &'a T> + '_ {
        self.runs().flat_map(|(_, run)| run.iter())
    }

    /// Copy into a contiguous raster
    pub fn to_raster(&self) -> Result<VecRaster<T, A>>
    where
        T: Clone,
    {
        Raster::new(self.geometry.shape.clone(), self.iter().cloned().collect())
    }
}

impl<T, A: Axes> Index<&Position<A>> for Subraster<'_, T, A> {
    type Output = T;

    fn index(&self, position: &Position<A>) -> &T {
        match self.get(position) {
            Some(value) => value,
            None => panic!(
                "position {} outside of subraster shape {}",
                position, self.geometry.shape
            ),
        }
    }
}

/// Read-write view on a region of a raster
#[derive(Debug)]
pub struct SubrasterMut<'a, T, A: Axes = [i64; 2]> {
    data: &'a mut [T],
    geometry: Geometry<A>,
}

impl<'a, T, A: Axes> SubrasterMut<'a, T, A> {
    pub fn region(&self) -> &Region<A> {
        &self.geometry.region
    }

    pub fn shape(&self) -> &Position<A> {
        &self.geometry.shape
    }

    pub fn size(&self) -> usize {
        self.geometry.size
    }

    /// Reborrow as a read-only subraster
    pub fn as_subraster(&self) -> Subraster<'_, T, A> {
        Subraster {
            data: &*self.data,
            geometry: self.geometry.clone(),
        }
    }

    pub fn get_mut(&mut self, position: &Position<A>) -> Option<&mut T> {
        let offset = self.geometry.offset_of(position)?;
        self.data.get_mut(offset)
    }

    pub fn at_mut(&mut self, position: &Position<A>) -> Result<&mut T> {
        let parent = self.geometry.resolve(position)?;
        let offset = self.geometry.parent_offset(&parent);
        Ok(&mut self.data[offset])
    }

    /// Visit the axis-0 runs mutably, stopping at the first error
    pub fn try_for_each_run_mut<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&Position<A>, &mut [T]) -> Result<()>,
    {
        for front in self.geometry.run_fronts() {
            let start = self.geometry.parent_offset(&front);
            f(&front, &mut self.data[start..start + self.geometry.run_length])?;
        }
        Ok(())
    }

    pub fn fill(&mut self, value: T)
    where
        T: Clone,
    {
        for front in self.geometry.run_fronts() {
            let start = self.geometry.parent_offset(&front);
            self.data[start..start + self.geometry.run_length].fill(value.clone());
        }
    }

    /// Overwrite the region with values given in subraster order
    pub fn copy_from_slice(&mut self, values: &[T]) -> Result<()>
    where
        T: Clone,
    {
        if values.len() != self.geometry.size {
            return Err(FitsError::Validation(format!(
                "Subraster of shape {} requires {} values, got {}",
                self.geometry.shape,
                self.geometry.size,
                values.len()
            )));
        }
        let mut chunks = values.chunks(self.geometry.run_length.max(1));
        self.try_for_each_run_mut(|_, run| {
            if let Some(chunk) = chunks.next() {
                run.clone_from_slice(chunk);
            }
            Ok(())
        })
    }
}

impl<T, A: Axes> Index<&Position<A>> for SubrasterMut<'_, T, A> {
    type Output = T;

    fn index(&self, position: &Position<A>) -> &T {
        match self.geometry.offset_of(position) {
            Some(offset) => &self.data[offset],
            None => panic!(
                "position {} outside of subraster shape {}",
                position, self.geometry.shape
            ),
        }
    }
}

impl<T, A: Axes> IndexMut<&Position<A>> for SubrasterMut<'_, T, A> {
    fn index_mut(&mut self, position: &Position<A>) -> &mut T {
        match self.geometry.offset_of(position) {
            Some(offset) => &mut self.data[offset],
            None => panic!(
                "position {} outside of subraster shape {}",
                position, self.geometry.shape
            ),
        }
    }
}

impl<T, A: Axes, S: AsRef<[T]>> Raster<T, A, S> {
    /// View on any region inside the raster, contiguous or not
    pub fn subraster(&self, region: &Region<A>) -> Result<Subraster<'_, T, A>> {
        let geometry = Geometry::new(self, region)?;
        Ok(Subraster {
            data: self.data(),
            geometry,
        })
    }
}

impl<T, A: Axes, S: AsRef<[T]> + AsMut<[T]>> Raster<T, A, S> {
    pub fn subraster_mut(&mut self, region: &Region<A>) -> Result<SubrasterMut<'_, T, A>> {
        let geometry = Geometry::new(self, region)?;
        Ok(SubrasterMut {
            data: self.data_mut(),
            geometry,
        })
    }
}
