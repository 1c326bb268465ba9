//! Mapping between an in-file region and an in-memory region
//!
//! Partial reads and writes copy values from one box to another box of the same
//! shape. Either side may leave axes open with [`MAX`], to be resolved against
//! the bounds of that side once they are known.

use crate::error::{FitsError, Result};
use crate::position::{Axes, Position, MAX};
use crate::region::Region;
use serde::{Deserialize, Serialize};

/// Pair of regions of identical shape, one in the file, one in memory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMemRegions<A: Axes = [i64; 2]> {
    file: Region<A>,
    memory: Region<A>,
}

impl<A: Axes> FileMemRegions<A> {
    /// Map a file region to memory, starting at `memory_front`.
    ///
    /// Axes left open in the file are resolved against the file bounds.
    pub fn from_file_region(file: Region<A>, memory_front: Position<A>) -> Result<Self> {
        check_dimension(&file, &memory_front)?;
        let memory = Self::mirror(&file, memory_front);
        Ok(Self { file, memory })
    }

    /// Map a memory region to the file, starting at `file_front`
    pub fn from_memory_region(file_front: Position<A>, memory: Region<A>) -> Result<Self> {
        check_dimension(&memory, &file_front)?;
        let file = Self::mirror(&memory, file_front);
        Ok(Self { file, memory })
    }

    /// File region mapped to the memory origin
    pub fn file_region(file: Region<A>) -> Self {
        let memory = Self::mirror(&file, file.front.zero_like());
        Self { file, memory }
    }

    /// Memory region mapped to the file origin
    pub fn memory_region(memory: Region<A>) -> Self {
        let file = Self::mirror(&memory, memory.front.zero_like());
        Self { file, memory }
    }

    /// Region of the same shape as `source` at `front`.
    ///
    /// Where `source` is open, the back component is a placeholder equal to the
    /// front one, so that only one side per axis is open.
    fn mirror(source: &Region<A>, front: Position<A>) -> Region<A> {
        let mut back = &front + &(&source.back - &source.front);
        for ((b, &f), &s) in back
            .as_mut_slice()
            .iter_mut()
            .zip(front.iter())
            .zip(source.back.iter())
        {
            if s == MAX {
                *b = f;
            }
        }
        Region { front, back }
    }

    pub fn file(&self) -> &Region<A> {
        &self.file
    }

    pub fn memory(&self) -> &Region<A> {
        &self.memory
    }

    pub fn dimension(&self) -> usize {
        self.file.dimension()
    }

    /// Offset to add to a file position to get the matching memory position
    pub fn file_to_memory(&self) -> Position<A> {
        &self.memory.front - &self.file.front
    }

    /// Offset to add to a memory position to get the matching file position
    pub fn memory_to_file(&self) -> Position<A> {
        &self.file.front - &self.memory.front
    }

    /// Close the open axes given the file and memory last positions.
    ///
    /// An axis open in the file takes the file bound and derives the memory
    /// bound; otherwise an axis open in memory takes the memory bound and
    /// derives the file bound. Fails if an axis is still open or if a side
    /// exceeds its bound.
    pub fn resolve(&self, file_back: &Position<A>, memory_back: &Position<A>) -> Result<Self> {
        let dimension = self.dimension();
        if file_back.dimension() != dimension || memory_back.dimension() != dimension {
            return Err(FitsError::DimensionMismatch(format!(
                "Cannot resolve regions of dimension {} against bounds {} and {}",
                dimension, file_back, memory_back
            )));
        }
        let file_to_memory = self.file_to_memory();
        let mut out = self.clone();
        for axis in 0..dimension {
            if out.file.back[axis] == MAX {
                out.file.back[axis] = file_back[axis];
                out.memory.back[axis] = file_back[axis] + file_to_memory[axis];
            } else if out.memory.back[axis] == MAX {
                out.memory.back[axis] = memory_back[axis];
                out.file.back[axis] = memory_back[axis] - file_to_memory[axis];
            }
        }
        if out.file.back.has_max() || out.memory.back.has_max() {
            return Err(FitsError::Validation(format!(
                "Regions {}-{} and {}-{} are still open after resolution",
                out.file.front, out.file.back, out.memory.front, out.memory.back
            )));
        }
        check_fits(&out.file, file_back, "file")?;
        check_fits(&out.memory, memory_back, "memory")?;
        Ok(out)
    }
}

fn check_dimension<A: Axes>(region: &Region<A>, front: &Position<A>) -> Result<()> {
    if region.dimension() != front.dimension() || region.back.dimension() != front.dimension() {
        return Err(FitsError::DimensionMismatch(format!(
            "Region {}-{} cannot be mapped to {}",
            region.front, region.back, front
        )));
    }
    Ok(())
}

fn check_fits<A: Axes>(region: &Region<A>, back: &Position<A>, side: &str) -> Result<()> {
    let shape = back + 1;
    if !region.is_within(&shape) {
        return Err(FitsError::OutOfBounds(format!(
            "{} region {}-{} exceeds {}",
            side, region.front, region.back, shape
        )));
    }
    Ok(())
}
