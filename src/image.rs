//! Image data unit access
//!
//! Rasters are transferred with a storage engine either as a whole or by region.
//! A region read or write is described by a [`FileMemRegions`], whose open axes
//! are resolved against the array shape on the file side and the raster shape
//! on the memory side.
//!
//! When the memory region is contiguous in the raster, the transfer is a single
//! engine call. Otherwise it is made of one call per axis-0 run of the memory
//! region, so that no intermediate buffer is needed.

use crate::compression::Algo;
use crate::engine::StorageEngine;
use crate::error::{FitsError, Result};
use crate::position::{Axes, Position};
use crate::raster::{Raster, VecRaster};
use crate::region::Region;
use crate::regions::FileMemRegions;
use crate::types::Scalar;
use tracing::{debug, trace};

/// Create the array with the given compression.
///
/// The compression is set right before the creation so that no state from a
/// previous call leaks into the new array.
pub fn create_image<T: Scalar, A: Axes>(
    engine: &mut dyn StorageEngine,
    shape: &Position<A>,
    algo: &Algo,
) -> Result<()> {
    shape.shape_size()?;
    debug!(shape = %shape, type_code = %T::TYPE_CODE, algo = %algo, "Creating image");
    engine.set_compression(algo)?;
    engine.create_array(T::TYPE_CODE, shape.as_slice())
}

/// Create the array and write a raster to it
pub fn write_image<T: Scalar, A: Axes, S: AsRef<[T]>>(
    engine: &mut dyn StorageEngine,
    raster: &Raster<T, A, S>,
    algo: &Algo,
) -> Result<()> {
    create_image::<T, A>(engine, raster.shape(), algo)?;
    write_raster(engine, raster)
}

/// Shape of the array, with the rank of `A`
pub fn read_shape<A: Axes>(engine: &dyn StorageEngine) -> Result<Position<A>> {
    let shape = engine.array_shape()?;
    Position::from_slice(&shape).map_err(|_| {
        FitsError::DimensionMismatch(format!(
            "Cannot read an array of {} axes with a position type of rank {:?}",
            shape.len(),
            A::RANK
        ))
    })
}

fn check_shape<A: Axes>(expected: &Position<A>, actual: &Position<A>) -> Result<()> {
    if expected != actual {
        return Err(FitsError::DimensionMismatch(format!(
            "Raster shape {} differs from array shape {}",
            actual, expected
        )));
    }
    Ok(())
}

/// Read the whole array
pub fn read_raster<T: Scalar, A: Axes>(engine: &dyn StorageEngine) -> Result<VecRaster<T, A>> {
    let shape = read_shape::<A>(engine)?;
    let mut raster = Raster::with_default(shape)?;
    read_raster_to(engine, &mut raster)?;
    Ok(raster)
}

/// Read the whole array into a raster of the same shape
pub fn read_raster_to<T: Scalar, A: Axes, S: AsRef<[T]> + AsMut<[T]>>(
    engine: &dyn StorageEngine,
    raster: &mut Raster<T, A, S>,
) -> Result<()> {
    check_shape(&read_shape::<A>(engine)?, raster.shape())?;
    debug!(shape = %raster.shape(), "Reading raster");
    if raster.size() == 0 {
        return Ok(());
    }
    let domain = raster.domain();
    engine.read_array_region(
        domain.front.as_slice(),
        domain.back.as_slice(),
        T::cells_mut(raster.data_mut()),
    )
}

/// Write a raster of the shape of the array
pub fn write_raster<T: Scalar, A: Axes, S: AsRef<[T]>>(
    engine: &mut dyn StorageEngine,
    raster: &Raster<T, A, S>,
) -> Result<()> {
    check_shape(&read_shape::<A>(engine)?, raster.shape())?;
    debug!(shape = %raster.shape(), "Writing raster");
    if raster.size() == 0 {
        return Ok(());
    }
    let domain = raster.domain();
    engine.write_array_region(
        domain.front.as_slice(),
        domain.back.as_slice(),
        T::cells(raster.data()),
    )
}

/// Read a region of the array into a new raster of the region shape
pub fn read_region<T: Scalar, A: Axes>(
    engine: &dyn StorageEngine,
    region: &Region<A>,
) -> Result<VecRaster<T, A>> {
    let file_shape = read_shape::<A>(engine)?;
    let region = region.resolve_within(&file_shape)?;
    if !region.is_within(&file_shape) {
        return Err(FitsError::OutOfBounds(format!(
            "Region {}-{} outside of array shape {}",
            region.front, region.back, file_shape
        )));
    }
    let mut raster = Raster::with_default(region.shape())?;
    read_region_to(engine, &FileMemRegions::file_region(region), &mut raster)?;
    Ok(raster)
}

fn resolve_regions<T, A: Axes, S: AsRef<[T]>>(
    engine: &dyn StorageEngine,
    regions: &FileMemRegions<A>,
    raster: &Raster<T, A, S>,
) -> Result<FileMemRegions<A>> {
    let file_shape = read_shape::<A>(engine)?;
    let resolved = regions.resolve(&(&file_shape - 1), &(raster.shape() - 1))?;
    trace!(
        file_front = %resolved.file().front,
        file_back = %resolved.file().back,
        memory_front = %resolved.memory().front,
        memory_back = %resolved.memory().back,
        "Resolved regions"
    );
    Ok(resolved)
}

/// File box matching an axis-0 run of the memory region
fn run_in_file<A: Axes>(
    memory_front: &Position<A>,
    run_length: usize,
    memory_to_file: &Position<A>,
) -> (Position<A>, Position<A>) {
    let front = memory_front + memory_to_file;
    let mut back = front.clone();
    if back.dimension() > 0 {
        back[0] += run_length as i64 - 1;
    }
    (front, back)
}

/// Read the file region of `regions` into the memory region of `raster`
pub fn read_region_to<T: Scalar, A: Axes, S: AsRef<[T]> + AsMut<[T]>>(
    engine: &dyn StorageEngine,
    regions: &FileMemRegions<A>,
    raster: &mut Raster<T, A, S>,
) -> Result<()> {
    let regions = resolve_regions(engine, regions, raster)?;
    let file = regions.file();
    let memory = regions.memory();
    if raster.is_contiguous(memory, raster.dimension()) {
        debug!(front = %file.front, back = %file.back, "Reading contiguous region");
        let mut slice = raster.slice_mut::<A>(memory)?;
        return engine.read_array_region(
            file.front.as_slice(),
            file.back.as_slice(),
            T::cells_mut(slice.data_mut()),
        );
    }
    debug!(front = %file.front, back = %file.back, "Reading region run by run");
    let memory_to_file = regions.memory_to_file();
    raster
        .subraster_mut(memory)?
        .try_for_each_run_mut(|memory_front, run| {
            let (front, back) = run_in_file(memory_front, run.len(), &memory_to_file);
            engine.read_array_region(front.as_slice(), back.as_slice(), T::cells_mut(run))
        })
}

/// Write the memory region of `raster` to the file region of `regions`
pub fn write_region<T: Scalar, A: Axes, S: AsRef<[T]>>(
    engine: &mut dyn StorageEngine,
    regions: &FileMemRegions<A>,
    raster: &Raster<T, A, S>,
) -> Result<()> {
    let regions = resolve_regions(engine, regions, raster)?;
    let file = regions.file();
    let memory = regions.memory();
    if raster.is_contiguous(memory, raster.dimension()) {
        debug!(front = %file.front, back = %file.back, "Writing contiguous region");
        let slice = raster.slice::<A>(memory)?;
        return engine.write_array_region(
            file.front.as_slice(),
            file.back.as_slice(),
            T::cells(slice.data()),
        );
    }
    debug!(front = %file.front, back = %file.back, "Writing region run by run");
    let memory_to_file = regions.memory_to_file();
    for (memory_front, run) in raster.subraster(memory)?.runs() {
        let (front, back) = run_in_file(&memory_front, run.len(), &memory_to_file);
        engine.write_array_region(front.as_slice(), back.as_slice(), T::cells(run))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{EngineCall, MemoryEngine};
    use crate::position::MAX;

    fn ramp(shape: [i64; 2]) -> VecRaster<i32, [i64; 2]> {
        let size = (shape[0] * shape[1]) as i32;
        Raster::new(Position::from(shape), (0..size).collect()).unwrap()
    }

    #[test]
    fn test_create_sets_compression_first() {
        let mut engine = MemoryEngine::new();
        create_image::<f32, _>(&mut engine, &Position::from([4, 3]), &Algo::gzip()).unwrap();
        let calls = engine.calls();
        assert!(matches!(calls[0], EngineCall::SetCompression { .. }));
        assert!(matches!(calls[1], EngineCall::CreateArray { .. }));
        assert_eq!(engine.array_compression(), Some(&Algo::gzip()));
    }

    #[test]
    fn test_raster_round_trip() {
        let mut engine = MemoryEngine::new();
        let raster = ramp([5, 4]);
        write_image(&mut engine, &raster, &Algo::NoCompression).unwrap();
        let back: VecRaster<i32, [i64; 2]> = read_raster(&engine).unwrap();
        assert_eq!(back, raster);

        let dynamic: VecRaster<i32, Vec<i64>> = read_raster(&engine).unwrap();
        assert_eq!(dynamic.data(), raster.data());
        assert!(matches!(
            read_raster::<i32, [i64; 3]>(&engine),
            Err(FitsError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_empty_image_round_trip() {
        let mut engine = MemoryEngine::new();
        let empty = Raster::<f32, [i64; 2]>::new(Position::from([0, 3]), Vec::new()).unwrap();
        write_image(&mut engine, &empty, &Algo::NoCompression).unwrap();
        let back: VecRaster<f32, [i64; 2]> = read_raster(&engine).unwrap();
        assert_eq!(back.shape(), &Position::from([0, 3]));
        assert_eq!(back.size(), 0);
        assert!(!engine.calls().iter().any(|call| matches!(
            call,
            EngineCall::ReadArrayRegion { .. } | EngineCall::WriteArrayRegion { .. }
        )));

        let wrong = Raster::<f32, [i64; 2]>::new(Position::from([3, 0]), Vec::new()).unwrap();
        assert!(matches!(
            write_raster(&mut engine, &wrong),
            Err(FitsError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_read_region() {
        let mut engine = MemoryEngine::new();
        write_image(&mut engine, &ramp([5, 4]), &Algo::NoCompression).unwrap();
        let region = Region::new(Position::from([1, 2]), Position::from([MAX, 3])).unwrap();
        let raster: VecRaster<i32, [i64; 2]> = read_region(&engine, &region).unwrap();
        assert_eq!(raster.shape(), &Position::from([4, 2]));
        assert_eq!(raster.data(), &[11, 12, 13, 14, 16, 17, 18, 19]);

        let outside = Region::new(Position::from([1, 2]), Position::from([5, 3])).unwrap();
        assert!(matches!(
            read_region::<i32, _>(&engine, &outside),
            Err(FitsError::OutOfBounds(_))
        ));
    }

    #[test]
    fn test_contiguous_region_is_one_call() {
        let mut engine = MemoryEngine::new();
        write_image(&mut engine, &ramp([5, 4]), &Algo::NoCompression).unwrap();
        engine.clear_calls();

        let mut raster = Raster::<i32, [i64; 2]>::with_default(Position::from([5, 6])).unwrap();
        let regions = FileMemRegions::from_file_region(
            Region::new(Position::from([0, 1]), Position::from([MAX, 2])).unwrap(),
            Position::from([0, 3]),
        )
        .unwrap();
        read_region_to(&engine, &regions, &mut raster).unwrap();
        assert_eq!(engine.calls().len(), 1);
        assert_eq!(raster[&Position::from([0, 3])], 5);
        assert_eq!(raster[&Position::from([4, 4])], 14);
        assert_eq!(raster[&Position::from([0, 2])], 0);
    }

    #[test]
    fn test_strided_region_is_one_call_per_run() {
        let mut engine = MemoryEngine::new();
        create_image::<i32, _>(&mut engine, &Position::from([4, 4]), &Algo::NoCompression)
            .unwrap();
        engine.clear_calls();

        // Memory rows of 3 out of 5 values cannot be sent at once
        let raster = ramp([5, 3]);
        let regions = FileMemRegions::from_memory_region(
            Position::from([1, 1]),
            Region::new(Position::from([1, 0]), Position::from([3, MAX])).unwrap(),
        )
        .unwrap();
        write_region(&mut engine, &regions, &raster).unwrap();
        assert_eq!(engine.calls().len(), 3);

        let back: VecRaster<i32, [i64; 2]> = read_raster(&engine).unwrap();
        let expected = [
            0, 0, 0, 0, //
            0, 1, 2, 3, //
            0, 6, 7, 8, //
            0, 11, 12, 13,
        ];
        assert_eq!(back.data(), &expected);

        let mut copy = Raster::<i32, [i64; 2]>::with_default(Position::from([5, 3])).unwrap();
        read_region_to(&engine, &regions, &mut copy).unwrap();
        let region = Region::new(Position::from([1, 0]), Position::from([3, 2])).unwrap();
        let expected: Vec<i32> = raster.subraster(&region).unwrap().iter().copied().collect();
        let actual: Vec<i32> = copy.subraster(&region).unwrap().iter().copied().collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_region_does_not_fit() {
        let mut engine = MemoryEngine::new();
        create_image::<i32, _>(&mut engine, &Position::from([4, 4]), &Algo::NoCompression)
            .unwrap();
        let raster = ramp([6, 6]);
        let regions = FileMemRegions::memory_region(Region::<[i64; 2]>::whole());
        assert!(matches!(
            write_region(&mut engine, &regions, &raster),
            Err(FitsError::OutOfBounds(_))
        ));
    }

    #[test]
    fn test_type_mismatch_is_engine_error() {
        let mut engine = MemoryEngine::new();
        create_image::<f64, _>(&mut engine, &Position::from([2, 2]), &Algo::NoCompression)
            .unwrap();
        let err = read_raster::<i32, [i64; 2]>(&engine).unwrap_err();
        assert_eq!(err.status(), Some(crate::engine::status::BAD_DATATYPE));
    }
}
