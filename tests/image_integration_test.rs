//! Integration tests of raster and region I/O through the in-memory engine

use fitsaccess::{
    image, Algo, CompressionStrategy, FileMemRegions, FitsError, MemoryEngine, Position, Raster,
    Region, StorageEngine, TypeCode, VecRaster, MAX,
};

fn ramp(shape: [i64; 2]) -> VecRaster<f32, [i64; 2]> {
    let size = (shape[0] * shape[1]) as usize;
    Raster::new(Position::from(shape), (0..size).map(|v| v as f32).collect())
        .expect("Failed to create raster")
}

/// Whole memory raster read from file position (5, 5) of a (20, 20) array
#[test]
fn test_region_resolution_against_both_sides() {
    let mut engine = MemoryEngine::new();
    let file = ramp([20, 20]);
    image::write_image(&mut engine, &file, &Algo::NoCompression).expect("Failed to write image");

    let regions = FileMemRegions::from_memory_region(
        Position::from([5, 5]),
        Region::<[i64; 2]>::whole(),
    )
    .unwrap();
    let mut memory = Raster::<f32, [i64; 2]>::with_default(Position::from([10, 10])).unwrap();
    image::read_region_to(&engine, &regions, &mut memory).expect("Failed to read region");

    let resolved = regions
        .resolve(&Position::from([19, 19]), &Position::from([9, 9]))
        .unwrap();
    assert_eq!(resolved.file().front, Position::from([5, 5]));
    assert_eq!(resolved.file().back, Position::from([14, 14]));

    for position in memory.domain().positions() {
        let in_file = &position + &Position::from([5, 5]);
        assert_eq!(memory[&position], file[&in_file]);
    }
}

#[test]
fn test_dynamic_dimension_round_trip() {
    let mut engine = MemoryEngine::new();
    let shape = Position::from_slice(&[3, 4, 2]).unwrap();
    let raster: VecRaster<i16, Vec<i64>> =
        Raster::new(shape, (0..24).collect()).expect("Failed to create raster");
    image::write_image(&mut engine, &raster, &Algo::gzip()).unwrap();
    assert_eq!(engine.array_type().unwrap(), TypeCode::I16);

    let back: VecRaster<i16, Vec<i64>> = image::read_raster(&engine).unwrap();
    assert_eq!(back, raster);

    let fixed: VecRaster<i16, [i64; 3]> = image::read_raster(&engine).unwrap();
    assert_eq!(fixed.data(), raster.data());
    let plane = fixed.section_at::<[i64; 2]>(1).unwrap();
    assert_eq!(plane.data(), &raster.data()[12..]);
}

#[test]
fn test_partial_write_then_read() {
    let mut engine = MemoryEngine::new();
    image::create_image::<f32, _>(&mut engine, &Position::from([8, 6]), &Algo::NoCompression)
        .unwrap();

    let patch = ramp([3, 2]);
    let regions = FileMemRegions::from_memory_region(
        Position::from([4, 3]),
        Region::<[i64; 2]>::whole(),
    )
    .unwrap();
    image::write_region(&mut engine, &regions, &patch).unwrap();

    let full: VecRaster<f32, [i64; 2]> = image::read_raster(&engine).unwrap();
    assert_eq!(full[&Position::from([4, 3])], 0.0);
    assert_eq!(full[&Position::from([6, 4])], 5.0);
    assert_eq!(full[&Position::from([7, 4])], 0.0);

    let region = Region::new(Position::from([4, 3]), Position::from([MAX, 4])).unwrap();
    let part: VecRaster<f32, [i64; 2]> = image::read_region(&engine, &region).unwrap();
    assert_eq!(part.shape(), &Position::from([4, 2]));
    assert_eq!(part.data(), &[0.0, 1.0, 2.0, 0.0, 3.0, 4.0, 5.0, 0.0]);
}

#[test]
fn test_strategy_selected_compression() {
    let mut engine = MemoryEngine::new();
    let shape = [100i64, 100];
    let strategy = CompressionStrategy::Lossless;

    let algo = strategy.select(TypeCode::F32, &shape).unwrap();
    assert_eq!(algo, Algo::shuffled_gzip());
    image::create_image::<f32, _>(&mut engine, &Position::from(shape), &algo).unwrap();
    assert_eq!(engine.array_compression(), Some(&algo));

    // Too small to be compressed
    let algo = strategy.select(TypeCode::I16, &[10, 10]).unwrap();
    assert_eq!(algo, Algo::NoCompression);
}

#[test]
fn test_memory_region_out_of_bounds() {
    let mut engine = MemoryEngine::new();
    image::create_image::<f32, _>(&mut engine, &Position::from([4, 4]), &Algo::NoCompression)
        .unwrap();
    let mut memory = Raster::<f32, [i64; 2]>::with_default(Position::from([2, 2])).unwrap();
    let regions = FileMemRegions::from_file_region(
        Region::new(Position::from([1, 1]), Position::from([2, 2])).unwrap(),
        Position::from([1, 1]),
    )
    .unwrap();
    assert!(matches!(
        image::read_region_to(&engine, &regions, &mut memory),
        Err(FitsError::OutOfBounds(_))
    ));
}

#[test]
fn test_snapshot_keeps_image() {
    let mut engine = MemoryEngine::new();
    let raster = ramp([16, 16]);
    image::write_image(&mut engine, &raster, &Algo::rice()).unwrap();

    let bytes = engine.to_bytes().expect("Failed to serialize engine");
    let restored = MemoryEngine::from_bytes(&bytes).expect("Failed to restore engine");
    let back: VecRaster<f32, [i64; 2]> = image::read_raster(&restored).unwrap();
    assert_eq!(back, raster);
    assert_eq!(restored.array_compression(), Some(&Algo::rice()));
}
