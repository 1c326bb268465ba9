//! Example: Compress an image, then read and write regions of it
//!
//! Run with: RUST_LOG=debug cargo run --example image_regions

use fitsaccess::{
    image, CompressionStrategy, FileMemRegions, MemoryEngine, Position, Raster, Region, Scalar,
    StorageEngine, VecRaster, MAX,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("fitsaccess Example: Image Regions");
    println!("=================================\n");

    // A 3D cube of 64 x 48 x 4 floats
    let shape = Position::from([64, 48, 4]);
    let mut cube = VecRaster::<f32, [i64; 3]>::zeros(shape.clone())?;
    for position in cube.domain().positions() {
        cube[&position] = (position[0] + 100 * position[1] + 10_000 * position[2]) as f32;
    }

    // Let a strategy pick the compression
    for strategy in [
        CompressionStrategy::Lossless,
        CompressionStrategy::LosslessInts,
        CompressionStrategy::Lossy,
    ] {
        let algo = strategy.select(f32::TYPE_CODE, shape.as_slice())?;
        println!("{:?} strategy: {}", strategy, algo);
    }
    println!();

    let mut engine = MemoryEngine::new();
    let algo = CompressionStrategy::Lossless.select(f32::TYPE_CODE, shape.as_slice())?;
    image::write_image(&mut engine, &cube, &algo)?;
    println!("Image shape: {:?}", engine.array_shape()?);

    // Read the second plane, from column 10 to the end of each row
    let region = Region::new(Position::from([10, 0, 1]), Position::from([MAX, MAX, 1]))?;
    let part: VecRaster<f32, [i64; 3]> = image::read_region(&engine, &region)?;
    println!("Region {}-{} has shape {}", region.front, region.back, part.shape());
    let plane = part.section_at::<[i64; 2]>(0)?;
    println!("  First value: {}", plane.at(&Position::from([0, 0]))?);
    println!("  Last value:  {}", plane.at(&Position::from([-1, -1]))?);

    // Paste a small patch in the middle of the last plane
    let patch = Raster::new(Position::from([4, 4, 1]), vec![-1.0f32; 16])?;
    let regions = FileMemRegions::from_memory_region(Position::from([30, 20, 3]), patch.domain())?;
    image::write_region(&mut engine, &regions, &patch)?;

    // Read it back into a larger buffer, run by run
    let mut canvas = Raster::<f32, [i64; 3]>::zeros(Position::from([8, 8, 1]))?;
    let regions = FileMemRegions::from_file_region(
        Region::new(Position::from([29, 19, 3]), Position::from([34, 24, 3]))?,
        Position::from([1, 1, 0]),
    )?;
    image::read_region_to(&engine, &regions, &mut canvas)?;
    let section = canvas.section_at::<[i64; 2]>(0)?;
    for y in 0..8 {
        let row: Vec<String> = (0..8)
            .map(|x| match section.at(&Position::from([x, y])) {
                Ok(v) if *v < 0.0 => "#".to_string(),
                Ok(v) if *v > 0.0 => ".".to_string(),
                _ => " ".to_string(),
            })
            .collect();
        println!("  {}", row.join(""));
    }

    println!("\n✓ Example completed successfully!");
    Ok(())
}
