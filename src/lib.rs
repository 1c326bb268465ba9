//! fitsaccess - typed access to FITS-like rasters and binary tables
//!
//! A data-access layer between application code and a columnar/raster storage
//! engine, with dimension-aware positions and regions, raster views, chunked
//! multi-column table I/O and a model of tiled array compression.
//!
//! # Features
//!
//! - Fixed (`[i64; N]`) and run-time (`Vec<i64>`) dimensions with one semantics
//! - Owned and borrowed rasters, contiguous slices and strided subrasters
//! - Partial reads and writes between a file region and a memory region
//! - Scalar, string and vector columns transferred in chunks of rows
//! - Compression algorithms, quantization and per-type selection strategies
//! - An in-memory reference engine (implement `StorageEngine` for real storage)
//!
//! # Example
//!
//! ```rust,ignore
//! use fitsaccess::{bintable, image, Algo, ColumnInfo, MemoryEngine, Position, VecColumn, VecRaster};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut engine = MemoryEngine::new();
//!
//! // Write and read back an image
//! let raster = VecRaster::<f32>::zeros(Position::from([640, 480]))?;
//! image::write_image(&mut engine, &raster, &Algo::rice())?;
//! let back: VecRaster<f32> = image::read_raster(&engine)?;
//!
//! // Append a column and read it back
//! let ids = VecColumn::new(ColumnInfo::new("ID", "", 1)?, vec![1i32, 2, 3])?;
//! bintable::append_column(&mut engine, &ids)?;
//! let ids = bintable::read_column::<i32>(&engine, "ID")?;
//! # Ok(())
//! # }
//! ```

pub mod bintable;
pub mod column;
pub mod compression;
pub mod config;
pub mod engine;
pub mod error;
pub mod image;
pub mod memory;
pub mod position;
pub mod raster;
pub mod region;
pub mod regions;
pub mod subraster;
pub mod types;
pub mod utils;

// Re-exports
pub use column::{Column, ColumnInfo, ColumnValue, DynColumn, DynColumnMut, PtrColumn, VecColumn};
pub use compression::{Algo, CompressionStrategy, Dithering, Factor, Quantization, Tiling};
pub use config::EngineConfig;
pub use engine::{ColumnDescriptor, StorageEngine};
pub use error::{FitsError, Result};
pub use memory::MemoryEngine;
pub use position::{Axes, DynPosition, FixedPosition, Position, MAX};
pub use raster::{DynRaster, PtrRaster, PtrRasterMut, Raster, VecRaster};
pub use region::{DynRegion, FixedRegion, Region, Segment};
pub use regions::FileMemRegions;
pub use subraster::{Subraster, SubrasterMut};
pub use types::{Scalar, TypeCode};

/// Version of the fitsaccess crate
pub const FITSACCESS_VERSION: &str = env!("CARGO_PKG_VERSION");
