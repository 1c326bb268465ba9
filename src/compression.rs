//! Block compression algorithms and their parameters
//!
//! This module only describes compression: which algorithm, which tiling,
//! whether values are quantized. The storage engine does the actual encoding
//! once given an [`Algo`] through
//! [`StorageEngine::set_compression`](crate::engine::StorageEngine::set_compression).

use crate::error::{FitsError, Result};
use crate::position::MAX;
use crate::types::TypeCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Data units up to this many bytes are never compressed
pub const MIN_COMPRESSED_BYTES: usize = 2880;

/// Maximum number of tiling axes
pub const MAX_TILING_DIMENSION: usize = 6;

/// Kind of a [`Factor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactorKind {
    None,
    Absolute,
    Relative,
}

/// Quantization level or scale.
///
/// The sign of the stored value tells the kind: zero for none, negative for
/// absolute, positive for relative (to the noise level).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Factor {
    value: f32,
}

impl Factor {
    pub fn none() -> Self {
        Self { value: 0.0 }
    }

    /// Factor in data units; `value` must be strictly positive
    pub fn absolute(value: f32) -> Result<Self> {
        if value.is_nan() || value <= 0.0 {
            return Err(FitsError::Validation(format!(
                "Absolute factor value out of supported bounds: {}",
                value
            )));
        }
        Ok(Self { value: -value })
    }

    /// Factor relative to the noise level; `value` must be strictly positive
    pub fn relative(value: f32) -> Result<Self> {
        if value.is_nan() || value <= 0.0 {
            return Err(FitsError::Validation(format!(
                "Relative factor value out of supported bounds: {}",
                value
            )));
        }
        Ok(Self { value })
    }

    pub fn kind(&self) -> FactorKind {
        if self.value > 0.0 {
            FactorKind::Relative
        } else if self.value < 0.0 {
            FactorKind::Absolute
        } else {
            FactorKind::None
        }
    }

    /// Magnitude, whatever the kind
    pub fn value(&self) -> f32 {
        self.value.abs()
    }

    pub fn is_none(&self) -> bool {
        self.kind() == FactorKind::None
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            FactorKind::None => write!(f, "none"),
            FactorKind::Absolute => write!(f, "absolute({})", self.value()),
            FactorKind::Relative => write!(f, "relative({})", self.value()),
        }
    }
}

/// Dithering applied before quantization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Dithering {
    #[default]
    None,
    NonZeroPixel,
    EveryPixel,
}

/// Quantization of floating point values, disabled by default
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "QuantizationFields")]
pub struct Quantization {
    level: Factor,
    dithering: Dithering,
}

/// Unchecked fields of a deserialized [`Quantization`]
#[derive(Deserialize)]
struct QuantizationFields {
    level: Factor,
    dithering: Dithering,
}

impl TryFrom<QuantizationFields> for Quantization {
    type Error = FitsError;

    fn try_from(fields: QuantizationFields) -> Result<Self> {
        Quantization::with_dithering(fields.level, fields.dithering)
    }
}

impl Quantization {
    /// Quantization at `level`, dithering every pixel unless `level` is none
    pub fn new(level: Factor) -> Self {
        let dithering = if level.is_none() {
            Dithering::None
        } else {
            Dithering::EveryPixel
        };
        Self { level, dithering }
    }

    pub fn none() -> Self {
        Self::default()
    }

    /// Quantization with explicit dithering
    pub fn with_dithering(level: Factor, dithering: Dithering) -> Result<Self> {
        let mut quantization = Self::new(level);
        quantization.set_dithering(dithering)?;
        Ok(quantization)
    }

    pub fn level(&self) -> Factor {
        self.level
    }

    pub fn dithering(&self) -> Dithering {
        self.dithering
    }

    pub fn is_enabled(&self) -> bool {
        !self.level.is_none()
    }

    /// Change the level; disabling quantization also disables dithering
    pub fn set_level(&mut self, level: Factor) -> &mut Self {
        self.level = level;
        if level.is_none() {
            self.dithering = Dithering::None;
        }
        self
    }

    /// Change the dithering, which requires quantization to be enabled
    pub fn set_dithering(&mut self, dithering: Dithering) -> Result<&mut Self> {
        if !self.is_enabled() && dithering != Dithering::None {
            return Err(FitsError::Validation(
                "Cannot set dithering method when quantization is deactivated".into(),
            ));
        }
        self.dithering = dithering;
        Ok(self)
    }
}

/// Shape of the compression tiles, with at most six axes.
///
/// A [`MAX`] component spans the whole axis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<i64>", into = "Vec<i64>")]
pub struct Tiling {
    shape: Vec<i64>,
}

impl Tiling {
    pub fn new(shape: Vec<i64>) -> Result<Self> {
        if shape.len() > MAX_TILING_DIMENSION {
            return Err(FitsError::OutOfBounds(format!(
                "Tiling dimension error: {} not in [0, {}]",
                shape.len(),
                MAX_TILING_DIMENSION
            )));
        }
        Ok(Self { shape })
    }

    /// Tiles of `row_count` whole rows
    pub fn rowwise(row_count: i64) -> Self {
        Self {
            shape: vec![MAX, row_count],
        }
    }

    /// A single tile
    pub fn whole() -> Self {
        Self { shape: vec![MAX] }
    }

    pub fn shape(&self) -> &[i64] {
        &self.shape
    }
}

impl TryFrom<Vec<i64>> for Tiling {
    type Error = FitsError;

    fn try_from(shape: Vec<i64>) -> Result<Self> {
        Tiling::new(shape)
    }
}

impl From<Tiling> for Vec<i64> {
    fn from(tiling: Tiling) -> Self {
        tiling.shape
    }
}

/// Compression algorithm with its parameters
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Algo {
    #[default]
    NoCompression,
    Rice {
        tiling: Tiling,
        quantization: Quantization,
    },
    HCompress {
        tiling: Tiling,
        quantization: Quantization,
        scale: Factor,
        smooth: bool,
    },
    Plio {
        tiling: Tiling,
        quantization: Quantization,
    },
    Gzip {
        tiling: Tiling,
        quantization: Quantization,
    },
    ShuffledGzip {
        tiling: Tiling,
        quantization: Quantization,
    },
}

impl Algo {
    pub fn rice() -> Self {
        Algo::Rice {
            tiling: Tiling::rowwise(1),
            quantization: Quantization::none(),
        }
    }

    pub fn hcompress() -> Self {
        Algo::HCompress {
            tiling: Tiling::rowwise(16),
            quantization: Quantization::none(),
            scale: Factor::none(),
            smooth: false,
        }
    }

    pub fn plio() -> Self {
        Algo::Plio {
            tiling: Tiling::rowwise(1),
            quantization: Quantization::none(),
        }
    }

    pub fn gzip() -> Self {
        Algo::Gzip {
            tiling: Tiling::rowwise(1),
            quantization: Quantization::none(),
        }
    }

    pub fn shuffled_gzip() -> Self {
        Algo::ShuffledGzip {
            tiling: Tiling::rowwise(1),
            quantization: Quantization::none(),
        }
    }

    /// Algorithm name as used in compressed image headers
    pub fn name(&self) -> &'static str {
        match self {
            Algo::NoCompression => "NONE",
            Algo::Rice { .. } => "RICE_1",
            Algo::HCompress { .. } => "HCOMPRESS_1",
            Algo::Plio { .. } => "PLIO_1",
            Algo::Gzip { .. } => "GZIP_1",
            Algo::ShuffledGzip { .. } => "GZIP_2",
        }
    }

    /// Tiling shape, `None` without compression
    pub fn tiling(&self) -> Option<&Tiling> {
        match self {
            Algo::NoCompression => None,
            Algo::Rice { tiling, .. }
            | Algo::HCompress { tiling, .. }
            | Algo::Plio { tiling, .. }
            | Algo::Gzip { tiling, .. }
            | Algo::ShuffledGzip { tiling, .. } => Some(tiling),
        }
    }

    pub fn quantization(&self) -> Quantization {
        match self {
            Algo::NoCompression => Quantization::none(),
            Algo::Rice { quantization, .. }
            | Algo::HCompress { quantization, .. }
            | Algo::Plio { quantization, .. }
            | Algo::Gzip { quantization, .. }
            | Algo::ShuffledGzip { quantization, .. } => *quantization,
        }
    }

    pub fn with_tiling(mut self, new_tiling: Tiling) -> Self {
        match &mut self {
            Algo::NoCompression => {}
            Algo::Rice { tiling, .. }
            | Algo::HCompress { tiling, .. }
            | Algo::Plio { tiling, .. }
            | Algo::Gzip { tiling, .. }
            | Algo::ShuffledGzip { tiling, .. } => *tiling = new_tiling,
        }
        self
    }

    pub fn with_quantization(mut self, new_quantization: Quantization) -> Self {
        match &mut self {
            Algo::NoCompression => {}
            Algo::Rice { quantization, .. }
            | Algo::HCompress { quantization, .. }
            | Algo::Plio { quantization, .. }
            | Algo::Gzip { quantization, .. }
            | Algo::ShuffledGzip { quantization, .. } => *quantization = new_quantization,
        }
        self
    }

    /// Set the HCompress scale
    pub fn with_scale(mut self, new_scale: Factor) -> Result<Self> {
        match &mut self {
            Algo::HCompress { scale, .. } => {
                *scale = new_scale;
                Ok(self)
            }
            other => Err(FitsError::Validation(format!(
                "{} has no scale parameter",
                other.name()
            ))),
        }
    }

    /// Enable or disable HCompress smoothing
    pub fn with_smoothing(mut self, enabled: bool) -> Result<Self> {
        match &mut self {
            Algo::HCompress { smooth, .. } => {
                *smooth = enabled;
                Ok(self)
            }
            other => Err(FitsError::Validation(format!(
                "{} has no smoothing parameter",
                other.name()
            ))),
        }
    }

    /// Check whether decompressed values equal the original ones
    pub fn is_lossless(&self) -> bool {
        match self {
            Algo::NoCompression => true,
            Algo::HCompress {
                quantization,
                scale,
                ..
            } => !quantization.is_enabled() && scale.is_none(),
            other => !other.quantization().is_enabled(),
        }
    }

    /// Check whether the algorithm applies to an array of given type and shape
    pub fn can_compress(&self, type_code: TypeCode, shape: &[i64]) -> bool {
        let size = match crate::utils::shape_size(shape) {
            Ok(size) => size,
            Err(_) => return false,
        };
        if size.saturating_mul(type_code.size_in_bytes()) <= MIN_COMPRESSED_BYTES {
            return false;
        }
        if matches!(type_code, TypeCode::I64 | TypeCode::U64 | TypeCode::Str) {
            return false;
        }
        match self {
            Algo::NoCompression => false,
            Algo::Plio { .. } => {
                type_code.is_integer() && type_code.bitpix().is_some_and(|bitpix| bitpix <= 24)
            }
            Algo::Rice { quantization, .. } | Algo::HCompress { quantization, .. } => {
                type_code.is_integer() || quantization.is_enabled()
            }
            Algo::Gzip { .. } | Algo::ShuffledGzip { .. } => true,
        }
    }
}

impl fmt::Display for Algo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tiling() {
            None => write!(f, "{}", self.name()),
            Some(tiling) => write!(
                f,
                "{} (tiling {:?}, quantization {})",
                self.name(),
                tiling.shape(),
                self.quantization().level()
            ),
        }
    }
}

/// Lossless algorithm suited to a bit depth and dimension.
///
/// Plio for small positive bit depths, HCompress for images, Rice otherwise.
pub fn make_lossless_algo(bitpix: i32, dimension: usize) -> Algo {
    let algo = if bitpix > 0 && bitpix <= 24 {
        Algo::plio()
    } else if dimension >= 2 {
        Algo::hcompress()
    } else {
        Algo::rice()
    };
    algo.with_quantization(Quantization::new(Factor::none()))
}

/// Possibly lossy algorithm suited to a bit depth and dimension.
///
/// Same choice as [`make_lossless_algo`], HCompress being scaled.
pub fn make_algo(bitpix: i32, dimension: usize) -> Result<Algo> {
    if bitpix > 0 && bitpix <= 24 {
        Ok(Algo::plio().with_quantization(Quantization::none()))
    } else if dimension >= 2 {
        Algo::hcompress().with_scale(Factor::relative(2.5)?)
    } else {
        Ok(Algo::rice())
    }
}

/// Values an action applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    Any,
    Integers,
    Floats,
}

impl ValueKind {
    fn matches(&self, type_code: TypeCode) -> bool {
        match self {
            ValueKind::Any => true,
            ValueKind::Integers => type_code.is_integer(),
            ValueKind::Floats => type_code.is_float(),
        }
    }
}

/// Algorithm conditionally applied to some kind of values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionAction {
    pub algo: Algo,
    pub target: ValueKind,
}

impl CompressionAction {
    pub fn any(algo: Algo) -> Self {
        Self {
            algo,
            target: ValueKind::Any,
        }
    }

    pub fn ints(algo: Algo) -> Self {
        Self {
            algo,
            target: ValueKind::Integers,
        }
    }

    pub fn floats(algo: Algo) -> Self {
        Self {
            algo,
            target: ValueKind::Floats,
        }
    }

    /// The algorithm if it applies to the given array
    pub fn compression(&self, type_code: TypeCode, shape: &[i64]) -> Option<Algo> {
        (self.target.matches(type_code) && self.algo.can_compress(type_code, shape))
            .then(|| self.algo.clone())
    }
}

/// Automatic choice of an algorithm for a new image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompressionStrategy {
    /// Never lose information
    #[default]
    Lossless,
    /// Keep integers exact, quantize floats
    LosslessInts,
    /// Allow losses for any type
    Lossy,
}

impl CompressionStrategy {
    /// Quantization applied to floats by lossy choices
    pub fn float_quantization() -> Result<Quantization> {
        Ok(Quantization::new(Factor::relative(4.0)?))
    }

    /// Candidate actions, in order of preference
    pub fn actions(&self, type_code: TypeCode, dimension: usize) -> Result<Vec<CompressionAction>> {
        let bitpix = type_code.bitpix().unwrap_or(0);
        let lossless_ints = CompressionAction::ints(make_lossless_algo(bitpix, dimension));
        let lossy_floats = CompressionAction::floats(
            make_algo(bitpix, dimension)?.with_quantization(Self::float_quantization()?),
        );
        Ok(match self {
            CompressionStrategy::Lossless => vec![
                lossless_ints,
                CompressionAction::floats(Algo::shuffled_gzip()),
            ],
            CompressionStrategy::LosslessInts => vec![lossless_ints, lossy_floats],
            CompressionStrategy::Lossy => vec![
                CompressionAction::ints(make_algo(bitpix, dimension)?),
                lossy_floats,
            ],
        })
    }

    /// First applicable action, or no compression
    pub fn select(&self, type_code: TypeCode, shape: &[i64]) -> Result<Algo> {
        let algo = self
            .actions(type_code, shape.len())?
            .iter()
            .find_map(|action| action.compression(type_code, shape))
            .unwrap_or_default();
        debug!(
            strategy = ?self,
            %type_code,
            ?shape,
            algo = %algo,
            "Selected compression"
        );
        Ok(algo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(type_code: TypeCode) -> Vec<i64> {
        vec![(MIN_COMPRESSED_BYTES / type_code.size_in_bytes()) as i64]
    }

    fn four_rows(type_code: TypeCode) -> Vec<i64> {
        vec![(MIN_COMPRESSED_BYTES / type_code.size_in_bytes()) as i64, 4]
    }

    fn square(type_code: TypeCode) -> Vec<i64> {
        let side = (MIN_COMPRESSED_BYTES / type_code.size_in_bytes()) as i64;
        vec![side, side]
    }

    fn can(action: &CompressionAction, type_code: TypeCode) -> bool {
        assert!(action.compression(type_code, &flat(type_code)).is_none());
        action.compression(type_code, &four_rows(type_code)).is_some()
    }

    fn cannot(action: &CompressionAction, type_code: TypeCode) -> bool {
        action.compression(type_code, &square(type_code)).is_none()
    }

    #[test]
    fn test_factor_validation() {
        assert!(matches!(
            Factor::absolute(-1.0),
            Err(FitsError::Validation(_))
        ));
        assert!(Factor::relative(0.0).is_err());
        assert!(Factor::absolute(f32::NAN).is_err());

        let absolute = Factor::absolute(2.5).unwrap();
        assert_eq!(absolute.kind(), FactorKind::Absolute);
        assert_eq!(absolute.value(), 2.5);
        let relative = Factor::relative(4.0).unwrap();
        assert_eq!(relative.kind(), FactorKind::Relative);
        assert_eq!(relative.value(), 4.0);
        assert!(Factor::none().is_none());
    }

    #[test]
    fn test_quantization_dithering() {
        let quantization = Quantization::new(Factor::relative(4.0).unwrap());
        assert_eq!(quantization.dithering(), Dithering::EveryPixel);

        let mut disabled = Quantization::new(Factor::none());
        assert_eq!(disabled.dithering(), Dithering::None);
        assert!(matches!(
            disabled.set_dithering(Dithering::EveryPixel),
            Err(FitsError::Validation(_))
        ));
        assert!(disabled.set_dithering(Dithering::None).is_ok());

        let mut enabled = Quantization::with_dithering(
            Factor::absolute(1.0).unwrap(),
            Dithering::NonZeroPixel,
        )
        .unwrap();
        enabled.set_level(Factor::none());
        assert_eq!(enabled.dithering(), Dithering::None);
        assert!(Quantization::with_dithering(Factor::none(), Dithering::EveryPixel).is_err());
    }

    #[test]
    fn test_quantization_deserialization_checks_dithering() {
        let json = r#"{"level":0.0,"dithering":"EveryPixel"}"#;
        assert!(serde_json::from_str::<Quantization>(json).is_err());

        let config = r#"{"compression":{"Rice":{"tiling":[-1,1],
            "quantization":{"level":0.0,"dithering":"EveryPixel"}}}}"#;
        assert!(crate::config::EngineConfig::from_json(config).is_err());

        let quantization =
            Quantization::with_dithering(Factor::absolute(2.0).unwrap(), Dithering::NonZeroPixel)
                .unwrap();
        let json = serde_json::to_string(&quantization).unwrap();
        assert_eq!(serde_json::from_str::<Quantization>(&json).unwrap(), quantization);
    }

    #[test]
    fn test_tiling_limit() {
        assert!(Tiling::new(vec![1; 6]).is_ok());
        assert!(matches!(
            Tiling::new(vec![1; 7]),
            Err(FitsError::OutOfBounds(_))
        ));
        assert_eq!(Tiling::rowwise(16).shape(), &[MAX, 16]);
        assert_eq!(Tiling::whole().shape(), &[MAX]);

        let err = serde_json::from_str::<Tiling>("[1,1,1,1,1,1,1]");
        assert!(err.is_err());
        let ok: Tiling = serde_json::from_str("[-1,4]").unwrap();
        assert_eq!(ok, Tiling::rowwise(4));
    }

    #[test]
    fn test_default_algos() {
        assert_eq!(Algo::rice().tiling(), Some(&Tiling::rowwise(1)));
        assert_eq!(Algo::hcompress().tiling(), Some(&Tiling::rowwise(16)));
        assert!(Algo::hcompress().is_lossless());
        assert!(Algo::gzip().with_tiling(Tiling::whole()).is_lossless());
        assert_eq!(Algo::default(), Algo::NoCompression);
        assert!(Algo::rice().with_scale(Factor::none()).is_err());
    }

    #[test]
    fn test_algo_selection_heuristics() {
        assert!(matches!(make_lossless_algo(8, 2), Algo::Plio { .. }));
        assert!(matches!(make_lossless_algo(24, 1), Algo::Plio { .. }));
        assert!(matches!(make_lossless_algo(32, 2), Algo::HCompress { .. }));
        assert!(matches!(make_lossless_algo(-32, 2), Algo::HCompress { .. }));
        assert!(matches!(make_lossless_algo(32, 1), Algo::Rice { .. }));
        assert!(make_lossless_algo(32, 2).is_lossless());

        match make_algo(32, 3).unwrap() {
            Algo::HCompress { scale, .. } => assert_eq!(scale, Factor::relative(2.5).unwrap()),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(make_algo(16, 3).unwrap(), Algo::Plio { .. }));
        assert!(matches!(make_algo(-64, 1).unwrap(), Algo::Rice { .. }));
    }

    #[test]
    fn test_lossless_compression_ability() {
        for algo in [Algo::gzip(), Algo::shuffled_gzip()] {
            let action = CompressionAction::any(algo);
            assert!(can(&action, TypeCode::U16));
            assert!(cannot(&action, TypeCode::I64));
            assert!(can(&action, TypeCode::F32));
        }
        for algo in [Algo::rice(), Algo::hcompress()] {
            let action = CompressionAction::any(algo);
            assert!(can(&action, TypeCode::U16));
            assert!(cannot(&action, TypeCode::I64));
            assert!(cannot(&action, TypeCode::F32));
        }
        let plio = CompressionAction::any(Algo::plio());
        assert!(can(&plio, TypeCode::U16));
        assert!(cannot(&plio, TypeCode::I32));
        assert!(cannot(&plio, TypeCode::I64));
        assert!(cannot(&plio, TypeCode::F32));

        let ints = CompressionAction::ints(Algo::gzip());
        assert!(can(&ints, TypeCode::U16));
        assert!(cannot(&ints, TypeCode::I64));
        assert!(cannot(&ints, TypeCode::F32));

        let floats = CompressionAction::floats(Algo::gzip());
        assert!(cannot(&floats, TypeCode::U16));
        assert!(cannot(&floats, TypeCode::I64));
        assert!(can(&floats, TypeCode::F32));
    }

    #[test]
    fn test_lossy_compression_ability() {
        let quantization = Quantization::new(Factor::relative(4.0).unwrap());
        let rice = CompressionAction::any(Algo::rice().with_quantization(quantization));
        assert!(can(&rice, TypeCode::F32));
        let hcompress = CompressionAction::any(
            Algo::hcompress()
                .with_tiling(Tiling::rowwise(16))
                .with_quantization(quantization),
        );
        assert!(can(&hcompress, TypeCode::F32));
        let plio = CompressionAction::any(Algo::plio().with_quantization(quantization));
        assert!(cannot(&plio, TypeCode::F32));
    }

    #[test]
    fn test_strategies() {
        let small = [2880 / 4];
        for strategy in [
            CompressionStrategy::Lossless,
            CompressionStrategy::LosslessInts,
            CompressionStrategy::Lossy,
        ] {
            assert_eq!(
                strategy.select(TypeCode::F32, &small).unwrap(),
                Algo::NoCompression
            );
            assert_eq!(
                strategy.select(TypeCode::I64, &[1000, 1000]).unwrap(),
                Algo::NoCompression
            );
        }

        let lossless = CompressionStrategy::Lossless;
        let algo = lossless.select(TypeCode::F32, &[1000, 10]).unwrap();
        assert!(matches!(algo, Algo::ShuffledGzip { .. }));
        assert!(algo.is_lossless());
        assert!(lossless.select(TypeCode::I32, &[1000, 10]).unwrap().is_lossless());

        let mixed = CompressionStrategy::LosslessInts;
        assert!(mixed.select(TypeCode::I16, &[1000, 10]).unwrap().is_lossless());
        let algo = mixed.select(TypeCode::F64, &[1000, 10]).unwrap();
        assert!(matches!(algo, Algo::HCompress { .. }));
        assert!(!algo.is_lossless());

        let lossy = CompressionStrategy::Lossy;
        let algo = lossy.select(TypeCode::I32, &[1000, 10]).unwrap();
        assert!(matches!(algo, Algo::HCompress { .. }));
        assert!(!algo.is_lossless());
    }

    #[test]
    fn test_algo_serialization() {
        let algo = make_algo(-32, 2)
            .unwrap()
            .with_quantization(CompressionStrategy::float_quantization().unwrap());
        let json = serde_json::to_string(&algo).unwrap();
        let back: Algo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, algo);
    }
}
