//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Idx2d;

pub use crate::{LabelMask, OwnedLabelMask, UsImage};
pub use crate::{ConfigError, QaError, QaErrorKind, ValidationVerdict};

pub use crate::consts::clinical::{DEFAULT_SPACING_MM_PER_PIXEL, IMT_HIGH_RISK_MM};
pub use crate::consts::label::{BACKGROUND, LUMEN, WALL};

pub use crate::qa::{check_mask, filter_pairs, validate_image, CoverageConfig, QaReport, RasterPair};

pub use crate::preproc::{clean, denoise, enhance, CleanConfig, DenoiseConfig, EnhanceConfig, Wavelet};

pub use crate::imt::{
    batch_mae, extract_interfaces, imt_mm_from_mask, to_measurement, ClassLabels,
    FallbackStrategy, ImtMeasurement, LinearProbabilityFallback, RiskLevel, ThicknessProfile,
};
