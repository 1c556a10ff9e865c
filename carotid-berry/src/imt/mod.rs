//! 内中膜厚度 (IMT) 测量.
//!
//! 分割标签 -> [`extract_interfaces`] -> [`ThicknessProfile`] -> [`to_measurement`].
//! 假设血管大致水平, 两条界面分别是血管壁在每一列上的内外边界.

mod interface;
mod measure;
mod metrics;
mod thickness;

pub use interface::{extract_interfaces, ClassLabels, InterfacePair};
pub use measure::{
    imt_mm_from_mask, to_measurement, FallbackStrategy, ImtMeasurement,
    LinearProbabilityFallback, RiskLevel,
};
pub use metrics::{batch_mae, dice, mean_dice};
pub use thickness::ThicknessProfile;

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        pub use interface::par_extract_interfaces;
        pub use metrics::par_batch_mae;
    }
}
