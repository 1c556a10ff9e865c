//! 图像清洗: 对比度增强与小波去噪.
//!
//! 所有函数都返回新图像, 输入不会被修改. 输出形状与输入完全一致.

mod clahe;
mod cleaner;
mod denoise;
mod wavelet;

pub use clahe::{enhance, equalize_plane, EnhanceConfig};
pub use cleaner::{clean, CleanConfig};
pub use denoise::{
    denoise, denoise_plane, soft_threshold, universal_threshold, DenoiseConfig, ThresholdMode,
};
pub use wavelet::{Decomposition, DetailBands, Wavelet};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        pub use cleaner::par_clean_batch;
    }
}
