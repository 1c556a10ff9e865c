//! 小波阈值去噪.
//!
//! 超声图像的斑点噪声主要集中在细节子带. 用近似子带估计噪声水平,
//! 对所有细节系数做软阈值收缩, 再重构.

use super::wavelet::{Decomposition, Wavelet};
use crate::consts::preproc::{DEFAULT_LEVELS, DEFAULT_THRESHOLD_SCALE, MAD_NORMALIZER};
use crate::{ConfigError, UsImage};
use ndarray::{Array2, ArrayView2};
use ordered_float::OrderedFloat;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 阈值收缩方式.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ThresholdMode {
    /// `sign(d) * max(|d| - tau, 0)`.
    #[default]
    Soft,
}

impl ThresholdMode {
    /// 对单个系数实施收缩.
    #[inline]
    pub fn apply(&self, d: f64, tau: f64) -> f64 {
        match self {
            ThresholdMode::Soft => soft_threshold(d, tau),
        }
    }
}

/// 小波去噪参数.
///
/// 该配置是只读的. 若要修改参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DenoiseConfig {
    wavelet: Wavelet,
    levels: u32,
    mode: ThresholdMode,
    threshold_scale: f64,
}

impl DenoiseConfig {
    /// 构建小波去噪参数.
    ///
    /// `levels` 至少为 1; `threshold_scale` 必须是有限非负数.
    /// `threshold_scale` 为 0 时去噪退化为恒等变换 (仅有浮点舍入误差).
    pub fn new(
        wavelet: Wavelet,
        levels: u32,
        mode: ThresholdMode,
        threshold_scale: f64,
    ) -> Result<Self, ConfigError> {
        if levels == 0 {
            return Err(ConfigError::ZeroLevels);
        }
        if !threshold_scale.is_finite() || threshold_scale < 0.0 {
            return Err(ConfigError::ThresholdScale(threshold_scale));
        }
        Ok(Self {
            wavelet,
            levels,
            mode,
            threshold_scale,
        })
    }

    /// 小波基.
    #[inline]
    pub fn wavelet(&self) -> Wavelet {
        self.wavelet
    }

    /// 分解层数.
    #[inline]
    pub fn levels(&self) -> u32 {
        self.levels
    }

    /// 阈值收缩方式.
    #[inline]
    pub fn mode(&self) -> ThresholdMode {
        self.mode
    }

    /// 阈值缩放系数.
    #[inline]
    pub fn threshold_scale(&self) -> f64 {
        self.threshold_scale
    }
}

/// db4, 2 层, 软阈值, 缩放系数 1.0.
impl Default for DenoiseConfig {
    fn default() -> Self {
        Self {
            wavelet: Wavelet::Db4,
            levels: DEFAULT_LEVELS,
            mode: ThresholdMode::Soft,
            threshold_scale: DEFAULT_THRESHOLD_SCALE,
        }
    }
}

/// 软阈值.
#[inline]
pub fn soft_threshold(d: f64, tau: f64) -> f64 {
    d.signum() * (d.abs() - tau).max(0.0)
}

/// 中位数. 偶数长度取中间两个数的平均值; 空序列返回 `None`.
fn median<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let mut v: Vec<OrderedFloat<f64>> = values.into_iter().map(OrderedFloat).collect();
    let n = v.len();
    if n == 0 {
        return None;
    }
    let (lower, mid, _) = v.select_nth_unstable(n / 2);
    let mid = mid.0;
    if n % 2 == 1 {
        Some(mid)
    } else {
        // `lower` 非空, 其最大值即第 n/2 - 1 小的数.
        let below = lower.iter().max().map_or(mid, |v| v.0);
        Some((below + mid) / 2.0)
    }
}

/// 通用阈值 `tau = scale * sigma * sqrt(2 ln N)`.
///
/// 其中 `sigma = median(|approx|) / 0.6745`, `N` 为近似子带的元素个数.
/// 近似子带只有一个元素时 `ln N = 0`, 阈值为 0.
pub fn universal_threshold(approx: ArrayView2<f64>, scale: f64) -> f64 {
    let n = approx.len();
    let sigma = median(approx.iter().map(|v| v.abs())).unwrap_or(0.0) / MAD_NORMALIZER;
    scale * sigma * (2.0 * (n as f64).ln()).max(0.0).sqrt()
}

/// 对单个平面实施小波阈值去噪, 输出形状与输入一致.
///
/// 总是分解到 `cfg.levels()` 层. 层数超过 [`Wavelet::max_level`] (以较短边计算)
/// 时仍可精确重构, 只是粗尺度系数受周期延拓的边界影响, 此时记录一条警告.
/// 空平面原样返回.
pub fn denoise_plane(plane: ArrayView2<f64>, cfg: &DenoiseConfig) -> Array2<f64> {
    if plane.is_empty() {
        return plane.to_owned();
    }
    let (h, w) = plane.dim();
    let max_level = cfg.wavelet.max_level(h.min(w));
    if cfg.levels > max_level {
        log::warn!(
            "{}x{} 的栅格最多支持 {} 层 {} 分解, 请求 {} 层, 边界效应可能较明显",
            h,
            w,
            max_level,
            cfg.wavelet,
            cfg.levels
        );
    }

    let mut dec = Decomposition::new(plane, cfg.wavelet, cfg.levels);
    let tau = universal_threshold(dec.approx(), cfg.threshold_scale);
    let mode = cfg.mode;
    for band in dec.details_mut() {
        band.mapv_inplace(|d| mode.apply(d, tau));
    }
    dec.reconstruct()
}

/// 对图像实施小波阈值去噪. 多通道图像逐通道处理, 使用相同参数.
pub fn denoise(image: &UsImage, cfg: &DenoiseConfig) -> UsImage {
    image.map_planes(|p| denoise_plane(p, cfg))
}
