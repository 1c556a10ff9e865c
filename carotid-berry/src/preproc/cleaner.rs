//! 组合清洗流程.

use super::{denoise, enhance, DenoiseConfig, EnhanceConfig};
use crate::UsImage;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 清洗流程参数. 某一步的参数为 `None` 时跳过该步.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CleanConfig {
    enhance: Option<EnhanceConfig>,
    denoise: Option<DenoiseConfig>,
}

impl CleanConfig {
    /// 构建清洗流程参数.
    pub fn new(enhance: Option<EnhanceConfig>, denoise: Option<DenoiseConfig>) -> Self {
        Self { enhance, denoise }
    }

    /// 只做归一化与截断.
    pub fn passthrough() -> Self {
        Self::new(None, None)
    }

    /// 对比度增强参数.
    #[inline]
    pub fn enhance(&self) -> Option<&EnhanceConfig> {
        self.enhance.as_ref()
    }

    /// 小波去噪参数.
    #[inline]
    pub fn denoise(&self) -> Option<&DenoiseConfig> {
        self.denoise.as_ref()
    }
}

/// 两步都启用, 均使用默认参数.
impl Default for CleanConfig {
    fn default() -> Self {
        Self::new(Some(EnhanceConfig::default()), Some(DenoiseConfig::default()))
    }
}

/// 清洗单张图像.
///
/// 固定顺序: 归一化 -> 对比度增强 -> 小波去噪 -> 截断到 \[0, 1\].
/// 先增强, 后去噪, 顺序不可交换.
/// 输出形状与通道数与输入完全一致.
pub fn clean(image: &UsImage, cfg: &CleanConfig) -> UsImage {
    let mut out = image.normalized();
    if let Some(e) = cfg.enhance() {
        out = enhance(&out, e);
    }
    if let Some(d) = cfg.denoise() {
        out = denoise(&out, d);
    }
    out.clip_unit()
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::prelude::*;

        /// 借助 `rayon`, 并行地清洗一批图像. 输出顺序与输入一致.
        pub fn par_clean_batch(images: &[UsImage], cfg: &CleanConfig) -> Vec<UsImage> {
            images.par_iter().map(|img| clean(img, cfg)).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    fn speckled(h: usize, w: usize) -> UsImage {
        let gray = Array2::from_shape_fn((h, w), |(r, c)| ((r * 37 + c * 101 + r * c) % 256) as u8);
        UsImage::from_gray(gray.view())
    }

    fn in_unit(img: &UsImage) -> bool {
        img.view().iter().all(|v| (0.0..=1.0).contains(v))
    }

    #[test]
    fn test_shape_preserved() {
        for (h, w) in [(64, 64), (37, 53), (7, 9), (1, 12)] {
            let img = speckled(h, w);
            let out = clean(&img, &CleanConfig::default());
            assert_eq!(out.shape(), (h, w));
            assert_eq!(out.channels(), 1);
            assert!(in_unit(&out));
        }

        let rgb = UsImage::from_raw(Array3::from_shape_fn((30, 41, 3), |(r, c, k)| {
            ((r * 5 + c * 3 + k * 50) % 200) as f64
        }));
        let out = clean(&rgb, &CleanConfig::default());
        assert_eq!(out.view().dim(), (30, 41, 3));
        assert!(in_unit(&out));
    }

    #[test]
    fn test_passthrough_only_normalizes() {
        let img = speckled(16, 16);
        let out = clean(&img, &CleanConfig::passthrough());
        let max = img.max_value();
        for (a, b) in img.view().iter().zip(out.view().iter()) {
            assert!((a / max - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_flags_respected() {
        let img = speckled(48, 48);
        let e = EnhanceConfig::default();
        let d = DenoiseConfig::default();

        let only_enhance = clean(&img, &CleanConfig::new(Some(e), None));
        assert_eq!(only_enhance, enhance(&img, &e));

        let only_denoise = clean(&img, &CleanConfig::new(None, Some(d)));
        assert_eq!(only_denoise, denoise(&img.normalized(), &d).clip_unit());

        let both = clean(&img, &CleanConfig::default());
        assert_eq!(both, denoise(&enhance(&img, &e), &d).clip_unit());
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_par_clean_batch() {
        let images: Vec<_> = (1..6).map(|k| speckled(8 * k, 10 * k)).collect();
        let cfg = CleanConfig::default();
        let par = par_clean_batch(&images, &cfg);
        assert_eq!(par.len(), images.len());
        for (img, out) in images.iter().zip(par.iter()) {
            assert_eq!(&clean(img, &cfg), out);
        }
    }
}
