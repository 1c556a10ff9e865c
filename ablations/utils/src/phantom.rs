//! 确定性的合成颈动脉超声样本.
//!
//! 每个样本包含一条大致水平的血管: 暗的管腔, 以及管腔下方的亮的远壁.
//! 远壁厚度已知, 可以作为 IMT 真值. 图像带有乘性斑点噪声与随机整体增益,
//! 用于模拟不同探头与机构之间的亮度差异.

use carotid_berry::consts::label::{BACKGROUND, LUMEN, WALL};
use carotid_berry::qa::RasterPair;
use carotid_berry::{Idx2d, LabelMask, UsImage};
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use std::ops::RangeInclusive;

/// 管腔, 组织, 血管壁的基础回声强度.
const LUMEN_ECHO: f64 = 0.06;
const TISSUE_ECHO: f64 = 0.35;
const WALL_ECHO: f64 = 0.8;

/// 合成样本规格.
#[derive(Clone, Debug)]
pub struct PhantomSpec {
    /// 图像形状 `(高, 宽)`.
    pub shape: Idx2d,

    /// 像素间距 (毫米/像素).
    pub spacing_mm_per_pixel: f64,

    /// 远壁像素厚度的取值范围.
    pub wall_px: RangeInclusive<usize>,

    /// 乘性斑点噪声强度.
    pub speckle: f64,

    /// 整体增益的取值范围.
    pub gain: RangeInclusive<f64>,
}

impl Default for PhantomSpec {
    fn default() -> Self {
        Self {
            shape: (128, 160),
            spacing_mm_per_pixel: carotid_berry::consts::clinical::DEFAULT_SPACING_MM_PER_PIXEL,
            wall_px: 10..=28,
            speckle: 0.35,
            gain: 0.4..=1.0,
        }
    }
}

/// 一个合成样本.
#[derive(Clone, Debug)]
pub struct Phantom {
    /// 生成种子.
    pub seed: u64,

    /// 8-bit 灰度图像.
    pub image: Array2<u8>,

    /// 分割标签 (0 背景, 1 管腔, 2 血管壁).
    pub mask: Array2<u8>,

    /// 像素间距 (毫米/像素).
    pub spacing_mm_per_pixel: f64,

    /// 远壁像素厚度, 即每一列 `|outer - inner|`.
    pub wall_px: usize,
}

impl Phantom {
    /// 由种子生成样本. 相同的种子与规格总是得到相同的样本.
    ///
    /// 规格中的图像高度必须足以容纳管腔与远壁, 否则程序 panic.
    pub fn generate(seed: u64, spec: &PhantomSpec) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let (h, w) = spec.shape;

        let wall_px = rng.gen_range(spec.wall_px.clone());
        let half_lumen = rng.gen_range(10.0..18.0);
        let amplitude = rng.gen_range(0.0..4.0);
        let phase = rng.gen_range(0.0..2.0 * PI);
        let gain = rng.gen_range(spec.gain.clone());
        let base = h as f64 * 0.4;
        assert!(
            base + amplitude + half_lumen + 2.0 + wall_px as f64 <= h as f64 - 1.0,
            "图像高度 {h} 不足以容纳血管"
        );

        // 每一列的管腔中心行.
        let centers: Vec<f64> = (0..w)
            .map(|x| base + amplitude * (2.0 * PI * x as f64 / w as f64 + phase).sin())
            .collect();

        let mask = Array2::from_shape_fn((h, w), |(r, x)| {
            let top = (centers[x] - half_lumen).round() as usize;
            let bottom = (centers[x] + half_lumen).round() as usize;
            if (top..=bottom).contains(&r) {
                LUMEN
            } else if (bottom + 1..=bottom + 1 + wall_px).contains(&r) {
                WALL
            } else {
                BACKGROUND
            }
        });

        let image = mask.mapv(|label| {
            let echo = match label {
                LUMEN => LUMEN_ECHO,
                WALL => WALL_ECHO,
                _ => TISSUE_ECHO,
            };
            let speckle = 1.0 + spec.speckle * (rng.gen::<f64>() * 2.0 - 1.0);
            ((echo * speckle * gain).clamp(0.0, 1.0) * 255.0).round() as u8
        });

        Self {
            seed,
            image,
            mask,
            spacing_mm_per_pixel: spec.spacing_mm_per_pixel,
            wall_px,
        }
    }

    /// IMT 真值 (毫米).
    #[inline]
    pub fn true_imt_mm(&self) -> f64 {
        self.wall_px as f64 * self.spacing_mm_per_pixel
    }

    /// 图像.
    #[inline]
    pub fn us_image(&self) -> UsImage {
        UsImage::from_gray(self.image.view())
    }

    /// 分割标签.
    #[inline]
    pub fn label_mask(&self) -> LabelMask<'_> {
        LabelMask::new(self.mask.view())
    }

    /// 转换为质控样本对.
    pub fn to_pair(&self) -> RasterPair<u8, u8> {
        RasterPair {
            image: Some(self.image.clone().into_dyn()),
            mask: Some(self.mask.clone().into_dyn()),
        }
    }
}

/// 注入质控样本对的损坏方式.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Corruption {
    /// 图像解码失败.
    Unreadable,

    /// 图像所有像素被置为同一个值.
    Constant,

    /// 标签被裁掉最后一行.
    CroppedMask,

    /// 标签全为背景.
    EmptyMask,
}

impl Corruption {
    /// 所有损坏方式.
    pub const ALL: [Corruption; 4] = [
        Corruption::Unreadable,
        Corruption::Constant,
        Corruption::CroppedMask,
        Corruption::EmptyMask,
    ];

    /// 质控应当给出的原因代码.
    pub fn expected_reason(&self) -> &'static str {
        match self {
            Corruption::Unreadable => "unreadable",
            Corruption::Constant => "constant",
            Corruption::CroppedMask => "shape_mismatch",
            Corruption::EmptyMask => "too_sparse",
        }
    }

    /// 对样本对实施损坏.
    pub fn apply(&self, pair: &mut RasterPair<u8, u8>) {
        match self {
            Corruption::Unreadable => pair.image = None,
            Corruption::Constant => {
                if let Some(image) = pair.image.as_mut() {
                    image.fill(0);
                }
            }
            Corruption::CroppedMask => {
                if let Some(mask) = pair.mask.as_mut() {
                    let h = mask.len_of(Axis(0));
                    if h > 1 {
                        mask.slice_axis_inplace(Axis(0), (0..h - 1).into());
                    }
                }
            }
            Corruption::EmptyMask => {
                if let Some(mask) = pair.mask.as_mut() {
                    mask.fill(BACKGROUND);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carotid_berry::imt::{imt_mm_from_mask, ClassLabels};
    use carotid_berry::qa::{validate_pair, CoverageConfig};

    #[test]
    fn test_deterministic() {
        let spec = PhantomSpec::default();
        let a = Phantom::generate(7, &spec);
        let b = Phantom::generate(7, &spec);
        assert_eq!(a.image, b.image);
        assert_eq!(a.mask, b.mask);
        assert_eq!(a.wall_px, b.wall_px);
    }

    #[test]
    fn test_imt_matches_ground_truth() {
        let spec = PhantomSpec::default();
        for seed in 0..8 {
            let p = Phantom::generate(seed, &spec);
            let m = imt_mm_from_mask(p.label_mask(), p.spacing_mm_per_pixel, ClassLabels::default());
            assert!((m.imt_mm.unwrap() - p.true_imt_mm()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_corruptions_are_flagged() {
        let p = Phantom::generate(1, &PhantomSpec::default());
        let cfg = CoverageConfig::default();
        assert!(validate_pair(&p.to_pair(), &cfg).is_ok());
        for c in Corruption::ALL {
            let mut pair = p.to_pair();
            c.apply(&mut pair);
            let (_, err) = validate_pair(&pair, &cfg).unwrap_err();
            assert_eq!(err.code(), c.expected_reason());
        }
    }
}
