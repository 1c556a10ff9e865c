//! 数据集级别的质控过滤.

use super::{check_mask, spatial_shape, validate_image, validate_mask_raster, CoverageConfig};
use crate::{MaskPixel, QaError};
use ndarray::{ArrayD, ArrayViewD, Axis, Ix2};

/// 一个可以被质控的 (图像, 标签) 样本.
///
/// 调用方可以为自己的样本类型 (例如携带路径或编号的结构) 实现该 trait,
/// 过滤结果会原样交还这些样本.
pub trait QaSample {
    /// 图像像素类型.
    type Pixel: PartialEq;

    /// 标签像素类型.
    type MaskPixel: MaskPixel;

    /// 解码后的图像. 解码失败时返回 `None`.
    fn image(&self) -> Option<ArrayViewD<'_, Self::Pixel>>;

    /// 解码后的标签. 解码失败时返回 `None`.
    fn mask(&self) -> Option<ArrayViewD<'_, Self::MaskPixel>>;
}

/// 最简单的样本: 直接持有两个 (可能缺失的) 栅格.
#[derive(Clone, Debug)]
pub struct RasterPair<I, M> {
    /// 解码后的图像.
    pub image: Option<ArrayD<I>>,

    /// 解码后的标签.
    pub mask: Option<ArrayD<M>>,
}

impl<I: PartialEq, M: MaskPixel> QaSample for RasterPair<I, M> {
    type Pixel = I;
    type MaskPixel = M;

    #[inline]
    fn image(&self) -> Option<ArrayViewD<'_, I>> {
        self.image.as_ref().map(|a| a.view())
    }

    #[inline]
    fn mask(&self) -> Option<ArrayViewD<'_, M>> {
        self.mask.as_ref().map(|a| a.view())
    }
}

/// 样本中未通过校验的一方.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Side {
    /// 图像.
    Image,

    /// 标签.
    Mask,
}

/// 被标记的样本及原因.
#[derive(Clone, Debug)]
pub struct Flagged<S> {
    /// 原样本.
    pub sample: S,

    /// 未通过校验的一方.
    pub side: Side,

    /// 详细原因.
    pub error: QaError,
}

impl<S> Flagged<S> {
    /// 原因的文本代码.
    #[inline]
    pub fn reason(&self) -> &'static str {
        self.error.code()
    }
}

/// 过滤结果. 两个序列都保持输入顺序.
#[derive(Clone, Debug)]
pub struct QaReport<S> {
    /// 通过校验的样本.
    pub valid: Vec<S>,

    /// 被标记的样本.
    pub flagged: Vec<Flagged<S>>,
}

impl<S> QaReport<S> {
    /// 样本总数.
    #[inline]
    pub fn len(&self) -> usize {
        self.valid.len() + self.flagged.len()
    }

    /// 是否没有任何样本?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 按输入顺序收集 `(样本, 校验结果)`.
    fn collect<I>(it: I) -> Self
    where
        I: IntoIterator<Item = (S, Result<(), (Side, QaError)>)>,
    {
        let mut valid = Vec::new();
        let mut flagged = Vec::new();
        for (idx, (sample, verdict)) in it.into_iter().enumerate() {
            match verdict {
                Ok(()) => valid.push(sample),
                Err((side, error)) => {
                    log::debug!("样本 #{idx} 被标记 ({side:?}): {error}");
                    flagged.push(Flagged {
                        sample,
                        side,
                        error,
                    });
                }
            }
        }
        log::info!(
            "质控完成: {} 个样本通过, {} 个样本被标记",
            valid.len(),
            flagged.len()
        );
        Self { valid, flagged }
    }
}

/// 校验单个样本对.
///
/// 依次进行: 图像完整性 -> 标签可读性 -> 标签一致性 (以图像的空间形状为准).
/// 第一项失败的检查决定返回的原因.
pub fn validate_pair<S: QaSample>(sample: &S, cfg: &CoverageConfig) -> Result<(), (Side, QaError)> {
    let image = sample.image();
    validate_image(image.clone())
        .into_result()
        .map_err(|e| (Side::Image, e))?;
    let image_shape = image
        .as_ref()
        .and_then(|i| spatial_shape(i.shape()))
        .ok_or((Side::Image, QaError::Unreadable))?;

    let mask = sample.mask();
    validate_mask_raster(mask.clone())
        .into_result()
        .map_err(|e| (Side::Mask, e))?;
    let mask = mask.ok_or((Side::Mask, QaError::Unreadable))?;
    let shape = mask.shape().to_vec();

    // 多通道标签只看第一个通道.
    let plane = if mask.ndim() == 3 {
        mask.index_axis_move(Axis(2), 0)
    } else {
        mask
    };
    let plane = plane
        .into_dimensionality::<Ix2>()
        .map_err(|_| (Side::Mask, QaError::BadShape(shape)))?;

    check_mask(plane, image_shape, cfg)
        .into_result()
        .map_err(|e| (Side::Mask, e))
}

/// 校验所有样本, 保留通过的样本, 并标记未通过的样本及原因.
///
/// 单个样本失败不会中断批处理. 返回结果中两个序列都保持输入顺序.
pub fn filter_pairs<S, I>(pairs: I, cfg: &CoverageConfig) -> QaReport<S>
where
    S: QaSample,
    I: IntoIterator<Item = S>,
{
    QaReport::collect(pairs.into_iter().map(|s| {
        let verdict = validate_pair(&s, cfg);
        (s, verdict)
    }))
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

        /// 借助 `rayon`, 并行地校验所有样本. 语义与 [`filter_pairs`] 完全相同.
        pub fn par_filter_pairs<S>(pairs: Vec<S>, cfg: &CoverageConfig) -> QaReport<S>
        where
            S: QaSample + Sync,
        {
            let verdicts: Vec<_> = pairs.par_iter().map(|s| validate_pair(s, cfg)).collect();
            QaReport::collect(pairs.into_iter().zip(verdicts))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3, ArrayD};

    type Pair = RasterPair<u8, u8>;

    fn textured(h: usize, w: usize) -> ArrayD<u8> {
        Array2::from_shape_fn((h, w), |(r, c)| ((r * 7 + c * 13) % 251) as u8).into_dyn()
    }

    fn band_mask(h: usize, w: usize) -> ArrayD<u8> {
        Array2::from_shape_fn((h, w), |(r, _)| if (3..=5).contains(&r) { 2 } else { 0 }).into_dyn()
    }

    fn good_pair() -> Pair {
        RasterPair {
            image: Some(textured(10, 10)),
            mask: Some(band_mask(10, 10)),
        }
    }

    #[test]
    fn test_one_corrupted_sample() {
        let _ = simple_logger::SimpleLogger::new().init();
        let n = 6;
        let mut pairs: Vec<Pair> = (0..n).map(|_| good_pair()).collect();
        pairs[3].image = Some(Array2::from_elem((10, 10), 0u8).into_dyn());

        let report = filter_pairs(pairs, &CoverageConfig::default());
        assert_eq!(report.len(), n);
        assert_eq!(report.valid.len(), n - 1);
        assert_eq!(report.flagged.len(), 1);
        assert_eq!(report.flagged[0].reason(), "constant");
        assert_eq!(report.flagged[0].side, Side::Image);
    }

    #[test]
    fn test_flagged_order_and_sides() {
        let mut pairs: Vec<Pair> = (0..5).map(|_| good_pair()).collect();
        pairs[0].image = None;
        pairs[2].mask = Some(band_mask(10, 12));
        pairs[4].mask = Some(Array2::<u8>::zeros((10, 10)).into_dyn());

        let report = filter_pairs(pairs, &CoverageConfig::default());
        let got: Vec<_> = report
            .flagged
            .iter()
            .map(|f| (f.side, f.reason()))
            .collect();
        assert_eq!(
            got,
            vec![
                (Side::Image, "unreadable"),
                (Side::Mask, "shape_mismatch"),
                (Side::Mask, "too_sparse"),
            ]
        );
        assert_eq!(report.valid.len(), 2);
    }

    #[test]
    fn test_multichannel_inputs() {
        let rgb = Array3::from_shape_fn((10, 10, 3), |(r, c, k)| (r + c + k) as u8).into_dyn();
        let mask3 = Array3::from_shape_fn((10, 10, 3), |(r, _, _)| u8::from(r == 4)).into_dyn();
        let pair = RasterPair {
            image: Some(rgb),
            mask: Some(mask3),
        };
        assert!(validate_pair(&pair, &CoverageConfig::default()).is_ok());
    }

    #[test]
    fn test_unreadable_mask() {
        let pair: Pair = RasterPair {
            image: Some(textured(8, 8)),
            mask: None,
        };
        let err = validate_pair(&pair, &CoverageConfig::default()).unwrap_err();
        assert_eq!(err, (Side::Mask, QaError::Unreadable));
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_par_filter_matches_sequential() {
        let mut pairs: Vec<Pair> = (0..32).map(|_| good_pair()).collect();
        for i in (0..32).step_by(5) {
            pairs[i].image = Some(Array2::from_elem((10, 10), 3u8).into_dyn());
        }
        let cfg = CoverageConfig::default();
        let seq = filter_pairs(pairs.clone(), &cfg);
        let par = par_filter_pairs(pairs, &cfg);
        assert_eq!(seq.valid.len(), par.valid.len());
        assert_eq!(seq.flagged.len(), par.flagged.len());
        assert!(par.flagged.iter().all(|f| f.reason() == "constant"));
    }
}
