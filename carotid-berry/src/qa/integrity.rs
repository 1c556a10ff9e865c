//! 栅格完整性校验.

use super::ValidationVerdict;
use crate::{Idx2d, QaError};
use ndarray::ArrayViewD;

/// 多通道图像允许的最大通道数 (RGBA).
const MAX_CHANNELS: usize = 4;

/// 从解码后的栅格形状中取出空间形状 `(高, 宽)`.
///
/// 接受 `(H, W)` 以及通道在最后的 `(H, W, C)` (`1 <= C <= 4`).
/// 其它形状, 或任一空间维度为 0 时返回 `None`.
pub fn spatial_shape(shape: &[usize]) -> Option<Idx2d> {
    let (h, w) = match *shape {
        [h, w] => (h, w),
        [h, w, c] if (1..=MAX_CHANNELS).contains(&c) => (h, w),
        _ => return None,
    };
    (h > 0 && w > 0).then_some((h, w))
}

/// 检查形状, 并返回空间形状.
fn readable_shape<T>(raster: Option<&ArrayViewD<'_, T>>) -> Result<Idx2d, QaError> {
    let raster = raster.ok_or(QaError::Unreadable)?;
    spatial_shape(raster.shape()).ok_or_else(|| QaError::BadShape(raster.shape().to_vec()))
}

/// 校验一张解码后的图像.
///
/// 1. `raster` 为 `None` (上游解码失败) 时返回 `"unreadable"`;
/// 2. 不是恰好两个空间维度, 或任一空间维度为 0 时返回 `"bad_shape"`;
/// 3. 所有像素都等于第一个像素时返回 `"constant"`.
///
/// 该函数是纯函数.
pub fn validate_image<T: PartialEq>(raster: Option<ArrayViewD<'_, T>>) -> ValidationVerdict {
    readable_shape(raster.as_ref())
        .and_then(|_| {
            // 上一步保证了非空.
            let mut it = raster.iter().flat_map(|r| r.iter());
            match it.next() {
                Some(first) if it.all(|p| p == first) => Err(QaError::Constant),
                _ => Ok(()),
            }
        })
        .into()
}

/// 校验一张解码后的分割标签是否可读.
///
/// 与 [`validate_image`] 相同, 但 **不** 检查常量: 全背景标签属于覆盖率问题,
/// 而不是数据损坏, 由 [`super::check_mask`] 负责.
pub fn validate_mask_raster<T>(raster: Option<ArrayViewD<'_, T>>) -> ValidationVerdict {
    readable_shape(raster.as_ref()).map(|_| ()).into()
}
