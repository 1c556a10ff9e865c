//! 分割标签一致性校验.

use super::ValidationVerdict;
use crate::consts::qa::{DEFAULT_MAX_COVERAGE, DEFAULT_MIN_COVERAGE};
use crate::{ConfigError, Idx2d, MaskPixel, QaError};
use ndarray::ArrayView2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 标签覆盖率校验参数.
///
/// 该配置是只读的. 若要修改参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CoverageConfig {
    min_coverage: f64,
    max_coverage: f64,
    require_shape_match: bool,
}

impl CoverageConfig {
    /// 构建覆盖率校验参数.
    ///
    /// 必须满足 `0 <= min_coverage <= max_coverage <= 1`, 否则返回 `Err`.
    pub fn new(
        min_coverage: f64,
        max_coverage: f64,
        require_shape_match: bool,
    ) -> Result<Self, ConfigError> {
        if (0.0..=1.0).contains(&min_coverage)
            && (0.0..=1.0).contains(&max_coverage)
            && min_coverage <= max_coverage
        {
            Ok(Self {
                min_coverage,
                max_coverage,
                require_shape_match,
            })
        } else {
            Err(ConfigError::CoverageRange {
                min: min_coverage,
                max: max_coverage,
            })
        }
    }

    /// 最低前景覆盖率 (含).
    #[inline]
    pub fn min_coverage(&self) -> f64 {
        self.min_coverage
    }

    /// 最高前景覆盖率 (含).
    #[inline]
    pub fn max_coverage(&self) -> f64 {
        self.max_coverage
    }

    /// 是否要求标签与图像形状一致.
    #[inline]
    pub fn require_shape_match(&self) -> bool {
        self.require_shape_match
    }
}

/// 覆盖率 \[0.001, 0.95\], 要求形状一致.
impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            min_coverage: DEFAULT_MIN_COVERAGE,
            max_coverage: DEFAULT_MAX_COVERAGE,
            require_shape_match: true,
        }
    }
}

/// 前景覆盖率, 即 `前景像素数 / (H * W)`. 空标签返回 `0.0`.
pub fn coverage<M: MaskPixel>(mask: ArrayView2<M>) -> f64 {
    let total = mask.len();
    if total == 0 {
        return 0.0;
    }
    let foreground = mask.iter().filter(|p| p.is_foreground()).count();
    foreground as f64 / total as f64
}

/// 校验分割标签与图像的一致性.
///
/// 1. `cfg.require_shape_match()` 为真且形状与 `image_shape` 不一致时返回 `"shape_mismatch"`;
/// 2. 覆盖率低于下限时返回 `"too_sparse"`;
/// 3. 覆盖率高于上限时返回 `"too_dense"`.
///
/// 覆盖率恰好等于上下限时视为通过.
pub fn check_mask<M: MaskPixel>(
    mask: ArrayView2<M>,
    image_shape: Idx2d,
    cfg: &CoverageConfig,
) -> ValidationVerdict {
    let shape = mask.dim();
    if cfg.require_shape_match && shape != image_shape {
        return ValidationVerdict::fail(QaError::ShapeMismatch {
            mask: shape,
            image: image_shape,
        });
    }
    let coverage = coverage(mask);
    if coverage < cfg.min_coverage {
        ValidationVerdict::fail(QaError::TooSparse { coverage })
    } else if coverage > cfg.max_coverage {
        ValidationVerdict::fail(QaError::TooDense { coverage })
    } else {
        ValidationVerdict::pass()
    }
}
