//! 数据质控.
//!
//! 单张栅格的校验器 ([`validate_image`], [`validate_mask_raster`], [`check_mask`])
//! 与数据集级别的过滤器 ([`filter_pairs`]). 校验器从不 panic,
//! 而是返回 [`ValidationVerdict`], 以便批处理越过单个失败样本继续进行.

mod coverage;
mod filter;
mod integrity;

use crate::QaError;

pub use coverage::{check_mask, coverage, CoverageConfig};
pub use filter::{filter_pairs, validate_pair, Flagged, QaReport, QaSample, RasterPair, Side};
pub use integrity::{spatial_shape, validate_image, validate_mask_raster};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        pub use filter::par_filter_pairs;
    }
}

/// 单张栅格或单个样本对的校验结论. 创建后不可修改.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ValidationVerdict(Option<QaError>);

impl ValidationVerdict {
    /// 通过.
    #[inline]
    pub const fn pass() -> Self {
        Self(None)
    }

    /// 以 `err` 为原因未通过.
    #[inline]
    pub const fn fail(err: QaError) -> Self {
        Self(Some(err))
    }

    /// 是否通过?
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.0.is_none()
    }

    /// 未通过时的文本代码, 例如 `"constant"`. 通过时返回 `None`.
    #[inline]
    pub fn reason(&self) -> Option<&'static str> {
        self.0.as_ref().map(QaError::code)
    }

    /// 未通过时的详细原因.
    #[inline]
    pub fn error(&self) -> Option<&QaError> {
        self.0.as_ref()
    }

    /// 转换为 `Result`, 便于使用 `?` 串联多项检查.
    #[inline]
    pub fn into_result(self) -> Result<(), QaError> {
        match self.0 {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }
}

impl From<Result<(), QaError>> for ValidationVerdict {
    #[inline]
    fn from(value: Result<(), QaError>) -> Self {
        Self(value.err())
    }
}
