//! 错误类型.

use crate::Idx2d;
use thiserror::Error;

/// 单个样本未通过质控的原因.
///
/// 该类型是一个 **值**: 校验器返回它, 而不会因为它中断批处理.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum QaError {
    /// 上游解码失败, 栅格不存在.
    #[error("栅格不可读 (上游解码失败)")]
    Unreadable,

    /// 不是恰好两个空间维度, 或者某一维长度为 0. 参数为原始形状.
    #[error("栅格形状非法: {0:?}")]
    BadShape(Vec<usize>),

    /// 所有像素都等于第一个像素. 超声图像总是有纹理的, 这强烈暗示数据已损坏.
    #[error("图像为常量 (可能已损坏)")]
    Constant,

    /// 标签与图像的空间形状不一致.
    #[error("标签形状 {mask:?} 与图像形状 {image:?} 不一致")]
    ShapeMismatch {
        /// 标签形状 `(高, 宽)`.
        mask: Idx2d,

        /// 图像形状 `(高, 宽)`.
        image: Idx2d,
    },

    /// 前景覆盖率低于下限.
    #[error("标签几乎为空 (覆盖率 {coverage:.4})")]
    TooSparse {
        /// 实际覆盖率.
        coverage: f64,
    },

    /// 前景覆盖率高于上限.
    #[error("标签几乎全满 (覆盖率 {coverage:.4})")]
    TooDense {
        /// 实际覆盖率.
        coverage: f64,
    },
}

/// 质控错误的大类.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum QaErrorKind {
    /// 栅格不可读、形状退化或内容退化.
    Corruption,

    /// 标签与图像形状不一致.
    ShapeMismatch,

    /// 标签几乎为空或几乎全满.
    CoverageOutOfRange,
}

impl QaError {
    /// 稳定的文本代码, 例如 `"constant"`, `"too_sparse"`.
    pub fn code(&self) -> &'static str {
        match self {
            QaError::Unreadable => "unreadable",
            QaError::BadShape(_) => "bad_shape",
            QaError::Constant => "constant",
            QaError::ShapeMismatch { .. } => "shape_mismatch",
            QaError::TooSparse { .. } => "too_sparse",
            QaError::TooDense { .. } => "too_dense",
        }
    }

    /// 错误所属大类.
    pub fn kind(&self) -> QaErrorKind {
        match self {
            QaError::Unreadable | QaError::BadShape(_) | QaError::Constant => {
                QaErrorKind::Corruption
            }
            QaError::ShapeMismatch { .. } => QaErrorKind::ShapeMismatch,
            QaError::TooSparse { .. } | QaError::TooDense { .. } => QaErrorKind::CoverageOutOfRange,
        }
    }
}

/// 配置参数非法.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// CLAHE 裁剪上限必须是有限非负数. `0` 表示不裁剪.
    #[error("非法的裁剪上限: {0}")]
    ClipLimit(f64),

    /// 分块网格的两个维度都必须至少为 1.
    #[error("非法的分块网格: {0:?}")]
    TileGrid(Idx2d),

    /// 小波分解层数至少为 1.
    #[error("小波分解层数至少为 1")]
    ZeroLevels,

    /// 阈值缩放系数必须是有限非负数.
    #[error("非法的阈值缩放系数: {0}")]
    ThresholdScale(f64),

    /// 无法识别的小波基名称.
    #[error("未知小波基 `{0}`")]
    UnknownWavelet(String),

    /// 覆盖率区间必须满足 `0 <= min <= max <= 1`.
    #[error("非法的覆盖率区间: [{min}, {max}]")]
    CoverageRange {
        /// 下限.
        min: f64,

        /// 上限.
        max: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_kinds() {
        let all = [
            (QaError::Unreadable, "unreadable", QaErrorKind::Corruption),
            (QaError::BadShape(vec![0, 3]), "bad_shape", QaErrorKind::Corruption),
            (QaError::Constant, "constant", QaErrorKind::Corruption),
            (
                QaError::ShapeMismatch {
                    mask: (1, 2),
                    image: (2, 1),
                },
                "shape_mismatch",
                QaErrorKind::ShapeMismatch,
            ),
            (
                QaError::TooSparse { coverage: 0.0 },
                "too_sparse",
                QaErrorKind::CoverageOutOfRange,
            ),
            (
                QaError::TooDense { coverage: 1.0 },
                "too_dense",
                QaErrorKind::CoverageOutOfRange,
            ),
        ];
        for (e, code, kind) in all {
            assert_eq!(e.code(), code);
            assert_eq!(e.kind(), kind);
        }
    }
}
