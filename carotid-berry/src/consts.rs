//! 通用常量.

/// 分割标签的类别值.
pub mod label {
    /// 背景的像素值.
    pub const BACKGROUND: u8 = 0;

    /// 血管管腔的像素值.
    pub const LUMEN: u8 = 1;

    /// 血管壁 (内膜 + 中膜) 的像素值.
    pub const WALL: u8 = 2;

    /// 像素是否是背景?
    #[inline]
    pub const fn is_background(p: u8) -> bool {
        matches!(p, BACKGROUND)
    }

    /// 像素是否是前景 (任意非背景类别)?
    #[inline]
    pub const fn is_foreground(p: u8) -> bool {
        !is_background(p)
    }
}

/// 临床阈值与标定参数.
pub mod clinical {
    /// IMT 不小于该值 (毫米) 时判定为高风险.
    pub const IMT_HIGH_RISK_MM: f64 = 0.9;

    /// IMT 不小于该值 (毫米) 且低于 [`IMT_HIGH_RISK_MM`] 时判定为中风险.
    pub const IMT_MODERATE_RISK_MM: f64 = 0.7;

    /// 风险分级比较阈值时的容差 (毫米). 吸收 `像素数 * 间距` 的浮点舍入误差,
    /// 例如 `30.0 * 0.03 = 0.8999999999999999`; 远小于任何实际间距.
    pub const RISK_BAND_TOLERANCE_MM: f64 = 1e-9;

    /// 颈动脉超声常见的像素间距 (毫米/像素). 临床上通常在 0.03 ~ 0.05 之间.
    pub const DEFAULT_SPACING_MM_PER_PIXEL: f64 = 0.04;

    /// 基于前景概率的兜底估计的下限 (毫米).
    pub const FALLBACK_BASE_MM: f64 = 0.5;

    /// 基于前景概率的兜底估计的跨度 (毫米). 上限为 `0.5 + 0.7 = 1.2`.
    pub const FALLBACK_SPAN_MM: f64 = 0.7;
}

/// 图像清洗默认参数.
pub mod preproc {
    /// CLAHE 默认裁剪上限.
    pub const DEFAULT_CLIP_LIMIT: f64 = 2.0;

    /// CLAHE 默认分块网格 `(纵向块数, 横向块数)`.
    pub const DEFAULT_TILE_GRID: (usize, usize) = (8, 8);

    /// 小波分解默认层数.
    pub const DEFAULT_LEVELS: u32 = 2;

    /// 默认阈值缩放系数.
    pub const DEFAULT_THRESHOLD_SCALE: f64 = 1.0;

    /// 中位数绝对偏差 (MAD) 到高斯标准差的换算因子.
    pub const MAD_NORMALIZER: f64 = 0.6745;

    /// 8-bit 量化的直方图桶数.
    pub const HIST_BINS: usize = 256;
}

/// 数据质控默认参数.
pub mod qa {
    /// 默认最低前景覆盖率 (含).
    pub const DEFAULT_MIN_COVERAGE: f64 = 0.001;

    /// 默认最高前景覆盖率 (含).
    pub const DEFAULT_MAX_COVERAGE: f64 = 0.95;

    /// 浮点标签以该值为前景判定的中点 (标签值须已归一化到 \[0, 1\]).
    pub const FLOAT_MASK_MIDPOINT: f64 = 0.5;
}
