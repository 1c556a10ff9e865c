//! 像素厚度到毫米的换算与风险分级.

use super::{extract_interfaces, ClassLabels, ThicknessProfile};
use crate::consts::clinical::{
    FALLBACK_BASE_MM, FALLBACK_SPAN_MM, IMT_HIGH_RISK_MM, IMT_MODERATE_RISK_MM,
    RISK_BAND_TOLERANCE_MM,
};
use crate::LabelMask;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 基于 IMT 的卒中风险等级.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RiskLevel {
    /// `imt < 0.7 mm`.
    Low,

    /// `0.7 mm <= imt < 0.9 mm`.
    Moderate,

    /// `imt >= 0.9 mm`.
    High,

    /// IMT 无法确定.
    Unknown,
}

impl RiskLevel {
    /// 按毫米值分级, 下界包含在内. 非有限值 (例如 NaN) 视为无法确定.
    ///
    /// 比较时允许 [`RISK_BAND_TOLERANCE_MM`] 的误差, 使恰好落在阈值上的
    /// `像素数 * 间距` 不因浮点舍入落入低一级.
    pub fn from_mm(imt_mm: f64) -> Self {
        let reaches = |threshold: f64| imt_mm + RISK_BAND_TOLERANCE_MM >= threshold;
        if !imt_mm.is_finite() {
            RiskLevel::Unknown
        } else if reaches(IMT_HIGH_RISK_MM) {
            RiskLevel::High
        } else if reaches(IMT_MODERATE_RISK_MM) {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::High => "High",
            RiskLevel::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// 一次 IMT 测量结果.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ImtMeasurement {
    /// 毫米值. `None` 表示无法确定.
    pub imt_mm: Option<f64>,

    /// 风险等级, 只由已确定的 `imt_mm` 得出.
    pub risk_level: RiskLevel,

    /// `imt_mm` 是否来自兜底估计而非界面测量.
    pub fallback_used: bool,
}

impl ImtMeasurement {
    /// 由界面测量得到的毫米值构建.
    pub fn measured(imt_mm: f64) -> Self {
        Self {
            imt_mm: Some(imt_mm),
            risk_level: RiskLevel::from_mm(imt_mm),
            fallback_used: false,
        }
    }

    /// 无法确定的测量.
    pub fn undetermined() -> Self {
        Self {
            imt_mm: None,
            risk_level: RiskLevel::Unknown,
            fallback_used: false,
        }
    }

    /// 是否已确定?
    #[inline]
    pub fn is_determined(&self) -> bool {
        self.imt_mm.is_some()
    }

    /// 是否为高风险 (`imt_mm >= 0.9`)? 无法确定时为 `false`.
    #[inline]
    pub fn is_high_risk(&self) -> bool {
        self.risk_level == RiskLevel::High
    }

    /// 测量无法确定时, 用 `strategy` 给出的估计显式替代, 并标记 `fallback_used`.
    ///
    /// 已确定的测量原样返回; 策略也无法给出估计时保持无法确定.
    pub fn or_fallback<F>(self, strategy: &F, evidence: f64) -> Self
    where
        F: FallbackStrategy + ?Sized,
    {
        if self.is_determined() {
            return self;
        }
        match strategy.estimate_mm(evidence) {
            Some(mm) => {
                log::debug!("IMT 无法确定, 使用兜底估计 {mm:.3} mm");
                Self {
                    imt_mm: Some(mm),
                    risk_level: RiskLevel::from_mm(mm),
                    fallback_used: true,
                }
            }
            None => self,
        }
    }
}

/// 将像素厚度换算为毫米并分级.
///
/// `spacing_mm_per_pixel` 必须是有限正数, 否则程序 panic.
pub fn to_measurement(profile: &ThicknessProfile, spacing_mm_per_pixel: f64) -> ImtMeasurement {
    assert!(
        spacing_mm_per_pixel.is_finite() && spacing_mm_per_pixel > 0.0,
        "像素间距必须是有限正数, 实际为 {spacing_mm_per_pixel}"
    );
    match profile.mean_pixels() {
        Some(px) => ImtMeasurement::measured(px * spacing_mm_per_pixel),
        None => ImtMeasurement::undetermined(),
    }
}

/// 标签 -> 界面 -> 厚度 -> 毫米, 一步完成.
pub fn imt_mm_from_mask(
    mask: LabelMask,
    spacing_mm_per_pixel: f64,
    labels: ClassLabels,
) -> ImtMeasurement {
    let pair = extract_interfaces(mask, labels);
    to_measurement(&ThicknessProfile::from_interfaces(&pair), spacing_mm_per_pixel)
}

/// IMT 无法确定时的兜底估计.
///
/// 兜底值没有经过临床验证, 只能作为带标记的显式替代, 不参与正常测量路径.
pub trait FallbackStrategy {
    /// 根据证据 (例如模型的平均前景概率) 给出毫米估计. 无法估计时返回 `None`.
    fn estimate_mm(&self, evidence: f64) -> Option<f64>;
}

/// 按前景概率线性映射: `base + span * p`. 默认映射到 \[0.5, 1.2\] mm.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinearProbabilityFallback {
    base_mm: f64,
    span_mm: f64,
}

impl LinearProbabilityFallback {
    /// 构建线性兜底策略.
    pub fn new(base_mm: f64, span_mm: f64) -> Self {
        Self { base_mm, span_mm }
    }
}

impl Default for LinearProbabilityFallback {
    fn default() -> Self {
        Self::new(FALLBACK_BASE_MM, FALLBACK_SPAN_MM)
    }
}

impl FallbackStrategy for LinearProbabilityFallback {
    /// 概率被截断到 \[0, 1\]; 非有限值返回 `None`.
    fn estimate_mm(&self, evidence: f64) -> Option<f64> {
        evidence
            .is_finite()
            .then(|| self.base_mm + self.span_mm * evidence.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// `h x w` 标签, `rows` 范围内为血管壁, 无管腔.
    fn wall_band(h: usize, w: usize, rows: std::ops::RangeInclusive<usize>) -> Array2<u8> {
        Array2::from_shape_fn((h, w), |(r, _)| if rows.contains(&r) { 2 } else { 0 })
    }

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_thin_wall_low_risk() {
        let m = wall_band(10, 10, 3..=5);
        let got = imt_mm_from_mask(LabelMask::new(m.view()), 0.1, ClassLabels::default());
        assert!(approx_eq(got.imt_mm.unwrap(), 0.2));
        assert_eq!(got.risk_level, RiskLevel::Low);
        assert!(!got.fallback_used);
        assert!(!got.is_high_risk());
    }

    #[test]
    fn test_wide_wall_high_risk() {
        let m = wall_band(16, 10, 3..=12);
        let got = imt_mm_from_mask(LabelMask::new(m.view()), 0.1, ClassLabels::default());
        assert!(approx_eq(got.imt_mm.unwrap(), 0.9));
        // 0.9 恰好落在高风险下界上.
        assert_eq!(got.risk_level, RiskLevel::High);
        assert!(got.is_high_risk());
    }

    #[test]
    fn test_risk_boundaries() {
        assert_eq!(RiskLevel::from_mm(0.9), RiskLevel::High);
        assert_eq!(RiskLevel::from_mm(0.8999), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_mm(0.7), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_mm(0.6999), RiskLevel::Low);
        assert_eq!(RiskLevel::from_mm(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_mm(f64::NAN), RiskLevel::Unknown);
    }

    #[test]
    fn test_risk_band_absorbs_rounding() {
        // 30 像素 * 0.03 mm 在浮点下略小于 0.9.
        assert!(30.0 * 0.03 < IMT_HIGH_RISK_MM);
        assert_eq!(RiskLevel::from_mm(30.0 * 0.03), RiskLevel::High);
        assert_eq!(RiskLevel::from_mm(7.0 * 0.1), RiskLevel::Moderate);

        let m = wall_band(40, 4, 3..=33);
        let got = imt_mm_from_mask(LabelMask::new(m.view()), 0.03, ClassLabels::default());
        assert_eq!(got.risk_level, RiskLevel::High);
        assert!(got.is_high_risk());
    }

    #[test]
    fn test_undetermined_columns_are_ignored() {
        // 只有前 4 列有血管壁.
        let m = Array2::from_shape_fn((12, 10), |(r, c)| u8::from(c < 4 && (2..=6).contains(&r)) * 2);
        let got = imt_mm_from_mask(LabelMask::new(m.view()), 0.05, ClassLabels::default());
        assert!(approx_eq(got.imt_mm.unwrap(), 0.2));
    }

    #[test]
    fn test_all_undetermined() {
        let m = Array2::<u8>::zeros((8, 8));
        let got = imt_mm_from_mask(LabelMask::new(m.view()), 0.04, ClassLabels::default());
        assert_eq!(got, ImtMeasurement::undetermined());
        assert_eq!(got.risk_level, RiskLevel::Unknown);
        assert!(!got.is_high_risk());
    }

    #[test]
    fn test_fallback_is_explicit() {
        let strategy = LinearProbabilityFallback::default();

        let got = ImtMeasurement::undetermined().or_fallback(&strategy, 0.5);
        assert!(got.fallback_used);
        assert!(approx_eq(got.imt_mm.unwrap(), 0.85));
        assert_eq!(got.risk_level, RiskLevel::Moderate);

        let high = ImtMeasurement::undetermined().or_fallback(&strategy, 1.5);
        assert!(approx_eq(high.imt_mm.unwrap(), 1.2));
        assert!(high.is_high_risk());

        let nan = ImtMeasurement::undetermined().or_fallback(&strategy, f64::NAN);
        assert_eq!(nan, ImtMeasurement::undetermined());

        // 已确定的测量不会被替代.
        let measured = ImtMeasurement::measured(0.3);
        assert_eq!(measured.or_fallback(&strategy, 1.0), measured);
    }

    #[test]
    fn test_dyn_strategy() {
        struct Constant;
        impl FallbackStrategy for Constant {
            fn estimate_mm(&self, _: f64) -> Option<f64> {
                Some(1.0)
            }
        }
        let strategies: Vec<Box<dyn FallbackStrategy>> =
            vec![Box::new(Constant), Box::new(LinearProbabilityFallback::default())];
        for s in &strategies {
            assert!(ImtMeasurement::undetermined()
                .or_fallback(s.as_ref(), 0.0)
                .fallback_used);
        }
    }

    #[test]
    #[should_panic]
    fn test_zero_spacing_panics() {
        to_measurement(&ThicknessProfile::from(vec![Some(1)]), 0.0);
    }
}
