//! 实验结果.

use crate::profile::Profile;
use crate::studies::qa_imt::QaImtReport;
use std::io::{self, Write};

const S4: &str = "    ";

#[inline]
fn f64_to_display(f: Option<f64>) -> String {
    match f {
        Some(f) => format!("{f:.6}"),
        None => "/".to_string(),
    }
}

/// 将清洗变体 `name` 的统计写进 `w` 中.
fn describe_into<W: Write>(name: &str, p: &Profile, w: &mut W) -> io::Result<()> {
    writeln!(w, "Variant `{name}`:")?;
    writeln!(w, "{S4}Images: {}", p.images())?;
    writeln!(w, "{S4}Scored images: {}", p.scored())?;
    writeln!(w, "{S4}Average wall/lumen CNR: {}", f64_to_display(p.avg_cnr()))?;
    writeln!(w, "{S4}Cleaning total time: {} us", p.clean_time_us())?;
    writeln!(
        w,
        "{S4}Cleaning average time: {} us",
        f64_to_display(p.avg_clean_time_us())
    )?;
    writeln!(w, "{S4}Total machine time: {} us", p.real_time_us())?;
    let t = p.most_time_consuming().map(|d| d.as_micros() as f64);
    write!(w, "{S4}Most time-consuming image costs {} us", f64_to_display(t))?;
    Ok(())
}

/// 将质控 + IMT 实验结果写进 `w` 中.
fn describe_qa_into<W: Write>(r: &QaImtReport, w: &mut W) -> io::Result<()> {
    writeln!(w, "QA + IMT study:")?;
    writeln!(w, "{S4}Samples: {} ({} corrupted)", r.total, r.corrupted)?;
    writeln!(w, "{S4}Valid: {}, flagged: {}", r.valid, r.flagged)?;
    writeln!(w, "{S4}Flagged with the injected reason: {}", r.reasons_matched)?;
    writeln!(w, "{S4}IMT MAE: {} mm", f64_to_display(r.mae_mm))?;
    writeln!(w, "{S4}Mean Dice (lumen, wall): {}", f64_to_display(r.mean_dice))?;
    writeln!(
        w,
        "{S4}Undetermined predictions: {} ({} replaced by fallback)",
        r.undetermined, r.fallbacks
    )?;
    write!(
        w,
        "{S4}High risk: {} by ground truth, {} by prediction",
        r.high_risk_truth, r.high_risk_pred
    )?;
    Ok(())
}

/// 消融实验最终结果.
pub struct AblationResult {
    cleaning: Vec<(&'static str, Profile)>,
    qa: QaImtReport,
}

impl AblationResult {
    /// 汇总.
    pub fn new(cleaning: Vec<(&'static str, Profile)>, qa: QaImtReport) -> Self {
        Self { cleaning, qa }
    }

    /// 将全部结果写进 `w` 中.
    pub fn write_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        utils::sep_to(&mut *w)?;
        for (key, profile) in self.cleaning.iter() {
            describe_into(key, profile, w)?;
            writeln!(w)?;
            utils::sep_to(&mut *w)?;
        }
        describe_qa_into(&self.qa, w)?;
        writeln!(w)?;
        utils::sep_to(&mut *w)
    }

    /// 分析运行结果.
    pub fn analyze(&self) {
        let stdout = io::stdout();
        if let Err(e) = self.write_into(&mut stdout.lock()) {
            log::error!("无法输出实验结果: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_into() {
        let r = AblationResult::new(
            vec![("raw", Profile::new().finish())],
            QaImtReport {
                total: 3,
                mae_mm: Some(0.04),
                ..Default::default()
            },
        );
        let mut buf = Vec::new();
        r.write_into(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Variant `raw`:"));
        assert!(text.contains("Average wall/lumen CNR: /"));
        assert!(text.contains("IMT MAE: 0.040000 mm"));
    }
}
