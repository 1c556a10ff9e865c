//! 清洗顺序消融: 比较 5 种清洗变体下血管壁与管腔之间的对比噪声比 (CNR).

use crate::profile::Profile;
use carotid_berry::prelude::*;
use std::path::Path;
use utils::phantom::Phantom;

/// 一种清洗变体.
pub type Variant = fn(&UsImage) -> UsImage;

/// 所有清洗变体及其名称.
pub const VARIANTS: [(&str, Variant); 5] = [
    ("raw", raw),
    ("enhance", enhance_only),
    ("denoise", denoise_only),
    ("enhance+denoise", enhance_then_denoise),
    ("denoise+enhance", denoise_then_enhance),
];

fn raw(img: &UsImage) -> UsImage {
    clean(img, &CleanConfig::passthrough())
}

fn enhance_only(img: &UsImage) -> UsImage {
    clean(img, &CleanConfig::new(Some(EnhanceConfig::default()), None))
}

fn denoise_only(img: &UsImage) -> UsImage {
    clean(img, &CleanConfig::new(None, Some(DenoiseConfig::default())))
}

fn enhance_then_denoise(img: &UsImage) -> UsImage {
    clean(img, &CleanConfig::default())
}

/// 反序. 库中的清洗流程不允许这种顺序, 这里手动组合.
fn denoise_then_enhance(img: &UsImage) -> UsImage {
    enhance(&denoise_only(img), &EnhanceConfig::default())
}

/// 单通道平面在标签 `class` 上的均值与方差.
fn class_stats(plane: ndarray::ArrayView2<f64>, mask: LabelMask, class: u8) -> Option<(f64, f64)> {
    let values: Vec<f64> = plane
        .iter()
        .zip(mask.array_view().iter())
        .filter(|&(_, &l)| l == class)
        .map(|(&v, _)| v)
        .collect();
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some((mean, var))
}

/// 血管壁与管腔之间的 CNR: `|mean_wall - mean_lumen| / sqrt(var_wall + var_lumen)`.
///
/// 任一区域像素不足, 或两区域都没有起伏时返回 `None`.
pub fn wall_lumen_cnr(image: &UsImage, mask: LabelMask) -> Option<f64> {
    let plane = image.channel(0);
    let (mw, vw) = class_stats(plane, mask, WALL)?;
    let (ml, vl) = class_stats(plane, mask, LUMEN)?;
    let noise = (vw + vl).sqrt();
    (noise > 0.0).then(|| (mw - ml).abs() / noise)
}

/// 在整个数据集上运行一种清洗变体.
///
/// `preview_dir` 非空时, 保存第一个样本的清洗结果.
pub fn run_variant(name: &str, variant: Variant, phantoms: &[Phantom], preview_dir: Option<&Path>) -> Profile {
    let mut profile = Profile::new();
    for (idx, phantom) in phantoms.iter().enumerate() {
        let img = phantom.us_image();
        profile.count_image();
        let out = variant(&img);
        profile.clean_elapsed();

        profile.record_cnr(wall_lumen_cnr(&out, phantom.label_mask()));

        if let (0, Some(dir)) = (idx, preview_dir) {
            let path = dir.join(format!("{name}.png"));
            if let Err(e) = utils::preview::save_image(&out, &path) {
                log::warn!("无法保存预览图 {}: {e}", path.display());
            }
        }
    }
    log::info!("清洗变体 `{name}` 完成, 共 {} 张图像", profile.images());
    profile.finish()
}
