//! 预览图的持久化存储.

use carotid_berry::consts::label::{BACKGROUND, LUMEN, WALL};
use crate::phantom::Phantom;
use carotid_berry::UsImage;
use image::ImageResult;
use ndarray::ArrayView2;
use std::path::{Path, PathBuf};

/// 使标签更有利于单通道可视化.
#[inline]
fn pretty(label: u8) -> u8 {
    match label {
        // 背景为黑色
        BACKGROUND => 0,

        // 管腔为暗灰色, 与背景仍可区分
        LUMEN => 96,

        // 血管壁为白色
        WALL => 255,

        // 其它类别统一为亮灰色
        _ => 192,
    }
}

/// 将 \[0, 1\] 范围的单通道平面保存为 8-bit 灰度图. 超出范围的值被截断.
pub fn save_unit_plane<P: AsRef<Path>>(plane: ArrayView2<f64>, path: P) -> ImageResult<()> {
    let (height, width) = plane.dim();
    let mut buf = image::GrayImage::new(width as u32, height as u32);
    for ((h, w), &v) in plane.indexed_iter() {
        let pix = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        buf.put_pixel(w as u32, h as u32, image::Luma([pix]));
    }
    buf.save(path)
}

/// 保存图像的第一个通道.
#[inline]
pub fn save_image<P: AsRef<Path>>(image: &UsImage, path: P) -> ImageResult<()> {
    save_unit_plane(image.channel(0), path)
}

/// 将背景/管腔/血管壁分别映射为黑色/暗灰色/白色后保存.
pub fn save_mask<P: AsRef<Path>>(mask: ArrayView2<u8>, path: P) -> ImageResult<()> {
    let (height, width) = mask.dim();
    let mut buf = image::GrayImage::new(width as u32, height as u32);
    for ((h, w), &pix) in mask.indexed_iter() {
        buf.put_pixel(w as u32, h as u32, image::Luma([pretty(pix)]));
    }
    buf.save(path)
}

/// 在 `dir` 下保存样本的真值标签, 文件名带有样本种子. 返回保存路径.
pub fn save_truth<P: AsRef<Path>>(phantom: &Phantom, dir: P) -> ImageResult<PathBuf> {
    let path = dir.as_ref().join(format!("truth_{}.png", phantom.seed));
    save_mask(phantom.mask.view(), &path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phantom::PhantomSpec;

    #[test]
    fn test_pretty() {
        assert_eq!(pretty(BACKGROUND), 0);
        assert!(pretty(LUMEN) < pretty(WALL));
        assert_eq!(pretty(7), 192);
    }

    #[test]
    fn test_save_truth() {
        let dir = std::env::temp_dir().join(format!("carotid-preview-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let p = Phantom::generate(11, &PhantomSpec::default());
        let path = save_truth(&p, &dir).unwrap();
        assert!(path.ends_with("truth_11.png"));

        let back = image::open(&path).unwrap().into_luma8();
        let (h, w) = p.mask.dim();
        assert_eq!(back.dimensions(), (w as u32, h as u32));
        for ((r, c), &label) in p.mask.indexed_iter() {
            assert_eq!(back.get_pixel(c as u32, r as u32).0[0], pretty(label));
        }
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
