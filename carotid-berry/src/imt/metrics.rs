//! 批量评估指标: IMT 平均绝对误差与 Dice 系数.

use super::{imt_mm_from_mask, ClassLabels};
use crate::LabelMask;

/// 一对 (预测, 真值) 的 IMT 绝对误差. 任一方无法确定时返回 `None`.
fn pair_error(pred: LabelMask, gt: LabelMask, spacing_mm_per_pixel: f64, labels: ClassLabels) -> Option<f64> {
    let p = imt_mm_from_mask(pred, spacing_mm_per_pixel, labels).imt_mm?;
    let g = imt_mm_from_mask(gt, spacing_mm_per_pixel, labels).imt_mm?;
    Some((p - g).abs())
}

fn mean<I: IntoIterator<Item = f64>>(it: I) -> Option<f64> {
    let (sum, n) = it.into_iter().fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// 一批预测标签相对真值标签的 IMT 平均绝对误差 (毫米).
///
/// 任一方 IMT 无法确定的样本对被排除; 没有剩余样本对时返回 `None`.
/// `pred` 与 `gt` 长度不一致时程序 panic.
pub fn batch_mae(
    pred: &[LabelMask],
    gt: &[LabelMask],
    spacing_mm_per_pixel: f64,
    labels: ClassLabels,
) -> Option<f64> {
    assert_eq!(pred.len(), gt.len(), "预测与真值的样本数不一致");
    let mae = mean(
        pred.iter()
            .zip(gt.iter())
            .filter_map(|(&p, &g)| pair_error(p, g, spacing_mm_per_pixel, labels)),
    );
    if mae.is_none() && !pred.is_empty() {
        log::debug!("{} 个样本对的 IMT 均无法确定", pred.len());
    }
    mae
}

/// 某一类别的 Dice 系数 `2|P ∩ G| / (|P| + |G|)`.
///
/// 真值中不存在该类别时无法评价, 返回 `None`. 形状不一致时程序 panic.
pub fn dice(pred: LabelMask, gt: LabelMask, class: u8) -> Option<f64> {
    assert_eq!(pred.shape(), gt.shape(), "预测与真值的形状不一致");
    let (mut inter, mut p_n, mut g_n) = (0usize, 0usize, 0usize);
    for (&p, &g) in pred.array_view().iter().zip(gt.array_view().iter()) {
        let (p, g) = (p == class, g == class);
        inter += usize::from(p && g);
        p_n += usize::from(p);
        g_n += usize::from(g);
    }
    (g_n > 0).then(|| 2.0 * inter as f64 / (p_n + g_n) as f64)
}

/// 一批样本在若干前景类别上的平均 Dice 系数.
///
/// 对所有 (样本, 类别) 上可以评价的 Dice 取平均; 全部无法评价时返回 `None`.
/// 背景类别不应出现在 `classes` 中.
pub fn mean_dice(pred: &[LabelMask], gt: &[LabelMask], classes: &[u8]) -> Option<f64> {
    assert_eq!(pred.len(), gt.len(), "预测与真值的样本数不一致");
    mean(
        pred.iter()
            .zip(gt.iter())
            .flat_map(|(&p, &g)| classes.iter().filter_map(move |&c| dice(p, g, c))),
    )
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::prelude::*;

        /// 借助 `rayon`, 并行地计算 [`batch_mae`]. 结果与串行版本相同 (仅有浮点求和顺序差异).
        pub fn par_batch_mae(
            pred: &[LabelMask],
            gt: &[LabelMask],
            spacing_mm_per_pixel: f64,
            labels: ClassLabels,
        ) -> Option<f64> {
            assert_eq!(pred.len(), gt.len(), "预测与真值的样本数不一致");
            let errors: Vec<f64> = pred
                .par_iter()
                .zip(gt.par_iter())
                .filter_map(|(&p, &g)| pair_error(p, g, spacing_mm_per_pixel, labels))
                .collect();
            mean(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn band(h: usize, w: usize, top: usize, bottom: usize) -> Array2<u8> {
        Array2::from_shape_fn((h, w), |(r, _)| if (top..=bottom).contains(&r) { 2 } else { 0 })
    }

    fn views(arrays: &[Array2<u8>]) -> Vec<LabelMask> {
        arrays.iter().map(|a| LabelMask::new(a.view())).collect()
    }

    #[test]
    fn test_identical_batch_is_zero() {
        let gt = vec![band(20, 8, 2, 5), band(20, 8, 4, 15), band(20, 8, 0, 19)];
        let pred = gt.clone();
        let mae = batch_mae(&views(&pred), &views(&gt), 0.04, ClassLabels::default());
        assert_eq!(mae, Some(0.0));
    }

    #[test]
    fn test_undetermined_pairs_excluded() {
        let gt = vec![band(20, 8, 2, 5), band(20, 8, 2, 5), Array2::zeros((20, 8))];
        let pred = vec![band(20, 8, 2, 7), Array2::zeros((20, 8)), band(20, 8, 2, 5)];
        let mae = batch_mae(&views(&pred), &views(&gt), 0.1, ClassLabels::default()).unwrap();
        assert!((mae - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_all_undetermined_is_none() {
        let empty = vec![Array2::<u8>::zeros((5, 5)); 3];
        let v = views(&empty);
        assert_eq!(batch_mae(&v, &v, 0.1, ClassLabels::default()), None);
        assert_eq!(batch_mae(&[], &[], 0.1, ClassLabels::default()), None);
    }

    #[test]
    #[should_panic]
    fn test_length_mismatch_panics() {
        let a = vec![band(5, 5, 1, 3)];
        batch_mae(&views(&a), &[], 0.1, ClassLabels::default());
    }

    #[test]
    fn test_dice() {
        let gt = band(10, 10, 2, 5);
        let pred = band(10, 10, 4, 7);
        // |P| = |G| = 40, |P ∩ G| = 20.
        let d = dice(LabelMask::new(pred.view()), LabelMask::new(gt.view()), 2).unwrap();
        assert!((d - 0.5).abs() < 1e-12);

        assert_eq!(dice(LabelMask::new(gt.view()), LabelMask::new(gt.view()), 2), Some(1.0));
        assert_eq!(dice(LabelMask::new(gt.view()), LabelMask::new(gt.view()), 1), None);
    }

    #[test]
    fn test_mean_dice_skips_absent_classes() {
        let gt = vec![band(10, 10, 2, 5)];
        let pred = vec![band(10, 10, 4, 7)];
        let d = mean_dice(&views(&pred), &views(&gt), &[1, 2]).unwrap();
        assert!((d - 0.5).abs() < 1e-12);
        assert_eq!(mean_dice(&views(&pred), &views(&gt), &[1]), None);
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_par_batch_mae_matches() {
        let gt: Vec<_> = (0..16).map(|k| band(24, 6, 1, 2 + k)).collect();
        let pred: Vec<_> = (0..16).map(|k| band(24, 6, 1, 3 + k % 5)).collect();
        let labels = ClassLabels::default();
        let seq = batch_mae(&views(&pred), &views(&gt), 0.05, labels).unwrap();
        let par = par_batch_mae(&views(&pred), &views(&gt), 0.05, labels).unwrap();
        assert!((seq - par).abs() < 1e-9);
    }
}
