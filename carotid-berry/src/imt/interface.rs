//! 逐列定位血管壁的两条界面.

use crate::consts::label::{LUMEN, WALL};
use crate::LabelMask;
use ndarray::{ArrayView1, Zip};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 管腔与血管壁在分割标签中的取值.
///
/// 二分类模型只区分背景与前景时, 可以令两者相等 (例如都为 1).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClassLabels {
    /// 管腔.
    pub lumen: u8,

    /// 血管壁 (内膜 + 中膜).
    pub wall: u8,
}

impl ClassLabels {
    /// 构建类别取值.
    #[inline]
    pub const fn new(lumen: u8, wall: u8) -> Self {
        Self { lumen, wall }
    }
}

/// 管腔为 1, 血管壁为 2.
impl Default for ClassLabels {
    fn default() -> Self {
        Self::new(LUMEN, WALL)
    }
}

/// 每一列的管腔-内膜界面 (`inner`) 与中膜-外膜界面 (`outer`) 所在行.
///
/// 两个序列长度都等于标签宽度. `None` 表示该列无法确定, 不会与第 0 行混淆.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InterfacePair {
    inner: Vec<Option<usize>>,
    outer: Vec<Option<usize>>,
}

impl InterfacePair {
    /// 由两个等长序列构建. 长度不一致时程序 panic.
    pub fn new(inner: Vec<Option<usize>>, outer: Vec<Option<usize>>) -> Self {
        assert_eq!(inner.len(), outer.len(), "两条界面的列数不一致");
        Self { inner, outer }
    }

    /// 管腔-内膜界面.
    #[inline]
    pub fn inner(&self) -> &[Option<usize>] {
        &self.inner
    }

    /// 中膜-外膜界面.
    #[inline]
    pub fn outer(&self) -> &[Option<usize>] {
        &self.outer
    }

    /// 列数.
    #[inline]
    pub fn width(&self) -> usize {
        self.inner.len()
    }

    /// 按列迭代 `(inner, outer)`.
    pub fn iter(&self) -> impl Iterator<Item = (Option<usize>, Option<usize>)> + '_ {
        self.inner.iter().copied().zip(self.outer.iter().copied())
    }
}

impl FromIterator<(Option<usize>, Option<usize>)> for InterfacePair {
    fn from_iter<I: IntoIterator<Item = (Option<usize>, Option<usize>)>>(iter: I) -> Self {
        let (inner, outer) = iter.into_iter().unzip();
        Self { inner, outer }
    }
}

/// 单列的界面.
///
/// 1. 同时存在管腔与血管壁像素: 以管腔行号的均值为中心,
///   离中心最近的血管壁行为 `inner`, 最远的为 `outer`. 距离相同时取较小行号;
/// 2. 只有血管壁像素且至少两个: `inner` 为最小行号, `outer` 为最大行号;
/// 3. 否则两者都无法确定.
fn column_interfaces(col: ArrayView1<u8>, labels: ClassLabels) -> (Option<usize>, Option<usize>) {
    let mut lumen_sum = 0usize;
    let mut lumen_n = 0usize;
    let mut wall = Vec::new();
    for (row, &v) in col.iter().enumerate() {
        if v == labels.lumen {
            lumen_sum += row;
            lumen_n += 1;
        }
        if v == labels.wall {
            wall.push(row);
        }
    }

    match (lumen_n, wall.as_slice()) {
        (_, []) => (None, None),
        (0, [_]) => (None, None),
        (0, [first, .., last]) => (Some(*first), Some(*last)),
        (n, rows) => {
            let center = lumen_sum as f64 / n as f64;
            let dist = |r: usize| (r as f64 - center).abs();
            // 行号升序, `min_by` 在相等时保留先出现的元素.
            let inner = rows.iter().min_by(|a, b| dist(**a).total_cmp(&dist(**b)));
            let outer = rows.iter().min_by(|a, b| dist(**b).total_cmp(&dist(**a)));
            (inner.copied(), outer.copied())
        }
    }
}

/// 逐列提取两条界面.
pub fn extract_interfaces(mask: LabelMask, labels: ClassLabels) -> InterfacePair {
    Zip::from(mask.array_view().columns())
        .map_collect(|col| column_interfaces(col, labels))
        .iter()
        .copied()
        .collect()
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        /// 借助 `rayon`, 并行地逐列提取两条界面. 结果与 [`extract_interfaces`] 完全相同.
        pub fn par_extract_interfaces(mask: LabelMask, labels: ClassLabels) -> InterfacePair {
            Zip::from(mask.array_view().columns())
                .par_map_collect(|col| column_interfaces(col, labels))
                .iter()
                .copied()
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn labels() -> ClassLabels {
        ClassLabels::default()
    }

    fn single_column(col: &[u8]) -> (Option<usize>, Option<usize>) {
        let col = ndarray::Array1::from(col.to_vec());
        column_interfaces(col.view(), labels())
    }

    #[test]
    fn test_lumen_above_wall() {
        // 管腔在 1..=3, 血管壁在 5..=8.
        assert_eq!(single_column(&[0, 1, 1, 1, 0, 2, 2, 2, 2, 0]), (Some(5), Some(8)));
    }

    #[test]
    fn test_lumen_below_wall() {
        assert_eq!(single_column(&[0, 2, 2, 2, 0, 1, 1, 1, 0]), (Some(3), Some(1)));
    }

    #[test]
    fn test_wall_on_both_sides() {
        // 中心为 4, 第 2 行与第 6 行距离相同, 取较小行号.
        // 第 0 行与第 8 行同为最远, 同样取较小行号.
        let col: [u8; 9] = [2, 0, 2, 1, 1, 1, 2, 0, 2];
        assert_eq!(single_column(&col), (Some(2), Some(0)));
    }

    #[test]
    fn test_binary_fallback() {
        assert_eq!(single_column(&[0, 0, 2, 2, 2, 0]), (Some(2), Some(4)));
        assert_eq!(single_column(&[2, 0, 0, 0, 0, 2]), (Some(0), Some(5)));
        assert_eq!(single_column(&[0, 0, 2, 0]), (None, None));
        assert_eq!(single_column(&[0, 1, 1, 0]), (None, None));
        assert_eq!(single_column(&[0, 0, 0]), (None, None));
    }

    #[test]
    fn test_row_zero_is_determined() {
        let (inner, _) = single_column(&[2, 2, 0, 0]);
        assert_eq!(inner, Some(0));
    }

    #[test]
    fn test_same_lumen_and_wall_label() {
        let col = ndarray::Array1::from(vec![0u8, 1, 1, 1, 1, 0]);
        let got = column_interfaces(col.view(), ClassLabels::new(1, 1));
        // 中心为 2.5, 第 2/3 行等距取第 2 行; 第 1/4 行等距取第 1 行.
        assert_eq!(got, (Some(2), Some(1)));
    }

    #[test]
    fn test_extract_columns() {
        let m: Array2<u8> = array![
            [0, 1, 0, 2],
            [2, 1, 0, 2],
            [2, 2, 0, 0],
            [2, 2, 2, 0],
        ];
        let pair = extract_interfaces(LabelMask::new(m.view()), labels());
        assert_eq!(pair.width(), 4);
        assert_eq!(pair.inner(), &[Some(1), Some(2), None, Some(0)]);
        assert_eq!(pair.outer(), &[Some(3), Some(3), None, Some(1)]);
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_par_extract_matches_sequential() {
        let m = Array2::from_shape_fn((40, 37), |(r, c)| ((r * 3 + c * 7 + r * c) % 3) as u8);
        let mask = LabelMask::new(m.view());
        assert_eq!(
            extract_interfaces(mask, labels()),
            par_extract_interfaces(mask, labels())
        );
    }
}
