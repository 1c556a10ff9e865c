//! 逐列像素厚度.

use super::InterfacePair;

/// 每一列两条界面之间的像素距离.
///
/// 某一列为 `None` 当且仅当该列的两条界面没有同时确定.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ThicknessProfile {
    values: Vec<Option<usize>>,
}

impl ThicknessProfile {
    /// 由界面计算厚度 `|outer - inner|`.
    pub fn from_interfaces(pair: &InterfacePair) -> Self {
        let values = pair
            .iter()
            .map(|(inner, outer)| Some(inner?.abs_diff(outer?)))
            .collect();
        Self { values }
    }

    /// 逐列厚度.
    #[inline]
    pub fn values(&self) -> &[Option<usize>] {
        &self.values
    }

    /// 列数.
    #[inline]
    pub fn width(&self) -> usize {
        self.values.len()
    }

    /// 已确定的列.
    pub fn determined(&self) -> impl Iterator<Item = usize> + '_ {
        self.values.iter().flatten().copied()
    }

    /// 已确定的列数.
    pub fn determined_count(&self) -> usize {
        self.determined().count()
    }

    /// 已确定列的平均像素厚度. 无法确定的列被忽略 (**不** 视为 0);
    /// 没有任何已确定的列时返回 `None`.
    pub fn mean_pixels(&self) -> Option<f64> {
        let (sum, n) = self
            .determined()
            .fold((0usize, 0usize), |(s, n), t| (s + t, n + 1));
        (n > 0).then(|| sum as f64 / n as f64)
    }
}

impl From<Vec<Option<usize>>> for ThicknessProfile {
    fn from(values: Vec<Option<usize>>) -> Self {
        Self { values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_interfaces() {
        let pair = InterfacePair::new(
            vec![Some(3), None, Some(0), Some(7), None],
            vec![Some(5), Some(2), Some(4), Some(2), None],
        );
        let p = ThicknessProfile::from_interfaces(&pair);
        assert_eq!(p.values(), &[Some(2), None, Some(4), Some(5), None]);
        assert_eq!(p.determined_count(), 3);
        assert_eq!(p.width(), 5);
    }

    #[test]
    fn test_mean_ignores_undetermined() {
        let p = ThicknessProfile::from(vec![Some(2), None, Some(4), None]);
        assert_eq!(p.mean_pixels(), Some(3.0));

        let empty = ThicknessProfile::from(vec![None, None]);
        assert_eq!(empty.mean_pixels(), None);

        let zero_width = ThicknessProfile::from(vec![]);
        assert_eq!(zero_width.mean_pixels(), None);
    }

    #[test]
    fn test_zero_thickness_is_determined() {
        let p = ThicknessProfile::from(vec![Some(0), Some(0)]);
        assert_eq!(p.mean_pixels(), Some(0.0));
    }
}
