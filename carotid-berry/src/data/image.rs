//! 拥有所有权的超声图像.

use crate::Idx2d;
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};
use num::ToPrimitive;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 拥有所有权的二维超声图像, 内部以 `(高, 宽, 通道)` 布局存储 `f64` 像素.
///
/// 灰度图的通道数为 1. 所有逐通道操作都对各通道独立进行.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UsImage {
    data: Array3<f64>,
}

#[inline]
fn to_f64<T: ToPrimitive>(v: T) -> f64 {
    // 基本数值类型的转换不会失败.
    v.to_f64().unwrap_or(f64::NAN)
}

impl UsImage {
    /// 从单通道栅格构建灰度图像.
    pub fn from_gray<T: ToPrimitive + Copy>(gray: ArrayView2<T>) -> Self {
        let (h, w) = gray.dim();
        let data = Array3::from_shape_fn((h, w, 1), |(r, c, _)| to_f64(gray[(r, c)]));
        Self { data }
    }

    /// 从 `(高, 宽, 通道)` 布局的多通道栅格构建图像.
    ///
    /// 通道数必须至少为 1, 否则程序 panic.
    pub fn from_channels<T: ToPrimitive + Copy>(data: ArrayView3<T>) -> Self {
        assert!(data.len_of(Axis(2)) >= 1, "图像至少需要一个通道");
        Self {
            data: data.mapv(to_f64),
        }
    }

    /// 直接使用 `(高, 宽, 通道)` 布局的底层数据.
    ///
    /// 通道数必须至少为 1, 否则程序 panic.
    pub fn from_raw(data: Array3<f64>) -> Self {
        assert!(data.len_of(Axis(2)) >= 1, "图像至少需要一个通道");
        Self { data }
    }

    /// 将若干形状相同的平面按顺序组合为多通道图像.
    pub(crate) fn from_planes(planes: &[Array2<f64>]) -> Self {
        assert!(!planes.is_empty(), "图像至少需要一个通道");
        let (h, w) = planes[0].dim();
        let mut data = Array3::zeros((h, w, planes.len()));
        for (c, plane) in planes.iter().enumerate() {
            data.index_axis_mut(Axis(2), c).assign(plane);
        }
        Self { data }
    }

    /// 图像的分辨率 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        let (h, w, _) = self.data.dim();
        (h, w)
    }

    /// 通道数.
    #[inline]
    pub fn channels(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    /// 是否为单通道图像?
    #[inline]
    pub fn is_gray(&self) -> bool {
        self.channels() == 1
    }

    /// 每个通道的像素个数.
    #[inline]
    pub fn size(&self) -> usize {
        let (h, w) = self.shape();
        h * w
    }

    /// 获得第 `c` 个通道的不可变视图. 越界时 panic.
    #[inline]
    pub fn channel(&self, c: usize) -> ArrayView2<f64> {
        self.data.index_axis(Axis(2), c)
    }

    /// 获得底层数据的一份不可变 shallow copy.
    #[inline]
    pub fn view(&self) -> ArrayView3<f64> {
        self.data.view()
    }

    /// 直接获得底层数据.
    #[inline]
    pub fn into_raw(self) -> Array3<f64> {
        self.data
    }

    /// 所有通道中的最大像素值. 空图像返回 `f64::NEG_INFINITY`.
    pub fn max_value(&self) -> f64 {
        self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// 对每个通道独立地实施 `op`, 组合为新图像.
    pub(crate) fn map_planes<F>(&self, mut op: F) -> Self
    where
        F: FnMut(ArrayView2<f64>) -> Array2<f64>,
    {
        let planes: Vec<Array2<f64>> = self.data.axis_iter(Axis(2)).map(&mut op).collect();
        Self::from_planes(&planes)
    }

    /// 归一化到 \[0, 1\]: 当最大值超过 1 时整体除以最大值, 否则原样返回.
    ///
    /// 最大值大于 1 时必然非零, 因此除法是安全的.
    pub(crate) fn normalized(&self) -> Self {
        let max = self.max_value();
        if max > 1.0 {
            Self {
                data: self.data.mapv(|v| v / max),
            }
        } else {
            self.clone()
        }
    }

    /// 将所有像素截断到 \[0, 1\].
    pub(crate) fn clip_unit(mut self) -> Self {
        self.data.mapv_inplace(|v| v.clamp(0.0, 1.0));
        self
    }
}
