//! 分割标签.

use crate::consts::label::is_foreground;
use crate::consts::qa::FLOAT_MASK_MIDPOINT;
use crate::Idx2d;
use ndarray::{Array2, ArrayView1, ArrayView2, ArrayView3, Axis};
use std::ops::Index;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 可作为标签像素的类型. 决定一个像素是否属于前景.
///
/// 整数标签以 `> 0` 为前景; 浮点标签 (须已归一化到 \[0, 1\]) 以
/// `> 0.5` 为前景.
pub trait MaskPixel: Copy {
    /// 该像素是否属于前景?
    fn is_foreground(self) -> bool;
}

macro_rules! impl_int_mask_pixel {
    ($($t: ty),+) => {
        $(
            impl MaskPixel for $t {
                #[inline]
                fn is_foreground(self) -> bool {
                    self > 0
                }
            }
        )+
    };
}

macro_rules! impl_float_mask_pixel {
    ($($t: ty),+) => {
        $(
            impl MaskPixel for $t {
                #[inline]
                fn is_foreground(self) -> bool {
                    self > FLOAT_MASK_MIDPOINT as $t
                }
            }
        )+
    };
}

impl_int_mask_pixel!(u8, u16, u32, i32, i64);
impl_float_mask_pixel!(f32, f64);

/// 不可变、借用的二维分割标签.
#[derive(Copy, Clone, Debug)]
pub struct LabelMask<'a> {
    /// 底层数据的轻量级视图.
    data: ArrayView2<'a, u8>,
}

impl<'a> LabelMask<'a> {
    /// 直接初始化.
    #[inline]
    pub fn new(data: ArrayView2<'a, u8>) -> Self {
        Self { data }
    }

    /// 获得 **底层** 数据的一份不可变 shallow copy.
    #[inline]
    pub fn array_view(&self) -> ArrayView2<'a, u8> {
        self.data
    }

    /// 标签的分辨率 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.data.dim()
    }

    /// 标签的像素个数.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 获得标签的高.
    #[inline]
    pub fn height(&self) -> usize {
        self.shape().0
    }

    /// 获得标签的宽.
    #[inline]
    pub fn width(&self) -> usize {
        self.shape().1
    }

    /// 获取给定位置 (高, 宽) 的像素值. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, pos: Idx2d) -> Option<&u8> {
        self.data.get(pos)
    }

    /// 获取第 `x` 列. 越界时 panic.
    #[inline]
    pub fn column(&self, x: usize) -> ArrayView1<'a, u8> {
        self.data.index_axis_move(Axis(1), x)
    }

    /// 统计标签中值为 `label` 的像素总个数.
    #[inline]
    pub fn count(&self, label: u8) -> usize {
        self.data.iter().filter(|&&p| p == label).count()
    }

    /// 统计前景 (非背景) 像素个数.
    #[inline]
    pub fn count_foreground(&self) -> usize {
        self.data.iter().filter(|&&p| is_foreground(p)).count()
    }

    /// 该标签是否为全背景?
    #[inline]
    pub fn is_background(&self) -> bool {
        self.count_foreground() == 0
    }

    /// 克隆自己, 获得一个拥有所有权的标签对象.
    pub fn to_owned(&self) -> OwnedLabelMask {
        OwnedLabelMask {
            data: self.data.to_owned(),
        }
    }
}

impl Index<Idx2d> for LabelMask<'_> {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl<'a> From<ArrayView2<'a, u8>> for LabelMask<'a> {
    #[inline]
    fn from(data: ArrayView2<'a, u8>) -> Self {
        Self::new(data)
    }
}

/// 拥有所有权的二维分割标签.
///
/// `OwnedLabelMask` 仅提供到 `LabelMask` 的轻量转换和底层数据移动,
/// 以及从模型输出解码标签的构造方法.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OwnedLabelMask {
    data: Array2<u8>,
}

impl OwnedLabelMask {
    /// 直接初始化.
    #[inline]
    pub fn new(data: Array2<u8>) -> Self {
        Self { data }
    }

    /// 从 `(类别, 高, 宽)` 布局的逐像素类别概率解码标签.
    ///
    /// 1. 类别数大于 1 时, 每个像素取概率最大的类别 (并列时取较小的类别);
    /// 2. 类别数等于 1 时, 概率大于 0.5 的像素为类别 1, 其余为背景.
    ///
    /// 类别数为 0 或超过 256 时程序 panic.
    pub fn from_probabilities(probs: ArrayView3<f64>) -> Self {
        let (c, h, w) = probs.dim();
        assert!((1..=256).contains(&c), "类别数必须在 [1, 256] 内, 但得到 {c}");
        let data = if c == 1 {
            probs
                .index_axis(Axis(0), 0)
                .mapv(|p| u8::from(p > FLOAT_MASK_MIDPOINT))
        } else {
            Array2::from_shape_fn((h, w), |(r, x)| {
                let mut best = 0usize;
                for k in 1..c {
                    if probs[(k, r, x)] > probs[(best, r, x)] {
                        best = k;
                    }
                }
                best as u8
            })
        };
        Self { data }
    }

    /// 获得不可变标签引用.
    #[inline]
    pub fn as_immut(&self) -> LabelMask<'_> {
        LabelMask::new(self.data.view())
    }

    /// 直接获得底层数据.
    #[inline]
    pub fn into_raw(self) -> Array2<u8> {
        self.data
    }
}

impl From<Array2<u8>> for OwnedLabelMask {
    #[inline]
    fn from(data: Array2<u8>) -> Self {
        Self::new(data)
    }
}

/// `(类别, 高, 宽)` 布局的概率图中, 类别 `class` 的平均概率.
///
/// 类别越界或概率图为空时返回 `None`.
pub fn mean_class_probability(probs: ArrayView3<f64>, class: usize) -> Option<f64> {
    if class >= probs.len_of(Axis(0)) {
        return None;
    }
    probs.index_axis(Axis(0), class).mean()
}
