//! 正交小波的多层二维离散小波变换.
//!
//! 边界采用周期延拓. 奇数长度的信号先复制最后一个采样补齐为偶数,
//! 重构后再裁剪回原长度, 因此重构是精确的 (仅有浮点舍入误差).

use crate::{ConfigError, Idx2d};
use itertools::izip;
use ndarray::{Array2, ArrayView2, Axis, Zip};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// Daubechies 尺度滤波器系数 (分解低通), 和为 sqrt(2).
const HAAR: [f64; 2] = [std::f64::consts::FRAC_1_SQRT_2, std::f64::consts::FRAC_1_SQRT_2];

const DB2: [f64; 4] = [
    0.482_962_913_144_690_25,
    0.836_516_303_737_469,
    0.224_143_868_041_857_35,
    -0.129_409_522_550_921_45,
];

const DB3: [f64; 6] = [
    0.332_670_552_950_956_9,
    0.806_891_509_313_338_8,
    0.459_877_502_119_331_3,
    -0.135_011_020_010_390_84,
    -0.085_441_273_882_241_49,
    0.035_226_291_882_100_656,
];

const DB4: [f64; 8] = [
    0.230_377_813_308_855_23,
    0.714_846_570_552_541_5,
    0.630_880_767_929_590_4,
    -0.027_983_769_416_983_85,
    -0.187_034_811_718_881_14,
    0.030_841_381_835_986_965,
    0.032_883_011_666_982_945,
    -0.010_597_401_784_997_278,
];

/// 小波基.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Wavelet {
    /// Haar (即 db1).
    Haar,

    /// Daubechies, 2 阶消失矩.
    Db2,

    /// Daubechies, 3 阶消失矩.
    Db3,

    /// Daubechies, 4 阶消失矩.
    Db4,
}

impl Wavelet {
    /// 名称, 例如 `"db4"`.
    pub fn name(&self) -> &'static str {
        match self {
            Wavelet::Haar => "haar",
            Wavelet::Db2 => "db2",
            Wavelet::Db3 => "db3",
            Wavelet::Db4 => "db4",
        }
    }

    /// 尺度滤波器 (分解低通) 系数.
    fn scaling(&self) -> &'static [f64] {
        match self {
            Wavelet::Haar => &HAAR,
            Wavelet::Db2 => &DB2,
            Wavelet::Db3 => &DB3,
            Wavelet::Db4 => &DB4,
        }
    }

    /// 滤波器长度.
    #[inline]
    pub fn filter_len(&self) -> usize {
        self.scaling().len()
    }

    /// 长度为 `len` 的信号有意义的最大分解层数, 即
    /// `floor(log2(len / (filter_len - 1)))`; 信号比滤波器短时为 0.
    pub fn max_level(&self, len: usize) -> u32 {
        let ratio = len as f64 / (self.filter_len() - 1) as f64;
        if ratio < 1.0 {
            0
        } else {
            ratio.log2().floor() as u32
        }
    }
}

impl fmt::Display for Wavelet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Wavelet {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "haar" | "db1" => Ok(Wavelet::Haar),
            "db2" => Ok(Wavelet::Db2),
            "db3" => Ok(Wavelet::Db3),
            "db4" => Ok(Wavelet::Db4),
            _ => Err(ConfigError::UnknownWavelet(s.to_string())),
        }
    }
}

/// 正交镜像滤波器组. 高通由 `g[k] = (-1)^k h[L-1-k]` 得到.
struct FilterBank {
    lo: &'static [f64],
    hi: Vec<f64>,
}

impl FilterBank {
    fn new(wavelet: Wavelet) -> Self {
        let lo = wavelet.scaling();
        let n = lo.len();
        let hi = (0..n)
            .map(|k| if k % 2 == 0 { lo[n - 1 - k] } else { -lo[n - 1 - k] })
            .collect();
        Self { lo, hi }
    }

    /// 单层一维分解. 输出长度均为 `ceil(x.len() / 2)`.
    fn analyze(&self, x: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let n = x.len();
        let padded = n + n % 2;
        let at = |i: usize| x[(i % padded).min(n - 1)];
        (0..padded / 2)
            .map(|i| {
                izip!(self.lo.iter(), self.hi.iter())
                    .enumerate()
                    .fold((0.0, 0.0), |(a, d), (k, (&l, &h))| {
                        let s = at(2 * i + k);
                        (a + l * s, d + h * s)
                    })
            })
            .unzip()
    }

    /// 单层一维重构, 结果裁剪为 `out_len`.
    fn synthesize(&self, approx: &[f64], detail: &[f64], out_len: usize) -> Vec<f64> {
        debug_assert_eq!(approx.len(), detail.len());
        let padded = 2 * approx.len();
        let mut x = vec![0.0; padded];
        for (i, (&a, &d)) in approx.iter().zip(detail.iter()).enumerate() {
            for (k, (&l, &h)) in izip!(self.lo.iter(), self.hi.iter()).enumerate() {
                x[(2 * i + k) % padded] += l * a + h * d;
            }
        }
        x.truncate(out_len);
        x
    }

    /// 沿 `axis` 对每一条 lane 做单层分解.
    fn analyze_axis(&self, x: ArrayView2<f64>, axis: Axis) -> (Array2<f64>, Array2<f64>) {
        let mut dim = x.raw_dim();
        dim[axis.index()] = (x.len_of(axis) + 1) / 2;
        let mut lo = Array2::zeros(dim.clone());
        let mut hi = Array2::zeros(dim);
        Zip::from(x.lanes(axis))
            .and(lo.lanes_mut(axis))
            .and(hi.lanes_mut(axis))
            .for_each(|src, mut lo, mut hi| {
                let (a, d) = self.analyze(&src.to_vec());
                lo.iter_mut().zip(a).for_each(|(dst, v)| *dst = v);
                hi.iter_mut().zip(d).for_each(|(dst, v)| *dst = v);
            });
        (lo, hi)
    }

    /// 沿 `axis` 对每一条 lane 做单层重构, 该方向长度裁剪为 `out_len`.
    fn synthesize_axis(
        &self,
        lo: ArrayView2<f64>,
        hi: ArrayView2<f64>,
        axis: Axis,
        out_len: usize,
    ) -> Array2<f64> {
        let mut dim = lo.raw_dim();
        dim[axis.index()] = out_len;
        let mut out = Array2::zeros(dim);
        Zip::from(lo.lanes(axis))
            .and(hi.lanes(axis))
            .and(out.lanes_mut(axis))
            .for_each(|a, d, mut dst| {
                let x = self.synthesize(&a.to_vec(), &d.to_vec(), out_len);
                dst.iter_mut().zip(x).for_each(|(o, v)| *o = v);
            });
        out
    }
}

/// 一层分解得到的三个细节子带.
#[derive(Clone, Debug)]
pub struct DetailBands {
    /// 宽度方向低通, 高度方向高通 (水平边缘).
    pub horizontal: Array2<f64>,

    /// 宽度方向高通, 高度方向低通 (垂直边缘).
    pub vertical: Array2<f64>,

    /// 两个方向都高通.
    pub diagonal: Array2<f64>,
}

impl DetailBands {
    /// 依次获得三个子带的可变引用.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Array2<f64>> {
        [&mut self.horizontal, &mut self.vertical, &mut self.diagonal].into_iter()
    }
}

/// 多层二维小波分解结果.
///
/// 包含最粗尺度的近似子带, 以及从细到粗每一层的细节子带和该层输入的形状.
pub struct Decomposition {
    bank: FilterBank,
    approx: Array2<f64>,

    /// `levels[0]` 为最细的一层.
    levels: Vec<(Idx2d, DetailBands)>,
}

impl Decomposition {
    /// 对 `x` 做 `levels` 层分解.
    ///
    /// `levels` 可以超过 [`Wavelet::max_level`]: 结果仍可精确重构,
    /// 只是粗尺度系数主要由周期延拓的边界决定. `x` 为空时程序 panic.
    pub fn new(x: ArrayView2<f64>, wavelet: Wavelet, levels: u32) -> Self {
        assert!(!x.is_empty(), "不能分解空栅格");
        let bank = FilterBank::new(wavelet);
        let mut approx = x.to_owned();
        let mut details = Vec::with_capacity(levels as usize);
        for _ in 0..levels {
            let shape = approx.dim();
            let (l, h) = bank.analyze_axis(approx.view(), Axis(1));
            let (ll, lh) = bank.analyze_axis(l.view(), Axis(0));
            let (hl, hh) = bank.analyze_axis(h.view(), Axis(0));
            details.push((
                shape,
                DetailBands {
                    horizontal: lh,
                    vertical: hl,
                    diagonal: hh,
                },
            ));
            approx = ll;
        }
        Self {
            bank,
            approx,
            levels: details,
        }
    }

    /// 近似子带.
    #[inline]
    pub fn approx(&self) -> ArrayView2<f64> {
        self.approx.view()
    }

    /// 分解层数.
    #[inline]
    pub fn levels(&self) -> usize {
        self.levels.len()
    }

    /// 第 `level` 层 (0 为最细) 的细节子带.
    #[inline]
    pub fn details(&self, level: usize) -> Option<&DetailBands> {
        self.levels.get(level).map(|(_, d)| d)
    }

    /// 依次获得所有细节子带的可变引用.
    pub fn details_mut(&mut self) -> impl Iterator<Item = &mut Array2<f64>> {
        self.levels.iter_mut().flat_map(|(_, d)| d.iter_mut())
    }

    /// 由近似子带和 (可能已修改的) 细节子带重构, 结果形状与原输入一致.
    pub fn reconstruct(&self) -> Array2<f64> {
        let bank = &self.bank;
        self.levels
            .iter()
            .rev()
            .fold(self.approx.clone(), |approx, ((h, w), d)| {
                let l = bank.synthesize_axis(approx.view(), d.horizontal.view(), Axis(0), *h);
                let hi = bank.synthesize_axis(d.vertical.view(), d.diagonal.view(), Axis(0), *h);
                bank.synthesize_axis(l.view(), hi.view(), Axis(1), *w)
            })
    }
}
