//! 分块限制对比度的自适应直方图均衡 (CLAHE).
//!
//! 探头与机构差异会造成很大的全局亮度波动. 局部均衡可以恢复可比的对比度,
//! 而裁剪上限限制了对噪声的放大.

use crate::consts::preproc::{DEFAULT_CLIP_LIMIT, DEFAULT_TILE_GRID, HIST_BINS};
use crate::{ConfigError, Idx2d, UsImage};
use ndarray::{s, Array2, ArrayView2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// BT.601 亮度权重.
const LUMA_R: f64 = 0.299;
const LUMA_G: f64 = 0.587;
const LUMA_B: f64 = 0.114;

/// 对比度增强参数.
///
/// 该配置是只读的. 若要修改参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnhanceConfig {
    clip_limit: f64,
    tile_grid: Idx2d,
}

impl EnhanceConfig {
    /// 构建对比度增强参数.
    ///
    /// `clip_limit` 必须是有限非负数, `0` 表示不裁剪 (退化为分块直方图均衡);
    /// `tile_grid` 为 `(纵向块数, 横向块数)`, 两者都至少为 1.
    pub fn new(clip_limit: f64, tile_grid: Idx2d) -> Result<Self, ConfigError> {
        if !clip_limit.is_finite() || clip_limit < 0.0 {
            return Err(ConfigError::ClipLimit(clip_limit));
        }
        if tile_grid.0 == 0 || tile_grid.1 == 0 {
            return Err(ConfigError::TileGrid(tile_grid));
        }
        Ok(Self {
            clip_limit,
            tile_grid,
        })
    }

    /// 裁剪上限.
    #[inline]
    pub fn clip_limit(&self) -> f64 {
        self.clip_limit
    }

    /// 分块网格 `(纵向块数, 横向块数)`.
    #[inline]
    pub fn tile_grid(&self) -> Idx2d {
        self.tile_grid
    }
}

/// 裁剪上限 2.0, 8x8 分块.
impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            clip_limit: DEFAULT_CLIP_LIMIT,
            tile_grid: DEFAULT_TILE_GRID,
        }
    }
}

/// 对图像实施 CLAHE, 返回 \[0, 1\] 范围内的新图像.
///
/// 1. 最大值超过 1 时先整体除以最大值;
/// 2. 量化到 8-bit, 分块计算裁剪后的累计直方图, 在相邻块的映射之间双线性插值;
/// 3. 3/4 通道图像只对亮度 (YCbCr 中的 Y) 进行均衡, 保留色度 (第 4 通道原样保留);
///   其它通道数的图像逐通道处理.
pub fn enhance(image: &UsImage, cfg: &EnhanceConfig) -> UsImage {
    let unit = image.normalized();
    match unit.channels() {
        3 | 4 => enhance_luma(&unit, cfg),
        _ => unit.map_planes(|p| equalize_plane(p, cfg)),
    }
}

/// 对单个 \[0, 1\] 平面实施 CLAHE.
pub fn equalize_plane(plane: ArrayView2<f64>, cfg: &EnhanceConfig) -> Array2<f64> {
    let quantized = plane.mapv(quantize);
    clahe_u8(quantized.view(), cfg).mapv(|v| f64::from(v) / 255.0)
}

/// `[0, 1] -> [0, 255]`, 截断取整.
#[inline]
fn quantize(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0) as u8
}

/// 只均衡亮度通道, 保留 `R - Y` 与 `B - Y` 色差.
fn enhance_luma(unit: &UsImage, cfg: &EnhanceConfig) -> UsImage {
    let (r, g, b) = (unit.channel(0), unit.channel(1), unit.channel(2));
    let luma = Array2::from_shape_fn(unit.shape(), |p| {
        LUMA_R * r[p] + LUMA_G * g[p] + LUMA_B * b[p]
    });
    let new_luma = equalize_plane(luma.view(), cfg);

    let new_r = Array2::from_shape_fn(unit.shape(), |p| new_luma[p] + (r[p] - luma[p]));
    let new_b = Array2::from_shape_fn(unit.shape(), |p| new_luma[p] + (b[p] - luma[p]));
    let new_g = Array2::from_shape_fn(unit.shape(), |p| {
        (new_luma[p] - LUMA_R * new_r[p] - LUMA_B * new_b[p]) / LUMA_G
    });

    let mut planes: Vec<Array2<f64>> = [new_r, new_g, new_b]
        .into_iter()
        .map(|p| p.mapv(|v| v.clamp(0.0, 1.0)))
        .collect();
    planes.extend((3..unit.channels()).map(|c| unit.channel(c).to_owned()));
    UsImage::from_planes(&planes)
}

/// 一个方向上的分块.
struct TileAxis {
    /// 每块的 `[起点, 终点)`.
    bounds: Vec<(usize, usize)>,

    /// 每块的中心坐标.
    centers: Vec<f64>,
}

impl TileAxis {
    /// 将长度 `len` 尽量均匀地分为 `n` 块 (`1 <= n <= len`). 每块都非空.
    fn split(len: usize, n: usize) -> Self {
        debug_assert!(1 <= n && n <= len);
        let bounds: Vec<_> = (0..n).map(|t| (t * len / n, (t + 1) * len / n)).collect();
        let centers = bounds
            .iter()
            .map(|&(a, b)| (a + b - 1) as f64 / 2.0)
            .collect();
        Self { bounds, centers }
    }

    /// 对每个坐标, 求插值所用的两块索引及第二块的权重.
    fn lookup(&self, len: usize) -> Vec<(usize, usize, f64)> {
        let last = self.centers.len() - 1;
        let mut t = 0usize;
        (0..len)
            .map(|p| {
                let p = p as f64;
                if p <= self.centers[0] {
                    return (0, 0, 0.0);
                }
                if p >= self.centers[last] {
                    return (last, last, 0.0);
                }
                while self.centers[t + 1] <= p {
                    t += 1;
                }
                let (c0, c1) = (self.centers[t], self.centers[t + 1]);
                (t, t + 1, (p - c0) / (c1 - c0))
            })
            .collect()
    }
}

/// 裁剪直方图, 并将超出的部分均匀地重新分配到所有桶中.
fn clip_histogram(hist: &mut [usize; HIST_BINS], clip_limit: f64, area: usize) {
    if clip_limit <= 0.0 {
        return;
    }
    let limit = ((clip_limit * area as f64 / HIST_BINS as f64) as usize).max(1);
    let mut excess = 0usize;
    for bin in hist.iter_mut().filter(|b| **b > limit) {
        excess += *bin - limit;
        *bin = limit;
    }
    let batch = excess / HIST_BINS;
    let residual = excess % HIST_BINS;
    hist.iter_mut().for_each(|b| *b += batch);
    if residual > 0 {
        let step = (HIST_BINS / residual).max(1);
        hist.iter_mut()
            .step_by(step)
            .take(residual)
            .for_each(|b| *b += 1);
    }
}

/// 由一块像素求映射表.
fn tile_lut(tile: ArrayView2<u8>, clip_limit: f64) -> [u8; HIST_BINS] {
    let mut hist = [0usize; HIST_BINS];
    tile.iter().for_each(|&p| hist[p as usize] += 1);
    let area = tile.len();
    clip_histogram(&mut hist, clip_limit, area);

    let scale = 255.0 / area as f64;
    let mut lut = [0u8; HIST_BINS];
    let mut cdf = 0usize;
    for (dst, &count) in lut.iter_mut().zip(hist.iter()) {
        cdf += count;
        *dst = (cdf as f64 * scale).round().min(255.0) as u8;
    }
    lut
}

/// 8-bit 平面上的 CLAHE.
///
/// 块数大于对应边长时按边长截断, 保证每块非空.
fn clahe_u8(src: ArrayView2<u8>, cfg: &EnhanceConfig) -> Array2<u8> {
    let (h, w) = src.dim();
    if h == 0 || w == 0 {
        return src.to_owned();
    }
    let rows = TileAxis::split(h, cfg.tile_grid.0.min(h));
    let cols = TileAxis::split(w, cfg.tile_grid.1.min(w));
    let tx = cols.bounds.len();

    let luts: Vec<[u8; HIST_BINS]> = rows
        .bounds
        .iter()
        .flat_map(|&(r0, r1)| {
            cols.bounds
                .iter()
                .map(move |&(c0, c1)| (r0, r1, c0, c1))
        })
        .map(|(r0, r1, c0, c1)| tile_lut(src.slice(s![r0..r1, c0..c1]), cfg.clip_limit))
        .collect();

    let row_lookup = rows.lookup(h);
    let col_lookup = cols.lookup(w);

    Array2::from_shape_fn((h, w), |(r, c)| {
        let (t0, t1, ay) = row_lookup[r];
        let (u0, u1, ax) = col_lookup[c];
        let v = src[(r, c)] as usize;
        let at = |t: usize, u: usize| f64::from(luts[t * tx + u][v]);
        let top = at(t0, u0) * (1.0 - ax) + at(t0, u1) * ax;
        let bottom = at(t1, u0) * (1.0 - ax) + at(t1, u1) * ax;
        (top * (1.0 - ay) + bottom * ay).round().clamp(0.0, 255.0) as u8
    })
}
