//! 清洗变体的运行统计.

use std::time::{Duration, Instant};

/// ablation/benchmark 计时器.
///
/// 该计时器支持 "中途中断" 与 "结束中断, 继续开始计时".
#[derive(Clone, Debug)]
struct AccTimer {
    consumed: Duration,
    since: Instant,
}

impl AccTimer {
    /// 初始化计时器. 初始化时会视为已经开始计时 (`self.start()`).
    #[inline]
    fn new() -> Self {
        Self {
            consumed: Duration::ZERO,
            since: Instant::now(),
        }
    }

    /// 开始计时.
    #[inline]
    fn start(&mut self) {
        self.since = Instant::now();
    }

    /// 结束计时, 并将这一区间的时间累加. 返回本轮计时时长.
    ///
    /// 上一次调用必须是 `self.start()`, 否则计算时间值无意义.
    #[inline]
    fn elapsed(&mut self) -> Duration {
        let d = self.since.elapsed();
        self.consumed += d;
        d
    }

    /// 累计时间 (微秒).
    #[inline]
    fn total_us(&self) -> u64 {
        self.consumed.as_micros() as u64
    }
}

/// 一个清洗变体在整个数据集上的统计.
#[derive(Clone, Debug)]
pub struct Profile {
    /// 处理的图像个数.
    images: u64,

    /// 清洗本身花费的总时间.
    clean_time: AccTimer,

    /// 整个任务花费的总时间 (包括评分与预览图输出).
    real_time: AccTimer,

    /// 最耗时的一次清洗. 尚无记录时为 `None`.
    most: Option<Duration>,

    /// 可以评分的图像的 CNR 之和.
    cnr_sum: f64,

    /// 可以评分的图像个数.
    scored: u64,
}

impl Profile {
    /// 初始化, 同时开始总计时.
    #[inline]
    pub fn new() -> Self {
        Self {
            images: 0,
            clean_time: AccTimer::new(),
            real_time: AccTimer::new(),
            most: None,
            cnr_sum: 0.0,
            scored: 0,
        }
    }

    /// 记录一张新图像, 并开始一轮清洗计时.
    #[inline]
    pub fn count_image(&mut self) {
        self.images += 1;
        self.clean_time.start();
    }

    /// 结束一轮清洗计时.
    #[inline]
    pub fn clean_elapsed(&mut self) {
        let d = self.clean_time.elapsed();
        self.most = Some(self.most.map_or(d, |m| m.max(d)));
    }

    /// 记录一张图像的 CNR. `None` (无法评分) 被忽略.
    #[inline]
    pub fn record_cnr(&mut self, cnr: Option<f64>) {
        if let Some(c) = cnr {
            self.cnr_sum += c;
            self.scored += 1;
        }
    }

    /// 结束全部计时.
    #[inline]
    pub fn finish(mut self) -> Self {
        self.real_time.elapsed();
        self
    }

    /// 图像个数.
    #[inline]
    pub fn images(&self) -> u64 {
        self.images
    }

    /// 可以评分的图像个数.
    #[inline]
    pub fn scored(&self) -> u64 {
        self.scored
    }

    /// 清洗总时间 (微秒).
    #[inline]
    pub fn clean_time_us(&self) -> u64 {
        self.clean_time.total_us()
    }

    /// 任务总时间 (微秒).
    #[inline]
    pub fn real_time_us(&self) -> u64 {
        self.real_time.total_us()
    }

    /// 平均每张图像的清洗时间 (微秒).
    pub fn avg_clean_time_us(&self) -> Option<f64> {
        (self.images > 0).then(|| self.clean_time_us() as f64 / self.images as f64)
    }

    /// 平均 CNR.
    pub fn avg_cnr(&self) -> Option<f64> {
        (self.scored > 0).then(|| self.cnr_sum / self.scored as f64)
    }

    /// 最耗时的一次清洗.
    #[inline]
    pub fn most_time_consuming(&self) -> Option<Duration> {
        self.most
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new()
    }
}
