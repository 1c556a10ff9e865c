//! 从环境变量读取实验配置, 并生成实验用的合成数据集.

use crate::phantom::{Phantom, PhantomSpec};
use std::env;
use std::path::PathBuf;

/// 默认样本数.
pub const DEFAULT_SAMPLES: usize = 64;

/// 获取实验样本数.
///
/// 1. 若环境变量 `$CAROTID_ABLATION_SAMPLES` 是合法的正整数, 则返回其值;
/// 2. 否则, 返回 [`DEFAULT_SAMPLES`].
pub fn samples_from_env_or_default() -> usize {
    match env::var("CAROTID_ABLATION_SAMPLES").map(|s| s.trim().parse::<usize>()) {
        Ok(Ok(n)) if n > 0 => n,
        Ok(_) => {
            log::warn!("`$CAROTID_ABLATION_SAMPLES` 不是正整数, 使用默认值 {DEFAULT_SAMPLES}");
            DEFAULT_SAMPLES
        }
        Err(_) => DEFAULT_SAMPLES,
    }
}

/// 获取预览图输出目录.
///
/// 若环境变量 `$CAROTID_PREVIEW_DIR` 非空, 则返回其值; 否则返回 `None`, 表示不输出预览图.
pub fn preview_dir_from_env() -> Option<PathBuf> {
    env::var_os("CAROTID_PREVIEW_DIR")
        .filter(|d| !d.is_empty())
        .map(PathBuf::from)
}

/// 以 `0..n` 为种子生成 `n` 个合成样本. 相同的 `n` 总是得到相同的数据集.
pub fn phantom_dataset(n: usize, spec: &PhantomSpec) -> Vec<Phantom> {
    (0..n as u64).map(|seed| Phantom::generate(seed, spec)).collect()
}

/// 从 `$CAROTID_ABLATION_SAMPLES` 读取样本数, 生成默认规格的合成数据集.
#[inline]
pub fn phantom_dataset_from_env() -> Vec<Phantom> {
    phantom_dataset(samples_from_env_or_default(), &PhantomSpec::default())
}
