#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 提供颈动脉超声图像 (及其分割标签) 的数据质控、图像清洗与内中膜厚度
//! (Intima-Media Thickness, IMT) 测量算法.
//!
//! 该 crate 只处理已经解码到内存中的栅格数据. 文件读写、模型推理与训练、
//! 以及任何网络服务均由外部协作方负责.
//!
//! # 注意
//!
//! 1. 所有操作都是纯函数, 输入不可变, 不持有共享可变状态.
//! 2. 校验器返回 [`ValidationVerdict`] 而不是 panic; 预处理和 IMT
//!   提取假设输入已经通过校验, 违反该约定时程序行为未定义 (可能 panic).
//! 3. "无法确定" 的测量值一律用 `Option::None` 表示, 绝不与 0 或合法行号混淆.
//!
//! # 功能清单
//!
//! ### 数据质控 ✅
//!
//! 图像完整性 (不可读 / 形状非法 / 常量图像), 标签一致性 (形状匹配, 前景覆盖率),
//! 以及数据集级别的有效/标记划分. 单个样本失败不会中断整个批次.
//!
//! 实现位于 `carotid-berry/src/qa`.
//!
//! ### 图像清洗 ✅
//!
//! 1. 分块限制对比度的自适应直方图均衡 (CLAHE). 彩色图只处理亮度通道. ✅
//! 2. 多层二维离散小波分解 + 软阈值收缩 + 重构. ✅
//! 3. 固定顺序的组合流程: 归一化 -> 对比度增强 -> 小波去噪 -> 截断到 \[0, 1\]. ✅
//!
//! 先增强, 后去噪. 顺序不可交换.
//!
//! 实现位于 `carotid-berry/src/preproc`.
//!
//! ### IMT 测量 ✅
//!
//! 逐列定位管腔-内膜界面与中膜-外膜界面, 计算像素厚度,
//! 按像素间距换算为毫米并给出风险等级. 另提供批量 IMT 平均绝对误差和 Dice 指标.
//!
//! 实现位于 `carotid-berry/src/imt`.
//!
//! ### 并行 ✅
//!
//! 打开 `rayon` feature 后, 提供数据集级别的并行版本 (`par_*`).

/// 二维索引 `(高, 宽)`, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 内存中的超声图像与分割标签.
mod data;

pub mod consts;
pub mod error;
pub mod imt;
pub mod prelude;
pub mod preproc;
pub mod qa;

pub use data::{mean_class_probability, LabelMask, MaskPixel, OwnedLabelMask, UsImage};

pub use error::{ConfigError, QaError, QaErrorKind};

pub use qa::ValidationVerdict;
