//! 预处理顺序与 IMT 测量的消融实验.
//!
//! 样本数由 `$CAROTID_ABLATION_SAMPLES` 控制; 设置 `$CAROTID_PREVIEW_DIR`
//! 时输出各清洗变体的预览图.

mod profile;
mod result;
mod runner;
mod studies;

fn main() {
    utils::init_logger();
    runner::run().analyze();
}
