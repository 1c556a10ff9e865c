//! 程序运行函数.

use crate::result::AblationResult;
use crate::studies::{cleaning, qa_imt};
use std::thread;
use utils::loader;

/// 实际运行.
pub fn run() -> AblationResult {
    let phantoms = loader::phantom_dataset_from_env();
    assert!(!phantoms.is_empty(), "合成数据集为空");

    let preview_dir = loader::preview_dir_from_env();
    if let Some(dir) = preview_dir.as_deref() {
        if let Err(e) = std::fs::create_dir_all(dir) {
            log::warn!("无法创建预览目录 {}: {e}", dir.display());
        } else if let Err(e) = utils::preview::save_truth(&phantoms[0], dir) {
            log::warn!("无法保存真值预览图: {e}");
        }
    }

    log::info!(
        "Running ablation studies on {} phantoms ({} cpus)...",
        phantoms.len(),
        utils::cpus()
    );
    let p = phantoms.as_slice();
    let dir = preview_dir.as_deref();

    thread::scope(|s| {
        let handles = cleaning::VARIANTS
            .map(|(name, variant)| s.spawn(move || cleaning::run_variant(name, variant, p, dir)));
        let qa = s.spawn(move || qa_imt::run(p));

        let profiles = cleaning::VARIANTS.map(|(name, _)| name).into_iter().zip(
            handles
                .into_iter()
                .map(|th| th.join().expect("Thread joining error")),
        );
        let profiles: Vec<_> = profiles.collect();
        AblationResult::new(profiles, qa.join().expect("Thread joining error"))
    })
}
