use std::fs;
use std::path::Path;

use anyhow::{bail, Context};

use shift_manager::domain::models::MonthKey;
use shift_manager::domain::schedule_engine::{ScheduleEngine, ScheduleSnapshot};
use shift_manager::domain::shift_catalog::ShiftCatalog;

/// スナップショットファイルからエンジンを復元する
pub fn load(path: &Path) -> anyhow::Result<ScheduleEngine> {
    let text = fs::read_to_string(path).with_context(|| {
        format!(
            "ファイル '{}' を読めませんでした (先に `shift_tools init` を実行してください)",
            path.display()
        )
    })?;
    let snapshot: ScheduleSnapshot = serde_json::from_str(&text)
        .with_context(|| format!("ファイル '{}' が形式に沿っていません", path.display()))?;

    let catalog = snapshot
        .catalog()
        .with_context(|| format!("ファイル '{}' のシフト定義が不正です", path.display()))?;

    Ok(ScheduleEngine::from_snapshot(catalog, snapshot))
}

pub fn save(path: &Path, engine: &ScheduleEngine) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&engine.snapshot())?;
    fs::write(path, json)
        .with_context(|| format!("ファイル '{}' の書き込みに失敗しました", path.display()))?;
    tracing::debug!(path = %path.display(), "state saved");
    Ok(())
}

/// 空の状態ファイルを作る。既にあれば `force` のときだけ上書き
pub fn init(path: &Path, month: MonthKey, force: bool) -> anyhow::Result<ScheduleEngine> {
    if path.exists() && !force {
        bail!("'{}' は既に存在します (--force で上書き)", path.display());
    }
    let engine = ScheduleEngine::new(ShiftCatalog::standard(), month);
    save(path, &engine)?;
    Ok(engine)
}
