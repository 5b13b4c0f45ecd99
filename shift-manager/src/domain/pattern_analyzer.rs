use std::fmt;

use serde::Serialize;

use crate::domain::models::ScheduleEntry;
use crate::domain::shift_catalog::ShiftCatalog;

/// 同じ勤務シフトが連続した区間 ("AU:3")
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationRun {
    pub shift_code: String,
    pub days: u32,
}

impl RotationRun {
    pub fn new(shift_code: &str, days: u32) -> Self {
        Self { shift_code: shift_code.to_string(), days }
    }
}

impl fmt::Display for RotationRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.shift_code, self.days)
    }
}

/// 1従業員・1か月分のローテーション情報 (保存しない。毎回計算する)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationDescriptor {
    pub last_shift: String,
    pub shift_rotations: Vec<RotationRun>,
    pub average_days_per_shift: u32,
    pub total_working_days: u32,
}

/// 勤務エントリからローテーションを検出する
///
/// off区分 (L / WO / OFF) は除外する。勤務エントリが無い場合は `None`
/// (「継続するパターンなし」)。
pub fn analyze_rotation<'a, I>(entries: I, catalog: &ShiftCatalog) -> Option<RotationDescriptor>
where
    I: IntoIterator<Item = &'a ScheduleEntry>,
{
    // 1. 勤務エントリのみ、日付順
    let mut working: Vec<&ScheduleEntry> = entries
        .into_iter()
        .filter(|e| !catalog.is_off_code(&e.shift_code))
        .collect();

    if working.is_empty() {
        return None;
    }
    working.sort_by_key(|e| e.date);

    // 2. 連続区間を数える
    let mut runs: Vec<RotationRun> = Vec::new();
    let mut current: Option<RotationRun> = None;

    for entry in &working {
        if let Some(run) = current.as_mut() {
            if run.shift_code == entry.shift_code {
                run.days += 1;
                continue;
            }
        }
        if let Some(done) = current.take() {
            runs.push(done);
        }
        current = Some(RotationRun::new(&entry.shift_code, 1));
    }

    // 3. 最後の区間を閉じる
    if let Some(done) = current {
        runs.push(done);
    }

    let total = working.len() as u32;
    let last_shift = working
        .last()
        .map(|e| e.shift_code.clone())
        .unwrap_or_default();

    Some(RotationDescriptor {
        last_shift,
        average_days_per_shift: round_half_up_div(total, runs.len().max(1) as u32),
        shift_rotations: runs,
        total_working_days: total,
    })
}

/// 正の数の四捨五入除算 (x.5 は切り上げ)
fn round_half_up_div(numerator: u32, denominator: u32) -> u32 {
    (2 * numerator + denominator) / (2 * denominator)
}
