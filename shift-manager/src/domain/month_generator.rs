use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::entry_store::EntryStore;
use crate::domain::models::{Employee, EmployeeId, EntryOrigin, MonthKey, ScheduleEntry};
use crate::domain::pattern_analyzer::{analyze_rotation, RotationDescriptor};
use crate::domain::rotation::RotationCursor;
use crate::domain::shift_catalog::{ShiftCatalog, WEEK_OFF_CODE};

/// 当月の自動補完に必要な最低勤務エントリ数
pub const MIN_ENTRIES_FOR_AUTO_FILL: usize = 3;

/// 翌月1か月分を生成する
///
/// パターンのない従業員は生成しない。対象月は空である前提
/// (呼び出し側で確認する)。生成したエントリはすべて自動生成扱い。
pub fn generate_month(
    employees: &[Employee],
    patterns: &BTreeMap<EmployeeId, RotationDescriptor>,
    target: MonthKey,
    catalog: &ShiftCatalog,
) -> Vec<ScheduleEntry> {
    let mut generated = Vec::new();

    for employee in employees {
        let Some(descriptor) = patterns.get(&employee.id) else {
            tracing::debug!(employee_id = employee.id, "no rotation pattern, skipped");
            continue;
        };

        let mut cursor = RotationCursor::resume(descriptor, catalog);
        for date in target.days() {
            if let Some(entry) = emit_day(employee, date, &mut cursor, catalog) {
                generated.push(entry);
            }
        }
    }

    generated
}

/// 当月の残りを埋める (手入力したシフトの続きから月末まで)
///
/// 勤務エントリが 3 件未満なら何もしない。最後の勤務日の翌日から始め、
/// 既にエントリがある日は飛ばす。
pub fn fill_month_remainder(
    employee: &Employee,
    month: MonthKey,
    store: &EntryStore,
    catalog: &ShiftCatalog,
) -> Vec<ScheduleEntry> {
    let existing = store.entries_for_employee_in_month(employee.id, month);

    // 1. 最後の勤務日 (エントリは日付順)
    let working: Vec<&ScheduleEntry> = existing
        .iter()
        .copied()
        .filter(|e| !catalog.is_off_code(&e.shift_code))
        .collect();

    if working.len() < MIN_ENTRIES_FOR_AUTO_FILL {
        tracing::debug!(
            employee_id = employee.id,
            working = working.len(),
            "not enough working entries for auto-fill"
        );
        return Vec::new();
    }
    let Some(last_working) = working.last().map(|e| e.date) else {
        return Vec::new();
    };

    // 2. パターン解析
    let Some(descriptor) = analyze_rotation(working.iter().copied(), catalog) else {
        return Vec::new();
    };
    let mut cursor = RotationCursor::resume(&descriptor, catalog);

    // 3. 翌日から月末まで
    let mut filled = Vec::new();
    for date in month.days().filter(|d| *d > last_working) {
        if store.contains(employee.id, date) {
            continue;
        }
        if let Some(entry) = emit_day(employee, date, &mut cursor, catalog) {
            filled.push(entry);
        }
    }

    filled
}

/// 1日分のエントリを作る
///
/// 週休日は WO (ローテーションは進めない)。それ以外はカーソルのシフトを出して1日進める。
/// カーソルのシフトが off 区分なら何も出さない。
fn emit_day(
    employee: &Employee,
    date: NaiveDate,
    cursor: &mut RotationCursor<'_>,
    catalog: &ShiftCatalog,
) -> Option<ScheduleEntry> {
    if employee.week_off_pattern.is_week_off(date) {
        return catalog
            .lookup(WEEK_OFF_CODE)
            .map(|wo| ScheduleEntry::new(employee, date, wo, EntryOrigin::Auto));
    }

    let shift = cursor.working_shift()?;
    let entry = ScheduleEntry::new(employee, date, shift, EntryOrigin::Auto);
    cursor.advance();
    Some(entry)
}
