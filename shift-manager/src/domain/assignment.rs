// =====================
// 手動一括割り当て (plan / commit の2段階)
// =====================

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::entry_store::EntryStore;
use crate::domain::models::{Employee, EmployeeId, EntryOrigin, MonthKey, ScheduleEntry};
use crate::domain::shift_catalog::{ShiftCatalog, FOLLOW_ON_OFF_TRIGGER, OFF_CODE};
use crate::error::{ScheduleError, ScheduleResult};

/// この件数以上を割り当てたら当月の自動補完を提案する
pub const AUTO_FILL_OFFER_THRESHOLD: usize = 3;

/// 期間内のどの日に割り当てるか
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "mode", content = "days")]
pub enum DistributionMode {
    /// 期間内の全日 (週休日は除く)
    Auto,
    /// 指定した日 (1-31) のみ
    Manual(BTreeSet<u32>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRequest {
    pub employee_id: EmployeeId,
    pub shift_code: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub mode: DistributionMode,
}

/// 書き込み前の割り当て結果
///
/// `conflicts` は上書きされる既存エントリ。作成時のストアの revision を持ち、
/// commit 時にストアが変わっていれば拒否される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentPlan {
    pub employee_id: EmployeeId,
    pub shift_code: String,
    pub month: MonthKey,
    pub entries: Vec<ScheduleEntry>,
    pub conflicts: Vec<ScheduleEntry>,
    pub revision: u64,
}

impl AssignmentPlan {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    pub fn conflict_dates(&self) -> Vec<NaiveDate> {
        self.conflicts.iter().map(|e| e.date).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentOutcome {
    pub assigned: usize,
    pub replaced: usize,
    /// AU の翌日に自動で入れた OFF の日付
    pub follow_on_offs: Vec<NaiveDate>,
    /// 当月の自動補完を提案できるか
    pub auto_fill_available: bool,
}

/// 割り当てを計算する (ストアは変更しない)
pub fn plan_assignment(
    request: &AssignmentRequest,
    employee: &Employee,
    store: &EntryStore,
    catalog: &ShiftCatalog,
) -> ScheduleResult<AssignmentPlan> {
    // 1. 入力チェック
    if request.shift_code.trim().is_empty() {
        return Err(ScheduleError::Validation(String::from("shift code is required")));
    }
    let shift = catalog
        .lookup_ignore_case(&request.shift_code)
        .ok_or_else(|| ScheduleError::UnknownShift(request.shift_code.clone()))?;

    if request.start > request.end {
        return Err(ScheduleError::Validation(format!(
            "start date {} is after end date {}",
            request.start, request.end
        )));
    }
    let month = MonthKey::of(request.start);
    if !month.contains(request.end) {
        return Err(ScheduleError::RangeOutsideMonth {
            start: request.start,
            end: request.end,
        });
    }
    if let DistributionMode::Manual(days) = &request.mode {
        if days.is_empty() {
            return Err(ScheduleError::Validation(String::from(
                "manual distribution requires at least one day",
            )));
        }
    }

    // 2. 対象日ごとにエントリを作る
    let mut entries = Vec::new();
    let mut conflicts = Vec::new();

    for date in request.start.iter_days().take_while(|d| *d <= request.end) {
        let selected = match &request.mode {
            DistributionMode::Manual(days) => days.contains(&date.day()),
            DistributionMode::Auto => !employee.week_off_pattern.is_week_off(date),
        };
        if !selected {
            continue;
        }

        if let Some(existing) = store.get(employee.id, date) {
            conflicts.push(existing.clone());
        }
        entries.push(ScheduleEntry::new(employee, date, shift, EntryOrigin::Manual));
    }

    tracing::debug!(
        employee_id = employee.id,
        shift = %shift.code,
        planned = entries.len(),
        conflicts = conflicts.len(),
        "assignment planned"
    );

    Ok(AssignmentPlan {
        employee_id: employee.id,
        shift_code: shift.code.clone(),
        month,
        entries,
        conflicts,
        revision: store.revision(),
    })
}

/// plan をストアに書き込む
///
/// 競合があり確認されていなければ何も書かない。
pub fn commit_assignment(
    plan: AssignmentPlan,
    overwrite_confirmed: bool,
    employee: &Employee,
    store: &mut EntryStore,
    catalog: &ShiftCatalog,
) -> ScheduleResult<AssignmentOutcome> {
    if plan.revision != store.revision() {
        return Err(ScheduleError::StalePlan {
            planned: plan.revision,
            current: store.revision(),
        });
    }
    if plan.has_conflicts() && !overwrite_confirmed {
        return Err(ScheduleError::OverwriteNotConfirmed {
            conflicts: plan.conflicts.len(),
        });
    }

    let assigned = plan.entries.len();
    let replaced = plan.conflicts.len();
    let dates: Vec<NaiveDate> = plan.entries.iter().map(|e| e.date).collect();
    store.upsert_all(plan.entries);

    // AU の翌日は OFF (空いている日のみ)
    let mut follow_on_offs = Vec::new();
    if plan.shift_code == FOLLOW_ON_OFF_TRIGGER {
        for date in dates {
            if let Some(off) = follow_on_off(employee, date, store, catalog) {
                follow_on_offs.push(off.date);
                store.upsert(off);
            }
        }
    }

    tracing::info!(
        employee_id = employee.id,
        shift = %plan.shift_code,
        month = %plan.month,
        assigned,
        replaced,
        follow_on_offs = follow_on_offs.len(),
        "assignment committed"
    );

    Ok(AssignmentOutcome {
        assigned,
        replaced,
        follow_on_offs,
        auto_fill_available: assigned >= AUTO_FILL_OFFER_THRESHOLD,
    })
}

/// `date` の翌日に入れる OFF エントリ
///
/// 翌日が同じ月で、まだエントリが無いときだけ返す。
pub fn follow_on_off(
    employee: &Employee,
    date: NaiveDate,
    store: &EntryStore,
    catalog: &ShiftCatalog,
) -> Option<ScheduleEntry> {
    let next = date.succ_opt()?;
    if !MonthKey::of(date).contains(next) || store.contains(employee.id, next) {
        return None;
    }
    let off = catalog.lookup(OFF_CODE)?;
    Some(ScheduleEntry::new(employee, next, off, EntryOrigin::Auto))
}

#[cfg(test)]
mod assignment_tests {
    use super::*;
    use crate::domain::models::WeekOffPattern;

    fn alice() -> Employee {
        Employee {
            id: 1,
            name: "Alice".to_string(),
            position: "Developer".to_string(),
            week_off_pattern: WeekOffPattern::SatSun,
            working_hours: 8,
        }
    }

    fn date(d: u32) -> NaiveDate {
        // 2025-09-01 は月曜
        NaiveDate::from_ymd_opt(2025, 9, d).unwrap()
    }

    fn request(code: &str, start: u32, end: u32, mode: DistributionMode) -> AssignmentRequest {
        AssignmentRequest {
            employee_id: 1,
            shift_code: code.to_string(),
            start: date(start),
            end: date(end),
            mode,
        }
    }

    #[test]
    fn manual_mode_only_uses_selected_days() {
        let catalog = ShiftCatalog::standard();
        let store = EntryStore::new();
        let req = request("IST", 1, 10, DistributionMode::Manual(BTreeSet::from([3, 7])));

        let plan = plan_assignment(&req, &alice(), &store, &catalog).unwrap();

        let days: Vec<u32> = plan.entries.iter().map(|e| e.date.day()).collect();
        // 7日は日曜だが manual では週休を見ない
        assert_eq!(days, vec![3, 7]);
        assert!(!plan.has_conflicts());
    }

    #[test]
    fn auto_mode_skips_week_off_days() {
        let catalog = ShiftCatalog::standard();
        let store = EntryStore::new();
        let req = request("US", 1, 14, DistributionMode::Auto);

        let plan = plan_assignment(&req, &alice(), &store, &catalog).unwrap();

        assert_eq!(plan.entries.len(), 10);
        assert!(plan
            .entries
            .iter()
            .all(|e| !WeekOffPattern::SatSun.is_week_off(e.date)));
    }

    #[test]
    fn range_must_stay_in_one_month() {
        let catalog = ShiftCatalog::standard();
        let store = EntryStore::new();
        let req = AssignmentRequest {
            employee_id: 1,
            shift_code: "IST".to_string(),
            start: date(28),
            end: NaiveDate::from_ymd_opt(2025, 10, 2).unwrap(),
            mode: DistributionMode::Auto,
        };

        let r = plan_assignment(&req, &alice(), &store, &catalog);
        assert!(matches!(r, Err(ScheduleError::RangeOutsideMonth { .. })));
    }

    #[test]
    fn invalid_requests_are_rejected() {
        let catalog = ShiftCatalog::standard();
        let store = EntryStore::new();
        let emp = alice();

        let r = plan_assignment(&request("ZZ", 1, 2, DistributionMode::Auto), &emp, &store, &catalog);
        assert_eq!(r, Err(ScheduleError::UnknownShift("ZZ".to_string())));

        let r = plan_assignment(&request(" ", 1, 2, DistributionMode::Auto), &emp, &store, &catalog);
        assert!(matches!(r, Err(ScheduleError::Validation(_))));

        let r = plan_assignment(&request("IST", 5, 2, DistributionMode::Auto), &emp, &store, &catalog);
        assert!(matches!(r, Err(ScheduleError::Validation(_))));

        let empty = DistributionMode::Manual(BTreeSet::new());
        let r = plan_assignment(&request("IST", 1, 2, empty), &emp, &store, &catalog);
        assert!(matches!(r, Err(ScheduleError::Validation(_))));
    }

    #[test]
    fn conflicts_require_confirmation_and_nothing_is_written() {
        let catalog = ShiftCatalog::standard();
        let emp = alice();
        let mut store = EntryStore::new();
        store.upsert(ScheduleEntry::new(&emp, date(2), catalog.lookup("L").unwrap(), EntryOrigin::Manual));

        let plan = plan_assignment(&request("IST", 1, 3, DistributionMode::Auto), &emp, &store, &catalog).unwrap();
        assert_eq!(plan.conflict_dates(), vec![date(2)]);

        let r = commit_assignment(plan.clone(), false, &emp, &mut store, &catalog);
        assert_eq!(r, Err(ScheduleError::OverwriteNotConfirmed { conflicts: 1 }));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(1, date(2)).unwrap().shift_code, "L");

        let outcome = commit_assignment(plan, true, &emp, &mut store, &catalog).unwrap();
        assert_eq!(outcome.assigned, 3);
        assert_eq!(outcome.replaced, 1);
        assert!(outcome.auto_fill_available);
        assert_eq!(store.get(1, date(2)).unwrap().shift_code, "IST");
    }

    #[test]
    fn stale_plan_is_rejected() {
        let catalog = ShiftCatalog::standard();
        let emp = alice();
        let mut store = EntryStore::new();

        let plan = plan_assignment(&request("IST", 1, 2, DistributionMode::Auto), &emp, &store, &catalog).unwrap();
        store.upsert(ScheduleEntry::new(&emp, date(1), catalog.lookup("L").unwrap(), EntryOrigin::Manual));

        let r = commit_assignment(plan, true, &emp, &mut store, &catalog);
        assert!(matches!(r, Err(ScheduleError::StalePlan { .. })));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn au_inserts_follow_on_off_without_overwriting() {
        let catalog = ShiftCatalog::standard();
        let emp = alice();
        let mut store = EntryStore::new();
        // 3日は既に休暇
        store.upsert(ScheduleEntry::new(&emp, date(3), catalog.lookup("L").unwrap(), EntryOrigin::Manual));

        let req = request("au", 1, 30, DistributionMode::Manual(BTreeSet::from([2, 10, 30])));
        let plan = plan_assignment(&req, &emp, &store, &catalog).unwrap();
        assert_eq!(plan.shift_code, "AU");

        let outcome = commit_assignment(plan, false, &emp, &mut store, &catalog).unwrap();

        // 30日の翌日は翌月なので入らない
        assert_eq!(outcome.follow_on_offs, vec![date(11)]);
        assert_eq!(store.get(1, date(3)).unwrap().shift_code, "L");
        let off = store.get(1, date(11)).unwrap();
        assert_eq!(off.shift_code, "OFF");
        assert_eq!(off.hours, 0);
        assert!(off.is_auto());
        assert!(store.get(1, NaiveDate::from_ymd_opt(2025, 10, 1).unwrap()).is_none());
    }

    #[test]
    fn consecutive_au_days_keep_au_and_off_goes_after_the_run() {
        let catalog = ShiftCatalog::standard();
        let emp = alice();
        let mut store = EntryStore::new();

        let plan = plan_assignment(&request("AU", 2, 3, DistributionMode::Auto), &emp, &store, &catalog).unwrap();
        let outcome = commit_assignment(plan, false, &emp, &mut store, &catalog).unwrap();

        assert_eq!(outcome.follow_on_offs, vec![date(4)]);
        assert_eq!(store.get(1, date(2)).unwrap().shift_code, "AU");
        assert_eq!(store.get(1, date(3)).unwrap().shift_code, "AU");
        assert_eq!(store.get(1, date(4)).unwrap().shift_code, "OFF");
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn small_batch_does_not_offer_auto_fill() {
        let catalog = ShiftCatalog::standard();
        let emp = alice();
        let mut store = EntryStore::new();

        let plan = plan_assignment(&request("IST", 1, 2, DistributionMode::Auto), &emp, &store, &catalog).unwrap();
        let outcome = commit_assignment(plan, false, &emp, &mut store, &catalog).unwrap();

        assert_eq!(outcome.assigned, 2);
        assert!(!outcome.auto_fill_available);
    }
}
