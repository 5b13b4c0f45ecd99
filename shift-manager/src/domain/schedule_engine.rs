// =====================
// スケジュール状態エンジン
// =====================
//
// 従業員・シフトカタログ・全エントリと「表示中の月」を1つにまとめる。
// 公開メソッドはどれも、エラー時には状態を一切変更しない。

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::assignment::{self, AssignmentOutcome, AssignmentPlan, AssignmentRequest};
use crate::domain::entry_store::EntryStore;
use crate::domain::models::{
    Employee, EmployeeId, EntryOrigin, MonthKey, NewEmployee, ScheduleEntry,
};
use crate::domain::month_generator::{fill_month_remainder, generate_month};
use crate::domain::month_view::{MonthGrid, MonthSummary};
use crate::domain::pattern_analyzer::{analyze_rotation, RotationDescriptor};
use crate::domain::round_robin::{self, RoundRobinRequest};
use crate::domain::shift_catalog::{
    ShiftCatalog, ShiftDefinition, FOLLOW_ON_OFF_TRIGGER, LEAVE_CODE, WEEK_OFF_CODE,
};
use crate::error::{ScheduleError, ScheduleResult};

/// 保存・読み込み用の全状態
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSnapshot {
    pub current_month: MonthKey,
    pub employees: Vec<Employee>,
    pub entries: EntryStore,
    /// 空なら標準カタログ
    #[serde(default)]
    pub shifts: Vec<ShiftDefinition>,
}

impl ScheduleSnapshot {
    /// 保存されたシフト定義からカタログを作る (コード重複はエラー)
    pub fn catalog(&self) -> ScheduleResult<ShiftCatalog> {
        if self.shifts.is_empty() {
            Ok(ShiftCatalog::standard())
        } else {
            ShiftCatalog::new(self.shifts.clone())
        }
    }
}

/// 1セルの編集結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellEdit {
    Set {
        entry: ScheduleEntry,
        follow_on_off: Option<NaiveDate>,
    },
    Cleared(Option<ScheduleEntry>),
}

#[derive(Debug, Clone)]
pub struct ScheduleEngine {
    catalog: ShiftCatalog,
    employees: Vec<Employee>,
    store: EntryStore,
    current_month: MonthKey,
}

impl ScheduleEngine {
    pub fn new(catalog: ShiftCatalog, current_month: MonthKey) -> Self {
        Self {
            catalog,
            employees: Vec::new(),
            store: EntryStore::new(),
            current_month,
        }
    }

    pub fn from_snapshot(catalog: ShiftCatalog, snapshot: ScheduleSnapshot) -> Self {
        Self {
            catalog,
            employees: snapshot.employees,
            store: snapshot.entries,
            current_month: snapshot.current_month,
        }
    }

    pub fn snapshot(&self) -> ScheduleSnapshot {
        ScheduleSnapshot {
            current_month: self.current_month,
            employees: self.employees.clone(),
            entries: self.store.clone(),
            shifts: self.catalog.definitions().to_vec(),
        }
    }

    pub fn catalog(&self) -> &ShiftCatalog {
        &self.catalog
    }

    pub fn employees(&self) -> &[Employee] {
        &self.employees
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    pub fn current_month(&self) -> MonthKey {
        self.current_month
    }

    pub fn set_current_month(&mut self, month: MonthKey) {
        self.current_month = month;
    }

    /// 永続化層から読み直したカタログに切り替える
    ///
    /// 既存のエントリはコピー済みのシフト名・色をそのまま持つ。
    pub fn replace_catalog(&mut self, catalog: ShiftCatalog) {
        tracing::debug!(shifts = catalog.definitions().len(), "catalog replaced");
        self.catalog = catalog;
    }

    pub fn employee(&self, id: EmployeeId) -> ScheduleResult<&Employee> {
        self.employees
            .iter()
            .find(|e| e.id == id)
            .ok_or(ScheduleError::UnknownEmployee(id))
    }

    // =====================
    // 従業員
    // =====================

    /// id は既存の最大値 + 1
    pub fn add_employee(&mut self, new_employee: NewEmployee) -> ScheduleResult<Employee> {
        new_employee.validate()?;

        let id = self.employees.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        let employee = new_employee.with_id(id);
        self.employees.push(employee.clone());

        tracing::info!(employee_id = id, name = %employee.name, "employee added");
        Ok(employee)
    }

    /// 永続化層から読み込んだ一覧で置き換える
    pub fn load_employees(&mut self, employees: Vec<Employee>) {
        self.employees = employees;
    }

    /// 名前・所属・週休・勤務時間を書き換える。既存のエントリはそのまま
    pub fn update_employee(&mut self, employee: Employee) -> ScheduleResult<Employee> {
        let id = employee.id;
        let changes = NewEmployee {
            name: employee.name,
            position: employee.position,
            week_off_pattern: employee.week_off_pattern,
            working_hours: employee.working_hours,
        };
        changes.validate()?;

        let slot = self
            .employees
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(ScheduleError::UnknownEmployee(id))?;
        *slot = changes.with_id(id);

        tracing::info!(employee_id = id, "employee updated");
        Ok(slot.clone())
    }

    /// 従業員と、その全エントリを削除する。削除したエントリ数を返す
    pub fn delete_employee(&mut self, id: EmployeeId) -> ScheduleResult<usize> {
        let index = self
            .employees
            .iter()
            .position(|e| e.id == id)
            .ok_or(ScheduleError::UnknownEmployee(id))?;

        self.employees.remove(index);
        let removed = self.store.remove_employee(id);

        tracing::info!(employee_id = id, removed_entries = removed, "employee deleted");
        Ok(removed)
    }

    // =====================
    // セル単位の編集
    // =====================

    /// 1マスにシフトを入れる。空文字ならクリア
    ///
    /// コードは大文字小文字を区別しない。AU の場合は翌日に OFF を入れる。
    pub fn set_cell(
        &mut self,
        employee_id: EmployeeId,
        date: NaiveDate,
        code: &str,
    ) -> ScheduleResult<CellEdit> {
        if code.trim().is_empty() {
            return self.clear_cell(employee_id, date).map(CellEdit::Cleared);
        }

        let employee = self.employee(employee_id)?.clone();
        let shift = self
            .catalog
            .lookup_ignore_case(code)
            .ok_or_else(|| ScheduleError::UnknownShift(code.trim().to_string()))?;

        let entry = ScheduleEntry::new(&employee, date, shift, EntryOrigin::Manual);
        self.store.upsert(entry.clone());

        let mut follow_on_off = None;
        if entry.shift_code == FOLLOW_ON_OFF_TRIGGER {
            if let Some(off) = assignment::follow_on_off(&employee, date, &self.store, &self.catalog) {
                follow_on_off = Some(off.date);
                self.store.upsert(off);
            }
        }

        tracing::debug!(employee_id, %date, shift = %entry.shift_code, "cell set");
        Ok(CellEdit::Set { entry, follow_on_off })
    }

    /// エントリが無ければ何もしない
    pub fn clear_cell(
        &mut self,
        employee_id: EmployeeId,
        date: NaiveDate,
    ) -> ScheduleResult<Option<ScheduleEntry>> {
        self.employee(employee_id)?;
        let removed = self.store.remove(employee_id, date);
        tracing::debug!(employee_id, %date, removed = removed.is_some(), "cell cleared");
        Ok(removed)
    }

    /// 期間を休暇 (L) で埋める。表示中の月の外の日付は無視する
    pub fn add_leave(
        &mut self,
        employee_id: EmployeeId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ScheduleResult<usize> {
        self.fill_range(employee_id, start, end, LEAVE_CODE)
    }

    /// 期間を週休 (WO) で埋める。表示中の月の外の日付は無視する
    pub fn add_week_off(
        &mut self,
        employee_id: EmployeeId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ScheduleResult<usize> {
        self.fill_range(employee_id, start, end, WEEK_OFF_CODE)
    }

    fn fill_range(
        &mut self,
        employee_id: EmployeeId,
        start: NaiveDate,
        end: NaiveDate,
        code: &str,
    ) -> ScheduleResult<usize> {
        if start > end {
            return Err(ScheduleError::Validation(format!(
                "start date {start} is after end date {end}"
            )));
        }
        let employee = self.employee(employee_id)?.clone();
        let shift = self.catalog.require(code)?.clone();

        // 表示中の月に切り詰める
        let month = self.current_month;
        let from = start.max(month.first_day());
        let to = end.min(month.last_day());

        let entries: Vec<ScheduleEntry> = from
            .iter_days()
            .take_while(|d| *d <= to)
            .map(|d| ScheduleEntry::new(&employee, d, &shift, EntryOrigin::Manual))
            .collect();
        let written = self.store.upsert_all(entries);

        tracing::info!(employee_id, shift = code, %month, written, "range filled");
        Ok(written)
    }

    // =====================
    // 月の移動
    // =====================

    /// 翌月へ移動する
    ///
    /// 移動元の月にエントリがあり、移動先が空のときだけ翌月を自動生成する。
    /// 生成したエントリ数を返す。
    pub fn advance_month(&mut self) -> ScheduleResult<usize> {
        let leaving = self.current_month;
        let target = leaving
            .next()
            .ok_or(ScheduleError::MonthOutOfRange(leaving))?;

        let mut generated = 0;
        if !self.store.has_entries_in(leaving) {
            tracing::debug!(month = %leaving, "no entries to continue from");
        } else if self.store.has_entries_in(target) {
            tracing::warn!(month = %target, "target month already has entries, generation skipped");
        } else {
            let patterns = self.analyze_patterns(leaving);
            let entries = generate_month(&self.employees, &patterns, target, &self.catalog);
            generated = self.store.upsert_all(entries);
        }

        self.current_month = target;
        tracing::info!(from = %leaving, to = %target, generated, "advanced month");
        Ok(generated)
    }

    /// 前月へ移動する (表示のみ)
    pub fn previous_month(&mut self) -> ScheduleResult<MonthKey> {
        let target = self
            .current_month
            .prev()
            .ok_or(ScheduleError::MonthOutOfRange(self.current_month))?;
        self.current_month = target;
        Ok(target)
    }

    // =====================
    // 解析・割り当て
    // =====================

    /// 勤務エントリのない従業員は結果に含まれない
    pub fn analyze_patterns(&self, month: MonthKey) -> BTreeMap<EmployeeId, RotationDescriptor> {
        self.employees
            .iter()
            .filter_map(|employee| {
                let entries = self.store.entries_for_employee_in_month(employee.id, month);
                analyze_rotation(entries, &self.catalog).map(|d| (employee.id, d))
            })
            .collect()
    }

    pub fn plan_assignment(&self, request: &AssignmentRequest) -> ScheduleResult<AssignmentPlan> {
        let employee = self.employee(request.employee_id)?;
        assignment::plan_assignment(request, employee, &self.store, &self.catalog)
    }

    pub fn commit_assignment(
        &mut self,
        plan: AssignmentPlan,
        overwrite_confirmed: bool,
    ) -> ScheduleResult<AssignmentOutcome> {
        let employee = self.employee(plan.employee_id)?.clone();
        assignment::commit_assignment(
            plan,
            overwrite_confirmed,
            &employee,
            &mut self.store,
            &self.catalog,
        )
    }

    /// 当月の残りを自動で埋め、入れたエントリの日付を返す
    pub fn auto_fill_remaining(
        &mut self,
        employee_id: EmployeeId,
        month: MonthKey,
    ) -> ScheduleResult<Vec<NaiveDate>> {
        let employee = self.employee(employee_id)?;
        let entries = fill_month_remainder(employee, month, &self.store, &self.catalog);
        let dates: Vec<NaiveDate> = entries.iter().map(|e| e.date).collect();
        self.store.upsert_all(entries);

        tracing::info!(employee_id, %month, filled = dates.len(), "auto-filled month remainder");
        Ok(dates)
    }

    /// 順番割り当てで月を埋める (既存エントリは置き換え)
    ///
    /// 従業員の順序は登録順。埋まったマス ((従業員, 日付) の組) の数を返す。
    pub fn generate_round_robin(
        &mut self,
        request: &RoundRobinRequest,
        employee_ids: &[EmployeeId],
    ) -> ScheduleResult<usize> {
        for id in employee_ids {
            self.employee(*id)?;
        }
        let selected: Vec<Employee> = self
            .employees
            .iter()
            .filter(|e| employee_ids.contains(&e.id))
            .cloned()
            .collect();

        let entries = round_robin::generate_round_robin(request, &selected, &self.catalog)?;
        // 従業員よりシフトが多いと同じマスに複数回書く (後勝ち)
        let written = entries.iter().map(ScheduleEntry::key).collect::<BTreeSet<_>>().len();
        self.store.upsert_all(entries);

        tracing::info!(month = %request.month, employees = selected.len(), written, "round-robin generated");
        Ok(written)
    }

    // =====================
    // 表示・永続化
    // =====================

    pub fn month_summary(&self, month: MonthKey) -> MonthSummary {
        MonthSummary::collect(&self.store, month, &self.catalog)
    }

    pub fn month_grid(&self, month: MonthKey) -> MonthGrid {
        MonthGrid::build(&self.store, month, &self.employees)
    }

    /// 1か月分の全エントリ (キー順)
    pub fn month_entries(&self, month: MonthKey) -> Vec<ScheduleEntry> {
        self.store.month_entries(month).into_iter().cloned().collect()
    }

    /// 保存済みの1か月分で置き換える
    pub fn replace_month(&mut self, month: MonthKey, entries: Vec<ScheduleEntry>) -> usize {
        self.store.remove_where(|e| month.contains(e.date));
        self.store
            .upsert_all(entries.into_iter().filter(|e| month.contains(e.date)))
    }
}
