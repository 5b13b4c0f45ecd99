use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::models::{EmployeeId, MonthKey, ScheduleEntry};

/// ストアの複合キー
pub type EntryKey = (EmployeeId, NaiveDate);

/// 全従業員・全月のスケジュールエントリを保持する
///
/// (employee_id, date) ごとに最大1件。キー順 (従業員→日付) に並ぶので、
/// 従業員×月の範囲取得はそのまま日付順になる。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ScheduleEntry>", into = "Vec<ScheduleEntry>")]
pub struct EntryStore {
    entries: BTreeMap<EntryKey, ScheduleEntry>,
    // 変更のたびに増える (plan の鮮度チェック用)
    revision: u64,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 同じキーの既存エントリを取り除いてから挿入する。置き換えたエントリを返す
    pub fn upsert(&mut self, entry: ScheduleEntry) -> Option<ScheduleEntry> {
        self.revision += 1;
        self.entries.insert(entry.key(), entry)
    }

    pub fn upsert_all<I: IntoIterator<Item = ScheduleEntry>>(&mut self, entries: I) -> usize {
        let mut count = 0;
        for entry in entries {
            self.upsert(entry);
            count += 1;
        }
        count
    }

    pub fn get(&self, employee_id: EmployeeId, date: NaiveDate) -> Option<&ScheduleEntry> {
        self.entries.get(&(employee_id, date))
    }

    pub fn contains(&self, employee_id: EmployeeId, date: NaiveDate) -> bool {
        self.entries.contains_key(&(employee_id, date))
    }

    pub fn remove(&mut self, employee_id: EmployeeId, date: NaiveDate) -> Option<ScheduleEntry> {
        let removed = self.entries.remove(&(employee_id, date));
        if removed.is_some() {
            self.revision += 1;
        }
        removed
    }

    /// 条件に一致するエントリをすべて削除し、削除件数を返す
    pub fn remove_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&ScheduleEntry) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !predicate(entry));
        let removed = before - self.entries.len();
        if removed > 0 {
            self.revision += 1;
        }
        removed
    }

    /// 従業員削除時の掃除
    pub fn remove_employee(&mut self, employee_id: EmployeeId) -> usize {
        self.remove_where(|e| e.employee_id == employee_id)
    }

    /// 任意のフィルタでの検索 (キー順)
    pub fn query(
        &self,
        employee_id: Option<EmployeeId>,
        month: Option<MonthKey>,
    ) -> Vec<&ScheduleEntry> {
        self.entries
            .values()
            .filter(|e| employee_id.map_or(true, |id| e.employee_id == id))
            .filter(|e| month.map_or(true, |m| m.contains(e.date)))
            .collect()
    }

    /// 日付の昇順で返す
    pub fn entries_for_employee_in_month(
        &self,
        employee_id: EmployeeId,
        month: MonthKey,
    ) -> Vec<&ScheduleEntry> {
        self.entries
            .range((employee_id, month.first_day())..=(employee_id, month.last_day()))
            .map(|(_, e)| e)
            .collect()
    }

    pub fn month_entries(&self, month: MonthKey) -> Vec<&ScheduleEntry> {
        self.query(None, Some(month))
    }

    pub fn has_entries_in(&self, month: MonthKey) -> bool {
        self.entries.values().any(|e| month.contains(e.date))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScheduleEntry> {
        self.entries.values()
    }
}

impl From<Vec<ScheduleEntry>> for EntryStore {
    fn from(entries: Vec<ScheduleEntry>) -> Self {
        let mut store = EntryStore::new();
        store.upsert_all(entries);
        store
    }
}

impl From<EntryStore> for Vec<ScheduleEntry> {
    fn from(store: EntryStore) -> Self {
        store.entries.into_values().collect()
    }
}
