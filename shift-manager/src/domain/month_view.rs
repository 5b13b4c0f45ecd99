use serde::Serialize;

use crate::domain::entry_store::EntryStore;
use crate::domain::models::{Employee, MonthKey};
use crate::domain::shift_catalog::{
    ShiftCatalog, FOLLOW_ON_OFF_TRIGGER, IST_CODE, LEAVE_CODE, WEEK_OFF_CODE,
};

/// 月の集計 (画面上部のカウンタ)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthSummary {
    pub total_entries: usize,
    pub working_days: usize,
    pub leaves: usize,
    pub week_offs: usize,
    pub au_shifts: usize,
    pub ist_shifts: usize,
}

impl MonthSummary {
    pub fn collect(store: &EntryStore, month: MonthKey, catalog: &ShiftCatalog) -> Self {
        store
            .month_entries(month)
            .into_iter()
            .fold(MonthSummary::default(), |mut s, e| {
                let code = e.shift_code.as_str();
                s.total_entries += 1;
                if !catalog.is_off_code(code) {
                    s.working_days += 1;
                }
                match code {
                    LEAVE_CODE => s.leaves += 1,
                    WEEK_OFF_CODE => s.week_offs += 1,
                    FOLLOW_ON_OFF_TRIGGER => s.au_shifts += 1,
                    IST_CODE => s.ist_shifts += 1,
                    _ => {}
                }
                s
            })
    }
}

/// 従業員 × 日 のシフトコード表 (出力用)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthGrid {
    pub month: MonthKey,
    /// 先頭は "Employee Name"、以降は "1 Mon" のような日ごとの見出し
    pub header: Vec<String>,
    pub rows: Vec<GridRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRow {
    pub employee_name: String,
    /// 日ごとのシフトコード (未入力は `None`)
    pub cells: Vec<Option<String>>,
}

pub const NAME_COLUMN: &str = "Employee Name";

impl MonthGrid {
    pub fn build(store: &EntryStore, month: MonthKey, employees: &[Employee]) -> Self {
        let mut header = vec![NAME_COLUMN.to_string()];
        header.extend(month.days().map(|d| d.format("%-d %a").to_string()));

        let rows = employees
            .iter()
            .map(|employee| GridRow {
                employee_name: employee.name.clone(),
                cells: month
                    .days()
                    .map(|d| store.get(employee.id, d).map(|e| e.shift_code.clone()))
                    .collect(),
            })
            .collect();

        Self { month, header, rows }
    }
}

#[cfg(test)]
mod month_view_tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::models::{EntryOrigin, ScheduleEntry, WeekOffPattern};

    fn employee(id: i64, name: &str) -> Employee {
        Employee {
            id,
            name: name.to_string(),
            position: "Developer".to_string(),
            week_off_pattern: WeekOffPattern::SatSun,
            working_hours: 8,
        }
    }

    fn store_with(entries: &[(i64, u32, &str)]) -> EntryStore {
        let catalog = ShiftCatalog::standard();
        let mut store = EntryStore::new();
        for (id, day, code) in entries {
            store.upsert(ScheduleEntry::new(
                &employee(*id, "x"),
                NaiveDate::from_ymd_opt(2025, 9, *day).unwrap(),
                catalog.lookup(code).unwrap(),
                EntryOrigin::Manual,
            ));
        }
        store
    }

    #[test]
    fn summary_counts_by_code() {
        let store = store_with(&[
            (1, 1, "IST"),
            (1, 2, "AU"),
            (1, 3, "OFF"),
            (1, 6, "WO"),
            (2, 1, "L"),
            (2, 2, "AU-L"),
        ]);
        let summary = MonthSummary::collect(&store, MonthKey::new(2025, 9).unwrap(), &ShiftCatalog::standard());

        assert_eq!(
            summary,
            MonthSummary {
                total_entries: 6,
                working_days: 3,
                leaves: 1,
                week_offs: 1,
                au_shifts: 1,
                ist_shifts: 1,
            }
        );
    }

    #[test]
    fn grid_has_name_column_and_one_column_per_day() {
        let store = store_with(&[(1, 1, "IST"), (2, 30, "AU")]);
        let employees = vec![employee(1, "Alice"), employee(2, "Bob")];

        let grid = MonthGrid::build(&store, MonthKey::new(2025, 9).unwrap(), &employees);

        assert_eq!(grid.header.len(), 31);
        assert_eq!(grid.header[0], "Employee Name");
        assert_eq!(grid.header[1], "1 Mon");
        assert_eq!(grid.rows[0].employee_name, "Alice");
        assert_eq!(grid.rows[0].cells[0].as_deref(), Some("IST"));
        assert_eq!(grid.rows[0].cells[1], None);
        assert_eq!(grid.rows[1].cells[29].as_deref(), Some("AU"));
    }
}
