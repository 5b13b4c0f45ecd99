// =====================
// 保存用のタイムテーブル文書
// =====================
//
// {month, year, projectName, entries: [{employeeId, date, shiftCode, status}], createdBy}
// (month, year, projectName) ごとに1件。保存は月単位の全置き換え。

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::models::{Employee, EmployeeId, EntryOrigin, MonthKey, ScheduleEntry};
use crate::domain::shift_catalog::{ShiftCatalog, LEAVE_CODE};
use crate::error::ScheduleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Scheduled,
    Off,
    Leave,
    Holiday,
}

impl EntryStatus {
    /// L は leave、その他の off 区分は off、勤務シフトは scheduled
    pub fn for_code(code: &str, catalog: &ShiftCatalog) -> Self {
        if code == LEAVE_CODE {
            EntryStatus::Leave
        } else if catalog.is_off_code(code) {
            EntryStatus::Off
        } else {
            EntryStatus::Scheduled
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntryStatus::Scheduled => "scheduled",
            EntryStatus::Off => "off",
            EntryStatus::Leave => "leave",
            EntryStatus::Holiday => "holiday",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryStatus {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(EntryStatus::Scheduled),
            "off" => Ok(EntryStatus::Off),
            "leave" => Ok(EntryStatus::Leave),
            "holiday" => Ok(EntryStatus::Holiday),
            other => Err(ScheduleError::Validation(format!("unknown entry status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableEntryRecord {
    pub employee_id: EmployeeId,
    pub date: NaiveDate,
    pub shift_code: String,
    pub status: EntryStatus,
    pub is_auto_assigned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TimetableEntryRecord {
    pub fn from_entry(entry: &ScheduleEntry, catalog: &ShiftCatalog) -> Self {
        Self {
            employee_id: entry.employee_id,
            date: entry.date,
            shift_code: entry.shift_code.clone(),
            status: entry
                .status
                .unwrap_or_else(|| EntryStatus::for_code(&entry.shift_code, catalog)),
            is_auto_assigned: entry.is_auto(),
            notes: entry.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableDocument {
    /// 1-12
    pub month: u32,
    pub year: i32,
    pub project_name: String,
    pub entries: Vec<TimetableEntryRecord>,
    pub created_by: String,
}

/// 一覧表示用
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableSummary {
    pub id: i64,
    pub month: MonthKey,
    pub project_name: String,
    pub created_by: String,
    pub entry_count: i64,
}

impl TimetableDocument {
    pub fn from_month<'a, I>(
        month: MonthKey,
        project_name: &str,
        created_by: &str,
        entries: I,
        catalog: &ShiftCatalog,
    ) -> Self
    where
        I: IntoIterator<Item = &'a ScheduleEntry>,
    {
        Self {
            month: month.month(),
            year: month.year(),
            project_name: project_name.to_string(),
            entries: entries
                .into_iter()
                .filter(|e| month.contains(e.date))
                .map(|e| TimetableEntryRecord::from_entry(e, catalog))
                .collect(),
            created_by: created_by.to_string(),
        }
    }

    pub fn month_key(&self) -> Result<MonthKey, ScheduleError> {
        MonthKey::new(self.year, self.month).ok_or_else(|| {
            ScheduleError::Validation(format!("invalid month {}/{}", self.month, self.year))
        })
    }

    /// エンジン用のエントリに戻す
    ///
    /// 登録されていない従業員やカタログにないコードの行は読み飛ばし、その件数を返す。
    /// コードから決まらない status と notes はエントリに残す。
    pub fn to_schedule_entries(
        &self,
        employees: &[Employee],
        catalog: &ShiftCatalog,
    ) -> (Vec<ScheduleEntry>, usize) {
        let mut entries = Vec::with_capacity(self.entries.len());
        let mut skipped = 0;

        for record in &self.entries {
            let employee = employees.iter().find(|e| e.id == record.employee_id);
            let shift = catalog.lookup(&record.shift_code);
            match (employee, shift) {
                (Some(employee), Some(shift)) => {
                    let origin = if record.is_auto_assigned {
                        EntryOrigin::Auto
                    } else {
                        EntryOrigin::Manual
                    };
                    let mut entry = ScheduleEntry::new(employee, record.date, shift, origin);
                    if record.status != EntryStatus::for_code(&record.shift_code, catalog) {
                        entry.status = Some(record.status);
                    }
                    entry.notes = record.notes.clone();
                    entries.push(entry);
                }
                _ => {
                    tracing::warn!(
                        employee_id = record.employee_id,
                        shift = %record.shift_code,
                        date = %record.date,
                        "stored entry cannot be restored, skipped"
                    );
                    skipped += 1;
                }
            }
        }

        (entries, skipped)
    }
}

#[cfg(test)]
mod timetable_model_tests {
    use super::*;
    use crate::domain::models::WeekOffPattern;

    #[test]
    fn status_follows_code() {
        let catalog = ShiftCatalog::standard();
        assert_eq!(EntryStatus::for_code("L", &catalog), EntryStatus::Leave);
        assert_eq!(EntryStatus::for_code("WO", &catalog), EntryStatus::Off);
        assert_eq!(EntryStatus::for_code("OFF", &catalog), EntryStatus::Off);
        assert_eq!(EntryStatus::for_code("KT-AU", &catalog), EntryStatus::Scheduled);
        assert_eq!("holiday".parse::<EntryStatus>(), Ok(EntryStatus::Holiday));
        assert!("busy".parse::<EntryStatus>().is_err());
    }

    #[test]
    fn document_keeps_only_its_month_and_restores_entries() {
        let catalog = ShiftCatalog::standard();
        let alice = Employee {
            id: 1,
            name: "Alice".to_string(),
            position: "Developer".to_string(),
            week_off_pattern: WeekOffPattern::SatSun,
            working_hours: 8,
        };
        let sept = MonthKey::new(2025, 9).unwrap();
        let au = catalog.lookup("AU").unwrap();
        let entries = vec![
            ScheduleEntry::new(&alice, sept.date(1).unwrap(), au, EntryOrigin::Manual),
            ScheduleEntry::new(&alice, sept.date(2).unwrap(), catalog.lookup("OFF").unwrap(), EntryOrigin::Auto),
            ScheduleEntry::new(&alice, NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(), au, EntryOrigin::Manual),
        ];

        let mut doc = TimetableDocument::from_month(sept, "Ops", "admin", &entries, &catalog);
        assert_eq!((doc.month, doc.year), (9, 2025));
        assert_eq!(doc.entries.len(), 2);
        assert_eq!(doc.entries[1].status, EntryStatus::Off);
        assert!(doc.entries[1].is_auto_assigned);

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["projectName"], "Ops");
        assert_eq!(json["entries"][0]["shiftCode"], "AU");

        // 削除済みの従業員の行は読み飛ばす
        doc.entries[1].employee_id = 99;
        let (restored, skipped) = doc.to_schedule_entries(&[alice], &catalog);
        assert_eq!(restored, entries[..1].to_vec());
        assert_eq!(skipped, 1);
    }

    #[test]
    fn holiday_status_and_notes_survive_restore() {
        let catalog = ShiftCatalog::standard();
        let bob = Employee {
            id: 2,
            name: "Bob".to_string(),
            position: "Support".to_string(),
            week_off_pattern: WeekOffPattern::SatSun,
            working_hours: 8,
        };
        let sept = MonthKey::new(2025, 9).unwrap();
        let stored = TimetableDocument {
            month: 9,
            year: 2025,
            project_name: "Ops".to_string(),
            entries: vec![
                TimetableEntryRecord {
                    employee_id: 2,
                    date: sept.date(1).unwrap(),
                    shift_code: "OFF".to_string(),
                    status: EntryStatus::Holiday,
                    is_auto_assigned: false,
                    notes: Some("national holiday".to_string()),
                },
                TimetableEntryRecord {
                    employee_id: 2,
                    date: sept.date(2).unwrap(),
                    shift_code: "IST".to_string(),
                    status: EntryStatus::Scheduled,
                    is_auto_assigned: false,
                    notes: None,
                },
            ],
            created_by: "admin".to_string(),
        };

        let (restored, skipped) = stored.to_schedule_entries(&[bob], &catalog);
        assert_eq!(skipped, 0);
        assert_eq!(restored[0].status, Some(EntryStatus::Holiday));
        assert_eq!(restored[1].status, None);

        // 読み込み → 保存で元の文書に戻る
        let saved = TimetableDocument::from_month(sept, "Ops", "admin", &restored, &catalog);
        assert_eq!(saved, stored);
    }
}
