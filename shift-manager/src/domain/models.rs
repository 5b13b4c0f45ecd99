// =====================
// ドメインモデル定義
// =====================

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::domain::shift_catalog::ShiftDefinition;
use crate::domain::timetable_model::EntryStatus;
use crate::error::ScheduleError;

pub type EmployeeId = i64;

/// 固定の週休 (2曜日) パターン
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeekOffPattern {
    #[serde(rename = "sat-sun")]
    SatSun,
    #[serde(rename = "mon-tue")]
    MonTue,
    #[serde(rename = "thu-fri")]
    ThuFri,
}

impl WeekOffPattern {
    pub fn weekdays(self) -> [Weekday; 2] {
        match self {
            WeekOffPattern::SatSun => [Weekday::Sun, Weekday::Sat],
            WeekOffPattern::MonTue => [Weekday::Mon, Weekday::Tue],
            WeekOffPattern::ThuFri => [Weekday::Thu, Weekday::Fri],
        }
    }

    /// 0=日曜 .. 6=土曜 の番号
    pub fn day_numbers(self) -> [u32; 2] {
        self.weekdays().map(|d| d.num_days_from_sunday())
    }

    pub fn is_week_off(self, date: NaiveDate) -> bool {
        self.weekdays().contains(&date.weekday())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WeekOffPattern::SatSun => "sat-sun",
            WeekOffPattern::MonTue => "mon-tue",
            WeekOffPattern::ThuFri => "thu-fri",
        }
    }
}

impl fmt::Display for WeekOffPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeekOffPattern {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sat-sun" => Ok(WeekOffPattern::SatSun),
            "mon-tue" => Ok(WeekOffPattern::MonTue),
            "thu-fri" => Ok(WeekOffPattern::ThuFri),
            other => Err(ScheduleError::Validation(format!(
                "unknown week-off pattern '{other}' (expected sat-sun, mon-tue or thu-fri)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub position: String,
    pub week_off_pattern: WeekOffPattern,
    pub working_hours: u32,
}

/// 追加フォームの入力 (idは未割り当て)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEmployee {
    pub name: String,
    pub position: String,
    pub week_off_pattern: WeekOffPattern,
    pub working_hours: u32,
}

impl NewEmployee {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.name.trim().is_empty() {
            return Err(ScheduleError::Validation(String::from("employee name is required")));
        }
        if self.working_hours == 0 {
            return Err(ScheduleError::Validation(String::from(
                "working hours must be greater than zero",
            )));
        }
        Ok(())
    }

    pub fn with_id(self, id: EmployeeId) -> Employee {
        Employee {
            id,
            name: self.name.trim().to_string(),
            position: self.position,
            week_off_pattern: self.week_off_pattern,
            working_hours: self.working_hours,
        }
    }
}

// =====================
// 月キー
// =====================

/// 暦月 ("m/yyyy" 文字列キーの置き換え)
///
/// 常に月の1日を保持する
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey {
    first: NaiveDate,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|first| Self { first })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self { first: date.with_day(1).unwrap_or(date) }
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    /// 1-12
    pub fn month(&self) -> u32 {
        self.first.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    pub fn last_day(&self) -> NaiveDate {
        self.first
            .with_day(self.days_in_month())
            .unwrap_or(self.first)
    }

    pub fn days_in_month(&self) -> u32 {
        match self.month() {
            1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
            4 | 6 | 9 | 11 => 30,
            _ => {
                if NaiveDate::from_ymd_opt(self.year(), 2, 29).is_some() {
                    29
                } else {
                    28
                }
            }
        }
    }

    /// 月内のすべての日付 (1日から順に)
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let (year, month) = (self.year(), self.month());
        (1..=self.days_in_month()).filter_map(move |d| NaiveDate::from_ymd_opt(year, month, d))
    }

    pub fn date(&self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year(), self.month(), day)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year() && date.month() == self.month()
    }

    pub fn next(&self) -> Option<Self> {
        if self.month() == 12 {
            Self::new(self.year() + 1, 1)
        } else {
            Self::new(self.year(), self.month() + 1)
        }
    }

    pub fn prev(&self) -> Option<Self> {
        if self.month() == 1 {
            Self::new(self.year() - 1, 12)
        } else {
            Self::new(self.year(), self.month() - 1)
        }
    }

    /// 旧フロントエンド形式 "m/yyyy"
    pub fn legacy_key(&self) -> String {
        format!("{}/{}", self.month(), self.year())
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for MonthKey {
    type Err = ScheduleError;

    /// "yyyy-mm" と "m/yyyy" を受け付ける
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parsed = if let Some((y, m)) = s.split_once('-') {
            y.parse::<i32>().ok().zip(m.parse::<u32>().ok())
        } else if let Some((m, y)) = s.split_once('/') {
            y.parse::<i32>().ok().zip(m.parse::<u32>().ok())
        } else {
            None
        };

        parsed
            .and_then(|(year, month)| MonthKey::new(year, month))
            .ok_or_else(|| ScheduleError::Validation(format!("invalid month '{s}'")))
    }
}

impl TryFrom<String> for MonthKey {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MonthKey> for String {
    fn from(value: MonthKey) -> Self {
        value.to_string()
    }
}

// =====================
// スケジュールエントリ
// =====================

/// 手入力か自動生成か
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryOrigin {
    Manual,
    Auto,
}

/// (employee_id, date) で一意なスケジュールの1マス
///
/// シフト名・色・時間はカタログから非正規化してコピーする。
/// 変更はせず、置き換え (削除→挿入) のみ行う。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub employee_id: EmployeeId,
    pub date: NaiveDate,
    pub shift_code: String,
    pub shift_name: String,
    pub shift_color: String,
    pub hours: u32,
    pub origin: EntryOrigin,
    /// コードから決まらない保存状態 (holiday など)。無ければコードから決める
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EntryStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ScheduleEntry {
    /// off区分のシフトは 0 時間、それ以外は従業員の標準時間
    pub fn new(
        employee: &Employee,
        date: NaiveDate,
        shift: &ShiftDefinition,
        origin: EntryOrigin,
    ) -> Self {
        let hours = if shift.category.is_working() {
            employee.working_hours
        } else {
            0
        };

        Self {
            employee_id: employee.id,
            date,
            shift_code: shift.code.clone(),
            shift_name: shift.name.clone(),
            shift_color: shift.color.clone(),
            hours,
            origin,
            status: None,
            notes: None,
        }
    }

    pub fn key(&self) -> (EmployeeId, NaiveDate) {
        (self.employee_id, self.date)
    }

    pub fn month(&self) -> MonthKey {
        MonthKey::of(self.date)
    }

    pub fn is_auto(&self) -> bool {
        matches!(self.origin, EntryOrigin::Auto)
    }

    /// 旧フロントエンド形式 "d/m/yyyy"
    pub fn legacy_date(&self) -> String {
        format!("{}/{}/{}", self.date.day(), self.date.month(), self.date.year())
    }
}
