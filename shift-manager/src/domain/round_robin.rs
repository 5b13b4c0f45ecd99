use chrono::{Datelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::domain::models::{Employee, EntryOrigin, MonthKey, ScheduleEntry};
use crate::domain::shift_catalog::ShiftCatalog;
use crate::error::{ScheduleError, ScheduleResult};

/// 週5日勤務なら土日を飛ばす
pub const FIVE_DAY_WEEK: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRobinRequest {
    pub month: MonthKey,
    pub shift_codes: Vec<String>,
    pub work_days_per_week: u32,
}

/// 単純な順番割り当てで1か月分を作る
///
/// d 日目の i 番目のシフトは `(d + i) % 従業員数` 番目の従業員に割り当てる。
/// 従業員よりシフトが多い日は同じ従業員に複数回当たり、後のシフトが残る。
pub fn generate_round_robin(
    request: &RoundRobinRequest,
    employees: &[Employee],
    catalog: &ShiftCatalog,
) -> ScheduleResult<Vec<ScheduleEntry>> {
    if employees.is_empty() {
        return Err(ScheduleError::Validation(String::from(
            "select at least one employee",
        )));
    }
    if request.shift_codes.is_empty() {
        return Err(ScheduleError::Validation(String::from("select at least one shift")));
    }

    let shifts = request
        .shift_codes
        .iter()
        .map(|code| {
            catalog
                .lookup_ignore_case(code)
                .ok_or_else(|| ScheduleError::UnknownShift(code.clone()))
        })
        .collect::<ScheduleResult<Vec<_>>>()?;

    let mut entries = Vec::new();
    for date in request.month.days() {
        if request.work_days_per_week == FIVE_DAY_WEEK
            && matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
        {
            continue;
        }

        let day = date.day() as usize;
        for (shift_index, shift) in shifts.iter().enumerate() {
            let employee = &employees[(day + shift_index) % employees.len()];
            entries.push(ScheduleEntry::new(employee, date, shift, EntryOrigin::Auto));
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod round_robin_tests {
    use super::*;
    use crate::domain::models::WeekOffPattern;

    fn staff(n: i64) -> Vec<Employee> {
        (1..=n)
            .map(|id| Employee {
                id,
                name: format!("emp{id}"),
                position: "Support".to_string(),
                week_off_pattern: WeekOffPattern::SatSun,
                working_hours: 9,
            })
            .collect()
    }

    fn request(codes: &[&str], work_days: u32) -> RoundRobinRequest {
        RoundRobinRequest {
            // 2025-09-01 は月曜
            month: MonthKey::new(2025, 9).unwrap(),
            shift_codes: codes.iter().map(|c| c.to_string()).collect(),
            work_days_per_week: work_days,
        }
    }

    #[test]
    fn rotates_employees_by_day_and_shift_index() {
        let catalog = ShiftCatalog::standard();
        let entries = generate_round_robin(&request(&["IST", "AU"], 7), &staff(3), &catalog).unwrap();

        assert_eq!(entries.len(), 30 * 2);
        // 1日: IST -> (1+0)%3 = 2番目 (id 2), AU -> (1+1)%3 = id 3
        assert_eq!((entries[0].employee_id, entries[0].shift_code.as_str()), (2, "IST"));
        assert_eq!((entries[1].employee_id, entries[1].shift_code.as_str()), (3, "AU"));
        // 2日: IST -> id 3, AU -> id 1
        assert_eq!(entries[2].employee_id, 3);
        assert_eq!(entries[3].employee_id, 1);
        assert!(entries.iter().all(|e| e.is_auto() && e.hours == 9));
    }

    #[test]
    fn five_day_week_skips_weekends() {
        let catalog = ShiftCatalog::standard();
        let entries = generate_round_robin(&request(&["US"], 5), &staff(2), &catalog).unwrap();

        // 2025年9月の平日は 22 日
        assert_eq!(entries.len(), 22);
        assert!(entries
            .iter()
            .all(|e| !matches!(e.date.weekday(), Weekday::Sat | Weekday::Sun)));
    }

    #[test]
    fn rejects_empty_selection_and_unknown_codes() {
        let catalog = ShiftCatalog::standard();
        assert!(matches!(
            generate_round_robin(&request(&["IST"], 5), &[], &catalog),
            Err(ScheduleError::Validation(_))
        ));
        assert!(matches!(
            generate_round_robin(&request(&[], 5), &staff(1), &catalog),
            Err(ScheduleError::Validation(_))
        ));
        assert_eq!(
            generate_round_robin(&request(&["NOPE"], 5), &staff(1), &catalog),
            Err(ScheduleError::UnknownShift("NOPE".to_string()))
        );
    }
}
