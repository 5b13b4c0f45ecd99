use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::error::ScheduleError;

/// 日付文字列を解釈する
///
/// "2025-09-01" (ISO) と、旧フロントエンド形式の "1/9/2025" (d/m/yyyy) を受け付ける
pub fn parse_date(input: &str) -> Result<NaiveDate, ScheduleError> {
    let s = input.trim();

    // 1. ISO
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }

    // 2. d/m/yyyy
    let parts: Vec<&str> = s.split('/').collect();
    if let [d, m, y] = parts.as_slice() {
        let parsed = y
            .parse::<i32>()
            .ok()
            .zip(m.parse::<u32>().ok())
            .zip(d.parse::<u32>().ok())
            .and_then(|((y, m), d)| NaiveDate::from_ymd_opt(y, m, d));
        if let Some(date) = parsed {
            return Ok(date);
        }
    }

    Err(ScheduleError::Validation(format!(
        "invalid date '{s}' (expected yyyy-mm-dd or d/m/yyyy)"
    )))
}

/// 日の一覧 "3,7,10-12" を解釈する (1-31)
pub fn parse_day_list(input: &str) -> Result<BTreeSet<u32>, ScheduleError> {
    let invalid = |part: &str| ScheduleError::Validation(format!("invalid day '{part}'"));
    let mut days = BTreeSet::new();

    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (from, to) = match part.split_once('-') {
            Some((a, b)) => (a.trim(), b.trim()),
            None => (part, part),
        };
        let from: u32 = from.parse().map_err(|_| invalid(part))?;
        let to: u32 = to.parse().map_err(|_| invalid(part))?;

        if from == 0 || to > 31 || from > to {
            return Err(invalid(part));
        }
        days.extend(from..=to);
    }

    if days.is_empty() {
        return Err(ScheduleError::Validation(String::from("no days given")));
    }
    Ok(days)
}
