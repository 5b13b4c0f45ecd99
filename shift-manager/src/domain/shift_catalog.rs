use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

// =====================
// 固定シフトコード
// =====================

pub const LEAVE_CODE: &str = "L";
pub const WEEK_OFF_CODE: &str = "WO";
pub const OFF_CODE: &str = "OFF";
/// 翌日に OFF が自動で入るシフト
pub const FOLLOW_ON_OFF_TRIGGER: &str = "AU";
pub const IST_CODE: &str = "IST";

/// エンジンが自分で書き込むため、カタログから外せないコード
pub const RESERVED_CODES: [&str; 3] = [LEAVE_CODE, WEEK_OFF_CODE, OFF_CODE];

pub fn is_reserved_code(code: &str) -> bool {
    RESERVED_CODES.contains(&code)
}

/// シフトの区分 (ローテーションの交代はこの区分で決まる)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftCategory {
    Morning,
    Night,
    Off,
}

impl ShiftCategory {
    /// morning <-> night. off は交代の対象外
    pub fn opposite(self) -> Option<ShiftCategory> {
        match self {
            ShiftCategory::Morning => Some(ShiftCategory::Night),
            ShiftCategory::Night => Some(ShiftCategory::Morning),
            ShiftCategory::Off => None,
        }
    }

    pub fn is_working(self) -> bool {
        !matches!(self, ShiftCategory::Off)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShiftCategory::Morning => "morning",
            ShiftCategory::Night => "night",
            ShiftCategory::Off => "off",
        }
    }
}

impl fmt::Display for ShiftCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShiftCategory {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(ShiftCategory::Morning),
            "night" => Ok(ShiftCategory::Night),
            "off" => Ok(ShiftCategory::Off),
            other => Err(ScheduleError::Validation(format!(
                "unknown shift category '{other}' (expected morning, night or off)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftDefinition {
    pub code: String,
    pub name: String,
    /// "#RRGGBB"
    pub color: String,
    pub time: String,
    pub category: ShiftCategory,
}

impl ShiftDefinition {
    pub fn new(name: &str, code: &str, time: &str, color: &str, category: ShiftCategory) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            color: color.to_string(),
            time: time.to_string(),
            category,
        }
    }

    /// コードと名前は必須。色は "#RRGGBB"
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.code.trim().is_empty() || self.code.contains(char::is_whitespace) {
            return Err(ScheduleError::Validation(format!(
                "shift code '{}' must be non-empty without spaces",
                self.code
            )));
        }
        if self.name.trim().is_empty() {
            return Err(ScheduleError::Validation(String::from("shift name is required")));
        }
        let hex = self.color.strip_prefix('#').unwrap_or("");
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ScheduleError::Validation(format!(
                "color '{}' must look like #RRGGBB",
                self.color
            )));
        }
        Ok(())
    }
}

/// シフト定義の一覧 (セッション中は読み取り専用)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShiftCatalog {
    shifts: Vec<ShiftDefinition>,
}

impl Default for ShiftCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl ShiftCatalog {
    /// コードの重複を許さない
    pub fn new(shifts: Vec<ShiftDefinition>) -> Result<Self, ScheduleError> {
        for (i, shift) in shifts.iter().enumerate() {
            if shifts[..i].iter().any(|s| s.code == shift.code) {
                return Err(ScheduleError::DuplicateShiftCode(shift.code.clone()));
            }
        }
        Ok(Self { shifts })
    }

    /// Excel出力や手入力のコードと互換のある標準カタログ
    pub fn standard() -> Self {
        use ShiftCategory::*;

        Self {
            shifts: vec![
                ShiftDefinition::new("IST Shift", "IST", "03:00PM-12:00AM", "#4CAF50", Morning),
                ShiftDefinition::new("US Shift", "US", "11:30AM-08:30PM", "#E91E63", Morning),
                ShiftDefinition::new("AU Shift", "AU", "03:30AM-11:30AM", "#2196F3", Night),
                ShiftDefinition::new("IST Shift Lead", "IST-L", "03:00PM-12:00AM", "#2E7D32", Morning),
                ShiftDefinition::new("AU Shift Lead", "AU-L", "03:30AM-11:30AM", "#1565C0", Night),
                ShiftDefinition::new("AU Patching", "AU-P", "03:30AM-11:30AM", "#FF5722", Night),
                ShiftDefinition::new("US Patching", "US-P", "11:30AM-08:30PM", "#FF6B35", Morning),
                ShiftDefinition::new("KT-AU Patching", "KT-AU", "03:30AM-11:30AM", "#795548", Night),
                ShiftDefinition::new("Leave", LEAVE_CODE, "---", "#dc3545", Off),
                ShiftDefinition::new("Week Off", WEEK_OFF_CODE, "---", "#9C27B0", Off),
                ShiftDefinition::new("Off", OFF_CODE, "---", "#607D8B", Off),
            ],
        }
    }

    pub fn lookup(&self, code: &str) -> Option<&ShiftDefinition> {
        self.shifts.iter().find(|s| s.code == code)
    }

    /// 手入力セル用 (大文字小文字を区別しない)
    pub fn lookup_ignore_case(&self, code: &str) -> Option<&ShiftDefinition> {
        let code = code.trim();
        self.shifts.iter().find(|s| s.code.eq_ignore_ascii_case(code))
    }

    pub fn require(&self, code: &str) -> Result<&ShiftDefinition, ScheduleError> {
        self.lookup(code)
            .ok_or_else(|| ScheduleError::UnknownShift(code.to_string()))
    }

    pub fn by_category(&self, category: ShiftCategory) -> Vec<&ShiftDefinition> {
        self.shifts.iter().filter(|s| s.category == category).collect()
    }

    /// カタログに載っていないコードは勤務扱い
    pub fn is_off_code(&self, code: &str) -> bool {
        self.lookup(code)
            .map(|s| !s.category.is_working())
            .unwrap_or(false)
    }

    /// 反対区分の先頭のシフトコードを返す
    ///
    /// 反対区分が存在しない、または off 区分の場合は同じコードのまま
    pub fn alternate(&self, code: &str) -> String {
        self.lookup(code)
            .and_then(|s| s.category.opposite())
            .and_then(|opposite| self.by_category(opposite).first().map(|s| s.code.clone()))
            .unwrap_or_else(|| code.to_string())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShiftDefinition> {
        self.shifts.iter()
    }

    pub fn codes(&self) -> Vec<&str> {
        self.shifts.iter().map(|s| s.code.as_str()).collect()
    }

    pub fn definitions(&self) -> &[ShiftDefinition] {
        &self.shifts
    }
}

#[cfg(test)]
mod shift_catalog_tests {
    use super::*;

    #[test]
    fn standard_catalog_has_eleven_unique_codes() {
        let catalog = ShiftCatalog::standard();
        assert_eq!(
            catalog.codes(),
            vec!["IST", "US", "AU", "IST-L", "AU-L", "AU-P", "US-P", "KT-AU", "L", "WO", "OFF"]
        );
        assert!(ShiftCatalog::new(catalog.iter().cloned().collect()).is_ok());
    }

    #[test]
    fn duplicate_codes_are_rejected() {
        let mut shifts: Vec<ShiftDefinition> = ShiftCatalog::standard().iter().cloned().collect();
        shifts.push(shifts[0].clone());

        let r = ShiftCatalog::new(shifts);
        assert_eq!(r, Err(ScheduleError::DuplicateShiftCode("IST".to_string())));
    }

    #[test]
    fn alternate_flips_between_morning_and_night() {
        let catalog = ShiftCatalog::standard();
        assert_eq!(catalog.alternate("IST"), "AU");
        assert_eq!(catalog.alternate("US-P"), "AU");
        assert_eq!(catalog.alternate("KT-AU"), "IST");
        // off区分と未知のコードは変わらない
        assert_eq!(catalog.alternate("WO"), "WO");
        assert_eq!(catalog.alternate("XYZ"), "XYZ");
    }

    #[test]
    fn alternate_falls_back_to_same_code_without_opposite_category() {
        let catalog = ShiftCatalog::new(vec![
            ShiftDefinition::new("Day", "D", "09-17", "#000000", ShiftCategory::Morning),
            ShiftDefinition::new("Off", "OFF", "---", "#111111", ShiftCategory::Off),
        ])
        .unwrap();

        assert_eq!(catalog.alternate("D"), "D");
    }

    #[test]
    fn definition_validation() {
        let ok = ShiftDefinition::new("Day", "D", "09-17", "#00aaFF", ShiftCategory::Morning);
        assert_eq!(ok.validate(), Ok(()));

        let mut bad = ok.clone();
        bad.code = "D 1".to_string();
        assert!(bad.validate().is_err());

        let mut bad = ok.clone();
        bad.color = "blue".to_string();
        assert!(bad.validate().is_err());

        let mut bad = ok;
        bad.name = " ".to_string();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn category_parse_and_reserved_codes() {
        assert_eq!("Night".parse::<ShiftCategory>(), Ok(ShiftCategory::Night));
        assert!("evening".parse::<ShiftCategory>().is_err());
        assert_eq!(ShiftCategory::Off.to_string(), "off");

        assert!(is_reserved_code("WO"));
        assert!(!is_reserved_code("AU"));
    }

    #[test]
    fn off_codes() {
        let catalog = ShiftCatalog::standard();
        assert!(catalog.is_off_code("L"));
        assert!(catalog.is_off_code("WO"));
        assert!(catalog.is_off_code("OFF"));
        assert!(!catalog.is_off_code("AU"));
        assert!(catalog.lookup_ignore_case(" au-l ").is_some());
        assert!(catalog.lookup("au-l").is_none());
    }
}
