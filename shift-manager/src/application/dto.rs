use serde::Serialize;

use crate::domain::month_view::{MonthGrid, MonthSummary};
use crate::domain::shift_catalog::{ShiftCatalog, ShiftCategory};

/// 凡例の1行 (色付き表示用)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftLegendDto {
    pub code: String,
    pub name: String,
    pub color: String,
    pub time: String,
    pub category: ShiftCategory,
}

/// 1か月分の出力 (JSON)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthExportDto {
    pub grid: MonthGrid,
    pub summary: MonthSummary,
    pub legend: Vec<ShiftLegendDto>,
}

impl MonthExportDto {
    pub fn new(grid: MonthGrid, summary: MonthSummary, catalog: &ShiftCatalog) -> Self {
        let legend = catalog
            .iter()
            .map(|s| ShiftLegendDto {
                code: s.code.clone(),
                name: s.name.clone(),
                color: s.color.clone(),
                time: s.time.clone(),
                category: s.category,
            })
            .collect();

        Self { grid, summary, legend }
    }
}

// =====================
// CSV
// =====================

/// 表計算ソフトで数式として解釈される先頭文字
fn should_neutralize_csv(value: &str) -> bool {
    let trimmed = value.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('\'') {
        return false;
    }
    matches!(trimmed.chars().next(), Some('=' | '+' | '-' | '@'))
}

fn csv_escape(value: &str) -> String {
    let safe = if should_neutralize_csv(value) {
        format!("'{value}")
    } else {
        value.to_string()
    };

    if safe.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", safe.replace('"', "\"\""))
    } else {
        safe
    }
}

fn csv_line<'a, I: IntoIterator<Item = &'a str>>(cells: I) -> String {
    cells.into_iter().map(csv_escape).collect::<Vec<_>>().join(",")
}

/// 見出し + 従業員ごとの行。空きマスは空文字
pub fn to_csv(grid: &MonthGrid) -> String {
    let mut lines = vec![csv_line(grid.header.iter().map(String::as_str))];

    for row in &grid.rows {
        let cells = std::iter::once(row.employee_name.as_str())
            .chain(row.cells.iter().map(|c| c.as_deref().unwrap_or("")));
        lines.push(csv_line(cells));
    }

    let mut csv = lines.join("\n");
    csv.push('\n');
    csv
}
