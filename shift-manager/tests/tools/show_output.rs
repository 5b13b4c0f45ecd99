use shift_manager::domain::month_view::{MonthGrid, MonthSummary};
use shift_manager::domain::timetable_model::TimetableDocument;

pub fn show_month_grid_debug_data(grid: &MonthGrid) {
    println!("\n=======================================================");
    println!("🗓️ [DEBUG] シフト表 {} (計 {} 名)", grid.month, grid.rows.len());
    println!("=======================================================");

    for row in &grid.rows {
        // 未入力は "." で表示
        let cells: Vec<&str> = row
            .cells
            .iter()
            .map(|c| c.as_deref().unwrap_or("."))
            .collect();
        println!("👤 {:<12} | {}", row.employee_name, cells.join(" "));
    }
    println!("=======================================================\n");
}

pub fn show_month_summary_debug_data(summary: &MonthSummary) {
    println!(
        "📊 [DEBUG] 合計 {} / 勤務 {} / 休暇 {} / 週休 {} / AU {} / IST {}",
        summary.total_entries,
        summary.working_days,
        summary.leaves,
        summary.week_offs,
        summary.au_shifts,
        summary.ist_shifts
    );
}

pub fn show_timetable_debug_data(document: &TimetableDocument) {
    println!("\n=======================================================");
    println!(
        "📋 [DEBUG] タイムテーブル {} {}/{} (作成: {})",
        document.project_name, document.month, document.year, document.created_by
    );
    println!("=======================================================");
    for entry in &document.entries {
        println!(
            "   ┣ 従業員[{}] {} {:<6} {:<9} auto={}",
            entry.employee_id, entry.date, entry.shift_code, entry.status.as_str(), entry.is_auto_assigned
        );
    }
    println!("=======================================================\n");
}
