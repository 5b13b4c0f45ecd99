// =====================
// 永続化とエンジンをつなぐコマンド
// =====================

use std::collections::BTreeMap;
use std::fs;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::application::config::DatabaseConfig;
use crate::application::dto::to_csv;
use crate::domain::models::{Employee, EmployeeId, MonthKey, NewEmployee};
use crate::domain::schedule_engine::ScheduleEngine;
use crate::domain::shift_catalog::{is_reserved_code, ShiftCatalog, ShiftDefinition};
use crate::domain::timetable_model::{TimetableDocument, TimetableSummary};
use crate::error::{AppError, RepositoryError, ScheduleError};
use crate::AppServices;

/// DBファイル (無ければ作る) に接続し、マイグレーションを流す
pub async fn open_services(config: &DatabaseConfig) -> Result<AppServices, AppError> {
    // --- ディレクトリ作成（冪等） ---
    if let Some(dir) = config.path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(RepositoryError::from)?;
    }

    tracing::info!(path = %config.path.display(), "opening database");

    // --- DB 接続設定 ---
    let options = SqliteConnectOptions::new()
        .filename(&config.path)
        .create_if_missing(true);

    // --- DB 接続 ---
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .connect_with(options)
        .await
        .map_err(RepositoryError::from)?;

    // --- テーブル ---
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(RepositoryError::from)?;

    Ok(AppServices::new(pool))
}

// --- Employee Commands ---

/// DBに登録し、エンジンの従業員一覧を読み直す
pub async fn register_employee(
    services: &AppServices,
    engine: &mut ScheduleEngine,
    new_employee: NewEmployee,
) -> Result<Employee, AppError> {
    new_employee.validate()?;

    let employee = services.employees.create(&new_employee).await?;
    let employees = services.employees.list().await?;
    engine.load_employees(employees);

    Ok(employee)
}

/// DBとエンジンの両方から削除する。エンジン側で消えたエントリ数を返す
pub async fn remove_employee(
    services: &AppServices,
    engine: &mut ScheduleEngine,
    id: EmployeeId,
) -> Result<usize, AppError> {
    // 先に存在確認 (DBだけ消えるのを防ぐ)
    engine.employee(id)?;

    services.employees.delete(id).await?;
    let removed = engine.delete_employee(id)?;
    Ok(removed)
}

/// エンジンで検証してからDBを書き換える
pub async fn update_employee(
    services: &AppServices,
    engine: &mut ScheduleEngine,
    employee: Employee,
) -> Result<Employee, AppError> {
    let mut preview = engine.clone();
    let updated = preview.update_employee(employee)?;

    services.employees.update(&updated).await?;
    *engine = preview;
    Ok(updated)
}

/// エンジンの従業員一覧をDBに合わせる
///
/// 変わった行は更新、無い行は id を保って追加、エンジンから消えた従業員は
/// 全月のエントリごと削除する。
pub async fn sync_employees(services: &AppServices, engine: &ScheduleEngine) -> Result<(), AppError> {
    let mut stored: BTreeMap<EmployeeId, Employee> = services
        .employees
        .list()
        .await?
        .into_iter()
        .map(|e| (e.id, e))
        .collect();

    for employee in engine.employees() {
        match stored.remove(&employee.id) {
            Some(current) if &current == employee => {}
            Some(_) => services.employees.update(employee).await?,
            None => services.employees.upsert(employee).await?,
        }
    }

    for id in stored.into_keys() {
        let swept = services.employees.delete(id).await?;
        tracing::info!(employee_id = id, swept, "employee removed from store during sync");
    }
    Ok(())
}

// --- Shift Commands ---

/// DBのシフト定義からカタログを作る。未登録なら標準カタログ
pub async fn load_catalog(services: &AppServices) -> Result<ShiftCatalog, AppError> {
    let shifts = services.shifts.list().await?;
    if shifts.is_empty() {
        tracing::debug!("no stored shifts, using standard catalog");
        return Ok(ShiftCatalog::standard());
    }
    Ok(ShiftCatalog::new(shifts)?)
}

pub async fn add_shift(services: &AppServices, shift: &ShiftDefinition) -> Result<(), AppError> {
    shift.validate()?;
    services.shifts.create(shift).await?;
    Ok(())
}

pub async fn update_shift(services: &AppServices, shift: &ShiftDefinition) -> Result<(), AppError> {
    shift.validate()?;
    services.shifts.update(shift).await?;
    Ok(())
}

/// L / WO / OFF はエンジンが使うので外せない
pub async fn remove_shift(services: &AppServices, code: &str) -> Result<(), AppError> {
    if is_reserved_code(code) {
        return Err(ScheduleError::Validation(format!("shift code '{code}' is reserved")).into());
    }
    services.shifts.deactivate(code).await?;
    Ok(())
}

pub async fn initialize_default_shifts(services: &AppServices) -> Result<usize, AppError> {
    Ok(services.shifts.initialize_defaults().await?)
}

// --- Timetable Commands ---

/// 保存済みのシフト定義・従業員・指定月のタイムテーブルからエンジンを作る
pub async fn load_engine(
    services: &AppServices,
    project_name: &str,
    month: MonthKey,
) -> Result<ScheduleEngine, AppError> {
    let mut engine = ScheduleEngine::new(load_catalog(services).await?, month);
    pull_month(services, &mut engine, project_name, month).await?;
    Ok(engine)
}

/// DBのシフト定義・従業員一覧・指定月のエントリでエンジンを置き換える
///
/// 読み込んだエントリ数を返す。保存がなければ月は空になる。
pub async fn pull_month(
    services: &AppServices,
    engine: &mut ScheduleEngine,
    project_name: &str,
    month: MonthKey,
) -> Result<usize, AppError> {
    let catalog = load_catalog(services).await?;
    let employees = services.employees.list().await?;
    let document = services.timetables.find_month(project_name, month).await?;

    engine.replace_catalog(catalog);
    engine.load_employees(employees);
    let entries = match document {
        Some(doc) => {
            let (entries, skipped) = doc.to_schedule_entries(engine.employees(), engine.catalog());
            if skipped > 0 {
                tracing::warn!(project = project_name, %month, skipped, "some stored entries were skipped");
            }
            entries
        }
        None => Vec::new(),
    };

    let loaded = engine.replace_month(month, entries);
    tracing::info!(project = project_name, %month, loaded, "month loaded");
    Ok(loaded)
}

/// 指定月を丸ごと保存する (従業員も id を保って同期する)
pub async fn push_month(
    services: &AppServices,
    engine: &ScheduleEngine,
    project_name: &str,
    created_by: &str,
    month: MonthKey,
) -> Result<i64, AppError> {
    sync_employees(services, engine).await?;

    let entries = engine.month_entries(month);
    let document =
        TimetableDocument::from_month(month, project_name, created_by, &entries, engine.catalog());
    let id = services.timetables.save_month(&document).await?;
    Ok(id)
}

pub async fn save_current_month(
    services: &AppServices,
    engine: &ScheduleEngine,
    project_name: &str,
    created_by: &str,
) -> Result<i64, AppError> {
    push_month(services, engine, project_name, created_by, engine.current_month()).await
}

/// 保存済みの月 (新しい順)
pub async fn list_months(
    services: &AppServices,
    project_name: &str,
) -> Result<Vec<TimetableSummary>, AppError> {
    Ok(services.timetables.list_months(project_name).await?)
}

/// 保存済みの月を消す。無ければ false
pub async fn delete_month(
    services: &AppServices,
    project_name: &str,
    month: MonthKey,
) -> Result<bool, AppError> {
    let deleted = services.timetables.delete_month(project_name, month).await?;
    tracing::info!(project = project_name, %month, deleted, "stored month deleted");
    Ok(deleted)
}

// --- Export ---

pub fn export_month_csv(engine: &ScheduleEngine, month: MonthKey) -> String {
    to_csv(&engine.month_grid(month))
}
