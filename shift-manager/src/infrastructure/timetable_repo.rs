use chrono::NaiveDate;
use sqlx::{FromRow, SqlitePool};

use crate::domain::models::MonthKey;
use crate::domain::timetable_model::{
    EntryStatus, TimetableDocument, TimetableEntryRecord, TimetableSummary,
};
use crate::error::RepositoryError;

pub struct TimetableRepository {
    pool: SqlitePool,
}

// =====================
// DB読み込み用ヘルパー構造体
// =====================

// 親テーブル読み込み用
#[derive(FromRow)]
struct TimetableHeaderRow {
    id: i64,
    month: i64,
    year: i64,
    project_name: String,
    created_by: String,
}

// 一覧用 (件数付き)
#[derive(FromRow)]
struct TimetableListRow {
    id: i64,
    month: i64,
    year: i64,
    project_name: String,
    created_by: String,
    entry_count: i64,
}

// 子テーブル読み込み用
#[derive(FromRow)]
struct EntryRow {
    employee_id: i64,
    date: String,
    shift_code: String,
    status: String,
    is_auto_assigned: bool,
    notes: Option<String>,
}

const DATE_FORMAT: &str = "%Y-%m-%d";

fn corrupt(table: &'static str, reason: String) -> RepositoryError {
    RepositoryError::CorruptRow { table, reason }
}

fn month_key(table: &'static str, year: i64, month: i64) -> Result<MonthKey, RepositoryError> {
    i32::try_from(year)
        .ok()
        .zip(u32::try_from(month).ok())
        .and_then(|(y, m)| MonthKey::new(y, m))
        .ok_or_else(|| corrupt(table, format!("month {month}/{year}")))
}

impl TryFrom<EntryRow> for TimetableEntryRecord {
    type Error = RepositoryError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        let date = NaiveDate::parse_from_str(&row.date, DATE_FORMAT)
            .map_err(|e| corrupt("timetable_entries", format!("date '{}': {e}", row.date)))?;
        let status: EntryStatus = row
            .status
            .parse()
            .map_err(|_| corrupt("timetable_entries", format!("status '{}'", row.status)))?;

        Ok(TimetableEntryRecord {
            employee_id: row.employee_id,
            date,
            shift_code: row.shift_code,
            status,
            is_auto_assigned: row.is_auto_assigned,
            notes: row.notes,
        })
    }
}

impl TimetableRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// (month, year, project_name) の1か月分を丸ごと置き換える
    pub async fn save_month(&self, document: &TimetableDocument) -> Result<i64, RepositoryError> {
        // 1. トランザクション開始
        let mut tx = self.pool.begin().await?;

        // 2. 親テーブル (無ければ作る)
        let timetable_id: i64 = sqlx::query_scalar(
            "INSERT INTO timetables (month, year, project_name, created_by)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (month, year, project_name)
             DO UPDATE SET created_by = excluded.created_by, updated_at = CURRENT_TIMESTAMP
             RETURNING id",
        )
        .bind(i64::from(document.month))
        .bind(i64::from(document.year))
        .bind(&document.project_name)
        .bind(&document.created_by)
        .fetch_one(&mut *tx)
        .await?;

        // 3. 既存の子を消してから入れ直す
        sqlx::query("DELETE FROM timetable_entries WHERE timetable_id = ?1")
            .bind(timetable_id)
            .execute(&mut *tx)
            .await?;

        for entry in &document.entries {
            sqlx::query(
                "INSERT INTO timetable_entries (
                    timetable_id,
                    employee_id,
                    date,
                    shift_code,
                    status,
                    is_auto_assigned,
                    notes
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .bind(timetable_id)
            .bind(entry.employee_id)
            .bind(entry.date.format(DATE_FORMAT).to_string())
            .bind(&entry.shift_code)
            .bind(entry.status.as_str())
            .bind(entry.is_auto_assigned)
            .bind(&entry.notes)
            .execute(&mut *tx)
            .await?;
        }

        // 4. コミット
        tx.commit().await?;

        tracing::info!(
            timetable_id,
            project = %document.project_name,
            month = document.month,
            year = document.year,
            entries = document.entries.len(),
            "timetable saved"
        );
        Ok(timetable_id)
    }

    pub async fn find_month(
        &self,
        project_name: &str,
        month: MonthKey,
    ) -> Result<Option<TimetableDocument>, RepositoryError> {
        // 1. 親
        let header: Option<TimetableHeaderRow> = sqlx::query_as::<_, TimetableHeaderRow>(
            "SELECT id, month, year, project_name, created_by FROM timetables
             WHERE month = ?1 AND year = ?2 AND project_name = ?3",
        )
        .bind(i64::from(month.month()))
        .bind(i64::from(month.year()))
        .bind(project_name)
        .fetch_optional(&self.pool)
        .await?;

        let header = match header {
            Some(h) => h,
            None => return Ok(None),
        };

        // 2. 子 (従業員→日付順)
        let rows: Vec<EntryRow> = sqlx::query_as::<_, EntryRow>(
            "SELECT employee_id, date, shift_code, status, is_auto_assigned, notes
             FROM timetable_entries WHERE timetable_id = ?1
             ORDER BY employee_id ASC, date ASC",
        )
        .bind(header.id)
        .fetch_all(&self.pool)
        .await?;

        // 3. 文書に再構築
        let key = month_key("timetables", header.year, header.month)?;
        let entries = rows
            .into_iter()
            .map(TimetableEntryRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(TimetableDocument {
            month: key.month(),
            year: key.year(),
            project_name: header.project_name,
            entries,
            created_by: header.created_by,
        }))
    }

    /// 新しい月から順に
    pub async fn list_months(
        &self,
        project_name: &str,
    ) -> Result<Vec<TimetableSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, TimetableListRow>(
            "SELECT t.id, t.month, t.year, t.project_name, t.created_by,
                    COUNT(e.id) AS entry_count
             FROM timetables t
             LEFT JOIN timetable_entries e ON e.timetable_id = t.id
             WHERE t.project_name = ?1
             GROUP BY t.id
             ORDER BY t.year DESC, t.month DESC",
        )
        .bind(project_name)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(TimetableSummary {
                    id: row.id,
                    month: month_key("timetables", row.year, row.month)?,
                    project_name: row.project_name,
                    created_by: row.created_by,
                    entry_count: row.entry_count,
                })
            })
            .collect()
    }

    /// 削除できたら true
    pub async fn delete_month(
        &self,
        project_name: &str,
        month: MonthKey,
    ) -> Result<bool, RepositoryError> {
        // ON DELETE CASCADE により、エントリも削除される
        let result = sqlx::query(
            "DELETE FROM timetables WHERE month = ?1 AND year = ?2 AND project_name = ?3",
        )
        .bind(i64::from(month.month()))
        .bind(i64::from(month.year()))
        .bind(project_name)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
