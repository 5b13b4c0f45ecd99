use sqlx::{FromRow, SqlitePool};

use crate::domain::models::{Employee, EmployeeId, NewEmployee, WeekOffPattern};
use crate::error::RepositoryError;

pub struct EmployeeRepository {
    pool: SqlitePool,
}

// =====================
// DB読み込み用ヘルパー構造体
// =====================

#[derive(FromRow)]
struct EmployeeRow {
    id: i64,
    name: String,
    position: String,
    week_off_pattern: String,
    working_hours: i64,
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = RepositoryError;

    fn try_from(row: EmployeeRow) -> Result<Self, Self::Error> {
        let week_off_pattern: WeekOffPattern =
            row.week_off_pattern
                .parse()
                .map_err(|_| RepositoryError::CorruptRow {
                    table: "employees",
                    reason: format!("week_off_pattern '{}'", row.week_off_pattern),
                })?;
        let working_hours = u32::try_from(row.working_hours).map_err(|_| RepositoryError::CorruptRow {
            table: "employees",
            reason: format!("working_hours {}", row.working_hours),
        })?;

        Ok(Employee {
            id: row.id,
            name: row.name,
            position: row.position,
            week_off_pattern,
            working_hours,
        })
    }
}

const SELECT_EMPLOYEE: &str =
    "SELECT id, name, position, week_off_pattern, working_hours FROM employees";

impl EmployeeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, employee: &NewEmployee) -> Result<Employee, RepositoryError> {
        let id = sqlx::query(
            "INSERT INTO employees (name, position, week_off_pattern, working_hours)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(employee.name.trim())
        .bind(&employee.position)
        .bind(employee.week_off_pattern.as_str())
        .bind(i64::from(employee.working_hours))
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        tracing::info!(employee_id = id, "employee row created");
        Ok(employee.clone().with_id(id))
    }

    /// id順
    pub async fn list(&self) -> Result<Vec<Employee>, RepositoryError> {
        let rows = sqlx::query_as::<_, EmployeeRow>(&format!("{SELECT_EMPLOYEE} ORDER BY id ASC"))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Employee::try_from).collect()
    }

    pub async fn find(&self, id: EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        let row = sqlx::query_as::<_, EmployeeRow>(&format!("{SELECT_EMPLOYEE} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Employee::try_from).transpose()
    }

    pub async fn update(&self, employee: &Employee) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE employees
             SET name = ?1, position = ?2, week_off_pattern = ?3, working_hours = ?4
             WHERE id = ?5",
        )
        .bind(&employee.name)
        .bind(&employee.position)
        .bind(employee.week_off_pattern.as_str())
        .bind(i64::from(employee.working_hours))
        .bind(employee.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound { entity: "employee", id: employee.id });
        }
        Ok(())
    }

    /// id を保ったまま書き込む (スナップショットからの同期用)
    pub async fn upsert(&self, employee: &Employee) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO employees (id, name, position, week_off_pattern, working_hours)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                position = excluded.position,
                week_off_pattern = excluded.week_off_pattern,
                working_hours = excluded.working_hours",
        )
        .bind(employee.id)
        .bind(&employee.name)
        .bind(&employee.position)
        .bind(employee.week_off_pattern.as_str())
        .bind(i64::from(employee.working_hours))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// 従業員と、全タイムテーブル上のその従業員のエントリを削除する
    ///
    /// 削除したエントリ数を返す
    pub async fn delete(&self, id: EmployeeId) -> Result<u64, RepositoryError> {
        // 1. トランザクション開始
        let mut tx = self.pool.begin().await?;

        // 2. エントリの掃除
        let entries = sqlx::query("DELETE FROM timetable_entries WHERE employee_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        // 3. 本体
        let deleted = sqlx::query("DELETE FROM employees WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            // tx は drop でロールバック
            return Err(RepositoryError::NotFound { entity: "employee", id });
        }

        // 4. コミット
        tx.commit().await?;

        tracing::info!(employee_id = id, removed_entries = entries, "employee row deleted");
        Ok(entries)
    }
}
