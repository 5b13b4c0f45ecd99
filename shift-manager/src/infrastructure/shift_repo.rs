use sqlx::{FromRow, SqlitePool};

use crate::domain::shift_catalog::{ShiftCatalog, ShiftCategory, ShiftDefinition};
use crate::error::RepositoryError;

pub struct ShiftRepository {
    pool: SqlitePool,
}

// =====================
// DB読み込み用ヘルパー構造体
// =====================

#[derive(FromRow)]
struct ShiftRow {
    code: String,
    name: String,
    color: String,
    time: String,
    category: String,
}

impl TryFrom<ShiftRow> for ShiftDefinition {
    type Error = RepositoryError;

    fn try_from(row: ShiftRow) -> Result<Self, Self::Error> {
        let category: ShiftCategory = row.category.parse().map_err(|_| RepositoryError::CorruptRow {
            table: "shifts",
            reason: format!("category '{}'", row.category),
        })?;

        Ok(ShiftDefinition {
            code: row.code,
            name: row.name,
            color: row.color,
            time: row.time,
            category,
        })
    }
}

const SELECT_SHIFT: &str = "SELECT code, name, color, time, category FROM shifts";

fn not_found(code: &str) -> RepositoryError {
    RepositoryError::KeyNotFound { entity: "shift", key: code.to_string() }
}

impl ShiftRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 有効なシフトのみ、登録順
    pub async fn list(&self) -> Result<Vec<ShiftDefinition>, RepositoryError> {
        let rows = sqlx::query_as::<_, ShiftRow>(&format!(
            "{SELECT_SHIFT} WHERE is_active = 1 ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ShiftDefinition::try_from).collect()
    }

    pub async fn find(&self, code: &str) -> Result<Option<ShiftDefinition>, RepositoryError> {
        let row = sqlx::query_as::<_, ShiftRow>(&format!(
            "{SELECT_SHIFT} WHERE code = ?1 AND is_active = 1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ShiftDefinition::try_from).transpose()
    }

    /// 無効化済みの同じコードがあれば、内容を書き換えて有効に戻す
    pub async fn create(&self, shift: &ShiftDefinition) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO shifts (code, name, color, time, category)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (code) DO UPDATE SET
                name = excluded.name,
                color = excluded.color,
                time = excluded.time,
                category = excluded.category,
                is_active = 1
             WHERE shifts.is_active = 0",
        )
        .bind(&shift.code)
        .bind(&shift.name)
        .bind(&shift.color)
        .bind(&shift.time)
        .bind(shift.category.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::AlreadyExists { entity: "shift", key: shift.code.clone() });
        }
        tracing::info!(code = %shift.code, "shift row created");
        Ok(())
    }

    /// コードで探して、それ以外の項目を書き換える
    pub async fn update(&self, shift: &ShiftDefinition) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE shifts
             SET name = ?1, color = ?2, time = ?3, category = ?4
             WHERE code = ?5 AND is_active = 1",
        )
        .bind(&shift.name)
        .bind(&shift.color)
        .bind(&shift.time)
        .bind(shift.category.as_str())
        .bind(&shift.code)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(&shift.code));
        }
        Ok(())
    }

    /// 論理削除 (保存済みのエントリはコードを持ち続ける)
    pub async fn deactivate(&self, code: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE shifts SET is_active = 0 WHERE code = ?1 AND is_active = 1")
            .bind(code)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(code));
        }
        tracing::info!(code, "shift deactivated");
        Ok(())
    }

    /// テーブルが空 (無効化済みも含めて0行) のときだけ標準の11件を入れる
    ///
    /// 入れた件数を返す
    pub async fn initialize_defaults(&self) -> Result<usize, RepositoryError> {
        // 1. トランザクション開始
        let mut tx = self.pool.begin().await?;

        // 2. 既存チェック
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shifts")
            .fetch_one(&mut *tx)
            .await?;
        if existing > 0 {
            tracing::debug!(existing, "shifts already initialized");
            return Ok(0);
        }

        // 3. 標準カタログを順に挿入
        let defaults = ShiftCatalog::standard();
        for shift in defaults.iter() {
            sqlx::query(
                "INSERT INTO shifts (code, name, color, time, category) VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&shift.code)
            .bind(&shift.name)
            .bind(&shift.color)
            .bind(&shift.time)
            .bind(shift.category.as_str())
            .execute(&mut *tx)
            .await?;
        }

        // 4. コミット
        tx.commit().await?;

        let inserted = defaults.definitions().len();
        tracing::info!(inserted, "default shifts created");
        Ok(inserted)
    }
}
