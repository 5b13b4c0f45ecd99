use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::models::{EmployeeId, MonthKey};

/// スケジュールエンジンの操作エラー
///
/// どのエラーも状態を変更する前に返される。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// 必須項目の欠落や不正な値
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("employee {0} not found")]
    UnknownEmployee(EmployeeId),

    #[error("unknown shift code '{0}'")]
    UnknownShift(String),

    /// 開始日と終了日が同じ月に収まっていない
    #[error("date range {start}..={end} must stay within one calendar month")]
    RangeOutsideMonth { start: NaiveDate, end: NaiveDate },

    /// 既存の予定の上書きが確認されなかった
    #[error("{conflicts} existing entries would be replaced; overwrite was not confirmed")]
    OverwriteNotConfirmed { conflicts: usize },

    /// plan作成後にストアが変更された
    #[error("assignment plan is stale (planned at revision {planned}, store is at {current})")]
    StalePlan { planned: u64, current: u64 },

    #[error("month {0} cannot be advanced further")]
    MonthOutOfRange(MonthKey),

    #[error("duplicate shift code '{0}' in catalog")]
    DuplicateShiftCode(String),
}

/// DBアクセス層のエラー
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// DBに保存された値をドメインの型に戻せない
    #[error("corrupt row in {table}: {reason}")]
    CorruptRow { table: &'static str, reason: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// コードなど文字列キーでの検索に失敗
    #[error("{entity} '{key}' not found")]
    KeyNotFound { entity: &'static str, key: String },

    #[error("{entity} '{key}' already exists")]
    AlreadyExists { entity: &'static str, key: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] figment::Error),
}

/// アプリケーション層のコマンドが返すエラー
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
