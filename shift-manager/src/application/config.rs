use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 環境変数の接頭辞 (ネストは `__` 区切り: SHIFT_MANAGER_DATABASE__PATH)
pub const ENV_PREFIX: &str = "SHIFT_MANAGER_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// 保存先タイムテーブルのプロジェクト名
    #[serde(default = "default_project_name")]
    pub project_name: String,
    #[serde(default = "default_created_by")]
    pub created_by: String,
    /// 従業員追加時に時間を省略した場合の値
    #[serde(default = "default_working_hours")]
    pub default_working_hours: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            project_name: default_project_name(),
            created_by: default_created_by(),
            default_working_hours: default_working_hours(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `RUST_LOG` が無いときの EnvFilter
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { filter: default_log_filter() }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/shift-manager.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_project_name() -> String {
    String::from("default")
}

fn default_created_by() -> String {
    String::from("shift_tools")
}

fn default_working_hours() -> u32 {
    8
}

fn default_log_filter() -> String {
    String::from("info")
}

impl AppConfig {
    /// 既定値 → TOMLファイル (任意) → 環境変数 の順に上書き
    pub fn figment(config_path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let config: AppConfig = Self::figment(config_path).extract()?;
        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }
}
