use rusqlite::Connection;
use serde::Serialize;

use crate::analyzer::aggregate::TopN;
use crate::error::AppError;

pub const KEY_SOURCE_URL: &str = "source_url";
pub const KEY_CATEGORIES: &str = "categories";
pub const KEY_DEFAULT_TOP_N: &str = "default_top_n";

const KNOWN_KEYS: &[&str] = &[KEY_SOURCE_URL, KEY_CATEGORIES, KEY_DEFAULT_TOP_N];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// CSV export fetched by `refresh` when no file or URL is given.
    pub source_url: Option<String>,
    /// Known service categories, in summary-card order.
    pub categories: Vec<String>,
    pub default_top_n: TopN,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            source_url: None,
            categories: vec![
                "Issue".into(),
                "Request".into(),
                "Question".into(),
                "Task".into(),
            ],
            default_top_n: TopN::default(),
        }
    }
}

pub fn get_config_from_db(conn: &Connection) -> Result<AppConfig, rusqlite::Error> {
    let mut stmt = conn.prepare_cached("SELECT key, value FROM config")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut config = AppConfig::default();

    for row in rows {
        let (key, value) = row?;
        match key.as_str() {
            KEY_SOURCE_URL => {
                config.source_url = Some(value).filter(|v| !v.trim().is_empty());
            }
            KEY_CATEGORIES => {
                if let Ok(v) = serde_json::from_str::<Vec<String>>(&value) {
                    if !v.is_empty() {
                        config.categories = v;
                    }
                }
            }
            KEY_DEFAULT_TOP_N => {
                if let Ok(v) = value.parse() {
                    config.default_top_n = v;
                }
            }
            _ => {}
        }
    }

    Ok(config)
}

/// Validates and stores one setting. `categories` takes a comma-separated list.
pub fn set_config_value(conn: &Connection, key: &str, value: &str) -> Result<(), AppError> {
    let stored = match key {
        KEY_SOURCE_URL => value.trim().to_string(),
        KEY_CATEGORIES => {
            let list: Vec<&str> = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();
            if list.is_empty() {
                return Err(AppError::Custom(
                    "the category list cannot be empty".into(),
                ));
            }
            serde_json::to_string(&list)?
        }
        KEY_DEFAULT_TOP_N => {
            let top: TopN = value.parse().map_err(AppError::Custom)?;
            match top {
                TopN::Limit(n) => n.to_string(),
                TopN::All => "all".to_string(),
            }
        }
        _ => {
            return Err(AppError::Custom(format!(
                "unknown setting: {} (expected one of: {})",
                key,
                KNOWN_KEYS.join(", ")
            )))
        }
    };

    conn.execute(
        "INSERT OR REPLACE INTO config (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
        rusqlite::params![key, stored],
    )?;
    log::info!("Setting {} updated", key);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup::init_memory_db;

    #[test]
    fn test_defaults_from_fresh_db() {
        let conn = init_memory_db().unwrap();
        let config = get_config_from_db(&conn).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_set_and_read_back() {
        let conn = init_memory_db().unwrap();
        set_config_value(&conn, KEY_DEFAULT_TOP_N, "Top 10").unwrap();
        set_config_value(&conn, KEY_CATEGORIES, "Issue, Incident ,Task").unwrap();
        set_config_value(&conn, KEY_SOURCE_URL, "https://example.org/export.csv").unwrap();

        let config = get_config_from_db(&conn).unwrap();
        assert_eq!(config.default_top_n, TopN::Limit(10));
        assert_eq!(config.categories, vec!["Issue", "Incident", "Task"]);
        assert_eq!(
            config.source_url.as_deref(),
            Some("https://example.org/export.csv")
        );
    }

    #[test]
    fn test_rejects_unknown_key_and_bad_values() {
        let conn = init_memory_db().unwrap();
        assert!(set_config_value(&conn, "theme", "dark").is_err());
        assert!(set_config_value(&conn, KEY_DEFAULT_TOP_N, "7").is_err());
        assert!(set_config_value(&conn, KEY_CATEGORIES, " , ").is_err());
    }

    #[test]
    fn test_blank_source_url_means_none() {
        let conn = init_memory_db().unwrap();
        set_config_value(&conn, KEY_SOURCE_URL, "  ").unwrap();
        assert!(get_config_from_db(&conn).unwrap().source_url.is_none());
    }
}
