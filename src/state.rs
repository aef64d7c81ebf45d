use rusqlite::Connection;
use std::sync::Mutex;

use crate::error::AppError;

/// Owned by the render cycle; one connection for the whole process.
pub struct AppState {
    pub db: Mutex<Option<Connection>>,
}

impl AppState {
    pub fn new(conn: Connection) -> Self {
        AppState {
            db: Mutex::new(Some(conn)),
        }
    }
}

pub trait DbAccess {
    fn db<F, T>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&Connection) -> Result<T, AppError>;

    fn db_mut<F, T>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Connection) -> Result<T, AppError>;
}

impl DbAccess for AppState {
    fn db<F, T>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&Connection) -> Result<T, AppError>,
    {
        let guard = self
            .db
            .lock()
            .map_err(|e| AppError::Custom(format!("Mutex poisoned: {}", e)))?;
        let conn = guard
            .as_ref()
            .ok_or_else(|| AppError::Custom("Database not initialised".into()))?;
        f(conn)
    }

    fn db_mut<F, T>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Connection) -> Result<T, AppError>,
    {
        let mut guard = self
            .db
            .lock()
            .map_err(|e| AppError::Custom(format!("Mutex poisoned: {}", e)))?;
        let conn = guard
            .as_mut()
            .ok_or_else(|| AppError::Custom("Database not initialised".into()))?;
        f(conn)
    }
}
