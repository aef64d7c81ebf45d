use crate::config::AppConfig;
use crate::error::AppError;
use crate::state::{AppState, DbAccess};

pub fn get_config(state: &AppState) -> Result<AppConfig, AppError> {
    state.db(|conn| Ok(crate::config::get_config_from_db(conn)?))
}

pub fn update_config(state: &AppState, key: &str, value: &str) -> Result<AppConfig, AppError> {
    state.db(|conn| {
        crate::config::set_config_value(conn, key, value)?;
        Ok(crate::config::get_config_from_db(conn)?)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::aggregate::TopN;
    use crate::db::setup::init_memory_db;

    #[test]
    fn test_update_returns_new_config() {
        let state = AppState::new(init_memory_db().unwrap());
        assert_eq!(get_config(&state).unwrap().default_top_n, TopN::Limit(5));

        let updated = update_config(&state, "default_top_n", "all").unwrap();
        assert_eq!(updated.default_top_n, TopN::All);
        assert_eq!(get_config(&state).unwrap(), updated);
    }
}
