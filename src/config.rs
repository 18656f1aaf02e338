use std::env;

use tokio::time::Duration;

use crate::{
    consts::{COINGECKO_BASE_URL, DEFAULT_PRICE_REFRESH_INTERVAL},
    errors::SettingsError,
    types::TgUserId,
};

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    /// Receives sell offers and quote requests; the only user allowed to run
    /// admin commands.
    pub admin_id: Option<TgUserId>,
    pub price_refresh_interval: Duration,
    pub coingecko_base_url: String,
}

impl Settings {
    pub fn from_env() -> Result<Settings, SettingsError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&'static str) -> Option<String>) -> Result<Settings, SettingsError> {
        let database_url = lookup("DATABASE_URL").ok_or(SettingsError::Missing("DATABASE_URL"))?;

        let admin_id = match lookup("ADMIN_ID") {
            Some(value) => Some(value.trim().parse::<TgUserId>().map_err(|_| {
                SettingsError::Invalid {
                    var: "ADMIN_ID",
                    value,
                }
            })?),
            None => None,
        };

        let price_refresh_interval = match lookup("PRICE_REFRESH_HOURS") {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(hours) if hours > 0 => Duration::from_secs(hours * 60 * 60),
                _ => {
                    return Err(SettingsError::Invalid {
                        var: "PRICE_REFRESH_HOURS",
                        value,
                    })
                }
            },
            None => DEFAULT_PRICE_REFRESH_INTERVAL,
        };

        let coingecko_base_url =
            lookup("COINGECKO_BASE_URL").unwrap_or_else(|| COINGECKO_BASE_URL.to_string());

        Ok(Settings {
            database_url,
            admin_id,
            price_refresh_interval,
            coingecko_base_url,
        })
    }

    pub fn is_admin(&self, user_id: TgUserId) -> bool {
        self.admin_id == Some(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&'static str, &str)]) -> Result<Settings, SettingsError> {
        let vars: HashMap<&'static str, String> =
            vars.iter().map(|(k, v)| (*k, v.to_string())).collect();
        Settings::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_database_url_is_required() {
        assert!(matches!(
            settings(&[]),
            Err(SettingsError::Missing("DATABASE_URL"))
        ));
    }

    #[test]
    fn test_defaults() {
        let settings = settings(&[("DATABASE_URL", "postgres://localhost/bot")]).unwrap();
        assert_eq!(settings.admin_id, None);
        assert_eq!(settings.price_refresh_interval, DEFAULT_PRICE_REFRESH_INTERVAL);
        assert_eq!(settings.coingecko_base_url, COINGECKO_BASE_URL);
        assert!(!settings.is_admin(1));
    }

    #[test]
    fn test_admin_and_refresh_interval() {
        let settings = settings(&[
            ("DATABASE_URL", "postgres://localhost/bot"),
            ("ADMIN_ID", " 123456 "),
            ("PRICE_REFRESH_HOURS", "6"),
        ])
        .unwrap();
        assert!(settings.is_admin(123456));
        assert_eq!(settings.price_refresh_interval, Duration::from_secs(6 * 3600));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            settings(&[("DATABASE_URL", "x"), ("ADMIN_ID", "admin")]),
            Err(SettingsError::Invalid { var: "ADMIN_ID", .. })
        ));
        assert!(matches!(
            settings(&[("DATABASE_URL", "x"), ("PRICE_REFRESH_HOURS", "0")]),
            Err(SettingsError::Invalid {
                var: "PRICE_REFRESH_HOURS",
                ..
            })
        ));
    }
}
