use std::env;
use std::str::FromStr;

use sqlx::postgres::PgConnectOptions;

/// Connection parameters for the interviews database.
///
/// Every field falls back to the endpoint the schema fix has always targeted,
/// so running without any environment behaves like the historical script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    /// Full connection string; takes precedence over the individual fields.
    pub database_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5433,
            database: "entrevistes".into(),
            user: "postgres".into(),
            password: "postgres".into(),
            database_url: None,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|s| !s.is_empty());

        let port = match var("DB_PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid DB_PORT: {}", raw))?,
            None => defaults.port,
        };

        let config = Self {
            host: var("DB_HOST").unwrap_or(defaults.host),
            port,
            database: var("DB_NAME").unwrap_or(defaults.database),
            user: var("DB_USER").unwrap_or(defaults.user),
            password: var("DB_PASSWORD").unwrap_or(defaults.password),
            database_url: var("DATABASE_URL"),
        };

        // Surface a malformed URL now rather than as a connection failure later
        config
            .connect_options()
            .map_err(|e| anyhow::anyhow!("Invalid DATABASE_URL: {}", e))?;

        Ok(config)
    }

    pub fn connect_options(&self) -> Result<PgConnectOptions, sqlx::Error> {
        match &self.database_url {
            Some(url) => PgConnectOptions::from_str(url),
            None => Ok(PgConnectOptions::new_without_pgpass()
                .host(&self.host)
                .port(self.port)
                .database(&self.database)
                .username(&self.user)
                .password(&self.password)),
        }
    }

    /// `host:port/database`, without credentials, for logs and error messages.
    pub fn endpoint(&self) -> String {
        match (&self.database_url, self.connect_options()) {
            (None, _) => format!("{}:{}/{}", self.host, self.port, self.database),
            (Some(_), Ok(opts)) => format!(
                "{}:{}/{}",
                opts.get_host(),
                opts.get_port(),
                opts.get_database().unwrap_or_default()
            ),
            (Some(_), Err(_)) => "<invalid DATABASE_URL>".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_historical_endpoint() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.endpoint(), "localhost:5433/entrevistes");
        assert_eq!(config.user, "postgres");
        assert_eq!(config.password, "postgres");
    }

    #[test]
    fn test_individual_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "5432"),
            ("DB_NAME", "entrevistes_test"),
            ("DB_USER", "migrator"),
            ("DB_PASSWORD", "s3cret"),
        ]))
        .unwrap();

        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 5432);
        assert_eq!(config.database, "entrevistes_test");
        assert_eq!(config.user, "migrator");
        assert_eq!(config.password, "s3cret");
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_empty_values_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup(&[("DB_HOST", ""), ("DB_PORT", "")])).unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5433);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = Config::from_lookup(lookup(&[("DB_PORT", "not-a-port")])).unwrap_err();
        assert!(err.to_string().contains("DB_PORT"));
    }

    #[test]
    fn test_database_url_takes_precedence() {
        let config = Config::from_lookup(lookup(&[
            ("DB_HOST", "ignored"),
            ("DATABASE_URL", "postgres://app:pw@pg.example:6543/entrevistes_prod"),
        ]))
        .unwrap();

        let endpoint = config.endpoint();
        assert_eq!(endpoint, "pg.example:6543/entrevistes_prod");
        // Credentials never show up in the endpoint string
        assert!(!endpoint.contains("pw"));
    }

    #[test]
    fn test_invalid_database_url_is_rejected() {
        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "not a connection string")]))
            .unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }
}
