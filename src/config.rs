// src/config.rs
use crate::error::IsinError;
use std::fmt;

pub const DEFAULT_FIGI_ENDPOINT: &str = "https://api.openfigi.com/v3/mapping";
pub const DEFAULT_SQL_PORT: u16 = 1433;
pub const ODBC_DRIVER: &str = "ODBC Driver 17 for SQL Server";

/// SQL Server connection settings, read from the environment at call time.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub server: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub table_name: String,
    pub trust_cert: bool,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, IsinError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. `SERVER` may carry a port as `host,port`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IsinError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String, IsinError> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| IsinError::MissingConfig(key.to_string()))
        };

        let (server, server_port) = split_server(&required("SERVER")?)?;

        let port = match (server_port, lookup("DB_PORT")) {
            (Some(port), _) => port,
            (None, Some(raw)) => parse_port("DB_PORT", &raw)?,
            (None, None) => DEFAULT_SQL_PORT,
        };

        let trust_cert = lookup("DB_TRUST_CERT")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            server,
            port,
            database: required("DATABASE")?,
            username: required("USERNAME")?,
            password: required("PASSWORD")?,
            table_name: required("TABLE_NAME")?,
            trust_cert,
        })
    }

    /// ODBC-style connection string with the password masked, for diagnostics.
    pub fn display_connection_string(&self) -> String {
        format!(
            "DRIVER={{{}}};SERVER={},{};DATABASE={};UID={};PWD=******",
            ODBC_DRIVER, self.server, self.port, self.database, self.username
        )
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"******")
            .field("table_name", &self.table_name)
            .field("trust_cert", &self.trust_cert)
            .finish()
    }
}

fn split_server(raw: &str) -> Result<(String, Option<u16>), IsinError> {
    let raw = raw.trim();
    let raw = raw.strip_prefix("tcp:").unwrap_or(raw);
    match raw.split_once(',') {
        Some((host, port)) => Ok((host.trim().to_string(), Some(parse_port("SERVER", port)?))),
        None => Ok((raw.to_string(), None)),
    }
}

fn parse_port(key: &str, raw: &str) -> Result<u16, IsinError> {
    raw.trim().parse::<u16>().map_err(|e| IsinError::InvalidConfig {
        key: key.to_string(),
        reason: format!("'{}' is not a valid port ({})", raw.trim(), e),
    })
}

/// OpenFIGI endpoint and API key.
#[derive(Clone)]
pub struct FigiConfig {
    pub endpoint: String,
    pub api_key: String,
}

impl FigiConfig {
    pub fn new(endpoint: String, api_key: String) -> Result<Self, IsinError> {
        url::Url::parse(&endpoint).map_err(|e| IsinError::InvalidConfig {
            key: "OPENFIGI_ENDPOINT".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { endpoint, api_key })
    }

    pub fn from_env() -> Result<Self, IsinError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, IsinError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = lookup("OPENFIGI_ENDPOINT")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FIGI_ENDPOINT.to_string());
        let api_key = lookup("OPENFIGI_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| IsinError::MissingConfig("OPENFIGI_API_KEY".to_string()))?;
        Self::new(endpoint, api_key)
    }
}

impl fmt::Debug for FigiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FigiConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"******")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn db_vars() -> Vec<(&'static str, &'static str)> {
        vec![
            ("SERVER", "sql.internal"),
            ("DATABASE", "Securities"),
            ("USERNAME", "reader"),
            ("PASSWORD", "s3cret"),
            ("TABLE_NAME", "InvestmentIdentifier"),
        ]
    }

    #[test]
    fn database_config_defaults_port_and_trust() {
        let config = DatabaseConfig::from_lookup(lookup_from(&db_vars())).unwrap();
        assert_eq!(config.server, "sql.internal");
        assert_eq!(config.port, DEFAULT_SQL_PORT);
        assert!(!config.trust_cert);
    }

    #[test]
    fn database_config_reads_port_from_server_value() {
        let mut vars = db_vars();
        vars[0] = ("SERVER", "tcp:sql.internal,14330");
        vars.push(("DB_PORT", "9999"));
        let config = DatabaseConfig::from_lookup(lookup_from(&vars)).unwrap();
        assert_eq!(config.server, "sql.internal");
        assert_eq!(config.port, 14330);
    }

    #[test]
    fn database_config_rejects_bad_port() {
        let mut vars = db_vars();
        vars.push(("DB_PORT", "not-a-port"));
        let err = DatabaseConfig::from_lookup(lookup_from(&vars)).unwrap_err();
        assert!(matches!(err, IsinError::InvalidConfig { ref key, .. } if key == "DB_PORT"));
    }

    #[test]
    fn database_config_reports_missing_key() {
        let vars: Vec<_> = db_vars().into_iter().filter(|(k, _)| *k != "PASSWORD").collect();
        let err = DatabaseConfig::from_lookup(lookup_from(&vars)).unwrap_err();
        assert!(matches!(err, IsinError::MissingConfig(ref key) if key == "PASSWORD"));
        assert!(err.is_connection_error());
    }

    #[test]
    fn connection_string_masks_password() {
        let config = DatabaseConfig::from_lookup(lookup_from(&db_vars())).unwrap();
        let rendered = config.display_connection_string();
        assert!(rendered.starts_with("DRIVER={ODBC Driver 17 for SQL Server};"));
        assert!(rendered.contains("UID=reader"));
        assert!(!rendered.contains("s3cret"));
        assert!(!format!("{:?}", config).contains("s3cret"));
    }

    #[test]
    fn figi_config_requires_api_key() {
        let err = FigiConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, IsinError::MissingConfig(ref key) if key == "OPENFIGI_API_KEY"));
    }

    #[test]
    fn figi_config_uses_default_endpoint() {
        let config = FigiConfig::from_lookup(lookup_from(&[("OPENFIGI_API_KEY", "key")])).unwrap();
        assert_eq!(config.endpoint, DEFAULT_FIGI_ENDPOINT);
    }

    #[test]
    fn figi_config_rejects_malformed_endpoint() {
        let err = FigiConfig::new("not a url".to_string(), "key".to_string()).unwrap_err();
        assert!(matches!(err, IsinError::InvalidConfig { .. }));
    }
}
