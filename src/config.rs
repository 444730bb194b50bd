use serde::{Deserialize, Serialize};

use std::{
    env, fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("{0} environment variable is required")]
    MissingVar(&'static str),

    #[error("Failed to parse {name}: {reason}")]
    InvalidVar { name: &'static str, reason: String },

    #[error(
        "Config file not found and environment variables are incomplete. \
         Tried: {tried}. Error: {source}"
    )]
    NotFound {
        tried: String,
        source: Box<ConfigError>,
    },
}

/// Settings for the whole process, produced once at startup by a [`ConfigSource`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub app: AppConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP listen port
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    /// Sets the session `search_path`; the server default when absent.
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default = "default_sslmode")]
    pub sslmode: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Bounds the liveness probe and every pool wait/create/recycle.
    #[serde(with = "humantime_serde", default = "default_connect_timeout")]
    pub connect_timeout: Duration,
}

fn default_sslmode() -> String {
    "disable".to_string()
}

const fn default_pool_size() -> usize {
    16
}

const fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            app: AppConfig { port: 8080 },
            database: DatabaseConfig {
                host: "localhost".to_string(),
                port: 5432,
                user: "postgres".to_string(),
                password: "postgres".to_string(),
                dbname: "notes".to_string(),
                schema: None,
                sslmode: default_sslmode(),
                pool_size: default_pool_size(),
                connect_timeout: default_connect_timeout(),
            },
        }
    }
}

/// A strategy for producing the service configuration.
pub trait ConfigSource {
    fn load(&self) -> Result<ServiceConfig, ConfigError>;
}

/// YAML file on disk.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for FileSource {
    fn load(&self) -> Result<ServiceConfig, ConfigError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;

        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}

/// `NOTES_*` environment variables. The lookup is injectable so the source
/// can be driven from a map.
pub struct EnvSource<F = fn(&str) -> Option<String>> {
    lookup: F,
}

impl EnvSource {
    pub fn new() -> Self {
        Self {
            lookup: |name| env::var(name).ok(),
        }
    }
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> EnvSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    pub const fn with_lookup(lookup: F) -> Self {
        Self { lookup }
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        (self.lookup)(name).ok_or(ConfigError::MissingVar(name))
    }
}

fn parse_var<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| ConfigError::InvalidVar {
        name,
        reason: e.to_string(),
    })
}

impl<F> ConfigSource for EnvSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn load(&self) -> Result<ServiceConfig, ConfigError> {
        let port = parse_var("NOTES_APP_PORT", &self.required("NOTES_APP_PORT")?)?;

        let database = DatabaseConfig {
            host: self.required("NOTES_DATABASE_HOST")?,
            port: parse_var("NOTES_DATABASE_PORT", &self.required("NOTES_DATABASE_PORT")?)?,
            user: self.required("NOTES_DATABASE_USER")?,
            password: self.required("NOTES_DATABASE_PASSWORD")?,
            dbname: self.required("NOTES_DATABASE_DBNAME")?,
            schema: (self.lookup)("NOTES_DATABASE_SCHEMA"),
            sslmode: (self.lookup)("NOTES_DATABASE_SSLMODE").unwrap_or_else(default_sslmode),
            pool_size: match (self.lookup)("NOTES_DATABASE_POOL_SIZE") {
                Some(value) => parse_var("NOTES_DATABASE_POOL_SIZE", &value)?,
                None => default_pool_size(),
            },
            connect_timeout: match (self.lookup)("NOTES_DATABASE_CONNECT_TIMEOUT") {
                Some(value) => humantime_serde::re::humantime::parse_duration(&value).map_err(
                    |e| ConfigError::InvalidVar {
                        name: "NOTES_DATABASE_CONNECT_TIMEOUT",
                        reason: e.to_string(),
                    },
                )?,
                None => default_connect_timeout(),
            },
        };

        Ok(ServiceConfig {
            app: AppConfig { port },
            database,
        })
    }
}

/// A fixed configuration compiled into the process.
pub struct StaticSource(pub ServiceConfig);

impl ConfigSource for StaticSource {
    fn load(&self) -> Result<ServiceConfig, ConfigError> {
        Ok(self.0.clone())
    }
}

pub fn load_config() -> Result<ServiceConfig, ConfigError> {
    // Retrieve env variable
    let config_path =
        env::var("NOTES_SERVICE_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());

    resolve(
        &FileSource::new(&config_path),
        &FileSource::new("config.yaml"),
        &FileSource::new("config.example.yaml"),
        &EnvSource::new(),
    )
}

fn resolve(
    primary: &FileSource,
    fallback: &FileSource,
    example: &FileSource,
    env: &impl ConfigSource,
) -> Result<ServiceConfig, ConfigError> {
    // Try env path
    if primary.exists() {
        return primary.load();
    }

    // Fallback to config.yaml
    if fallback.exists() {
        tracing::warn!(
            "Config file '{}' not found, falling back to '{}'",
            primary.path().display(),
            fallback.path().display()
        );
        return fallback.load();
    }

    // Fallback to config.example.yaml
    if example.exists() {
        tracing::warn!(
            "Config file '{}' and '{}' not found, falling back to '{}'\
             \n This file should not be used and should be replaced with actual data",
            primary.path().display(),
            fallback.path().display(),
            example.path().display()
        );
        return example.load();
    }

    // Fallback to environment variables
    tracing::info!(
        "No config file found, attempting to load configuration from environment variables"
    );
    match env.load() {
        Ok(config) => {
            tracing::info!("Successfully loaded configuration from environment variables");
            Ok(config)
        }
        Err(e) => Err(ConfigError::NotFound {
            tried: format!(
                "'{}', '{}', '{}', and environment variables",
                primary.path().display(),
                fallback.path().display(),
                example.path().display()
            ),
            source: Box::new(e),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{collections::HashMap, io::Write};

    const FULL_YAML: &str = "\
app:
  port: 9000
database:
  host: db.internal
  port: 5433
  user: notes
  password: secret
  dbname: notes_db
  sslmode: prefer
  pool_size: 4
  connect_timeout: 2s
";

    fn env_lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    fn required_vars() -> Vec<(&'static str, &'static str)> {
        vec![
            ("NOTES_APP_PORT", "8081"),
            ("NOTES_DATABASE_HOST", "pg"),
            ("NOTES_DATABASE_PORT", "5432"),
            ("NOTES_DATABASE_USER", "alice"),
            ("NOTES_DATABASE_PASSWORD", "pw"),
            ("NOTES_DATABASE_DBNAME", "notes"),
        ]
    }

    fn yaml_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parses_full_yaml() {
        let config: ServiceConfig = serde_yaml::from_str(FULL_YAML).unwrap();

        assert_eq!(config.app.port, 9000);
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.port, 5433);
        assert_eq!(config.database.sslmode, "prefer");
        assert_eq!(config.database.pool_size, 4);
        assert_eq!(config.database.connect_timeout, Duration::from_secs(2));
    }

    #[test]
    fn optional_database_fields_fall_back_to_defaults() {
        let yaml = "\
app:
  port: 8080
database:
  host: localhost
  port: 5432
  user: postgres
  password: postgres
  dbname: notes
";
        let config: ServiceConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn env_source_reads_required_and_defaults_optional() {
        let source = EnvSource::with_lookup(env_lookup(&required_vars()));
        let config = source.load().unwrap();

        assert_eq!(config.app.port, 8081);
        assert_eq!(config.database.host, "pg");
        assert_eq!(config.database.user, "alice");
        assert_eq!(config.database.schema, None);
        assert_eq!(config.database.sslmode, "disable");
        assert_eq!(config.database.pool_size, 16);
        assert_eq!(config.database.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn env_source_reads_optional_overrides() {
        let mut vars = required_vars();
        vars.push(("NOTES_DATABASE_SCHEMA", "notes_app"));
        vars.push(("NOTES_DATABASE_SSLMODE", "require"));
        vars.push(("NOTES_DATABASE_POOL_SIZE", "32"));
        vars.push(("NOTES_DATABASE_CONNECT_TIMEOUT", "750ms"));

        let config = EnvSource::with_lookup(env_lookup(&vars)).load().unwrap();

        assert_eq!(config.database.schema.as_deref(), Some("notes_app"));
        assert_eq!(config.database.sslmode, "require");
        assert_eq!(config.database.pool_size, 32);
        assert_eq!(config.database.connect_timeout, Duration::from_millis(750));
    }

    #[test]
    fn env_source_reports_missing_variable() {
        let vars: Vec<_> = required_vars()
            .into_iter()
            .filter(|(k, _)| *k != "NOTES_DATABASE_PASSWORD")
            .collect();

        let err = EnvSource::with_lookup(env_lookup(&vars)).load().unwrap_err();

        assert!(matches!(
            err,
            ConfigError::MissingVar("NOTES_DATABASE_PASSWORD")
        ));
    }

    #[test]
    fn env_source_reports_unparseable_port() {
        let mut vars = required_vars();
        vars.retain(|(k, _)| *k != "NOTES_APP_PORT");
        vars.push(("NOTES_APP_PORT", "eighty"));

        let err = EnvSource::with_lookup(env_lookup(&vars)).load().unwrap_err();

        assert!(matches!(
            err,
            ConfigError::InvalidVar {
                name: "NOTES_APP_PORT",
                ..
            }
        ));
    }

    #[test]
    fn file_source_loads_yaml() {
        let file = yaml_file(FULL_YAML);

        let config = FileSource::new(file.path()).load().unwrap();

        assert_eq!(config.app.port, 9000);
        assert_eq!(config.database.dbname, "notes_db");
    }

    #[test]
    fn file_source_reports_parse_error() {
        let file = yaml_file("app: [not, a, map]\n");

        let err = FileSource::new(file.path()).load().unwrap_err();

        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn static_source_returns_its_config() {
        let config = StaticSource(ServiceConfig::default()).load().unwrap();

        assert_eq!(config.app.port, 8080);
        assert_eq!(config.database.dbname, "notes");
    }

    #[test]
    fn resolve_prefers_primary_file() {
        let file = yaml_file(FULL_YAML);
        let missing = FileSource::new("/nonexistent/notes-service.yaml");
        let env = StaticSource(ServiceConfig::default());

        let config = resolve(&FileSource::new(file.path()), &missing, &missing, &env).unwrap();

        assert_eq!(config.app.port, 9000);
    }

    #[test]
    fn resolve_falls_back_to_example_file() {
        let example = yaml_file(FULL_YAML);
        let missing = FileSource::new("/nonexistent/notes-service.yaml");
        let env = StaticSource(ServiceConfig::default());

        let config = resolve(&missing, &missing, &FileSource::new(example.path()), &env).unwrap();

        assert_eq!(config.database.host, "db.internal");
    }

    #[test]
    fn resolve_falls_back_to_environment() {
        let missing = FileSource::new("/nonexistent/notes-service.yaml");
        let env = EnvSource::with_lookup(env_lookup(&required_vars()));

        let config = resolve(&missing, &missing, &missing, &env).unwrap();

        assert_eq!(config.app.port, 8081);
    }

    #[test]
    fn resolve_fails_when_nothing_is_available() {
        let missing = FileSource::new("/nonexistent/notes-service.yaml");
        let env = EnvSource::with_lookup(env_lookup(&[]));

        let err = resolve(&missing, &missing, &missing, &env).unwrap_err();

        assert!(matches!(err, ConfigError::NotFound { .. }));
    }
}
