use std::env;
use std::path::PathBuf;

/// Process configuration, read once at startup and shared as `web::Data<Settings>`.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub app_env: String,
    pub jwt_secret: String,
    pub jwt_expire_days: i64,
    pub jwt_cookie_expire_days: i64,
    pub max_file_upload: usize,
    pub file_upload_path: PathBuf,
    pub geocoder_api_key: String,
    pub geocoder_base_url: String,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{0} has an invalid value: {1}")]
    Invalid(&'static str, String),
}

const DEFAULT_GEOCODER_URL: &str = "https://www.mapquestapi.com/geocoding/v1/address";

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup so tests don't touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let cors_origins = or_default("CORS_ORIGINS", "")
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Settings {
            host: or_default("HOST", "0.0.0.0"),
            port: parse_number("PORT", &or_default("PORT", "5000"))?,
            database_url: required("DATABASE_URL")?,
            app_env: or_default("APP_ENV", "development"),
            jwt_secret: required("JWT_SECRET")?,
            jwt_expire_days: parse_number("JWT_EXPIRE_DAYS", &or_default("JWT_EXPIRE_DAYS", "30"))?,
            jwt_cookie_expire_days: parse_number(
                "JWT_COOKIE_EXPIRE_DAYS",
                &or_default("JWT_COOKIE_EXPIRE_DAYS", "30"),
            )?,
            max_file_upload: parse_number("MAX_FILE_UPLOAD", &or_default("MAX_FILE_UPLOAD", "1000000"))?,
            file_upload_path: PathBuf::from(or_default("FILE_UPLOAD_PATH", "./public/uploads")),
            geocoder_api_key: or_default("GEOCODER_API_KEY", ""),
            geocoder_base_url: or_default("GEOCODER_BASE_URL", DEFAULT_GEOCODER_URL),
            cors_origins,
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(key, raw.to_string()))
}

#[cfg(test)]
pub(crate) fn test_settings() -> Settings {
    Settings::from_lookup(|key| match key {
        "DATABASE_URL" => Some("mongodb://localhost:27017/devcamper_test".to_string()),
        "JWT_SECRET" => Some("test-secret".to_string()),
        "FILE_UPLOAD_PATH" => Some(std::env::temp_dir().join("devcamper-uploads").display().to_string()),
        _ => None,
    })
    .expect("test settings are valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_required_keys_are_set() {
        let settings = Settings::from_lookup(lookup(&[
            ("DATABASE_URL", "mongodb://localhost/devcamper"),
            ("JWT_SECRET", "s3cret"),
        ]))
        .unwrap();

        assert_eq!(settings.port, 5000);
        assert_eq!(settings.jwt_expire_days, 30);
        assert_eq!(settings.max_file_upload, 1_000_000);
        assert_eq!(settings.file_upload_path, PathBuf::from("./public/uploads"));
        assert!(settings.cors_origins.is_empty());
        assert!(!settings.is_production());
    }

    #[test]
    fn missing_secret_is_reported() {
        let err = Settings::from_lookup(lookup(&[("DATABASE_URL", "mongodb://localhost/x")])).unwrap_err();
        assert_eq!(err.to_string(), "JWT_SECRET must be set");
    }

    #[test]
    fn invalid_number_is_reported() {
        let err = Settings::from_lookup(lookup(&[
            ("DATABASE_URL", "mongodb://localhost/x"),
            ("JWT_SECRET", "s"),
            ("MAX_FILE_UPLOAD", "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("MAX_FILE_UPLOAD", _)));
        assert_eq!(err.to_string(), "MAX_FILE_UPLOAD has an invalid value: lots");
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let settings = Settings::from_lookup(lookup(&[
            ("DATABASE_URL", "mongodb://localhost/x"),
            ("JWT_SECRET", "s"),
            ("CORS_ORIGINS", "http://localhost:3000, http://127.0.0.1:3000,"),
        ]))
        .unwrap();
        assert_eq!(settings.cors_origins, vec!["http://localhost:3000", "http://127.0.0.1:3000"]);
    }
}
