use std::env;
use std::fmt;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub swagger: SwaggerConfig,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub max_request_body_size: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Postgres connection string; the in-memory store is used when absent
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub title: String,
    pub version: String,
    pub description: String,
}

/// S3-compatible object storage the clients upload to
#[derive(Clone)]
pub struct StorageConfig {
    /// Endpoint used by this service (bucket bootstrap)
    pub endpoint: String,
    /// Endpoint handed to clients as the upload host (defaults to endpoint)
    pub public_endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
    /// `endpoint/bucket` when true, `bucket.endpoint` otherwise
    pub path_style: bool,
    /// Create the bucket at startup if it does not exist
    pub ensure_bucket: bool,
    /// Install an anonymous read policy for the upload key prefix at startup
    pub public_read: bool,
}

/// Zone used for the date segment of storage keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTimezone {
    Utc,
    Local,
}

/// Constraints applied to every upload authorization
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub max_file_size: i64,
    /// Lowercased extensions without the leading dot; empty means unrestricted
    pub allowed_file_types: Vec<String>,
    pub signature_expire_secs: i64,
    pub key_prefix: String,
    pub key_timezone: KeyTimezone,
    pub callback_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            swagger: SwaggerConfig::from_env()?,
            storage: StorageConfig::from_env()?,
            upload: UploadConfig::from_env()?,
        })
    }
}

impl AppConfig {
    const DEFAULT_MAX_REQUEST_BODY_SIZE: usize = 1024 * 1024; // 1MB, bodies are small JSON

    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_request_body_size = env::var("MAX_REQUEST_BODY_SIZE")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_REQUEST_BODY_SIZE.to_string())
            .parse::<usize>()
            .map_err(|_| "MAX_REQUEST_BODY_SIZE must be a valid number".to_string())?;

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
            max_request_body_size,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MAX_CONNECTIONS must be a valid number".to_string())?;

        let min_connections = env::var("DB_MIN_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MIN_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MIN_CONNECTIONS must be a valid number".to_string())?;

        let acquire_timeout_secs = env::var("DB_ACQUIRE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_ACQUIRE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_ACQUIRE_TIMEOUT_SECS must be a valid number".to_string())?;

        let idle_timeout_secs = env::var("DB_IDLE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_IDLE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_IDLE_TIMEOUT_SECS must be a valid number".to_string())?;

        let max_lifetime_secs = env::var("DB_MAX_LIFETIME_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_LIFETIME_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_MAX_LIFETIME_SECS must be a valid number".to_string())?;

        Ok(Self {
            url,
            max_connections,
            min_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
        })
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Result<Self, String> {
        // Only use credentials if they are non-empty
        let username = env::var("SWAGGER_USERNAME").ok().filter(|s| !s.is_empty());
        let password = env::var("SWAGGER_PASSWORD").ok().filter(|s| !s.is_empty());
        let title =
            env::var("SWAGGER_TITLE").unwrap_or_else(|_| "Direct Upload Broker API".to_string());
        let version = env::var("SWAGGER_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let description = env::var("SWAGGER_DESCRIPTION").unwrap_or_else(|_| {
            "Issues direct-to-storage upload authorizations and tracks upload records".to_string()
        });

        Ok(Self {
            username,
            password,
            title,
            version,
            description,
        })
    }

    /// Returns credentials in "username:password" format if auth is enabled
    pub fn credentials(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(format!("{}:{}", user, pass)),
            _ => None,
        }
    }
}

impl StorageConfig {
    pub fn from_env() -> Result<Self, String> {
        let endpoint = env::var("STORAGE_ENDPOINT")
            .unwrap_or_else(|_| "http://localhost:9000".to_string())
            .trim_end_matches('/')
            .to_string();

        let public_endpoint = env::var("STORAGE_PUBLIC_ENDPOINT")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| endpoint.clone());

        let access_key =
            env::var("STORAGE_ACCESS_KEY").map_err(|_| "STORAGE_ACCESS_KEY must be set")?;
        let secret_key =
            env::var("STORAGE_SECRET_KEY").map_err(|_| "STORAGE_SECRET_KEY must be set")?;

        let bucket = env::var("STORAGE_BUCKET").unwrap_or_else(|_| "uploads".to_string());
        let region = env::var("STORAGE_REGION").unwrap_or_else(|_| "us-east-1".to_string());

        Ok(Self {
            endpoint,
            public_endpoint,
            access_key,
            secret_key,
            bucket,
            region,
            path_style: parse_bool("STORAGE_PATH_STYLE", true)?,
            ensure_bucket: parse_bool("STORAGE_ENSURE_BUCKET", false)?,
            public_read: parse_bool("STORAGE_PUBLIC_READ", false)?,
        })
    }
}

// Keep the secret key out of logs and panic messages.
impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("public_endpoint", &self.public_endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("path_style", &self.path_style)
            .field("ensure_bucket", &self.ensure_bucket)
            .field("public_read", &self.public_read)
            .finish()
    }
}

impl UploadConfig {
    const DEFAULT_MAX_FILE_SIZE: i64 = 100 * 1024 * 1024; // 100MB
    const DEFAULT_SIGNATURE_EXPIRE_SECS: i64 = 3600; // 1 hour
    const MAX_SIGNATURE_EXPIRE_SECS: i64 = 7 * 24 * 3600; // 7 days
    const DEFAULT_KEY_PREFIX: &'static str = "uploads";

    pub fn from_env() -> Result<Self, String> {
        let max_file_size = env::var("UPLOAD_MAX_FILE_SIZE")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_FILE_SIZE.to_string())
            .parse::<i64>()
            .map_err(|_| "UPLOAD_MAX_FILE_SIZE must be a valid number".to_string())?;
        if max_file_size < 0 {
            return Err("UPLOAD_MAX_FILE_SIZE must not be negative".to_string());
        }

        let allowed_file_types = env::var("UPLOAD_ALLOWED_FILE_TYPES")
            .map(|raw| parse_allowed_file_types(&raw))
            .unwrap_or_default();

        let signature_expire_secs = env::var("UPLOAD_SIGNATURE_EXPIRE_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_SIGNATURE_EXPIRE_SECS.to_string())
            .parse::<i64>()
            .map_err(|_| "UPLOAD_SIGNATURE_EXPIRE_SECS must be a valid number".to_string())
            .and_then(check_signature_expire_secs)?;

        let key_prefix = env::var("UPLOAD_KEY_PREFIX")
            .unwrap_or_else(|_| Self::DEFAULT_KEY_PREFIX.to_string())
            .trim_matches('/')
            .to_string();
        if key_prefix.is_empty() {
            return Err("UPLOAD_KEY_PREFIX must not be empty".to_string());
        }

        let key_timezone = match env::var("UPLOAD_KEY_TIMEZONE")
            .unwrap_or_else(|_| "utc".to_string())
            .to_lowercase()
            .as_str()
        {
            "utc" => KeyTimezone::Utc,
            "local" => KeyTimezone::Local,
            other => {
                return Err(format!(
                    "UPLOAD_KEY_TIMEZONE must be 'utc' or 'local', got '{}'",
                    other
                ))
            }
        };

        let callback_url = env::var("UPLOAD_CALLBACK_URL").ok().filter(|s| !s.is_empty());

        Ok(Self {
            max_file_size,
            allowed_file_types,
            signature_expire_secs,
            key_prefix,
            key_timezone,
            callback_url,
        })
    }
}

/// Signature lifetime must lie in `1..=MAX_SIGNATURE_EXPIRE_SECS`
fn check_signature_expire_secs(secs: i64) -> Result<i64, String> {
    if secs <= 0 {
        return Err("UPLOAD_SIGNATURE_EXPIRE_SECS must be greater than zero".to_string());
    }
    if secs > UploadConfig::MAX_SIGNATURE_EXPIRE_SECS {
        return Err(format!(
            "UPLOAD_SIGNATURE_EXPIRE_SECS must not exceed {}",
            UploadConfig::MAX_SIGNATURE_EXPIRE_SECS
        ));
    }
    Ok(secs)
}

/// Parse a comma-separated extension list ("pdf, .PNG,jpg") into normalized entries
pub fn parse_allowed_file_types(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_start_matches('.').to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool(name: &str, default: bool) -> Result<bool, String> {
    match env::var(name) {
        Ok(value) => match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(format!("{} must be a boolean", name)),
        },
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_allowed_file_types_normalizes_entries() {
        assert_eq!(
            parse_allowed_file_types("pdf, .PNG,,jpg "),
            vec!["pdf".to_string(), "png".to_string(), "jpg".to_string()]
        );
    }

    #[test]
    fn test_parse_allowed_file_types_blank_is_unrestricted() {
        assert!(parse_allowed_file_types("  , ").is_empty());
    }

    #[test]
    fn test_signature_expire_secs_bounds() {
        assert_eq!(check_signature_expire_secs(3600), Ok(3600));
        assert_eq!(
            check_signature_expire_secs(UploadConfig::MAX_SIGNATURE_EXPIRE_SECS),
            Ok(UploadConfig::MAX_SIGNATURE_EXPIRE_SECS)
        );
        assert!(check_signature_expire_secs(0).is_err());
        assert!(check_signature_expire_secs(9_000_000_000_000).is_err());
        assert!(check_signature_expire_secs(i64::MAX).is_err());
    }

    #[test]
    fn test_storage_config_debug_redacts_secret() {
        let config = StorageConfig {
            endpoint: "http://localhost:9000".to_string(),
            public_endpoint: "http://localhost:9000".to_string(),
            access_key: "AKIDEXAMPLE".to_string(),
            secret_key: "super-secret".to_string(),
            bucket: "uploads".to_string(),
            region: "us-east-1".to_string(),
            path_style: true,
            ensure_bucket: false,
            public_read: false,
        };

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("AKIDEXAMPLE"));
    }
}
