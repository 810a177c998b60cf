use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Base used to build the public access URL of stored files.
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub max_bytes: usize,
    pub allowed_types: Vec<String>,
}

/// Declared in the environment but not consulted on request paths.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub max_requests: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
    pub hash_memory_kib: u32,
    pub cors_allowed_origins: Vec<String>,
    pub rate_limit: RateLimitConfig,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_list(key: &str, default: &str) -> Vec<String> {
    env_or(key, default)
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: env_or("JWT_ISSUER", "raciones"),
            audience: env_or("JWT_AUDIENCE", "raciones-users"),
            // 7 days
            ttl_minutes: env_parse("JWT_TTL_MINUTES", 7 * 24 * 60),
        };
        let storage = StorageConfig {
            endpoint: std::env::var("S3_ENDPOINT")?,
            bucket: env_or("S3_BUCKET", "raciones"),
            access_key: std::env::var("S3_ACCESS_KEY")?,
            secret_key: std::env::var("S3_SECRET_KEY")?,
            region: env_or("S3_REGION", "us-east-1"),
            public_base_url: env_or("PUBLIC_BASE_URL", "http://localhost:8080"),
        };
        let upload = UploadConfig {
            max_bytes: env_parse("MAX_UPLOAD_BYTES", 10 * 1024 * 1024),
            allowed_types: env_list(
                "ALLOWED_MIME_TYPES",
                "image/jpeg,image/png,image/webp,application/pdf",
            ),
        };
        let rate_limit = RateLimitConfig {
            window_secs: env_parse("RATE_LIMIT_WINDOW_SECS", 60),
            max_requests: env_parse("RATE_LIMIT_MAX_REQUESTS", 100),
        };
        Ok(Self {
            database_url,
            jwt,
            storage,
            upload,
            hash_memory_kib: env_parse("HASH_MEMORY_KIB", 19_456),
            cors_allowed_origins: env_list("CORS_ALLOWED_ORIGINS", "*"),
            rate_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_list_splits_and_trims() {
        std::env::set_var("TEST_MIME_LIST", "image/png, image/jpeg ,,application/pdf");
        let list = env_list("TEST_MIME_LIST", "");
        assert_eq!(list, vec!["image/png", "image/jpeg", "application/pdf"]);
    }

    #[test]
    fn env_parse_falls_back_on_garbage() {
        std::env::set_var("TEST_NOT_A_NUMBER", "many");
        assert_eq!(env_parse("TEST_NOT_A_NUMBER", 42_i64), 42);
        assert_eq!(env_parse("TEST_UNSET_KEY", 7_u32), 7);
    }
}
