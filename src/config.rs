use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub cors_origins: Vec<String>,
    pub cookie_secure: bool,
    pub db_max_connections: u32,
    pub concurrency_limit: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_var("APP_PORT", 3000);
        let jwt_ttl_hours = parse_var("JWT_TTL_HOURS", 24);
        let cors_origins = env::var("CORS_ORIGINS")
            .map(|raw| split_origins(&raw))
            .unwrap_or_else(|_| vec!["http://localhost:5173".to_string()]);
        let cookie_secure = parse_var("COOKIE_SECURE", false);
        let db_max_connections = parse_var("DB_MAX_CONNECTIONS", 10);
        let concurrency_limit = parse_var("CONCURRENCY_LIMIT", 100);
        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            jwt_ttl_hours,
            cors_origins,
            cookie_secure,
            db_max_connections,
            concurrency_limit,
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::split_origins;

    #[test]
    fn origins_are_trimmed_and_empty_entries_dropped() {
        let origins = split_origins(" http://localhost:5173, ,http://127.0.0.1:5173 ,");
        assert_eq!(
            origins,
            vec!["http://localhost:5173", "http://127.0.0.1:5173"]
        );
    }
}
