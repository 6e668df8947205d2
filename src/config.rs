use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// `false` talks plain SMTP without auth (local catchers like Mailpit).
    pub tls: bool,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Unset means the in-memory store.
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    /// Unset means mail is captured in memory and logged.
    pub smtp: Option<SmtpConfig>,
    pub verify_code_ttl_minutes: i64,
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse::<T>().ok()).unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = get("DATABASE_URL").filter(|v| !v.is_empty());
        let jwt = JwtConfig {
            secret: get("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: get("JWT_ISSUER").unwrap_or_else(|| "incognitobox".into()),
            audience: get("JWT_AUDIENCE").unwrap_or_else(|| "incognitobox-users".into()),
            ttl_minutes: parse_or(get("JWT_TTL_MINUTES"), 60),
            refresh_ttl_minutes: parse_or(get("JWT_REFRESH_TTL_MINUTES"), 60 * 24 * 14),
        };
        let smtp = match get("SMTP_HOST").filter(|v| !v.is_empty()) {
            Some(host) => Some(SmtpConfig {
                host,
                port: parse_or(get("SMTP_PORT"), 465),
                tls: parse_or(get("SMTP_TLS"), true),
                username: get("SMTP_USERNAME").unwrap_or_default(),
                password: get("SMTP_PASSWORD").unwrap_or_default(),
                from_email: get("EMAIL_FROM").context("EMAIL_FROM must be set with SMTP_HOST")?,
                from_name: get("EMAIL_FROM_NAME").unwrap_or_else(|| "IncognitoBox".into()),
            }),
            None => None,
        };
        let verify_code_ttl_minutes = parse_or(get("VERIFY_CODE_TTL_MINUTES"), 15);
        anyhow::ensure!(
            verify_code_ttl_minutes > 0,
            "VERIFY_CODE_TTL_MINUTES must be positive"
        );
        Ok(Self {
            database_url,
            jwt,
            smtp,
            verify_code_ttl_minutes,
        })
    }
}
