use std::env;

use anyhow::{Context, Result};

const DEFAULT_MAX_HTML_BYTES: usize = 2 * 1024 * 1024;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Bootstrap key that authenticates as a system administrator
    pub admin_api_key: Option<String>,
    /// Apply pending schema migrations on startup
    pub run_migrations: bool,
    /// Largest HTML body the sanitizer accepts
    pub max_html_bytes: usize,
    /// Largest .docx upload the converter accepts
    pub max_upload_bytes: usize,
    pub graph: GraphConfig,
}

/// Microsoft Graph application credentials
#[derive(Clone, Default)]
pub struct GraphConfig {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub base_url: String,
    pub login_url: String,
}

impl GraphConfig {
    /// Check if all client-credential settings are present
    pub fn enabled(&self) -> bool {
        self.tenant_id.is_some() && self.client_id.is_some() && self.client_secret.is_some()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: parse_var("PORT", 8080)?,
            admin_api_key: non_empty_var("ADMIN_API_KEY"),
            run_migrations: parse_bool(env::var("RUN_MIGRATIONS").ok().as_deref(), true),
            max_html_bytes: parse_var("MAX_HTML_BYTES", DEFAULT_MAX_HTML_BYTES)?,
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            graph: GraphConfig {
                tenant_id: non_empty_var("GRAPH_TENANT_ID"),
                client_id: non_empty_var("GRAPH_CLIENT_ID"),
                client_secret: non_empty_var("GRAPH_CLIENT_SECRET"),
                base_url: env::var("GRAPH_BASE_URL")
                    .unwrap_or_else(|_| "https://graph.microsoft.com/v1.0".to_string()),
                login_url: env::var("GRAPH_LOGIN_URL")
                    .unwrap_or_else(|_| "https://login.microsoftonline.com".to_string()),
            },
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", name, raw)),
        Err(_) => Ok(default),
    }
}

fn parse_bool(raw: Option<&str>, default: bool) -> bool {
    match raw.map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
