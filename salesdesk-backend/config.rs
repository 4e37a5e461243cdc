use std::time::Duration;

pub const DEFAULT_WEBHOOK_URL: &str = "http://localhost:5678/webhook/madison-sales-webhook";
pub const DEFAULT_CHAT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4";
pub const DEFAULT_CHANNEL: &str = "#sales-reports";

const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CHAT_TIMEOUT_SECS: u64 = 60;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub sentry_dsn: Option<String>,
    pub environment: String,
    pub webhook_url: String,
    pub webhook_timeout: Duration,
    pub chat_api_base: String,
    pub chat_model: String,
    pub chat_timeout: Duration,
    pub default_channel: String,
}

/// Raw string values as they come from the environment, one field per variable.
#[derive(Debug, Default)]
pub struct RawConfig<'a> {
    pub port: Option<&'a str>,
    pub sentry_dsn: Option<&'a str>,
    pub environment: Option<&'a str>,
    pub webhook_url: Option<&'a str>,
    pub webhook_timeout_secs: Option<&'a str>,
    pub chat_api_base: Option<&'a str>,
    pub chat_model: Option<&'a str>,
    pub chat_timeout_secs: Option<&'a str>,
    pub default_channel: Option<&'a str>,
}

impl Config {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok();

        let port = var("PORT");
        let sentry_dsn = var("SENTRY_DSN");
        let environment = var("ENVIRONMENT");
        let webhook_url = var("WEBHOOK_URL");
        let webhook_timeout_secs = var("WEBHOOK_TIMEOUT_SECS");
        let chat_api_base = var("CHAT_API_BASE");
        let chat_model = var("CHAT_MODEL");
        let chat_timeout_secs = var("CHAT_TIMEOUT_SECS");
        let default_channel = var("DEFAULT_CHANNEL");

        Self::from_raw_values(RawConfig {
            port: port.as_deref(),
            sentry_dsn: sentry_dsn.as_deref(),
            environment: environment.as_deref(),
            webhook_url: webhook_url.as_deref(),
            webhook_timeout_secs: webhook_timeout_secs.as_deref(),
            chat_api_base: chat_api_base.as_deref(),
            chat_model: chat_model.as_deref(),
            chat_timeout_secs: chat_timeout_secs.as_deref(),
            default_channel: default_channel.as_deref(),
        })
    }

    /// Build a Config from raw string values (as they would come from env vars).
    /// Used directly in tests to avoid mutating process-global environment.
    pub fn from_raw_values(raw: RawConfig<'_>) -> Self {
        let port = raw.port.and_then(|v| v.parse().ok()).unwrap_or(8081);

        let sentry_dsn = non_empty(raw.sentry_dsn);

        let environment = non_empty(raw.environment).unwrap_or_else(|| "local".to_string());

        let webhook_url =
            non_empty(raw.webhook_url).unwrap_or_else(|| DEFAULT_WEBHOOK_URL.to_string());

        let webhook_timeout = seconds(raw.webhook_timeout_secs, DEFAULT_WEBHOOK_TIMEOUT_SECS);

        let chat_api_base = non_empty(raw.chat_api_base)
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_CHAT_API_BASE.to_string());

        let chat_model = non_empty(raw.chat_model).unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string());

        let chat_timeout = seconds(raw.chat_timeout_secs, DEFAULT_CHAT_TIMEOUT_SECS);

        let default_channel =
            non_empty(raw.default_channel).unwrap_or_else(|| DEFAULT_CHANNEL.to_string());

        Config {
            port,
            sentry_dsn,
            environment,
            webhook_url,
            webhook_timeout,
            chat_api_base,
            chat_model,
            chat_timeout,
            default_channel,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Zero is treated as unset: an unbounded wait is never configured.
fn seconds(value: Option<&str>, default: u64) -> Duration {
    let secs = value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|&s| s > 0)
        .unwrap_or(default);
    Duration::from_secs(secs)
}
