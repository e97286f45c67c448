use std::env;
use std::path::PathBuf;
use std::time::Duration;

use orderdesk_core::{AppError, AppResult};
use orderdesk_infrastructure::ApiBaseUrl;
use tracing_subscriber::EnvFilter;

const DEFAULT_STATE_FILE: &str = ".orderdesk/state.json";
const DEFAULT_PLATFORM: &str = "cli";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: ApiBaseUrl,
    pub token_public_key_path: PathBuf,
    pub token_issuer: String,
    pub token_audience: String,
    pub state_file: PathBuf,
    pub platform: String,
    pub renewal_timeout: Duration,
    pub http_timeout: Duration,
}

impl ClientConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let api_base_url = ApiBaseUrl::parse(required(&lookup, "ORDERDESK_API_BASE_URL")?.as_str())?;
        let token_public_key_path =
            PathBuf::from(required(&lookup, "ORDERDESK_TOKEN_PUBLIC_KEY_PATH")?);
        let token_issuer = required(&lookup, "ORDERDESK_TOKEN_ISSUER")?;
        let token_audience = required(&lookup, "ORDERDESK_TOKEN_AUDIENCE")?;
        let state_file = optional(&lookup, "ORDERDESK_STATE_FILE")
            .map_or_else(|| PathBuf::from(DEFAULT_STATE_FILE), PathBuf::from);
        let platform =
            optional(&lookup, "ORDERDESK_PLATFORM").unwrap_or_else(|| DEFAULT_PLATFORM.to_owned());
        let renewal_timeout_ms = parse_env_u64(&lookup, "ORDERDESK_RENEWAL_TIMEOUT_MS", 10_000)?;
        let http_timeout_secs = parse_env_u64(&lookup, "ORDERDESK_HTTP_TIMEOUT_SECS", 15)?;

        if renewal_timeout_ms == 0 {
            return Err(AppError::Validation(
                "ORDERDESK_RENEWAL_TIMEOUT_MS must be greater than zero".to_owned(),
            ));
        }

        if http_timeout_secs == 0 {
            return Err(AppError::Validation(
                "ORDERDESK_HTTP_TIMEOUT_SECS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            api_base_url,
            token_public_key_path,
            token_issuer,
            token_audience,
            state_file,
            platform,
            renewal_timeout: Duration::from_millis(renewal_timeout_ms),
            http_timeout: Duration::from_secs(http_timeout_secs),
        })
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> AppResult<String> {
    optional(lookup, name).ok_or_else(|| AppError::Validation(format!("{name} is required")))
}

fn parse_env_u64(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
) -> AppResult<u64> {
    match optional(lookup, name) {
        Some(value) => value
            .parse::<u64>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
        None => Ok(default),
    }
}
