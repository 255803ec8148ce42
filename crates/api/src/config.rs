use std::str::FromStr;

use servicematch_core::fees::{validate_fee_bps, DEFAULT_FEE_BPS};

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// Everything except `DATABASE_URL` and `JWT_SECRET` has a development
/// default. Stripe and OpenAI are optional: without keys, checkout endpoints
/// answer 503 and the AI helpers use their static tables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// JWT token configuration (secret, expiry durations).
    pub jwt: JwtConfig,
    /// Platform commission in basis points (default: `1800`, i.e. 18%).
    pub platform_fee_bps: i64,
    /// Public URL of the web client, used for checkout and onboarding redirects.
    pub app_base_url: String,
    pub stripe: Option<StripeSettings>,
    pub openai: Option<OpenAiSettings>,
    /// Interval of the quote expiry sweep in seconds (default: `300`).
    pub quote_expiry_sweep_secs: u64,
}

#[derive(Debug, Clone)]
pub struct StripeSettings {
    pub secret_key: String,
    pub webhook_secret: Option<String>,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub model: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                 |
    /// |---------------------------|-------------------------|
    /// | `HOST`                    | `0.0.0.0`               |
    /// | `PORT`                    | `3000`                  |
    /// | `CORS_ORIGINS`            | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                    |
    /// | `PLATFORM_FEE_BPS`        | `1800`                  |
    /// | `APP_BASE_URL`            | `http://localhost:5173` |
    /// | `STRIPE_SECRET_KEY`       | unset (payments off)    |
    /// | `STRIPE_WEBHOOK_SECRET`   | unset                   |
    /// | `STRIPE_CURRENCY`         | `gbp`                   |
    /// | `OPENAI_API_KEY`          | unset (fallback only)   |
    /// | `OPENAI_MODEL`            | `gpt-4o-mini`           |
    /// | `QUOTE_EXPIRY_SWEEP_SECS` | `300`                   |
    ///
    /// # Panics
    ///
    /// Panics on malformed values so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env_parse("PORT", 3000);

        let cors_origins = parse_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        let request_timeout_secs: u64 = env_parse("REQUEST_TIMEOUT_SECS", 30);

        let platform_fee_bps: i64 = env_parse("PLATFORM_FEE_BPS", DEFAULT_FEE_BPS);
        if let Err(e) = validate_fee_bps(platform_fee_bps) {
            panic!("PLATFORM_FEE_BPS is invalid: {e}");
        }

        let app_base_url = std::env::var("APP_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .trim_end_matches('/')
            .to_string();

        let stripe = non_empty_env("STRIPE_SECRET_KEY").map(|secret_key| StripeSettings {
            secret_key,
            webhook_secret: non_empty_env("STRIPE_WEBHOOK_SECRET"),
            currency: std::env::var("STRIPE_CURRENCY")
                .unwrap_or_else(|_| "gbp".into())
                .to_lowercase(),
        });

        let openai = non_empty_env("OPENAI_API_KEY").map(|api_key| OpenAiSettings {
            api_key,
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into()),
        });

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            platform_fee_bps,
            app_base_url,
            stripe,
            openai,
            quote_expiry_sweep_secs: env_parse("QUOTE_EXPIRY_SWEEP_SECS", 300),
        }
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} must be a valid {}: {e}", std::any::type_name::<T>())),
        Err(_) => default,
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
