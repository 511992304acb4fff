use std::env;
use std::str::FromStr;

use chrono::Duration;

use crate::error::AppError;

const DEFAULT_JWT_EXPIRE: &str = "7d";
const DEFAULT_CLIENT_URL: &str = "https://vrudhacare.onrender.com";
const DEFAULT_RAZORPAY_API: &str = "https://api.razorpay.com/v1";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub razorpay: RazorpayConfig,
    pub cors: CorsConfig,
    pub policy: PolicyConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_size: usize,
    pub environment: Environment,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub uri: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolicyConfig {
    pub order_status: StatusPolicy,
    pub donation_signature: DonationSignaturePolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

/// How admin status updates are checked against the current order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusPolicy {
    /// Any status may follow any other. Matches the existing admin tooling.
    #[default]
    Permissive,
    /// Only transitions allowed by `OrderStatus::can_transition_to`.
    Strict,
}

/// Whether a donation must carry gateway signature proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DonationSignaturePolicy {
    #[default]
    Optional,
    Required,
}

impl FromStr for Environment {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(AppError::Config(format!("Invalid APP_ENV value: {}", other))),
        }
    }
}

impl FromStr for StatusPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(StatusPolicy::Permissive),
            "strict" => Ok(StatusPolicy::Strict),
            other => Err(AppError::Config(format!(
                "Invalid ORDER_STATUS_POLICY value: {}",
                other
            ))),
        }
    }
}

impl FromStr for DonationSignaturePolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "optional" => Ok(DonationSignaturePolicy::Optional),
            "required" => Ok(DonationSignaturePolicy::Required),
            other => Err(AppError::Config(format!(
                "Invalid DONATION_SIGNATURE value: {}",
                other
            ))),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, so tests never touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| AppError::Config(format!("{} must be set", key)))
        };
        let or_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let jwt_expire = or_default("JWT_EXPIRE", DEFAULT_JWT_EXPIRE);

        Ok(Self {
            server: ServerConfig {
                host: or_default("HOST", "0.0.0.0"),
                port: or_default("PORT", "5000")
                    .parse()
                    .map_err(|_| AppError::Config("Invalid PORT value".to_string()))?,
                max_body_size: or_default("MAX_BODY_SIZE", "1048576")
                    .parse()
                    .map_err(|_| AppError::Config("Invalid MAX_BODY_SIZE value".to_string()))?,
                environment: or_default("APP_ENV", "development").parse()?,
            },
            database: DatabaseConfig {
                uri: required("MONGODB_URI")?,
                name: or_default("MONGODB_DB", "vrudhacare"),
            },
            auth: AuthConfig {
                jwt_secret: required("JWT_SECRET")?,
                jwt_ttl: parse_expiry(&jwt_expire).ok_or_else(|| {
                    AppError::Config(format!("Invalid JWT_EXPIRE value: {}", jwt_expire))
                })?,
            },
            razorpay: RazorpayConfig {
                key_id: required("RAZORPAY_KEY_ID")?,
                key_secret: required("RAZORPAY_KEY_SECRET")?,
                api_base: or_default("RAZORPAY_API_BASE", DEFAULT_RAZORPAY_API)
                    .trim_end_matches('/')
                    .to_string(),
            },
            cors: CorsConfig {
                allowed_origins: or_default("CLIENT_URL", DEFAULT_CLIENT_URL)
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            policy: PolicyConfig {
                order_status: or_default("ORDER_STATUS_POLICY", "permissive").parse()?,
                donation_signature: or_default("DONATION_SIGNATURE", "optional").parse()?,
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Parses token lifetimes such as `3600`, `30m`, `12h` or `7d`.
pub fn parse_expiry(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (digits, unit) = match raw.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => raw.split_at(idx),
        None => (raw, "s"),
    };
    let value: i64 = digits.parse().ok()?;
    if value <= 0 {
        return None;
    }

    let seconds = match unit {
        "s" => value,
        "m" => value.checked_mul(60)?,
        "h" => value.checked_mul(60 * 60)?,
        "d" => value.checked_mul(24 * 60 * 60)?,
        _ => return None,
    };

    Duration::try_seconds(seconds)
}
