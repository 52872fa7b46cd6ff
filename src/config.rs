// Runtime configuration for the storefront services

use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use anyhow::Context;
use tracing::{debug, info};

// Where persisted collections live
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

// Food order pricing rules
#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub delivery_fee: f64,
    pub tax_rate: f64,
    pub minimum_subtotal: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            delivery_fee: 3.00,
            tax_rate: 0.10,
            minimum_subtotal: 15.00,
        }
    }
}

// Longest session a login can open: one year
pub const MAX_SESSION_TTL_MINUTES: i64 = 60 * 24 * 365;

// Credential hashing and session settings
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub min_password_len: usize,
    pub session_ttl_minutes: i64,
    // Argon2 memory cost in KiB.
    pub hash_memory_kib: u32,
    pub hash_iterations: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            min_password_len: 6,
            session_ttl_minutes: 60 * 24,
            hash_memory_kib: argon2::Params::DEFAULT_M_COST,
            hash_iterations: argon2::Params::DEFAULT_T_COST,
        }
    }
}

impl AuthConfig {
    // Cheap hashing parameters so tests don't spend seconds in argon2
    pub fn fast_for_tests() -> Self {
        Self {
            hash_memory_kib: 1024,
            hash_iterations: 1,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub filter: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "bistro_inn=info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub pricing: PricingConfig,
    pub auth: AuthConfig,
    pub log: LogConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            store: StoreConfig {
                data_dir: PathBuf::from(try_load(
                    "BISTRO_DATA_DIR",
                    defaults.store.data_dir.display().to_string(),
                )?),
            },
            pricing: PricingConfig {
                delivery_fee: try_load("BISTRO_DELIVERY_FEE", defaults.pricing.delivery_fee)?,
                tax_rate: try_load("BISTRO_TAX_RATE", defaults.pricing.tax_rate)?,
                minimum_subtotal: try_load(
                    "BISTRO_MINIMUM_SUBTOTAL",
                    defaults.pricing.minimum_subtotal,
                )?,
            },
            auth: AuthConfig {
                min_password_len: try_load(
                    "BISTRO_MIN_PASSWORD_LEN",
                    defaults.auth.min_password_len,
                )?,
                session_ttl_minutes: try_load(
                    "BISTRO_SESSION_TTL_MINUTES",
                    defaults.auth.session_ttl_minutes,
                )?,
                hash_memory_kib: try_load("BISTRO_HASH_MEMORY_KIB", defaults.auth.hash_memory_kib)?,
                hash_iterations: try_load("BISTRO_HASH_ITERATIONS", defaults.auth.hash_iterations)?,
            },
            log: LogConfig {
                filter: try_load("BISTRO_LOG", defaults.log.filter)?,
                json: env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false),
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let ttl = self.auth.session_ttl_minutes;
        if !(1..=MAX_SESSION_TTL_MINUTES).contains(&ttl) {
            anyhow::bail!(
                "BISTRO_SESSION_TTL_MINUTES must be between 1 and {MAX_SESSION_TTL_MINUTES}, got {ttl}"
            );
        }
        Ok(())
    }
}

fn try_load<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => {
            debug!(key, "loaded from environment");
            raw.parse::<T>()
                .with_context(|| format!("invalid value for {key}: {raw:?}"))
        }
        Err(_) => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
