use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

use crate::kernel::{AdyenEnvironment, OnFull, QueuePolicy};

/// Which payment processor provisions account holders
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessorConfig {
    Stripe {
        api_key: String,
    },
    Adyen {
        api_key: String,
        environment: AdyenEnvironment,
    },
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub nats_url: String,
    pub processor: ProcessorConfig,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub creation_timeout: Duration,
    pub publish_queue: QueuePolicy,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            nats_url: env::var("NATS_URL").context("NATS_URL must be set")?,
            processor: processor_from_env()?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "orgs".to_string()),
            creation_timeout: Duration::from_millis(
                env::var("CREATION_TIMEOUT_MS")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .context("CREATION_TIMEOUT_MS must be a number of milliseconds")?,
            ),
            publish_queue: queue_policy(
                env::var("PUBLISH_QUEUE_CAPACITY").ok().as_deref(),
                env::var("PUBLISH_QUEUE_ON_FULL").ok().as_deref(),
            )?,
        })
    }
}

fn processor_from_env() -> Result<ProcessorConfig> {
    let vendor = env::var("PAYMENT_PROCESSOR").unwrap_or_else(|_| "stripe".to_string());

    match vendor.as_str() {
        "stripe" => Ok(ProcessorConfig::Stripe {
            api_key: env::var("STRIPE_API_KEY").context("STRIPE_API_KEY must be set")?,
        }),
        "adyen" => Ok(ProcessorConfig::Adyen {
            api_key: env::var("ADYEN_API_KEY").context("ADYEN_API_KEY must be set")?,
            environment: adyen_environment(env::var("ADYEN_ENVIRONMENT").ok().as_deref())?,
        }),
        other => bail!("PAYMENT_PROCESSOR must be 'stripe' or 'adyen', got '{}'", other),
    }
}

fn adyen_environment(value: Option<&str>) -> Result<AdyenEnvironment> {
    match value.unwrap_or("test") {
        "test" => Ok(AdyenEnvironment::Test),
        "live" => Ok(AdyenEnvironment::Live),
        other => bail!("ADYEN_ENVIRONMENT must be 'test' or 'live', got '{}'", other),
    }
}

/// Unset capacity means an unbounded queue.
fn queue_policy(capacity: Option<&str>, on_full: Option<&str>) -> Result<QueuePolicy> {
    let Some(capacity) = capacity else {
        return Ok(QueuePolicy::Unbounded);
    };

    let capacity: usize = capacity
        .parse()
        .context("PUBLISH_QUEUE_CAPACITY must be a positive number")?;
    if capacity == 0 {
        bail!("PUBLISH_QUEUE_CAPACITY must be a positive number");
    }

    let on_full = match on_full.unwrap_or("block") {
        "block" => OnFull::Block,
        "reject" => OnFull::Reject,
        other => bail!("PUBLISH_QUEUE_ON_FULL must be 'block' or 'reject', got '{}'", other),
    };

    Ok(QueuePolicy::Bounded { capacity, on_full })
}
