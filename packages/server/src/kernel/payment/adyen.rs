//! Adyen for Platforms account holder provisioning.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::kernel::{AccountHolder, BasePaymentProcessor};

const ADYEN_TEST_BASE: &str = "https://cal-test.adyen.com/cal/services/Account/v6";
const ADYEN_LIVE_BASE: &str = "https://cal-live.adyen.com/cal/services/Account/v6";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdyenEnvironment {
    Test,
    Live,
}

impl AdyenEnvironment {
    fn base_url(&self) -> &'static str {
        match self {
            Self::Test => ADYEN_TEST_BASE,
            Self::Live => ADYEN_LIVE_BASE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdyenOptions {
    pub api_key: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl AdyenOptions {
    pub fn new(api_key: impl Into<String>, environment: AdyenEnvironment) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: environment.base_url().to_string(),
            timeout: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateAccountHolderRequest<'a> {
    account_holder_code: String,
    account_holder_details: AccountHolderDetails<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AccountHolderDetails<'a> {
    address: ViasAddress<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ViasAddress<'a> {
    city: &'a str,
    country: &'a str,
    house_number_or_name: &'a str,
    postal_code: &'a str,
    state_or_province: &'a str,
    street: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAccountHolderResponse {
    account_code: String,
}

/// Creates Adyen account holders; the returned account code is the reference.
#[derive(Debug, Clone)]
pub struct AdyenProcessor {
    options: AdyenOptions,
    client: Client,
}

impl AdyenProcessor {
    pub fn new(options: AdyenOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .build()
            .context("Failed to build Adyen HTTP client")?;
        Ok(Self { options, client })
    }

    fn request(holder: &AccountHolder) -> CreateAccountHolderRequest<'_> {
        CreateAccountHolderRequest {
            account_holder_code: Uuid::new_v4().simple().to_string(),
            account_holder_details: AccountHolderDetails {
                address: ViasAddress {
                    city: &holder.city,
                    country: &holder.country,
                    house_number_or_name: &holder.house_number,
                    postal_code: &holder.postal_code,
                    state_or_province: &holder.state,
                    street: &holder.street,
                },
            },
        }
    }
}

#[async_trait]
impl BasePaymentProcessor for AdyenProcessor {
    async fn create_account_holder(&self, holder: &AccountHolder) -> Result<String> {
        let url = format!("{}/createAccountHolder", self.options.api_base);

        let response = self
            .client
            .post(url)
            .header("X-API-Key", &self.options.api_key)
            .json(&Self::request(holder))
            .send()
            .await
            .context("Request to Adyen failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Adyen returned {}: {}", status, body));
        }

        let created = response
            .json::<CreateAccountHolderResponse>()
            .await
            .context("Failed to parse Adyen account holder response")?;

        Ok(created.account_code)
    }

    fn name(&self) -> &'static str {
        "adyen"
    }
}
