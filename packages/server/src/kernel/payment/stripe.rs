//! Stripe Connect account provisioning.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::kernel::{AccountHolder, BasePaymentProcessor};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

#[derive(Debug, Clone)]
pub struct StripeOptions {
    pub api_key: String,
    /// Overridable for tests and proxies
    pub api_base: String,
    pub timeout: Duration,
}

impl StripeOptions {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: STRIPE_API_BASE.to_string(),
            timeout: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StripeAccount {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

/// Creates custom Connect accounts with card payments and transfers requested.
#[derive(Debug, Clone)]
pub struct StripeProcessor {
    options: StripeOptions,
    client: Client,
}

impl StripeProcessor {
    pub fn new(options: StripeOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .build()
            .context("Failed to build Stripe HTTP client")?;
        Ok(Self { options, client })
    }

    fn account_form(holder: &AccountHolder) -> Vec<(&'static str, String)> {
        let country = if holder.country.is_empty() {
            "US".to_string()
        } else {
            holder.country.clone()
        };

        vec![
            ("type", "custom".to_string()),
            ("country", country),
            ("business_profile[name]", holder.name.clone()),
            ("capabilities[card_payments][requested]", "true".to_string()),
            ("capabilities[transfers][requested]", "true".to_string()),
        ]
    }
}

#[async_trait]
impl BasePaymentProcessor for StripeProcessor {
    async fn create_account_holder(&self, holder: &AccountHolder) -> Result<String> {
        let url = format!("{}/accounts", self.options.api_base);

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.options.api_key)
            .form(&Self::account_form(holder))
            .send()
            .await
            .context("Request to Stripe failed")?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<StripeErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_default();
            return Err(anyhow!("Stripe returned {}: {}", status, message));
        }

        let account = response
            .json::<StripeAccount>()
            .await
            .context("Failed to parse Stripe account response")?;

        Ok(account.id)
    }

    fn name(&self) -> &'static str {
        "stripe"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holder(country: &str) -> AccountHolder {
        AccountHolder {
            name: "Acme".to_string(),
            city: "Reno".to_string(),
            country: country.to_string(),
            house_number: "1".to_string(),
            postal_code: "89501".to_string(),
            state: "NV".to_string(),
            street: "Main St".to_string(),
        }
    }

    #[test]
    fn test_account_form_requests_capabilities() {
        let form = StripeProcessor::account_form(&holder("US"));

        assert!(form.contains(&("type", "custom".to_string())));
        assert!(form.contains(&("capabilities[card_payments][requested]", "true".to_string())));
        assert!(form.contains(&("capabilities[transfers][requested]", "true".to_string())));
        assert!(form.contains(&("business_profile[name]", "Acme".to_string())));
    }

    #[test]
    fn test_account_form_defaults_country() {
        let form = StripeProcessor::account_form(&holder(""));
        assert!(form.contains(&("country", "US".to_string())));
    }
}
