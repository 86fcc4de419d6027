//! Payment processor adapters implementing `BasePaymentProcessor`.

pub mod adyen;
pub mod stripe;

pub use adyen::{AdyenEnvironment, AdyenOptions, AdyenProcessor};
pub use stripe::{StripeOptions, StripeProcessor};
