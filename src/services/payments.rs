//! Payment gateway collaborator.
//!
//! The backend treats payments as an opaque capability: create an intent
//! carrying a typed correlation payload, and read the intent back later to
//! learn its status and recover that payload. The concrete implementation
//! talks to the Stripe REST API over plain HTTP.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

const STRIPE_BASE_URL: &str = "https://api.stripe.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Malformed intent payload: {0}")]
    Payload(String),
}

/// Correlation payload stashed in the intent at creation time and read back
/// at confirmation. This is the only link between a payment and the
/// inventory it will consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentMetadata {
    pub store_id: String,
    pub quantity: i32,
}

impl IntentMetadata {
    /// Stripe metadata is a flat string map; keys match the original API.
    pub fn to_form(&self) -> Vec<(String, String)> {
        vec![
            ("metadata[storeId]".to_string(), self.store_id.clone()),
            ("metadata[quantity]".to_string(), self.quantity.to_string()),
        ]
    }

    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, GatewayError> {
        let store_id = map
            .get("storeId")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| GatewayError::Payload("missing storeId".to_string()))?
            .clone();

        let quantity = map
            .get("quantity")
            .and_then(|q| q.parse::<i32>().ok())
            .filter(|q| *q >= 1)
            .ok_or_else(|| GatewayError::Payload("missing or invalid quantity".to_string()))?;

        Ok(IntentMetadata { store_id, quantity })
    }
}

#[derive(Debug, Clone)]
pub struct CreatedIntent {
    pub id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub id: String,
    pub status: String,
    pub amount_cents: i64,
    pub metadata: IntentMetadata,
}

impl PaymentIntent {
    pub fn succeeded(&self) -> bool {
        self.status == "succeeded"
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(
        &self,
        amount_cents: i64,
        metadata: &IntentMetadata,
    ) -> Result<CreatedIntent, GatewayError>;

    async fn get_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError>;
}

/// Convert a decimal currency amount to integer cents, rejecting negatives.
pub fn to_cents(amount: Decimal) -> Option<i64> {
    let cents = (amount * Decimal::from(100)).round();
    cents.to_i64().filter(|c| *c >= 0)
}

pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

#[derive(Debug, Deserialize)]
struct StripeIntent {
    id: String,
    client_secret: Option<String>,
    status: String,
    amount: i64,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl StripeGateway {
    pub fn new(secret_key: String) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            secret_key,
            base_url: STRIPE_BASE_URL.to_string(),
        })
    }

    pub fn from_env() -> Result<Self, GatewayError> {
        let secret_key =
            std::env::var("STRIPE_SECRET_KEY").expect("STRIPE_SECRET_KEY must be set");
        Self::new(secret_key)
    }

    async fn parse_intent(response: reqwest::Response) -> Result<StripeIntent, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(
        &self,
        amount_cents: i64,
        metadata: &IntentMetadata,
    ) -> Result<CreatedIntent, GatewayError> {
        let mut form = vec![
            ("amount".to_string(), amount_cents.to_string()),
            ("currency".to_string(), "usd".to_string()),
            ("payment_method_types[]".to_string(), "card".to_string()),
        ];
        form.extend(metadata.to_form());

        let response = self
            .client
            .post(format!("{}/payment_intents", self.base_url))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await?;

        let intent = Self::parse_intent(response).await?;
        let client_secret = intent
            .client_secret
            .ok_or_else(|| GatewayError::Payload("missing client_secret".to_string()))?;

        Ok(CreatedIntent {
            id: intent.id,
            client_secret,
        })
    }

    async fn get_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError> {
        let response = self
            .client
            .get(format!("{}/payment_intents/{}", self.base_url, id))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await?;

        let intent = Self::parse_intent(response).await?;
        let metadata = IntentMetadata::from_map(&intent.metadata)?;

        Ok(PaymentIntent {
            id: intent.id,
            status: intent.status,
            amount_cents: intent.amount,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_survives_the_form_round_trip() {
        let metadata = IntentMetadata {
            store_id: "store-17".to_string(),
            quantity: 3,
        };

        let map: HashMap<String, String> = metadata
            .to_form()
            .into_iter()
            .map(|(k, v)| {
                let key = k
                    .trim_start_matches("metadata[")
                    .trim_end_matches(']')
                    .to_string();
                (key, v)
            })
            .collect();

        assert_eq!(IntentMetadata::from_map(&map).unwrap(), metadata);
    }

    #[test]
    fn metadata_rejects_missing_or_invalid_fields() {
        let mut map = HashMap::new();
        assert!(IntentMetadata::from_map(&map).is_err());

        map.insert("storeId".to_string(), "store-1".to_string());
        assert!(IntentMetadata::from_map(&map).is_err());

        map.insert("quantity".to_string(), "zero".to_string());
        assert!(IntentMetadata::from_map(&map).is_err());

        map.insert("quantity".to_string(), "0".to_string());
        assert!(IntentMetadata::from_map(&map).is_err());

        map.insert("quantity".to_string(), "2".to_string());
        assert!(IntentMetadata::from_map(&map).is_ok());
    }

    #[test]
    fn cents_conversion() {
        assert_eq!(to_cents(Decimal::new(1999, 2)), Some(1999)); // 19.99
        assert_eq!(to_cents(Decimal::new(5, 0)), Some(500)); // 5.00
        assert_eq!(to_cents(Decimal::ZERO), Some(0));
        assert_eq!(to_cents(Decimal::new(-100, 2)), None);

        assert_eq!(from_cents(1999), Decimal::new(1999, 2));
        assert_eq!(from_cents(500).to_string(), "5.00");
    }

    #[test]
    fn succeeded_matches_stripe_status() {
        let intent = PaymentIntent {
            id: "pi_1".to_string(),
            status: "succeeded".to_string(),
            amount_cents: 1000,
            metadata: IntentMetadata {
                store_id: "store-1".to_string(),
                quantity: 1,
            },
        };
        assert!(intent.succeeded());

        let pending = PaymentIntent {
            status: "requires_payment_method".to_string(),
            ..intent
        };
        assert!(!pending.succeeded());
    }
}
