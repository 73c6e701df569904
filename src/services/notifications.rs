//! Confirmation delivery (email + SMS).
//!
//! Strictly best-effort: delivery runs on a detached task after the
//! reservation has committed, and a failure is only ever logged. Email goes
//! through the SendGrid REST API, SMS through Twilio.

use std::time::Duration;

use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;

const SENDGRID_URL: &str = "https://api.sendgrid.com/v3/mail/send";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Everything a confirmation message needs, denormalized from the
/// reservation and its store so no database access happens off the request
/// path.
#[derive(Debug, Clone)]
pub struct ReservationSummary {
    pub reservation_id: String,
    pub customer_name: String,
    pub store_name: String,
    pub store_address: String,
    pub quantity: i32,
    pub total_amount: Decimal,
    pub pickup_time: String,
    pub email: String,
    pub phone: String,
}

#[derive(Clone)]
struct EmailConfig {
    api_key: String,
    from_address: String,
}

#[derive(Clone)]
struct SmsConfig {
    account_sid: String,
    auth_token: String,
    from_number: String,
}

#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
    email: Option<EmailConfig>,
    sms: Option<SmsConfig>,
}

impl Notifier {
    /// Channels without credentials are silently disabled; a deployment
    /// without SendGrid or Twilio still takes reservations.
    pub fn from_env() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build notification HTTP client");

        let email = match (
            std::env::var("SENDGRID_API_KEY"),
            std::env::var("NOTIFY_FROM_EMAIL"),
        ) {
            (Ok(api_key), Ok(from_address)) => Some(EmailConfig {
                api_key,
                from_address,
            }),
            _ => None,
        };

        let sms = match (
            std::env::var("TWILIO_ACCOUNT_SID"),
            std::env::var("TWILIO_AUTH_TOKEN"),
            std::env::var("TWILIO_PHONE_NUMBER"),
        ) {
            (Ok(account_sid), Ok(auth_token), Ok(from_number)) => Some(SmsConfig {
                account_sid,
                auth_token,
                from_number,
            }),
            _ => None,
        };

        Self { client, email, sms }
    }

    /// Send confirmation over every channel the summary has an address for.
    /// Partial failures are collected so the caller can log one line.
    pub async fn send_confirmation(&self, data: &ReservationSummary) -> Result<(), NotifyError> {
        let mut failures = Vec::new();

        if !data.email.is_empty() {
            if let Some(config) = &self.email {
                if let Err(err) = self.send_email(config, data).await {
                    failures.push(format!("email: {}", err));
                }
            }
        }

        if !data.phone.is_empty() {
            if let Some(config) = &self.sms {
                if let Err(err) = self.send_sms(config, data).await {
                    failures.push(format!("sms: {}", err));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(NotifyError::Delivery(failures.join("; ")))
        }
    }

    async fn send_email(
        &self,
        config: &EmailConfig,
        data: &ReservationSummary,
    ) -> Result<(), NotifyError> {
        let body = json!({
            "personalizations": [{ "to": [{ "email": data.email }] }],
            "from": { "email": config.from_address },
            "subject": format!("Reservation confirmed - {}", data.store_name),
            "content": [{ "type": "text/plain", "value": email_body(data) }],
        });

        let response = self
            .client
            .post(SENDGRID_URL)
            .bearer_auth(&config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NotifyError::Delivery(format!(
                "SendGrid returned {}: {}",
                status, message
            )));
        }
        Ok(())
    }

    async fn send_sms(
        &self,
        config: &SmsConfig,
        data: &ReservationSummary,
    ) -> Result<(), NotifyError> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            config.account_sid
        );

        let response = self
            .client
            .post(url)
            .basic_auth(&config.account_sid, Some(&config.auth_token))
            .form(&[
                ("From", config.from_number.as_str()),
                ("To", data.phone.as_str()),
                ("Body", &sms_body(data)),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Delivery(format!(
                "Twilio returned {}",
                status
            )));
        }
        Ok(())
    }
}

/// Fire-and-forget dispatch. The request that created the reservation never
/// awaits or observes this task.
pub fn dispatch_confirmation(notifier: Notifier, data: ReservationSummary) {
    tokio::spawn(async move {
        match notifier.send_confirmation(&data).await {
            Ok(()) => log::info!("Confirmation sent for reservation {}", data.reservation_id),
            Err(err) => log::warn!(
                "Failed to send confirmation for reservation {}: {}",
                data.reservation_id,
                err
            ),
        }
    });
}

fn email_body(data: &ReservationSummary) -> String {
    format!(
        "Hi {},\n\n\
         Your reservation is confirmed.\n\n\
         Order: {}\n\
         Store: {}\n\
         Address: {}\n\
         Bags: {}\n\
         Total: {}\n\
         Pickup: {}\n\n\
         Please arrive during the pickup window. Enjoy!",
        data.customer_name,
        data.reservation_id,
        data.store_name,
        data.store_address,
        data.quantity,
        data.total_amount,
        data.pickup_time,
    )
}

fn sms_body(data: &ReservationSummary) -> String {
    format!(
        "Reservation #{} confirmed: {} bag(s) at {}, pickup {}. Total {}.",
        data.reservation_id, data.quantity, data.store_name, data.pickup_time, data.total_amount,
    )
}
