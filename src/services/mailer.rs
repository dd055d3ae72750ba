//! Outbound email with the free-tier allow-list workaround.
//!
//! Recipients outside `ALLOWED_EMAILS` never get real delivery; the caller
//! receives [`Delivery::LinkOnly`] and shows the reset link directly. This
//! mirrors the transactional provider's recipient-verification limits and
//! is not a security feature.

use std::sync::Arc;

use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::Config;

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Outcome of a delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The message was handed to the provider.
    Sent,
    /// No delivery happened; the caller should surface the link itself.
    LinkOnly,
}

enum Provider {
    Smtp {
        transport: AsyncSmtpTransport<Tokio1Executor>,
        from: String,
    },
    Resend {
        client: reqwest::Client,
        api_key: String,
        from: String,
    },
}

struct MailerInner {
    provider: Option<Provider>,
    config: Arc<Config>,
}

#[derive(Clone)]
pub struct Mailer {
    inner: Arc<MailerInner>,
}

impl Mailer {
    pub fn new(config: Arc<Config>) -> Self {
        let provider = build_provider(&config);
        if provider.is_none() {
            tracing::warn!("No email provider configured; reset links will be shown directly");
        }
        Self {
            inner: Arc::new(MailerInner { provider, config }),
        }
    }

    /// Send the password-reset email, or report that the caller should show
    /// the link instead.
    pub async fn send_password_reset(&self, to: &str, reset_link: &str) -> Delivery {
        let config = &self.inner.config;

        if !config.email.is_allowed_recipient(to) {
            tracing::info!(recipient = %to, "Recipient not on the allow-list, skipping delivery");
            return Delivery::LinkOnly;
        }

        let provider = match &self.inner.provider {
            Some(p) => p,
            None => return Delivery::LinkOnly,
        };

        let subject = format!("{} - Password recovery", config.app_name);
        let body = format!(
            "A password reset was requested for this address.\n\n\
             Open the link below to choose a new password (valid for one hour):\n\n{}\n\n\
             If you did not request this, you can ignore this message.",
            reset_link
        );

        let sent = match provider {
            Provider::Smtp { transport, from } => {
                send_smtp(transport, from, to, &subject, &body).await
            }
            Provider::Resend {
                client,
                api_key,
                from,
            } => send_resend(client, api_key, from, to, &subject, &body).await,
        };

        match sent {
            Ok(()) => Delivery::Sent,
            Err(e) => {
                tracing::error!("Failed to send password reset email: {}", e);
                Delivery::LinkOnly
            }
        }
    }
}

fn build_provider(config: &Config) -> Option<Provider> {
    let email = &config.email;

    if let Some(api_key) = &email.resend_api_key {
        return Some(Provider::Resend {
            client: reqwest::Client::new(),
            api_key: api_key.clone(),
            from: format!("{} <onboarding@resend.dev>", config.app_name),
        });
    }

    match (&email.smtp_server, &email.smtp_email, &email.smtp_password) {
        (Some(server), Some(sender), Some(password)) => {
            let creds = Credentials::new(sender.clone(), password.clone());
            let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(server)
                .ok()?
                .port(email.smtp_port)
                .credentials(creds)
                .build();
            Some(Provider::Smtp {
                transport,
                from: format!("{} <{}>", config.app_name, sender),
            })
        }
        _ => None,
    }
}

async fn send_smtp(
    transport: &AsyncSmtpTransport<Tokio1Executor>,
    from: &str,
    to: &str,
    subject: &str,
    body: &str,
) -> Result<(), String> {
    let from_mailbox = from
        .parse()
        .map_err(|_| "Invalid from address".to_string())?;
    let to_mailbox = to
        .parse()
        .map_err(|_| "Invalid recipient address".to_string())?;

    let email = Message::builder()
        .from(from_mailbox)
        .to(to_mailbox)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(|e| format!("Failed to build email: {}", e))?;

    transport
        .send(email)
        .await
        .map(|_| ())
        .map_err(|e| format!("SMTP send failed: {}", e))
}

async fn send_resend(
    client: &reqwest::Client,
    api_key: &str,
    from: &str,
    to: &str,
    subject: &str,
    body: &str,
) -> Result<(), String> {
    let payload = serde_json::json!({
        "from": from,
        "to": [to],
        "subject": subject,
        "text": body,
    });

    let response = client
        .post(RESEND_API_URL)
        .bearer_auth(api_key)
        .json(&payload)
        .send()
        .await
        .map_err(|e| format!("Resend request failed: {}", e))?;

    if response.status().is_success() {
        Ok(())
    } else {
        let status = response.status();
        let detail = response.text().await.unwrap_or_default();
        Err(format!("Resend API returned {}: {}", status, detail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn bare_config() -> Config {
        let mut config = Config::from_env();
        config.email.smtp_server = None;
        config.email.smtp_email = None;
        config.email.smtp_password = None;
        config.email.resend_api_key = None;
        config.email.allowed_emails = vec!["ana@example.com".to_string()];
        config
    }

    #[tokio::test]
    async fn test_unconfigured_mailer_falls_back_to_link() {
        let mailer = Mailer::new(Arc::new(bare_config()));
        let outcome = mailer
            .send_password_reset("ana@example.com", "http://localhost/reset/x")
            .await;
        assert_eq!(outcome, Delivery::LinkOnly);
    }

    #[tokio::test]
    async fn test_recipient_outside_allow_list_gets_link_only() {
        let mut config = bare_config();
        // Even with a provider configured, the allow-list is checked first.
        config.email.resend_api_key = Some("re_test_key".to_string());
        let mailer = Mailer::new(Arc::new(config));

        let outcome = mailer
            .send_password_reset("bruno@example.com", "http://localhost/reset/x")
            .await;
        assert_eq!(outcome, Delivery::LinkOnly);
    }
}
