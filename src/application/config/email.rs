use std::env;

/// Outbound email configuration.
///
/// Delivery goes through SMTP when `SMTP_*` is set, or through the Resend
/// HTTP API when `RESEND_API_KEY` is set. `ALLOWED_EMAILS` is the free-tier
/// recipient allow-list: addresses outside it never get real delivery and
/// the caller falls back to showing the link directly.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_server: Option<String>,
    pub smtp_port: u16,
    pub smtp_email: Option<String>,
    pub smtp_password: Option<String>,
    pub resend_api_key: Option<String>,
    pub allowed_emails: Vec<String>,
}

impl EmailConfig {
    pub fn from_env() -> Self {
        let allowed_emails = env::var("ALLOWED_EMAILS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            smtp_server: env::var("SMTP_SERVER").ok().filter(|s| !s.is_empty()),
            smtp_port: env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(587),
            smtp_email: env::var("SMTP_EMAIL").ok().filter(|s| !s.is_empty()),
            smtp_password: env::var("SMTP_PASSWORD").ok().filter(|s| !s.is_empty()),
            resend_api_key: env::var("RESEND_API_KEY").ok().filter(|s| !s.is_empty()),
            allowed_emails,
        }
    }

    /// Whether the recipient may receive real email delivery.
    pub fn is_allowed_recipient(&self, email: &str) -> bool {
        self.allowed_emails.iter().any(|e| e == &email.to_lowercase())
    }
}
