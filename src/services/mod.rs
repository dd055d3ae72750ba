pub mod activity;
pub mod authz;
pub mod dashboard;
pub mod export;
pub mod mailer;
pub mod occurrences;
pub mod password_reset;
pub mod security;
pub mod settings;

pub use authz::{authorize, Action};
pub use mailer::{Delivery, Mailer};
pub use security::{hash_password, verify_password};
