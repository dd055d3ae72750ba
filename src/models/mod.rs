pub mod activity_log;
pub mod notification;
pub mod occurrence;
pub mod occurrence_type;
pub mod password_reset_token;
pub mod system_setting;
pub mod user;
pub mod user_preferences;
pub mod zone;

#[allow(unused_imports)]
pub mod prelude {
    pub use super::activity_log::{self, Entity as ActivityLog};
    pub use super::notification::{self, Entity as Notification};
    pub use super::occurrence::{self, Entity as Occurrence};
    pub use super::occurrence_type::{self, Entity as OccurrenceType};
    pub use super::password_reset_token::{self, Entity as PasswordResetToken};
    pub use super::system_setting::{self, Entity as SystemSetting};
    pub use super::user::{self, Entity as User};
    pub use super::user_preferences::{self, Entity as UserPreferences};
    pub use super::zone::{self, Entity as Zone};
}
