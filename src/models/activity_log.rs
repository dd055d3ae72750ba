use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activity_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub action: String,
    pub description: String,
    pub details: Option<String>, // JSON string for flexible data
    pub ip_address: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// Activity action types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityAction {
    // Authentication
    Login,
    Logout,
    Register,
    PasswordChanged,
    PasswordReset,

    // Occurrence workflow
    CreateOccurrence,
    EditOccurrence,
    DeleteOccurrence,
    ApproveOccurrence,
    RejectOccurrence,

    // Reference data
    CreateZone,
    EditZone,
    DeleteZone,
    CreateType,
    EditType,
    DeleteType,

    // User management
    CreateUser,
    EditUser,
    DeleteUser,
    ToggleUserStatus,

    // Misc
    SettingChanged,
    ExportCsv,
    ExportPdf,
    MarkNotificationRead,
}

impl std::fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActivityAction::Login => "login",
            ActivityAction::Logout => "logout",
            ActivityAction::Register => "register",
            ActivityAction::PasswordChanged => "password_changed",
            ActivityAction::PasswordReset => "password_reset",
            ActivityAction::CreateOccurrence => "create_occurrence",
            ActivityAction::EditOccurrence => "edit_occurrence",
            ActivityAction::DeleteOccurrence => "delete_occurrence",
            ActivityAction::ApproveOccurrence => "approve_occurrence",
            ActivityAction::RejectOccurrence => "reject_occurrence",
            ActivityAction::CreateZone => "create_zone",
            ActivityAction::EditZone => "edit_zone",
            ActivityAction::DeleteZone => "delete_zone",
            ActivityAction::CreateType => "create_type",
            ActivityAction::EditType => "edit_type",
            ActivityAction::DeleteType => "delete_type",
            ActivityAction::CreateUser => "create_user",
            ActivityAction::EditUser => "edit_user",
            ActivityAction::DeleteUser => "delete_user",
            ActivityAction::ToggleUserStatus => "toggle_user_status",
            ActivityAction::SettingChanged => "setting_changed",
            ActivityAction::ExportCsv => "export_csv",
            ActivityAction::ExportPdf => "export_pdf",
            ActivityAction::MarkNotificationRead => "mark_notification_read",
        };
        write!(f, "{}", s)
    }
}
