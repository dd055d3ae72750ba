use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::error::Result;
use crate::middleware::Authenticated;
use crate::services::activity::{self, ActivityPage, ActivityQuery};
use crate::services::authz::{authorize, Action};
use crate::state::AppState;

/// Create audit-trail routes
pub fn activities_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_activities))
        .with_state(state)
}

/// List activity entries, newest first.
///
/// Defaults to the caller's own history; `?user_id=` selects another user's
/// history, which only admins may read.
async fn list_activities(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<ActivityPage>> {
    let target_user_id = query.user_id.unwrap_or(actor.id);

    if target_user_id != actor.id {
        authorize(
            actor.role(),
            Action::ViewActivitiesOfOthers,
            None,
            actor.id,
        )?;
    }

    let page = activity::list_for_user(&state.db, target_user_id, &query).await?;
    Ok(Json(page))
}
