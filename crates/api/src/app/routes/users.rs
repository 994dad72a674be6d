use std::sync::Arc;

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::Router;
use chrono::Utc;
use serde_json::json;

use userdesk_core::{NewUser, User, UserId, UserPatch};

use crate::app::dto::{self, DeleteManyRequest};
use crate::app::extract::{UserIdPath, ValidJson};
use crate::app::fault::Fault;
use crate::app::outcome::Outcome;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/create-user", post(create_user))
        .route("/get-all-users", get(list_users))
        .route("/delete-multiple", delete(remove_many))
        .route("/:id", get(get_user).patch(update_user).delete(remove_user))
}

fn missing(id: &UserId) -> Outcome {
    Outcome::soft_failure(StatusCode::NOT_FOUND, format!("User with ID {id} not found"))
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    ValidJson(body): ValidJson<NewUser>,
) -> Result<(StatusCode, Outcome), Fault> {
    let user = User::create(UserId::new(), body, Utc::now());
    let user = services.users().insert(user).await?;
    tracing::info!(user_id = %user.id, "user created");
    Ok((
        StatusCode::CREATED,
        Outcome::ok(dto::user_to_json(&user)).with_message("User created successfully"),
    ))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Outcome, Fault> {
    let users = services.users().list().await?;
    let message = if users.is_empty() {
        "No users found"
    } else {
        "Users retrieved successfully"
    };
    Ok(Outcome::ok(dto::users_to_json(&users)).with_message(message))
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    UserIdPath(id): UserIdPath,
) -> Result<Outcome, Fault> {
    Ok(match services.users().get(&id).await? {
        Some(user) => Outcome::ok(dto::user_to_json(&user)).with_message("User retrieved successfully"),
        None => missing(&id),
    })
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    UserIdPath(id): UserIdPath,
    ValidJson(patch): ValidJson<UserPatch>,
) -> Result<Outcome, Fault> {
    Ok(match services.users().update(&id, patch, Utc::now()).await? {
        Some(user) => Outcome::ok(dto::user_to_json(&user)).with_message("User updated successfully"),
        None => missing(&id),
    })
}

pub async fn remove_user(
    Extension(services): Extension<Arc<AppServices>>,
    UserIdPath(id): UserIdPath,
) -> Result<Outcome, Fault> {
    Ok(match services.users().remove(&id).await? {
        Some(user) => {
            tracing::info!(user_id = %user.id, "user removed");
            Outcome::ok(dto::user_to_json(&user)).with_message("User removed successfully")
        }
        None => missing(&id),
    })
}

pub async fn remove_many(
    Extension(services): Extension<Arc<AppServices>>,
    ValidJson(body): ValidJson<DeleteManyRequest>,
) -> Result<Outcome, Fault> {
    let removed = services.users().remove_many(&body.user_ids()?).await?;
    if removed == 0 {
        return Err(Fault::not_found("No users found for the provided IDs"));
    }
    tracing::info!(count = removed, "users removed");
    Ok(Outcome::ok(json!({ "count": removed }))
        .with_message(format!("{removed} users removed successfully")))
}
