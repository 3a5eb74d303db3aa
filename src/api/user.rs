//! Member user endpoints

use crate::api::{MessageResponse, SuccessResponse};
use crate::domain::CreateUserInput;
use crate::error::Result;
use crate::state::HasServices;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

/// The domain comes from the path; a domain id in the body is ignored.
// TODO: take the domain from the caller's access token once token parsing lands
pub async fn create_member_user<S: HasServices>(
    State(state): State<S>,
    Path(domain_id): Path<String>,
    Json(mut input): Json<CreateUserInput>,
) -> Result<impl IntoResponse> {
    input.domain_id = domain_id;
    let user = state.user_service().create_member_user(input).await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(user))))
}

pub async fn list_member_users<S: HasServices>(
    State(state): State<S>,
    Path(domain_id): Path<String>,
) -> Result<impl IntoResponse> {
    let users = state.user_service().list_member_users(&domain_id).await?;
    Ok(Json(SuccessResponse::new(users)))
}

pub async fn get_user<S: HasServices>(
    State(state): State<S>,
    Path((domain_id, user_id)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let user = state.user_service().get_user(&domain_id, &user_id).await?;
    Ok(Json(SuccessResponse::new(user)))
}

pub async fn delete_user<S: HasServices>(
    State(state): State<S>,
    Path((domain_id, user_id)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    state
        .user_service()
        .delete_user(&domain_id, &user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn bind_role<S: HasServices>(
    State(state): State<S>,
    Path((domain_id, user_id, role_name)): Path<(String, String, String)>,
) -> Result<impl IntoResponse> {
    state
        .user_service()
        .bind_role(&domain_id, &user_id, &role_name)
        .await?;
    Ok((StatusCode::CREATED, Json(MessageResponse::new("Role bound"))))
}

pub async fn unbind_role<S: HasServices>(
    State(state): State<S>,
    Path((domain_id, user_id, role_name)): Path<(String, String, String)>,
) -> Result<impl IntoResponse> {
    state
        .user_service()
        .unbind_role(&domain_id, &user_id, &role_name)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
