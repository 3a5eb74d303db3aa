//! Role endpoints, including department role grants

use crate::api::{MessageResponse, SuccessResponse};
use crate::domain::CreateRoleInput;
use crate::error::Result;
use crate::state::HasServices;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

pub async fn create_role<S: HasServices>(
    State(state): State<S>,
    Json(input): Json<CreateRoleInput>,
) -> Result<impl IntoResponse> {
    let role = state.role_service().create(input).await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(role))))
}

pub async fn list_roles<S: HasServices>(State(state): State<S>) -> Result<impl IntoResponse> {
    let roles = state.role_service().list().await?;
    Ok(Json(SuccessResponse::new(roles)))
}

pub async fn get_role<S: HasServices>(
    State(state): State<S>,
    Path(role_id): Path<String>,
) -> Result<impl IntoResponse> {
    let role = state.role_service().get(&role_id).await?;
    Ok(Json(SuccessResponse::new(role)))
}

pub async fn delete_role<S: HasServices>(
    State(state): State<S>,
    Path(role_id): Path<String>,
) -> Result<impl IntoResponse> {
    state.role_service().delete(&role_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_department_roles<S: HasServices>(
    State(state): State<S>,
    Path((domain_id, department_id)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let roles = state
        .role_service()
        .list_department_roles(&domain_id, &department_id)
        .await?;
    Ok(Json(SuccessResponse::new(roles)))
}

pub async fn grant_department_role<S: HasServices>(
    State(state): State<S>,
    Path((domain_id, department_id, role_id)): Path<(String, String, String)>,
) -> Result<impl IntoResponse> {
    state
        .role_service()
        .grant_to_department(&domain_id, &department_id, &role_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Role granted to department")),
    ))
}

pub async fn revoke_department_role<S: HasServices>(
    State(state): State<S>,
    Path((domain_id, department_id, role_id)): Path<(String, String, String)>,
) -> Result<impl IntoResponse> {
    state
        .role_service()
        .revoke_from_department(&domain_id, &department_id, &role_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
