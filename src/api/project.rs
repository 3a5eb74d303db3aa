//! Project endpoints and project membership

use crate::api::{MembershipResponse, SuccessResponse};
use crate::domain::CreateProjectInput;
use crate::error::Result;
use crate::state::HasServices;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

pub async fn create_project<S: HasServices>(
    State(state): State<S>,
    Path(domain_id): Path<String>,
    Json(input): Json<CreateProjectInput>,
) -> Result<impl IntoResponse> {
    let project = state.project_service().create(&domain_id, input).await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(project))))
}

pub async fn list_projects<S: HasServices>(
    State(state): State<S>,
    Path(domain_id): Path<String>,
) -> Result<impl IntoResponse> {
    let projects = state.project_service().list(&domain_id).await?;
    Ok(Json(SuccessResponse::new(projects)))
}

pub async fn get_project<S: HasServices>(
    State(state): State<S>,
    Path((domain_id, project_id)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let project = state.project_service().get(&domain_id, &project_id).await?;
    Ok(Json(SuccessResponse::new(project)))
}

pub async fn delete_project<S: HasServices>(
    State(state): State<S>,
    Path((domain_id, project_id)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    state
        .project_service()
        .delete(&domain_id, &project_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Members of a project, fully resolved
pub async fn list_project_users<S: HasServices>(
    State(state): State<S>,
    Path((domain_id, project_id)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let users = state
        .user_service()
        .list_project_users(&domain_id, &project_id)
        .await?;
    Ok(Json(SuccessResponse::new(users)))
}

/// Body: JSON array of user ids
pub async fn add_users_to_project<S: HasServices>(
    State(state): State<S>,
    Path((domain_id, project_id)): Path<(String, String)>,
    Json(user_ids): Json<Vec<String>>,
) -> Result<impl IntoResponse> {
    let requested = user_ids.len();
    let affected = state
        .project_service()
        .add_users(&domain_id, &project_id, user_ids)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::new(MembershipResponse {
            project_id,
            requested,
            affected,
        })),
    ))
}

/// Body: JSON array of user ids
pub async fn remove_users_from_project<S: HasServices>(
    State(state): State<S>,
    Path((domain_id, project_id)): Path<(String, String)>,
    Json(user_ids): Json<Vec<String>>,
) -> Result<impl IntoResponse> {
    state
        .project_service()
        .remove_users(&domain_id, &project_id, user_ids)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
