//! Domain and department endpoints

use crate::api::SuccessResponse;
use crate::domain::{CreateDepartmentInput, CreateDomainInput};
use crate::error::Result;
use crate::state::HasServices;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

pub async fn create_domain<S: HasServices>(
    State(state): State<S>,
    Json(input): Json<CreateDomainInput>,
) -> Result<impl IntoResponse> {
    let domain = state.organization_service().create_domain(input).await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(domain))))
}

pub async fn list_domains<S: HasServices>(State(state): State<S>) -> Result<impl IntoResponse> {
    let domains = state.organization_service().list_domains().await?;
    Ok(Json(SuccessResponse::new(domains)))
}

pub async fn get_domain<S: HasServices>(
    State(state): State<S>,
    Path(domain_id): Path<String>,
) -> Result<impl IntoResponse> {
    let domain = state.organization_service().get_domain(&domain_id).await?;
    Ok(Json(SuccessResponse::new(domain)))
}

pub async fn delete_domain<S: HasServices>(
    State(state): State<S>,
    Path(domain_id): Path<String>,
) -> Result<impl IntoResponse> {
    state
        .organization_service()
        .delete_domain(&domain_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_department<S: HasServices>(
    State(state): State<S>,
    Path(domain_id): Path<String>,
    Json(input): Json<CreateDepartmentInput>,
) -> Result<impl IntoResponse> {
    let department = state
        .organization_service()
        .create_department(&domain_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(department))))
}

pub async fn list_departments<S: HasServices>(
    State(state): State<S>,
    Path(domain_id): Path<String>,
) -> Result<impl IntoResponse> {
    let departments = state
        .organization_service()
        .list_departments(&domain_id)
        .await?;
    Ok(Json(SuccessResponse::new(departments)))
}

pub async fn get_department<S: HasServices>(
    State(state): State<S>,
    Path((domain_id, department_id)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let department = state
        .organization_service()
        .get_department(&domain_id, &department_id)
        .await?;
    Ok(Json(SuccessResponse::new(department)))
}

pub async fn delete_department<S: HasServices>(
    State(state): State<S>,
    Path((domain_id, department_id)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    state
        .organization_service()
        .delete_department(&domain_id, &department_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
