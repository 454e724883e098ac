//! Folder, tag and prompt–tag routes.

use super::{ApiError, AppState};
use actix_web::{web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateFolderRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LinkTagRequest {
    pub tag_id: String,
}

pub async fn list_folders(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.prompts.folders())
}

pub async fn create_folder(
    state: web::Data<AppState>,
    body: web::Json<CreateFolderRequest>,
) -> Result<HttpResponse, ApiError> {
    let folder = state.prompts.create_folder(body.into_inner().name).await?;
    Ok(HttpResponse::Created().json(folder))
}

pub async fn delete_folder(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    state.prompts.delete_folder(&path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn list_tags(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.prompts.tags())
}

pub async fn create_tag(state: web::Data<AppState>, body: web::Json<CreateTagRequest>) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    let tag = state.prompts.create_tag(request.name, request.color).await?;
    Ok(HttpResponse::Created().json(tag))
}

pub async fn delete_tag(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    state.prompts.delete_tag(&path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn prompt_tags(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    if state.prompts.prompt(&id).is_none() {
        return Err(crate::Error::not_found("prompt", &id).into());
    }
    Ok(HttpResponse::Ok().json(state.prompts.tags_for_prompt(&id)))
}

pub async fn add_tag_to_prompt(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<LinkTagRequest>,
) -> Result<HttpResponse, ApiError> {
    let link = state
        .prompts
        .add_tag_to_prompt(&path.into_inner(), &body.into_inner().tag_id)
        .await?;
    Ok(HttpResponse::Created().json(link))
}

pub async fn remove_tag_from_prompt(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (prompt_id, tag_id) = path.into_inner();
    state.prompts.remove_tag_from_prompt(&prompt_id, &tag_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
