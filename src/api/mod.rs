//! HTTP surface: the refinement endpoint plus JSON routes over [`PromptState`].

use crate::error::Error;
use crate::refine::Refiner;
use crate::state::PromptState;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, Responder, ResponseError};
use serde::Serialize;
use tracing::error;

pub mod collections;
pub mod prompts;
pub mod refine;

/// Shared application state handed to every handler.
pub struct AppState {
    pub prompts: PromptState,
    pub refiner: Refiner,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    State(#[from] Error),

    #[error("Internal server error: {0:#}")]
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::State(Error::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::State(Error::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::State(Error::Storage(_)) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() {
            error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        HttpResponse::build(status).json(ErrorBody { error: message })
    }
}

async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().json(ErrorBody {
        error: "Method not allowed".to_string(),
    })
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Registers every route. Malformed JSON bodies answer 400.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default().error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    )
    .route("/health", web::get().to(health))
    .service(
        web::resource("/api/refine")
            .route(web::post().to(refine::refine))
            .default_service(web::to(method_not_allowed)),
    )
    .service(
        web::resource("/api/prompts")
            .route(web::get().to(prompts::list_prompts))
            .route(web::post().to(prompts::create_prompt)),
    )
    .route("/api/prompts/summaries", web::get().to(prompts::list_summaries))
    .service(
        web::resource("/api/prompts/{id}")
            .route(web::get().to(prompts::get_prompt))
            .route(web::patch().to(prompts::update_prompt))
            .route(web::delete().to(prompts::delete_prompt)),
    )
    .route("/api/prompts/{id}/pin", web::post().to(prompts::toggle_pin))
    .route("/api/prompts/{id}/refine", web::post().to(refine::refine_prompt))
    .service(
        web::resource("/api/prompts/{id}/revisions")
            .route(web::get().to(prompts::list_revisions))
            .route(web::post().to(prompts::create_revision)),
    )
    .service(
        web::resource("/api/prompts/{id}/tags")
            .route(web::get().to(collections::prompt_tags))
            .route(web::post().to(collections::add_tag_to_prompt)),
    )
    .route(
        "/api/prompts/{id}/tags/{tag_id}",
        web::delete().to(collections::remove_tag_from_prompt),
    )
    .service(
        web::resource("/api/folders")
            .route(web::get().to(collections::list_folders))
            .route(web::post().to(collections::create_folder)),
    )
    .route("/api/folders/{id}", web::delete().to(collections::delete_folder))
    .service(
        web::resource("/api/tags")
            .route(web::get().to(collections::list_tags))
            .route(web::post().to(collections::create_tag)),
    )
    .route("/api/tags/{id}", web::delete().to(collections::delete_tag));
}


#[cfg(test)]
mod tests {
    use super::test_support::app_state;
    use super::*;
    use actix_web::{test, App};
    use tempfile::tempdir;

    #[actix_web::test]
    async fn unknown_prompt_is_404() {
        let dir = tempdir().unwrap();
        let app = test::init_service(App::new().app_data(app_state(&dir)).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/prompts/nope").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "prompt 'nope' not found");
    }

    #[actix_web::test]
    async fn health_is_ok() {
        let dir = tempdir().unwrap();
        let app = test::init_service(App::new().app_data(app_state(&dir)).configure(configure)).await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert!(resp.status().is_success());
    }
}
