use super::{ApiError, AppState};
use crate::models::Revision;
use crate::refine::{Provider, RefineCommand, RefineRequest, RefineResponse};
use crate::text::parse_slash_command;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::info;

/// `POST /api/refine`
pub async fn refine(state: web::Data<AppState>, body: web::Json<RefineRequest>) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    let prompt_text = request
        .prompt_text
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ApiError::BadRequest("promptText is required".to_string()))?;
    let command = RefineCommand::from_wire(request.command.as_deref(), request.shorten_length);
    let provider = request.provider.unwrap_or_default();

    let response = state.refiner.refine(&prompt_text, &command, provider).await?;
    info!(request_id = %response.request_id, command = %command.label(), %provider, "Refinement served");
    Ok(HttpResponse::Ok().json(response))
}

#[derive(Debug, Deserialize)]
pub struct RefinePromptRequest {
    /// Editor slash command, `/enhance` or `/shorten N`.
    pub command: String,
    #[serde(default)]
    pub provider: Option<Provider>,
}

#[derive(Debug, Serialize)]
pub struct RefinePromptResponse {
    pub revision: Revision,
    pub refinement: RefineResponse,
}

/// `POST /api/prompts/{id}/refine`: refines the prompt's current body and
/// appends the result to its revision log.
pub async fn refine_prompt(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<RefinePromptRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let request = body.into_inner();
    let slash = parse_slash_command(&request.command)
        .ok_or_else(|| ApiError::BadRequest(format!("Unrecognized command '{}'", request.command)))?;
    let prompt = state
        .prompts
        .prompt(&id)
        .ok_or_else(|| crate::Error::not_found("prompt", &id))?;

    let command = RefineCommand::from(&slash);
    let provider = request.provider.unwrap_or_default();
    let refinement = state.refiner.refine(&prompt.body_md, &command, provider).await?;
    let revision = state
        .prompts
        .create_revision(
            &id,
            refinement.refined_text.clone(),
            Some(command.label()),
            Some(provider.to_string()),
            i64::try_from(refinement.tokens_used).ok(),
        )
        .await?;

    Ok(HttpResponse::Created().json(RefinePromptResponse { revision, refinement }))
}

#[cfg(test)]
mod tests {
    use super::super::{configure, test_support::app_state};
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::json;
    use tempfile::tempdir;

    #[actix_web::test]
    async fn enhance_returns_template_and_tokens() {
        let dir = tempdir().unwrap();
        let app = test::init_service(App::new().app_data(app_state(&dir)).configure(configure)).await;
        let text = "Summarize this article";

        let req = test::TestRequest::post()
            .uri("/api/refine")
            .set_json(json!({ "promptText": text, "command": "enhance", "apiKey": "sk-ignored" }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["tokensUsed"], (text.len() * 3 / 4 + 50) as u64);
        assert_eq!(body["provider"], "openai");
        assert!(body["refinedText"].as_str().unwrap().contains(text));
        assert!(body["requestId"].as_str().unwrap().starts_with("req_"));
    }

    #[actix_web::test]
    async fn shorten_50_uses_45_tokens() {
        let dir = tempdir().unwrap();
        let app = test::init_service(App::new().app_data(app_state(&dir)).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/refine")
            .set_json(json!({ "promptText": "x".repeat(200), "command": "shorten", "shortenLength": 50 }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["tokensUsed"], 45);
    }

    #[actix_web::test]
    async fn fractional_shorten_length_is_accepted() {
        let dir = tempdir().unwrap();
        let app = test::init_service(App::new().app_data(app_state(&dir)).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/refine")
            .set_json(json!({ "promptText": "x".repeat(200), "command": "shorten", "shortenLength": 50.5 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["tokensUsed"], 45);
        let refined = body["refinedText"].as_str().unwrap();
        assert!(refined.starts_with("**Shortened Prompt (50 chars):**"));
        assert!(refined.contains(&format!("\n\n{}...\n\n", "x".repeat(50))));
    }

    #[actix_web::test]
    async fn missing_prompt_text_is_400() {
        let dir = tempdir().unwrap();
        let app = test::init_service(App::new().app_data(app_state(&dir)).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/refine")
            .set_json(json!({ "command": "enhance" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "promptText is required");
    }

    #[actix_web::test]
    async fn malformed_json_is_400() {
        let dir = tempdir().unwrap();
        let app = test::init_service(App::new().app_data(app_state(&dir)).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/refine")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn non_post_is_405() {
        let dir = tempdir().unwrap();
        let app = test::init_service(App::new().app_data(app_state(&dir)).configure(configure)).await;

        for req in [
            test::TestRequest::get().uri("/api/refine").to_request(),
            test::TestRequest::put().uri("/api/refine").to_request(),
        ] {
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        }
    }

    #[actix_web::test]
    async fn slash_command_appends_revision() {
        let dir = tempdir().unwrap();
        let data = app_state(&dir);
        let prompt = data
            .prompts
            .create_prompt("Long".into(), "abcdefghij".into(), None)
            .await
            .unwrap();
        let app = test::init_service(App::new().app_data(data.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/prompts/{}/refine", prompt.id))
            .set_json(json!({ "command": "/shorten 4", "provider": "google" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["revision"]["command_text"], "shorten 4");
        assert_eq!(body["revision"]["llm_provider"], "google");
        assert_eq!(body["revision"]["token_usage"], 22);

        let revisions = data.prompts.revisions(&prompt.id).await.unwrap();
        assert_eq!(revisions.len(), 1);
        assert!(revisions[0].body_md.contains("abcd..."));
    }

    #[actix_web::test]
    async fn unknown_slash_command_is_400() {
        let dir = tempdir().unwrap();
        let data = app_state(&dir);
        let prompt = data.prompts.create_prompt("P".into(), "".into(), None).await.unwrap();
        let app = test::init_service(App::new().app_data(data.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/prompts/{}/refine", prompt.id))
            .set_json(json!({ "command": "/rewrite" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
