use super::{ApiError, AppState};
use crate::models::{Prompt, PromptPatch};
use crate::text::{extract_markdown_content, format_date, truncate_text};
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const TITLE_PREVIEW_CHARS: usize = 50;
const BODY_PREVIEW_CHARS: usize = 120;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub folder_id: Option<String>,
    pub tag_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePromptRequest {
    pub title: String,
    #[serde(default)]
    pub body_md: String,
    #[serde(default)]
    pub folder_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRevisionRequest {
    pub body_md: String,
    #[serde(default)]
    pub command_text: Option<String>,
    #[serde(default)]
    pub llm_provider: Option<String>,
    #[serde(default)]
    pub token_usage: Option<i64>,
}

/// List-view card for a prompt.
#[derive(Debug, Serialize)]
pub struct PromptSummary {
    pub id: String,
    pub title: String,
    pub preview: String,
    pub is_pinned: bool,
    pub updated: String,
    pub tags: Vec<String>,
}

fn filtered(state: &AppState, query: &ListQuery) -> Vec<Prompt> {
    let matches = match query.q.as_deref() {
        Some(q) => state.prompts.search_prompts(q),
        None => state.prompts.prompts(),
    };
    if query.folder_id.is_none() && query.tag_id.is_none() {
        return matches;
    }
    let allowed: HashSet<String> = state
        .prompts
        .filter_prompts(query.folder_id.as_deref(), query.tag_id.as_deref())
        .into_iter()
        .map(|p| p.id)
        .collect();
    matches.into_iter().filter(|p| allowed.contains(&p.id)).collect()
}

pub async fn list_prompts(state: web::Data<AppState>, query: web::Query<ListQuery>) -> HttpResponse {
    HttpResponse::Ok().json(filtered(&state, &query))
}

pub async fn list_summaries(state: web::Data<AppState>, query: web::Query<ListQuery>) -> HttpResponse {
    let summaries: Vec<PromptSummary> = filtered(&state, &query)
        .into_iter()
        .map(|prompt| PromptSummary {
            tags: state
                .prompts
                .tags_for_prompt(&prompt.id)
                .into_iter()
                .map(|t| t.name)
                .collect(),
            title: truncate_text(&prompt.title, TITLE_PREVIEW_CHARS),
            preview: truncate_text(&extract_markdown_content(&prompt.body_md), BODY_PREVIEW_CHARS),
            updated: format_date(&prompt.updated_at),
            is_pinned: prompt.is_pinned,
            id: prompt.id,
        })
        .collect();
    HttpResponse::Ok().json(summaries)
}

pub async fn create_prompt(
    state: web::Data<AppState>,
    body: web::Json<CreatePromptRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    let prompt = state
        .prompts
        .create_prompt(request.title, request.body_md, request.folder_id)
        .await?;
    Ok(HttpResponse::Created().json(prompt))
}

pub async fn get_prompt(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let prompt = state
        .prompts
        .prompt(&id)
        .ok_or_else(|| crate::Error::not_found("prompt", &id))?;
    Ok(HttpResponse::Ok().json(prompt))
}

pub async fn update_prompt(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<PromptPatch>,
) -> Result<HttpResponse, ApiError> {
    let prompt = state.prompts.update_prompt(&path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(prompt))
}

pub async fn delete_prompt(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    state.prompts.delete_prompt(&path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn toggle_pin(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let prompt = state.prompts.toggle_pin(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(prompt))
}

pub async fn list_revisions(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let revisions = state.prompts.revisions(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(revisions))
}

pub async fn create_revision(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<CreateRevisionRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    let revision = state
        .prompts
        .create_revision(
            &path.into_inner(),
            request.body_md,
            request.command_text,
            request.llm_provider,
            request.token_usage,
        )
        .await?;
    Ok(HttpResponse::Created().json(revision))
}

#[cfg(test)]
mod tests {
    use super::super::{configure, test_support::app_state};
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::{json, Value};
    use tempfile::tempdir;

    #[actix_web::test]
    async fn prompt_lifecycle() {
        let dir = tempdir().unwrap();
        let app = test::init_service(App::new().app_data(app_state(&dir)).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/prompts")
            .set_json(json!({ "title": "Review PR", "body_md": "<p>Check the diff</p>" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        let id = created["id"].as_str().unwrap().to_string();
        assert_eq!(created["created_at"], created["updated_at"]);

        let req = test::TestRequest::patch()
            .uri(&format!("/api/prompts/{}", id))
            .set_json(json!({ "title": "Review pull request" }))
            .to_request();
        let updated: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(updated["title"], "Review pull request");
        assert_eq!(updated["body_md"], "<p>Check the diff</p>");

        let req = test::TestRequest::post().uri(&format!("/api/prompts/{}/pin", id)).to_request();
        let pinned: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(pinned["is_pinned"], true);

        let req = test::TestRequest::get().uri("/api/prompts?q=PULL").to_request();
        let hits: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(hits.len(), 1);

        let req = test::TestRequest::delete().uri(&format!("/api/prompts/{}", id)).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::get().uri(&format!("/api/prompts/{}", id)).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn blank_title_is_400() {
        let dir = tempdir().unwrap();
        let app = test::init_service(App::new().app_data(app_state(&dir)).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/prompts")
            .set_json(json!({ "title": " " }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn summaries_strip_markup_and_truncate() {
        let dir = tempdir().unwrap();
        let data = app_state(&dir);
        let long_title = "t".repeat(60);
        data.prompts
            .create_prompt(long_title, "# Heading\n**bold** body".into(), None)
            .await
            .unwrap();
        let app = test::init_service(App::new().app_data(data.clone()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/prompts/summaries").to_request();
        let summaries: Vec<Value> = test::call_and_read_body_json(&app, req).await;

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0]["title"], format!("{}...", "t".repeat(50)));
        assert_eq!(summaries[0]["preview"], "Heading\nbold body");
    }

    #[actix_web::test]
    async fn manual_revisions_round_trip() {
        let dir = tempdir().unwrap();
        let data = app_state(&dir);
        let prompt = data.prompts.create_prompt("P".into(), "".into(), None).await.unwrap();
        let app = test::init_service(App::new().app_data(data.clone()).configure(configure)).await;

        for body in ["first", "first"] {
            let req = test::TestRequest::post()
                .uri(&format!("/api/prompts/{}/revisions", prompt.id))
                .set_json(json!({ "body_md": body, "command_text": "enhance", "token_usage": 150 }))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
        }

        let req = test::TestRequest::get()
            .uri(&format!("/api/prompts/{}/revisions", prompt.id))
            .to_request();
        let revisions: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(revisions.len(), 2);
        assert_eq!(revisions[0]["parent_revision_id"], revisions[1]["id"]);
        assert_eq!(revisions[1]["llm_provider"], "openai");
    }
}
