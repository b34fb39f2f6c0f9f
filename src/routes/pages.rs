//! # 페이지 / 폼 핸들러
//!
//! 모든 POST는 컨트롤러에 작업을 맡긴 뒤 `/`로 303 리다이렉트합니다. (POST-Redirect-GET)
//! 결과 메시지는 토스트로 남아 다음 `GET /`에 렌더링됩니다.
//!
//! ## 엔드포인트
//! - `GET  /` → 페이지 전체 HTML
//! - `POST /auth/login`, `/auth/register`, `/auth/logout`, `/auth/reset-password`
//! - `POST /profile/name`
//! - `POST /posts`, `/posts/{id}/comments`, `/posts/{id}/delete`, `/posts/{id}/toggle`
//! - `POST /modals/{modal}/open|close|backdrop`, `/modals/switch/{modal}`
//! - `POST /scroll` → `{ "scrolled": bool }`

use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::OwnedMutexGuard;

use crate::error::AppError;
use crate::middleware::Visitor;
use crate::models::{LoginForm, RegisterForm};
use crate::ui::{ModalId, UiController};

use super::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScrollForm {
    #[serde(default)]
    pub y: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct NameForm {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct EmailForm {
    #[serde(default)]
    pub email: String,
}

/// 방문자의 컨트롤러를 잠그고, 아직이면 초기화합니다.
async fn controller(state: &AppState, visitor: &Visitor) -> OwnedMutexGuard<UiController> {
    let mut controller = state.controller(visitor).lock_owned().await;
    controller.initialize().await;
    controller
}

/// 쌓인 이벤트를 처리한 뒤 `/`로 돌려보냅니다.
async fn finish(mut controller: OwnedMutexGuard<UiController>, visitor: &Visitor) -> Response {
    controller.drain_events().await;
    (visitor.cookie(), Redirect::to("/")).into_response()
}

fn modal_id(slug: &str) -> Result<ModalId, AppError> {
    ModalId::from_slug(slug).ok_or_else(|| AppError::NotFound(format!("Modal '{}' not found", slug)))
}

pub async fn index(State(state): State<AppState>, visitor: Visitor) -> Response {
    let mut controller = controller(&state, &visitor).await;
    controller.drain_events().await;
    (visitor.cookie(), Html(controller.render())).into_response()
}

pub async fn login(
    State(state): State<AppState>,
    visitor: Visitor,
    Form(form): Form<LoginForm>,
) -> Response {
    let mut controller = controller(&state, &visitor).await;
    controller.handle_login(form).await;
    finish(controller, &visitor).await
}

pub async fn register(
    State(state): State<AppState>,
    visitor: Visitor,
    Form(form): Form<RegisterForm>,
) -> Response {
    let mut controller = controller(&state, &visitor).await;
    controller.handle_register(form).await;
    finish(controller, &visitor).await
}

pub async fn logout(State(state): State<AppState>, visitor: Visitor) -> Response {
    let mut controller = controller(&state, &visitor).await;
    controller.handle_logout().await;
    finish(controller, &visitor).await
}

pub async fn reset_password(
    State(state): State<AppState>,
    visitor: Visitor,
    Form(form): Form<EmailForm>,
) -> Response {
    let mut controller = controller(&state, &visitor).await;
    controller.handle_password_reset(&form.email).await;
    finish(controller, &visitor).await
}

pub async fn update_display_name(
    State(state): State<AppState>,
    visitor: Visitor,
    Form(form): Form<NameForm>,
) -> Response {
    let mut controller = controller(&state, &visitor).await;
    controller.handle_update_display_name(&form.name).await;
    finish(controller, &visitor).await
}

pub async fn create_post(
    State(state): State<AppState>,
    visitor: Visitor,
    Form(form): Form<PostForm>,
) -> Response {
    let mut controller = controller(&state, &visitor).await;
    controller.handle_create_post(&form.title, &form.content).await;
    finish(controller, &visitor).await
}

pub async fn add_comment(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Response {
    let mut controller = controller(&state, &visitor).await;
    controller.handle_add_comment(&id, &form.content).await;
    finish(controller, &visitor).await
}

pub async fn delete_post(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<String>,
) -> Response {
    let mut controller = controller(&state, &visitor).await;
    controller.handle_delete_post(&id).await;
    finish(controller, &visitor).await
}

pub async fn toggle_comments(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<String>,
) -> Response {
    let mut controller = controller(&state, &visitor).await;
    controller.toggle_comments(&id);
    finish(controller, &visitor).await
}

pub async fn open_modal(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(modal): Path<String>,
) -> Result<Response, AppError> {
    let id = modal_id(&modal)?;
    let mut controller = controller(&state, &visitor).await;
    controller.show_modal(id);
    Ok(finish(controller, &visitor).await)
}

pub async fn close_modal(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(modal): Path<String>,
) -> Result<Response, AppError> {
    let id = modal_id(&modal)?;
    let mut controller = controller(&state, &visitor).await;
    controller.close_modal(id);
    Ok(finish(controller, &visitor).await)
}

pub async fn backdrop_click(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(modal): Path<String>,
) -> Result<Response, AppError> {
    let id = modal_id(&modal)?;
    let mut controller = controller(&state, &visitor).await;
    controller.backdrop_click(id);
    Ok(finish(controller, &visitor).await)
}

pub async fn switch_modal(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(modal): Path<String>,
) -> Result<Response, AppError> {
    let id = modal_id(&modal)?;
    let mut controller = controller(&state, &visitor).await;
    controller.switch_modal(id);
    Ok(finish(controller, &visitor).await)
}

pub async fn scroll(
    State(state): State<AppState>,
    visitor: Visitor,
    Form(form): Form<ScrollForm>,
) -> Response {
    let mut controller = controller(&state, &visitor).await;
    let scrolled = controller.handle_scroll(form.y);
    (visitor.cookie(), Json(json!({ "scrolled": scrolled }))).into_response()
}
