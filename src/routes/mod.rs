//! # 라우트 핸들러 모듈
//!
//! HTTP 요청을 처리하는 핸들러 함수들을 모아둔 모듈입니다.
//!
//! 각 하위 모듈:
//! - `pages`: 서버 렌더링 페이지와 폼 제출 (POST 후 `/`로 리다이렉트)
//! - `api`: JSON API (게시글 목록)
//! - `health`: 서버 상태 확인 (헬스체크)
//!
//! 방문자마다 `UiController` 하나를 두고, tokio `Mutex`로 한 번에 한 요청만 처리합니다.

pub mod api;
pub mod health;
pub mod pages;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::time::Instant;

use crate::backend::Backend;
use crate::middleware::Visitor;
use crate::ui::UiController;

pub use api::*;
pub use health::*;
pub use pages::*;

struct VisitorSlot {
    controller: Arc<tokio::sync::Mutex<UiController>>,
    last_seen: Instant,
}

/// 모든 핸들러가 공유하는 상태
///
/// `Clone`은 Arc만 복제하므로 가볍습니다.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn Backend>,
    pub demo_fallback: bool,
    pub realtime: bool,
    visitors: Arc<Mutex<HashMap<String, VisitorSlot>>>,
}

impl AppState {
    pub fn new(backend: Arc<dyn Backend>, demo_fallback: bool, realtime: bool) -> Self {
        Self {
            backend,
            demo_fallback,
            realtime,
            visitors: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// 방문자의 컨트롤러. 처음 보는 방문자면 새로 만듭니다.
    pub fn controller(&self, visitor: &Visitor) -> Arc<tokio::sync::Mutex<UiController>> {
        let mut visitors = self.visitors.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let slot = visitors.entry(visitor.id.clone()).or_insert_with(|| {
            tracing::debug!("New visitor: {}", visitor.id);
            VisitorSlot {
                controller: Arc::new(tokio::sync::Mutex::new(UiController::for_visitor(
                    self.backend.clone(),
                    self.demo_fallback,
                    self.realtime,
                ))),
                last_seen: now,
            }
        });
        slot.last_seen = now;
        slot.controller.clone()
    }

    pub fn visitor_count(&self) -> usize {
        self.visitors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// `max_idle`보다 오래 요청이 없던 방문자를 정리합니다. 정리한 수를 반환합니다.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut visitors = self.visitors.lock().unwrap_or_else(PoisonError::into_inner);
        let idle: Vec<String> = visitors
            .iter()
            .filter(|(_, slot)| now.duration_since(slot.last_seen) > max_idle)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &idle {
            if let Some(slot) = visitors.remove(id) {
                // 처리 중인 요청이 있으면 마지막 Arc가 사라질 때 Drop에서 정리됩니다.
                if let Ok(mut controller) = slot.controller.try_lock() {
                    controller.teardown();
                }
            }
        }
        idle.len()
    }
}

/// 페이지 + 폼 + JSON API 라우터
///
/// CORS, 요청 로깅, 정적 파일은 `main`에서 레이어로 덧붙입니다.
pub fn router(state: AppState) -> Router {
    let page_routes = Router::new()
        .route("/", get(index))
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/logout", post(logout))
        .route("/auth/reset-password", post(reset_password))
        .route("/profile/name", post(update_display_name))
        .route("/posts", post(create_post))
        .route("/posts/{id}/comments", post(add_comment))
        .route("/posts/{id}/delete", post(delete_post))
        .route("/posts/{id}/toggle", post(toggle_comments))
        .route("/modals/switch/{modal}", post(switch_modal))
        .route("/modals/{modal}/open", post(open_modal))
        .route("/modals/{modal}/close", post(close_modal))
        .route("/modals/{modal}/backdrop", post(backdrop_click))
        .route("/scroll", post(scroll));

    let api_routes = Router::new()
        .route("/posts", get(list_posts))
        .route("/health", get(health_check));

    page_routes
        .nest("/api/v1", api_routes)
        .with_state(state)
}
