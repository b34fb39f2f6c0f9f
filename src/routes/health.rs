//! # 헬스체크(Health Check) 핸들러
//!
//! ## 엔드포인트
//! - `GET /api/v1/health` → `{ "status": "ok", "backend": "ok" | "unreachable" | "error", "visitors": N }`
//!
//! 백엔드 상태와 관계없이 항상 200을 반환합니다.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::backend::{Query, POSTS_TABLE};

use super::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let probe = Query::from(POSTS_TABLE).columns(&["id"]).limit(1);
    let backend = match state.backend.select(&probe, None).await {
        Ok(_) => "ok",
        Err(e) if e.is_availability() => {
            tracing::warn!("Health check: backend unreachable: {}", e);
            "unreachable"
        }
        // 응답은 왔지만 해석할 수 없음
        Err(e) => {
            tracing::error!("Health check: unexpected backend reply: {}", e);
            "error"
        }
    };

    Json(json!({
        "status": "ok",
        "backend": backend,
        "visitors": state.visitor_count()
    }))
}
