//! # JSON API
//!
//! ## 엔드포인트
//! - `GET /api/v1/posts` → 게시글 목록 (댓글 포함, 최신순)
//!
//! 로그인 없이 조회합니다. 조회 실패 시의 데모 대체 여부는 `DEMO_FALLBACK`을 따릅니다.

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::error::AppError;
use crate::models::Post;
use crate::services::{AuthClient, PostsClient};

use super::AppState;

pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<Post>>, AppError> {
    let auth = Arc::new(AuthClient::new(state.backend.clone()));
    let posts = PostsClient::new(state.backend.clone(), auth, state.demo_fallback);
    Ok(Json(posts.fetch_posts_with_comments().await?))
}
