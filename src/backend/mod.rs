//! # 백엔드(BaaS) 접근 계층
//!
//! 인증, 행 저장소, 실시간 변경 알림을 제공하는 외부 서비스와의 경계입니다.
//! 상위 계층(`services::auth`, `services::posts`)은 `Backend` 트레이트에만 의존하고,
//! 실제 구현은 `main`에서 설정에 따라 골라 주입합니다.
//!
//! 하위 모듈:
//! - `query`: 백엔드 독립적인 select 쿼리 (필터/정렬/제한/임베드)
//! - `rest`: Supabase 호환 REST 백엔드 (reqwest)
//! - `realtime`: Supabase Realtime 웹소켓 구독
//! - `memory`: 프로세스 내부 백엔드 (개발, 데모, 테스트)

pub mod memory;
pub mod query;
pub mod realtime;
pub mod rest;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::AppError;
use crate::models::{Session, SignUpResponse, User, UserMetadata};

pub use memory::MemoryBackend;
pub use query::{Embed, EmbedKind, Filter, Order, Query};
pub use rest::SupabaseBackend;

pub const POSTS_TABLE: &str = "posts";
pub const COMMENTS_TABLE: &str = "comments";
pub const PROFILES_TABLE: &str = "profiles";

/// 실시간 변경 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// 행 단위 변경 알림
#[derive(Debug, Clone, PartialEq)]
pub struct RowChange {
    pub table: String,
    pub kind: ChangeKind,
    pub record: Value,
}

/// 외부 BaaS가 제공하는 기능 전체
///
/// 인증 메서드는 상태가 없습니다. 세션 보관은 `AuthClient`의 책임입니다.
/// 행 변경 메서드는 액세스 토큰을 받아 백엔드의 행 수준 보안(RLS)에 맡깁니다.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> Result<Session, AppError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: UserMetadata,
    ) -> Result<SignUpResponse, AppError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AppError>;

    async fn get_user(&self, access_token: &str) -> Result<User, AppError>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AppError>;

    async fn update_user(
        &self,
        access_token: &str,
        metadata: UserMetadata,
    ) -> Result<User, AppError>;

    async fn reset_password_for_email(&self, email: &str) -> Result<(), AppError>;

    async fn select(&self, query: &Query, access_token: Option<&str>)
        -> Result<Vec<Value>, AppError>;

    /// 삽입된 행들을 반환합니다.
    async fn insert(
        &self,
        table: &str,
        rows: Vec<Value>,
        access_token: &str,
    ) -> Result<Vec<Value>, AppError>;

    /// 삭제된 행들을 반환합니다. 권한이 없는 행은 조용히 제외됩니다.
    async fn delete(
        &self,
        table: &str,
        filters: &[Filter],
        access_token: &str,
    ) -> Result<Vec<Value>, AppError>;

    /// `id`가 같은 행이 있으면 병합, 없으면 삽입합니다.
    async fn upsert(
        &self,
        table: &str,
        rows: Vec<Value>,
        access_token: &str,
    ) -> Result<Vec<Value>, AppError>;

    /// 테이블의 행 변경 알림을 구독합니다.
    async fn subscribe(&self, table: &str) -> Result<broadcast::Receiver<RowChange>, AppError>;
}
