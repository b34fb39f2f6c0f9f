//! 통합 테스트 공용 도구
//!
//! `TestBackend`는 `MemoryBackend`를 감싸서
//! - 메서드별 호출 횟수를 세고
//! - 조회 실패(백엔드 다운)를 흉내 내고
//! - 발급된 세션을 만료된 것처럼 바꿀 수 있습니다.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::broadcast;

use biawak::backend::{Backend, Filter, MemoryBackend, Query, RowChange};
use biawak::error::AppError;
use biawak::models::{RegisterForm, Session, SignUpResponse, User, UserMetadata};

#[derive(Default)]
pub struct TestBackend {
    pub inner: MemoryBackend,
    calls: Mutex<HashMap<&'static str, usize>>,
    fail_selects: AtomicBool,
    expire_sessions: AtomicBool,
}

impl TestBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    pub fn set_fail_selects(&self, fail: bool) {
        self.fail_selects.store(fail, Ordering::SeqCst);
    }

    pub fn set_expire_sessions(&self, expire: bool) {
        self.expire_sessions.store(expire, Ordering::SeqCst);
    }

    fn record(&self, method: &'static str) {
        *self.calls.lock().unwrap().entry(method).or_default() += 1;
    }

    fn maybe_expire(&self, mut session: Session) -> Session {
        if self.expire_sessions.load(Ordering::SeqCst) {
            session.expires_at = Some(Utc::now().timestamp() - 60);
        }
        session
    }
}

pub fn as_backend(backend: &Arc<TestBackend>) -> Arc<dyn Backend> {
    backend.clone()
}

pub fn register_form(name: &str, email: &str, password: &str) -> RegisterForm {
    RegisterForm {
        name: name.to_string(),
        email: email.to_string(),
        password: password.to_string(),
        confirm_password: password.to_string(),
    }
}

#[async_trait]
impl Backend for TestBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AppError> {
        self.record("sign_in_with_password");
        let session = self.inner.sign_in_with_password(email, password).await?;
        Ok(self.maybe_expire(session))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: UserMetadata,
    ) -> Result<SignUpResponse, AppError> {
        self.record("sign_up");
        let mut response = self.inner.sign_up(email, password, metadata).await?;
        response.session = response.session.map(|s| self.maybe_expire(s));
        Ok(response)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        self.record("sign_out");
        self.inner.sign_out(access_token).await
    }

    async fn get_user(&self, access_token: &str) -> Result<User, AppError> {
        self.record("get_user");
        self.inner.get_user(access_token).await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AppError> {
        self.record("refresh_session");
        self.inner.refresh_session(refresh_token).await
    }

    async fn update_user(
        &self,
        access_token: &str,
        metadata: UserMetadata,
    ) -> Result<User, AppError> {
        self.record("update_user");
        self.inner.update_user(access_token, metadata).await
    }

    async fn reset_password_for_email(&self, email: &str) -> Result<(), AppError> {
        self.record("reset_password_for_email");
        self.inner.reset_password_for_email(email).await
    }

    async fn select(
        &self,
        query: &Query,
        access_token: Option<&str>,
    ) -> Result<Vec<Value>, AppError> {
        self.record("select");
        if self.fail_selects.load(Ordering::SeqCst) {
            return Err(AppError::Unavailable("backend offline".to_string()));
        }
        self.inner.select(query, access_token).await
    }

    async fn insert(
        &self,
        table: &str,
        rows: Vec<Value>,
        access_token: &str,
    ) -> Result<Vec<Value>, AppError> {
        self.record("insert");
        self.inner.insert(table, rows, access_token).await
    }

    async fn delete(
        &self,
        table: &str,
        filters: &[Filter],
        access_token: &str,
    ) -> Result<Vec<Value>, AppError> {
        self.record("delete");
        self.inner.delete(table, filters, access_token).await
    }

    async fn upsert(
        &self,
        table: &str,
        rows: Vec<Value>,
        access_token: &str,
    ) -> Result<Vec<Value>, AppError> {
        self.record("upsert");
        self.inner.upsert(table, rows, access_token).await
    }

    async fn subscribe(&self, table: &str) -> Result<broadcast::Receiver<RowChange>, AppError> {
        self.record("subscribe");
        self.inner.subscribe(table).await
    }
}
