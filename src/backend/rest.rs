//! # Supabase 호환 REST 백엔드
//!
//! - 인증: `{url}/auth/v1/...` (GoTrue)
//! - 행 저장소: `{url}/rest/v1/{table}` (PostgREST)
//! - 실시간: `realtime::RealtimeHub` (웹소켓)
//!
//! 모든 요청에 `apikey`, `Authorization`, `X-Client-Info` 헤더를 붙입니다.
//! 로그인한 사용자의 요청은 사용자 액세스 토큰을, 그 외에는 anon 키를 Bearer로 씁니다.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use super::realtime::RealtimeHub;
use super::{Backend, Filter, Query, RowChange};
use crate::error::AppError;
use crate::models::{Session, SignUpResponse, User, UserMetadata};

pub struct SupabaseBackend {
    client: Client,
    base_url: String,
    anon_key: String,
    client_info: String,
    realtime: RealtimeHub,
}

impl SupabaseBackend {
    pub fn new(base_url: &str, anon_key: &str, client_info: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            realtime: RealtimeHub::new(&base_url, anon_key),
            base_url,
            anon_key: anon_key.to_string(),
            client_info: client_info.to_string(),
        }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, url: &str, access_token: Option<&str>) -> RequestBuilder {
        let bearer = access_token.unwrap_or(&self.anon_key);
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", bearer))
            .header("X-Client-Info", &self.client_info)
    }

    /// 응답 상태를 확인하고, 실패면 백엔드 메시지를 담은 에러로 바꿉니다.
    async fn check(response: Response) -> Result<Response, AppError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(status.as_u16(), &body);
        tracing::debug!("Backend responded {}: {}", status, message);
        Err(AppError::backend(status.as_u16(), message))
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, AppError> {
        let response = Self::check(builder.send().await?).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// GoTrue와 PostgREST는 에러 본문 형식이 조금씩 다릅니다.
/// `error_description` → `msg` → `message` → `error_msg` → `error` 순으로 찾습니다.
pub fn extract_error_message(status: u16, body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        ["error_description", "msg", "message", "error_msg", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str).map(str::to_string))
    });

    let message = from_json.unwrap_or_else(|| body.trim().to_string());
    if message.is_empty() && status == 429 {
        return "Too many requests".to_string();
    }
    message
}

fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters.iter().map(Filter::to_param).collect()
}

#[async_trait]
impl Backend for SupabaseBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AppError> {
        let builder = self
            .request(Method::POST, &self.auth_url("token"), None)
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        Self::send_json(builder).await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: UserMetadata,
    ) -> Result<SignUpResponse, AppError> {
        let builder = self
            .request(Method::POST, &self.auth_url("signup"), None)
            .json(&json!({ "email": email, "password": password, "data": metadata }));
        let body: Value = Self::send_json(builder).await?;

        // 이메일 확인이 꺼져 있으면 세션이, 켜져 있으면 사용자 객체만 옵니다.
        if body.get("access_token").is_some() {
            let session: Session = serde_json::from_value(body)?;
            return Ok(SignUpResponse {
                user: Some(session.user.clone()),
                session: Some(session),
            });
        }
        let user_value = body.get("user").cloned().unwrap_or(body);
        let user = if user_value.get("id").is_some() {
            Some(serde_json::from_value::<User>(user_value)?)
        } else {
            None
        };
        Ok(SignUpResponse {
            user,
            session: None,
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        let builder = self.request(Method::POST, &self.auth_url("logout"), Some(access_token));
        Self::check(builder.send().await?).await?;
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<User, AppError> {
        let builder = self.request(Method::GET, &self.auth_url("user"), Some(access_token));
        Self::send_json(builder).await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AppError> {
        let builder = self
            .request(Method::POST, &self.auth_url("token"), None)
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }));
        Self::send_json(builder).await
    }

    async fn update_user(
        &self,
        access_token: &str,
        metadata: UserMetadata,
    ) -> Result<User, AppError> {
        let builder = self
            .request(Method::PUT, &self.auth_url("user"), Some(access_token))
            .json(&json!({ "data": metadata }));
        Self::send_json(builder).await
    }

    async fn reset_password_for_email(&self, email: &str) -> Result<(), AppError> {
        let builder = self
            .request(Method::POST, &self.auth_url("recover"), None)
            .json(&json!({ "email": email }));
        Self::check(builder.send().await?).await?;
        Ok(())
    }

    async fn select(
        &self,
        query: &Query,
        access_token: Option<&str>,
    ) -> Result<Vec<Value>, AppError> {
        let builder = self
            .request(Method::GET, &self.rest_url(&query.table), access_token)
            .query(&query.to_postgrest_params());
        Self::send_json(builder).await
    }

    async fn insert(
        &self,
        table: &str,
        rows: Vec<Value>,
        access_token: &str,
    ) -> Result<Vec<Value>, AppError> {
        let builder = self
            .request(Method::POST, &self.rest_url(table), Some(access_token))
            .header("Prefer", "return=representation")
            .json(&rows);
        Self::send_json(builder).await
    }

    async fn delete(
        &self,
        table: &str,
        filters: &[Filter],
        access_token: &str,
    ) -> Result<Vec<Value>, AppError> {
        let builder = self
            .request(Method::DELETE, &self.rest_url(table), Some(access_token))
            .header("Prefer", "return=representation")
            .query(&filter_params(filters));
        Self::send_json(builder).await
    }

    async fn upsert(
        &self,
        table: &str,
        rows: Vec<Value>,
        access_token: &str,
    ) -> Result<Vec<Value>, AppError> {
        let builder = self
            .request(Method::POST, &self.rest_url(table), Some(access_token))
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&rows);
        Self::send_json(builder).await
    }

    async fn subscribe(&self, table: &str) -> Result<broadcast::Receiver<RowChange>, AppError> {
        Ok(self.realtime.subscribe(table).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_description_fields() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        assert_eq!(extract_error_message(400, body), "Invalid login credentials");

        let body = r#"{"code":400,"msg":"User already registered"}"#;
        assert_eq!(extract_error_message(400, body), "User already registered");

        let body = r#"{"code":"42501","message":"new row violates row-level security policy"}"#;
        assert_eq!(
            extract_error_message(403, body),
            "new row violates row-level security policy"
        );
    }

    #[test]
    fn empty_rate_limit_body_becomes_too_many_requests() {
        assert_eq!(extract_error_message(429, ""), "Too many requests");
        assert_eq!(extract_error_message(502, "Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn urls_are_built_from_trimmed_base() {
        let backend = SupabaseBackend::new("https://demo.supabase.co/", "anon", "test");
        assert_eq!(backend.auth_url("token"), "https://demo.supabase.co/auth/v1/token");
        assert_eq!(backend.rest_url("posts"), "https://demo.supabase.co/rest/v1/posts");
    }
}
