//! # 인증 클라이언트
//!
//! 백엔드의 인증 API를 감싸고, 현재 세션을 보관합니다.
//!
//! 이 모듈의 역할:
//! - 클라이언트 측 검증 (필수 입력, 이메일 형식, 비밀번호 길이, 비밀번호 확인)
//! - 세션 캐시와 만료 시 자동 갱신 (`get_session`은 실패해도 None만 반환)
//! - 인증 상태 변화 알림: `subscribe()`로 구독하고 `unsubscribe()`로 해지
//!
//! 백엔드 에러는 원문 그대로 `AppError::Backend`로 전달되며,
//! 사용자용 문구 변환은 `AppError::user_message()`가 담당합니다.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::json;
use tokio::sync::{mpsc, RwLock};

use crate::backend::{Backend, PROFILES_TABLE};
use crate::error::AppError;
use crate::models::{
    AuthEvent, AuthStateChange, CurrentUser, RegisterForm, Session, SignUpOutcome,
    UserMetadata,
};

use super::helpers::is_valid_email;

pub const MIN_PASSWORD_CHARS: usize = 6;
const MAX_NAME_CHARS: usize = 100;

/// 인증 상태 변화 구독 핸들
///
/// 더 이상 필요 없으면 `AuthClient::unsubscribe()`에 돌려줍니다.
#[derive(Debug)]
pub struct AuthSubscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<AuthStateChange>,
}

impl AuthSubscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// 대기 중인 알림 하나를 기다리지 않고 꺼냅니다.
    pub fn try_next(&mut self) -> Option<AuthStateChange> {
        self.rx.try_recv().ok()
    }

    pub async fn next(&mut self) -> Option<AuthStateChange> {
        self.rx.recv().await
    }
}

type Listener = (u64, mpsc::UnboundedSender<AuthStateChange>);

pub struct AuthClient {
    backend: Arc<dyn Backend>,
    session: RwLock<Option<Session>>,
    listeners: Mutex<Vec<Listener>>,
    next_listener_id: AtomicU64,
}

/// 로그인 폼 검증: 필수 입력 → 이메일 형식
pub fn validate_sign_in(email: &str, password: &str) -> Result<(), AppError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AppError::Validation(
            "Email dan password harus diisi!".to_string(),
        ));
    }
    if !is_valid_email(email.trim()) {
        return Err(AppError::Validation("Format email tidak valid!".to_string()));
    }
    Ok(())
}

/// 회원가입 폼 검증: 필수 입력 → 비밀번호 일치 → 길이 → 이메일 형식
pub fn validate_sign_up(form: &RegisterForm) -> Result<(), AppError> {
    if form.name.trim().is_empty()
        || form.email.trim().is_empty()
        || form.password.is_empty()
        || form.confirm_password.is_empty()
    {
        return Err(AppError::Validation("Semua field harus diisi!".to_string()));
    }
    if form.password != form.confirm_password {
        return Err(AppError::Validation("Password tidak cocok!".to_string()));
    }
    if form.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AppError::Validation(
            "Password minimal 6 karakter!".to_string(),
        ));
    }
    if !is_valid_email(form.email.trim()) {
        return Err(AppError::Validation("Format email tidak valid!".to_string()));
    }
    Ok(())
}

impl AuthClient {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            session: RwLock::new(None),
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
        }
    }

    pub fn subscribe(&self) -> AuthSubscription {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push((id, tx));
        }
        AuthSubscription { id, rx }
    }

    pub fn unsubscribe(&self, subscription: AuthSubscription) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.retain(|(id, _)| *id != subscription.id);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().map(|l| l.len()).unwrap_or(0)
    }

    fn notify(&self, event: AuthEvent, session: Option<Session>) {
        tracing::debug!("Auth state change: {:?}", event);
        let Ok(mut listeners) = self.listeners.lock() else {
            return;
        };
        // 수신 측이 사라진 구독은 함께 정리합니다.
        listeners.retain(|(_, tx)| {
            tx.send(AuthStateChange {
                event,
                session: session.clone(),
            })
            .is_ok()
        });
    }

    /// 현재 세션. 만료되었으면 refresh 토큰으로 갱신합니다.
    ///
    /// 어떤 에러도 전파하지 않고 None을 반환합니다.
    pub async fn get_session(&self) -> Option<Session> {
        let current = self.session.read().await.clone()?;
        if !current.is_expired(Utc::now().timestamp()) {
            return Some(current);
        }

        let Some(refresh_token) = current.refresh_token.as_deref() else {
            tracing::warn!("Session expired without refresh token");
            *self.session.write().await = None;
            return None;
        };

        match self.backend.refresh_session(refresh_token).await {
            Ok(refreshed) => {
                *self.session.write().await = Some(refreshed.clone());
                self.notify(AuthEvent::TokenRefreshed, Some(refreshed.clone()));
                Some(refreshed)
            }
            Err(e) => {
                tracing::warn!("Error refreshing session: {}", e);
                *self.session.write().await = None;
                None
            }
        }
    }

    pub async fn current_user(&self) -> Option<CurrentUser> {
        self.get_session().await.map(|s| CurrentUser::from(&s))
    }

    /// 변경 작업 전에 호출합니다. 세션이 없으면 `AppError::AuthRequired`.
    pub async fn require_session(&self) -> Result<Session, AppError> {
        self.get_session().await.ok_or(AppError::AuthRequired)
    }

    /// 로컬 세션에 더해 백엔드에서 사용자를 다시 확인합니다.
    /// 백엔드가 토큰을 거부하면 `AppError::AuthRequired`.
    pub async fn verified_session(&self) -> Result<Session, AppError> {
        let mut session = self.require_session().await?;
        match self.backend.get_user(&session.access_token).await {
            Ok(user) => {
                session.user = user;
                Ok(session)
            }
            Err(e) => {
                tracing::warn!("Session rejected by backend: {}", e);
                Err(AppError::AuthRequired)
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<CurrentUser, AppError> {
        validate_sign_in(email, password)?;

        let session = self
            .backend
            .sign_in_with_password(email.trim(), password)
            .await
            .map_err(|e| {
                tracing::error!("Login error: {}", e);
                e
            })?;

        let user = CurrentUser::from(&session);
        *self.session.write().await = Some(session.clone());
        tracing::info!("User signed in: {}", user.id);
        self.notify(AuthEvent::SignedIn, Some(session));
        Ok(user)
    }

    pub async fn sign_up(&self, form: &RegisterForm) -> Result<SignUpOutcome, AppError> {
        validate_sign_up(form)?;

        let name = form.name.trim();
        let response = self
            .backend
            .sign_up(
                form.email.trim(),
                &form.password,
                UserMetadata::with_full_name(name),
            )
            .await
            .map_err(|e| {
                tracing::error!("Registration error: {}", e);
                e
            })?;

        if response.user.is_none() {
            return Ok(SignUpOutcome {
                user: None,
                message: "Registrasi berhasil! Silakan cek email untuk verifikasi".to_string(),
            });
        }

        match response.session {
            Some(session) => {
                let mut user = CurrentUser::from(&session);
                if session.user.user_metadata.full_name.is_none() {
                    user.name = name.to_string();
                }
                *self.session.write().await = Some(session.clone());
                tracing::info!("User registered and signed in: {}", user.id);
                self.notify(AuthEvent::SignedUp, Some(session));
                Ok(SignUpOutcome {
                    user: Some(user),
                    message: "Registrasi berhasil!".to_string(),
                })
            }
            None => {
                tracing::info!("User registered, waiting for email confirmation");
                self.notify(AuthEvent::SignedUp, None);
                Ok(SignUpOutcome {
                    user: None,
                    message: "Registrasi berhasil! Silakan cek email untuk verifikasi"
                        .to_string(),
                })
            }
        }
    }

    /// 로컬 세션은 항상 지웁니다. 원격 로그아웃 실패는 로그로만 남깁니다.
    pub async fn sign_out(&self) {
        let previous = self.session.write().await.take();
        if let Some(session) = previous {
            if let Err(e) = self.backend.sign_out(&session.access_token).await {
                tracing::warn!("Remote sign-out failed: {}", e);
            }
            tracing::info!("User signed out: {}", session.user.id);
        }
        self.notify(AuthEvent::SignedOut, None);
    }

    /// 표시 이름 변경: 사용자 메타데이터 + 프로필 행을 함께 갱신합니다.
    pub async fn update_display_name(&self, name: &str) -> Result<CurrentUser, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Nama tidak boleh kosong!".to_string()));
        }
        if name.chars().count() > MAX_NAME_CHARS {
            return Err(AppError::Validation(
                "Nama terlalu panjang (maksimal 100 karakter)".to_string(),
            ));
        }

        let mut session = self.require_session().await?;
        let user = self
            .backend
            .update_user(&session.access_token, UserMetadata::with_full_name(name))
            .await?;
        self.backend
            .upsert(
                PROFILES_TABLE,
                vec![json!({ "id": user.id, "full_name": name })],
                &session.access_token,
            )
            .await?;

        session.user = user;
        *self.session.write().await = Some(session.clone());
        let current = CurrentUser::from(&session);
        self.notify(AuthEvent::UserUpdated, Some(session));
        Ok(current)
    }

    pub async fn reset_password(&self, email: &str) -> Result<(), AppError> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(AppError::Validation("Format email tidak valid!".to_string()));
        }
        self.backend.reset_password_for_email(email).await
    }
}
