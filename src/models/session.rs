use serde::{Deserialize, Serialize};

/// 사용자 이름이 메타데이터에 없을 때 표시하는 이름
pub const DEFAULT_USER_NAME: &str = "Pengguna";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

impl UserMetadata {
    pub fn with_full_name(name: impl Into<String>) -> Self {
        Self {
            full_name: Some(name.into()),
        }
    }
}

/// 백엔드 인증 서비스가 관리하는 사용자
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

/// 로그인/회원가입 시 발급되는 자격 증명 묶음
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// 만료 시각 (Unix 초)
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    /// 만료 10초 전부터 만료된 것으로 취급합니다.
    pub fn is_expired(&self, now_unix: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => now_unix + 10 >= expires_at,
            None => false,
        }
    }
}

/// 회원가입 결과. 이메일 확인이 필요한 백엔드는 세션 없이 사용자만 돌려줍니다.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpResponse {
    pub user: Option<User>,
    pub session: Option<Session>,
}

/// UI가 보관하는 현재 사용자의 읽기 전용 투영(projection)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentUser {
    pub id: String,
    pub email: Option<String>,
    pub name: String,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        let name = user
            .user_metadata
            .full_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_USER_NAME)
            .to_string();

        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name,
        }
    }
}

impl From<&Session> for CurrentUser {
    fn from(session: &Session) -> Self {
        CurrentUser::from(&session.user)
    }
}

/// 인증 상태 변화 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    SignedIn,
    SignedUp,
    SignedOut,
    UserUpdated,
    TokenRefreshed,
}

/// 인증 클라이언트가 구독자에게 보내는 알림
#[derive(Debug, Clone, PartialEq)]
pub struct AuthStateChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

/// 로그인 폼 입력값
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// 회원가입 폼 입력값
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// 회원가입 처리 결과 (UI 메시지 포함)
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpOutcome {
    pub user: Option<CurrentUser>,
    pub message: String,
}
