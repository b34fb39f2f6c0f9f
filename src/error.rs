//! # 에러 처리 모듈
//!
//! 애플리케이션에서 발생할 수 있는 모든 에러 타입을 정의합니다.
//!
//! 이 모듈의 핵심:
//! - `AppError` 열거형(enum): 검증 / 인증 필요 / 백엔드 / 가용성 에러를 하나의 타입으로 통합
//! - `user_message()`: 백엔드의 영어 에러 메시지를 사용자용 인도네시아어 문구로 변환
//! - `IntoResponse` 구현: JSON API에서 에러를 HTTP 응답으로 자동 변환
//!
//! UI 핸들러는 에러를 전파하지 않고 `user_message()`를 토스트로 보여줍니다.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// 로그인이 필요한 작업을 세션 없이 시도했을 때의 메시지
pub const AUTH_REQUIRED_MESSAGE: &str = "Anda harus login terlebih dahulu";

/// 백엔드가 빈 메시지를 돌려줬을 때의 기본 문구
pub const UNKNOWN_ERROR_MESSAGE: &str = "Terjadi kesalahan yang tidak diketahui!";

/// 백엔드 에러 메시지(부분 문자열) → 사용자용 문구 매핑 테이블
///
/// 위에서부터 순서대로 검사하며, 처음 일치하는 항목이 사용됩니다.
const KNOWN_BACKEND_MESSAGES: &[(&str, &str)] = &[
    ("Invalid login credentials", "Email atau password salah!"),
    ("Email not confirmed", "Silakan konfirmasi email Anda terlebih dahulu!"),
    ("User already registered", "Email sudah terdaftar!"),
    ("Too many requests", "Terlalu banyak percobaan. Coba lagi nanti!"),
    ("Password should", "Password minimal 6 karakter!"),
    ("Unable to validate email address", "Format email tidak valid!"),
    ("Invalid email", "Format email tidak valid!"),
    ("Signup requires a valid password", "Password tidak boleh kosong!"),
    ("Database error saving user", "Terjadi kesalahan pada database!"),
    ("row-level security", "Akses ditolak!"),
    ("JWT expired", "Sesi telah berakhir, silakan login kembali!"),
];

/// 애플리케이션에서 발생할 수 있는 모든 에러 종류
#[derive(Debug, Error)]
pub enum AppError {
    /// 클라이언트 측 검증 실패. 메시지는 이미 사용자용 문구입니다.
    /// 네트워크 호출 전에 발생합니다.
    #[error("{0}")]
    Validation(String),

    /// 세션 없이 변경 작업(게시글 작성, 댓글, 삭제)을 시도함
    #[error("Anda harus login terlebih dahulu")]
    AuthRequired,

    /// 요청한 리소스를 찾을 수 없음 (예: 댓글을 달 게시글)
    #[error("{0}")]
    NotFound(String),

    /// 백엔드(BaaS)가 에러를 반환함
    /// `message`는 백엔드가 준 원문 그대로입니다.
    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// 백엔드 메시지에 사용자용 접두어를 붙인 에러
    /// 예: "Gagal membuat postingan: " + 정규화된 백엔드 메시지
    #[error("{prefix}{source}")]
    Context {
        prefix: &'static str,
        #[source]
        source: Box<AppError>,
    },

    /// 필요한 구성요소(백엔드, 게시글 목록)를 사용할 수 없음
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// 네트워크 / HTTP 전송 오류
    /// #[from]: reqwest::Error → AppError::Transport 자동 변환
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// JSON 파싱 오류
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// 서버 내부 오류
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// 백엔드 에러를 간단히 만드는 헬퍼
    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        AppError::Backend {
            status,
            message: message.into(),
        }
    }

    /// 에러에 사용자용 접두어를 붙입니다.
    pub fn context(self, prefix: &'static str) -> Self {
        AppError::Context {
            prefix,
            source: Box::new(self),
        }
    }

    /// 토스트에 표시할 사용자용 메시지
    ///
    /// 백엔드 에러는 `KNOWN_BACKEND_MESSAGES` 테이블로 정규화하고,
    /// 알 수 없는 메시지는 원문 그대로 보여줍니다.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) | AppError::NotFound(msg) => msg.clone(),
            AppError::AuthRequired => AUTH_REQUIRED_MESSAGE.to_string(),
            AppError::Backend { message, .. } => normalize_backend_message(message),
            AppError::Context { prefix, source } => {
                format!("{}{}", prefix, source.user_message())
            }
            AppError::Unavailable(_) => {
                "Layanan sedang tidak tersedia. Silakan coba lagi nanti.".to_string()
            }
            AppError::Transport(_) => {
                "Tidak dapat terhubung ke server. Periksa koneksi Anda.".to_string()
            }
            AppError::Decode(_) | AppError::Internal(_) => UNKNOWN_ERROR_MESSAGE.to_string(),
        }
    }

    /// 백엔드에 도달하지 못한 종류의 에러인지 여부
    /// (폴백 콘텐츠를 보여줄지 결정할 때 사용)
    pub fn is_availability(&self) -> bool {
        matches!(
            self,
            AppError::Unavailable(_) | AppError::Transport(_) | AppError::Backend { .. }
        )
    }
}

/// 백엔드 메시지를 알려진 문구로 바꿉니다. 모르는 메시지는 그대로 통과합니다.
pub fn normalize_backend_message(message: &str) -> String {
    if message.trim().is_empty() {
        return UNKNOWN_ERROR_MESSAGE.to_string();
    }

    KNOWN_BACKEND_MESSAGES
        .iter()
        .find(|(needle, _)| message.contains(needle))
        .map(|(_, friendly)| friendly.to_string())
        .unwrap_or_else(|| message.to_string())
}

// JSON API(`/api/v1/...`)에서 핸들러가 Err(AppError)를 반환하면
// Axum이 이 구현을 통해 HTTP 응답으로 변환합니다.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            AppError::AuthRequired => (StatusCode::UNAUTHORIZED, "auth_required"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Backend { .. } | AppError::Context { .. } => {
                (StatusCode::BAD_GATEWAY, "backend_error")
            }
            AppError::Unavailable(_) | AppError::Transport(_) => {
                tracing::error!("Backend unavailable: {}", self);
                (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
            }
            AppError::Decode(_) | AppError::Internal(_) => {
                // 내부 에러는 로그에만 자세히 남깁니다.
                tracing::error!("Internal error: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.user_message()
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_backend_messages_are_localized() {
        let err = AppError::backend(400, "Invalid login credentials");
        assert_eq!(err.user_message(), "Email atau password salah!");

        let err = AppError::backend(400, "AuthApiError: Email not confirmed");
        assert_eq!(
            err.user_message(),
            "Silakan konfirmasi email Anda terlebih dahulu!"
        );

        let err = AppError::backend(429, "Too many requests");
        assert_eq!(err.user_message(), "Terlalu banyak percobaan. Coba lagi nanti!");
    }

    #[test]
    fn unknown_backend_messages_pass_through() {
        let err = AppError::backend(500, "relation \"posts\" does not exist");
        assert_eq!(err.user_message(), "relation \"posts\" does not exist");

        let err = AppError::backend(500, "   ");
        assert_eq!(err.user_message(), UNKNOWN_ERROR_MESSAGE);
    }

    #[test]
    fn context_prefixes_normalized_message() {
        let err = AppError::backend(403, "new row violates row-level security policy")
            .context("Gagal membuat postingan: ");
        assert_eq!(err.user_message(), "Gagal membuat postingan: Akses ditolak!");
    }
}
