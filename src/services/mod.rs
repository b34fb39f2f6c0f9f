//! # 서비스 계층
//!
//! 라우트 핸들러와 UI 컨트롤러가 사용하는 비즈니스 로직입니다.
//!
//! 각 하위 모듈:
//! - `auth`: 인증 클라이언트 (검증, 세션 보관, 상태 변화 구독)
//! - `posts`: 게시글/댓글 클라이언트
//! - `demo`: 조회 실패 시 보여주는 데모 게시글
//! - `helpers`: HTML 이스케이프, 날짜 포맷, 이메일 검증
//! - `notifications`: 토스트 알림
//! - `throttle`: 스크롤 throttle, debounce

pub mod auth;
pub mod demo;
pub mod helpers;
pub mod notifications;
pub mod posts;
pub mod throttle;

pub use auth::{AuthClient, AuthSubscription};
pub use notifications::{Notifier, ToastKind};
pub use posts::PostsClient;
