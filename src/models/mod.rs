//! # 데이터 모델 모듈
//!
//! 애플리케이션에서 사용하는 데이터 구조체(struct)들을 정의합니다.
//! - `session`: 세션, 사용자, 인증 이벤트, 로그인/회원가입 폼
//! - `post`: 게시글과 댓글 (백엔드 행 → 화면용 모델 변환 포함)

pub mod post;
pub mod session;

pub use post::*;
pub use session::*;
