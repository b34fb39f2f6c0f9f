//! # Biawak Foundation 커뮤니티 웹
//!
//! 게시글, 댓글, 이메일/비밀번호 인증을 제공하는 커뮤니티 페이지입니다.
//! 데이터와 인증은 외부 BaaS(Supabase 호환)에 맡기고, 이 서버는 화면을 렌더링합니다.
//!
//! 모듈 구조:
//! - `config`: 환경변수 설정
//! - `error`: 에러 타입과 사용자용 메시지 변환
//! - `models`: 세션, 사용자, 게시글, 댓글 데이터 구조
//! - `backend`: BaaS 경계 (`Backend` 트레이트와 구현들)
//! - `services`: 인증/게시글 클라이언트, 화면 유틸리티
//! - `ui`: 방문자별 화면 상태 기계와 HTML 렌더링
//! - `middleware`: 방문자 쿠키 추출기
//! - `routes`: axum 핸들러와 라우터

pub mod backend;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod ui;
