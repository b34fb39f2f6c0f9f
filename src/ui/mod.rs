//! # 화면 계층
//!
//! - `page`: 서버 측 화면 상태 (모달, 펼쳐진 댓글, 내비게이션 바)
//! - `render`: 화면 상태 → HTML
//! - `controller`: 방문자별 상태 기계와 폼 핸들러

pub mod controller;
pub mod page;
pub mod render;

pub use controller::{ClientState, Phase, UiController};
pub use page::{ModalId, Page, PostsView};
