//! 요청 추출기(Extractor)
//!
//! - `visitor`: 방문자 쿠키 → `Visitor`

pub mod visitor;

pub use visitor::{Visitor, VISITOR_COOKIE};
