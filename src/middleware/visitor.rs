use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{
        header::{COOKIE, SET_COOKIE},
        request::Parts,
        HeaderName,
    },
    response::AppendHeaders,
};
use uuid::Uuid;

pub const VISITOR_COOKIE: &str = "biawak_visitor";

/// 방문자 쿠키로 구분한 브라우저 한 개
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visitor {
    pub id: String,
    /// 이번 요청에서 새로 발급했다면 응답에 쿠키를 실어야 합니다.
    pub is_new: bool,
}

impl<S> FromRequestParts<S> for Visitor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let existing = parts
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|header| header.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == VISITOR_COOKIE)
            .map(|(_, value)| value.trim().to_string())
            .filter(|value| Uuid::parse_str(value).is_ok());

        Ok(match existing {
            Some(id) => Visitor { id, is_new: false },
            None => Visitor {
                id: Uuid::now_v7().to_string(),
                is_new: true,
            },
        })
    }
}

impl Visitor {
    pub fn cookie(&self) -> AppendHeaders<Option<(HeaderName, String)>> {
        AppendHeaders(self.is_new.then(|| {
            (
                SET_COOKIE,
                format!(
                    "{}={}; Path=/; HttpOnly; SameSite=Lax",
                    VISITOR_COOKIE, self.id
                ),
            )
        }))
    }
}
