//! # 애플리케이션 설정(Configuration) 모듈
//!
//! 환경변수에서 서버 설정값을 읽어오는 모듈입니다.
//! `.env` 파일이나 시스템 환경변수에서 값을 가져옵니다.
//!
//! 설정 항목:
//! - `BACKEND_URL`: Supabase 호환 백엔드 주소 (없으면 인메모리 백엔드 사용)
//! - `BACKEND_ANON_KEY`: 백엔드 anon 키 (`BACKEND_URL`이 있으면 필수)
//! - `CLIENT_INFO`: 모든 백엔드 요청에 붙는 `X-Client-Info` 헤더 값
//! - `HOST`, `PORT`: 서버 바인딩 주소
//! - `DEMO_FALLBACK`: 게시글 로딩 실패 시 데모 게시글로 대체할지 여부
//! - `REALTIME`: 게시글/댓글 실시간 구독 사용 여부
//! - `VISITOR_IDLE_SECS`: 방문자 상태를 메모리에서 정리하기까지의 유휴 시간
//! - `STATIC_PATH`: 정적 파일 디렉토리

use std::env;

/// 백엔드 연결 방식
#[derive(Debug, Clone, PartialEq)]
pub enum BackendMode {
    /// 원격 Supabase 호환 서비스
    Remote { url: String, anon_key: String },
    /// 프로세스 내부 백엔드 (개발/데모용)
    Memory,
}

/// 애플리케이션 전체 설정을 담는 구조체
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendMode,
    pub client_info: String,
    pub host: String,
    pub port: u16,
    pub demo_fallback: bool,
    pub realtime: bool,
    pub visitor_idle_secs: u64,
    pub static_path: String,
}

impl Config {
    /// 환경변수에서 설정값을 읽어 Config 인스턴스를 생성합니다.
    ///
    /// # 에러
    /// `BACKEND_URL`이 설정되어 있는데 `BACKEND_ANON_KEY`가 없으면 에러가 발생합니다.
    /// 나머지 설정은 기본값이 있어 환경변수가 없어도 동작합니다.
    pub fn from_env() -> Result<Self, env::VarError> {
        let backend = match env::var("BACKEND_URL") {
            Ok(url) if !url.trim().is_empty() => BackendMode::Remote {
                url: url.trim_end_matches('/').to_string(),
                anon_key: env::var("BACKEND_ANON_KEY")?, // 원격 모드에서는 필수
            },
            _ => BackendMode::Memory,
        };

        Ok(Self {
            backend,
            client_info: env::var("CLIENT_INFO")
                .unwrap_or_else(|_| "biawak-foundation-web".to_string()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            demo_fallback: parse_flag(env::var("DEMO_FALLBACK").ok(), true),
            realtime: parse_flag(env::var("REALTIME").ok(), true),
            visitor_idle_secs: env::var("VISITOR_IDLE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1800),
            static_path: env::var("STATIC_PATH").unwrap_or_else(|_| "public".to_string()),
        })
    }
}

/// "true"/"1"/"yes"/"on" → true, "false"/"0"/"no"/"off" → false, 그 외 → 기본값
fn parse_flag(value: Option<String>, default: bool) -> bool {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "true" | "1" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "false" | "0" | "no" | "off") => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::parse_flag;

    #[test]
    fn flags_fall_back_to_default() {
        assert!(parse_flag(None, true));
        assert!(!parse_flag(Some("off".into()), true));
        assert!(parse_flag(Some(" YES ".into()), false));
        assert!(!parse_flag(Some("maybe".into()), false));
    }
}
