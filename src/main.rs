//! # Biawak 웹 서버 진입점
//!
//! 이 파일이 수행하는 작업:
//! 1. 환경변수(.env) 로딩
//! 2. 로깅(tracing) 초기화
//! 3. 설정 로딩
//! 4. 백엔드 선택 (원격 Supabase 호환 서비스 또는 인메모리)
//! 5. 유휴 방문자 정리 작업 시작
//! 6. 라우터 설정 (페이지, JSON API, 정적 파일)
//! 7. HTTP 서버 시작

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use biawak::{
    backend::{Backend, MemoryBackend, SupabaseBackend},
    config::{BackendMode, Config},
    routes::{self, AppState},
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1단계: 환경변수 로딩 ──
    // .env 파일이 없어도 에러 없이 넘어갑니다.
    dotenvy::dotenv().ok();

    // ── 2단계: 로깅 초기화 ──
    // RUST_LOG가 없으면 biawak, tower_http, axum 모듈을 debug 레벨로 출력합니다.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "biawak=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // ── 3단계: 설정 로딩 ──
    let config = Config::from_env()?;
    tracing::info!("Starting Biawak server on {}:{}", config.host, config.port);

    // ── 4단계: 백엔드 선택 ──
    // 트레이트 객체(Arc<dyn Backend>)로 만들어 상위 계층에 주입합니다.
    let backend: Arc<dyn Backend> = match &config.backend {
        BackendMode::Remote { url, anon_key } => {
            tracing::info!("Using remote backend: {}", url);
            Arc::new(SupabaseBackend::new(url, anon_key, &config.client_info))
        }
        BackendMode::Memory => {
            tracing::warn!("BACKEND_URL not set, using in-memory backend (data is not persisted)");
            Arc::new(MemoryBackend::new())
        }
    };

    let state = AppState::new(backend, config.demo_fallback, config.realtime);

    // ── 5단계: 유휴 방문자 정리 ──
    // 1분마다 VISITOR_IDLE_SECS 이상 요청이 없던 방문자의 구독을 해지하고 상태를 버립니다.
    let idle = Duration::from_secs(config.visitor_idle_secs);
    let sweeper = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let evicted = sweeper.evict_idle(idle);
            if evicted > 0 {
                tracing::info!("Evicted {} idle visitors", evicted);
            }
        }
    });

    // ── 6단계: 라우터 설정 ──
    // 개발 환경에서는 모든 출처를 허용합니다.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let static_path = Path::new(&config.static_path);
    let app = if static_path.exists() {
        tracing::info!("Serving static files from {}", config.static_path);
        routes::router(state).nest_service("/static", ServeDir::new(static_path))
    } else {
        tracing::warn!("Static directory {} not found, serving pages without styles", config.static_path);
        routes::router(state)
    };
    let app = app.layer(cors).layer(TraceLayer::new_for_http());

    // ── 7단계: 서버 시작 ──
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
