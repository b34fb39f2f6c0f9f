//! # UI 컨트롤러
//!
//! 방문자 한 명의 화면을 담당하는 상태 기계입니다.
//!
//! ```text
//! Uninitialized ──initialize()──▶ Initializing ──▶ Ready
//!                                       └──────────▶ Fallback (게시글 로딩 실패)
//! ```
//!
//! 컨트롤러가 직접 들고 있는 것:
//! - `ClientState`: 현재 로그인 사용자
//! - `Page`: 화면 상태
//! - `Notifier`: 토스트
//! - 인증 상태 구독과 실시간 변경 수신기
//!
//! 인증 변화와 실시간 변경은 `drain_events()`에서 한꺼번에 처리합니다.
//! 게시글 재조회는 한 번만 일어납니다.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::backend::{Backend, RowChange, COMMENTS_TABLE, POSTS_TABLE};
use crate::error::AppError;
use crate::models::{AuthEvent, AuthStateChange, CurrentUser, LoginForm, RegisterForm};
use crate::services::helpers::current_year;
use crate::services::notifications::Toast;
use crate::services::throttle::Throttle;
use crate::services::{AuthClient, AuthSubscription, Notifier, PostsClient};

use super::page::{ModalId, Page, PostsView};
use super::render;

pub const SCROLL_THROTTLE: Duration = Duration::from_millis(100);
pub const NAVBAR_SCROLL_THRESHOLD: f64 = 50.0;

const LOGIN_FIRST: &str = "Silakan login terlebih dahulu!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Initializing,
    Ready,
    /// 초기 로딩 실패. 새로고침 안내만 보여줍니다.
    Fallback,
}

/// 화면이 알고 있는 클라이언트 상태
#[derive(Debug, Clone, Default)]
pub struct ClientState {
    pub current_user: Option<CurrentUser>,
}

pub struct UiController {
    auth: Arc<AuthClient>,
    posts: Arc<PostsClient>,
    backend: Arc<dyn Backend>,
    realtime: bool,
    phase: Phase,
    state: ClientState,
    page: Page,
    notifier: Notifier,
    scroll: Throttle<f64>,
    auth_events: Option<AuthSubscription>,
    row_changes: Vec<broadcast::Receiver<RowChange>>,
}

impl UiController {
    pub fn new(
        backend: Arc<dyn Backend>,
        auth: Arc<AuthClient>,
        posts: Arc<PostsClient>,
        realtime: bool,
    ) -> Self {
        Self {
            auth,
            posts,
            backend,
            realtime,
            phase: Phase::Uninitialized,
            state: ClientState::default(),
            page: Page::default(),
            notifier: Notifier::new(),
            scroll: Throttle::new(SCROLL_THROTTLE),
            auth_events: None,
            row_changes: Vec::new(),
        }
    }

    /// 백엔드 하나로 방문자용 클라이언트 묶음을 만듭니다.
    pub fn for_visitor(backend: Arc<dyn Backend>, fallback_content: bool, realtime: bool) -> Self {
        let auth = Arc::new(AuthClient::new(backend.clone()));
        let posts = Arc::new(PostsClient::new(backend.clone(), auth.clone(), fallback_content));
        Self::new(backend, auth, posts, realtime)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn auth(&self) -> &Arc<AuthClient> {
        &self.auth
    }

    pub fn active_toasts(&mut self) -> Vec<Toast> {
        self.notifier.active()
    }

    // ── 초기화 / 정리 ──

    /// 두 번째 호출부터는 아무 일도 하지 않습니다.
    pub async fn initialize(&mut self) {
        if self.phase != Phase::Uninitialized {
            return;
        }
        self.phase = Phase::Initializing;
        self.page.footer_year = current_year(Utc::now());

        self.bind_listeners().await;

        match self.posts.check_connection().await {
            Ok(()) => tracing::info!("Posts system initialized successfully"),
            Err(e) => tracing::warn!("Posts table not reachable: {}", e),
        }

        self.state.current_user = self.auth.current_user().await;
        if let Some(user) = &self.state.current_user {
            tracing::info!("User authenticated: {}", user.name);
        }
        self.update_auth_ui();

        match self.load_posts().await {
            Ok(()) => self.phase = Phase::Ready,
            Err(e) => {
                tracing::error!("Initialization error: {}", e);
                self.show_fallback_ui();
                self.phase = Phase::Fallback;
            }
        }
    }

    async fn bind_listeners(&mut self) {
        if self.auth_events.is_none() {
            self.auth_events = Some(self.auth.subscribe());
        }
        if !self.realtime || !self.row_changes.is_empty() {
            return;
        }
        for table in [POSTS_TABLE, COMMENTS_TABLE] {
            match self.backend.subscribe(table).await {
                Ok(rx) => self.row_changes.push(rx),
                Err(e) => tracing::warn!("Realtime subscription to {} failed: {}", table, e),
            }
        }
    }

    /// 구독을 모두 해지합니다. 방문자 세션이 만료될 때 호출됩니다.
    pub fn teardown(&mut self) {
        if let Some(subscription) = self.auth_events.take() {
            self.auth.unsubscribe(subscription);
        }
        self.row_changes.clear();
        tracing::debug!("Controller torn down");
    }

    fn show_fallback_ui(&mut self) {
        self.page.nav_auth_html = render::auth_buttons(None);
        self.page.create_post_button_visible = false;
        self.page.posts = PostsView::LoadFailed;
        self.render_posts();
        self.notifier
            .error("Terjadi masalah saat memuat aplikasi. Silakan refresh halaman.");
    }

    // ── 이벤트 처리 ──

    /// 쌓인 인증 변화와 행 변경 알림을 처리합니다.
    /// 무엇이든 하나라도 있었다면 게시글을 한 번 다시 불러옵니다.
    pub async fn drain_events(&mut self) {
        self.settle_scroll();

        let mut changes = Vec::new();
        if let Some(subscription) = self.auth_events.as_mut() {
            while let Some(change) = subscription.try_next() {
                changes.push(change);
            }
        }

        let mut reload = !changes.is_empty();
        for change in changes {
            self.apply_auth_change(change);
        }

        for rx in &mut self.row_changes {
            loop {
                match rx.try_recv() {
                    Ok(change) => {
                        tracing::debug!("Realtime change on {}: {:?}", change.table, change.kind);
                        reload = true;
                    }
                    Err(TryRecvError::Lagged(skipped)) => {
                        tracing::debug!("Realtime receiver lagged by {}", skipped);
                        reload = true;
                    }
                    Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                }
            }
        }

        if reload && self.phase != Phase::Uninitialized {
            if let Err(e) = self.load_posts().await {
                tracing::error!("Error loading posts: {}", e);
            }
        }
    }

    fn apply_auth_change(&mut self, change: AuthStateChange) {
        match change.event {
            AuthEvent::SignedIn | AuthEvent::UserUpdated => {
                self.state.current_user = change.session.as_ref().map(CurrentUser::from);
                self.notifier.success("Berhasil login!");
            }
            AuthEvent::SignedOut => {
                self.state.current_user = None;
                self.notifier.success("Berhasil logout!");
            }
            AuthEvent::SignedUp | AuthEvent::TokenRefreshed => {
                if let Some(session) = &change.session {
                    self.state.current_user = Some(CurrentUser::from(session));
                }
            }
        }
        self.update_auth_ui();
    }

    fn update_auth_ui(&mut self) {
        self.page.nav_auth_html = render::auth_buttons(self.state.current_user.as_ref());
        self.page.create_post_button_visible = self.state.current_user.is_some();
        self.render_posts();
    }

    fn render_posts(&mut self) {
        self.page.posts_html = render::posts_section(
            &self.page.posts,
            self.state.current_user.as_ref(),
            &self.page.open_comments,
            Utc::now(),
        );
    }

    /// 실패하면 새로고침 안내를 보여주고 에러를 돌려줍니다.
    pub async fn load_posts(&mut self) -> Result<(), AppError> {
        self.page.posts = PostsView::Loading;
        self.render_posts();

        let result = self.posts.fetch_posts_with_comments().await;
        let outcome = match result {
            Ok(posts) => {
                self.page.posts = PostsView::List(posts);
                Ok(())
            }
            Err(e) => {
                self.page.posts = PostsView::LoadFailed;
                Err(e)
            }
        };
        self.render_posts();
        outcome
    }

    // ── 모달 ──

    pub fn show_modal(&mut self, id: ModalId) {
        if id == ModalId::CreatePost {
            self.show_create_post_modal();
        } else {
            self.page.open_modal(id);
        }
    }

    pub fn close_modal(&mut self, id: ModalId) {
        self.page.close_modal(id);
    }

    /// 열린 모달의 바깥 영역을 누르면 닫힙니다.
    pub fn backdrop_click(&mut self, id: ModalId) {
        if self.page.is_modal_open(id) {
            self.page.close_modal(id);
        }
    }

    /// 로그인 ↔ 회원가입 전환
    pub fn switch_modal(&mut self, to: ModalId) {
        match to {
            ModalId::Register => {
                self.page.close_modal(ModalId::Login);
                self.page.open_modal(ModalId::Register);
            }
            ModalId::Login => {
                self.page.close_modal(ModalId::Register);
                self.page.open_modal(ModalId::Login);
            }
            ModalId::CreatePost => self.show_create_post_modal(),
        }
    }

    pub fn show_create_post_modal(&mut self) {
        if self.state.current_user.is_none() {
            self.require_login_prompt();
            return;
        }
        self.page.open_modal(ModalId::CreatePost);
    }

    fn require_login_prompt(&mut self) {
        self.notifier.error(LOGIN_FIRST);
        self.page.open_modal(ModalId::Login);
    }

    // ── 폼 핸들러 ──

    pub async fn handle_login(&mut self, form: LoginForm) {
        self.page
            .remember_form(ModalId::Login, [("email", form.email.as_str())]);

        match self.auth.sign_in(&form.email, &form.password).await {
            Ok(_) => self.page.close_modal(ModalId::Login),
            Err(e) => {
                tracing::error!("Login error: {}", e);
                self.notifier.error(e.user_message());
            }
        }
    }

    pub async fn handle_register(&mut self, form: RegisterForm) {
        self.page.remember_form(
            ModalId::Register,
            [("name", form.name.as_str()), ("email", form.email.as_str())],
        );

        match self.auth.sign_up(&form).await {
            Ok(outcome) => {
                self.page.close_modal(ModalId::Register);
                if outcome.user.is_some() {
                    self.notifier.success("Registrasi berhasil! Selamat datang!");
                } else {
                    self.notifier.success(outcome.message);
                }
            }
            Err(e) => {
                tracing::error!("Registration error: {}", e);
                self.notifier.error(e.user_message());
            }
        }
    }

    pub async fn handle_logout(&mut self) {
        self.auth.sign_out().await;
    }

    pub async fn handle_create_post(&mut self, title: &str, content: &str) {
        if self.state.current_user.is_none() {
            self.require_login_prompt();
            return;
        }
        self.page.remember_form(
            ModalId::CreatePost,
            [("title", title), ("content", content)],
        );
        if title.trim().is_empty() || content.trim().is_empty() {
            self.notifier.error("Judul dan konten harus diisi!");
            return;
        }

        match self.posts.create_new_post(title, content).await {
            Ok(_) => {
                self.page.close_modal(ModalId::CreatePost);
                self.notifier.success("Postingan berhasil dibuat!");
                if let Err(e) = self.load_posts().await {
                    tracing::error!("Error loading posts: {}", e);
                }
            }
            Err(e) => {
                tracing::error!("Error creating post: {}", e);
                self.notifier.error(e.user_message());
            }
        }
    }

    pub async fn handle_add_comment(&mut self, post_id: &str, content: &str) {
        if self.state.current_user.is_none() {
            self.require_login_prompt();
            return;
        }
        if content.trim().is_empty() {
            self.notifier.error("Komentar tidak boleh kosong!");
            return;
        }

        match self.posts.add_comment_to_post(post_id, content).await {
            Ok(_) => {
                self.notifier.success("Komentar berhasil ditambahkan!");
                if let Err(e) = self.load_posts().await {
                    tracing::error!("Error loading posts: {}", e);
                }
                self.page.open_comments.insert(post_id.to_string());
                self.render_posts();
            }
            Err(e) => {
                tracing::error!("Error adding comment: {}", e);
                self.notifier.error(e.user_message());
            }
        }
    }

    pub async fn handle_delete_post(&mut self, post_id: &str) {
        if self.state.current_user.is_none() {
            self.require_login_prompt();
            return;
        }

        match self.posts.delete_post(post_id).await {
            Ok(()) => {
                self.page.open_comments.remove(post_id);
                self.notifier.success("Postingan berhasil dihapus!");
                if let Err(e) = self.load_posts().await {
                    tracing::error!("Error loading posts: {}", e);
                }
            }
            Err(e) => {
                tracing::error!("Error deleting post: {}", e);
                self.notifier.error(e.user_message());
            }
        }
    }

    pub async fn handle_update_display_name(&mut self, name: &str) {
        match self.auth.update_display_name(name).await {
            Ok(user) => tracing::info!("Display name updated: {}", user.name),
            Err(e) => {
                tracing::error!("Error updating display name: {}", e);
                self.notifier.error(e.user_message());
            }
        }
    }

    pub async fn handle_password_reset(&mut self, email: &str) {
        self.page.remember_form(ModalId::Login, [("email", email)]);

        match self.auth.reset_password(email).await {
            Ok(()) => {
                self.notifier
                    .info("Link reset password telah dikirim ke email Anda.");
            }
            Err(e) => {
                tracing::error!("Password reset error: {}", e);
                self.notifier.error(e.user_message());
            }
        }
    }

    pub fn toggle_comments(&mut self, post_id: &str) {
        self.page.toggle_comments(post_id);
        self.render_posts();
    }

    /// throttle 간격 안의 위치는 보관만 하고 현재 상태를 돌려줍니다.
    /// 보관된 마지막 위치는 간격이 지난 뒤 `settle_scroll()`에서 반영됩니다.
    pub fn handle_scroll(&mut self, scroll_y: f64) -> bool {
        if let Some(y) = self.scroll.call(scroll_y) {
            self.apply_scroll(y);
        }
        self.page.navbar_scrolled
    }

    /// 간격이 지났으면 마지막으로 보관된 스크롤 위치를 반영합니다.
    pub fn settle_scroll(&mut self) -> bool {
        if let Some(y) = self.scroll.flush() {
            self.apply_scroll(y);
        }
        self.page.navbar_scrolled
    }

    fn apply_scroll(&mut self, scroll_y: f64) {
        self.page.navbar_scrolled = scroll_y > NAVBAR_SCROLL_THRESHOLD;
    }

    pub fn render(&mut self) -> String {
        self.settle_scroll();
        let toasts = self.notifier.render();
        render::document(&self.page, &toasts)
    }
}

impl Drop for UiController {
    fn drop(&mut self) {
        self.teardown();
    }
}
