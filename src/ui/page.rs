//! # 페이지 상태
//!
//! 브라우저 DOM 대신 서버가 들고 있는 화면 상태입니다.
//! 컨트롤러가 이 값을 바꾸고, `render::document()`가 HTML로 그립니다.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::Post;

/// 화면의 모달 세 개
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModalId {
    Login,
    Register,
    CreatePost,
}

impl ModalId {
    pub const ALL: [ModalId; 3] = [ModalId::Login, ModalId::Register, ModalId::CreatePost];

    /// URL 경로 조각 (`/modals/{slug}/open`)
    pub fn slug(self) -> &'static str {
        match self {
            ModalId::Login => "login",
            ModalId::Register => "register",
            ModalId::CreatePost => "create-post",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.slug() == slug)
    }

    pub fn element_id(self) -> &'static str {
        match self {
            ModalId::Login => "loginModal",
            ModalId::Register => "registerModal",
            ModalId::CreatePost => "createPostModal",
        }
    }

    /// 모달이 열릴 때 포커스를 받는 첫 입력 필드
    pub fn first_input(self) -> &'static str {
        match self {
            ModalId::Login => "loginEmail",
            ModalId::Register => "registerName",
            ModalId::CreatePost => "postTitle",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModalState {
    pub open: bool,
    pub focused_field: Option<&'static str>,
    /// 제출 실패 후 다시 채워 넣을 입력값 (필드 이름 → 값)
    pub form: BTreeMap<String, String>,
}

/// 게시글 영역에 표시할 내용
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PostsView {
    #[default]
    Loading,
    List(Vec<Post>),
    /// 불러오기 실패. 새로고침 버튼을 보여줍니다.
    LoadFailed,
}

#[derive(Debug, Clone, Default)]
pub struct Page {
    pub nav_auth_html: String,
    pub create_post_button_visible: bool,
    pub posts: PostsView,
    pub posts_html: String,
    pub navbar_scrolled: bool,
    pub modals: HashMap<ModalId, ModalState>,
    /// 댓글 영역이 펼쳐진 게시글 id
    pub open_comments: HashSet<String>,
    pub footer_year: i32,
}

impl Page {
    pub fn modal(&self, id: ModalId) -> Option<&ModalState> {
        self.modals.get(&id)
    }

    pub fn modal_mut(&mut self, id: ModalId) -> &mut ModalState {
        self.modals.entry(id).or_default()
    }

    pub fn is_modal_open(&self, id: ModalId) -> bool {
        self.modal(id).is_some_and(|m| m.open)
    }

    /// 모달을 보이고 첫 입력 필드에 포커스를 줍니다.
    pub fn open_modal(&mut self, id: ModalId) {
        let modal = self.modal_mut(id);
        modal.open = true;
        modal.focused_field = Some(id.first_input());
    }

    /// 폼을 초기화하고 숨깁니다.
    pub fn close_modal(&mut self, id: ModalId) {
        let modal = self.modal_mut(id);
        modal.open = false;
        modal.focused_field = None;
        modal.form.clear();
    }

    /// 입력값을 기억해 둡니다. 비밀번호 필드는 저장하지 않습니다.
    pub fn remember_form<'a>(&mut self, id: ModalId, fields: impl IntoIterator<Item = (&'a str, &'a str)>) {
        let modal = self.modal_mut(id);
        modal.form = fields
            .into_iter()
            .filter(|(name, _)| !name.contains("password"))
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
    }

    pub fn form_value(&self, id: ModalId, field: &str) -> &str {
        self.modal(id)
            .and_then(|m| m.form.get(field))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// 댓글 영역 펼침/접힘. 펼쳐진 상태가 되면 true.
    pub fn toggle_comments(&mut self, post_id: &str) -> bool {
        if self.open_comments.remove(post_id) {
            false
        } else {
            self.open_comments.insert(post_id.to_string());
            true
        }
    }

    pub fn comments_open(&self, post_id: &str) -> bool {
        self.open_comments.contains(post_id)
    }
}
