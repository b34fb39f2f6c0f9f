//! # HTML 렌더링
//!
//! 사용자 입력에서 온 문자열은 모두 `escape_html()`을 거칩니다.
//! 게시글 본문은 이스케이프 후 줄바꿈만 `<br>`로 바꿉니다.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::models::{Comment, CurrentUser, Post};
use crate::services::helpers::{escape_html, format_date_at, nl2br};

use super::page::{ModalId, Page, PostsView};

pub fn auth_buttons(user: Option<&CurrentUser>) -> String {
    match user {
        Some(user) => format!(
            concat!(
                r#"<span class="user-greeting">Halo, {name}!</span>"#,
                r#"<form method="post" action="/profile/name" class="inline-form profile-form">"#,
                r#"<input type="text" name="name" value="{name}" maxlength="100" aria-label="Nama tampilan" required>"#,
                r#"<button type="submit" class="btn-secondary">Ubah Nama</button></form>"#,
                r#"<form method="post" action="/auth/logout" class="inline-form">"#,
                r#"<button type="submit" class="btn-secondary">Keluar</button></form>"#
            ),
            name = escape_html(&user.name)
        ),
        None => concat!(
            r#"<form method="post" action="/modals/login/open" class="inline-form">"#,
            r#"<button type="submit" class="btn-secondary">Masuk</button></form>"#,
            r#"<form method="post" action="/modals/register/open" class="inline-form">"#,
            r#"<button type="submit" class="btn-primary">Daftar</button></form>"#
        )
        .to_string(),
    }
}

pub fn loading_posts() -> String {
    r#"<div class="no-posts"><i class="fas fa-spinner fa-spin"></i><p>Memuat postingan...</p></div>"#
        .to_string()
}

pub fn load_failed() -> String {
    concat!(
        r#"<div class="no-posts"><i class="fas fa-exclamation-triangle"></i>"#,
        r#"<p>Gagal memuat postingan. Silakan refresh halaman.</p>"#,
        r#"<a class="btn-primary" href="/">Refresh Halaman</a></div>"#
    )
    .to_string()
}

pub fn empty_posts(logged_in: bool) -> String {
    let message = if logged_in {
        "Belum ada postingan. Buat postingan pertama!"
    } else {
        "Silakan login untuk membuat postingan!"
    };
    format!(
        r#"<div class="no-posts"><i class="fas fa-comments"></i><p>{}</p></div>"#,
        message
    )
}

pub fn comments_list(comments: &[Comment], now: DateTime<Utc>) -> String {
    if comments.is_empty() {
        return "<p>Belum ada komentar</p>".to_string();
    }
    comments
        .iter()
        .map(|comment| {
            format!(
                concat!(
                    r#"<div class="comment">"#,
                    r#"<div class="comment-author">{}</div>"#,
                    r#"<div class="comment-content">{}</div>"#,
                    r#"<div class="comment-date">{}</div>"#,
                    r#"</div>"#
                ),
                escape_html(&comment.author_name),
                escape_html(&comment.content),
                format_date_at(comment.created_at, now)
            )
        })
        .collect()
}

fn post_card(
    post: &Post,
    user: Option<&CurrentUser>,
    comments_open: bool,
    now: DateTime<Utc>,
) -> String {
    let id = escape_html(&post.id);

    let delete = match user {
        Some(u) if u.id == post.user_id => format!(
            r#"<form method="post" action="/posts/{}/delete" class="inline-form"><button type="submit" class="btn-danger"><i class="fas fa-trash"></i> Hapus</button></form>"#,
            id
        ),
        _ => String::new(),
    };

    let comment_form = if user.is_some() {
        format!(
            concat!(
                r#"<form class="comment-form" method="post" action="/posts/{}/comments">"#,
                r#"<textarea name="content" placeholder="Tulis komentar..." required></textarea>"#,
                r#"<button type="submit" class="btn-primary">Kirim Komentar</button></form>"#
            ),
            id
        )
    } else {
        "<p>Login untuk berkomentar</p>".to_string()
    };

    format!(
        concat!(
            r#"<div class="post-card" id="post-{id}">"#,
            r#"<div class="post-header"><div>"#,
            r#"<h3 class="post-title">{title}</h3>"#,
            r#"<div class="post-meta">Oleh {author} • {date}</div>"#,
            r#"</div></div>"#,
            r#"<div class="post-content">{content}</div>"#,
            r#"<div class="post-actions">"#,
            r#"<form method="post" action="/posts/{id}/toggle" class="inline-form">"#,
            r#"<button type="submit"><i class="fas fa-comments"></i> Komentar ({count})</button></form>"#,
            r#"{delete}</div>"#,
            r#"<div class="comments-section" id="comments-{id}" style="display: {display};">"#,
            r#"<div class="comments-list">{comments}</div>{comment_form}</div>"#,
            r#"</div>"#
        ),
        id = id,
        title = escape_html(&post.title),
        author = escape_html(&post.author_name),
        date = format_date_at(post.created_at, now),
        content = nl2br(&escape_html(&post.content)),
        count = post.comments.len(),
        delete = delete,
        display = if comments_open { "block" } else { "none" },
        comments = comments_list(&post.comments, now),
        comment_form = comment_form,
    )
}

/// 게시글 영역 전체
pub fn posts_section(
    view: &PostsView,
    user: Option<&CurrentUser>,
    open_comments: &HashSet<String>,
    now: DateTime<Utc>,
) -> String {
    match view {
        PostsView::Loading => loading_posts(),
        PostsView::LoadFailed => load_failed(),
        PostsView::List(posts) if posts.is_empty() => empty_posts(user.is_some()),
        PostsView::List(posts) => posts
            .iter()
            .map(|post| post_card(post, user, open_comments.contains(&post.id), now))
            .collect(),
    }
}

fn input(page: &Page, modal: ModalId, id: &str, name: &str, kind: &str, placeholder: &str) -> String {
    let focused = page
        .modal(modal)
        .and_then(|m| m.focused_field)
        .is_some_and(|f| f == id);
    format!(
        r#"<input type="{kind}" id="{id}" name="{name}" placeholder="{placeholder}" value="{value}" required{autofocus}>"#,
        kind = kind,
        id = id,
        name = name,
        placeholder = placeholder,
        value = escape_html(page.form_value(modal, name)),
        autofocus = if focused { " autofocus" } else { "" },
    )
}

fn modal(page: &Page, id: ModalId, title: &str, body: String) -> String {
    format!(
        concat!(
            r#"<div class="modal" id="{element}" style="display: {display};">"#,
            r#"<form method="post" action="/modals/{slug}/backdrop" class="modal-backdrop">"#,
            r#"<button type="submit" class="modal-backdrop-hit" aria-label="Tutup"></button></form>"#,
            r#"<div class="modal-content">"#,
            r#"<form method="post" action="/modals/{slug}/close" class="modal-close-form">"#,
            r#"<button type="submit" class="close">&times;</button></form>"#,
            r#"<h2>{title}</h2>{body}</div></div>"#
        ),
        element = id.element_id(),
        display = if page.is_modal_open(id) { "block" } else { "none" },
        slug = id.slug(),
        title = title,
        body = body,
    )
}

fn login_modal(page: &Page) -> String {
    let m = ModalId::Login;
    let body = format!(
        concat!(
            r#"<form method="post" action="/auth/login">{email}{password}"#,
            r#"<button type="submit" class="btn-primary btn-full">Masuk</button>"#,
            // 같은 폼의 이메일 입력값을 재설정 요청으로 보냅니다.
            r#"<button type="submit" formaction="/auth/reset-password" formnovalidate class="link-button reset-link">Lupa password?</button></form>"#,
            r#"<p class="modal-switch">Belum punya akun? "#,
            r#"<form method="post" action="/modals/switch/register" class="inline-form">"#,
            r#"<button type="submit" class="link-button">Daftar di sini</button></form></p>"#
        ),
        email = input(page, m, "loginEmail", "email", "email", "Email"),
        password = input(page, m, "loginPassword", "password", "password", "Password"),
    );
    modal(page, m, "Masuk", body)
}

fn register_modal(page: &Page) -> String {
    let m = ModalId::Register;
    let body = format!(
        concat!(
            r#"<form method="post" action="/auth/register">{name}{email}{password}{confirm}"#,
            r#"<button type="submit" class="btn-primary btn-full">Daftar</button></form>"#,
            r#"<p class="modal-switch">Sudah punya akun? "#,
            r#"<form method="post" action="/modals/switch/login" class="inline-form">"#,
            r#"<button type="submit" class="link-button">Masuk di sini</button></form></p>"#
        ),
        name = input(page, m, "registerName", "name", "text", "Nama Lengkap"),
        email = input(page, m, "registerEmail", "email", "email", "Email"),
        password = input(page, m, "registerPassword", "password", "password", "Password"),
        confirm = input(
            page,
            m,
            "registerConfirmPassword",
            "confirm_password",
            "password",
            "Konfirmasi Password"
        ),
    );
    modal(page, m, "Daftar", body)
}

fn create_post_modal(page: &Page) -> String {
    let m = ModalId::CreatePost;
    let focused = page
        .modal(m)
        .and_then(|s| s.focused_field)
        .is_some_and(|f| f == "postContent");
    let body = format!(
        concat!(
            r#"<form method="post" action="/posts">{title}"#,
            r#"<textarea id="postContent" name="content" placeholder="Tulis konten postingan..." required{autofocus}>{content}</textarea>"#,
            r#"<button type="submit" class="btn-primary btn-full">Publikasikan</button></form>"#
        ),
        title = input(page, m, "postTitle", "title", "text", "Judul Postingan"),
        autofocus = if focused { " autofocus" } else { "" },
        content = escape_html(page.form_value(m, "content")),
    );
    modal(page, m, "Buat Postingan Baru", body)
}

const SCROLL_SCRIPT: &str = r#"<script>
(function () {
  var nav = document.querySelector('.navbar');
  var busy = false;
  var trailing = null;
  function send() {
    fetch('/scroll', {
      method: 'POST',
      headers: { 'Content-Type': 'application/x-www-form-urlencoded' },
      body: 'y=' + Math.round(window.scrollY)
    })
      .then(function (r) { return r.json(); })
      .then(function (d) { nav.classList.toggle('scrolled', d.scrolled); })
      .catch(function () {});
  }
  window.addEventListener('scroll', function () {
    clearTimeout(trailing);
    trailing = setTimeout(send, 150);
    if (busy) return;
    busy = true;
    setTimeout(function () { busy = false; }, 100);
    send();
  });
})();
</script>"#;

/// 페이지 전체 HTML
pub fn document(page: &Page, toasts_html: &str) -> String {
    format!(
        concat!(
            "<!DOCTYPE html>\n",
            r#"<html lang="id"><head><meta charset="UTF-8">"#,
            r#"<meta name="viewport" content="width=device-width, initial-scale=1.0">"#,
            "<title>Biawak Foundation - Komunitas Blockchain Indonesia</title>",
            r#"<link rel="stylesheet" href="/static/styles.css">"#,
            r#"<link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.4.0/css/all.min.css">"#,
            "</head><body>",
            r#"<nav class="{navbar_class}"><div class="nav-container">"#,
            r#"<a class="nav-logo" href="/"><i class="fas fa-dragon"></i> Biawak Foundation</a>"#,
            r##"<ul class="nav-menu" id="nav-menu"><li><a class="nav-link" href="#home">Beranda</a></li>"##,
            r##"<li><a class="nav-link" href="#community">Komunitas</a></li>"##,
            r##"<li><a class="nav-link" href="#about">Tentang</a></li></ul>"##,
            r#"<div class="nav-auth">{nav_auth}</div></div></nav>"#,
            r#"<section class="hero" id="home"><div class="hero-content">"#,
            "<h1>Selamat Datang di Biawak Foundation</h1>",
            "<p>Komunitas blockchain dan cryptocurrency Indonesia. Belajar, berbagi, dan berkembang bersama.</p>",
            "</div></section>",
            r#"<section class="community" id="community"><div class="container">"#,
            r#"<div class="section-header"><h2>Diskusi Komunitas</h2>"#,
            r#"<form method="post" action="/modals/create-post/open" class="inline-form">"#,
            r#"<button type="submit" class="btn-primary" id="create-post-btn" style="display: {create_display};">"#,
            r#"<i class="fas fa-plus"></i> Buat Postingan</button></form></div>"#,
            r#"<div id="posts-container">{posts}</div></div></section>"#,
            r#"<section class="about" id="about"><div class="container"><h2>Tentang Kami</h2>"#,
            "<p>Biawak Foundation adalah komunitas terbuka untuk siapa saja yang ingin memahami teknologi blockchain.</p>",
            "</div></section>",
            "{login}{register}{create_post}",
            r#"<div class="notifications">{toasts}</div>"#,
            r#"<footer class="footer"><p>&copy; <span id="current-year">{year}</span> Biawak Foundation. Semua hak dilindungi.</p></footer>"#,
            "{script}</body></html>"
        ),
        navbar_class = if page.navbar_scrolled { "navbar scrolled" } else { "navbar" },
        nav_auth = page.nav_auth_html,
        create_display = if page.create_post_button_visible { "block" } else { "none" },
        posts = page.posts_html,
        login = login_modal(page),
        register = register_modal(page),
        create_post = create_post_modal(page),
        toasts = toasts_html,
        year = page.footer_year,
        script = SCROLL_SCRIPT,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user() -> CurrentUser {
        CurrentUser {
            id: "u1".into(),
            email: Some("ani@biawak.id".into()),
            name: "<Ani>".into(),
        }
    }

    fn post(now: DateTime<Utc>) -> Post {
        Post {
            id: "p1".into(),
            title: "Judul <b>".into(),
            content: "baris 1\nbaris 2 & <script>".into(),
            user_id: "u1".into(),
            author_name: "Ani".into(),
            created_at: now - Duration::days(3),
            comments: Vec::new(),
        }
    }

    #[test]
    fn greeting_is_escaped() {
        let html = auth_buttons(Some(&user()));
        assert!(html.contains("Halo, &lt;Ani&gt;!"));
        assert!(html.contains("Keluar"));

        let html = auth_buttons(None);
        assert!(html.contains("Masuk") && html.contains("Daftar"));
        assert!(!html.contains("/profile/name"));
    }

    #[test]
    fn signed_in_nav_offers_name_change() {
        let html = auth_buttons(Some(&user()));
        assert!(html.contains(r#"action="/profile/name""#));
        assert!(html.contains(r#"name="name" value="&lt;Ani&gt;""#));
    }

    #[test]
    fn password_reset_submits_the_login_email() {
        let mut page = Page::default();
        page.open_modal(ModalId::Login);
        let html = login_modal(&page);

        let login_form = html
            .split(r#"<form method="post" action="/auth/login">"#)
            .nth(1)
            .and_then(|rest| rest.split("</form>").next())
            .unwrap();
        assert!(login_form.contains(r#"name="email""#));
        assert!(login_form.contains(r#"formaction="/auth/reset-password" formnovalidate"#));
        assert!(!html.contains(r#"type="hidden""#));
    }

    #[test]
    fn post_card_escapes_and_breaks_lines() {
        let now = Utc::now();
        let html = posts_section(
            &PostsView::List(vec![post(now)]),
            Some(&user()),
            &HashSet::new(),
            now,
        );
        assert!(html.contains("Judul &lt;b&gt;"));
        assert!(html.contains("baris 1<br>baris 2 &amp; &lt;script&gt;"));
        assert!(html.contains("3 hari yang lalu"));
        assert!(html.contains("Belum ada komentar"));
        assert!(html.contains("/posts/p1/delete"));
        assert!(html.contains(r#"style="display: none;""#));
    }

    #[test]
    fn anonymous_visitors_cannot_comment_or_delete() {
        let now = Utc::now();
        let mut open = HashSet::new();
        open.insert("p1".to_string());
        let html = posts_section(&PostsView::List(vec![post(now)]), None, &open, now);
        assert!(html.contains("Login untuk berkomentar"));
        assert!(!html.contains("/delete"));
        assert!(html.contains(r#"style="display: block;""#));
    }

    #[test]
    fn empty_message_depends_on_login() {
        let now = Utc::now();
        let empty = PostsView::List(Vec::new());
        assert!(posts_section(&empty, None, &HashSet::new(), now)
            .contains("Silakan login untuk membuat postingan!"));
        assert!(posts_section(&empty, Some(&user()), &HashSet::new(), now)
            .contains("Belum ada postingan. Buat postingan pertama!"));
    }

    #[test]
    fn document_marks_focused_input() {
        let mut page = Page::default();
        page.footer_year = 2026;
        page.open_modal(ModalId::Login);
        let html = document(&page, "");
        assert!(html.contains(r#"id="loginEmail" name="email" placeholder="Email" value="" required autofocus"#));
        assert!(html.contains(r#"<span id="current-year">2026</span>"#));
        assert!(html.contains(r#"id="loginModal" style="display: block;""#));
        assert!(html.contains(r#"id="registerModal" style="display: none;""#));
    }
}
