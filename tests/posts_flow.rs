mod common;

use std::sync::Arc;

use biawak::backend::Backend;
use biawak::error::AppError;
use biawak::models::ANONYMOUS_AUTHOR;
use biawak::services::{AuthClient, PostsClient};

use common::{as_backend, register_form, TestBackend};

struct Fixture {
    backend: Arc<TestBackend>,
    auth: Arc<AuthClient>,
    posts: PostsClient,
}

fn fixture(fallback_content: bool) -> Fixture {
    let backend = TestBackend::new();
    let auth = Arc::new(AuthClient::new(as_backend(&backend)));
    let posts = PostsClient::new(as_backend(&backend), auth.clone(), fallback_content);
    Fixture {
        backend,
        auth,
        posts,
    }
}

async fn signed_in(fallback_content: bool, name: &str, email: &str) -> Fixture {
    let f = fixture(fallback_content);
    f.auth
        .sign_up(&register_form(name, email, "rahasia"))
        .await
        .unwrap();
    f
}

#[tokio::test]
async fn unauthenticated_create_never_reaches_insert() {
    let f = fixture(true);

    let err = f.posts.create_new_post("Judul", "Isi").await.unwrap_err();
    assert!(matches!(err, AppError::AuthRequired));
    assert_eq!(err.user_message(), "Anda harus login terlebih dahulu");
    assert_eq!(f.backend.calls("insert"), 0);

    let err = f.posts.add_comment_to_post("p1", "Halo").await.unwrap_err();
    assert!(matches!(err, AppError::AuthRequired));
    assert_eq!(f.backend.calls("insert"), 0);
    assert_eq!(f.backend.calls("get_user"), 0);
}

#[tokio::test]
async fn writes_confirm_the_user_with_the_backend() {
    let f = signed_in(false, "Ani", "ani@biawak.id").await;

    let post = f.posts.create_new_post("Judul", "Isi").await.unwrap();
    assert_eq!(f.backend.calls("get_user"), 1);

    f.posts.add_comment_to_post(&post.id, "Komentar").await.unwrap();
    assert_eq!(f.backend.calls("get_user"), 2);

    // 검증 실패도 사용자 확인 뒤에 일어납니다.
    f.posts.create_new_post("", "Isi").await.unwrap_err();
    assert_eq!(f.backend.calls("get_user"), 3);
    assert_eq!(f.backend.calls("insert"), 2);
}

#[tokio::test]
async fn invalid_post_is_rejected_before_insert() {
    let f = signed_in(true, "Ani", "ani@biawak.id").await;

    let err = f
        .posts
        .create_new_post(&"j".repeat(101), "Isi")
        .await
        .unwrap_err();
    assert_eq!(
        err.user_message(),
        "Judul terlalu panjang (maksimal 100 karakter)"
    );
    assert_eq!(f.backend.calls("insert"), 0);
}

#[tokio::test]
async fn created_post_is_listed_with_author_name() {
    let f = signed_in(false, "Ani", "ani@biawak.id").await;

    let created = f
        .posts
        .create_new_post("  Halo Biawak  ", "Baris satu\nBaris dua")
        .await
        .unwrap();
    assert_eq!(created.title, "Halo Biawak");
    assert_eq!(created.author_name, "Ani");

    let posts = f.posts.fetch_posts_with_comments().await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, created.id);
    assert_eq!(posts[0].author_name, "Ani");
    assert_eq!(posts[0].content, "Baris satu\nBaris dua");
}

#[tokio::test]
async fn fetch_is_a_single_joined_query() {
    let f = signed_in(false, "Ani", "ani@biawak.id").await;
    for i in 0..3 {
        let post = f
            .posts
            .create_new_post(&format!("Post {}", i), "Isi")
            .await
            .unwrap();
        f.posts.add_comment_to_post(&post.id, "Komentar").await.unwrap();
    }

    let before = f.backend.calls("select");
    let posts = f.posts.fetch_posts_with_comments().await.unwrap();
    assert_eq!(f.backend.calls("select") - before, 1);

    let titles: Vec<&str> = posts.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Post 2", "Post 1", "Post 0"]);
    assert!(posts.iter().all(|p| p.comments.len() == 1));
}

#[tokio::test]
async fn new_comment_appears_after_earlier_comments() {
    let author = signed_in(false, "Ani", "ani@biawak.id").await;
    let post = author
        .posts
        .create_new_post("Diskusi", "Ayo berdiskusi")
        .await
        .unwrap();
    author
        .posts
        .add_comment_to_post(&post.id, "Komentar pertama")
        .await
        .unwrap();

    // 다른 사용자가 같은 백엔드에서 댓글을 답니다.
    let other_auth = Arc::new(AuthClient::new(as_backend(&author.backend)));
    other_auth
        .sign_up(&register_form("Budi", "budi@biawak.id", "rahasia"))
        .await
        .unwrap();
    let other = PostsClient::new(as_backend(&author.backend), other_auth, false);
    let added = other
        .add_comment_to_post(&post.id, "  Komentar kedua ")
        .await
        .unwrap();
    assert_eq!(added.content, "Komentar kedua");
    assert_eq!(added.post_id, post.id);

    let posts = author.posts.fetch_posts_with_comments().await.unwrap();
    let comments: Vec<(&str, &str)> = posts[0]
        .comments
        .iter()
        .map(|c| (c.content.as_str(), c.author_name.as_str()))
        .collect();
    assert_eq!(
        comments,
        vec![("Komentar pertama", "Ani"), ("Komentar kedua", "Budi")]
    );
}

#[tokio::test]
async fn comment_on_missing_post_is_not_found() {
    let f = signed_in(false, "Ani", "ani@biawak.id").await;
    let err = f
        .posts
        .add_comment_to_post("tidak-ada", "Halo")
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Postingan tidak ditemukan");
    assert_eq!(f.backend.calls("insert"), 0);

    let err = f.posts.add_comment_to_post("tidak-ada", "  ").await.unwrap_err();
    assert_eq!(err.user_message(), "Komentar tidak boleh kosong");
}

#[tokio::test]
async fn failed_fetch_falls_back_to_demo_posts() {
    let f = fixture(true);
    f.backend.set_fail_selects(true);
    let posts = f.posts.fetch_posts_with_comments().await.unwrap();
    let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["demo-1", "demo-2", "demo-3"]);

    let f = fixture(false);
    f.backend.set_fail_selects(true);
    let err = f.posts.fetch_posts_with_comments().await.unwrap_err();
    assert!(err.is_availability());
}

#[tokio::test]
async fn only_the_author_can_delete() {
    let author = signed_in(false, "Ani", "ani@biawak.id").await;
    let post = author
        .posts
        .create_new_post("Milik Ani", "Isi")
        .await
        .unwrap();
    author
        .posts
        .add_comment_to_post(&post.id, "Komentar")
        .await
        .unwrap();

    let other_auth = Arc::new(AuthClient::new(as_backend(&author.backend)));
    other_auth
        .sign_up(&register_form("Budi", "budi@biawak.id", "rahasia"))
        .await
        .unwrap();
    let other = PostsClient::new(as_backend(&author.backend), other_auth, false);
    let err = other.delete_post(&post.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    author.posts.delete_post(&post.id).await.unwrap();
    assert!(author
        .posts
        .fetch_posts_with_comments()
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn author_without_profile_name_is_anonymous() {
    let f = fixture(false);
    f.backend
        .inner
        .sign_up(
            "user@example.com",
            "secret1",
            biawak::models::UserMetadata::default(),
        )
        .await
        .unwrap();
    f.auth.sign_in("user@example.com", "secret1").await.unwrap();
    f.posts.create_new_post("Tanpa nama", "Isi").await.unwrap();

    let posts = f.posts.fetch_posts_with_comments().await.unwrap();
    assert_eq!(posts[0].author_name, ANONYMOUS_AUTHOR);
}

#[tokio::test]
async fn connection_probe() {
    let f = fixture(true);
    assert!(f.posts.check_connection().await.is_ok());
    f.backend.set_fail_selects(true);
    assert!(f.posts.check_connection().await.is_err());
}
