//! # 게시글 / 댓글 클라이언트
//!
//! 목록 조회는 한 번의 조인 쿼리로 처리합니다.
//! 게시글 → 작성자 프로필, 게시글 → 댓글(오래된 순) → 댓글 작성자 프로필
//!
//! 쓰기 작업(작성, 댓글, 삭제)은 백엔드 호출 전에 세션부터 확인합니다.
//! 작성과 댓글은 백엔드에서 사용자를 한 번 더 확인합니다.
//! 실제 권한 검사는 백엔드의 행 수준 보안이 담당합니다.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::backend::{
    Backend, Embed, Filter, Order, Query, COMMENTS_TABLE, POSTS_TABLE, PROFILES_TABLE,
};
use crate::error::AppError;
use crate::models::{
    Comment, CommentRow, CurrentUser, Post, PostRow, MAX_COMMENT_CHARS, MAX_CONTENT_CHARS,
    MAX_TITLE_CHARS,
};

use super::auth::AuthClient;
use super::demo::demo_posts;

pub const POST_NOT_FOUND: &str = "Postingan tidak ditemukan";

pub struct PostsClient {
    backend: Arc<dyn Backend>,
    auth: Arc<AuthClient>,
    /// 조회 실패 시 데모 게시글로 대체할지 여부
    fallback_content: bool,
}

/// 게시글 입력 검증. 길이는 입력 그대로 (trim 전) 셉니다.
pub fn validate_post(title: &str, content: &str) -> Result<(), AppError> {
    if title.trim().is_empty() || content.trim().is_empty() {
        return Err(AppError::Validation(
            "Judul dan konten tidak boleh kosong".to_string(),
        ));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::Validation(format!(
            "Judul terlalu panjang (maksimal {} karakter)",
            MAX_TITLE_CHARS
        )));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(AppError::Validation(format!(
            "Konten terlalu panjang (maksimal {} karakter)",
            MAX_CONTENT_CHARS
        )));
    }
    Ok(())
}

pub fn validate_comment(content: &str) -> Result<(), AppError> {
    if content.trim().is_empty() {
        return Err(AppError::Validation(
            "Komentar tidak boleh kosong".to_string(),
        ));
    }
    if content.chars().count() > MAX_COMMENT_CHARS {
        return Err(AppError::Validation(format!(
            "Komentar terlalu panjang (maksimal {} karakter)",
            MAX_COMMENT_CHARS
        )));
    }
    Ok(())
}

/// 목록 화면용 조인 쿼리
pub fn posts_with_comments_query() -> Query {
    let author = || Embed::one("author", PROFILES_TABLE, "user_id").columns(&["full_name"]);

    Query::from(POSTS_TABLE)
        .columns(&["id", "title", "content", "created_at", "user_id"])
        .embed(author())
        .embed(
            Embed::many("comments", COMMENTS_TABLE, "post_id")
                .columns(&["id", "post_id", "content", "created_at", "user_id"])
                .order(Order::asc("created_at"))
                .embed(author()),
        )
        .order(Order::desc("created_at"))
}

fn first_row(rows: Vec<Value>) -> Result<Value, AppError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| AppError::Internal("backend returned no rows".to_string()))
}

impl PostsClient {
    pub fn new(backend: Arc<dyn Backend>, auth: Arc<AuthClient>, fallback_content: bool) -> Self {
        Self {
            backend,
            auth,
            fallback_content,
        }
    }

    async fn access_token(&self) -> Option<String> {
        self.auth.get_session().await.map(|s| s.access_token)
    }

    async fn load_posts(&self) -> Result<Vec<Post>, AppError> {
        let token = self.access_token().await;
        let rows = self
            .backend
            .select(&posts_with_comments_query(), token.as_deref())
            .await?;

        let posts = rows
            .into_iter()
            .map(|row| serde_json::from_value::<PostRow>(row).map(Post::from))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    /// 최신 게시글이 먼저, 각 게시글의 댓글은 오래된 순
    pub async fn fetch_posts_with_comments(&self) -> Result<Vec<Post>, AppError> {
        tracing::debug!("Fetching posts with comments");
        match self.load_posts().await {
            Ok(posts) => {
                tracing::debug!("Fetched {} posts", posts.len());
                Ok(posts)
            }
            Err(e) if self.fallback_content => {
                tracing::warn!("Error fetching posts, using demo posts: {}", e);
                Ok(demo_posts())
            }
            Err(e) => {
                tracing::error!("Error fetching posts: {}", e);
                Err(e)
            }
        }
    }

    pub async fn create_new_post(&self, title: &str, content: &str) -> Result<Post, AppError> {
        let session = self.auth.verified_session().await?;
        validate_post(title, content)?;

        let row = json!({
            "title": title.trim(),
            "content": content.trim(),
            "user_id": session.user.id,
        });
        let inserted = self
            .backend
            .insert(POSTS_TABLE, vec![row], &session.access_token)
            .await
            .map_err(|e| {
                tracing::error!("Error creating post: {}", e);
                e.context("Gagal membuat postingan: ")
            })?;

        let mut post = Post::from(serde_json::from_value::<PostRow>(first_row(inserted)?)?);
        post.author_name = CurrentUser::from(&session).name;
        tracing::info!("Post created: {}", post.id);
        Ok(post)
    }

    pub async fn add_comment_to_post(
        &self,
        post_id: &str,
        content: &str,
    ) -> Result<Comment, AppError> {
        let session = self.auth.verified_session().await?;
        validate_comment(content)?;

        let exists = Query::from(POSTS_TABLE)
            .columns(&["id"])
            .eq("id", post_id)
            .limit(1);
        match self
            .backend
            .select(&exists, Some(&session.access_token))
            .await
        {
            Ok(rows) if !rows.is_empty() => {}
            Ok(_) => return Err(AppError::NotFound(POST_NOT_FOUND.to_string())),
            Err(e) => {
                tracing::warn!("Error checking post {}: {}", post_id, e);
                return Err(AppError::NotFound(POST_NOT_FOUND.to_string()));
            }
        }

        let row = json!({
            "post_id": post_id,
            "content": content.trim(),
            "user_id": session.user.id,
        });
        let inserted = self
            .backend
            .insert(COMMENTS_TABLE, vec![row], &session.access_token)
            .await
            .map_err(|e| {
                tracing::error!("Error adding comment: {}", e);
                e.context("Gagal menambahkan komentar: ")
            })?;

        let mut comment =
            serde_json::from_value::<CommentRow>(first_row(inserted)?)?.into_comment(post_id);
        comment.author_name = CurrentUser::from(&session).name;
        tracing::info!("Comment {} added to post {}", comment.id, post_id);
        Ok(comment)
    }

    /// 본인 게시글만 삭제됩니다. 삭제된 행이 없으면 `NotFound`.
    pub async fn delete_post(&self, post_id: &str) -> Result<(), AppError> {
        let session = self.auth.require_session().await?;

        let filters = [
            Filter::eq("id", post_id),
            Filter::eq("user_id", session.user.id.as_str()),
        ];
        let deleted = self
            .backend
            .delete(POSTS_TABLE, &filters, &session.access_token)
            .await
            .map_err(|e| e.context("Gagal menghapus postingan: "))?;

        if deleted.is_empty() {
            return Err(AppError::NotFound(
                "Postingan tidak ditemukan atau bukan milik Anda".to_string(),
            ));
        }
        tracing::info!("Post deleted: {}", post_id);
        Ok(())
    }

    /// 게시글 테이블에 접근 가능한지 확인합니다. (id 하나만 조회)
    pub async fn check_connection(&self) -> Result<(), AppError> {
        let probe = Query::from(POSTS_TABLE).columns(&["id"]).limit(1);
        self.backend.select(&probe, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_validation_messages() {
        assert_eq!(
            validate_post("  ", "isi").unwrap_err().user_message(),
            "Judul dan konten tidak boleh kosong"
        );
        assert_eq!(
            validate_post(&"a".repeat(101), "isi").unwrap_err().user_message(),
            "Judul terlalu panjang (maksimal 100 karakter)"
        );
        assert_eq!(
            validate_post("judul", &"a".repeat(2001)).unwrap_err().user_message(),
            "Konten terlalu panjang (maksimal 2000 karakter)"
        );
        assert!(validate_post(&"a".repeat(100), &"b".repeat(2000)).is_ok());
    }

    #[test]
    fn comment_validation_messages() {
        assert_eq!(
            validate_comment("\n ").unwrap_err().user_message(),
            "Komentar tidak boleh kosong"
        );
        assert_eq!(
            validate_comment(&"k".repeat(1001)).unwrap_err().user_message(),
            "Komentar terlalu panjang (maksimal 1000 karakter)"
        );
    }

    #[test]
    fn joined_query_shape() {
        let params = posts_with_comments_query().to_postgrest_params();
        let select = params
            .iter()
            .find(|(k, _)| k == "select")
            .map(|(_, v)| v.as_str())
            .unwrap_or_default();
        assert!(select.contains("author:profiles!user_id(full_name)"));
        assert!(select.contains("comments:comments("));
        assert!(params.contains(&("order".to_string(), "created_at.desc".to_string())));
        assert!(params.contains(&("comments.order".to_string(), "created_at.asc".to_string())));
    }
}
