use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// 작성자 프로필이 없을 때 표시하는 이름
pub const ANONYMOUS_AUTHOR: &str = "Pengguna Anonim";

pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_CONTENT_CHARS: usize = 2000;
pub const MAX_COMMENT_CHARS: usize = 1000;

/// 화면에 표시되는 게시글 (작성자 이름이 채워진 상태)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub user_id: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    /// 오래된 댓글이 먼저
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub content: String,
    pub user_id: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
}

/// `profiles` 테이블의 임베드 결과
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileRow {
    #[serde(default)]
    pub full_name: Option<String>,
}

/// `posts` 테이블 행 + 임베드된 작성자/댓글
#[derive(Debug, Clone, Deserialize)]
pub struct PostRow {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub author: Option<ProfileRow>,
    #[serde(default)]
    pub comments: Vec<CommentRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentRow {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub post_id: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub author: Option<ProfileRow>,
}

fn author_name(author: Option<&ProfileRow>) -> String {
    author
        .and_then(|p| p.full_name.as_deref())
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(ANONYMOUS_AUTHOR)
        .to_string()
}

impl CommentRow {
    pub fn into_comment(self, parent_post_id: &str) -> Comment {
        Comment {
            author_name: author_name(self.author.as_ref()),
            post_id: self.post_id.unwrap_or_else(|| parent_post_id.to_string()),
            id: self.id,
            content: self.content,
            user_id: self.user_id.unwrap_or_default(),
            created_at: self.created_at,
        }
    }
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        let author_name = author_name(row.author.as_ref());
        let mut comments: Vec<Comment> = row
            .comments
            .into_iter()
            .map(|c| c.into_comment(&row.id))
            .collect();
        // 백엔드가 임베드 정렬을 무시해도 오래된 댓글이 먼저 오도록 합니다.
        // (안정 정렬이라 같은 시각이면 받은 순서 유지)
        comments.sort_by_key(|c| c.created_at);

        Post {
            id: row.id,
            title: row.title,
            content: row.content,
            user_id: row.user_id.unwrap_or_default(),
            author_name,
            created_at: row.created_at,
            comments,
        }
    }
}

/// 게시글 id는 uuid 문자열일 수도, bigint일 수도 있습니다.
fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) => Ok(Some(s)),
        serde_json::Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn joined_row_denormalizes_author_names() {
        let row: PostRow = serde_json::from_value(json!({
            "id": 7,
            "title": "Halo",
            "content": "Isi",
            "created_at": "2026-10-01T10:00:00Z",
            "user_id": "u1",
            "author": { "full_name": "Budi" },
            "comments": [
                {
                    "id": "c2", "content": "kedua", "user_id": "u3",
                    "created_at": "2026-10-01T12:00:00Z", "author": null
                },
                {
                    "id": "c1", "content": "pertama", "user_id": "u2",
                    "created_at": "2026-10-01T11:00:00Z",
                    "author": { "full_name": "Sari" }
                }
            ]
        }))
        .unwrap();

        let post = Post::from(row);
        assert_eq!(post.id, "7");
        assert_eq!(post.author_name, "Budi");
        assert_eq!(post.comments[0].id, "c1");
        assert_eq!(post.comments[0].author_name, "Sari");
        assert_eq!(post.comments[1].author_name, ANONYMOUS_AUTHOR);
        assert_eq!(post.comments[1].post_id, "7");
    }
}
