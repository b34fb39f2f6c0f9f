//! # 인메모리 백엔드
//!
//! `BACKEND_URL`이 없을 때 사용하는 프로세스 내부 BaaS입니다.
//! 원격 서비스와 같은 계약을 지킵니다:
//! - 비밀번호는 Argon2id로 해싱하여 보관
//! - 액세스 토큰은 HS256 JWT, refresh 토큰은 SHA-256 해시만 보관
//! - 행 변경은 토큰의 사용자와 소유자 컬럼이 같을 때만 허용 (행 수준 보안 흉내)
//! - 에러 메시지는 원격 서비스와 같은 영어 원문 (정규화는 상위 계층 몫)
//!
//! 데이터는 프로세스가 끝나면 사라집니다.

use std::cmp::Ordering;
use std::collections::HashMap;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use async_trait::async_trait;
use chrono::{Duration, SecondsFormat, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use tokio::sync::{broadcast, RwLock};

use super::{
    Backend, ChangeKind, Embed, EmbedKind, Filter, Order, Query, RowChange, COMMENTS_TABLE,
    POSTS_TABLE, PROFILES_TABLE,
};
use crate::error::AppError;
use crate::models::{Session, SignUpResponse, User, UserMetadata};

const ACCESS_TOKEN_SECS: i64 = 3600;
const REFRESH_TOKEN_DAYS: i64 = 7;
const CHANGE_CAPACITY: usize = 64;

#[derive(Debug, Serialize, Deserialize, Clone)]
struct Claims {
    sub: String,
    exp: i64,
    iat: i64,
    /// 같은 초에 발급된 토큰도 서로 다르게 만듭니다.
    jti: String,
}

#[derive(Debug, Clone)]
struct StoredUser {
    id: String,
    email: String,
    password_hash: String,
    metadata: UserMetadata,
    confirmed: bool,
}

impl StoredUser {
    fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            user_metadata: self.metadata.clone(),
        }
    }
}

#[derive(Default)]
struct Store {
    users: Vec<StoredUser>,
    /// refresh 토큰 해시 → (사용자 id, 만료 시각)
    refresh_tokens: HashMap<String, (String, chrono::DateTime<Utc>)>,
    tables: HashMap<String, Vec<Value>>,
}

pub struct MemoryBackend {
    jwt_secret: String,
    require_email_confirmation: bool,
    store: RwLock<Store>,
    changes: std::sync::Mutex<HashMap<String, broadcast::Sender<RowChange>>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let mut secret = [0u8; 32];
        OsRng.fill_bytes(&mut secret);

        Self {
            jwt_secret: secret.iter().map(|b| format!("{:02x}", b)).collect(),
            require_email_confirmation: false,
            store: RwLock::new(Store::default()),
            changes: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// 회원가입 후 이메일 확인 전까지 로그인을 막습니다.
    pub fn with_email_confirmation(mut self) -> Self {
        self.require_email_confirmation = true;
        self
    }

    /// 이메일 확인 링크를 누른 것과 같은 효과
    pub async fn confirm_email(&self, email: &str) -> bool {
        let mut store = self.store.write().await;
        match store.users.iter_mut().find(|u| u.email.eq_ignore_ascii_case(email)) {
            Some(user) => {
                user.confirmed = true;
                true
            }
            None => false,
        }
    }

    // 개발용 백엔드: 가벼운 Argon2id 파라미터
    fn hasher() -> Result<Argon2<'static>, AppError> {
        let params = Params::new(4096, 1, 1, None)
            .map_err(|e| AppError::Internal(format!("Argon2 params: {}", e)))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    fn create_token(&self, user_id: &str, lifetime: Duration) -> Result<(String, i64), AppError> {
        let now = Utc::now();
        let exp = (now + lifetime).timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp,
            jti: uuid::Uuid::now_v7().to_string(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;
        Ok((token, exp))
    }

    fn verify_token(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::backend(401, "JWT expired")
            }
            _ => AppError::backend(401, "invalid JWT: unable to parse or verify signature"),
        })
    }

    /// 액세스 토큰 + refresh 토큰을 발급하고 refresh 토큰 해시를 저장합니다.
    fn issue_session(&self, store: &mut Store, user: &StoredUser) -> Result<Session, AppError> {
        let (access_token, expires_at) =
            self.create_token(&user.id, Duration::seconds(ACCESS_TOKEN_SECS))?;
        let (refresh_token, _) = self.create_token(&user.id, Duration::days(REFRESH_TOKEN_DAYS))?;

        let now = Utc::now();
        // 만료된 refresh 토큰 해시는 발급할 때마다 정리합니다.
        store.refresh_tokens.retain(|_, (_, expires_at)| *expires_at > now);
        store.refresh_tokens.insert(
            hash_token(&refresh_token),
            (user.id.clone(), now + Duration::days(REFRESH_TOKEN_DAYS)),
        );

        Ok(Session {
            access_token,
            refresh_token: Some(refresh_token),
            token_type: "bearer".to_string(),
            expires_in: Some(ACCESS_TOKEN_SECS),
            expires_at: Some(expires_at),
            user: user.to_user(),
        })
    }

    fn emit(&self, table: &str, kind: ChangeKind, record: Value) {
        let Ok(changes) = self.changes.lock() else {
            return;
        };
        if let Some(tx) = changes.get(table) {
            let _ = tx.send(RowChange {
                table: table.to_string(),
                kind,
                record,
            });
        }
    }
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// 행 수준 보안: 누가 이 행의 주인인지 나타내는 컬럼
fn owner_column(table: &str) -> &'static str {
    if table == PROFILES_TABLE {
        "id"
    } else {
        "user_id"
    }
}

fn rls_violation(table: &str) -> AppError {
    AppError::backend(
        403,
        format!("new row violates row-level security policy for table \"{}\"", table),
    )
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn matches_filters(row: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|f| match row.get(&f.column) {
        Some(value) => values_equal(value, &f.value),
        None => false,
    })
}

/// 필터 값은 PostgREST처럼 텍스트로 비교합니다. (`5`와 `"5"`는 같음)
fn values_equal(a: &Value, b: &Value) -> bool {
    super::query::value_as_text(a) == super::query::value_as_text(b)
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

fn sort_rows(rows: &mut [&Value], order: &[Order]) {
    // 안정 정렬: 같은 값이면 삽입 순서가 유지됩니다.
    rows.sort_by(|a, b| {
        order
            .iter()
            .map(|o| {
                let ord = compare_values(a.get(&o.column), b.get(&o.column));
                if o.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            })
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}

fn project(row: &Value, columns: &[String]) -> Map<String, Value> {
    let Some(object) = row.as_object() else {
        return Map::new();
    };
    if columns.is_empty() || columns.iter().any(|c| c == "*") {
        return object.clone();
    }
    columns
        .iter()
        .filter_map(|c| object.get(c).map(|v| (c.clone(), v.clone())))
        .collect()
}

fn shape_row(
    tables: &HashMap<String, Vec<Value>>,
    row: &Value,
    columns: &[String],
    embeds: &[Embed],
) -> Value {
    let mut shaped = project(row, columns);

    for embed in embeds {
        let related = tables.get(&embed.table).map(Vec::as_slice).unwrap_or(&[]);
        let value = match &embed.kind {
            EmbedKind::One { local_key } => row
                .get(local_key)
                .and_then(|key| {
                    related
                        .iter()
                        .find(|r| r.get("id").is_some_and(|id| values_equal(id, key)))
                })
                .map(|r| shape_row(tables, r, &embed.columns, &embed.embeds))
                .unwrap_or(Value::Null),
            EmbedKind::Many { foreign_key } => {
                let parent_id = row.get("id").cloned().unwrap_or(Value::Null);
                let mut children: Vec<&Value> = related
                    .iter()
                    .filter(|r| {
                        r.get(foreign_key)
                            .is_some_and(|fk| values_equal(fk, &parent_id))
                    })
                    .collect();
                sort_rows(&mut children, &embed.order);
                Value::Array(
                    children
                        .into_iter()
                        .map(|r| shape_row(tables, r, &embed.columns, &embed.embeds))
                        .collect(),
                )
            }
        };
        shaped.insert(embed.alias.clone(), value);
    }

    Value::Object(shaped)
}

fn evaluate(tables: &HashMap<String, Vec<Value>>, query: &Query) -> Vec<Value> {
    let rows = tables.get(&query.table).map(Vec::as_slice).unwrap_or(&[]);
    let mut matched: Vec<&Value> = rows
        .iter()
        .filter(|r| matches_filters(r, &query.filters))
        .collect();
    sort_rows(&mut matched, &query.order);
    if let Some(limit) = query.limit {
        matched.truncate(limit);
    }
    matched
        .into_iter()
        .map(|r| shape_row(tables, r, &query.columns, &query.embeds))
        .collect()
}

fn merge(target: &mut Value, patch: &Value) {
    if let (Some(target), Some(patch)) = (target.as_object_mut(), patch.as_object()) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
}

impl MemoryBackend {
    /// 새 행을 검증하고 id/created_at을 채웁니다.
    fn prepare_row(
        store: &Store,
        table: &str,
        row: Value,
        user_id: &str,
    ) -> Result<Value, AppError> {
        let mut row = match row {
            Value::Object(map) => Value::Object(map),
            _ => return Err(AppError::backend(400, "row must be a JSON object")),
        };

        let owner = owner_column(table);
        match row.get(owner).and_then(Value::as_str) {
            Some(owner_id) if owner_id == user_id => {}
            _ => return Err(rls_violation(table)),
        }

        if table == COMMENTS_TABLE {
            let post_id = row.get("post_id").cloned().unwrap_or(Value::Null);
            let post_exists = store
                .tables
                .get(POSTS_TABLE)
                .is_some_and(|posts| posts.iter().any(|p| p.get("id").is_some_and(|id| values_equal(id, &post_id))));
            if !post_exists {
                return Err(AppError::backend(
                    409,
                    "insert or update on table \"comments\" violates foreign key constraint \"comments_post_id_fkey\"",
                ));
            }
        }

        if let Some(map) = row.as_object_mut() {
            map.entry("id")
                .or_insert_with(|| Value::String(uuid::Uuid::now_v7().to_string()));
            map.entry("created_at")
                .or_insert_with(|| Value::String(now_timestamp()));
        }
        Ok(row)
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AppError> {
        let mut store = self.store.write().await;
        let user = store
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
            .ok_or_else(|| AppError::backend(400, "Invalid login credentials"))?;

        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password hash parse error: {}", e)))?;
        Self::hasher()?
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| AppError::backend(400, "Invalid login credentials"))?;

        if !user.confirmed {
            return Err(AppError::backend(400, "Email not confirmed"));
        }

        tracing::debug!("Memory backend: {} signed in", user.id);
        self.issue_session(&mut store, &user)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: UserMetadata,
    ) -> Result<SignUpResponse, AppError> {
        if password.is_empty() {
            return Err(AppError::backend(422, "Signup requires a valid password"));
        }
        if password.chars().count() < 6 {
            return Err(AppError::backend(
                422,
                "Password should be at least 6 characters.",
            ));
        }
        if !crate::services::helpers::is_valid_email(email) {
            return Err(AppError::backend(
                400,
                "Unable to validate email address: invalid format",
            ));
        }

        let mut store = self.store.write().await;
        if store.users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
            return Err(AppError::backend(422, "User already registered"));
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Self::hasher()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?
            .to_string();

        let user = StoredUser {
            id: uuid::Uuid::now_v7().to_string(),
            email: email.to_string(),
            password_hash,
            metadata: metadata.clone(),
            confirmed: !self.require_email_confirmation,
        };
        store.users.push(user.clone());

        // 원격 서비스에서는 DB 트리거가 하는 일: 프로필 행 생성
        let profile = json!({
            "id": user.id,
            "full_name": metadata.full_name,
            "created_at": now_timestamp(),
        });
        store
            .tables
            .entry(PROFILES_TABLE.to_string())
            .or_default()
            .push(profile.clone());

        let session = if user.confirmed {
            Some(self.issue_session(&mut store, &user)?)
        } else {
            None
        };
        drop(store);

        self.emit(PROFILES_TABLE, ChangeKind::Insert, profile);
        Ok(SignUpResponse {
            user: Some(user.to_user()),
            session,
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        let claims = self.verify_token(access_token)?;
        let mut store = self.store.write().await;
        store
            .refresh_tokens
            .retain(|_, (user_id, _)| user_id != &claims.sub);
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<User, AppError> {
        let claims = self.verify_token(access_token)?;
        let store = self.store.read().await;
        store
            .users
            .iter()
            .find(|u| u.id == claims.sub)
            .map(StoredUser::to_user)
            .ok_or_else(|| AppError::backend(404, "User not found"))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AppError> {
        self.verify_token(refresh_token)
            .map_err(|_| AppError::backend(400, "Invalid Refresh Token: Refresh Token Not Found"))?;

        let mut store = self.store.write().await;
        let token_hash = hash_token(refresh_token);
        let (user_id, expires_at) = store
            .refresh_tokens
            .remove(&token_hash)
            .ok_or_else(|| AppError::backend(400, "Invalid Refresh Token: Refresh Token Not Found"))?;

        if expires_at < Utc::now() {
            return Err(AppError::backend(400, "Invalid Refresh Token: Refresh Token Expired"));
        }

        let user = store
            .users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_else(|| AppError::backend(404, "User not found"))?;
        self.issue_session(&mut store, &user)
    }

    async fn update_user(
        &self,
        access_token: &str,
        metadata: UserMetadata,
    ) -> Result<User, AppError> {
        let claims = self.verify_token(access_token)?;
        let mut store = self.store.write().await;
        let user = store
            .users
            .iter_mut()
            .find(|u| u.id == claims.sub)
            .ok_or_else(|| AppError::backend(404, "User not found"))?;
        if metadata.full_name.is_some() {
            user.metadata.full_name = metadata.full_name;
        }
        Ok(user.to_user())
    }

    async fn reset_password_for_email(&self, email: &str) -> Result<(), AppError> {
        // 메일 발송은 없습니다. 원격 서비스처럼 가입 여부와 무관하게 성공합니다.
        tracing::info!("Memory backend: password reset requested for {}", email);
        Ok(())
    }

    async fn select(
        &self,
        query: &Query,
        _access_token: Option<&str>,
    ) -> Result<Vec<Value>, AppError> {
        let store = self.store.read().await;
        Ok(evaluate(&store.tables, query))
    }

    async fn insert(
        &self,
        table: &str,
        rows: Vec<Value>,
        access_token: &str,
    ) -> Result<Vec<Value>, AppError> {
        let claims = self.verify_token(access_token)?;
        let mut store = self.store.write().await;

        let mut prepared = Vec::with_capacity(rows.len());
        for row in rows {
            prepared.push(Self::prepare_row(&store, table, row, &claims.sub)?);
        }
        store
            .tables
            .entry(table.to_string())
            .or_default()
            .extend(prepared.iter().cloned());
        drop(store);

        for row in &prepared {
            self.emit(table, ChangeKind::Insert, row.clone());
        }
        Ok(prepared)
    }

    async fn delete(
        &self,
        table: &str,
        filters: &[Filter],
        access_token: &str,
    ) -> Result<Vec<Value>, AppError> {
        let claims = self.verify_token(access_token)?;
        let owner = owner_column(table);
        let mut store = self.store.write().await;

        let mut deleted = Vec::new();
        if let Some(rows) = store.tables.get_mut(table) {
            rows.retain(|row| {
                let owned = row.get(owner).and_then(Value::as_str) == Some(claims.sub.as_str());
                if owned && matches_filters(row, filters) {
                    deleted.push(row.clone());
                    false
                } else {
                    true
                }
            });
        }

        // posts → comments: ON DELETE CASCADE
        let mut cascaded = Vec::new();
        if table == POSTS_TABLE && !deleted.is_empty() {
            if let Some(comments) = store.tables.get_mut(COMMENTS_TABLE) {
                comments.retain(|c| {
                    let orphan = deleted.iter().any(|p| match (p.get("id"), c.get("post_id")) {
                        (Some(id), Some(post_id)) => values_equal(id, post_id),
                        _ => false,
                    });
                    if orphan {
                        cascaded.push(c.clone());
                    }
                    !orphan
                });
            }
        }
        drop(store);

        for row in &deleted {
            self.emit(table, ChangeKind::Delete, row.clone());
        }
        for row in cascaded {
            self.emit(COMMENTS_TABLE, ChangeKind::Delete, row);
        }
        Ok(deleted)
    }

    async fn upsert(
        &self,
        table: &str,
        rows: Vec<Value>,
        access_token: &str,
    ) -> Result<Vec<Value>, AppError> {
        let claims = self.verify_token(access_token)?;
        let owner = owner_column(table);
        let mut store = self.store.write().await;

        let mut written = Vec::new();
        for row in rows {
            let id = row.get("id").cloned();
            let existing = id.as_ref().and_then(|id| {
                store
                    .tables
                    .get(table)
                    .and_then(|rows| {
                        rows.iter()
                            .position(|r| r.get("id").is_some_and(|rid| values_equal(rid, id)))
                    })
            });

            match existing {
                Some(index) => {
                    let rows = store.tables.entry(table.to_string()).or_default();
                    let owned = rows[index].get(owner).and_then(Value::as_str)
                        == Some(claims.sub.as_str());
                    if !owned {
                        return Err(rls_violation(table));
                    }
                    merge(&mut rows[index], &row);
                    written.push((ChangeKind::Update, rows[index].clone()));
                }
                None => {
                    let prepared = Self::prepare_row(&store, table, row, &claims.sub)?;
                    store
                        .tables
                        .entry(table.to_string())
                        .or_default()
                        .push(prepared.clone());
                    written.push((ChangeKind::Insert, prepared));
                }
            }
        }
        drop(store);

        for (kind, row) in &written {
            self.emit(table, *kind, row.clone());
        }
        Ok(written.into_iter().map(|(_, row)| row).collect())
    }

    async fn subscribe(&self, table: &str) -> Result<broadcast::Receiver<RowChange>, AppError> {
        let mut changes = self
            .changes
            .lock()
            .map_err(|_| AppError::Internal("change registry poisoned".to_string()))?;
        let tx = changes
            .entry(table.to_string())
            .or_insert_with(|| broadcast::channel(CHANGE_CAPACITY).0);
        Ok(tx.subscribe())
    }
}
