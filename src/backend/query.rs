//! # 행(row) 조회 쿼리 빌더
//!
//! 백엔드에 독립적인 select 쿼리 표현입니다.
//! REST 백엔드는 이것을 PostgREST 쿼리 파라미터로 바꾸고,
//! 인메모리 백엔드는 직접 평가합니다.
//!
//! 임베드(embed)는 연관 테이블을 한 번의 요청으로 함께 가져오는 기능입니다.
//! 예: 게시글 + 작성자 프로필 + 댓글(+ 댓글 작성자 프로필)

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// PostgREST 형식: `column=eq.value`
    pub fn to_param(&self) -> (String, String) {
        (self.column.clone(), format!("eq.{}", value_as_text(&self.value)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }

    fn render(&self) -> String {
        format!(
            "{}.{}",
            self.column,
            if self.ascending { "asc" } else { "desc" }
        )
    }
}

/// 임베드 관계의 방향
#[derive(Debug, Clone, PartialEq)]
pub enum EmbedKind {
    /// 부모 행의 `local_key` 컬럼이 임베드 테이블의 `id`를 가리킴 (N:1)
    One { local_key: String },
    /// 임베드 테이블의 `foreign_key` 컬럼이 부모 행의 `id`를 가리킴 (1:N)
    Many { foreign_key: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Embed {
    pub alias: String,
    pub table: String,
    pub kind: EmbedKind,
    pub columns: Vec<String>,
    pub order: Vec<Order>,
    pub embeds: Vec<Embed>,
}

impl Embed {
    pub fn one(alias: &str, table: &str, local_key: &str) -> Self {
        Self {
            alias: alias.to_string(),
            table: table.to_string(),
            kind: EmbedKind::One {
                local_key: local_key.to_string(),
            },
            columns: Vec::new(),
            order: Vec::new(),
            embeds: Vec::new(),
        }
    }

    pub fn many(alias: &str, table: &str, foreign_key: &str) -> Self {
        Self {
            alias: alias.to_string(),
            table: table.to_string(),
            kind: EmbedKind::Many {
                foreign_key: foreign_key.to_string(),
            },
            columns: Vec::new(),
            order: Vec::new(),
            embeds: Vec::new(),
        }
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order.push(order);
        self
    }

    pub fn embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    /// `author:profiles!user_id(full_name)` / `comments:comments(...)`
    fn render_select(&self) -> String {
        let target = match &self.kind {
            EmbedKind::One { local_key } => format!("{}!{}", self.table, local_key),
            EmbedKind::Many { .. } => self.table.clone(),
        };
        format!(
            "{}:{}({})",
            self.alias,
            target,
            render_columns(&self.columns, &self.embeds)
        )
    }

    /// 임베드 정렬은 `alias.order=col.asc` 형태의 별도 파라미터입니다.
    fn collect_order_params(&self, prefix: &str, out: &mut Vec<(String, String)>) {
        let path = if prefix.is_empty() {
            self.alias.clone()
        } else {
            format!("{}.{}", prefix, self.alias)
        };
        if !self.order.is_empty() {
            let rendered: Vec<String> = self.order.iter().map(Order::render).collect();
            out.push((format!("{}.order", path), rendered.join(",")));
        }
        for embed in &self.embeds {
            embed.collect_order_params(&path, out);
        }
    }
}

/// 한 테이블에 대한 select 쿼리
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub columns: Vec<String>,
    pub embeds: Vec<Embed>,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn from(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
            embeds: Vec::new(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order.push(order);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// PostgREST 쿼리 파라미터로 변환합니다.
    pub fn to_postgrest_params(&self) -> Vec<(String, String)> {
        let mut params = vec![(
            "select".to_string(),
            render_columns(&self.columns, &self.embeds),
        )];
        params.extend(self.filters.iter().map(Filter::to_param));
        if !self.order.is_empty() {
            let rendered: Vec<String> = self.order.iter().map(Order::render).collect();
            params.push(("order".to_string(), rendered.join(",")));
        }
        for embed in &self.embeds {
            embed.collect_order_params("", &mut params);
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

fn render_columns(columns: &[String], embeds: &[Embed]) -> String {
    let mut parts: Vec<String> = if columns.is_empty() {
        vec!["*".to_string()]
    } else {
        columns.to_vec()
    };
    parts.extend(embeds.iter().map(Embed::render_select));
    parts.join(",")
}

/// 필터 값은 따옴표 없는 텍스트로 보냅니다.
pub fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
