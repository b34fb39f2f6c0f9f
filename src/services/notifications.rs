//! # 토스트 알림
//!
//! 사용자에게 잠깐 보여주는 메시지입니다. 기본 3초 후 사라집니다.
//! 메시지는 렌더링할 때 HTML 이스케이프됩니다.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

use super::helpers::escape_html;

pub const TOAST_LIFETIME: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    Info,
}

impl ToastKind {
    pub fn icon(self) -> &'static str {
        match self {
            ToastKind::Success => "fa-check-circle",
            ToastKind::Error => "fa-exclamation-circle",
            ToastKind::Warning => "fa-exclamation-triangle",
            ToastKind::Info => "fa-info-circle",
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            ToastKind::Success => "notification-success",
            ToastKind::Error => "notification-error",
            ToastKind::Warning => "notification-warning",
            ToastKind::Info => "notification-info",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    shown_at: Instant,
}

#[derive(Debug)]
pub struct Notifier {
    toasts: VecDeque<Toast>,
    lifetime: Duration,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        Self {
            toasts: VecDeque::new(),
            lifetime: TOAST_LIFETIME,
        }
    }

    pub fn show(&mut self, message: impl Into<String>, kind: ToastKind) {
        let message = message.into();
        tracing::debug!("Toast ({:?}): {}", kind, message);

        self.toasts.push_back(Toast {
            message,
            kind,
            shown_at: Instant::now(),
        });
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.show(message, ToastKind::Success)
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.show(message, ToastKind::Error)
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.show(message, ToastKind::Info)
    }

    /// 만료된 토스트를 버리고 남은 것을 돌려줍니다. (오래된 것이 먼저)
    pub fn active(&mut self) -> Vec<Toast> {
        let now = Instant::now();
        let lifetime = self.lifetime;
        self.toasts
            .retain(|t| now.duration_since(t.shown_at) < lifetime);
        self.toasts.iter().cloned().collect()
    }

    pub fn render(&mut self) -> String {
        self.active()
            .iter()
            .map(|toast| {
                format!(
                    r#"<div class="notification {}"><div class="notification-content"><i class="fas {}"></i><span>{}</span></div></div>"#,
                    toast.kind.css_class(),
                    toast.kind.icon(),
                    escape_html(&toast.message)
                )
            })
            .collect()
    }
}
