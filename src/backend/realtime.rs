//! # Supabase Realtime 구독
//!
//! Realtime 서버는 Phoenix 채널 프로토콜을 쓰는 웹소켓입니다.
//! 테이블마다 채널 하나(`realtime:public:{table}`)에 join하고,
//! `postgres_changes` 메시지를 `RowChange`로 바꿔 broadcast 채널에 흘려보냅니다.
//!
//! 같은 테이블을 여러 방문자가 구독해도 웹소켓은 하나만 엽니다.
//! 연결이 끊기면 `RECONNECT_DELAY` 후 다시 연결합니다.
//! 구독자가 모두 사라지면 하트비트나 메시지 전달 시점에 연결을 닫고 태스크를 끝냅니다.
//! 그 전에 새 구독이 들어오면 이전 태스크를 중단(abort)하고 새로 띄웁니다.

use std::collections::HashMap;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use super::{ChangeKind, RowChange};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const CHANNEL_CAPACITY: usize = 64;

struct TableChannel {
    tx: broadcast::Sender<RowChange>,
    task: JoinHandle<()>,
}

pub struct RealtimeHub {
    socket_url: String,
    heartbeat: Duration,
    channels: Mutex<HashMap<String, TableChannel>>,
}

impl RealtimeHub {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            socket_url: realtime_socket_url(base_url, anon_key),
            heartbeat: HEARTBEAT_INTERVAL,
            channels: Mutex::new(HashMap::new()),
        }
    }

    pub async fn subscribe(&self, table: &str) -> broadcast::Receiver<RowChange> {
        let mut channels = self.channels.lock().await;
        if let Some(channel) = channels.get(table) {
            if channel.tx.receiver_count() > 0 && !channel.task.is_finished() {
                return channel.tx.subscribe();
            }
        }

        let (tx, rx) = broadcast::channel(CHANNEL_CAPACITY);
        let task = tokio::spawn(run_channel(
            self.socket_url.clone(),
            table.to_string(),
            self.heartbeat,
            tx.clone(),
        ));
        if let Some(stale) = channels.insert(table.to_string(), TableChannel { tx, task }) {
            // 구독자가 없는 이전 연결은 여기서 닫힙니다.
            stale.task.abort();
            tracing::debug!("Replaced stale realtime channel for {}", table);
        }
        rx
    }
}

impl Drop for RealtimeHub {
    fn drop(&mut self) {
        for channel in self.channels.get_mut().values() {
            channel.task.abort();
        }
    }
}

/// `https://x.supabase.co` → `wss://x.supabase.co/realtime/v1/websocket?apikey=..&vsn=1.0.0`
pub fn realtime_socket_url(base_url: &str, anon_key: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };
    format!(
        "{}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
        ws_base, anon_key
    )
}

async fn run_channel(
    url: String,
    table: String,
    heartbeat: Duration,
    tx: broadcast::Sender<RowChange>,
) {
    loop {
        if tx.receiver_count() == 0 {
            tracing::info!("Realtime channel for {} has no subscribers, stopping", table);
            return;
        }

        match listen(&url, &table, heartbeat, &tx).await {
            Ok(()) if tx.receiver_count() == 0 => continue,
            Ok(()) => tracing::warn!("Realtime connection for {} closed", table),
            Err(e) => tracing::warn!("Realtime connection for {} failed: {}", table, e),
        }

        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

/// 연결이 끊기거나 구독자가 모두 사라지면 Ok로 끝납니다.
async fn listen(
    url: &str,
    table: &str,
    heartbeat: Duration,
    tx: &broadcast::Sender<RowChange>,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let (ws_stream, _) = connect_async(url).await?;
    let (mut write, mut read) = ws_stream.split();

    write.send(Message::Text(join_message(table).to_string())).await?;
    tracing::info!("Joined realtime channel for {}", table);

    let mut heartbeat = tokio::time::interval(heartbeat);
    heartbeat.tick().await;
    let mut message_ref: u64 = 1;

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                if tx.receiver_count() == 0 {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }
                message_ref += 1;
                write
                    .send(Message::Text(heartbeat_message(message_ref).to_string()))
                    .await?;
            }
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Some(change) = parse_change(&text) {
                        tracing::debug!("Realtime {:?} on {}", change.kind, change.table);
                        // send 실패 = 구독자 없음
                        if tx.send(change).is_err() {
                            let _ = write.send(Message::Close(None)).await;
                            return Ok(());
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => return Ok(()),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e),
            }
        }
    }
}

fn join_message(table: &str) -> Value {
    json!({
        "topic": format!("realtime:public:{}", table),
        "event": "phx_join",
        "payload": {
            "config": {
                "postgres_changes": [
                    { "event": "*", "schema": "public", "table": table }
                ]
            }
        },
        "ref": "1"
    })
}

fn heartbeat_message(message_ref: u64) -> Value {
    json!({
        "topic": "phoenix",
        "event": "heartbeat",
        "payload": {},
        "ref": message_ref.to_string()
    })
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Deserialize)]
struct ChangeData {
    #[serde(rename = "type")]
    kind: ChangeKind,
    table: String,
    #[serde(default)]
    record: Value,
    #[serde(default)]
    old_record: Value,
}

/// `postgres_changes` 이외의 메시지(phx_reply, heartbeat 응답 등)는 None
pub fn parse_change(text: &str) -> Option<RowChange> {
    let envelope: Envelope = serde_json::from_str(text).ok()?;
    if envelope.event != "postgres_changes" {
        return None;
    }

    let data: ChangeData = serde_json::from_value(envelope.payload.get("data")?.clone()).ok()?;
    let record = match data.kind {
        ChangeKind::Delete => data.old_record,
        _ => data.record,
    };

    Some(RowChange {
        table: data.table,
        kind: data.kind,
        record,
    })
}
