use anyhow::{Context as AnyhowContext, Result, bail};
use futures_util::{SinkExt, Stream, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tokio_tungstenite::tungstenite::{self, Message, protocol::CloseFrame};
use tokio_tungstenite::connect_async;
use url::Url;

use super::handler::Dispatcher;

const OP_DISPATCH: u8 = 0;
const OP_HEARTBEAT: u8 = 1;
const OP_IDENTIFY: u8 = 2;
const OP_RECONNECT: u8 = 7;
const OP_INVALID_SESSION: u8 = 9;
const OP_HELLO: u8 = 10;
const OP_HEARTBEAT_ACK: u8 = 11;

const INTENT_GUILDS: u64 = 1 << 0;
const INTENT_GUILD_MESSAGES: u64 = 1 << 9;
const INTENT_DIRECT_MESSAGES: u64 = 1 << 12;
const INTENT_MESSAGE_CONTENT: u64 = 1 << 15;

const INTENTS: u64 =
    INTENT_GUILDS | INTENT_GUILD_MESSAGES | INTENT_DIRECT_MESSAGES | INTENT_MESSAGE_CONTENT;

/// Close codes after which reconnecting with the same settings cannot help.
const FATAL_CLOSE_CODES: &[u16] = &[4004, 4010, 4011, 4012, 4013, 4014];

#[derive(Debug, Deserialize)]
pub(super) struct GatewayPayload {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
    pub s: Option<u64>,
    pub t: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Hello {
    heartbeat_interval: u64,
}

/// How a gateway session ended.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum SessionEnd {
    Reconnect,
    Fatal(String),
}

pub(super) fn gateway_ws_url(base: &str) -> Result<Url> {
    let mut url = Url::parse(base).context("Failed to parse gateway URL")?;
    url.query_pairs_mut().append_pair("v", "10").append_pair("encoding", "json");
    Ok(url)
}

fn identify_payload(token: &str) -> Value {
    json!({
        "op": OP_IDENTIFY,
        "d": {
            "token": token,
            "intents": INTENTS,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "quippy",
                "device": "quippy"
            }
        }
    })
}

fn heartbeat_payload(sequence: Option<u64>) -> Value {
    json!({ "op": OP_HEARTBEAT, "d": sequence })
}

fn classify_close(frame: Option<&CloseFrame<'_>>) -> SessionEnd {
    match frame {
        Some(frame) if FATAL_CLOSE_CODES.contains(&u16::from(frame.code)) => {
            SessionEnd::Fatal(format!("gateway closed with {}: {}", u16::from(frame.code), frame.reason))
        }
        _ => SessionEnd::Reconnect,
    }
}

async fn next_payload<S>(read: &mut S) -> Result<Option<GatewayPayload>>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(msg) = read.next().await {
        match msg.context("WebSocket error")? {
            Message::Text(text) => {
                let payload = serde_json::from_str(&text).context("Failed to parse gateway payload")?;
                return Ok(Some(payload));
            }
            Message::Close(_) => return Ok(None),
            _ => continue,
        }
    }
    Ok(None)
}

/// Runs one gateway session: Hello, Identify, then heartbeats interleaved with
/// dispatch events until the connection drops or Discord asks to reconnect.
/// First beat one period after Hello. A beat held up by a slow handler is sent
/// once and the schedule restarts from there.
fn heartbeat_timer(period: Duration) -> Interval {
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

pub(super) async fn run_session(
    dispatcher: &mut Dispatcher,
    token: &str,
    ws_url: &Url,
) -> Result<SessionEnd> {
    let (ws_stream, _resp) =
        connect_async(ws_url.as_str()).await.context("Failed to connect WebSocket")?;
    let (mut write, mut read) = ws_stream.split();

    let Some(hello) = next_payload(&mut read).await? else {
        return Ok(SessionEnd::Reconnect);
    };
    if hello.op != OP_HELLO {
        bail!("expected Hello from gateway, got op {}", hello.op);
    }
    let hello: Hello = serde_json::from_value(hello.d).context("Failed to parse Hello")?;

    write
        .send(Message::Text(identify_payload(token).to_string()))
        .await
        .context("Failed to identify")?;
    tracing::info!("Connected to gateway: {}", ws_url);

    let period = Duration::from_millis(hello.heartbeat_interval);
    let mut heartbeat = heartbeat_timer(period);
    let mut sequence: Option<u64> = None;

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                write
                    .send(Message::Text(heartbeat_payload(sequence).to_string()))
                    .await
                    .context("Failed to send heartbeat")?;
            }
            msg = read.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!("WebSocket closed: {:?}", frame);
                        return Ok(classify_close(frame.as_ref()));
                    }
                    // tungstenite answers pings itself; binary frames are not used
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(e).context("WebSocket error"),
                    None => return Ok(SessionEnd::Reconnect),
                };

                let payload: GatewayPayload = match serde_json::from_str(&text) {
                    Ok(p) => p,
                    Err(e) => {
                        tracing::warn!(error = %e, "Skipping unparseable gateway payload");
                        continue;
                    }
                };
                if payload.s.is_some() {
                    sequence = payload.s;
                }

                match payload.op {
                    OP_DISPATCH => {
                        let event = payload.t.unwrap_or_default();
                        if let Err(e) = dispatcher.handle_dispatch(&event, payload.d).await {
                            tracing::error!(event = %event, error = ?e, "Error handling gateway event");
                        }
                    }
                    OP_HEARTBEAT => {
                        write
                            .send(Message::Text(heartbeat_payload(sequence).to_string()))
                            .await
                            .context("Failed to send heartbeat")?;
                    }
                    OP_RECONNECT => {
                        tracing::info!("Gateway requested a reconnect");
                        return Ok(SessionEnd::Reconnect);
                    }
                    OP_INVALID_SESSION => {
                        tracing::warn!("Gateway invalidated the session");
                        return Ok(SessionEnd::Reconnect);
                    }
                    OP_HEARTBEAT_ACK => {}
                    other => tracing::debug!(op = other, "Ignoring gateway opcode"),
                }
            }
        }
    }
}
