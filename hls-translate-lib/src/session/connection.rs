//! Per-language connection actor.
//!
//! One task owns the WebSocket to the translation service for one
//! language. Sessions talk to it through a [`ConnectionHandle`]; inbound
//! events flow to at most one live [`EventSubscription`] at a time.
//! Dropping the subscription detaches it, so a session can never leak its
//! handler onto the shared connection. Reconnection is automatic with a
//! fixed delay; an in-flight session on a dropped connection observes its
//! event stream closing and fails.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::config::ConnectionConfig;
use crate::error::{Result, TranslateError};
use crate::session::protocol::{self, ServerEvent};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

enum Command {
    Send(serde_json::Value),
    Subscribe(mpsc::UnboundedSender<ServerEvent>),
    Unsubscribe,
}

/// Where and how to connect.
#[derive(Debug, Clone)]
pub struct ConnectSettings {
    pub url: String,
    pub api_key: String,
}

/// Cloneable handle to a language's connection actor.
#[derive(Clone)]
pub struct ConnectionHandle {
    cmd_tx: mpsc::Sender<Command>,
}

impl ConnectionHandle {
    /// Spawn the actor for one language and return its handle.
    pub fn spawn(language: &str, settings: ConnectSettings, config: ConnectionConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let actor = ConnectionActor {
            language: language.to_string(),
            settings,
            config,
            cmd_rx,
            subscriber: None,
        };
        tokio::spawn(actor.run());
        Self { cmd_tx }
    }

    /// Queue an outbound message.
    pub async fn send(&self, message: serde_json::Value) -> Result<()> {
        self.cmd_tx
            .send(Command::Send(message))
            .await
            .map_err(|_| TranslateError::Connection("connection actor gone".into()))
    }

    /// Attach as the connection's single subscriber. Replaces any stale
    /// subscription; the returned guard detaches on drop.
    pub async fn subscribe(&self) -> Result<EventSubscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.cmd_tx
            .send(Command::Subscribe(tx))
            .await
            .map_err(|_| TranslateError::Connection("connection actor gone".into()))?;
        Ok(EventSubscription {
            events: rx,
            cmd_tx: self.cmd_tx.clone(),
        })
    }
}

/// Scoped view of the connection's inbound events. The subscription is
/// detached when this value drops.
pub struct EventSubscription {
    events: mpsc::UnboundedReceiver<ServerEvent>,
    cmd_tx: mpsc::Sender<Command>,
}

impl EventSubscription {
    /// Next server event; `None` when the connection dropped or the
    /// subscription was superseded.
    pub async fn next_event(&mut self) -> Option<ServerEvent> {
        self.events.recv().await
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        // Best effort: a lost detach only leaves a closed sender in the
        // slot, which the actor clears on the next forward attempt.
        let _ = self.cmd_tx.try_send(Command::Unsubscribe);
    }
}

struct ConnectionActor {
    language: String,
    settings: ConnectSettings,
    config: ConnectionConfig,
    cmd_rx: mpsc::Receiver<Command>,
    subscriber: Option<mpsc::UnboundedSender<ServerEvent>>,
}

impl ConnectionActor {
    async fn run(mut self) {
        let mut attempts: u32 = 0;
        loop {
            let ws = match self.connect().await {
                Ok(ws) => {
                    attempts = 0;
                    ws
                }
                Err(e) => {
                    attempts += 1;
                    if attempts > self.config.max_reconnect_attempts {
                        error!(
                            language = %self.language,
                            attempts,
                            "giving up on translation service connection"
                        );
                        return;
                    }
                    warn!(
                        language = %self.language,
                        error = %e,
                        attempt = attempts,
                        "connect failed, retrying after fixed delay"
                    );
                    tokio::time::sleep(self.config.reconnect_delay()).await;
                    continue;
                }
            };

            match self.serve(ws).await {
                ServeEnd::HandleClosed => {
                    info!(language = %self.language, "connection actor shutting down");
                    return;
                }
                ServeEnd::ConnectionLost => {
                    // Abandon the in-flight session: closing the slot ends
                    // its event stream.
                    self.subscriber = None;
                    warn!(
                        language = %self.language,
                        "translation service connection lost, reconnecting"
                    );
                    tokio::time::sleep(self.config.reconnect_delay()).await;
                }
            }
        }
    }

    async fn connect(&self) -> Result<WsStream> {
        let mut request = self.settings.url.as_str().into_client_request()?;
        let headers = request.headers_mut();
        headers.insert(
            "Authorization",
            format!("Bearer {}", self.settings.api_key)
                .parse()
                .map_err(|_| TranslateError::Config("API key is not a valid header value".into()))?,
        );
        headers.insert("OpenAI-Beta", "realtime=v1".parse().expect("static header"));

        let (ws, response) = connect_async(request).await?;
        info!(
            language = %self.language,
            status = %response.status(),
            "connected to translation service"
        );
        Ok(ws)
    }

    /// Drive one live socket until it drops or the handle closes.
    async fn serve(&mut self, mut ws: WsStream) -> ServeEnd {
        let period = self.config.keep_alive_interval();
        let mut keep_alive = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        keep_alive.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(Command::Send(message)) => {
                        let text = protocol::encode(&message);
                        if let Err(e) = ws.send(Message::Text(text.into())).await {
                            warn!(language = %self.language, error = %e, "send failed");
                            return ServeEnd::ConnectionLost;
                        }
                    }
                    Some(Command::Subscribe(tx)) => {
                        if self.subscriber.replace(tx).is_some() {
                            // Sequencing should make this impossible; a stale
                            // sender here would misattribute events.
                            warn!(language = %self.language, "replacing live subscriber");
                        }
                    }
                    Some(Command::Unsubscribe) => {
                        self.subscriber = None;
                    }
                    None => return ServeEnd::HandleClosed,
                },

                _ = keep_alive.tick() => {
                    debug!(language = %self.language, "sending keep-alive continuation");
                    let text = protocol::encode(&protocol::session_continue());
                    if let Err(e) = ws.send(Message::Text(text.into())).await {
                        warn!(language = %self.language, error = %e, "keep-alive failed");
                        return ServeEnd::ConnectionLost;
                    }
                }

                msg = ws.next() => match msg {
                    Some(Ok(Message::Text(text))) => self.forward(text.as_str()),
                    Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_))) => {}
                    Some(Ok(Message::Close(_))) | None => return ServeEnd::ConnectionLost,
                    Some(Err(e)) => {
                        warn!(language = %self.language, error = %e, "websocket error");
                        return ServeEnd::ConnectionLost;
                    }
                },
            }
        }
    }

    fn forward(&mut self, text: &str) {
        let Some(event) = protocol::parse_server_event(text) else {
            debug!(language = %self.language, "ignoring unparseable frame");
            return;
        };
        if let ServerEvent::Other { ref event_type } = event {
            debug!(language = %self.language, event_type, "ignoring event");
            return;
        }
        if let Some(tx) = &self.subscriber {
            if tx.send(event).is_err() {
                // Receiver went away without a detach; clear the slot.
                self.subscriber = None;
            }
        } else {
            debug!(language = %self.language, "event arrived with no subscriber");
        }
    }
}

enum ServeEnd {
    HandleClosed,
    ConnectionLost,
}
