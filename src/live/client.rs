use super::messages::{RealtimeInputMessage, ServerContent, ServerMessage, SetupMessage};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::Engine;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Events surfaced by the realtime transport.
#[derive(Debug)]
pub enum LiveEvent {
    /// Setup acknowledged; microphone audio may start streaming
    Open,
    /// One server content frame (audio, transcriptions, turn signals)
    Content(ServerContent),
    /// Transport failure; the session tears down
    Error(String),
    /// Connection closed by either side
    Closed,
}

/// Outbound half of the realtime connection.
///
/// The session controller only sees this trait, so tests drive it with an
/// in-memory transport.
#[async_trait]
pub trait LiveTransport: Send {
    /// Fire one realtime-input audio message. Fire-and-forget: the caller
    /// logs failures and never retries.
    async fn send_audio(&self, pcm: &[u8]) -> Result<()>;

    /// Close the connection. Closing twice is a no-op.
    async fn close(&mut self) -> Result<()>;
}

/// Connection parameters for the realtime API
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// WebSocket endpoint, without the key query parameter
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

/// WebSocket client for the realtime API.
///
/// `connect` performs the setup handshake and spawns one task per direction: a
/// writer draining the outbound channel and a reader mapping frames onto the
/// `LiveEvent` stream.
pub struct LiveClient {
    outbound: Option<mpsc::Sender<String>>,
}

impl LiveClient {
    pub async fn connect(config: LiveConfig) -> Result<(Self, mpsc::Receiver<LiveEvent>)> {
        let url = format!("{}?key={}", config.endpoint, config.api_key);

        let (ws, _) = connect_async(&url)
            .await
            .context("failed to open realtime connection")?;
        info!("realtime connection established");

        let (mut write, mut read) = ws.split();

        // Setup must be the first message on the wire
        let setup = serde_json::to_string(&SetupMessage::for_model(&config.model))
            .context("failed to serialize setup message")?;
        write
            .send(Message::Text(setup.into()))
            .await
            .context("failed to send setup message")?;

        let (event_tx, event_rx) = mpsc::channel(64);
        let (out_tx, mut out_rx) = mpsc::channel::<String>(64);

        tokio::spawn(async move {
            while let Some(text) = out_rx.recv().await {
                if let Err(e) = write.send(Message::Text(text.into())).await {
                    warn!("realtime send failed: {}", e);
                    break;
                }
            }
            // Outbound channel closed; say goodbye if the socket is still up
            let _ = write.send(Message::Close(None)).await;
            debug!("realtime writer task stopped");
        });

        tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        dispatch_frame(text.as_str(), &event_tx).await;
                    }
                    Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                        Ok(text) => dispatch_frame(text, &event_tx).await,
                        Err(_) => warn!("discarding non-UTF8 binary frame"),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        let _ = event_tx.send(LiveEvent::Error(e.to_string())).await;
                        return;
                    }
                }
            }
            let _ = event_tx.send(LiveEvent::Closed).await;
            debug!("realtime reader task stopped");
        });

        Ok((
            Self {
                outbound: Some(out_tx),
            },
            event_rx,
        ))
    }
}

async fn dispatch_frame(text: &str, events: &mpsc::Sender<LiveEvent>) {
    match serde_json::from_str::<ServerMessage>(text) {
        Ok(message) => {
            if message.setup_complete.is_some() {
                let _ = events.send(LiveEvent::Open).await;
            }
            if let Some(content) = message.server_content {
                let _ = events.send(LiveEvent::Content(content)).await;
            }
        }
        Err(e) => warn!("unparseable realtime frame: {}", e),
    }
}

#[async_trait]
impl LiveTransport for LiveClient {
    async fn send_audio(&self, pcm: &[u8]) -> Result<()> {
        let outbound = self
            .outbound
            .as_ref()
            .ok_or_else(|| anyhow!("realtime connection is closed"))?;

        let message = RealtimeInputMessage::audio(
            base64::engine::general_purpose::STANDARD.encode(pcm),
        );
        let text = serde_json::to_string(&message).context("failed to serialize audio message")?;

        outbound
            .send(text)
            .await
            .map_err(|_| anyhow!("realtime connection is closed"))
    }

    async fn close(&mut self) -> Result<()> {
        // Dropping the sender ends the writer task, which closes the socket
        self.outbound.take();
        Ok(())
    }
}
