//! WebSocket data source

use std::sync::Arc;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use super::{EventKind, TransportError, TransportEvent};
use crate::constants::socket::{ABNORMAL_CLOSURE, NORMAL_CLOSURE};
use crate::panel::PanelId;

/// Close code reported when a close frame carries no status
const NO_STATUS_RECEIVED: u16 = 1005;

/// What a socket yielded next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Text(String),
    Closed(u16),
}

/// An open socket
#[async_trait]
pub trait SocketStream: Send {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Waits for the next text message or the close of the socket.
    /// Errors and a stream ending without a close frame are reported as 1006.
    async fn next_message(&mut self) -> Incoming;

    async fn close(&mut self, code: u16);
}

/// Opens sockets
#[async_trait]
pub trait SocketConnector: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<Box<dyn SocketStream>, TransportError>;
}

/// Connector backed by tokio-tungstenite
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

#[async_trait]
impl SocketConnector for TungsteniteConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn SocketStream>, TransportError> {
        let (stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::SocketError(e.to_string()))?;

        Ok(Box::new(TungsteniteStream { inner: stream }))
    }
}

struct TungsteniteStream {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl SocketStream for TungsteniteStream {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.inner
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::SocketError(e.to_string()))
    }

    async fn next_message(&mut self) -> Incoming {
        loop {
            match self.inner.next().await {
                Some(Ok(Message::Text(text))) => return Incoming::Text(text),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => return Incoming::Text(text),
                    Err(_) => debug!("Skipping non UTF-8 binary message"),
                },
                Some(Ok(Message::Close(frame))) => {
                    let code = frame
                        .map(|frame| u16::from(frame.code))
                        .unwrap_or(NO_STATUS_RECEIVED);
                    return Incoming::Closed(code);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Socket error: {}", e);
                    return Incoming::Closed(ABNORMAL_CLOSURE);
                }
                None => return Incoming::Closed(ABNORMAL_CLOSURE),
            }
        }
    }

    async fn close(&mut self, code: u16) {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: "".into(),
        };
        if let Err(e) = self.inner.close(Some(frame)).await {
            debug!("Error closing socket: {}", e);
        }
    }
}

/// A running socket task. Dropping the handle closes the socket normally.
pub(crate) struct SocketHandle {
    pub(crate) generation: u64,
    shutdown: Option<oneshot::Sender<u16>>,
    task: JoinHandle<()>,
}

impl SocketHandle {
    /// Asks the task to close its socket with `code` and stop
    pub(crate) fn close(mut self, code: u16) {
        if let Some(shutdown) = self.shutdown.take() {
            if shutdown.send(code).is_err() {
                // task already finished
                self.task.abort();
            }
        }
    }
}

/// Opens a socket in the background and forwards what it yields as events
pub(crate) struct SocketTask {
    pub(crate) panel: PanelId,
    pub(crate) generation: u64,
    pub(crate) url: Url,
    pub(crate) greeting: Option<Value>,
    pub(crate) connector: Arc<dyn SocketConnector>,
    pub(crate) events: UnboundedSender<TransportEvent>,
}

impl SocketTask {
    pub(crate) fn spawn(self) -> SocketHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let generation = self.generation;
        let task = tokio::spawn(self.run(shutdown_rx));

        SocketHandle {
            generation,
            shutdown: Some(shutdown_tx),
            task,
        }
    }

    fn emit(&self, kind: EventKind) -> bool {
        self.events
            .send(TransportEvent::new(self.panel, self.generation, kind))
            .is_ok()
    }

    async fn run(self, mut shutdown: oneshot::Receiver<u16>) {
        let connected = tokio::select! {
            biased;
            _ = &mut shutdown => return,
            result = self.connector.connect(&self.url) => result,
        };

        let mut stream = match connected {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Failed to open socket {} for {}: {}", self.url, self.panel, e);
                self.emit(EventKind::Closed {
                    code: ABNORMAL_CLOSURE,
                });
                return;
            }
        };

        if let Some(greeting) = &self.greeting {
            let sent = match serde_json::to_string(greeting) {
                Ok(text) => stream.send_text(text).await,
                Err(e) => Err(TransportError::SocketError(e.to_string())),
            };
            if let Err(e) = sent {
                warn!("Failed to send greeting for {}: {}", self.panel, e);
                stream.close(NORMAL_CLOSURE).await;
                self.emit(EventKind::Closed {
                    code: ABNORMAL_CLOSURE,
                });
                return;
            }
        }

        info!("Socket {} opened for {}", self.url, self.panel);
        if !self.emit(EventKind::Opened) {
            stream.close(NORMAL_CLOSURE).await;
            return;
        }

        loop {
            tokio::select! {
                biased;
                code = &mut shutdown => {
                    stream.close(code.unwrap_or(NORMAL_CLOSURE)).await;
                    debug!("Socket {} closed for {}", self.url, self.panel);
                    return;
                }
                incoming = stream.next_message() => match incoming {
                    Incoming::Text(text) => {
                        if !self.emit(EventKind::Payload(text)) {
                            stream.close(NORMAL_CLOSURE).await;
                            return;
                        }
                    }
                    Incoming::Closed(code) => {
                        self.emit(EventKind::Closed { code });
                        return;
                    }
                },
            }
        }
    }
}
