//! Websocket transport built on `tokio-tungstenite`

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};

use crate::transport::{Connector, Transport};
use crate::{Result, SimulationError};

/// Opens websocket connections with a bounded handshake time
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    connect_timeout: Duration,
}

impl WebSocketConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait::async_trait]
impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    async fn connect(&self, endpoint: &str) -> Result<Self::Transport> {
        debug!("Opening websocket to {}", endpoint);

        let handshake = tokio::time::timeout(self.connect_timeout, connect_async(endpoint))
            .await
            .map_err(|_| SimulationError::Timeout { duration: self.connect_timeout })?;

        let (stream, response) = handshake.map_err(|e| {
            SimulationError::connection_failed_with_source(
                format!("cannot open websocket to {endpoint}"),
                Box::new(e),
            )
        })?;

        info!(status = %response.status(), "Websocket connected to {}", endpoint);
        Ok(WebSocketTransport { stream, closed: false })
    }
}

/// Open websocket connection to the simulator
pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

#[async_trait::async_trait]
impl Transport for WebSocketTransport {
    async fn send_text(&mut self, text: String) -> Result<()> {
        trace!("Sending {} bytes", text.len());
        self.stream.send(Message::Text(text)).await.map_err(|e| {
            SimulationError::connection_failed_with_source("failed to send message", Box::new(e))
        })
    }

    async fn next_message(&mut self) -> Result<Option<String>> {
        if self.closed {
            return Ok(None);
        }

        while let Some(message) = self.stream.next().await {
            match message {
                Ok(Message::Text(text)) => return Ok(Some(text)),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => return Ok(Some(text)),
                    Err(_) => warn!("Ignoring non UTF-8 binary message"),
                },
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "Server closed the websocket");
                    self.closed = true;
                    return Ok(None);
                }
                // Pongs are queued by tungstenite itself
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {}
                Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => {
                    self.closed = true;
                    return Ok(None);
                }
                Err(e) => {
                    self.closed = true;
                    return Err(SimulationError::connection_failed_with_source(
                        "websocket error",
                        Box::new(e),
                    ));
                }
            }
        }

        self.closed = true;
        Ok(None)
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(SimulationError::connection_failed_with_source(
                "failed to close websocket",
                Box::new(e),
            )),
        }
    }
}
