//! WebSocket frame source
//!
//! One `tokio-tungstenite` client connection per session. Ping/pong is
//! answered by the library; only text and binary messages are surfaced.

use std::time::Duration;

use contracts::{ContractError, FrameSource, RawFrame};
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Bound on the close handshake
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// WebSocket upstream
pub struct WebSocketSource {
    url: String,
    stream: Option<WsStream>,
}

impl WebSocketSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            stream: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn disconnect(&mut self) {
        let Some(mut stream) = self.stream.take() else {
            return;
        };

        match tokio::time::timeout(CLOSE_TIMEOUT, stream.close(None)).await {
            Ok(Ok(())) => debug!(url = %self.url, "WebSocket closed"),
            Ok(Err(e)) => debug!(url = %self.url, error = %e, "WebSocket close failed"),
            Err(_) => debug!(url = %self.url, "WebSocket close timed out"),
        }
    }
}

impl FrameSource for WebSocketSource {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn connect(&mut self) -> Result<(), ContractError> {
        self.disconnect().await;

        let (stream, response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| ContractError::upstream_connect(&self.url, e.to_string()))?;

        debug!(url = %self.url, status = %response.status(), "WebSocket handshake complete");
        self.stream = Some(stream);
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Option<RawFrame>, ContractError> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(ContractError::upstream_read(&self.url, "not connected"));
        };

        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(RawFrame::Text(text.as_str().to_owned())));
                }
                Some(Ok(Message::Binary(data))) => return Ok(Some(RawFrame::Binary(data))),
                Some(Ok(Message::Close(frame))) => {
                    debug!(url = %self.url, ?frame, "Close frame received");
                    return Ok(None);
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(ContractError::upstream_read(&self.url, e.to_string())),
                None => return Ok(None),
            }
        }
    }

    async fn close(&mut self) {
        self.disconnect().await;
    }
}
