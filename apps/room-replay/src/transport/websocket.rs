use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::{timeout, timeout_at, Instant};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async_tls_with_config, Connector, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace};
use url::Url;

use super::{Connection, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where and how to open the gateway connection.
#[derive(Debug, Clone)]
pub struct WsTarget {
    pub url: Url,
    pub headers: Vec<(&'static str, String)>,
    /// Skip certificate and hostname verification for `wss://`.
    pub insecure: bool,
    pub connect_timeout: Duration,
}

impl WsTarget {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            headers: Vec::new(),
            insecure: false,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_headers(mut self, headers: Vec<(&'static str, String)>) -> Self {
        self.headers = headers;
        self
    }

    pub fn insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }
}

/// Gateway connection over tokio-tungstenite. The write half and the read
/// half are locked independently, so a listen never blocks a send.
pub struct WebSocketConnection {
    sink: AsyncMutex<SplitSink<WsStream, Message>>,
    stream: AsyncMutex<SplitStream<WsStream>>,
}

impl WebSocketConnection {
    pub async fn connect(target: &WsTarget) -> Result<Self, TransportError> {
        let mut request = target.url.as_str().into_client_request()?;
        for (name, value) in &target.headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|err| TransportError::InvalidHeader {
                    name: name.to_string(),
                    reason: err.to_string(),
                })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|err| TransportError::InvalidHeader {
                    name: name.to_string(),
                    reason: err.to_string(),
                })?;
            request.headers_mut().insert(header_name, header_value);
        }

        let connector = if target.insecure {
            let tls = native_tls::TlsConnector::builder()
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
                .build()?;
            Some(Connector::NativeTls(tls))
        } else {
            None
        };

        debug!(
            target: "transport::websocket",
            url = %target.url,
            insecure = target.insecure,
            "opening websocket"
        );
        let (ws_stream, response) = timeout(
            target.connect_timeout,
            connect_async_tls_with_config(request, None, false, connector),
        )
        .await
        .map_err(|_| TransportError::ConnectTimeout(target.connect_timeout))??;
        info!(
            target: "transport::websocket",
            status = %response.status(),
            "websocket connected"
        );

        let (sink, stream) = ws_stream.split();
        Ok(Self {
            sink: AsyncMutex::new(sink),
            stream: AsyncMutex::new(stream),
        })
    }
}

#[async_trait]
impl Connection for WebSocketConnection {
    async fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        let mut sink = self.sink.lock().await;
        sink.send(Message::Binary(frame.to_vec())).await?;
        Ok(())
    }

    async fn recv_timeout(&self, window: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        let deadline = Instant::now() + window;
        let mut stream = self.stream.lock().await;
        loop {
            let Ok(next) = timeout_at(deadline, stream.next()).await else {
                return Ok(None);
            };
            match next {
                Some(Ok(Message::Binary(data))) => return Ok(Some(data)),
                Some(Ok(Message::Text(text))) => return Ok(Some(text.into_bytes())),
                Some(Ok(Message::Close(frame))) => {
                    debug!(
                        target: "transport::websocket",
                        frame = ?frame,
                        "peer closed websocket"
                    );
                    return Err(TransportError::Closed);
                }
                Some(Ok(other)) => {
                    trace!(
                        target: "transport::websocket",
                        len = other.len(),
                        "skipping control message"
                    );
                }
                Some(Err(err)) => return Err(err.into()),
                None => return Err(TransportError::Closed),
            }
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut sink = self.sink.lock().await;
        match sink.close().await {
            Ok(()) => Ok(()),
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
