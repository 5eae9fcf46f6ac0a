//! WebSocket listener for new-token notices.

use futures::stream::{Stream, StreamExt};
use futures::SinkExt;
use std::pin::Pin;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{interval_at, sleep, Instant, Interval, MissedTickBehavior, Sleep};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

use crate::error::FeedError;
use crate::notice::{parse_notice, subscribe_request, NewTokenNotice};

/// Public PumpPortal data feed.
pub const DEFAULT_FEED_URL: &str = "wss://pumpportal.fun/api/data";

/// Interval between keepalive pings.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);

/// Silence after which the connection is considered dead.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Stream of parsed notices. Ends when the transport disconnects.
pub type NoticeStream = Pin<Box<dyn Stream<Item = NewTokenNotice> + Send>>;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket listener for token-creation notices.
#[derive(Debug, Clone)]
pub struct FeedListener {
    ws_url: String,
    ping_interval: Duration,
    idle_timeout: Duration,
}

/// Connection state carried through the notice stream.
struct Connection {
    ws: Socket,
    ping: Interval,
    idle_timeout: Duration,
    /// Reset on every inbound frame, pongs included
    idle: Pin<Box<Sleep>>,
}

impl FeedListener {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            ping_interval: DEFAULT_PING_INTERVAL,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// Override keepalive timing.
    pub fn with_keepalive(mut self, ping_interval: Duration, idle_timeout: Duration) -> Self {
        self.ping_interval = ping_interval;
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Connect, send the subscription request, and return the notice stream.
    ///
    /// Malformed frames are dropped inside the stream. A disconnect, a failed
    /// keepalive ping or `idle_timeout` without any inbound frame ends the
    /// stream; calling `subscribe` again opens a fresh connection, which is
    /// how hosts resubscribe after a reconnect.
    pub async fn subscribe(&self) -> Result<NoticeStream, FeedError> {
        info!(ws_url = %self.ws_url, "Subscribing to new token feed");

        let (mut ws, _response) = connect_async(self.ws_url.as_str()).await?;
        ws.send(Message::Text(subscribe_request())).await?;
        info!("Feed connected, subscribeNewToken sent");

        let mut ping = interval_at(Instant::now() + self.ping_interval, self.ping_interval);
        ping.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let conn = Connection {
            ws,
            ping,
            idle_timeout: self.idle_timeout,
            idle: Box::pin(sleep(self.idle_timeout)),
        };

        // The socket lives in the unfold state so it stays open while the stream is polled
        let notices = futures::stream::unfold(conn, |mut conn| async move {
            loop {
                tokio::select! {
                    frame = conn.ws.next() => {
                        conn.idle.as_mut().reset(Instant::now() + conn.idle_timeout);
                        match frame {
                            Some(Ok(Message::Text(text))) => match parse_notice(&text) {
                                Ok(notice) => return Some((notice, conn)),
                                Err(e) => trace!(error = %e, "Discarding feed message"),
                            },
                            Some(Ok(Message::Close(frame))) => {
                                warn!(frame = ?frame, "Feed closed by server");
                                return None;
                            }
                            // Binary, ping and pong frames carry no notices
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                warn!(error = %e, "Feed transport error");
                                return None;
                            }
                            None => return None,
                        }
                    }
                    _ = conn.ping.tick() => {
                        debug!("Sending keepalive ping");
                        if let Err(e) = conn.ws.send(Message::Ping(Vec::new())).await {
                            warn!(error = %e, "Keepalive ping failed");
                            return None;
                        }
                    }
                    _ = &mut conn.idle => {
                        warn!(
                            idle_secs = conn.idle_timeout.as_secs(),
                            "Feed silent too long, dropping connection"
                        );
                        return None;
                    }
                }
            }
        });

        Ok(Box::pin(notices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    /// Single-connection websocket server that checks the subscription
    /// request and replays `frames`.
    async fn serve_once(frames: Vec<Message>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();

            let first = ws.next().await.unwrap().unwrap();
            assert_eq!(first, Message::Text(subscribe_request()));

            for frame in frames {
                ws.send(frame).await.unwrap();
            }
            let _ = ws.close(None).await;
        });

        format!("ws://{addr}")
    }

    #[tokio::test]
    async fn test_subscribe_yields_valid_notices_only() {
        let url = serve_once(vec![
            Message::Text(r#"{"message":"Successfully subscribed"}"#.to_string()),
            Message::Text(r#"{"mint":"MintA","symbol":"A"}"#.to_string()),
            Message::Text("garbage".to_string()),
            Message::Binary(vec![1, 2, 3]),
            Message::Text(r#"{"mint":"MintB"}"#.to_string()),
        ])
        .await;

        let listener = FeedListener::new(url);
        let notices: Vec<_> = listener.subscribe().await.unwrap().collect().await;

        let mints: Vec<_> = notices.iter().map(|n| n.mint.as_str()).collect();
        assert_eq!(mints, vec!["MintA", "MintB"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_feed_ends_after_idle_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            ws.next().await.unwrap().unwrap();
            // Hold the socket open without reading or writing
            let _ = done_rx.await;
            drop(ws);
        });

        let feed = FeedListener::new(format!("ws://{addr}"))
            .with_keepalive(Duration::from_secs(30), Duration::from_secs(90));
        let mut stream = feed.subscribe().await.unwrap();

        let next = tokio::time::timeout(Duration::from_secs(600), stream.next()).await;
        assert!(matches!(next, Ok(None)), "silent feed must end the stream");
        let _ = done_tx.send(());
    }

    #[tokio::test]
    async fn test_subscribe_connection_refused() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = FeedListener::new(format!("ws://{addr}")).subscribe().await;
        assert!(matches!(result, Err(FeedError::Transport(_))));
    }
}
