//! Sniper orchestration.
//!
//! Subscribes to the new-token feed and hands every notice to the
//! lifecycle engine, resubscribing whenever the feed drops.

use anyhow::Result;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::engine::{Discovery, LifecycleEngine};
use sniper_feed::{FeedListener, NewTokenNotice};

/// Feed-to-engine host.
#[derive(Debug, Clone)]
pub struct Sniper {
    engine: LifecycleEngine,
    feed: Arc<FeedListener>,
    reconnect_delay: Duration,
}

impl Sniper {
    pub fn new(engine: LifecycleEngine, feed: Arc<FeedListener>, reconnect_delay: Duration) -> Self {
        Self {
            engine,
            feed,
            reconnect_delay,
        }
    }

    pub fn engine(&self) -> &LifecycleEngine {
        &self.engine
    }

    /// Run forever, resubscribing after every disconnect.
    pub async fn run(&self) -> Result<()> {
        info!(feed = %self.feed.ws_url(), "Starting sniper event loop...");

        loop {
            match self.feed_loop().await {
                Ok(count) => {
                    warn!(
                        notices = count,
                        delay_secs = self.reconnect_delay.as_secs(),
                        "Feed ended, reconnecting..."
                    );
                }
                Err(e) => {
                    error!(
                        error = %e,
                        delay_secs = self.reconnect_delay.as_secs(),
                        "Feed failed, reconnecting..."
                    );
                }
            }
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    /// One subscription: connect, then pump notices until the stream ends.
    async fn feed_loop(&self) -> Result<usize> {
        let stream = self.feed.subscribe().await?;
        info!("Feed subscription active - waiting for new tokens...");
        Ok(self.pump(stream).await)
    }

    /// Dispatch every notice from `stream` to the engine, one task each.
    ///
    /// Returns once the stream has ended and every dispatched discovery has
    /// finished. Yields the number of notices dispatched.
    pub async fn pump<S>(&self, mut stream: S) -> usize
    where
        S: Stream<Item = NewTokenNotice> + Unpin,
    {
        let mut inflight = JoinSet::new();
        let mut dispatched = 0;

        loop {
            tokio::select! {
                notice = stream.next() => match notice {
                    Some(notice) => {
                        dispatched += 1;
                        self.dispatch(&mut inflight, notice);
                    }
                    None => break,
                },
                Some(joined) = inflight.join_next(), if !inflight.is_empty() => {
                    log_join(joined);
                }
            }
        }

        while let Some(joined) = inflight.join_next().await {
            log_join(joined);
        }

        dispatched
    }

    fn dispatch(&self, inflight: &mut JoinSet<Discovery>, notice: NewTokenNotice) {
        info!(
            mint = %notice.mint,
            name = notice.name.as_deref().unwrap_or("?"),
            symbol = notice.symbol.as_deref().unwrap_or("?"),
            "New token"
        );

        let engine = self.engine.clone();
        inflight.spawn(async move { engine.on_asset_discovered(&notice.mint).await });
    }
}

fn log_join(joined: Result<Discovery, tokio::task::JoinError>) {
    match joined {
        Ok(outcome) => debug!(?outcome, "Discovery finished"),
        Err(e) => error!(error = %e, "Discovery task panicked"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use async_trait::async_trait;
    use futures::SinkExt;
    use sniper_api::{DryRunExecutor, LookupError, Quote, ValuationSource};
    use sniper_feed::subscribe_request;
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;
    use tokio_tungstenite::accept_async;
    use tokio_tungstenite::tungstenite::Message;

    struct FlatValuation;

    #[async_trait]
    impl ValuationSource for FlatValuation {
        async fn quote(&self, _mint: &str) -> Result<Quote, LookupError> {
            Ok(Quote::new(100.0, 0.0))
        }
    }

    #[tokio::test]
    async fn test_run_resubscribes_after_feed_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (resub_tx, resub_rx) = oneshot::channel();

        tokio::spawn(async move {
            // First connection: one notice, then a server close
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            let first = ws.next().await.unwrap().unwrap();
            assert_eq!(first, Message::Text(subscribe_request()));
            ws.send(Message::Text(r#"{"mint":"A"}"#.to_string()))
                .await
                .unwrap();
            let _ = ws.close(None).await;
            drop(ws);

            // Second connection must open with a fresh subscription
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            let again = ws.next().await.unwrap().unwrap();
            let _ = resub_tx.send(again);
            let _ = ws.next().await;
        });

        let executor = Arc::new(DryRunExecutor::new());
        let engine = LifecycleEngine::new(
            Arc::new(FlatValuation),
            executor.clone(),
            EngineConfig::default(),
        );
        let sniper = Sniper::new(
            engine,
            Arc::new(FeedListener::new(format!("ws://{addr}"))),
            Duration::from_millis(10),
        );

        let resubscribe = tokio::time::timeout(Duration::from_secs(10), async {
            tokio::select! {
                _ = sniper.run() => unreachable!("run loops until cancelled"),
                msg = resub_rx => msg.unwrap(),
            }
        })
        .await
        .expect("sniper did not resubscribe");

        assert_eq!(resubscribe, Message::Text(subscribe_request()));
        assert!(sniper.engine().has_seen("A"));
        assert_eq!(executor.trade_count(), 1);

        sniper.engine().shutdown().await;
    }
}
