//! End-to-end lifecycle: notices in, paper trades out.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use sniper_api::{DryRunExecutor, LookupError, Quote, TradeAction, TradeAmount, ValuationSource};
use sniper_core::{AssetState, EngineConfig, LifecycleEngine, Sniper};
use sniper_feed::{FeedListener, NewTokenNotice};

/// Per-mint valuations; unknown mints fail the lookup.
#[derive(Default)]
struct MarketBoard {
    quotes: Mutex<HashMap<String, (f64, f64)>>,
}

impl MarketBoard {
    fn set(&self, mint: &str, valuation: f64, progress: f64) {
        self.quotes.lock().insert(mint.to_string(), (valuation, progress));
    }
}

#[async_trait]
impl ValuationSource for MarketBoard {
    async fn quote(&self, mint: &str) -> Result<Quote, LookupError> {
        self.quotes
            .lock()
            .get(mint)
            .map(|&(valuation, progress)| Quote::new(valuation, progress))
            .ok_or(LookupError::MissingField("market cap"))
    }
}

fn sniper(board: &Arc<MarketBoard>, executor: &Arc<DryRunExecutor>) -> Sniper {
    let engine = LifecycleEngine::new(board.clone(), executor.clone(), EngineConfig::default());
    Sniper::new(
        engine,
        Arc::new(FeedListener::new("ws://127.0.0.1:1")),
        Duration::from_secs(5),
    )
}

/// (action, mint, amount) for every recorded trade.
fn trades(executor: &DryRunExecutor) -> Vec<(TradeAction, String, TradeAmount)> {
    executor
        .trades()
        .into_iter()
        .map(|t| (t.order.action, t.order.mint, t.order.amount))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_feed_notices_drive_full_lifecycle() {
    let board = Arc::new(MarketBoard::default());
    board.set("Alpha", 100.0, 0.0);
    board.set("Beta", 100.0, 0.0);
    let executor = Arc::new(DryRunExecutor::new());
    let sniper = sniper(&board, &executor);

    let notices = futures::stream::iter(vec![
        NewTokenNotice::new("Alpha"),
        NewTokenNotice::new("Beta"),
        NewTokenNotice::new("Alpha"),
    ]);
    assert_eq!(sniper.pump(notices).await, 3);

    let engine = sniper.engine();
    assert_eq!(engine.tracked_count(), 2);
    assert_eq!(executor.trade_count(), 2);
    assert_eq!(engine.state("Alpha").await, Some(AssetState::Monitoring));

    // Alpha rallies, Beta dumps
    board.set("Alpha", 130.0, 0.0);
    board.set("Beta", 85.0, 0.0);
    tokio::time::sleep(Duration::from_millis(5_001)).await;

    let recorded = trades(&executor);
    assert_eq!(recorded.len(), 4);
    assert!(recorded.contains(&(TradeAction::Sell, "Alpha".to_string(), TradeAmount::Percent(50))));
    assert!(recorded.contains(&(TradeAction::Sell, "Beta".to_string(), TradeAmount::Percent(100))));

    assert_eq!(engine.state("Beta").await, Some(AssetState::Closed));
    let alpha = engine.snapshot("Alpha").await.unwrap();
    assert!(alpha.partial_profit_taken);
    assert_eq!(alpha.reference_valuation, Some(130.0));

    // Redelivered after close: nothing happens
    sniper
        .pump(futures::stream::iter(vec![NewTokenNotice::new("Beta")]))
        .await;
    assert_eq!(executor.trade_count(), 4);

    assert_eq!(engine.shutdown().await, 1);
    assert_eq!(engine.active_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_one_failing_asset_does_not_stall_others() {
    let board = Arc::new(MarketBoard::default());
    board.set("Good", 100.0, 0.0);
    let executor = Arc::new(DryRunExecutor::new());
    let sniper = sniper(&board, &executor);

    // No quote for "Dark": bought, never monitored
    sniper
        .pump(futures::stream::iter(vec![
            NewTokenNotice::new("Dark"),
            NewTokenNotice::new("Good"),
        ]))
        .await;

    let engine = sniper.engine();
    assert_eq!(engine.state("Dark").await, Some(AssetState::Bought));
    assert_eq!(engine.state("Good").await, Some(AssetState::Monitoring));

    board.set("Good", 100.0, 1.5);
    tokio::time::sleep(Duration::from_millis(5_001)).await;

    let sells: Vec<_> = trades(&executor)
        .into_iter()
        .filter(|(action, _, _)| *action == TradeAction::Sell)
        .collect();
    assert_eq!(
        sells,
        vec![(TradeAction::Sell, "Good".to_string(), TradeAmount::Percent(75))]
    );
    assert_eq!(engine.state("Dark").await, Some(AssetState::Bought));
}
