//! Paper-trading executor.
//!
//! Accepts every instruction without touching the network and keeps a log
//! of what would have been sent.

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::info;

use crate::error::ExecutionError;
use crate::execution::{ExecutionEndpoint, TradeOrder, TradeReceipt};

/// An instruction accepted in dry-run mode.
#[derive(Debug, Clone)]
pub struct RecordedTrade {
    pub order: TradeOrder,
    pub receipt: TradeReceipt,
}

/// Executor that never places real trades.
#[derive(Debug, Default)]
pub struct DryRunExecutor {
    trades: Mutex<Vec<RecordedTrade>>,
}

impl DryRunExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// All instructions recorded so far.
    pub fn trades(&self) -> Vec<RecordedTrade> {
        self.trades.lock().clone()
    }

    pub fn trade_count(&self) -> usize {
        self.trades.lock().len()
    }
}

#[async_trait]
impl ExecutionEndpoint for DryRunExecutor {
    async fn execute(&self, order: &TradeOrder) -> Result<TradeReceipt, ExecutionError> {
        let receipt = TradeReceipt::new(format!("dry-run-{}", uuid::Uuid::new_v4()));

        info!(
            action = %order.action,
            mint = %order.mint,
            amount = %order.amount,
            "[DRY RUN] Would send trade"
        );

        self.trades.lock().push(RecordedTrade {
            order: order.clone(),
            receipt: receipt.clone(),
        });

        Ok(receipt)
    }

    fn is_live(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dry_run_records_orders() {
        let executor = DryRunExecutor::new();
        executor.execute(&TradeOrder::buy("m1", 0.01)).await.unwrap();
        let receipt = executor.execute(&TradeOrder::sell("m1", 50)).await.unwrap();

        assert!(receipt.signature.starts_with("dry-run-"));
        assert_eq!(executor.trade_count(), 2);
        assert_eq!(executor.trades()[1].order, TradeOrder::sell("m1", 50));
        assert!(!executor.is_live());
    }
}
