//! Per-address transaction lanes.
//!
//! Two concurrent pipeline runs against one account read the same starting
//! sequence and the second broadcast dies on a sequence mismatch. The lane
//! registry closes that hazard without the caller tracking sequences: each
//! address gets a lane admitting one pipeline run at a time, waiters queue
//! in arrival order, and different addresses never contend.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Holding a permit means the pipeline run for that address is admitted.
/// Dropping it admits the next waiter.
#[derive(Debug)]
pub struct LanePermit {
    _guard: OwnedMutexGuard<()>,
}

/// One lane per account address, created on first use and kept for the
/// registry's lifetime. The registry is shared across sessions; a
/// `ChainSession` alone cannot see its neighbors.
#[derive(Default)]
pub struct AccountLaneRegistry {
    lanes: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AccountLaneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the address's lane. The underlying lock is fair, so permits
    /// are granted strictly in arrival order.
    pub async fn acquire(&self, address: &str) -> LanePermit {
        let lane = {
            let mut lanes = self.lanes.lock().await;
            lanes
                .entry(address.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let guard = lane.lock_owned().await;
        tracing::trace!(address, "transaction lane acquired");
        LanePermit { _guard: guard }
    }
}
