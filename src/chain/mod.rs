//! Chain access: the transport seam, per-account state, and the session
//! facade the pipeline drives.

pub mod lcd;
pub mod wire;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::NetworkConfig;
use crate::error::{ChainError, ChainResult};

/// Account number and sequence as fetched from the auth module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountEntry {
    pub account_number: u64,
    pub sequence: u64,
}

/// Gas measurements returned by a simulate call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationOutcome {
    pub gas_used: u64,
    pub gas_wanted: u64,
}

/// Sync-mode broadcast acknowledgement, verbatim from the node. `code == 0`
/// means the transaction passed mempool validation; anything else is a
/// rejection with the reason in `raw_log`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxAck {
    pub tx_hash: String,
    pub code: u32,
    pub raw_log: String,
    pub height: u64,
}

/// One row of a market listing: human ticker to on-chain market id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketListing {
    pub ticker: String,
    pub market_id: String,
}

/// Raw bank balance in the denom's smallest unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBalance {
    pub denom: String,
    pub amount: String,
}

/// Status of an already-broadcast transaction, used for reconciliation after
/// an indeterminate timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxStatus {
    pub tx_hash: String,
    pub height: u64,
    pub code: u32,
    pub raw_log: String,
    pub gas_wanted: u64,
    pub gas_used: u64,
}

/// Transport seam for chain access.
///
/// [`lcd::LcdClient`] is the production implementation; tests substitute
/// in-memory mocks to drive the pipeline without a network.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn account(&self, address: &str) -> ChainResult<AccountEntry>;
    async fn simulate(&self, tx_bytes: &[u8]) -> ChainResult<SimulationOutcome>;
    async fn broadcast_sync(&self, tx_bytes: &[u8]) -> ChainResult<TxAck>;
    async fn latest_block_height(&self) -> ChainResult<u64>;
    async fn denom_decimals(&self) -> ChainResult<HashMap<String, u32>>;
    async fn derivative_markets(&self) -> ChainResult<Vec<MarketListing>>;
    async fn spot_markets(&self) -> ChainResult<Vec<MarketListing>>;
    async fn balances(&self, address: &str) -> ChainResult<Vec<RawBalance>>;
    async fn tx_by_hash(&self, tx_hash: &str) -> ChainResult<TxStatus>;
}

/// Denom → decimal-places table for converting between human decimal amounts
/// and chain integer units.
#[derive(Debug, Clone, Default)]
pub struct DenomBook {
    decimals: HashMap<String, u32>,
}

impl DenomBook {
    pub fn new(mut decimals: HashMap<String, u32>) -> Self {
        // The native denom is not part of the exchange listing.
        decimals.entry("inj".to_string()).or_insert(18);
        Self { decimals }
    }

    pub fn decimals_for(&self, denom: &str) -> Option<u32> {
        self.decimals.get(denom).copied()
    }

    /// Scale a human decimal amount into the denom's smallest unit.
    ///
    /// Rejects amounts with more fractional precision than the denom carries
    /// rather than silently truncating.
    pub fn to_chain_units(&self, amount: Decimal, denom: &str) -> ChainResult<String> {
        let places = self
            .decimals_for(denom)
            .ok_or_else(|| ChainError::InvalidArgument {
                field: "denom".to_string(),
                reason: format!("no decimals known for denom '{denom}'"),
            })?;
        scale_to_integer(amount, places).ok_or_else(|| ChainError::InvalidArgument {
            field: "amount".to_string(),
            reason: format!("'{amount}' does not fit {places} decimal places for '{denom}'"),
        })
    }

    /// Convert a raw integer amount back to a human decimal. `None` when the
    /// denom or the raw amount cannot be interpreted; callers report raw.
    pub fn to_human(&self, raw_amount: &str, denom: &str) -> Option<Decimal> {
        let places = self.decimals_for(denom)?;
        let units: i128 = raw_amount.parse().ok()?;
        Decimal::try_from_i128_with_scale(units, places).ok()
    }
}

/// Multiply `amount` by `10^places` and render the resulting integer, or
/// `None` on leftover fraction or overflow.
pub(crate) fn scale_to_integer(amount: Decimal, places: u32) -> Option<String> {
    let mut scaled = amount;
    // Decimal scale tops out at 28, so step through factors of 10^10.
    let mut remaining = places;
    while remaining > 0 {
        let step = remaining.min(10);
        scaled = scaled.checked_mul(Decimal::from(10u64.pow(step)))?;
        remaining -= step;
    }
    if !scaled.fract().is_zero() {
        return None;
    }
    Some(scaled.trunc().normalize().to_string())
}

/// Balance with its human-decimal rendering when the denom is known.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HumanBalance {
    pub denom: String,
    pub raw_amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
}

/// Mutable per-account counters. Owned exclusively by one [`ChainSession`];
/// the sequence advances only after a successful broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountState {
    pub account_number: u64,
    pub sequence: u64,
}

/// One account's view of the chain for the lifetime of a logical operation
/// sequence: network config, transport handle, account counters, and the
/// message-composition metadata fetched at startup.
///
/// Sessions are constructed per request and never shared across accounts.
/// Two sessions on the same account race on the starting sequence; callers
/// wanting concurrency go through the per-address lane registry instead.
pub struct ChainSession {
    rpc: Arc<dyn ChainRpc>,
    config: NetworkConfig,
    address: String,
    account: AccountState,
    timeout_height: u64,
    denoms: DenomBook,
}

impl std::fmt::Debug for ChainSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // `rpc` is a trait object without a `Debug` bound.
        f.debug_struct("ChainSession")
            .field("config", &self.config)
            .field("address", &self.address)
            .field("account", &self.account)
            .field("timeout_height", &self.timeout_height)
            .field("denoms", &self.denoms)
            .finish_non_exhaustive()
    }
}

impl ChainSession {
    /// Open a session: fetch account number/sequence, snapshot the chain
    /// height for timeout computation, and load the denom table.
    pub async fn initialize(
        rpc: Arc<dyn ChainRpc>,
        config: NetworkConfig,
        address: &str,
    ) -> ChainResult<Self> {
        let entry = rpc.account(address).await?;
        let height = rpc.latest_block_height().await?;
        let denoms = DenomBook::new(rpc.denom_decimals().await?);

        tracing::debug!(
            address,
            account_number = entry.account_number,
            sequence = entry.sequence,
            height,
            network = %config.network,
            "chain session initialized"
        );

        Ok(Self {
            timeout_height: height + config.timeout_height_horizon,
            rpc,
            config,
            address: address.to_string(),
            account: AccountState {
                account_number: entry.account_number,
                sequence: entry.sequence,
            },
            denoms,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn account_state(&self) -> AccountState {
        self.account
    }

    /// Expiry height for transactions finalized against this session:
    /// the height observed at initialization plus the configured horizon.
    /// Sessions are per-operation, so the snapshot is effectively current.
    pub fn timeout_height(&self) -> u64 {
        self.timeout_height
    }

    pub fn denoms(&self) -> &DenomBook {
        &self.denoms
    }

    pub async fn simulate(&self, tx_bytes: &[u8]) -> ChainResult<SimulationOutcome> {
        self.rpc.simulate(tx_bytes).await
    }

    /// Submit in sync mode. The local sequence advances by exactly one when
    /// the node accepts the transaction (`code == 0`) and not otherwise, so a
    /// rejected broadcast leaves the account state aligned with the chain.
    pub async fn broadcast_sync(&mut self, tx_bytes: &[u8]) -> ChainResult<TxAck> {
        let ack = self.rpc.broadcast_sync(tx_bytes).await?;
        if ack.code == 0 {
            self.account.sequence += 1;
            tracing::info!(
                tx_hash = %ack.tx_hash,
                sequence = self.account.sequence,
                "broadcast accepted"
            );
        } else {
            tracing::warn!(
                tx_hash = %ack.tx_hash,
                code = ack.code,
                raw_log = %ack.raw_log,
                "broadcast rejected by node"
            );
        }
        Ok(ack)
    }

    /// Re-fetch account counters and the height snapshot. The only
    /// sanctioned way to resync after an out-of-band sequence change.
    pub async fn refresh(&mut self) -> ChainResult<()> {
        let entry = self.rpc.account(&self.address).await?;
        let height = self.rpc.latest_block_height().await?;
        self.account = AccountState {
            account_number: entry.account_number,
            sequence: entry.sequence,
        };
        self.timeout_height = height + self.config.timeout_height_horizon;
        Ok(())
    }

    /// Bank balances for the session address, converted to human decimals
    /// where the denom table knows the precision.
    pub async fn balances(&self) -> ChainResult<Vec<HumanBalance>> {
        let raw = self.rpc.balances(&self.address).await?;
        Ok(raw
            .into_iter()
            .map(|b| HumanBalance {
                amount: self.denoms.to_human(&b.amount, &b.denom),
                denom: b.denom,
                raw_amount: b.amount,
            })
            .collect())
    }

    /// Look up a broadcast transaction for post-timeout reconciliation.
    pub async fn tx_by_hash(&self, tx_hash: &str) -> ChainResult<TxStatus> {
        self.rpc.tx_by_hash(tx_hash).await
    }
}
