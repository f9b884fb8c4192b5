//! Typed operation dispatch: the surface outer layers call into.
//!
//! Callers hand over an operation kind and a JSON argument object; the
//! registry binds each kind to a statically-typed build function at
//! construction, so an unbound operation is a startup-time defect instead of
//! a mid-request lookup failure. Execution itself acquires the address lane,
//! opens a session, builds the message, and drives the pipeline, folding any
//! error into a structured report.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::chain::{ChainRpc, ChainSession, wire};
use crate::config::NetworkConfig;
use crate::error::{ChainError, ChainResult, FailurePayload};
use crate::identity::KeyedIdentity;
use crate::msg::{MessageBuilder, OperationKind, Sender};
use crate::pipeline::{
    self, BroadcastReceipt, PreparedTransaction, TransactionPipeline,
};
use crate::queue::AccountLaneRegistry;

/// Builds one operation's wire message from untyped JSON arguments.
pub type BuildFn = fn(&MessageBuilder<'_>, serde_json::Value) -> ChainResult<wire::Any>;

/// Operation kind to build function, filled exhaustively at construction.
pub struct DispatchRegistry {
    handlers: HashMap<OperationKind, BuildFn>,
}

impl DispatchRegistry {
    pub fn new() -> Self {
        let mut handlers: HashMap<OperationKind, BuildFn> = HashMap::new();
        for kind in OperationKind::ALL {
            handlers.insert(kind, handler_for(kind));
        }
        Self { handlers }
    }

    pub fn handler(&self, kind: OperationKind) -> ChainResult<BuildFn> {
        self.handlers
            .get(&kind)
            .copied()
            .ok_or_else(|| ChainError::Unknown {
                cause: format!("no handler bound for operation '{kind}'"),
            })
    }

    pub fn kinds(&self) -> impl Iterator<Item = OperationKind> + '_ {
        self.handlers.keys().copied()
    }
}

impl Default for DispatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The exhaustive kind-to-builder mapping. A new [`OperationKind`] variant
/// fails compilation here until it gets a builder.
fn handler_for(kind: OperationKind) -> BuildFn {
    match kind {
        OperationKind::Transfer => |b, v| b.transfer(&decode(v)?),
        OperationKind::SubaccountTransfer => |b, v| b.subaccount_transfer(&decode(v)?),
        OperationKind::ExternalTransfer => |b, v| b.external_transfer(&decode(v)?),
        OperationKind::DerivativeLimitOrder => |b, v| b.derivative_limit_order(&decode(v)?),
        OperationKind::DerivativeMarketOrder => |b, v| b.derivative_market_order(&decode(v)?),
        OperationKind::SpotLimitOrder => |b, v| b.spot_limit_order(&decode(v)?),
        OperationKind::SpotMarketOrder => |b, v| b.spot_market_order(&decode(v)?),
        OperationKind::CancelOrder => |b, v| b.cancel_order(&decode(v)?),
        OperationKind::Delegate => |b, v| b.delegate(&decode(v)?),
        OperationKind::CreateDenom => |b, v| b.create_denom(&decode(v)?),
        OperationKind::Mint => |b, v| b.mint(&decode(v)?),
        OperationKind::Burn => |b, v| b.burn(&decode(v)?),
        OperationKind::SetDenomMetadata => |b, v| b.set_denom_metadata(&decode(v)?),
        OperationKind::ContractExecute => |b, v| b.contract_execute(&decode(v)?),
        OperationKind::AuctionBid => |b, v| b.auction_bid(&decode(v)?),
        OperationKind::AuthzGrant => |b, v| b.authz_grant(&decode(v)?),
        OperationKind::AuthzRevoke => |b, v| b.authz_revoke(&decode(v)?),
        OperationKind::SendToEth => |b, v| b.send_to_eth(&decode(v)?),
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> ChainResult<T> {
    serde_json::from_value(value).map_err(|e| ChainError::InvalidArgument {
        field: "arguments".to_string(),
        reason: e.to_string(),
    })
}

/// Tagged outcome of one dispatched operation. Failures keep the error kind
/// machine-readable and carry gas figures when the transaction got as far as
/// a broadcast attempt.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub kind: OperationKind,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_wanted: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_fee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_paid: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broadcast_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FailurePayload>,
}

impl ExecutionReport {
    fn success(kind: OperationKind, receipt: BroadcastReceipt) -> Self {
        Self {
            kind,
            success: true,
            tx_hash: Some(receipt.tx_hash),
            height: Some(receipt.height),
            gas_wanted: Some(receipt.gas_wanted),
            gas_fee: Some(receipt.gas_fee),
            fee_paid: Some(receipt.fee_paid),
            broadcast_at: Some(receipt.broadcast_at),
            error: None,
        }
    }

    fn failure(kind: OperationKind, err: &ChainError) -> Self {
        let (gas_wanted, gas_fee) = match err {
            ChainError::BroadcastRejected {
                gas_wanted,
                gas_fee,
                ..
            } => (Some(*gas_wanted), Some(gas_fee.clone())),
            _ => (None, None),
        };
        Self {
            kind,
            success: false,
            tx_hash: None,
            height: None,
            gas_wanted,
            gas_fee,
            fee_paid: None,
            broadcast_at: None,
            error: Some(err.to_failure_payload()),
        }
    }
}

/// Entry point wiring registry, lanes, transport, and network config
/// together. One dispatcher serves any number of identities; lanes keep
/// concurrent calls against the same address serialized.
pub struct Dispatcher {
    registry: DispatchRegistry,
    lanes: AccountLaneRegistry,
    rpc: Arc<dyn ChainRpc>,
    config: NetworkConfig,
}

impl Dispatcher {
    pub fn new(rpc: Arc<dyn ChainRpc>, config: NetworkConfig) -> Self {
        Self {
            registry: DispatchRegistry::new(),
            lanes: AccountLaneRegistry::new(),
            rpc,
            config,
        }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Self-signing path: build, simulate, sign, broadcast. Never returns an
    /// `Err`; every outcome is folded into the report so callers branch on
    /// `success` and `error.kind` instead of catching.
    pub async fn execute(
        &self,
        kind: OperationKind,
        arguments: serde_json::Value,
        identity: &KeyedIdentity,
    ) -> ExecutionReport {
        match self.run(kind, arguments, identity).await {
            Ok(receipt) => {
                tracing::info!(
                    operation = %kind,
                    tx_hash = %receipt.tx_hash,
                    gas_wanted = receipt.gas_wanted,
                    "operation broadcast"
                );
                ExecutionReport::success(kind, receipt)
            }
            Err(err) => {
                tracing::warn!(
                    operation = %kind,
                    error = %err,
                    kind = ?err.kind(),
                    "operation failed"
                );
                ExecutionReport::failure(kind, &err)
            }
        }
    }

    async fn run(
        &self,
        kind: OperationKind,
        arguments: serde_json::Value,
        identity: &KeyedIdentity,
    ) -> ChainResult<BroadcastReceipt> {
        let build = self.registry.handler(kind)?;

        // The lane covers the whole run, sequence read through broadcast.
        let _permit = self.lanes.acquire(identity.address()).await;
        let mut session =
            ChainSession::initialize(self.rpc.clone(), self.config.clone(), identity.address())
                .await?;

        let sender = Sender::from_identity(identity);
        let message = {
            let builder = MessageBuilder::new(&sender, session.denoms());
            build(&builder, arguments)?
        };

        TransactionPipeline::new(&mut session, identity)
            .execute(vec![message])
            .await
    }

    /// External-signing path, step one: build the unsigned envelope for an
    /// address whose key lives elsewhere.
    pub async fn prepare(
        &self,
        kind: OperationKind,
        arguments: serde_json::Value,
        address: &str,
    ) -> ChainResult<PreparedTransaction> {
        let build = self.registry.handler(kind)?;
        let sender = Sender::from_address(address)?;
        let session =
            ChainSession::initialize(self.rpc.clone(), self.config.clone(), sender.address())
                .await?;

        let message = {
            let builder = MessageBuilder::new(&sender, session.denoms());
            build(&builder, arguments)?
        };
        pipeline::prepare_unsigned(&session, vec![message])
    }

    /// External-signing path, step two: broadcast bytes signed elsewhere.
    pub async fn broadcast_signed(
        &self,
        address: &str,
        tx_bytes: &[u8],
    ) -> ChainResult<BroadcastReceipt> {
        let sender = Sender::from_address(address)?;
        let _permit = self.lanes.acquire(sender.address()).await;
        let mut session =
            ChainSession::initialize(self.rpc.clone(), self.config.clone(), sender.address())
                .await?;
        pipeline::broadcast_pre_signed(&mut session, tx_bytes).await
    }
}
