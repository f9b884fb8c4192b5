//! Dispatch surface tests: report shapes and argument handling through the
//! public API.
//!
//! The execution report is consumed by callers that only speak JSON, so its
//! serialized shape is part of the contract: optional fields disappear when
//! absent, error payloads carry a stable machine-readable kind, and the
//! prepared-transaction bundle survives a JSON round trip unchanged.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;

use injagent::chain::{
    AccountEntry, ChainRpc, MarketListing, RawBalance, SimulationOutcome, TxAck, TxStatus,
};
use injagent::config::{Network, NetworkConfig};
use injagent::dispatch::Dispatcher;
use injagent::error::{ChainError, ChainResult};
use injagent::identity::KeyedIdentity;
use injagent::msg::OperationKind;
use injagent::pipeline::PreparedTransaction;

const KEY_ONE: &str = "0000000000000000000000000000000000000000000000000000000000000001";
const KEY_TWO: &str = "0000000000000000000000000000000000000000000000000000000000000002";

fn test_config() -> NetworkConfig {
    let mut config = NetworkConfig::for_network(Network::Testnet);
    config.gas_price = 500_000_000;
    config.gas_buffer = 20_000;
    config
}

fn signer() -> KeyedIdentity {
    KeyedIdentity::from_hex(&SecretString::from(KEY_ONE.to_string())).expect("test key")
}

fn recipient_address() -> String {
    KeyedIdentity::from_hex(&SecretString::from(KEY_TWO.to_string()))
        .expect("test key")
        .address()
        .to_string()
}

fn transfer_args() -> serde_json::Value {
    json!({
        "to_address": recipient_address(),
        "amount": "0.5",
        "denom": "inj",
    })
}

/// Fixed-script chain: one account, 100k simulated gas, and a configurable
/// broadcast verdict.
struct StubChain {
    broadcast_code: u32,
    simulate_calls: AtomicU32,
    broadcast_calls: AtomicU32,
}

impl StubChain {
    fn accepting() -> Self {
        Self::with_code(0)
    }

    fn with_code(broadcast_code: u32) -> Self {
        Self {
            broadcast_code,
            simulate_calls: AtomicU32::new(0),
            broadcast_calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl ChainRpc for StubChain {
    async fn account(&self, _address: &str) -> ChainResult<AccountEntry> {
        Ok(AccountEntry {
            account_number: 9,
            sequence: 3,
        })
    }

    async fn simulate(&self, _tx_bytes: &[u8]) -> ChainResult<SimulationOutcome> {
        self.simulate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(SimulationOutcome {
            gas_used: 100_000,
            gas_wanted: 0,
        })
    }

    async fn broadcast_sync(&self, _tx_bytes: &[u8]) -> ChainResult<TxAck> {
        self.broadcast_calls.fetch_add(1, Ordering::SeqCst);
        if self.broadcast_code == 0 {
            Ok(TxAck {
                tx_hash: "F00D".to_string(),
                code: 0,
                raw_log: String::new(),
                height: 0,
            })
        } else {
            Ok(TxAck {
                tx_hash: "F00D".to_string(),
                code: self.broadcast_code,
                raw_log: "spendable balance is smaller than fee".to_string(),
                height: 0,
            })
        }
    }

    async fn latest_block_height(&self) -> ChainResult<u64> {
        Ok(500)
    }

    async fn denom_decimals(&self) -> ChainResult<HashMap<String, u32>> {
        Ok(HashMap::new())
    }

    async fn derivative_markets(&self) -> ChainResult<Vec<MarketListing>> {
        Ok(Vec::new())
    }

    async fn spot_markets(&self) -> ChainResult<Vec<MarketListing>> {
        Ok(Vec::new())
    }

    async fn balances(&self, _address: &str) -> ChainResult<Vec<RawBalance>> {
        Ok(Vec::new())
    }

    async fn tx_by_hash(&self, tx_hash: &str) -> ChainResult<TxStatus> {
        Ok(TxStatus {
            tx_hash: tx_hash.to_string(),
            height: 501,
            code: 0,
            raw_log: String::new(),
            gas_wanted: 0,
            gas_used: 0,
        })
    }
}

#[tokio::test]
async fn test_success_report_has_only_result_fields() {
    let dispatcher = Dispatcher::new(Arc::new(StubChain::accepting()), test_config());

    let report = dispatcher
        .execute(OperationKind::Transfer, transfer_args(), &signer())
        .await;
    assert!(report.success, "{:?}", report.error);

    let value = serde_json::to_value(&report).expect("report serializes");
    let mut keys: Vec<&str> = value
        .as_object()
        .expect("object")
        .keys()
        .map(String::as_str)
        .collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec![
            "broadcast_at",
            "fee_paid",
            "gas_fee",
            "gas_wanted",
            "height",
            "kind",
            "success",
            "tx_hash",
        ]
    );
    assert_eq!(value["kind"], "transfer");
    assert_eq!(value["tx_hash"], "F00D");
    assert_eq!(value["gas_wanted"], 120_000);
    assert_eq!(value["gas_fee"], "60000000000000inj");
    assert_eq!(value["fee_paid"], "0.00006");
}

#[tokio::test]
async fn test_bad_arguments_fold_into_the_report_before_simulation() {
    let chain = Arc::new(StubChain::accepting());
    let dispatcher = Dispatcher::new(chain.clone(), test_config());

    let report = dispatcher
        .execute(OperationKind::Transfer, json!({ "amount": "1" }), &signer())
        .await;

    assert!(!report.success);
    assert!(report.tx_hash.is_none());
    assert!(report.gas_wanted.is_none());
    let error = report.error.expect("failure payload");
    assert!(!error.retryable);
    assert!(error.message.contains("arguments"));

    let value = serde_json::to_value(&error).expect("payload serializes");
    assert_eq!(value["kind"], "invalid_argument");

    assert_eq!(chain.simulate_calls.load(Ordering::SeqCst), 0);
    assert_eq!(chain.broadcast_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_rejected_broadcast_report_keeps_gas_figures() {
    let dispatcher = Dispatcher::new(Arc::new(StubChain::with_code(13)), test_config());

    let report = dispatcher
        .execute(OperationKind::Transfer, transfer_args(), &signer())
        .await;

    assert!(!report.success);
    assert_eq!(report.gas_wanted, Some(120_000));
    assert_eq!(report.gas_fee.as_deref(), Some("60000000000000inj"));

    let value = serde_json::to_value(&report).expect("report serializes");
    assert_eq!(value["error"]["kind"], "broadcast_rejected");
    assert_eq!(value["error"]["retryable"], false);
    assert!(
        value["error"]["message"]
            .as_str()
            .expect("message string")
            .contains("spendable balance")
    );
}

#[tokio::test]
async fn test_auction_bid_executes_through_the_pipeline() {
    let dispatcher = Dispatcher::new(Arc::new(StubChain::accepting()), test_config());

    let report = dispatcher
        .execute(
            OperationKind::AuctionBid,
            json!({ "round": 12, "amount": "2" }),
            &signer(),
        )
        .await;

    assert!(report.success, "{:?}", report.error);
    assert_eq!(report.tx_hash.as_deref(), Some("F00D"));
    let value = serde_json::to_value(&report).expect("report serializes");
    assert_eq!(value["kind"], "auction-bid");
}

#[tokio::test]
async fn test_every_kind_is_wired_through_the_dispatcher() {
    let dispatcher = Dispatcher::new(Arc::new(StubChain::accepting()), test_config());
    let address = signer().address().to_string();

    // Empty arguments must hit each kind's decoder, never a missing handler.
    for kind in OperationKind::ALL {
        let err = dispatcher
            .prepare(kind, json!({}), &address)
            .await
            .unwrap_err();
        assert!(
            matches!(err, ChainError::InvalidArgument { .. }),
            "{kind}: expected argument error, got {err}"
        );
    }
}

#[tokio::test]
async fn test_prepared_bundle_survives_a_json_round_trip() {
    let dispatcher = Dispatcher::new(Arc::new(StubChain::accepting()), test_config());

    let prepared = dispatcher
        .prepare(
            OperationKind::Transfer,
            transfer_args(),
            signer().address(),
        )
        .await
        .expect("prepare succeeds");

    let encoded = serde_json::to_string(&prepared).expect("bundle serializes");
    let decoded: PreparedTransaction = serde_json::from_str(&encoded).expect("bundle parses");

    assert_eq!(
        serde_json::to_value(&decoded).expect("value"),
        serde_json::to_value(&prepared).expect("value")
    );
    assert_eq!(decoded.sequence, 3);
    assert_eq!(decoded.account_number, 9);
    assert_eq!(decoded.chain_id, test_config().chain_id);
}
