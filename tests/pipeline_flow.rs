//! End-to-end transaction flow against a scripted in-memory chain.
//!
//! These tests drive the real session, message builder, signing, and dispatch
//! code; only the transport is substituted. Covered:
//! - simulated gas flowing into the broadcast fee, checked at the wire level
//! - a failed simulation aborting before any broadcast
//! - a mempool rejection surfacing the node's reason and the gas figures
//! - the account sequence climbing across sequential and concurrent runs
//! - the external-signing prepare / broadcast-signed round trip

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use prost::Message;
use rust_decimal_macros::dec;
use secrecy::SecretString;
use tokio::sync::Mutex;

use injagent::chain::wire::{self, TypedMessage};
use injagent::chain::{
    AccountEntry, ChainRpc, ChainSession, MarketListing, RawBalance, SimulationOutcome, TxAck,
    TxStatus,
};
use injagent::config::{Network, NetworkConfig};
use injagent::dispatch::Dispatcher;
use injagent::error::{ChainError, ChainResult};
use injagent::identity::KeyedIdentity;
use injagent::msg::OperationKind;
use injagent::pipeline::TransactionPipeline;

const KEY_ONE: &str = "0000000000000000000000000000000000000000000000000000000000000001";
const KEY_TWO: &str = "0000000000000000000000000000000000000000000000000000000000000002";

/// Testnet defaults with a 20k gas buffer, so 100k simulated gas prices out
/// to a 120k limit and a 60_000_000_000_000 inj fee.
fn test_config() -> NetworkConfig {
    let mut config = NetworkConfig::for_network(Network::Testnet);
    config.gas_price = 500_000_000;
    config.gas_buffer = 20_000;
    config
}

fn identity_one() -> KeyedIdentity {
    KeyedIdentity::from_hex(&SecretString::from(KEY_ONE.to_string())).expect("test key")
}

fn identity_two() -> KeyedIdentity {
    KeyedIdentity::from_hex(&SecretString::from(KEY_TWO.to_string())).expect("test key")
}

fn transfer_message(from: &str, to: &str) -> wire::Any {
    wire::MsgSend {
        from_address: from.to_string(),
        to_address: to.to_string(),
        amount: vec![wire::Coin {
            denom: "inj".to_string(),
            amount: "1000000000000000000".to_string(),
        }],
    }
    .to_any()
}

/// Scripted chain: serves one account at number 42, returns a fixed
/// simulation, and records every broadcast payload for wire-level assertions.
/// An accepted broadcast advances the stored sequence, the way the real auth
/// module does.
struct ScriptedChain {
    sequence: AtomicU64,
    gas_used: u64,
    simulate_error: Option<String>,
    broadcast_code: u32,
    simulate_calls: AtomicU32,
    broadcast_calls: AtomicU32,
    in_flight: AtomicBool,
    overlaps: AtomicU32,
    broadcasts: Mutex<Vec<Vec<u8>>>,
}

impl ScriptedChain {
    fn new() -> Self {
        Self {
            sequence: AtomicU64::new(7),
            gas_used: 100_000,
            simulate_error: None,
            broadcast_code: 0,
            simulate_calls: AtomicU32::new(0),
            broadcast_calls: AtomicU32::new(0),
            in_flight: AtomicBool::new(false),
            overlaps: AtomicU32::new(0),
            broadcasts: Mutex::new(Vec::new()),
        }
    }

    /// Signer sequences carried by the recorded broadcasts, in arrival order.
    async fn recorded_sequences(&self) -> Vec<u64> {
        let payloads = self.broadcasts.lock().await;
        payloads
            .iter()
            .map(|bytes| {
                let raw = wire::TxRaw::decode(bytes.as_slice()).expect("valid TxRaw");
                let auth = wire::AuthInfo::decode(raw.auth_info_bytes.as_slice())
                    .expect("valid AuthInfo");
                auth.signer_infos[0].sequence
            })
            .collect()
    }
}

#[async_trait]
impl ChainRpc for ScriptedChain {
    async fn account(&self, _address: &str) -> ChainResult<AccountEntry> {
        Ok(AccountEntry {
            account_number: 42,
            sequence: self.sequence.load(Ordering::SeqCst),
        })
    }

    async fn simulate(&self, _tx_bytes: &[u8]) -> ChainResult<SimulationOutcome> {
        self.simulate_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.simulate_error {
            return Err(ChainError::SimulationFailed {
                reason: reason.clone(),
            });
        }
        Ok(SimulationOutcome {
            gas_used: self.gas_used,
            gas_wanted: 0,
        })
    }

    async fn broadcast_sync(&self, tx_bytes: &[u8]) -> ChainResult<TxAck> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.store(false, Ordering::SeqCst);

        self.broadcast_calls.fetch_add(1, Ordering::SeqCst);
        self.broadcasts.lock().await.push(tx_bytes.to_vec());

        if self.broadcast_code == 0 {
            self.sequence.fetch_add(1, Ordering::SeqCst);
            Ok(TxAck {
                tx_hash: "CAFEBABE".to_string(),
                code: 0,
                raw_log: String::new(),
                height: 0,
            })
        } else {
            Ok(TxAck {
                tx_hash: "DEADBEEF".to_string(),
                code: self.broadcast_code,
                raw_log: "out of gas".to_string(),
                height: 0,
            })
        }
    }

    async fn latest_block_height(&self) -> ChainResult<u64> {
        Ok(1_000)
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
            height: 1_001,
            code: 0,
            raw_log: String::new(),
            gas_wanted: 0,
            gas_used: 0,
        })
    }
}

#[tokio::test]
async fn test_simulated_gas_drives_the_broadcast_fee() {
    let chain = Arc::new(ScriptedChain::new());
    let signer = identity_one();
    let mut session = ChainSession::initialize(chain.clone(), test_config(), signer.address())
        .await
        .expect("session initializes");

    let message = transfer_message(signer.address(), identity_two().address());
    let receipt = TransactionPipeline::new(&mut session, &signer)
        .execute(vec![message])
        .await
        .expect("pipeline completes");

    assert_eq!(receipt.tx_hash, "CAFEBABE");
    assert_eq!(receipt.gas_wanted, 120_000);
    assert_eq!(receipt.gas_fee, "60000000000000inj");
    assert_eq!(receipt.fee_paid, dec!(0.00006));
    assert_eq!(chain.simulate_calls.load(Ordering::SeqCst), 1);
    assert_eq!(chain.broadcast_calls.load(Ordering::SeqCst), 1);

    // Wire level: the broadcast envelope carries the derived fee, the
    // pre-broadcast sequence, and a timeout height above the current block.
    let payloads = chain.broadcasts.lock().await;
    let raw = wire::TxRaw::decode(payloads[0].as_slice()).expect("valid TxRaw");
    assert_eq!(raw.signatures.len(), 1);
    assert_eq!(raw.signatures[0].len(), 64);

    let auth = wire::AuthInfo::decode(raw.auth_info_bytes.as_slice()).expect("valid AuthInfo");
    let fee = auth.fee.expect("fee present");
    assert_eq!(fee.gas_limit, 120_000);
    assert_eq!(fee.amount[0].amount, "60000000000000");
    assert_eq!(fee.amount[0].denom, "inj");
    assert_eq!(auth.signer_infos[0].sequence, 7);

    let body = wire::TxBody::decode(raw.body_bytes.as_slice()).expect("valid TxBody");
    assert_eq!(body.messages.len(), 1);
    assert_eq!(body.memo, "");
    assert_eq!(body.timeout_height, 1_020);

    drop(payloads);
    // The session advanced with the chain.
    assert_eq!(session.account_state().sequence, 8);
}

#[tokio::test]
async fn test_failed_simulation_stops_before_broadcast() {
    let chain = Arc::new(ScriptedChain {
        simulate_error: Some("insufficient funds".to_string()),
        ..ScriptedChain::new()
    });
    let signer = identity_one();
    let mut session = ChainSession::initialize(chain.clone(), test_config(), signer.address())
        .await
        .expect("session initializes");

    let message = transfer_message(signer.address(), identity_two().address());
    let err = TransactionPipeline::new(&mut session, &signer)
        .execute(vec![message])
        .await
        .unwrap_err();

    assert!(matches!(err, ChainError::SimulationFailed { .. }));
    assert!(err.to_string().contains("insufficient funds"));
    assert_eq!(chain.broadcast_calls.load(Ordering::SeqCst), 0);
    assert_eq!(session.account_state().sequence, 7);
}

#[tokio::test]
async fn test_mempool_rejection_reports_reason_and_gas_figures() {
    let chain = Arc::new(ScriptedChain {
        broadcast_code: 13,
        ..ScriptedChain::new()
    });
    let signer = identity_one();
    let mut session = ChainSession::initialize(chain.clone(), test_config(), signer.address())
        .await
        .expect("session initializes");

    let message = transfer_message(signer.address(), identity_two().address());
    let err = TransactionPipeline::new(&mut session, &signer)
        .execute(vec![message])
        .await
        .unwrap_err();

    match err {
        ChainError::BroadcastRejected {
            code,
            reason,
            gas_wanted,
            gas_fee,
        } => {
            assert_eq!(code, 13);
            assert_eq!(reason, "out of gas");
            assert_eq!(gas_wanted, 120_000);
            assert_eq!(gas_fee, "60000000000000inj");
        }
        other => panic!("expected BroadcastRejected, got {other:?}"),
    }

    // The node never accepted it, so the local sequence must not move.
    assert_eq!(session.account_state().sequence, 7);
}

#[tokio::test]
async fn test_sequence_climbs_across_sequential_operations() {
    let chain = Arc::new(ScriptedChain::new());
    let dispatcher = Dispatcher::new(chain.clone(), test_config());
    let signer = identity_one();

    let args = serde_json::json!({
        "to_address": identity_two().address(),
        "amount": "0.25",
        "denom": "inj",
    });
    let first = dispatcher
        .execute(OperationKind::Transfer, args.clone(), &signer)
        .await;
    let second = dispatcher
        .execute(OperationKind::Transfer, args, &signer)
        .await;

    assert!(first.success, "first failed: {:?}", first.error);
    assert!(second.success, "second failed: {:?}", second.error);
    assert_eq!(chain.recorded_sequences().await, vec![7, 8]);
}

#[tokio::test]
async fn test_concurrent_operations_on_one_account_serialize() {
    let chain = Arc::new(ScriptedChain::new());
    let dispatcher = Arc::new(Dispatcher::new(chain.clone(), test_config()));

    let args = serde_json::json!({
        "to_address": identity_two().address(),
        "amount": "0.1",
        "denom": "inj",
    });

    let mut handles = Vec::new();
    for _ in 0..3 {
        let dispatcher = dispatcher.clone();
        let args = args.clone();
        handles.push(tokio::spawn(async move {
            let signer = identity_one();
            dispatcher
                .execute(OperationKind::Transfer, args, &signer)
                .await
        }));
    }
    for handle in handles {
        let report = handle.await.expect("task completes");
        assert!(report.success, "{:?}", report.error);
    }

    // The per-address lane kept the broadcasts from interleaving, and each
    // run saw the sequence left by the one before it.
    assert_eq!(chain.overlaps.load(Ordering::SeqCst), 0);
    assert_eq!(chain.recorded_sequences().await, vec![7, 8, 9]);
}

#[tokio::test]
async fn test_external_signing_round_trip() {
    let chain = Arc::new(ScriptedChain::new());
    let dispatcher = Dispatcher::new(chain.clone(), test_config());
    // Plays the hardware wallet: the dispatcher never sees this key.
    let holder = identity_one();

    let args = serde_json::json!({
        "to_address": identity_two().address(),
        "amount": "1",
        "denom": "inj",
    });
    let prepared = dispatcher
        .prepare(OperationKind::Transfer, args, holder.address())
        .await
        .expect("prepare succeeds");

    assert_eq!(prepared.account_number, 42);
    assert_eq!(prepared.sequence, 7);
    assert_eq!(prepared.gas_wanted, 60_000);
    assert_eq!(prepared.gas_fee, "30000000000000inj");
    // Without the key there is nothing to simulate with.
    assert_eq!(chain.simulate_calls.load(Ordering::SeqCst), 0);

    // The unsigned auth info carries no public key; the chain falls back to
    // the key registered on the account.
    let body_bytes = hex::decode(&prepared.body).expect("body hex");
    let auth_info_bytes = hex::decode(&prepared.auth_info).expect("auth info hex");
    let auth = wire::AuthInfo::decode(auth_info_bytes.as_slice()).expect("valid AuthInfo");
    assert!(auth.signer_infos[0].public_key.is_none());

    // The wallet signs the DIRECT sign doc and assembles the envelope.
    let sign_doc = wire::SignDoc {
        body_bytes: body_bytes.clone(),
        auth_info_bytes: auth_info_bytes.clone(),
        chain_id: prepared.chain_id.clone(),
        account_number: prepared.account_number,
    };
    let signature = holder.sign(&sign_doc.encode_to_vec()).expect("sign");
    let tx = wire::TxRaw {
        body_bytes,
        auth_info_bytes,
        signatures: vec![signature],
    };

    let receipt = dispatcher
        .broadcast_signed(holder.address(), &tx.encode_to_vec())
        .await
        .expect("broadcast succeeds");

    assert_eq!(receipt.tx_hash, "CAFEBABE");
    assert_eq!(receipt.gas_wanted, 60_000);
    assert_eq!(receipt.gas_fee, "30000000000000inj");
    assert_eq!(chain.broadcast_calls.load(Ordering::SeqCst), 1);
    assert_eq!(chain.recorded_sequences().await, vec![7]);
}

#[tokio::test]
async fn test_broadcast_signed_rejects_garbage_bytes() {
    let chain = Arc::new(ScriptedChain::new());
    let dispatcher = Dispatcher::new(chain.clone(), test_config());
    let holder = identity_one();

    let err = dispatcher
        .broadcast_signed(holder.address(), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, ChainError::InvalidArgument { .. }));

    // A TxRaw with no signatures must not reach the node either.
    let unsigned = wire::TxRaw {
        body_bytes: vec![1, 2, 3],
        auth_info_bytes: vec![4, 5, 6],
        signatures: Vec::new(),
    };
    let err = dispatcher
        .broadcast_signed(holder.address(), &unsigned.encode_to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, ChainError::InvalidArgument { .. }));
    assert_eq!(chain.broadcast_calls.load(Ordering::SeqCst), 0);
}
