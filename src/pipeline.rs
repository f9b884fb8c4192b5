//! The transaction state machine: build, simulate, price, sign, broadcast.
//!
//! Gas cost is unknowable until the transaction is fully serialized, yet the
//! fee belongs to the signed bytes. The pipeline therefore signs twice: a
//! first pass with a zero fee produces a byte-accurate payload for the
//! simulate endpoint (which checks signature structure, not authenticity),
//! and the second pass signs the envelope with the fee derived from the
//! simulated gas usage. Each phase is a distinct type, so the compiler rules
//! out broadcasting an unpriced transaction or simulating a finalized one.

use chrono::{DateTime, Utc};
use prost::Message;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::chain::wire::{self, TypedMessage};
use crate::chain::{AccountState, ChainSession};
use crate::config::{EXTERNAL_SIGNING_GAS_LIMIT, NetworkConfig};
use crate::error::{ChainError, ChainResult};
use crate::identity::KeyedIdentity;

/// Transactions carry no memo by convention.
const MEMO: &str = "";

/// Outcome of a completed pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastReceipt {
    pub tx_hash: String,
    /// Height reported by the sync-mode ack. Zero until the transaction is
    /// included in a block; reconcile via `ChainSession::tx_by_hash`.
    pub height: u64,
    pub gas_wanted: u64,
    /// Fee paid, raw units with denom suffix (`"60000000000000inj"`).
    pub gas_fee: String,
    /// Same fee as a human INJ amount.
    pub fee_paid: Decimal,
    pub broadcast_at: DateTime<Utc>,
}

/// Unsigned envelope handed to an external signer (hardware wallet,
/// browser extension). The holder signs the DIRECT-mode sign doc assembled
/// from these fields and submits the result via [`broadcast_pre_signed`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreparedTransaction {
    /// Hex-encoded `TxBody` bytes.
    pub body: String,
    /// Hex-encoded `AuthInfo` bytes. Carries no public key; the chain falls
    /// back to the key registered on the account.
    pub auth_info: String,
    pub chain_id: String,
    pub account_number: u64,
    pub sequence: u64,
    pub gas_wanted: u64,
    pub gas_fee: String,
}

/// Phase 1: messages framed into a `TxBody` and frozen. The body bytes
/// produced here are signed verbatim in both passes.
#[derive(Debug)]
pub struct BuiltTx {
    body_bytes: Vec<u8>,
    message_count: usize,
}

impl BuiltTx {
    pub fn new(messages: Vec<wire::Any>, timeout_height: u64) -> ChainResult<Self> {
        if messages.is_empty() {
            return Err(ChainError::InvalidArgument {
                field: "messages".to_string(),
                reason: "transaction needs at least one message".to_string(),
            });
        }
        let message_count = messages.len();
        let body = wire::TxBody {
            messages,
            memo: MEMO.to_string(),
            timeout_height,
        };
        Ok(Self {
            body_bytes: body.encode_to_vec(),
            message_count,
        })
    }

    /// Phase 2: sign with a zero fee to produce the simulation payload.
    pub fn sign_for_simulation(
        self,
        identity: &KeyedIdentity,
        account: AccountState,
        chain_id: &str,
    ) -> ChainResult<SimSignedTx> {
        let auth_info = wire::AuthInfo {
            signer_infos: vec![signer_info(Some(identity), account.sequence)],
            fee: Some(wire::Fee {
                amount: Vec::new(),
                gas_limit: 0,
                payer: String::new(),
                granter: String::new(),
            }),
        };
        let tx_bytes = sign_envelope(
            &self.body_bytes,
            &auth_info,
            identity,
            chain_id,
            account.account_number,
        )?;
        Ok(SimSignedTx {
            body_bytes: self.body_bytes,
            message_count: self.message_count,
            tx_bytes,
        })
    }
}

/// Phase 2 output: a throwaway-signed payload awaiting the dry run.
pub struct SimSignedTx {
    body_bytes: Vec<u8>,
    message_count: usize,
    tx_bytes: Vec<u8>,
}

impl SimSignedTx {
    pub fn tx_bytes(&self) -> &[u8] {
        &self.tx_bytes
    }

    /// Phase 3: record the simulated gas usage.
    pub fn with_gas_used(self, gas_used: u64) -> SimulatedTx {
        SimulatedTx {
            body_bytes: self.body_bytes,
            message_count: self.message_count,
            gas_used,
        }
    }
}

/// Phase 3 output: gas usage known, fee not yet attached.
pub struct SimulatedTx {
    body_bytes: Vec<u8>,
    message_count: usize,
    gas_used: u64,
}

impl SimulatedTx {
    /// Phase 4: price the transaction. The limit adds a fixed headroom to the
    /// simulated usage rather than a multiplier, so large transactions are
    /// not overcharged, and the fee is `gas_price * gas_limit` in the fee
    /// denom's smallest unit.
    pub fn finalize(self, config: &NetworkConfig) -> FinalizedTx {
        let gas_limit = self.gas_used.saturating_add(config.gas_buffer);
        let fee_units = u128::from(config.gas_price) * u128::from(gas_limit);
        FinalizedTx {
            body_bytes: self.body_bytes,
            message_count: self.message_count,
            gas_used: self.gas_used,
            gas_limit,
            fee_units,
            fee_denom: config.fee_denom.clone(),
        }
    }
}

/// Phase 4 output: fully priced, ready for the real signature.
pub struct FinalizedTx {
    body_bytes: Vec<u8>,
    message_count: usize,
    gas_used: u64,
    gas_limit: u64,
    fee_units: u128,
    fee_denom: String,
}

impl FinalizedTx {
    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    pub fn fee(&self) -> String {
        format!("{}{}", self.fee_units, self.fee_denom)
    }

    /// Phase 5: sign the finalized envelope with the real fee.
    pub fn sign(
        self,
        identity: &KeyedIdentity,
        account: AccountState,
        chain_id: &str,
    ) -> ChainResult<SignedTx> {
        let auth_info = wire::AuthInfo {
            signer_infos: vec![signer_info(Some(identity), account.sequence)],
            fee: Some(wire::Fee {
                amount: vec![wire::Coin {
                    denom: self.fee_denom.clone(),
                    amount: self.fee_units.to_string(),
                }],
                gas_limit: self.gas_limit,
                payer: String::new(),
                granter: String::new(),
            }),
        };
        let tx_bytes = sign_envelope(
            &self.body_bytes,
            &auth_info,
            identity,
            chain_id,
            account.account_number,
        )?;
        Ok(SignedTx {
            tx_bytes,
            gas_limit: self.gas_limit,
            fee_units: self.fee_units,
            fee_denom: self.fee_denom,
        })
    }
}

/// Phase 5 output: broadcastable bytes plus the gas figures for reporting.
pub struct SignedTx {
    tx_bytes: Vec<u8>,
    gas_limit: u64,
    fee_units: u128,
    fee_denom: String,
}

impl SignedTx {
    pub fn tx_bytes(&self) -> &[u8] {
        &self.tx_bytes
    }

    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    pub fn fee(&self) -> String {
        format!("{}{}", self.fee_units, self.fee_denom)
    }

    /// Transaction hash as the chain will report it: uppercase hex sha256 of
    /// the raw bytes.
    pub fn tx_hash(&self) -> String {
        hex::encode_upper(Sha256::digest(&self.tx_bytes))
    }
}

/// Drives one transaction from messages to mempool acknowledgement against a
/// session that owns the account counters.
pub struct TransactionPipeline<'a> {
    session: &'a mut ChainSession,
    identity: &'a KeyedIdentity,
}

impl<'a> TransactionPipeline<'a> {
    pub fn new(session: &'a mut ChainSession, identity: &'a KeyedIdentity) -> Self {
        Self { session, identity }
    }

    /// Run the full state machine once. A simulation failure aborts before
    /// any broadcast and a rejected broadcast surfaces the node's reason;
    /// neither advances the account sequence, so the session stays aligned
    /// with the chain either way.
    pub async fn execute(self, messages: Vec<wire::Any>) -> ChainResult<BroadcastReceipt> {
        let account = self.session.account_state();
        let chain_id = self.session.config().chain_id.clone();

        let built = BuiltTx::new(messages, self.session.timeout_height())?;
        let sim_signed = built.sign_for_simulation(self.identity, account, &chain_id)?;

        let outcome = self.session.simulate(sim_signed.tx_bytes()).await?;
        let finalized = sim_signed
            .with_gas_used(outcome.gas_used)
            .finalize(self.session.config());

        tracing::debug!(
            messages = finalized.message_count,
            gas_used = finalized.gas_used,
            gas_limit = finalized.gas_limit,
            fee = %finalized.fee(),
            sequence = account.sequence,
            "transaction finalized"
        );

        let signed = finalized.sign(self.identity, account, &chain_id)?;
        let gas_wanted = signed.gas_limit();
        let gas_fee = signed.fee();
        let fee_paid = human_fee(signed.fee_units)?;

        let ack = self.session.broadcast_sync(signed.tx_bytes()).await?;
        if ack.code != 0 {
            return Err(ChainError::BroadcastRejected {
                code: ack.code,
                reason: ack.raw_log,
                gas_wanted,
                gas_fee,
            });
        }

        Ok(BroadcastReceipt {
            tx_hash: ack.tx_hash,
            height: ack.height,
            gas_wanted,
            gas_fee,
            fee_paid,
            broadcast_at: Utc::now(),
        })
    }
}

/// Build an unsigned envelope for external signing. No simulation happens
/// here (the first-pass signature needs a key we do not hold), so the gas
/// limit is a flat conservative figure instead of a measured one.
pub fn prepare_unsigned(
    session: &ChainSession,
    messages: Vec<wire::Any>,
) -> ChainResult<PreparedTransaction> {
    let account = session.account_state();
    let config = session.config();
    let built = BuiltTx::new(messages, session.timeout_height())?;

    let gas_limit = EXTERNAL_SIGNING_GAS_LIMIT;
    let fee_units = u128::from(config.gas_price) * u128::from(gas_limit);
    let auth_info = wire::AuthInfo {
        signer_infos: vec![signer_info(None, account.sequence)],
        fee: Some(wire::Fee {
            amount: vec![wire::Coin {
                denom: config.fee_denom.clone(),
                amount: fee_units.to_string(),
            }],
            gas_limit,
            payer: String::new(),
            granter: String::new(),
        }),
    };

    Ok(PreparedTransaction {
        body: hex::encode(&built.body_bytes),
        auth_info: hex::encode(auth_info.encode_to_vec()),
        chain_id: config.chain_id.clone(),
        account_number: account.account_number,
        sequence: account.sequence,
        gas_wanted: gas_limit,
        gas_fee: format!("{}{}", fee_units, config.fee_denom),
    })
}

/// Broadcast externally-signed `TxRaw` bytes through the session, wrapping a
/// non-zero ack code the same way the self-signing path does.
pub async fn broadcast_pre_signed(
    session: &mut ChainSession,
    tx_bytes: &[u8],
) -> ChainResult<BroadcastReceipt> {
    if tx_bytes.is_empty() {
        return Err(ChainError::InvalidArgument {
            field: "tx_bytes".to_string(),
            reason: "signed transaction bytes are empty".to_string(),
        });
    }

    // Read the declared gas and fee out of the envelope itself, so acceptance
    // and rejection both report what the signer committed to.
    let raw = wire::TxRaw::decode(tx_bytes).map_err(|e| ChainError::InvalidArgument {
        field: "tx_bytes".to_string(),
        reason: format!("not a valid signed transaction: {e}"),
    })?;
    if raw.signatures.is_empty() {
        return Err(ChainError::InvalidArgument {
            field: "tx_bytes".to_string(),
            reason: "transaction carries no signatures".to_string(),
        });
    }
    let auth_info =
        wire::AuthInfo::decode(raw.auth_info_bytes.as_slice()).map_err(|e| {
            ChainError::InvalidArgument {
                field: "tx_bytes".to_string(),
                reason: format!("auth info does not decode: {e}"),
            }
        })?;
    let (gas_wanted, gas_fee, fee_paid) = match auth_info.fee {
        Some(fee) => {
            let (units, denom) = fee
                .amount
                .first()
                .map(|coin| (coin.amount.parse::<u128>().unwrap_or(0), coin.denom.clone()))
                .unwrap_or_else(|| (0, session.config().fee_denom.clone()));
            (fee.gas_limit, format!("{units}{denom}"), human_fee(units)?)
        }
        None => (0, String::new(), Decimal::ZERO),
    };

    let ack = session.broadcast_sync(tx_bytes).await?;
    if ack.code != 0 {
        return Err(ChainError::BroadcastRejected {
            code: ack.code,
            reason: ack.raw_log,
            gas_wanted,
            gas_fee,
        });
    }
    Ok(BroadcastReceipt {
        tx_hash: ack.tx_hash,
        height: ack.height,
        gas_wanted,
        gas_fee,
        fee_paid,
        broadcast_at: Utc::now(),
    })
}

fn signer_info(identity: Option<&KeyedIdentity>, sequence: u64) -> wire::SignerInfo {
    wire::SignerInfo {
        public_key: identity.map(|id| {
            wire::PubKey {
                key: id.public_key_bytes().to_vec(),
            }
            .to_any()
        }),
        mode_info: Some(wire::ModeInfo::single_direct()),
        sequence,
    }
}

/// Sign `SignDoc(body, auth_info, chain_id, account_number)` and assemble the
/// broadcastable `TxRaw`.
fn sign_envelope(
    body_bytes: &[u8],
    auth_info: &wire::AuthInfo,
    identity: &KeyedIdentity,
    chain_id: &str,
    account_number: u64,
) -> ChainResult<Vec<u8>> {
    let auth_info_bytes = auth_info.encode_to_vec();
    let sign_doc = wire::SignDoc {
        body_bytes: body_bytes.to_vec(),
        auth_info_bytes: auth_info_bytes.clone(),
        chain_id: chain_id.to_string(),
        account_number,
    };
    let signature = identity.sign(&sign_doc.encode_to_vec())?;
    Ok(wire::TxRaw {
        body_bytes: body_bytes.to_vec(),
        auth_info_bytes,
        signatures: vec![signature],
    }
    .encode_to_vec())
}

/// Raw fee units to a human INJ amount (18 decimal places).
fn human_fee(fee_units: u128) -> ChainResult<Decimal> {
    i128::try_from(fee_units)
        .ok()
        .and_then(|units| Decimal::try_from_i128_with_scale(units, 18).ok())
        .map(|fee| fee.normalize())
        .ok_or_else(|| ChainError::Unknown {
            cause: format!("fee of {fee_units} raw units does not fit a decimal"),
        })
}
