//! Protobuf wire types for transaction envelopes and operation messages.
//!
//! Declared by hand with `prost` derives against the canonical cosmos-sdk and
//! Injective field numbering rather than generated from `.proto` files; the
//! crate only needs the handful of messages the pipeline serializes, and the
//! LCD accepts/returns them as base64 `tx_bytes`. Unknown fields on decode
//! are skipped by prost, so these stay compatible with fuller schemas.

/// Protobuf `Any`: a type URL plus the encoded message bytes.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Any {
    #[prost(string, tag = "1")]
    pub type_url: String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

/// Protobuf `Timestamp`: seconds and nanos since the Unix epoch.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Timestamp {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    #[prost(int32, tag = "2")]
    pub nanos: i32,
}

/// Messages that can be packed into an [`Any`] for inclusion in a `TxBody`.
pub trait TypedMessage: prost::Message + Sized {
    const TYPE_URL: &'static str;

    fn to_any(&self) -> Any {
        Any {
            type_url: Self::TYPE_URL.to_string(),
            value: self.encode_to_vec(),
        }
    }
}

// --- cosmos.base.v1beta1 ---

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Coin {
    #[prost(string, tag = "1")]
    pub denom: String,
    /// Integer amount in the denom's smallest unit, as a decimal string.
    #[prost(string, tag = "2")]
    pub amount: String,
}

// --- cosmos.tx.v1beta1 ---

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TxBody {
    #[prost(message, repeated, tag = "1")]
    pub messages: Vec<Any>,
    #[prost(string, tag = "2")]
    pub memo: String,
    #[prost(uint64, tag = "3")]
    pub timeout_height: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthInfo {
    #[prost(message, repeated, tag = "1")]
    pub signer_infos: Vec<SignerInfo>,
    #[prost(message, optional, tag = "2")]
    pub fee: Option<Fee>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignerInfo {
    #[prost(message, optional, tag = "1")]
    pub public_key: Option<Any>,
    #[prost(message, optional, tag = "2")]
    pub mode_info: Option<ModeInfo>,
    #[prost(uint64, tag = "3")]
    pub sequence: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ModeInfo {
    #[prost(oneof = "mode_info::Sum", tags = "1")]
    pub sum: Option<mode_info::Sum>,
}

pub mod mode_info {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Sum {
        #[prost(message, tag = "1")]
        Single(super::Single),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Single {
    #[prost(int32, tag = "1")]
    pub mode: i32,
}

pub const SIGN_MODE_DIRECT: i32 = 1;

impl ModeInfo {
    pub fn single_direct() -> Self {
        Self {
            sum: Some(mode_info::Sum::Single(Single {
                mode: SIGN_MODE_DIRECT,
            })),
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Fee {
    #[prost(message, repeated, tag = "1")]
    pub amount: Vec<Coin>,
    #[prost(uint64, tag = "2")]
    pub gas_limit: u64,
    #[prost(string, tag = "3")]
    pub payer: String,
    #[prost(string, tag = "4")]
    pub granter: String,
}

/// The exact bytes a DIRECT-mode signature covers.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignDoc {
    #[prost(bytes = "vec", tag = "1")]
    pub body_bytes: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub auth_info_bytes: Vec<u8>,
    #[prost(string, tag = "3")]
    pub chain_id: String,
    #[prost(uint64, tag = "4")]
    pub account_number: u64,
}

/// Broadcast form: body and auth-info bytes plus one signature per signer.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TxRaw {
    #[prost(bytes = "vec", tag = "1")]
    pub body_bytes: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub auth_info_bytes: Vec<u8>,
    #[prost(bytes = "vec", repeated, tag = "3")]
    pub signatures: Vec<Vec<u8>>,
}

// --- injective.crypto.v1beta1.ethsecp256k1 ---

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PubKey {
    #[prost(bytes = "vec", tag = "1")]
    pub key: Vec<u8>,
}

impl TypedMessage for PubKey {
    const TYPE_URL: &'static str = "/injective.crypto.v1beta1.ethsecp256k1.PubKey";
}

// --- cosmos.bank.v1beta1 ---

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgSend {
    #[prost(string, tag = "1")]
    pub from_address: String,
    #[prost(string, tag = "2")]
    pub to_address: String,
    #[prost(message, repeated, tag = "3")]
    pub amount: Vec<Coin>,
}

impl TypedMessage for MsgSend {
    const TYPE_URL: &'static str = "/cosmos.bank.v1beta1.MsgSend";
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Metadata {
    #[prost(string, tag = "1")]
    pub description: String,
    #[prost(message, repeated, tag = "2")]
    pub denom_units: Vec<DenomUnit>,
    #[prost(string, tag = "3")]
    pub base: String,
    #[prost(string, tag = "4")]
    pub display: String,
    #[prost(string, tag = "5")]
    pub name: String,
    #[prost(string, tag = "6")]
    pub symbol: String,
    #[prost(string, tag = "7")]
    pub uri: String,
    #[prost(string, tag = "8")]
    pub uri_hash: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DenomUnit {
    #[prost(string, tag = "1")]
    pub denom: String,
    #[prost(uint32, tag = "2")]
    pub exponent: u32,
    #[prost(string, repeated, tag = "3")]
    pub aliases: Vec<String>,
}

// --- cosmos.authz.v1beta1 ---

/// Authorization to execute one message type on the granter's behalf.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GenericAuthorization {
    #[prost(string, tag = "1")]
    pub msg: String,
}

impl TypedMessage for GenericAuthorization {
    const TYPE_URL: &'static str = "/cosmos.authz.v1beta1.GenericAuthorization";
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Grant {
    #[prost(message, optional, tag = "1")]
    pub authorization: Option<Any>,
    #[prost(message, optional, tag = "2")]
    pub expiration: Option<Timestamp>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgGrant {
    #[prost(string, tag = "1")]
    pub granter: String,
    #[prost(string, tag = "2")]
    pub grantee: String,
    #[prost(message, optional, tag = "3")]
    pub grant: Option<Grant>,
}

impl TypedMessage for MsgGrant {
    const TYPE_URL: &'static str = "/cosmos.authz.v1beta1.MsgGrant";
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgRevoke {
    #[prost(string, tag = "1")]
    pub granter: String,
    #[prost(string, tag = "2")]
    pub grantee: String,
    #[prost(string, tag = "3")]
    pub msg_type_url: String,
}

impl TypedMessage for MsgRevoke {
    const TYPE_URL: &'static str = "/cosmos.authz.v1beta1.MsgRevoke";
}

// --- cosmos.staking.v1beta1 ---

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgDelegate {
    #[prost(string, tag = "1")]
    pub delegator_address: String,
    #[prost(string, tag = "2")]
    pub validator_address: String,
    #[prost(message, optional, tag = "3")]
    pub amount: Option<Coin>,
}

impl TypedMessage for MsgDelegate {
    const TYPE_URL: &'static str = "/cosmos.staking.v1beta1.MsgDelegate";
}

// --- cosmwasm.wasm.v1 ---

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgExecuteContract {
    #[prost(string, tag = "1")]
    pub sender: String,
    #[prost(string, tag = "2")]
    pub contract: String,
    /// JSON execute payload, raw bytes.
    #[prost(bytes = "vec", tag = "3")]
    pub msg: Vec<u8>,
    #[prost(message, repeated, tag = "5")]
    pub funds: Vec<Coin>,
}

impl TypedMessage for MsgExecuteContract {
    const TYPE_URL: &'static str = "/cosmwasm.wasm.v1.MsgExecuteContract";
}

// --- injective.exchange.v1beta1 ---

/// Exchange-module order side/flavor. BUY/SELL cover the pipeline's needs;
/// post-only and atomic variants exist upstream but are not constructed here.
pub const ORDER_TYPE_BUY: i32 = 1;
pub const ORDER_TYPE_SELL: i32 = 2;

/// Cancel matches any order class (regular or conditional).
pub const ORDER_MASK_ANY: i32 = 1;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OrderInfo {
    #[prost(string, tag = "1")]
    pub subaccount_id: String,
    #[prost(string, tag = "2")]
    pub fee_recipient: String,
    /// Fixed-point decimal string (18 fractional places).
    #[prost(string, tag = "3")]
    pub price: String,
    #[prost(string, tag = "4")]
    pub quantity: String,
    /// Client order id; uuid v4 in this crate.
    #[prost(string, tag = "5")]
    pub cid: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DerivativeOrder {
    #[prost(string, tag = "1")]
    pub market_id: String,
    #[prost(message, optional, tag = "2")]
    pub order_info: Option<OrderInfo>,
    #[prost(int32, tag = "3")]
    pub order_type: i32,
    #[prost(string, tag = "4")]
    pub margin: String,
    #[prost(string, tag = "5")]
    pub trigger_price: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SpotOrder {
    #[prost(string, tag = "1")]
    pub market_id: String,
    #[prost(message, optional, tag = "2")]
    pub order_info: Option<OrderInfo>,
    #[prost(int32, tag = "3")]
    pub order_type: i32,
    #[prost(string, tag = "4")]
    pub trigger_price: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgCreateDerivativeLimitOrder {
    #[prost(string, tag = "1")]
    pub sender: String,
    #[prost(message, optional, tag = "2")]
    pub order: Option<DerivativeOrder>,
}

impl TypedMessage for MsgCreateDerivativeLimitOrder {
    const TYPE_URL: &'static str = "/injective.exchange.v1beta1.MsgCreateDerivativeLimitOrder";
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgCreateDerivativeMarketOrder {
    #[prost(string, tag = "1")]
    pub sender: String,
    #[prost(message, optional, tag = "2")]
    pub order: Option<DerivativeOrder>,
}

impl TypedMessage for MsgCreateDerivativeMarketOrder {
    const TYPE_URL: &'static str = "/injective.exchange.v1beta1.MsgCreateDerivativeMarketOrder";
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgCreateSpotLimitOrder {
    #[prost(string, tag = "1")]
    pub sender: String,
    #[prost(message, optional, tag = "2")]
    pub order: Option<SpotOrder>,
}

impl TypedMessage for MsgCreateSpotLimitOrder {
    const TYPE_URL: &'static str = "/injective.exchange.v1beta1.MsgCreateSpotLimitOrder";
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgCreateSpotMarketOrder {
    #[prost(string, tag = "1")]
    pub sender: String,
    #[prost(message, optional, tag = "2")]
    pub order: Option<SpotOrder>,
}

impl TypedMessage for MsgCreateSpotMarketOrder {
    const TYPE_URL: &'static str = "/injective.exchange.v1beta1.MsgCreateSpotMarketOrder";
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgCancelDerivativeOrder {
    #[prost(string, tag = "1")]
    pub sender: String,
    #[prost(string, tag = "2")]
    pub market_id: String,
    #[prost(string, tag = "3")]
    pub subaccount_id: String,
    #[prost(string, tag = "4")]
    pub order_hash: String,
    #[prost(int32, tag = "5")]
    pub order_mask: i32,
    #[prost(string, tag = "6")]
    pub cid: String,
}

impl TypedMessage for MsgCancelDerivativeOrder {
    const TYPE_URL: &'static str = "/injective.exchange.v1beta1.MsgCancelDerivativeOrder";
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgCancelSpotOrder {
    #[prost(string, tag = "1")]
    pub sender: String,
    #[prost(string, tag = "2")]
    pub market_id: String,
    #[prost(string, tag = "3")]
    pub subaccount_id: String,
    #[prost(string, tag = "4")]
    pub order_hash: String,
    #[prost(string, tag = "5")]
    pub cid: String,
}

impl TypedMessage for MsgCancelSpotOrder {
    const TYPE_URL: &'static str = "/injective.exchange.v1beta1.MsgCancelSpotOrder";
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgSubaccountTransfer {
    #[prost(string, tag = "1")]
    pub sender: String,
    #[prost(string, tag = "2")]
    pub source_subaccount_id: String,
    #[prost(string, tag = "3")]
    pub destination_subaccount_id: String,
    #[prost(message, optional, tag = "4")]
    pub amount: Option<Coin>,
}

impl TypedMessage for MsgSubaccountTransfer {
    const TYPE_URL: &'static str = "/injective.exchange.v1beta1.MsgSubaccountTransfer";
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgExternalTransfer {
    #[prost(string, tag = "1")]
    pub sender: String,
    #[prost(string, tag = "2")]
    pub source_subaccount_id: String,
    #[prost(string, tag = "3")]
    pub destination_subaccount_id: String,
    #[prost(message, optional, tag = "4")]
    pub amount: Option<Coin>,
}

impl TypedMessage for MsgExternalTransfer {
    const TYPE_URL: &'static str = "/injective.exchange.v1beta1.MsgExternalTransfer";
}

// --- injective.tokenfactory.v1beta1 ---

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgCreateDenom {
    #[prost(string, tag = "1")]
    pub sender: String,
    #[prost(string, tag = "2")]
    pub subdenom: String,
    #[prost(string, tag = "3")]
    pub name: String,
    #[prost(string, tag = "4")]
    pub symbol: String,
    #[prost(uint32, tag = "5")]
    pub decimals: u32,
}

impl TypedMessage for MsgCreateDenom {
    const TYPE_URL: &'static str = "/injective.tokenfactory.v1beta1.MsgCreateDenom";
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgMint {
    #[prost(string, tag = "1")]
    pub sender: String,
    #[prost(message, optional, tag = "2")]
    pub amount: Option<Coin>,
}

impl TypedMessage for MsgMint {
    const TYPE_URL: &'static str = "/injective.tokenfactory.v1beta1.MsgMint";
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgBurn {
    #[prost(string, tag = "1")]
    pub sender: String,
    #[prost(message, optional, tag = "2")]
    pub amount: Option<Coin>,
}

impl TypedMessage for MsgBurn {
    const TYPE_URL: &'static str = "/injective.tokenfactory.v1beta1.MsgBurn";
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgSetDenomMetadata {
    #[prost(string, tag = "1")]
    pub sender: String,
    #[prost(message, optional, tag = "2")]
    pub metadata: Option<Metadata>,
}

impl TypedMessage for MsgSetDenomMetadata {
    const TYPE_URL: &'static str = "/injective.tokenfactory.v1beta1.MsgSetDenomMetadata";
}

// --- injective.auction.v1beta1 ---

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgBid {
    #[prost(string, tag = "1")]
    pub sender: String,
    #[prost(message, optional, tag = "2")]
    pub bid_amount: Option<Coin>,
    #[prost(uint64, tag = "3")]
    pub round: u64,
}

impl TypedMessage for MsgBid {
    const TYPE_URL: &'static str = "/injective.auction.v1beta1.MsgBid";
}

// --- injective.peggy.v1 ---

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgSendToEth {
    #[prost(string, tag = "1")]
    pub sender: String,
    #[prost(string, tag = "2")]
    pub eth_dest: String,
    #[prost(message, optional, tag = "3")]
    pub amount: Option<Coin>,
    /// Relayer compensation, same denom as `amount`.
    #[prost(message, optional, tag = "4")]
    pub bridge_fee: Option<Coin>,
}

impl TypedMessage for MsgSendToEth {
    const TYPE_URL: &'static str = "/injective.peggy.v1.MsgSendToEth";
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn coin_encodes_canonical_bytes() {
        let coin = Coin {
            denom: "inj".to_string(),
            amount: "1".to_string(),
        };
        // field 1 (string "inj"), field 2 (string "1")
        assert_eq!(hex::encode(coin.encode_to_vec()), "0a03696e6a120131");
    }

    #[test]
    fn encoding_is_deterministic() {
        let body = TxBody {
            messages: vec![MsgSend {
                from_address: "inj1from".to_string(),
                to_address: "inj1to".to_string(),
                amount: vec![Coin {
                    denom: "inj".to_string(),
                    amount: "1500000000000000000".to_string(),
                }],
            }
            .to_any()],
            memo: String::new(),
            timeout_height: 1042,
        };

        assert_eq!(body.encode_to_vec(), body.encode_to_vec());
    }

    #[test]
    fn any_packing_carries_type_url_and_payload() {
        let msg = MsgDelegate {
            delegator_address: "inj1delegator".to_string(),
            validator_address: "injvaloper1validator".to_string(),
            amount: Some(Coin {
                denom: "inj".to_string(),
                amount: "1000".to_string(),
            }),
        };
        let any = msg.to_any();

        assert_eq!(any.type_url, "/cosmos.staking.v1beta1.MsgDelegate");
        let decoded = MsgDelegate::decode(any.value.as_slice()).expect("decode");
        assert_eq!(decoded, msg);
    }

    #[test]
    fn tx_raw_round_trips() {
        let raw = TxRaw {
            body_bytes: vec![1, 2, 3],
            auth_info_bytes: vec![4, 5],
            signatures: vec![vec![9; 64]],
        };
        let decoded = TxRaw::decode(raw.encode_to_vec().as_slice()).expect("decode");

        assert_eq!(decoded, raw);
        assert_eq!(decoded.signatures[0].len(), 64);
    }

    #[test]
    fn sign_doc_differs_when_auth_info_changes() {
        let base = SignDoc {
            body_bytes: vec![1],
            auth_info_bytes: vec![2],
            chain_id: "injective-888".to_string(),
            account_number: 7,
        };
        let mut refee = base.clone();
        refee.auth_info_bytes = vec![3];

        assert_ne!(base.encode_to_vec(), refee.encode_to_vec());
    }
}
