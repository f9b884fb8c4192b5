//! Pure message construction: typed operation arguments in, packed protobuf
//! messages out.
//!
//! Builders never touch the network. Monetary quantities stay `Decimal`
//! until the final serialization into chain units, and validation failures
//! surface as `InvalidArgument` before any transaction work starts.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chain::{DenomBook, scale_to_integer, wire};
use crate::chain::wire::TypedMessage;
use crate::error::{ChainError, ChainResult};
use crate::identity::{ADDRESS_PREFIX, KeyedIdentity};
use crate::market::validate_market_id;

/// Bech32 prefix for validator operator addresses.
const VALIDATOR_PREFIX: &str = "injvaloper";

/// Fractional places in the exchange module's fixed-point decimal encoding.
const CHAIN_DEC_PLACES: u32 = 18;

/// Every operation kind the dispatch surface accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    Transfer,
    SubaccountTransfer,
    ExternalTransfer,
    DerivativeLimitOrder,
    DerivativeMarketOrder,
    SpotLimitOrder,
    SpotMarketOrder,
    CancelOrder,
    Delegate,
    CreateDenom,
    Mint,
    Burn,
    SetDenomMetadata,
    ContractExecute,
    AuctionBid,
    AuthzGrant,
    AuthzRevoke,
    SendToEth,
}

impl OperationKind {
    pub const ALL: [OperationKind; 18] = [
        Self::Transfer,
        Self::SubaccountTransfer,
        Self::ExternalTransfer,
        Self::DerivativeLimitOrder,
        Self::DerivativeMarketOrder,
        Self::SpotLimitOrder,
        Self::SpotMarketOrder,
        Self::CancelOrder,
        Self::Delegate,
        Self::CreateDenom,
        Self::Mint,
        Self::Burn,
        Self::SetDenomMetadata,
        Self::ContractExecute,
        Self::AuctionBid,
        Self::AuthzGrant,
        Self::AuthzRevoke,
        Self::SendToEth,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::SubaccountTransfer => "subaccount-transfer",
            Self::ExternalTransfer => "external-transfer",
            Self::DerivativeLimitOrder => "derivative-limit-order",
            Self::DerivativeMarketOrder => "derivative-market-order",
            Self::SpotLimitOrder => "spot-limit-order",
            Self::SpotMarketOrder => "spot-market-order",
            Self::CancelOrder => "cancel-order",
            Self::Delegate => "delegate",
            Self::CreateDenom => "create-denom",
            Self::Mint => "mint",
            Self::Burn => "burn",
            Self::SetDenomMetadata => "set-denom-metadata",
            Self::ContractExecute => "contract-execute",
            Self::AuctionBid => "auction-bid",
            Self::AuthzGrant => "authz-grant",
            Self::AuthzRevoke => "authz-revoke",
            Self::SendToEth => "send-to-eth",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperationKind {
    type Err = ChainError;

    fn from_str(value: &str) -> ChainResult<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value.trim().to_ascii_lowercase())
            .ok_or_else(|| invalid("operation", format!("unknown operation kind '{value}'")))
    }
}

/// Order side; maps to the exchange module's order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn parse(value: &str) -> ChainResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            _ => Err(invalid(
                "side",
                format!("expected 'buy' or 'sell', got '{value}'"),
            )),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }

    fn order_type(self) -> i32 {
        match self {
            Self::Buy => wire::ORDER_TYPE_BUY,
            Self::Sell => wire::ORDER_TYPE_SELL,
        }
    }
}

/// Which exchange book an order or listing lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketScope {
    Derivative,
    Spot,
}

impl MarketScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Derivative => "derivative",
            Self::Spot => "spot",
        }
    }
}

impl std::fmt::Display for MarketScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Margin requirement: `quantity * price / leverage` in decimal arithmetic,
/// rounded away from zero at the chain's 18-place precision.
///
/// `0.1 * 30000 / 1` is exactly `3000`, never `2999.999…`. A non-terminating
/// quotient like `100 / 3` lands on `33.333333333333333334`, never below the
/// exact requirement.
pub fn compute_margin(
    quantity: Decimal,
    price: Decimal,
    leverage: Decimal,
) -> ChainResult<Decimal> {
    if leverage <= Decimal::ZERO {
        return Err(invalid("leverage", "must be positive"));
    }
    quantity
        .checked_mul(price)
        .and_then(|notional| notional.checked_div(leverage))
        .map(|margin| {
            margin.round_dp_with_strategy(CHAIN_DEC_PLACES, RoundingStrategy::AwayFromZero)
        })
        .ok_or_else(|| invalid("margin", "quantity * price / leverage overflows"))
}

/// The calling account: bech32 address plus the 20 raw bytes subaccount ids
/// derive from. Constructible from an address alone so the external-signing
/// flow works without key material.
#[derive(Debug, Clone)]
pub struct Sender {
    address: String,
    account_bytes: [u8; 20],
}

impl Sender {
    pub fn from_identity(identity: &KeyedIdentity) -> Self {
        Self {
            address: identity.address().to_string(),
            account_bytes: identity.account_bytes(),
        }
    }

    pub fn from_address(address: &str) -> ChainResult<Self> {
        let account: cosmrs::AccountId = address
            .trim()
            .parse()
            .map_err(|e| invalid("address", format!("not a bech32 address: {e}")))?;
        if account.prefix() != ADDRESS_PREFIX {
            return Err(invalid(
                "address",
                format!("expected '{ADDRESS_PREFIX}' prefix, got '{}'", account.prefix()),
            ));
        }
        let bytes = account.to_bytes();
        let account_bytes: [u8; 20] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| invalid("address", "expected 20 account bytes"))?;
        Ok(Self {
            address: account.to_string(),
            account_bytes,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn subaccount_id(&self, index: u32) -> String {
        format!("0x{}{:024x}", hex::encode(self.account_bytes), index)
    }
}

// --- operation arguments ---

fn default_leverage() -> Decimal {
    Decimal::ONE
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferArgs {
    pub to_address: String,
    pub amount: Decimal,
    pub denom: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubaccountTransferArgs {
    pub amount: Decimal,
    pub denom: String,
    #[serde(default)]
    pub source_subaccount_index: u32,
    pub destination_subaccount_index: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExternalTransferArgs {
    pub amount: Decimal,
    pub denom: String,
    #[serde(default)]
    pub source_subaccount_index: u32,
    pub destination_subaccount_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DerivativeLimitOrderArgs {
    pub market_id: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub price: Decimal,
    #[serde(default = "default_leverage")]
    pub leverage: Decimal,
    #[serde(default)]
    pub subaccount_index: u32,
    #[serde(default)]
    pub fee_recipient: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DerivativeMarketOrderArgs {
    pub market_id: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    /// Advisory fill price from the order book mid/top-of-book; the matching
    /// engine is authoritative and may fill elsewhere.
    pub estimated_price: Decimal,
    #[serde(default = "default_leverage")]
    pub leverage: Decimal,
    #[serde(default)]
    pub subaccount_index: u32,
    #[serde(default)]
    pub fee_recipient: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotLimitOrderArgs {
    pub market_id: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub price: Decimal,
    #[serde(default)]
    pub subaccount_index: u32,
    #[serde(default)]
    pub fee_recipient: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotMarketOrderArgs {
    pub market_id: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    /// Advisory fill price; see [`DerivativeMarketOrderArgs::estimated_price`].
    pub estimated_price: Decimal,
    #[serde(default)]
    pub subaccount_index: u32,
    #[serde(default)]
    pub fee_recipient: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelOrderArgs {
    pub scope: MarketScope,
    pub market_id: String,
    pub order_hash: String,
    #[serde(default)]
    pub subaccount_index: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DelegateArgs {
    pub validator_address: String,
    /// Human INJ amount.
    pub amount: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDenomArgs {
    pub subdenom: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MintBurnArgs {
    /// Full factory denom, `factory/{creator}/{subdenom}`.
    pub denom: String,
    /// Amount in the denom's smallest unit.
    pub amount: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetDenomMetadataArgs {
    pub subdenom: String,
    pub description: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub uri_hash: String,
}

/// Human-denominated fund attached to a contract execution.
#[derive(Debug, Clone, Deserialize)]
pub struct FundCoin {
    pub denom: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractExecuteArgs {
    pub contract_address: String,
    /// JSON execute payload passed to the contract verbatim.
    pub payload: serde_json::Value,
    #[serde(default)]
    pub funds: Vec<FundCoin>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuctionBidArgs {
    /// Burn-auction round the bid targets; the chain rejects stale rounds.
    pub round: u64,
    /// Human INJ amount.
    pub amount: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthzGrantArgs {
    pub grantee: String,
    /// Fully-qualified message type url, e.g. `/cosmos.bank.v1beta1.MsgSend`.
    pub msg_type_url: String,
    /// Grant lifetime in seconds from now.
    pub expire_in_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthzRevokeArgs {
    pub grantee: String,
    pub msg_type_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendToEthArgs {
    /// Ethereum recipient, 20-byte `0x` hex address.
    pub eth_dest: String,
    pub amount: Decimal,
    pub denom: String,
    /// Relayer compensation, paid in the same denom as `amount`.
    pub bridge_fee: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VaultSubscribeArgs {
    pub vault_master_address: String,
    pub vault_subaccount_id: String,
    #[serde(default)]
    pub trader_subaccount_index: u32,
    /// Base-side deposit; omitted for quote-only subscriptions.
    #[serde(default)]
    pub base: Option<FundCoin>,
    pub quote: FundCoin,
    /// Slippage bound for CPMM vaults.
    #[serde(default)]
    pub max_penalty: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VaultRedeemArgs {
    pub vault_master_address: String,
    pub vault_subaccount_id: String,
    #[serde(default)]
    pub trader_subaccount_index: u32,
    /// LP tokens being redeemed.
    pub lp: FundCoin,
    pub redemption_type: String,
    #[serde(default)]
    pub max_penalty: Option<Decimal>,
}

/// Stateless constructors, one per operation kind. Holds only references to
/// the calling account and the denom table; every method is a pure function
/// of its arguments.
pub struct MessageBuilder<'a> {
    sender: &'a Sender,
    denoms: &'a DenomBook,
}

impl<'a> MessageBuilder<'a> {
    pub fn new(sender: &'a Sender, denoms: &'a DenomBook) -> Self {
        Self { sender, denoms }
    }

    pub fn transfer(&self, args: &TransferArgs) -> ChainResult<wire::Any> {
        let to = validate_account_address(&args.to_address, "to_address")?;
        require_positive(args.amount, "amount")?;
        let amount = self.denoms.to_chain_units(args.amount, &args.denom)?;

        Ok(wire::MsgSend {
            from_address: self.sender.address().to_string(),
            to_address: to,
            amount: vec![wire::Coin {
                denom: args.denom.clone(),
                amount,
            }],
        }
        .to_any())
    }

    pub fn subaccount_transfer(&self, args: &SubaccountTransferArgs) -> ChainResult<wire::Any> {
        require_positive(args.amount, "amount")?;
        if args.source_subaccount_index == args.destination_subaccount_index {
            return Err(invalid(
                "destination_subaccount_index",
                "source and destination subaccounts are the same",
            ));
        }
        let amount = self.denoms.to_chain_units(args.amount, &args.denom)?;

        Ok(wire::MsgSubaccountTransfer {
            sender: self.sender.address().to_string(),
            source_subaccount_id: self.sender.subaccount_id(args.source_subaccount_index),
            destination_subaccount_id: self.sender.subaccount_id(args.destination_subaccount_index),
            amount: Some(wire::Coin {
                denom: args.denom.clone(),
                amount,
            }),
        }
        .to_any())
    }

    pub fn external_transfer(&self, args: &ExternalTransferArgs) -> ChainResult<wire::Any> {
        require_positive(args.amount, "amount")?;
        let destination =
            validate_subaccount_id(&args.destination_subaccount_id, "destination_subaccount_id")?;
        let amount = self.denoms.to_chain_units(args.amount, &args.denom)?;

        Ok(wire::MsgExternalTransfer {
            sender: self.sender.address().to_string(),
            source_subaccount_id: self.sender.subaccount_id(args.source_subaccount_index),
            destination_subaccount_id: destination,
            amount: Some(wire::Coin {
                denom: args.denom.clone(),
                amount,
            }),
        }
        .to_any())
    }

    pub fn derivative_limit_order(&self, args: &DerivativeLimitOrderArgs) -> ChainResult<wire::Any> {
        let market_id = validate_market_id(&args.market_id)?;
        require_positive(args.quantity, "quantity")?;
        require_positive(args.price, "price")?;
        let margin = compute_margin(args.quantity, args.price, args.leverage)?;

        Ok(wire::MsgCreateDerivativeLimitOrder {
            sender: self.sender.address().to_string(),
            order: Some(wire::DerivativeOrder {
                market_id,
                order_info: Some(self.order_info(
                    args.subaccount_index,
                    args.fee_recipient.as_deref(),
                    args.price,
                    args.quantity,
                )?),
                order_type: args.side.order_type(),
                margin: to_chain_dec(margin, "margin")?,
                trigger_price: String::new(),
            }),
        }
        .to_any())
    }

    pub fn derivative_market_order(
        &self,
        args: &DerivativeMarketOrderArgs,
    ) -> ChainResult<wire::Any> {
        let market_id = validate_market_id(&args.market_id)?;
        require_positive(args.quantity, "quantity")?;
        require_positive(args.estimated_price, "estimated_price")?;
        let margin = compute_margin(args.quantity, args.estimated_price, args.leverage)?;

        Ok(wire::MsgCreateDerivativeMarketOrder {
            sender: self.sender.address().to_string(),
            order: Some(wire::DerivativeOrder {
                market_id,
                order_info: Some(self.order_info(
                    args.subaccount_index,
                    args.fee_recipient.as_deref(),
                    args.estimated_price,
                    args.quantity,
                )?),
                order_type: args.side.order_type(),
                margin: to_chain_dec(margin, "margin")?,
                trigger_price: String::new(),
            }),
        }
        .to_any())
    }

    pub fn spot_limit_order(&self, args: &SpotLimitOrderArgs) -> ChainResult<wire::Any> {
        let market_id = validate_market_id(&args.market_id)?;
        require_positive(args.quantity, "quantity")?;
        require_positive(args.price, "price")?;

        Ok(wire::MsgCreateSpotLimitOrder {
            sender: self.sender.address().to_string(),
            order: Some(wire::SpotOrder {
                market_id,
                order_info: Some(self.order_info(
                    args.subaccount_index,
                    args.fee_recipient.as_deref(),
                    args.price,
                    args.quantity,
                )?),
                order_type: args.side.order_type(),
                trigger_price: String::new(),
            }),
        }
        .to_any())
    }

    pub fn spot_market_order(&self, args: &SpotMarketOrderArgs) -> ChainResult<wire::Any> {
        let market_id = validate_market_id(&args.market_id)?;
        require_positive(args.quantity, "quantity")?;
        require_positive(args.estimated_price, "estimated_price")?;

        Ok(wire::MsgCreateSpotMarketOrder {
            sender: self.sender.address().to_string(),
            order: Some(wire::SpotOrder {
                market_id,
                order_info: Some(self.order_info(
                    args.subaccount_index,
                    args.fee_recipient.as_deref(),
                    args.estimated_price,
                    args.quantity,
                )?),
                order_type: args.side.order_type(),
                trigger_price: String::new(),
            }),
        }
        .to_any())
    }

    pub fn cancel_order(&self, args: &CancelOrderArgs) -> ChainResult<wire::Any> {
        let market_id = validate_market_id(&args.market_id)?;
        let order_hash = validate_order_hash(&args.order_hash)?;
        let subaccount_id = self.sender.subaccount_id(args.subaccount_index);

        Ok(match args.scope {
            MarketScope::Derivative => wire::MsgCancelDerivativeOrder {
                sender: self.sender.address().to_string(),
                market_id,
                subaccount_id,
                order_hash,
                order_mask: wire::ORDER_MASK_ANY,
                cid: String::new(),
            }
            .to_any(),
            MarketScope::Spot => wire::MsgCancelSpotOrder {
                sender: self.sender.address().to_string(),
                market_id,
                subaccount_id,
                order_hash,
                cid: String::new(),
            }
            .to_any(),
        })
    }

    pub fn delegate(&self, args: &DelegateArgs) -> ChainResult<wire::Any> {
        let validator = validate_validator_address(&args.validator_address)?;
        require_positive(args.amount, "amount")?;
        let amount = self.denoms.to_chain_units(args.amount, "inj")?;

        Ok(wire::MsgDelegate {
            delegator_address: self.sender.address().to_string(),
            validator_address: validator,
            amount: Some(wire::Coin {
                denom: "inj".to_string(),
                amount,
            }),
        }
        .to_any())
    }

    pub fn create_denom(&self, args: &CreateDenomArgs) -> ChainResult<wire::Any> {
        let subdenom = validate_subdenom(&args.subdenom)?;
        require_nonempty(&args.name, "name")?;
        require_nonempty(&args.symbol, "symbol")?;

        Ok(wire::MsgCreateDenom {
            sender: self.sender.address().to_string(),
            subdenom,
            name: args.name.clone(),
            symbol: args.symbol.clone(),
            decimals: args.decimals,
        }
        .to_any())
    }

    pub fn mint(&self, args: &MintBurnArgs) -> ChainResult<wire::Any> {
        let amount = self.factory_coin(args)?;
        Ok(wire::MsgMint {
            sender: self.sender.address().to_string(),
            amount: Some(amount),
        }
        .to_any())
    }

    pub fn burn(&self, args: &MintBurnArgs) -> ChainResult<wire::Any> {
        let amount = self.factory_coin(args)?;
        Ok(wire::MsgBurn {
            sender: self.sender.address().to_string(),
            amount: Some(amount),
        }
        .to_any())
    }

    pub fn set_denom_metadata(&self, args: &SetDenomMetadataArgs) -> ChainResult<wire::Any> {
        let subdenom = validate_subdenom(&args.subdenom)?;
        require_nonempty(&args.name, "name")?;
        require_nonempty(&args.symbol, "symbol")?;
        let base = format!("factory/{}/{subdenom}", self.sender.address());

        Ok(wire::MsgSetDenomMetadata {
            sender: self.sender.address().to_string(),
            metadata: Some(wire::Metadata {
                description: args.description.clone(),
                denom_units: vec![
                    wire::DenomUnit {
                        denom: base.clone(),
                        exponent: 0,
                        aliases: Vec::new(),
                    },
                    wire::DenomUnit {
                        denom: args.symbol.clone(),
                        exponent: args.decimals,
                        aliases: Vec::new(),
                    },
                ],
                base,
                display: args.symbol.clone(),
                name: args.name.clone(),
                symbol: args.symbol.clone(),
                uri: args.uri.clone(),
                uri_hash: args.uri_hash.clone(),
            }),
        }
        .to_any())
    }

    pub fn contract_execute(&self, args: &ContractExecuteArgs) -> ChainResult<wire::Any> {
        let contract = validate_account_address(&args.contract_address, "contract_address")?;
        if !args.payload.is_object() {
            return Err(invalid("payload", "must be a JSON object"));
        }
        let msg = serde_json::to_vec(&args.payload).map_err(|e| {
            invalid("payload", format!("not serializable: {e}"))
        })?;

        let mut funds = Vec::with_capacity(args.funds.len());
        for fund in &args.funds {
            require_positive(fund.amount, "funds.amount")?;
            funds.push(wire::Coin {
                amount: self.denoms.to_chain_units(fund.amount, &fund.denom)?,
                denom: fund.denom.clone(),
            });
        }
        // The bank module requires attached coins sorted by denom.
        funds.sort_by(|a, b| a.denom.cmp(&b.denom));

        Ok(wire::MsgExecuteContract {
            sender: self.sender.address().to_string(),
            contract,
            msg,
            funds,
        }
        .to_any())
    }

    /// Vault deposit, expressed as a contract execution against the vault
    /// master with a `subscribe` payload and the deposit attached as funds.
    pub fn vault_subscribe(&self, args: &VaultSubscribeArgs) -> ChainResult<wire::Any> {
        let vault_subaccount =
            validate_subaccount_id(&args.vault_subaccount_id, "vault_subaccount_id")?;
        let mut subscribe = serde_json::Map::new();
        if let Some(max_penalty) = args.max_penalty {
            subscribe.insert(
                "slippage".to_string(),
                serde_json::json!({ "max_penalty": max_penalty.to_string() }),
            );
        }

        let mut funds: Vec<FundCoin> = args.base.iter().cloned().collect();
        funds.push(args.quote.clone());

        self.contract_execute(&ContractExecuteArgs {
            contract_address: args.vault_master_address.clone(),
            payload: serde_json::json!({
                "vault_subaccount_id": vault_subaccount,
                "trader_subaccount_id": self.sender.subaccount_id(args.trader_subaccount_index),
                "msg": { "subscribe": subscribe },
            }),
            funds,
        })
    }

    /// Vault withdrawal: `redeem` payload with the LP tokens attached.
    pub fn vault_redeem(&self, args: &VaultRedeemArgs) -> ChainResult<wire::Any> {
        let vault_subaccount =
            validate_subaccount_id(&args.vault_subaccount_id, "vault_subaccount_id")?;
        require_nonempty(&args.redemption_type, "redemption_type")?;
        let mut redeem = serde_json::Map::new();
        if let Some(max_penalty) = args.max_penalty {
            redeem.insert(
                "slippage".to_string(),
                serde_json::json!({ "max_penalty": max_penalty.to_string() }),
            );
        }
        redeem.insert(
            "redemption_type".to_string(),
            serde_json::Value::String(args.redemption_type.clone()),
        );

        self.contract_execute(&ContractExecuteArgs {
            contract_address: args.vault_master_address.clone(),
            payload: serde_json::json!({
                "vault_subaccount_id": vault_subaccount,
                "trader_subaccount_id": self.sender.subaccount_id(args.trader_subaccount_index),
                "msg": { "redeem": redeem },
            }),
            funds: vec![args.lp.clone()],
        })
    }

    /// Bid on a burn-auction round. Bids are always denominated in INJ.
    pub fn auction_bid(&self, args: &AuctionBidArgs) -> ChainResult<wire::Any> {
        if args.round == 0 {
            return Err(invalid("round", "must be positive"));
        }
        require_positive(args.amount, "amount")?;
        let amount = self.denoms.to_chain_units(args.amount, "inj")?;

        Ok(wire::MsgBid {
            sender: self.sender.address().to_string(),
            bid_amount: Some(wire::Coin {
                denom: "inj".to_string(),
                amount,
            }),
            round: args.round,
        }
        .to_any())
    }

    /// Grant the grantee authority to execute one message type on the
    /// sender's behalf, expiring `expire_in_seconds` from now.
    pub fn authz_grant(&self, args: &AuthzGrantArgs) -> ChainResult<wire::Any> {
        let grantee = validate_account_address(&args.grantee, "grantee")?;
        let msg_type_url = validate_msg_type_url(&args.msg_type_url)?;
        if args.expire_in_seconds == 0 {
            return Err(invalid("expire_in_seconds", "must be positive"));
        }
        let expire_in = i64::try_from(args.expire_in_seconds)
            .map_err(|_| invalid("expire_in_seconds", "does not fit a timestamp"))?;

        Ok(wire::MsgGrant {
            granter: self.sender.address().to_string(),
            grantee,
            grant: Some(wire::Grant {
                authorization: Some(
                    wire::GenericAuthorization { msg: msg_type_url }.to_any(),
                ),
                expiration: Some(wire::Timestamp {
                    seconds: chrono::Utc::now().timestamp().saturating_add(expire_in),
                    nanos: 0,
                }),
            }),
        }
        .to_any())
    }

    pub fn authz_revoke(&self, args: &AuthzRevokeArgs) -> ChainResult<wire::Any> {
        let grantee = validate_account_address(&args.grantee, "grantee")?;
        let msg_type_url = validate_msg_type_url(&args.msg_type_url)?;

        Ok(wire::MsgRevoke {
            granter: self.sender.address().to_string(),
            grantee,
            msg_type_url,
        }
        .to_any())
    }

    /// Withdraw funds to an Ethereum address over the Peggy bridge. The
    /// bridge fee is caller-supplied and shares the amount's denom.
    pub fn send_to_eth(&self, args: &SendToEthArgs) -> ChainResult<wire::Any> {
        let eth_dest = validate_eth_address(&args.eth_dest)?;
        require_positive(args.amount, "amount")?;
        require_positive(args.bridge_fee, "bridge_fee")?;
        let amount = self.denoms.to_chain_units(args.amount, &args.denom)?;
        let bridge_fee = self.denoms.to_chain_units(args.bridge_fee, &args.denom)?;

        Ok(wire::MsgSendToEth {
            sender: self.sender.address().to_string(),
            eth_dest,
            amount: Some(wire::Coin {
                denom: args.denom.clone(),
                amount,
            }),
            bridge_fee: Some(wire::Coin {
                denom: args.denom.clone(),
                amount: bridge_fee,
            }),
        }
        .to_any())
    }

    fn order_info(
        &self,
        subaccount_index: u32,
        fee_recipient: Option<&str>,
        price: Decimal,
        quantity: Decimal,
    ) -> ChainResult<wire::OrderInfo> {
        let fee_recipient = match fee_recipient {
            Some(addr) => validate_account_address(addr, "fee_recipient")?,
            None => self.sender.address().to_string(),
        };
        Ok(wire::OrderInfo {
            subaccount_id: self.sender.subaccount_id(subaccount_index),
            fee_recipient,
            price: to_chain_dec(price, "price")?,
            quantity: to_chain_dec(quantity, "quantity")?,
            cid: Uuid::new_v4().to_string(),
        })
    }

    fn factory_coin(&self, args: &MintBurnArgs) -> ChainResult<wire::Coin> {
        let prefix = format!("factory/{}/", self.sender.address());
        if !args.denom.starts_with(&prefix) {
            return Err(invalid(
                "denom",
                format!("'{}' is not a factory denom of the sender", args.denom),
            ));
        }
        let units: u128 = args
            .amount
            .trim()
            .parse()
            .map_err(|_| invalid("amount", "must be an integer amount in base units"))?;
        if units == 0 {
            return Err(invalid("amount", "must be positive"));
        }
        Ok(wire::Coin {
            denom: args.denom.clone(),
            amount: units.to_string(),
        })
    }
}

// --- validation helpers ---

pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> ChainError {
    ChainError::InvalidArgument {
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn require_positive(value: Decimal, field: &str) -> ChainResult<Decimal> {
    if value <= Decimal::ZERO {
        return Err(invalid(field, format!("must be positive, got {value}")));
    }
    Ok(value)
}

fn require_nonempty(value: &str, field: &str) -> ChainResult<()> {
    if value.trim().is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    Ok(())
}

fn validate_account_address(value: &str, field: &str) -> ChainResult<String> {
    let account: cosmrs::AccountId = value
        .trim()
        .parse()
        .map_err(|e| invalid(field, format!("not a bech32 address: {e}")))?;
    if account.prefix() != ADDRESS_PREFIX {
        return Err(invalid(
            field,
            format!("expected '{ADDRESS_PREFIX}' prefix, got '{}'", account.prefix()),
        ));
    }
    Ok(account.to_string())
}

fn validate_validator_address(value: &str) -> ChainResult<String> {
    let account: cosmrs::AccountId = value
        .trim()
        .parse()
        .map_err(|e| invalid("validator_address", format!("not a bech32 address: {e}")))?;
    if account.prefix() != VALIDATOR_PREFIX {
        return Err(invalid(
            "validator_address",
            format!("expected '{VALIDATOR_PREFIX}' prefix, got '{}'", account.prefix()),
        ));
    }
    Ok(account.to_string())
}

fn validate_subaccount_id(value: &str, field: &str) -> ChainResult<String> {
    let trimmed = value.trim();
    let hex_part = trimmed.strip_prefix("0x").ok_or_else(|| {
        invalid(field, "must start with 0x")
    })?;
    if hex_part.len() != 64 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid(field, "must be 0x followed by 64 hex characters"));
    }
    Ok(trimmed.to_ascii_lowercase())
}

fn validate_msg_type_url(value: &str) -> ChainResult<String> {
    let trimmed = value.trim();
    if !trimmed.starts_with('/') || trimmed.len() < 2 {
        return Err(invalid(
            "msg_type_url",
            "must be a fully-qualified type url starting with '/'",
        ));
    }
    Ok(trimmed.to_string())
}

fn validate_eth_address(value: &str) -> ChainResult<String> {
    let trimmed = value.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .ok_or_else(|| invalid("eth_dest", "must start with 0x"))?;
    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid(
            "eth_dest",
            "must be 0x followed by 40 hex characters",
        ));
    }
    Ok(format!("0x{}", hex_part.to_ascii_lowercase()))
}

fn validate_order_hash(value: &str) -> ChainResult<String> {
    let trimmed = value.trim();
    let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if hex_part.len() != 64 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid(
            "order_hash",
            "must be a 32-byte hex hash, 0x prefix optional",
        ));
    }
    Ok(format!("0x{}", hex_part.to_ascii_lowercase()))
}

fn validate_subdenom(value: &str) -> ChainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.len() > 44 {
        return Err(invalid("subdenom", "must be 1-44 characters"));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
    {
        return Err(invalid(
            "subdenom",
            "only alphanumerics, '.', '-', '_' allowed",
        ));
    }
    Ok(trimmed.to_string())
}

/// Render a decimal in the exchange module's 18-place fixed-point encoding.
fn to_chain_dec(value: Decimal, field: &str) -> ChainResult<String> {
    scale_to_integer(value, CHAIN_DEC_PLACES)
        .ok_or_else(|| invalid(field, format!("'{value}' does not fit the chain encoding")))
}
