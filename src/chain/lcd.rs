//! LCD REST transport: the production [`ChainRpc`] implementation.
//!
//! Cosmos LCD renders proto uint64 fields as JSON strings; the parse helpers
//! here are strict about that. Idempotent listing and block reads retry on
//! 429/5xx with exponential backoff; simulate and broadcast never retry, and
//! neither do the lookups that branch on 404 (account, tx by hash).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;

use super::{
    AccountEntry, ChainRpc, MarketListing, RawBalance, SimulationOutcome, TxAck, TxStatus,
};
use crate::config::NetworkConfig;
use crate::error::{ChainError, ChainResult};

const MAX_GET_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY_MS: u64 = 250;

pub struct LcdClient {
    http: reqwest::Client,
    base_url: String,
}

impl LcdClient {
    pub fn new(config: &NetworkConfig) -> ChainResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ChainError::Unknown {
                cause: format!("http client build failed: {e}"),
            })?;

        Ok(Self {
            http,
            base_url: config.lcd_endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET with bounded retry on 429/5xx. Only idempotent reads go through
    /// here; writes (simulate, broadcast) have their own single-shot paths.
    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> ChainResult<T> {
        let url = self.url(path);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let response = self
                .http
                .get(&url)
                .send()
                .await
                .map_err(ChainError::from_transport)?;
            let status = response.status();

            if status.is_success() {
                return response.json::<T>().await.map_err(|e| ChainError::Unknown {
                    cause: format!("decoding {path}: {e}"),
                });
            }

            let retryable = status.as_u16() == 429 || status.is_server_error();
            if retryable && attempt < MAX_GET_ATTEMPTS {
                let delay = RETRY_BASE_DELAY_MS * 2u64.pow(attempt - 1);
                tracing::debug!(
                    path,
                    status = status.as_u16(),
                    attempt,
                    delay_ms = delay,
                    "retrying idempotent read"
                );
                tokio::time::sleep(Duration::from_millis(delay)).await;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(ChainError::Unknown {
                cause: format!(
                    "{path} returned {status}: {}",
                    extract_lcd_error(&body).unwrap_or(body)
                ),
            });
        }
    }

    fn encode_tx(tx_bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(tx_bytes)
    }
}

#[async_trait]
impl ChainRpc for LcdClient {
    async fn account(&self, address: &str) -> ChainResult<AccountEntry> {
        let url = self.url(&format!("/cosmos/auth/v1beta1/accounts/{address}"));
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(ChainError::from_transport)?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ChainError::AccountNotFound {
                address: address.to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChainError::Unknown {
                cause: format!(
                    "account lookup returned {status}: {}",
                    extract_lcd_error(&body).unwrap_or(body)
                ),
            });
        }

        let envelope: AccountResponse = response.json().await?;
        envelope.account.entry()
    }

    async fn simulate(&self, tx_bytes: &[u8]) -> ChainResult<SimulationOutcome> {
        let url = self.url("/cosmos/tx/v1beta1/simulate");
        let payload = serde_json::json!({ "tx_bytes": Self::encode_tx(tx_bytes) });
        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(ChainError::from_transport)?;
        let status = response.status();

        if !status.is_success() {
            // The node reports dry-run failures (insufficient funds, invalid
            // message) as a 4xx/5xx with a code/message body.
            let body = response.text().await.unwrap_or_default();
            return Err(ChainError::SimulationFailed {
                reason: extract_lcd_error(&body)
                    .unwrap_or_else(|| format!("simulate returned {status}")),
            });
        }

        let parsed: SimulateResponse = response.json().await?;
        let outcome = SimulationOutcome {
            gas_used: parse_u64(&parsed.gas_info.gas_used, "gas_used")?,
            gas_wanted: parse_u64(&parsed.gas_info.gas_wanted, "gas_wanted")?,
        };
        tracing::debug!(gas_used = outcome.gas_used, "simulation complete");
        Ok(outcome)
    }

    async fn broadcast_sync(&self, tx_bytes: &[u8]) -> ChainResult<TxAck> {
        let url = self.url("/cosmos/tx/v1beta1/txs");
        let payload = serde_json::json!({
            "tx_bytes": Self::encode_tx(tx_bytes),
            "mode": "BROADCAST_MODE_SYNC",
        });
        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(ChainError::from_transport)?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChainError::Unknown {
                cause: format!(
                    "broadcast returned {status}: {}",
                    extract_lcd_error(&body).unwrap_or(body)
                ),
            });
        }

        // Mempool rejections come back with HTTP 200 and a non-zero code in
        // the tx response; the caller decides what to do with it.
        let parsed: BroadcastResponse = response.json().await?;
        let tx = parsed.tx_response;
        Ok(TxAck {
            tx_hash: tx.txhash,
            code: tx.code,
            raw_log: tx.raw_log,
            height: parse_u64_lenient(&tx.height),
        })
    }

    async fn latest_block_height(&self) -> ChainResult<u64> {
        let parsed: LatestBlockResponse = self
            .get_json("/cosmos/base/tendermint/v1beta1/blocks/latest")
            .await?;
        parse_u64(&parsed.block.header.height, "block height")
    }

    async fn denom_decimals(&self) -> ChainResult<HashMap<String, u32>> {
        let parsed: DenomDecimalsResponse = self
            .get_json("/injective/exchange/v1beta1/exchange/denom_decimals")
            .await?;
        let mut table = HashMap::with_capacity(parsed.denom_decimals.len());
        for entry in parsed.denom_decimals {
            if let Ok(places) = entry.decimals.parse::<u32>() {
                table.insert(entry.denom, places);
            }
        }
        Ok(table)
    }

    async fn derivative_markets(&self) -> ChainResult<Vec<MarketListing>> {
        let parsed: DerivativeMarketsResponse = self
            .get_json("/injective/exchange/v1beta1/derivative/markets")
            .await?;
        Ok(parsed
            .markets
            .into_iter()
            .filter_map(|entry| entry.market)
            .filter(|m| !m.ticker.is_empty() && !m.market_id.is_empty())
            .map(|m| MarketListing {
                ticker: m.ticker,
                market_id: m.market_id,
            })
            .collect())
    }

    async fn spot_markets(&self) -> ChainResult<Vec<MarketListing>> {
        let parsed: SpotMarketsResponse = self
            .get_json("/injective/exchange/v1beta1/spot/markets")
            .await?;
        Ok(parsed
            .markets
            .into_iter()
            .filter(|m| !m.ticker.is_empty() && !m.market_id.is_empty())
            .map(|m| MarketListing {
                ticker: m.ticker,
                market_id: m.market_id,
            })
            .collect())
    }

    async fn balances(&self, address: &str) -> ChainResult<Vec<RawBalance>> {
        let parsed: BalancesResponse = self
            .get_json(&format!("/cosmos/bank/v1beta1/balances/{address}"))
            .await?;
        Ok(parsed
            .balances
            .into_iter()
            .map(|b| RawBalance {
                denom: b.denom,
                amount: b.amount,
            })
            .collect())
    }

    async fn tx_by_hash(&self, tx_hash: &str) -> ChainResult<TxStatus> {
        let url = self.url(&format!("/cosmos/tx/v1beta1/txs/{tx_hash}"));
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(ChainError::from_transport)?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ChainError::Unknown {
                cause: format!("transaction {tx_hash} not found (may not be included yet)"),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChainError::Unknown {
                cause: format!(
                    "tx lookup returned {status}: {}",
                    extract_lcd_error(&body).unwrap_or(body)
                ),
            });
        }

        let parsed: TxLookupResponse = response.json().await?;
        let tx = parsed.tx_response;
        Ok(TxStatus {
            tx_hash: tx.txhash,
            height: parse_u64_lenient(&tx.height),
            code: tx.code,
            raw_log: tx.raw_log,
            gas_wanted: parse_u64_lenient(&tx.gas_wanted),
            gas_used: parse_u64_lenient(&tx.gas_used),
        })
    }
}

fn parse_u64(value: &str, field: &str) -> ChainResult<u64> {
    value.parse().map_err(|_| ChainError::Unknown {
        cause: format!("unparseable {field} in LCD response: '{value}'"),
    })
}

fn parse_u64_lenient(value: &str) -> u64 {
    value.parse().unwrap_or(0)
}

/// Pull the `message` out of an LCD error body, e.g.
/// `{"code":5,"message":"insufficient funds","details":[]}`.
fn extract_lcd_error(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(|m| m.as_str())
        .map(|m| m.to_string())
        .filter(|m| !m.is_empty())
}

// --- response shapes ---

#[derive(Debug, Deserialize)]
struct AccountResponse {
    account: AccountObject,
}

/// Injective wraps accounts as `EthAccount { base_account }`; plain cosmos
/// accounts carry the fields at the top level. Accept both.
#[derive(Debug, Deserialize)]
struct AccountObject {
    #[serde(default)]
    base_account: Option<BaseAccountFields>,
    #[serde(default)]
    account_number: Option<String>,
    #[serde(default)]
    sequence: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BaseAccountFields {
    #[serde(default)]
    account_number: String,
    #[serde(default)]
    sequence: String,
}

impl AccountObject {
    fn entry(self) -> ChainResult<AccountEntry> {
        let (number, sequence) = match self.base_account {
            Some(base) => (base.account_number, base.sequence),
            None => (
                self.account_number.unwrap_or_default(),
                // A fresh account may omit sequence entirely.
                self.sequence.unwrap_or_else(|| "0".to_string()),
            ),
        };
        Ok(AccountEntry {
            account_number: parse_u64(&number, "account_number")?,
            sequence: parse_u64_lenient(&sequence),
        })
    }
}

#[derive(Debug, Deserialize)]
struct SimulateResponse {
    gas_info: GasInfo,
}

#[derive(Debug, Deserialize)]
struct GasInfo {
    #[serde(default)]
    gas_wanted: String,
    gas_used: String,
}

#[derive(Debug, Deserialize)]
struct BroadcastResponse {
    tx_response: TxResponseFields,
}

#[derive(Debug, Deserialize)]
struct TxLookupResponse {
    tx_response: TxResponseFields,
}

#[derive(Debug, Deserialize)]
struct TxResponseFields {
    #[serde(default)]
    txhash: String,
    #[serde(default)]
    code: u32,
    #[serde(default)]
    raw_log: String,
    #[serde(default)]
    height: String,
    #[serde(default)]
    gas_wanted: String,
    #[serde(default)]
    gas_used: String,
}

#[derive(Debug, Deserialize)]
struct LatestBlockResponse {
    block: BlockFields,
}

#[derive(Debug, Deserialize)]
struct BlockFields {
    header: HeaderFields,
}

#[derive(Debug, Deserialize)]
struct HeaderFields {
    height: String,
}

#[derive(Debug, Deserialize)]
struct DenomDecimalsResponse {
    #[serde(default)]
    denom_decimals: Vec<DenomDecimalEntry>,
}

#[derive(Debug, Deserialize)]
struct DenomDecimalEntry {
    denom: String,
    decimals: String,
}

#[derive(Debug, Deserialize)]
struct DerivativeMarketsResponse {
    #[serde(default)]
    markets: Vec<DerivativeMarketEntry>,
}

#[derive(Debug, Deserialize)]
struct DerivativeMarketEntry {
    #[serde(default)]
    market: Option<MarketFields>,
}

#[derive(Debug, Deserialize)]
struct SpotMarketsResponse {
    #[serde(default)]
    markets: Vec<MarketFields>,
}

#[derive(Debug, Deserialize)]
struct MarketFields {
    #[serde(default)]
    ticker: String,
    #[serde(default)]
    market_id: String,
}

#[derive(Debug, Deserialize)]
struct BalancesResponse {
    #[serde(default)]
    balances: Vec<BalanceFields>,
}

#[derive(Debug, Deserialize)]
struct BalanceFields {
    denom: String,
    amount: String,
}
