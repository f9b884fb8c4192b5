//! Ticker normalization and market resolution.
//!
//! Users write tickers every way imaginable (`btcusdt`, `BTC-USDT`,
//! `btc/usdt perp`); the chain wants a 32-byte market id. Normalization
//! produces one canonical base/quote/scope triple from any of those forms,
//! and the resolver matches it against the exchange's listed markets,
//! refusing to guess when the match is not unique.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::chain::{ChainRpc, MarketListing};
use crate::error::{ChainError, ChainResult};
use crate::msg::MarketScope;

/// Quote currency assumed when the ticker names only a base.
const DEFAULT_QUOTE: &str = "USDT";

/// Tokens that mark a ticker as targeting the derivative book.
const DERIVATIVE_KEYWORDS: [&str; 4] = ["PERP", "PERPETUAL", "FUTURES", "SWAP"];

/// A ticker reduced to its canonical parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalMarket {
    pub base: String,
    pub quote: String,
    pub scope: MarketScope,
}

impl CanonicalMarket {
    /// Canonical pair string, `BASE/QUOTE`.
    pub fn ticker(&self) -> String {
        format!("{}/{}", self.base, self.quote)
    }
}

/// A canonical ticker matched to exactly one listed market.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedMarket {
    pub market_id: String,
    /// Ticker exactly as the exchange lists it.
    pub listed_ticker: String,
    pub base: String,
    pub quote: String,
    pub scope: MarketScope,
}

/// Reduce any user-facing ticker spelling to a canonical form.
///
/// Splits on `/`, `-`, `_` and whitespace before stripping stray
/// punctuation, so separator-written pairs keep their boundary. A derivative
/// keyword anywhere in the ticker selects the derivative book; without one
/// the ticker is treated as spot.
pub fn normalize_ticker(raw: &str) -> ChainResult<CanonicalMarket> {
    let upper = raw.trim().to_ascii_uppercase();
    let mut tokens: Vec<String> = upper
        .split(|c: char| matches!(c, '/' | '-' | '_') || c.is_whitespace())
        .map(|token| {
            token
                .chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
        })
        .filter(|token| !token.is_empty())
        .collect();

    let scope = if tokens
        .iter()
        .any(|token| DERIVATIVE_KEYWORDS.contains(&token.as_str()))
    {
        MarketScope::Derivative
    } else {
        MarketScope::Spot
    };
    tokens.retain(|token| !DERIVATIVE_KEYWORDS.contains(&token.as_str()));

    let (base, quote) = match tokens.as_slice() {
        [] => {
            return Err(ChainError::InvalidArgument {
                field: "ticker".to_string(),
                reason: format!("'{raw}' contains no currency symbols"),
            });
        }
        [pair] => match pair.strip_suffix(DEFAULT_QUOTE) {
            // Fused spellings like "BTCUSDT".
            Some(stripped) if !stripped.is_empty() => {
                (stripped.to_string(), DEFAULT_QUOTE.to_string())
            }
            _ => (pair.clone(), DEFAULT_QUOTE.to_string()),
        },
        [base, quote] => (base.clone(), quote.clone()),
        _ => {
            return Err(ChainError::InvalidArgument {
                field: "ticker".to_string(),
                reason: format!("'{raw}' has more than two currency segments"),
            });
        }
    };

    Ok(CanonicalMarket { base, quote, scope })
}

/// Validate and canonicalize an on-chain market id: 32 bytes of hex, `0x`
/// prefix optional on input, always present lowercase on output.
pub fn validate_market_id(value: &str) -> ChainResult<String> {
    let trimmed = value.trim();
    if !is_market_hash(trimmed) {
        return Err(ChainError::InvalidArgument {
            field: "market_id".to_string(),
            reason: format!("'{value}' is not a 32-byte hex market id"),
        });
    }
    let bare = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    Ok(format!("0x{}", bare.to_ascii_lowercase()))
}

/// 32 bytes of hex, `0x` prefix optional. Every order build validates a
/// market id, so the pattern is compiled once.
static MARKET_HASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(0x)?[0-9a-fA-F]{64}$").expect("market id pattern"));

fn is_market_hash(value: &str) -> bool {
    MARKET_HASH_RE.is_match(value)
}

#[derive(Default)]
struct ListingCache {
    derivative: Option<Arc<Vec<MarketListing>>>,
    spot: Option<Arc<Vec<MarketListing>>>,
}

/// Matches canonical tickers against the exchange's listed markets.
///
/// Listings are fetched lazily, once per scope, and held for the resolver's
/// lifetime; market listings change on governance timescales, not request
/// timescales.
pub struct MarketResolver {
    rpc: Arc<dyn ChainRpc>,
    cache: Mutex<ListingCache>,
}

impl MarketResolver {
    pub fn new(rpc: Arc<dyn ChainRpc>) -> Self {
        Self {
            rpc,
            cache: Mutex::new(ListingCache::default()),
        }
    }

    /// Resolve a raw ticker to the unique listed market it names.
    ///
    /// Zero matches and multiple matches both come back as
    /// [`ChainError::AmbiguousMarket`]; picking a market on the caller's
    /// behalf is how funds end up in the wrong book.
    pub async fn resolve(&self, ticker: &str) -> ChainResult<ResolvedMarket> {
        let canonical = normalize_ticker(ticker)?;
        let listings = self.listings(canonical.scope).await?;

        let matches: Vec<&MarketListing> = listings
            .iter()
            .filter(|listing| listing_matches(listing, &canonical))
            .collect();

        match matches.as_slice() {
            [listing] => Ok(ResolvedMarket {
                market_id: validate_market_id(&listing.market_id)?,
                listed_ticker: listing.ticker.clone(),
                base: canonical.base,
                quote: canonical.quote,
                scope: canonical.scope,
            }),
            [] => Err(ChainError::AmbiguousMarket {
                ticker: canonical.ticker(),
                detail: format!("no listed {} market matches", canonical.scope),
            }),
            many => Err(ChainError::AmbiguousMarket {
                ticker: canonical.ticker(),
                detail: format!("{} listed {} markets match", many.len(), canonical.scope),
            }),
        }
    }

    /// All cached listings for a scope, keyed by listed ticker. Used by the
    /// diagnostics surface to show what the resolver is matching against.
    pub async fn listing_table(&self, scope: MarketScope) -> ChainResult<HashMap<String, String>> {
        let listings = self.listings(scope).await?;
        Ok(listings
            .iter()
            .map(|listing| (listing.ticker.clone(), listing.market_id.clone()))
            .collect())
    }

    async fn listings(&self, scope: MarketScope) -> ChainResult<Arc<Vec<MarketListing>>> {
        let mut cache = self.cache.lock().await;
        let slot = match scope {
            MarketScope::Derivative => &mut cache.derivative,
            MarketScope::Spot => &mut cache.spot,
        };
        if let Some(listings) = slot {
            return Ok(listings.clone());
        }

        let fetched = Arc::new(match scope {
            MarketScope::Derivative => self.rpc.derivative_markets().await?,
            MarketScope::Spot => self.rpc.spot_markets().await?,
        });
        tracing::debug!(
            scope = %scope,
            count = fetched.len(),
            "market listings fetched"
        );
        *slot = Some(fetched.clone());
        Ok(fetched)
    }
}

/// A listing matches when its own ticker normalizes to the same base and
/// quote. Scope is already fixed by which list the listing came from.
fn listing_matches(listing: &MarketListing, canonical: &CanonicalMarket) -> bool {
    normalize_ticker(&listing.ticker)
        .map(|listed| listed.base == canonical.base && listed.quote == canonical.quote)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{
        AccountEntry, RawBalance, SimulationOutcome, TxAck, TxStatus,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    const BTC_PERP_ID: &str =
        "0x4ca0f92fc28be0c9761326016b5a1a2177dd6375558365116b5bdda9abc229ce";
    const INJ_SPOT_ID: &str =
        "0xa508cb32923323679f29a032c70342c147c17d0145625922b0ef22e955c844c0";

    #[test]
    fn spelling_variants_normalize_identically() {
        let fused = normalize_ticker("btcusdt").expect("fused");
        let dashed = normalize_ticker("BTC-USDT").expect("dashed");
        let slashed = normalize_ticker("btc/usdt").expect("slashed");

        assert_eq!(fused, dashed);
        assert_eq!(dashed, slashed);
        assert_eq!(fused.base, "BTC");
        assert_eq!(fused.quote, "USDT");
        assert_eq!(fused.ticker(), "BTC/USDT");
    }

    #[test]
    fn derivative_keywords_select_scope() {
        assert_eq!(
            normalize_ticker("BTC-PERP").expect("perp").scope,
            MarketScope::Derivative
        );
        assert_eq!(
            normalize_ticker("btc/usdt perpetual").expect("perpetual").scope,
            MarketScope::Derivative
        );
        assert_eq!(
            normalize_ticker("eth futures").expect("futures").scope,
            MarketScope::Derivative
        );

        // No keyword means spot.
        let bare = normalize_ticker("BTC").expect("bare");
        assert_eq!(bare.scope, MarketScope::Spot);
        assert_eq!(bare.quote, "USDT");
    }

    #[test]
    fn separators_survive_punctuation_cleanup() {
        // The boundary must be honored before stray punctuation is dropped,
        // or "atom-usdt" collapses into a single unsplittable token.
        let canonical = normalize_ticker("  Atom - Usdt  ").expect("spaced");
        assert_eq!(canonical.base, "ATOM");
        assert_eq!(canonical.quote, "USDT");
    }

    #[test]
    fn garbage_tickers_are_rejected() {
        assert!(normalize_ticker("").is_err());
        assert!(normalize_ticker("///").is_err());
        assert!(normalize_ticker("a/b/c/d").is_err());
        assert!(normalize_ticker("perp").is_err());
    }

    #[test]
    fn market_ids_canonicalize_to_prefixed_lowercase() {
        let bare = BTC_PERP_ID.trim_start_matches("0x").to_ascii_uppercase();
        assert_eq!(validate_market_id(&bare).expect("bare"), BTC_PERP_ID);
        assert_eq!(validate_market_id(BTC_PERP_ID).expect("prefixed"), BTC_PERP_ID);

        assert!(validate_market_id("0x1234").is_err());
        assert!(validate_market_id("not-hex").is_err());
    }

    struct ListingRpc {
        derivative: Vec<MarketListing>,
        spot: Vec<MarketListing>,
        derivative_fetches: AtomicU32,
    }

    impl ListingRpc {
        fn new(derivative: Vec<MarketListing>, spot: Vec<MarketListing>) -> Self {
            Self {
                derivative,
                spot,
                derivative_fetches: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl ChainRpc for ListingRpc {
        async fn account(&self, _address: &str) -> ChainResult<AccountEntry> {
            Err(not_scripted())
        }
        async fn simulate(&self, _tx_bytes: &[u8]) -> ChainResult<SimulationOutcome> {
            Err(not_scripted())
        }
        async fn broadcast_sync(&self, _tx_bytes: &[u8]) -> ChainResult<TxAck> {
            Err(not_scripted())
        }
        async fn latest_block_height(&self) -> ChainResult<u64> {
            Err(not_scripted())
        }
        async fn denom_decimals(&self) -> ChainResult<HashMap<String, u32>> {
            Err(not_scripted())
        }
        async fn derivative_markets(&self) -> ChainResult<Vec<MarketListing>> {
            self.derivative_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.derivative.clone())
        }
        async fn spot_markets(&self) -> ChainResult<Vec<MarketListing>> {
            Ok(self.spot.clone())
        }
        async fn balances(&self, _address: &str) -> ChainResult<Vec<RawBalance>> {
            Err(not_scripted())
        }
        async fn tx_by_hash(&self, _tx_hash: &str) -> ChainResult<TxStatus> {
            Err(not_scripted())
        }
    }

    fn not_scripted() -> ChainError {
        ChainError::Unknown {
            cause: "not scripted".to_string(),
        }
    }

    fn listing(ticker: &str, market_id: &str) -> MarketListing {
        MarketListing {
            ticker: ticker.to_string(),
            market_id: market_id.to_string(),
        }
    }

    #[tokio::test]
    async fn resolves_unique_listing_per_scope() {
        let rpc = Arc::new(ListingRpc::new(
            vec![
                listing("BTC/USDT PERP", BTC_PERP_ID),
                listing("ETH/USDT PERP", &format!("0x{}", "e".repeat(64))),
            ],
            vec![listing("INJ/USDT", INJ_SPOT_ID)],
        ));
        let resolver = MarketResolver::new(rpc);

        let market = resolver.resolve("btc perp").await.expect("derivative");
        assert_eq!(market.market_id, BTC_PERP_ID);
        assert_eq!(market.listed_ticker, "BTC/USDT PERP");
        assert_eq!(market.scope, MarketScope::Derivative);

        let market = resolver.resolve("inj/usdt").await.expect("spot");
        assert_eq!(market.market_id, INJ_SPOT_ID);
        assert_eq!(market.scope, MarketScope::Spot);
    }

    #[tokio::test]
    async fn zero_and_multiple_matches_are_ambiguous() {
        let rpc = Arc::new(ListingRpc::new(
            vec![
                listing("BTC/USDT PERP", BTC_PERP_ID),
                listing("BTC/USDT PERPETUAL", &format!("0x{}", "b".repeat(64))),
            ],
            Vec::new(),
        ));
        let resolver = MarketResolver::new(rpc);

        let err = resolver.resolve("doge perp").await.unwrap_err();
        assert!(matches!(err, ChainError::AmbiguousMarket { .. }));
        assert!(err.to_string().contains("DOGE/USDT"));

        let err = resolver.resolve("btc perp").await.unwrap_err();
        assert!(matches!(err, ChainError::AmbiguousMarket { .. }));
        assert!(err.to_string().contains("2 listed"));
    }

    #[tokio::test]
    async fn listings_are_fetched_once_per_scope() {
        let rpc = Arc::new(ListingRpc::new(
            vec![listing("BTC/USDT PERP", BTC_PERP_ID)],
            Vec::new(),
        ));
        let resolver = MarketResolver::new(rpc.clone());

        resolver.resolve("btc perp").await.expect("first");
        resolver.resolve("btc-perp").await.expect("second");
        assert_eq!(rpc.derivative_fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn listing_table_reports_cached_listings_by_ticker() {
        let rpc = Arc::new(ListingRpc::new(
            vec![listing("BTC/USDT PERP", BTC_PERP_ID)],
            vec![listing("INJ/USDT", INJ_SPOT_ID)],
        ));
        let resolver = MarketResolver::new(rpc.clone());

        let table = resolver
            .listing_table(MarketScope::Derivative)
            .await
            .expect("derivative table");
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.get("BTC/USDT PERP").map(String::as_str),
            Some(BTC_PERP_ID)
        );

        // Same cache as resolution; the table does not refetch.
        resolver.resolve("btc perp").await.expect("resolve");
        assert_eq!(rpc.derivative_fetches.load(Ordering::SeqCst), 1);

        let spot = resolver
            .listing_table(MarketScope::Spot)
            .await
            .expect("spot table");
        assert_eq!(spot.get("INJ/USDT").map(String::as_str), Some(INJ_SPOT_ID));
    }
}
