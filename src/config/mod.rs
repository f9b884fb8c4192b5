//! Configuration for injagent.
//!
//! Resolution priority: env var > built-in network default. There is no
//! config file beyond `.env` (loaded via dotenvy early in startup); the
//! private key comes from `INJECTIVE_PRIVATE_KEY` only, never a flag, and
//! stays wrapped in a `SecretString` until key derivation.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::error::ConfigError;

/// Default gas price on Injective, in inj-wei per gas unit.
pub const DEFAULT_GAS_PRICE: u64 = 500_000_000;

/// Additive safety buffer on top of simulated gas usage.
pub const DEFAULT_GAS_BUFFER: u64 = 30_000;

/// Blocks past the current height before an unincluded transaction expires.
pub const DEFAULT_TIMEOUT_HEIGHT_HORIZON: u64 = 20;

/// Static gas limit for externally-signed transactions, which cannot be
/// simulated (there is no key to produce the throwaway signature with).
pub const EXTERNAL_SIGNING_GAS_LIMIT: u64 = 2 * DEFAULT_GAS_BUFFER;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Target chain network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn parse(value: &str, key: &str) -> Result<Self, ConfigError> {
        match normalize_variant(value).as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected 'mainnet' or 'testnet', got '{value}'"),
            }),
        }
    }

    pub fn chain_id(self) -> &'static str {
        match self {
            Self::Mainnet => "injective-1",
            Self::Testnet => "injective-888",
        }
    }

    fn default_lcd_endpoint(self) -> &'static str {
        match self {
            Self::Mainnet => "https://sentry.lcd.injective.network:443",
            Self::Testnet => "https://testnet.sentry.lcd.injective.network:443",
        }
    }

    fn default_grpc_endpoint(self) -> &'static str {
        match self {
            Self::Mainnet => "sentry.chain.grpc.injective.network:443",
            Self::Testnet => "testnet.sentry.chain.grpc.injective.network:443",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved per-network configuration consumed by sessions and pipelines.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub network: Network,
    pub chain_id: String,
    pub fee_denom: String,
    /// Price per gas unit in the smallest fee-denom unit (inj-wei).
    pub gas_price: u64,
    /// Additive buffer applied to simulated gas usage.
    pub gas_buffer: u64,
    /// Blocks past current height before the transaction expires.
    pub timeout_height_horizon: u64,
    pub lcd_endpoint: String,
    pub grpc_endpoint: String,
    pub request_timeout: Duration,
}

impl NetworkConfig {
    /// Built-in defaults for a network, no environment consulted.
    pub fn for_network(network: Network) -> Self {
        Self {
            network,
            chain_id: network.chain_id().to_string(),
            fee_denom: "inj".to_string(),
            gas_price: DEFAULT_GAS_PRICE,
            gas_buffer: DEFAULT_GAS_BUFFER,
            timeout_height_horizon: DEFAULT_TIMEOUT_HEIGHT_HORIZON,
            lcd_endpoint: network.default_lcd_endpoint().to_string(),
            grpc_endpoint: network.default_grpc_endpoint().to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Resolve from the environment on top of network defaults.
    pub fn resolve(network: Network) -> Result<Self, ConfigError> {
        let mut config = Self::for_network(network);

        if let Some(value) = optional_env("INJAGENT_LCD_URL") {
            Url::parse(&value).map_err(|e| ConfigError::InvalidValue {
                key: "INJAGENT_LCD_URL".to_string(),
                message: format!("must be a valid URL: {e}"),
            })?;
            config.lcd_endpoint = value.trim_end_matches('/').to_string();
        }

        if let Some(value) = optional_env("INJAGENT_GRPC_ENDPOINT") {
            config.grpc_endpoint = value;
        }

        if let Some(gas_price) = parse_env_u64("INJAGENT_GAS_PRICE")? {
            if gas_price == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "INJAGENT_GAS_PRICE".to_string(),
                    message: "must be > 0".to_string(),
                });
            }
            config.gas_price = gas_price;
        }

        if let Some(gas_buffer) = parse_env_u64("INJAGENT_GAS_BUFFER")? {
            config.gas_buffer = gas_buffer;
        }

        if let Some(horizon) = parse_env_u64("INJAGENT_TIMEOUT_HORIZON")? {
            if horizon == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "INJAGENT_TIMEOUT_HORIZON".to_string(),
                    message: "must be > 0".to_string(),
                });
            }
            config.timeout_height_horizon = horizon;
        }

        if let Some(secs) = parse_env_u64("INJAGENT_REQUEST_TIMEOUT_SECS")? {
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "INJAGENT_REQUEST_TIMEOUT_SECS".to_string(),
                    message: "must be > 0".to_string(),
                });
            }
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

/// Process-level settings resolved once at startup.
#[derive(Debug)]
pub struct AgentConfig {
    pub network_config: NetworkConfig,
    /// Hex-encoded private key, absent when running in external-signing mode.
    pub private_key: Option<SecretString>,
}

impl AgentConfig {
    /// Resolve network selection and key material from the environment.
    ///
    /// `network_flag` comes from the CLI (`--network`) and wins over
    /// `INJAGENT_NETWORK`; testnet is the default when neither is set.
    pub fn resolve(network_flag: Option<&str>) -> Result<Self, ConfigError> {
        let network = match network_flag {
            Some(value) => Network::parse(value, "--network")?,
            None => match optional_env("INJAGENT_NETWORK") {
                Some(value) => Network::parse(&value, "INJAGENT_NETWORK")?,
                None => Network::Testnet,
            },
        };

        let private_key = optional_env("INJECTIVE_PRIVATE_KEY").map(SecretString::from);

        Ok(Self {
            network_config: NetworkConfig::resolve(network)?,
            private_key,
        })
    }

    /// The configured key, or a `MissingEnvVar` error for commands that sign.
    pub fn require_private_key(&self) -> Result<&SecretString, ConfigError> {
        self.private_key
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("INJECTIVE_PRIVATE_KEY".to_string()))
    }
}

pub(crate) fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env_u64(key: &str) -> Result<Option<u64>, ConfigError> {
    optional_env(key)
        .map(|s| s.parse())
        .transpose()
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("must be a non-negative integer: {e}"),
        })
}

fn normalize_variant(value: &str) -> String {
    value.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}
