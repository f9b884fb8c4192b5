//! Injective transaction core.
//!
//! Builds, simulates, signs, and broadcasts Injective chain transactions
//! behind a typed operation surface. Every operation takes the same path:
//!
//! 1. [`msg::MessageBuilder`] turns validated arguments into protobuf
//!    messages, with amounts scaled to chain fixed-point.
//! 2. [`pipeline::TransactionPipeline`] signs once for simulation, derives
//!    the gas limit and fee from the simulated usage, signs again, and
//!    broadcasts in sync mode.
//! 3. [`chain::ChainSession`] tracks the account sequence, advancing it only
//!    after an accepted broadcast.
//!
//! Private keys never leave [`identity::KeyedIdentity`]. Accounts whose keys
//! live elsewhere go through [`dispatch::Dispatcher::prepare`] and
//! [`dispatch::Dispatcher::broadcast_signed`] instead.

pub mod bootstrap;
pub mod chain;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod identity;
pub mod market;
pub mod msg;
pub mod pipeline;
pub mod queue;

pub use chain::ChainSession;
pub use config::{AgentConfig, Network, NetworkConfig};
pub use dispatch::{Dispatcher, ExecutionReport};
pub use error::{ChainError, ChainResult, Error};
pub use identity::KeyedIdentity;
pub use market::MarketResolver;
pub use msg::{MessageBuilder, OperationKind};
pub use pipeline::{BroadcastReceipt, PreparedTransaction};
