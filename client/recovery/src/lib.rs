//! Social recovery client.
//!
//! Orchestration half of the recovery client. It reads chain state through a
//! [`ChainQuery`], derives dashboards with `qp_recovery`, and prepares calls for a
//! [`ChainSubmit`] after checking that the pallet would accept them.
//!
//! - [`RecoveryView`]: friend groups, attempts and per-group eligibility of one lost account
//! - [`InheritedView`]: accounts the viewer inherited, with balances and contest risk
//! - [`ActionDispatcher`]: initiate, approve, finish, cancel, slash, configure, withdraw
//! - [`ConnectionManager`]: the websocket client of the selected network
//!
//! Reads degrade instead of failing: a missing view function or a broken record
//! turns into an empty value and a warning under the `recovery` log target.

pub mod actions;
pub mod aggregator;
pub mod config;
pub mod connection;
mod error;
pub mod guard;
pub mod inherited;
pub mod query;
pub mod rpc;
pub mod submit;
pub mod tx;


pub use actions::{ActionDispatcher, Confirmation};
pub use aggregator::{
	AttemptWithGroup, GroupView, RecoveryAggregator, RecoveryDashboard, RecoveryView,
};
pub use config::{ClientConfig, NetworkConfig, TokenFormat};
pub use connection::{ConnectionManager, ConnectionState, Connector};
pub use error::{Error, Result};
pub use guard::{Refresh, ViewSlot};
pub use inherited::{InheritedAccount, InheritedAccountsAggregator, InheritedView};
pub use query::ChainQuery;
pub use rpc::{RpcChainQuery, WsConnector};
pub use submit::{ChainSubmit, SignerHandle, Submission, TxEvent};
pub use tx::{translate_dispatch_error, TxOutcome, TxStatus, TxTracker};

pub const LOG_TARGET: &str = "recovery";
