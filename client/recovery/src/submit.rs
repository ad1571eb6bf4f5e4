//! Write side of the chain. Signing and broadcasting live behind [`ChainSubmit`];
//! this crate only prepares calls and follows their status.

use async_trait::async_trait;
use futures::stream::BoxStream;
use qp_recovery::{AccountId, RecoveryCall};

use crate::Result;

/// Reference to a signer held by the wallet layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignerHandle {
	/// Account that signs the transaction.
	pub account: AccountId,
	/// Wallet extension or keystore holding the key.
	pub source: String,
}

impl SignerHandle {
	pub fn new(account: impl Into<AccountId>, source: impl Into<String>) -> Self {
		Self { account: account.into(), source: source.into() }
	}
}

/// Progress of a submitted transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxEvent {
	Broadcast,
	InBlock { block_hash: String },
	Finalized { block_hash: String },
	/// The transaction was included but its dispatch failed, e.g. `Recovery.NotFriend`.
	DispatchFailed { error: String },
	/// The pool dropped or invalidated the transaction.
	Dropped { reason: String },
}

/// A transaction accepted by the submission layer.
pub struct Submission {
	pub tx_hash: String,
	pub events: BoxStream<'static, TxEvent>,
}

impl std::fmt::Debug for Submission {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Submission").field("tx_hash", &self.tx_hash).finish_non_exhaustive()
	}
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainSubmit: Send + Sync {
	/// Sign `call` with `signer` and submit it. Errors cover signing rejections and
	/// pool refusals; dispatch failures arrive on the event stream.
	async fn submit(&self, call: RecoveryCall, signer: &SignerHandle) -> Result<Submission>;
}
