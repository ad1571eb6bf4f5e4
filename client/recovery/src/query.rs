//! Read side of the chain, as consumed by the aggregators.
//!
//! Structured values are returned as JSON exactly as the chain client rendered
//! them; `qp_recovery::normalize` is the only place that interprets their shape.

use async_trait::async_trait;
use qp_recovery::{AccountId, Balance, BlockNumber};
use serde_json::Value;

use crate::{Error, Result};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainQuery: Send + Sync {
	/// Block number the recovery pallet uses for its delays.
	async fn block_number(&self) -> Result<BlockNumber>;

	/// Friend group list configured for `who`.
	async fn friend_groups(&self, who: &str) -> Result<Value>;

	/// Inheritor registry value of `lost`, `null` when the account was not recovered.
	async fn inheritor(&self, lost: &str) -> Result<Value>;

	/// In-flight attempts against `lost`.
	async fn attempts(&self, lost: &str) -> Result<Value>;

	/// Accounts currently inherited by `inheritor`.
	async fn inheritance(&self, inheritor: &str) -> Result<Value>;

	/// Free balance of `who` in the chain's smallest unit.
	async fn balance(&self, who: &str) -> Result<Balance>;

	/// Full scan of the inheritor registry as `(lost, value)` pairs. Used when the
	/// inheritance view is missing from the runtime.
	async fn inheritor_entries(&self) -> Result<Vec<(AccountId, Value)>> {
		Err(Error::Unsupported("inheritor_entries"))
	}
}
