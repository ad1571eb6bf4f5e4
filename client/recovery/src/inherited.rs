//! Accounts inherited by the viewer.
//!
//! The list itself comes from the inheritance view, or from a scan of the
//! inheritor registry on runtimes without it. Details are fetched per account
//! and isolated: an account whose details cannot be read is still listed, with
//! an unknown balance and empty collections.

use std::sync::Arc;

use futures::future::join_all;
use qp_recovery::{
	normalize, priority::contesting_groups, AccountId, Balance, FriendGroup, InheritanceOrder,
	InheritorEntry,
};

use crate::{
	config::TokenFormat,
	guard::{Refresh, ViewSlot},
	query::ChainQuery,
	Result, LOG_TARGET,
};

/// Balance shown when it could not be read.
pub const UNKNOWN_BALANCE: &str = "Unknown";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InheritedAccount {
	pub address: AccountId,
	/// Formatted balance, or [`UNKNOWN_BALANCE`].
	pub balance: String,
	pub balance_raw: Option<Balance>,
	pub withdrawable: bool,
	/// Order of the group through which the viewer inherited this account.
	pub inheritance_order: InheritanceOrder,
	pub friend_groups: Vec<FriendGroup>,
	pub has_ongoing_attempts: bool,
	pub can_be_contested: bool,
	/// Groups that outrank the viewer's and could still take the account over.
	pub contesting_groups: Vec<u32>,
}

impl InheritedAccount {
	fn unknown(address: AccountId) -> Self {
		Self {
			address,
			balance: UNKNOWN_BALANCE.into(),
			balance_raw: None,
			withdrawable: false,
			inheritance_order: 0,
			friend_groups: Vec::new(),
			has_ongoing_attempts: false,
			can_be_contested: false,
			contesting_groups: Vec::new(),
		}
	}
}

/// Order under which `viewer` holds an account: the registry's if it names the
/// viewer, else the first group whose inheritor is the viewer, else `0`.
fn viewer_order(
	viewer: &str,
	entry: Option<&InheritorEntry>,
	groups: &[FriendGroup],
) -> InheritanceOrder {
	entry
		.filter(|e| e.inheritor == viewer)
		.and_then(|e| e.inheritance_order)
		.or_else(|| groups.iter().find(|g| g.inheritor == viewer).map(|g| g.inheritance_order))
		.unwrap_or(0)
}

pub struct InheritedAccountsAggregator {
	query: Arc<dyn ChainQuery>,
	token: TokenFormat,
}

impl InheritedAccountsAggregator {
	pub fn new(query: Arc<dyn ChainQuery>, token: TokenFormat) -> Self {
		Self { query, token }
	}

	/// Lost accounts currently inherited by `viewer`, in chain order.
	pub async fn inherited_addresses(&self, viewer: &str) -> Vec<AccountId> {
		let mut addresses = match self.query.inheritance(viewer).await {
			Ok(value) => normalize::accounts(&value),
			Err(e) => {
				log::debug!(target: LOG_TARGET, "Inheritance view failed for {}: {}", viewer, e);
				match self.query.inheritor_entries().await {
					Ok(entries) => entries
						.into_iter()
						.filter(|(_, value)| {
							normalize::inheritor_entry(value).is_some_and(|e| e.inheritor == viewer)
						})
						.map(|(lost, _)| lost)
						.filter(|lost| !lost.is_empty())
						.collect(),
					Err(e) => {
						log::warn!(
							target: LOG_TARGET,
							"Failed to list accounts inherited by {}: {}",
							viewer,
							e
						);
						Vec::new()
					},
				}
			},
		};
		let mut seen = std::collections::BTreeSet::new();
		addresses.retain(|a| seen.insert(a.clone()));
		addresses
	}

	pub async fn load(&self, viewer: &str) -> Vec<InheritedAccount> {
		let addresses = self.inherited_addresses(viewer).await;
		join_all(addresses.into_iter().map(|lost| self.account(viewer, lost))).await
	}

	async fn account(&self, viewer: &str, lost: AccountId) -> InheritedAccount {
		match self.details(viewer, &lost).await {
			Ok(account) => account,
			Err(e) => {
				log::warn!(target: LOG_TARGET, "Failed to load inherited account {}: {}", lost, e);
				InheritedAccount::unknown(lost)
			},
		}
	}

	async fn details(&self, viewer: &str, lost: &str) -> Result<InheritedAccount> {
		let (details, inheritor) = futures::join!(
			futures::future::try_join3(
				self.query.balance(lost),
				self.query.friend_groups(lost),
				self.query.attempts(lost),
			),
			self.query.inheritor(lost),
		);
		let (balance, groups, attempts) = details?;

		let entry = match inheritor {
			Ok(value) => normalize::inheritor_entry(&value),
			Err(e) => {
				log::warn!(target: LOG_TARGET, "Failed to fetch inheritor of {}: {}", lost, e);
				None
			},
		};
		let friend_groups = normalize::friend_groups(&groups);
		let inheritance_order = viewer_order(viewer, entry.as_ref(), &friend_groups);
		let contesting = contesting_groups(&friend_groups, inheritance_order);

		Ok(InheritedAccount {
			address: lost.to_string(),
			balance: self.token.format(balance),
			balance_raw: Some(balance),
			withdrawable: balance > 0,
			inheritance_order,
			has_ongoing_attempts: !normalize::attempts(&attempts).is_empty(),
			can_be_contested: !contesting.is_empty(),
			contesting_groups: contesting,
			friend_groups,
		})
	}
}

/// The inherited-accounts surface of the selected viewer.
pub struct InheritedView {
	aggregator: InheritedAccountsAggregator,
	slot: ViewSlot<AccountId, Vec<InheritedAccount>>,
}

impl InheritedView {
	pub fn new(aggregator: InheritedAccountsAggregator) -> Self {
		Self { aggregator, slot: ViewSlot::new() }
	}

	pub async fn refresh(&self, viewer: &str) -> Refresh<Vec<InheritedAccount>> {
		let viewer = viewer.trim();
		if viewer.is_empty() {
			self.slot.clear();
			return Refresh::Cleared;
		}
		let Some(ticket) = self.slot.begin(viewer.to_string()) else { return Refresh::InFlight };
		let accounts = self.aggregator.load(viewer).await;
		self.slot.commit(ticket, accounts)
	}

	pub fn current(&self) -> Option<Arc<Vec<InheritedAccount>>> {
		self.slot.current().map(|(_, accounts)| accounts)
	}

	/// Currently listed account `address`, if any.
	pub fn account(&self, address: &str) -> Option<InheritedAccount> {
		self.current()?.iter().find(|a| a.address == address).cloned()
	}
}
