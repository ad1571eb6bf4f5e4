//! Social Recovery Primitives
//!
//! This crate holds the pure, side-effect free half of the social recovery client:
//! the canonical data model mirrored from the recovery pallet and the rules the
//! pallet enforces, re-derived on the client so that actions can be offered (or
//! withheld) before anything is signed.
//!
//! - **Bitfield decoding**: which friends approved an attempt ([`bitfield`])
//! - **Tolerant normalization**: raw chain records into canonical values ([`normalize`])
//! - **Attempt lifecycle**: delays, thresholds and legal actions ([`lifecycle`])
//! - **Priority resolution**: who may initiate, contest or is blocked ([`priority`])
//! - **Drafts**: copy-on-write editing of friend groups before submission ([`draft`])
//!
//! ## Architecture
//!
//! Nothing in this crate performs I/O. The chain runtime remains the authoritative
//! state machine; every value here is a projection that can be recomputed from a
//! fresh set of chain reads. The orchestration layer (`sc-recovery-client`) owns
//! connections and feeds these functions.

pub mod bitfield;
pub mod draft;
pub mod lifecycle;
pub mod normalize;
pub mod priority;


use serde::{Deserialize, Serialize};

pub use bitfield::{ApprovalSet, Approvals, WordWidth};
pub use draft::{DraftError, FriendGroupsDraft};
pub use lifecycle::{evaluate, AttemptAction, AttemptView, Viewer};
pub use priority::{resolve, GroupStanding};

/// Account identifiers are opaque strings; address format is the query layer's concern.
pub type AccountId = String;
/// Block height as reported by the chain.
pub type BlockNumber = u32;
/// Raw token amount in the chain's smallest unit.
pub type Balance = u128;
/// Priority of a friend group. `0` is the highest priority.
pub type InheritanceOrder = u32;

/// One recovery/inheritance configuration attached to a source account.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct FriendGroup {
	/// Friends allowed to approve attempts, alphabetically sorted.
	pub friends: Vec<AccountId>,
	/// Approvals required before an attempt can be finished.
	pub friends_needed: u32,
	/// Account receiving control once an attempt of this group finishes.
	pub inheritor: AccountId,
	/// Blocks counted from initiation before an approved attempt becomes inheritable.
	pub inheritance_delay: BlockNumber,
	/// Priority of this group, `0` being the highest.
	pub inheritance_order: InheritanceOrder,
	/// Blocks after the last approval before the initiator may cancel.
	pub cancel_delay: BlockNumber,
	/// Amount reserved when the group was configured.
	pub deposit: Balance,
}

impl FriendGroup {
	/// Position of `who` in the stored friend list. This is the bit index used by
	/// the approval bitfield.
	pub fn friend_index(&self, who: &str) -> Option<u32> {
		self.friends.iter().position(|f| f == who).map(|i| i as u32)
	}

	pub fn is_friend(&self, who: &str) -> bool {
		self.friend_index(who).is_some()
	}

	/// `1 <= friends_needed <= |friends|`.
	pub fn has_valid_threshold(&self) -> bool {
		self.friends_needed >= 1 && self.friends_needed as usize <= self.friends.len()
	}
}

/// One in-flight recovery process against a specific friend group of a lost account.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attempt {
	/// Position of the targeted group in the lost account's group list.
	pub friend_group_index: u32,
	pub initiator: AccountId,
	pub init_block: BlockNumber,
	pub last_approval_block: BlockNumber,
	pub approvals: Approvals,
}

/// Inheritor registry value: who controls a lost account and at what priority.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct InheritorEntry {
	/// `None` when the chain only reported the inheritor account.
	pub inheritance_order: Option<InheritanceOrder>,
	pub inheritor: AccountId,
}

/// Whether a lost account has been recovered, and by which priority.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct RecoveryStatus {
	pub is_recovered: bool,
	pub current_inheritor: Option<AccountId>,
	pub current_inheritance_order: Option<InheritanceOrder>,
}

impl RecoveryStatus {
	pub fn not_recovered() -> Self {
		Self::default()
	}

	/// Cross-reference a registry entry against the account's friend groups.
	///
	/// The order reported by the registry wins. When the chain only exposes the
	/// inheritor account, the order is taken from the first group naming that
	/// inheritor, and `0` when no group matches.
	pub fn from_entry(entry: Option<&InheritorEntry>, groups: &[FriendGroup]) -> Self {
		let Some(entry) = entry else { return Self::not_recovered() };
		if entry.inheritor.is_empty() {
			return Self::not_recovered();
		}

		let order = entry.inheritance_order.unwrap_or_else(|| {
			groups
				.iter()
				.find(|g| g.inheritor == entry.inheritor)
				.map(|g| g.inheritance_order)
				.unwrap_or(0)
		});

		Self {
			is_recovered: true,
			current_inheritor: Some(entry.inheritor.clone()),
			current_inheritance_order: Some(order),
		}
	}

	/// Order of the recovering group, if the account has been recovered.
	pub fn recovered_order(&self) -> Option<InheritanceOrder> {
		if self.is_recovered {
			self.current_inheritance_order
		} else {
			None
		}
	}
}

/// Calls understood by the recovery pallet.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecoveryCall {
	/// Replace the caller's whole friend group list. An empty list clears it.
	SetFriendGroups { friend_groups: Vec<FriendGroup> },
	InitiateAttempt { lost: AccountId, friend_group_index: u32 },
	ApproveAttempt { lost: AccountId, friend_group_index: u32 },
	FinishAttempt { lost: AccountId, attempt_index: u32 },
	CancelAttempt { lost: AccountId, attempt_index: u32 },
	/// Only the lost account itself may slash, burning the initiator's deposit.
	SlashAttempt { attempt_index: u32 },
	/// Execute `call` with the authority of an inherited account.
	ControlInheritedAccount { lost: AccountId, call: Box<InnerCall> },
}

/// Calls that may be wrapped by [`RecoveryCall::ControlInheritedAccount`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InnerCall {
	TransferAll { dest: AccountId, keep_alive: bool },
	TransferKeepAlive { dest: AccountId, value: Balance },
	SetFriendGroups { friend_groups: Vec<FriendGroup> },
}

impl RecoveryCall {
	/// Pallet call name, used for logs and error reporting.
	pub fn name(&self) -> &'static str {
		match self {
			Self::SetFriendGroups { .. } => "set_friend_groups",
			Self::InitiateAttempt { .. } => "initiate_attempt",
			Self::ApproveAttempt { .. } => "approve_attempt",
			Self::FinishAttempt { .. } => "finish_attempt",
			Self::CancelAttempt { .. } => "cancel_attempt",
			Self::SlashAttempt { .. } => "slash_attempt",
			Self::ControlInheritedAccount { .. } => "control_inherited_account",
		}
	}

	/// Irreversible or punitive calls that need an explicit confirmation before dispatch.
	pub fn requires_confirmation(&self) -> bool {
		match self {
			Self::SlashAttempt { .. } => true,
			Self::SetFriendGroups { friend_groups } => friend_groups.is_empty(),
			Self::ControlInheritedAccount { call, .. } => matches!(
				call.as_ref(),
				InnerCall::SetFriendGroups { friend_groups } if friend_groups.is_empty()
			),
			_ => false,
		}
	}
}
