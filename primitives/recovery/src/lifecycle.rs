//! Attempt lifecycle evaluation.
//!
//! Mirrors the pallet's gating rules for one attempt as seen by one viewer:
//!
//! - an attempt is *fully approved* once `friends_needed` friends approved it,
//! - it becomes *inheritable* (finishable by anyone) once fully approved and
//!   `inheritance_delay` blocks have passed since initiation,
//! - its initiator may cancel once `cancel_delay` blocks have passed since the
//!   last approval,
//! - the lost account may cancel or slash any attempt against itself at any time.

use crate::{AccountId, ApprovalSet, Attempt, BlockNumber, FriendGroup, WordWidth};

/// Who is looking at an attempt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Viewer {
	/// Selected account, `None` when no wallet account is selected.
	pub account: Option<AccountId>,
	/// Whether the viewer is the lost account the attempt targets.
	pub is_lost_account: bool,
}

impl Viewer {
	pub fn anonymous() -> Self {
		Self::default()
	}

	pub fn account(account: impl Into<AccountId>) -> Self {
		Self { account: Some(account.into()), is_lost_account: false }
	}

	pub fn lost_account(account: impl Into<AccountId>) -> Self {
		Self { account: Some(account.into()), is_lost_account: true }
	}

	fn is(&self, who: &str) -> bool {
		self.account.as_deref().is_some_and(|a| !a.is_empty() && a == who)
	}
}

/// Actions a viewer may take on an attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttemptAction {
	Approve,
	Finish,
	Cancel,
	Slash,
}

/// Derived status of one attempt for one viewer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttemptView {
	pub approvals: ApprovalSet,
	pub is_fully_approved: bool,
	pub blocks_until_inheritable: BlockNumber,
	pub blocks_until_cancelable: BlockNumber,
	pub is_inheritable: bool,
	pub is_cancelable: bool,
	pub is_initiator: bool,
	/// Whether the viewer is a friend of the targeted group.
	pub is_friend: bool,
	pub has_voted: bool,
	pub can_approve: bool,
	pub can_finish: bool,
	pub can_cancel: bool,
	pub can_slash: bool,
}

impl AttemptView {
	pub fn allows(&self, action: AttemptAction) -> bool {
		match action {
			AttemptAction::Approve => self.can_approve,
			AttemptAction::Finish => self.can_finish,
			AttemptAction::Cancel => self.can_cancel,
			AttemptAction::Slash => self.can_slash,
		}
	}

	/// Legal actions in a stable order.
	pub fn actions(&self) -> Vec<AttemptAction> {
		[AttemptAction::Approve, AttemptAction::Finish, AttemptAction::Cancel, AttemptAction::Slash]
			.into_iter()
			.filter(|a| self.allows(*a))
			.collect()
	}
}

/// Evaluate `attempt` against `group` at `current_block` for `viewer`.
pub fn evaluate(
	group: &FriendGroup,
	attempt: &Attempt,
	current_block: BlockNumber,
	viewer: &Viewer,
	width: WordWidth,
) -> AttemptView {
	let approvals = attempt.approvals.decode(width);
	let is_fully_approved = approvals.approval_count >= group.friends_needed;

	let inheritable_at = attempt.init_block.saturating_add(group.inheritance_delay);
	let blocks_until_inheritable = inheritable_at.saturating_sub(current_block);
	let cancelable_at = attempt.last_approval_block.saturating_add(group.cancel_delay);
	let blocks_until_cancelable = cancelable_at.saturating_sub(current_block);

	let is_inheritable = blocks_until_inheritable == 0 && is_fully_approved;
	let is_cancelable = blocks_until_cancelable == 0 || viewer.is_lost_account;

	let friend_index = viewer.account.as_deref().and_then(|a| group.friend_index(a));
	let is_friend = friend_index.is_some();
	let has_voted = friend_index.is_some_and(|i| approvals.contains(i));
	let is_initiator = viewer.is(&attempt.initiator);

	AttemptView {
		can_approve: is_friend && !has_voted && !is_fully_approved,
		can_finish: is_inheritable,
		can_cancel: (is_initiator && is_cancelable) || viewer.is_lost_account,
		can_slash: viewer.is_lost_account,
		approvals,
		is_fully_approved,
		blocks_until_inheritable,
		blocks_until_cancelable,
		is_inheritable,
		is_cancelable,
		is_initiator,
		is_friend,
		has_voted,
	}
}
