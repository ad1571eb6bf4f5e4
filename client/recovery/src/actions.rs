//! User actions, checked against derived state before anything is signed.
//!
//! Each operation re-validates the eligibility computed by the aggregators and
//! refuses with [`Error::Precondition`] when the pallet would reject the call.
//! Slashing and clearing friend groups additionally need a [`Confirmation`].

use std::sync::Arc;

use qp_recovery::{AccountId, Balance, FriendGroupsDraft, InnerCall, RecoveryCall};

use crate::{
	aggregator::{GroupView, RecoveryDashboard},
	inherited::InheritedAccount,
	submit::{ChainSubmit, SignerHandle},
	tx::{TxOutcome, TxTracker},
	Error, Result,
};

/// Explicit user confirmation of one irreversible call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Confirmation {
	call: &'static str,
}

impl Confirmation {
	/// Confirm the call named `call`, e.g. `"slash_attempt"`.
	pub fn new(call: &'static str) -> Self {
		Self { call }
	}

	fn covers(&self, call: &RecoveryCall) -> bool {
		self.call == call.name()
	}
}

pub struct ActionDispatcher {
	submitter: Arc<dyn ChainSubmit>,
	tracker: TxTracker,
}

impl ActionDispatcher {
	pub fn new(submitter: Arc<dyn ChainSubmit>) -> Self {
		Self { submitter, tracker: TxTracker::new() }
	}

	pub fn tracker(&self) -> &TxTracker {
		&self.tracker
	}

	/// Submit `call` through the tracker of this surface.
	pub async fn dispatch(
		&self,
		call: RecoveryCall,
		signer: &SignerHandle,
		confirmation: Option<&Confirmation>,
	) -> Result<TxOutcome> {
		if call.requires_confirmation() && !confirmation.is_some_and(|c| c.covers(&call)) {
			return Err(Error::ConfirmationRequired(call.name()));
		}
		self.tracker.run(self.submitter.as_ref(), call, signer).await
	}

	pub async fn initiate(
		&self,
		dashboard: &RecoveryDashboard,
		index: u32,
		signer: &SignerHandle,
	) -> Result<TxOutcome> {
		const ACTION: &str = "initiate_attempt";
		let group = group_for(dashboard, index, signer, ACTION)?;
		if !group.can_initiate {
			let reason = if !group.is_viewer_friend {
				"you are not a friend in this group"
			} else if group.has_attempt {
				"an attempt for this group is already open"
			} else {
				"the account was recovered by a group of equal or higher priority"
			};
			return Err(Error::precondition(ACTION, reason));
		}
		let call =
			RecoveryCall::InitiateAttempt { lost: dashboard.lost.clone(), friend_group_index: index };
		self.dispatch(call, signer, None).await
	}

	pub async fn approve(
		&self,
		dashboard: &RecoveryDashboard,
		index: u32,
		signer: &SignerHandle,
	) -> Result<TxOutcome> {
		const ACTION: &str = "approve_attempt";
		let group = group_for(dashboard, index, signer, ACTION)?;
		if !group.can_approve {
			let view = dashboard.attempt_for(index).map(|a| &a.view);
			let reason = match view {
				None => "there is no open attempt for this group",
				Some(_) if group.standing.blocked => "this group is outranked by the current recoverer",
				Some(v) if !v.is_friend => "you are not a friend in this group",
				Some(v) if v.has_voted => "you already approved this attempt",
				Some(_) => "the attempt is already fully approved",
			};
			return Err(Error::precondition(ACTION, reason));
		}
		let call =
			RecoveryCall::ApproveAttempt { lost: dashboard.lost.clone(), friend_group_index: index };
		self.dispatch(call, signer, None).await
	}

	pub async fn finish(
		&self,
		dashboard: &RecoveryDashboard,
		index: u32,
		signer: &SignerHandle,
	) -> Result<TxOutcome> {
		const ACTION: &str = "finish_attempt";
		let group = group_for(dashboard, index, signer, ACTION)?;
		if !group.can_finish {
			let view = dashboard.attempt_for(index).map(|a| &a.view);
			let reason = match view {
				None => "there is no open attempt for this group",
				Some(_) if group.standing.blocked => "this group is outranked by the current recoverer",
				Some(v) if !v.is_fully_approved => "not enough friends approved the attempt",
				Some(_) => "the inheritance delay has not passed",
			};
			return Err(Error::precondition(ACTION, reason));
		}
		let call = RecoveryCall::FinishAttempt { lost: dashboard.lost.clone(), attempt_index: index };
		self.dispatch(call, signer, None).await
	}

	pub async fn cancel(
		&self,
		dashboard: &RecoveryDashboard,
		index: u32,
		signer: &SignerHandle,
	) -> Result<TxOutcome> {
		const ACTION: &str = "cancel_attempt";
		let group = group_for(dashboard, index, signer, ACTION)?;
		if !group.can_cancel {
			let view = dashboard.attempt_for(index).map(|a| &a.view);
			let reason = match view {
				None => "there is no open attempt for this group",
				Some(v) if v.is_initiator => "the cancel delay has not passed",
				Some(_) => "only the initiator or the lost account may cancel",
			};
			return Err(Error::precondition(ACTION, reason));
		}
		let call = RecoveryCall::CancelAttempt { lost: dashboard.lost.clone(), attempt_index: index };
		self.dispatch(call, signer, None).await
	}

	/// Burn the initiator's deposit. Only the lost account may slash.
	pub async fn slash(
		&self,
		dashboard: &RecoveryDashboard,
		index: u32,
		signer: &SignerHandle,
		confirmation: Option<&Confirmation>,
	) -> Result<TxOutcome> {
		const ACTION: &str = "slash_attempt";
		let group = group_for(dashboard, index, signer, ACTION)?;
		if !group.can_slash {
			let reason = if group.has_attempt {
				"only the lost account may slash an attempt"
			} else {
				"there is no open attempt for this group"
			};
			return Err(Error::precondition(ACTION, reason));
		}
		self.dispatch(RecoveryCall::SlashAttempt { attempt_index: index }, signer, confirmation)
			.await
	}

	/// Replace the signer's friend groups with the validated `draft`.
	pub async fn set_friend_groups(
		&self,
		draft: &FriendGroupsDraft,
		signer: &SignerHandle,
	) -> Result<TxOutcome> {
		let friend_groups = draft.commit()?;
		self.dispatch(RecoveryCall::SetFriendGroups { friend_groups }, signer, None).await
	}

	/// Delete all friend groups of the signer.
	pub async fn clear_friend_groups(
		&self,
		signer: &SignerHandle,
		confirmation: Option<&Confirmation>,
	) -> Result<TxOutcome> {
		self.dispatch(RecoveryCall::SetFriendGroups { friend_groups: Vec::new() }, signer, confirmation)
			.await
	}

	/// Move `value` out of an inherited account, keeping it alive.
	pub async fn transfer_from_inherited(
		&self,
		inherited: &InheritedAccount,
		dest: &str,
		value: Balance,
		signer: &SignerHandle,
	) -> Result<TxOutcome> {
		const ACTION: &str = "transfer_keep_alive";
		let dest = withdrawal_target(inherited, dest, ACTION)?;
		if value == 0 {
			return Err(Error::precondition(ACTION, "the amount must be greater than zero"));
		}
		if inherited.balance_raw.is_some_and(|b| value > b) {
			return Err(Error::precondition(ACTION, "the amount exceeds the inherited balance"));
		}
		let call = InnerCall::TransferKeepAlive { dest, value };
		self.control(inherited, call, signer, None).await
	}

	/// Sweep an inherited account into `dest`.
	pub async fn transfer_all_from_inherited(
		&self,
		inherited: &InheritedAccount,
		dest: &str,
		keep_alive: bool,
		signer: &SignerHandle,
	) -> Result<TxOutcome> {
		let dest = withdrawal_target(inherited, dest, "transfer_all")?;
		self.control(inherited, InnerCall::TransferAll { dest, keep_alive }, signer, None).await
	}

	/// Reconfigure the friend groups of an inherited account.
	pub async fn set_inherited_friend_groups(
		&self,
		inherited: &InheritedAccount,
		draft: &FriendGroupsDraft,
		signer: &SignerHandle,
	) -> Result<TxOutcome> {
		let friend_groups = draft.commit()?;
		self.control(inherited, InnerCall::SetFriendGroups { friend_groups }, signer, None)
			.await
	}

	/// Delete the friend groups of an inherited account. Refused while attempts
	/// against it are still open.
	pub async fn clear_inherited_friend_groups(
		&self,
		inherited: &InheritedAccount,
		signer: &SignerHandle,
		confirmation: Option<&Confirmation>,
	) -> Result<TxOutcome> {
		if inherited.has_ongoing_attempts {
			return Err(Error::precondition(
				"set_friend_groups",
				"the account still has ongoing recovery attempts",
			));
		}
		let call = InnerCall::SetFriendGroups { friend_groups: Vec::new() };
		self.control(inherited, call, signer, confirmation).await
	}

	async fn control(
		&self,
		inherited: &InheritedAccount,
		call: InnerCall,
		signer: &SignerHandle,
		confirmation: Option<&Confirmation>,
	) -> Result<TxOutcome> {
		let call = RecoveryCall::ControlInheritedAccount {
			lost: inherited.address.clone(),
			call: Box::new(call),
		};
		self.dispatch(call, signer, confirmation).await
	}
}

/// Group `index` of a dashboard that was loaded for `signer`.
fn group_for<'a>(
	dashboard: &'a RecoveryDashboard,
	index: u32,
	signer: &SignerHandle,
	action: &'static str,
) -> Result<&'a GroupView> {
	if dashboard.viewer.as_deref() != Some(signer.account.as_str()) {
		return Err(Error::precondition(action, "the view was loaded for a different account"));
	}
	dashboard
		.group(index)
		.ok_or_else(|| Error::precondition(action, "the friend group does not exist"))
}

fn withdrawal_target(
	inherited: &InheritedAccount,
	dest: &str,
	action: &'static str,
) -> Result<AccountId> {
	if !inherited.withdrawable {
		return Err(Error::precondition(action, "the inherited account has no withdrawable balance"));
	}
	let dest = dest.trim();
	if dest.is_empty() {
		return Err(Error::precondition(action, "a destination account is required"));
	}
	Ok(dest.to_string())
}
