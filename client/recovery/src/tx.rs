//! Transaction status tracking and error translation.
//!
//! A [`TxTracker`] belongs to one UI surface and allows a single submission in
//! flight at a time. Failures end in a terminal [`TxOutcome::Failed`] carrying a
//! readable message; nothing is retried.

use futures::StreamExt;
use qp_recovery::RecoveryCall;
use tokio::sync::watch;

use crate::{
	submit::{ChainSubmit, SignerHandle, TxEvent},
	Error, Result, LOG_TARGET,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
	#[default]
	Idle,
	Signing,
	Submitting,
	InBlock,
	Finalized,
	Error,
}

impl TxStatus {
	/// Whether a submission is still running.
	pub fn is_pending(self) -> bool {
		matches!(self, Self::Signing | Self::Submitting | Self::InBlock)
	}

	/// Label for the button that triggered the submission.
	pub fn button_label(self, default_label: &str) -> String {
		match self {
			Self::Signing => "Waiting for signature...".into(),
			Self::Submitting => "Submitting transaction...".into(),
			Self::InBlock => "Waiting for finalization...".into(),
			Self::Idle | Self::Finalized | Self::Error => default_label.into(),
		}
	}

	pub fn message(self) -> &'static str {
		match self {
			Self::Signing => "Please sign the transaction in your wallet...",
			Self::Submitting => "Submitting transaction to the network...",
			Self::InBlock => "Transaction included in block, waiting for finalization...",
			Self::Finalized => "Transaction finalized!",
			Self::Idle | Self::Error => "",
		}
	}
}

/// Turn a raw signing, pool or dispatch error into a message for the user.
/// Unknown errors are returned verbatim.
pub fn translate_dispatch_error(raw: &str) -> String {
	let has = |needles: &[&str]| needles.iter().any(|n| raw.contains(n));

	let message = if has(&["\"type\":\"Payment\"", "Payment", "Inability to pay"]) {
		"Insufficient funds. Your account needs more balance to cover the transaction fee and any required deposit."
	} else if has(&["BadOrigin"]) {
		"You are not authorized to perform this action."
	} else if has(&["NotFriend", "not a friend"]) {
		"You are not listed as a friend in this recovery configuration."
	} else if has(&["NotStarted", "not started"]) {
		"No recovery attempt has been started for this account."
	} else if has(&["AlreadyStarted", "already started"]) {
		"A recovery attempt has already been initiated for this friend group."
	} else if has(&["AlreadyVouched", "already vouched"]) {
		"You have already approved this recovery attempt."
	} else if has(&["NotEnoughFriends"]) {
		"Not enough friends have approved the recovery yet."
	} else if has(&["DelayNotPassed", "delay not passed"]) {
		"The required delay period has not passed yet."
	} else if has(&["Cancelled", "cancelled"]) {
		"This recovery attempt was cancelled by the user."
	} else if has(&["rejected", "Rejected"]) {
		"Transaction was rejected. Please try again."
	} else if raw.trim().is_empty() {
		"An unexpected error occurred. Please try again."
	} else {
		return raw.to_string();
	};
	message.to_string()
}

/// Terminal result of one submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxOutcome {
	Finalized { tx_hash: String, block_hash: String },
	Failed { tx_hash: Option<String>, message: String },
}

impl TxOutcome {
	pub fn is_success(&self) -> bool {
		matches!(self, Self::Finalized { .. })
	}
}

/// Frees the slot when a submission is abandoned before reaching a terminal status.
struct Release<'a>(&'a watch::Sender<TxStatus>);

impl Drop for Release<'_> {
	fn drop(&mut self) {
		self.0.send_if_modified(|status| {
			if !status.is_pending() {
				return false;
			}
			*status = TxStatus::Idle;
			true
		});
	}
}

/// Status of the single submission slot of one UI surface.
pub struct TxTracker {
	status: watch::Sender<TxStatus>,
}

impl Default for TxTracker {
	fn default() -> Self {
		Self::new()
	}
}

impl TxTracker {
	pub fn new() -> Self {
		Self { status: watch::Sender::new(TxStatus::Idle) }
	}

	pub fn status(&self) -> TxStatus {
		*self.status.borrow()
	}

	pub fn subscribe(&self) -> watch::Receiver<TxStatus> {
		self.status.subscribe()
	}

	/// Submit `call` and follow it to a terminal outcome.
	///
	/// Fails with [`Error::SubmissionInFlight`] if this surface already has a
	/// submission running. Every other failure is reported as
	/// [`TxOutcome::Failed`].
	pub async fn run(
		&self,
		submitter: &dyn ChainSubmit,
		call: RecoveryCall,
		signer: &SignerHandle,
	) -> Result<TxOutcome> {
		let claimed = self.status.send_if_modified(|status| {
			if status.is_pending() {
				return false;
			}
			*status = TxStatus::Signing;
			true
		});
		if !claimed {
			return Err(Error::SubmissionInFlight);
		}
		let _release = Release(&self.status);

		let name = call.name();
		log::debug!(target: LOG_TARGET, "Submitting {} signed by {}", name, signer.account);

		let submission = match submitter.submit(call, signer).await {
			Ok(submission) => submission,
			Err(e) => return Ok(self.fail(name, None, &e.to_string())),
		};
		self.status.send_replace(TxStatus::Submitting);

		let tx_hash = submission.tx_hash;
		let mut events = submission.events;
		while let Some(event) = events.next().await {
			match event {
				TxEvent::Broadcast => {},
				TxEvent::InBlock { block_hash } => {
					log::debug!(target: LOG_TARGET, "{} {} included in {}", name, tx_hash, block_hash);
					self.status.send_replace(TxStatus::InBlock);
				},
				TxEvent::Finalized { block_hash } => {
					log::info!(target: LOG_TARGET, "{} {} finalized in {}", name, tx_hash, block_hash);
					self.status.send_replace(TxStatus::Finalized);
					return Ok(TxOutcome::Finalized { tx_hash, block_hash });
				},
				TxEvent::DispatchFailed { error } | TxEvent::Dropped { reason: error } =>
					return Ok(self.fail(name, Some(tx_hash), &error)),
			}
		}

		Ok(self.fail(name, Some(tx_hash), "Transaction dropped before finalization"))
	}

	fn fail(&self, name: &str, tx_hash: Option<String>, raw: &str) -> TxOutcome {
		log::warn!(target: LOG_TARGET, "{} failed: {}", name, raw);
		self.status.send_replace(TxStatus::Error);
		TxOutcome::Failed { tx_hash, message: translate_dispatch_error(raw) }
	}
}
