//! In-memory recovery chain used by the integration tests.
//!
//! `TestChain` answers reads the way a wallet library renders pallet state
//! (camelCase records, `[group, attempt]` pairs, `u16` approval words) and applies
//! submitted calls with the pallet's rules, so client-side eligibility can be
//! checked against what the chain would actually do.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use futures::{stream, StreamExt};
use parking_lot::Mutex;
use qp_recovery::{AccountId, Balance, BlockNumber, FriendGroup, InnerCall, RecoveryCall};
use sc_recovery_client::{
	ChainQuery, ChainSubmit, Error, Result, SignerHandle, Submission, TxEvent,
};
use serde_json::{json, Value};

pub const WORD_BITS: u32 = 16;

#[derive(Clone, Debug)]
pub struct StoredAttempt {
	pub initiator: AccountId,
	pub init_block: BlockNumber,
	pub last_approval_block: BlockNumber,
	pub approvals: Vec<u16>,
}

impl StoredAttempt {
	fn approved(&self, index: u32) -> bool {
		self.approvals
			.get((index / WORD_BITS) as usize)
			.is_some_and(|w| w & (1 << (index % WORD_BITS)) != 0)
	}

	fn approve(&mut self, index: u32) {
		let word = (index / WORD_BITS) as usize;
		if self.approvals.len() <= word {
			self.approvals.resize(word + 1, 0);
		}
		self.approvals[word] |= 1 << (index % WORD_BITS);
	}

	fn count(&self) -> u32 {
		self.approvals.iter().map(|w| w.count_ones()).sum()
	}
}

#[derive(Default)]
struct State {
	block: BlockNumber,
	groups: BTreeMap<AccountId, Vec<FriendGroup>>,
	attempts: BTreeMap<(AccountId, u32), StoredAttempt>,
	/// lost -> (inheritance order, inheritor)
	inheritor: BTreeMap<AccountId, (u32, AccountId)>,
	balances: BTreeMap<AccountId, Balance>,
	failing_balances: BTreeSet<AccountId>,
	inheritance_view: bool,
	submitted: Vec<&'static str>,
}

pub struct TestChain {
	state: Mutex<State>,
}

impl Default for TestChain {
	fn default() -> Self {
		Self::new()
	}
}

impl TestChain {
	pub fn new() -> Self {
		Self { state: Mutex::new(State { block: 1, inheritance_view: true, ..Default::default() }) }
	}

	pub fn group(friends: &[&str], needed: u32, inheritor: &str, order: u32) -> FriendGroup {
		FriendGroup {
			friends: friends.iter().map(|f| f.to_string()).collect(),
			friends_needed: needed,
			inheritor: inheritor.into(),
			inheritance_delay: 50,
			inheritance_order: order,
			cancel_delay: 20,
			deposit: 10,
		}
	}

	pub fn set_block(&self, block: BlockNumber) {
		self.state.lock().block = block;
	}

	pub fn advance(&self, blocks: BlockNumber) {
		self.state.lock().block += blocks;
	}

	pub fn set_groups(&self, who: &str, groups: Vec<FriendGroup>) {
		self.state.lock().groups.insert(who.into(), groups);
	}

	pub fn set_balance(&self, who: &str, balance: Balance) {
		self.state.lock().balances.insert(who.into(), balance);
	}

	pub fn balance_of(&self, who: &str) -> Balance {
		self.state.lock().balances.get(who).copied().unwrap_or_default()
	}

	pub fn fail_balance_reads(&self, who: &str) {
		self.state.lock().failing_balances.insert(who.into());
	}

	/// Simulate a runtime without the inheritance view.
	pub fn without_inheritance_view(&self) {
		self.state.lock().inheritance_view = false;
	}

	pub fn set_inheritor(&self, lost: &str, order: u32, inheritor: &str) {
		self.state.lock().inheritor.insert(lost.into(), (order, inheritor.into()));
	}

	pub fn inheritor_of(&self, lost: &str) -> Option<(u32, AccountId)> {
		self.state.lock().inheritor.get(lost).cloned()
	}

	pub fn attempt(&self, lost: &str, index: u32) -> Option<StoredAttempt> {
		self.state.lock().attempts.get(&(lost.to_string(), index)).cloned()
	}

	pub fn submitted(&self) -> Vec<&'static str> {
		self.state.lock().submitted.clone()
	}

	fn apply(&self, call: RecoveryCall, signer: &str) -> std::result::Result<(), &'static str> {
		let mut state = self.state.lock();
		state.submitted.push(call.name());
		let block = state.block;

		match call {
			RecoveryCall::SetFriendGroups { friend_groups } => {
				state.groups.insert(signer.into(), friend_groups);
			},
			RecoveryCall::InitiateAttempt { lost, friend_group_index } => {
				let group = group_of(&state, &lost, friend_group_index)?;
				if !group.friends.iter().any(|f| f == signer) {
					return Err("Recovery.NotFriend");
				}
				if outranked(&state, &lost, &group) {
					return Err("Recovery.NotAllowed");
				}
				if state.attempts.contains_key(&(lost.clone(), friend_group_index)) {
					return Err("Recovery.AlreadyStarted");
				}
				state.attempts.insert(
					(lost, friend_group_index),
					StoredAttempt {
						initiator: signer.into(),
						init_block: block,
						last_approval_block: block,
						approvals: Vec::new(),
					},
				);
			},
			RecoveryCall::ApproveAttempt { lost, friend_group_index } => {
				let group = group_of(&state, &lost, friend_group_index)?;
				let index = group
					.friends
					.iter()
					.position(|f| f == signer)
					.ok_or("Recovery.NotFriend")? as u32;
				if outranked(&state, &lost, &group) {
					return Err("Recovery.NotAllowed");
				}
				let attempt = state
					.attempts
					.get_mut(&(lost, friend_group_index))
					.ok_or("Recovery.NotStarted")?;
				if attempt.approved(index) {
					return Err("Recovery.AlreadyVouched");
				}
				attempt.approve(index);
				attempt.last_approval_block = block;
			},
			RecoveryCall::FinishAttempt { lost, attempt_index } => {
				let group = group_of(&state, &lost, attempt_index)?;
				if outranked(&state, &lost, &group) {
					return Err("Recovery.NotAllowed");
				}
				let attempt = state
					.attempts
					.get(&(lost.clone(), attempt_index))
					.ok_or("Recovery.NotStarted")?;
				if attempt.count() < group.friends_needed {
					return Err("Recovery.NotEnoughFriends");
				}
				if block < attempt.init_block + group.inheritance_delay {
					return Err("Recovery.DelayNotPassed");
				}
				state.attempts.remove(&(lost.clone(), attempt_index));
				state.inheritor.insert(lost, (group.inheritance_order, group.inheritor));
			},
			RecoveryCall::CancelAttempt { lost, attempt_index } => {
				let group = group_of(&state, &lost, attempt_index)?;
				let attempt = state
					.attempts
					.get(&(lost.clone(), attempt_index))
					.ok_or("Recovery.NotStarted")?;
				let by_initiator = attempt.initiator == signer &&
					block >= attempt.last_approval_block + group.cancel_delay;
				if !by_initiator && lost != signer {
					return Err("BadOrigin");
				}
				state.attempts.remove(&(lost, attempt_index));
			},
			RecoveryCall::SlashAttempt { attempt_index } => {
				state
					.attempts
					.remove(&(signer.to_string(), attempt_index))
					.ok_or("Recovery.NotStarted")?;
			},
			RecoveryCall::ControlInheritedAccount { lost, call } => {
				match state.inheritor.get(&lost) {
					Some((_, inheritor)) if inheritor == signer => {},
					_ => return Err("BadOrigin"),
				}
				match *call {
					InnerCall::TransferAll { dest, .. } => {
						let amount = state.balances.remove(&lost).unwrap_or_default();
						*state.balances.entry(dest).or_default() += amount;
					},
					InnerCall::TransferKeepAlive { dest, value } => {
						let available = state.balances.get(&lost).copied().unwrap_or_default();
						if value >= available {
							return Err("Token.Payment: Inability to pay");
						}
						state.balances.insert(lost, available - value);
						*state.balances.entry(dest).or_default() += value;
					},
					InnerCall::SetFriendGroups { friend_groups } => {
						state.groups.insert(lost, friend_groups);
					},
				}
			},
		}
		Ok(())
	}
}

fn group_of(state: &State, lost: &str, index: u32) -> std::result::Result<FriendGroup, &'static str> {
	state
		.groups
		.get(lost)
		.and_then(|groups| groups.get(index as usize))
		.cloned()
		.ok_or("Recovery.NotStarted")
}

/// The account was recovered by a group of equal or higher priority.
fn outranked(state: &State, lost: &str, group: &FriendGroup) -> bool {
	state.inheritor.get(lost).is_some_and(|(order, _)| group.inheritance_order >= *order)
}

fn group_json(group: &FriendGroup) -> Value {
	json!({
		"friends": group.friends,
		"friendsNeeded": group.friends_needed,
		"inheritor": { "Id": group.inheritor },
		"inheritanceDelay": group.inheritance_delay,
		"inheritanceOrder": group.inheritance_order,
		"cancelDelay": group.cancel_delay,
		"deposit": format!("0x{:x}", group.deposit),
	})
}

#[async_trait]
impl ChainQuery for TestChain {
	async fn block_number(&self) -> Result<BlockNumber> {
		Ok(self.state.lock().block)
	}

	async fn friend_groups(&self, who: &str) -> Result<Value> {
		let state = self.state.lock();
		let groups = state.groups.get(who).cloned().unwrap_or_default();
		Ok(Value::Array(groups.iter().map(group_json).collect()))
	}

	async fn inheritor(&self, lost: &str) -> Result<Value> {
		Ok(match self.state.lock().inheritor.get(lost) {
			Some((order, who)) => json!([order, who, "ticket"]),
			None => Value::Null,
		})
	}

	async fn attempts(&self, lost: &str) -> Result<Value> {
		let state = self.state.lock();
		let groups = state.groups.get(lost).cloned().unwrap_or_default();
		let items = state
			.attempts
			.iter()
			.filter(|((who, _), _)| who == lost)
			.map(|((_, index), attempt)| {
				let group = groups.get(*index as usize).map(group_json).unwrap_or(Value::Null);
				json!([group, {
					"friendGroupIndex": index,
					"initiator": attempt.initiator,
					"initBlock": attempt.init_block,
					"lastApprovalBlock": attempt.last_approval_block,
					"approvals": attempt.approvals,
				}])
			})
			.collect();
		Ok(Value::Array(items))
	}

	async fn inheritance(&self, inheritor: &str) -> Result<Value> {
		let state = self.state.lock();
		if !state.inheritance_view {
			return Err(Error::Unsupported("inheritance"));
		}
		Ok(state
			.inheritor
			.iter()
			.filter(|(_, (_, who))| who == inheritor)
			.map(|(lost, _)| Value::String(lost.clone()))
			.collect())
	}

	async fn balance(&self, who: &str) -> Result<Balance> {
		let state = self.state.lock();
		if state.failing_balances.contains(who) {
			return Err(Error::Query("balance", format!("storage read for {who} timed out")));
		}
		Ok(state.balances.get(who).copied().unwrap_or_default())
	}

	async fn inheritor_entries(&self) -> Result<Vec<(AccountId, Value)>> {
		let state = self.state.lock();
		Ok(state
			.inheritor
			.iter()
			.map(|(lost, (order, who))| (lost.clone(), json!([order, who, "ticket"])))
			.collect())
	}
}

#[async_trait]
impl ChainSubmit for TestChain {
	async fn submit(&self, call: RecoveryCall, signer: &SignerHandle) -> Result<Submission> {
		let events = match self.apply(call, &signer.account) {
			Ok(()) => vec![
				TxEvent::Broadcast,
				TxEvent::InBlock { block_hash: "0x01".into() },
				TxEvent::Finalized { block_hash: "0x01".into() },
			],
			Err(error) => vec![
				TxEvent::InBlock { block_hash: "0x01".into() },
				TxEvent::DispatchFailed { error: error.into() },
			],
		};
		Ok(Submission { tx_hash: "0xfeed".into(), events: stream::iter(events).boxed() })
	}
}
