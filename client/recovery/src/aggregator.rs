//! Recovery dashboard of one lost account.
//!
//! One pass reads the block number, friend groups, inheritor and attempts of the
//! lost account concurrently. Every read is isolated: a failure degrades that
//! piece to its empty value and is logged, since view functions are missing on
//! some runtimes. Everything else is derived with `qp_recovery`.

use std::sync::Arc;

use qp_recovery::{
	evaluate, normalize, resolve, AccountId, Attempt, AttemptView, BlockNumber, FriendGroup,
	GroupStanding, RecoveryStatus, Viewer, WordWidth,
};
use serde_json::Value;

use crate::{
	guard::{Refresh, ViewSlot},
	query::ChainQuery,
	Result, LOG_TARGET,
};

/// An attempt joined with the group it targets and evaluated for the viewer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttemptWithGroup {
	pub friend_group: FriendGroup,
	pub attempt: Attempt,
	pub view: AttemptView,
}

/// Per-group flags shown next to each friend group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupView {
	pub index: u32,
	pub group: FriendGroup,
	pub standing: GroupStanding,
	pub is_viewer_friend: bool,
	/// Whether an attempt against this group is open.
	pub has_attempt: bool,
	pub can_initiate: bool,
	pub can_approve: bool,
	pub can_finish: bool,
	pub can_cancel: bool,
	pub can_slash: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecoveryDashboard {
	pub lost: AccountId,
	pub viewer: Option<AccountId>,
	pub current_block: BlockNumber,
	pub status: RecoveryStatus,
	pub groups: Vec<GroupView>,
	pub attempts: Vec<AttemptWithGroup>,
}

impl RecoveryDashboard {
	/// Group view for `index`, if the account has such a group.
	pub fn group(&self, index: u32) -> Option<&GroupView> {
		self.groups.get(index as usize)
	}

	/// Open attempt against group `index`.
	pub fn attempt_for(&self, index: u32) -> Option<&AttemptWithGroup> {
		self.attempts.iter().find(|a| a.attempt.friend_group_index == index)
	}
}

fn settle<T: Default>(what: &str, who: &str, result: Result<T>) -> T {
	result.unwrap_or_else(|e| {
		log::warn!(target: LOG_TARGET, "Failed to fetch {} for {}: {}", what, who, e);
		T::default()
	})
}

pub struct RecoveryAggregator {
	query: Arc<dyn ChainQuery>,
	width: WordWidth,
}

impl RecoveryAggregator {
	pub fn new(query: Arc<dyn ChainQuery>, width: WordWidth) -> Self {
		Self { query, width }
	}

	/// Build the dashboard of `lost` as seen by `viewer`.
	pub async fn load(&self, lost: &str, viewer: Option<&str>) -> RecoveryDashboard {
		let (block, groups, inheritor, attempts) = futures::join!(
			self.query.block_number(),
			self.query.friend_groups(lost),
			self.query.inheritor(lost),
			self.query.attempts(lost),
		);

		let current_block = settle("block number", lost, block);
		let groups = normalize::friend_groups(&settle::<Value>("friend groups", lost, groups));
		let entry = normalize::inheritor_entry(&settle::<Value>("inheritor", lost, inheritor));
		let records = normalize::attempts(&settle::<Value>("attempts", lost, attempts));

		let viewer = viewer.map(str::trim).filter(|v| !v.is_empty());
		let view_as = match viewer {
			Some(v) if v == lost => Viewer::lost_account(v),
			Some(v) => Viewer::account(v),
			None => Viewer::anonymous(),
		};

		let status = RecoveryStatus::from_entry(entry.as_ref(), &groups);

		let attempts: Vec<_> = records
			.into_iter()
			.map(|record| {
				let friend_group = groups
					.get(record.attempt.friend_group_index as usize)
					.cloned()
					.or(record.friend_group)
					.unwrap_or_default();
				let view =
					evaluate(&friend_group, &record.attempt, current_block, &view_as, self.width);
				AttemptWithGroup { friend_group, attempt: record.attempt, view }
			})
			.collect();

		let groups = resolve(&groups, &status)
			.into_iter()
			.zip(groups)
			.map(|(standing, group)| {
				let is_viewer_friend = viewer.is_some_and(|v| group.is_friend(v));
				let attempt = attempts.iter().find(|a| a.attempt.friend_group_index == standing.index);
				let open = |f: fn(&AttemptView) -> bool| attempt.is_some_and(|a| f(&a.view));
				GroupView {
					index: standing.index,
					is_viewer_friend,
					has_attempt: attempt.is_some(),
					can_initiate: is_viewer_friend && standing.can_initiate && attempt.is_none(),
					can_approve: open(|v| v.can_approve) && !standing.blocked,
					can_finish: open(|v| v.can_finish) && !standing.blocked,
					can_cancel: open(|v| v.can_cancel),
					can_slash: open(|v| v.can_slash),
					group,
					standing,
				}
			})
			.collect();

		log::debug!(
			target: LOG_TARGET,
			"Loaded recovery state of {} at block {}",
			lost,
			current_block
		);

		RecoveryDashboard {
			lost: lost.to_string(),
			viewer: viewer.map(str::to_string),
			current_block,
			status,
			groups,
			attempts,
		}
	}
}

/// The dashboard surface: one lost account selected at a time.
pub struct RecoveryView {
	aggregator: RecoveryAggregator,
	slot: ViewSlot<(AccountId, Option<AccountId>), RecoveryDashboard>,
}

impl RecoveryView {
	pub fn new(aggregator: RecoveryAggregator) -> Self {
		Self { aggregator, slot: ViewSlot::new() }
	}

	/// Reload the dashboard for `lost`. Only the latest refresh commits; a blank
	/// address clears the view.
	pub async fn refresh(&self, lost: &str, viewer: Option<&str>) -> Refresh<RecoveryDashboard> {
		let lost = lost.trim();
		if lost.is_empty() {
			self.slot.clear();
			return Refresh::Cleared;
		}
		let key = (lost.to_string(), viewer.map(str::to_string));
		let Some(ticket) = self.slot.begin(key) else { return Refresh::InFlight };
		let dashboard = self.aggregator.load(lost, viewer).await;
		self.slot.commit(ticket, dashboard)
	}

	pub fn current(&self) -> Option<Arc<RecoveryDashboard>> {
		self.slot.current().map(|(_, dashboard)| dashboard)
	}

	pub fn clear(&self) {
		self.slot.clear();
	}
}
