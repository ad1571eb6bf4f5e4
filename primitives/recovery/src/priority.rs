//! Priority and contest resolution across the friend groups of one account.
//!
//! Lower `inheritance_order` means higher priority. Before any group finished,
//! every group may initiate. Once a group with order `k` recovered the account,
//! only groups with an order strictly below `k` may still contest; the rest are
//! blocked, including the recovering group itself.

use crate::{FriendGroup, InheritanceOrder, RecoveryStatus};

/// Classification of one friend group.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupStanding {
	/// Position of the group in the account's list.
	pub index: u32,
	pub inheritance_order: InheritanceOrder,
	pub can_initiate: bool,
	pub can_contest: bool,
	pub blocked: bool,
	pub is_current_recoverer: bool,
}

/// Classify every group of an account against its recovery status.
///
/// Equal orders are not a supported configuration; if they occur, the first group
/// in stored order carrying the recovered order is the current recoverer.
pub fn resolve(groups: &[FriendGroup], status: &RecoveryStatus) -> Vec<GroupStanding> {
	let recovered = status.recovered_order();
	let recoverer = recovered.and_then(|k| groups.iter().position(|g| g.inheritance_order == k));

	groups
		.iter()
		.enumerate()
		.map(|(index, group)| {
			let order = group.inheritance_order;
			match recovered {
				None => GroupStanding {
					index: index as u32,
					inheritance_order: order,
					can_initiate: true,
					..Default::default()
				},
				Some(k) => GroupStanding {
					index: index as u32,
					inheritance_order: order,
					can_initiate: order < k,
					can_contest: order < k,
					blocked: order >= k,
					is_current_recoverer: recoverer == Some(index),
				},
			}
		})
		.collect()
}

/// Indices of the groups that outrank `order` and could therefore take over.
pub fn contesting_groups(groups: &[FriendGroup], order: InheritanceOrder) -> Vec<u32> {
	groups
		.iter()
		.enumerate()
		.filter(|(_, g)| g.inheritance_order < order)
		.map(|(i, _)| i as u32)
		.collect()
}
