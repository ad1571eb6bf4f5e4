//! Copy-on-write editing of an account's friend groups.
//!
//! The pallet only supports replacing the whole list, so editing works on an
//! independent draft: fetched groups are cloned in, edited freely, validated and
//! committed as a complete list for `set_friend_groups`. The fetched canonical
//! list is never aliased.

use std::collections::BTreeSet;

use crate::{AccountId, Balance, BlockNumber, FriendGroup};

/// Defaults for a freshly added group.
pub const DEFAULT_FRIENDS_NEEDED: u32 = 2;
pub const DEFAULT_INHERITANCE_DELAY: BlockNumber = 10;
pub const DEFAULT_CANCEL_DELAY: BlockNumber = 10;
pub const DEFAULT_DEPOSIT: Balance = 10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
	#[error("Friend group {0}: Please add at least one friend account")]
	NoFriends(usize),
	#[error("Friend group {group}: Friends needed must be between 1 and {friends}")]
	InvalidThreshold { group: usize, friends: usize },
	#[error("Friend group {0}: Please specify an inheritor account")]
	MissingInheritor(usize),
	#[error("Friend group {0}: Inheritance delay must be at least 1 block")]
	InheritanceDelayTooShort(usize),
	#[error("Friend group {0}: Cancel delay must be at least 1 block")]
	CancelDelayTooShort(usize),
	#[error("Friend group {group}: {friend} is listed more than once")]
	DuplicateFriend { group: usize, friend: AccountId },
	#[error("Friend group {0} does not exist")]
	NoSuchGroup(usize),
	#[error("At least one friend group is required")]
	LastGroup,
}

/// Editable copy of a friend group list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FriendGroupsDraft {
	groups: Vec<FriendGroup>,
}

impl Default for FriendGroupsDraft {
	fn default() -> Self {
		Self::new()
	}
}

fn template(order: usize) -> FriendGroup {
	FriendGroup {
		friends: vec![AccountId::new()],
		friends_needed: DEFAULT_FRIENDS_NEEDED,
		inheritor: AccountId::new(),
		inheritance_delay: DEFAULT_INHERITANCE_DELAY,
		inheritance_order: order as u32,
		cancel_delay: DEFAULT_CANCEL_DELAY,
		deposit: DEFAULT_DEPOSIT,
	}
}

impl FriendGroupsDraft {
	/// A draft holding one empty template group.
	pub fn new() -> Self {
		Self { groups: vec![template(0)] }
	}

	/// Start editing from the groups currently configured on chain.
	pub fn from_existing(existing: &[FriendGroup]) -> Self {
		if existing.is_empty() {
			return Self::new();
		}
		Self { groups: existing.to_vec() }
	}

	pub fn groups(&self) -> &[FriendGroup] {
		&self.groups
	}

	pub fn group_mut(&mut self, index: usize) -> Result<&mut FriendGroup, DraftError> {
		self.groups.get_mut(index).ok_or(DraftError::NoSuchGroup(index + 1))
	}

	/// Append a template group whose order is its position.
	pub fn add_group(&mut self) -> usize {
		let index = self.groups.len();
		self.groups.push(template(index));
		index
	}

	/// Remove a group. The draft always keeps at least one.
	pub fn remove_group(&mut self, index: usize) -> Result<FriendGroup, DraftError> {
		if index >= self.groups.len() {
			return Err(DraftError::NoSuchGroup(index + 1));
		}
		if self.groups.len() == 1 {
			return Err(DraftError::LastGroup);
		}
		Ok(self.groups.remove(index))
	}

	pub fn add_friend(&mut self, group: usize) -> Result<(), DraftError> {
		self.group_mut(group)?.friends.push(AccountId::new());
		Ok(())
	}

	pub fn set_friend(
		&mut self,
		group: usize,
		slot: usize,
		friend: impl Into<AccountId>,
	) -> Result<(), DraftError> {
		let g = self.group_mut(group)?;
		match g.friends.get_mut(slot) {
			Some(f) => *f = friend.into(),
			None => g.friends.push(friend.into()),
		}
		Ok(())
	}

	/// Remove a friend slot, keeping at least one (possibly blank) slot.
	pub fn remove_friend(&mut self, group: usize, slot: usize) -> Result<(), DraftError> {
		let g = self.group_mut(group)?;
		if g.friends.len() > 1 && slot < g.friends.len() {
			g.friends.remove(slot);
		}
		Ok(())
	}

	/// Check every group, reporting the first problem found.
	pub fn validate(&self) -> Result<(), DraftError> {
		for (i, group) in self.groups.iter().enumerate() {
			let n = i + 1;
			let friends: Vec<&str> =
				group.friends.iter().map(|f| f.trim()).filter(|f| !f.is_empty()).collect();

			if friends.is_empty() {
				return Err(DraftError::NoFriends(n));
			}
			let mut seen = BTreeSet::new();
			if let Some(dup) = friends.iter().find(|f| !seen.insert(**f)) {
				return Err(DraftError::DuplicateFriend { group: n, friend: dup.to_string() });
			}
			if group.friends_needed < 1 || group.friends_needed as usize > friends.len() {
				return Err(DraftError::InvalidThreshold { group: n, friends: friends.len() });
			}
			if group.inheritor.trim().is_empty() {
				return Err(DraftError::MissingInheritor(n));
			}
			if group.inheritance_delay < 1 {
				return Err(DraftError::InheritanceDelayTooShort(n));
			}
			if group.cancel_delay < 1 {
				return Err(DraftError::CancelDelayTooShort(n));
			}
		}
		Ok(())
	}

	/// Validate and produce the list to submit: blank slots dropped, accounts
	/// trimmed and friends sorted, as the pallet matches groups by exact sorted
	/// sequence.
	pub fn commit(&self) -> Result<Vec<FriendGroup>, DraftError> {
		self.validate()?;
		Ok(self.groups.iter().map(canonical).collect())
	}
}

/// Canonical form of a group: trimmed, non-blank, alphabetically sorted friends.
pub fn canonical(group: &FriendGroup) -> FriendGroup {
	let mut friends: Vec<AccountId> = group
		.friends
		.iter()
		.map(|f| f.trim())
		.filter(|f| !f.is_empty())
		.map(str::to_owned)
		.collect();
	friends.sort();
	FriendGroup { friends, inheritor: group.inheritor.trim().to_owned(), ..group.clone() }
}
