//! Tolerant decoding of raw chain records.
//!
//! Chain clients do not agree on how they render the recovery pallet's types:
//! field names arrive in `snake_case` or `camelCase`, optional list slots arrive
//! as `null`, the friend group list is sometimes wrapped as `[[groups..], null]`,
//! and accounts may be bare strings or `{ "type": "Id", "value": .. }` addresses.
//! Every function here is total: whatever the shape, a canonical value comes out,
//! with absent fields defaulted to `0`, `""` or `[]`.

use serde_json::Value;

use crate::{
	bitfield::json_uint, AccountId, Approvals, Attempt, Balance, FriendGroup, InheritorEntry,
};

/// An attempt as listed by the attempts view, optionally paired with the group
/// record the chain returned next to it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttemptRecord {
	pub friend_group: Option<FriendGroup>,
	pub attempt: Attempt,
}

fn field<'a>(record: &'a Value, snake: &str, camel: &str) -> Option<&'a Value> {
	let obj = record.as_object()?;
	obj.get(snake)
		.filter(|v| !v.is_null())
		.or_else(|| obj.get(camel).filter(|v| !v.is_null()))
}

fn uint32(value: Option<&Value>) -> u32 {
	value.and_then(json_uint).map(|v| v.min(u32::MAX as u128) as u32).unwrap_or(0)
}

fn balance(value: Option<&Value>) -> Balance {
	value.and_then(json_uint).unwrap_or(0)
}

/// Read an account identifier. Accepts a bare string or a `MultiAddress`-like
/// object carrying the account under `value`, `Id` or `id`.
pub fn account(value: &Value) -> AccountId {
	match value {
		Value::String(s) => s.clone(),
		Value::Object(obj) => ["value", "Id", "id"]
			.iter()
			.find_map(|k| obj.get(*k).and_then(Value::as_str))
			.map(str::to_owned)
			.unwrap_or_default(),
		_ => AccountId::new(),
	}
}

/// Normalize one friend group record.
pub fn friend_group(record: &Value) -> FriendGroup {
	let friends = record
		.get("friends")
		.and_then(Value::as_array)
		.map(|list| list.iter().filter(|f| !f.is_null()).map(account).collect())
		.unwrap_or_default();

	FriendGroup {
		friends,
		friends_needed: uint32(field(record, "friends_needed", "friendsNeeded")),
		inheritor: record.get("inheritor").map(account).unwrap_or_default(),
		inheritance_delay: uint32(field(record, "inheritance_delay", "inheritanceDelay")),
		inheritance_order: uint32(field(record, "inheritance_order", "inheritanceOrder")),
		cancel_delay: uint32(field(record, "cancel_delay", "cancelDelay")),
		deposit: balance(record.get("deposit")),
	}
}

/// Normalize a friend group list.
///
/// Accepts `[g1, g2, ..]` as well as the `[[g1, g2, ..], null]` shape some
/// storage reads produce. `null` slots are dropped; anything that is not a list
/// yields no groups.
pub fn friend_groups(value: &Value) -> Vec<FriendGroup> {
	let Some(items) = value.as_array() else { return Vec::new() };
	let items = match items.first() {
		Some(Value::Array(inner)) => inner,
		_ => items,
	};
	items.iter().filter(|g| !g.is_null()).map(friend_group).collect()
}

/// Normalize one attempt record.
pub fn attempt(record: &Value) -> Attempt {
	Attempt {
		friend_group_index: uint32(field(record, "friend_group_index", "friendGroupIndex")),
		initiator: record.get("initiator").map(account).unwrap_or_default(),
		init_block: uint32(field(record, "init_block", "initBlock")),
		last_approval_block: uint32(field(record, "last_approval_block", "lastApprovalBlock")),
		approvals: record.get("approvals").map(Approvals::from_json).unwrap_or_default(),
	}
}

/// Normalize the attempts view of a lost account.
///
/// Items are either `[friend_group, attempt]` pairs or bare attempt records.
pub fn attempts(value: &Value) -> Vec<AttemptRecord> {
	let Some(items) = value.as_array() else { return Vec::new() };
	items
		.iter()
		.filter(|item| !item.is_null())
		.map(|item| match item.as_array().map(Vec::as_slice) {
			Some([group, record, ..]) => AttemptRecord {
				friend_group: (!group.is_null()).then(|| friend_group(group)),
				attempt: attempt(record),
			},
			Some([record]) => AttemptRecord { friend_group: None, attempt: attempt(record) },
			_ => AttemptRecord { friend_group: None, attempt: attempt(item) },
		})
		.collect()
}

/// Normalize an inheritor registry value.
///
/// The registry stores `(inheritance_order, inheritor, ticket)`; views may also
/// return just the inheritor account. Empty or unreadable values mean no entry.
pub fn inheritor_entry(value: &Value) -> Option<InheritorEntry> {
	let entry = match value {
		Value::Null => return None,
		Value::String(_) => InheritorEntry { inheritance_order: None, inheritor: account(value) },
		Value::Array(items) => match items.as_slice() {
			[order, who, ..] => InheritorEntry {
				inheritance_order: json_uint(order).map(|v| v.min(u32::MAX as u128) as u32),
				inheritor: account(who),
			},
			[single] => return inheritor_entry(single),
			[] => return None,
		},
		Value::Object(_) => match value.get("inheritor") {
			Some(who) => InheritorEntry {
				inheritance_order: field(value, "inheritance_order", "inheritanceOrder")
					.and_then(json_uint)
					.map(|v| v.min(u32::MAX as u128) as u32),
				inheritor: account(who),
			},
			None => InheritorEntry { inheritance_order: None, inheritor: account(value) },
		},
		_ => return None,
	};

	(!entry.inheritor.is_empty()).then_some(entry)
}

/// Normalize a list of account identifiers, dropping empty or unreadable entries.
pub fn accounts(value: &Value) -> Vec<AccountId> {
	value
		.as_array()
		.map(|items| items.iter().map(account).filter(|a| !a.is_empty()).collect())
		.unwrap_or_default()
}
