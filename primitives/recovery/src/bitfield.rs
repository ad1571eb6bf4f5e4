//! Approval bitfield decoding.
//!
//! An attempt records its approvals as a bitfield over the friend list of the
//! targeted group: bit `i` set means the friend at index `i` (in stored order)
//! approved. The chain stores the field as an array of fixed-width words with
//! little-endian bit order inside each word; some client encodings flatten it
//! into a single integer instead.
//!
//! The width of a stored word is a property of the chain type, so it is always
//! passed explicitly as a [`WordWidth`].

use serde_json::Value;

/// Width of one word of the approvals array.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordWidth {
	U8,
	/// Width of the `approvals` words of the recovery pallet's attempt type.
	#[default]
	U16,
	U32,
	U64,
}

impl WordWidth {
	pub const fn bits(self) -> u32 {
		match self {
			Self::U8 => 8,
			Self::U16 => 16,
			Self::U32 => 32,
			Self::U64 => 64,
		}
	}

	const fn mask(self) -> u64 {
		match self {
			Self::U64 => u64::MAX,
			w => (1u64 << w.bits()) - 1,
		}
	}
}

/// Approvals as delivered by the chain client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Approvals {
	/// Array of fixed-width words, word `0` holding friends `0..WORD_WIDTH`.
	Words(Vec<u64>),
	/// The whole bitfield flattened into one integer.
	Scalar(u128),
}

impl Default for Approvals {
	fn default() -> Self {
		Self::Words(Vec::new())
	}
}

/// Decoded approvals of one attempt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApprovalSet {
	pub approval_count: u32,
	/// Friend indices that approved, strictly increasing.
	pub voter_indices: Vec<u32>,
}

impl ApprovalSet {
	pub fn contains(&self, index: u32) -> bool {
		self.voter_indices.binary_search(&index).is_ok()
	}
}

impl Approvals {
	/// Decode the set bits into voter indices.
	pub fn decode(&self, width: WordWidth) -> ApprovalSet {
		let mut voter_indices = Vec::new();
		match self {
			Self::Words(words) => {
				let bits = width.bits();
				for (w, word) in words.iter().enumerate() {
					let word = word & width.mask();
					for b in 0..bits {
						if word & (1u64 << b) != 0 {
							voter_indices.push(w as u32 * bits + b);
						}
					}
				}
			},
			Self::Scalar(value) => {
				for b in 0..u128::BITS {
					if value & (1u128 << b) != 0 {
						voter_indices.push(b);
					}
				}
			},
		}

		ApprovalSet { approval_count: voter_indices.len() as u32, voter_indices }
	}

	/// Whether the friend at `index` has approved.
	pub fn is_set(&self, index: u32, width: WordWidth) -> bool {
		match self {
			Self::Words(words) => {
				let bits = width.bits();
				words
					.get((index / bits) as usize)
					.map(|word| word & width.mask() & (1u64 << (index % bits)) != 0)
					.unwrap_or(false)
			},
			Self::Scalar(value) => index < u128::BITS && value & (1u128 << index) != 0,
		}
	}

	/// Build from a JSON-rendered chain value.
	///
	/// Arrays become words (unreadable or out-of-range elements count as empty
	/// words so later positions keep their meaning); numbers and numeric strings (decimal or
	/// `0x` hex, as big integers are often rendered) become a scalar. Anything
	/// else decodes to no approvals.
	pub fn from_json(value: &Value) -> Self {
		match value {
			Value::Array(items) =>
				Self::Words(
					items
						.iter()
						.map(|v| json_uint(v).and_then(|w| u64::try_from(w).ok()).unwrap_or(0))
						.collect(),
				),
			Value::Number(_) | Value::String(_) => match json_uint(value) {
				Some(v) => Self::Scalar(v),
				None => Self::default(),
			},
			_ => Self::default(),
		}
	}
}

/// Decode an approvals value.
pub fn decode(approvals: &Approvals, width: WordWidth) -> ApprovalSet {
	approvals.decode(width)
}

/// Read a non-negative integer from a JSON number or numeric string.
pub(crate) fn json_uint(value: &Value) -> Option<u128> {
	match value {
		Value::Number(n) => n.as_u64().map(u128::from).or_else(|| {
			n.as_f64()
				.filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
				.map(|f| f as u128)
		}),
		Value::String(s) => {
			let s = s.trim();
			match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
				Some(hex) => u128::from_str_radix(hex, 16).ok(),
				None => s.parse::<u128>().ok(),
			}
		},
		_ => None,
	}
}
