//! Latest-request-wins commit slot for derived views.
//!
//! A surface (one dashboard, one inherited-accounts list) shows a single view.
//! Each refresh takes a [`Ticket`]; when results come back only the ticket of the
//! most recent refresh may commit, so a slow response for an address the user has
//! already typed past can never overwrite newer data. A refresh for the key that
//! is already in flight as the latest request is coalesced.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::LOG_TARGET;

/// Permission to commit the result of one refresh.
///
/// Dropping a ticket without committing (the refresh future was abandoned)
/// releases its key, so the next refresh of that key fetches again.
pub struct Ticket<'a, K, V> {
	slot: &'a ViewSlot<K, V>,
	key: K,
	generation: u64,
}

impl<K, V> Ticket<'_, K, V> {
	pub fn key(&self) -> &K {
		&self.key
	}
}

impl<K, V> Drop for Ticket<'_, K, V> {
	fn drop(&mut self) {
		let mut slot = self.slot.inner.lock();
		if slot.generation == self.generation && slot.in_flight.is_some() {
			log::debug!(target: LOG_TARGET, "Refresh #{} abandoned before commit", self.generation);
			slot.in_flight = None;
		}
	}
}

/// Result of trying to refresh a slot.
#[derive(Debug)]
pub enum Refresh<V> {
	/// The result was committed and is now the visible view.
	Committed(Arc<V>),
	/// A newer refresh started meanwhile; the result was discarded.
	Stale,
	/// The same key is already being fetched by the latest refresh.
	InFlight,
	/// Nothing was selected; the visible view was dropped.
	Cleared,
}

struct Slot<K, V> {
	generation: u64,
	in_flight: Option<K>,
	committed: Option<(K, Arc<V>)>,
}

pub struct ViewSlot<K, V> {
	inner: Mutex<Slot<K, V>>,
}

impl<K: Clone + PartialEq + std::fmt::Debug, V> Default for ViewSlot<K, V> {
	fn default() -> Self {
		Self::new()
	}
}

impl<K: Clone + PartialEq + std::fmt::Debug, V> ViewSlot<K, V> {
	pub fn new() -> Self {
		Self { inner: Mutex::new(Slot { generation: 0, in_flight: None, committed: None }) }
	}

	/// Start a refresh for `key`. Returns `None` when the latest refresh is for the
	/// same key and has not completed yet.
	pub fn begin(&self, key: K) -> Option<Ticket<'_, K, V>> {
		let mut slot = self.inner.lock();
		if slot.in_flight.as_ref() == Some(&key) {
			return None;
		}
		slot.generation += 1;
		slot.in_flight = Some(key.clone());
		Some(Ticket { slot: self, key, generation: slot.generation })
	}

	/// Commit `value` if `ticket` still belongs to the latest refresh.
	pub fn commit(&self, ticket: Ticket<'_, K, V>, value: V) -> Refresh<V> {
		// release the lock before `ticket` drops, its `Drop` locks again
		let mut slot = self.inner.lock();
		if ticket.generation != slot.generation {
			drop(slot);
			log::debug!(target: LOG_TARGET, "Discarding stale result for {:?}", ticket.key);
			return Refresh::Stale;
		}
		let value = Arc::new(value);
		slot.in_flight = None;
		slot.committed = Some((ticket.key.clone(), value.clone()));
		drop(slot);
		Refresh::Committed(value)
	}

	/// Currently visible view and the key it was computed for.
	pub fn current(&self) -> Option<(K, Arc<V>)> {
		self.inner.lock().committed.clone()
	}

	/// Drop the visible view, e.g. when the selected address is cleared. Results of
	/// refreshes started before this call are discarded.
	pub fn clear(&self) {
		let mut slot = self.inner.lock();
		slot.generation += 1;
		slot.in_flight = None;
		slot.committed = None;
	}
}
