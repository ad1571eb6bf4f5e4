//! Endpoint connection management.
//!
//! One [`ConnectionManager`] owns the client for the selected network. Switching
//! endpoints drops the previous client; failures leave the manager in
//! [`ConnectionState::Failed`] until the next explicit connect.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};

use crate::{query::ChainQuery, Error, Result, LOG_TARGET};

/// Opens a client for an endpoint URL.
#[async_trait]
pub trait Connector: Send + Sync {
	type Handle: Send + Sync + 'static;

	async fn connect(&self, url: &str) -> Result<Self::Handle>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionState {
	Disconnected,
	Connecting { url: String },
	Connected { url: String },
	Failed { url: String, reason: String },
}

struct Active<H> {
	url: String,
	handle: Arc<H>,
}

pub struct ConnectionManager<C: Connector> {
	connector: C,
	active: Mutex<Option<Active<C::Handle>>>,
	state: watch::Sender<ConnectionState>,
}

impl<C: Connector> ConnectionManager<C> {
	pub fn new(connector: C) -> Self {
		Self {
			connector,
			active: Mutex::new(None),
			state: watch::Sender::new(ConnectionState::Disconnected),
		}
	}

	/// Connect to `url`. Keeps the current client when it already serves `url`.
	pub async fn connect(&self, url: &str) -> Result<Arc<C::Handle>> {
		let mut active = self.active.lock().await;
		if let Some(current) = active.as_ref().filter(|a| a.url == url) {
			return Ok(current.handle.clone());
		}
		self.open(&mut active, url).await
	}

	/// Drop the current client and connect to `url` again.
	pub async fn reconnect(&self, url: &str) -> Result<Arc<C::Handle>> {
		let mut active = self.active.lock().await;
		self.open(&mut active, url).await
	}

	async fn open(
		&self,
		active: &mut Option<Active<C::Handle>>,
		url: &str,
	) -> Result<Arc<C::Handle>> {
		if let Some(previous) = active.take() {
			log::info!(target: LOG_TARGET, "Closing connection to {}", previous.url);
		}
		self.state.send_replace(ConnectionState::Connecting { url: url.to_string() });

		match self.connector.connect(url).await {
			Ok(handle) => {
				let handle = Arc::new(handle);
				*active = Some(Active { url: url.to_string(), handle: handle.clone() });
				self.state.send_replace(ConnectionState::Connected { url: url.to_string() });
				log::info!(target: LOG_TARGET, "Connected to {}", url);
				Ok(handle)
			},
			Err(e) => {
				log::warn!(target: LOG_TARGET, "Failed to connect to {}: {}", url, e);
				self.state.send_replace(ConnectionState::Failed {
					url: url.to_string(),
					reason: e.to_string(),
				});
				Err(Error::Connection { url: url.to_string(), reason: e.to_string() })
			},
		}
	}

	pub async fn disconnect(&self) {
		if let Some(previous) = self.active.lock().await.take() {
			log::info!(target: LOG_TARGET, "Disconnected from {}", previous.url);
		}
		self.state.send_replace(ConnectionState::Disconnected);
	}

	/// Client of the current connection.
	pub async fn handle(&self) -> Result<Arc<C::Handle>> {
		self.active.lock().await.as_ref().map(|a| a.handle.clone()).ok_or(Error::NotConnected)
	}

	pub fn state(&self) -> ConnectionState {
		self.state.borrow().clone()
	}

	pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
		self.state.subscribe()
	}
}

impl<C> ConnectionManager<C>
where
	C: Connector,
	C::Handle: ChainQuery,
{
	/// Current client as a [`ChainQuery`] for the aggregators.
	pub async fn query(&self) -> Result<Arc<dyn ChainQuery>> {
		let handle: Arc<dyn ChainQuery> = self.handle().await?;
		Ok(handle)
	}
}
