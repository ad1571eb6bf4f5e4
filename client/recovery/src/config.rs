//! Network catalogue and client configuration.

use std::{collections::BTreeMap, env};

use qp_recovery::WordWidth;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_NETWORK_ID: &str = "polkadot";

/// Environment variable selecting the network id.
pub const NETWORK_ENV: &str = "RECOVERY_NETWORK";
/// Environment variable overriding the websocket endpoint of the selected network.
pub const WS_URL_ENV: &str = "RECOVERY_WS_URL";
/// Environment variable overriding the approval word width, in bits.
pub const WORD_BITS_ENV: &str = "RECOVERY_APPROVAL_WORD_BITS";

/// Largest token decimals the balance formatter handles.
const MAX_TOKEN_DECIMALS: u8 = 30;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
	pub id: String,
	pub name: String,
	/// Default websocket endpoint of the asset hub running the recovery pallet.
	pub asset_hub_wss: String,
	pub token_symbol: String,
	pub token_decimals: u8,
	/// Address format used when rendering accounts read over RPC.
	pub ss58_prefix: u16,
}

fn network(id: &str, name: &str, wss: &str, symbol: &str, decimals: u8, ss58: u16) -> NetworkConfig {
	NetworkConfig {
		id: id.into(),
		name: name.into(),
		asset_hub_wss: wss.into(),
		token_symbol: symbol.into(),
		token_decimals: decimals,
		ss58_prefix: ss58,
	}
}

pub fn supported_networks() -> Vec<NetworkConfig> {
	vec![
		network("polkadot", "Polkadot", "wss://polkadot-asset-hub-rpc.polkadot.io", "DOT", 10, 0),
		network("westend", "Westend", "wss://westend-asset-hub-rpc.polkadot.io", "WND", 12, 42),
		network("paseo", "Paseo", "wss://paseo-asset-hub-rpc.polkadot.io", "PAS", 10, 42),
		network("development", "Development", "ws://127.0.0.1:12144", "WND", 12, 42),
	]
}

pub fn network_by_id(id: &str) -> Option<NetworkConfig> {
	supported_networks().into_iter().find(|n| n.id == id)
}

/// Accepts `ws://` and `wss://` URLs that name a host.
pub fn is_valid_ws_url(url: &str) -> bool {
	let url = url.trim();
	let Some(rest) = url.strip_prefix("wss://").or_else(|| url.strip_prefix("ws://")) else {
		return false;
	};
	let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
	let host = authority.rsplit('@').next().unwrap_or_default();
	!host.is_empty() && !host.starts_with(':') && !host.contains(char::is_whitespace)
}

/// How balances are rendered for the selected network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenFormat {
	pub symbol: String,
	pub decimals: u8,
}

impl TokenFormat {
	/// Render a raw balance with four fractional digits, rounding half up.
	pub fn format(&self, raw: u128) -> String {
		let decimals = u32::from(self.decimals.min(MAX_TOKEN_DECIMALS));
		let unit = 10u128.pow(decimals);
		let mut whole = raw / unit;
		let remainder = raw % unit;
		let mut fraction = if decimals >= 4 {
			let divisor = 10u128.pow(decimals - 4);
			(remainder + divisor / 2) / divisor
		} else {
			remainder * 10u128.pow(4 - decimals)
		};
		if fraction >= 10_000 {
			whole += 1;
			fraction -= 10_000;
		}
		format!("{}.{:04} {}", whole, fraction, self.symbol)
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
	/// Selected network id from [`supported_networks`].
	pub network: String,
	/// Per-network endpoint overrides.
	pub custom_urls: BTreeMap<String, String>,
	/// Width of one word of the attempt approvals array.
	pub approval_word_width: WordWidth,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			network: DEFAULT_NETWORK_ID.into(),
			custom_urls: BTreeMap::new(),
			approval_word_width: WordWidth::default(),
		}
	}
}

impl ClientConfig {
	pub fn from_json(json: &str) -> Result<Self> {
		let config: Self = serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
		config.validate()?;
		Ok(config)
	}

	/// Defaults, overridden by [`NETWORK_ENV`], [`WS_URL_ENV`] and [`WORD_BITS_ENV`].
	pub fn from_env() -> Result<Self> {
		Self::default().with_overrides(
			env::var(NETWORK_ENV).ok(),
			env::var(WS_URL_ENV).ok(),
			env::var(WORD_BITS_ENV).ok(),
		)
	}

	fn with_overrides(
		mut self,
		network: Option<String>,
		ws_url: Option<String>,
		word_bits: Option<String>,
	) -> Result<Self> {
		if let Some(network) = network.filter(|n| !n.trim().is_empty()) {
			self.network = network.trim().to_string();
		}
		if let Some(url) = ws_url.filter(|u| !u.trim().is_empty()) {
			self.custom_urls.insert(self.network.clone(), url.trim().to_string());
		}
		if let Some(bits) = word_bits {
			self.approval_word_width = match bits.trim() {
				"8" => WordWidth::U8,
				"16" => WordWidth::U16,
				"32" => WordWidth::U32,
				"64" => WordWidth::U64,
				other => return Err(Error::Config(format!("unsupported approval word width {other}"))),
			};
		}
		self.validate()?;
		Ok(self)
	}

	pub fn validate(&self) -> Result<()> {
		self.network_config()?;
		for (id, url) in &self.custom_urls {
			if !is_valid_ws_url(url) {
				return Err(Error::Config(format!("custom URL for {id} is not a ws(s) URL: {url}")));
			}
		}
		Ok(())
	}

	pub fn network_config(&self) -> Result<NetworkConfig> {
		network_by_id(&self.network)
			.ok_or_else(|| Error::Config(format!("unknown network {}", self.network)))
	}

	/// Websocket endpoint: the custom override if any, else the network default.
	pub fn endpoint(&self) -> Result<String> {
		match self.custom_urls.get(&self.network) {
			Some(url) => Ok(url.clone()),
			None => Ok(self.network_config()?.asset_hub_wss),
		}
	}

	pub fn token(&self) -> Result<TokenFormat> {
		let network = self.network_config()?;
		Ok(TokenFormat { symbol: network.token_symbol, decimals: network.token_decimals })
	}
}
