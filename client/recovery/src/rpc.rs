//! [`ChainQuery`] over a jsonrpsee websocket client.
//!
//! Recovery state is read through the `RecoveryApi` runtime API with
//! `state_call`; balances come straight from `System.Account` storage, and the
//! registry scan walks the `Recovery.Inheritor` storage map page by page. Results
//! are handed to the aggregators as JSON with SS58 addresses, the same shape a
//! wallet library would render.

use async_trait::async_trait;
use codec::{Decode, Encode};
use jsonrpsee::{
	core::client::ClientT,
	rpc_params,
	ws_client::{WsClient, WsClientBuilder},
};
use qp_recovery::{AccountId, Balance, BlockNumber};
use serde::Deserialize;
use serde_json::{json, Value};
use sp_core::crypto::{AccountId32, Ss58AddressFormat, Ss58Codec};

use crate::{
	connection::Connector,
	query::ChainQuery,
	Error, Result, LOG_TARGET,
};

const API_PREFIX: &str = "RecoveryApi";
/// Keys fetched per `state_getKeysPaged` request.
const KEYS_PAGE_SIZE: u32 = 256;

type RawAccount = [u8; 32];

#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
struct WireFriendGroup {
	deposit: Balance,
	friends: Vec<RawAccount>,
	friends_needed: u32,
	inheritor: RawAccount,
	inheritance_delay: BlockNumber,
	inheritance_order: u32,
	cancel_delay: BlockNumber,
}

#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
struct WireAttempt {
	friend_group_index: u32,
	initiator: RawAccount,
	init_block: BlockNumber,
	last_approval_block: BlockNumber,
	approvals: Vec<u16>,
}

/// Leading fields of `frame_system::AccountInfo` up to the free balance.
#[derive(Decode, Debug)]
struct AccountInfoHead {
	_nonce: u32,
	_consumers: u32,
	_providers: u32,
	_sufficients: u32,
	free: Balance,
}

/// Leading fields of a `Recovery.Inheritor` value; the trailing ticket is ignored.
#[derive(Decode, Debug)]
struct InheritorHead {
	order: u32,
	inheritor: RawAccount,
}

/// One block's worth of `state_queryStorageAt` results.
#[derive(Deserialize, Debug)]
struct StorageChangeSet {
	changes: Vec<(String, Option<String>)>,
}

/// Builds websocket clients for [`crate::ConnectionManager`].
#[derive(Clone, Debug)]
pub struct WsConnector {
	ss58_prefix: u16,
}

impl WsConnector {
	pub fn new(ss58_prefix: u16) -> Self {
		Self { ss58_prefix }
	}
}

#[async_trait]
impl Connector for WsConnector {
	type Handle = RpcChainQuery;

	async fn connect(&self, url: &str) -> Result<RpcChainQuery> {
		let client = WsClientBuilder::default()
			.build(url)
			.await
			.map_err(|e| Error::Connection { url: url.to_string(), reason: e.to_string() })?;
		Ok(RpcChainQuery { client, ss58_prefix: self.ss58_prefix })
	}
}

pub struct RpcChainQuery {
	client: WsClient,
	ss58_prefix: u16,
}

impl RpcChainQuery {
	fn format(&self) -> Ss58AddressFormat {
		Ss58AddressFormat::custom(self.ss58_prefix)
	}

	fn address(&self, raw: RawAccount) -> AccountId {
		AccountId32::new(raw).to_ss58check_with_version(self.format())
	}

	fn parse(&self, address: &str) -> Result<RawAccount> {
		AccountId32::from_ss58check_with_version(address.trim())
			.map(|(account, _)| account.into())
			.map_err(|_| Error::InvalidAddress(address.to_string()))
	}

	async fn runtime_call<T: Decode>(&self, method: &'static str, args: Vec<u8>) -> Result<T> {
		let name = format!("{API_PREFIX}_{method}");
		let data = format!("0x{}", hex::encode(args));
		let response: String = self
			.client
			.request("state_call", rpc_params![name, data])
			.await
			.map_err(|e| match e.to_string() {
				msg if msg.contains("not found") || msg.contains("NotFound") => {
					log::debug!(target: LOG_TARGET, "Runtime API {} unavailable: {}", method, msg);
					Error::Unsupported(method)
				},
				_ => Error::Rpc(e),
			})?;
		let bytes = decode_hex(&response)?;
		Ok(T::decode(&mut &bytes[..])?)
	}

	fn group_json(&self, group: WireFriendGroup) -> Value {
		json!({
			"friends": group.friends.into_iter().map(|f| self.address(f)).collect::<Vec<_>>(),
			"friends_needed": group.friends_needed,
			"inheritor": self.address(group.inheritor),
			"inheritance_delay": group.inheritance_delay,
			"inheritance_order": group.inheritance_order,
			"cancel_delay": group.cancel_delay,
			"deposit": group.deposit.to_string(),
		})
	}

	fn attempt_json(&self, attempt: WireAttempt) -> Value {
		json!({
			"friend_group_index": attempt.friend_group_index,
			"initiator": self.address(attempt.initiator),
			"init_block": attempt.init_block,
			"last_approval_block": attempt.last_approval_block,
			"approvals": attempt.approvals,
		})
	}
}

/// `twox128("System") ++ twox128("Account") ++ blake2_128(who) ++ who`.
fn system_account_key(who: &RawAccount) -> Vec<u8> {
	let mut key = Vec::with_capacity(80);
	key.extend_from_slice(&sp_crypto_hashing::twox_128(b"System"));
	key.extend_from_slice(&sp_crypto_hashing::twox_128(b"Account"));
	key.extend_from_slice(&sp_crypto_hashing::blake2_128(who));
	key.extend_from_slice(who);
	key
}

fn free_balance(storage: &[u8]) -> Result<Balance> {
	Ok(AccountInfoHead::decode(&mut &storage[..])?.free)
}

/// `twox128("Recovery") ++ twox128("Inheritor")`.
fn inheritor_prefix() -> Vec<u8> {
	let mut key = Vec::with_capacity(32);
	key.extend_from_slice(&sp_crypto_hashing::twox_128(b"Recovery"));
	key.extend_from_slice(&sp_crypto_hashing::twox_128(b"Inheritor"));
	key
}

fn decode_hex(raw: &str) -> Result<Vec<u8>> {
	Ok(hex::decode(raw.trim_start_matches("0x"))?)
}

/// Decode one `Recovery.Inheritor` entry into `(lost, order, inheritor)`.
///
/// The map key is `prefix ++ hash(lost) ++ lost` for a concat hasher, so the
/// lost account is the last 32 bytes of the key whichever hasher is used.
fn inheritor_entry(key: &[u8], value: &[u8]) -> Result<(RawAccount, u32, RawAccount)> {
	if key.len() < 64 {
		let reason = format!("storage key of {} bytes", key.len());
		return Err(Error::Query("inheritor_entries", reason));
	}
	let mut lost = [0u8; 32];
	lost.copy_from_slice(&key[key.len() - 32..]);
	let head = InheritorHead::decode(&mut &value[..])?;
	Ok((lost, head.order, head.inheritor))
}

#[async_trait]
impl ChainQuery for RpcChainQuery {
	async fn block_number(&self) -> Result<BlockNumber> {
		match self.runtime_call::<BlockNumber>("provided_block_number", Vec::new()).await {
			Err(Error::Unsupported(_)) => {},
			other => return other,
		}
		let header: Value = self.client.request("chain_getHeader", rpc_params![]).await?;
		let number = header.get("number").and_then(Value::as_str).unwrap_or_default();
		u32::from_str_radix(number.trim_start_matches("0x"), 16)
			.map_err(|e| Error::Query("block_number", e.to_string()))
	}

	async fn friend_groups(&self, who: &str) -> Result<Value> {
		let groups: Vec<WireFriendGroup> =
			self.runtime_call("friend_groups", self.parse(who)?.encode()).await?;
		Ok(Value::Array(groups.into_iter().map(|g| self.group_json(g)).collect()))
	}

	async fn inheritor(&self, lost: &str) -> Result<Value> {
		let entry: Option<(u32, RawAccount)> =
			self.runtime_call("inheritor", self.parse(lost)?.encode()).await?;
		Ok(match entry {
			Some((order, who)) => json!([order, self.address(who)]),
			None => Value::Null,
		})
	}

	async fn attempts(&self, lost: &str) -> Result<Value> {
		let attempts: Vec<(WireFriendGroup, WireAttempt)> =
			self.runtime_call("attempts", self.parse(lost)?.encode()).await?;
		Ok(Value::Array(
			attempts
				.into_iter()
				.map(|(group, attempt)| json!([self.group_json(group), self.attempt_json(attempt)]))
				.collect(),
		))
	}

	async fn inheritance(&self, inheritor: &str) -> Result<Value> {
		let lost: Vec<RawAccount> =
			self.runtime_call("inheritance", self.parse(inheritor)?.encode()).await?;
		Ok(Value::Array(lost.into_iter().map(|a| Value::String(self.address(a))).collect()))
	}

	async fn balance(&self, who: &str) -> Result<Balance> {
		let key = format!("0x{}", hex::encode(system_account_key(&self.parse(who)?)));
		let storage: Option<String> =
			self.client.request("state_getStorage", rpc_params![key]).await?;
		match storage {
			Some(raw) => free_balance(&decode_hex(&raw)?),
			None => Ok(0),
		}
	}

	async fn inheritor_entries(&self) -> Result<Vec<(AccountId, Value)>> {
		let prefix = format!("0x{}", hex::encode(inheritor_prefix()));
		let mut entries = Vec::new();
		let mut start_key: Option<String> = None;
		loop {
			let keys: Vec<String> = self
				.client
				.request("state_getKeysPaged", rpc_params![&prefix, KEYS_PAGE_SIZE, &start_key])
				.await?;
			if keys.is_empty() {
				break;
			}
			let sets: Vec<StorageChangeSet> =
				self.client.request("state_queryStorageAt", rpc_params![&keys]).await?;
			for (key, value) in sets.into_iter().flat_map(|set| set.changes) {
				let Some(value) = value else { continue };
				match inheritor_entry(&decode_hex(&key)?, &decode_hex(&value)?) {
					Ok((lost, order, who)) =>
						entries.push((self.address(lost), json!([order, self.address(who)]))),
					Err(e) => {
						log::debug!(target: LOG_TARGET, "Skipping inheritor entry {}: {}", key, e)
					},
				}
			}
			if keys.len() < KEYS_PAGE_SIZE as usize {
				break;
			}
			start_key = keys.last().cloned();
		}
		log::debug!(target: LOG_TARGET, "Scanned {} inheritor entries", entries.len());
		Ok(entries)
	}
}
