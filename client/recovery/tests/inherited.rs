#[path = "common.rs"]
mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use common::TestChain;
use pretty_assertions::assert_eq;
use qp_recovery::FriendGroupsDraft;
use sc_recovery_client::{
	inherited::UNKNOWN_BALANCE, ActionDispatcher, Confirmation, Error, InheritedAccount,
	InheritedAccountsAggregator, InheritedView, Refresh, SignerHandle, TokenFormat,
};

const HEIR: &str = "heir";
const L1: &str = "lost-1";
const L2: &str = "lost-2";

fn dot() -> TokenFormat {
	TokenFormat { symbol: "DOT".into(), decimals: 10 }
}

fn chain_with_two_inherited_accounts() -> Arc<TestChain> {
	let _ = env_logger::builder().is_test(true).try_init();
	let chain = Arc::new(TestChain::new());
	chain.set_groups(
		L1,
		vec![TestChain::group(&["a"], 1, "other", 0), TestChain::group(&["b"], 1, HEIR, 1)],
	);
	chain.set_groups(L2, vec![TestChain::group(&["c"], 1, HEIR, 0)]);
	chain.set_inheritor(L1, 1, HEIR);
	chain.set_inheritor(L2, 0, HEIR);
	chain.set_balance(L1, 12_345_000_000);
	chain.set_balance(L2, 50_000_000_000);
	chain
}

fn find<'a>(accounts: &'a [InheritedAccount], address: &str) -> &'a InheritedAccount {
	accounts.iter().find(|a| a.address == address).unwrap()
}

#[tokio::test]
async fn failing_account_keeps_its_place() {
	let chain = chain_with_two_inherited_accounts();
	chain.fail_balance_reads(L2);

	let accounts = InheritedAccountsAggregator::new(chain.clone(), dot()).load(HEIR).await;
	assert_eq!(accounts.len(), 2);

	let l1 = find(&accounts, L1);
	assert_eq!(l1.balance, "1.2345 DOT");
	assert!(l1.withdrawable);
	assert_eq!(l1.inheritance_order, 1);
	assert_eq!(l1.contesting_groups, vec![0]);
	assert!(l1.can_be_contested);
	assert!(!l1.has_ongoing_attempts);

	let l2 = find(&accounts, L2);
	assert_eq!(l2.balance, UNKNOWN_BALANCE);
	assert_eq!(l2.balance_raw, None);
	assert!(!l2.withdrawable);
	assert!(l2.friend_groups.is_empty());
	assert!(l2.contesting_groups.is_empty());
}

#[tokio::test]
async fn registry_scan_replaces_missing_inheritance_view() {
	let chain = chain_with_two_inherited_accounts();
	chain.without_inheritance_view();
	chain.set_inheritor("lost-3", 0, "someone-else");

	let aggregator = InheritedAccountsAggregator::new(chain.clone(), dot());
	assert_eq!(aggregator.inherited_addresses(HEIR).await, vec![L1.to_string(), L2.to_string()]);

	let l2 = find(&aggregator.load(HEIR).await, L2).clone();
	assert_eq!(l2.balance, "5.0000 DOT");
	assert_eq!(l2.inheritance_order, 0);
	assert!(!l2.can_be_contested);
}

#[tokio::test]
async fn view_refresh_and_withdrawal() {
	let chain = chain_with_two_inherited_accounts();
	let view = InheritedView::new(InheritedAccountsAggregator::new(chain.clone(), dot()));
	let dispatcher = ActionDispatcher::new(chain.clone());
	let heir = SignerHandle::new(HEIR, "test");

	assert_matches!(view.refresh(HEIR).await, Refresh::Committed(accounts) if accounts.len() == 2);
	let l2 = view.account(L2).unwrap();

	let outcome = dispatcher.transfer_all_from_inherited(&l2, HEIR, false, &heir).await;
	assert!(outcome.unwrap().is_success());
	assert_eq!(chain.balance_of(HEIR), 50_000_000_000);

	assert_matches!(view.refresh(HEIR).await, Refresh::Committed(_));
	let l2 = view.account(L2).unwrap();
	assert_eq!(l2.balance, "0.0000 DOT");
	assert!(!l2.withdrawable);
	assert_matches!(
		dispatcher.transfer_all_from_inherited(&l2, HEIR, false, &heir).await,
		Err(Error::Precondition { .. })
	);

	assert_matches!(view.refresh("").await, Refresh::Cleared);
	assert!(view.current().is_none());
}

#[tokio::test]
async fn inherited_friend_groups_can_be_replaced_and_cleared() {
	let chain = chain_with_two_inherited_accounts();
	let aggregator = InheritedAccountsAggregator::new(chain.clone(), dot());
	let dispatcher = ActionDispatcher::new(chain.clone());
	let heir = SignerHandle::new(HEIR, "test");

	let accounts = aggregator.load(HEIR).await;
	let l1 = find(&accounts, L1);
	let mut draft = FriendGroupsDraft::from_existing(&l1.friend_groups);
	draft.remove_group(0).unwrap();
	assert!(dispatcher.set_inherited_friend_groups(l1, &draft, &heir).await.unwrap().is_success());

	let accounts = aggregator.load(HEIR).await;
	let l1 = find(&accounts, L1);
	assert_eq!(l1.friend_groups.len(), 1);
	assert!(l1.contesting_groups.is_empty());

	assert_matches!(
		dispatcher.clear_inherited_friend_groups(l1, &heir, None).await,
		Err(Error::ConfirmationRequired("control_inherited_account"))
	);
	let confirmation = Confirmation::new("control_inherited_account");
	let outcome = dispatcher.clear_inherited_friend_groups(l1, &heir, Some(&confirmation)).await;
	assert!(outcome.unwrap().is_success());

	let accounts = aggregator.load(HEIR).await;
	assert!(find(&accounts, L1).friend_groups.is_empty());
}
