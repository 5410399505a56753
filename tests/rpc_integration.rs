//! Integration tests against a live node
//!
//! These tests require a local development node running at ws://127.0.0.1:9944.
//!
//! Run with: `cargo test --test rpc_integration -- --ignored --nocapture`

use signet_vault::{
	chain::{
		call::{BalancesCall, Call, CallCodec},
		client::{ChainClient, RpcChainClient},
	},
	config::AccountKind,
	vault::{derive_multisig_address, Address},
};

const NODE_URL: &str = "ws://127.0.0.1:9944";

// //Alice and //Bob dev accounts
const ALICE: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
const BOB: &str = "5FHneW46xGXgs5mUiveU4sHFXGhnhVBpvjVThMu9Hf8DQ5ih";

#[tokio::test]
#[ignore]
async fn metadata_provides_vault_calls() {
	let client = RpcChainClient::new(NODE_URL, AccountKind::Substrate).await.unwrap();
	let table = client.call_table().await.unwrap();
	for (pallet, call) in [
		("Proxy", "proxy"),
		("Multisig", "as_multi"),
		("Multisig", "approve_as_multi"),
		("Balances", "transfer_keep_alive"),
	] {
		assert!(table.index_of(pallet, call).is_some(), "{pallet}.{call} missing");
	}
}

#[tokio::test]
#[ignore]
async fn fee_estimate_for_transfer() {
	let client = RpcChainClient::new(NODE_URL, AccountKind::Substrate).await.unwrap();
	let table = client.call_table().await.unwrap();
	let codec = CallCodec::new(&table, AccountKind::Substrate);

	let bob = Address::from_ss58(BOB).unwrap();
	let call = Call::Balances(BalancesCall::TransferKeepAlive { dest: bob, value: 1_000_000_000_000 });
	let info = client.query_call_info(&codec.encode(&call).unwrap()).await.unwrap();
	assert!(info.partial_fee > 0);
	assert!(info.weight.ref_time > 0);
}

#[tokio::test]
#[ignore]
async fn storage_queries_for_fresh_multisig_are_empty() {
	let client = RpcChainClient::new(NODE_URL, AccountKind::Substrate).await.unwrap();
	let alice = Address::from_ss58(ALICE).unwrap();
	let bob = Address::from_ss58(BOB).unwrap();
	let multisig = derive_multisig_address(&[alice, bob], 2).unwrap();

	assert!(client.pending_multisigs(&multisig).await.unwrap().is_empty());
	assert!(client.proxy_delegates(&multisig).await.unwrap().is_empty());
}
