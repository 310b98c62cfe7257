#![cfg(test)]

use soroban_sdk::{
    contract, contractimpl, contracttype, map, testutils::Address as _, Address, Env, Map, String,
};

use crate::{WrappedNative, WrappedNativeClient};

// ─── Mock Native Asset (simple SEP-41 subset) ───────────────────

#[contracttype]
#[derive(Clone)]
enum MockNativeKey {
    Balances,
}

#[contract]
pub struct MockNativeToken;

#[contractimpl]
impl MockNativeToken {
    pub fn init(env: Env) {
        let balances: Map<Address, i128> = map![&env];
        env.storage().instance().set(&MockNativeKey::Balances, &balances);
    }

    pub fn mint(env: Env, to: Address, amount: i128) {
        let mut balances: Map<Address, i128> =
            env.storage().instance().get(&MockNativeKey::Balances).unwrap();
        let prev = balances.get(to.clone()).unwrap_or(0);
        balances.set(to, prev + amount);
        env.storage().instance().set(&MockNativeKey::Balances, &balances);
    }

    pub fn transfer(env: Env, from: Address, to: Address, amount: i128) {
        // No require_auth in mock — avoids non-root auth issues in cross-contract calls
        let mut balances: Map<Address, i128> =
            env.storage().instance().get(&MockNativeKey::Balances).unwrap();
        let from_bal = balances.get(from.clone()).unwrap_or(0);
        assert!(from_bal >= amount, "insufficient native balance");
        balances.set(from, from_bal - amount);
        let to_bal = balances.get(to.clone()).unwrap_or(0);
        balances.set(to, to_bal + amount);
        env.storage().instance().set(&MockNativeKey::Balances, &balances);
    }

    pub fn balance(env: Env, id: Address) -> i128 {
        let balances: Map<Address, i128> =
            env.storage().instance().get(&MockNativeKey::Balances).unwrap();
        balances.get(id).unwrap_or(0)
    }
}

// ─── Test Helpers ───────────────────────────────────────────────

fn setup() -> (
    Env,
    WrappedNativeClient<'static>,
    MockNativeTokenClient<'static>,
    Address,
    Address,
    Address,
) {
    let env = Env::default();
    env.mock_all_auths();

    let native_id = env.register(MockNativeToken, ());
    let native = MockNativeTokenClient::new(&env, &native_id);
    native.init();

    let contract_id = env.register(WrappedNative, ());
    let client = WrappedNativeClient::new(&env, &contract_id);

    let owner = Address::generate(&env);
    let holder = Address::generate(&env);

    client.initialize(&owner, &native_id);

    (env, client, native, contract_id, owner, holder)
}

// ─── Metadata Tests ─────────────────────────────────────────────

#[test]
fn test_initialize_and_metadata() {
    let (env, client, _native, _id, _owner, _holder) = setup();
    assert_eq!(client.decimals(), 7);
    assert_eq!(client.name(), String::from_str(&env, "Wrapped Stellar Lumen"));
    assert_eq!(client.symbol(), String::from_str(&env, "WXLM"));
    assert_eq!(client.total_supply(), 0);
}

#[test]
fn test_native_token_getter() {
    let env = Env::default();
    env.mock_all_auths();

    let native_id = env.register(MockNativeToken, ());
    let contract_id = env.register(WrappedNative, ());
    let client = WrappedNativeClient::new(&env, &contract_id);
    let owner = Address::generate(&env);

    client.initialize(&owner, &native_id);
    assert_eq!(client.native_token(), native_id);
}

// ─── Deposit Tests ──────────────────────────────────────────────

#[test]
fn test_deposit_locks_and_mints() {
    let (_env, client, native, contract_id, _owner, holder) = setup();
    native.mint(&holder, &1_000_000_000); // 100 XLM

    client.deposit(&holder, &300_000_000);

    assert_eq!(client.balance(&holder), 300_000_000);
    assert_eq!(native.balance(&holder), 700_000_000);
    assert_eq!(native.balance(&contract_id), 300_000_000);
    assert_eq!(client.total_supply(), 300_000_000);
    assert_eq!(client.total_wrapped(), 300_000_000);
    assert_eq!(client.locked_native(), 300_000_000);
}

#[test]
#[should_panic(expected = "Error(Contract, #1)")]
fn test_deposit_zero_rejected() {
    let (_env, client, native, _id, _owner, holder) = setup();
    native.mint(&holder, &1_000_000_000);
    client.deposit(&holder, &0);
}

#[test]
#[should_panic(expected = "Error(Contract, #1)")]
fn test_deposit_negative_rejected() {
    let (_env, client, native, _id, _owner, holder) = setup();
    native.mint(&holder, &1_000_000_000);
    client.deposit(&holder, &-5);
}

#[test]
#[should_panic(expected = "insufficient native balance")]
fn test_deposit_without_native_funds() {
    let (_env, client, _native, _id, _owner, holder) = setup();
    client.deposit(&holder, &100);
}

// ─── Withdraw Tests ─────────────────────────────────────────────

#[test]
fn test_withdraw_burns_and_releases() {
    let (_env, client, native, contract_id, _owner, holder) = setup();
    native.mint(&holder, &1_000_000_000);
    client.deposit(&holder, &400_000_000);

    client.withdraw(&holder, &150_000_000);

    assert_eq!(client.balance(&holder), 250_000_000);
    assert_eq!(native.balance(&holder), 750_000_000);
    assert_eq!(native.balance(&contract_id), 250_000_000);
    assert_eq!(client.total_supply(), 250_000_000);
    assert_eq!(client.total_wrapped(), 400_000_000);
    assert_eq!(client.total_unwrapped(), 150_000_000);
    assert_eq!(client.locked_native(), 250_000_000);
}

#[test]
fn test_full_round_trip() {
    let (_env, client, native, contract_id, _owner, holder) = setup();
    native.mint(&holder, &500_000_000);
    client.deposit(&holder, &500_000_000);
    client.withdraw(&holder, &500_000_000);

    assert_eq!(client.balance(&holder), 0);
    assert_eq!(native.balance(&holder), 500_000_000);
    assert_eq!(native.balance(&contract_id), 0);
    assert_eq!(client.locked_native(), 0);
}

#[test]
#[should_panic(expected = "Error(Contract, #2)")]
fn test_withdraw_exceeds_balance() {
    let (_env, client, native, _id, _owner, holder) = setup();
    native.mint(&holder, &1_000_000_000);
    client.deposit(&holder, &100_000_000);
    client.withdraw(&holder, &100_000_001);
}

#[test]
#[should_panic(expected = "Error(Contract, #1)")]
fn test_withdraw_zero_rejected() {
    let (_env, client, native, _id, _owner, holder) = setup();
    native.mint(&holder, &1_000_000_000);
    client.deposit(&holder, &100_000_000);
    client.withdraw(&holder, &0);
}

// ─── Token Behavior Tests ───────────────────────────────────────

#[test]
fn test_transfer_after_deposit() {
    let (env, client, native, _id, _owner, holder) = setup();
    let recipient = Address::generate(&env);

    native.mint(&holder, &1_000_000_000);
    client.deposit(&holder, &1_000_000_000);
    client.transfer(&holder, &recipient, &1_000_000_000);

    assert_eq!(client.balance(&recipient), 1_000_000_000);
    assert_eq!(client.balance(&holder), 0);
}

#[test]
fn test_recipient_can_withdraw() {
    let (env, client, native, _id, _owner, holder) = setup();
    let recipient = Address::generate(&env);

    native.mint(&holder, &1_000_000_000);
    client.deposit(&holder, &1_000_000_000);
    client.transfer(&holder, &recipient, &600_000_000);
    client.withdraw(&recipient, &600_000_000);

    assert_eq!(native.balance(&recipient), 600_000_000);
    assert_eq!(client.balance(&recipient), 0);
}

// ─── Pause Tests ────────────────────────────────────────────────

#[test]
#[should_panic]
fn test_deposit_blocked_when_paused() {
    let (_env, client, native, _id, owner, holder) = setup();
    native.mint(&holder, &1_000_000_000);
    client.pause(&owner);
    client.deposit(&holder, &100_000_000);
}

#[test]
fn test_unpause_restores_deposit() {
    let (_env, client, native, _id, owner, holder) = setup();
    native.mint(&holder, &1_000_000_000);
    client.pause(&owner);
    client.unpause(&owner);
    client.deposit(&holder, &100_000_000);
    assert_eq!(client.balance(&holder), 100_000_000);
}

// ─── Auth Tests ─────────────────────────────────────────────────

#[test]
#[should_panic]
fn test_deposit_requires_auth() {
    let env = Env::default();

    let native_id = env.register(MockNativeToken, ());
    let native = MockNativeTokenClient::new(&env, &native_id);

    let contract_id = env.register(WrappedNative, ());
    let client = WrappedNativeClient::new(&env, &contract_id);

    let owner = Address::generate(&env);
    let holder = Address::generate(&env);

    env.mock_all_auths();
    native.init();
    client.initialize(&owner, &native_id);
    native.mint(&holder, &1_000_000_000);
    env.set_auths(&[]);

    client.deposit(&holder, &100_000_000);
}
