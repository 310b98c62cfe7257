#![no_std]

use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, token::TokenClient,
    token::TokenInterface, Address, BytesN, Env, MuxedAddress, String, Symbol,
};
use stellar_access::ownable::{self, Ownable};
use stellar_contract_utils::pausable::{self, Pausable};
use stellar_macros::{only_owner, when_not_paused};
use stellar_tokens::fungible::Base;

#[cfg(test)]
mod test;

// TTL constants: extend instance storage proactively to prevent archival
const TTL_THRESHOLD: u32 = 17_280; // ~1 day at 5s/ledger
const TTL_EXTEND_TO: u32 = 518_400; // ~30 days

// ─── Storage Keys ────────────────────────────────────────────────

#[contracttype]
pub enum DataKey {
    NativeToken,
    TotalWrapped,
    TotalUnwrapped,
}

// ─── Errors ──────────────────────────────────────────────────────

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum WrapError {
    InvalidAmount = 1,
    InsufficientBalance = 2,
}

// ─── Contract ────────────────────────────────────────────────────

#[contract]
pub struct WrappedNative;

// ─── SEP-41 Token Interface (canonical trait for indexer detection) ──

#[contractimpl]
impl TokenInterface for WrappedNative {
    fn allowance(env: Env, from: Address, spender: Address) -> i128 {
        Base::allowance(&env, &from, &spender)
    }

    fn approve(env: Env, from: Address, spender: Address, amount: i128, expiration_ledger: u32) {
        Base::approve(&env, &from, &spender, amount, expiration_ledger);
    }

    fn balance(env: Env, id: Address) -> i128 {
        Base::balance(&env, &id)
    }

    fn transfer(env: Env, from: Address, to: MuxedAddress, amount: i128) {
        Base::transfer(&env, &from, &to, amount);
    }

    fn transfer_from(env: Env, spender: Address, from: Address, to: Address, amount: i128) {
        Base::transfer_from(&env, &spender, &from, &to, amount);
    }

    fn burn(env: Env, from: Address, amount: i128) {
        Base::burn(&env, &from, amount);
    }

    fn burn_from(env: Env, spender: Address, from: Address, amount: i128) {
        Base::burn_from(&env, &spender, &from, amount);
    }

    fn decimals(env: Env) -> u32 {
        Base::decimals(&env)
    }

    fn name(env: Env) -> String {
        Base::name(&env)
    }

    fn symbol(env: Env) -> String {
        Base::symbol(&env)
    }
}

// Ownable (2-step transfer)
#[contractimpl]
impl Ownable for WrappedNative {}

// Pausable (owner-only)
#[contractimpl]
impl Pausable for WrappedNative {
    fn pause(e: &Env, _caller: Address) {
        ownable::enforce_owner_auth(e);
        pausable::pause(e);
    }

    fn unpause(e: &Env, _caller: Address) {
        ownable::enforce_owner_auth(e);
        pausable::unpause(e);
    }
}

// ─── Wrapping Functions ──────────────────────────────────────────

#[contractimpl]
impl WrappedNative {
    /// Total token supply (not part of TokenInterface but commonly expected).
    pub fn total_supply(env: Env) -> i128 {
        Base::total_supply(&env)
    }

    pub fn initialize(env: Env, owner: Address, native_token: Address) {
        ownable::set_owner(&env, &owner);
        Base::set_metadata(
            &env,
            7,
            String::from_str(&env, "Wrapped Stellar Lumen"),
            String::from_str(&env, "WXLM"),
        );

        env.storage()
            .instance()
            .set(&DataKey::NativeToken, &native_token);
        env.storage()
            .instance()
            .set(&DataKey::TotalWrapped, &0i128);
        env.storage()
            .instance()
            .set(&DataKey::TotalUnwrapped, &0i128);
    }

    /// Lock native asset and mint the same amount of WXLM to `from`.
    #[when_not_paused]
    pub fn deposit(env: Env, from: Address, amount: i128) -> Result<(), WrapError> {
        from.require_auth();
        env.storage().instance().extend_ttl(TTL_THRESHOLD, TTL_EXTEND_TO);

        if amount <= 0 {
            return Err(WrapError::InvalidAmount);
        }

        let native: Address = env
            .storage()
            .instance()
            .get(&DataKey::NativeToken)
            .expect("Native token not set");
        let native_client = TokenClient::new(&env, &native);
        native_client.transfer(&from, &env.current_contract_address(), &amount);

        Base::update(&env, None, Some(&from), amount);

        let total: i128 = env
            .storage()
            .instance()
            .get(&DataKey::TotalWrapped)
            .unwrap_or(0);
        env.storage()
            .instance()
            .set(&DataKey::TotalWrapped, &(total + amount));

        env.events()
            .publish((Symbol::new(&env, "deposit"),), (from, amount));

        Ok(())
    }

    /// Burn WXLM held by `from` and release the same amount of native asset.
    #[when_not_paused]
    pub fn withdraw(env: Env, from: Address, amount: i128) -> Result<(), WrapError> {
        from.require_auth();
        env.storage().instance().extend_ttl(TTL_THRESHOLD, TTL_EXTEND_TO);

        if amount <= 0 {
            return Err(WrapError::InvalidAmount);
        }
        if Base::balance(&env, &from) < amount {
            return Err(WrapError::InsufficientBalance);
        }

        Base::update(&env, Some(&from), None, amount);

        let native: Address = env
            .storage()
            .instance()
            .get(&DataKey::NativeToken)
            .expect("Native token not set");
        let native_client = TokenClient::new(&env, &native);
        native_client.transfer(&env.current_contract_address(), &from, &amount);

        let total: i128 = env
            .storage()
            .instance()
            .get(&DataKey::TotalUnwrapped)
            .unwrap_or(0);
        env.storage()
            .instance()
            .set(&DataKey::TotalUnwrapped, &(total + amount));

        env.events()
            .publish((Symbol::new(&env, "withdraw"),), (from, amount));

        Ok(())
    }

    pub fn native_token(env: Env) -> Address {
        env.storage()
            .instance()
            .get(&DataKey::NativeToken)
            .expect("Native token not set")
    }

    pub fn total_wrapped(env: Env) -> i128 {
        env.storage()
            .instance()
            .get(&DataKey::TotalWrapped)
            .unwrap_or(0)
    }

    pub fn total_unwrapped(env: Env) -> i128 {
        env.storage()
            .instance()
            .get(&DataKey::TotalUnwrapped)
            .unwrap_or(0)
    }

    /// Native asset currently backing the outstanding WXLM supply.
    pub fn locked_native(env: Env) -> i128 {
        let wrapped: i128 = env
            .storage()
            .instance()
            .get(&DataKey::TotalWrapped)
            .unwrap_or(0);
        let unwrapped: i128 = env
            .storage()
            .instance()
            .get(&DataKey::TotalUnwrapped)
            .unwrap_or(0);
        wrapped - unwrapped
    }

    /// Owner upgrades the contract WASM. Requires owner auth.
    #[only_owner]
    pub fn upgrade(env: Env, wasm_hash: BytesN<32>) {
        env.storage()
            .instance()
            .extend_ttl(TTL_THRESHOLD, TTL_EXTEND_TO);
        env.deployer().update_current_contract_wasm(wasm_hash);
    }
}
