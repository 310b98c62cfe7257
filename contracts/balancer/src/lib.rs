#![no_std]

use soroban_sdk::{
    auth::{ContractContext, InvokerContractAuthEntry, SubContractInvocation},
    contract, contracterror, contractimpl, contracttype, token::TokenClient, Address, BytesN, Env,
    IntoVal, Map, Symbol, TryIntoVal, U256, Val, Vec,
};

mod price;

pub use price::PriceData;

// ─── Storage Keys ────────────────────────────────────────────────

#[contracttype]
pub enum DataKey {
    NativeToken,
    WrappedToken,
    StableToken,
    Pool,
    Keeper,
    Owner,
    WrappedIsToken0,
    Initialized,
    TargetBps,
    BandBps,
    SlippageBps,
    MaxSwapIn,
    MaxStaleLedgers,
    CooldownLedgers,
    LastRebalanceLedger,
    MinPoolReserve,
    NativePrice,
    PriceFloor,
    PriceCeiling,
}

// ─── Errors ──────────────────────────────────────────────────────

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum BalancerError {
    NothingToWrap = 1,
    PriceNotSet = 2,
    PriceStale = 3,
    PriceOutOfBounds = 4,
    PriceSwingTooLarge = 5,
    PoolTooThin = 6,
    PortfolioEmpty = 7,
    CooldownActive = 8,
    NoRebalanceNeeded = 9,
}

// ─── Defaults ────────────────────────────────────────────────────

const DEFAULT_TARGET_BPS: u32 = 5_000; // 50/50 native/stable split
const DEFAULT_BAND_BPS: u32 = 500; // rebalance outside ±5%
const DEFAULT_SLIPPAGE_BPS: u32 = 2_000; // warn below 80% of implied output
const DEFAULT_MAX_SWAP_IN: i128 = 100_000_000_000; // 10,000 tokens (7 decimals)
const DEFAULT_MAX_STALE_LEDGERS: u32 = 1_000; // ~83 min at 5s/ledger
const DEFAULT_COOLDOWN_LEDGERS: u32 = 12; // ~1 min
const DEFAULT_MIN_POOL_RESERVE: i128 = 10_000_000; // 1 token (7 decimals)

/// 7-decimal fixed-point scale shared by prices and token amounts.
const PRICE_SCALE: i128 = 10_000_000;

// TTL constants: extend instance storage proactively to prevent archival
const TTL_THRESHOLD: u32 = 17_280; // ~1 day at 5s/ledger
const TTL_EXTEND_TO: u32 = 518_400; // ~30 days

// ─── Status return types ────────────────────────────────────────

#[contracttype]
#[derive(Clone, Debug)]
pub struct PortfolioStatus {
    pub native_balance: i128,
    pub wrapped_balance: i128,
    pub stable_balance: i128,
    pub price_x7: i128,
    pub price_ledger: u32,
    pub wrapped_value_x7: i128,
    pub wrapped_share_bps: i128,
    pub deviation_bps: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct Config {
    pub native_token: Address,
    pub wrapped_token: Address,
    pub stable_token: Address,
    pub pool: Address,
    pub keeper: Address,
    pub owner: Address,
    pub wrapped_is_token0: bool,
    pub target_bps: u32,
    pub band_bps: u32,
    pub slippage_bps: u32,
    pub max_swap_in: i128,
    pub max_stale_ledgers: u32,
    pub cooldown_ledgers: u32,
    pub min_pool_reserve: i128,
    pub price_floor: i128,
    pub price_ceiling: i128,
}

// ─── Contract ────────────────────────────────────────────────────

#[contract]
pub struct PortfolioBalancer;

// ─── Helpers ─────────────────────────────────────────────────────

fn require_initialized(env: &Env) {
    let init: bool = env
        .storage()
        .instance()
        .get(&DataKey::Initialized)
        .unwrap_or(false);
    assert!(init, "Contract not initialized");
}

fn require_keeper(env: &Env) {
    let keeper: Address = env
        .storage()
        .instance()
        .get(&DataKey::Keeper)
        .expect("Keeper not set");
    keeper.require_auth();
}

fn require_owner(env: &Env) {
    let owner: Address = env
        .storage()
        .instance()
        .get(&DataKey::Owner)
        .expect("Owner not set");
    owner.require_auth();
}

/// Get reserves from the pool by querying token balances directly.
/// Returns (reserve_wrapped, reserve_stable).
fn get_pool_reserves(env: &Env) -> (i128, i128) {
    let pool: Address = env
        .storage()
        .instance()
        .get(&DataKey::Pool)
        .expect("Pool not set");
    let wrapped_token: Address = env
        .storage()
        .instance()
        .get(&DataKey::WrappedToken)
        .expect("Wrapped token not set");
    let stable_token: Address = env
        .storage()
        .instance()
        .get(&DataKey::StableToken)
        .expect("Stable token not set");

    let wrapped_client = TokenClient::new(env, &wrapped_token);
    let stable_client = TokenClient::new(env, &stable_token);

    let reserve_wrapped = wrapped_client.balance(&pool);
    let reserve_stable = stable_client.balance(&pool);

    (reserve_wrapped, reserve_stable)
}

/// Swap tokens directly through the V3 pool.
/// Returns the amount of output tokens received.
///
/// Direct pool.swap lets us build the exact auth tree for authorize_as_current_contract,
/// which is required because pool.swap calls sender.require_auth().
fn pool_swap(env: &Env, token_in: &Address, amount_in: i128) -> i128 {
    let pool: Address = env
        .storage()
        .instance()
        .get(&DataKey::Pool)
        .expect("Pool not set");
    let wrapped_token: Address = env
        .storage()
        .instance()
        .get(&DataKey::WrappedToken)
        .expect("Wrapped token not set");
    let self_addr = env.current_contract_address();

    // Determine swap direction: zero_for_one means selling token0 for token1
    let selling_wrapped = token_in == &wrapped_token;
    let wrapped_is_token0: bool = env
        .storage()
        .instance()
        .get(&DataKey::WrappedIsToken0)
        .unwrap_or(true);
    let zero_for_one = if wrapped_is_token0 {
        selling_wrapped
    } else {
        !selling_wrapped
    };

    // sqrt_price_limit_x96 as U256 (pool uses Q64.96 format)
    // MIN_SQRT_RATIO + 1 for zero_for_one, larger than any realistic price otherwise
    let sqrt_price_limit: U256 = if zero_for_one {
        U256::from_u128(env, 4295128740)
    } else {
        U256::from_u128(env, u128::MAX)
    };

    // Get oracle hints from pool
    let hints: Val = env.invoke_contract(
        &pool,
        &Symbol::new(env, "get_oracle_hints"),
        Vec::new(env),
    );

    // Build the exact args for pool.swap
    let mut swap_args: Vec<Val> = Vec::new(env);
    swap_args.push_back(self_addr.clone().into_val(env)); // sender
    swap_args.push_back(self_addr.clone().into_val(env)); // recipient
    swap_args.push_back(zero_for_one.into_val(env)); // zero_for_one
    swap_args.push_back(amount_in.into_val(env)); // amount_specified (i128)
    swap_args.push_back(sqrt_price_limit.into_val(env)); // sqrt_price_limit_x96 (U256)
    swap_args.push_back(hints); // hints

    // Pre-authorize the token transfer that pool.swap will execute on our behalf.
    // Since we're the direct caller of pool.swap, sender.require_auth() passes
    // automatically. We only need to authorize the nested token.transfer call
    // (pool transfers token_in from us to itself).
    env.authorize_as_current_contract(soroban_sdk::vec![
        env,
        InvokerContractAuthEntry::Contract(SubContractInvocation {
            context: ContractContext {
                contract: token_in.clone(),
                fn_name: Symbol::new(env, "transfer"),
                args: soroban_sdk::vec![
                    env,
                    self_addr.clone().into_val(env),
                    pool.clone().into_val(env),
                    amount_in.into_val(env),
                ],
            },
            sub_invocations: soroban_sdk::vec![env],
        })
    ]);

    let result: Val = env.invoke_contract(&pool, &Symbol::new(env, "swap"), swap_args);

    // pool.swap returns SwapResult { amount0, amount1, liquidity, sqrt_price_x96, tick }
    // serialized as Map<Symbol, Val>
    let result_map: Map<Symbol, Val> = result.try_into_val(env).expect("Invalid swap result");
    let amount0: i128 = result_map
        .get(Symbol::new(env, "amount0"))
        .expect("Missing amount0")
        .try_into_val(env)
        .expect("Invalid amount0");
    let amount1: i128 = result_map
        .get(Symbol::new(env, "amount1"))
        .expect("Missing amount1")
        .try_into_val(env)
        .expect("Invalid amount1");

    // Positive = tokens flowing INTO pool (what we pay)
    // Negative = tokens flowing OUT of pool (what we receive)
    if zero_for_one {
        (-amount1).max(0)
    } else {
        (-amount0).max(0)
    }
}

// ─── Implementation ──────────────────────────────────────────────

#[contractimpl]
impl PortfolioBalancer {
    /// Initialize the balancer with all config.
    /// `native_token` is the native asset's SAC address, `stable_token` the
    /// stablecoin the portfolio rebalances into.
    pub fn initialize(
        env: Env,
        native_token: Address,
        wrapped_token: Address,
        stable_token: Address,
        pool: Address,
        keeper: Address,
        owner: Address,
        wrapped_is_token0: bool,
    ) {
        let already: bool = env
            .storage()
            .instance()
            .get(&DataKey::Initialized)
            .unwrap_or(false);
        assert!(!already, "Already initialized");

        env.storage()
            .instance()
            .set(&DataKey::NativeToken, &native_token);
        env.storage()
            .instance()
            .set(&DataKey::WrappedToken, &wrapped_token);
        env.storage()
            .instance()
            .set(&DataKey::StableToken, &stable_token);
        env.storage().instance().set(&DataKey::Pool, &pool);
        env.storage().instance().set(&DataKey::Keeper, &keeper);
        env.storage().instance().set(&DataKey::Owner, &owner);
        env.storage()
            .instance()
            .set(&DataKey::WrappedIsToken0, &wrapped_is_token0);

        // Defaults
        env.storage()
            .instance()
            .set(&DataKey::TargetBps, &DEFAULT_TARGET_BPS);
        env.storage()
            .instance()
            .set(&DataKey::BandBps, &DEFAULT_BAND_BPS);
        env.storage()
            .instance()
            .set(&DataKey::SlippageBps, &DEFAULT_SLIPPAGE_BPS);
        env.storage()
            .instance()
            .set(&DataKey::MaxSwapIn, &DEFAULT_MAX_SWAP_IN);
        env.storage()
            .instance()
            .set(&DataKey::MaxStaleLedgers, &DEFAULT_MAX_STALE_LEDGERS);
        env.storage()
            .instance()
            .set(&DataKey::CooldownLedgers, &DEFAULT_COOLDOWN_LEDGERS);
        env.storage()
            .instance()
            .set(&DataKey::MinPoolReserve, &DEFAULT_MIN_POOL_RESERVE);
        env.storage().instance().set(&DataKey::Initialized, &true);

        env.events().publish(
            (Symbol::new(&env, "initialized"),),
            (wrapped_token, stable_token, pool),
        );
    }

    /// Fund the contract with native asset for wrapping and rebalancing.
    pub fn fund_native(env: Env, from: Address, amount: i128) {
        require_initialized(&env);
        from.require_auth();
        assert!(amount > 0, "Amount must be positive");

        let native: Address = env
            .storage()
            .instance()
            .get(&DataKey::NativeToken)
            .expect("Native token not set");
        let native_client = TokenClient::new(&env, &native);
        native_client.transfer(&from, &env.current_contract_address(), &amount);

        env.events()
            .publish((Symbol::new(&env, "funded"),), (from, amount));
    }

    /// Wrap the contract's entire native balance into the wrapped token.
    pub fn wrap_native(env: Env) -> Result<(), BalancerError> {
        require_initialized(&env);
        env.storage().instance().extend_ttl(TTL_THRESHOLD, TTL_EXTEND_TO);

        let native: Address = env
            .storage()
            .instance()
            .get(&DataKey::NativeToken)
            .expect("Native token not set");
        let wrapped: Address = env
            .storage()
            .instance()
            .get(&DataKey::WrappedToken)
            .expect("Wrapped token not set");
        let self_addr = env.current_contract_address();

        let native_client = TokenClient::new(&env, &native);
        let amount = native_client.balance(&self_addr);
        if amount <= 0 {
            return Err(BalancerError::NothingToWrap);
        }

        // deposit pulls the native asset from us via a nested token.transfer —
        // pre-authorize that exact call (we're the direct caller of deposit, so
        // its own from.require_auth() passes automatically).
        env.authorize_as_current_contract(soroban_sdk::vec![
            &env,
            InvokerContractAuthEntry::Contract(SubContractInvocation {
                context: ContractContext {
                    contract: native.clone(),
                    fn_name: Symbol::new(&env, "transfer"),
                    args: soroban_sdk::vec![
                        &env,
                        self_addr.clone().into_val(&env),
                        wrapped.clone().into_val(&env),
                        amount.into_val(&env),
                    ],
                },
                sub_invocations: soroban_sdk::vec![&env],
            })
        ]);

        let mut args: Vec<Val> = Vec::new(&env);
        args.push_back(self_addr.into_val(&env));
        args.push_back(amount.into_val(&env));
        env.invoke_contract::<Val>(&wrapped, &Symbol::new(&env, "deposit"), args);

        env.events()
            .publish((Symbol::new(&env, "wrapped"),), amount);

        Ok(())
    }

    /// Refresh the stored native/stable reference price from pool reserves.
    /// Permissionless: the price is derived from on-chain state and validated
    /// against bounds and the swing circuit breaker.
    pub fn update_price_from_pool(env: Env) -> Result<(), BalancerError> {
        require_initialized(&env);
        env.storage().instance().extend_ttl(TTL_THRESHOLD, TTL_EXTEND_TO);

        let (reserve_wrapped, reserve_stable) = get_pool_reserves(&env);

        let min_reserve: i128 = env
            .storage()
            .instance()
            .get(&DataKey::MinPoolReserve)
            .unwrap_or(DEFAULT_MIN_POOL_RESERVE);
        if reserve_wrapped < min_reserve || reserve_stable < min_reserve {
            return Err(BalancerError::PoolTooThin);
        }

        let spot = reserve_stable * PRICE_SCALE / reserve_wrapped;
        price::check_bounds(&env, spot)?;
        if let Some(existing) = price::get_price_data(&env) {
            price::check_swing(existing.price, spot)?;
        }

        let data = price::PriceData {
            price: spot,
            ledger: env.ledger().sequence(),
        };
        price::set_price_data(&env, &data);

        env.events().publish(
            (Symbol::new(&env, "price_updated"),),
            (spot, env.ledger().sequence()),
        );

        Ok(())
    }

    /// Main rebalance logic. Compares the wrapped share of the portfolio to
    /// the target band and swaps through the pool to restore the target.
    pub fn rebalance(env: Env) -> Result<(), BalancerError> {
        require_initialized(&env);
        require_keeper(&env);
        env.storage().instance().extend_ttl(TTL_THRESHOLD, TTL_EXTEND_TO);

        // Cooldown check
        let cooldown_ledgers: u32 = env
            .storage()
            .instance()
            .get(&DataKey::CooldownLedgers)
            .unwrap_or(DEFAULT_COOLDOWN_LEDGERS);
        let last_rebalance: u32 = env
            .storage()
            .instance()
            .get(&DataKey::LastRebalanceLedger)
            .unwrap_or(0);
        let current_ledger = env.ledger().sequence();
        if last_rebalance > 0 && current_ledger - last_rebalance < cooldown_ledgers {
            return Err(BalancerError::CooldownActive);
        }

        // Reference price must exist and be fresh
        let data = price::get_price_data(&env).ok_or(BalancerError::PriceNotSet)?;
        let max_stale: u32 = env
            .storage()
            .instance()
            .get(&DataKey::MaxStaleLedgers)
            .unwrap_or(DEFAULT_MAX_STALE_LEDGERS);
        if current_ledger - data.ledger > max_stale {
            return Err(BalancerError::PriceStale);
        }

        // Pool must be liquid enough to absorb the swap
        let (reserve_wrapped, reserve_stable) = get_pool_reserves(&env);
        let min_reserve: i128 = env
            .storage()
            .instance()
            .get(&DataKey::MinPoolReserve)
            .unwrap_or(DEFAULT_MIN_POOL_RESERVE);
        if reserve_wrapped < min_reserve || reserve_stable < min_reserve {
            return Err(BalancerError::PoolTooThin);
        }

        let wrapped: Address = env
            .storage()
            .instance()
            .get(&DataKey::WrappedToken)
            .expect("Wrapped token not set");
        let stable: Address = env
            .storage()
            .instance()
            .get(&DataKey::StableToken)
            .expect("Stable token not set");
        let self_addr = env.current_contract_address();
        let wrapped_bal = TokenClient::new(&env, &wrapped).balance(&self_addr);
        let stable_bal = TokenClient::new(&env, &stable).balance(&self_addr);

        let wrapped_value = wrapped_bal * data.price / PRICE_SCALE;
        let total_value = wrapped_value + stable_bal;
        if total_value <= 0 {
            return Err(BalancerError::PortfolioEmpty);
        }

        let target_bps: u32 = env
            .storage()
            .instance()
            .get(&DataKey::TargetBps)
            .unwrap_or(DEFAULT_TARGET_BPS);
        let band_bps: u32 = env
            .storage()
            .instance()
            .get(&DataKey::BandBps)
            .unwrap_or(DEFAULT_BAND_BPS);

        let lhs = wrapped_value * 10_000;
        let upper = total_value * (target_bps + band_bps) as i128;
        let lower = total_value * (target_bps - band_bps) as i128;

        if lhs > upper {
            Self::do_sell_wrapped(&env, wrapped_bal, stable_bal, data.price, target_bps)?;
        } else if lhs < lower {
            Self::do_buy_wrapped(&env, wrapped_bal, stable_bal, data.price, target_bps)?;
        } else {
            return Err(BalancerError::NoRebalanceNeeded);
        }

        env.storage()
            .instance()
            .set(&DataKey::LastRebalanceLedger, &current_ledger);

        Ok(())
    }

    /// Stablecoin held by the balancer.
    pub fn get_stable_balance(env: Env) -> i128 {
        require_initialized(&env);
        let stable: Address = env
            .storage()
            .instance()
            .get(&DataKey::StableToken)
            .expect("Stable token not set");
        TokenClient::new(&env, &stable).balance(&env.current_contract_address())
    }

    /// Unwrapped native asset held by the balancer.
    pub fn get_native_balance(env: Env) -> i128 {
        require_initialized(&env);
        let native: Address = env
            .storage()
            .instance()
            .get(&DataKey::NativeToken)
            .expect("Native token not set");
        TokenClient::new(&env, &native).balance(&env.current_contract_address())
    }

    /// Wrapped native asset held by the balancer.
    pub fn get_wrapped_balance(env: Env) -> i128 {
        require_initialized(&env);
        let wrapped: Address = env
            .storage()
            .instance()
            .get(&DataKey::WrappedToken)
            .expect("Wrapped token not set");
        TokenClient::new(&env, &wrapped).balance(&env.current_contract_address())
    }

    /// Last stored reference price.
    pub fn get_price(env: Env) -> Result<PriceData, BalancerError> {
        require_initialized(&env);
        price::get_price_data(&env).ok_or(BalancerError::PriceNotSet)
    }

    /// Portfolio snapshot at the stored reference price.
    pub fn get_status(env: Env) -> Result<PortfolioStatus, BalancerError> {
        require_initialized(&env);

        let data = price::get_price_data(&env).ok_or(BalancerError::PriceNotSet)?;

        let native_balance = Self::get_native_balance(env.clone());
        let wrapped_balance = Self::get_wrapped_balance(env.clone());
        let stable_balance = Self::get_stable_balance(env.clone());

        let wrapped_value = wrapped_balance * data.price / PRICE_SCALE;
        let total_value = wrapped_value + stable_balance;
        if total_value <= 0 {
            return Err(BalancerError::PortfolioEmpty);
        }

        let target_bps: u32 = env
            .storage()
            .instance()
            .get(&DataKey::TargetBps)
            .unwrap_or(DEFAULT_TARGET_BPS);
        let share = wrapped_value * 10_000 / total_value;

        Ok(PortfolioStatus {
            native_balance,
            wrapped_balance,
            stable_balance,
            price_x7: data.price,
            price_ledger: data.ledger,
            wrapped_value_x7: wrapped_value,
            wrapped_share_bps: share,
            deviation_bps: share - target_bps as i128,
        })
    }

    /// Returns all configuration values.
    pub fn get_config(env: Env) -> Config {
        require_initialized(&env);
        Config {
            native_token: env
                .storage()
                .instance()
                .get(&DataKey::NativeToken)
                .expect("not set"),
            wrapped_token: env
                .storage()
                .instance()
                .get(&DataKey::WrappedToken)
                .expect("not set"),
            stable_token: env
                .storage()
                .instance()
                .get(&DataKey::StableToken)
                .expect("not set"),
            pool: env
                .storage()
                .instance()
                .get(&DataKey::Pool)
                .expect("not set"),
            keeper: env
                .storage()
                .instance()
                .get(&DataKey::Keeper)
                .expect("not set"),
            owner: env
                .storage()
                .instance()
                .get(&DataKey::Owner)
                .expect("not set"),
            wrapped_is_token0: env
                .storage()
                .instance()
                .get(&DataKey::WrappedIsToken0)
                .unwrap_or(true),
            target_bps: env
                .storage()
                .instance()
                .get(&DataKey::TargetBps)
                .unwrap_or(DEFAULT_TARGET_BPS),
            band_bps: env
                .storage()
                .instance()
                .get(&DataKey::BandBps)
                .unwrap_or(DEFAULT_BAND_BPS),
            slippage_bps: env
                .storage()
                .instance()
                .get(&DataKey::SlippageBps)
                .unwrap_or(DEFAULT_SLIPPAGE_BPS),
            max_swap_in: env
                .storage()
                .instance()
                .get(&DataKey::MaxSwapIn)
                .unwrap_or(DEFAULT_MAX_SWAP_IN),
            max_stale_ledgers: env
                .storage()
                .instance()
                .get(&DataKey::MaxStaleLedgers)
                .unwrap_or(DEFAULT_MAX_STALE_LEDGERS),
            cooldown_ledgers: env
                .storage()
                .instance()
                .get(&DataKey::CooldownLedgers)
                .unwrap_or(DEFAULT_COOLDOWN_LEDGERS),
            min_pool_reserve: env
                .storage()
                .instance()
                .get(&DataKey::MinPoolReserve)
                .unwrap_or(DEFAULT_MIN_POOL_RESERVE),
            price_floor: price::get_price_floor(&env),
            price_ceiling: price::get_price_ceiling(&env),
        }
    }

    // ─── Owner administration ────────────────────────────────────

    /// Owner updates rebalancing parameters.
    pub fn set_params(
        env: Env,
        target_bps: u32,
        band_bps: u32,
        slippage_bps: u32,
        max_swap_in: i128,
        cooldown_ledgers: u32,
        min_pool_reserve: i128,
    ) {
        require_initialized(&env);
        require_owner(&env);
        assert!(target_bps > 0 && target_bps < 10_000, "Invalid target_bps");
        assert!(band_bps > 0 && band_bps < target_bps, "Invalid band_bps");
        assert!(target_bps + band_bps < 10_000, "Band exceeds full allocation");
        assert!(slippage_bps < 10_000, "Invalid slippage_bps");
        assert!(max_swap_in > 0, "max_swap_in must be positive");
        assert!(min_pool_reserve > 0, "min_pool_reserve must be positive");

        env.storage().instance().set(&DataKey::TargetBps, &target_bps);
        env.storage().instance().set(&DataKey::BandBps, &band_bps);
        env.storage()
            .instance()
            .set(&DataKey::SlippageBps, &slippage_bps);
        env.storage()
            .instance()
            .set(&DataKey::MaxSwapIn, &max_swap_in);
        env.storage()
            .instance()
            .set(&DataKey::CooldownLedgers, &cooldown_ledgers);
        env.storage()
            .instance()
            .set(&DataKey::MinPoolReserve, &min_pool_reserve);

        env.events().publish(
            (Symbol::new(&env, "params_updated"),),
            (target_bps, band_bps, slippage_bps, max_swap_in),
        );
    }

    /// Owner updates max stale ledgers for price freshness.
    pub fn set_max_stale(env: Env, max_stale_ledgers: u32) {
        require_initialized(&env);
        require_owner(&env);
        assert!(max_stale_ledgers > 0, "Must be positive");
        env.storage()
            .instance()
            .set(&DataKey::MaxStaleLedgers, &max_stale_ledgers);
        env.events()
            .publish((Symbol::new(&env, "max_stale_changed"),), max_stale_ledgers);
    }

    /// Owner updates the pool and token ordering.
    pub fn set_pool(env: Env, pool: Address, wrapped_is_token0: bool) {
        require_initialized(&env);
        require_owner(&env);
        env.storage().instance().set(&DataKey::Pool, &pool);
        env.storage()
            .instance()
            .set(&DataKey::WrappedIsToken0, &wrapped_is_token0);
        env.events()
            .publish((Symbol::new(&env, "pool_changed"),), pool);
    }

    /// Owner changes the keeper address.
    pub fn set_keeper(env: Env, keeper: Address) {
        require_initialized(&env);
        require_owner(&env);
        env.storage().instance().set(&DataKey::Keeper, &keeper);
        env.events()
            .publish((Symbol::new(&env, "keeper_changed"),), keeper);
    }

    /// Owner sets reference-price floor and ceiling.
    pub fn set_price_bounds(env: Env, floor: i128, ceiling: i128) {
        require_initialized(&env);
        require_owner(&env);
        assert!(floor > 0, "Floor must be positive");
        assert!(ceiling > floor, "Ceiling must exceed floor");
        env.storage().instance().set(&DataKey::PriceFloor, &floor);
        env.storage()
            .instance()
            .set(&DataKey::PriceCeiling, &ceiling);
        env.events()
            .publish((Symbol::new(&env, "price_bounds_set"),), (floor, ceiling));
    }

    /// Owner withdraws any token from the contract.
    pub fn withdraw(env: Env, token: Address, to: Address, amount: i128) {
        require_initialized(&env);
        require_owner(&env);
        assert!(amount > 0, "Amount must be positive");

        let client = TokenClient::new(&env, &token);
        client.transfer(&env.current_contract_address(), &to, &amount);

        env.events()
            .publish((Symbol::new(&env, "withdraw"),), (token, to, amount));
    }

    /// Owner upgrades the contract WASM. Requires owner auth.
    pub fn upgrade(env: Env, wasm_hash: BytesN<32>) {
        require_initialized(&env);
        require_owner(&env);
        env.storage()
            .instance()
            .extend_ttl(TTL_THRESHOLD, TTL_EXTEND_TO);
        env.deployer().update_current_contract_wasm(wasm_hash);
    }

    // ─── Internal rebalance methods ──────────────────────────────

    /// Portfolio is overweight wrapped-native: sell the excess into the pool
    /// for stablecoin.
    fn do_sell_wrapped(
        env: &Env,
        wrapped_bal: i128,
        stable_bal: i128,
        price: i128,
        target_bps: u32,
    ) -> Result<(), BalancerError> {
        let max_swap_in: i128 = env
            .storage()
            .instance()
            .get(&DataKey::MaxSwapIn)
            .unwrap_or(DEFAULT_MAX_SWAP_IN);

        let wrapped_value = wrapped_bal * price / PRICE_SCALE;
        let total_value = wrapped_value + stable_bal;
        let target_value = total_value * target_bps as i128 / 10_000;
        let excess_value = wrapped_value - target_value;
        let mut amount_in = excess_value * PRICE_SCALE / price;

        if amount_in <= 0 {
            return Err(BalancerError::NoRebalanceNeeded);
        }
        if amount_in > max_swap_in {
            amount_in = max_swap_in;
        }
        if amount_in > wrapped_bal {
            amount_in = wrapped_bal;
        }

        let wrapped_addr: Address = env
            .storage()
            .instance()
            .get(&DataKey::WrappedToken)
            .expect("Wrapped token not set");

        let received = pool_swap(env, &wrapped_addr, amount_in);

        // Slippage check against the reference-price-implied output. The swap
        // has already executed; a shortfall is surfaced for diagnostics.
        let expected = amount_in * price / PRICE_SCALE;
        let slippage_bps: u32 = env
            .storage()
            .instance()
            .get(&DataKey::SlippageBps)
            .unwrap_or(DEFAULT_SLIPPAGE_BPS);
        let min_out = expected * (10_000 - slippage_bps as i128) / 10_000;
        if received < min_out {
            env.events().publish(
                (Symbol::new(env, "slippage_warning"),),
                (received, expected, min_out),
            );
        }

        env.events().publish(
            (Symbol::new(env, "rebalance_sell"),),
            (amount_in, received, wrapped_bal, stable_bal),
        );

        Ok(())
    }

    /// Portfolio is underweight wrapped-native: spend stablecoin to buy it
    /// back from the pool.
    fn do_buy_wrapped(
        env: &Env,
        wrapped_bal: i128,
        stable_bal: i128,
        price: i128,
        target_bps: u32,
    ) -> Result<(), BalancerError> {
        let max_swap_in: i128 = env
            .storage()
            .instance()
            .get(&DataKey::MaxSwapIn)
            .unwrap_or(DEFAULT_MAX_SWAP_IN);

        let wrapped_value = wrapped_bal * price / PRICE_SCALE;
        let total_value = wrapped_value + stable_bal;
        let target_value = total_value * target_bps as i128 / 10_000;
        let mut spend = target_value - wrapped_value;

        if spend <= 0 {
            return Err(BalancerError::NoRebalanceNeeded);
        }
        if spend > max_swap_in {
            spend = max_swap_in;
        }
        if spend > stable_bal {
            spend = stable_bal;
        }

        let stable_addr: Address = env
            .storage()
            .instance()
            .get(&DataKey::StableToken)
            .expect("Stable token not set");

        let received = pool_swap(env, &stable_addr, spend);

        let expected = spend * PRICE_SCALE / price;
        let slippage_bps: u32 = env
            .storage()
            .instance()
            .get(&DataKey::SlippageBps)
            .unwrap_or(DEFAULT_SLIPPAGE_BPS);
        let min_out = expected * (10_000 - slippage_bps as i128) / 10_000;
        if received < min_out {
            env.events().publish(
                (Symbol::new(env, "slippage_warning"),),
                (received, expected, min_out),
            );
        }

        env.events().publish(
            (Symbol::new(env, "rebalance_buy"),),
            (spend, received, wrapped_bal, stable_bal),
        );

        Ok(())
    }
}
