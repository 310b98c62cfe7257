use soroban_sdk::{contracttype, Env};

use crate::{BalancerError, DataKey};

/// Reference price stored by the balancer
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PriceData {
    /// Native/stable price in 7-decimal fixed-point (e.g., 4_000_000 = 0.40)
    pub price: i128,
    /// Ledger sequence when the price was observed
    pub ledger: u32,
}

// ─── Constants ──────────────────────────────────────────────────

/// Default price floor: 1,000 in 7-decimal = 0.0001 stable units
pub const DEFAULT_PRICE_FLOOR: i128 = 1_000;

/// Default price ceiling: 10,000 stable units (7 decimals)
pub const DEFAULT_PRICE_CEILING: i128 = 100_000_000_000;

/// Max price swing per update: 2,000 basis points = 20%
pub const MAX_SWING_BPS: i128 = 2_000;

// ─── Helpers ────────────────────────────────────────────────────

pub fn get_price_data(env: &Env) -> Option<PriceData> {
    env.storage().instance().get(&DataKey::NativePrice)
}

pub fn set_price_data(env: &Env, data: &PriceData) {
    env.storage().instance().set(&DataKey::NativePrice, data);
}

pub fn get_price_floor(env: &Env) -> i128 {
    env.storage()
        .instance()
        .get(&DataKey::PriceFloor)
        .unwrap_or(DEFAULT_PRICE_FLOOR)
}

pub fn get_price_ceiling(env: &Env) -> i128 {
    env.storage()
        .instance()
        .get(&DataKey::PriceCeiling)
        .unwrap_or(DEFAULT_PRICE_CEILING)
}

/// Check if price is within floor/ceiling bounds
pub fn check_bounds(env: &Env, price: i128) -> Result<(), BalancerError> {
    let floor = get_price_floor(env);
    let ceiling = get_price_ceiling(env);
    if price < floor || price > ceiling {
        return Err(BalancerError::PriceOutOfBounds);
    }
    Ok(())
}

/// Circuit breaker: rejects >20% swing from previous price.
/// Uses multiplication to avoid division: |new - old| * 10000 <= MAX_SWING_BPS * old
pub fn check_swing(old_price: i128, new_price: i128) -> Result<(), BalancerError> {
    let diff = if new_price > old_price {
        new_price - old_price
    } else {
        old_price - new_price
    };
    if diff * 10_000 > MAX_SWING_BPS * old_price {
        return Err(BalancerError::PriceSwingTooLarge);
    }
    Ok(())
}
