//! Pure balance arithmetic
//!
//! No I/O here: these functions decide whether a mutation is allowed and what
//! the resulting balance is. The service layer wraps them in the
//! read-decide-write cycle.

use rust_decimal::Decimal;

use crate::domain::result::{Result, WalletError};

/// Fractional digits a stored amount may carry (cents)
pub const MONEY_SCALE: u32 = 2;

/// Largest balance the store can hold: DECIMAL(20, 2)
pub fn max_balance() -> Decimal {
    Decimal::from_i128_with_scale(10_i128.pow(20) - 1, MONEY_SCALE)
}

/// `value` at exactly [`MONEY_SCALE`] fractional digits, so `5`, `5.0` and
/// `5.000` all read back as `5.00` whichever store holds them.
/// Only call on values that passed [`validate_amount`] or derive from them.
pub fn to_money(value: Decimal) -> Decimal {
    let mut money = value;
    money.rescale(MONEY_SCALE);
    money
}

/// Reject zero, negative, sub-cent and out-of-range amounts
pub fn validate_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO
        || amount.normalize().scale() > MONEY_SCALE
        || amount > max_balance()
    {
        return Err(WalletError::InvalidAmount(amount));
    }
    Ok(())
}

/// Balance after crediting `amount`
pub fn credit(balance: Decimal, amount: Decimal) -> Result<Decimal> {
    validate_amount(amount)?;
    match balance.checked_add(amount) {
        Some(total) if total <= max_balance() => Ok(to_money(total)),
        _ => Err(WalletError::InvalidAmount(amount)),
    }
}

/// Balance after debiting `amount`; never goes below zero
pub fn debit(balance: Decimal, amount: Decimal) -> Result<Decimal> {
    validate_amount(amount)?;
    if amount > balance {
        return Err(WalletError::InsufficientFunds {
            available: to_money(balance),
            requested: to_money(amount),
        });
    }
    Ok(to_money(balance - amount))
}
