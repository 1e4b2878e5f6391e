#![deny(warnings)]

//! Market transactions for Farmstead.
//!
//! The shop holds no state of its own: a sale consumes stock from the
//! [`Barn`] and credits the [`Player`], or does nothing at all.

use farm_core::{Barn, Player};
use thiserror::Error;
use tracing::info;

/// Errors produced by pricing helpers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EconError {
    /// `amount * unit_price` does not fit in a coin count.
    #[error("sale value overflows: {amount} x {unit_price}")]
    Overflow { amount: u32, unit_price: u64 },
}

/// Stateless market.
#[derive(Clone, Copy, Debug, Default)]
pub struct Shop;

impl Shop {
    /// Coins earned for selling `amount` units at `unit_price` each.
    ///
    /// Example:
    /// assert_eq!(Shop::quote(3, 12).unwrap(), 36);
    pub fn quote(amount: u32, unit_price: u64) -> Result<u64, EconError> {
        unit_price
            .checked_mul(u64::from(amount))
            .ok_or(EconError::Overflow { amount, unit_price })
    }

    /// Sell from the barn and credit the player, returning the coins earned.
    ///
    /// Returns `None` with no state change when stock is insufficient or
    /// the proceeds would overflow the balance.
    pub fn sell(
        plant_name: &str,
        amount: u32,
        unit_price: u64,
        player: &mut Player,
        barn: &mut Barn,
    ) -> Option<u64> {
        let earned = match Self::quote(amount, unit_price) {
            Ok(v) if player.can_credit(v) => v,
            _ => {
                info!(plant = plant_name, amount, unit_price, "sale refused: value out of range");
                return None;
            }
        };
        if !barn.remove(plant_name, amount) {
            info!(plant = plant_name, amount, "not enough product in barn");
            return None;
        }
        // can_credit checked above, nothing else touched the balance since
        player.credit(earned);
        info!(
            plant = plant_name,
            amount,
            earned,
            balance = player.balance(),
            "sold"
        );
        Some(earned)
    }
}
