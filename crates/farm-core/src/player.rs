//! Player wallet and fertilizer inventory.

use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::catalog::FertilizerType;

/// Coins and fertilizer stock. The balance is unsigned, every debit checked.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Player {
    balance: u64,
    inventory: BTreeMap<String, u32>,
}

impl Player {
    pub fn new(balance: u64) -> Self {
        Self {
            balance,
            inventory: BTreeMap::new(),
        }
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    /// Fertilizer counts by key.
    pub fn inventory(&self) -> &BTreeMap<String, u32> {
        &self.inventory
    }

    pub fn fertilizer_count(&self, key: &str) -> u32 {
        self.inventory.get(key).copied().unwrap_or(0)
    }

    /// Buy one unit of fertilizer. Fails without mutation if unaffordable.
    pub fn buy_fertilizer(&mut self, fertilizer: &FertilizerType) -> bool {
        if !self.spend(fertilizer.price) {
            info!(
                fertilizer = %fertilizer.key,
                price = fertilizer.price,
                balance = self.balance,
                "not enough money"
            );
            return false;
        }
        self.stock_fertilizer(fertilizer, 1);
        info!(fertilizer = %fertilizer.key, balance = self.balance, "bought fertilizer");
        true
    }

    /// Add fertilizer without paying (used when restoring a save).
    pub fn stock_fertilizer(&mut self, fertilizer: &FertilizerType, count: u32) {
        let slot = self.inventory.entry(fertilizer.key.clone()).or_insert(0);
        *slot = slot.saturating_add(count);
    }

    /// Consume one unit of fertilizer, if any is left.
    pub fn use_fertilizer(&mut self, key: &str) -> bool {
        match self.inventory.get_mut(key) {
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        }
    }

    /// Debit the balance; refuses when it would go negative.
    pub fn spend(&mut self, amount: u64) -> bool {
        match self.balance.checked_sub(amount) {
            Some(rest) => {
                self.balance = rest;
                true
            }
            None => false,
        }
    }

    /// Credit the balance; refuses on overflow.
    pub fn credit(&mut self, amount: u64) -> bool {
        match self.balance.checked_add(amount) {
            Some(total) => {
                self.balance = total;
                true
            }
            None => {
                debug!(amount, "credit would overflow balance");
                false
            }
        }
    }

    /// Whether `amount` could be credited without overflow.
    pub fn can_credit(&self, amount: u64) -> bool {
        self.balance.checked_add(amount).is_some()
    }
}
