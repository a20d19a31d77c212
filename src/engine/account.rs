//! Per-session balances and the reserve/release/settle primitives the
//! matcher uses to keep the double-ledger conserved (spec §4.1, invariant 1).

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::engine::types::{EngineError, EngineResult};
use crate::money::{Asset, Balance};

/// One session's balances, one entry per asset it has ever touched.
#[derive(Debug, Clone, Default)]
pub struct Account {
    balances: HashMap<Asset, Balance>,
}

impl Account {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a balance for `asset`, used when a session is first created from
    /// the configured default balances. Adds to any existing free balance
    /// rather than overwriting it.
    pub fn grant(&mut self, asset: Asset, amount: Decimal) {
        let entry = self.balances.entry(asset).or_default();
        entry.free += amount;
    }

    pub fn balance(&self, asset: &str) -> Balance {
        self.balances.get(asset).copied().unwrap_or_default()
    }

    pub fn balances(&self) -> &HashMap<Asset, Balance> {
        &self.balances
    }

    pub fn free(&self, asset: &str) -> Decimal {
        self.balance(asset).free
    }

    /// Move `amount` of `asset` from free to locked. Fails with
    /// `InsufficientBalance` if free balance is too small.
    pub fn reserve(&mut self, asset: &Asset, amount: Decimal) -> EngineResult<()> {
        let entry = self.balances.entry(asset.clone()).or_default();
        if entry.free < amount {
            return Err(EngineError::InsufficientBalance(format!(
                "need {} {}, have {}",
                amount, asset, entry.free
            )));
        }
        entry.free -= amount;
        entry.locked += amount;
        Ok(())
    }

    /// Move `amount` of `asset` from locked back to free (e.g. on cancel, or
    /// a partial refund after price improvement). Never fails: it is a
    /// programming error to release more than is locked, so this clamps and
    /// the caller's invariant tests catch the bug instead of panicking in
    /// production.
    pub fn release(&mut self, asset: &Asset, amount: Decimal) {
        let entry = self.balances.entry(asset.clone()).or_default();
        let amount = amount.min(entry.locked);
        entry.locked -= amount;
        entry.free += amount;
    }

    /// Consume `amount` of `asset` from locked (the buyer/seller side of a
    /// settlement spending its own reservation).
    pub fn spend_locked(&mut self, asset: &Asset, amount: Decimal) {
        let entry = self.balances.entry(asset.clone()).or_default();
        entry.locked -= amount;
    }

    /// Credit `amount` of `asset` to free (the other side of a settlement).
    pub fn credit(&mut self, asset: &Asset, amount: Decimal) {
        let entry = self.balances.entry(asset.clone()).or_default();
        entry.free += amount;
    }
}
