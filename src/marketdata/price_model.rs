//! Pluggable mid-price generation (spec §4.3). The publisher only ever
//! calls `next_price`; everything else is internal to the model.

use rand_distr::{Distribution, StandardNormal};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Converts seconds into fractional years, the `dt` unit GBM is usually
/// quoted in. A Julian year is close enough for a simulator.
const SECONDS_PER_YEAR: f64 = 3.156e7;

pub trait PriceModel: Send {
    /// Advance the model by `dt_ms` milliseconds and return the new mid
    /// price given the current one.
    fn next_price(&mut self, current: Decimal, dt_ms: u64) -> Decimal;
}

/// Geometric Brownian Motion: `S_{t+dt} = S_t * exp((mu - sigma^2/2)*dt + sigma*sqrt(dt)*Z)`.
/// The default and only model this implementation ships, per spec §4.3.
pub struct GbmModel {
    drift: f64,
    volatility: f64,
    rng: rand::rngs::StdRng,
}

impl GbmModel {
    pub fn new(drift: f64, volatility: f64) -> Self {
        use rand::SeedableRng;
        Self {
            drift,
            volatility,
            rng: rand::rngs::StdRng::from_entropy(),
        }
    }

    #[cfg(test)]
    fn with_seed(drift: f64, volatility: f64, seed: u64) -> Self {
        use rand::SeedableRng;
        Self {
            drift,
            volatility,
            rng: rand::rngs::StdRng::seed_from_u64(seed),
        }
    }
}

impl PriceModel for GbmModel {
    fn next_price(&mut self, current: Decimal, dt_ms: u64) -> Decimal {
        let current_f = current.to_f64().unwrap_or(0.0);
        if current_f <= 0.0 {
            return current;
        }
        let dt = (dt_ms as f64 / 1000.0) / SECONDS_PER_YEAR;
        let z: f64 = StandardNormal.sample(&mut self.rng);
        let exponent =
            (self.drift - self.volatility * self.volatility / 2.0) * dt + self.volatility * dt.sqrt() * z;
        let next = current_f * exponent.exp();
        Decimal::from_f64_retain(next).unwrap_or(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gbm_stays_positive_over_many_steps() {
        let mut model = GbmModel::with_seed(0.0, 0.8, 42);
        let mut price = Decimal::new(50_000, 0);
        for _ in 0..1000 {
            price = model.next_price(price, 1000);
            assert!(price > Decimal::ZERO);
        }
    }

    #[test]
    fn test_gbm_zero_volatility_drift_only_direction() {
        let mut model = GbmModel::with_seed(1.0, 0.0, 1);
        let price = Decimal::new(100, 0);
        let next = model.next_price(price, 1000);
        assert!(next > price);
    }

    #[test]
    fn test_gbm_is_deterministic_with_fixed_seed() {
        let mut a = GbmModel::with_seed(0.1, 0.5, 7);
        let mut b = GbmModel::with_seed(0.1, 0.5, 7);
        let start = Decimal::new(1000, 0);
        assert_eq!(a.next_price(start, 500), b.next_price(start, 500));
    }
}
