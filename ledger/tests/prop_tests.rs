use proptest::prelude::*;
use std::sync::Arc;

use rumorality_ledger::{vote_cost, vote_weight, Reason, ReputationLedger};
use rumorality_nullables::NullClock;
use rumorality_types::{IdentityId, RumorParams, MILLIS_PER_DAY};

proptest! {
    /// Quadratic mode prices `n` votes at `n²`, linear mode at `n`.
    #[test]
    fn vote_cost_matches_mode(n in 0u64..=u32::MAX as u64) {
        prop_assert_eq!(vote_cost(n, true), n * n);
        prop_assert_eq!(vote_cost(n, false), n);
    }

    /// Quadratic pricing followed by weighting recovers the requested count
    /// for balances at or below the reputation floor.
    #[test]
    fn weight_undoes_quadratic_price(n in 0u64..10_000, balance in 0u64..=100) {
        let w = vote_weight(vote_cost(n, true), balance);
        prop_assert!((w - n as f64).abs() < 1e-9);
    }

    /// Weight never decreases as balance grows.
    #[test]
    fn weight_monotonic_in_balance(stake in 0u64..1_000_000, a in 0u64..1_000_000, b in 0u64..1_000_000) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(vote_weight(stake, lo) <= vote_weight(stake, hi));
    }

    /// Balance always equals the initial balance plus the replayed history.
    #[test]
    fn history_replays_to_balance(ops in prop::collection::vec((0u8..4, 0u64..400), 0..40)) {
        let clock = Arc::new(NullClock::default());
        let mut ledger = ReputationLedger::new(
            IdentityId::from("00112233aabbccdd"),
            RumorParams::default(),
            clock.clone(),
        );
        for (op, amount) in ops {
            match op {
                0 => { let _ = ledger.stake(amount, None); }
                1 => ledger.reward(amount, Reason::Manual("test".into())),
                2 => { ledger.slash(amount, "test"); }
                _ => {
                    clock.advance(7 * MILLIS_PER_DAY);
                    ledger.apply_decay();
                }
            }
            prop_assert_eq!(ledger.account().replayed_balance(), ledger.balance());
        }
    }
}
