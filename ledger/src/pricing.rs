//! Vote pricing and weighting.

/// Balance below which reputation gives no weight bonus.
const REPUTATION_FLOOR: f64 = 100.0;

/// Price of `requested` votes: `requested²` in quadratic mode, else `requested`.
pub fn vote_cost(requested: u64, quadratic: bool) -> u64 {
    if quadratic {
        requested.saturating_mul(requested)
    } else {
        requested
    }
}

/// Inverse of [`vote_cost`]: the vote count that costs exactly `cost`, if any.
pub fn votes_for_cost(cost: u64, quadratic: bool) -> Option<u64> {
    if cost == 0 {
        return None;
    }
    if !quadratic {
        return Some(cost);
    }
    // f64 sqrt can be off by one near u64::MAX.
    let guess = (cost as f64).sqrt() as u64;
    (guess.saturating_sub(1)..=guess.saturating_add(1)).find(|n| n.checked_mul(*n) == Some(cost))
}

/// Tally weight of a stake: `sqrt(stake) * (1 + log10(max(balance, 100) / 100))`.
///
/// The square root undoes the quadratic price; the log term lets
/// reputation help without letting it dominate.
pub fn vote_weight(stake: u64, balance: u64) -> f64 {
    let rep = (balance as f64).max(REPUTATION_FLOOR);
    (stake as f64).sqrt() * (1.0 + (rep / REPUTATION_FLOOR).log10())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_balances_get_no_bonus() {
        assert_eq!(vote_weight(9, 0), 3.0);
        assert_eq!(vote_weight(9, 100), 3.0);
    }

    #[test]
    fn tenfold_balance_doubles_weight() {
        assert!((vote_weight(16, 1_000) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn only_squares_are_quadratic_prices() {
        assert_eq!(votes_for_cost(9, true), Some(3));
        assert_eq!(votes_for_cost(10, true), None);
        assert_eq!(votes_for_cost(0, true), None);
        assert_eq!(votes_for_cost(10, false), Some(10));
        let big = 4_294_967_295u64;
        assert_eq!(votes_for_cost(big * big, true), Some(big));
        assert_eq!(votes_for_cost(big * big - 1, true), None);
    }

    #[test]
    fn cost_saturates() {
        assert_eq!(vote_cost(u64::MAX, true), u64::MAX);
        assert_eq!(vote_cost(u64::MAX, false), u64::MAX);
    }
}
