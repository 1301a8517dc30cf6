//! The reputation ledger of one identity.

use crate::account::{EntryKind, HistoryEntry, Reason, ReputationAccount};
use crate::pricing::{vote_cost, vote_weight};
use crate::LedgerError;
use rumorality_identity::IdentityService;
use rumorality_store::{get_record, put_record, Collection, RecordStore};
use rumorality_types::{ClaimId, Clock, IdentityId, RumorParams};
use std::sync::Arc;

/// Balance at which the balance component of credibility saturates.
const CREDIBILITY_BALANCE_CAP: f64 = 1_000.0;
/// Account age, in days, at which the age component saturates.
const CREDIBILITY_AGE_CAP_DAYS: f64 = 30.0;

pub struct ReputationLedger {
    account: ReputationAccount,
    params: RumorParams,
    clock: Arc<dyn Clock>,
}

impl ReputationLedger {
    /// A fresh account holding the configured initial balance.
    pub fn new(identity_id: IdentityId, params: RumorParams, clock: Arc<dyn Clock>) -> Self {
        let account = ReputationAccount::new(identity_id, params.initial_reputation, clock.now());
        Self {
            account,
            params,
            clock,
        }
    }

    /// Load the identity's account, or create one, then apply any pending decay.
    pub fn init(
        store: &dyn RecordStore,
        identity_id: &IdentityId,
        params: RumorParams,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LedgerError> {
        let mut ledger =
            match get_record::<ReputationAccount>(store, Collection::Reputation, identity_id.as_str())? {
                Some(account) => Self {
                    account,
                    params,
                    clock,
                },
                None => Self::new(identity_id.clone(), params, clock),
            };
        ledger.apply_decay();
        ledger.persist(store)?;
        Ok(ledger)
    }

    pub fn persist(&self, store: &dyn RecordStore) -> Result<(), LedgerError> {
        put_record(
            store,
            Collection::Reputation,
            self.account.identity_id.as_str(),
            &self.account,
        )?;
        Ok(())
    }

    pub fn account(&self) -> &ReputationAccount {
        &self.account
    }

    /// Put back a copy taken from [`account`](Self::account), undoing every
    /// change made since. Memory only; the caller decides whether to persist.
    pub fn restore(&mut self, account: ReputationAccount) {
        debug_assert_eq!(account.identity_id, self.account.identity_id);
        self.account = account;
    }

    pub fn identity_id(&self) -> &IdentityId {
        &self.account.identity_id
    }

    pub fn params(&self) -> &RumorParams {
        &self.params
    }

    pub fn balance(&self) -> u64 {
        self.account.balance
    }

    pub fn can_afford(&self, amount: u64) -> bool {
        self.account.balance >= amount
    }

    /// Debit `amount` as a stake, optionally on a specific claim.
    pub fn stake(&mut self, amount: u64, claim: Option<ClaimId>) -> Result<(), LedgerError> {
        if !self.can_afford(amount) {
            return Err(LedgerError::InsufficientBalance {
                needed: amount,
                available: self.account.balance,
            });
        }
        self.account
            .append(amount, Reason::Stake { claim }, EntryKind::Loss, self.clock.now());
        tracing::debug!(
            identity = %self.account.identity_id,
            amount,
            balance = self.account.balance,
            "staked reputation"
        );
        Ok(())
    }

    pub fn reward(&mut self, amount: u64, reason: Reason) {
        tracing::debug!(
            identity = %self.account.identity_id,
            amount,
            %reason,
            "reputation credited"
        );
        self.account
            .append(amount, reason, EntryKind::Gain, self.clock.now());
    }

    /// Record a resolved losing vote. Its stake was debited at cast time,
    /// so the balance does not move.
    pub fn record_loss(&mut self, claim: ClaimId) {
        self.account
            .append(0, Reason::VoteLost { claim }, EntryKind::Loss, self.clock.now());
    }

    /// Debit up to `amount` (never below zero). When the remaining balance
    /// still exceeds the high-reputation threshold, a second entry takes
    /// `floor(balance * high_rep_penalty_rate)` on top.
    ///
    /// Returns the total debited.
    pub fn slash(&mut self, amount: u64, reason: impl Into<String>) -> u64 {
        let now = self.clock.now();
        let debit = amount.min(self.account.balance);
        self.account
            .append(debit, Reason::Slashed(reason.into()), EntryKind::Loss, now);

        let mut total = debit;
        if self.account.balance > self.params.high_rep_threshold {
            let penalty =
                (self.account.balance as f64 * self.params.high_rep_penalty_rate).floor() as u64;
            if penalty > 0 {
                self.account
                    .append(penalty, Reason::HighRepPenalty, EntryKind::Loss, now);
                total += penalty;
            }
        }
        tracing::info!(
            identity = %self.account.identity_id,
            total,
            balance = self.account.balance,
            "reputation slashed"
        );
        total
    }

    /// Apply one decay step if a full interval has passed since the last one.
    ///
    /// Returns the amount removed, or `None` when nothing was due. Calling
    /// it again within the same interval is a no-op.
    pub fn apply_decay(&mut self) -> Option<u64> {
        if !self.params.decay_enabled {
            return None;
        }
        let now = self.clock.now();
        if !self
            .account
            .last_decay_at
            .has_expired(self.params.decay_interval_ms, now)
        {
            return None;
        }
        let kept = (self.account.balance as f64 * (1.0 - self.params.decay_rate)).floor() as u64;
        let removed = self.account.balance.saturating_sub(kept);
        if removed > 0 {
            self.account
                .append(removed, Reason::Decay, EntryKind::Decay, now);
        }
        self.account.last_decay_at = now;
        tracing::info!(
            identity = %self.account.identity_id,
            removed,
            balance = self.account.balance,
            "reputation decayed"
        );
        Some(removed)
    }

    pub fn vote_cost(&self, requested: u64) -> u64 {
        vote_cost(requested, self.params.quadratic_voting)
    }

    /// Weight of `stake` at the current balance.
    pub fn vote_weight(&self, stake: u64) -> f64 {
        vote_weight(stake, self.account.balance)
    }

    /// Share of resolved votes that were won; 0.5 with no resolved history.
    pub fn win_rate(&self) -> f64 {
        let (won, resolved) = self
            .account
            .history
            .iter()
            .filter(|e| e.reason.is_resolution())
            .fold((0u64, 0u64), |(won, total), e| {
                let w = matches!(e.reason, Reason::VoteWon { .. }) as u64;
                (won + w, total + 1)
            });
        if resolved == 0 {
            0.5
        } else {
            won as f64 / resolved as f64
        }
    }

    /// Composite trust metric in `0..=100`.
    pub fn credibility_score(&self, identity: &IdentityService) -> u32 {
        let balance = (self.account.balance as f64 / CREDIBILITY_BALANCE_CAP).min(1.0);
        let age = (identity.account_age_days() / CREDIBILITY_AGE_CAP_DAYS).min(1.0);
        let score = 0.7 * balance * 100.0 + 0.2 * age * 100.0 + 0.1 * self.win_rate() * 100.0;
        score.round() as u32
    }

    /// History, newest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.account.history.iter().rev().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumorality_nullables::{NullAttestation, NullClock, NullStore};
    use rumorality_types::MILLIS_PER_DAY;

    fn ledger_with(params: RumorParams) -> (ReputationLedger, Arc<NullClock>) {
        let clock = Arc::new(NullClock::default());
        let ledger = ReputationLedger::new(IdentityId::from("00112233aabbccdd"), params, clock.clone());
        (ledger, clock)
    }

    fn claim() -> ClaimId {
        ClaimId::new([1u8; 32])
    }

    #[test]
    fn stake_debits_and_logs_loss() {
        let (mut ledger, _) = ledger_with(RumorParams::default());
        ledger.stake(30, Some(claim())).unwrap();
        assert_eq!(ledger.balance(), 70);
        let latest = &ledger.history()[0];
        assert_eq!(latest.kind, EntryKind::Loss);
        assert_eq!(latest.reason, Reason::Stake { claim: Some(claim()) });
    }

    #[test]
    fn overdraft_is_refused() {
        let (mut ledger, _) = ledger_with(RumorParams::default());
        let err = ledger.stake(101, None).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientBalance { needed: 101, available: 100 }
        ));
        assert_eq!(ledger.balance(), 100);
        assert!(ledger.history().is_empty());
    }

    #[test]
    fn restore_undoes_a_stake() {
        let (mut ledger, _) = ledger_with(RumorParams::default());
        let before = ledger.account().clone();
        ledger.stake(30, Some(claim())).unwrap();
        ledger.restore(before);
        assert_eq!(ledger.balance(), 100);
        assert!(ledger.history().is_empty());
    }

    #[test]
    fn slash_on_high_balance_adds_progressive_penalty() {
        let (mut ledger, _) = ledger_with(RumorParams {
            initial_reputation: 1_000,
            ..RumorParams::default()
        });
        let total = ledger.slash(100, "spam");
        // 1000 - 100 = 900 > 500, penalty floor(900 * 0.2) = 180
        assert_eq!(total, 280);
        assert_eq!(ledger.balance(), 720);
        assert_eq!(ledger.history()[0].reason, Reason::HighRepPenalty);
    }

    #[test]
    fn slash_on_low_balance_has_no_penalty_and_clamps() {
        let (mut ledger, _) = ledger_with(RumorParams::default());
        assert_eq!(ledger.slash(250, "spam"), 100);
        assert_eq!(ledger.balance(), 0);
    }

    #[test]
    fn decay_runs_once_per_interval() {
        let (mut ledger, clock) = ledger_with(RumorParams::default());
        assert_eq!(ledger.apply_decay(), None);

        clock.advance(7 * MILLIS_PER_DAY);
        assert_eq!(ledger.apply_decay(), Some(5));
        assert_eq!(ledger.balance(), 95);
        assert_eq!(ledger.apply_decay(), None);
        assert_eq!(ledger.balance(), 95);
    }

    #[test]
    fn disabled_decay_is_noop() {
        let (mut ledger, clock) = ledger_with(RumorParams {
            decay_enabled: false,
            ..RumorParams::default()
        });
        clock.advance(30 * MILLIS_PER_DAY);
        assert_eq!(ledger.apply_decay(), None);
        assert_eq!(ledger.balance(), 100);
    }

    #[test]
    fn win_rate_counts_resolved_votes() {
        let (mut ledger, _) = ledger_with(RumorParams::default());
        assert_eq!(ledger.win_rate(), 0.5);
        ledger.reward(20, Reason::VoteWon { claim: claim() });
        ledger.reward(5, Reason::TieRefund { claim: claim() });
        ledger.record_loss(claim());
        ledger.reward(10, Reason::VoteWon { claim: claim() });
        ledger.slash(0, "griefing");
        assert_eq!(ledger.win_rate(), 0.5);
    }

    #[test]
    fn credibility_combines_balance_age_and_win_rate() {
        let clock = Arc::new(NullClock::default());
        let params = RumorParams {
            initial_reputation: 500,
            ..RumorParams::default()
        };
        let identity = IdentityService::generate(&params, clock.clone(), &NullAttestation::new("d"));
        let ledger = ReputationLedger::new(identity.id().clone(), params, clock.clone());
        // 0.7*50 + 0.2*0 + 0.1*50 = 40
        assert_eq!(ledger.credibility_score(&identity), 40);
        clock.advance(60 * MILLIS_PER_DAY);
        // decay is not applied implicitly: 35 + 20 + 5
        assert_eq!(ledger.credibility_score(&identity), 60);
    }

    #[test]
    fn history_replays_to_balance() {
        let (mut ledger, clock) = ledger_with(RumorParams::default());
        ledger.stake(10, None).unwrap();
        ledger.reward(40, Reason::Manual("bonus".into()));
        clock.advance(7 * MILLIS_PER_DAY);
        ledger.apply_decay();
        ledger.slash(3, "x");
        assert_eq!(ledger.account().replayed_balance(), ledger.balance());
    }

    #[test]
    fn init_loads_and_decays_persisted_account() {
        let store = NullStore::new();
        let clock = Arc::new(NullClock::default());
        let id = IdentityId::from("00112233aabbccdd");
        let mut ledger = ReputationLedger::init(&store, &id, RumorParams::default(), clock.clone()).unwrap();
        ledger.stake(20, None).unwrap();
        ledger.persist(&store).unwrap();

        clock.advance(7 * MILLIS_PER_DAY);
        let reloaded = ReputationLedger::init(&store, &id, RumorParams::default(), clock).unwrap();
        // floor(80 * 0.95) = 76
        assert_eq!(reloaded.balance(), 76);
    }
}
