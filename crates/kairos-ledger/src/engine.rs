use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use kairos_core::error::LedgerError;
use kairos_core::events::LedgerEvent;
use kairos_core::ledger::{GlobalLedger, RewardPair, RewardRecord, RewardToken, StakerLedger};
use kairos_core::types::{AccountId, Amount, Epoch, Timestamp};
use kairos_epoch::EpochClock;

use crate::db::LedgerDb;
use crate::params::InitParams;

/// The staking ledger engine.
///
/// The single serializing API over the ledger: stake changes, epoch catch-up,
/// reward deposits, accrual and claims all flow through here, one operation
/// at a time. Each operation validates against staged in-memory copies and
/// writes only after every check has passed, so a failure leaves no partial
/// mutation behind.
pub struct LedgerEngine {
    pub db: Arc<LedgerDb>,
    params: InitParams,
    clock: EpochClock,
    // Single global sequential order: one operation runs to completion before
    // the next observes the ledger.
    op_lock: Mutex<()>,
}

impl LedgerEngine {
    /// Open the engine over an initialized database.
    pub fn open(db: Arc<LedgerDb>) -> Result<Self, LedgerError> {
        let params = db.get_params()?.ok_or(LedgerError::NotInitialized)?;
        let clock = EpochClock::new(params.init_timestamp, params.epoch_size_secs);
        Ok(Self {
            db,
            params,
            clock,
            op_lock: Mutex::new(()),
        })
    }

    pub fn clock(&self) -> &EpochClock {
        &self.clock
    }

    pub fn params(&self) -> &InitParams {
        &self.params
    }

    // ── Staking ──────────────────────────────────────────────────────────────

    /// Set a staker's absolute stake. The sole mutator of stake; called by
    /// the balance-owning collaborator whenever the eligible balance changes.
    pub fn set_stake(
        &self,
        staker: &AccountId,
        new_amount: Amount,
        now: Timestamp,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        let _guard = self.op_lock.lock().unwrap();
        let current = self.current_epoch(now)?;

        let existing = self.db.get_staker(staker)?;
        let fresh = existing.is_none();
        let mut s = existing.unwrap_or_else(|| StakerLedger::new(staker.clone()));
        let old_amount = s.staked_amount;

        if old_amount == 0 && new_amount == 0 {
            return Ok(Vec::new());
        }

        let mut g = self.load_global()?;
        let mut events = Vec::new();

        // Make every silent epoch explicit before touching the current one.
        s.catch_up(current);
        g.catch_up(current);

        let removing = old_amount > 0 && new_amount == 0;
        if removing {
            // Must happen after catch-up (entries exist to clear) and before
            // the zeroing update touches the current epoch.
            self.avoid_stuck_rewards(&mut s, &mut g, current, &mut events)?;
        }

        s.observe_update(current, new_amount);

        let new_total = g
            .total_staked
            .checked_sub(old_amount)
            .and_then(|t| t.checked_add(new_amount))
            .ok_or(LedgerError::ArithmeticOverflow)?;
        g.observe_update(current, new_total);

        if old_amount == 0 {
            s.is_staker = true;
            s.staking_start = now;
            if fresh {
                // Every reward epoch so far predates this staker's weight, so
                // start the accrual cursor at the global cursor.
                s.last_epoch_rewards_updated = g.last_epoch_rewards_updated;
            }
            g.staker_count += 1;
            events.push(LedgerEvent::PositionCreated {
                staker: staker.clone(),
                amount: new_amount,
            });
        } else if removing {
            s.is_staker = false;
            g.staker_count -= 1;
            events.push(LedgerEvent::PositionRemoved {
                staker: staker.clone(),
                amount: old_amount,
            });
        } else {
            events.push(LedgerEvent::PositionUpdated {
                staker: staker.clone(),
                old_amount,
                new_amount,
            });
        }

        self.db.put_staker(&s)?;
        self.db.put_global(&g)?;

        debug!(staker = %staker, old_amount, new_amount, epoch = current, "stake updated");
        Ok(events)
    }

    /// Roll a staker's snapshots forward without changing the stake, so large
    /// epoch gaps can be amortized across calls. `until_epoch` defaults to
    /// the current epoch and must not exceed it.
    pub fn update_staker_previous_epochs(
        &self,
        staker: &AccountId,
        until_epoch: Option<Epoch>,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        let _guard = self.op_lock.lock().unwrap();
        let current = self.current_epoch(now)?;
        let until = until_epoch.unwrap_or(current);
        if until > current {
            return Err(LedgerError::CatchUpBeyondCurrent { until, current });
        }

        let mut s = self.require_staker(staker)?;
        s.catch_up(until);
        self.db.put_staker(&s)?;
        Ok(())
    }

    /// Global analogue of [`Self::update_staker_previous_epochs`].
    pub fn update_global_previous_epochs(
        &self,
        until_epoch: Epoch,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        let _guard = self.op_lock.lock().unwrap();
        let current = self.current_epoch(now)?;
        if until_epoch > current {
            return Err(LedgerError::CatchUpBeyondCurrent {
                until: until_epoch,
                current,
            });
        }

        let mut g = self.load_global()?;
        g.catch_up(until_epoch);
        self.db.put_global(&g)?;
        Ok(())
    }

    // ── Rewards ──────────────────────────────────────────────────────────────

    /// Record a reward against a finalized epoch and pull the token amounts
    /// into custody. Epochs are strictly sequential and write-once.
    pub fn set_rewards(
        &self,
        caller: &AccountId,
        epoch: Epoch,
        asset_amount: Amount,
        secondary_amount: Amount,
        now: Timestamp,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        let _guard = self.op_lock.lock().unwrap();
        let current = self.current_epoch(now)?;

        if *caller != self.params.rewards_setter {
            return Err(LedgerError::NotRewardsSetter(caller.to_b58()));
        }
        if epoch >= current {
            return Err(LedgerError::RewardEpochNotFinalized { epoch, current });
        }
        let mut g = self.load_global()?;
        let expected = g.last_epoch_rewards_updated + 1;
        if epoch != expected {
            return Err(LedgerError::RewardEpochOutOfSequence { expected, got: epoch });
        }
        if asset_amount == 0 && secondary_amount == 0 {
            return Err(LedgerError::ZeroRewardAmount);
        }

        // The rewarded epoch's global snapshot must be defined before accrual
        // ever reads it.
        g.catch_up(current);
        g.last_epoch_rewards_updated = epoch;

        let mut events = vec![LedgerEvent::RewardsSet {
            setter: caller.clone(),
            epoch,
            asset_amount,
            secondary_amount,
        }];
        let mut custody = Vec::new();
        for (token, amount) in [
            (RewardToken::Asset, asset_amount),
            (RewardToken::Secondary, secondary_amount),
        ] {
            if amount == 0 {
                continue;
            }
            let balance = self
                .db
                .get_custody(token)?
                .checked_add(amount)
                .ok_or(LedgerError::ArithmeticOverflow)?;
            custody.push((token, balance));
            events.push(LedgerEvent::TokenDeposited {
                token,
                from: caller.clone(),
                amount,
            });
        }

        self.db
            .put_reward(epoch, &RewardRecord { asset: asset_amount, secondary: secondary_amount })?;
        self.db.put_global(&g)?;
        for (token, balance) in custody {
            self.db.put_custody(token, balance)?;
        }

        info!(epoch, asset_amount, secondary_amount, "rewards set");
        Ok(events)
    }

    /// Pull every newly reward-bearing epoch into the staker's unclaimed
    /// balance. Callable by anyone.
    pub fn update_unclaimed_rewards(
        &self,
        staker: &AccountId,
        now: Timestamp,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        let _guard = self.op_lock.lock().unwrap();
        let mut s = self.require_staker(staker)?;
        let g = self.load_global()?;

        let mut events = Vec::new();
        self.accrue(&mut s, &g, now, &mut events)?;
        if !events.is_empty() {
            self.db.put_staker(&s)?;
        }
        Ok(events)
    }

    /// Claim one's own accrued rewards.
    pub fn claim_rewards(
        &self,
        staker: &AccountId,
        now: Timestamp,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        let _guard = self.op_lock.lock().unwrap();
        self.claim_inner(staker, staker, false, now)
    }

    /// Claim on behalf of an opted-in staker; the delegate caller receives
    /// the tokens.
    pub fn claim_rewards_on_behalf_of(
        &self,
        caller: &AccountId,
        staker: &AccountId,
        now: Timestamp,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        let _guard = self.op_lock.lock().unwrap();
        if !self.params.delegated_claimers.contains(caller) {
            return Err(LedgerError::NotDelegatedClaimer(caller.to_b58()));
        }
        self.claim_inner(staker, caller, true, now)
    }

    /// Flip the delegated-claim opt-in. Owned by the loan collaborator; the
    /// claim flow only ever reads it.
    pub fn set_accepts_delegated_claims(
        &self,
        staker: &AccountId,
        accepts: bool,
    ) -> Result<(), LedgerError> {
        let _guard = self.op_lock.lock().unwrap();
        let mut s = self.require_staker(staker)?;
        s.accepts_delegated_claims = accepts;
        self.db.put_staker(&s)?;
        Ok(())
    }

    // ── Read accessors ───────────────────────────────────────────────────────

    pub fn staker(&self, id: &AccountId) -> Result<Option<StakerLedger>, LedgerError> {
        self.db.get_staker(id)
    }

    pub fn global(&self) -> Result<GlobalLedger, LedgerError> {
        self.load_global()
    }

    pub fn reward_record(&self, epoch: Epoch) -> Result<Option<RewardRecord>, LedgerError> {
        self.db.get_reward(epoch)
    }

    pub fn custody(&self, token: RewardToken) -> Result<Amount, LedgerError> {
        self.db.get_custody(token)
    }

    /// Finalized (min, last) snapshot of a staker for `epoch`, or None while
    /// the epoch is beyond the staker's catch-up horizon.
    pub fn staker_snapshot(
        &self,
        id: &AccountId,
        epoch: Epoch,
    ) -> Result<Option<(Amount, Amount)>, LedgerError> {
        let Some(s) = self.db.get_staker(id)? else {
            return Ok(None);
        };
        if epoch == 0 || epoch > s.last_epoch_staking_updated {
            return Ok(None);
        }
        Ok(Some((s.min_staked_at(epoch), s.last_staked_at(epoch))))
    }

    /// Finalized (min, last) global snapshot for `epoch`.
    pub fn global_snapshot(&self, epoch: Epoch) -> Result<Option<(Amount, Amount)>, LedgerError> {
        let g = self.load_global()?;
        if epoch == 0 || epoch > g.last_epoch_staking_updated {
            return Ok(None);
        }
        Ok(Some((g.min_staked_at(epoch), g.last_staked_at(epoch))))
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn current_epoch(&self, now: Timestamp) -> Result<Epoch, LedgerError> {
        match self.clock.epoch_of(now) {
            0 => Err(LedgerError::BeforeInitialization),
            e => Ok(e),
        }
    }

    fn load_global(&self) -> Result<GlobalLedger, LedgerError> {
        self.db.get_global()?.ok_or(LedgerError::NotInitialized)
    }

    fn require_staker(&self, id: &AccountId) -> Result<StakerLedger, LedgerError> {
        match self.db.get_staker(id)? {
            Some(s) if s.is_staker => Ok(s),
            _ => Err(LedgerError::StakerNotFound(id.to_b58())),
        }
    }

    /// Clear an exiting staker's weight from every finalized epoch that has
    /// no reward assigned yet. Once `is_staker` flips, nothing can ever claim
    /// against those epochs; weight left there would permanently dilute every
    /// other staker's share when the reward eventually lands.
    fn avoid_stuck_rewards(
        &self,
        s: &mut StakerLedger,
        g: &mut GlobalLedger,
        current: Epoch,
        events: &mut Vec<LedgerEvent>,
    ) -> Result<(), LedgerError> {
        for epoch in (g.last_epoch_rewards_updated + 1)..current {
            if !s.has_entry_at(epoch) {
                continue;
            }
            let cleared_min = s.min_staked_at(epoch);
            let cleared_last = s.last_staked_at(epoch);
            if cleared_min == 0 && cleared_last == 0 {
                continue;
            }

            s.min_staked_per_epoch.insert(epoch, 0);
            s.last_staked_per_epoch.insert(epoch, 0);

            // Reduce the aggregate by exactly the cleared snapshot values,
            // never by the current balance, which may differ. The aggregate
            // can never be below a single staker's snapshot at the same
            // instant, so these cannot underflow.
            let g_min = g
                .min_staked_at(epoch)
                .checked_sub(cleared_min)
                .ok_or(LedgerError::ArithmeticOverflow)?;
            let g_last = g
                .last_staked_at(epoch)
                .checked_sub(cleared_last)
                .ok_or(LedgerError::ArithmeticOverflow)?;
            g.min_staked_per_epoch.insert(epoch, g_min);
            g.last_staked_per_epoch.insert(epoch, g_last);

            info!(staker = %s.staker, epoch, cleared_min, cleared_last, "stuck rewards avoided");
            events.push(LedgerEvent::StuckRewardsAvoided {
                staker: s.staker.clone(),
                epoch,
                cleared_min,
                cleared_last,
            });
        }
        Ok(())
    }

    /// Walk the staker's reward cursor through every finalized, reward-bearing
    /// epoch, converting epoch-local stake share into owed reward.
    fn accrue(
        &self,
        s: &mut StakerLedger,
        g: &GlobalLedger,
        now: Timestamp,
        events: &mut Vec<LedgerEvent>,
    ) -> Result<(), LedgerError> {
        self.current_epoch(now)?;
        let target = g.last_epoch_rewards_updated;
        let from = s.last_epoch_rewards_updated + 1;
        if from > target {
            // Pure no-op: no event.
            return Ok(());
        }

        // Rewards only exist for finalized epochs, so `target < current` and
        // this populates the staker's minimum for every epoch read below.
        s.catch_up(target + 1);

        let old = s.unclaimed;
        for epoch in from..=target {
            let record = self.db.get_reward(epoch)?.ok_or_else(|| {
                LedgerError::Storage(format!("reward record missing for epoch {epoch}"))
            })?;
            let global_min = g.min_staked_at(epoch);
            if global_min == 0 {
                // Nobody held through this epoch; its reward stays in custody.
                continue;
            }
            let staker_min = s.min_staked_at(epoch);
            if staker_min == 0 {
                continue;
            }
            s.unclaimed.asset = s
                .unclaimed
                .asset
                .checked_add(pro_rata(record.asset, staker_min, global_min)?)
                .ok_or(LedgerError::ArithmeticOverflow)?;
            s.unclaimed.secondary = s
                .unclaimed
                .secondary
                .checked_add(pro_rata(record.secondary, staker_min, global_min)?)
                .ok_or(LedgerError::ArithmeticOverflow)?;
        }
        s.last_epoch_rewards_updated = target;

        events.push(LedgerEvent::UnclaimedRewardsUpdated {
            staker: s.staker.clone(),
            old_asset: old.asset,
            old_secondary: old.secondary,
            new_asset: s.unclaimed.asset,
            new_secondary: s.unclaimed.secondary,
            from_epoch: from,
            to_epoch: target,
        });
        Ok(())
    }

    fn claim_inner(
        &self,
        staker: &AccountId,
        recipient: &AccountId,
        require_opt_in: bool,
        now: Timestamp,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        let mut s = self.require_staker(staker)?;
        if require_opt_in && !s.accepts_delegated_claims {
            return Err(LedgerError::DelegationNotAccepted(staker.to_b58()));
        }
        let g = self.load_global()?;

        let mut events = Vec::new();
        self.accrue(&mut s, &g, now, &mut events)?;

        if s.unclaimed.is_zero() {
            // Silent success: no claim events, no transfer.
            if !events.is_empty() {
                self.db.put_staker(&s)?;
            }
            return Ok(events);
        }

        let claimed = s.unclaimed;
        s.cumulative.asset = s
            .cumulative
            .asset
            .checked_add(claimed.asset)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        s.cumulative.secondary = s
            .cumulative
            .secondary
            .checked_add(claimed.secondary)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        s.unclaimed = RewardPair::default();

        events.push(LedgerEvent::RewardsClaimed {
            staker: staker.clone(),
            recipient: recipient.clone(),
            asset_amount: claimed.asset,
            secondary_amount: claimed.secondary,
        });

        let mut custody = Vec::new();
        for token in RewardToken::ALL {
            let amount = claimed.get(token);
            if amount == 0 {
                continue;
            }
            let balance = self
                .db
                .get_custody(token)?
                .checked_sub(amount)
                .ok_or(LedgerError::ArithmeticOverflow)?;
            custody.push((token, balance));
            events.push(LedgerEvent::TokenWithdrawn {
                token,
                to: recipient.clone(),
                amount,
            });
        }

        self.db.put_staker(&s)?;
        for (token, balance) in custody {
            self.db.put_custody(token, balance)?;
        }

        info!(
            staker = %staker,
            recipient = %recipient,
            asset = claimed.asset,
            secondary = claimed.secondary,
            "rewards claimed"
        );
        Ok(events)
    }
}

/// `floor(reward × staker_min / global_min)`: the truncating pro-rata share.
/// Fractional remainders are not distributed; they stay in custody.
fn pro_rata(reward: Amount, staker_min: Amount, global_min: Amount) -> Result<Amount, LedgerError> {
    reward
        .checked_mul(staker_min)
        .map(|scaled| scaled / global_min)
        .ok_or(LedgerError::ArithmeticOverflow)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{init_ledger, InitParams};

    // ── Helpers ───────────────────────────────────────────────────────────────

    const INIT: Timestamp = 1_000_000;
    const EPOCH_SECS: i64 = 1_000;

    fn acct(n: u8) -> AccountId {
        AccountId::from_bytes([n; 32])
    }

    fn setter() -> AccountId {
        acct(250)
    }

    fn delegate() -> AccountId {
        acct(251)
    }

    /// Timestamp `offset` seconds into `epoch`.
    fn at(epoch: Epoch, offset: i64) -> Timestamp {
        INIT + (epoch as i64 - 1) * EPOCH_SECS + offset
    }

    fn test_engine(name: &str) -> LedgerEngine {
        let dir = std::env::temp_dir().join(format!("kairos_engine_test_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        let db = Arc::new(LedgerDb::open(&dir).expect("open temp db"));
        init_ledger(
            &db,
            &InitParams {
                init_timestamp: INIT,
                epoch_size_secs: EPOCH_SECS,
                rewards_setter: setter(),
                delegated_claimers: vec![delegate()],
            },
        )
        .expect("init ledger");
        LedgerEngine::open(db).expect("open engine")
    }

    // ── set_stake lifecycle ───────────────────────────────────────────────────

    #[test]
    fn set_stake_creates_position() {
        let engine = test_engine("create");
        let alice = acct(1);
        let events = engine.set_stake(&alice, 10_000, at(1, 10)).unwrap();
        assert_eq!(
            events,
            vec![LedgerEvent::PositionCreated { staker: alice.clone(), amount: 10_000 }]
        );

        let s = engine.staker(&alice).unwrap().unwrap();
        assert!(s.is_staker);
        assert_eq!(s.staking_start, at(1, 10));
        assert_eq!(s.staked_amount, 10_000);
        // The carried-in value at first stake is zero; the epoch minimum must
        // record it so a mid-epoch join carries no weight for that epoch.
        assert_eq!(s.min_staked_at(1), 0);
        assert_eq!(s.last_staked_at(1), 10_000);
        assert_eq!(s.last_epoch_staking_updated, 1);

        let g = engine.global().unwrap();
        assert_eq!(g.total_staked, 10_000);
        assert_eq!(g.staker_count, 1);
        assert_eq!(g.min_staked_at(1), 0);
        assert_eq!(g.last_staked_at(1), 10_000);
    }

    #[test]
    fn set_stake_before_initialization_rejected() {
        let engine = test_engine("before_init");
        assert!(matches!(
            engine.set_stake(&acct(1), 100, INIT - 1),
            Err(LedgerError::BeforeInitialization)
        ));
    }

    #[test]
    fn set_stake_zero_to_zero_is_noop() {
        let engine = test_engine("zero_noop");
        let bob = acct(2);
        let events = engine.set_stake(&bob, 0, at(1, 0)).unwrap();
        assert!(events.is_empty());
        assert!(engine.staker(&bob).unwrap().is_none());
        assert_eq!(engine.global().unwrap().total_staked, 0);
    }

    #[test]
    fn set_stake_classifies_update_and_removal() {
        let engine = test_engine("classify");
        let alice = acct(1);
        engine.set_stake(&alice, 5_000, at(1, 1)).unwrap();

        let events = engine.set_stake(&alice, 8_000, at(1, 2)).unwrap();
        assert_eq!(
            events,
            vec![LedgerEvent::PositionUpdated {
                staker: alice.clone(),
                old_amount: 5_000,
                new_amount: 8_000,
            }]
        );

        let events = engine.set_stake(&alice, 0, at(1, 3)).unwrap();
        assert_eq!(
            events,
            vec![LedgerEvent::PositionRemoved { staker: alice.clone(), amount: 8_000 }]
        );

        let s = engine.staker(&alice).unwrap().unwrap();
        assert!(!s.is_staker);
        assert_eq!(s.staked_amount, 0);
        assert_eq!(s.min_staked_at(1), 0);
        assert_eq!(s.last_staked_at(1), 0);

        let g = engine.global().unwrap();
        assert_eq!(g.total_staked, 0);
        assert_eq!(g.staker_count, 0);
    }

    #[test]
    fn position_recreation_refreshes_start() {
        let engine = test_engine("recreate");
        let alice = acct(1);
        engine.set_stake(&alice, 100, at(1, 1)).unwrap();
        engine.set_stake(&alice, 0, at(1, 2)).unwrap();

        let events = engine.set_stake(&alice, 200, at(2, 5)).unwrap();
        assert_eq!(
            events,
            vec![LedgerEvent::PositionCreated { staker: alice.clone(), amount: 200 }]
        );
        let s = engine.staker(&alice).unwrap().unwrap();
        assert!(s.is_staker);
        assert_eq!(s.staking_start, at(2, 5));
        assert_eq!(s.min_staked_at(2), 0);
        assert_eq!(s.last_staked_at(2), 200);
    }

    #[test]
    fn silent_epochs_recorded_flat_on_next_update() {
        let engine = test_engine("flat_epochs");
        let alice = acct(1);
        engine.set_stake(&alice, 700, at(1, 0)).unwrap();
        engine.set_stake(&alice, 900, at(4, 0)).unwrap();

        let s = engine.staker(&alice).unwrap().unwrap();
        for epoch in 2..4 {
            assert_eq!(s.min_staked_at(epoch), 700);
            assert_eq!(s.last_staked_at(epoch), 700);
        }
        // First touch of epoch 4 seeds the minimum with the carried-in 700.
        assert_eq!(s.min_staked_at(4), 700);
        assert_eq!(s.last_staked_at(4), 900);

        let g = engine.global().unwrap();
        assert_eq!(g.min_staked_at(2), 700);
        assert_eq!(g.last_staked_at(3), 700);
        assert_eq!(g.min_staked_at(4), 700);
        assert_eq!(g.last_staked_at(4), 900);
    }

    // ── Reward schedule ───────────────────────────────────────────────────────

    #[test]
    fn set_rewards_requires_setter_role() {
        let engine = test_engine("setter_role");
        engine.set_stake(&acct(1), 100, at(1, 0)).unwrap();
        assert!(matches!(
            engine.set_rewards(&acct(1), 1, 10, 0, at(2, 0)),
            Err(LedgerError::NotRewardsSetter(_))
        ));
    }

    #[test]
    fn set_rewards_rejects_unfinalized_epoch() {
        let engine = test_engine("temporal");
        assert!(matches!(
            engine.set_rewards(&setter(), 1, 10, 0, at(1, 500)),
            Err(LedgerError::RewardEpochNotFinalized { epoch: 1, current: 1 })
        ));
        assert!(matches!(
            engine.set_rewards(&setter(), 5, 10, 0, at(1, 500)),
            Err(LedgerError::RewardEpochNotFinalized { epoch: 5, current: 1 })
        ));
    }

    #[test]
    fn set_rewards_enforces_strict_sequence() {
        let engine = test_engine("sequence");
        engine.set_stake(&acct(1), 100, at(1, 0)).unwrap();
        let now = at(4, 0);

        // Gap: cursor is 0, epoch 2 skips epoch 1.
        assert!(matches!(
            engine.set_rewards(&setter(), 2, 10, 0, now),
            Err(LedgerError::RewardEpochOutOfSequence { expected: 1, got: 2 })
        ));

        engine.set_rewards(&setter(), 1, 10, 0, now).unwrap();

        // Overwrite: epoch 1 is already recorded.
        assert!(matches!(
            engine.set_rewards(&setter(), 1, 10, 0, now),
            Err(LedgerError::RewardEpochOutOfSequence { expected: 2, got: 1 })
        ));
        // Skip: cursor is 1, epoch 3 skips epoch 2.
        assert!(matches!(
            engine.set_rewards(&setter(), 3, 10, 0, now),
            Err(LedgerError::RewardEpochOutOfSequence { expected: 2, got: 3 })
        ));

        engine.set_rewards(&setter(), 2, 10, 0, now).unwrap();
        assert_eq!(engine.global().unwrap().last_epoch_rewards_updated, 2);
    }

    #[test]
    fn set_rewards_rejects_all_zero_amounts() {
        let engine = test_engine("zero_amounts");
        assert!(matches!(
            engine.set_rewards(&setter(), 1, 0, 0, at(2, 0)),
            Err(LedgerError::ZeroRewardAmount)
        ));
    }

    #[test]
    fn set_rewards_deposits_only_nonzero_tokens() {
        let engine = test_engine("deposit_events");
        let events = engine.set_rewards(&setter(), 1, 0, 500, at(2, 0)).unwrap();
        assert_eq!(
            events,
            vec![
                LedgerEvent::RewardsSet {
                    setter: setter(),
                    epoch: 1,
                    asset_amount: 0,
                    secondary_amount: 500,
                },
                LedgerEvent::TokenDeposited {
                    token: RewardToken::Secondary,
                    from: setter(),
                    amount: 500,
                },
            ]
        );
        assert_eq!(engine.custody(RewardToken::Asset).unwrap(), 0);
        assert_eq!(engine.custody(RewardToken::Secondary).unwrap(), 500);
        assert_eq!(
            engine.reward_record(1).unwrap().unwrap(),
            RewardRecord { asset: 0, secondary: 500 }
        );
    }

    // ── Accrual & pro-rata ────────────────────────────────────────────────────

    /// The concrete end-to-end scenario: stake 20 000 in epoch 1, rewards of
    /// (100, 3000) land on epoch 2, the sole staker collects them exactly.
    #[test]
    fn sole_staker_collects_full_reward() {
        let engine = test_engine("sole_staker");
        let alice = acct(1);
        engine.set_stake(&alice, 20_000, at(1, 0)).unwrap();

        let now = at(3, 0);
        engine.set_rewards(&setter(), 1, 1, 1, now).unwrap();
        engine.set_rewards(&setter(), 2, 100, 3_000, now).unwrap();

        let events = engine.update_unclaimed_rewards(&alice, now).unwrap();
        assert_eq!(
            events,
            vec![LedgerEvent::UnclaimedRewardsUpdated {
                staker: alice.clone(),
                old_asset: 0,
                old_secondary: 0,
                new_asset: 100,
                new_secondary: 3_000,
                from_epoch: 1,
                to_epoch: 2,
            }]
        );

        let s = engine.staker(&alice).unwrap().unwrap();
        // Epoch 1 carries no weight (the join epoch's minimum is zero), so
        // its (1, 1) reward stays in custody; epoch 2 pays in full because
        // staker minimum equals global minimum.
        assert_eq!(s.unclaimed, RewardPair::new(100, 3_000));
        assert_eq!(s.last_epoch_rewards_updated, 2);

        let events = engine.claim_rewards(&alice, now).unwrap();
        assert_eq!(
            events,
            vec![
                LedgerEvent::RewardsClaimed {
                    staker: alice.clone(),
                    recipient: alice.clone(),
                    asset_amount: 100,
                    secondary_amount: 3_000,
                },
                LedgerEvent::TokenWithdrawn {
                    token: RewardToken::Asset,
                    to: alice.clone(),
                    amount: 100,
                },
                LedgerEvent::TokenWithdrawn {
                    token: RewardToken::Secondary,
                    to: alice.clone(),
                    amount: 3_000,
                },
            ]
        );

        let s = engine.staker(&alice).unwrap().unwrap();
        assert!(s.unclaimed.is_zero());
        assert_eq!(s.cumulative, RewardPair::new(100, 3_000));
        // Custody keeps only the unclaimable epoch-1 reward.
        assert_eq!(engine.custody(RewardToken::Asset).unwrap(), 1);
        assert_eq!(engine.custody(RewardToken::Secondary).unwrap(), 1);
    }

    #[test]
    fn multi_staker_shares_truncate_and_dust_stays() {
        let engine = test_engine("multi_staker");
        let (alice, bob) = (acct(1), acct(2));
        engine.set_stake(&alice, 100, at(1, 0)).unwrap();
        engine.set_stake(&bob, 200, at(1, 1)).unwrap();

        let now = at(3, 0);
        engine.set_rewards(&setter(), 1, 1, 1, now).unwrap();
        engine.set_rewards(&setter(), 2, 1_000, 7, now).unwrap();

        engine.claim_rewards(&alice, now).unwrap();
        engine.claim_rewards(&bob, now).unwrap();

        let a = engine.staker(&alice).unwrap().unwrap();
        let b = engine.staker(&bob).unwrap().unwrap();
        assert_eq!(a.cumulative, RewardPair::new(333, 2)); // floor(1000·100/300), floor(7·100/300)
        assert_eq!(b.cumulative, RewardPair::new(666, 4)); // floor(1000·200/300), floor(7·200/300)

        // 1000 − 999 and 7 − 6 remain in custody along with epoch 1's (1, 1).
        assert_eq!(engine.custody(RewardToken::Asset).unwrap(), 2);
        assert_eq!(engine.custody(RewardToken::Secondary).unwrap(), 2);
    }

    #[test]
    fn accrual_requires_existing_staker() {
        let engine = test_engine("accrual_exists");
        assert!(matches!(
            engine.update_unclaimed_rewards(&acct(9), at(1, 0)),
            Err(LedgerError::StakerNotFound(_))
        ));

        let alice = acct(1);
        engine.set_stake(&alice, 100, at(1, 0)).unwrap();
        engine.set_stake(&alice, 0, at(1, 1)).unwrap();
        assert!(matches!(
            engine.update_unclaimed_rewards(&alice, at(1, 2)),
            Err(LedgerError::StakerNotFound(_))
        ));
    }

    #[test]
    fn accrual_without_new_epochs_is_silent() {
        let engine = test_engine("accrual_noop");
        let alice = acct(1);
        engine.set_stake(&alice, 100, at(1, 0)).unwrap();

        assert!(engine.update_unclaimed_rewards(&alice, at(1, 5)).unwrap().is_empty());

        // After a real accrual, a second call is a pure no-op again.
        let now = at(3, 0);
        engine.set_rewards(&setter(), 1, 10, 0, now).unwrap();
        engine.set_rewards(&setter(), 2, 10, 0, now).unwrap();
        assert!(!engine.update_unclaimed_rewards(&alice, now).unwrap().is_empty());
        assert!(engine.update_unclaimed_rewards(&alice, now).unwrap().is_empty());
    }

    #[test]
    fn late_joiner_starts_at_reward_cursor() {
        let engine = test_engine("late_joiner");
        let (bob, carol) = (acct(2), acct(3));
        engine.set_stake(&bob, 1_000, at(1, 0)).unwrap();

        let now = at(4, 0);
        engine.set_rewards(&setter(), 1, 10, 10, now).unwrap();
        engine.set_rewards(&setter(), 2, 10, 10, now).unwrap();
        engine.set_rewards(&setter(), 3, 10, 10, now).unwrap();

        engine.set_stake(&carol, 500, at(5, 0)).unwrap();
        assert_eq!(
            engine.staker(&carol).unwrap().unwrap().last_epoch_rewards_updated,
            3
        );
        assert!(engine.update_unclaimed_rewards(&carol, at(5, 1)).unwrap().is_empty());
        assert!(engine.staker(&carol).unwrap().unwrap().unclaimed.is_zero());
    }

    // ── Global min sampling ───────────────────────────────────────────────────

    /// X leaves and Y joins within one epoch while Z holds throughout. The
    /// global minimum for that epoch is z alone: the departed and joined
    /// mass never count together.
    #[test]
    fn global_min_sampled_at_update_events() {
        let engine = test_engine("global_min_events");
        let (x, y, z) = (acct(1), acct(2), acct(3));
        engine.set_stake(&z, 5_000, at(1, 0)).unwrap();
        engine.set_stake(&x, 1_000, at(1, 1)).unwrap();

        engine.set_stake(&x, 0, at(2, 10)).unwrap();
        engine.set_stake(&y, 2_000, at(2, 20)).unwrap();

        let g = engine.global().unwrap();
        assert_eq!(g.min_staked_at(2), 5_000);
        assert_eq!(g.last_staked_at(2), 7_000);
        assert_eq!(engine.staker(&x).unwrap().unwrap().min_staked_at(2), 0);
        assert_eq!(engine.staker(&y).unwrap().unwrap().min_staked_at(2), 0);
    }

    /// The global minimum can exceed the sum of per-staker minima when two
    /// stakers bottom out at different instants.
    #[test]
    fn global_min_is_not_sum_of_staker_minima() {
        let engine = test_engine("global_min_sum");
        let (a, b) = (acct(1), acct(2));
        engine.set_stake(&a, 100, at(1, 0)).unwrap();
        engine.set_stake(&b, 100, at(1, 1)).unwrap();

        engine.set_stake(&a, 50, at(2, 1)).unwrap();
        engine.set_stake(&a, 100, at(2, 2)).unwrap();
        engine.set_stake(&b, 50, at(2, 3)).unwrap();

        let a_min = engine.staker(&a).unwrap().unwrap().min_staked_at(2);
        let b_min = engine.staker(&b).unwrap().unwrap().min_staked_at(2);
        let g_min = engine.global().unwrap().min_staked_at(2);
        assert_eq!((a_min, b_min), (50, 50));
        assert_eq!(g_min, 150);
        assert!(g_min > a_min + b_min);
    }

    // ── Stuck rewards guard ───────────────────────────────────────────────────

    #[test]
    fn exit_clears_unrewarded_finalized_epochs() {
        let engine = test_engine("stuck_cleared");
        let alice = acct(1);
        engine.set_stake(&alice, 7_000, at(1, 0)).unwrap();

        let events = engine.set_stake(&alice, 0, at(3, 0)).unwrap();
        assert_eq!(
            events,
            vec![
                LedgerEvent::StuckRewardsAvoided {
                    staker: alice.clone(),
                    epoch: 1,
                    cleared_min: 0,
                    cleared_last: 7_000,
                },
                LedgerEvent::StuckRewardsAvoided {
                    staker: alice.clone(),
                    epoch: 2,
                    cleared_min: 7_000,
                    cleared_last: 7_000,
                },
                LedgerEvent::PositionRemoved { staker: alice.clone(), amount: 7_000 },
            ]
        );

        let s = engine.staker(&alice).unwrap().unwrap();
        let g = engine.global().unwrap();
        for epoch in 1..3 {
            assert_eq!(s.min_staked_at(epoch), 0);
            assert_eq!(s.last_staked_at(epoch), 0);
            assert_eq!(g.min_staked_at(epoch), 0);
            assert_eq!(g.last_staked_at(epoch), 0);
        }
    }

    #[test]
    fn exit_keeps_rewarded_epochs_intact() {
        let engine = test_engine("stuck_rewarded");
        let alice = acct(1);
        engine.set_stake(&alice, 7_000, at(1, 0)).unwrap();

        let now = at(3, 0);
        engine.set_rewards(&setter(), 1, 10, 0, now).unwrap();
        engine.set_rewards(&setter(), 2, 10, 0, now).unwrap();

        let events = engine.set_stake(&alice, 0, at(3, 50)).unwrap();
        assert_eq!(
            events,
            vec![LedgerEvent::PositionRemoved { staker: alice.clone(), amount: 7_000 }]
        );
        let s = engine.staker(&alice).unwrap().unwrap();
        assert_eq!(s.min_staked_at(2), 7_000);
        assert_eq!(s.last_staked_at(2), 7_000);
        assert_eq!(engine.global().unwrap().min_staked_at(2), 7_000);
    }

    #[test]
    fn guard_clears_only_past_the_reward_cursor() {
        let engine = test_engine("stuck_partial");
        let alice = acct(1);
        engine.set_stake(&alice, 7_000, at(1, 0)).unwrap();
        engine.set_rewards(&setter(), 1, 10, 0, at(3, 0)).unwrap();

        let events = engine.set_stake(&alice, 0, at(3, 10)).unwrap();
        assert_eq!(
            events,
            vec![
                LedgerEvent::StuckRewardsAvoided {
                    staker: alice.clone(),
                    epoch: 2,
                    cleared_min: 7_000,
                    cleared_last: 7_000,
                },
                LedgerEvent::PositionRemoved { staker: alice.clone(), amount: 7_000 },
            ]
        );
        // Epoch 1 is already rewarded and stays collectible.
        let s = engine.staker(&alice).unwrap().unwrap();
        assert_eq!(s.last_staked_at(1), 7_000);
        assert_eq!(engine.global().unwrap().last_staked_at(1), 7_000);
    }

    /// The aggregate is reduced by the exiting staker's snapshot, so the
    /// remaining staker later collects the whole reward; no ghost claimant.
    #[test]
    fn guard_leaves_no_ghost_dilution() {
        let engine = test_engine("stuck_no_ghost");
        let (a, b) = (acct(1), acct(2));
        engine.set_stake(&a, 1_000, at(1, 0)).unwrap();
        engine.set_stake(&b, 500, at(1, 1)).unwrap();

        engine.set_stake(&b, 0, at(3, 0)).unwrap();
        let g = engine.global().unwrap();
        assert_eq!(g.min_staked_at(2), 1_000);
        assert_eq!(g.last_staked_at(2), 1_000);

        let now = at(3, 10);
        engine.set_rewards(&setter(), 1, 5, 5, now).unwrap();
        engine.set_rewards(&setter(), 2, 900, 0, now).unwrap();

        engine.update_unclaimed_rewards(&a, now).unwrap();
        let s = engine.staker(&a).unwrap().unwrap();
        assert_eq!(s.unclaimed, RewardPair::new(900, 0));
    }

    // ── Standalone catch-up ───────────────────────────────────────────────────

    #[test]
    fn standalone_catch_up_is_idempotent() {
        let engine = test_engine("catchup_idem");
        let alice = acct(1);
        engine.set_stake(&alice, 300, at(1, 0)).unwrap();

        let now = at(5, 0);
        engine.update_staker_previous_epochs(&alice, Some(4), now).unwrap();
        let first = engine.staker(&alice).unwrap().unwrap();
        assert_eq!(first.last_epoch_staking_updated, 3);
        assert_eq!(first.min_staked_at(3), 300);

        engine.update_staker_previous_epochs(&alice, Some(4), now).unwrap();
        assert_eq!(engine.staker(&alice).unwrap().unwrap(), first);

        engine.update_global_previous_epochs(4, now).unwrap();
        let g = engine.global().unwrap();
        engine.update_global_previous_epochs(4, now).unwrap();
        assert_eq!(engine.global().unwrap(), g);
    }

    #[test]
    fn catch_up_rejects_future_target() {
        let engine = test_engine("catchup_future");
        let alice = acct(1);
        engine.set_stake(&alice, 300, at(1, 0)).unwrap();

        let now = at(2, 0);
        assert!(matches!(
            engine.update_staker_previous_epochs(&alice, Some(3), now),
            Err(LedgerError::CatchUpBeyondCurrent { until: 3, current: 2 })
        ));
        assert!(matches!(
            engine.update_global_previous_epochs(3, now),
            Err(LedgerError::CatchUpBeyondCurrent { until: 3, current: 2 })
        ));
        // The current epoch itself is a valid target.
        engine.update_staker_previous_epochs(&alice, Some(2), now).unwrap();
        engine.update_global_previous_epochs(2, now).unwrap();
    }

    #[test]
    fn catch_up_requires_existing_staker() {
        let engine = test_engine("catchup_exists");
        assert!(matches!(
            engine.update_staker_previous_epochs(&acct(9), None, at(1, 0)),
            Err(LedgerError::StakerNotFound(_))
        ));
    }

    // ── Claim flow ────────────────────────────────────────────────────────────

    #[test]
    fn claim_with_nothing_accrued_is_silent() {
        let engine = test_engine("claim_silent");
        let alice = acct(1);
        engine.set_stake(&alice, 100, at(1, 0)).unwrap();

        let events = engine.claim_rewards(&alice, at(1, 5)).unwrap();
        assert!(events.is_empty());
        let s = engine.staker(&alice).unwrap().unwrap();
        assert!(s.unclaimed.is_zero());
        assert!(s.cumulative.is_zero());
    }

    #[test]
    fn delegated_claim_pays_the_delegate() {
        let engine = test_engine("delegated");
        let alice = acct(1);
        engine.set_stake(&alice, 20_000, at(1, 0)).unwrap();

        let now = at(3, 0);
        engine.set_rewards(&setter(), 1, 1, 1, now).unwrap();
        engine.set_rewards(&setter(), 2, 100, 3_000, now).unwrap();
        engine.set_accepts_delegated_claims(&alice, true).unwrap();

        let events = engine
            .claim_rewards_on_behalf_of(&delegate(), &alice, now)
            .unwrap();
        assert!(events.contains(&LedgerEvent::RewardsClaimed {
            staker: alice.clone(),
            recipient: delegate(),
            asset_amount: 100,
            secondary_amount: 3_000,
        }));
        assert!(events.contains(&LedgerEvent::TokenWithdrawn {
            token: RewardToken::Asset,
            to: delegate(),
            amount: 100,
        }));
    }

    #[test]
    fn delegated_claim_requires_role_and_opt_in() {
        let engine = test_engine("delegated_auth");
        let alice = acct(1);
        engine.set_stake(&alice, 100, at(1, 0)).unwrap();

        assert!(matches!(
            engine.claim_rewards_on_behalf_of(&acct(9), &alice, at(1, 5)),
            Err(LedgerError::NotDelegatedClaimer(_))
        ));
        assert!(matches!(
            engine.claim_rewards_on_behalf_of(&delegate(), &alice, at(1, 5)),
            Err(LedgerError::DelegationNotAccepted(_))
        ));
    }

    #[test]
    fn opt_in_requires_existing_staker() {
        let engine = test_engine("opt_in_exists");
        assert!(matches!(
            engine.set_accepts_delegated_claims(&acct(9), true),
            Err(LedgerError::StakerNotFound(_))
        ));
    }

    // ── Snapshots ─────────────────────────────────────────────────────────────

    #[test]
    fn snapshot_accessors_respect_the_horizon() {
        let engine = test_engine("snapshots");
        let alice = acct(1);
        engine.set_stake(&alice, 400, at(1, 0)).unwrap();
        engine.set_stake(&alice, 600, at(3, 0)).unwrap();

        assert_eq!(engine.staker_snapshot(&alice, 0).unwrap(), None);
        assert_eq!(engine.staker_snapshot(&alice, 2).unwrap(), Some((400, 400)));
        assert_eq!(engine.staker_snapshot(&alice, 3).unwrap(), Some((400, 600)));
        assert_eq!(engine.staker_snapshot(&alice, 4).unwrap(), None);
        assert_eq!(engine.staker_snapshot(&acct(9), 1).unwrap(), None);

        assert_eq!(engine.global_snapshot(2).unwrap(), Some((400, 400)));
        assert_eq!(engine.global_snapshot(4).unwrap(), None);
    }
}
