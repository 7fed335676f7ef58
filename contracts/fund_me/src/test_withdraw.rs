use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::invariants::{assert_all_invariants, assert_guard_released};
use crate::testutils::{setup, setup_with_callback, ALICE, BOB, CAROL, OWNER, TENTH};
use crate::{FundMeError, FunderStatus, GuardState, WAD};

// ─────────────────────────────────────────────────────────
// Depositor withdrawals
// ─────────────────────────────────────────────────────────

#[test]
fn test_full_withdrawal_clears_registry_membership() {
    let (fund, _, transfer) = setup();
    fund.deposit(ALICE, TENTH).unwrap();

    let sent = fund.withdraw_full(ALICE).unwrap();

    assert_eq!(sent, TENTH);
    assert_eq!(fund.balance_of(&ALICE), 0);
    assert!(!fund.is_active_funder(&ALICE));
    assert_eq!(transfer.sent(), vec![(ALICE, TENTH)]);
    assert_all_invariants(&fund);
}

#[test]
fn test_partial_withdrawal_keeps_membership_while_balance_remains() {
    let (fund, _, transfer) = setup();
    fund.deposit(ALICE, TENTH).unwrap();

    let remaining = fund.withdraw_partial(ALICE, TENTH / 2).unwrap();

    assert_eq!(remaining, TENTH / 2);
    assert_eq!(fund.balance_of(&ALICE), WAD / 20);
    assert!(fund.is_active_funder(&ALICE));
    assert_eq!(transfer.sent(), vec![(ALICE, TENTH / 2)]);
    assert_all_invariants(&fund);
}

#[test]
fn test_partial_withdrawal_to_zero_leaves_registry() {
    let (fund, _, _) = setup();
    fund.deposit(ALICE, TENTH).unwrap();

    fund.withdraw_partial(ALICE, TENTH / 2).unwrap();
    fund.withdraw_partial(ALICE, TENTH / 2).unwrap();

    assert_eq!(fund.status_of(&ALICE), FunderStatus::NotFunder);
    assert_all_invariants(&fund);
}

#[test]
fn test_partial_withdrawal_requires_active_funder() {
    let (fund, _, transfer) = setup();
    assert_eq!(
        fund.withdraw_partial(ALICE, 1),
        Err(FundMeError::NotAnActiveFunder(ALICE))
    );
    assert!(transfer.sent().is_empty());
    assert_guard_released(&fund);
}

#[test]
fn test_partial_withdrawal_beyond_balance_fails_cleanly() {
    let (fund, _, transfer) = setup();
    fund.deposit(ALICE, TENTH).unwrap();
    fund.drain_events();

    let err = fund.withdraw_partial(ALICE, TENTH + 1).unwrap_err();

    assert_eq!(
        err,
        FundMeError::InsufficientBalance {
            requested: TENTH + 1,
            available: TENTH,
        }
    );
    assert_eq!(fund.balance_of(&ALICE), TENTH);
    assert!(transfer.sent().is_empty());
    assert_eq!(fund.pending_events(), 0);
    assert_all_invariants(&fund);
}

#[test]
fn test_zero_partial_withdrawal_is_rejected() {
    let (fund, _, _) = setup();
    fund.deposit(ALICE, TENTH).unwrap();
    assert_eq!(fund.withdraw_partial(ALICE, 0), Err(FundMeError::InvalidAmount));
    assert_guard_released(&fund);
}

#[test]
fn test_full_withdrawal_with_nothing_deposited() {
    let (fund, _, _) = setup();
    assert!(matches!(
        fund.withdraw_full(ALICE),
        Err(FundMeError::InsufficientBalance { .. })
    ));
    assert_guard_released(&fund);
}

#[test]
fn test_withdrawal_swaps_last_funder_into_gap() {
    let (fund, _, _) = setup();
    for who in [ALICE, BOB, CAROL] {
        fund.deposit(who, TENTH).unwrap();
    }

    fund.withdraw_full(BOB).unwrap();

    assert_eq!(fund.funders(), vec![ALICE, CAROL]);
    assert_eq!(fund.funder_at(1), Ok(CAROL));
    assert_eq!(fund.funder_count(), 2);
    assert_all_invariants(&fund);
}

// ─────────────────────────────────────────────────────────
// Failed transfers roll back
// ─────────────────────────────────────────────────────────

#[test]
fn test_failed_transfer_restores_partial_debit() {
    let (fund, _, transfer) = setup();
    fund.deposit(ALICE, TENTH).unwrap();
    fund.drain_events();
    transfer.fail_next_sends(true);

    let err = fund.withdraw_partial(ALICE, TENTH).unwrap_err();

    assert_eq!(
        err,
        FundMeError::TransferFailed {
            to: ALICE,
            amount: TENTH
        }
    );
    assert_eq!(fund.balance_of(&ALICE), TENTH);
    assert!(fund.is_active_funder(&ALICE));
    assert_eq!(fund.pending_events(), 0);
    assert_all_invariants(&fund);
}

#[test]
fn test_failed_transfer_restores_full_debit() {
    let (fund, _, transfer) = setup();
    fund.deposit(ALICE, TENTH).unwrap();
    fund.deposit(BOB, TENTH).unwrap();
    transfer.fail_next_sends(true);

    assert!(fund.withdraw_full(ALICE).is_err());

    assert_eq!(fund.funders(), vec![ALICE, BOB]);
    assert_eq!(fund.total_funds(), 2 * TENTH);
    assert_all_invariants(&fund);

    transfer.fail_next_sends(false);
    assert_eq!(fund.withdraw_full(ALICE), Ok(TENTH));
}

#[test]
fn test_panicking_recipient_releases_guard_and_restores_debit() {
    let fund = setup_with_callback(|_, _, _| panic!("recipient exploded"));
    fund.deposit(ALICE, TENTH).unwrap();

    let outcome = catch_unwind(AssertUnwindSafe(|| fund.withdraw_full(ALICE)));

    assert!(outcome.is_err());
    assert_eq!(fund.balance_of(&ALICE), TENTH);
    assert_all_invariants(&fund);
}

// ─────────────────────────────────────────────────────────
// Reentrancy
// ─────────────────────────────────────────────────────────

#[test]
fn test_reentrant_withdrawal_is_rejected() {
    let attempts = Arc::new(Mutex::new(Vec::new()));
    let seen = attempts.clone();
    let fund = setup_with_callback(move |fund, to, _| {
        seen.lock().push(fund.withdraw_full(to));
        true
    });
    fund.deposit(ALICE, TENTH).unwrap();

    assert_eq!(fund.withdraw_full(ALICE), Ok(TENTH));

    assert_eq!(*attempts.lock(), vec![Err(FundMeError::Reentrancy)]);
    assert_eq!(fund.balance_of(&ALICE), 0);
    assert_all_invariants(&fund);
}

#[test]
fn test_guard_is_system_wide() {
    let attempts = Arc::new(Mutex::new(Vec::new()));
    let seen = attempts.clone();
    let fund = setup_with_callback(move |fund, _, _| {
        // A different funder, and every other mutating entry point.
        let mut log = seen.lock();
        log.push(fund.withdraw_partial(BOB, 1).map(|_| ()));
        log.push(fund.deposit(BOB, TENTH).map(|_| ()));
        log.push(fund.change_funder(BOB, CAROL).map(|_| ()));
        log.push(fund.owner_withdraw_all(OWNER).map(|_| ()));
        log.push(fund.set_minimum_usd(OWNER, 1));
        true
    });
    fund.deposit(ALICE, TENTH).unwrap();
    fund.deposit(BOB, TENTH).unwrap();

    fund.withdraw_partial(ALICE, TENTH / 2).unwrap();

    let log = attempts.lock();
    assert_eq!(log.len(), 5);
    assert!(log.iter().all(|r| *r == Err(FundMeError::Reentrancy)));
    assert_eq!(fund.balance_of(&BOB), TENTH);
    assert_all_invariants(&fund);
}

#[test]
fn test_recipient_observes_debit_before_transfer() {
    let observed = Arc::new(Mutex::new(None));
    let seen = observed.clone();
    let fund = setup_with_callback(move |fund, to, _| {
        *seen.lock() = Some((fund.balance_of(&to), fund.guard_state()));
        true
    });
    fund.deposit(ALICE, 3 * TENTH).unwrap();

    fund.withdraw_partial(ALICE, TENTH).unwrap();

    assert_eq!(
        *observed.lock(),
        Some((2 * TENTH, GuardState::InProgress))
    );
    assert_guard_released(&fund);
}

#[test]
fn test_refusing_recipient_cannot_drain_twice() {
    let fund = setup_with_callback(|fund, to, _| {
        let _ = fund.withdraw_full(to);
        false
    });
    fund.deposit(ALICE, TENTH).unwrap();

    assert!(matches!(
        fund.withdraw_full(ALICE),
        Err(FundMeError::TransferFailed { .. })
    ));
    assert_eq!(fund.balance_of(&ALICE), TENTH);
    assert_all_invariants(&fund);
}

// ─────────────────────────────────────────────────────────
// Identity transfer
// ─────────────────────────────────────────────────────────

#[test]
fn test_change_funder_moves_balance() {
    let (fund, _, transfer) = setup();
    fund.deposit(ALICE, TENTH).unwrap();
    fund.deposit(BOB, TENTH).unwrap();

    assert_eq!(fund.change_funder(ALICE, CAROL), Ok(TENTH));

    assert_eq!(fund.balance_of(&ALICE), 0);
    assert_eq!(fund.balance_of(&CAROL), TENTH);
    assert!(!fund.is_active_funder(&ALICE));
    assert_eq!(fund.funders(), vec![BOB, CAROL]);
    assert_eq!(fund.total_funds(), 2 * TENTH);
    assert!(transfer.sent().is_empty());
    assert_all_invariants(&fund);
}

#[test]
fn test_change_funder_merges_into_active_funder() {
    let (fund, _, _) = setup();
    fund.deposit(ALICE, TENTH).unwrap();
    fund.deposit(BOB, 2 * TENTH).unwrap();

    fund.change_funder(ALICE, BOB).unwrap();

    assert_eq!(fund.balance_of(&BOB), 3 * TENTH);
    assert_eq!(fund.funders(), vec![BOB]);
    assert_all_invariants(&fund);
}

#[test]
fn test_change_funder_rejections() {
    let (fund, _, _) = setup();
    fund.deposit(ALICE, TENTH).unwrap();

    assert_eq!(
        fund.change_funder(BOB, CAROL),
        Err(FundMeError::NotAnActiveFunder(BOB))
    );
    assert_eq!(fund.change_funder(ALICE, ALICE), Err(FundMeError::NoOpChange));
    assert_eq!(fund.balance_of(&ALICE), TENTH);
    assert_all_invariants(&fund);
}

// ─────────────────────────────────────────────────────────
// Owner sweep
// ─────────────────────────────────────────────────────────

#[test]
fn test_owner_withdraw_all_sweeps_everything() {
    let (fund, _, transfer) = setup();
    for who in [ALICE, BOB, CAROL] {
        fund.deposit(who, TENTH).unwrap();
    }

    assert_eq!(fund.owner_withdraw_all(OWNER), Ok(3 * TENTH));

    assert_eq!(transfer.sent(), vec![(OWNER, 3 * TENTH)]);
    assert_eq!(fund.total_funds(), 0);
    assert_eq!(fund.funder_count(), 0);
    for who in [ALICE, BOB, CAROL] {
        assert_eq!(fund.balance_of(&who), 0);
        assert!(!fund.is_active_funder(&who));
    }
    assert_all_invariants(&fund);

    // The ledger is usable again afterwards.
    fund.deposit(BOB, TENTH).unwrap();
    assert_eq!(fund.funder_at(0), Ok(BOB));
}

#[test]
fn test_non_owner_sweep_is_unauthorized() {
    let (fund, _, transfer) = setup();
    fund.deposit(ALICE, TENTH).unwrap();
    fund.drain_events();

    assert_eq!(
        fund.owner_withdraw_all(ALICE),
        Err(FundMeError::Unauthorized(ALICE))
    );
    assert_eq!(fund.balance_of(&ALICE), TENTH);
    assert!(fund.is_active_funder(&ALICE));
    assert!(transfer.sent().is_empty());
    assert_eq!(fund.pending_events(), 0);
}

#[test]
fn test_failed_owner_sweep_clears_nothing() {
    let (fund, _, transfer) = setup();
    fund.deposit(ALICE, TENTH).unwrap();
    fund.deposit(BOB, TENTH).unwrap();
    transfer.fail_next_sends(true);

    assert_eq!(
        fund.owner_withdraw_all(OWNER),
        Err(FundMeError::TransferFailed {
            to: OWNER,
            amount: 2 * TENTH
        })
    );
    assert_eq!(fund.funders(), vec![ALICE, BOB]);
    assert_eq!(fund.total_funds(), 2 * TENTH);
    assert_all_invariants(&fund);
}

#[test]
fn test_sweep_of_empty_ledger_sends_nothing() {
    let (fund, _, transfer) = setup();
    assert_eq!(fund.owner_withdraw_all(OWNER), Ok(0));
    assert!(transfer.sent().is_empty());
}
