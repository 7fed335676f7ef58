use crate::testutils::{setup, ALICE, BOB, OWNER, TENTH};
use crate::{FundMeEvent, DEFAULT_MINIMUM_USD, WAD};

#[test]
fn test_funded_event() {
    let (fund, _, _) = setup();

    fund.deposit(ALICE, TENTH).unwrap();

    let events = fund.drain_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].seq, 0);
    assert_eq!(
        events[0].event,
        FundMeEvent::Funded {
            funder: ALICE,
            amount: TENTH,
            usd_value: 200 * WAD,
        }
    );
}

#[test]
fn test_full_withdrawal_events() {
    let (fund, _, _) = setup();
    fund.deposit(ALICE, TENTH).unwrap();
    fund.drain_events();

    fund.withdraw_full(ALICE).unwrap();

    let kinds: Vec<_> = fund
        .drain_events()
        .into_iter()
        .map(|e| e.event)
        .collect();
    assert_eq!(
        kinds,
        vec![
            FundMeEvent::Withdrawn {
                funder: ALICE,
                amount: TENTH,
                remaining: 0,
            },
            FundMeEvent::FunderRemoved { funder: ALICE },
        ]
    );
}

#[test]
fn test_partial_withdrawal_keeps_funder_event_free() {
    let (fund, _, _) = setup();
    fund.deposit(ALICE, TENTH).unwrap();
    fund.drain_events();

    fund.withdraw_partial(ALICE, TENTH / 4).unwrap();

    let events = fund.drain_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event.as_str(), "withdrawn");
}

#[test]
fn test_failed_operations_publish_nothing() {
    let (fund, _, transfer) = setup();
    fund.deposit(ALICE, TENTH).unwrap();
    fund.drain_events();

    let _ = fund.deposit(BOB, 1);
    let _ = fund.withdraw_partial(BOB, 1);
    let _ = fund.set_minimum_usd(OWNER, DEFAULT_MINIMUM_USD);
    let _ = fund.owner_withdraw_all(ALICE);
    transfer.fail_next_sends(true);
    let _ = fund.withdraw_full(ALICE);

    assert!(fund.drain_events().is_empty());
}

#[test]
fn test_sequence_numbers_survive_drains() {
    let (fund, _, _) = setup();

    fund.deposit(ALICE, TENTH).unwrap();
    let first = fund.drain_events();
    fund.deposit(BOB, TENTH).unwrap();
    fund.set_minimum_usd(OWNER, 10 * WAD).unwrap();
    let second = fund.drain_events();

    assert_eq!(first.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![0]);
    assert_eq!(second.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(
        second[1].event,
        FundMeEvent::MinimumUsdChanged {
            old: DEFAULT_MINIMUM_USD,
            new: 10 * WAD,
        }
    );
}

#[test]
fn test_owner_sweep_and_identity_change_events() {
    let (fund, _, _) = setup();
    fund.deposit(ALICE, TENTH).unwrap();
    fund.deposit(BOB, TENTH).unwrap();
    fund.change_funder(ALICE, OWNER).unwrap();
    fund.owner_withdraw_all(OWNER).unwrap();

    let events: Vec<_> = fund.drain_events().into_iter().map(|e| e.event).collect();
    assert_eq!(
        &events[2..],
        &[
            FundMeEvent::FunderChanged {
                from: ALICE,
                to: OWNER,
                amount: TENTH,
            },
            FundMeEvent::OwnerSwept {
                owner: OWNER,
                amount: 2 * TENTH,
                funders_cleared: 2,
            },
        ]
    );
}

#[test]
fn test_event_json_shape() {
    let (fund, _, _) = setup();
    fund.deposit(ALICE, TENTH).unwrap();

    let event = &fund.drain_events()[0];
    let json = serde_json::to_value(event).unwrap();

    assert_eq!(json["seq"], 0);
    assert_eq!(json["kind"], "funded");
    assert_eq!(
        json["funder"],
        "0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1"
    );
    assert_eq!(json["amount"], "100000000000000000");
    assert_eq!(json["usd_value"], "200000000000000000000");
    assert_eq!(event.event.actor(), Some(ALICE));
    assert_eq!(event.event.amount(), Some(TENTH));
}

#[test]
fn test_identity_change_names_both_parties() {
    let (fund, _, _) = setup();
    fund.deposit(ALICE, TENTH).unwrap();
    fund.deposit(BOB, TENTH).unwrap();
    fund.drain_events();

    fund.change_funder(ALICE, BOB).unwrap();

    let events = fund.drain_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event.actor(), Some(ALICE));
    assert_eq!(events[0].event.counterparty(), Some(BOB));
    assert_eq!(events[0].event.amount(), Some(TENTH));

    let funded = FundMeEvent::Funded {
        funder: ALICE,
        amount: 1,
        usd_value: 1,
    };
    assert_eq!(funded.counterparty(), None);
}
