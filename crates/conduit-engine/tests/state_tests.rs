use conduit_engine::state_machine::{allowed_transitions, validate_transition, PhaseTracker};
use conduit_engine::SyncPhase;
use proptest::prelude::*;

#[test]
fn test_idle_transitions() {
    assert!(validate_transition(SyncPhase::Idle, SyncPhase::Walking).is_ok());
    assert!(validate_transition(SyncPhase::Idle, SyncPhase::Cancelled).is_ok());
    assert!(validate_transition(SyncPhase::Idle, SyncPhase::Failed).is_ok());

    assert!(validate_transition(SyncPhase::Idle, SyncPhase::Converting).is_err());
    assert!(validate_transition(SyncPhase::Idle, SyncPhase::Done).is_err());
}

#[test]
fn test_pure_phases_cannot_fail() {
    assert!(validate_transition(SyncPhase::Scheduling, SyncPhase::Failed).is_err());
    assert!(validate_transition(SyncPhase::Reconciling, SyncPhase::Failed).is_err());
    assert!(validate_transition(SyncPhase::Reconciling, SyncPhase::Cancelled).is_ok());
}

#[test]
fn test_tracker_rejects_and_keeps_state() {
    let mut tracker = PhaseTracker::new();
    tracker.advance(SyncPhase::Walking).unwrap();
    assert!(tracker.advance(SyncPhase::Applying).is_err());
    assert_eq!(tracker.current(), SyncPhase::Walking);
    assert_eq!(tracker.history(), [SyncPhase::Idle, SyncPhase::Walking]);
}

fn any_phase() -> impl Strategy<Value = SyncPhase> {
    prop::sample::select(SyncPhase::ALL.to_vec())
}

proptest! {
    #[test]
    fn prop_validation_matches_allowed_table(from in any_phase(), to in any_phase()) {
        let res = validate_transition(from, to);
        let allowed = allowed_transitions(from);

        if res.is_ok() {
            prop_assert!(allowed.contains(&to));
        } else {
            prop_assert!(!allowed.contains(&to));
        }
    }

    #[test]
    fn prop_terminal_phases_are_absorbing(from in any_phase(), to in any_phase()) {
        if from.is_terminal() {
            prop_assert!(validate_transition(from, to).is_err());
        }
    }

    #[test]
    fn prop_random_walks_end_in_history(steps in prop::collection::vec(any_phase(), 0..20)) {
        let mut tracker = PhaseTracker::new();
        for to in steps {
            let _ = tracker.advance(to);
        }
        prop_assert_eq!(tracker.history().last().copied(), Some(tracker.current()));
        prop_assert_eq!(tracker.history()[0], SyncPhase::Idle);
    }
}
