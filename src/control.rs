//! Hysteresis decision logic

use crate::miner::Activity;

/// Decision for one miner in one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Stop,
    Resume,
    NoAction,
}

/// Strict hysteresis with independent per-miner thresholds.
///
/// Never acts on an uncertain activity reading, and equality at either
/// threshold is NoAction so the controller cannot chatter exactly at the
/// boundary.
pub fn decide(soc: f64, activity: &Activity, stop_soc: f64, resume_soc: f64) -> Action {
    match activity {
        Activity::Unknown(_) => Action::NoAction,
        Activity::Active if soc < stop_soc => Action::Stop,
        Activity::Idle if soc > resume_soc => Action::Resume,
        _ => Action::NoAction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STOP: f64 = 73.0;
    const RESUME: f64 = 75.0;

    #[test]
    fn test_active_below_stop_threshold_stops() {
        // Scenario A
        assert_eq!(decide(72.9, &Activity::Active, STOP, RESUME), Action::Stop);
    }

    #[test]
    fn test_inside_dead_band_holds() {
        // Scenario B
        assert_eq!(
            decide(74.0, &Activity::Active, STOP, RESUME),
            Action::NoAction
        );
        assert_eq!(
            decide(74.0, &Activity::Idle, STOP, RESUME),
            Action::NoAction
        );
    }

    #[test]
    fn test_idle_above_resume_threshold_resumes() {
        // Scenario C
        assert_eq!(decide(75.1, &Activity::Idle, STOP, RESUME), Action::Resume);
    }

    #[test]
    fn test_equality_at_thresholds_holds() {
        assert_eq!(
            decide(STOP, &Activity::Active, STOP, RESUME),
            Action::NoAction
        );
        assert_eq!(
            decide(RESUME, &Activity::Idle, STOP, RESUME),
            Action::NoAction
        );
    }

    #[test]
    fn test_unknown_always_holds() {
        let unknown = Activity::Unknown("no usable fields".to_string());
        for soc in [0.0, 50.0, 72.9, 75.1, 100.0] {
            assert_eq!(decide(soc, &unknown, STOP, RESUME), Action::NoAction);
        }
    }

    #[test]
    fn test_already_in_target_state_holds() {
        // Idle below the stop threshold: nothing left to stop.
        assert_eq!(
            decide(50.0, &Activity::Idle, STOP, RESUME),
            Action::NoAction
        );
        // Active above the resume threshold: nothing to start.
        assert_eq!(
            decide(90.0, &Activity::Active, STOP, RESUME),
            Action::NoAction
        );
    }

    #[test]
    fn test_inverted_band_still_behaves_strictly() {
        // Misconfigured resume <= stop: decisions stay well defined.
        assert_eq!(decide(70.0, &Activity::Active, 75.0, 73.0), Action::Stop);
        assert_eq!(decide(74.0, &Activity::Idle, 75.0, 73.0), Action::Resume);
        assert_eq!(decide(74.0, &Activity::Active, 75.0, 73.0), Action::Stop);
    }
}
