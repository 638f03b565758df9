//! Per-tick orchestration over the miner fleet
//!
//! Every member is judged against the same SoC reading within a tick, and a
//! failing member never prevents the others from being evaluated.

use tracing::{debug, error, info};

use crate::control::{decide, Action};
use crate::errors::MinerError;
use crate::miner::{Activity, MinerApi, MinerSession};

/// What the control cycle needs from a device.
pub trait Rig {
    fn label(&self) -> &str;
    fn activity(&mut self) -> Result<Activity, MinerError>;
    fn set_mining(&mut self, start: bool) -> Result<(), MinerError>;
}

impl<A: MinerApi> Rig for MinerSession<A> {
    fn label(&self) -> &str {
        self.addr()
    }

    fn activity(&mut self) -> Result<Activity, MinerError> {
        MinerSession::activity(self)
    }

    fn set_mining(&mut self, start: bool) -> Result<(), MinerError> {
        MinerSession::set_mining(self, start)
    }
}

/// Ticks a commanded state may go unconfirmed before the command is
/// reissued. Bounds the suppression window in case a rig acknowledged a
/// command (500 = already in state) without actually changing state.
const MAX_UNCONFIRMED_TICKS: u8 = 3;

/// Per-miner controller bookkeeping.
#[derive(Debug, Default)]
struct RigState {
    /// Desired mining state last successfully commanded, cleared once the
    /// observed activity confirms it. Suppresses reissuing the same command
    /// every tick while the rig is still transitioning.
    last_desired: Option<bool>,
    /// Ticks the pending command has gone unconfirmed.
    unconfirmed: u8,
    /// Cumulative error count, for observability only.
    errors: u64,
}

struct Member<R> {
    rig: R,
    stop_soc: f64,
    resume_soc: f64,
    state: RigState,
}

/// The full set of controlled rigs.
pub struct Fleet<R> {
    members: Vec<Member<R>>,
}

impl<R> Default for Fleet<R> {
    fn default() -> Self {
        Self {
            members: Vec::new(),
        }
    }
}

impl<R: Rig> Fleet<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rig: R, stop_soc: f64, resume_soc: f64) {
        self.members.push(Member {
            rig,
            stop_soc,
            resume_soc,
            state: RigState::default(),
        });
    }

    /// One full pass over all members with the tick's SoC reading.
    pub fn run_tick(&mut self, soc: f64) {
        for member in &mut self.members {
            member.evaluate(soc);
        }
    }

    pub fn total_errors(&self) -> u64 {
        self.members.iter().map(|m| m.state.errors).sum()
    }
}

impl<R: Rig> Member<R> {
    fn evaluate(&mut self, soc: f64) {
        let activity = match self.rig.activity() {
            Ok(activity) => activity,
            Err(e) => {
                self.state.errors += 1;
                error!(
                    miner = %self.rig.label(),
                    errors = self.state.errors,
                    "status query failed: {e}"
                );
                return;
            }
        };

        // A confirmed state change retires the pending-command marker.
        match &activity {
            Activity::Active if self.state.last_desired == Some(true) => {
                self.state.last_desired = None;
            }
            Activity::Idle if self.state.last_desired == Some(false) => {
                self.state.last_desired = None;
            }
            Activity::Unknown(reason) => {
                debug!(miner = %self.rig.label(), "activity unknown, holding: {reason}");
            }
            _ => {}
        }

        let desired = match decide(soc, &activity, self.stop_soc, self.resume_soc) {
            Action::NoAction => return,
            Action::Stop => false,
            Action::Resume => true,
        };

        if self.state.last_desired == Some(desired) {
            self.state.unconfirmed += 1;
            if self.state.unconfirmed < MAX_UNCONFIRMED_TICKS {
                debug!(
                    miner = %self.rig.label(),
                    "command already issued, awaiting state change"
                );
                return;
            }
            // Acknowledged but never took effect: stop suppressing.
            debug!(
                miner = %self.rig.label(),
                "command unconfirmed after {} ticks, reissuing",
                self.state.unconfirmed
            );
            self.state.last_desired = None;
        }

        match self.rig.set_mining(desired) {
            Ok(()) => {
                let verb = if desired { "started" } else { "stopped" };
                info!(miner = %self.rig.label(), "SoC {soc:.1}% -> mining {verb}");
                self.state.last_desired = Some(desired);
                self.state.unconfirmed = 0;
            }
            Err(e) => {
                self.state.errors += 1;
                error!(
                    miner = %self.rig.label(),
                    errors = self.state.errors,
                    "command failed: {e}"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct StubRig {
        label: String,
        activities: VecDeque<Result<Activity, MinerError>>,
        commands: Vec<bool>,
        fail_commands: bool,
    }

    impl StubRig {
        fn new(label: &str) -> Self {
            Self {
                label: label.to_string(),
                activities: VecDeque::new(),
                commands: Vec::new(),
                fail_commands: false,
            }
        }

        fn reporting(mut self, activity: Activity) -> Self {
            self.activities.push_back(Ok(activity));
            self
        }

        fn failing_status(mut self) -> Self {
            self.activities
                .push_back(Err(MinerError::Unreachable("no route to host".to_string())));
            self
        }
    }

    impl Rig for StubRig {
        fn label(&self) -> &str {
            &self.label
        }

        fn activity(&mut self) -> Result<Activity, MinerError> {
            self.activities
                .pop_front()
                .unwrap_or(Ok(Activity::Idle))
        }

        fn set_mining(&mut self, start: bool) -> Result<(), MinerError> {
            if self.fail_commands {
                return Err(MinerError::CommandFailed(503));
            }
            self.commands.push(start);
            Ok(())
        }
    }

    #[test]
    fn test_low_soc_stops_active_rig() {
        let mut fleet = Fleet::new();
        fleet.push(StubRig::new("rig-a").reporting(Activity::Active), 73.0, 75.0);

        fleet.run_tick(72.9);

        assert_eq!(fleet.members[0].rig.commands, vec![false]);
    }

    #[test]
    fn test_dead_band_issues_nothing() {
        let mut fleet = Fleet::new();
        fleet.push(StubRig::new("rig-a").reporting(Activity::Active), 73.0, 75.0);

        fleet.run_tick(74.0);

        assert!(fleet.members[0].rig.commands.is_empty());
    }

    #[test]
    fn test_high_soc_resumes_idle_rig() {
        let mut fleet = Fleet::new();
        fleet.push(StubRig::new("rig-a").reporting(Activity::Idle), 73.0, 75.0);

        fleet.run_tick(75.1);

        assert_eq!(fleet.members[0].rig.commands, vec![true]);
    }

    #[test]
    fn test_unknown_activity_suppresses_action() {
        let mut fleet = Fleet::new();
        fleet.push(
            StubRig::new("rig-a").reporting(Activity::Unknown("garbled payload".to_string())),
            73.0,
            75.0,
        );

        fleet.run_tick(10.0);

        assert!(fleet.members[0].rig.commands.is_empty());
        assert_eq!(fleet.total_errors(), 0);
    }

    #[test]
    fn test_failing_member_does_not_block_the_rest() {
        // Scenario E: one of three rigs is unreachable during status query.
        let mut fleet = Fleet::new();
        fleet.push(StubRig::new("rig-a").reporting(Activity::Active), 73.0, 75.0);
        fleet.push(StubRig::new("rig-b").failing_status(), 73.0, 75.0);
        fleet.push(StubRig::new("rig-c").reporting(Activity::Active), 73.0, 75.0);

        fleet.run_tick(60.0);

        assert_eq!(fleet.members[0].rig.commands, vec![false]);
        assert!(fleet.members[1].rig.commands.is_empty());
        assert_eq!(fleet.members[2].rig.commands, vec![false]);
        assert_eq!(fleet.total_errors(), 1);
    }

    #[test]
    fn test_repeated_decision_is_not_reissued() {
        // Rig keeps reporting Active while the stop is still taking effect.
        let mut fleet = Fleet::new();
        fleet.push(
            StubRig::new("rig-a")
                .reporting(Activity::Active)
                .reporting(Activity::Active),
            73.0,
            75.0,
        );

        fleet.run_tick(60.0);
        fleet.run_tick(60.0);

        assert_eq!(fleet.members[0].rig.commands, vec![false]);
    }

    #[test]
    fn test_unconfirmed_command_is_reissued_after_bounded_wait() {
        // The rig acknowledges the stop but keeps reporting Active, as a
        // firmware that answers 500 without acting would.
        let mut fleet = Fleet::new();
        let mut rig = StubRig::new("rig-a");
        for _ in 0..5 {
            rig = rig.reporting(Activity::Active);
        }
        fleet.push(rig, 73.0, 75.0);

        for _ in 0..5 {
            fleet.run_tick(60.0);
        }

        // Issued on the first tick, suppressed while awaiting confirmation,
        // then reissued once the suppression window runs out.
        assert_eq!(fleet.members[0].rig.commands, vec![false, false]);
    }

    #[test]
    fn test_confirmed_state_change_allows_later_resume() {
        let mut fleet = Fleet::new();
        fleet.push(
            StubRig::new("rig-a")
                .reporting(Activity::Active)
                .reporting(Activity::Idle)
                .reporting(Activity::Idle),
            73.0,
            75.0,
        );

        fleet.run_tick(60.0); // stop issued
        fleet.run_tick(74.0); // stop confirmed, inside the band
        fleet.run_tick(80.0); // resume issued

        assert_eq!(fleet.members[0].rig.commands, vec![false, true]);
    }

    #[test]
    fn test_failed_command_is_retried_next_tick() {
        let mut fleet = Fleet::new();
        let rig = StubRig::new("rig-a")
            .reporting(Activity::Active)
            .reporting(Activity::Active);
        fleet.push(rig, 73.0, 75.0);
        fleet.members[0].rig.fail_commands = true;

        fleet.run_tick(60.0);
        assert_eq!(fleet.total_errors(), 1);

        // Transient fault clears; the stop goes through on the next tick.
        fleet.members[0].rig.fail_commands = false;
        fleet.run_tick(60.0);

        assert_eq!(fleet.members[0].rig.commands, vec![false]);
    }
}
