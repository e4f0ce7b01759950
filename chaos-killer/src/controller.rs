//! Fault-injection controller.
//!
//! Owns one [`RemoteTarget`] per daemon and runs rounds of faults against a
//! random subset of them:
//!
//! 1. Wait `interval`
//! 2. Pick `count` distinct running targets
//! 3. Pause (SIGSTOP) or kill (SIGKILL) each victim
//! 4. Hold the fault for `duration`
//! 5. Resume (SIGCONT) or relaunch each victim
//!
//! Every victim of a round is reversed before the next selection, and a stop
//! signal never leaves a fault in place.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use chaos_types::{Connector, DaemonArgs, Endpoint, RemoteSession, Signal};

use crate::config::{AttachSpec, Config, FaultConfig, FaultKind};
use crate::error::{KillerError, Result};
use crate::launch;
use crate::target::{RemoteTarget, TargetState};
use crate::victims;

/// One completed fault round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    /// 1-based round number.
    pub number: u64,
    /// Fault that was applied.
    pub kind: FaultKind,
    /// Targets that were faulted and restored.
    pub victims: Vec<Endpoint>,
}

/// Outcome of [`FaultController::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Rounds completed.
    pub rounds: u64,
}

/// Drives faults against a set of remote daemons.
pub struct FaultController<C: Connector> {
    connector: C,
    targets: Vec<RemoteTarget<C::Session>>,
    faults: FaultConfig,
    workdir: String,
    startup_grace: Duration,
    rng: StdRng,
    seed: u64,
    rounds: u64,
}

impl<C: Connector> FaultController<C> {
    /// Create a controller with no targets.
    ///
    /// Uses `faults.seed` when set, otherwise draws a seed and logs it so the
    /// run can be replayed.
    pub fn new(connector: C, faults: FaultConfig, workdir: impl Into<String>) -> Self {
        let seed = faults.seed.unwrap_or_else(rand::random);
        info!(seed, "Victim selection seeded");

        Self {
            connector,
            targets: Vec::new(),
            faults,
            workdir: workdir.into(),
            startup_grace: Duration::from_millis(200),
            rng: StdRng::seed_from_u64(seed),
            seed,
            rounds: 0,
        }
    }

    /// Build a controller with every configured host added as a target.
    pub fn from_config(connector: C, config: &Config) -> Result<Self> {
        config.validate()?;

        let workdir = config.targets.workdir_or_unique();
        let mut controller = Self::new(connector, config.faults.clone(), workdir)
            .with_startup_grace(Duration::from_millis(config.targets.startup_grace_ms));
        for host in &config.targets.hosts {
            controller.add_target(host.clone(), config.targets.path.clone());
        }
        Ok(controller)
    }

    /// Delay between launching a daemon and confirming its pid is alive.
    pub fn with_startup_grace(mut self, grace: Duration) -> Self {
        self.startup_grace = grace;
        self
    }

    /// Seed of the victim RNG.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Remote work directory.
    pub fn workdir(&self) -> &str {
        &self.workdir
    }

    /// All targets, in insertion order.
    pub fn targets(&self) -> &[RemoteTarget<C::Session>] {
        &self.targets
    }

    /// Register a daemon. The first target bootstraps the cluster; every
    /// later one joins the first. Returns the target's index.
    pub fn add_target(&mut self, listen: Endpoint, path: impl Into<String>) -> usize {
        let data_dir = launch::data_dir(&listen);
        let args = match self.targets.first() {
            None => DaemonArgs::seed(listen.clone()),
            Some(coordinator) => DaemonArgs::joiner(listen.clone(), coordinator.listen().clone()),
        }
        .data_dir(data_dir);

        self.targets
            .push(RemoteTarget::new(listen, path.into(), args));
        self.targets.len() - 1
    }

    /// Index of the target listening on `listen`.
    pub fn position(&self, listen: &Endpoint) -> Option<usize> {
        self.targets.iter().position(|t| t.listen() == listen)
    }

    fn target(&self, index: usize) -> Result<&RemoteTarget<C::Session>> {
        self.targets.get(index).ok_or(KillerError::UnknownTarget(index))
    }

    fn target_mut(&mut self, index: usize) -> Result<&mut RemoteTarget<C::Session>> {
        self.targets
            .get_mut(index)
            .ok_or(KillerError::UnknownTarget(index))
    }

    /// Open a session to the target's host.
    pub async fn connect(&mut self, index: usize) -> Result<()> {
        let target = self.target(index)?;
        if target.state() != TargetState::Disconnected {
            return Err(target.invalid("connect"));
        }
        let host = target.host().to_string();

        let session = self
            .connector
            .connect(&host)
            .await
            .map_err(|source| KillerError::Connection {
                host: host.clone(),
                source,
            })?;

        self.target_mut(index)?.attach_session(session);
        info!(host = %host, "Connected");
        Ok(())
    }

    /// Connect every disconnected target.
    pub async fn connect_all(&mut self) -> Result<()> {
        for index in 0..self.targets.len() {
            if self.targets[index].state() == TargetState::Disconnected {
                self.connect(index).await?;
            }
        }
        Ok(())
    }

    /// Launch the target's daemon and confirm its pid.
    pub async fn start(&mut self, index: usize) -> Result<u32> {
        let target = self.target(index)?;
        if target.state() != TargetState::Connected {
            return Err(target.invalid("start"));
        }
        let session = target.session("start")?;
        let host = target.host().to_string();
        let command = launch::start_command(target.path(), target.args(), &self.workdir);

        debug!(host = %host, command = %command, "Launching daemon");
        let output = session
            .exec_ok(&command)
            .await
            .map_err(|e| KillerError::Startup {
                host: host.clone(),
                reason: e.to_string(),
            })?;

        let pid = launch::parse_pid(&output.stdout).ok_or_else(|| KillerError::Startup {
            host: host.clone(),
            reason: format!("no pid in launch output {:?}", output.stdout.trim()),
        })?;

        if !self.startup_grace.is_zero() {
            tokio::time::sleep(self.startup_grace).await;
        }
        confirm_alive(session, &host, pid).await?;

        self.target_mut(index)?
            .set_state(TargetState::Running { pid });
        info!(host = %host, pid, "Daemon running");
        Ok(pid)
    }

    /// Launch the daemon on every connected target.
    pub async fn start_all(&mut self) -> Result<()> {
        for index in 0..self.targets.len() {
            if self.targets[index].state() == TargetState::Connected {
                self.start(index).await?;
            }
        }
        Ok(())
    }

    /// Track an already running daemon instead of launching one.
    pub async fn attach(&mut self, index: usize, pid: u32) -> Result<()> {
        let target = self.target(index)?;
        if target.state() != TargetState::Connected {
            return Err(target.invalid("attach"));
        }
        let host = target.host().to_string();
        confirm_alive(target.session("attach")?, &host, pid).await?;

        self.target_mut(index)?
            .set_state(TargetState::Running { pid });
        info!(host = %host, pid, "Attached to daemon");
        Ok(())
    }

    /// Connect every target, attach to the listed running daemons and launch
    /// the rest.
    pub async fn bring_up(&mut self, attach: &[AttachSpec]) -> Result<()> {
        self.connect_all().await?;
        for spec in attach {
            let index = self.position(&spec.listen).ok_or_else(|| {
                KillerError::InvalidConfig(format!("no target listens on {}", spec.listen))
            })?;
            self.attach(index, spec.pid).await?;
        }
        self.start_all().await
    }

    /// Suspend the target's daemon with SIGSTOP.
    pub async fn pause(&mut self, index: usize) -> Result<()> {
        let TargetState::Running { pid } = self.target(index)?.state() else {
            return Err(self.target(index)?.invalid("pause"));
        };
        self.signal(index, "pause", Signal::Stop, pid).await?;
        self.target_mut(index)?
            .set_state(TargetState::Paused { pid });
        Ok(())
    }

    /// Continue a paused daemon with SIGCONT.
    pub async fn resume(&mut self, index: usize) -> Result<()> {
        let TargetState::Paused { pid } = self.target(index)?.state() else {
            return Err(self.target(index)?.invalid("resume"));
        };
        self.signal(index, "resume", Signal::Cont, pid).await?;
        self.target_mut(index)?
            .set_state(TargetState::Running { pid });
        Ok(())
    }

    /// Terminate the daemon with SIGKILL. `start` launches it again.
    pub async fn kill(&mut self, index: usize) -> Result<()> {
        let Some(pid) = self.target(index)?.pid() else {
            return Err(self.target(index)?.invalid("kill"));
        };
        self.signal(index, "kill", Signal::Kill, pid).await?;
        self.target_mut(index)?.set_state(TargetState::Connected);
        Ok(())
    }

    async fn signal(
        &self,
        index: usize,
        action: &'static str,
        signal: Signal,
        pid: u32,
    ) -> Result<()> {
        let target = self.target(index)?;
        let session = target.session(action)?;

        session
            .exec_ok(&signal.command(pid))
            .await
            .map_err(|source| KillerError::FaultCommand {
                host: target.host().to_string(),
                action,
                source,
            })?;

        info!(host = %target.host(), pid, "Sent {}", signal);
        Ok(())
    }

    /// Choose this round's victims among the running targets.
    pub fn select_victims(&mut self) -> Result<Vec<usize>> {
        let live: Vec<usize> = self
            .targets
            .iter()
            .enumerate()
            .filter(|(_, t)| matches!(t.state(), TargetState::Running { .. }))
            .map(|(i, _)| i)
            .collect();

        let picks = victims::select_victims(live.len(), self.faults.count, &mut self.rng)?;
        Ok(picks.into_iter().map(|p| live[p]).collect())
    }

    /// Run one fault round with the full dwell time.
    pub async fn run_round(&mut self) -> Result<Round> {
        self.round(None).await
    }

    async fn round(&mut self, stop: Option<&mut watch::Receiver<bool>>) -> Result<Round> {
        let kind = self.faults.kind();
        let victims = self.select_victims()?;
        let number = self.rounds + 1;
        let endpoints: Vec<Endpoint> = victims
            .iter()
            .map(|&i| self.targets[i].listen().clone())
            .collect();
        info!(round = number, "Applying {} to {:?}", kind.as_str(), endpoints);

        let mut faulted = Vec::with_capacity(victims.len());
        for &index in &victims {
            let applied = match kind {
                FaultKind::Suspend => self.pause(index).await,
                FaultKind::Kill => self.kill(index).await,
            };
            if let Err(e) = applied {
                warn!(error = %e, "Fault failed, restoring {} victims", faulted.len());
                // Restore errors are logged inside; the apply failure is returned.
                let _ = self.restore(kind, &faulted).await;
                return Err(e);
            }
            faulted.push(index);
        }

        let duration = self.faults.duration();
        match stop {
            Some(stop) => {
                if sleep_or_stop(duration, stop).await {
                    info!(round = number, "Stop requested, ending dwell early");
                }
            }
            None => tokio::time::sleep(duration).await,
        }

        self.restore(kind, &faulted).await?;
        self.rounds = number;
        Ok(Round {
            number,
            kind,
            victims: endpoints,
        })
    }

    /// Reverse the fault on every index, returning the first failure.
    async fn restore(&mut self, kind: FaultKind, faulted: &[usize]) -> Result<()> {
        let mut first_error = None;
        for &index in faulted {
            let restored = match kind {
                FaultKind::Suspend => self.resume(index).await,
                FaultKind::Kill => self.start(index).await.map(|_| ()),
            };
            if let Err(e) = restored {
                warn!(host = %self.targets[index].host(), error = %e, "Failed to restore target");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Run rounds every `interval` until `stop` turns true or the configured
    /// round budget is spent.
    pub async fn run(&mut self, mut stop: watch::Receiver<bool>) -> Result<RunSummary> {
        let mut completed = 0;
        info!(
            targets = self.targets.len(),
            interval_secs = self.faults.interval_secs,
            duration_secs = self.faults.duration_secs,
            count = self.faults.count,
            "Fault injection started"
        );

        loop {
            if self.faults.rounds.is_some_and(|limit| completed >= limit) {
                break;
            }
            if sleep_or_stop(self.faults.interval(), &mut stop).await {
                break;
            }

            self.round(Some(&mut stop)).await?;
            completed += 1;

            if *stop.borrow() {
                break;
            }
        }

        info!(rounds = completed, "Fault injection finished");
        Ok(RunSummary { rounds: completed })
    }

    /// Resume every paused daemon. Failures are logged, not returned.
    pub async fn shutdown(&mut self) {
        for index in 0..self.targets.len() {
            if matches!(self.targets[index].state(), TargetState::Paused { .. }) {
                if let Err(e) = self.resume(index).await {
                    warn!(host = %self.targets[index].host(), error = %e, "Failed to resume on shutdown");
                }
            }
        }
    }
}

async fn confirm_alive<S: RemoteSession>(session: &S, host: &str, pid: u32) -> Result<()> {
    session
        .exec_ok(&Signal::Probe.command(pid))
        .await
        .map_err(|e| KillerError::Startup {
            host: host.to_string(),
            reason: format!("pid {} is not running: {}", pid, e),
        })?;
    Ok(())
}

/// Sleep for `duration`; returns true as soon as `stop` becomes true.
///
/// A dropped sender never stops the sleep.
async fn sleep_or_stop(duration: Duration, stop: &mut watch::Receiver<bool>) -> bool {
    let stopped = async {
        let signalled = stop.wait_for(|stop| *stop).await.is_ok();
        if !signalled {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = stopped => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaos_types::remote::MockConnector;
    use std::collections::HashSet;

    const HOSTS: [&str; 3] = ["10.0.0.1", "10.0.0.2", "10.0.0.3"];

    fn faults(count: usize, sigkill: bool) -> FaultConfig {
        FaultConfig {
            interval_secs: 10,
            duration_secs: 0,
            count,
            sigkill,
            rounds: None,
            seed: Some(1982),
        }
    }

    async fn running(
        mock: &MockConnector,
        hosts: &[&str],
        faults: FaultConfig,
    ) -> FaultController<MockConnector> {
        let mut controller = FaultController::new(mock.clone(), faults, "/tmp/chaos")
            .with_startup_grace(Duration::ZERO);
        for host in hosts {
            controller.add_target(Endpoint::new(*host, 1982), "replicant-daemon");
        }
        controller.connect_all().await.unwrap();
        controller.start_all().await.unwrap();
        controller
    }

    fn pause_counts(mock: &MockConnector, hosts: &[&str]) -> Vec<usize> {
        hosts
            .iter()
            .map(|h| {
                mock.commands_for(h)
                    .iter()
                    .filter(|c| c.starts_with("kill -STOP"))
                    .count()
            })
            .collect()
    }

    #[test]
    fn first_target_seeds_later_targets_join() {
        let mut controller =
            FaultController::new(MockConnector::new(), faults(1, false), "/tmp/chaos");
        controller.add_target(Endpoint::new("10.0.0.1", 1982), "d");
        controller.add_target(Endpoint::new("10.0.0.2", 1983), "d");

        let targets = controller.targets();
        assert_eq!(targets[0].args().connect, None);
        assert_eq!(
            targets[1].args().connect,
            Some(Endpoint::new("10.0.0.1", 1982))
        );
        assert_eq!(
            targets[1].args().data_dir.as_deref(),
            Some("data-10.0.0.2-1983")
        );
        assert_eq!(targets[1].state(), TargetState::Disconnected);
    }

    #[tokio::test]
    async fn start_tracks_reported_pid() {
        let mock = MockConnector::new();
        let controller = running(&mock, &HOSTS[..2], faults(1, false)).await;

        let pids: Vec<u32> = controller.targets().iter().filter_map(|t| t.pid()).collect();
        assert_eq!(pids, vec![1000, 1001]);
        assert!(mock.is_live(1000));

        let commands = mock.commands_for("10.0.0.1");
        assert!(commands[0].contains("REPLICANT_PID="));
        assert_eq!(commands[1], "kill -0 1000");
    }

    #[tokio::test]
    async fn unreachable_host_is_connection_error() {
        let mock = MockConnector::new();
        mock.set_unreachable("10.0.0.2");
        let mut controller = FaultController::new(mock, faults(1, false), "/tmp/chaos");
        controller.add_target(Endpoint::new("10.0.0.1", 1982), "d");
        controller.add_target(Endpoint::new("10.0.0.2", 1982), "d");

        let err = controller.connect_all().await.unwrap_err();
        match err {
            KillerError::Connection { host, .. } => assert_eq!(host, "10.0.0.2"),
            other => panic!("expected Connection, got {other:?}"),
        }
        assert_eq!(controller.targets()[0].state(), TargetState::Connected);
    }

    #[tokio::test]
    async fn missing_pid_is_startup_error() {
        let mock = MockConnector::new();
        mock.set_start_output("10.0.0.1", "bash: replicant-daemon: not found\n");
        let mut controller = FaultController::new(mock, faults(1, false), "/tmp/chaos")
            .with_startup_grace(Duration::ZERO);
        controller.add_target(Endpoint::new("10.0.0.1", 1982), "d");
        controller.connect(0).await.unwrap();

        let err = controller.start(0).await.unwrap_err();
        assert!(matches!(err, KillerError::Startup { .. }), "{err:?}");
        assert_eq!(controller.targets()[0].state(), TargetState::Connected);
    }

    #[tokio::test]
    async fn dead_pid_is_startup_error() {
        let mock = MockConnector::new();
        mock.fail_commands_containing("10.0.0.1", "kill -0");
        let mut controller = FaultController::new(mock, faults(1, false), "/tmp/chaos")
            .with_startup_grace(Duration::ZERO);
        controller.add_target(Endpoint::new("10.0.0.1", 1982), "d");
        controller.connect(0).await.unwrap();

        let err = controller.start(0).await.unwrap_err();
        assert!(err.to_string().contains("pid 1000 is not running"), "{err}");
    }

    #[tokio::test]
    async fn illegal_transitions_are_invalid_state() {
        let mock = MockConnector::new();
        let mut controller = running(&mock, &HOSTS[..1], faults(1, false)).await;

        assert!(matches!(
            controller.resume(0).await,
            Err(KillerError::InvalidState { action: "resume", .. })
        ));
        assert!(matches!(
            controller.start(0).await,
            Err(KillerError::InvalidState { action: "start", .. })
        ));
        controller.pause(0).await.unwrap();
        assert!(matches!(
            controller.pause(0).await,
            Err(KillerError::InvalidState { action: "pause", .. })
        ));
        assert!(matches!(
            controller.connect(0).await,
            Err(KillerError::InvalidState { action: "connect", .. })
        ));
        assert!(matches!(
            controller.pause(7).await,
            Err(KillerError::UnknownTarget(7))
        ));
    }

    #[tokio::test]
    async fn pause_resume_and_kill_signal_the_pid() {
        let mock = MockConnector::new();
        let mut controller = running(&mock, &HOSTS[..1], faults(1, false)).await;

        controller.pause(0).await.unwrap();
        assert!(mock.is_stopped(1000));
        assert_eq!(controller.targets()[0].state(), TargetState::Paused { pid: 1000 });

        controller.resume(0).await.unwrap();
        assert!(!mock.is_stopped(1000));

        controller.kill(0).await.unwrap();
        assert!(!mock.is_live(1000));
        assert_eq!(controller.targets()[0].state(), TargetState::Connected);

        let pid = controller.start(0).await.unwrap();
        assert_eq!(pid, 1001);
    }

    #[tokio::test]
    async fn failed_signal_is_fault_command_error() {
        let mock = MockConnector::new();
        let mut controller = running(&mock, &HOSTS[..1], faults(1, false)).await;
        mock.fail_commands_containing("10.0.0.1", "kill -STOP");

        let err = controller.pause(0).await.unwrap_err();
        match err {
            KillerError::FaultCommand { host, action, .. } => {
                assert_eq!(host, "10.0.0.1");
                assert_eq!(action, "pause");
            }
            other => panic!("expected FaultCommand, got {other:?}"),
        }
        assert_eq!(controller.targets()[0].state(), TargetState::Running { pid: 1000 });
    }

    #[tokio::test]
    async fn every_victim_restored_before_next_selection() {
        let mock = MockConnector::new();
        let mut controller = running(&mock, &HOSTS, faults(2, false)).await;

        for expected in 1..=50 {
            let round = controller.run_round().await.unwrap();
            assert_eq!(round.number, expected);
            assert_eq!(round.victims.len(), 2);
            assert_ne!(round.victims[0], round.victims[1]);
            assert_eq!(mock.stopped_count(), 0);
        }

        // Replay the log: never more than `count` stopped at once, and every
        // STOP is matched by a CONT before the next round's STOPs.
        let mut stopped = HashSet::new();
        let mut conts_pending = 0;
        for (_, cmd) in mock.commands() {
            if let Some(pid) = cmd.strip_prefix("kill -STOP ") {
                assert!(stopped.insert(pid.to_string()));
                assert!(stopped.len() <= 2);
                conts_pending += 1;
            } else if let Some(pid) = cmd.strip_prefix("kill -CONT ") {
                assert!(stopped.remove(pid));
                conts_pending -= 1;
            }
        }
        assert!(stopped.is_empty());
        assert_eq!(conts_pending, 0);
    }

    #[tokio::test]
    async fn kill_round_restarts_with_new_pid() {
        let mock = MockConnector::new();
        let mut controller = running(&mock, &HOSTS[..2], faults(1, true)).await;
        let before: Vec<u32> = controller.targets().iter().filter_map(|t| t.pid()).collect();

        let round = controller.run_round().await.unwrap();
        assert_eq!(round.kind, FaultKind::Kill);

        let victim = controller
            .targets()
            .iter()
            .position(|t| t.listen() == &round.victims[0])
            .unwrap();
        let new_pid = controller.targets()[victim].pid().unwrap();
        assert_ne!(new_pid, before[victim]);
        assert!(mock.is_live(new_pid));
        assert!(!mock.is_live(before[victim]));
        assert!(controller
            .targets()
            .iter()
            .all(|t| matches!(t.state(), TargetState::Running { .. })));
    }

    #[tokio::test]
    async fn failure_midway_restores_applied_faults() {
        let mock = MockConnector::new();
        let mut controller = running(&mock, &HOSTS, faults(3, false)).await;
        mock.fail_commands_containing("10.0.0.3", "kill -STOP");

        let err = controller.run_round().await.unwrap_err();
        assert!(matches!(
            err,
            KillerError::FaultCommand { ref host, action: "pause", .. } if host == "10.0.0.3"
        ));
        assert_eq!(mock.stopped_count(), 0);
        assert!(controller
            .targets()
            .iter()
            .all(|t| matches!(t.state(), TargetState::Running { .. })));
    }

    #[tokio::test]
    async fn count_above_live_targets_is_invalid_config() {
        let mock = MockConnector::new();
        let mut controller = running(&mock, &HOSTS[..2], faults(3, false)).await;
        assert!(matches!(
            controller.run_round().await,
            Err(KillerError::InvalidConfig(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn single_victim_split_approaches_even() {
        let mock = MockConnector::new();
        let mut config = faults(1, false);
        config.rounds = Some(2000);
        let mut controller = running(&mock, &HOSTS[..2], config).await;

        let (_tx, rx) = watch::channel(false);
        let summary = controller.run(rx).await.unwrap();
        assert_eq!(summary.rounds, 2000);

        let counts = pause_counts(&mock, &HOSTS[..2]);
        assert_eq!(counts[0] + counts[1], 2000);
        for count in counts {
            assert!((900..=1100).contains(&count), "uneven split: {count}");
        }
        assert_eq!(mock.stopped_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rounds_follow_interval() {
        let mock = MockConnector::new();
        let mut config = faults(1, false);
        config.rounds = Some(3);
        let mut controller = running(&mock, &HOSTS[..2], config).await;

        let started = tokio::time::Instant::now();
        let (_tx, rx) = watch::channel(false);
        controller.run(rx).await.unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(30), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(31), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_first_round_runs_nothing() {
        let mock = MockConnector::new();
        let mut controller = running(&mock, &HOSTS[..2], faults(1, false)).await;
        let before = mock.commands().len();

        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let summary = controller.run(rx).await.unwrap();

        assert_eq!(summary.rounds, 0);
        assert_eq!(mock.commands().len(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_dwell_still_restores() {
        let mock = MockConnector::new();
        let mut config = faults(1, false);
        config.duration_secs = 60;
        let mut controller = running(&mock, &HOSTS[..2], config).await;

        let started = tokio::time::Instant::now();
        let (tx, rx) = watch::channel(false);
        let stopper = async {
            tokio::time::sleep(Duration::from_secs(15)).await;
            tx.send(true).unwrap();
        };
        let (summary, ()) = tokio::join!(controller.run(rx), stopper);

        assert_eq!(summary.unwrap().rounds, 1);
        assert_eq!(mock.stopped_count(), 0);
        assert!(started.elapsed() < Duration::from_secs(60));
        assert_eq!(pause_counts(&mock, &HOSTS[..2]).iter().sum::<usize>(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_stop_sender_keeps_running() {
        let mock = MockConnector::new();
        let mut config = faults(1, false);
        config.rounds = Some(2);
        let mut controller = running(&mock, &HOSTS[..2], config).await;

        let (tx, rx) = watch::channel(false);
        drop(tx);
        assert_eq!(controller.run(rx).await.unwrap().rounds, 2);
    }

    #[tokio::test]
    async fn shutdown_resumes_paused_targets() {
        let mock = MockConnector::new();
        let mut controller = running(&mock, &HOSTS[..2], faults(1, false)).await;
        controller.pause(0).await.unwrap();
        controller.pause(1).await.unwrap();

        controller.shutdown().await;
        assert_eq!(mock.stopped_count(), 0);
        assert!(controller
            .targets()
            .iter()
            .all(|t| matches!(t.state(), TargetState::Running { .. })));
    }

    #[tokio::test]
    async fn attach_confirms_pid() {
        let mock = MockConnector::new();
        let mut controller = FaultController::new(mock, faults(1, false), "/tmp/chaos");
        controller.add_target(Endpoint::new("10.0.0.1", 1982), "d");
        controller.connect(0).await.unwrap();

        let err = controller.attach(0, 4321).await.unwrap_err();
        assert!(matches!(err, KillerError::Startup { .. }));
    }

    #[tokio::test]
    async fn bring_up_attaches_listed_and_launches_the_rest() {
        let mock = MockConnector::new();
        // An earlier controller left daemon pid 1000 running on 10.0.0.1.
        let earlier = running(&mock, &HOSTS[..1], faults(1, false)).await;
        assert_eq!(earlier.targets()[0].pid(), Some(1000));

        let mut controller = FaultController::new(mock.clone(), faults(1, false), "/tmp/chaos")
            .with_startup_grace(Duration::ZERO);
        for host in &HOSTS[..2] {
            controller.add_target(Endpoint::new(*host, 1982), "replicant-daemon");
        }
        let attach = vec!["10.0.0.1:1982=1000".parse().unwrap()];
        controller.bring_up(&attach).await.unwrap();

        assert_eq!(controller.targets()[0].state(), TargetState::Running { pid: 1000 });
        assert_eq!(controller.targets()[1].state(), TargetState::Running { pid: 1001 });
        let launches = mock
            .commands_for("10.0.0.1")
            .iter()
            .filter(|c| c.contains("REPLICANT_PID="))
            .count();
        assert_eq!(launches, 1);
    }

    #[tokio::test]
    async fn bring_up_rejects_unknown_attach_target() {
        let mock = MockConnector::new();
        let mut controller = FaultController::new(mock, faults(1, false), "/tmp/chaos");
        controller.add_target(Endpoint::new("10.0.0.1", 1982), "d");

        let attach = vec!["10.0.0.7:1982=5".parse().unwrap()];
        assert!(matches!(
            controller.bring_up(&attach).await,
            Err(KillerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn from_config_rejects_oversized_count() {
        let mut config = Config::default();
        config.faults.count = 5;
        assert!(FaultController::from_config(MockConnector::new(), &config).is_err());
    }

    #[tokio::test]
    async fn same_seed_same_victims() {
        let a = MockConnector::new();
        let b = MockConnector::new();
        let mut first = running(&a, &HOSTS, faults(1, false)).await;
        let mut second = running(&b, &HOSTS, faults(1, false)).await;

        for _ in 0..20 {
            assert_eq!(
                first.run_round().await.unwrap().victims,
                second.run_round().await.unwrap().victims
            );
        }
    }
}
