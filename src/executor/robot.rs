//! Robot Executor
//!
//! One long-lived control loop per ally robot. The loop waits for a tick,
//! takes exactly one world snapshot, asks the assigned behavior for a
//! command and hands it to the sink.
//!
//! `stop()` performs the state change and the final zero command under
//! the same lock the loop holds while sending, so exactly one zero command
//! goes out per stop and nothing follows it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use super::behavior::{Behavior, Idle};
use crate::error::{CoreError, Result};
use crate::network::command::Command;
use crate::network::transport::CommandSink;
use crate::world::objects::valid_robot_id;
use crate::world::store::{WorldReader, WorldStore};

/// What drives the executor clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickSource {
    /// Fixed period.
    Interval(Duration),
    /// Every newly published snapshot.
    Frames,
}

/// Read-only view of an executor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutorStatus {
    /// Robot id.
    pub robot_id: u8,
    /// Loop running.
    pub running: bool,
    /// Last command handed to the sink.
    pub last_command: Option<Command>,
    /// Ticks executed since creation.
    pub ticks: u64,
}

enum RunState {
    Idle,
    Running {
        generation: u64,
        shutdown_tx: broadcast::Sender<()>,
        handle: JoinHandle<()>,
    },
}

struct Shared<S> {
    robot_id: u8,
    sink: Arc<S>,
    store: Arc<WorldStore>,
    tick_source: TickSource,
    behavior: Mutex<Box<dyn Behavior>>,
    state: Mutex<RunState>,
    last_command: Mutex<Option<Command>>,
    generation: AtomicU64,
    ticks: AtomicU64,
}

/// Control loop for one robot.
pub struct RobotExecutor<S: CommandSink> {
    shared: Arc<Shared<S>>,
}

impl<S: CommandSink> RobotExecutor<S> {
    /// Idle executor for `robot_id` running the [`Idle`] behavior.
    pub fn new(robot_id: u8, store: Arc<WorldStore>, sink: Arc<S>, tick_source: TickSource) -> Result<Self> {
        if !valid_robot_id(robot_id) {
            return Err(CoreError::InvalidRobotId(robot_id));
        }
        if tick_source == TickSource::Interval(Duration::ZERO) {
            return Err(CoreError::InvalidConfig("executor tick interval is zero".to_string()));
        }
        Ok(Self {
            shared: Arc::new(Shared {
                robot_id,
                sink,
                store,
                tick_source,
                behavior: Mutex::new(Box::new(Idle)),
                state: Mutex::new(RunState::Idle),
                last_command: Mutex::new(None),
                generation: AtomicU64::new(0),
                ticks: AtomicU64::new(0),
            }),
        })
    }

    /// Robot this executor drives.
    pub fn robot_id(&self) -> u8 {
        self.shared.robot_id
    }

    /// Swap the behavior. The next tick uses it.
    pub async fn assign(&self, behavior: Box<dyn Behavior>) {
        debug!("Robot {} assigned {}", self.shared.robot_id, behavior.name());
        *self.shared.behavior.lock().await = behavior;
    }

    /// Name of the current behavior.
    pub async fn behavior_name(&self) -> &'static str {
        self.shared.behavior.lock().await.name()
    }

    /// True while the loop runs. A loop that died on its own counts as idle.
    pub async fn is_running(&self) -> bool {
        matches!(&*self.shared.state.lock().await, RunState::Running { handle, .. } if !handle.is_finished())
    }

    /// Last command handed to the sink.
    pub async fn last_command(&self) -> Option<Command> {
        *self.shared.last_command.lock().await
    }

    /// Ticks executed since creation.
    pub fn ticks(&self) -> u64 {
        self.shared.ticks.load(Ordering::Relaxed)
    }

    /// Snapshot of the executor for display.
    pub async fn status(&self) -> ExecutorStatus {
        ExecutorStatus {
            robot_id: self.shared.robot_id,
            running: self.is_running().await,
            last_command: self.last_command().await,
            ticks: self.ticks(),
        }
    }

    /// IDLE -> RUNNING. Returns false if already running.
    pub async fn start(&self) -> bool {
        let mut state = self.shared.state.lock().await;
        if matches!(&*state, RunState::Running { handle, .. } if !handle.is_finished()) {
            return false;
        }

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let reader = self.shared.store.subscribe();
        let handle = tokio::spawn(run_loop(self.shared.clone(), generation, reader, shutdown_rx));
        *state = RunState::Running {
            generation,
            shutdown_tx,
            handle,
        };
        info!("Robot {} executor started", self.shared.robot_id);
        true
    }

    /// RUNNING -> IDLE, sending one final zero command.
    ///
    /// Returns false (and sends nothing) if already idle. Once this returns
    /// the loop has exited.
    pub async fn stop(&self) -> bool {
        let handle = {
            let mut state = self.shared.state.lock().await;
            let RunState::Running {
                shutdown_tx, handle, ..
            } = std::mem::replace(&mut *state, RunState::Idle)
            else {
                return false;
            };
            let _ = shutdown_tx.send(());

            let zero = Command::stop(self.shared.robot_id);
            if let Err(e) = self.shared.sink.send(zero).await {
                warn!("Robot {} final stop not delivered: {}", self.shared.robot_id, e);
            }
            *self.shared.last_command.lock().await = Some(zero);
            handle
        };

        if let Err(e) = handle.await {
            warn!("Robot {} loop ended abnormally: {}", self.shared.robot_id, e);
        }
        info!("Robot {} executor stopped", self.shared.robot_id);
        true
    }
}

/// Wait for the next tick. False means shut down.
async fn next_tick(
    source: &mut Option<tokio::time::Interval>,
    reader: &mut WorldReader,
    shutdown_rx: &mut broadcast::Receiver<()>,
) -> bool {
    match source {
        Some(ticker) => tokio::select! {
            _ = shutdown_rx.recv() => false,
            _ = ticker.tick() => true,
        },
        None => tokio::select! {
            _ = shutdown_rx.recv() => false,
            alive = reader.changed() => alive,
        },
    }
}

#[instrument(skip_all, fields(robot = shared.robot_id, generation = generation))]
async fn run_loop<S: CommandSink>(
    shared: Arc<Shared<S>>,
    generation: u64,
    mut reader: WorldReader,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let robot_id = shared.robot_id;
    let mut ticker = match shared.tick_source {
        TickSource::Interval(period) => {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            Some(ticker)
        }
        TickSource::Frames => None,
    };

    while next_tick(&mut ticker, &mut reader, &mut shutdown_rx).await {
        let snapshot = reader.snapshot();

        let mut command = {
            let mut behavior = shared.behavior.lock().await;
            match behavior.calculate(robot_id, &snapshot) {
                Ok(command) => command,
                Err(e) => {
                    debug!("Robot {} {} produced no command: {}", robot_id, behavior.name(), e);
                    Command::stop(robot_id)
                }
            }
        };
        command.robot_id = robot_id;

        let state = shared.state.lock().await;
        match &*state {
            RunState::Running { generation: current, .. } if *current == generation => {}
            _ => break,
        }
        if let Err(e) = shared.sink.send(command).await {
            warn!("Robot {} send failed: {}", robot_id, e);
        }
        *shared.last_command.lock().await = Some(command);
        shared.ticks.fetch_add(1, Ordering::Relaxed);
        drop(state);

        #[cfg(feature = "debug-tracing")]
        tracing::trace!(version = snapshot.version, ?command, "executor tick");
    }

    let mut state = shared.state.lock().await;
    if matches!(&*state, RunState::Running { generation: current, .. } if *current == generation) {
        warn!("Robot {} loop ended without a stop", robot_id);
        *state = RunState::Idle;
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::transport::MemorySink;
    use crate::world::model::WorldSnapshot;
    use crate::world::{FieldSide, TeamColor};

    const TICK: TickSource = TickSource::Interval(Duration::from_millis(1));

    /// Always drives forward at a fixed speed.
    struct Cruise(i16);

    impl Behavior for Cruise {
        fn calculate(&mut self, robot_id: u8, _world: &WorldSnapshot) -> Result<Command> {
            Ok(Command {
                robot_id,
                speed: self.0,
                ..Command::default()
            })
        }

        fn name(&self) -> &'static str {
            "cruise"
        }
    }

    struct Unreachable;

    impl Behavior for Unreachable {
        fn calculate(&mut self, _robot_id: u8, _world: &WorldSnapshot) -> Result<Command> {
            Err(CoreError::PlannerUnreachable("no path"))
        }

        fn name(&self) -> &'static str {
            "unreachable"
        }
    }

    /// Panics on its first tick.
    struct Broken;

    impl Behavior for Broken {
        fn calculate(&mut self, _robot_id: u8, _world: &WorldSnapshot) -> Result<Command> {
            panic!("behavior bug");
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    fn executor(id: u8, sink: Arc<MemorySink>, source: TickSource) -> (RobotExecutor<MemorySink>, Arc<WorldStore>) {
        let store = Arc::new(WorldStore::default());
        (RobotExecutor::new(id, store.clone(), sink, source).unwrap(), store)
    }

    async fn wait_for<F: Fn(&[Command]) -> bool>(sink: &MemorySink, done: F) {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if done(&sink.sent().await) {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("condition not reached");
    }

    #[tokio::test]
    async fn test_stop_sends_exactly_one_zero_command() {
        let sink = Arc::new(MemorySink::new());
        let (exec, _store) = executor(3, sink.clone(), TICK);
        exec.assign(Box::new(Cruise(500))).await;

        assert!(exec.start().await);
        wait_for(&sink, |sent| sent.len() >= 3).await;
        assert!(exec.stop().await);
        assert!(!exec.is_running().await);

        let sent = sink.sent().await;
        assert_eq!(sent.iter().filter(|c| c.is_zero()).count(), 1);
        assert!(sent.last().unwrap().is_zero());
        assert_eq!(exec.last_command().await, Some(Command::stop(3)));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(sink.sent().await.len(), sent.len());
    }

    #[tokio::test]
    async fn test_stop_when_idle_sends_nothing() {
        let sink = Arc::new(MemorySink::new());
        let (exec, _store) = executor(0, sink.clone(), TICK);
        assert!(!exec.stop().await);
        assert!(sink.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_stops_send_one_zero() {
        let sink = Arc::new(MemorySink::new());
        let (exec, _store) = executor(2, sink.clone(), TICK);
        exec.assign(Box::new(Cruise(100))).await;
        exec.start().await;
        wait_for(&sink, |sent| !sent.is_empty()).await;

        let (a, b) = tokio::join!(exec.stop(), exec.stop());
        assert!(a ^ b);
        let zeros = sink.sent().await.iter().filter(|c| c.is_zero()).count();
        assert_eq!(zeros, 1);
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let sink = Arc::new(MemorySink::new());
        let (exec, _store) = executor(5, sink.clone(), TICK);
        exec.assign(Box::new(Cruise(100))).await;

        assert!(exec.start().await);
        assert!(!exec.start().await);
        wait_for(&sink, |sent| !sent.is_empty()).await;
        exec.stop().await;
        let first_run = sink.sent().await.len();

        assert!(exec.start().await);
        wait_for(&sink, |sent| sent.len() > first_run + 2).await;
        exec.stop().await;
        assert_eq!(sink.sent().await.iter().filter(|c| c.is_zero()).count(), 2);
    }

    #[tokio::test]
    async fn test_planner_failure_sends_stop_and_keeps_running() {
        let sink = Arc::new(MemorySink::new());
        let (exec, _store) = executor(1, sink.clone(), TICK);
        exec.assign(Box::new(Unreachable)).await;
        exec.start().await;

        wait_for(&sink, |sent| sent.len() >= 3).await;
        assert!(exec.is_running().await);
        assert!(sink.sent().await.iter().all(|c| c.is_zero() && c.robot_id == 1));
        exec.stop().await;
    }

    #[tokio::test]
    async fn test_send_failure_is_not_fatal() {
        let sink = Arc::new(MemorySink::failing());
        let (exec, _store) = executor(4, sink, TICK);
        exec.assign(Box::new(Cruise(100))).await;
        exec.start().await;

        tokio::time::timeout(Duration::from_secs(2), async {
            while exec.ticks() < 3 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .unwrap();
        assert!(exec.is_running().await);
        assert!(exec.stop().await);
    }

    #[tokio::test]
    async fn test_frame_driven_assign_takes_effect_next_tick() {
        let sink = Arc::new(MemorySink::new());
        let (exec, store) = executor(6, sink.clone(), TickSource::Frames);
        exec.assign(Box::new(Cruise(100))).await;
        exec.start().await;

        let mut snapshot = WorldSnapshot::new(TeamColor::Blue, FieldSide::West);
        snapshot.version = 1;
        store.publish(snapshot.clone());
        wait_for(&sink, |sent| sent.len() == 1).await;
        assert_eq!(sink.sent().await[0].speed, 100);

        exec.assign(Box::new(Cruise(200))).await;
        snapshot.version = 2;
        store.publish(snapshot);
        wait_for(&sink, |sent| sent.len() == 2).await;
        assert_eq!(sink.sent().await[1].speed, 200);

        exec.stop().await;
        assert_eq!(exec.status().await.ticks, 2);
    }

    #[tokio::test]
    async fn test_keeps_commanding_on_stale_position() {
        use crate::core::point::Point;
        use crate::executor::behavior::GotoPosition;
        use crate::world::referee::RefereeCommand;

        let sink = Arc::new(MemorySink::new());
        let (exec, store) = executor(2, sink.clone(), TickSource::Frames);
        exec.assign(Box::new(GotoPosition::new(Some(Point::new(2000.0, 0.0)), None))).await;
        exec.start().await;

        let mut snapshot = WorldSnapshot::new(TeamColor::Blue, FieldSide::West);
        snapshot.referee.command = RefereeCommand::ForceStart;
        let me = snapshot.blue.robot_mut(2).unwrap();
        me.object.position = Point::new(-1000.0, 0.0);
        me.object.on_sight = true;
        snapshot.version = 1;
        store.publish(snapshot.clone());
        wait_for(&sink, |sent| sent.len() == 1).await;

        // Robot drops out of vision; its last position is still used
        snapshot.blue.robot_mut(2).unwrap().object.on_sight = false;
        snapshot.version = 2;
        store.publish(snapshot);
        wait_for(&sink, |sent| sent.len() == 2).await;

        let sent = sink.sent().await;
        assert!(exec.is_running().await);
        assert!(!sent[1].is_zero());
        assert_eq!(sent[1].direction, sent[0].direction);
        assert_eq!(sent[1].speed, sent[0].speed);
        exec.stop().await;
    }

    #[tokio::test]
    async fn test_dead_loop_reports_idle_and_restarts() {
        let sink = Arc::new(MemorySink::new());
        let (exec, _store) = executor(8, sink.clone(), TICK);
        exec.assign(Box::new(Broken)).await;
        assert!(exec.start().await);

        tokio::time::timeout(Duration::from_secs(2), async {
            while exec.is_running().await {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .unwrap();
        assert!(sink.sent().await.is_empty());

        exec.assign(Box::new(Cruise(100))).await;
        assert!(exec.start().await);
        wait_for(&sink, |sent| !sent.is_empty()).await;
        assert!(exec.stop().await);
    }

    #[test]
    fn test_invalid_robot_id() {
        let result = RobotExecutor::new(11, Arc::new(WorldStore::default()), Arc::new(MemorySink::new()), TICK);
        assert!(matches!(result, Err(CoreError::InvalidRobotId(11))));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let result = RobotExecutor::new(
            0,
            Arc::new(WorldStore::default()),
            Arc::new(MemorySink::new()),
            TickSource::Interval(Duration::ZERO),
        );
        assert!(matches!(result, Err(CoreError::InvalidConfig(_))));
    }
}
