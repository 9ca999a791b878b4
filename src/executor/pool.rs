//! Executor Pool
//!
//! One executor per ally robot id, created once and kept for the lifetime
//! of the process. Strategy code reaches robots only through `assign`.

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::info;

use super::behavior::Behavior;
use super::robot::{ExecutorStatus, RobotExecutor, TickSource};
use crate::error::{CoreError, Result};
use crate::network::transport::CommandSink;
use crate::world::objects::TEAM_SIZE;
use crate::world::store::WorldStore;

/// All executors of the ally team.
pub struct ExecutorPool<S: CommandSink> {
    executors: Vec<RobotExecutor<S>>,
}

impl<S: CommandSink> ExecutorPool<S> {
    /// Idle executors for every id in `[0, TEAM_SIZE)`, sharing one sink.
    pub fn new(store: Arc<WorldStore>, sink: Arc<S>, tick_source: TickSource) -> Result<Self> {
        let executors = (0..TEAM_SIZE)
            .map(|id| RobotExecutor::new(id, store.clone(), sink.clone(), tick_source))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { executors })
    }

    /// Executor for one robot.
    pub fn executor(&self, robot_id: u8) -> Result<&RobotExecutor<S>> {
        self.executors
            .get(robot_id as usize)
            .ok_or(CoreError::InvalidRobotId(robot_id))
    }

    /// Every executor in id order.
    pub fn iter(&self) -> impl Iterator<Item = &RobotExecutor<S>> {
        self.executors.iter()
    }

    /// Number of executors.
    pub fn len(&self) -> usize {
        self.executors.len()
    }

    /// Always false; the pool is never empty.
    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }

    /// Give `robot_id` a new behavior, effective from its next tick.
    pub async fn assign(&self, robot_id: u8, behavior: impl Behavior) -> Result<()> {
        self.executor(robot_id)?.assign(Box::new(behavior)).await;
        Ok(())
    }

    /// Start one executor. Returns false if it was already running.
    pub async fn start(&self, robot_id: u8) -> Result<bool> {
        Ok(self.executor(robot_id)?.start().await)
    }

    /// Stop one executor. Returns false if it was already idle.
    pub async fn stop(&self, robot_id: u8) -> Result<bool> {
        Ok(self.executor(robot_id)?.stop().await)
    }

    /// Start every idle executor. Returns how many were started.
    pub async fn start_all(&self) -> usize {
        let started = join_all(self.executors.iter().map(|e| e.start()))
            .await
            .into_iter()
            .filter(|&started| started)
            .count();
        info!("Started {} executors", started);
        started
    }

    /// Stop every running executor. Returns how many were stopped.
    pub async fn stop_all(&self) -> usize {
        let stopped = join_all(self.executors.iter().map(|e| e.stop()))
            .await
            .into_iter()
            .filter(|&stopped| stopped)
            .count();
        info!("Stopped {} executors", stopped);
        stopped
    }

    /// Read-only status of every executor.
    pub async fn status(&self) -> Vec<ExecutorStatus> {
        join_all(self.executors.iter().map(|e| e.status())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use crate::executor::behavior::Idle;
    use crate::network::command::Command;
    use crate::network::transport::MemorySink;
    use crate::world::model::WorldSnapshot;

    struct Fixed(i16);

    impl Behavior for Fixed {
        fn calculate(&mut self, robot_id: u8, _world: &WorldSnapshot) -> Result<Command> {
            Ok(Command {
                robot_id,
                rotation_speed: self.0,
                ..Command::default()
            })
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn pool(sink: Arc<MemorySink>) -> ExecutorPool<MemorySink> {
        ExecutorPool::new(
            Arc::new(WorldStore::default()),
            sink,
            TickSource::Interval(Duration::from_millis(1)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_one_executor_per_robot() {
        let pool = pool(Arc::new(MemorySink::new()));
        assert_eq!(pool.len(), TEAM_SIZE as usize);
        for (id, exec) in pool.iter().enumerate() {
            assert_eq!(exec.robot_id() as usize, id);
            assert_eq!(exec.behavior_name().await, "idle");
        }
    }

    #[tokio::test]
    async fn test_invalid_ids_rejected_without_side_effects() {
        let sink = Arc::new(MemorySink::new());
        let pool = pool(sink.clone());
        assert!(matches!(pool.assign(11, Idle).await, Err(CoreError::InvalidRobotId(11))));
        assert!(matches!(pool.start(200).await, Err(CoreError::InvalidRobotId(200))));
        assert!(pool.assign(10, Fixed(5)).await.is_ok());
        assert_eq!(pool.executor(10).unwrap().behavior_name().await, "fixed");
        assert_eq!(pool.executor(9).unwrap().behavior_name().await, "idle");
        assert!(sink.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_start_and_stop_all() {
        let sink = Arc::new(MemorySink::new());
        let pool = pool(sink.clone());
        pool.assign(2, Fixed(50)).await.unwrap();

        assert_eq!(pool.start_all().await, TEAM_SIZE as usize);
        assert_eq!(pool.start_all().await, 0);
        tokio::time::timeout(Duration::from_secs(2), async {
            while sink.sent_to(2).await.len() < 2 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(pool.stop_all().await, TEAM_SIZE as usize);
        assert_eq!(pool.stop_all().await, 0);
        assert!(pool.status().await.iter().all(|s| !s.running));

        let robot_two = sink.sent_to(2).await;
        assert_eq!(robot_two.iter().filter(|c| c.is_zero()).count(), 1);
        assert!(robot_two.last().unwrap().is_zero());
        assert!(robot_two[..robot_two.len() - 1].iter().all(|c| c.rotation_speed == 50));
    }
}
