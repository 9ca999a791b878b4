//! Log Replay
//!
//! Pushes decoded frames into a [`WorldModel`] at the pace they were
//! recorded. Each frame becomes exactly one published snapshot.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{info, instrument};

use super::frame::{LogFrame, SharedFrame};
use super::log_reader::LogReader;
use crate::error::Result;
use crate::world::{Field, WorldModel};

/// Frame sequence player.
pub struct Replayer {
    frames: Vec<SharedFrame>,
    deltas: Vec<Duration>,
    field: Option<Field>,
    paced: bool,
}

impl Replayer {
    /// Player over every frame of a decoded log.
    pub fn new(reader: &LogReader) -> Self {
        Self {
            frames: reader.frames().to_vec(),
            deltas: (0..reader.len()).map(|i| reader.time_delta(i)).collect(),
            field: reader.field(),
            paced: true,
        }
    }

    /// Publish frames back to back without waiting.
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True when there is nothing to play.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Fold one frame into the model and publish it.
    pub fn apply(model: &mut WorldModel, frame: &LogFrame) -> u64 {
        model.ingest_detection(&frame.detection, frame.index as u64);
        if let Some(referee) = &frame.referee {
            model.ingest_referee(referee);
        }
        model.publish()
    }

    /// Play every frame in order. Stops early on shutdown.
    ///
    /// Returns the number of frames published.
    #[instrument(skip(self, model, shutdown))]
    pub async fn run(&self, model: &mut WorldModel, mut shutdown: broadcast::Receiver<()>) -> Result<usize> {
        if let Some(field) = self.field {
            model.set_field(field);
        }
        info!("Replaying {} frames", self.frames.len());

        let mut published = 0;
        for (frame, delta) in self.frames.iter().zip(&self.deltas) {
            Self::apply(model, frame);
            published += 1;

            if self.paced {
                tokio::select! {
                    _ = tokio::time::sleep(*delta) => {}
                    _ = shutdown.recv() => {
                        info!("Replay interrupted after {} frames", published);
                        return Ok(published);
                    }
                }
            } else if shutdown.try_recv().is_ok() {
                return Ok(published);
            }
        }

        info!("Replay finished");
        Ok(published)
    }

    /// Shared handle to the frame at `index`.
    pub fn frame(&self, index: usize) -> Option<Arc<LogFrame>> {
        self.frames.get(index).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::log_file::LogWriter;
    use crate::vision::log_reader::LogReaderConfig;
    use crate::vision::messages::{DetectionFrame, DetectionRobot, WrapperPacket};
    use crate::world::{FieldSide, TeamColor, WorldStore};

    fn reader() -> LogReader {
        let mut writer = LogWriter::new(Vec::new()).unwrap();
        for i in 0..6i64 {
            let packet = WrapperPacket::detection(DetectionFrame {
                robots_blue: vec![DetectionRobot {
                    confidence: 1.0,
                    robot_id: 2,
                    x: 100.0 * i as f32,
                    y: 0.0,
                    orientation: None,
                }],
                ..DetectionFrame::default()
            });
            writer.write_vision(i * 16_000_000, &packet).unwrap();
        }
        LogReader::from_bytes(&writer.finish().unwrap(), LogReaderConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_replay_publishes_each_frame() {
        let reader = reader();
        let store = Arc::new(WorldStore::default());
        let mut model = WorldModel::new(TeamColor::Blue, FieldSide::West, store.clone());
        let (_tx, rx) = broadcast::channel(1);

        let replayer = Replayer::new(&reader).unpaced();
        let published = replayer.run(&mut model, rx).await.unwrap();

        assert_eq!(published, reader.len());
        let snapshot = store.current();
        assert_eq!(snapshot.version, reader.len() as u64);
        let robot = snapshot.ally_robot(2).unwrap();
        assert!(robot.is_visible());
        assert_eq!(robot.position().x, 500.0);
    }

    #[tokio::test]
    async fn test_shutdown_stops_replay() {
        let reader = reader();
        let store = Arc::new(WorldStore::default());
        let mut model = WorldModel::new(TeamColor::Blue, FieldSide::West, store);
        let (tx, rx) = broadcast::channel(1);
        tx.send(()).unwrap();

        let published = Replayer::new(&reader).run(&mut model, rx).await.unwrap();
        assert_eq!(published, 1);
    }
}
