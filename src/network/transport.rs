//! UDP Transport
//!
//! Best-effort command delivery and feedback/vision reception. A failed
//! send is reported to the caller and never retried; the next tick sends
//! a fresh command anyway.

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, instrument};

use super::command::{Command, PacketKind};
use super::feedback::{Feedback, FEEDBACK_PACKET_LEN};
use crate::config::Config;
use crate::error::{CoreError, Result};
use crate::vision::frame::{merge, remove_ghosts, Accumulator, Tracking};
use crate::vision::messages::{RefereePacket, WrapperPacket};
use crate::world::objects::valid_robot_id;
use crate::world::WorldModel;

const MAX_DATAGRAM: usize = 65_536;

/// Anything that accepts outbound robot commands.
pub trait CommandSink: Send + Sync + 'static {
    /// Deliver one command.
    fn send(&self, command: Command) -> impl Future<Output = Result<()>> + Send;
}

impl<T: CommandSink> CommandSink for Arc<T> {
    fn send(&self, command: Command) -> impl Future<Output = Result<()>> + Send {
        (**self).send(command)
    }
}

/// Command socket towards the robots or the simulator.
pub struct UdpTransport {
    socket: UdpSocket,
    destination: SocketAddr,
    kind: PacketKind,
}

impl UdpTransport {
    /// Open an ephemeral socket aimed at the configured output address.
    pub async fn bind(config: &Config) -> Result<Self> {
        let destination = config.output_addr();
        let local: SocketAddr = match destination.ip() {
            IpAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            IpAddr::V6(_) => (std::net::Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local).await?;
        if destination.ip().is_multicast() {
            socket.set_multicast_ttl_v4(1)?;
        }
        let kind = if config.simulation {
            PacketKind::Simulation
        } else {
            PacketKind::Robot
        };
        info!("Sending {:?} commands to {}", kind, destination);
        Ok(Self {
            socket,
            destination,
            kind,
        })
    }

    /// Where commands go.
    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    /// Local socket address (feedback arrives here).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Send the reserved stop-everything command.
    pub async fn broadcast_stop(&self) -> Result<()> {
        info!("Broadcasting stop to all robots");
        self.send(Command::stop_all()).await
    }

    /// Wait for the next feedback datagram.
    pub async fn recv_feedback(&self) -> Result<Feedback> {
        let mut buf = [0u8; FEEDBACK_PACKET_LEN * 2];
        let (len, from) = self.socket.recv_from(&mut buf).await?;
        debug!("Feedback of {} bytes from {}", len, from);
        Feedback::decode(&buf[..len])
    }
}

impl CommandSink for UdpTransport {
    async fn send(&self, command: Command) -> Result<()> {
        if !valid_robot_id(command.robot_id) {
            return Err(CoreError::InvalidRobotId(command.robot_id));
        }
        let packet = command.encode(self.kind);
        self.socket.send_to(&packet, self.destination).await?;
        Ok(())
    }
}

/// Sink that keeps every command in memory.
#[derive(Default)]
pub struct MemorySink {
    sent: Mutex<Vec<Command>>,
    failing: bool,
}

impl MemorySink {
    /// Recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink whose sends always fail (nothing is recorded).
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    /// Every command accepted so far.
    pub async fn sent(&self) -> Vec<Command> {
        self.sent.lock().await.clone()
    }

    /// Commands accepted for one robot.
    pub async fn sent_to(&self, robot_id: u8) -> Vec<Command> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|c| c.robot_id == robot_id)
            .copied()
            .collect()
    }
}

impl CommandSink for MemorySink {
    async fn send(&self, command: Command) -> Result<()> {
        if !valid_robot_id(command.robot_id) {
            return Err(CoreError::InvalidRobotId(command.robot_id));
        }
        if self.failing {
            return Err(CoreError::NetworkUnavailable(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "sink unavailable",
            )));
        }
        self.sent.lock().await.push(command);
        Ok(())
    }
}

/// Bind a receive socket, joining the group for multicast addresses.
async fn bind_receiver(addr: SocketAddr) -> Result<UdpSocket> {
    match addr.ip() {
        IpAddr::V4(group) if group.is_multicast() => {
            let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, addr.port())).await?;
            socket.join_multicast_v4(group, Ipv4Addr::UNSPECIFIED)?;
            Ok(socket)
        }
        _ => Ok(UdpSocket::bind(addr).await?),
    }
}

/// Live vision and referee feed.
pub struct VisionReceiver {
    vision: UdpSocket,
    referee: UdpSocket,
    tracking: Tracking,
}

impl VisionReceiver {
    /// Bind the configured vision and referee addresses.
    pub async fn bind(config: &Config) -> Result<Self> {
        let vision = bind_receiver(config.input_addr()).await?;
        let referee = bind_receiver(config.referee_addr()).await?;
        info!(
            "Listening for vision on {} and referee on {}",
            config.input_addr(),
            config.referee_addr()
        );
        Ok(Self {
            vision,
            referee,
            tracking: Tracking {
                blue: config.track_blue,
                yellow: config.track_yellow,
            },
        })
    }

    /// Local vision socket address.
    pub fn vision_addr(&self) -> Result<SocketAddr> {
        Ok(self.vision.local_addr()?)
    }

    /// Local referee socket address.
    pub fn referee_addr(&self) -> Result<SocketAddr> {
        Ok(self.referee.local_addr()?)
    }

    /// Feed datagrams into `model` until shutdown.
    ///
    /// Every datagram publishes one snapshot. A datagram that fails to
    /// decode ends the session with the error. Returns the number of
    /// published snapshots.
    #[instrument(skip(self, model, shutdown))]
    pub async fn run(&self, model: &mut WorldModel, mut shutdown: broadcast::Receiver<()>) -> Result<u64> {
        let mut vision_buf = vec![0u8; MAX_DATAGRAM];
        let mut referee_buf = vec![0u8; MAX_DATAGRAM];
        let mut accumulator = Accumulator::default();
        let mut updates = 0u64;
        let mut published = 0u64;

        loop {
            tokio::select! {
                result = self.vision.recv_from(&mut vision_buf) => {
                    let (len, _) = result?;
                    let packet = WrapperPacket::from_bytes(&vision_buf[..len])?;
                    if let Some(geometry) = &packet.geometry {
                        model.set_field(geometry.to_field());
                    }
                    if let Some(detection) = &packet.detection {
                        let merged = merge(&accumulator, detection, updates, self.tracking);
                        updates += 1;
                        let (pruned, removed) = remove_ghosts(&merged, updates);
                        if removed > 0 {
                            debug!("Removed {} ghost robots", removed);
                        }
                        accumulator = pruned;
                        model.ingest_detection(&accumulator.frame, updates);
                    }
                    model.publish();
                    published += 1;
                }
                result = self.referee.recv_from(&mut referee_buf) => {
                    let (len, _) = result?;
                    let packet = RefereePacket::from_bytes(&referee_buf[..len])?;
                    model.ingest_referee(&packet);
                    model.publish();
                    published += 1;
                }
                _ = shutdown.recv() => {
                    info!("Vision receiver stopping after {} snapshots", published);
                    return Ok(published);
                }
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
