//! Robot link.
//!
//! Outbound command packets, inbound feedback, and the UDP sockets that
//! carry them.

pub mod command;
pub mod feedback;
pub mod transport;

pub use command::{Command, PacketKind, COMMAND_PACKET_LEN};
pub use feedback::{Feedback, FEEDBACK_PACKET_LEN};
pub use transport::{CommandSink, MemorySink, UdpTransport, VisionReceiver};
