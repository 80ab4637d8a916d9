//! netconverge - Network Convergence Library
//!
//! Makes the network stack of a freshly provisioned host match declared
//! settings:
//! - Device resolution by hardware address
//! - dhclient, ifupdown interfaces and resolv.conf rendering
//! - Convergent writes (only rewrite what changed)
//! - Best-effort service restarts
//! - Background gratuitous ARP announcements

pub mod error;
pub mod validation;
pub mod settings;
pub mod network;
pub mod fs;
pub mod command;
pub mod device;
pub mod render;
pub mod writer;
pub mod service;
pub mod arp;
pub mod config;
pub mod manager;

// Re-export commonly used types
pub use error::{NetconvergeError, NetconvergeResult, ResultExt};
pub use settings::{JsonSettingsProvider, NetworkSettings, Networks, SettingsProvider};
pub use network::ResolvedNetwork;
pub use fs::{FileSystem, OsFileSystem};
pub use command::{CommandOutput, CommandRunner, OsCommandRunner};
pub use device::{DeviceMap, DeviceResolver};
pub use writer::ConvergenceWriter;
pub use service::ServiceController;
pub use arp::{AnnounceTiming, Announcer, GratuitousArpAnnouncer};
pub use config::{ArpSettings, ConfigPaths, NetconvergeConfig};
pub use manager::{IfupdownNetManager, NetManager};
