//! p2plink-services: the Wi-Fi Direct link manager.
//!
//! The [`LinkCoordinator`] owns the OS P2P platform handle, tracks peer and
//! discovery state, keeps the DNS-SD service directory and reports link and
//! name events to the bus daemon.

pub mod advertise;
pub mod coordinator;
pub mod directory;
pub mod events;
pub mod handle;
pub mod iface;
pub mod loopback;
pub mod platform;
pub mod registry;
pub mod state;
pub mod timer;

pub use advertise::{AdvertisedName, AdvertisedNames};
pub use coordinator::{CoordinatorSettings, CoordinatorStatus, LinkCoordinator};
pub use directory::ServiceDirectory;
pub use events::{EventLog, LinkEvent, LoggedEvent};
pub use handle::HandleTable;
pub use iface::NetworkInterface;
pub use loopback::LoopbackPlatform;
pub use platform::{
    Completer, ConnectionInfo, DnsSdRequest, GroupInfo, LocalService, P2pPlatform, PeerConfig,
    PeerDevice, PendingRequest, PlatformEvent, WpsSetup,
};
pub use registry::{DiscoveredService, DiscoveredServices};
pub use state::{FindState, IllegalTransition, LinkState, PeerState};
