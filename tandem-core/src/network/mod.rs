pub mod connection;
pub mod registry;
pub mod supervisor;

pub use connection::{Connection, ConnectionInfo};
pub use registry::{ConnectionId, Inbound, Registry, WRITE_TIMEOUT};
pub use supervisor::{DEFAULT_RECONNECT_DELAY, Dispatch, Supervisor};
