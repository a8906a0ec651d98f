//! Session management: identity, registry, handshake, and teardown.

pub mod handshake;
pub mod id;
pub mod registry;
pub mod state;
pub mod teardown;

pub use handshake::{HandshakeCoordinator, HandshakeError, HandshakeOutcome};
pub use id::SessionId;
pub use registry::SessionRegistry;
pub use state::{PendingSession, Session, SessionState};
pub use teardown::{close_all, teardown, CloseReason};
