//! Translation sessions: wire protocol, the per-language connection
//! actor, and the per-chunk session state machine.

pub mod connection;
pub mod protocol;
pub mod translator;

pub use connection::{ConnectSettings, ConnectionHandle, EventSubscription};
pub use protocol::ServerEvent;
pub use translator::TranslationSession;
