pub mod blocked;
pub mod config;
pub mod dispatch;
pub mod logger;
pub mod notify;
pub mod registry;
pub mod search;
pub mod server;
pub mod session;
pub mod transaction;
pub mod transport;

pub use dispatch::{Engine, HandlerOutcome, Orphaned, Request, Response};
pub use server::VarServer;
pub use session::{Session, SessionTable};
pub use transport::{ClientChannel, ClientReplyHandle, Envelope, Listener};
