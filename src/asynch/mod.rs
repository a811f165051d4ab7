pub mod dispatcher;
pub mod listener;
pub mod runner;
pub mod session;
pub mod state;
pub mod supervisor;

pub use dispatcher::{extract_document, Dispatcher, NotificationHandler};
pub use listener::Listener;
pub use runner::Runner;
pub use session::{Response, Session, Terminator, Transaction};
pub use state::{ChannelState, LinkState};
pub use supervisor::Supervisor;
