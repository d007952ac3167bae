//! Abstract collaborator contracts consumed by the gate and the
//! delivery engine.

pub mod backplane;
pub mod message_store;
pub mod session_store;
pub mod user_directory;

pub use backplane::{Backplane, GroupEvent, user_group};
pub use message_store::MessageStore;
pub use session_store::{SessionStore, SessionUpsert};
pub use user_directory::{DeviceRegistration, UserDirectory};
