//! Concrete PostgreSQL repository implementations of the collaborator
//! contracts.

pub mod message;
pub mod session;
pub mod user;

pub use message::MessageRepository;
pub use session::SessionRepository;
pub use user::UserRepository;
