pub mod message_handler;
pub mod message_sender;

pub use message_handler::*;
pub use message_sender::*;
