pub mod config;
pub mod errors;
pub mod models;
pub mod traits;

pub use config::*;
pub use errors::*;
pub use models::{AlphaResponse, CompensateCommand, EventType, ServiceConfig, TxEvent};
pub use traits::{MessageHandler, MessageSender};
