//! Gateway module - socket lifecycle, message pump and field decoding

pub mod decoder;
pub mod messages;
pub mod scripted;
pub mod supervisor;
pub mod tick_kind;

pub use decoder::FieldDecoder;
pub use scripted::ScriptedTransport;
pub use supervisor::ConnectionSupervisor;
pub use tick_kind::TickKind;
