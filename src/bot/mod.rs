//! Telegram-facing layer: handlers, panel state machine and messaging
//! utilities.

pub mod chat_gate;
pub mod handlers;
pub mod panel;
pub mod panel_registry;
pub mod resilient;

pub use chat_gate::ChatGate;
pub use panel_registry::PanelRegistry;
