//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `classifier`: Turns raw updates into commands, button presses, text, photos or callbacks
//! - `dialogue_manager`: Pure Add/Edit state machine
//! - `dispatcher`: Routes classified updates and executes dialogue effects
//! - `catalog_handler`: Stateless catalog browsing
//! - `message_handler`: Handles incoming text and photo messages
//! - `callback_handler`: Handles inline keyboard callback queries
//! - `transport`: Outbound chat operations
//! - `ui_builder`: Creates keyboards and formats messages

pub mod callback_handler;
pub mod catalog_handler;
pub mod classifier;
pub mod dialogue_manager;
pub mod dispatcher;
pub mod message_handler;
pub mod transport;
pub mod ui_builder;

// Re-export main handler functions for use in main.rs
pub use callback_handler::callback_handler;
pub use message_handler::message_handler;

pub use dispatcher::UpdateDispatcher;
pub use transport::{ChatTransport, TelegramTransport};
pub use ui_builder::Keyboard;
