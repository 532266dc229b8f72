//! # Lyrics Telegram Bot
//!
//! A Telegram bot for browsing a catalog of song lyrics. Privileged users
//! add and edit songs through guided multi-step dialogs.

pub mod auth;
pub mod bot;
pub mod catalog;
pub mod circuit_breaker;
pub mod config;
pub mod db;
pub mod dialogue;
pub mod localization;
pub mod media;
pub mod session;
