//! # Activity Board Bot
//!
//! A Telegram bot engine for button-driven interactive messages and scheduled
//! message boards.
//!
//! ## Features
//! - Multi-step activities (wizards, menus, paginated lists) that live in a single
//!   message and are edited in place as the user presses buttons or replies
//! - Routing of button presses and replies to the activity owning the message,
//!   with expiry of stale keyboards
//! - Per-chat pinned message boards that show a weekly schedule or the most
//!   relevant transient event
//! - Season wizard, chat settings and error sharing built on the engine
//! - Persistent storage with SQLite

/// Interactive activities and the registry routing events to them
pub mod activity;
/// Per-chat message boards and their weekly schedule
pub mod board;
/// Bot command handlers and the concrete activity states
pub mod bot;
/// Configuration management and environment variables
pub mod config;
/// Database models, connections, and migrations
pub mod database;
/// Error types shared across the engine
pub mod error;
/// Messaging transport abstraction and its implementations
pub mod gateway;
/// Background services: board scheduler and health endpoint
pub mod services;
/// Utility functions for datetime, validation, logging and feedback
pub mod utils;
