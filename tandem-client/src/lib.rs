//! # tandem-client
//!
//! Runs on each machine that hosts target windows. Keeps one connection
//! to the tandem server, executes the `execute` commands it broadcasts
//! and, between commands, cycles an idle action across every target.
//!
//! ## Modes
//!
//! - **Live**: clicks and keystrokes go through Win32 `SendInput`.
//! - **Dry run**: every click and key transition is only logged
//!   (`--dry-run`); useful on machines without the target windows.

pub mod config;
pub mod desktop;
pub mod service;
