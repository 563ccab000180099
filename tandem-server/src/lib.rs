//! # tandem-server
//!
//! The control side of tandem. Accepts any number of clients, turns key
//! presses into `execute` commands through the keybind table and
//! broadcasts each command to every connected client. Client replies
//! are logged.
//!
//! Key presses come from the built-in repeating [`keys::KeyScript`] or
//! from any other producer holding [`server::TandemServer::key_sender`].

pub mod config;
pub mod keys;
pub mod server;
