//! Daily task runner for the music partner program. The interesting part is
//! `crypto`, which reproduces the web client's request encryption so rating
//! submissions are accepted; `bot` drives one run end to end.

pub mod bot;
pub mod config;
pub mod crypto;
pub mod http;
pub mod notify;
pub mod task;
