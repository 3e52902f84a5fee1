//! Aria CLI - headless decode-and-meter harness for the Aria playback engine
//!
//! Decoded audio is paced in real time, run through the effects rack and
//! measured by a level meter, then discarded.

pub mod backend;
pub mod commands;
pub mod config;
pub mod error;
pub mod library;
