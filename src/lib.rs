#![forbid(unsafe_code)]

pub mod app;
pub mod cli;
pub mod commands;
pub mod error;
pub mod formats;
pub mod gemini;
pub mod logging;
pub mod outline;
pub mod prompt;
