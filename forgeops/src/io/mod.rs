//! I/O adapters: hosting platform APIs, git, files, and the terminal.

pub mod config;
pub mod git;
pub mod github;
pub mod gitlab;
pub mod manifest;
pub mod process;
pub mod prompt;
pub mod remote;
pub mod seal;
pub mod throttle;
