//! CLI module
//!
//! Command-line front end over the client.
//!
//! # Commands
//!
//! - `get` - Make one API call and print the body
//! - `paginate` - Print every element of a listing, one per line
//! - `rate-limit` - Show the current rate-limit counters

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
