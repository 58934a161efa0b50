//! Process-level pieces split from main.rs: health probe, serve loop and
//! shutdown handling.

mod health;
mod server;

pub use health::*;
pub use server::*;
