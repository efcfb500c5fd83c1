#[macro_use]
extern crate log;

#[macro_use]
mod macros;

pub mod app;
pub mod configuration;
pub mod engine;
pub mod reporter;
pub mod time;
