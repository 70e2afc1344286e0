mod commands;
mod executor;
pub mod view;

pub use commands::*;
pub use executor::*;
