//! API request handlers

mod accounts;
mod export;
mod imports;

pub use accounts::*;
pub use export::*;
pub use imports::*;
