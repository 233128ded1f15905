mod manager;
mod worker;

pub use manager::*;
pub use worker::*;
