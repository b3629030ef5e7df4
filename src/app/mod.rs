//! Application module

pub mod cli;
pub mod session;
pub mod startup;
