#[macro_use]
extern crate log;

pub mod case;
pub mod cli;
pub mod codec;
pub mod context;
pub mod convert;
pub mod error;
pub mod fixture;
pub mod instruction;
pub mod resolver;
pub mod server;
pub mod session;

pub use error::InterpreterError;
