//! Crate-wide error aggregation.
//!
//! Each component module defines its own `Error` type (`ContextError`,
//! `ResolverError`, `ConvertError`, `FixtureError`); this module provides
//! the umbrella enum for callers outside the interpreter (e.g. a fixture
//! that wants to bubble up "something in the interpreter went wrong"
//! without naming which component raised it). Inside the interpreter,
//! `instruction.rs` catches each of these individually and turns them
//! into `__EXCEPTION__` result payloads -- none of them ever escape the
//! instructions driver.

use thiserror::Error;

use crate::context::ContextError;
use crate::convert::ConvertError;
use crate::fixture::FixtureError;
use crate::resolver::ResolverError;

/// Any error a single instruction's execution can raise.
///
/// `instruction.rs` catches all of these and turns them into
/// `__EXCEPTION__` result payloads; none of them ever escape the
/// instructions driver.
#[derive(Error, Debug)]
pub enum InterpreterError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Resolver(#[from] ResolverError),
    #[error(transparent)]
    Convert(#[from] ConvertError),
    #[error(transparent)]
    Fixture(#[from] FixtureError),
}
