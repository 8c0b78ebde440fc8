//! Fixture capability trait and the plugin-style constructor catalog.
//!
//! A "load a class by dotted name and call its methods" design has no
//! direct Rust equivalent; a fixture is instead a value implementing
//! `Fixture` (a name plus a `(method_name, args) -> result` capability),
//! and the catalog of constructible fixture types is a build-time
//! registration table rather than a runtime class loader.

use std::collections::HashMap;

use lazy_static::lazy_static;
use parking_lot::Mutex;
use thiserror::Error;

use crate::convert::{ArgSpec, Value};

#[derive(Error, Debug, PartialEq, Clone)]
pub enum FixtureError {
    #[error("{0}")]
    Raised(String),
}

/// Declares how a fixture method's positional arguments should be
/// converted from wire text, and (implicitly, via the return value's own
/// runtime type) how its result is converted back.
pub struct MethodSignature {
    pub arg_specs: Vec<ArgSpec>,
}

impl MethodSignature {
    pub fn new(arg_specs: Vec<ArgSpec>) -> Self {
        Self { arg_specs }
    }

    /// A signature with no declared per-argument conversions: every
    /// argument is treated as `str` (the common case for fixtures whose
    /// methods take and return text).
    pub fn untyped(arity: usize) -> Self {
        Self {
            arg_specs: vec![ArgSpec::ByTag("str"); arity],
        }
    }
}

/// The outcome of invoking one method on a fixture instance.
pub enum FixtureOutcome {
    /// A call that returns no value (`/__VOID__/` on the wire).
    Void,
    /// A call that returns a value.
    Value(Value),
}

/// A user-supplied fixture instance: a name plus a dispatch table. This is
/// the capability every constructed fixture must provide; `#[derive]`-free
/// by design, since the actual fixtures in a SLIM deployment are defined
/// downstream of this crate and registered with `register_fixture!`.
pub trait Fixture: Send {
    /// The type name this instance was constructed as, used in
    /// `NO_METHOD_IN_CLASS` diagnostics.
    fn type_name(&self) -> &str;

    /// Looks up the declared signature for a method, if this fixture
    /// exposes one by that exact (already case-resolved) name.
    fn signature(&self, method: &str) -> Option<MethodSignature>;

    /// Invokes a method by its exact (already case-resolved) name with
    /// already-converted positional arguments.
    fn call(&mut self, method: &str, args: &[Value]) -> Result<FixtureOutcome, FixtureError>;

    /// All method names this fixture exposes, used by `target_for` to
    /// build the case-convention alias table.
    fn method_names(&self) -> Vec<String>;
}

/// Constructs a boxed fixture instance from already-converted constructor
/// arguments.
pub type FixtureCtor = fn(&[Value]) -> Result<Box<dyn Fixture>, FixtureError>;

lazy_static! {
    /// Process-wide, populated once at registration time (either by
    /// `register_fixture!` calls executed during `main`'s startup, or by
    /// tests registering their own fixtures), then read-only for the
    /// lifetime of the process. Guarded by a mutex only to make
    /// registration itself safe to call from more than one place; lookups
    /// never contend with a writer once startup is done.
    static ref CATALOG: Mutex<HashMap<String, FixtureCtor>> = Mutex::new(HashMap::new());
}

/// Registers a fixture constructor under its dotted type name. Calling
/// this twice for the same name replaces the earlier registration -- used
/// by tests that want a throwaway fixture type.
pub fn register(dotted_name: &str, ctor: FixtureCtor) {
    CATALOG.lock().insert(dotted_name.to_owned(), ctor);
}

/// Looks up a constructor by its fully-resolved dotted (or bare) name.
pub fn lookup(dotted_name: &str) -> Option<FixtureCtor> {
    CATALOG.lock().get(dotted_name).copied()
}

/// Every dotted name currently in the catalog; `resolver.rs` searches this
/// list when trying import-prefixed candidates.
pub fn catalog_names() -> Vec<String> {
    CATALOG.lock().keys().cloned().collect()
}

/// Registers a fixture constructor at crate-init time: a compile-time
/// stand-in for scanning a package for classes at import time.
#[macro_export]
macro_rules! register_fixture {
    ($dotted_name:expr, $ctor:expr) => {
        $crate::fixture::register($dotted_name, $ctor)
    };
}
