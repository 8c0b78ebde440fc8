//! Type resolver: dotted-name lookup over the fixture catalog.
//!
//! A handful of builtin names short-circuit to a builtin type tag; anything
//! else is looked up in the fixture catalog, first under its exact dotted
//! name, then under each of the session's *imports* prefixes in turn. The
//! process-wide module cache and search-path vector are shared across
//! sessions (guarded by `parking_lot::Mutex`, append-only); only the
//! *imports* ordering used to build candidate names is per-session.

use std::collections::HashSet;
use std::path::PathBuf;

use lazy_static::lazy_static;
use parking_lot::Mutex;
use thiserror::Error;

use crate::fixture::{self, FixtureCtor};

const BUILTIN_TYPES: &[&str] = &["str", "int", "float", "bool", "date", "time", "datetime"];

#[derive(Error, Debug, PartialEq)]
pub enum ResolverError {
    #[error("no module named '{0}'")]
    NoSuchModule(String),
    #[error("module found but it has no type named '{0}'")]
    NoSuchType(String),
}

/// A resolved target: either a builtin type tag (no fixture construction
/// possible -- builtins are used for argument/result conversion, not
/// `make`) or a fixture constructor.
#[derive(Clone)]
pub enum Resolved {
    Builtin(&'static str),
    Fixture(FixtureCtor),
}

lazy_static! {
    /// Process-wide, idempotent record of which import roots have been
    /// "imported" (i.e. had a filesystem search path registered, or been
    /// named as a root once before). Mirrors `get_module`'s caching
    /// contract: repeated imports, from any session, are no-ops after the
    /// first.
    static ref SEEN_MODULES: Mutex<HashSet<String>> = Mutex::new(HashSet::new());
    /// Process-wide, append-only filesystem search roots contributed by
    /// `--syspath` and any session's `import_path` with a path argument.
    static ref SEARCH_PATH: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());
}

/// Prepends a filesystem path to the resolver's search roots for the
/// remainder of the process (append-only, shared across sessions).
pub fn add_import_path(path: PathBuf) {
    SEARCH_PATH.lock().insert(0, path);
}

/// Current search roots, most-recently-added first.
pub fn search_path() -> Vec<PathBuf> {
    SEARCH_PATH.lock().clone()
}

/// Marks `name` as imported in the process-wide module cache. Returns
/// `true` the first time a given name is recorded, `false` on every
/// subsequent call -- callers use this only for idempotency bookkeeping,
/// not as a signal that the module exists.
pub fn record_import(name: &str) -> bool {
    SEEN_MODULES.lock().insert(name.to_owned())
}

/// Resolves a dotted (or bare builtin) type name against the fixture
/// catalog, trying each of `imports` as a prefix in order, then the bare
/// name on its own.
pub fn get_type(dotted_name: &str, imports: &[String]) -> Result<Resolved, ResolverError> {
    if BUILTIN_TYPES.contains(&dotted_name) {
        let tag = BUILTIN_TYPES
            .iter()
            .find(|t| **t == dotted_name)
            .expect("just checked contains");
        return Ok(Resolved::Builtin(tag));
    }

    if let Some(ctor) = fixture::lookup(dotted_name) {
        record_import(dotted_name);
        return Ok(Resolved::Fixture(ctor));
    }

    for root in imports {
        let candidate = format!("{}.{}", root, dotted_name);
        if let Some(ctor) = fixture::lookup(&candidate) {
            record_import(root);
            return Ok(Resolved::Fixture(ctor));
        }
    }

    // Distinguish "the module root itself is unknown" (import error) from
    // "the module root is known but doesn't contain this type" (type
    // error), the same split `get_type` makes upstream.
    let root_guess = dotted_name.rsplitn(2, '.').nth(1);
    match root_guess {
        Some(root) if fixture::catalog_names().iter().any(|n| n.starts_with(root)) => {
            Err(ResolverError::NoSuchType(dotted_name.to_owned()))
        }
        _ => Err(ResolverError::NoSuchModule(dotted_name.to_owned())),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::convert::Value;
    use crate::fixture::{Fixture, FixtureError, FixtureOutcome, MethodSignature};

    struct Echo;
    impl Fixture for Echo {
        fn type_name(&self) -> &str {
            "Echo"
        }
        fn signature(&self, _method: &str) -> Option<MethodSignature> {
            None
        }
        fn call(&mut self, _method: &str, _args: &[Value]) -> Result<FixtureOutcome, FixtureError> {
            Ok(FixtureOutcome::Void)
        }
        fn method_names(&self) -> Vec<String> {
            vec![]
        }
    }

    fn ctor(_args: &[Value]) -> Result<Box<dyn Fixture>, FixtureError> {
        Ok(Box::new(Echo))
    }

    #[test]
    fn builtin_names_resolve_without_imports() {
        assert!(matches!(get_type("str", &[]), Ok(Resolved::Builtin("str"))));
        assert!(matches!(get_type("int", &[]), Ok(Resolved::Builtin("int"))));
    }

    #[test]
    fn resolves_fixture_by_exact_dotted_name() {
        fixture::register("resolver_test.ExactFixture", ctor);
        assert!(matches!(
            get_type("resolver_test.ExactFixture", &[]),
            Ok(Resolved::Fixture(_))
        ));
    }

    #[test]
    fn resolves_fixture_via_import_prefix() {
        fixture::register("resolver_test_fixtures.ImportedFixture", ctor);
        let imports = vec!["resolver_test_fixtures".to_owned()];
        assert!(matches!(
            get_type("ImportedFixture", &imports),
            Ok(Resolved::Fixture(_))
        ));
    }

    #[test]
    fn unknown_root_is_a_module_error() {
        assert_eq!(
            get_type("totally.unknown.root.Thing", &[]).unwrap_err(),
            ResolverError::NoSuchModule("totally.unknown.root.Thing".to_owned())
        );
    }

    #[test]
    fn lookup_is_idempotent_across_calls() {
        fixture::register("resolver_test_idem.Stable", ctor);
        let a = get_type("resolver_test_idem.Stable", &[]);
        let b = get_type("resolver_test_idem.Stable", &[]);
        assert!(matches!(a, Ok(Resolved::Fixture(_))));
        assert!(matches!(b, Ok(Resolved::Fixture(_))));
    }
}
