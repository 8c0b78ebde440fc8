//! Per-session execution context: instance/symbol bindings, imports,
//! libraries, and the session's converter registry overlay.
//!
//! Created when a connection is accepted, mutated only by instructions
//! running on that connection, and dropped when the connection closes --
//! nothing here is ever shared between sessions except (read through, not
//! owned) the process-wide fixture catalog and resolver search path.

use std::collections::HashMap;

use thiserror::Error;

use crate::case;
use crate::convert::{ConverterRegistry, Value};
use crate::fixture::{Fixture, FixtureError, FixtureOutcome};
use crate::resolver::{self, Resolved, ResolverError};

#[derive(Error, Debug, PartialEq)]
pub enum ContextError {
    #[error("no instance named '{0}'")]
    NoInstance(String),
    #[error(transparent)]
    Raised(#[from] FixtureError),
}

/// A resolved call target: the exact (case-resolved) method name to
/// invoke, and which instance owns it -- either the addressed instance
/// itself, or a library instance found via the LIFO fallback stack.
pub struct Target {
    pub owner: String,
    pub method: String,
}

pub struct ExecutionContext {
    imports: Vec<String>,
    instances: HashMap<String, Box<dyn Fixture>>,
    symbols: HashMap<String, Value>,
    libraries: Vec<String>,
    pub converters: ConverterRegistry,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            imports: Vec::new(),
            instances: HashMap::new(),
            symbols: HashMap::new(),
            libraries: Vec::new(),
            converters: ConverterRegistry::new(),
        }
    }
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store_instance(&mut self, name: &str, instance: Box<dyn Fixture>) {
        self.instances.insert(name.to_owned(), instance);
    }

    pub fn get_instance_mut(&mut self, name: &str) -> Result<&mut Box<dyn Fixture>, ContextError> {
        self.instances
            .get_mut(name)
            .ok_or_else(|| ContextError::NoInstance(name.to_owned()))
    }

    pub fn has_instance(&self, name: &str) -> bool {
        self.instances.contains_key(name)
    }

    /// The fixture type name an instance was constructed as, used in
    /// `NO_METHOD_IN_CLASS` diagnostics (which name the *class*, not the
    /// instance variable).
    pub fn instance_type_name(&self, name: &str) -> Option<&str> {
        self.instances.get(name).map(|i| i.type_name())
    }

    pub fn store_symbol(&mut self, name: &str, value: Value) {
        self.symbols.insert(name.to_owned(), value);
    }

    pub fn get_symbol(&self, name: &str) -> Option<&Value> {
        self.symbols.get(name)
    }

    /// Resolves a dotted type name using this session's import list.
    pub fn get_type(&self, dotted_name: &str) -> Result<Resolved, ResolverError> {
        resolver::get_type(dotted_name, &self.imports)
    }

    /// `import <path>`: a path containing a separator is a filesystem
    /// root (forwarded to the process-wide resolver search path);
    /// otherwise it's an import root appended to this session's imports.
    pub fn import_path(&mut self, path: &str) {
        if path.contains('/') || path.contains('\\') {
            resolver::add_import_path(std::path::PathBuf::from(path));
        } else {
            self.imports.push(path.to_owned());
            resolver::record_import(path);
        }
    }

    /// Pushes an instance onto the library fallback stack. Method lookups
    /// on any instance fall through to these, most-recently-added first.
    pub fn add_library(&mut self, instance_name: &str) {
        self.libraries.push(instance_name.to_owned());
    }

    /// Substitutes any `$name` token with the bound symbol's stringified
    /// value (via the session's converter registry), leaving the literal
    /// token unchanged if no such symbol is bound.
    pub fn substitute(&self, token: &str) -> String {
        if let Some(name) = token.strip_prefix('$') {
            if let Some(value) = self.symbols.get(name) {
                return self.converters.to_string(value);
            }
        }
        token.to_owned()
    }

    /// Resolves a method on `instance_name` by exact name, then by
    /// case-convention alias, then by falling through the library stack
    /// (also tried by exact name and alias). Returns `None` if nothing
    /// matches -- the caller records `NO_METHOD_IN_CLASS`.
    pub fn target_for(&self, instance_name: &str, method_name: &str) -> Option<Target> {
        let candidates = case::aliases_for(&case::to_snake_case(method_name));

        if let Some(instance) = self.instances.get(instance_name) {
            if let Some(found) = find_method(instance.as_ref(), &candidates) {
                return Some(Target {
                    owner: instance_name.to_owned(),
                    method: found,
                });
            }
        }

        for lib in self.libraries.iter().rev() {
            if let Some(instance) = self.instances.get(lib) {
                if let Some(found) = find_method(instance.as_ref(), &candidates) {
                    return Some(Target {
                        owner: lib.clone(),
                        method: found,
                    });
                }
            }
        }
        None
    }

    pub fn call_target(
        &mut self,
        target: &Target,
        args: &[Value],
    ) -> Result<FixtureOutcome, ContextError> {
        let instance = self.get_instance_mut(&target.owner)?;
        Ok(instance.call(&target.method, args)?)
    }
}

fn find_method(instance: &dyn Fixture, candidates: &[String; 3]) -> Option<String> {
    let names = instance.method_names();
    candidates
        .iter()
        .find(|c| names.iter().any(|n| n == *c))
        .cloned()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fixture::{FixtureError, MethodSignature};

    struct Greeter {
        greeting: String,
    }

    impl Fixture for Greeter {
        fn type_name(&self) -> &str {
            "Greeter"
        }
        fn signature(&self, _method: &str) -> Option<MethodSignature> {
            Some(MethodSignature::untyped(1))
        }
        fn call(&mut self, method: &str, args: &[Value]) -> Result<FixtureOutcome, FixtureError> {
            match method {
                "echo" => Ok(FixtureOutcome::Value(args[0].clone())),
                "set_greeting" => {
                    self.greeting = args[0].to_string();
                    Ok(FixtureOutcome::Void)
                }
                other => Err(FixtureError::Raised(format!("no such method {}", other))),
            }
        }
        fn method_names(&self) -> Vec<String> {
            vec!["echo".to_owned(), "set_greeting".to_owned()]
        }
    }

    fn ctx_with_greeter() -> ExecutionContext {
        let mut ctx = ExecutionContext::new();
        ctx.store_instance(
            "g",
            Box::new(Greeter {
                greeting: String::new(),
            }),
        );
        ctx
    }

    #[test]
    fn store_then_get_instance_round_trips() {
        let mut ctx = ctx_with_greeter();
        assert!(ctx.get_instance_mut("g").is_ok());
        assert_eq!(
            ctx.get_instance_mut("missing").unwrap_err(),
            ContextError::NoInstance("missing".to_owned())
        );
    }

    #[test]
    fn target_for_matches_exact_name() {
        let ctx = ctx_with_greeter();
        let target = ctx.target_for("g", "echo").unwrap();
        assert_eq!(target.owner, "g");
        assert_eq!(target.method, "echo");
    }

    #[test]
    fn target_for_matches_case_convention_alias() {
        let ctx = ctx_with_greeter();
        // method is stored as snake_case "set_greeting"; callers may ask
        // in camelCase, as a SLIM client naturally would.
        let target = ctx.target_for("g", "setGreeting").unwrap();
        assert_eq!(target.method, "set_greeting");
    }

    #[test]
    fn target_for_falls_through_library_stack() {
        let mut ctx = ctx_with_greeter();
        ctx.store_instance(
            "helper",
            Box::new(Greeter {
                greeting: String::new(),
            }),
        );
        ctx.add_library("helper");
        // "other" has no echo method at all, so it must fall through.
        let target = ctx.target_for("other", "echo").unwrap();
        assert_eq!(target.owner, "helper");
    }

    #[test]
    fn symbol_substitution_falls_back_to_literal_when_unbound() {
        let ctx = ctx_with_greeter();
        assert_eq!(ctx.substitute("$unbound"), "$unbound");
        assert_eq!(ctx.substitute("literal"), "literal");
    }

    #[test]
    fn symbol_substitution_uses_bound_value() {
        let mut ctx = ctx_with_greeter();
        ctx.store_symbol("s", Value::Int(42));
        assert_eq!(ctx.substitute("$s"), "42");
    }

    #[test]
    fn sessions_do_not_share_instances() {
        let a = ctx_with_greeter();
        let b = ExecutionContext::new();
        assert!(a.has_instance("g"));
        assert!(!b.has_instance("g"));
    }
}
