//! The instruction set: parses a decoded request list into typed
//! instructions and executes each against an `ExecutionContext`, turning
//! every possible failure into a `__EXCEPTION__` result rather than letting
//! it escape -- `run_instructions` is the one place in this crate that
//! is guaranteed never to return an `Err`.

use enum_dispatch::enum_dispatch;
use std::str::FromStr;
use strum_macros::EnumString;

use crate::codec::Value as Wire;
use crate::context::ExecutionContext;
use crate::convert::{ArgSpec, ConvertError, Value};
use crate::fixture::FixtureOutcome;
use crate::resolver::{Resolved, ResolverError};

const VOID_MARKER: &str = "/__VOID__/";
const EXCEPTION_TAG: &str = "__EXCEPTION__";

fn exception(code: &str, detail: &str) -> String {
    format!("{}: message:<<{} {}>>", EXCEPTION_TAG, code, detail)
}

/// Embeds a raised or converter message directly, without inventing a
/// code -- per the wire protocol, only messages this server itself
/// classifies (`NO_CLASS`, `NO_INSTANCE`, ...) get a code prefix.
fn exception_raw(message: &str) -> String {
    format!("{}: message:<<{}>>", EXCEPTION_TAG, message)
}

#[derive(Debug, Clone, Copy, PartialEq, EnumString)]
#[strum(serialize_all = "lowercase")]
enum Verb {
    Import,
    Make,
    Call,
    #[strum(serialize = "callandassign")]
    CallAndAssign,
}

fn wire_string(value: &Wire) -> String {
    match value {
        Wire::Str(s) => s.clone(),
        Wire::Null => String::new(),
        Wire::List(_) => String::new(),
    }
}

fn wire_list(value: &Wire) -> Vec<Wire> {
    match value {
        Wire::List(items) => items.clone(),
        _ => Vec::new(),
    }
}

#[enum_dispatch]
pub trait Execute {
    fn execute(&self, ctx: &mut ExecutionContext) -> Wire;
    fn id(&self) -> &str;
}

pub struct Import {
    id: String,
    path: String,
}

impl Execute for Import {
    fn execute(&self, ctx: &mut ExecutionContext) -> Wire {
        ctx.import_path(&self.path);
        Wire::str("OK")
    }
    fn id(&self) -> &str {
        &self.id
    }
}

pub struct Make {
    id: String,
    instance_name: String,
    type_name: String,
    raw_args: Vec<String>,
}

impl Execute for Make {
    fn execute(&self, ctx: &mut ExecutionContext) -> Wire {
        let resolved = match ctx.get_type(&self.type_name) {
            Ok(r) => r,
            Err(e @ ResolverError::NoSuchModule(_)) | Err(e @ ResolverError::NoSuchType(_)) => {
                return Wire::str(exception("NO_CLASS", &format!("{} {}", self.type_name, e)));
            }
        };
        let ctor = match resolved {
            Resolved::Fixture(ctor) => ctor,
            Resolved::Builtin(tag) => {
                return Wire::str(exception(
                    "NO_CLASS",
                    &format!("'{}' is a builtin type, not constructible", tag),
                ));
            }
        };
        let args: Vec<Value> = self
            .raw_args
            .iter()
            .map(|a| Value::Str(ctx.substitute(a)))
            .collect();
        match ctor(&args) {
            Ok(instance) => {
                ctx.store_instance(&self.instance_name, instance);
                Wire::str("OK")
            }
            Err(e) => Wire::str(exception("COULD_NOT_INVOKE_CONSTRUCTOR", &format!("{} {}", self.type_name, e))),
        }
    }
    fn id(&self) -> &str {
        &self.id
    }
}

pub struct Call {
    id: String,
    instance_name: String,
    method_name: String,
    raw_args: Vec<String>,
}

/// Shared by `Call` and `CallAndAssign`: resolves the target, converts
/// arguments per its declared signature (falling back to `str` for any
/// fixture that declares no signature), invokes it, and renders the
/// result. Returns the rendered wire value plus the typed result (for
/// `CallAndAssign` to bind to a symbol).
fn invoke(
    ctx: &mut ExecutionContext,
    instance_name: &str,
    method_name: &str,
    raw_args: &[String],
) -> Result<(Wire, Value), String> {
    if !ctx.has_instance(instance_name) {
        return Err(exception("NO_INSTANCE", instance_name));
    }

    let target = ctx.target_for(instance_name, method_name).ok_or_else(|| {
        let type_name = ctx.instance_type_name(instance_name).unwrap_or(instance_name);
        exception("NO_METHOD_IN_CLASS", &format!("{} {}", method_name, type_name))
    })?;

    let substituted: Vec<String> = raw_args.iter().map(|a| ctx.substitute(a)).collect();

    let arg_specs = ctx
        .get_instance_mut(&target.owner)
        .ok()
        .and_then(|inst| inst.signature(&target.method))
        .map(|sig| sig.arg_specs)
        .unwrap_or_else(|| vec![ArgSpec::ByTag("str"); substituted.len()]);

    let default_spec = ArgSpec::ByTag("str");
    let mut args = Vec::with_capacity(substituted.len());
    for (i, text) in substituted.iter().enumerate() {
        let spec = arg_specs.get(i).unwrap_or(&default_spec);
        match spec.convert(&ctx.converters, text) {
            Ok(v) => args.push(v),
            Err(ConvertError::BadFormat(text, tag)) => {
                return Err(exception_raw(&format!("'{}' is not a valid {}", text, tag)));
            }
            Err(e) => return Err(exception_raw(&e.to_string())),
        }
    }

    match ctx.call_target(&target, &args) {
        Ok(FixtureOutcome::Void) => Ok((Wire::str(VOID_MARKER), Value::Void)),
        Ok(FixtureOutcome::Value(v)) => {
            let rendered = ctx.converters.to_wire(&v);
            Ok((rendered, v))
        }
        Err(e) => Err(exception_raw(&e.to_string())),
    }
}

impl Execute for Call {
    fn execute(&self, ctx: &mut ExecutionContext) -> Wire {
        match invoke(ctx, &self.instance_name, &self.method_name, &self.raw_args) {
            Ok((rendered, _)) => rendered,
            Err(msg) => Wire::str(msg),
        }
    }
    fn id(&self) -> &str {
        &self.id
    }
}

pub struct CallAndAssign {
    id: String,
    symbol: String,
    instance_name: String,
    method_name: String,
    raw_args: Vec<String>,
}

impl Execute for CallAndAssign {
    fn execute(&self, ctx: &mut ExecutionContext) -> Wire {
        match invoke(ctx, &self.instance_name, &self.method_name, &self.raw_args) {
            Ok((rendered, value)) => {
                ctx.store_symbol(&self.symbol, value);
                rendered
            }
            Err(msg) => Wire::str(msg),
        }
    }
    fn id(&self) -> &str {
        &self.id
    }
}

pub struct Unrecognised {
    id: String,
    verb: String,
}

impl Execute for Unrecognised {
    fn execute(&self, _ctx: &mut ExecutionContext) -> Wire {
        Wire::str(exception("INVALID_STATEMENT", &self.verb))
    }
    fn id(&self) -> &str {
        &self.id
    }
}

#[enum_dispatch(Execute)]
pub enum Instruction {
    Import(Import),
    Make(Make),
    Call(Call),
    CallAndAssign(CallAndAssign),
    Unrecognised(Unrecognised),
}

/// Parses one decoded instruction list. The wire shape is
/// `[id, verb, ...]`, with the remaining fields depending on the verb:
/// `import` takes a path; `make` takes instance name, type name, and
/// constructor args; `call` takes instance name, method name, and call
/// args; `callAndAssign` additionally takes a symbol name before the
/// instance name.
pub fn parse_instruction(fields: &[Wire]) -> Instruction {
    let id = fields.get(0).map(wire_string).unwrap_or_default();
    let verb_text = fields.get(1).map(wire_string).unwrap_or_default();

    let verb = match Verb::from_str(&verb_text.to_lowercase()) {
        Ok(v) => v,
        Err(_) => {
            return Instruction::Unrecognised(Unrecognised { id, verb: verb_text });
        }
    };

    match verb {
        Verb::Import => Instruction::Import(Import {
            id,
            path: fields.get(2).map(wire_string).unwrap_or_default(),
        }),
        Verb::Make => Instruction::Make(Make {
            id,
            instance_name: fields.get(2).map(wire_string).unwrap_or_default(),
            type_name: fields.get(3).map(wire_string).unwrap_or_default(),
            raw_args: fields.get(4..).unwrap_or(&[]).iter().map(wire_string).collect(),
        }),
        Verb::Call => Instruction::Call(Call {
            id,
            instance_name: fields.get(2).map(wire_string).unwrap_or_default(),
            method_name: fields.get(3).map(wire_string).unwrap_or_default(),
            raw_args: fields.get(4..).unwrap_or(&[]).iter().map(wire_string).collect(),
        }),
        Verb::CallAndAssign => Instruction::CallAndAssign(CallAndAssign {
            id,
            symbol: fields.get(2).map(wire_string).unwrap_or_default(),
            instance_name: fields.get(3).map(wire_string).unwrap_or_default(),
            method_name: fields.get(4).map(wire_string).unwrap_or_default(),
            raw_args: fields.get(5..).unwrap_or(&[]).iter().map(wire_string).collect(),
        }),
    }
}

/// Executes every instruction in a decoded request list against `ctx`,
/// returning a response list of `[id, result]` pairs in request order.
/// Never panics or propagates an error: any failure to resolve, convert,
/// construct, or invoke becomes a stringified `__EXCEPTION__` result for
/// that one instruction, and the session continues.
pub fn run_instructions(request: Wire, ctx: &mut ExecutionContext) -> Wire {
    let statements = wire_list(&request);
    let results = statements
        .iter()
        .map(|stmt| {
            let fields = wire_list(stmt);
            let instruction = parse_instruction(&fields);
            let id = instruction.id().to_owned();
            let result = instruction.execute(ctx);
            Wire::list(vec![Wire::str(id), result])
        })
        .collect();
    Wire::list(results)
}
