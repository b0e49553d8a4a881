//! Value generators: ordered op chains gated by preserve/require/once.
//!
//! The first op receives the field's current value (`None` when absent);
//! each later op receives the previous op's output. Declared args are passed
//! after the value.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::BoxError;
use crate::value::is_empty;

/// Shared generator op.
pub type GeneratorFn =
    Arc<dyn Fn(Option<Value>, &[Value]) -> Result<Option<Value>, BoxError> + Send + Sync>;

/// One step of a generator chain.
#[derive(Clone)]
pub struct GeneratorOp {
    /// Function to call.
    pub func: GeneratorFn,
    /// Arguments appended after the chained value.
    pub args: Vec<Value>,
}

impl fmt::Debug for GeneratorOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorOp")
            .field("func", &"<fn>")
            .field("args", &self.args)
            .finish()
    }
}

/// Generator configuration for one field.
///
/// # Examples
///
/// ```
/// use record_schema_core::Generator;
/// use serde_json::{json, Value};
///
/// let slug = Generator::new()
///     .op(|current, _| Ok(current))
///     .op_with_args(
///         |current, args| {
///             let base = current.as_ref().and_then(Value::as_str).unwrap_or("");
///             let suffix = args[0].as_str().unwrap_or("");
///             Ok(Some(json!(format!("{base}{suffix}"))))
///         },
///         vec![json!("-1")],
///     );
///
/// assert_eq!(slug.run(Some(json!("zim"))).unwrap(), Some(json!("zim-1")));
/// ```
#[derive(Clone, Default, Debug)]
pub struct Generator {
    /// Ops in call order.
    pub ops: Vec<GeneratorOp>,
    /// Never overwrite a non-empty value.
    pub preserve: bool,
    /// Only run when the field key is present on the input record.
    pub require: bool,
    /// Only run when the format call asks for run-once generators.
    pub once: bool,
}

/// Per-call facts a generator's gates are checked against.
#[derive(Debug, Clone, Copy)]
pub struct GenerateGate<'a> {
    /// Value currently held by the field.
    pub current: Option<&'a Value>,
    /// Whether the field key exists on the input record.
    pub key_present: bool,
    /// Whether the format call enabled run-once generators.
    pub run_once: bool,
}

impl Generator {
    /// An empty chain with every gate off.
    pub fn new() -> Self {
        Self::default()
    }

    /// A single-op chain that ignores the current value.
    pub fn from_fn<F>(produce: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self::new().op(move |_, _| Ok(Some(produce())))
    }

    /// Appends an op with no extra arguments.
    pub fn op<F>(self, func: F) -> Self
    where
        F: Fn(Option<Value>, &[Value]) -> Result<Option<Value>, BoxError> + Send + Sync + 'static,
    {
        self.op_with_args(func, Vec::new())
    }

    /// Appends an op with arguments.
    pub fn op_with_args<F>(mut self, func: F, args: Vec<Value>) -> Self
    where
        F: Fn(Option<Value>, &[Value]) -> Result<Option<Value>, BoxError> + Send + Sync + 'static,
    {
        self.ops.push(GeneratorOp {
            func: Arc::new(func),
            args,
        });
        self
    }

    /// Sets the `preserve` gate.
    pub fn preserve(mut self) -> Self {
        self.preserve = true;
        self
    }

    /// Sets the `require` gate.
    pub fn require(mut self) -> Self {
        self.require = true;
        self
    }

    /// Sets the `once` gate.
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    /// Returns `true` if every gate lets this generator run.
    pub fn should_run(&self, gate: GenerateGate<'_>) -> bool {
        if self.once && !gate.run_once {
            return false;
        }
        if self.require && !gate.key_present {
            return false;
        }
        if self.preserve && !is_empty(gate.current) {
            return false;
        }
        true
    }

    /// Runs the op chain starting from `current`.
    pub fn run(&self, current: Option<Value>) -> Result<Option<Value>, BoxError> {
        let mut value = current;
        for op in &self.ops {
            value = (op.func)(value, &op.args)?;
        }
        Ok(value)
    }
}
