// SPDX-License-Identifier: MIT OR Apache-2.0
//! WGSL generation for compiled node materials.
//!
//! The generated module declares one function per distinct code node, a
//! `MaterialInputs` struct carrying the renderer-supplied values, and an
//! `evaluate_material` entry point filling a `MaterialChannels` struct.
//! Expressions reached through more than one path are bound once with `let`.

use crate::compiler::{channel_socket, NodeMaterial};
use crate::expr::{Builtin, CodeFunction, Expr, ExprRef, Op, ValueType, CODE_FUNCTION_PARAMS};
use crate::node::OutputNodeType;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::Arc;

const INPUTS_STRUCT: &str = "\
struct MaterialInputs {
    uv: vec2<f32>,
    position_world: vec3<f32>,
    normal_world: vec3<f32>,
    camera_position: vec3<f32>,
    time: f32,
}
";

fn channel_field(channel: OutputNodeType) -> &'static str {
    match channel {
        OutputNodeType::BaseColor => "base_color",
        OutputNodeType::Emissive => "emissive",
        OutputNodeType::Roughness => "roughness",
        OutputNodeType::Metalness => "metalness",
        OutputNodeType::Normal => "normal",
        OutputNodeType::Opacity => "opacity",
    }
}

fn builtin_field(builtin: Builtin) -> &'static str {
    match builtin {
        Builtin::Time => "inputs.time",
        Builtin::Uv => "inputs.uv",
        Builtin::NormalWorld => "inputs.normal_world",
        Builtin::PositionWorld => "inputs.position_world",
        Builtin::CameraPosition => "inputs.camera_position",
    }
}

/// Generate a WGSL module evaluating every channel of a material
pub fn emit_material(material: &NodeMaterial) -> String {
    let mut emitter = WgslEmitter::default();
    for channel in OutputNodeType::ALL {
        emitter.count_uses(material.channel(channel));
    }

    let mut assignments = Vec::with_capacity(OutputNodeType::ALL.len());
    for channel in OutputNodeType::ALL {
        let target = ValueType::of_socket(channel_socket(channel));
        let code = emitter.emit_as(material.channel(channel), target);
        assignments.push(format!("    channels.{} = {code};", channel_field(channel)));
    }

    let mut out = String::new();
    out.push_str(INPUTS_STRUCT);
    out.push('\n');

    out.push_str("struct MaterialChannels {\n");
    for channel in OutputNodeType::ALL {
        let ty = ValueType::of_socket(channel_socket(channel));
        let _ = writeln!(out, "    {}: {},", channel_field(channel), ty.wgsl_type());
    }
    out.push_str("}\n");

    for function in &emitter.functions {
        out.push('\n');
        out.push_str(function);
    }

    out.push_str("\nfn evaluate_material(inputs: MaterialInputs) -> MaterialChannels {\n");
    for binding in &emitter.bindings {
        let _ = writeln!(out, "    {binding}");
    }
    out.push_str("    var channels: MaterialChannels;\n");
    for assignment in &assignments {
        out.push_str(assignment);
        out.push('\n');
    }
    out.push_str("    return channels;\n}\n");

    tracing::debug!(
        functions = emitter.functions.len(),
        bindings = emitter.bindings.len(),
        "Emitted material WGSL"
    );
    out
}

#[derive(Default)]
struct WgslEmitter {
    /// How many parents reference each expression
    uses: HashMap<*const Expr, usize>,
    /// Names of expressions already bound with `let`
    names: HashMap<*const Expr, String>,
    /// `let` statements, in dependency order
    bindings: Vec<String>,
    /// Names given to code functions
    function_names: HashMap<*const CodeFunction, String>,
    taken_function_names: HashSet<String>,
    /// Rendered code functions
    functions: Vec<String>,
}

impl WgslEmitter {
    fn count_uses(&mut self, expr: &ExprRef) {
        let count = self.uses.entry(Arc::as_ptr(expr)).or_insert(0);
        *count += 1;
        if *count == 1 {
            for arg in expr.args() {
                self.count_uses(arg);
            }
        }
    }

    fn is_shared(&self, expr: &ExprRef) -> bool {
        !expr.is_leaf() && self.uses.get(&Arc::as_ptr(expr)).copied().unwrap_or(0) > 1
    }

    /// Emit an expression converted to the requested shape
    fn emit_as(&mut self, expr: &ExprRef, target: ValueType) -> String {
        let code = self.emit(expr);
        coerce(code, expr.value_type(), target)
    }

    fn emit(&mut self, expr: &ExprRef) -> String {
        let key = Arc::as_ptr(expr);
        if let Some(name) = self.names.get(&key) {
            return name.clone();
        }

        let code = self.emit_inline(expr);
        if !self.is_shared(expr) {
            return code;
        }

        let name = format!("v{}", self.bindings.len());
        self.bindings.push(format!("let {name} = {code};"));
        self.names.insert(key, name.clone());
        name
    }

    fn emit_inline(&mut self, expr: &ExprRef) -> String {
        match &**expr {
            Expr::Float(v) => float_literal(*v),
            Expr::Vec2(v) => vector_literal(ValueType::Vec2, v),
            Expr::Vec3(v) => vector_literal(ValueType::Vec3, v),
            Expr::Builtin(builtin) => builtin_field(*builtin).to_string(),
            Expr::Op { op, args } => self.emit_op(*op, args, expr.value_type()),
            Expr::Call { function, args } => {
                let name = self.function_name(function);
                let args: Vec<String> = args
                    .iter()
                    .zip(CODE_FUNCTION_PARAMS)
                    .map(|(arg, (_, ty))| self.emit_as(arg, ty))
                    .collect();
                format!("{name}({})", args.join(", "))
            }
        }
    }

    fn emit_op(&mut self, op: Op, args: &[ExprRef], result: ValueType) -> String {
        match op {
            Op::Add | Op::Sub | Op::Mul => {
                let symbol = match op {
                    Op::Add => "+",
                    Op::Sub => "-",
                    _ => "*",
                };
                let lhs = self.emit_as(&args[0], result);
                let rhs = self.emit_as(&args[1], result);
                format!("({lhs} {symbol} {rhs})")
            }
            Op::Mix => {
                let a = self.emit_as(&args[0], result);
                let b = self.emit_as(&args[1], result);
                // A scalar factor is valid for any operand shape
                let factor_type = match args[2].value_type() {
                    ValueType::Float => ValueType::Float,
                    _ => result,
                };
                let t = self.emit_as(&args[2], factor_type);
                format!("mix({a}, {b}, {t})")
            }
            Op::Clamp | Op::Pow | Op::Smoothstep => {
                let name = match op {
                    Op::Clamp => "clamp",
                    Op::Pow => "pow",
                    _ => "smoothstep",
                };
                let args: Vec<String> = args.iter().map(|arg| self.emit_as(arg, result)).collect();
                format!("{name}({})", args.join(", "))
            }
            Op::Sin => format!("sin({})", self.emit_as(&args[0], result)),
            Op::Abs => format!("abs({})", self.emit_as(&args[0], result)),
            Op::Normalize => match result {
                // normalize() is vector-only; a normalized scalar is its sign
                ValueType::Float => format!("sign({})", self.emit(&args[0])),
                _ => format!("normalize({})", self.emit_as(&args[0], result)),
            },
        }
    }

    fn function_name(&mut self, function: &Arc<CodeFunction>) -> String {
        let key = Arc::as_ptr(function);
        if let Some(name) = self.function_names.get(&key) {
            return name.clone();
        }

        let mut name = function.name().to_string();
        let mut suffix = 2;
        while self.taken_function_names.contains(&name) {
            name = format!("{}_{suffix}", function.name());
            suffix += 1;
        }

        self.functions.push(function.render(&name));
        self.taken_function_names.insert(name.clone());
        self.function_names.insert(key, name.clone());
        name
    }
}

fn float_literal(value: f32) -> String {
    // Debug formatting always keeps a decimal point
    format!("{value:?}")
}

fn vector_literal(ty: ValueType, components: &[f32]) -> String {
    let components: Vec<String> = components.iter().map(|c| float_literal(*c)).collect();
    format!("{}({})", ty.wgsl_type(), components.join(", "))
}

fn coerce(code: String, from: ValueType, to: ValueType) -> String {
    match (from, to) {
        (ValueType::Float, ValueType::Float)
        | (ValueType::Vec2, ValueType::Vec2)
        | (ValueType::Vec3, ValueType::Vec3) => code,
        (ValueType::Float, _) => format!("{}({code})", to.wgsl_type()),
        (_, ValueType::Float) => format!("({code}).x"),
        (ValueType::Vec2, ValueType::Vec3) => format!("vec3<f32>({code}, 0.0)"),
        (ValueType::Vec3, ValueType::Vec2) => format!("({code}).xy"),
    }
}
