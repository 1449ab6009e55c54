// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader expression trees produced by the compiler.
//!
//! Expressions are immutable and shared through [`ExprRef`]. The resolver hands
//! out the same `Arc` to every consumer of a node, so pointer identity tells
//! code generators which sub-expressions are reused.

use crate::port::{Literal, SocketType};
use std::sync::Arc;

/// Shared handle to an expression node
pub type ExprRef = Arc<Expr>;

/// Shape of the value an expression evaluates to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueType {
    /// Scalar
    Float,
    /// 2D vector
    Vec2,
    /// 3D vector
    Vec3,
}

impl ValueType {
    /// WGSL spelling of the type
    pub fn wgsl_type(self) -> &'static str {
        match self {
            Self::Float => "f32",
            Self::Vec2 => "vec2<f32>",
            Self::Vec3 => "vec3<f32>",
        }
    }

    /// Shape carried by a socket
    pub fn of_socket(socket_type: SocketType) -> Self {
        match socket_type {
            SocketType::Float => Self::Float,
            SocketType::Vec2 => Self::Vec2,
            SocketType::Vec3 | SocketType::Color => Self::Vec3,
        }
    }

    /// The wider of two shapes; scalars broadcast, shorter vectors pad
    pub fn widest(self, other: Self) -> Self {
        self.max(other)
    }
}

/// Per-fragment values supplied by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    /// Elapsed time in seconds
    Time,
    /// Mesh texture coordinates
    Uv,
    /// World-space normal
    NormalWorld,
    /// World-space position
    PositionWorld,
    /// World-space camera position
    CameraPosition,
}

impl Builtin {
    /// Value shape of the builtin
    pub fn value_type(self) -> ValueType {
        match self {
            Self::Time => ValueType::Float,
            Self::Uv => ValueType::Vec2,
            Self::NormalWorld | Self::PositionWorld | Self::CameraPosition => ValueType::Vec3,
        }
    }
}

/// Built-in operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// `a + b`
    Add,
    /// `a - b`
    Sub,
    /// `a * b`
    Mul,
    /// `mix(a, b, t)`
    Mix,
    /// `clamp(x, lo, hi)`
    Clamp,
    /// `pow(base, exponent)`
    Pow,
    /// `smoothstep(edge0, edge1, x)`
    Smoothstep,
    /// `sin(x)`
    Sin,
    /// `abs(x)`
    Abs,
    /// `normalize(v)`
    Normalize,
}

impl Op {
    /// Number of operands
    pub fn arity(self) -> usize {
        match self {
            Self::Sin | Self::Abs | Self::Normalize => 1,
            Self::Add | Self::Sub | Self::Mul | Self::Pow => 2,
            Self::Mix | Self::Clamp | Self::Smoothstep => 3,
        }
    }
}

/// Parameter list every code function is spliced into
pub const CODE_FUNCTION_PARAMS: [(&str, ValueType); 3] = [
    ("primary", ValueType::Vec3),
    ("secondary", ValueType::Vec3),
    ("uv", ValueType::Vec2),
];

/// Return type of every code function
pub const CODE_FUNCTION_RETURN: ValueType = ValueType::Vec3;

/// Error raised while constructing an expression
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExprError {
    /// Code body is empty
    #[error("code function `{function}` has an empty body")]
    EmptyBody {
        /// Function name
        function: String,
    },

    /// Code body has mismatched delimiters and cannot be spliced safely
    #[error("code function `{function}` has an unbalanced `{delimiter}`")]
    UnbalancedBody {
        /// Function name
        function: String,
        /// Offending delimiter
        delimiter: char,
    },
}

/// A user-authored function body wrapped in the fixed shading signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFunction {
    name: String,
    body: String,
}

impl CodeFunction {
    /// Wrap a function body, rejecting bodies that would break out of the template
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Result<Self, ExprError> {
        let name = name.into();
        let body = body.into();

        if body.trim().is_empty() {
            return Err(ExprError::EmptyBody { function: name });
        }
        if let Some(delimiter) = unbalanced_delimiter(&body) {
            return Err(ExprError::UnbalancedBody {
                function: name,
                delimiter,
            });
        }

        Ok(Self { name, body })
    }

    /// Function name derived from a node ID
    pub fn name_for_node(node_id: &str) -> String {
        let sanitized: String = node_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();
        format!("shade_node_{sanitized}")
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw function body
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Render the full WGSL function under the given name
    pub fn render(&self, name: &str) -> String {
        let params = CODE_FUNCTION_PARAMS
            .iter()
            .map(|(param, ty)| format!("{param}: {}", ty.wgsl_type()))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "fn {name}({params}) -> {} {{\n{}\n}}\n",
            CODE_FUNCTION_RETURN.wgsl_type(),
            self.body.trim_end()
        )
    }
}

/// Find the first delimiter that does not pair up, ignoring comments.
///
/// Block comments nest, as they do in WGSL.
fn unbalanced_delimiter(body: &str) -> Option<char> {
    let mut stack = Vec::new();
    let mut comment_depth = 0usize;
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, chars.peek().copied()) {
            ('/', Some('*')) => {
                chars.next();
                comment_depth += 1;
            }
            ('*', Some('/')) if comment_depth > 0 => {
                chars.next();
                comment_depth -= 1;
            }
            _ if comment_depth > 0 => {}
            ('/', Some('/')) => {
                while chars.next_if(|&next| next != '\n').is_some() {}
            }
            ('(' | '{' | '[', _) => stack.push(c),
            (')' | '}' | ']', _) => {
                let expected = match c {
                    ')' => '(',
                    '}' => '{',
                    _ => '[',
                };
                if stack.pop() != Some(expected) {
                    return Some(c);
                }
            }
            _ => {}
        }
    }

    // An open block comment would swallow the closing brace of the template
    if comment_depth > 0 {
        return Some('*');
    }
    stack.pop()
}

/// A shader expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Scalar literal
    Float(f32),
    /// 2D vector literal
    Vec2([f32; 2]),
    /// 3D vector literal
    Vec3([f32; 3]),
    /// Renderer-supplied value
    Builtin(Builtin),
    /// Operator application
    Op {
        /// Operator
        op: Op,
        /// Operands, `op.arity()` of them
        args: Vec<ExprRef>,
    },
    /// Call of a user code function with `(primary, secondary, uv)`
    Call {
        /// Called function
        function: Arc<CodeFunction>,
        /// Arguments
        args: Vec<ExprRef>,
    },
}

impl Expr {
    /// Scalar literal
    pub fn float(value: f32) -> ExprRef {
        Arc::new(Self::Float(value))
    }

    /// 2D vector literal
    pub fn vec2(x: f32, y: f32) -> ExprRef {
        Arc::new(Self::Vec2([x, y]))
    }

    /// 3D vector literal
    pub fn vec3(x: f32, y: f32, z: f32) -> ExprRef {
        Arc::new(Self::Vec3([x, y, z]))
    }

    /// Literal in its natural shape
    pub fn literal(value: Literal) -> ExprRef {
        match value {
            Literal::Float(v) => Self::float(v),
            Literal::Vec2([x, y]) => Self::vec2(x, y),
            Literal::Vec3([x, y, z]) => Self::vec3(x, y, z),
        }
    }

    /// Literal shaped for a socket; scalars splat into three-component sockets
    pub fn literal_for_socket(value: Literal, socket_type: SocketType) -> ExprRef {
        match (socket_type, value) {
            (SocketType::Vec3 | SocketType::Color, Literal::Float(v)) => Self::vec3(v, v, v),
            _ => Self::literal(value),
        }
    }

    /// Renderer-supplied value
    pub fn builtin(builtin: Builtin) -> ExprRef {
        Arc::new(Self::Builtin(builtin))
    }

    /// Apply an operator to its operands
    pub fn apply<const N: usize>(op: Op, args: [ExprRef; N]) -> ExprRef {
        debug_assert_eq!(op.arity(), N, "wrong operand count for {op:?}");
        Arc::new(Self::Op {
            op,
            args: args.into(),
        })
    }

    /// Call a code function with `(primary, secondary, uv)`
    pub fn call(function: Arc<CodeFunction>, primary: ExprRef, secondary: ExprRef, uv: ExprRef) -> ExprRef {
        Arc::new(Self::Call {
            function,
            args: vec![primary, secondary, uv],
        })
    }

    /// Operands of this expression
    pub fn args(&self) -> &[ExprRef] {
        match self {
            Self::Op { args, .. } | Self::Call { args, .. } => args,
            _ => &[],
        }
    }

    /// Shape of the value this expression evaluates to
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Float(_) => ValueType::Float,
            Self::Vec2(_) => ValueType::Vec2,
            Self::Vec3(_) => ValueType::Vec3,
            Self::Builtin(builtin) => builtin.value_type(),
            Self::Op { op: Op::Mix, args } => args
                .iter()
                .take(2)
                .map(|a| a.value_type())
                .fold(ValueType::Float, ValueType::widest),
            Self::Op { args, .. } => args
                .iter()
                .map(|a| a.value_type())
                .fold(ValueType::Float, ValueType::widest),
            Self::Call { .. } => CODE_FUNCTION_RETURN,
        }
    }

    /// Check if this is a literal or builtin (cheap to repeat inline)
    pub fn is_leaf(&self) -> bool {
        self.args().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_for_socket_splats_scalars() {
        let expr = Expr::literal_for_socket(Literal::Float(0.5), SocketType::Color);
        assert_eq!(*expr, Expr::Vec3([0.5, 0.5, 0.5]));

        let expr = Expr::literal_for_socket(Literal::Float(0.5), SocketType::Float);
        assert_eq!(*expr, Expr::Float(0.5));

        let expr = Expr::literal_for_socket(Literal::Vec2([1.0, 2.0]), SocketType::Vec2);
        assert_eq!(expr.value_type(), ValueType::Vec2);
    }

    #[test]
    fn test_value_type_propagation() {
        let sum = Expr::apply(Op::Add, [Expr::float(1.0), Expr::vec3(0.0, 0.0, 0.0)]);
        assert_eq!(sum.value_type(), ValueType::Vec3);

        let blend = Expr::apply(
            Op::Mix,
            [Expr::float(0.0), Expr::float(1.0), Expr::vec3(1.0, 1.0, 1.0)],
        );
        assert_eq!(blend.value_type(), ValueType::Float);

        let wave = Expr::apply(Op::Sin, [Expr::builtin(Builtin::Time)]);
        assert_eq!(wave.value_type(), ValueType::Float);
    }

    #[test]
    fn test_code_function_rejects_bad_bodies() {
        assert_eq!(
            CodeFunction::new("f", "   "),
            Err(ExprError::EmptyBody {
                function: "f".to_string()
            })
        );
        assert_eq!(
            CodeFunction::new("f", "return vec3(1.0);\n}\nfn evil() {"),
            Err(ExprError::UnbalancedBody {
                function: "f".to_string(),
                delimiter: '}'
            })
        );
        assert!(matches!(
            CodeFunction::new("f", "return vec3(1.0;"),
            Err(ExprError::UnbalancedBody { delimiter: '(', .. })
        ));
    }

    #[test]
    fn test_code_function_ignores_comment_delimiters() {
        let function = CodeFunction::new("f", "// keep } out\nreturn primary;").unwrap();
        assert_eq!(function.body(), "// keep } out\nreturn primary;");

        assert!(CodeFunction::new("f", "/* ( */ return primary;").is_ok());
        assert!(CodeFunction::new("f", "/* outer /* } */ still ) */\nreturn primary;").is_ok());
        assert!(matches!(
            CodeFunction::new("f", "return primary; /* }"),
            Err(ExprError::UnbalancedBody { delimiter: '*', .. })
        ));
    }

    #[test]
    fn test_code_function_render() {
        let function = CodeFunction::new("shade_node_code", "return vec3(1.0);").unwrap();
        assert_eq!(
            function.render(function.name()),
            "fn shade_node_code(primary: vec3<f32>, secondary: vec3<f32>, uv: vec2<f32>) -> vec3<f32> {\nreturn vec3(1.0);\n}\n"
        );
    }

    #[test]
    fn test_name_for_node() {
        assert_eq!(CodeFunction::name_for_node("code-Fragment.1"), "shade_node_code_fragment_1");
    }
}
