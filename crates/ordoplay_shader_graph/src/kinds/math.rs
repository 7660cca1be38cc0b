// SPDX-License-Identifier: MIT OR Apache-2.0
//! Math nodes wrapping GLSL built-in operators and functions.

use crate::compiler::{BodyLineOptions, EmitContext, LinesController};
use crate::error::CompileError;
use crate::port::{Port, PortType, PortValue};
use serde::{Deserialize, Serialize};

/// A GLSL built-in operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum MathOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Min,
    Max,
    Pow,
    Dot,
    Step,
    Abs,
    Negate,
    Sin,
    Cos,
    Sqrt,
    Fract,
    Floor,
    Normalize,
    Length,
    Mix,
    Clamp,
    Smoothstep,
}

impl MathOp {
    /// Operand names with their default values, in call order
    fn operands(self) -> &'static [(&'static str, f32)] {
        match self {
            Self::Add | Self::Subtract => &[("a", 0.0), ("b", 0.0)],
            Self::Multiply | Self::Divide => &[("a", 1.0), ("b", 1.0)],
            Self::Pow => &[("a", 0.0), ("b", 2.0)],
            Self::Min | Self::Max | Self::Dot | Self::Step => &[("a", 0.0), ("b", 0.0)],
            Self::Abs
            | Self::Negate
            | Self::Sin
            | Self::Cos
            | Self::Sqrt
            | Self::Fract
            | Self::Floor
            | Self::Normalize
            | Self::Length => &[("x", 0.0)],
            Self::Mix => &[("a", 0.0), ("b", 1.0), ("t", 0.5)],
            Self::Clamp => &[("x", 0.0), ("min", 0.0), ("max", 1.0)],
            Self::Smoothstep => &[("edge0", 0.0), ("edge1", 1.0), ("x", 0.0)],
        }
    }

    fn expression(self, args: &[String]) -> String {
        let infix = |op: &str| format!("{} {op} {}", args[0], args[1]);
        match self {
            Self::Add => infix("+"),
            Self::Subtract => infix("-"),
            Self::Multiply => infix("*"),
            Self::Divide => infix("/"),
            Self::Negate => format!("-({})", args[0]),
            _ => format!("{}({})", self.function_name(), args.join(", ")),
        }
    }

    fn function_name(self) -> &'static str {
        match self {
            Self::Add | Self::Subtract | Self::Multiply | Self::Divide | Self::Negate => "",
            Self::Min => "min",
            Self::Max => "max",
            Self::Pow => "pow",
            Self::Dot => "dot",
            Self::Step => "step",
            Self::Abs => "abs",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Sqrt => "sqrt",
            Self::Fract => "fract",
            Self::Floor => "floor",
            Self::Normalize => "normalize",
            Self::Length => "length",
            Self::Mix => "mix",
            Self::Clamp => "clamp",
            Self::Smoothstep => "smoothstep",
        }
    }

    /// Whether the result collapses to a scalar regardless of operand type
    fn is_reduction(self) -> bool {
        matches!(self, Self::Dot | Self::Length)
    }
}

/// A math operation over operands of one type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MathNode {
    /// Operation
    pub op: MathOp,
    /// Operand type
    pub port_type: PortType,
}

impl MathNode {
    /// Type of the `result` output
    pub fn result_type(&self) -> PortType {
        if self.op.is_reduction() {
            PortType::Float
        } else {
            self.port_type
        }
    }

    pub(crate) fn ports(&self) -> (Vec<Port>, Vec<Port>) {
        let inputs = self
            .op
            .operands()
            .iter()
            .map(|(name, default)| {
                let port = Port::input(*name, self.port_type);
                match PortValue::splat(*default, self.port_type) {
                    Some(value) => port.with_default(value),
                    None => port,
                }
            })
            .collect();
        (inputs, vec![Port::output("result", self.result_type())])
    }

    pub(crate) fn emit(
        &self,
        ctx: &mut EmitContext<'_>,
        lines: &mut LinesController,
    ) -> Result<(), CompileError> {
        let args = self
            .op
            .operands()
            .iter()
            .map(|(name, _)| ctx.input(name))
            .collect::<Result<Vec<_>, _>>()?;
        let line = ctx.assign_output("result", &self.op.expression(&args));
        lines.add_body_lines(ctx.owner(), vec![line], None, BodyLineOptions::default());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operand_layout() {
        let mix = MathNode { op: MathOp::Mix, port_type: PortType::Vector3 };
        let (inputs, outputs) = mix.ports();
        let names: Vec<_> = inputs.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "t"]);
        assert_eq!(inputs[2].default_value, Some(PortValue::Vector3([0.5; 3])));
        assert_eq!(outputs[0].port_type, PortType::Vector3);
    }

    #[test]
    fn test_reductions_are_scalar() {
        let length = MathNode { op: MathOp::Length, port_type: PortType::Vector2 };
        assert_eq!(length.result_type(), PortType::Float);
    }

    #[test]
    fn test_expressions() {
        let args = vec!["x".to_string(), "y".to_string()];
        assert_eq!(MathOp::Subtract.expression(&args), "x - y");
        assert_eq!(MathOp::Max.expression(&args), "max(x, y)");
        assert_eq!(MathOp::Negate.expression(&args[..1]), "-(x)");
    }
}
