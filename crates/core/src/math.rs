//! Arithmetic practice content.
//!
//! A `MathProblem` can only be constructed from an expression whose two integer
//! operands, combined with its operator, produce the stored answer exactly. This
//! keeps every answer key integral, so scoring never has to tolerate floating
//! point error.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The four operations a math worksheet can drill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Addition,
    Subtraction,
    Multiplication,
    Division,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Addition,
        Operation::Subtraction,
        Operation::Multiplication,
        Operation::Division,
    ];

    /// Maps an operator character found in an expression to its operation.
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '+' => Some(Operation::Addition),
            '-' | '−' => Some(Operation::Subtraction),
            '*' | '×' | 'x' => Some(Operation::Multiplication),
            '/' | '÷' => Some(Operation::Division),
            _ => None,
        }
    }

    /// The ASCII operator used when writing expressions.
    pub fn ascii_symbol(self) -> char {
        match self {
            Operation::Addition => '+',
            Operation::Subtraction => '-',
            Operation::Multiplication => '*',
            Operation::Division => '/',
        }
    }

    /// The symbol shown to children in the vertical layout.
    pub fn display_symbol(self) -> char {
        match self {
            Operation::Addition => '+',
            Operation::Subtraction => '-',
            Operation::Multiplication => '×',
            Operation::Division => '÷',
        }
    }

    /// Applies the operation, returning `None` on overflow or inexact division.
    pub fn apply(self, left: i64, right: i64) -> Option<i64> {
        match self {
            Operation::Addition => left.checked_add(right),
            Operation::Subtraction => left.checked_sub(right),
            Operation::Multiplication => left.checked_mul(right),
            Operation::Division => {
                if right == 0 || left.checked_rem(right)? != 0 {
                    None
                } else {
                    left.checked_div(right)
                }
            }
        }
    }

    /// Wire name used by the content service (`"addition"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Addition => "addition",
            Operation::Subtraction => "subtraction",
            Operation::Multiplication => "multiplication",
            Operation::Division => "division",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Operation {
    type Err = MathProblemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "addition" => Ok(Operation::Addition),
            "subtraction" => Ok(Operation::Subtraction),
            "multiplication" => Ok(Operation::Multiplication),
            "division" => Ok(Operation::Division),
            other => Err(MathProblemError::UnknownOperation(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MathProblemError {
    #[error("Unknown operation: '{0}'")]
    UnknownOperation(String),
    #[error("Expression '{0}' does not contain two integer operands and an operator")]
    Unparsable(String),
    #[error("Expression '{expression}' evaluates to {expected:?}, not {answer}")]
    WrongAnswer {
        expression: String,
        expected: Option<i64>,
        answer: i64,
    },
    #[error("Answer {0} is not an exact integer")]
    NonIntegerAnswer(String),
    #[error("Expression '{expression}' is not a {expected} problem")]
    OperationMismatch {
        expression: String,
        expected: Operation,
    },
}

/// Largest magnitude at which every integer has an exact `f64` representation.
const MAX_EXACT_FLOAT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Converts an integral float to `i64`, refusing values that may have been rounded.
pub(crate) fn exact_integer(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= MAX_EXACT_FLOAT_INTEGER {
        Some(value as i64)
    } else {
        None
    }
}

/// The two operands and operator of a parsed expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Operands {
    pub left: i64,
    pub operation: Operation,
    pub right: i64,
}

impl Operands {
    /// Parses `"12 + 5"`, `"12 + 5 ="` or `"12 ÷ 4 = ?"`.
    pub fn parse(expression: &str) -> Option<Self> {
        let lhs = expression.split('=').next()?.trim();
        // Skip the first character so a leading sign is read as part of the operand.
        let (offset, symbol) = lhs
            .char_indices()
            .skip(1)
            .find(|(_, c)| Operation::from_symbol(*c).is_some())?;
        let operation = Operation::from_symbol(symbol)?;
        let left = lhs[..offset].trim().parse().ok()?;
        let right = lhs[offset + symbol.len_utf8()..].trim().parse().ok()?;
        Some(Self {
            left,
            operation,
            right,
        })
    }

    pub fn evaluate(&self) -> Option<i64> {
        self.operation.apply(self.left, self.right)
    }
}

/// A single problem with its verified integer answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MathProblem {
    expression: String,
    operands: Operands,
    answer: i64,
}

impl MathProblem {
    /// Builds a problem, rejecting expressions whose result differs from `answer`.
    pub fn new(expression: impl Into<String>, answer: i64) -> Result<Self, MathProblemError> {
        let expression = expression.into();
        let operands = Operands::parse(&expression)
            .ok_or_else(|| MathProblemError::Unparsable(expression.clone()))?;
        let expected = operands.evaluate();
        if expected != Some(answer) {
            return Err(MathProblemError::WrongAnswer {
                expression,
                expected,
                answer,
            });
        }
        Ok(Self {
            expression,
            operands,
            answer,
        })
    }

    /// Same as [`MathProblem::new`] for answers that arrive as JSON numbers.
    pub fn from_number(
        expression: impl Into<String>,
        answer: &serde_json::Number,
    ) -> Result<Self, MathProblemError> {
        let exact = answer
            .as_i64()
            .or_else(|| answer.as_f64().and_then(exact_integer))
            .ok_or_else(|| MathProblemError::NonIntegerAnswer(answer.to_string()))?;
        Self::new(expression, exact)
    }

    /// Builds `"{left} {op} {right}"` from operands already known to be exact.
    pub fn from_operands(
        left: i64,
        operation: Operation,
        right: i64,
    ) -> Result<Self, MathProblemError> {
        let expression = format!("{} {} {}", left, operation.ascii_symbol(), right);
        let answer = operation
            .apply(left, right)
            .ok_or_else(|| MathProblemError::Unparsable(expression.clone()))?;
        Self::new(expression, answer)
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn operands(&self) -> Operands {
        self.operands
    }

    pub fn answer(&self) -> i64 {
        self.answer
    }
}

/// A worksheet of problems for one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MathContent {
    pub operation: Operation,
    pub problems: Vec<MathProblem>,
}

impl MathContent {
    pub fn new(
        operation: Operation,
        problems: Vec<MathProblem>,
    ) -> Result<Self, MathProblemError> {
        let content = Self {
            operation,
            problems,
        };
        content.check()?;
        Ok(content)
    }

    /// Every problem must use the worksheet's operation.
    pub fn check(&self) -> Result<(), MathProblemError> {
        match self
            .problems
            .iter()
            .find(|p| p.operands.operation != self.operation)
        {
            Some(p) => Err(MathProblemError::OperationMismatch {
                expression: p.expression.clone(),
                expected: self.operation,
            }),
            None => Ok(()),
        }
    }
}
