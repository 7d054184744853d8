//! Condition data structures.
//!
//! A `Condition` compares one indicator series against a constant, a range, or
//! a second live indicator series. Conditions sharing an order type form a
//! `ConditionGroup` that yields one boolean per candle.

use crate::domain::indicator::IndicatorKind;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderType {
    Entry,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Value(f64),
    Indicator(IndicatorKind),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Comparison {
    GreaterThan(Operand),
    LessThan(Operand),
    Equals(Operand),
    CrossesAbove(Operand),
    CrossesBelow(Operand),
    InRange { low: f64, high: f64 },
    OutOfRange { low: f64, high: f64 },
}

impl Comparison {
    pub fn operand(&self) -> Option<&Operand> {
        match self {
            Comparison::GreaterThan(op)
            | Comparison::LessThan(op)
            | Comparison::Equals(op)
            | Comparison::CrossesAbove(op)
            | Comparison::CrossesBelow(op) => Some(op),
            Comparison::InRange { .. } | Comparison::OutOfRange { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Condition {
    pub indicator: IndicatorKind,
    pub comparison: Comparison,
    pub order_type: OrderType,
    pub logical: LogicalOperator,
}

impl Condition {
    /// Indicators this condition reads, left side first.
    pub fn indicators(&self) -> Vec<IndicatorKind> {
        let mut kinds = vec![self.indicator];
        if let Some(Operand::Indicator(kind)) = self.comparison.operand() {
            kinds.push(*kind);
        }
        kinds
    }

    /// Leading candles where this condition cannot be true.
    pub fn warmup(&self) -> usize {
        let base = self
            .indicators()
            .iter()
            .map(IndicatorKind::warmup)
            .max()
            .unwrap_or(0);
        match self.comparison {
            Comparison::CrossesAbove(_) | Comparison::CrossesBelow(_) => base + 1,
            _ => base,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConditionGroup {
    pub conditions: Vec<Condition>,
}

impl ConditionGroup {
    pub fn new(conditions: Vec<Condition>) -> Self {
        Self { conditions }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// A single OR anywhere turns the whole group into a disjunction.
    pub fn is_disjunction(&self) -> bool {
        self.conditions
            .iter()
            .any(|c| c.logical == LogicalOperator::Or)
    }

    /// Distinct indicators referenced by the group, in first-use order.
    pub fn indicators(&self) -> Vec<IndicatorKind> {
        let mut kinds = Vec::new();
        for kind in self.conditions.iter().flat_map(Condition::indicators) {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        kinds
    }

    pub fn warmup(&self) -> usize {
        self.conditions
            .iter()
            .map(Condition::warmup)
            .max()
            .unwrap_or(0)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Value(v) => write!(f, "{}", v),
            Operand::Indicator(kind) => write!(f, "{}", kind),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::GreaterThan(op) => write!(f, "GREATER_THAN {}", op),
            Comparison::LessThan(op) => write!(f, "LESS_THAN {}", op),
            Comparison::Equals(op) => write!(f, "EQUALS {}", op),
            Comparison::CrossesAbove(op) => write!(f, "CROSSES_ABOVE {}", op),
            Comparison::CrossesBelow(op) => write!(f, "CROSSES_BELOW {}", op),
            Comparison::InRange { low, high } => write!(f, "IN_RANGE {} {}", low, high),
            Comparison::OutOfRange { low, high } => write!(f, "OUT_OF_RANGE {} {}", low, high),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.logical == LogicalOperator::Or {
            f.write_str("OR ")?;
        }
        write!(f, "{} {}", self.indicator, self.comparison)
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Entry => f.write_str("entry"),
            OrderType::Exit => f.write_str("exit"),
        }
    }
}
