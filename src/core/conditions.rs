use std::cmp::Ordering;
use std::fmt;

use log::trace;
use serde_json::Value;

use crate::parser::Attributes;
use crate::types::{is_blank, value_to_string};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equals,
    NotEqual,
    Like,
    NotLike,
    GreaterThan,
    LessThan,
}

impl Comparison {
    /// Checked in this order when a tag carries more than one.
    pub const ALL: [Comparison; 6] = [
        Comparison::Equals,
        Comparison::NotEqual,
        Comparison::Like,
        Comparison::NotLike,
        Comparison::GreaterThan,
        Comparison::LessThan,
    ];

    pub fn attribute(&self) -> &'static str {
        match self {
            Comparison::Equals => "equals",
            Comparison::NotEqual => "not_equal",
            Comparison::Like => "like",
            Comparison::NotLike => "not_like",
            Comparison::GreaterThan => "greater_than",
            Comparison::LessThan => "less_than",
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::Equals => write!(f, "=="),
            Comparison::NotEqual => write!(f, "!="),
            Comparison::Like => write!(f, "LIKE"),
            Comparison::NotLike => write!(f, "not LIKE"),
            Comparison::GreaterThan => write!(f, ">"),
            Comparison::LessThan => write!(f, "<"),
        }
    }
}

/// The gate of an `[if X ...]` block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Condition {
    comparison: Option<(Comparison, String)>,
}

impl Condition {
    pub fn from_attributes(attributes: &Attributes) -> Self {
        let comparison = Comparison::ALL
            .iter()
            .find_map(|cmp| attributes.get(cmp.attribute()).map(|operand| (*cmp, operand.to_string())));
        Self { comparison }
    }

    /// Without a comparison attribute the block shows when the value is not blank.
    pub fn holds(&self, value: &Value) -> bool {
        match &self.comparison {
            None => !is_blank(value),
            Some((cmp, operand)) => value_meets_condition(value, *cmp, operand),
        }
    }
}

pub fn value_meets_condition(observed: &Value, cmp: Comparison, operand: &str) -> bool {
    let operand = operand.trim();
    let result = match observed {
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(|v| value_to_string(v, ", ").trim().to_string()).collect();
            list_meets_condition(&items, cmp, operand)
        }
        scalar => {
            let observed = value_to_string(scalar, ", ");
            scalar_meets_condition(observed.trim(), cmp, operand)
        }
    };
    trace!("Condition {:?} {} {:?} -> {}", observed, cmp, operand, result);
    result
}

fn scalar_meets_condition(observed: &str, cmp: Comparison, operand: &str) -> bool {
    match cmp {
        Comparison::Equals => loose_compare(observed, operand) == Ordering::Equal,
        Comparison::NotEqual => loose_compare(observed, operand) != Ordering::Equal,
        Comparison::GreaterThan => loose_compare(observed, operand) == Ordering::Greater,
        Comparison::LessThan => loose_compare(observed, operand) == Ordering::Less,
        Comparison::Like => observed.to_lowercase().contains(&operand.to_lowercase()),
        Comparison::NotLike => !observed.to_lowercase().contains(&operand.to_lowercase()),
    }
}

fn list_meets_condition(items: &[String], cmp: Comparison, operand: &str) -> bool {
    let equal = |item: &String| loose_compare(item, operand) == Ordering::Equal;
    match cmp {
        Comparison::Equals => items.iter().any(equal),
        Comparison::NotEqual => !items.iter().any(equal),
        Comparison::GreaterThan => items
            .iter()
            .min_by(|a, b| loose_compare(a, b))
            .is_some_and(|min| loose_compare(min, operand) == Ordering::Greater),
        Comparison::LessThan => items
            .iter()
            .max_by(|a, b| loose_compare(a, b))
            .is_some_and(|max| loose_compare(max, operand) == Ordering::Less),
        Comparison::Like => items.iter().any(|item| item.contains(operand)),
        Comparison::NotLike => !items.iter().any(|item| item.contains(operand)),
    }
}

/// Numeric when both sides are numbers, byte-wise otherwise.
fn loose_compare(a: &str, b: &str) -> Ordering {
    match (parse_number(a), parse_number(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}

fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}
