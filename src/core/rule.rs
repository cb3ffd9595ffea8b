//! Filter rules and their textual grammar.
//!
//! # Grammar
//!
//! ```text
//! rule     := "I" letter ws* op ws* value
//! letter   := "a" | "b" | ... | "h"
//! op       := ">" | "<" | "="
//! value    := digit+            (positive, fits in u32)
//! ```
//!
//! Whitespace around the operator is optional (`Ia>5` and `Ia > 5` are the
//! same rule). The canonical text form is `Ia > 5`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::types::{Channel, FilterId};
use crate::error::{Error, Result};

/// Comparison operator of a filter rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// `>`: strictly greater than the threshold.
    #[serde(rename = ">")]
    Greater,
    /// `<`: strictly less than the threshold.
    #[serde(rename = "<")]
    Less,
    /// `=`: exactly equal to the threshold.
    #[serde(rename = "=")]
    Equal,
}

impl Operator {
    /// Operator for its symbol.
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '>' => Some(Operator::Greater),
            '<' => Some(Operator::Less),
            '=' => Some(Operator::Equal),
            _ => None,
        }
    }

    pub const fn symbol(self) -> char {
        match self {
            Operator::Greater => '>',
            Operator::Less => '<',
            Operator::Equal => '=',
        }
    }

    /// Compare a measured current against a threshold.
    #[inline]
    pub fn apply(self, value: f64, threshold: f64) -> bool {
        match self {
            Operator::Greater => value > threshold,
            Operator::Less => value < threshold,
            Operator::Equal => value == threshold,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Validated rule contents without identity: channel, operator, threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleSpec {
    pub channel: Channel,
    pub operator: Operator,
    /// Threshold in amperes, always > 0.
    pub threshold: u32,
}

impl RuleSpec {
    /// Build a rule from its parts.
    ///
    /// Fails with [`Error::InvalidRule`] when the threshold is not positive.
    pub fn new(channel: Channel, operator: Operator, threshold: u32) -> Result<Self> {
        if threshold == 0 {
            return Err(Error::InvalidRule(format!(
                "threshold must be a positive integer, got {}",
                threshold
            )));
        }
        Ok(Self {
            channel,
            operator,
            threshold,
        })
    }

    /// Parse the textual form (`"Ia > 5"`).
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let mut chars = text.char_indices().peekable();

        match chars.next() {
            Some((_, 'I')) => {}
            _ => return Err(invalid(text, "rule must start with a channel (Ia..Ih)")),
        }

        let channel = match chars.next() {
            Some((_, letter)) if letter.is_ascii_lowercase() => Channel::from_letter(letter)
                .ok_or_else(|| invalid(text, "channel out of range Ia..Ih"))?,
            _ => return Err(invalid(text, "expected channel letter a..h after 'I'")),
        };

        while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}

        let operator = match chars.next() {
            Some((_, symbol)) => Operator::from_symbol(symbol)
                .ok_or_else(|| invalid(text, "operator must be one of >, <, ="))?,
            None => return Err(invalid(text, "missing operator")),
        };

        while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}

        let digits = match chars.peek() {
            Some(&(start, _)) => &text[start..],
            None => return Err(invalid(text, "missing threshold value")),
        };

        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid(text, "threshold must be a positive integer"));
        }

        let threshold: u32 = digits
            .parse()
            .map_err(|_| invalid(text, "threshold out of range"))?;

        Self::new(channel, operator, threshold)
    }

    /// Evaluate this rule against a measured current.
    #[inline]
    pub fn matches(&self, value: f64) -> bool {
        self.operator.apply(value, f64::from(self.threshold))
    }
}

impl FromStr for RuleSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        RuleSpec::parse(s)
    }
}

impl fmt::Display for RuleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.channel, self.operator, self.threshold)
    }
}

fn invalid(text: &str, reason: &str) -> Error {
    Error::InvalidRule(format!("'{}': {}", text, reason))
}

/// An active filter rule owned by the filter store.
///
/// Rules are immutable once created; an edit is a remove followed by an add.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterRule {
    pub id: FilterId,
    pub channel: Channel,
    pub operator: Operator,
    pub threshold: u32,
}

impl FilterRule {
    pub fn new(id: FilterId, spec: RuleSpec) -> Self {
        Self {
            id,
            channel: spec.channel,
            operator: spec.operator,
            threshold: spec.threshold,
        }
    }

    /// The rule without its identity.
    pub fn spec(&self) -> RuleSpec {
        RuleSpec {
            channel: self.channel,
            operator: self.operator,
            threshold: self.threshold,
        }
    }

    /// Evaluate this rule against a measured current.
    #[inline]
    pub fn matches(&self, value: f64) -> bool {
        self.spec().matches(value)
    }
}

impl fmt::Display for FilterRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.spec(), f)
    }
}
