//! Policy rule record.
//!
//! [`CasbinRule`] mirrors one line of policy text: a policy type tag plus
//! six positional values. It is built transiently for each database round
//! trip and has no identity beyond the row it represents.

use serde::{Deserialize, Serialize};

use crate::error::AdapterError;

/// Number of positional value columns (`v0`..`v5`).
pub const MAX_VALUES: usize = 6;

/// One policy rule as stored in the policy table.
///
/// Unused trailing positions hold empty strings. An empty value is never
/// written as `NULL` and is treated as a wildcard by the removal helpers.
/// Rules built through [`CasbinRule::new`] always carry a policy type;
/// rows read back with an empty or `NULL` `ptype` are skipped on load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CasbinRule {
    /// Policy type tag (`"p"`, `"g"`, `"p2"`, ...).
    pub ptype: String,
    /// Positional values `v0`..`v5`.
    pub values: [String; MAX_VALUES],
}

impl CasbinRule {
    /// Builds a rule from a policy type and its ordered values.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidRule`] if `ptype` is empty and
    /// [`AdapterError::TooManyValues`] if more than six values are given.
    pub fn new<S: AsRef<str>>(ptype: &str, rule: &[S]) -> Result<Self, AdapterError> {
        Self::filter(ptype, 0, rule)
    }

    /// Builds a removal filter: `field_values` are placed into the value
    /// columns starting at `field_index`; every other column stays empty
    /// and therefore unconstrained.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidRule`] if `ptype` is empty,
    /// [`AdapterError::InvalidFieldIndex`] if `field_index` is past the last
    /// column, and [`AdapterError::TooManyValues`] if the values run past it.
    pub fn filter<S: AsRef<str>>(
        ptype: &str,
        field_index: usize,
        field_values: &[S],
    ) -> Result<Self, AdapterError> {
        if ptype.is_empty() {
            return Err(AdapterError::InvalidRule(
                "policy type must not be empty".to_string(),
            ));
        }
        if field_index >= MAX_VALUES {
            return Err(AdapterError::InvalidFieldIndex(field_index));
        }
        let count = field_index + field_values.len();
        if count > MAX_VALUES {
            return Err(AdapterError::TooManyValues { count });
        }

        let mut values: [String; MAX_VALUES] = Default::default();
        for (slot, value) in values.iter_mut().skip(field_index).zip(field_values) {
            *slot = value.as_ref().to_string();
        }
        Ok(Self {
            ptype: ptype.to_string(),
            values,
        })
    }

    /// Returns the section this rule belongs to: the first character of
    /// the policy type (`"p2"` belongs to section `"p"`).
    #[must_use]
    pub fn section(&self) -> Option<&str> {
        let first = self.ptype.chars().next()?;
        self.ptype.get(..first.len_utf8())
    }

    /// Returns the `(column index, value)` pairs that constrain a match,
    /// i.e. every non-empty value.
    pub fn constraints(&self) -> impl Iterator<Item = (usize, &str)> {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, value)| !value.is_empty())
            .map(|(index, value)| (index, value.as_str()))
    }

    /// Renders the rule as a policy line, `ptype[, v0][, v1]...`, leaving
    /// out each empty value.
    ///
    /// Values holding a comma or a double quote, or with leading or
    /// trailing whitespace, are written CSV style: wrapped in `"` with
    /// inner quotes doubled. [`parse_policy_line`] reverses this.
    #[must_use]
    pub fn to_policy_line(&self) -> String {
        let mut line = self.ptype.clone();
        for (_, value) in self.constraints() {
            line.push_str(", ");
            push_value(&mut line, value);
        }
        line
    }

    /// Returns `true` if the rule satisfies a positional load filter.
    ///
    /// Filter values line up with `v0`, `v1`, ...; an empty filter value
    /// accepts anything in that position.
    #[must_use]
    pub fn matches_filter<S: AsRef<str>>(&self, filter: &[S]) -> bool {
        filter.iter().enumerate().all(|(index, wanted)| {
            let wanted = wanted.as_ref();
            wanted.is_empty() || self.values.get(index).is_some_and(|value| value == wanted)
        })
    }
}

fn push_value(line: &mut String, value: &str) {
    let needs_quotes = value.contains([',', '"']) || value.trim() != value;
    if needs_quotes {
        line.push('"');
        line.push_str(&value.replace('"', "\"\""));
        line.push('"');
    } else {
        line.push_str(value);
    }
}

/// Splits a policy line into its policy type and values.
///
/// Tokens are comma separated. Unquoted tokens are trimmed; a token
/// wrapped in `"` keeps its content verbatim, commas and surrounding
/// whitespace included, with `""` standing for one quote. Returns `None`
/// for blank lines and comment lines starting with `#`.
#[must_use]
pub fn parse_policy_line(line: &str) -> Option<(String, Vec<String>)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let mut tokens = split_tokens(line).into_iter();
    let ptype = tokens.next().filter(|ptype| !ptype.is_empty())?;
    Some((ptype, tokens.collect()))
}

fn split_tokens(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    current.push('"');
                }
                '"' => in_quotes = false,
                _ => current.push(c),
            }
            continue;
        }
        match c {
            ',' => {
                tokens.push(finish_token(&mut current, quoted));
                quoted = false;
            }
            '"' if !quoted && current.trim().is_empty() => {
                current.clear();
                quoted = true;
                in_quotes = true;
            }
            // whitespace between a closing quote and the next comma
            _ if quoted && c.is_whitespace() => {}
            _ => current.push(c),
        }
    }
    tokens.push(finish_token(&mut current, quoted));
    tokens
}

fn finish_token(current: &mut String, quoted: bool) -> String {
    let token = std::mem::take(current);
    if quoted {
        token
    } else {
        token.trim().to_string()
    }
}

/// Parses a policy line and adds the rule to `model` under the section
/// named by the first character of its policy type.
///
/// Returns `true` if the model accepted the rule. Lines for sections or
/// policy types the model does not define are ignored.
pub fn load_policy_line(line: &str, model: &mut dyn casbin::Model) -> bool {
    let Some((ptype, values)) = parse_policy_line(line) else {
        return false;
    };
    let Some(first) = ptype.chars().next() else {
        return false;
    };
    let section = first.to_string();
    model.add_policy(&section, &ptype, values)
}
