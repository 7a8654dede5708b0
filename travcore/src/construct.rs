//! The pipeline-facing surface of a pass (§6: "Pipeline API").
//!
//! The pipeline driver itself is an external collaborator (an outer loop
//! that calls `apply`); this module only defines the small, stable
//! interface such a driver needs to name a pass, parse its options, and
//! construct a fresh instance of it between applies.

use std::collections::HashMap;
use travcore_utils::{Error, TravResult};

/// A parsed pass-option value.
#[derive(Clone, Debug, PartialEq)]
pub enum ParseVal {
    Bool(bool),
    Num(i64),
    List(Vec<i64>),
}

impl ParseVal {
    pub fn bool(&self) -> Option<bool> {
        match self {
            ParseVal::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn num(&self) -> Option<i64> {
        match self {
            ParseVal::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn list(&self) -> Option<&[i64]> {
        match self {
            ParseVal::List(l) => Some(l),
            _ => None,
        }
    }
}

impl std::fmt::Display for ParseVal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseVal::Bool(b) => write!(f, "{b}"),
            ParseVal::Num(n) => write!(f, "{n}"),
            ParseVal::List(l) => write!(f, "{l:?}"),
        }
    }
}

/// Describes one configurable option a pass accepts.
pub struct PassOpt {
    pub name: &'static str,
    pub description: &'static str,
    pub default: ParseVal,
    pub parse: fn(&str) -> Option<ParseVal>,
}

impl PassOpt {
    pub fn new_bool(name: &'static str, description: &'static str, default: bool) -> Self {
        PassOpt {
            name,
            description,
            default: ParseVal::Bool(default),
            parse: |s| match s {
                "true" | "1" => Some(ParseVal::Bool(true)),
                "false" | "0" => Some(ParseVal::Bool(false)),
                _ => None,
            },
        }
    }

    pub fn new_num(name: &'static str, description: &'static str, default: i64) -> Self {
        PassOpt {
            name,
            description,
            default: ParseVal::Num(default),
            parse: |s| s.parse::<i64>().ok().map(ParseVal::Num),
        }
    }
}

/// A pass's identity, independent of its constructor arguments.
pub trait Named {
    /// A short, unique, human-readable name.
    fn name(&self) -> &'static str;

    /// A one-line description, shown by a driver's `--help`-equivalent.
    fn description(&self) -> &'static str {
        ""
    }

    /// Configurable options this pass accepts.
    fn opts(&self) -> Vec<PassOpt> {
        Vec::new()
    }
}

/// Constructs a fresh instance of a pass from a parsed option map, as a
/// driver would do once per pipeline run.
pub trait ConstructVisitor: Named {
    fn from_options(opts: &HashMap<&str, ParseVal>) -> TravResult<Self>
    where
        Self: Sized;

    /// Resets any accumulated state so the same instance can be reused for
    /// another apply (e.g. across components in a multi-unit program).
    fn clear_data(&mut self) {}
}

impl<T: Default + Named> ConstructVisitor for T {
    fn from_options(opts: &HashMap<&str, ParseVal>) -> TravResult<Self> {
        let inst = T::default();
        let known: Vec<&'static str> = inst.opts().into_iter().map(|o| o.name).collect();
        for name in opts.keys() {
            if !known.contains(name) {
                return Err(Error::unknown_option(*name));
            }
        }
        Ok(inst)
    }
}
