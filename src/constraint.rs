// src/constraint.rs

//! Constraint token parsing
//!
//! A constraint token names a package requirement as it appears in index
//! dependency lists and user requests:
//!
//! `[!]name[@pin][op version]`
//!
//! Examples:
//! - `busybox` - any version of busybox
//! - `so:libssl.so.3` - any provider of the virtual name
//! - `curl>=8.5.0` - curl at 8.5.0 or newer
//! - `openssl@edge` - prefer the index pinned as `edge`
//! - `!apache2` - must not be installed alongside apache2
//!
//! Parsing is best-effort and never fails: a token without a recognizable
//! operator degrades to `(name, op=Any, version="")`. Version validation is
//! deferred to the version algebra at the point of comparison.

use crate::version::Op;
use std::fmt;

/// A parsed constraint token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constraint {
    /// True for `!token` conflict constraints.
    pub negated: bool,
    /// Package or virtual name being constrained.
    pub name: String,
    /// Index pin label from an `@pin` suffix; empty when absent.
    pub pin: String,
    /// Relational operator; `Any` when absent.
    pub op: Op,
    /// Required version text, unvalidated; empty when absent.
    pub version: String,
}

impl Constraint {
    /// Parse a raw token.
    pub fn parse(token: &str) -> Self {
        let (negated, rest) = match token.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, token),
        };

        let mut name_part = rest;
        let mut op = Op::Any;
        let mut version = String::new();

        if let Some(idx) = rest.find(['<', '>', '=', '~']) {
            // longest operator first so `<=` is not read as `<` + `=...`
            for symbol in ["<=", ">=", "~=", "<", ">", "="] {
                if rest[idx..].starts_with(symbol) {
                    // ops are always parseable here; the list mirrors Op
                    if let Some(parsed) = Op::parse(symbol) {
                        op = parsed;
                        version = rest[idx + symbol.len()..].to_string();
                        name_part = &rest[..idx];
                    }
                    break;
                }
            }
        }

        let (name, pin) = match name_part.split_once('@') {
            Some((name, pin)) => (name.to_string(), pin.to_string()),
            None => (name_part.to_string(), String::new()),
        };

        Self {
            negated,
            name,
            pin,
            op,
            version,
        }
    }

    /// The token text without any leading `!`.
    pub fn stripped(&self) -> String {
        let mut out = self.name.clone();
        if !self.pin.is_empty() {
            out.push('@');
            out.push_str(&self.pin);
        }
        if self.op != Op::Any {
            out.push_str(self.op.symbol());
            out.push_str(&self.version);
        }
        out
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "!")?;
        }
        write!(f, "{}", self.stripped())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_name() {
        let c = Constraint::parse("busybox");
        assert!(!c.negated);
        assert_eq!(c.name, "busybox");
        assert_eq!(c.pin, "");
        assert_eq!(c.op, Op::Any);
        assert_eq!(c.version, "");
    }

    #[test]
    fn test_parse_each_operator() {
        let cases = [
            ("foo<1.0", Op::Less),
            ("foo<=1.0", Op::LessEqual),
            ("foo=1.0", Op::Equal),
            ("foo>=1.0", Op::GreaterEqual),
            ("foo>1.0", Op::Greater),
            ("foo~=1.0", Op::Fuzzy),
        ];
        for (token, op) in cases {
            let c = Constraint::parse(token);
            assert_eq!(c.name, "foo", "{}", token);
            assert_eq!(c.op, op, "{}", token);
            assert_eq!(c.version, "1.0", "{}", token);
        }
    }

    #[test]
    fn test_parse_negated() {
        let c = Constraint::parse("!apache2<2.4");
        assert!(c.negated);
        assert_eq!(c.name, "apache2");
        assert_eq!(c.op, Op::Less);
        assert_eq!(c.version, "2.4");
    }

    #[test]
    fn test_parse_pin() {
        let c = Constraint::parse("openssl@edge>=3.1");
        assert_eq!(c.name, "openssl");
        assert_eq!(c.pin, "edge");
        assert_eq!(c.op, Op::GreaterEqual);
        assert_eq!(c.version, "3.1");
    }

    #[test]
    fn test_parse_virtual_name() {
        let c = Constraint::parse("so:libcrypto.so.3");
        assert_eq!(c.name, "so:libcrypto.so.3");
        assert_eq!(c.op, Op::Any);
    }

    #[test]
    fn test_parse_best_effort_on_garbage() {
        // a lone tilde is not an operator; it stays part of the name
        let c = Constraint::parse("odd~name");
        assert_eq!(c.name, "odd~name");
        assert_eq!(c.op, Op::Any);
        assert_eq!(c.version, "");

        // empty version after an operator is tolerated
        let c = Constraint::parse("foo=");
        assert_eq!(c.name, "foo");
        assert_eq!(c.op, Op::Equal);
        assert_eq!(c.version, "");
    }

    #[test]
    fn test_display_roundtrip() {
        for token in ["busybox", "foo<1.0", "!bar", "openssl@edge>=3.1", "!x~=2"] {
            assert_eq!(Constraint::parse(token).to_string(), token);
        }
    }

    #[test]
    fn test_stripped_drops_negation_only() {
        let c = Constraint::parse("!foo<2.0");
        assert_eq!(c.stripped(), "foo<2.0");
    }
}
