// src/version/mod.rs

//! Version handling and constraint satisfaction for APK-style packages
//!
//! This module provides version parsing and comparison under APK version
//! rules: dotted numeric components, an optional trailing letter, an
//! optional `_alpha`/`_beta`/`_pre`/`_rc`/`_p` suffix word, and an optional
//! `-r<N>` build revision.

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;

/// Pre/post-release suffix words, in sort order.
///
/// Pre-release suffixes sort before the bare version, `_p` (patch) after:
/// `1.0_alpha1 < 1.0_beta < 1.0_pre < 1.0_rc1 < 1.0 < 1.0_p1`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuffixKind {
    Alpha,
    Beta,
    Pre,
    Rc,
    P,
}

impl SuffixKind {
    fn parse(word: &str) -> Option<Self> {
        match word {
            "alpha" => Some(Self::Alpha),
            "beta" => Some(Self::Beta),
            "pre" => Some(Self::Pre),
            "rc" => Some(Self::Rc),
            "p" => Some(Self::P),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Alpha => "alpha",
            Self::Beta => "beta",
            Self::Pre => "pre",
            Self::Rc => "rc",
            Self::P => "p",
        }
    }

    /// Rank relative to a suffix-less version (rank 0).
    fn rank(&self) -> i8 {
        match self {
            Self::Alpha => -4,
            Self::Beta => -3,
            Self::Pre => -2,
            Self::Rc => -1,
            Self::P => 1,
        }
    }
}

/// A parsed APK version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    /// Dotted numeric components, in order.
    pub components: Vec<u64>,
    /// Optional single trailing letter (`1.2a`).
    pub letter: Option<char>,
    /// Optional suffix word and its number (`_rc2`).
    pub suffix: Option<(SuffixKind, u64)>,
    /// Build revision from `-r<N>`; 0 when absent.
    pub revision: u64,
}

impl Version {
    /// Parse an APK version string.
    ///
    /// Format: `digits('.'digits)* [a-z] [_suffix[num]] [-r<num>]`
    /// Examples:
    /// - "1.2.3" → components [1,2,3]
    /// - "1.2.3a" → trailing letter 'a'
    /// - "1.2.3_rc2" → suffix (Rc, 2)
    /// - "1.2.3-r4" → revision 4
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidVersion(s.to_string());
        let b = s.as_bytes();
        let mut i = 0;

        let mut components = Vec::new();
        loop {
            let start = i;
            while i < b.len() && b[i].is_ascii_digit() {
                i += 1;
            }
            if start == i {
                return Err(invalid());
            }
            let n = s[start..i].parse::<u64>().map_err(|_| invalid())?;
            components.push(n);
            // consume the dot only when another numeric component follows
            if i + 1 < b.len() && b[i] == b'.' && b[i + 1].is_ascii_digit() {
                i += 1;
            } else {
                break;
            }
        }

        let mut letter = None;
        if i < b.len() && b[i].is_ascii_lowercase() {
            letter = Some(b[i] as char);
            i += 1;
        }

        let mut suffix = None;
        if i < b.len() && b[i] == b'_' {
            i += 1;
            let start = i;
            while i < b.len() && b[i].is_ascii_lowercase() {
                i += 1;
            }
            let kind = SuffixKind::parse(&s[start..i]).ok_or_else(invalid)?;
            let num_start = i;
            while i < b.len() && b[i].is_ascii_digit() {
                i += 1;
            }
            let number = if num_start == i {
                0
            } else {
                s[num_start..i].parse::<u64>().map_err(|_| invalid())?
            };
            suffix = Some((kind, number));
        }

        let mut revision = 0;
        if i < b.len() && b[i] == b'-' {
            if i + 1 >= b.len() || b[i + 1] != b'r' {
                return Err(invalid());
            }
            i += 2;
            let start = i;
            while i < b.len() && b[i].is_ascii_digit() {
                i += 1;
            }
            if start == i {
                return Err(invalid());
            }
            revision = s[start..i].parse::<u64>().map_err(|_| invalid())?;
        }

        if i != b.len() {
            return Err(invalid());
        }

        Ok(Self {
            components,
            letter,
            suffix,
            revision,
        })
    }

    /// Compare two versions under the APK ordering.
    pub fn compare(&self, other: &Version) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            match (self.components.get(i), other.components.get(i)) {
                (Some(a), Some(b)) if a == b => continue,
                (Some(a), Some(b)) => return a.cmp(b),
                // a present component beats an absent one: 1.2 < 1.2.1
                (Some(_), None) => return Ordering::Greater,
                (None, _) => return Ordering::Less,
            }
        }

        match self.letter.cmp(&other.letter) {
            Ordering::Equal => {}
            ord => return ord,
        }

        let self_rank = self.suffix.map(|(k, _)| k.rank()).unwrap_or(0);
        let other_rank = other.suffix.map(|(k, _)| k.rank()).unwrap_or(0);
        match self_rank.cmp(&other_rank) {
            Ordering::Equal => {}
            ord => return ord,
        }
        if let (Some((_, a)), Some((_, b))) = (self.suffix, other.suffix) {
            match a.cmp(&b) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }

        self.revision.cmp(&other.revision)
    }

    /// Fuzzy-equality against a required version: the numeric components
    /// must match up to the precision the required version specifies.
    ///
    /// `2.4.6 ~= 2.4` holds; `2.5.1 ~= 2.4` does not. Letters, suffixes and
    /// revisions are ignored by the fuzzy check.
    pub fn prefix_matches(&self, required: &Version) -> bool {
        if self.components.len() < required.components.len() {
            return false;
        }
        self.components[..required.components.len()] == required.components[..]
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.components.iter().map(u64::to_string).collect();
        write!(f, "{}", parts.join("."))?;
        if let Some(letter) = self.letter {
            write!(f, "{}", letter)?;
        }
        if let Some((kind, number)) = self.suffix {
            write!(f, "_{}", kind.as_str())?;
            if number > 0 {
                write!(f, "{}", number)?;
            }
        }
        if self.revision > 0 {
            write!(f, "-r{}", self.revision)?;
        }
        Ok(())
    }
}

/// Relational operators accepted in constraint tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Op {
    /// Any version is acceptable.
    #[default]
    Any,
    Less,
    LessEqual,
    Equal,
    GreaterEqual,
    Greater,
    /// `~=`: equal up to the precision of the required version.
    Fuzzy,
}

impl Op {
    /// Parse an operator symbol; `None` for anything else.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "<" => Some(Self::Less),
            "<=" => Some(Self::LessEqual),
            "=" => Some(Self::Equal),
            ">=" => Some(Self::GreaterEqual),
            ">" => Some(Self::Greater),
            "~=" => Some(Self::Fuzzy),
            _ => None,
        }
    }

    /// The operator's token symbol; empty for `Any`.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Any => "",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Equal => "=",
            Self::GreaterEqual => ">=",
            Self::Greater => ">",
            Self::Fuzzy => "~=",
        }
    }

    /// Evaluate the operator against `(actual, required)`.
    ///
    /// `Any` holds without a required version at all; every other operator
    /// is false when the required version is missing.
    pub fn satisfies(&self, actual: &Version, required: Option<&Version>) -> bool {
        if matches!(self, Self::Any) {
            return true;
        }
        let Some(required) = required else {
            return false;
        };
        match self {
            Self::Any => true,
            Self::Less => actual < required,
            Self::LessEqual => actual <= required,
            Self::Equal => actual == required,
            Self::GreaterEqual => actual >= required,
            Self::Greater => actual > required,
            Self::Fuzzy => actual.prefix_matches(required),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}
