//! Header-name cleaning.
//!
//! Each [`CleanLevel`] is a superset of the one before it:
//!
//! | level            | `"#Term Code"`   |
//! |------------------|------------------|
//! | `Noop`           | `"#Term Code"`   |
//! | `Lower`          | `"#term code"`   |
//! | `LowerNoSpace`   | `"#term_code"`   |
//! | `LowerAlphanum`  | `"termcode"`     |
//! | `Standardize`    | `"term"`         |

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{ReaderError, ReaderResult};

/// How aggressively raw header tokens are normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum CleanLevel {
    /// Pass the header through unchanged.
    Noop = 0,
    /// Trim and lowercase.
    Lower = 1,
    /// `Lower`, then spaces become underscores.
    #[default]
    LowerNoSpace = 2,
    /// `Lower`, then everything that is not alphanumeric is removed.
    LowerAlphanum = 3,
    /// `LowerAlphanum`, then a trailing `code` suffix is removed.
    Standardize = 4,
}

impl CleanLevel {
    /// All levels in increasing order of aggressiveness.
    pub const ALL: [CleanLevel; 5] = [
        CleanLevel::Noop,
        CleanLevel::Lower,
        CleanLevel::LowerNoSpace,
        CleanLevel::LowerAlphanum,
        CleanLevel::Standardize,
    ];

    /// Stable lowercase name of the level.
    pub fn as_str(self) -> &'static str {
        match self {
            CleanLevel::Noop => "noop",
            CleanLevel::Lower => "lower",
            CleanLevel::LowerNoSpace => "lower_nospace",
            CleanLevel::LowerAlphanum => "lower_alphanum",
            CleanLevel::Standardize => "standardize",
        }
    }
}

impl fmt::Display for CleanLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<i64> for CleanLevel {
    type Error = ReaderError;

    fn try_from(value: i64) -> ReaderResult<Self> {
        match value {
            0 => Ok(CleanLevel::Noop),
            1 => Ok(CleanLevel::Lower),
            2 => Ok(CleanLevel::LowerNoSpace),
            3 => Ok(CleanLevel::LowerAlphanum),
            4 => Ok(CleanLevel::Standardize),
            _ => Err(ReaderError::InvalidCleanLevel {
                value: value.to_string(),
            }),
        }
    }
}

impl FromStr for CleanLevel {
    type Err = ReaderError;

    /// Accepts either the numeric level (`"0"`..`"4"`) or its name (case-insensitive).
    fn from_str(s: &str) -> ReaderResult<Self> {
        let s = s.trim();
        if let Ok(n) = s.parse::<i64>() {
            return CleanLevel::try_from(n);
        }
        CleanLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ReaderError::InvalidCleanLevel { value: s.to_string() })
    }
}

/// Normalize one raw header token.
///
/// Pure and total: any input produces a string, and applying the same level twice gives the same
/// result as applying it once.
pub fn clean_header(raw: &str, level: CleanLevel) -> String {
    if level == CleanLevel::Noop {
        return raw.to_string();
    }

    let mut out = raw.trim().to_lowercase();
    match level {
        CleanLevel::Noop | CleanLevel::Lower => {}
        CleanLevel::LowerNoSpace => out = out.replace(' ', "_"),
        CleanLevel::LowerAlphanum | CleanLevel::Standardize => {
            out.retain(char::is_alphanumeric);
            if level == CleanLevel::Standardize {
                strip_code_suffix(&mut out);
            }
        }
    }
    out
}

// Keeps at least one "code" so that a header literally named "code" survives.
fn strip_code_suffix(s: &mut String) {
    const SUFFIX: &str = "code";
    while s.len() > SUFFIX.len() && s.ends_with(SUFFIX) {
        s.truncate(s.len() - SUFFIX.len());
    }
}

/// Clean a full header row into a set of unique, non-empty canonical names.
///
/// Names that clean to the empty string become `column_NN` (1-based position). Repeats are
/// suffixed `_2`, `_3`, ... in order of appearance.
pub fn canonical_headers<S: AsRef<str>>(raw: &[S], level: CleanLevel) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(raw.len());
    let mut out = Vec::with_capacity(raw.len());

    for (idx0, h) in raw.iter().enumerate() {
        let mut name = clean_header(h.as_ref(), level);
        if name.is_empty() {
            name = synthetic_column_name(idx0);
        }
        if seen.contains(&name) {
            let base = name.clone();
            let mut n = 2;
            while seen.contains(&name) {
                name = format!("{base}_{n}");
                n += 1;
            }
        }
        seen.insert(name.clone());
        out.push(name);
    }
    out
}

/// `column_01`, `column_02`, ... for a 0-based column position.
pub fn synthetic_column_name(idx0: usize) -> String {
    format!("column_{:02}", idx0 + 1)
}
