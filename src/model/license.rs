//! License name normalisation.
//!
//! Declared and observed license names arrive in whatever spelling the
//! package author or scanner used. Known aliases are mapped onto SPDX ids;
//! anything else is kept verbatim after whitespace cleanup.

use std::collections::{BTreeSet, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("apache 2", "Apache-2.0"),
        ("apache 2.0", "Apache-2.0"),
        ("apache license 2.0", "Apache-2.0"),
        ("apache license, version 2.0", "Apache-2.0"),
        ("the apache software license, version 2.0", "Apache-2.0"),
        ("asl 2.0", "Apache-2.0"),
        ("mit license", "MIT"),
        ("the mit license", "MIT"),
        ("bsd", "BSD-3-Clause"),
        ("new bsd license", "BSD-3-Clause"),
        ("bsd-3", "BSD-3-Clause"),
        ("simplified bsd license", "BSD-2-Clause"),
        ("isc license", "ISC"),
        ("eclipse public license 2.0", "EPL-2.0"),
        ("eclipse public license - v 2.0", "EPL-2.0"),
        ("eclipse public license 1.0", "EPL-1.0"),
        ("gplv2", "GPL-2.0-only"),
        ("gplv3", "GPL-3.0-only"),
        ("lgpl 2.1", "LGPL-2.1-only"),
        ("lgplv2.1", "LGPL-2.1-only"),
        ("mpl 1.1", "MPL-1.1"),
        ("mpl 2.0", "MPL-2.0"),
        ("mozilla public license 2.0", "MPL-2.0"),
        ("cc0", "CC0-1.0"),
        ("public domain", "LicenseRef-public-domain"),
    ])
});

/// Resolve a single license name to its canonical spelling.
pub fn canonical_name(raw: &str) -> Option<String> {
    let cleaned = WHITESPACE.replace_all(raw.trim(), " ");
    if cleaned.is_empty() {
        return None;
    }
    let alias = ALIASES.get(cleaned.to_lowercase().as_str());
    Some(alias.map(|s| s.to_string()).unwrap_or_else(|| cleaned.into_owned()))
}

/// Conjunction of licenses that all apply to an artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseStatement {
    pub licenses: BTreeSet<String>,
}

impl LicenseStatement {
    pub fn is_empty(&self) -> bool {
        self.licenses.is_empty()
    }

    pub fn merge_with(mut self, other: LicenseStatement) -> Self {
        self.licenses.extend(other.licenses);
        self
    }

    /// Render as an expression: `MIT` or `( Apache-2.0 AND MIT )`.
    pub fn evaluate(&self) -> String {
        match self.licenses.len() {
            0 => String::new(),
            1 => self.licenses.iter().next().cloned().unwrap_or_default(),
            _ => {
                let joined = self
                    .licenses
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(" AND ");
                format!("( {joined} )")
            }
        }
    }
}

/// Normalise a collection of license names into one statement.
pub fn normalize<I, S>(licenses: I) -> LicenseStatement
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    LicenseStatement {
        licenses: licenses
            .into_iter()
            .filter_map(|l| canonical_name(l.as_ref()))
            .collect(),
    }
}
