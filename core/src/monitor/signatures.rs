//! Log signature table — the data the log correlator matches against.
//!
//! Each row is a `(class, severity, matcher)` triple. The correlator asks the
//! table whether a log line belongs to a class; it never hard-codes keywords.
//! New signatures are added as rows, either in `BUILTIN_ROWS` or through the
//! `signatures:` list in the settings file.

use regex::{Regex, RegexBuilder};
use tracing::error;

use crate::error::{MonitorError, Result};
use crate::types::config::{MonitorSettings, SignatureClass, SignatureSpec};
use crate::types::health::Severity;


/// Built-in rows. Patterns are matched case-insensitively against the log
/// message plus the JSON text of its details.
const BUILTIN_ROWS: &[(SignatureClass, &str)] = &[
    // Rate limiting
    (SignatureClass::RateLimit, r"rate[ _-]?limit"),
    (SignatureClass::RateLimit, r"\b429\b"),
    (SignatureClass::RateLimit, r"too many requests"),
    // Model fallback / switch
    (SignatureClass::ModelChange, r"fallback model"),
    (SignatureClass::ModelChange, r"fall(ing)?[ _-]?back to"),
    (SignatureClass::ModelChange, r"using fallback"),
    (SignatureClass::ModelChange, r"switch(ed|ing)? (to )?(the )?model"),
    (SignatureClass::ModelChange, r"model (switch|switched|change|changed)"),
    // Provider / API failures
    (SignatureClass::ApiError, r"api (error|request failed)"),
    (SignatureClass::ApiError, r"provider error"),
    (SignatureClass::ApiError, r"status(\s*code)?[\s:=]*5\d\d"),
    (SignatureClass::ApiError, r"\b50[0234]\b"),
    (SignatureClass::ApiError, r"service unavailable"),
    (SignatureClass::ApiError, r"bad gateway"),
    (SignatureClass::ApiError, r"internal server error"),
    (SignatureClass::ApiError, r"request failed"),
    (SignatureClass::ApiError, r"upstream error"),
    // Quota exhaustion
    (SignatureClass::Quota, r"quota"),
    (SignatureClass::Quota, r"billing"),
    (SignatureClass::Quota, r"credit balance"),
    (SignatureClass::Quota, r"exceeded your current"),
];


/// Severity a class carries unless a row says otherwise.
pub fn default_severity(class: SignatureClass) -> Severity {
    match class {
        SignatureClass::RateLimit => Severity::Warning,
        SignatureClass::ModelChange => Severity::Info,
        SignatureClass::ApiError => Severity::Warning,
        SignatureClass::Quota => Severity::Critical,
    }
}


/// One compiled row.
#[derive(Debug, Clone)]
pub struct Signature {
    pub class: SignatureClass,
    pub severity: Severity,
    matcher: Regex,
}

impl Signature {
    pub fn new(class: SignatureClass, severity: Severity, pattern: &str) -> Result<Self> {
        let matcher = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| MonitorError::Signature {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Signature {
            class,
            severity,
            matcher,
        })
    }

    pub fn pattern(&self) -> &str {
        self.matcher.as_str()
    }

    pub fn matches(&self, text: &str) -> bool {
        self.matcher.is_match(text)
    }
}


#[derive(Debug, Clone)]
pub struct SignatureTable {
    rows: Vec<Signature>,
}

impl SignatureTable {
    /// An empty table; nothing matches.
    pub fn empty() -> Self {
        SignatureTable { rows: Vec::new() }
    }

    /// The built-in rows.
    pub fn builtin() -> Self {
        let mut rows = Vec::with_capacity(BUILTIN_ROWS.len());
        for (class, pattern) in BUILTIN_ROWS {
            match Signature::new(*class, default_severity(*class), pattern) {
                Ok(sig) => rows.push(sig),
                Err(e) => error!(error = %e, "skipping built-in signature"),
            }
        }
        SignatureTable { rows }
    }

    /// Built-in rows plus the user rows from settings.
    pub fn from_settings(settings: &MonitorSettings) -> Result<Self> {
        Self::builtin().with_extra(&settings.signatures)
    }

    /// Append user rows. Fails on the first pattern that does not compile.
    pub fn with_extra(mut self, specs: &[SignatureSpec]) -> Result<Self> {
        for spec in specs {
            self.push(Signature::new(
                spec.class,
                default_severity(spec.class),
                &spec.pattern,
            )?);
        }
        Ok(self)
    }

    pub fn push(&mut self, signature: Signature) {
        self.rows.push(signature);
    }

    /// First row of `class` that matches `text`.
    pub fn match_class(&self, class: SignatureClass, text: &str) -> Option<&Signature> {
        self.rows
            .iter()
            .filter(|row| row.class == class)
            .find(|row| row.matches(text))
    }

    pub fn rows(&self) -> &[Signature] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Default for SignatureTable {
    fn default() -> Self {
        Self::builtin()
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
