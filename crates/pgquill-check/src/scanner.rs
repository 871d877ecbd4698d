//! Heuristic SQL safety scanner.
//!
//! The scanner looks at a fully composed statement and vetoes text that looks
//! dangerous: empty statements, `DROP`, statement separators, credential
//! wildcards (`username = '*'`) and tautologies (`1=1`). It is a best-effort
//! guard against accidents and naive injection, not a SQL parser, and it must
//! not be relied on as the only line of defense.
//!
//! # Example
//!
//! ```
//! use pgquill_check::{SafetyScanner, ScannerConfig};
//!
//! let scanner = SafetyScanner::new(
//!     ScannerConfig::new().with_check(|sql| !sql.contains("pg_sleep")),
//! );
//!
//! assert!(scanner.scan("SELECT * FROM users WHERE id = $1"));
//! assert!(!scanner.scan("SELECT * FROM users WHERE 1=1"));
//! assert!(!scanner.scan("SELECT pg_sleep(10)"));
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CheckError, CheckResult};

// ── Rule codes ──────────────────────────────────────────────────────

/// Empty statement.
pub const SCAN_S001: &str = "S001";
/// `DROP` keyword or `;` separator.
pub const SCAN_S002: &str = "S002";
/// Credential column compared to a `*` wildcard.
pub const SCAN_S003: &str = "S003";
/// Tautology such as `1=1` or `x=x`.
pub const SCAN_S004: &str = "S004";
/// Custom WHERE-scoped pattern matched.
pub const SCAN_S005: &str = "S005";
/// Custom pattern matched.
pub const SCAN_S006: &str = "S006";
/// Custom check callback vetoed the statement.
pub const SCAN_S007: &str = "S007";

/// The rule that produced a scanner veto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanRule {
    Empty,
    ForbiddenToken,
    CredentialWildcard,
    Tautology,
    WherePattern,
    Pattern,
    CustomCheck,
}

impl ScanRule {
    /// Stable code for this rule (e.g. `S004`).
    pub fn code(self) -> &'static str {
        match self {
            ScanRule::Empty => SCAN_S001,
            ScanRule::ForbiddenToken => SCAN_S002,
            ScanRule::CredentialWildcard => SCAN_S003,
            ScanRule::Tautology => SCAN_S004,
            ScanRule::WherePattern => SCAN_S005,
            ScanRule::Pattern => SCAN_S006,
            ScanRule::CustomCheck => SCAN_S007,
        }
    }
}

/// A veto produced by the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanIssue {
    pub rule: ScanRule,
    pub message: String,
}

impl fmt::Display for ScanIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.rule.code(), self.message)
    }
}

/// Outcome of scanning one statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub issue: Option<ScanIssue>,
}

impl ScanResult {
    fn safe() -> Self {
        Self { issue: None }
    }

    fn veto(rule: ScanRule, message: impl Into<String>) -> Self {
        Self {
            issue: Some(ScanIssue {
                rule,
                message: message.into(),
            }),
        }
    }

    /// Returns true if no rule vetoed the statement.
    pub fn is_safe(&self) -> bool {
        self.issue.is_none()
    }

    /// The rule that vetoed the statement, if any.
    pub fn rule(&self) -> Option<ScanRule> {
        self.issue.as_ref().map(|i| i.rule)
    }
}

/// A custom veto callback. Return `false` when the statement looks unsafe.
pub type SafetyCheck = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Serializable list of custom patterns, for loading from application config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerPatterns {
    /// Patterns matched against the whole statement.
    pub patterns: Vec<String>,
    /// Patterns matched against the whole statement, only when it has a WHERE clause.
    pub where_patterns: Vec<String>,
}

/// Custom rules consulted by a [`SafetyScanner`] after the built-in ones.
///
/// All lists are append-only and evaluated in registration order.
#[derive(Clone, Default)]
pub struct ScannerConfig {
    checks: Vec<SafetyCheck>,
    patterns: Vec<Regex>,
    where_patterns: Vec<Regex>,
}

impl fmt::Debug for ScannerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScannerConfig")
            .field("checks", &self.checks.len())
            .field("patterns", &self.patterns)
            .field("where_patterns", &self.where_patterns)
            .finish()
    }
}

impl ScannerConfig {
    /// Create an empty configuration (built-in rules only).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from a serializable pattern list.
    pub fn from_patterns(patterns: &ScannerPatterns) -> CheckResult<Self> {
        let mut config = Self::new();
        for p in &patterns.patterns {
            config.add_pattern(p)?;
        }
        for p in &patterns.where_patterns {
            config.add_where_pattern(p)?;
        }
        Ok(config)
    }

    /// Append a custom veto callback.
    pub fn add_check<F>(&mut self, check: F) -> &mut Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.checks.push(Arc::new(check));
        self
    }

    /// Append a pattern matched against the whole statement.
    pub fn add_pattern(&mut self, pattern: &str) -> CheckResult<&mut Self> {
        let re = compile(pattern)?;
        self.patterns.push(re);
        Ok(self)
    }

    /// Append a pattern that only applies to statements with a WHERE clause.
    pub fn add_where_pattern(&mut self, pattern: &str) -> CheckResult<&mut Self> {
        let re = compile(pattern)?;
        self.where_patterns.push(re);
        Ok(self)
    }

    /// Chainable form of [`ScannerConfig::add_check`].
    pub fn with_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.add_check(check);
        self
    }

    /// Chainable form of [`ScannerConfig::add_pattern`].
    pub fn with_pattern(mut self, pattern: &str) -> CheckResult<Self> {
        self.add_pattern(pattern)?;
        Ok(self)
    }

    /// Chainable form of [`ScannerConfig::add_where_pattern`].
    pub fn with_where_pattern(mut self, pattern: &str) -> CheckResult<Self> {
        self.add_where_pattern(pattern)?;
        Ok(self)
    }

    /// Number of registered custom rules.
    pub fn len(&self) -> usize {
        self.checks.len() + self.patterns.len() + self.where_patterns.len()
    }

    /// Returns true if no custom rules are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn compile(pattern: &str) -> CheckResult<Regex> {
    Regex::new(pattern).map_err(|e| CheckError::invalid_pattern(pattern, e))
}

fn forbidden_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)drop|;").expect("invalid built-in forbidden regex"))
}

fn where_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bwhere\b").expect("invalid built-in where regex"))
}

const CREDENTIAL_COLUMN: &str = r#"["']?\b(?:user(?:name|id)?|pass(?:word)?|uid)\b["']?"#;

fn credential_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r#"(?is){CREDENTIAL_COLUMN}\s*=\s*["']?\*["']?"#))
            .expect("invalid built-in credential regex")
    })
}

fn credential_placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?is){CREDENTIAL_COLUMN}\s*=\s*\$(\d+)"))
            .expect("invalid built-in credential placeholder regex")
    })
}

fn equality_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(["']?)([A-Za-z0-9_\-]*)(["']?)\s*=\s*(["']?)([A-Za-z0-9_\-]*)(["']?)"#)
            .expect("invalid built-in equality regex")
    })
}

/// Find the first self-comparison (`1=1`, `x = x`, `'a'='a'`) in `text`.
///
/// An empty operand only counts when both sides are quoted (`''=''`), so
/// comparison operators such as `<=` never look like a tautology.
fn find_tautology(text: &str) -> Option<String> {
    for caps in equality_re().captures_iter(text) {
        let left = caps.get(2).map_or("", |m| m.as_str());
        let right = caps.get(5).map_or("", |m| m.as_str());
        if left != right {
            continue;
        }
        if !left.is_empty() {
            return Some(caps[0].trim().to_string());
        }
        let quoted = [1, 3, 4, 6]
            .iter()
            .all(|i| caps.get(*i).is_some_and(|m| !m.as_str().is_empty()));
        if quoted {
            return Some(caps[0].trim().to_string());
        }
    }
    None
}

/// Heuristic validator for composed SQL statements.
///
/// Built-in rules run first, in a fixed order, followed by the custom rules of
/// the [`ScannerConfig`]. The first veto wins.
#[derive(Debug, Clone, Default)]
pub struct SafetyScanner {
    config: ScannerConfig,
}

impl SafetyScanner {
    /// Create a scanner with the given custom rules.
    pub fn new(config: ScannerConfig) -> Self {
        Self { config }
    }

    /// Create a scanner from a snapshot of the process-wide registry.
    ///
    /// Rules registered after this call are not seen by the returned scanner.
    pub fn global() -> Self {
        let config = registry()
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Self { config }
    }

    /// The custom rules of this scanner.
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Returns `true` if `sql` passes every rule.
    pub fn scan(&self, sql: &str) -> bool {
        self.check(sql).is_safe()
    }

    /// Scan `sql` and report the first rule that vetoes it.
    pub fn check(&self, sql: &str) -> ScanResult {
        run(&self.config, sql, None)
    }

    /// Scan `sql` together with the text form of its bound parameters.
    ///
    /// `bound[i]` is the text value bound to `$i+1`, or `None` for non-text
    /// values. A credential column compared to a placeholder bound to exactly
    /// `*` is vetoed the same way as an inline `username = '*'`.
    pub fn check_bound(&self, sql: &str, bound: &[Option<&str>]) -> ScanResult {
        run(&self.config, sql, Some(bound))
    }
}

fn run(config: &ScannerConfig, sql: &str, bound: Option<&[Option<&str>]>) -> ScanResult {
    if sql.trim().is_empty() {
        return ScanResult::veto(ScanRule::Empty, "empty statement");
    }

    if let Some(m) = forbidden_re().find(sql) {
        return ScanResult::veto(
            ScanRule::ForbiddenToken,
            format!("forbidden token '{}'", m.as_str()),
        );
    }

    if let Some(m) = where_re().find(sql) {
        let tail = &sql[m.start()..];

        if let Some(found) = credential_re().find(tail) {
            return ScanResult::veto(
                ScanRule::CredentialWildcard,
                format!("credential wildcard '{}'", found.as_str().trim()),
            );
        }

        if let Some(bound) = bound {
            for caps in credential_placeholder_re().captures_iter(tail) {
                let idx = caps[1].parse::<usize>().ok().and_then(|n| n.checked_sub(1));
                let value = idx.and_then(|i| bound.get(i)).copied().flatten();
                if value == Some("*") {
                    return ScanResult::veto(
                        ScanRule::CredentialWildcard,
                        format!("credential wildcard bound to '{}'", caps[0].trim()),
                    );
                }
            }
        }

        if let Some(found) = find_tautology(tail) {
            return ScanResult::veto(ScanRule::Tautology, format!("tautology '{found}'"));
        }

        if let Some(re) = config.where_patterns.iter().find(|re| re.is_match(sql)) {
            return ScanResult::veto(
                ScanRule::WherePattern,
                format!("matched where pattern '{}'", re.as_str()),
            );
        }
    }

    if let Some(re) = config.patterns.iter().find(|re| re.is_match(sql)) {
        return ScanResult::veto(
            ScanRule::Pattern,
            format!("matched pattern '{}'", re.as_str()),
        );
    }

    if let Some(i) = config.checks.iter().position(|check| !check(sql)) {
        return ScanResult::veto(ScanRule::CustomCheck, format!("custom check #{i} failed"));
    }

    ScanResult::safe()
}

// ── Process-wide registry ───────────────────────────────────────────

fn registry() -> &'static RwLock<ScannerConfig> {
    static REGISTRY: OnceLock<RwLock<ScannerConfig>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(ScannerConfig::new()))
}

/// Register a process-wide veto callback (seen by [`SafetyScanner::global`]).
///
/// Return `false` from the callback when a statement looks unsafe.
pub fn add_check<F>(check: F)
where
    F: Fn(&str) -> bool + Send + Sync + 'static,
{
    registry()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .add_check(check);
}

/// Register a process-wide pattern matched against the whole statement.
pub fn add_pattern(pattern: &str) -> CheckResult<()> {
    let re = compile(pattern)?;
    registry()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .patterns
        .push(re);
    Ok(())
}

/// Register a process-wide pattern applied only to statements with a WHERE clause.
pub fn add_where_pattern(pattern: &str) -> CheckResult<()> {
    let re = compile(pattern)?;
    registry()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .where_patterns
        .push(re);
    Ok(())
}

/// Scan `sql` against the live process-wide rules.
///
/// Unlike [`SafetyScanner::global`], rules registered later are seen by the
/// next call.
pub fn check_global(sql: &str) -> ScanResult {
    let config = registry().read().unwrap_or_else(PoisonError::into_inner);
    run(&config, sql, None)
}

/// [`check_global`] together with the text form of bound parameters (see
/// [`SafetyScanner::check_bound`]).
pub fn check_global_bound(sql: &str, bound: &[Option<&str>]) -> ScanResult {
    let config = registry().read().unwrap_or_else(PoisonError::into_inner);
    run(&config, sql, Some(bound))
}
