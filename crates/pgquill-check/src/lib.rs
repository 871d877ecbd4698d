//! pgquill-check
//!
//! Text-level safety helpers used by `pgquill` before a statement reaches the
//! database.
//!
//! # Features
//!
//! - **Sanitizing**: reduce identifiers to `[A-Za-z0-9_-]`, escape quotes in literals
//! - **Safety scanning**: veto empty statements, `DROP`, `;`, credential wildcards and tautologies
//! - **Custom rules**: extra veto callbacks and regex patterns, per scanner or process-wide
//!
//! # Example
//!
//! ```
//! use pgquill_check::{SafetyScanner, ScanRule, to_alphanumeric};
//!
//! assert_eq!(to_alphanumeric("users;"), "users");
//!
//! let scanner = SafetyScanner::default();
//! let result = scanner.check("SELECT * FROM users WHERE username = 'admin' OR 1=1");
//! assert_eq!(result.rule(), Some(ScanRule::Tautology));
//! ```

pub mod error;
pub mod sanitize;
pub mod scanner;

pub use error::{CheckError, CheckResult};
pub use sanitize::{escape_quotes, is_ident_char, sanitize_path, to_alphanumeric};
pub use scanner::{
    SafetyCheck, SafetyScanner, ScanIssue, ScanResult, ScanRule, ScannerConfig, ScannerPatterns,
    add_check, add_pattern, add_where_pattern, check_global, check_global_bound,
};
