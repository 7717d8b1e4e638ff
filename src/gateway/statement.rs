//! Statement classification
//!
//! The gateway only needs to know what kind of statement it is looking at:
//! session control is handled locally, everything else is forwarded verbatim.

use std::sync::OnceLock;

use regex::Regex;

use super::errors::{GatewayError, GatewayResult};
use crate::session::Target;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    /// `show vitess_tablets`
    ShowTablets,
    /// `use <target>`
    Use(Target),
    /// `begin` / `start transaction`
    Begin,
    Commit,
    Rollback,
    /// Forwarded to a tablet
    Query { write: bool },
}

fn use_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^use\s+(\S+)$").expect("valid use pattern"))
}

fn show_tablets_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^show\s+vitess_tablets$").expect("valid show pattern")
    })
}

/// Classify one statement. Trailing semicolons and whitespace are ignored.
pub fn classify(sql: &str) -> GatewayResult<Classified> {
    let trimmed = sql.trim().trim_end_matches(';').trim();
    let lower = trimmed.to_ascii_lowercase();
    let first = lower.split_whitespace().next().unwrap_or_default();

    if show_tablets_re().is_match(trimmed) {
        return Ok(Classified::ShowTablets);
    }
    if let Some(caps) = use_re().captures(trimmed) {
        return Ok(Classified::Use(caps[1].parse()?));
    }

    match first {
        "begin" if lower == "begin" || lower == "begin work" => Ok(Classified::Begin),
        "start" if lower.split_whitespace().eq(["start", "transaction"]) => {
            Ok(Classified::Begin)
        }
        "commit" if lower == "commit" || lower == "commit work" => Ok(Classified::Commit),
        "rollback" if lower == "rollback" || lower == "rollback work" => Ok(Classified::Rollback),
        "select" => Ok(Classified::Query { write: false }),
        "insert" | "update" | "delete" => Ok(Classified::Query { write: true }),
        _ => Err(GatewayError::UnsupportedStatement(trimmed.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::TabletType;

    #[test]
    fn test_session_control() {
        assert_eq!(classify("begin").unwrap(), Classified::Begin);
        assert_eq!(classify("START  TRANSACTION;").unwrap(), Classified::Begin);
        assert_eq!(classify("commit").unwrap(), Classified::Commit);
        assert_eq!(classify(" rollback ; ").unwrap(), Classified::Rollback);
    }

    #[test]
    fn test_use() {
        assert_eq!(
            classify("use @replica").unwrap(),
            Classified::Use(Target::role(TabletType::Replica))
        );
        assert_eq!(
            classify("USE @master").unwrap(),
            Classified::Use(Target::role(TabletType::Primary))
        );
        assert!(matches!(
            classify("use commerce@replica").unwrap(),
            Classified::Use(Target { keyspace: Some(_), role: TabletType::Replica })
        ));
        assert!(classify("use @rdonly").is_err());
    }

    #[test]
    fn test_show_tablets() {
        assert_eq!(classify("show vitess_tablets").unwrap(), Classified::ShowTablets);
        assert_eq!(classify("SHOW VITESS_TABLETS;").unwrap(), Classified::ShowTablets);
    }

    #[test]
    fn test_queries() {
        assert_eq!(
            classify("select id from customer").unwrap(),
            Classified::Query { write: false }
        );
        for sql in [
            "insert into customer(id) values(1)",
            "update customer set email = 'a' where id = 1",
            "DELETE FROM customer WHERE id = 1",
        ] {
            assert_eq!(classify(sql).unwrap(), Classified::Query { write: true });
        }
    }

    #[test]
    fn test_unsupported() {
        assert!(matches!(
            classify("drop table customer"),
            Err(GatewayError::UnsupportedStatement(_))
        ));
        assert!(classify("").is_err());
        assert!(classify("begin something").is_err());
    }
}
