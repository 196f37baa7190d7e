//! Account identity: a 12-digit account id plus an optional human alias.
//!
//! Grounded on `original_source/iamy/models.go`'s `Account` type and
//! `NewAccountFromString`/`String()` — the regex and rendering rule are
//! carried over exactly; panics on malformed input become a typed error,
//! per the panic-to-assertion guidance in spec.md §7.

use std::fmt;

use regex::Regex;
use std::sync::OnceLock;

#[derive(thiserror::Error, Debug)]
pub enum AccountError {
    #[error("'{0}' is not a valid account label (expected e.g. '123456789012' or 'alias-123456789012')")]
    InvalidLabel(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Account {
    pub id: String,
    pub alias: Option<String>,
}

fn account_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:([A-Za-z0-9_-]+)-)?(\d+)$").expect("static regex"))
}

impl Account {
    pub fn new(id: impl Into<String>, alias: Option<String>) -> Self {
        Account {
            id: id.into(),
            alias,
        }
    }

    /// Parses either `<alias>-<id>` or bare `<id>`.
    pub fn parse(label: &str) -> Result<Self, AccountError> {
        let captures = account_regex()
            .captures(label)
            .ok_or_else(|| AccountError::InvalidLabel(label.to_string()))?;

        let id = captures
            .get(2)
            .ok_or_else(|| AccountError::InvalidLabel(label.to_string()))?
            .as_str()
            .to_string();
        let alias = captures.get(1).map(|m| m.as_str().to_string());

        Ok(Account { id, alias })
    }

    /// The account's ARN-qualifying id; every ARN this crate constructs
    /// embeds this value.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) if !alias.is_empty() => write!(f, "{alias}-{}", self.id),
            _ => write!(f, "{}", self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_id() {
        let acct = Account::parse("123456789012").unwrap();
        assert_eq!(acct.id, "123456789012");
        assert_eq!(acct.alias, None);
    }

    #[test]
    fn parses_aliased_id() {
        let acct = Account::parse("prod-123456789012").unwrap();
        assert_eq!(acct.id, "123456789012");
        assert_eq!(acct.alias.as_deref(), Some("prod"));
    }

    #[test]
    fn rejects_invalid_labels() {
        assert!(Account::parse("not-an-account").is_err());
        assert!(Account::parse("").is_err());
    }

    #[test]
    fn renders_aliased_form() {
        let acct = Account::new("123456789012", Some("prod".to_string()));
        assert_eq!(acct.to_string(), "prod-123456789012");
    }

    #[test]
    fn renders_bare_form_when_alias_absent() {
        let acct = Account::new("123456789012", None);
        assert_eq!(acct.to_string(), "123456789012");
    }

    #[test]
    fn round_trips_through_parse_and_display() {
        for label in ["123456789012", "my-alias-123456789012"] {
            let acct = Account::parse(label).unwrap();
            assert_eq!(acct.to_string(), label);
        }
    }
}
