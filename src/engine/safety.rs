//! Gatekeeper for SQL text we didn't write ourselves.
//!
//! This is a lexical filter, not a parser: it knows where strings and comments are, and
//! otherwise looks at words and semicolons. It protects against a text generator that produces
//! destructive or multi-statement output. It is no protection against injection through literal
//! values.
use thiserror::Error;

mod lexer;

const FORBIDDEN_KEYWORDS: [&str; 11] = [
    "drop", "truncate", "delete", "alter", "update", "insert", "create", "exec", "execute", "sp_",
    "xp_",
];

/// Keywords that commonly start column names too: `update_time`, `create_date`.
const COLUMN_PREFIX_KEYWORDS: [&str; 2] = ["update", "create"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectionReason {
    #[error("the query is empty")]
    Empty,
    #[error("the query must start with SELECT, found '{0}'")]
    NotASelect(String),
    #[error("the query contains the forbidden keyword '{0}'")]
    ForbiddenKeyword(&'static str),
    #[error("the query contains {0} statements, only one is allowed")]
    MultipleStatements(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Rejected generated query, {reason}:\n{sql}")]
pub struct UnsafeQueryRejected {
    pub sql: String,
    pub reason: RejectionReason,
}

pub fn validate(sql: &str) -> bool {
    scan(sql).is_ok()
}

/// Runs all checks in order and reports the first one that fails.
pub fn scan(sql: &str) -> Result<(), RejectionReason> {
    let verdict = run_checks(sql);

    if let Err(reason) = &verdict {
        log::debug!("scanner rejected query: {reason}");
    }

    verdict
}

/// Like [scan], but keeps the text around in the error.
pub fn ensure_safe(sql: &str) -> Result<(), UnsafeQueryRejected> {
    scan(sql).map_err(|reason| UnsafeQueryRejected {
        sql: sql.to_string(),
        reason,
    })
}

fn run_checks(sql: &str) -> Result<(), RejectionReason> {
    if sql.trim().is_empty() {
        return Err(RejectionReason::Empty);
    }

    match lexer::first_token(sql) {
        Some(token) if token.eq_ignore_ascii_case("select") => {}
        other => return Err(RejectionReason::NotASelect(other.unwrap_or_default().to_string())),
    }

    let code = lexer::code_mask(sql);

    if let Some(keyword) = find_forbidden_keyword(sql, &code) {
        return Err(RejectionReason::ForbiddenKeyword(keyword));
    }

    let statements = sql
        .bytes()
        .zip(&code)
        .filter(|(byte, is_code)| **is_code && *byte == b';')
        .count();
    if statements > 1 {
        return Err(RejectionReason::MultipleStatements(statements));
    }

    Ok(())
}

fn find_forbidden_keyword(sql: &str, code: &[bool]) -> Option<&'static str> {
    // ASCII lowercasing keeps byte offsets intact.
    let lowercase = sql.to_ascii_lowercase();
    let bytes = lowercase.as_bytes();

    FORBIDDEN_KEYWORDS.into_iter().find(|keyword| {
        lowercase
            .match_indices(keyword)
            .any(|(start, _)| code[start] && is_whole_word(bytes, start, keyword))
    })
}

/// Every keyword, `sp_` and `xp_` included, needs a boundary on both sides.
fn is_whole_word(bytes: &[u8], start: usize, keyword: &str) -> bool {
    let end = start + keyword.len();

    let left_bounded = match start.checked_sub(1).map(|before| bytes[before]) {
        None => true,
        Some(before) => !is_word_byte(before),
    };
    if !left_bounded {
        return false;
    }

    match bytes.get(end) {
        None => true,
        Some(b'_') if COLUMN_PREFIX_KEYWORDS.iter().any(|prefix| *prefix == keyword) => false,
        Some(after) => !is_word_byte(*after),
    }
}

/// Bytes of multibyte characters count as letters.
fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || !byte.is_ascii()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_selects() {
        assert_eq!(scan("SELECT * FROM t"), Ok(()));
        assert_eq!(scan("select id from t;"), Ok(()));
        assert_eq!(scan("  SeLeCt(1)"), Ok(()));
        assert_eq!(scan("(SELECT a FROM t) UNION (SELECT a FROM u)"), Ok(()));
        assert!(validate("SELECT 1;"));
    }

    #[test]
    fn forbidden_words_inside_strings_are_fine() {
        assert!(validate("SELECT * FROM t WHERE name = 'DROP TABLE'"));
        assert!(validate("SELECT \"delete\" FROM t"));
    }

    #[test]
    fn forbidden_words_inside_comments_are_fine() {
        assert!(validate("-- DELETE FROM x\nSELECT 1"));
        assert!(validate("/* drop it */ SELECT 1 /* ; ; */"));
        assert!(validate("SELECT 1 -- ; truncate"));
    }

    #[test]
    fn rejects_other_statements() {
        assert_eq!(
            scan("UPDATE t SET x=1"),
            Err(RejectionReason::NotASelect("UPDATE".into()))
        );
        assert_eq!(scan("   \n"), Err(RejectionReason::Empty));
        assert_eq!(scan(""), Err(RejectionReason::Empty));
        assert_eq!(
            scan("-- just a comment"),
            Err(RejectionReason::NotASelect("".into()))
        );
        assert_eq!(
            scan("WITH x AS (SELECT 1) SELECT * FROM x"),
            Err(RejectionReason::NotASelect("WITH".into()))
        );
    }

    #[test]
    fn rejects_forbidden_keywords() {
        assert_eq!(
            scan("SELECT 1; DROP TABLE t"),
            Err(RejectionReason::ForbiddenKeyword("drop"))
        );
        assert_eq!(
            scan("SELECT * FROM t WHERE x IN (SELECT 1) OR EXEC('x')"),
            Err(RejectionReason::ForbiddenKeyword("exec"))
        );
        assert_eq!(
            scan("SELECT 1; EXEC xp_cmdshell 'dir'"),
            Err(RejectionReason::ForbiddenKeyword("exec"))
        );
        assert_eq!(
            scan("SELECT * FROM t WHERE xp_ (1) = 1"),
            Err(RejectionReason::ForbiddenKeyword("xp_"))
        );
        assert_eq!(
            scan("SELECT sp_, a FROM t"),
            Err(RejectionReason::ForbiddenKeyword("sp_"))
        );
    }

    #[test]
    fn keywords_inside_identifiers_are_fine() {
        assert!(validate("SELECT deleted_at, dropped, created FROM t"));
        assert!(validate("SELECT update_time, create_date FROM t"));
        assert!(validate("SELECT wasp_count, my_xp_total FROM t"));
        assert!(validate("SELECT sp_total, xp_count FROM t"));
        assert!(validate("SELECT executed FROM t"));
    }

    #[test]
    fn the_column_exception_is_per_occurrence() {
        assert_eq!(
            scan("SELECT update_time FROM t WHERE 1 = 1 UPDATE t"),
            Err(RejectionReason::ForbiddenKeyword("update"))
        );
        // only update and create get the exception
        assert_eq!(
            scan("SELECT drop_reason FROM t"),
            Err(RejectionReason::ForbiddenKeyword("drop"))
        );
    }

    #[test]
    fn rejects_multiple_statements() {
        assert_eq!(
            scan("SELECT 1; SELECT 2;"),
            Err(RejectionReason::MultipleStatements(2))
        );
        assert!(validate("SELECT ';;' FROM t;"));
    }

    #[test]
    fn rejections_keep_the_text() {
        let error = ensure_safe("DELETE FROM t").unwrap_err();

        assert_eq!(error.sql, "DELETE FROM t");
        assert_eq!(error.reason, RejectionReason::NotASelect("DELETE".into()));
        assert!(error.to_string().contains("must start with SELECT"));
    }
}
