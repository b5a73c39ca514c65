//! Splitting SQL scripts into executable statements.
//!
//! Statements end at `;` outside string literals, quoted identifiers,
//! comments and (PostgreSQL) dollar-quoted bodies. Comments are dropped from
//! the output and comment-only fragments produce no statement.

use crate::platform::PlatformKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    SingleQuote,
    DoubleQuote,
    Backtick,
    LineComment,
    BlockComment,
    DollarQuote { tag_start: usize, tag_len: usize },
}

/// Dialect-aware statement splitter
#[derive(Debug, Clone, Copy)]
pub struct StatementSplitter {
    backslash_escapes: bool,
    dollar_quotes: bool,
    hash_comments: bool,
}

impl StatementSplitter {
    pub fn for_platform(kind: PlatformKind) -> Self {
        match kind {
            PlatformKind::Postgres => Self {
                backslash_escapes: false,
                dollar_quotes: true,
                hash_comments: false,
            },
            PlatformKind::MySql => Self {
                backslash_escapes: true,
                dollar_quotes: false,
                hash_comments: true,
            },
            PlatformKind::Oracle => Self {
                backslash_escapes: false,
                dollar_quotes: false,
                hash_comments: false,
            },
        }
    }

    /// Statements of `sql`, trimmed, without their terminating `;`
    pub fn split(&self, sql: &str) -> Vec<String> {
        let bytes = sql.as_bytes();
        let mut statements = Vec::new();
        let mut current: Vec<u8> = Vec::with_capacity(4 * 1024);
        let mut has_content = false;
        let mut state = State::Normal;
        let mut i = 0;

        while i < bytes.len() {
            let b = bytes[i];
            let next = bytes.get(i + 1).copied();

            match state {
                State::Normal => match b {
                    b'-' if next == Some(b'-') => {
                        state = State::LineComment;
                        i += 2;
                        continue;
                    }
                    b'#' if self.hash_comments => {
                        state = State::LineComment;
                        i += 1;
                        continue;
                    }
                    b'/' if next == Some(b'*') => {
                        state = State::BlockComment;
                        i += 2;
                        continue;
                    }
                    b';' => {
                        flush(&mut current, &mut has_content, &mut statements);
                        i += 1;
                        continue;
                    }
                    b'\'' => state = State::SingleQuote,
                    b'"' => state = State::DoubleQuote,
                    b'`' => state = State::Backtick,
                    b'$' if self.dollar_quotes => {
                        if let Some(tag_len) = dollar_tag_len(&bytes[i..]) {
                            current.extend_from_slice(&bytes[i..i + tag_len]);
                            has_content = true;
                            state = State::DollarQuote {
                                tag_start: i,
                                tag_len,
                            };
                            i += tag_len;
                            continue;
                        }
                    }
                    _ => {}
                },
                State::SingleQuote => {
                    if b == b'\\' && self.backslash_escapes {
                        if let Some(escaped) = next {
                            current.push(b);
                            current.push(escaped);
                            i += 2;
                            continue;
                        }
                    } else if b == b'\'' {
                        state = State::Normal;
                    }
                }
                State::DoubleQuote => {
                    if b == b'"' {
                        state = State::Normal;
                    }
                }
                State::Backtick => {
                    if b == b'`' {
                        state = State::Normal;
                    }
                }
                State::LineComment => {
                    if b == b'\n' {
                        state = State::Normal;
                        current.push(b'\n');
                    }
                    i += 1;
                    continue;
                }
                State::BlockComment => {
                    if b == b'*' && next == Some(b'/') {
                        state = State::Normal;
                        current.push(b' ');
                        i += 2;
                    } else {
                        i += 1;
                    }
                    continue;
                }
                State::DollarQuote { tag_start, tag_len } => {
                    let tag = &bytes[tag_start..tag_start + tag_len];
                    if bytes[i..].starts_with(tag) {
                        current.extend_from_slice(tag);
                        state = State::Normal;
                        i += tag_len;
                        continue;
                    }
                }
            }

            if !b.is_ascii_whitespace() {
                has_content = true;
            }
            current.push(b);
            i += 1;
        }

        flush(&mut current, &mut has_content, &mut statements);
        statements
    }
}

fn flush(current: &mut Vec<u8>, has_content: &mut bool, statements: &mut Vec<String>) {
    if *has_content {
        let text = String::from_utf8_lossy(current);
        let text = text.trim();
        if !text.is_empty() {
            statements.push(text.to_string());
        }
    }
    current.clear();
    *has_content = false;
}

/// Length of a `$tag$` opener at the start of `bytes`, tag possibly empty
fn dollar_tag_len(bytes: &[u8]) -> Option<usize> {
    let mut i = 1;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'$' {
            return Some(i + 1);
        }
        let valid = b == b'_' || b.is_ascii_alphabetic() || (i > 1 && b.is_ascii_digit());
        if !valid {
            return None;
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pg(sql: &str) -> Vec<String> {
        StatementSplitter::for_platform(PlatformKind::Postgres).split(sql)
    }

    fn mysql(sql: &str) -> Vec<String> {
        StatementSplitter::for_platform(PlatformKind::MySql).split(sql)
    }

    #[test]
    fn test_basic_split() {
        assert_eq!(
            pg("CREATE TABLE t1 (id INT); INSERT INTO t1 VALUES (1);"),
            vec!["CREATE TABLE t1 (id INT)", "INSERT INTO t1 VALUES (1)"]
        );
    }

    #[test]
    fn test_semicolon_inside_string() {
        assert_eq!(
            pg("INSERT INTO t1 VALUES ('hello; world'), ('it''s; fine');"),
            vec!["INSERT INTO t1 VALUES ('hello; world'), ('it''s; fine')"]
        );
    }

    #[test]
    fn test_mysql_backslash_escape() {
        assert_eq!(
            mysql("INSERT INTO t1 VALUES ('it\\'s; a test'); SELECT 1"),
            vec!["INSERT INTO t1 VALUES ('it\\'s; a test')", "SELECT 1"]
        );
    }

    #[test]
    fn test_postgres_backslash_is_literal() {
        assert_eq!(
            pg("INSERT INTO t VALUES ('C:\\'); SELECT 1;"),
            vec!["INSERT INTO t VALUES ('C:\\')", "SELECT 1"]
        );
    }

    #[test]
    fn test_comments_dropped() {
        let sql = "-- Table: public.users\n-- Rows: 2\nTRUNCATE TABLE t; /* done; */\n-- trailing;\n";
        assert_eq!(pg(sql), vec!["TRUNCATE TABLE t"]);
        assert_eq!(mysql("# note; here\nSELECT 1;"), vec!["SELECT 1"]);
    }

    #[test]
    fn test_dollar_quoted_body() {
        let sql = "CREATE FUNCTION f() RETURNS int AS $body$ SELECT 1; $body$ LANGUAGE sql; SELECT 2;";
        let statements = pg(sql);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].contains("SELECT 1; $body$"));
        assert_eq!(statements[1], "SELECT 2");
    }

    #[test]
    fn test_quoted_identifiers() {
        assert_eq!(
            mysql("SELECT `a;b` FROM t; SELECT \"x;y\";"),
            vec!["SELECT `a;b` FROM t", "SELECT \"x;y\""]
        );
    }
}
