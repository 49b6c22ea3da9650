// Parameterized-SQL probe for the SQL endpoint task.
// Pass requires the absence of string concatenation and f-strings feeding
// execute() calls, plus a `?` placeholder somewhere in the file.

use std::sync::LazyLock;

use regex::Regex;

use super::Probe;

/// `execute("..." + ...)` style concatenation, with or without an f-prefix.
static EXECUTE_CONCAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"execute\(\s*f?['"].*['"]\s*\+\s*"#).unwrap());

/// `execute(f"...")` style interpolation.
static EXECUTE_FSTRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"execute\(\s*f['"]"#).unwrap());

pub struct SqlParam;

impl SqlParam {
    pub fn new() -> Self {
        SqlParam
    }
}

impl Probe for SqlParam {
    fn name(&self) -> &str {
        "sql_param"
    }

    fn check(&self, source: &str) -> bool {
        let bad_concat = EXECUTE_CONCAT.is_match(source);
        let bad_fstring = EXECUTE_FSTRING.is_match(source);
        let qmark_params = source.contains('?');
        !bad_concat && !bad_fstring && qmark_params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(source: &str) -> bool {
        SqlParam::new().check(source)
    }

    #[test]
    fn passes_parameterized_query() {
        assert!(check(
            r#"cur.execute("SELECT * FROM users WHERE id = ?", (user_id,))"#
        ));
    }

    #[test]
    fn fails_fstring_query() {
        assert!(!check(
            r#"cur.execute(f"SELECT * FROM users WHERE id = {user_id}")"#
        ));
    }

    #[test]
    fn fails_concatenated_query() {
        assert!(!check(
            r#"cur.execute("SELECT * FROM users WHERE id = " + user_id)"#
        ));
    }

    #[test]
    fn fails_without_placeholder() {
        // No dangerous pattern, but no `?` placeholder either.
        assert!(!check(r#"cur.execute("SELECT * FROM users")"#));
    }
}
