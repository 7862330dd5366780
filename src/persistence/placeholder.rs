//! Placeholder-dialect neutrality (spec.md §4.3).
//!
//! Every repository method in this crate is written once, against the
//! simpler `?` placeholder dialect SQLite speaks natively. Before a
//! statement is dispatched against the richer backend it is rewritten here:
//! `?` becomes `$1, $2, …` in left-to-right order, matching the observed
//! behaviour in `original_source`'s `database.py::_convert_placeholders`.
//! `?` characters inside single-quoted string literals are left alone.

/// Rewrites every `?` placeholder in `sql` to `$1`, `$2`, … for Postgres.
/// A no-op pass-through is used for SQLite (see `Db::rewrite`).
pub fn to_postgres(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut in_string = false;
    let mut next_index = 1;
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_string = !in_string;
                out.push(c);
            }
            '?' if !in_string => {
                out.push('$');
                out.push_str(&next_index.to_string());
                next_index += 1;
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rewrites_positional_placeholders_in_order() {
        let sql = "UPDATE players SET credits = ? WHERE id = ?";
        assert_eq!(
            to_postgres(sql),
            "UPDATE players SET credits = $1 WHERE id = $2"
        );
    }

    #[test]
    fn ignores_question_marks_inside_string_literals() {
        let sql = "SELECT * FROM containers WHERE message = 'what?' AND id = ?";
        assert_eq!(
            to_postgres(sql),
            "SELECT * FROM containers WHERE message = 'what?' AND id = $1"
        );
    }

    #[test]
    fn no_placeholders_is_unchanged() {
        let sql = "SELECT 1";
        assert_eq!(to_postgres(sql), "SELECT 1");
    }
}
