//! Join resolution
//!
//! Lets the events entity pull in session fields without re-deriving
//! them: the compiled session select becomes the right side of a left
//! join keyed on session id.

use crate::compile::{select_from_sessions, CompiledQuery, RequestedField};
use crate::error::{Result, SessionsError};
use crate::expr::{Expr, ScalarFunc};
use crate::modifiers::QueryModifiers;

/// A left-join fragment wrapping a compiled session select
#[derive(Debug, Clone, PartialEq)]
pub struct JoinFragment {
    pub join_type: &'static str,
    /// Alias the joined select is visible under
    pub alias: String,
    /// The compiled session select forming the right side
    pub table: CompiledQuery,
    /// Equality between the source entity's session id attribute and the
    /// compiled select's session id column
    pub constraint: Expr,
}

/// Resolve a join from the events entity onto the sessions table
///
/// A join that selects nothing is a caller error, reported as a
/// resolution failure rather than silently elided.
pub fn join_events_to_sessions(
    fields_accessed: &[RequestedField],
    from_table: &str,
    to_table: &str,
    row_filter: Option<Expr>,
    modifiers: &QueryModifiers,
) -> Result<JoinFragment> {
    if fields_accessed.is_empty() {
        return Err(SessionsError::Resolution(
            "no fields requested from events".to_string(),
        ));
    }

    let table = select_from_sessions(fields_accessed, row_filter, modifiers);

    Ok(JoinFragment {
        join_type: "LEFT JOIN",
        alias: to_table.to_string(),
        table,
        constraint: Expr::call(
            ScalarFunc::Equals,
            vec![
                Expr::column([from_table, "$session_id"]),
                Expr::column([to_table, "session_id"]),
            ],
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::requested;

    #[test]
    fn test_empty_field_set_is_an_error() {
        let result = join_events_to_sessions(&[], "events", "sessions", None, &Default::default());
        let err = result.expect_err("empty join must fail");
        assert!(matches!(err, SessionsError::Resolution(_)));
        assert!(err.to_string().contains("no fields requested"));
    }

    #[test]
    fn test_single_field_join() {
        let fragment = join_events_to_sessions(
            &[requested("$channel_type")],
            "events",
            "events__session",
            None,
            &Default::default(),
        )
        .expect("join resolves");

        assert_eq!(fragment.join_type, "LEFT JOIN");
        assert_eq!(fragment.alias, "events__session");
        assert_eq!(
            fragment.constraint,
            Expr::call(
                ScalarFunc::Equals,
                vec![
                    Expr::column(["events", "$session_id"]),
                    Expr::column(["events__session", "session_id"]),
                ],
            )
        );
    }

    #[test]
    fn test_joined_select_carries_requested_field() {
        let fragment = join_events_to_sessions(
            &[requested("$is_bounce")],
            "events",
            "s",
            None,
            &Default::default(),
        )
        .expect("join resolves");

        let aliases: Vec<&str> = fragment
            .table
            .select
            .iter()
            .map(|item| item.alias.as_str())
            .collect();
        assert!(aliases.contains(&"$is_bounce"));
        // the join key is always selectable on the right side
        assert!(aliases.contains(&"session_id"));
    }
}
