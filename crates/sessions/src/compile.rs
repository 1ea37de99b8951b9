//! Session query compilation
//!
//! Turns a set of requested logical fields into one grouped aggregate
//! select over the physical sessions table. Every known logical field
//! resolves to its aggregate expression; unknown names pass through as raw
//! column references (and join the grouping key), so schema drift in
//! either direction degrades to a passthrough rather than an error.

use crate::aggregates::{aggregate_fields, SESSIONS_TABLE};
use crate::expr::{ChainSegment, Expr};
use crate::modifiers::QueryModifiers;

/// One aliased select expression
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub alias: String,
    pub expr: Expr,
}

/// A compiled grouped select over the sessions table
///
/// Consumable by a downstream SQL rendering layer. The grouping key always
/// contains the session id column, and every non-aggregated select item's
/// column chain is also present in the grouping key, so the query yields
/// exactly one row per session id that has a physical row inside the
/// filter window.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub select: Vec<SelectItem>,
    pub group_by: Vec<Expr>,
    pub from_table: &'static str,
    pub where_filter: Option<Expr>,
}

/// A requested logical field: exposed name plus its access chain
pub type RequestedField = (String, Vec<ChainSegment>);

/// Build a requested-field pair from a plain column name
pub fn requested(name: &str) -> RequestedField {
    (name.to_string(), vec![ChainSegment::from(name)])
}

/// Compile a grouped select for the requested logical fields
///
/// `row_filter` is produced by an external collaborator that bounds the
/// scan to a time window over the session's minimum-timestamp column; it
/// is attached unmodified, never rewritten.
pub fn select_from_sessions(
    requested_fields: &[RequestedField],
    row_filter: Option<Expr>,
    modifiers: &QueryModifiers,
) -> CompiledQuery {
    let aggregates = aggregate_fields(modifiers);

    // session_id is the key used for further joins; always retrievable
    // even when the caller did not ask for it
    let session_id_requested = requested_fields.iter().any(|(name, _)| name == "session_id");
    let mut all_fields: Vec<&RequestedField> = requested_fields.iter().collect();
    let session_id_field = requested("session_id");
    if !session_id_requested {
        all_fields.push(&session_id_field);
    }

    let mut select = Vec::with_capacity(all_fields.len());
    let mut group_by = vec![Expr::column([SESSIONS_TABLE, "session_id"])];

    for (name, chain) in all_fields {
        if let Some(expr) = aggregates.get(name) {
            select.push(SelectItem {
                alias: name.clone(),
                expr: expr.clone(),
            });
        } else {
            // raw passthrough: must be grouped on to keep the select valid
            let mut qualified = Vec::with_capacity(chain.len() + 1);
            qualified.push(ChainSegment::from(SESSIONS_TABLE));
            qualified.extend(chain.iter().cloned());
            let column = Expr::column_chain(qualified);
            select.push(SelectItem {
                alias: name.clone(),
                expr: column.clone(),
            });
            if !group_by.contains(&column) {
                group_by.push(column);
            }
        }
    }

    tracing::debug!(
        fields = select.len(),
        group_by = group_by.len(),
        "compiled sessions select"
    );

    CompiledQuery {
        select,
        group_by,
        from_table: SESSIONS_TABLE,
        where_filter: row_filter,
    }
}
