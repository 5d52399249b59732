//! Lookup query construction
//!
//! A name filter matches files whose name contains the given string literally. A tag
//! filter matches files carrying every requested tag. Both filters combine with AND; a
//! request without filters matches every file.

use sqlx::{Postgres, QueryBuilder};
use stowage_core::models::FileRequest;

/// Escape `LIKE` metacharacters so `input` matches literally
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Build the lookup query for `request`, selecting `f.file_name`
pub fn build_query(request: &FileRequest) -> QueryBuilder<'static, Postgres> {
    let tags = request.tag_filter();
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT f.file_name FROM files f");

    if !tags.is_empty() {
        query.push(" JOIN file_tags ft ON ft.file_id = f.id JOIN tags t ON t.id = ft.tag_id");
    }

    let mut clause = " WHERE ";
    if let Some(name) = request.name_filter() {
        query.push(clause);
        query.push("f.file_name LIKE '%' || ");
        query.push_bind(escape_like(name));
        query.push(r" || '%' ESCAPE '\'");
        clause = " AND ";
    }

    if !tags.is_empty() {
        let required = tags.len() as i64;
        query.push(clause);
        query.push("t.name = ANY(");
        query.push_bind(tags);
        query.push(")");
        query.push(" GROUP BY f.id HAVING COUNT(DISTINCT t.id) = ");
        query.push_bind(required);
    }

    query.push(" ORDER BY f.created_at, f.id");
    query
}
