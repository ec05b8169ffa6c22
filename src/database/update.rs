//! Partial-update SQL assembly with per-field presence tracking.
//!
//! Update payloads carry `Option` fields; only fields the caller actually
//! supplied become `SET` clauses. Values are always bound, never interpolated.

use sqlx::{Postgres, QueryBuilder};

pub struct UpdateBuilder {
    qb: QueryBuilder<'static, Postgres>,
    has_set: bool,
}

impl UpdateBuilder {
    pub fn new(table: &str) -> Self {
        Self { qb: QueryBuilder::new(format!("UPDATE {} SET ", table)), has_set: false }
    }

    /// Whether any field has been set so far
    pub fn is_empty(&self) -> bool {
        !self.has_set
    }

    fn sep(&mut self) {
        if self.has_set {
            self.qb.push(", ");
        }
        self.has_set = true;
    }

    /// `column = <bound value>`
    pub fn set<T>(&mut self, column: &str, value: T) -> &mut Self
    where
        T: 'static + Send + sqlx::Encode<'static, Postgres> + sqlx::Type<Postgres>,
    {
        self.sep();
        self.qb.push(column).push(" = ").push_bind(value);
        self
    }

    /// Set the column only when the caller supplied a value
    pub fn set_if<T>(&mut self, column: &str, value: Option<T>) -> &mut Self
    where
        T: 'static + Send + sqlx::Encode<'static, Postgres> + sqlx::Type<Postgres>,
    {
        if let Some(value) = value {
            self.set(column, value);
        }
        self
    }

    /// Verbatim SQL fragment, for non-bindable sets such as
    /// `updated_at = CURRENT_TIMESTAMP`. Never pass user input here.
    pub fn set_raw(&mut self, fragment: &str) -> &mut Self {
        self.sep();
        self.qb.push(fragment);
        self
    }

    /// Close with `WHERE id = <id> RETURNING <columns>` and hand back the
    /// underlying query builder for execution
    pub fn where_id(mut self, id: i32, returning: &str) -> QueryBuilder<'static, Postgres> {
        self.qb.push(" WHERE id = ").push_bind(id);
        self.qb.push(" RETURNING ").push(returning);
        self.qb
    }

    /// Like [`where_id`](Self::where_id) but matches only rows still marked
    /// active, so the update doubles as a compare-and-swap against a
    /// concurrent deactivation. Callers must treat zero rows as a conflict.
    pub fn where_active_id(mut self, id: i32, returning: &str) -> QueryBuilder<'static, Postgres> {
        self.qb.push(" WHERE id = ").push_bind(id);
        self.qb.push(" AND is_active = true");
        self.qb.push(" RETURNING ").push(returning);
        self.qb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_present_fields_become_set_clauses() {
        let mut b = UpdateBuilder::new("employee_documents");
        b.set_if("description", Some("updated".to_string()));
        b.set_if::<String>("expiry_date", None);
        b.set_raw("updated_at = CURRENT_TIMESTAMP");
        let qb = b.where_id(5, "id");
        let sql = qb.sql();
        assert!(sql.contains("description = $1"));
        assert!(!sql.contains("expiry_date"));
        assert!(sql.contains("updated_at = CURRENT_TIMESTAMP"));
        assert!(sql.contains("WHERE id = $2"));
        assert!(sql.ends_with("RETURNING id"));
    }

    #[test]
    fn tracks_emptiness() {
        let mut b = UpdateBuilder::new("users");
        assert!(b.is_empty());
        b.set("full_name", "x".to_string());
        assert!(!b.is_empty());
    }

    #[test]
    fn active_guard_is_appended_before_returning() {
        let mut b = UpdateBuilder::new("employee_documents");
        b.set("file_name", "replacement.pdf".to_string());
        let qb = b.where_active_id(7, "*");
        let sql = qb.sql();
        assert!(sql.contains("WHERE id = $2 AND is_active = true"));
        assert!(sql.ends_with("RETURNING *"));
    }

    #[test]
    fn clauses_are_comma_separated() {
        let mut b = UpdateBuilder::new("users");
        b.set("full_name", "a".to_string());
        b.set("email", "b".to_string());
        let sql_owner = b.where_id(1, "*");
        let sql = sql_owner.sql();
        assert!(sql.contains("full_name = $1, email = $2"));
    }
}
