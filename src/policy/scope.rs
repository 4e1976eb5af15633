//! Visibility scopes: declarative row predicates returned with an ALLOW.
//!
//! A scope never touches storage. The Postgres store renders it to a WHERE
//! clause (see `filter::filter_where`), the memory store evaluates it against
//! JSON rows with [`Scope::matches`].

use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Row columns a predicate may constrain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Id,
    Name,
    Email,
    StudentId,
    TeacherId,
    CreatedBy,
}

impl Field {
    pub fn column(&self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Name => "name",
            Field::Email => "email",
            Field::StudentId => "student_id",
            Field::TeacherId => "teacher_id",
            Field::CreatedBy => "created_by",
        }
    }
}

/// Comparison value for an equality predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Key {
    Id(Uuid),
    Text(String),
}

impl Key {
    fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Key::Id(id), Value::String(s)) => Uuid::parse_str(s).map(|v| v == *id).unwrap_or(false),
            (Key::Text(t), Value::String(s)) => t == s,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    Eq { field: Field, value: Key },
    In { field: Field, values: Vec<Uuid> },
}

impl Predicate {
    pub fn eq_id(field: Field, id: Uuid) -> Self {
        Predicate::Eq { field, value: Key::Id(id) }
    }

    pub fn eq_text(field: Field, text: impl Into<String>) -> Self {
        Predicate::Eq { field, value: Key::Text(text.into()) }
    }

    pub fn field(&self) -> Field {
        match self {
            Predicate::Eq { field, .. } | Predicate::In { field, .. } => *field,
        }
    }

    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        let value = row.get(self.field().column()).unwrap_or(&Value::Null);
        match self {
            Predicate::Eq { value: key, .. } => key.matches(value),
            Predicate::In { values, .. } => values.iter().any(|id| Key::Id(*id).matches(value)),
        }
    }
}

/// Which rows of a table the actor may see
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rows", rename_all = "snake_case")]
pub enum Scope {
    All,
    /// No rows at all. Not a denial: a parent without children gets an empty list.
    Nothing,
    Where { predicate: Predicate },
}

impl Scope {
    pub fn only(predicate: Predicate) -> Self {
        Scope::Where { predicate }
    }

    /// Rows whose `field` is one of `ids`; an empty set collapses to `Nothing`
    pub fn any_of(field: Field, ids: Vec<Uuid>) -> Self {
        if ids.is_empty() {
            Scope::Nothing
        } else {
            Scope::only(Predicate::In { field, values: ids })
        }
    }

    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        match self {
            Scope::All => true,
            Scope::Nothing => false,
            Scope::Where { predicate } => predicate.matches(row),
        }
    }

    /// Same as [`Scope::matches`] for a typed record
    pub fn admits<T: Serialize>(&self, record: &T) -> bool {
        match serde_json::to_value(record) {
            Ok(Value::Object(row)) => self.matches(&row),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn in_predicate_matches_any_listed_id() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let scope = Scope::any_of(Field::StudentId, vec![a, b]);

        assert!(scope.matches(&row(json!({ "student_id": b.to_string() }))));
        assert!(!scope.matches(&row(json!({ "student_id": Uuid::new_v4().to_string() }))));
        assert!(!scope.matches(&row(json!({ "student_id": null }))));
    }

    #[test]
    fn empty_id_set_is_nothing() {
        assert_eq!(Scope::any_of(Field::StudentId, vec![]), Scope::Nothing);
        assert!(!Scope::Nothing.matches(&row(json!({ "id": "x" }))));
    }

    #[test]
    fn text_keys_compare_exactly() {
        let scope = Scope::only(Predicate::eq_text(Field::Name, "Ada Obi"));
        assert!(scope.matches(&row(json!({ "name": "Ada Obi" }))));
        assert!(!scope.matches(&row(json!({ "name": "ada obi" }))));
    }
}
