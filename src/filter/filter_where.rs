use super::types::SqlParam;
use crate::policy::{Key, Predicate, Scope};

/// Renders a visibility [`Scope`] as a parameterised WHERE clause
pub struct FilterWhere {
    param_values: Vec<SqlParam>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    pub fn generate(scope: &Scope, starting_param_index: usize) -> (String, Vec<SqlParam>) {
        let mut filter_where = Self::new(starting_param_index);
        let clause = filter_where.build(scope);
        (clause, filter_where.param_values)
    }

    fn build(&mut self, scope: &Scope) -> String {
        match scope {
            Scope::All => "1=1".to_string(),
            Scope::Nothing => "1=0".to_string(),
            Scope::Where { predicate } => self.build_predicate(predicate),
        }
    }

    fn build_predicate(&mut self, predicate: &Predicate) -> String {
        let quoted_column = format!("\"{}\"", predicate.field().column());
        match predicate {
            Predicate::Eq { value: Key::Id(id), .. } => {
                format!("{} = {}", quoted_column, self.param(SqlParam::Uuid(*id)))
            }
            Predicate::Eq { value: Key::Text(text), .. } => {
                format!("{} = {}", quoted_column, self.param(SqlParam::Text(text.clone())))
            }
            Predicate::In { values, .. } => {
                if values.is_empty() {
                    return "1=0".to_string();
                }
                format!("{} = ANY({})", quoted_column, self.param(SqlParam::Uuids(values.clone())))
            }
        }
    }

    fn param(&mut self, value: SqlParam) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}
