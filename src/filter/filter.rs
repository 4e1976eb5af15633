use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterData, FilterOrderInfo, SqlResult};
use crate::database::Table;
use crate::policy::Scope;

/// A scoped, ordered and limited list query over one table
#[derive(Debug, Clone)]
pub struct Filter {
    table: Table,
    scope: Scope,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Filter {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            scope: Scope::All,
            order_data: vec![],
            limit: None,
            offset: None,
        }
    }

    pub fn table(&self) -> Table {
        self.table
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn limit_value(&self) -> Option<i64> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<i64> {
        self.offset
    }

    /// Explicit ordering, or the default when none was given
    pub fn order_info(&self) -> Vec<FilterOrderInfo> {
        if self.order_data.is_empty() {
            FilterOrder::default_order()
        } else {
            self.order_data.clone()
        }
    }

    pub fn explicit_order(&self) -> &[FilterOrderInfo] {
        &self.order_data
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Applies caller-supplied list options; limits above `max_limit` are capped
    pub fn assign(mut self, data: FilterData, max_limit: i64) -> Result<Self, FilterError> {
        if let Some(order) = data.order.as_deref() {
            self.order_data = FilterOrder::validate_and_parse(self.table, order)?;
        }
        match data.limit {
            Some(limit) => self.set_limit(limit, data.offset, max_limit)?,
            None => self.set_limit(max_limit, data.offset, max_limit)?,
        }
        Ok(self)
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit.max(0));
        self
    }

    fn set_limit(&mut self, limit: i64, offset: Option<i64>, max_limit: i64) -> Result<(), FilterError> {
        if limit < 0 {
            return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string()));
        }
        if let Some(off) = offset {
            if off < 0 {
                return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string()));
            }
        }
        let applied_limit = if limit > max_limit {
            tracing::debug!("Limit {} exceeds max {}, capping to max", limit, max_limit);
            max_limit
        } else {
            limit
        };
        self.limit = Some(applied_limit);
        self.offset = offset;
        Ok(())
    }

    pub fn to_sql(&self) -> SqlResult {
        let (where_clause, params) = FilterWhere::generate(&self.scope, 0);
        let order_clause = FilterOrder::generate(&self.order_info());
        let limit_clause = self.build_limit_clause();

        let query = [
            "SELECT *".to_string(),
            format!("FROM \"{}\"", self.table.name()),
            format!("WHERE {}", where_clause),
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        SqlResult { query, params }
    }

    pub fn to_count_sql(&self) -> SqlResult {
        let (where_clause, params) = FilterWhere::generate(&self.scope, 0);
        SqlResult {
            query: format!("SELECT COUNT(*) AS count FROM \"{}\" WHERE {}", self.table.name(), where_clause),
            params,
        }
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("OFFSET {}", o),
            (None, None) => String::new(),
        }
    }
}
