use super::error::FilterError;
use super::types::{FilterOrderInfo, SortDirection};
use crate::database::Table;

pub struct FilterOrder;

impl FilterOrder {
    /// Ordering applied when the caller gives none: oldest first
    pub fn default_order() -> Vec<FilterOrderInfo> {
        vec![
            FilterOrderInfo { column: "created_at", sort: SortDirection::Asc },
            FilterOrderInfo { column: "id", sort: SortDirection::Asc },
        ]
    }

    /// Parses "name desc, created_at" against the table's columns
    pub fn validate_and_parse(table: Table, order: &str) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let mut out = Vec::new();
        for part in order.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut it = trimmed.split_whitespace();
            let Some(col) = it.next() else { continue };
            let column = Self::column(table, col)?;
            let sort = match it.next() {
                None => SortDirection::Asc,
                Some(dir) if dir.eq_ignore_ascii_case("asc") => SortDirection::Asc,
                Some(dir) if dir.eq_ignore_ascii_case("desc") => SortDirection::Desc,
                Some(dir) => return Err(FilterError::InvalidOrder(format!("unknown direction '{}'", dir))),
            };
            if it.next().is_some() {
                return Err(FilterError::InvalidOrder(trimmed.to_string()));
            }
            out.push(FilterOrderInfo { column, sort });
        }
        Ok(out)
    }

    fn column(table: Table, name: &str) -> Result<&'static str, FilterError> {
        // password hashes are never a sort key
        table
            .columns()
            .iter()
            .copied()
            .find(|c| *c == name && *c != "password_hash")
            .ok_or_else(|| FilterError::InvalidColumn(format!("{} has no column '{}'", table.name(), name)))
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("\"{}\" {}", i.column, i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}
