use chrono::NaiveDate;
use serde::Serialize;
use sqlx::MySql;
use sqlx::mysql::MySqlArguments;
use sqlx::query::{QueryAs, QueryScalar};
use utoipa::ToSchema;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    Date(NaiveDate),
}

/// ===============================
/// Dynamic WHERE clause
/// ===============================
/// Conditions are ANDed in insertion order; values are bound in the same order.
#[derive(Debug, Default)]
pub struct SqlFilter {
    conditions: Vec<String>,
    values: Vec<SqlValue>,
}

impl SqlFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `condition` must contain one `?` per value in `values`.
    pub fn push(&mut self, condition: &str, values: impl IntoIterator<Item = SqlValue>) -> &mut Self {
        self.conditions.push(condition.to_string());
        self.values.extend(values);
        self
    }

    pub fn push_if<T>(&mut self, value: Option<T>, condition: &str, to_sql: impl Fn(T) -> SqlValue) -> &mut Self {
        if let Some(v) = value {
            self.push(condition, [to_sql(v)]);
        }
        self
    }

    pub fn where_sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn bind_as<'q, O>(
        &self,
        mut query: QueryAs<'q, MySql, O, MySqlArguments>,
    ) -> QueryAs<'q, MySql, O, MySqlArguments> {
        for value in self.values() {
            query = match value.clone() {
                SqlValue::String(v) => query.bind(v),
                SqlValue::U64(v) => query.bind(v),
                SqlValue::Date(v) => query.bind(v),
            };
        }
        query
    }

    pub fn bind_scalar<'q, O>(
        &self,
        mut query: QueryScalar<'q, MySql, O, MySqlArguments>,
    ) -> QueryScalar<'q, MySql, O, MySqlArguments> {
        for value in self.values() {
            query = match value.clone() {
                SqlValue::String(v) => query.bind(v),
                SqlValue::U64(v) => query.bind(v),
                SqlValue::Date(v) => query.bind(v),
            };
        }
        query
    }
}

/// `%term%` with LIKE wildcards in the term escaped
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// ===============================
/// Pagination
/// ===============================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    pub const MAX_LIMIT: u32 = 100;

    /// 1-based page; limit defaults to 10 and is clamped to 1..=100
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(10).clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    pub fn describe(&self, total: i64) -> Pagination {
        let total = total.max(0);
        let limit = i64::from(self.limit);
        Pagination {
            total,
            page: self.page,
            limit: self.limit,
            total_pages: (total + limit - 1) / limit,
        }
    }
}

#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct Pagination {
    #[schema(example = 42)]
    pub total: i64,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub limit: u32,
    #[schema(example = 5)]
    pub total_pages: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_has_no_where_clause() {
        assert_eq!(SqlFilter::new().where_sql(), "");
    }

    #[test]
    fn conditions_are_anded_in_order() {
        let mut filter = SqlFilter::new();
        filter
            .push("a.employee_id = ?", [SqlValue::U64(4)])
            .push_if(Some("approved"), "a.status = ?", |s: &str| SqlValue::String(s.into()))
            .push_if(None::<NaiveDate>, "a.date >= ?", SqlValue::Date);

        assert_eq!(filter.where_sql(), " WHERE a.employee_id = ? AND a.status = ?");
        assert_eq!(
            filter.values(),
            &[SqlValue::U64(4), SqlValue::String("approved".into())]
        );
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(like_pattern(" 50%_off "), "%50\\%\\_off%");
    }

    #[test]
    fn page_is_clamped() {
        assert_eq!(Page::new(None, None), Page { page: 1, limit: 10 });
        assert_eq!(Page::new(Some(0), Some(500)), Page { page: 1, limit: 100 });
        assert_eq!(Page::new(Some(3), Some(0)).limit, 1);
        assert_eq!(Page::new(Some(3), Some(20)).offset(), 40);
    }

    #[test]
    fn total_pages_round_up() {
        let page = Page::new(Some(1), Some(10));
        assert_eq!(page.describe(0).total_pages, 0);
        assert_eq!(page.describe(10).total_pages, 1);
        assert_eq!(page.describe(11).total_pages, 2);
    }
}
