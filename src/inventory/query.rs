// Query building for inventory listings
// Turns a validated filter into parameterized SQL

use serde::Deserialize;
use utoipa::IntoParams;

use crate::inventory::models::{InventoryFilter, StockStatus};

const MAX_LIMIT: u32 = 200;
const DEFAULT_LIMIT: u32 = 50;

/// Builds the SELECT and COUNT statements for GET /api/inventory
pub struct InventoryQueryBuilder {
    where_clauses: Vec<String>,
    params: Vec<String>,
    limit: u32,
    offset: u64,
}

impl InventoryQueryBuilder {
    pub fn new() -> Self {
        Self {
            where_clauses: Vec::new(),
            params: Vec::new(),
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }

    /// Builder pre-populated from a filter
    pub fn from_filter(filter: &InventoryFilter) -> Self {
        let mut builder = Self::new();
        builder.add_status_filter(filter.status);
        if let Some(ref search) = filter.search {
            builder.add_search_filter(search);
        }
        if let Some(ref location) = filter.location {
            builder.add_location_filter(location);
        }
        builder.set_pagination(filter.page, filter.limit);
        builder
    }

    pub fn add_status_filter(&mut self, status: StockStatus) {
        let clause = match status {
            StockStatus::All => return,
            StockStatus::InStock => "quantity_available > reorder_point",
            StockStatus::LowStock => "quantity_available > 0 AND quantity_available <= reorder_point",
            StockStatus::OutOfStock => "quantity_available = 0",
        };
        self.where_clauses.push(format!("({})", clause));
    }

    /// Case-insensitive substring match on sku or location.
    /// `%` and `_` in the search text match literally.
    pub fn add_search_filter(&mut self, search: &str) {
        let param_index = self.params.len() + 1;
        self.where_clauses.push(format!(
            "(sku ILIKE ${0} ESCAPE '\\' OR location ILIKE ${0} ESCAPE '\\')",
            param_index
        ));
        self.params.push(format!("%{}%", escape_like(search)));
    }

    pub fn add_location_filter(&mut self, location: &str) {
        let param_index = self.params.len() + 1;
        self.where_clauses.push(format!("location = ${}", param_index));
        self.params.push(location.to_string());
    }

    pub fn set_pagination(&mut self, page: u32, limit: u32) {
        self.limit = limit;
        // Postgres rejects offsets beyond BIGINT
        self.offset = page_offset(page, limit).min(i64::MAX as u64);
    }

    fn where_sql(&self) -> String {
        if self.where_clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.where_clauses.join(" AND "))
        }
    }

    /// Page query, newest items first
    pub fn build(&self) -> (String, Vec<String>) {
        let query = format!(
            "SELECT * FROM inventory_items{} ORDER BY created_at DESC, sku LIMIT {} OFFSET {}",
            self.where_sql(),
            self.limit,
            self.offset
        );
        (query, self.params.clone())
    }

    /// Total row count for the same filter, ignoring pagination
    pub fn build_count(&self) -> (String, Vec<String>) {
        let query = format!("SELECT COUNT(*) FROM inventory_items{}", self.where_sql());
        (query, self.params.clone())
    }
}

/// Rows skipped before `page`; u32 * u32 always fits in u64
pub fn page_offset(page: u32, limit: u32) -> u64 {
    u64::from(page.saturating_sub(1)) * u64::from(limit)
}

/// Escapes LIKE wildcards with backslashes
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl Default for InventoryQueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw query parameters for GET /api/inventory
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// all, in_stock, low_stock or out_of_stock
    pub status: Option<String>,
    pub search: Option<String>,
    pub location: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListParams {
    /// Normalizes raw parameters into a filter.
    ///
    /// Blank strings are treated as absent; page is at least 1 and limit is
    /// clamped to `1..=200`.
    pub fn into_filter(self) -> Result<InventoryFilter, String> {
        let status = match self.status.as_deref() {
            Some(raw) => raw.trim().parse::<StockStatus>()?,
            None => StockStatus::All,
        };

        let non_blank = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(InventoryFilter {
            status,
            search: non_blank(self.search),
            location: non_blank(self.location),
            page: self.page.unwrap_or(1).max(1),
            limit: self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_has_no_where_clause() {
        let builder = InventoryQueryBuilder::from_filter(&InventoryFilter::default());
        let (sql, params) = builder.build();
        assert_eq!(
            sql,
            "SELECT * FROM inventory_items ORDER BY created_at DESC, sku LIMIT 50 OFFSET 0"
        );
        assert!(params.is_empty());
    }

    #[test]
    fn test_filters_are_numbered_in_order() {
        let filter = InventoryFilter {
            status: StockStatus::LowStock,
            search: Some("ter".to_string()),
            location: Some("A1".to_string()),
            page: 3,
            limit: 20,
        };
        let builder = InventoryQueryBuilder::from_filter(&filter);
        let (sql, params) = builder.build();
        assert!(sql.contains("(quantity_available > 0 AND quantity_available <= reorder_point)"));
        assert!(sql.contains("(sku ILIKE $1 ESCAPE '\\' OR location ILIKE $1 ESCAPE '\\')"));
        assert!(sql.contains("location = $2"));
        assert!(sql.ends_with("LIMIT 20 OFFSET 40"));
        assert_eq!(params, vec!["%ter%".to_string(), "A1".to_string()]);

        let (count_sql, count_params) = builder.build_count();
        assert!(count_sql.starts_with("SELECT COUNT(*) FROM inventory_items WHERE"));
        assert!(!count_sql.contains("LIMIT"));
        assert_eq!(count_params.len(), 2);
    }

    #[test]
    fn test_list_params_normalization() {
        let filter = ListParams {
            status: Some("out_of_stock".to_string()),
            search: Some("   ".to_string()),
            location: None,
            page: Some(0),
            limit: Some(10_000),
        }
        .into_filter()
        .unwrap();

        assert_eq!(filter.status, StockStatus::OutOfStock);
        assert_eq!(filter.search, None);
        assert_eq!(filter.page, 1);
        assert_eq!(filter.limit, 200);
    }

    #[test]
    fn test_search_wildcards_match_literally() {
        let mut builder = InventoryQueryBuilder::new();
        builder.add_search_filter("50%_off\\");
        let (_, params) = builder.build();
        assert_eq!(params, vec!["%50\\%\\_off\\\\%".to_string()]);
    }

    #[test]
    fn test_far_page_offset_does_not_overflow() {
        let filter = ListParams {
            page: Some(100_000_000),
            ..Default::default()
        }
        .into_filter()
        .unwrap();

        let (sql, _) = InventoryQueryBuilder::from_filter(&filter).build();
        assert!(sql.ends_with("LIMIT 50 OFFSET 4999999950"));

        let mut builder = InventoryQueryBuilder::new();
        builder.set_pagination(u32::MAX, u32::MAX);
        let (sql, _) = builder.build();
        assert!(sql.ends_with(&format!("OFFSET {}", i64::MAX)));
    }

    #[test]
    fn test_list_params_reject_unknown_status() {
        let result = ListParams {
            status: Some("overstock".to_string()),
            ..Default::default()
        }
        .into_filter();
        assert!(result.is_err());
    }
}
