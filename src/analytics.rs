//! Back-office analytics: aggregate order data and reshape it for charts.
//!
//! The aggregations run in SQL; the month-by-product matrix is then pivoted
//! in memory into the shape the compound bar chart consumes: one object per
//! month carrying a quantity key per product, a `<name>_revenue` key per
//! product, and the month's `totalRevenue`, zero-filled so every month has
//! every product.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::PgPool;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, Default)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn year(year: i32) -> Result<Self, ApiError> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| ApiError::Validation(format!("Invalid year: {year}")))?;
        let end = NaiveDate::from_ymd_opt(year, 12, 31)
            .and_then(|d| d.and_hms_milli_opt(23, 59, 59, 999))
            .ok_or_else(|| ApiError::Validation(format!("Invalid year: {year}")))?;
        Ok(DateRange {
            start: Some(DateTime::from_naive_utc_and_offset(start, Utc)),
            end: Some(DateTime::from_naive_utc_and_offset(end, Utc)),
        })
    }
}

/// Parses `YYYY-MM-DD` as the start of that day (UTC).
pub fn day_start(s: &str) -> Result<DateTime<Utc>, ApiError> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| ApiError::Validation(format!("Invalid date: {s}")))?;
    let naive = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ApiError::Validation(format!("Invalid date: {s}")))?;
    Ok(DateTime::from_naive_utc_and_offset(naive, Utc))
}

/// Parses `YYYY-MM-DD` as the last instant of that day (UTC).
pub fn day_end(s: &str) -> Result<DateTime<Utc>, ApiError> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| ApiError::Validation(format!("Invalid date: {s}")))?;
    let naive = date
        .and_hms_milli_opt(23, 59, 59, 999)
        .ok_or_else(|| ApiError::Validation(format!("Invalid date: {s}")))?;
    Ok(DateTime::from_naive_utc_and_offset(naive, Utc))
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DateBucket {
    pub date: String,
    pub count: i64,
    pub revenue: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub product_name: String,
    pub quantity: i64,
    pub revenue: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MonthlyProductRow {
    pub month: String,
    pub product_name: String,
    pub quantity: i64,
    pub revenue: i64,
}

#[derive(Debug, Serialize)]
pub struct MonthlyProductChart {
    pub data: Vec<Map<String, Value>>,
    pub products: Vec<String>,
    pub months: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub total_orders: i64,
    pub total_revenue: i64,
    pub orders_by_status: Vec<StatusCount>,
    pub orders_by_date: Vec<DateBucket>,
    pub top_products: Vec<TopProduct>,
    pub monthly_product_chart: MonthlyProductChart,
}

pub async fn compute(db: &PgPool, range: DateRange) -> Result<AnalyticsReport, ApiError> {
    let total_orders: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM orders
         WHERE ($1::timestamptz IS NULL OR created_at >= $1)
           AND ($2::timestamptz IS NULL OR created_at <= $2)",
    )
    .bind(range.start)
    .bind(range.end)
    .fetch_one(db)
    .await?;

    let total_revenue: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(total_amount), 0)::BIGINT FROM orders
         WHERE ($1::timestamptz IS NULL OR created_at >= $1)
           AND ($2::timestamptz IS NULL OR created_at <= $2)",
    )
    .bind(range.start)
    .bind(range.end)
    .fetch_one(db)
    .await?;

    let orders_by_status = sqlx::query_as::<_, StatusCount>(
        "SELECT status, COUNT(*) AS count FROM orders
         WHERE ($1::timestamptz IS NULL OR created_at >= $1)
           AND ($2::timestamptz IS NULL OR created_at <= $2)
         GROUP BY status",
    )
    .bind(range.start)
    .bind(range.end)
    .fetch_all(db)
    .await?;

    let orders_by_date = sqlx::query_as::<_, DateBucket>(
        "SELECT to_char(created_at, 'YYYY-MM-DD') AS date,
                COUNT(*) AS count,
                COALESCE(SUM(total_amount), 0)::BIGINT AS revenue
         FROM orders
         WHERE ($1::timestamptz IS NULL OR created_at >= $1)
           AND ($2::timestamptz IS NULL OR created_at <= $2)
         GROUP BY 1
         ORDER BY 1",
    )
    .bind(range.start)
    .bind(range.end)
    .fetch_all(db)
    .await?;

    let top_products = sqlx::query_as::<_, TopProduct>(
        "SELECT oi.product_name,
                SUM(oi.quantity)::BIGINT AS quantity,
                SUM(oi.quantity * oi.unit_price)::BIGINT AS revenue
         FROM order_items oi
         JOIN orders o ON o.id = oi.order_id
         WHERE ($1::timestamptz IS NULL OR o.created_at >= $1)
           AND ($2::timestamptz IS NULL OR o.created_at <= $2)
         GROUP BY oi.product_name
         ORDER BY quantity DESC
         LIMIT 10",
    )
    .bind(range.start)
    .bind(range.end)
    .fetch_all(db)
    .await?;

    let monthly_rows = sqlx::query_as::<_, MonthlyProductRow>(
        "SELECT to_char(o.created_at, 'YYYY-MM') AS month,
                oi.product_name,
                SUM(oi.quantity)::BIGINT AS quantity,
                SUM(oi.quantity * oi.unit_price)::BIGINT AS revenue
         FROM order_items oi
         JOIN orders o ON o.id = oi.order_id
         WHERE ($1::timestamptz IS NULL OR o.created_at >= $1)
           AND ($2::timestamptz IS NULL OR o.created_at <= $2)
         GROUP BY 1, 2
         ORDER BY 1",
    )
    .bind(range.start)
    .bind(range.end)
    .fetch_all(db)
    .await?;

    Ok(AnalyticsReport {
        total_orders,
        total_revenue,
        orders_by_status,
        orders_by_date,
        top_products,
        monthly_product_chart: pivot_monthly_chart(&monthly_rows),
    })
}

/// Pivots month-by-product aggregates into chart rows.
pub fn pivot_monthly_chart(rows: &[MonthlyProductRow]) -> MonthlyProductChart {
    let mut months: Vec<String> = Vec::new();
    let mut products: Vec<String> = Vec::new();
    for row in rows {
        if !months.contains(&row.month) {
            months.push(row.month.clone());
        }
        if !products.contains(&row.product_name) {
            products.push(row.product_name.clone());
        }
    }
    months.sort();

    let data = months
        .iter()
        .map(|month| {
            let mut entry = Map::new();
            entry.insert("month".into(), Value::String(month.clone()));
            for product in &products {
                entry.insert(product.clone(), Value::from(0));
                entry.insert(format!("{product}_revenue"), Value::from(0));
            }
            let mut month_revenue = 0i64;
            for row in rows.iter().filter(|r| &r.month == month) {
                entry.insert(row.product_name.clone(), Value::from(row.quantity));
                entry.insert(
                    format!("{}_revenue", row.product_name),
                    Value::from(row.revenue),
                );
                month_revenue += row.revenue;
            }
            entry.insert("totalRevenue".into(), Value::from(month_revenue));
            entry
        })
        .collect();

    MonthlyProductChart {
        data,
        products,
        months,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(month: &str, product: &str, quantity: i64, revenue: i64) -> MonthlyProductRow {
        MonthlyProductRow {
            month: month.into(),
            product_name: product.into(),
            quantity,
            revenue,
        }
    }

    #[test]
    fn test_pivot_zero_fills_missing_products() {
        let rows = vec![
            row("2026-01", "Noir", 3, 300),
            row("2026-02", "Blanc", 2, 500),
        ];
        let chart = pivot_monthly_chart(&rows);
        assert_eq!(chart.months, vec!["2026-01", "2026-02"]);
        assert_eq!(chart.products, vec!["Noir", "Blanc"]);

        let january = &chart.data[0];
        assert_eq!(january["month"], "2026-01");
        assert_eq!(january["Noir"], 3);
        assert_eq!(january["Blanc"], 0);
        assert_eq!(january["Blanc_revenue"], 0);
        assert_eq!(january["totalRevenue"], 300);

        let february = &chart.data[1];
        assert_eq!(february["Noir"], 0);
        assert_eq!(february["Blanc"], 2);
        assert_eq!(february["totalRevenue"], 500);
    }

    #[test]
    fn test_pivot_sums_month_revenue_across_products() {
        let rows = vec![
            row("2026-03", "Noir", 1, 100),
            row("2026-03", "Blanc", 4, 800),
        ];
        let chart = pivot_monthly_chart(&rows);
        assert_eq!(chart.data.len(), 1);
        assert_eq!(chart.data[0]["totalRevenue"], 900);
    }

    #[test]
    fn test_pivot_empty() {
        let chart = pivot_monthly_chart(&[]);
        assert!(chart.data.is_empty());
        assert!(chart.months.is_empty());
        assert!(chart.products.is_empty());
    }

    #[test]
    fn test_year_range_bounds() {
        let range = DateRange::year(2026).unwrap();
        assert_eq!(
            range.start.unwrap().to_rfc3339(),
            "2026-01-01T00:00:00+00:00"
        );
        assert_eq!(
            range.end.unwrap().to_rfc3339(),
            "2026-12-31T23:59:59.999+00:00"
        );
    }

    #[test]
    fn test_day_parsing() {
        assert!(day_start("2026-02-30").is_err());
        let start = day_start("2026-08-01").unwrap();
        let end = day_end("2026-08-01").unwrap();
        assert!(start < end);
    }
}
