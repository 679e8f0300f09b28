//! Fixed report queries.
//!
//! All SQL is centralized here. The column aliases below ARE the interface
//! the analyzers and renderers depend on, so they are exported as constants
//! instead of being repeated as string literals around the crate.

/// Student name column of the grades report.
pub const COL_STUDENT: &str = "Student";
/// Final average column of the grades report.
pub const COL_FINAL_AVERAGE: &str = "Final Average";
/// Pass/fail status column of the grades report.
pub const COL_STATUS: &str = "Status";

/// Product name column shared by the inventory, sales, and dashboard reports.
pub const COL_PRODUCT: &str = "Product";
/// Unit price column.
#[allow(dead_code)] // Part of the alias contract, not read by any chart yet
pub const COL_UNIT_PRICE: &str = "Unit Price";
/// Quantity column.
#[allow(dead_code)] // Part of the alias contract, not read by any chart yet
pub const COL_QUANTITY: &str = "Quantity";
/// Sales/stock total column shared by the value-ranked charts.
pub const COL_TOTAL_SALES: &str = "Total Sales";
/// Region column of the sales report.
pub const COL_REGION: &str = "Region";

/// Status value counted as a pass by the grade statistics.
pub const STATUS_APPROVED: &str = "Approved";
/// Status value counted as a fail by the grade statistics.
pub const STATUS_REPROVED: &str = "Reproved";
/// Region value the sales query substitutes for products never sold.
#[allow(dead_code)] // Documents the sentinel the sales query emits
pub const REGION_NO_SALE: &str = "No Sale";

/// Grades query. The passing cutoff is embedded so the database computes the
/// status column with the same threshold the chart draws. Averages are cast
/// to `double precision`, the numeric type the loader decodes.
pub fn grades_query(pass_cutoff: f64) -> String {
    format!(
        r#"SELECT
    student_name AS "Student",
    CAST(ROUND(CAST((exam_one + exam_two) / 2.0 AS numeric), 2) AS double precision) AS "Final Average",
    CASE
        WHEN (exam_one + exam_two) / 2.0 >= {cutoff} THEN 'Approved'
        ELSE 'Reproved'
    END AS "Status"
FROM students"#,
        cutoff = pass_cutoff
    )
}

/// Inventory query: stock value per product.
pub const INVENTORY_QUERY: &str = r#"SELECT
    product_name AS "Product",
    CAST(price AS double precision) AS "Unit Price",
    quantity AS "Quantity",
    CAST(price * quantity AS double precision) AS "Total Sales"
FROM products"#;

/// Sales query: per-product, per-region totals. Products without a matching
/// sale keep a zero quantity and the "No Sale" region sentinel.
pub const SALES_QUERY: &str = r#"SELECT
    p.product_name AS "Product",
    CAST(p.price AS double precision) AS "Unit Price",
    COALESCE(r.qty_sold, 0) AS "Quantity",
    COALESCE(r.region_name, 'No Sale') AS "Region",
    CAST(p.price * COALESCE(r.qty_sold, 0) AS double precision) AS "Total Sales"
FROM products p
INNER JOIN regions r ON p.product_id = r.product_id"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grades_query_embeds_cutoff() {
        let sql = grades_query(6.0);
        assert!(sql.contains(">= 6 THEN 'Approved'"));
        assert!(sql.contains(r#"AS "Final Average""#));
        assert!(sql.contains(r#"AS "Status""#));
    }

    #[test]
    fn test_fixed_queries_expose_contract_aliases() {
        assert!(INVENTORY_QUERY.contains(&format!(r#"AS "{}""#, COL_TOTAL_SALES)));
        assert!(SALES_QUERY.contains(&format!(r#"AS "{}""#, COL_REGION)));
        assert!(SALES_QUERY.contains(REGION_NO_SALE));
    }
}
