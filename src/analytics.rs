// src/analytics.rs
//! Growth and margin rows derived from the revenue, gross-profit and
//! net-profit lines of a normalized statement.

use crate::table::{Cell, Flag, NormalizedTable, Row};
use tracing::{debug, instrument};

pub const REVENUE_GROWTH: &str = "Revenue Growth (%)";
pub const GROSS_PROFIT_GROWTH: &str = "Gross Profit Growth (%)";
pub const NET_PROFIT_GROWTH: &str = "Net Profit Growth (%)";
pub const GROSS_MARGIN: &str = "Gross Margin (%)";
pub const NET_MARGIN: &str = "Net Margin (%)";

/// Semantic line items located by label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineItem {
    Revenue,
    GrossProfit,
    NetProfit,
}

impl LineItem {
    /// Case-insensitive substring match on a row label.
    pub fn matches(&self, label: &str) -> bool {
        let label = label.to_lowercase();
        match self {
            LineItem::Revenue => {
                label.contains("net revenue") || (label.contains("revenue") && label.contains("net"))
            }
            LineItem::GrossProfit => label.contains("gross profit"),
            LineItem::NetProfit => label.contains("net profit") && label.contains("after tax"),
        }
    }
}

/// First row (in table order) matching `item`.
pub fn find_line_item<'a>(table: &'a NormalizedTable, item: LineItem) -> Option<&'a Row> {
    table.rows().iter().find(|r| item.matches(r.label()))
}

/// Growth against the absolute previous value. Undefined when the previous
/// period is zero.
pub fn revenue_growth(prev: f64, cur: f64) -> Cell {
    if prev == 0.0 {
        return Cell::Flag(Flag::NoData);
    }
    Cell::number((cur - prev) / prev.abs() * 100.0)
}

/// Growth for profit lines, which may cross zero. Sign changes and losses are
/// reported as flags instead of a percentage.
pub fn profit_growth(prev: f64, cur: f64) -> Cell {
    match (prev > 0.0, cur > 0.0) {
        (false, true) => Cell::Flag(Flag::LossToProfit),
        (true, false) => Cell::Flag(Flag::ProfitToLoss),
        (false, false) => Cell::Flag(Flag::Loss),
        (true, true) => Cell::number((cur - prev) / prev * 100.0),
    }
}

/// `part / whole * 100`, `Missing` when either side is missing or `whole` is
/// zero. Negative margins are kept as-is.
pub fn margin(part: Option<f64>, whole: Option<f64>) -> Cell {
    match (part, whole) {
        (Some(p), Some(w)) if w != 0.0 => Cell::number(p / w * 100.0),
        _ => Cell::Missing,
    }
}

/// Period-over-period series. The first period has no predecessor and is
/// always `Missing`, as is any period where either side is missing.
fn growth_series(row: &Row, f: fn(f64, f64) -> Cell) -> Vec<Cell> {
    let values: Vec<Option<f64>> = row.periods().iter().map(Cell::as_number).collect();
    values
        .iter()
        .enumerate()
        .map(|(i, cur)| {
            let prev = if i == 0 { None } else { values[i - 1] };
            match (prev, cur) {
                (Some(p), Some(c)) => f(p, *c),
                _ => Cell::Missing,
            }
        })
        .collect()
}

fn margin_series(part: &Row, whole: &Row) -> Vec<Cell> {
    part.periods()
        .iter()
        .zip(whole.periods())
        .map(|(p, w)| margin(p.as_number(), w.as_number()))
        .collect()
}

/// Returns `table` with up to five derived rows appended, in this order:
/// revenue growth, gross-profit growth, net-profit growth, gross margin and
/// net margin. A row whose source line item is absent is skipped. Existing
/// rows are left untouched.
#[instrument(level = "debug", skip(table), fields(rows = table.rows().len()))]
pub fn derive_analytics(table: &NormalizedTable) -> NormalizedTable {
    let revenue = find_line_item(table, LineItem::Revenue);
    let gross = find_line_item(table, LineItem::GrossProfit);
    let net = find_line_item(table, LineItem::NetProfit);
    debug!(
        revenue = revenue.is_some(),
        gross_profit = gross.is_some(),
        net_profit = net.is_some(),
        "located line items"
    );

    let mut derived: Vec<(&str, Vec<Cell>)> = Vec::with_capacity(5);
    if let Some(r) = revenue {
        derived.push((REVENUE_GROWTH, growth_series(r, revenue_growth)));
    }
    if let Some(g) = gross {
        derived.push((GROSS_PROFIT_GROWTH, growth_series(g, profit_growth)));
    }
    if let Some(n) = net {
        derived.push((NET_PROFIT_GROWTH, growth_series(n, profit_growth)));
    }
    if let (Some(g), Some(r)) = (gross, revenue) {
        derived.push((GROSS_MARGIN, margin_series(g, r)));
    }
    if let (Some(n), Some(r)) = (net, revenue) {
        derived.push((NET_MARGIN, margin_series(n, r)));
    }

    let mut out = table.clone();
    for (label, cells) in derived {
        out.push_derived(label, cells);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::normalize;
    use crate::pipeline::PipelineOptions;

    fn assert_close(cell: &Cell, expected: f64) {
        match cell {
            Cell::Number(v) => assert!((v - expected).abs() < 1e-9, "{v} != {expected}"),
            other => panic!("expected number {expected}, got {other:?}"),
        }
    }

    #[test]
    fn test_revenue_growth() {
        assert_close(&revenue_growth(100.0, 150.0), 50.0);
        assert_close(&revenue_growth(-100.0, -50.0), 50.0);
        assert_eq!(revenue_growth(0.0, 10.0), Cell::Flag(Flag::NoData));
    }

    #[test]
    fn test_profit_growth_transitions() {
        assert_eq!(profit_growth(-10.0, 20.0), Cell::Flag(Flag::LossToProfit));
        assert_eq!(profit_growth(20.0, -5.0), Cell::Flag(Flag::ProfitToLoss));
        assert_eq!(profit_growth(-10.0, -5.0), Cell::Flag(Flag::Loss));
        assert_eq!(profit_growth(0.0, 5.0), Cell::Flag(Flag::LossToProfit));
        assert_eq!(profit_growth(0.0, 0.0), Cell::Flag(Flag::Loss));
        assert_close(&profit_growth(100.0, 80.0), -20.0);
    }

    #[test]
    fn test_margin() {
        assert_eq!(margin(Some(10.0), Some(0.0)), Cell::Missing);
        assert_eq!(margin(None, Some(10.0)), Cell::Missing);
        assert_close(&margin(Some(-25.0), Some(100.0)), -25.0);
        assert_close(&margin(Some(30.0), Some(120.0)), 25.0);
    }

    #[test]
    fn test_line_item_matching() {
        assert!(LineItem::Revenue.matches("1 Net Revenue"));
        assert!(LineItem::Revenue.matches("Revenue, net of deductions"));
        assert!(!LineItem::Revenue.matches("Gross revenue"));
        assert!(LineItem::GrossProfit.matches("5. GROSS PROFIT"));
        assert!(LineItem::NetProfit.matches("Net profit after tax"));
        assert!(!LineItem::NetProfit.matches("Net profit before tax"));
    }

    const STATEMENT: &str = r#"<table>
        <tr><th>Fiscal Year End</th><th>31-Dec-2021</th><th>31-Dec-2022</th><th>31-Dec-2023</th></tr>
        <tr><td>Gross revenue</td><td>1</td><td>1</td><td>1</td></tr>
        <tr><td>1. Net revenue</td><td>0</td><td>100</td><td>150</td></tr>
        <tr><td>Net revenue (restated)</td><td>9</td><td>9</td><td>9</td></tr>
        <tr><td>2. Gross profit</td><td>(10)</td><td>20</td><td>(5)</td></tr>
        <tr><td>3. Net profit after tax</td><td>n/a</td><td>100</td><td>80</td></tr>
    </table>"#;

    #[test]
    fn test_derive_analytics_rows_and_order() {
        let table = normalize(STATEMENT, &PipelineOptions::default()).expect("table");
        let derived = derive_analytics(&table);

        assert_eq!(&derived.rows()[..table.rows().len()], table.rows());
        let labels: Vec<&str> = derived.rows()[table.rows().len()..]
            .iter()
            .map(|r| r.label())
            .collect();
        assert_eq!(
            labels,
            vec![REVENUE_GROWTH, GROSS_PROFIT_GROWTH, NET_PROFIT_GROWTH, GROSS_MARGIN, NET_MARGIN]
        );

        let growth = derived.row_by_label(REVENUE_GROWTH).expect("revenue growth");
        assert_eq!(growth.periods()[0], Cell::Missing);
        assert_eq!(growth.periods()[1], Cell::Flag(Flag::NoData));
        assert_close(&growth.periods()[2], 50.0);

        let gross = derived.row_by_label(GROSS_PROFIT_GROWTH).expect("gross growth");
        assert_eq!(gross.periods()[1], Cell::Flag(Flag::LossToProfit));
        assert_eq!(gross.periods()[2], Cell::Flag(Flag::ProfitToLoss));

        let net = derived.row_by_label(NET_PROFIT_GROWTH).expect("net growth");
        assert_eq!(net.periods()[1], Cell::Missing);
        assert_close(&net.periods()[2], -20.0);

        let gross_margin = derived.row_by_label(GROSS_MARGIN).expect("gross margin");
        assert_eq!(gross_margin.periods()[0], Cell::Missing);
        assert_close(&gross_margin.periods()[1], 20.0);
        assert_close(&gross_margin.periods()[2], -5.0 / 150.0 * 100.0);

        // first period: net profit is n/a and revenue is zero
        let net_margin = derived.row_by_label(NET_MARGIN).expect("net margin");
        assert_eq!(net_margin.periods()[0], Cell::Missing);
        assert_close(&net_margin.periods()[1], 100.0);
        assert_close(&net_margin.periods()[2], 80.0 / 150.0 * 100.0);
    }

    #[test]
    fn test_net_margin_missing_on_zero_revenue_alone() {
        let html = r#"<table>
            <tr><th>Item</th><th>2022</th><th>2023</th></tr>
            <tr><td>Net revenue</td><td>0</td><td>200</td></tr>
            <tr><td>Net profit after tax</td><td>15</td><td>(20)</td></tr>
        </table>"#;
        let table = normalize(html, &PipelineOptions::default()).expect("table");
        let derived = derive_analytics(&table);
        let net_margin = derived.row_by_label(NET_MARGIN).expect("net margin");
        assert_eq!(net_margin.periods()[0], Cell::Missing);
        assert_close(&net_margin.periods()[1], -10.0);
    }

    #[test]
    fn test_absent_line_items_are_skipped() {
        let html = r#"<table>
            <tr><th>Item</th><th>2022</th><th>2023</th></tr>
            <tr><td>Gross profit</td><td>10</td><td>20</td></tr>
        </table>"#;
        let table = normalize(html, &PipelineOptions::default()).expect("table");
        let derived = derive_analytics(&table);
        let labels: Vec<&str> = derived.rows().iter().skip(1).map(|r| r.label()).collect();
        assert_eq!(labels, vec![GROSS_PROFIT_GROWTH]);
    }
}
