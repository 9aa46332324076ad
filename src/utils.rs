// Presentation helpers shared by the HTTP views and the CLI

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::Revenue;

/// Format integer cents as US dollars, e.g. `123456` -> `"$1,234.56"`
pub fn format_currency(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let dollars = (abs / 100).to_string();
    let remainder = abs % 100;

    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (i, ch) in dollars.chars().enumerate() {
        if i > 0 && (dollars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{sign}${grouped}.{remainder:02}")
}

/// Render a stored `YYYY-MM-DD` date as `Dec 6, 2022`.
///
/// Anything that is not a valid date is returned unchanged.
pub fn format_date_to_local(date: &str) -> String {
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(parsed) => parsed.format("%b %-d, %Y").to_string(),
        Err(_) => date.to_string(),
    }
}

/// One slot of the pagination bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(u32),
    Ellipsis,
}

impl Serialize for PageItem {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PageItem::Page(number) => serializer.serialize_u32(*number),
            PageItem::Ellipsis => serializer.serialize_str("..."),
        }
    }
}

/// Page numbers to show for `current_page` out of `total_pages`, with
/// ellipses standing in for skipped ranges.
pub fn generate_pagination(current_page: u32, total_pages: u32) -> Vec<PageItem> {
    use PageItem::{Ellipsis, Page};

    if total_pages <= 7 {
        return (1..=total_pages).map(Page).collect();
    }

    if current_page <= 3 {
        return vec![
            Page(1),
            Page(2),
            Page(3),
            Ellipsis,
            Page(total_pages - 1),
            Page(total_pages),
        ];
    }

    if current_page >= total_pages - 2 {
        return vec![
            Page(1),
            Page(2),
            Ellipsis,
            Page(total_pages - 2),
            Page(total_pages - 1),
            Page(total_pages),
        ];
    }

    vec![
        Page(1),
        Ellipsis,
        Page(current_page - 1),
        Page(current_page),
        Page(current_page + 1),
        Ellipsis,
        Page(total_pages),
    ]
}

/// Link to `page` of `path`, keeping the current search term
pub fn page_url(path: &str, query: &str, page: u32) -> String {
    if query.is_empty() {
        format!("{path}?page={page}")
    } else {
        format!("{path}?query={}&page={page}", urlencoding::encode(query))
    }
}

/// Y-axis for the revenue chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YAxis {
    pub labels: Vec<String>,
    pub top_label: i64,
}

/// Labels from the highest revenue (rounded up to the next thousand) down to 0
pub fn generate_y_axis(revenue: &[Revenue]) -> YAxis {
    let highest = revenue.iter().map(|r| r.revenue).max().unwrap_or(0).max(0);
    let top_label = (highest + 999) / 1000 * 1000;

    let labels = (0..=top_label / 1000)
        .rev()
        .map(|thousands| format!("${thousands}K"))
        .collect();

    YAxis { labels, top_label }
}

/// `query` / `page` URL parameters of list views
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
}

impl SearchParams {
    /// Search term, empty when absent
    pub fn query(&self) -> &str {
        self.query.as_deref().unwrap_or("")
    }

    /// 1-based page; missing, malformed or non-positive values become 1
    pub fn page(&self) -> u32 {
        self.page
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|page| *page >= 1)
            .unwrap_or(1)
    }
}
