// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::cmp::Ordering;

use time::Date;

use crate::format::{format_area_m2, format_date, format_money, format_quantity};

pub const IMAGE_PLACEHOLDER: &str = "[no image]";

/// One materialized table cell. Records are opaque to the table engine;
/// an entity adapter turns each record into a row of these.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Date(Option<Date>),
    Number(Option<f64>),
    Quantity(Option<i64>),
    Area(Option<f64>),
    Money(Option<i64>),
    Bool(Option<bool>),
    /// Image reference (URL or file name). An empty reference renders as a
    /// placeholder; the original reference is kept for diagnostics.
    Image(String),
    Missing,
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn display(&self) -> String {
        match self {
            Self::Text(value) => value.clone(),
            Self::Date(Some(value)) => format_date(*value),
            Self::Date(None) => String::new(),
            Self::Number(Some(value)) => format!("{value}"),
            Self::Number(None) => String::new(),
            Self::Quantity(Some(value)) => format_quantity(*value),
            Self::Quantity(None) => String::new(),
            Self::Area(Some(value)) => format_area_m2(*value),
            Self::Area(None) => String::new(),
            Self::Money(Some(cents)) => format_money(*cents),
            Self::Money(None) => String::new(),
            Self::Bool(Some(true)) => "yes".to_owned(),
            Self::Bool(Some(false)) => "no".to_owned(),
            Self::Bool(None) => String::new(),
            Self::Image(reference) if reference.trim().is_empty() => {
                IMAGE_PLACEHOLDER.to_owned()
            }
            Self::Image(reference) => reference.clone(),
            Self::Missing => String::new(),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(
            self,
            Self::Date(None)
                | Self::Number(None)
                | Self::Quantity(None)
                | Self::Area(None)
                | Self::Money(None)
                | Self::Bool(None)
                | Self::Missing
        )
    }

    /// Numeric view of a cell, used by range filters. Money compares in
    /// whole currency units so filter bounds read naturally.
    pub fn numeric(&self) -> Option<f64> {
        match self {
            Self::Number(value) => *value,
            Self::Quantity(value) => value.map(|quantity| quantity as f64),
            Self::Area(value) => *value,
            Self::Money(cents) => cents.map(|cents| cents as f64 / 100.0),
            _ => None,
        }
    }

    pub fn date(&self) -> Option<Date> {
        match self {
            Self::Date(value) => *value,
            _ => None,
        }
    }

    /// Relational comparison between cells of the same kind; mixed kinds and
    /// missing values fall back to comparing display text, so a missing
    /// value orders like the empty string.
    pub fn cmp_value(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Date(Some(left)), Self::Date(Some(right))) => left.cmp(right),
            (Self::Number(Some(left)), Self::Number(Some(right))) => left.total_cmp(right),
            (Self::Quantity(Some(left)), Self::Quantity(Some(right))) => left.cmp(right),
            (Self::Area(Some(left)), Self::Area(Some(right))) => left.total_cmp(right),
            (Self::Money(Some(left)), Self::Money(Some(right))) => left.cmp(right),
            (Self::Bool(Some(left)), Self::Bool(Some(right))) => left.cmp(right),
            (Self::Text(left), Self::Text(right)) => {
                left.to_lowercase().cmp(&right.to_lowercase())
            }
            _ => self
                .display()
                .to_lowercase()
                .cmp(&other.display().to_lowercase()),
        }
    }
}

/// One record as presented to the table: a stable id plus cells keyed by
/// column key. Cell order follows the page's column definition but lookup
/// is always by key, so column reordering never touches rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: String,
    cells: Vec<(&'static str, CellValue)>,
}

impl Row {
    pub fn new(id: impl Into<String>, cells: Vec<(&'static str, CellValue)>) -> Self {
        Self {
            id: id.into(),
            cells,
        }
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(cell_key, _)| *cell_key == key)
            .map(|(_, value)| value)
    }

    pub fn cell(&self, key: &str) -> CellValue {
        self.get(key).cloned().unwrap_or(CellValue::Missing)
    }

    /// Case-folded haystack for whole-row substring search, skipping the
    /// actions pseudo-column by construction (it is never materialized).
    pub fn search_text(&self) -> String {
        let mut haystack = String::new();
        for (_, value) in &self.cells {
            haystack.push_str(&value.display().to_lowercase());
            haystack.push('\n');
        }
        haystack
    }
}

#[cfg(test)]
mod tests {
    use super::{CellValue, IMAGE_PLACEHOLDER, Row};
    use std::cmp::Ordering;
    use time::{Date, Month};

    fn date(day: u8) -> Date {
        Date::from_calendar_date(2024, Month::June, day).expect("valid date")
    }

    #[test]
    fn display_formats_by_kind() {
        assert_eq!(CellValue::text("Torre Central").display(), "Torre Central");
        assert_eq!(CellValue::Date(Some(date(5))).display(), "05/06/2024");
        assert_eq!(CellValue::Money(Some(4_837_000_000)).display(), "$48.370.000");
        assert_eq!(CellValue::Quantity(Some(24)).display(), "24");
        assert_eq!(CellValue::Bool(Some(true)).display(), "yes");
        assert_eq!(CellValue::Missing.display(), "");
    }

    #[test]
    fn empty_image_reference_renders_placeholder() {
        assert_eq!(CellValue::Image(String::new()).display(), IMAGE_PLACEHOLDER);
        assert_eq!(
            CellValue::Image("frames/v-120.png".to_owned()).display(),
            "frames/v-120.png"
        );
    }

    #[test]
    fn comparison_is_type_aware() {
        assert_eq!(
            CellValue::Money(Some(100)).cmp_value(&CellValue::Money(Some(900))),
            Ordering::Less
        );
        assert_eq!(
            CellValue::Date(Some(date(9))).cmp_value(&CellValue::Date(Some(date(2)))),
            Ordering::Greater
        );
        assert_eq!(
            CellValue::text("alpha").cmp_value(&CellValue::text("ALPHA")),
            Ordering::Equal
        );
    }

    #[test]
    fn missing_values_order_like_empty_text() {
        assert_eq!(
            CellValue::Date(None).cmp_value(&CellValue::text("anything")),
            Ordering::Less
        );
        assert_eq!(
            CellValue::Missing.cmp_value(&CellValue::Text(String::new())),
            Ordering::Equal
        );
    }

    #[test]
    fn row_lookup_is_by_key() {
        let row = Row::new(
            "CLI-001",
            vec![
                ("id", CellValue::text("CLI-001")),
                ("name", CellValue::text("Constructora Andes")),
            ],
        );
        assert_eq!(row.cell("name").display(), "Constructora Andes");
        assert_eq!(row.cell("missing"), CellValue::Missing);
    }

    #[test]
    fn search_text_folds_case_across_cells() {
        let row = Row::new(
            "r1",
            vec![
                ("name", CellValue::text("Torre NORTE")),
                ("status", CellValue::text("Active")),
            ],
        );
        assert!(row.search_text().contains("torre norte"));
        assert!(row.search_text().contains("active"));
    }
}
