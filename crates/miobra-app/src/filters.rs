// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::Date;

use crate::cells::{CellValue, Row};
use crate::columns::{ACTIONS_COLUMN, Column, ColumnKind};

/// Per-column filter criteria. A filter with no value/bounds is inert and
/// never excludes rows.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterCriteria {
    Text {
        value: String,
    },
    Date {
        from: Option<Date>,
        to: Option<Date>,
    },
    Number {
        from: Option<f64>,
        to: Option<f64>,
    },
    Boolean {
        value: Option<bool>,
    },
    Choice {
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub label: &'static str,
    pub criteria: FilterCriteria,
}

impl Filter {
    pub fn for_column(column: &Column) -> Self {
        let criteria = match column.kind {
            ColumnKind::Date => FilterCriteria::Date {
                from: None,
                to: None,
            },
            ColumnKind::Number => FilterCriteria::Number {
                from: None,
                to: None,
            },
            ColumnKind::Boolean => FilterCriteria::Boolean { value: None },
            ColumnKind::Choice => FilterCriteria::Choice {
                value: String::new(),
            },
            ColumnKind::Text | ColumnKind::Image | ColumnKind::Actions => FilterCriteria::Text {
                value: String::new(),
            },
        };
        Self {
            label: column.label,
            criteria,
        }
    }

    pub fn is_active(&self) -> bool {
        match &self.criteria {
            FilterCriteria::Text { value } | FilterCriteria::Choice { value } => {
                !value.trim().is_empty()
            }
            FilterCriteria::Date { from, to } => from.is_some() || to.is_some(),
            FilterCriteria::Number { from, to } => from.is_some() || to.is_some(),
            FilterCriteria::Boolean { value } => value.is_some(),
        }
    }

    pub fn clear(&mut self) {
        match &mut self.criteria {
            FilterCriteria::Text { value } | FilterCriteria::Choice { value } => value.clear(),
            FilterCriteria::Date { from, to } => {
                *from = None;
                *to = None;
            }
            FilterCriteria::Number { from, to } => {
                *from = None;
                *to = None;
            }
            FilterCriteria::Boolean { value } => *value = None,
        }
    }

    /// Whether `cell` passes this filter. Inert filters match everything;
    /// an active range filter excludes cells with no value to compare.
    pub fn matches(&self, cell: &CellValue) -> bool {
        if !self.is_active() {
            return true;
        }
        match &self.criteria {
            FilterCriteria::Text { value } => cell
                .display()
                .to_lowercase()
                .contains(&value.trim().to_lowercase()),
            FilterCriteria::Choice { value } => {
                cell.display().eq_ignore_ascii_case(value.trim())
            }
            FilterCriteria::Date { from, to } => match cell.date() {
                Some(date) => {
                    from.is_none_or(|from| date >= from) && to.is_none_or(|to| date <= to)
                }
                None => false,
            },
            FilterCriteria::Number { from, to } => match cell.numeric() {
                Some(number) => {
                    from.is_none_or(|from| number >= from) && to.is_none_or(|to| number <= to)
                }
                None => false,
            },
            FilterCriteria::Boolean { value } => match cell {
                CellValue::Bool(Some(flag)) => Some(*flag) == *value,
                _ => false,
            },
        }
    }
}

/// Filters keyed by column key, kept in column order so application order
/// is deterministic.
pub type FilterMap = Vec<(&'static str, Filter)>;

/// One filter slot per column except the actions pseudo-column.
pub fn derive_filters(columns: &[Column]) -> FilterMap {
    columns
        .iter()
        .filter(|column| column.key != ACTIONS_COLUMN)
        .map(|column| (column.key, Filter::for_column(column)))
        .collect()
}

pub fn any_active(filters: &FilterMap) -> bool {
    filters.iter().any(|(_, filter)| filter.is_active())
}

pub fn clear_all(filters: &mut FilterMap) {
    for (_, filter) in filters.iter_mut() {
        filter.clear();
    }
}

/// AND across columns, applied in map (column) order.
pub fn row_matches(filters: &FilterMap, row: &Row) -> bool {
    filters
        .iter()
        .all(|(key, filter)| filter.matches(&row.cell(key)))
}

#[cfg(test)]
mod tests {
    use super::{Filter, FilterCriteria, any_active, derive_filters, row_matches};
    use crate::cells::{CellValue, Row};
    use crate::columns::Column;
    use time::{Date, Month};

    fn text_filter(value: &str) -> Filter {
        Filter {
            label: "Status",
            criteria: FilterCriteria::Text {
                value: value.to_owned(),
            },
        }
    }

    fn date(day: u8) -> Date {
        Date::from_calendar_date(2024, Month::May, day).expect("valid date")
    }

    #[test]
    fn empty_filter_is_inert() {
        let filter = text_filter("");
        assert!(!filter.is_active());
        assert!(filter.matches(&CellValue::text("anything")));
    }

    #[test]
    fn text_filter_matches_case_insensitive_substring() {
        let filter = text_filter("activo");
        let values = ["Activo", "Inactivo", "activo"];
        let matched: Vec<&str> = values
            .iter()
            .filter(|value| filter.matches(&CellValue::text(**value)))
            .copied()
            .collect();
        assert_eq!(matched, vec!["Activo", "Inactivo", "activo"]);

        let narrower = text_filter("inac");
        let matched: Vec<&str> = values
            .iter()
            .filter(|value| narrower.matches(&CellValue::text(**value)))
            .copied()
            .collect();
        assert_eq!(matched, vec!["Inactivo"]);
    }

    #[test]
    fn date_range_bounds_are_inclusive_and_optional() {
        let filter = Filter {
            label: "Date",
            criteria: FilterCriteria::Date {
                from: Some(date(10)),
                to: None,
            },
        };
        assert!(filter.matches(&CellValue::Date(Some(date(10)))));
        assert!(filter.matches(&CellValue::Date(Some(date(20)))));
        assert!(!filter.matches(&CellValue::Date(Some(date(9)))));
        assert!(!filter.matches(&CellValue::Date(None)));
    }

    #[test]
    fn number_range_reads_money_in_whole_units() {
        let filter = Filter {
            label: "Amount",
            criteria: FilterCriteria::Number {
                from: Some(1_000.0),
                to: Some(2_000.0),
            },
        };
        assert!(filter.matches(&CellValue::Money(Some(150_000))));
        assert!(!filter.matches(&CellValue::Money(Some(50_000))));
        assert!(!filter.matches(&CellValue::Money(None)));
    }

    #[test]
    fn derive_skips_actions_and_tracks_activity() {
        let columns = vec![
            Column::id("Code"),
            Column::text("name", "Name"),
            Column::actions("Actions"),
        ];
        let mut filters = derive_filters(&columns);
        assert_eq!(filters.len(), 2);
        assert!(!any_active(&filters));

        if let FilterCriteria::Text { value } = &mut filters[1].1.criteria {
            value.push_str("andes");
        }
        assert!(any_active(&filters));
    }

    #[test]
    fn row_matching_is_and_across_columns() {
        let columns = vec![Column::text("name", "Name"), Column::text("status", "Status")];
        let mut filters = derive_filters(&columns);
        if let FilterCriteria::Text { value } = &mut filters[0].1.criteria {
            value.push_str("torre");
        }
        if let FilterCriteria::Text { value } = &mut filters[1].1.criteria {
            value.push_str("active");
        }

        let matching = Row::new(
            "r1",
            vec![
                ("name", CellValue::text("Torre Central")),
                ("status", CellValue::text("Active")),
            ],
        );
        let wrong_status = Row::new(
            "r2",
            vec![
                ("name", CellValue::text("Torre Norte")),
                ("status", CellValue::text("Draft")),
            ],
        );
        assert!(row_matches(&filters, &matching));
        assert!(!row_matches(&filters, &wrong_status));
    }
}
