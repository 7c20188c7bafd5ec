// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::cells::Row;
use crate::columns::{ACTIONS_COLUMN, Column, ColumnKind};
use crate::dialogs::ConfirmRequest;
use crate::filters::{FilterMap, any_active, clear_all, derive_filters, row_matches};
use crate::forms::FormPayload;
use crate::pagination::Pagination;
use crate::state::PageKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Single active sort. Reset to `{None, Asc}` on every data reload;
/// changed only by column-header interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortConfig {
    pub column: Option<&'static str>,
    pub direction: SortDirection,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            column: None,
            direction: SortDirection::Asc,
        }
    }
}

impl SortConfig {
    /// The header-interaction rule: unsortable columns yield nothing; the
    /// active ascending column flips to descending; anything else starts
    /// ascending on that column.
    pub fn toggled(&self, column: &Column) -> Option<Self> {
        if !column.sortable {
            return None;
        }
        let direction =
            if self.column == Some(column.key) && self.direction == SortDirection::Asc {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            };
        Some(Self {
            column: Some(column.key),
            direction,
        })
    }
}

/// Which records a page asks its gateway for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageQuery {
    Clients,
    Projects,
    Takeoffs,
    TakeoffProducts { takeoff_id: String },
}

/// The entity data service as seen by a list page. Implemented over the
/// remote API by the binary and over canned data by the demo/test gateways.
pub trait DataGateway {
    fn fetch_all(&mut self, query: &PageQuery) -> Result<Vec<Row>>;
    fn search(&mut self, query: &PageQuery, term: &str) -> Result<Vec<Row>>;
    fn create(&mut self, query: &PageQuery, payload: &FormPayload) -> Result<Row>;
    fn update(&mut self, query: &PageQuery, id: &str, payload: &FormPayload) -> Result<Row>;
    fn delete(&mut self, query: &PageQuery, id: &str) -> Result<bool>;

    /// External "reload now" signal (take-off totals change when products
    /// are edited). Polled by the event loop; `None` when quiet.
    fn poll_refresh(&mut self) -> Option<PageKind> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    ConnectionError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Load,
    Reload,
    Search,
}

impl FetchKind {
    const fn verb(self) -> &'static str {
        match self {
            Self::Load => "loading",
            Self::Reload => "reloading",
            Self::Search => "searching",
        }
    }
}

/// Issued by `begin_fetch`; a completion whose ticket is no longer the
/// latest issued request is discarded without touching state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub id: u64,
    pub kind: FetchKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListEvent {
    LoadStateChanged(LoadState),
    WorkingSetReplaced { total: usize },
    SortChanged(SortConfig),
    PinToggled { id: String, pinned: bool },
    PageChanged(usize),
    PageSizeChanged(usize),
    ColumnsChanged,
    FiltersChanged { active: bool },
    MutationSucceeded { message: String },
    OperationFailed { context: String, message: String },
    StaleResponseDiscarded { request_id: u64 },
}

/// Pinned rows first, then the rest; each partition keeps its incoming
/// relative order and nothing is dropped.
pub fn partition_pinned(rows: Vec<Row>, pinned: &BTreeSet<String>) -> Vec<Row> {
    let (mut pinned_rows, unpinned): (Vec<Row>, Vec<Row>) = rows
        .into_iter()
        .partition(|row| pinned.contains(&row.id));
    pinned_rows.extend(unpinned);
    pinned_rows
}

/// One list page: search, filter, sort, pin, paginate and column
/// customization over an in-memory working set fetched from the gateway.
/// Shared by every entity page; only the query, title and column set vary.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage {
    pub query: PageQuery,
    pub title: &'static str,
    pub columns: Vec<Column>,
    pub default_columns: Vec<Column>,
    pub filters: FilterMap,
    pub unique_values: Vec<(&'static str, Vec<String>)>,
    pub search_term: String,
    pub sort: SortConfig,
    pub pagination: Pagination,
    pub pinned: BTreeSet<String>,
    /// Full unfiltered fetch snapshot; search/filter/reset recompute from
    /// here without refetching.
    pub original: Vec<Row>,
    /// The working set currently displayed.
    pub rows: Vec<Row>,
    pub load_state: LoadState,
    latest_request: u64,
}

impl ListPage {
    pub fn new(query: PageQuery, title: &'static str, columns: Vec<Column>) -> Self {
        let filters = derive_filters(&columns);
        Self {
            query,
            title,
            default_columns: columns.clone(),
            columns,
            filters,
            unique_values: Vec::new(),
            search_term: String::new(),
            sort: SortConfig::default(),
            pagination: Pagination::default(),
            pinned: BTreeSet::new(),
            original: Vec::new(),
            rows: Vec::new(),
            load_state: LoadState::Idle,
            latest_request: 0,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.load_state == LoadState::Loading
    }

    pub fn has_active_filters(&self) -> bool {
        any_active(&self.filters)
    }

    /// Rows of the current pagination page.
    pub fn visible_rows(&self) -> &[Row] {
        self.pagination.page_slice(&self.rows)
    }

    // --- fetch plumbing -------------------------------------------------

    pub fn begin_fetch(&mut self, kind: FetchKind) -> FetchTicket {
        self.latest_request += 1;
        self.load_state = LoadState::Loading;
        FetchTicket {
            id: self.latest_request,
            kind,
        }
    }

    /// Single ingestion point for fetch outcomes. The loading state always
    /// ends here for the matching request, success or failure.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Row>>,
    ) -> Vec<ListEvent> {
        if ticket.id != self.latest_request {
            return vec![ListEvent::StaleResponseDiscarded {
                request_id: ticket.id,
            }];
        }

        match result {
            Ok(rows) => match ticket.kind {
                FetchKind::Load => self.ingest_snapshot(rows, true),
                FetchKind::Reload => self.ingest_snapshot(rows, false),
                FetchKind::Search => self.ingest_search(rows),
            },
            Err(error) => {
                self.load_state = LoadState::ConnectionError;
                vec![
                    ListEvent::LoadStateChanged(LoadState::ConnectionError),
                    ListEvent::OperationFailed {
                        context: format!("{} {}", ticket.kind.verb(), self.title),
                        message: format!("{error:#}"),
                    },
                ]
            }
        }
    }

    pub fn load<G: DataGateway>(&mut self, gateway: &mut G) -> Vec<ListEvent> {
        let ticket = self.begin_fetch(FetchKind::Load);
        let result = gateway.fetch_all(&self.query);
        self.complete_fetch(ticket, result)
    }

    fn reload<G: DataGateway>(&mut self, gateway: &mut G) -> Vec<ListEvent> {
        let ticket = self.begin_fetch(FetchKind::Reload);
        let result = gateway.fetch_all(&self.query);
        self.complete_fetch(ticket, result)
    }

    /// Clears the connection-error flag and re-runs the initial load.
    pub fn retry<G: DataGateway>(&mut self, gateway: &mut G) -> Vec<ListEvent> {
        self.load(gateway)
    }

    fn ingest_snapshot(&mut self, rows: Vec<Row>, derive: bool) -> Vec<ListEvent> {
        self.original = rows;
        if derive {
            self.filters = derive_filters(&self.columns);
        }
        self.unique_values = compute_unique_values(&self.columns, &self.original);
        self.sort = SortConfig::default();
        self.search_term.clear();
        self.rows = self.working_set_from_snapshot();
        self.pagination.set_total(self.rows.len());
        self.pagination.reset_page();
        self.load_state = LoadState::Loaded;
        vec![
            ListEvent::LoadStateChanged(LoadState::Loaded),
            ListEvent::WorkingSetReplaced {
                total: self.rows.len(),
            },
        ]
    }

    fn ingest_search(&mut self, rows: Vec<Row>) -> Vec<ListEvent> {
        self.rows = partition_pinned(rows, &self.pinned);
        self.pagination.set_total(self.rows.len());
        self.pagination.reset_page();
        self.load_state = LoadState::Loaded;
        vec![
            ListEvent::LoadStateChanged(LoadState::Loaded),
            ListEvent::WorkingSetReplaced {
                total: self.rows.len(),
            },
        ]
    }

    /// Pinned rows are exempt from filtering: they come through from the
    /// snapshot unconditionally, ahead of the unpinned rows that pass every
    /// active filter.
    fn working_set_from_snapshot(&self) -> Vec<Row> {
        let mut result: Vec<Row> = self
            .original
            .iter()
            .filter(|row| self.pinned.contains(&row.id))
            .cloned()
            .collect();
        let filters_active = any_active(&self.filters);
        result.extend(
            self.original
                .iter()
                .filter(|row| !self.pinned.contains(&row.id))
                .filter(|row| !filters_active || row_matches(&self.filters, row))
                .cloned(),
        );
        result
    }

    // --- search ---------------------------------------------------------

    /// Blank terms reset to the snapshot (plus filters) without a service
    /// call; anything else is delegated to the gateway's search.
    pub fn search<G: DataGateway>(&mut self, gateway: &mut G, term: &str) -> Vec<ListEvent> {
        self.search_term = term.to_owned();
        let trimmed = term.trim();
        if trimmed.is_empty() {
            self.rows = self.working_set_from_snapshot();
            self.pagination.set_total(self.rows.len());
            self.pagination.reset_page();
            return vec![ListEvent::WorkingSetReplaced {
                total: self.rows.len(),
            }];
        }

        let ticket = self.begin_fetch(FetchKind::Search);
        let result = gateway.search(&self.query, trimmed);
        self.complete_fetch(ticket, result)
    }

    // --- filters --------------------------------------------------------

    pub fn apply_filters(&mut self, filters: FilterMap) -> Vec<ListEvent> {
        self.filters = filters;
        self.rows = self.working_set_from_snapshot();
        self.pagination.set_total(self.rows.len());
        self.pagination.reset_page();
        vec![
            ListEvent::FiltersChanged {
                active: self.has_active_filters(),
            },
            ListEvent::WorkingSetReplaced {
                total: self.rows.len(),
            },
        ]
    }

    /// Restores the unfiltered, unsearched working set (pin partition
    /// aside).
    pub fn clear_filters(&mut self) -> Vec<ListEvent> {
        clear_all(&mut self.filters);
        self.search_term.clear();
        self.rows = partition_pinned(self.original.clone(), &self.pinned);
        self.pagination.set_total(self.rows.len());
        self.pagination.reset_page();
        vec![
            ListEvent::FiltersChanged { active: false },
            ListEvent::WorkingSetReplaced {
                total: self.rows.len(),
            },
        ]
    }

    // --- sort -----------------------------------------------------------

    /// Sorts the pinned and unpinned partitions of the current working set
    /// independently, then concatenates pinned-first.
    pub fn apply_sort(&mut self, sort: SortConfig) -> Vec<ListEvent> {
        self.sort = sort;
        let Some(column) = sort.column else {
            return vec![ListEvent::SortChanged(sort)];
        };

        let rows = std::mem::take(&mut self.rows);
        let (mut pinned_rows, mut unpinned): (Vec<Row>, Vec<Row>) = rows
            .into_iter()
            .partition(|row| self.pinned.contains(&row.id));
        let compare = |left: &Row, right: &Row| {
            let ordering = left.cell(column).cmp_value(&right.cell(column));
            match sort.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        };
        pinned_rows.sort_by(compare);
        unpinned.sort_by(compare);
        pinned_rows.extend(unpinned);
        self.rows = pinned_rows;
        vec![ListEvent::SortChanged(sort)]
    }

    // --- pinning --------------------------------------------------------

    /// Flips pin membership and re-partitions the current working set
    /// without refetching or re-filtering.
    pub fn toggle_pin(&mut self, id: &str) -> Vec<ListEvent> {
        let now_pinned = if self.pinned.contains(id) {
            self.pinned.remove(id);
            false
        } else {
            self.pinned.insert(id.to_owned());
            true
        };
        self.rows = partition_pinned(std::mem::take(&mut self.rows), &self.pinned);
        vec![ListEvent::PinToggled {
            id: id.to_owned(),
            pinned: now_pinned,
        }]
    }

    // --- columns --------------------------------------------------------

    /// Commits a reorder/visibility change emitted by the table presenter.
    pub fn set_columns(&mut self, columns: Vec<Column>) -> Vec<ListEvent> {
        self.columns = columns;
        vec![ListEvent::ColumnsChanged]
    }

    /// Commits the column dialog's staged list; the committed list becomes
    /// the new reset target.
    pub fn apply_column_dialog(&mut self, staged: Vec<Column>) -> Vec<ListEvent> {
        self.columns = staged.clone();
        self.default_columns = staged;
        vec![ListEvent::ColumnsChanged]
    }

    pub fn reset_columns(&mut self) -> Vec<ListEvent> {
        self.columns = self.default_columns.clone();
        vec![ListEvent::ColumnsChanged]
    }

    // --- pagination -----------------------------------------------------

    pub fn change_page(&mut self, page: usize) -> Vec<ListEvent> {
        if self.pagination.change_page(page) {
            vec![ListEvent::PageChanged(page)]
        } else {
            Vec::new()
        }
    }

    pub fn set_page_size(&mut self, size: usize) -> Vec<ListEvent> {
        if size == 0 {
            return Vec::new();
        }
        let mut events = Vec::new();
        if self.pagination.set_page_size(size) {
            events.push(ListEvent::PageChanged(self.pagination.current_page));
        }
        events.push(ListEvent::PageSizeChanged(size));
        events
    }

    // --- mutations ------------------------------------------------------

    pub fn delete_prompt(&self, id: &str) -> ConfirmRequest {
        ConfirmRequest {
            title: format!("Delete {}", entity_label(self.title)),
            message: format!(
                "Delete {} {id}? This cannot be undone from here.",
                entity_label(self.title)
            ),
            confirm_label: "Delete",
            cancel_label: "Cancel",
        }
    }

    pub fn delete_confirmed<G: DataGateway>(
        &mut self,
        gateway: &mut G,
        id: &str,
    ) -> Vec<ListEvent> {
        let context = format!("deleting {}", entity_label(self.title));
        match gateway.delete(&self.query, id) {
            Ok(true) => {
                let mut events = vec![ListEvent::MutationSucceeded {
                    message: format!("{} {id} deleted", entity_label(self.title)),
                }];
                events.extend(self.reload(gateway));
                events
            }
            Ok(false) => vec![ListEvent::OperationFailed {
                context,
                message: "the service rejected the deletion".to_owned(),
            }],
            Err(error) => vec![ListEvent::OperationFailed {
                context,
                message: format!("{error:#}"),
            }],
        }
    }

    pub fn create<G: DataGateway>(
        &mut self,
        gateway: &mut G,
        payload: &FormPayload,
    ) -> Vec<ListEvent> {
        let context = format!("creating {}", entity_label(self.title));
        if let Err(error) = payload.validate() {
            return vec![ListEvent::OperationFailed {
                context,
                message: format!("{error:#}"),
            }];
        }
        match gateway.create(&self.query, payload) {
            Ok(row) => {
                let mut events = vec![ListEvent::MutationSucceeded {
                    message: format!("{} {} created", entity_label(self.title), row.id),
                }];
                events.extend(self.reload(gateway));
                events
            }
            Err(error) => vec![ListEvent::OperationFailed {
                context,
                message: format!("{error:#}"),
            }],
        }
    }

    pub fn update<G: DataGateway>(
        &mut self,
        gateway: &mut G,
        id: &str,
        payload: &FormPayload,
    ) -> Vec<ListEvent> {
        let context = format!("updating {}", entity_label(self.title));
        if let Err(error) = payload.validate() {
            return vec![ListEvent::OperationFailed {
                context,
                message: format!("{error:#}"),
            }];
        }
        match gateway.update(&self.query, id, payload) {
            Ok(_) => {
                let mut events = vec![ListEvent::MutationSucceeded {
                    message: format!("{} {id} updated", entity_label(self.title)),
                }];
                events.extend(self.reload(gateway));
                events
            }
            Err(error) => vec![ListEvent::OperationFailed {
                context,
                message: format!("{error:#}"),
            }],
        }
    }
}

/// Singular label for notices: "clients" -> "client".
fn entity_label(title: &str) -> &str {
    title.strip_suffix('s').unwrap_or(title)
}

fn compute_unique_values(
    columns: &[Column],
    rows: &[Row],
) -> Vec<(&'static str, Vec<String>)> {
    columns
        .iter()
        .filter(|column| column.kind == ColumnKind::Text && column.key != ACTIONS_COLUMN)
        .map(|column| {
            let values: BTreeSet<String> = rows
                .iter()
                .map(|row| row.cell(column.key).display())
                .filter(|value| !value.is_empty())
                .collect();
            (column.key, values.into_iter().collect())
        })
        .collect()
}
