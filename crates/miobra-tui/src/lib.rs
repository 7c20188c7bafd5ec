// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::{execute, terminal};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row as WidgetRow, Table, Tabs};
use time::{Date, Month};

use miobra_app::{
    AppCommand, AppState, ClientFormInput, ClientStatus, Column, ColumnDialog, ColumnKind,
    ConfirmRequest, DataGateway, FilterCriteria, FilterDialog, FormPayload, ListEvent, ListPage,
    LoadState, PageKind, ProductFormInput, ProjectFormInput, ProjectStatus, Row, SortDirection,
    TakeoffFormInput, TakeoffStatus, clients_page, format::format_date, move_column,
    products_page, projects_page, takeoffs_page, toggle_visibility, visible_columns,
    MAX_DISPLAYED_PAGES, PAGE_SIZE_OPTIONS,
};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Every table interaction arrives as one of these commands; the handler
/// translates it into controller calls. The table itself never owns data,
/// so an unsortable column, a fixed column or an invalid move simply
/// produces no call at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableCommand {
    MoveRow(isize),
    MoveColumn(isize),
    JumpFirstRow,
    JumpLastRow,
    JumpFirstColumn,
    JumpLastColumn,
    CycleSort,
    TogglePin,
    MoveColumnLeft,
    MoveColumnRight,
    HideColumn,
    OpenColumnMenu,
    NextDataPage,
    PrevDataPage,
    CyclePageSize,
    EditRow,
    DeleteRow,
    NewRow,
    Activate,
    OpenFilters,
    ClearFilters,
    OpenColumns,
    OpenSearch,
    Reload,
    Back,
}

fn table_command_for_key(key: KeyEvent) -> Option<TableCommand> {
    match (key.code, key.modifiers) {
        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(TableCommand::MoveRow(1)),
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(TableCommand::MoveRow(-1)),
        (KeyCode::Char('h'), _) | (KeyCode::Left, _) => Some(TableCommand::MoveColumn(-1)),
        (KeyCode::Char('l'), _) | (KeyCode::Right, _) => Some(TableCommand::MoveColumn(1)),
        (KeyCode::Char('g'), _) => Some(TableCommand::JumpFirstRow),
        (KeyCode::Char('G'), _) => Some(TableCommand::JumpLastRow),
        (KeyCode::Char('^'), _) => Some(TableCommand::JumpFirstColumn),
        (KeyCode::Char('$'), _) => Some(TableCommand::JumpLastColumn),
        (KeyCode::Char('s'), KeyModifiers::NONE) => Some(TableCommand::CycleSort),
        (KeyCode::Char('p'), KeyModifiers::NONE) => Some(TableCommand::TogglePin),
        (KeyCode::Char('<'), _) => Some(TableCommand::MoveColumnLeft),
        (KeyCode::Char('>'), _) => Some(TableCommand::MoveColumnRight),
        (KeyCode::Char('H'), _) => Some(TableCommand::HideColumn),
        (KeyCode::Char('v'), KeyModifiers::NONE) => Some(TableCommand::OpenColumnMenu),
        (KeyCode::Char(']'), _) => Some(TableCommand::NextDataPage),
        (KeyCode::Char('['), _) => Some(TableCommand::PrevDataPage),
        (KeyCode::Char('+'), _) => Some(TableCommand::CyclePageSize),
        (KeyCode::Char('e'), KeyModifiers::NONE) => Some(TableCommand::EditRow),
        (KeyCode::Char('d'), KeyModifiers::NONE) => Some(TableCommand::DeleteRow),
        (KeyCode::Char('n'), KeyModifiers::NONE) => Some(TableCommand::NewRow),
        (KeyCode::Enter, _) => Some(TableCommand::Activate),
        (KeyCode::Char('f'), KeyModifiers::NONE) => Some(TableCommand::OpenFilters),
        (KeyCode::Char('F'), _) => Some(TableCommand::ClearFilters),
        (KeyCode::Char('c'), KeyModifiers::NONE) => Some(TableCommand::OpenColumns),
        (KeyCode::Char('/'), _) => Some(TableCommand::OpenSearch),
        (KeyCode::Char('r'), KeyModifiers::NONE) => Some(TableCommand::Reload),
        (KeyCode::Esc, _) | (KeyCode::Backspace, _) => Some(TableCommand::Back),
        _ => None,
    }
}

/// The presenter's filtering pass-through: with no active filters the rows
/// come back untouched; with filters active, pinned rows are included
/// unconditionally ahead of the unpinned rows that pass the caller's
/// predicate.
pub fn filtered_rows<'a, F>(
    rows: &'a [Row],
    pinned: &std::collections::BTreeSet<String>,
    filters_active: bool,
    predicate: F,
) -> Vec<&'a Row>
where
    F: Fn(&Row) -> bool,
{
    if !filters_active {
        return rows.iter().collect();
    }
    let mut result: Vec<&Row> = rows.iter().filter(|row| pinned.contains(&row.id)).collect();
    result.extend(
        rows.iter()
            .filter(|row| !pinned.contains(&row.id))
            .filter(|row| predicate(row)),
    );
    result
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct TableUiState {
    selected_row: usize,
    selected_col: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ColumnMenuUiState {
    visible: bool,
    cursor: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SearchUiState {
    active: bool,
    input: String,
}

impl Default for SearchUiState {
    fn default() -> Self {
        Self {
            active: false,
            input: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ConfirmUiState {
    request: ConfirmRequest,
    target_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FormField {
    label: &'static str,
    value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FormUiState {
    fields: Vec<FormField>,
    cursor: usize,
    /// `Some(id)` when editing an existing record, `None` when creating.
    editing: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PreviewKind {
    RowDetail,
    Image,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PreviewUiState {
    kind: PreviewKind,
    title: String,
    body: String,
}

#[derive(Debug)]
struct DetailEntry {
    takeoff_label: String,
    page: ListPage,
    saved_table_state: TableUiState,
}

#[derive(Debug)]
struct ViewData {
    clients: ListPage,
    projects: ListPage,
    takeoffs: ListPage,
    detail_stack: Vec<DetailEntry>,
    table_state: TableUiState,
    search: SearchUiState,
    filter_dialog: Option<FilterDialog>,
    column_dialog: Option<ColumnDialog>,
    column_menu: ColumnMenuUiState,
    confirm: Option<ConfirmUiState>,
    form: Option<FormUiState>,
    preview: Option<PreviewUiState>,
    help_visible: bool,
    filter_cursor_field: usize,
}

impl ViewData {
    fn new() -> Self {
        Self {
            clients: clients_page(),
            projects: projects_page(),
            takeoffs: takeoffs_page(),
            detail_stack: Vec::new(),
            table_state: TableUiState::default(),
            search: SearchUiState::default(),
            filter_dialog: None,
            column_dialog: None,
            column_menu: ColumnMenuUiState::default(),
            confirm: None,
            form: None,
            preview: None,
            help_visible: false,
            filter_cursor_field: 0,
        }
    }

    fn active_page(&self, state: &AppState) -> &ListPage {
        if let Some(entry) = self.detail_stack.last() {
            return &entry.page;
        }
        match state.active_page {
            PageKind::Clients => &self.clients,
            PageKind::Projects => &self.projects,
            PageKind::Takeoffs => &self.takeoffs,
        }
    }

    fn active_page_mut(&mut self, state: &AppState) -> &mut ListPage {
        if let Some(entry) = self.detail_stack.last_mut() {
            return &mut entry.page;
        }
        match state.active_page {
            PageKind::Clients => &mut self.clients,
            PageKind::Projects => &mut self.projects,
            PageKind::Takeoffs => &mut self.takeoffs,
        }
    }

    fn in_product_drill(&self) -> bool {
        !self.detail_stack.is_empty()
    }

    fn selected_row_id(&self, state: &AppState) -> Option<String> {
        let page = self.active_page(state);
        page.visible_rows()
            .get(self.table_state.selected_row)
            .map(|row| row.id.clone())
    }

    fn selected_column(&self, state: &AppState) -> Option<Column> {
        let page = self.active_page(state);
        page.columns.get(self.table_state.selected_col).cloned()
    }

    fn clamp_cursor(&mut self, state: &AppState) {
        let (rows, columns) = {
            let page = self.active_page(state);
            (page.visible_rows().len(), page.columns.len())
        };
        if rows == 0 {
            self.table_state.selected_row = 0;
        } else {
            self.table_state.selected_row = self.table_state.selected_row.min(rows - 1);
        }
        if columns == 0 {
            self.table_state.selected_col = 0;
        } else {
            self.table_state.selected_col = self.table_state.selected_col.min(columns - 1);
        }
    }
}

/// Routes controller events into the status line: mutation successes and
/// failures funnel through here, everything else becomes a short notice.
fn report_events(state: &mut AppState, title: &str, events: &[ListEvent]) {
    for event in events {
        match event {
            ListEvent::OperationFailed { context, message } => {
                state.set_status(format!("error {context}: {message}"));
            }
            ListEvent::MutationSucceeded { message } => {
                state.set_status(message.clone());
            }
            ListEvent::WorkingSetReplaced { total } => {
                state.set_status(format!("{total} {title}"));
            }
            ListEvent::SortChanged(sort) => {
                if let Some(column) = sort.column {
                    let direction = match sort.direction {
                        SortDirection::Asc => "asc",
                        SortDirection::Desc => "desc",
                    };
                    state.set_status(format!("sort {column} {direction}"));
                }
            }
            ListEvent::PinToggled { pinned, .. } => {
                state.set_status(if *pinned { "pin on" } else { "pin off" });
            }
            ListEvent::PageChanged(page) => {
                state.set_status(format!("page {page}"));
            }
            ListEvent::PageSizeChanged(size) => {
                state.set_status(format!("{size}/page"));
            }
            ListEvent::FiltersChanged { active } => {
                state.set_status(if *active { "filters on" } else { "filters off" });
            }
            ListEvent::LoadStateChanged(LoadState::ConnectionError) => {
                state.set_status("connection error -- press r to retry");
            }
            ListEvent::LoadStateChanged(_)
            | ListEvent::ColumnsChanged
            | ListEvent::StaleResponseDiscarded { .. } => {}
        }
    }
}

pub fn run_app<G: DataGateway>(
    state: &mut AppState,
    gateway: &mut G,
    page_size: usize,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::new();
    if page_size > 0 {
        for page in [
            &mut view_data.clients,
            &mut view_data.projects,
            &mut view_data.takeoffs,
        ] {
            page.pagination.items_per_page = page_size;
        }
    }
    let events = view_data.active_page_mut(state).load(gateway);
    let title = view_data.active_page(state).title;
    report_events(state, title, &events);

    let result = event_loop(&mut terminal, state, gateway, &mut view_data);

    disable_raw_mode().context("disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        terminal::LeaveAlternateScreen
    )
    .context("leave alternate screen")?;
    result
}

fn event_loop<G: DataGateway>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut AppState,
    gateway: &mut G,
    view_data: &mut ViewData,
) -> Result<()> {
    loop {
        terminal
            .draw(|frame| render(frame, state, view_data))
            .context("draw frame")?;

        process_refresh_signals(state, gateway, view_data);

        if !event::poll(POLL_INTERVAL).context("poll terminal events")? {
            continue;
        }
        let Event::Key(key) = event::read().context("read terminal event")? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if handle_key(state, gateway, view_data, key)? {
            return Ok(());
        }
    }
}

/// The take-off list observes an external "reload now" channel; product
/// mutations change take-off totals, so the signal re-runs that page's
/// load when it has data on screen.
fn process_refresh_signals<G: DataGateway>(
    state: &mut AppState,
    gateway: &mut G,
    view_data: &mut ViewData,
) {
    while let Some(page_kind) = gateway.poll_refresh() {
        if page_kind == PageKind::Takeoffs && view_data.takeoffs.load_state == LoadState::Loaded {
            let events = view_data.takeoffs.load(gateway);
            report_events(state, view_data.takeoffs.title, &events);
        }
    }
}

/// Returns `Ok(true)` when the app should exit.
fn handle_key<G: DataGateway>(
    state: &mut AppState,
    gateway: &mut G,
    view_data: &mut ViewData,
    key: KeyEvent,
) -> Result<bool> {
    if view_data.help_visible {
        view_data.help_visible = false;
        return Ok(false);
    }
    if view_data.preview.is_some() {
        view_data.preview = None;
        return Ok(false);
    }
    if view_data.confirm.is_some() {
        handle_confirm_key(state, gateway, view_data, key);
        return Ok(false);
    }
    if view_data.form.is_some() {
        handle_form_key(state, gateway, view_data, key);
        return Ok(false);
    }
    if view_data.search.active {
        handle_search_key(state, gateway, view_data, key);
        return Ok(false);
    }
    if view_data.filter_dialog.is_some() {
        handle_filter_dialog_key(state, view_data, key);
        return Ok(false);
    }
    if view_data.column_dialog.is_some() {
        handle_column_dialog_key(state, view_data, key);
        return Ok(false);
    }
    if view_data.column_menu.visible {
        handle_column_menu_key(state, view_data, key);
        return Ok(false);
    }

    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), KeyModifiers::NONE) => return Ok(true),
        (KeyCode::Char('?'), _) => {
            view_data.help_visible = true;
            return Ok(false);
        }
        (KeyCode::Tab, _) => {
            if !view_data.in_product_drill() {
                let events = state.dispatch(AppCommand::NextPage);
                after_page_switch(state, gateway, view_data, events);
            }
            return Ok(false);
        }
        (KeyCode::BackTab, _) => {
            if !view_data.in_product_drill() {
                let events = state.dispatch(AppCommand::PrevPage);
                after_page_switch(state, gateway, view_data, events);
            }
            return Ok(false);
        }
        _ => {}
    }

    if let Some(command) = table_command_for_key(key) {
        apply_table_command(state, gateway, view_data, command);
    }
    Ok(false)
}

fn after_page_switch<G: DataGateway>(
    state: &mut AppState,
    gateway: &mut G,
    view_data: &mut ViewData,
    _events: Vec<miobra_app::AppEvent>,
) {
    view_data.table_state = TableUiState::default();
    view_data.search = SearchUiState::default();
    if view_data.active_page(state).load_state == LoadState::Idle {
        let events = view_data.active_page_mut(state).load(gateway);
        let title = view_data.active_page(state).title;
        report_events(state, title, &events);
    }
}

fn apply_table_command<G: DataGateway>(
    state: &mut AppState,
    gateway: &mut G,
    view_data: &mut ViewData,
    command: TableCommand,
) {
    match command {
        TableCommand::MoveRow(delta) => {
            move_row_cursor(state, view_data, delta);
        }
        TableCommand::MoveColumn(delta) => {
            move_column_cursor(state, view_data, delta);
        }
        TableCommand::JumpFirstRow => {
            view_data.table_state.selected_row = 0;
        }
        TableCommand::JumpLastRow => {
            let rows = view_data.active_page(state).visible_rows().len();
            view_data.table_state.selected_row = rows.saturating_sub(1);
        }
        TableCommand::JumpFirstColumn => {
            view_data.table_state.selected_col = 0;
        }
        TableCommand::JumpLastColumn => {
            let columns = view_data.active_page(state).columns.len();
            view_data.table_state.selected_col = columns.saturating_sub(1);
        }
        TableCommand::CycleSort => {
            let Some(column) = view_data.selected_column(state) else {
                return;
            };
            let page = view_data.active_page_mut(state);
            // unsortable columns are a silent no-op
            let Some(sort) = page.sort.toggled(&column) else {
                return;
            };
            let title = page.title;
            let events = page.apply_sort(sort);
            report_events(state, title, &events);
            view_data.clamp_cursor(state);
        }
        TableCommand::TogglePin => {
            let Some(id) = view_data.selected_row_id(state) else {
                return;
            };
            let page = view_data.active_page_mut(state);
            let title = page.title;
            let events = page.toggle_pin(&id);
            report_events(state, title, &events);
        }
        TableCommand::MoveColumnLeft => {
            shift_selected_column(state, view_data, -1);
        }
        TableCommand::MoveColumnRight => {
            shift_selected_column(state, view_data, 1);
        }
        TableCommand::HideColumn => {
            let Some(column) = view_data.selected_column(state) else {
                return;
            };
            let page = view_data.active_page_mut(state);
            // fixed columns are a silent no-op
            let Some(updated) = toggle_visibility(&page.columns, column.key) else {
                return;
            };
            page.set_columns(updated);
            state.set_status(format!("column hidden: {}", column.label));
            view_data.clamp_cursor(state);
        }
        TableCommand::OpenColumnMenu => {
            view_data.column_menu = ColumnMenuUiState {
                visible: true,
                cursor: 0,
            };
        }
        TableCommand::NextDataPage => {
            let page = view_data.active_page_mut(state);
            let title = page.title;
            let next = page.pagination.current_page + 1;
            let events = page.change_page(next);
            report_events(state, title, &events);
            view_data.clamp_cursor(state);
        }
        TableCommand::PrevDataPage => {
            let page = view_data.active_page_mut(state);
            let title = page.title;
            let current = page.pagination.current_page;
            if current > 1 {
                let events = page.change_page(current - 1);
                report_events(state, title, &events);
            }
            view_data.clamp_cursor(state);
        }
        TableCommand::CyclePageSize => {
            let page = view_data.active_page_mut(state);
            let title = page.title;
            let current = page.pagination.items_per_page;
            let position = PAGE_SIZE_OPTIONS
                .iter()
                .position(|size| *size == current)
                .unwrap_or(0);
            let next = PAGE_SIZE_OPTIONS[(position + 1) % PAGE_SIZE_OPTIONS.len()];
            let events = page.set_page_size(next);
            report_events(state, title, &events);
            view_data.clamp_cursor(state);
        }
        TableCommand::EditRow => {
            open_form(state, view_data, true);
        }
        TableCommand::NewRow => {
            open_form(state, view_data, false);
        }
        TableCommand::DeleteRow => {
            let Some(id) = view_data.selected_row_id(state) else {
                return;
            };
            let request = view_data.active_page(state).delete_prompt(&id);
            view_data.confirm = Some(ConfirmUiState {
                request,
                target_id: id,
            });
        }
        TableCommand::Activate => {
            activate_selection(state, gateway, view_data);
        }
        TableCommand::OpenFilters => {
            let dialog = FilterDialog::open(&view_data.active_page(state).filters);
            view_data.filter_dialog = Some(dialog);
            view_data.filter_cursor_field = 0;
        }
        TableCommand::ClearFilters => {
            let page = view_data.active_page_mut(state);
            let title = page.title;
            let events = page.clear_filters();
            report_events(state, title, &events);
            view_data.clamp_cursor(state);
        }
        TableCommand::OpenColumns => {
            let dialog = ColumnDialog::open(&view_data.active_page(state).columns);
            view_data.column_dialog = Some(dialog);
        }
        TableCommand::OpenSearch => {
            let current = view_data.active_page(state).search_term.clone();
            view_data.search = SearchUiState {
                active: true,
                input: current,
            };
        }
        TableCommand::Reload => {
            let page = view_data.active_page_mut(state);
            let title = page.title;
            let events = if page.load_state == LoadState::ConnectionError {
                page.retry(gateway)
            } else {
                page.load(gateway)
            };
            report_events(state, title, &events);
            view_data.clamp_cursor(state);
        }
        TableCommand::Back => {
            if let Some(entry) = view_data.detail_stack.pop() {
                view_data.table_state = entry.saved_table_state;
                view_data.clamp_cursor(state);
            }
        }
    }
}

fn move_row_cursor(state: &AppState, view_data: &mut ViewData, delta: isize) {
    let rows = view_data.active_page(state).visible_rows().len();
    if rows == 0 {
        view_data.table_state.selected_row = 0;
        return;
    }
    let current = view_data.table_state.selected_row;
    let next = if delta.is_negative() {
        current.saturating_sub(delta.unsigned_abs())
    } else {
        current.saturating_add(delta as usize)
    };
    view_data.table_state.selected_row = next.min(rows - 1);
}

fn move_column_cursor(state: &AppState, view_data: &mut ViewData, delta: isize) {
    let page = view_data.active_page(state);
    let visible: Vec<usize> = page
        .columns
        .iter()
        .enumerate()
        .filter(|(_, column)| column.visible)
        .map(|(index, _)| index)
        .collect();
    if visible.is_empty() {
        view_data.table_state.selected_col = 0;
        return;
    }
    let current_position = visible
        .iter()
        .position(|index| *index >= view_data.table_state.selected_col)
        .unwrap_or(0);
    let next_position = if delta.is_negative() {
        current_position.saturating_sub(delta.unsigned_abs())
    } else {
        current_position.saturating_add(delta as usize)
    };
    view_data.table_state.selected_col = visible[next_position.min(visible.len() - 1)];
}

/// The keyboard analog of dragging a column header: the selected column is
/// the drag source and its visible neighbor is the drop target. Source and
/// target must both be draggable or the move is silently ignored.
fn shift_selected_column(state: &mut AppState, view_data: &mut ViewData, direction: isize) {
    let Some(source) = view_data.selected_column(state) else {
        return;
    };
    let page = view_data.active_page(state);
    let keys: Vec<&'static str> = visible_columns(&page.columns)
        .into_iter()
        .map(|column| column.key)
        .collect();
    let Some(position) = keys.iter().position(|key| *key == source.key) else {
        return;
    };
    let target_position = position as isize + direction;
    if target_position < 0 || target_position as usize >= keys.len() {
        return;
    }
    let target = keys[target_position as usize];

    let page = view_data.active_page_mut(state);
    let Some(reordered) = move_column(&page.columns, source.key, target) else {
        return;
    };
    page.set_columns(reordered);
    let new_index = view_data
        .active_page(state)
        .columns
        .iter()
        .position(|column| column.key == source.key)
        .unwrap_or(0);
    view_data.table_state.selected_col = new_index;
    state.set_status(format!("column moved: {}", source.label));
}

fn activate_selection<G: DataGateway>(
    state: &mut AppState,
    gateway: &mut G,
    view_data: &mut ViewData,
) {
    let Some(id) = view_data.selected_row_id(state) else {
        return;
    };

    // an image cell opens its preview instead of the row action
    if let Some(column) = view_data.selected_column(state)
        && column.kind == ColumnKind::Image
    {
        let reference = view_data
            .active_page(state)
            .visible_rows()
            .get(view_data.table_state.selected_row)
            .map(|row| row.cell(column.key).display());
        if let Some(reference) = reference {
            view_data.preview = Some(PreviewUiState {
                kind: PreviewKind::Image,
                title: "image".to_owned(),
                body: reference,
            });
        }
        return;
    }

    // take-off rows drill into their product list
    if !view_data.in_product_drill() && state.active_page == PageKind::Takeoffs {
        let label = view_data
            .active_page(state)
            .visible_rows()
            .get(view_data.table_state.selected_row)
            .map(|row| row.cell("name").display())
            .unwrap_or_else(|| id.clone());
        let mut page = products_page(id.clone());
        let events = page.load(gateway);
        let saved = view_data.table_state.clone();
        view_data.detail_stack.push(DetailEntry {
            takeoff_label: label,
            page,
            saved_table_state: saved,
        });
        view_data.table_state = TableUiState::default();
        let title = view_data.active_page(state).title;
        report_events(state, title, &events);
        return;
    }

    // everything else shows the row detail
    let detail = {
        let page = view_data.active_page(state);
        page.visible_rows()
            .get(view_data.table_state.selected_row)
            .map(|row| {
                let mut body = String::new();
                for column in visible_columns(&page.columns) {
                    if column.kind == ColumnKind::Actions {
                        continue;
                    }
                    body.push_str(&format!(
                        "{}: {}\n",
                        column.label,
                        row.cell(column.key).display()
                    ));
                }
                (format!("{} {id}", page.title), body)
            })
    };
    if let Some((title, body)) = detail {
        view_data.preview = Some(PreviewUiState {
            kind: PreviewKind::RowDetail,
            title,
            body,
        });
    }
}

fn handle_confirm_key<G: DataGateway>(
    state: &mut AppState,
    gateway: &mut G,
    view_data: &mut ViewData,
    key: KeyEvent,
) {
    let Some(confirm) = view_data.confirm.take() else {
        return;
    };
    match key.code {
        KeyCode::Char('y') | KeyCode::Enter => {
            let page = view_data.active_page_mut(state);
            let title = page.title;
            let events = page.delete_confirmed(gateway, &confirm.target_id);
            report_events(state, title, &events);
            view_data.clamp_cursor(state);
        }
        _ => {
            // anything but an explicit confirmation dismisses
            state.set_status("delete cancelled");
        }
    }
}

fn handle_search_key<G: DataGateway>(
    state: &mut AppState,
    gateway: &mut G,
    view_data: &mut ViewData,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Esc => {
            view_data.search = SearchUiState::default();
        }
        KeyCode::Enter => {
            let term = view_data.search.input.clone();
            view_data.search.active = false;
            let page = view_data.active_page_mut(state);
            let title = page.title;
            let events = page.search(gateway, &term);
            report_events(state, title, &events);
            view_data.clamp_cursor(state);
        }
        KeyCode::Backspace => {
            view_data.search.input.pop();
        }
        KeyCode::Char(character) => {
            view_data.search.input.push(character);
        }
        _ => {}
    }
}

fn handle_filter_dialog_key(state: &mut AppState, view_data: &mut ViewData, key: KeyEvent) {
    let Some(dialog) = view_data.filter_dialog.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Esc => {
            view_data.filter_dialog = None;
            state.set_status("filters unchanged");
        }
        KeyCode::Enter => {
            let dialog = view_data.filter_dialog.take().expect("dialog is open");
            let page = view_data.active_page_mut(state);
            let title = page.title;
            let events = page.apply_filters(dialog.apply());
            report_events(state, title, &events);
            view_data.clamp_cursor(state);
        }
        KeyCode::Char('C') => {
            dialog.clear_staged();
        }
        KeyCode::Down | KeyCode::Tab => {
            dialog.move_cursor(1);
            view_data.filter_cursor_field = 0;
        }
        KeyCode::Up | KeyCode::BackTab => {
            dialog.move_cursor(-1);
            view_data.filter_cursor_field = 0;
        }
        KeyCode::Left => {
            view_data.filter_cursor_field = 0;
        }
        KeyCode::Right => {
            view_data.filter_cursor_field = 1;
        }
        KeyCode::Backspace => {
            edit_staged_filter(dialog, view_data.filter_cursor_field, None);
        }
        KeyCode::Char(character) => {
            edit_staged_filter(dialog, view_data.filter_cursor_field, Some(character));
        }
        _ => {}
    }
}

/// Text filters edit in place; range filters edit their from/to bound as
/// text and re-parse on every keystroke (digits, dots and dashes only).
fn edit_staged_filter(dialog: &mut FilterDialog, field: usize, input: Option<char>) {
    let Some((_, filter)) = dialog.staged.get_mut(dialog.cursor) else {
        return;
    };
    match &mut filter.criteria {
        FilterCriteria::Text { value } | FilterCriteria::Choice { value } => match input {
            Some(character) => value.push(character),
            None => {
                value.pop();
            }
        },
        FilterCriteria::Number { from, to } => {
            let bound = if field == 0 { from } else { to };
            let mut text = bound.map(|value| value.to_string()).unwrap_or_default();
            match input {
                Some(character)
                    if character.is_ascii_digit() || character == '.' || character == '-' =>
                {
                    text.push(character);
                }
                Some(_) => return,
                None => {
                    text.pop();
                }
            }
            *bound = text.parse().ok();
        }
        FilterCriteria::Date { from, to } => {
            let bound = if field == 0 { from } else { to };
            let mut text = bound.map(format_date).unwrap_or_default();
            match input {
                Some(character) if character.is_ascii_digit() || character == '/' => {
                    text.push(character);
                }
                Some(_) => return,
                None => {
                    text.pop();
                }
            }
            *bound = parse_display_date(&text);
        }
        FilterCriteria::Boolean { value } => {
            if input == Some(' ') {
                *value = match value {
                    None => Some(true),
                    Some(true) => Some(false),
                    Some(false) => None,
                };
            }
        }
    }
}

fn handle_column_dialog_key(state: &mut AppState, view_data: &mut ViewData, key: KeyEvent) {
    let Some(dialog) = view_data.column_dialog.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Esc => {
            // cancel restores the previously committed list by discarding
            view_data.column_dialog = None;
            state.set_status("columns unchanged");
        }
        KeyCode::Enter => {
            let dialog = view_data.column_dialog.take().expect("dialog is open");
            let page = view_data.active_page_mut(state);
            let events = page.apply_column_dialog(dialog.apply());
            report_events(state, "columns", &events);
            state.set_status("columns applied");
            view_data.clamp_cursor(state);
        }
        KeyCode::Char('R') => {
            let defaults = view_data.active_page(state).default_columns.clone();
            if let Some(dialog) = view_data.column_dialog.as_mut() {
                dialog.reset_to(&defaults);
            }
        }
        KeyCode::Down | KeyCode::Char('j') => dialog.move_cursor(1),
        KeyCode::Up | KeyCode::Char('k') => dialog.move_cursor(-1),
        KeyCode::Char(' ') => {
            // fixed columns stay put; silent no-op
            dialog.toggle_selected();
        }
        _ => {}
    }
}

/// The quick visibility popup. Any key that is not part of the menu closes
/// it, the terminal counterpart of the outside-click dismissal; the state
/// lives on the view and dies with it.
fn handle_column_menu_key(state: &mut AppState, view_data: &mut ViewData, key: KeyEvent) {
    let togglable: Vec<&'static str> = view_data
        .active_page(state)
        .columns
        .iter()
        .filter(|column| !column.is_fixed())
        .map(|column| column.key)
        .collect();
    if togglable.is_empty() {
        view_data.column_menu = ColumnMenuUiState::default();
        return;
    }

    match key.code {
        KeyCode::Down | KeyCode::Char('j') => {
            view_data.column_menu.cursor =
                (view_data.column_menu.cursor + 1) % togglable.len();
        }
        KeyCode::Up | KeyCode::Char('k') => {
            view_data.column_menu.cursor =
                (view_data.column_menu.cursor + togglable.len() - 1) % togglable.len();
        }
        KeyCode::Char(' ') | KeyCode::Enter => {
            let key_name = togglable[view_data.column_menu.cursor.min(togglable.len() - 1)];
            let page = view_data.active_page_mut(state);
            if let Some(updated) = toggle_visibility(&page.columns, key_name) {
                page.set_columns(updated);
            }
            view_data.clamp_cursor(state);
        }
        _ => {
            view_data.column_menu = ColumnMenuUiState::default();
        }
    }
}

fn handle_form_key<G: DataGateway>(
    state: &mut AppState,
    gateway: &mut G,
    view_data: &mut ViewData,
    key: KeyEvent,
) {
    let Some(form) = view_data.form.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Esc => {
            view_data.form = None;
            state.set_status("form cancelled");
        }
        KeyCode::Enter => {
            submit_form(state, gateway, view_data);
        }
        KeyCode::Down | KeyCode::Tab => {
            form.cursor = (form.cursor + 1) % form.fields.len();
        }
        KeyCode::Up | KeyCode::BackTab => {
            form.cursor = (form.cursor + form.fields.len() - 1) % form.fields.len();
        }
        KeyCode::Backspace => {
            if let Some(field) = form.fields.get_mut(form.cursor) {
                field.value.pop();
            }
        }
        KeyCode::Char(character) => {
            if let Some(field) = form.fields.get_mut(form.cursor) {
                field.value.push(character);
            }
        }
        _ => {}
    }
}

fn open_form(state: &mut AppState, view_data: &mut ViewData, edit: bool) {
    let editing = if edit {
        match view_data.selected_row_id(state) {
            Some(id) => Some(id),
            None => return,
        }
    } else {
        None
    };

    let labels = form_field_labels(state, view_data);
    let page = view_data.active_page(state);
    let selected = page.visible_rows().get(view_data.table_state.selected_row);

    let fields = labels
        .into_iter()
        .map(|(label, key)| FormField {
            label,
            value: match (&editing, selected) {
                (Some(_), Some(row)) => row.cell(key).display(),
                _ => String::new(),
            },
        })
        .collect();
    view_data.form = Some(FormUiState {
        fields,
        cursor: 0,
        editing,
    });
}

fn form_field_labels(state: &AppState, view_data: &ViewData) -> Vec<(&'static str, &'static str)> {
    if view_data.in_product_drill() {
        return vec![
            ("Code", "id"),
            ("Description", "description"),
            ("Type", "product_type"),
            ("Quantity", "quantity"),
            ("Surface m²", "total_area"),
            ("Unit price", "unit_price"),
            ("Image", "image"),
        ];
    }
    match state.active_page {
        PageKind::Clients => vec![
            ("Name", "name"),
            ("Tax ID", "tax_id"),
            ("Email", "email"),
            ("Phone", "phone"),
            ("Address", "address"),
            ("Status", "status"),
        ],
        PageKind::Projects => vec![
            ("Name", "name"),
            ("Client", "client"),
            ("Location", "location"),
            ("Start date", "start_date"),
            ("Delivery date", "delivery_date"),
            ("Status", "status"),
            ("Amount", "amount"),
        ],
        PageKind::Takeoffs => vec![
            ("Name", "name"),
            ("Project", "project"),
            ("Description", "description"),
            ("Date", "date"),
            ("Status", "status"),
            ("Total", "total"),
        ],
    }
}

fn submit_form<G: DataGateway>(
    state: &mut AppState,
    gateway: &mut G,
    view_data: &mut ViewData,
) {
    let Some(form) = view_data.form.clone() else {
        return;
    };
    let payload = match build_payload(state, view_data, &form) {
        Ok(payload) => payload,
        Err(error) => {
            state.set_status(format!("form error: {error:#}"));
            return;
        }
    };

    let page = view_data.active_page_mut(state);
    let title = page.title;
    let events = match &form.editing {
        Some(id) => page.update(gateway, id, &payload),
        None => page.create(gateway, &payload),
    };
    let failed = events
        .iter()
        .any(|event| matches!(event, ListEvent::OperationFailed { .. }));
    report_events(state, title, &events);
    // the form stays open on failure so the user can fix and retry
    if !failed {
        view_data.form = None;
        view_data.clamp_cursor(state);
    }
}

fn build_payload(
    state: &AppState,
    view_data: &ViewData,
    form: &FormUiState,
) -> Result<FormPayload> {
    let value = |label: &str| -> String {
        form.fields
            .iter()
            .find(|field| field.label == label)
            .map(|field| field.value.trim().to_owned())
            .unwrap_or_default()
    };

    if view_data.in_product_drill() {
        let takeoff_id = match &view_data.active_page(state).query {
            miobra_app::PageQuery::TakeoffProducts { takeoff_id } => takeoff_id.clone(),
            _ => String::new(),
        };
        return Ok(FormPayload::Product(ProductFormInput {
            takeoff_id,
            code: value("Code"),
            description: value("Description"),
            product_type: value("Type"),
            quantity: parse_optional_integer(&value("Quantity"))?,
            total_area_m2: parse_optional_area(&value("Surface m²"))?,
            unit_price_cents: parse_optional_money(&value("Unit price"))?,
            image: value("Image"),
        }));
    }

    match state.active_page {
        PageKind::Clients => Ok(FormPayload::Client(ClientFormInput {
            name: value("Name"),
            tax_id: value("Tax ID"),
            email: value("Email"),
            phone: value("Phone"),
            address: value("Address"),
            status: parse_client_status(&value("Status")),
        })),
        PageKind::Projects => Ok(FormPayload::Project(ProjectFormInput {
            name: value("Name"),
            client_id: value("Client"),
            location: value("Location"),
            start_date: parse_optional_display_date(&value("Start date"))?,
            delivery_date: parse_optional_display_date(&value("Delivery date"))?,
            status: parse_project_status(&value("Status")),
            amount_cents: parse_optional_money(&value("Amount"))?,
        })),
        PageKind::Takeoffs => Ok(FormPayload::Takeoff(TakeoffFormInput {
            name: value("Name"),
            project_id: value("Project"),
            description: value("Description"),
            takeoff_date: parse_optional_display_date(&value("Date"))?,
            status: parse_takeoff_status(&value("Status")),
            total_cents: parse_optional_money(&value("Total"))?,
        })),
    }
}

fn parse_client_status(raw: &str) -> ClientStatus {
    ClientStatus::parse(&raw.to_lowercase()).unwrap_or(ClientStatus::Active)
}

fn parse_project_status(raw: &str) -> ProjectStatus {
    ProjectStatus::parse(&raw.to_lowercase()).unwrap_or(ProjectStatus::Active)
}

fn parse_takeoff_status(raw: &str) -> TakeoffStatus {
    TakeoffStatus::parse(&raw.to_lowercase()).unwrap_or(TakeoffStatus::Draft)
}

/// `dd/mm/yyyy`, matching the table's display convention.
pub fn parse_display_date(raw: &str) -> Option<Date> {
    let mut parts = raw.split('/');
    let day: u8 = parts.next()?.parse().ok()?;
    let month_number: u8 = parts.next()?.parse().ok()?;
    let year: i32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let month = Month::try_from(month_number).ok()?;
    Date::from_calendar_date(year, month, day).ok()
}

fn parse_optional_display_date(raw: &str) -> Result<Option<Date>> {
    if raw.is_empty() {
        return Ok(None);
    }
    parse_display_date(raw)
        .map(Some)
        .ok_or_else(|| anyhow::anyhow!("dates use dd/mm/yyyy, got {raw:?}"))
}

/// Accepts "$1.200.000", "1.200.000" or "1200000"; whole currency units
/// become cents.
pub fn parse_optional_money(raw: &str) -> Result<Option<i64>> {
    if raw.is_empty() {
        return Ok(None);
    }
    let digits: String = raw
        .chars()
        .filter(|character| character.is_ascii_digit() || *character == '-')
        .collect();
    if digits.is_empty() {
        anyhow::bail!("amounts are numbers, got {raw:?}");
    }
    let units: i64 = digits
        .parse()
        .map_err(|_| anyhow::anyhow!("amounts are numbers, got {raw:?}"))?;
    Ok(Some(units * 100))
}

fn parse_optional_integer(raw: &str) -> Result<Option<i64>> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|_| anyhow::anyhow!("quantities are whole numbers, got {raw:?}"))
}

/// Accepts "6.4" or the rendered "6.40 m²" form.
fn parse_optional_area(raw: &str) -> Result<Option<f64>> {
    if raw.is_empty() {
        return Ok(None);
    }
    let trimmed = raw.trim_end_matches("m²").trim();
    trimmed
        .parse()
        .map(Some)
        .map_err(|_| anyhow::anyhow!("surfaces are numbers, got {raw:?}"))
}

// --- rendering ----------------------------------------------------------

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
            Constraint::Length(2),
        ])
        .split(frame.area());

    if view_data.in_product_drill() {
        let breadcrumb = Paragraph::new(breadcrumb_text(view_data))
            .block(Block::default().title("miobra").borders(Borders::ALL));
        frame.render_widget(breadcrumb, layout[0]);
    } else {
        let selected = PageKind::ALL
            .iter()
            .position(|page| *page == state.active_page)
            .unwrap_or(0);
        let titles: Vec<String> = PageKind::ALL
            .iter()
            .map(|page| page_tab_title(*page, state, view_data))
            .collect();
        let tabs = Tabs::new(titles)
            .block(Block::default().title("miobra").borders(Borders::ALL))
            .style(Style::default().fg(Color::White))
            .highlight_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .select(selected);
        frame.render_widget(tabs, layout[0]);
    }

    render_body(frame, layout[1], state, view_data);
    render_pagination_bar(frame, layout[2], state, view_data);

    let status = status_text(state, view_data);
    let status_widget = Paragraph::new(status)
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout[3]);

    render_overlays(frame, state, view_data);
}

fn breadcrumb_text(view_data: &ViewData) -> String {
    let mut text = String::from(" take-offs");
    for entry in &view_data.detail_stack {
        text.push_str(" > ");
        text.push_str(&entry.takeoff_label);
    }
    text.push_str(" (Esc to go back)");
    text
}

fn page_tab_title(page: PageKind, state: &AppState, view_data: &ViewData) -> String {
    let list = match page {
        PageKind::Clients => &view_data.clients,
        PageKind::Projects => &view_data.projects,
        PageKind::Takeoffs => &view_data.takeoffs,
    };
    if state.active_page == page && list.has_active_filters() {
        format!(" {} ● ", page.label())
    } else {
        format!(" {} ", page.label())
    }
}

fn render_body(frame: &mut ratatui::Frame<'_>, area: Rect, state: &AppState, view_data: &ViewData) {
    let page = view_data.active_page(state);

    if page.is_loading() {
        let loading = Paragraph::new(format!("loading {}…", page.title)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(page.title),
        );
        frame.render_widget(loading, area);
        return;
    }

    if page.load_state == LoadState::ConnectionError {
        let message = format!(
            "cannot reach the data service for {}.\n\npress r to retry.",
            page.title
        );
        let error = Paragraph::new(message)
            .style(Style::default().fg(Color::Red))
            .block(Block::default().borders(Borders::ALL).title("connection error"));
        frame.render_widget(error, area);
        return;
    }

    render_table(frame, area, view_data, page);
}

fn render_table(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    view_data: &ViewData,
    page: &ListPage,
) {
    let columns = visible_columns(&page.columns);
    if columns.is_empty() {
        let empty = Paragraph::new("no visible columns")
            .block(Block::default().borders(Borders::ALL).title(page.title));
        frame.render_widget(empty, area);
        return;
    }
    let widths = vec![Constraint::Min(8); columns.len()];

    let header_cells = columns.iter().map(|column| {
        Cell::from(header_label(page, column)).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    });
    let header = WidgetRow::new(header_cells);

    let rows = page
        .visible_rows()
        .iter()
        .enumerate()
        .map(|(row_index, row)| {
            let selected_row = row_index == view_data.table_state.selected_row;
            let row_pinned = page.pinned.contains(&row.id);

            let cells = columns
                .iter()
                .map(|column| {
                    let text = if column.kind == ColumnKind::Actions {
                        "e/d/p".to_owned()
                    } else {
                        row.cell(column.key).display()
                    };
                    let mut style = Style::default();
                    if row_pinned {
                        style = style.fg(Color::Cyan).add_modifier(Modifier::BOLD);
                    }
                    if selected_row {
                        style = style.bg(Color::DarkGray);
                    }
                    let column_index = page
                        .columns
                        .iter()
                        .position(|candidate| candidate.key == column.key)
                        .unwrap_or(0);
                    if selected_row && column_index == view_data.table_state.selected_col {
                        style = Style::default()
                            .fg(Color::Black)
                            .bg(Color::Cyan)
                            .add_modifier(Modifier::BOLD);
                    }
                    Cell::from(text).style(style)
                })
                .collect::<Vec<_>>();
            WidgetRow::new(cells)
        });

    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(table_title(page))
                .borders(Borders::ALL),
        );
    frame.render_widget(table, area);
}

fn header_label(page: &ListPage, column: &Column) -> String {
    let mut label = column.label.to_owned();
    if page.sort.column == Some(column.key) {
        label.push_str(match page.sort.direction {
            SortDirection::Asc => " ↑",
            SortDirection::Desc => " ↓",
        });
    }
    label
}

fn table_title(page: &ListPage) -> String {
    let mut parts = vec![format!("{} r:{}", page.title, page.rows.len())];
    if !page.search_term.trim().is_empty() {
        parts.push(format!("search \"{}\"", page.search_term.trim()));
    }
    if page.has_active_filters() {
        parts.push("filters on".to_owned());
    }
    if !page.pinned.is_empty() {
        parts.push(format!("pinned {}", page.pinned.len()));
    }
    let hidden = page.columns.iter().filter(|column| !column.visible).count();
    if hidden > 0 {
        parts.push(format!("hidden {hidden}"));
    }
    parts.join(" | ")
}

fn render_pagination_bar(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &AppState,
    view_data: &ViewData,
) {
    let page = view_data.active_page(state);
    let text = pagination_line(page);
    let bar = Paragraph::new(text).style(Style::default().fg(Color::Gray));
    frame.render_widget(bar, area);
}

fn pagination_line(page: &ListPage) -> String {
    let pagination = &page.pagination;
    if pagination.total_items == 0 {
        return " no records".to_owned();
    }

    let numbers = pagination.page_numbers(MAX_DISPLAYED_PAGES);
    let (leading, trailing) = pagination.window_gaps(MAX_DISPLAYED_PAGES);
    let mut parts: Vec<String> = Vec::new();
    if leading {
        parts.push("…".to_owned());
    }
    for number in numbers {
        if number == pagination.current_page {
            parts.push(format!("[{number}]"));
        } else {
            parts.push(number.to_string());
        }
    }
    if trailing {
        parts.push("…".to_owned());
    }
    format!(
        " {}  {}-{} of {}  {}/page  ([ ] page, + size)",
        parts.join(" "),
        pagination.first_item_index(),
        pagination.max_displayed(),
        pagination.total_items,
        pagination.items_per_page,
    )
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    if view_data.search.active {
        return format!(" search: {}▏", view_data.search.input);
    }
    if let Some(status) = &state.status_line {
        return format!(" {status}");
    }
    " tab pages | / search | f filters | c columns | v visibility | s sort | p pin | n new | e edit | d delete | ? help | q quit".to_owned()
}

fn render_overlays(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    if let Some(confirm) = &view_data.confirm {
        let area = centered_rect(50, 26, frame.area());
        frame.render_widget(Clear, area);
        let body = format!(
            "{}\n\n[y/Enter] {}   [any other key] {}",
            confirm.request.message, confirm.request.confirm_label, confirm.request.cancel_label
        );
        let widget = Paragraph::new(body).block(
            Block::default()
                .title(confirm.request.title.clone())
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Red)),
        );
        frame.render_widget(widget, area);
    }

    if let Some(dialog) = &view_data.filter_dialog {
        let area = centered_rect(64, 64, frame.area());
        frame.render_widget(Clear, area);
        let widget = Paragraph::new(filter_dialog_text(dialog, view_data.filter_cursor_field))
            .block(Block::default().title("filters").borders(Borders::ALL));
        frame.render_widget(widget, area);
    }

    if let Some(dialog) = &view_data.column_dialog {
        let area = centered_rect(54, 60, frame.area());
        frame.render_widget(Clear, area);
        let widget = Paragraph::new(column_dialog_text(dialog))
            .block(Block::default().title("columns").borders(Borders::ALL));
        frame.render_widget(widget, area);
    }

    if view_data.column_menu.visible {
        let area = centered_rect(40, 50, frame.area());
        frame.render_widget(Clear, area);
        let widget = Paragraph::new(column_menu_text(state, view_data))
            .block(Block::default().title("visible columns").borders(Borders::ALL));
        frame.render_widget(widget, area);
    }

    if let Some(form) = &view_data.form {
        let area = centered_rect(60, 64, frame.area());
        frame.render_widget(Clear, area);
        let title = if form.editing.is_some() { "edit" } else { "new" };
        let widget = Paragraph::new(form_text(form))
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(widget, area);
    }

    if let Some(preview) = &view_data.preview {
        let area = centered_rect(64, 56, frame.area());
        frame.render_widget(Clear, area);
        let widget = Paragraph::new(preview.body.clone()).block(
            Block::default()
                .title(preview.title.clone())
                .borders(Borders::ALL),
        );
        frame.render_widget(widget, area);
    }

    if view_data.help_visible {
        let area = centered_rect(72, 70, frame.area());
        frame.render_widget(Clear, area);
        let widget = Paragraph::new(help_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(widget, area);
    }
}

fn filter_dialog_text(dialog: &FilterDialog, field: usize) -> String {
    let mut text = String::new();
    for (index, (key, filter)) in dialog.staged.iter().enumerate() {
        let marker = if index == dialog.cursor { ">" } else { " " };
        let value = match &filter.criteria {
            FilterCriteria::Text { value } | FilterCriteria::Choice { value } => value.clone(),
            FilterCriteria::Number { from, to } => format!(
                "from {} to {}",
                from.map(|bound| bound.to_string()).unwrap_or_default(),
                to.map(|bound| bound.to_string()).unwrap_or_default()
            ),
            FilterCriteria::Date { from, to } => format!(
                "from {} to {}",
                from.map(format_date).unwrap_or_default(),
                to.map(format_date).unwrap_or_default()
            ),
            FilterCriteria::Boolean { value } => match value {
                Some(true) => "yes".to_owned(),
                Some(false) => "no".to_owned(),
                None => "any".to_owned(),
            },
        };
        text.push_str(&format!("{marker} {} ({key}): {value}\n", filter.label));
    }
    let bound = if field == 0 { "from" } else { "to" };
    text.push_str(&format!(
        "\nediting the {bound} bound on ranges (←/→ switch)\n[Enter] apply  [C] clear all  [Esc] cancel"
    ));
    text
}

fn column_dialog_text(dialog: &ColumnDialog) -> String {
    let mut text = String::new();
    for (index, column) in dialog.staged.iter().enumerate() {
        let marker = if index == dialog.cursor { ">" } else { " " };
        let checked = if column.visible { "x" } else { " " };
        let fixed = if column.is_fixed() { " (fixed)" } else { "" };
        text.push_str(&format!("{marker} [{checked}] {}{fixed}\n", column.label));
    }
    text.push_str("\n[space] toggle  [Enter] apply  [R] reset  [Esc] cancel");
    text
}

fn column_menu_text(state: &AppState, view_data: &ViewData) -> String {
    let mut text = String::new();
    let togglable: Vec<&Column> = view_data
        .active_page(state)
        .columns
        .iter()
        .filter(|column| !column.is_fixed())
        .collect();
    for (index, column) in togglable.iter().enumerate() {
        let marker = if index == view_data.column_menu.cursor {
            ">"
        } else {
            " "
        };
        let checked = if column.visible { "x" } else { " " };
        text.push_str(&format!("{marker} [{checked}] {}\n", column.label));
    }
    text.push_str("\n[space] toggle  [any other key] close");
    text
}

fn form_text(form: &FormUiState) -> String {
    let mut text = String::new();
    for (index, field) in form.fields.iter().enumerate() {
        let marker = if index == form.cursor { ">" } else { " " };
        text.push_str(&format!("{marker} {}: {}\n", field.label, field.value));
    }
    text.push_str("\n[Enter] save  [Tab] next field  [Esc] cancel");
    text
}

fn help_text() -> String {
    [
        "tab / shift-tab   switch entity page",
        "j k h l           move the cell cursor",
        "s                 sort by the selected column",
        "< >               move the selected column",
        "H                 hide the selected column",
        "v                 column visibility menu",
        "c                 column dialog (apply/reset)",
        "f                 filter dialog   F clear filters",
        "/                 search          Esc clears input",
        "[ ]               previous/next page   + page size",
        "p                 pin/unpin the selected row",
        "n e d             new / edit / delete record",
        "Enter             open row detail, drill into take-off products",
        "r                 reload (retry after a connection error)",
        "q                 quit",
    ]
    .join("\n")
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);
    horizontal[1]
}

#[cfg(test)]
mod tests {
    use super::{
        ConfirmUiState, SearchUiState, TableCommand, ViewData, apply_table_command,
        filtered_rows, handle_column_menu_key, handle_confirm_key, handle_filter_dialog_key,
        handle_key, handle_search_key, pagination_line, parse_display_date, parse_optional_money,
        table_command_for_key, table_title,
    };
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use miobra_app::{
        AppState, CellValue, FilterCriteria, LoadState, PageKind, Row, SortDirection,
    };
    use miobra_testkit::MemoryGateway;
    use std::collections::BTreeSet;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ready_view(state: &mut AppState) -> (ViewData, MemoryGateway) {
        let mut view_data = ViewData::new();
        let mut gateway = MemoryGateway::seeded();
        let events = view_data.active_page_mut(state).load(&mut gateway);
        assert!(!events.is_empty());
        (view_data, gateway)
    }

    fn visible_ids(view_data: &ViewData, state: &AppState) -> Vec<String> {
        view_data
            .active_page(state)
            .visible_rows()
            .iter()
            .map(|row| row.id.clone())
            .collect()
    }

    #[test]
    fn filtered_rows_passes_through_when_inactive() {
        let rows = vec![
            Row::new("a", vec![("name", CellValue::text("Uno"))]),
            Row::new("b", vec![("name", CellValue::text("Dos"))]),
        ];
        let pinned = BTreeSet::new();
        let passthrough = filtered_rows(&rows, &pinned, false, |_| false);
        assert_eq!(passthrough.len(), 2);
    }

    #[test]
    fn filtered_rows_exempts_pinned_from_the_predicate() {
        let rows = vec![
            Row::new("a", vec![("name", CellValue::text("Uno"))]),
            Row::new("b", vec![("name", CellValue::text("Dos"))]),
            Row::new("c", vec![("name", CellValue::text("Tres"))]),
        ];
        let pinned: BTreeSet<String> = ["b".to_owned()].into();
        let filtered = filtered_rows(&rows, &pinned, true, |row| {
            row.cell("name").display().contains('s')
        });
        let ids: Vec<&str> = filtered.iter().map(|row| row.id.as_str()).collect();
        // b is exempt; a ("Uno") fails the predicate; c ("Tres") passes
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn sort_key_toggles_through_the_selected_column() {
        let mut state = AppState::default();
        let (mut view_data, mut gateway) = ready_view(&mut state);
        view_data.table_state.selected_col = 1; // name

        apply_table_command(&mut state, &mut gateway, &mut view_data, TableCommand::CycleSort);
        let page = view_data.active_page(&state);
        assert_eq!(page.sort.column, Some("name"));
        assert_eq!(page.sort.direction, SortDirection::Asc);

        apply_table_command(&mut state, &mut gateway, &mut view_data, TableCommand::CycleSort);
        assert_eq!(
            view_data.active_page(&state).sort.direction,
            SortDirection::Desc
        );
    }

    #[test]
    fn sort_on_actions_column_is_a_silent_noop() {
        let mut state = AppState::default();
        let (mut view_data, mut gateway) = ready_view(&mut state);
        view_data.table_state.selected_col = 7; // actions
        state.status_line = None;

        apply_table_command(&mut state, &mut gateway, &mut view_data, TableCommand::CycleSort);
        assert_eq!(view_data.active_page(&state).sort.column, None);
        assert!(state.status_line.is_none());
    }

    #[test]
    fn column_shift_moves_with_splice_semantics() {
        let mut state = AppState::default();
        let (mut view_data, mut gateway) = ready_view(&mut state);
        view_data.table_state.selected_col = 3; // email

        apply_table_command(
            &mut state,
            &mut gateway,
            &mut view_data,
            TableCommand::MoveColumnLeft,
        );
        let keys: Vec<&str> = view_data
            .active_page(&state)
            .columns
            .iter()
            .map(|column| column.key)
            .collect();
        assert_eq!(
            keys,
            vec!["id", "name", "email", "tax_id", "phone", "address", "status", "actions"]
        );
        // the cursor follows the moved column
        assert_eq!(view_data.table_state.selected_col, 2);
    }

    #[test]
    fn column_shift_into_fixed_territory_is_ignored() {
        let mut state = AppState::default();
        let (mut view_data, mut gateway) = ready_view(&mut state);
        view_data.table_state.selected_col = 1; // name, next to fixed id

        apply_table_command(
            &mut state,
            &mut gateway,
            &mut view_data,
            TableCommand::MoveColumnLeft,
        );
        let keys: Vec<&str> = view_data
            .active_page(&state)
            .columns
            .iter()
            .map(|column| column.key)
            .collect();
        assert_eq!(keys[0], "id");
        assert_eq!(keys[1], "name");
    }

    #[test]
    fn hide_column_skips_fixed_columns() {
        let mut state = AppState::default();
        let (mut view_data, mut gateway) = ready_view(&mut state);

        view_data.table_state.selected_col = 0; // id is fixed
        apply_table_command(&mut state, &mut gateway, &mut view_data, TableCommand::HideColumn);
        assert!(view_data.active_page(&state).columns[0].visible);

        view_data.table_state.selected_col = 2; // tax_id
        apply_table_command(&mut state, &mut gateway, &mut view_data, TableCommand::HideColumn);
        assert!(!view_data.active_page(&state).columns[2].visible);
    }

    #[test]
    fn pin_key_moves_row_to_top() {
        let mut state = AppState::default();
        let (mut view_data, mut gateway) = ready_view(&mut state);
        view_data.table_state.selected_row = 2; // CLI-2024-003

        apply_table_command(&mut state, &mut gateway, &mut view_data, TableCommand::TogglePin);
        assert_eq!(
            visible_ids(&view_data, &state).first().map(String::as_str),
            Some("CLI-2024-003")
        );
    }

    #[test]
    fn search_enter_runs_the_gateway_search() {
        let mut state = AppState::default();
        let (mut view_data, mut gateway) = ready_view(&mut state);

        view_data.search = SearchUiState {
            active: true,
            input: "norte".to_owned(),
        };
        handle_search_key(&mut state, &mut gateway, &mut view_data, key(KeyCode::Enter));
        assert!(!view_data.search.active);
        assert_eq!(visible_ids(&view_data, &state), vec!["CLI-2024-003"]);

        // a blank re-search restores the snapshot
        view_data.search = SearchUiState {
            active: true,
            input: String::new(),
        };
        handle_search_key(&mut state, &mut gateway, &mut view_data, key(KeyCode::Enter));
        assert_eq!(visible_ids(&view_data, &state).len(), 3);
    }

    #[test]
    fn filter_dialog_applies_staged_criteria() {
        let mut state = AppState::default();
        let (mut view_data, mut gateway) = ready_view(&mut state);

        apply_table_command(&mut state, &mut gateway, &mut view_data, TableCommand::OpenFilters);
        {
            let dialog = view_data.filter_dialog.as_mut().expect("dialog open");
            dialog.cursor = 1; // name
            if let FilterCriteria::Text { value } =
                &mut dialog.staged[1].1.criteria
            {
                value.push_str("sur");
            }
        }
        handle_filter_dialog_key(&mut state, &mut view_data, key(KeyCode::Enter));
        assert!(view_data.filter_dialog.is_none());
        assert_eq!(visible_ids(&view_data, &state), vec!["CLI-2024-002"]);
    }

    #[test]
    fn filter_dialog_escape_discards_the_staging_copy() {
        let mut state = AppState::default();
        let (mut view_data, mut gateway) = ready_view(&mut state);

        apply_table_command(&mut state, &mut gateway, &mut view_data, TableCommand::OpenFilters);
        {
            let dialog = view_data.filter_dialog.as_mut().expect("dialog open");
            if let FilterCriteria::Text { value } = &mut dialog.staged[1].1.criteria {
                value.push_str("sur");
            }
        }
        handle_filter_dialog_key(&mut state, &mut view_data, key(KeyCode::Esc));
        assert!(view_data.filter_dialog.is_none());
        assert!(!view_data.active_page(&state).has_active_filters());
        assert_eq!(visible_ids(&view_data, &state).len(), 3);
    }

    #[test]
    fn column_menu_closes_on_any_outside_key() {
        let mut state = AppState::default();
        let (mut view_data, mut gateway) = ready_view(&mut state);

        apply_table_command(
            &mut state,
            &mut gateway,
            &mut view_data,
            TableCommand::OpenColumnMenu,
        );
        assert!(view_data.column_menu.visible);

        handle_column_menu_key(&mut state, &mut view_data, key(KeyCode::Char('x')));
        assert!(!view_data.column_menu.visible);
    }

    #[test]
    fn column_menu_toggles_visibility_in_place() {
        let mut state = AppState::default();
        let (mut view_data, mut gateway) = ready_view(&mut state);

        apply_table_command(
            &mut state,
            &mut gateway,
            &mut view_data,
            TableCommand::OpenColumnMenu,
        );
        // first togglable column is "name"
        handle_column_menu_key(&mut state, &mut view_data, key(KeyCode::Char(' ')));
        assert!(!view_data.active_page(&state).columns[1].visible);
        assert!(view_data.column_menu.visible);
    }

    #[test]
    fn delete_flow_requires_explicit_confirmation() {
        let mut state = AppState::default();
        let (mut view_data, mut gateway) = ready_view(&mut state);
        view_data.table_state.selected_row = 0;

        apply_table_command(&mut state, &mut gateway, &mut view_data, TableCommand::DeleteRow);
        let confirm = view_data.confirm.clone().expect("confirm dialog open");
        assert_eq!(confirm.target_id, "CLI-2024-001");

        // dismissal leaves the record alone
        handle_confirm_key(&mut state, &mut gateway, &mut view_data, key(KeyCode::Char('x')));
        assert!(view_data.confirm.is_none());
        assert_eq!(
            gateway.clients[0].status,
            miobra_app::ClientStatus::Active
        );

        apply_table_command(&mut state, &mut gateway, &mut view_data, TableCommand::DeleteRow);
        handle_confirm_key(&mut state, &mut gateway, &mut view_data, key(KeyCode::Char('y')));
        assert_eq!(
            gateway.clients[0].status,
            miobra_app::ClientStatus::Inactive
        );
    }

    #[test]
    fn takeoff_enter_drills_into_products_and_esc_returns() {
        let mut state = AppState::default();
        let mut view_data = ViewData::new();
        let mut gateway = MemoryGateway::seeded();
        state.active_page = PageKind::Takeoffs;
        view_data.active_page_mut(&state).load(&mut gateway);
        view_data.table_state.selected_row = 0; // CUB-2023-001

        apply_table_command(&mut state, &mut gateway, &mut view_data, TableCommand::Activate);
        assert!(view_data.in_product_drill());
        assert_eq!(visible_ids(&view_data, &state), vec!["PRD-001", "PRD-002"]);

        apply_table_command(&mut state, &mut gateway, &mut view_data, TableCommand::Back);
        assert!(!view_data.in_product_drill());
        assert_eq!(visible_ids(&view_data, &state).len(), 3);
    }

    #[test]
    fn connection_error_then_retry_recovers() {
        let mut state = AppState::default();
        let mut view_data = ViewData::new();
        let mut gateway = MemoryGateway::seeded();
        gateway.set_offline("connection refused");
        view_data.active_page_mut(&mut state).load(&mut gateway);
        assert_eq!(
            view_data.active_page(&state).load_state,
            LoadState::ConnectionError
        );

        gateway.set_online();
        apply_table_command(&mut state, &mut gateway, &mut view_data, TableCommand::Reload);
        assert_eq!(view_data.active_page(&state).load_state, LoadState::Loaded);
        assert_eq!(visible_ids(&view_data, &state).len(), 3);
    }

    #[test]
    fn refresh_signal_reloads_the_takeoff_page() {
        let mut state = AppState::default();
        let mut view_data = ViewData::new();
        let mut gateway = MemoryGateway::seeded();
        state.active_page = PageKind::Takeoffs;
        view_data.active_page_mut(&state).load(&mut gateway);

        // a product mutation queues a refresh and changes the item count
        let query = miobra_app::PageQuery::TakeoffProducts {
            takeoff_id: "CUB-2023-001".to_owned(),
        };
        miobra_app::DataGateway::delete(&mut gateway, &query, "PRD-002").expect("delete");

        super::process_refresh_signals(&mut state, &mut gateway, &mut view_data);
        let items = view_data
            .takeoffs
            .rows
            .iter()
            .find(|row| row.id == "CUB-2023-001")
            .map(|row| row.cell("items").display());
        assert_eq!(items.as_deref(), Some("1"));
    }

    #[test]
    fn quit_key_exits_and_help_swallows_next_key() {
        let mut state = AppState::default();
        let (mut view_data, mut gateway) = ready_view(&mut state);

        let exit = handle_key(
            &mut state,
            &mut gateway,
            &mut view_data,
            key(KeyCode::Char('q')),
        )
        .expect("handled");
        assert!(exit);

        view_data.help_visible = true;
        let exit = handle_key(
            &mut state,
            &mut gateway,
            &mut view_data,
            key(KeyCode::Char('q')),
        )
        .expect("handled");
        assert!(!exit);
        assert!(!view_data.help_visible);
    }

    #[test]
    fn pagination_line_windows_and_counts() {
        let mut state = AppState::default();
        let mut view_data = ViewData::new();
        let mut gateway = MemoryGateway::seeded();
        view_data.active_page_mut(&state).load(&mut gateway);
        let page = view_data.active_page_mut(&state);
        page.set_page_size(5);

        let line = pagination_line(view_data.active_page(&state));
        assert!(line.contains("[1]"));
        assert!(line.contains("1-3 of 3"));

        let empty = miobra_app::clients_page();
        assert_eq!(pagination_line(&empty), " no records");
    }

    #[test]
    fn table_title_reflects_search_filters_and_pins() {
        let mut state = AppState::default();
        let (mut view_data, mut gateway) = ready_view(&mut state);
        let page = view_data.active_page_mut(&state);
        page.search(&mut gateway, "norte");
        page.toggle_pin("CLI-2024-003");

        let title = table_title(view_data.active_page(&state));
        assert!(title.contains("search \"norte\""));
        assert!(title.contains("pinned 1"));
    }

    #[test]
    fn image_cell_activation_opens_the_preview() {
        let mut state = AppState::default();
        let mut view_data = ViewData::new();
        let mut gateway = MemoryGateway::seeded();
        state.active_page = PageKind::Takeoffs;
        view_data.active_page_mut(&state).load(&mut gateway);
        apply_table_command(&mut state, &mut gateway, &mut view_data, TableCommand::Activate);

        // image column of the products page
        let image_col = view_data
            .active_page(&state)
            .columns
            .iter()
            .position(|column| column.key == "image")
            .expect("image column");
        view_data.table_state.selected_col = image_col;
        view_data.table_state.selected_row = 0;
        apply_table_command(&mut state, &mut gateway, &mut view_data, TableCommand::Activate);

        let preview = view_data.preview.clone().expect("preview open");
        assert_eq!(preview.body, "frames/v-120.png");
    }

    #[test]
    fn key_map_covers_the_table_commands() {
        assert_eq!(
            table_command_for_key(key(KeyCode::Char('s'))),
            Some(TableCommand::CycleSort)
        );
        assert_eq!(
            table_command_for_key(key(KeyCode::Char('p'))),
            Some(TableCommand::TogglePin)
        );
        assert_eq!(
            table_command_for_key(key(KeyCode::Char('/'))),
            Some(TableCommand::OpenSearch)
        );
        assert_eq!(table_command_for_key(key(KeyCode::Char('Z'))), None);
    }

    #[test]
    fn money_and_date_input_parsing() {
        assert_eq!(
            parse_optional_money("$1.200.000").expect("money"),
            Some(120_000_000)
        );
        assert_eq!(parse_optional_money("").expect("empty"), None);
        assert!(parse_optional_money("abc").is_err());

        let date = parse_display_date("15/05/2023").expect("date");
        assert_eq!(date.to_string(), "2023-05-15");
        assert!(parse_display_date("2023-05-15").is_none());
        assert!(parse_display_date("32/01/2023").is_none());
    }

    #[test]
    fn confirm_state_is_plain_data() {
        let confirm = ConfirmUiState {
            request: miobra_app::ConfirmRequest {
                title: "Delete client".to_owned(),
                message: "Delete client CLI-1?".to_owned(),
                confirm_label: "Delete",
                cancel_label: "Cancel",
            },
            target_id: "CLI-1".to_owned(),
        };
        assert_eq!(confirm.request.confirm_label, "Delete");
    }
}
