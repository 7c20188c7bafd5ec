// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub const ID_COLUMN: &str = "id";
pub const ACTIONS_COLUMN: &str = "actions";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Date,
    Number,
    Boolean,
    Choice,
    Image,
    Actions,
}

/// One table column definition. Column lists are treated as immutable value
/// objects: every reorder/visibility operation produces a new list so the
/// owner can detect change by comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: ColumnKind,
    pub sortable: bool,
    pub draggable: bool,
    pub visible: bool,
}

impl Column {
    pub const fn new(key: &'static str, label: &'static str, kind: ColumnKind) -> Self {
        Self {
            key,
            label,
            kind,
            sortable: true,
            draggable: true,
            visible: true,
        }
    }

    pub const fn text(key: &'static str, label: &'static str) -> Self {
        Self::new(key, label, ColumnKind::Text)
    }

    pub const fn date(key: &'static str, label: &'static str) -> Self {
        Self::new(key, label, ColumnKind::Date)
    }

    pub const fn number(key: &'static str, label: &'static str) -> Self {
        Self::new(key, label, ColumnKind::Number)
    }

    pub const fn choice(key: &'static str, label: &'static str) -> Self {
        Self::new(key, label, ColumnKind::Choice)
    }

    pub const fn image(key: &'static str, label: &'static str) -> Self {
        let mut column = Self::new(key, label, ColumnKind::Image);
        column.sortable = false;
        column
    }

    /// The id column sorts but never moves or hides.
    pub const fn id(label: &'static str) -> Self {
        let mut column = Self::new(ID_COLUMN, label, ColumnKind::Text);
        column.draggable = false;
        column
    }

    pub const fn actions(label: &'static str) -> Self {
        let mut column = Self::new(ACTIONS_COLUMN, label, ColumnKind::Actions);
        column.sortable = false;
        column.draggable = false;
        column
    }

    pub fn is_fixed(&self) -> bool {
        is_fixed_key(self.key)
    }
}

pub fn is_fixed_key(key: &str) -> bool {
    key == ID_COLUMN || key == ACTIONS_COLUMN
}

/// Columns with `visible` set, in input order. Input order is the single
/// source of truth for display and for move-target resolution.
pub fn visible_columns(columns: &[Column]) -> Vec<&Column> {
    columns.iter().filter(|column| column.visible).collect()
}

pub fn visible_keys(columns: &[Column]) -> Vec<&'static str> {
    visible_columns(columns)
        .into_iter()
        .map(|column| column.key)
        .collect()
}

/// Moves `source` so it lands at the position `target` occupies once the
/// source is removed (list-splice semantics). Returns `None` when either
/// key is unknown or not draggable; callers treat that as a silent no-op.
pub fn move_column(columns: &[Column], source: &str, target: &str) -> Option<Vec<Column>> {
    if source == target {
        return None;
    }
    let source_column = columns.iter().find(|column| column.key == source)?;
    let target_column = columns.iter().find(|column| column.key == target)?;
    if !source_column.draggable || !target_column.draggable {
        return None;
    }

    let source_index = columns.iter().position(|column| column.key == source)?;
    let target_index = columns.iter().position(|column| column.key == target)?;

    let mut reordered = columns.to_vec();
    let moved = reordered.remove(source_index);
    reordered.insert(target_index, moved);
    Some(reordered)
}

/// Flips visibility for `key`, returning the updated list. Fixed columns
/// and unknown keys are silent no-ops.
pub fn toggle_visibility(columns: &[Column], key: &str) -> Option<Vec<Column>> {
    if is_fixed_key(key) {
        return None;
    }
    let index = columns.iter().position(|column| column.key == key)?;
    let mut updated = columns.to_vec();
    updated[index].visible = !updated[index].visible;
    Some(updated)
}
