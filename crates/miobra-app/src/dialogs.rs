// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::columns::Column;
use crate::filters::{FilterMap, clear_all};

/// Staged copy of a page's filters, edited in the filter dialog. The page's
/// own map is untouched until `apply`; closing without applying discards
/// the staged copy.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterDialog {
    pub staged: FilterMap,
    pub cursor: usize,
}

impl FilterDialog {
    pub fn open(current: &FilterMap) -> Self {
        Self {
            staged: current.clone(),
            cursor: 0,
        }
    }

    pub fn move_cursor(&mut self, delta: isize) {
        if self.staged.is_empty() {
            self.cursor = 0;
            return;
        }
        let len = self.staged.len() as isize;
        self.cursor = (self.cursor as isize + delta).rem_euclid(len) as usize;
    }

    pub fn clear_staged(&mut self) {
        clear_all(&mut self.staged);
    }

    pub fn apply(self) -> FilterMap {
        self.staged
    }
}

/// Staged copy of a page's column list, edited in the column dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDialog {
    pub staged: Vec<Column>,
    pub cursor: usize,
}

impl ColumnDialog {
    pub fn open(current: &[Column]) -> Self {
        Self {
            staged: current.to_vec(),
            cursor: 0,
        }
    }

    pub fn move_cursor(&mut self, delta: isize) {
        if self.staged.is_empty() {
            self.cursor = 0;
            return;
        }
        let len = self.staged.len() as isize;
        self.cursor = (self.cursor as isize + delta).rem_euclid(len) as usize;
    }

    /// Flips visibility of the column under the cursor. Fixed columns are a
    /// silent no-op.
    pub fn toggle_selected(&mut self) -> bool {
        let Some(column) = self.staged.get_mut(self.cursor) else {
            return false;
        };
        if column.is_fixed() {
            return false;
        }
        column.visible = !column.visible;
        true
    }

    pub fn reset_to(&mut self, defaults: &[Column]) {
        self.staged = defaults.to_vec();
        self.cursor = self.cursor.min(self.staged.len().saturating_sub(1));
    }

    pub fn apply(self) -> Vec<Column> {
        self.staged
    }
}

/// Parameters for the confirm dialog collaborator; resolves to confirmed
/// or dismissed in the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmRequest {
    pub title: String,
    pub message: String,
    pub confirm_label: &'static str,
    pub cancel_label: &'static str,
}
