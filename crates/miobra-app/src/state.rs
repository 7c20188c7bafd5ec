// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Clients,
    Projects,
    Takeoffs,
}

impl PageKind {
    pub const ALL: [Self; 3] = [Self::Clients, Self::Projects, Self::Takeoffs];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Clients => "clients",
            Self::Projects => "projects",
            Self::Takeoffs => "take-offs",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub active_page: PageKind,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            active_page: PageKind::Clients,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    NextPage,
    PrevPage,
    ActivatePage(PageKind),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    PageChanged(PageKind),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextPage => self.rotate_page(1),
            AppCommand::PrevPage => self.rotate_page(-1),
            AppCommand::ActivatePage(page) => {
                self.active_page = page;
                vec![AppEvent::PageChanged(page)]
            }
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    pub fn set_status(&mut self, message: impl Into<String>) -> AppEvent {
        let message = message.into();
        self.status_line = Some(message.clone());
        AppEvent::StatusUpdated(message)
    }

    fn rotate_page(&mut self, delta: isize) -> Vec<AppEvent> {
        let pages = PageKind::ALL;
        let current = pages
            .iter()
            .position(|page| *page == self.active_page)
            .unwrap_or(0) as isize;
        let len = pages.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.active_page = pages[next];
        vec![AppEvent::PageChanged(self.active_page)]
    }
}

#[cfg(test)]
mod tests {
    use super::{AppCommand, AppEvent, AppState, PageKind};

    #[test]
    fn page_rotation_wraps() {
        let mut state = AppState {
            active_page: PageKind::Takeoffs,
            ..AppState::default()
        };

        let events = state.dispatch(AppCommand::NextPage);
        assert_eq!(state.active_page, PageKind::Clients);
        assert_eq!(events, vec![AppEvent::PageChanged(PageKind::Clients)]);

        state.dispatch(AppCommand::PrevPage);
        assert_eq!(state.active_page, PageKind::Takeoffs);
    }

    #[test]
    fn status_set_and_clear() {
        let mut state = AppState::default();
        let event = state.set_status("3 clients loaded");
        assert_eq!(event, AppEvent::StatusUpdated("3 clients loaded".to_owned()));
        assert_eq!(state.status_line.as_deref(), Some("3 clients loaded"));

        let events = state.dispatch(AppCommand::ClearStatus);
        assert_eq!(events, vec![AppEvent::StatusCleared]);
        assert!(state.status_line.is_none());
    }
}
