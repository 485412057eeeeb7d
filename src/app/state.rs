#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusPane {
    #[default]
    List,
    Search,
}

/// Screen-only state: which pane has the keyboard and which card is
/// highlighted. Everything fetched from the service lives in the coordinator.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub focus: FocusPane,
    pub selected: usize,
}

impl ViewState {
    pub fn is_search_active(&self) -> bool {
        self.focus == FocusPane::Search
    }

    pub fn begin_search(&mut self) {
        self.focus = FocusPane::Search;
    }

    pub fn finish_search(&mut self) {
        self.focus = FocusPane::List;
    }

    pub fn move_selection(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.selected = 0;
            return;
        }
        let last = len as isize - 1;
        let next = (self.selected as isize + delta).clamp(0, last);
        self.selected = next as usize;
    }

    pub fn clamp(&mut self, len: usize) {
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    pub fn selected_index(&self, len: usize) -> Option<usize> {
        (len > 0).then(|| self.selected.min(len - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_stays_within_list_bounds() {
        let mut view = ViewState::default();
        view.move_selection(-1, 3);
        assert_eq!(view.selected, 0);
        view.move_selection(5, 3);
        assert_eq!(view.selected, 2);
        view.clamp(1);
        assert_eq!(view.selected, 0);
        assert_eq!(view.selected_index(0), None);
        assert_eq!(view.selected_index(4), Some(0));
    }

    #[test]
    fn search_focus_round_trip() {
        let mut view = ViewState::default();
        assert!(!view.is_search_active());
        view.begin_search();
        assert!(view.is_search_active());
        view.finish_search();
        assert_eq!(view.focus, FocusPane::List);
    }
}
