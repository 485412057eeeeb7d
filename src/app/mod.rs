use std::io::Stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use ratatui::Terminal;

use crate::api::NotesApi;
use crate::config::AppConfig;
use crate::form::FormField;
use crate::notify::ToastCenter;
use crate::ui;

pub mod coordinator;
pub mod modal;
pub mod state;
pub mod worker;

pub use coordinator::{Coordinator, CoordinatorOptions};
pub use modal::{CloseReason, ModalContent, ModalHost};
pub use state::{FocusPane, ViewState};
pub use worker::{ApiWorker, Request, Response};

enum Action {
    Quit,
    SelectNext,
    SelectPrevious,
    NextPage,
    PreviousPage,
    JumpToPage(u32),
    StartSearch,
    NewNote,
    DeleteNote,
    Refresh,
}

pub struct App {
    coordinator: Coordinator<ToastCenter>,
    toasts: ToastCenter,
    worker: ApiWorker,
    view: ViewState,
    list_state: ListState,
    screen: Rect,
    should_quit: bool,
    tick_rate: Duration,
}

impl App {
    pub fn new(config: &AppConfig, api: Arc<dyn NotesApi>) -> Self {
        let toasts = ToastCenter::new(config.ui.toast_duration());
        let coordinator = Coordinator::new(CoordinatorOptions::from(config), toasts.clone());
        Self {
            coordinator,
            toasts,
            worker: ApiWorker::new(api),
            view: ViewState::default(),
            list_state: ListState::default(),
            screen: Rect::default(),
            should_quit: false,
            tick_rate: Duration::from_millis(100),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        result
    }

    pub fn coordinator(&self) -> &Coordinator<ToastCenter> {
        &self.coordinator
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let initial = self.coordinator.start();
        self.worker.dispatch_all(initial);

        loop {
            self.toasts.prune(Instant::now());
            let toasts = self.toasts.active();
            terminal
                .draw(|frame| {
                    self.screen = frame.size();
                    ui::draw_app(
                        frame,
                        &self.coordinator,
                        &self.view,
                        &mut self.list_state,
                        &toasts,
                    );
                })
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            if event::poll(self.poll_timeout()).context("polling for terminal events")? {
                match event::read().context("reading terminal event")? {
                    Event::Key(key) => self.handle_key(key),
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    _ => {}
                }
            }

            self.on_tick();
        }
        tracing::info!("leaving tui");
        Ok(())
    }

    /// Sleep no longer than the next debounce deadline or toast expiry.
    fn poll_timeout(&self) -> Duration {
        let now = Instant::now();
        [self.coordinator.next_deadline(), self.toasts.next_expiry()]
            .into_iter()
            .flatten()
            .map(|deadline| deadline.saturating_duration_since(now))
            .fold(self.tick_rate, Duration::min)
    }

    fn on_tick(&mut self) {
        let requests = self.coordinator.tick();
        self.worker.dispatch_all(requests);
        for response in self.worker.drain() {
            self.apply(response);
        }
        self.view.clamp(self.displayed_len());
    }

    fn apply(&mut self, response: Response) {
        let requests = self.coordinator.handle(response);
        self.worker.dispatch_all(requests);
    }

    fn displayed_len(&self) -> usize {
        self.coordinator
            .query()
            .displayed()
            .map(|page| page.notes.len())
            .unwrap_or(0)
    }

    fn selected_note_id(&self) -> Option<i64> {
        let page = self.coordinator.query().displayed()?;
        let idx = self.view.selected_index(page.notes.len())?;
        page.notes.get(idx).map(|note| note.id)
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if self.coordinator.modal().is_open() {
            self.handle_modal_key(key);
            return;
        }

        if self.view.is_search_active() {
            match key.code {
                KeyCode::Esc => self.view.finish_search(),
                KeyCode::Enter => {
                    let requests = self.coordinator.commit_search();
                    self.worker.dispatch_all(requests);
                    self.view.finish_search();
                    self.view.selected = 0;
                }
                KeyCode::Backspace => self.coordinator.pop_search_char(),
                KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    let requests = self.coordinator.clear_search();
                    self.worker.dispatch_all(requests);
                    self.view.selected = 0;
                }
                KeyCode::Char(ch)
                    if !key.modifiers.intersects(
                        KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER,
                    ) =>
                {
                    self.coordinator.push_search_char(ch);
                }
                _ => {}
            }
            return;
        }

        let plain = !key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER);
        let action = match key.code {
            KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Quit)
            }
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Refresh)
            }
            KeyCode::Char('j') | KeyCode::Down => Some(Action::SelectNext),
            KeyCode::Char('k') | KeyCode::Up => Some(Action::SelectPrevious),
            KeyCode::Char('l') | KeyCode::Right | KeyCode::PageDown => Some(Action::NextPage),
            KeyCode::Char('h') | KeyCode::Left | KeyCode::PageUp => Some(Action::PreviousPage),
            KeyCode::Char(digit @ '1'..='9') if plain => {
                digit.to_digit(10).map(Action::JumpToPage)
            }
            KeyCode::Char('/') if plain => Some(Action::StartSearch),
            KeyCode::Char('n') if plain => Some(Action::NewNote),
            KeyCode::Char('d') | KeyCode::Delete if plain => Some(Action::DeleteNote),
            _ => None,
        };

        if let Some(action) = action {
            self.handle_action(action);
        }
    }

    fn handle_action(&mut self, action: Action) {
        let page_before = self.coordinator.pages().current();
        let requests = match action {
            Action::Quit => {
                self.should_quit = true;
                Vec::new()
            }
            Action::SelectNext => {
                self.view.move_selection(1, self.displayed_len());
                Vec::new()
            }
            Action::SelectPrevious => {
                self.view.move_selection(-1, self.displayed_len());
                Vec::new()
            }
            Action::NextPage => self.coordinator.next_page(),
            Action::PreviousPage => self.coordinator.previous_page(),
            Action::JumpToPage(page) => self.coordinator.select_page(page),
            Action::StartSearch => {
                self.view.begin_search();
                Vec::new()
            }
            Action::NewNote => {
                self.coordinator.open_create();
                Vec::new()
            }
            Action::DeleteNote => match self.selected_note_id() {
                Some(note_id) => self.coordinator.request_delete(note_id),
                None => Vec::new(),
            },
            Action::Refresh => self.coordinator.refresh(),
        };
        if self.coordinator.pages().current() != page_before {
            self.view.selected = 0;
        }
        self.worker.dispatch_all(requests);
    }

    fn handle_modal_key(&mut self, key: KeyEvent) {
        let form_focus = match self.coordinator.modal().content() {
            Some(ModalContent::CreateNote(form)) => Some(form.focus()),
            Some(ModalContent::ConfirmDelete { .. }) => None,
            None => return,
        };
        let Some(focus) = form_focus else {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    let requests = self.coordinator.confirm_delete();
                    self.worker.dispatch_all(requests);
                }
                KeyCode::Esc => {
                    self.coordinator.escape();
                }
                KeyCode::Char('n') => {
                    self.coordinator.close_modal(CloseReason::Cancelled);
                }
                _ => {}
            }
            return;
        };

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => {
                self.coordinator.escape();
                return;
            }
            KeyCode::Char('s') if ctrl => return self.submit_form(),
            KeyCode::Enter if focus != FormField::Content || ctrl => return self.submit_form(),
            _ => {}
        }
        let Some(form) = self.coordinator.form_mut() else {
            return;
        };
        match key.code {
            KeyCode::Tab => form.focus_next(),
            KeyCode::BackTab => form.focus_previous(),
            KeyCode::Enter => form.insert_newline(),
            KeyCode::Left if focus == FormField::Tag => form.cycle_tag(false),
            KeyCode::Right if focus == FormField::Tag => form.cycle_tag(true),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER) =>
            {
                form.insert_char(ch)
            }
            _ => {}
        }
    }

    fn submit_form(&mut self) {
        let requests = self.coordinator.submit_form();
        self.worker.dispatch_all(requests);
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let scroll_locked = self.coordinator.modal().background_scroll_locked();
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(content) = self.coordinator.modal().content() {
                    let area = ui::modal_area(self.screen, content);
                    if !ui::contains(area, mouse.column, mouse.row) {
                        self.coordinator.close_modal(CloseReason::Backdrop);
                    }
                    return;
                }
                let areas = ui::layout(self.screen);
                if ui::contains(areas.create_button, mouse.column, mouse.row) {
                    self.coordinator.open_create();
                } else if ui::contains(areas.search, mouse.column, mouse.row) {
                    self.view.begin_search();
                }
            }
            MouseEventKind::ScrollDown if !scroll_locked => {
                self.view.move_selection(1, self.displayed_len());
            }
            MouseEventKind::ScrollUp if !scroll_locked => {
                self.view.move_selection(-1, self.displayed_len());
            }
            _ => {}
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("creating terminal backend")?;
    terminal.hide_cursor().context("hiding cursor")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("restoring screen state")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::MemoryNotesApi;
    use crate::api::NoteTag;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent {
            code: KeyCode::Char(ch),
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn click(column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    fn app_with(api: Arc<MemoryNotesApi>) -> App {
        let mut app = App::new(&AppConfig::default(), api);
        app.screen = Rect::new(0, 0, 100, 40);
        let initial = app.coordinator.start();
        app.worker.dispatch_all(initial);
        app.settle();
        app
    }

    impl App {
        /// Waits for every dispatched request and its follow-ups to finish.
        fn settle(&mut self) {
            while let Some(response) = self.worker.recv_timeout(Duration::from_millis(500)) {
                self.apply(response);
            }
        }
    }

    #[test]
    fn keyboard_create_flow_reaches_the_api() {
        let api = Arc::new(MemoryNotesApi::with_notes(2));
        let mut app = app_with(api.clone());

        app.handle_key(key(KeyCode::Char('n')));
        assert!(app.coordinator().modal().is_open());
        for ch in "Buy milk".chars() {
            app.handle_key(key(KeyCode::Char(ch)));
        }
        app.handle_key(key(KeyCode::BackTab));
        app.handle_key(key(KeyCode::Left));
        app.handle_key(ctrl('s'));
        app.settle();

        assert_eq!(api.create_calls(), 1);
        assert!(!app.coordinator().modal().is_open());
        let first = &app.coordinator().query().displayed().unwrap().notes[0];
        assert_eq!(first.title, "Buy milk");
        assert_eq!(first.tag, NoteTag::Shopping);
        assert_eq!(app.toasts.active().len(), 1);
    }

    #[test]
    fn enter_inside_content_adds_a_line_instead_of_submitting() {
        let api = Arc::new(MemoryNotesApi::with_notes(0));
        let mut app = app_with(api.clone());
        app.handle_key(key(KeyCode::Char('n')));
        app.handle_key(key(KeyCode::Tab));
        app.handle_key(key(KeyCode::Char('a')));
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::Char('b')));
        let form = app.coordinator().modal().form().unwrap();
        assert_eq!(form.draft().content, "a\nb");
        assert_eq!(api.create_calls(), 0);
    }

    #[test]
    fn backdrop_click_closes_modal_and_inside_click_does_not() {
        let api = Arc::new(MemoryNotesApi::with_notes(1));
        let mut app = app_with(api);
        app.handle_key(key(KeyCode::Char('n')));
        let area = match app.coordinator().modal().content() {
            Some(content) => ui::modal_area(app.screen, content),
            None => panic!("modal should be open"),
        };
        app.handle_mouse(click(area.x + 1, area.y + 1));
        assert!(app.coordinator().modal().is_open());
        app.handle_mouse(click(0, 0));
        assert!(!app.coordinator().modal().is_open());
        assert!(!app.coordinator().modal().background_scroll_locked());
    }

    #[test]
    fn delete_key_confirms_before_removing() {
        let api = Arc::new(MemoryNotesApi::with_notes(3));
        let mut app = app_with(api.clone());
        app.handle_key(key(KeyCode::Char('j')));
        let target = app.selected_note_id().unwrap();

        app.handle_key(key(KeyCode::Char('d')));
        assert_eq!(api.delete_calls(), 0);
        app.handle_key(key(KeyCode::Char('y')));
        app.settle();

        assert_eq!(api.delete_calls(), 1);
        let remaining = &app.coordinator().query().displayed().unwrap().notes;
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|note| note.id != target));
    }

    #[test]
    fn search_enter_commits_immediately() {
        let api = Arc::new(MemoryNotesApi::with_notes(3));
        let mut app = app_with(api.clone());
        app.handle_key(key(KeyCode::Char('/')));
        for ch in "Note 3".chars() {
            app.handle_key(key(KeyCode::Char(ch)));
        }
        assert_eq!(api.list_calls().len(), 1, "debounced until commit");
        app.handle_key(key(KeyCode::Enter));
        app.settle();

        assert!(!app.view.is_search_active());
        assert_eq!(api.list_calls().last().unwrap().search, "Note 3");
        assert_eq!(app.displayed_len(), 1);
    }

    #[test]
    fn ctrl_u_clears_search_and_returns_to_first_page() {
        let api = Arc::new(MemoryNotesApi::with_notes(30));
        let mut app = app_with(api.clone());
        app.handle_key(key(KeyCode::Char('/')));
        for ch in "Note".chars() {
            app.handle_key(key(KeyCode::Char(ch)));
        }
        app.handle_key(key(KeyCode::Enter));
        app.settle();
        app.handle_key(key(KeyCode::Char('l')));
        app.settle();
        assert_eq!(app.coordinator().pages().current(), 2);

        app.handle_key(key(KeyCode::Char('/')));
        app.handle_key(ctrl('u'));
        app.settle();

        assert_eq!(app.coordinator().search().raw_input(), "");
        assert_eq!(app.coordinator().search().committed(), "");
        assert_eq!(app.coordinator().pages().current(), 1);
        let last = api.list_calls().last().cloned().unwrap();
        assert_eq!((last.search.as_str(), last.page), (" ", 1));
    }

    #[test]
    fn modal_swallows_background_navigation() {
        let api = Arc::new(MemoryNotesApi::with_notes(30));
        let mut app = app_with(api.clone());
        app.handle_key(key(KeyCode::Char('n')));
        app.handle_key(key(KeyCode::Char('l')));
        app.handle_mouse(MouseEvent {
            kind: MouseEventKind::ScrollDown,
            column: 1,
            row: 10,
            modifiers: KeyModifiers::NONE,
        });
        assert_eq!(app.coordinator().pages().current(), 1);
        assert_eq!(app.view.selected, 0);

        app.handle_key(key(KeyCode::Esc));
        app.handle_key(key(KeyCode::Char('l')));
        assert_eq!(app.coordinator().pages().current(), 2);
    }
}
