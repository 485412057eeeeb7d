use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use time::{macros::format_description, OffsetDateTime};
use unicode_width::UnicodeWidthStr;

use crate::api::{Note, NoteTag};
use crate::app::coordinator::{Coordinator, LOAD_FAILURE};
use crate::app::modal::ModalContent;
use crate::app::state::{FocusPane, ViewState};
use crate::form::{FormField, NoteForm, CONTENT_MAX_CHARS};
use crate::notify::{Notifier, Toast, ToastLevel};
use crate::query::ListingView;

pub const LOADING_MESSAGE: &str = "Loading notes...";
pub const EMPTY_MESSAGE: &str = "No notes found. Create your first note!";
pub const CREATE_BUTTON: &str = "Create note +";

const TOAST_WIDTH: u16 = 44;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLabel {
    Page(u32),
    Gap,
}

/// Page buttons for the pagination control: the first and last page plus a
/// window around the current one. Empty when everything fits on one page.
pub fn pagination_labels(current: u32, total: u32) -> Vec<PageLabel> {
    if total <= 1 {
        return Vec::new();
    }
    let current = current.clamp(1, total);
    let window_start = current.saturating_sub(2).max(1);
    let window_end = current.saturating_add(2).min(total);
    let pages = std::iter::once(1)
        .chain(window_start..=window_end)
        .chain(std::iter::once(total));

    let mut labels = Vec::new();
    let mut last_shown = 0;
    for page in pages {
        if page <= last_shown {
            continue;
        }
        if last_shown != 0 && page > last_shown + 1 {
            labels.push(PageLabel::Gap);
        }
        labels.push(PageLabel::Page(page));
        last_shown = page;
    }
    labels
}

pub struct AppLayout {
    pub search: Rect,
    pub pagination: Rect,
    pub create_button: Rect,
    pub notes: Rect,
    pub status: Rect,
}

pub fn layout(area: Rect) -> AppLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);
    let header = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Min(10),
            Constraint::Length(CREATE_BUTTON.len() as u16 + 4),
        ])
        .split(vertical[0]);
    AppLayout {
        search: header[0],
        pagination: header[1],
        create_button: header[2],
        notes: vertical[1],
        status: vertical[2],
    }
}

/// Screen rectangle occupied by the modal; clicks outside it count as a
/// backdrop click.
pub fn modal_area(area: Rect, content: &ModalContent) -> Rect {
    match content {
        ModalContent::CreateNote(_) => centered_rect(60, 80, area),
        ModalContent::ConfirmDelete { .. } => centered_rect(50, 30, area),
    }
}

pub fn contains(rect: Rect, column: u16, row: u16) -> bool {
    column >= rect.x
        && column < rect.x.saturating_add(rect.width)
        && row >= rect.y
        && row < rect.y.saturating_add(rect.height)
}

pub fn draw_app<N: Notifier>(
    frame: &mut Frame,
    coordinator: &Coordinator<N>,
    view: &ViewState,
    list_state: &mut ListState,
    toasts: &[Toast],
) {
    let areas = layout(frame.size());

    render_search(frame, coordinator, view, areas.search);
    render_pagination(frame, coordinator, areas.pagination);
    let button = Paragraph::new(Line::from(Span::styled(
        CREATE_BUTTON,
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
    )))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(button, areas.create_button);

    render_listing(frame, coordinator, view, list_state, areas.notes);
    render_status(frame, coordinator, view, areas.status);
    render_toasts(frame, toasts);

    if let Some(content) = coordinator.modal().content() {
        render_modal(frame, content);
    }
}

fn render_search<N: Notifier>(
    frame: &mut Frame,
    coordinator: &Coordinator<N>,
    view: &ViewState,
    area: Rect,
) {
    let raw = coordinator.search().raw_input();
    let active = view.focus == FocusPane::Search && !coordinator.modal().is_open();
    let border_style = if active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let text = if raw.is_empty() && !active {
        Line::from(Span::styled(
            "Search notes",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(raw.to_string())
    };
    let title = if coordinator.search().deadline().is_some() {
        "Search …"
    } else {
        "Search"
    };
    let paragraph = Paragraph::new(text).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(border_style),
    );
    frame.render_widget(paragraph, area);
    if active {
        let max_col = area.width.saturating_sub(3);
        let col = (UnicodeWidthStr::width(raw) as u16).min(max_col);
        frame.set_cursor(area.x + 1 + col, area.y + 1);
    }
}

fn render_pagination<N: Notifier>(frame: &mut Frame, coordinator: &Coordinator<N>, area: Rect) {
    let current = coordinator.pages().current();
    let labels = pagination_labels(current, coordinator.total_pages());
    if labels.is_empty() {
        return;
    }
    let mut spans = vec![Span::styled("‹ ", Style::default().fg(Color::Gray))];
    for label in labels {
        match label {
            PageLabel::Page(page) if page == current => spans.push(Span::styled(
                format!(" {page} "),
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            )),
            PageLabel::Page(page) => spans.push(Span::raw(format!(" {page} "))),
            PageLabel::Gap => spans.push(Span::raw(" … ")),
        }
    }
    spans.push(Span::styled(" ›", Style::default().fg(Color::Gray)));
    let paragraph = Paragraph::new(Line::from(spans))
        .block(Block::default().title("Pages").borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

fn render_listing<N: Notifier>(
    frame: &mut Frame,
    coordinator: &Coordinator<N>,
    view: &ViewState,
    list_state: &mut ListState,
    area: Rect,
) {
    let list_block_style = if view.focus == FocusPane::List && !coordinator.modal().is_open() {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let (page, title, placeholder) = match coordinator.view() {
        ListingView::Loading => {
            let paragraph = Paragraph::new(LOADING_MESSAGE)
                .style(Style::default().fg(Color::Gray))
                .block(Block::default().title("Notes").borders(Borders::ALL));
            frame.render_widget(paragraph, area);
            return;
        }
        ListingView::Failed(message) => {
            let paragraph = Paragraph::new(vec![
                Line::from(Span::styled(
                    LOAD_FAILURE,
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    message.to_string(),
                    Style::default().fg(Color::Gray),
                )),
                Line::from(""),
                Line::from(Span::styled(
                    "Press Ctrl-r to retry.",
                    Style::default().fg(Color::Gray),
                )),
            ])
            .wrap(Wrap { trim: false })
            .block(Block::default().title("Notes").borders(Borders::ALL));
            frame.render_widget(paragraph, area);
            return;
        }
        ListingView::Ready {
            page,
            fetching,
            placeholder,
        } => {
            let title = if fetching || placeholder {
                "Notes (refreshing…)"
            } else {
                "Notes"
            };
            (page, title, placeholder)
        }
    };

    if page.notes.is_empty() {
        let paragraph = Paragraph::new(EMPTY_MESSAGE)
            .style(Style::default().fg(Color::Gray))
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_style(list_block_style),
            );
        frame.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = page
        .notes
        .iter()
        .map(|note| note_card(note, coordinator.is_deleting(note.id), placeholder))
        .collect();
    list_state.select(view.selected_index(page.notes.len()));
    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(list_block_style),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, area, list_state);
}

fn note_card(note: &Note, deleting: bool, dimmed: bool) -> ListItem<'static> {
    let base = if dimmed {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };
    let mut title_spans = vec![Span::styled(
        note.title.clone(),
        base.add_modifier(Modifier::BOLD),
    )];
    if deleting {
        title_spans.push(Span::styled(
            "  deleting…",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::ITALIC),
        ));
    }
    let preview = note
        .content
        .lines()
        .next()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "(no content)".to_string());
    let meta = vec![
        Span::styled(format!("[{}]", note.tag), tag_style(note.tag)),
        Span::styled(
            format!("  {}", format_date(note.created_at)),
            Style::default().fg(Color::Gray),
        ),
    ];
    ListItem::new(vec![
        Line::from(title_spans),
        Line::from(Span::styled(preview, base.fg(Color::Gray))),
        Line::from(meta),
        Line::from(""),
    ])
}

fn tag_style(tag: NoteTag) -> Style {
    let color = match tag {
        NoteTag::Todo => Color::Yellow,
        NoteTag::Work => Color::Blue,
        NoteTag::Personal => Color::Magenta,
        NoteTag::Meeting => Color::Cyan,
        NoteTag::Shopping => Color::Green,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

fn format_date(dt: OffsetDateTime) -> String {
    dt.format(&format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| dt.unix_timestamp().to_string())
}

fn render_status<N: Notifier>(
    frame: &mut Frame,
    coordinator: &Coordinator<N>,
    view: &ViewState,
    area: Rect,
) {
    let hints = if coordinator.modal().is_open() {
        "Esc close"
    } else if view.is_search_active() {
        "Enter search now • Ctrl-u clear • Esc back to list"
    } else {
        "/ search • j/k select • h/l page • n new • d delete • Ctrl-r refresh • q quit"
    };
    let total = coordinator.total_pages().max(1);
    let spans = vec![
        Span::styled(
            format!("Page {}/{} ", coordinator.pages().current(), total),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw("| "),
        Span::raw(hints),
    ];
    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().fg(Color::Gray));
    frame.render_widget(paragraph, area);
}

fn render_toasts(frame: &mut Frame, toasts: &[Toast]) {
    let screen = frame.size();
    let width = TOAST_WIDTH.min(screen.width);
    let mut y = screen.y + 1;
    for toast in toasts {
        if y + 3 > screen.y + screen.height {
            break;
        }
        let area = Rect::new(screen.x + screen.width - width, y, width, 3);
        let (title, color) = match toast.level {
            ToastLevel::Success => ("Success", Color::Green),
            ToastLevel::Error => ("Error", Color::Red),
        };
        frame.render_widget(Clear, area);
        let paragraph = Paragraph::new(toast.message.clone()).block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        );
        frame.render_widget(paragraph, area);
        y += 3;
    }
}

fn render_modal(frame: &mut Frame, content: &ModalContent) {
    let area = modal_area(frame.size(), content);
    frame.render_widget(Clear, area);
    match content {
        ModalContent::CreateNote(form) => render_note_form(frame, form, area),
        ModalContent::ConfirmDelete { title, .. } => {
            let paragraph = Paragraph::new(vec![
                Line::from(Span::styled(
                    "Delete this note?",
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(title.clone()),
                Line::from(""),
                Line::from(Span::styled(
                    "y/Enter to delete • n/Esc to cancel",
                    Style::default().fg(Color::Gray),
                )),
            ])
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title("Delete note")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red)),
            );
            frame.render_widget(paragraph, area);
        }
    }
}

fn render_note_form(frame: &mut Frame, form: &NoteForm, area: Rect) {
    let block = Block::default()
        .title("Create note")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);

    let draft = form.draft();
    let focus = form.focus();

    let title_box = field_block(FormField::Title.label().to_string(), focus == FormField::Title);
    frame.render_widget(
        Paragraph::new(draft.title.clone()).block(title_box),
        rows[0],
    );
    render_field_error(frame, form, FormField::Title, rows[1]);

    let content_label = format!(
        "{} ({}/{})",
        FormField::Content.label(),
        draft.content.chars().count(),
        CONTENT_MAX_CHARS
    );
    let content_lines: Vec<Line> = draft
        .content
        .split('\n')
        .map(|line| Line::from(line.to_string()))
        .collect();
    let visible = rows[2].height.saturating_sub(2);
    let scroll = (content_lines.len() as u16).saturating_sub(visible);
    frame.render_widget(
        Paragraph::new(content_lines)
            .scroll((scroll, 0))
            .block(field_block(content_label, focus == FormField::Content)),
        rows[2],
    );
    render_field_error(frame, form, FormField::Content, rows[3]);

    let tag_line = match draft.tag {
        Some(tag) => Line::from(vec![
            Span::styled("‹ ", Style::default().fg(Color::Gray)),
            Span::styled(tag.to_string(), tag_style(tag)),
            Span::styled(" ›", Style::default().fg(Color::Gray)),
        ]),
        None => Line::from(Span::styled(
            "Select a tag",
            Style::default().fg(Color::DarkGray),
        )),
    };
    frame.render_widget(
        Paragraph::new(tag_line).block(field_block(
            FormField::Tag.label().to_string(),
            focus == FormField::Tag,
        )),
        rows[4],
    );
    render_field_error(frame, form, FormField::Tag, rows[5]);

    let submit_label = if form.is_submitting() {
        "[ Creating... ]"
    } else {
        "[ Create note ]"
    };
    let buttons = Line::from(vec![
        Span::styled("[ Cancel ]", Style::default().fg(Color::Gray)),
        Span::raw("  "),
        Span::styled(
            submit_label,
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
    ]);
    frame.render_widget(Paragraph::new(buttons), rows[6]);
    frame.render_widget(
        Paragraph::new(Span::styled(
            "Tab next field • ←/→ tag • Ctrl-s submit • Esc cancel",
            Style::default().fg(Color::Gray),
        )),
        rows[7],
    );

    match focus {
        FormField::Title => {
            let max_col = rows[0].width.saturating_sub(3);
            let col = (UnicodeWidthStr::width(draft.title.as_str()) as u16).min(max_col);
            frame.set_cursor(rows[0].x + 1 + col, rows[0].y + 1);
        }
        FormField::Content => {
            let last = draft.content.rsplit('\n').next().unwrap_or_default();
            let line_count = draft.content.split('\n').count() as u16;
            let row = line_count.saturating_sub(1).saturating_sub(scroll);
            let max_col = rows[2].width.saturating_sub(3);
            let col = (UnicodeWidthStr::width(last) as u16).min(max_col);
            frame.set_cursor(rows[2].x + 1 + col, rows[2].y + 1 + row);
        }
        FormField::Tag => {}
    }
}

fn field_block(label: String, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Block::default()
        .title(label)
        .borders(Borders::ALL)
        .border_style(style)
}

fn render_field_error(frame: &mut Frame, form: &NoteForm, field: FormField, area: Rect) {
    if let Some(message) = form.error_for(field) {
        frame.render_widget(
            Paragraph::new(Span::styled(
                message.to_string(),
                Style::default().fg(Color::Red),
            )),
            area,
        );
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(vertical[1])[1]
}
