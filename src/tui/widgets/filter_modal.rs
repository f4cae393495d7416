use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, StatefulWidget};

use crate::Config;
use crate::models::TAGGED_ONLY;
use crate::store::OrganizerState;
use crate::tui::app::{FilterField, FilterFormState};
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};
use crate::tui::widgets::popup_area;
use crate::view::{DueFilter, StatusFilter};

struct Palette {
    normal: Style,
    active: Style,
    muted: Style,
}

/// Filter modal: status and due radios, category and tag checklists
pub fn render_filter_modal(f: &mut Frame, area: Rect, state: &FilterFormState, organizers: &OrganizerState, config: &Config) {
    let theme = config.get_active_theme();
    let fg_color = parse_color(&theme.fg);
    let bg_color = parse_color(&theme.bg);
    let highlight_bg = parse_color(&theme.highlight_bg);
    let palette = Palette {
        normal: Style::default().fg(fg_color).bg(bg_color),
        active: Style::default().fg(get_contrast_text_color(highlight_bg)).bg(highlight_bg),
        muted: Style::default().fg(parse_color(&theme.muted_fg)).bg(bg_color),
    };

    let popup = popup_area(area, 80, 70);
    f.render_widget(Clear, popup);

    let outer = Block::default()
        .borders(Borders::ALL)
        .title("Filters")
        .title_alignment(Alignment::Center)
        .style(palette.normal);
    let inner = outer.inner(popup);
    f.render_widget(outer, popup);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Status
            Constraint::Length(3), // Due
            Constraint::Min(3),    // Categories + tags
            Constraint::Length(1), // Hints
        ])
        .split(inner);

    let status_labels: Vec<&str> = StatusFilter::ALL.iter().map(|s| s.label()).collect();
    let status_index = StatusFilter::ALL.iter().position(|s| *s == state.filter.status).unwrap_or(0);
    render_radio(f, vertical[0], "Status", &status_labels, status_index, state.current_field == FilterField::Status, &palette);

    let due_labels: Vec<&str> = DueFilter::ALL.iter().map(|d| d.label()).collect();
    let due_index = DueFilter::ALL.iter().position(|d| *d == state.filter.due).unwrap_or(0);
    render_radio(f, vertical[1], "Due date", &due_labels, due_index, state.current_field == FilterField::Due, &palette);

    let lists = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(vertical[2]);

    let categories: Vec<(String, bool)> = organizers
        .categories
        .iter()
        .map(|c| (c.name.clone(), state.filter.categories.contains(&c.id)))
        .collect();
    render_checklist(
        f,
        lists[0],
        "Categories",
        &categories,
        state.category_cursor,
        state.current_field == FilterField::Categories,
        &palette,
    );

    let mut tags = vec![("(tagged only)".to_string(), state.filter.tags.contains(&TAGGED_ONLY))];
    tags.extend(
        organizers
            .tags
            .iter()
            .map(|t| (t.name.clone(), state.filter.tags.contains(&t.id))),
    );
    render_checklist(f, lists[1], "Tags", &tags, state.tag_cursor, state.current_field == FilterField::Tags, &palette);

    let hints = "Tab: Next field • ←/→: Change • ↑/↓: Move • Space: Toggle • c: Clear • Enter: Apply • Esc: Cancel";
    f.render_widget(Paragraph::new(hints).style(palette.muted), vertical[3]);
}

fn field_block<'a>(title: &'a str, active: bool, palette: &Palette) -> Block<'a> {
    let (label, style) = if active {
        (format!("> {}", title), palette.active)
    } else {
        (format!("  {}", title), palette.normal)
    };
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(label, style.add_modifier(Modifier::BOLD)))
        .style(palette.normal)
}

fn render_radio(f: &mut Frame, area: Rect, title: &str, options: &[&str], selected: usize, active: bool, palette: &Palette) {
    let mut spans = Vec::new();
    for (index, option) in options.iter().enumerate() {
        let radio = if index == selected { "●" } else { "○" };
        let style = if index == selected && active { palette.active } else { palette.normal };
        spans.push(Span::styled(format!("{} {}", radio, option), style));
        spans.push(Span::raw("  "));
    }
    let paragraph = Paragraph::new(Line::from(spans)).block(field_block(title, active, palette));
    f.render_widget(paragraph, area);
}

fn render_checklist(
    f: &mut Frame,
    area: Rect,
    title: &str,
    rows: &[(String, bool)],
    cursor: usize,
    active: bool,
    palette: &Palette,
) {
    let items: Vec<ListItem> = if rows.is_empty() {
        vec![ListItem::new("(none)")]
    } else {
        rows.iter()
            .map(|(name, checked)| {
                let check = if *checked { "[x]" } else { "[ ]" };
                ListItem::new(format!("{} {}", check, name))
            })
            .collect()
    };
    let mut list_state = ListState::default();
    if active && !rows.is_empty() {
        list_state.select(Some(cursor.min(rows.len() - 1)));
    }
    let list = List::new(items)
        .block(field_block(title, active, palette))
        .style(palette.normal)
        .highlight_style(palette.active);
    StatefulWidget::render(list, area, f.buffer_mut(), &mut list_state);
}
