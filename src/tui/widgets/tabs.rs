use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Tabs;

use crate::Config;
use crate::tui::app::Tab;
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};

/// Tab strip; each title carries the number of rows behind it
pub fn render_tabs(f: &mut Frame, area: Rect, current_tab: Tab, counts: [usize; 3], config: &Config) {
    let theme = config.get_active_theme();
    let fg_color = parse_color(&theme.fg);
    let bg_color = parse_color(&theme.bg);
    let highlight_bg = parse_color(&theme.highlight_bg);
    let tab_bg = parse_color(&theme.tab_bg);
    let tab_fg = get_contrast_text_color(tab_bg);

    let titles: Vec<Line> = Tab::ALL
        .iter()
        .zip(counts)
        .map(|(tab, count)| {
            Line::from(vec![
                Span::styled("  ", Style::default().bg(tab_bg)),
                Span::styled(format!("{} ({})", tab.title(), count), Style::default().fg(tab_fg).bg(tab_bg)),
                Span::styled("  ", Style::default().bg(tab_bg)),
            ])
        })
        .collect();

    let tabs = Tabs::new(titles)
        .select(current_tab.index())
        .style(Style::default().fg(fg_color).bg(bg_color))
        .highlight_style(
            Style::default()
                .fg(get_contrast_text_color(highlight_bg))
                .bg(highlight_bg)
                .add_modifier(Modifier::BOLD),
        )
        .divider("  ")
        .padding("", "");

    f.render_widget(tabs, area);
}
