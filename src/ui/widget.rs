use std::collections::VecDeque;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, Clear, Widget as _};

use crate::event::Key;
use crate::ui::browser::Browser;
use crate::ui::screen::{Geometry, NodeId};
use crate::ui::theme::Theme;

pub const ELLIPSIS: &str = "...";

/// Truncate `text` to `width` characters and mark the cut with an ellipsis.
///
/// The result of a truncation is `width + 3` characters long, so callers drawing into a
/// bounded cell go through [`fit_text`], which reserves room for the marker.
pub fn display_text(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let mut out: String = text.chars().take(width).collect();
        out.push_str(ELLIPSIS);
        out
    } else {
        text.to_string()
    }
}

/// Text that fits in `width` cells, truncated with [`display_text`] when needed.
pub fn fit_text(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width <= ELLIPSIS.len() {
        return text.chars().take(width).collect();
    }
    display_text(text, width - ELLIPSIS.len())
}

/// Center `text` in a field `width` cells wide, padding with spaces on both sides.
pub fn centered_text(text: &str, width: usize) -> String {
    let fitted = fit_text(text, width);
    let pad = width.saturating_sub(fitted.chars().count());
    let left = pad / 2;
    format!("{}{}{}", " ".repeat(left), fitted, " ".repeat(pad - left))
}

/// Leaf widgets of a screen. Only containers (one child) and browsers (rows) own children.
pub enum Widget<M, P> {
    Dummy,
    Container(Container),
    Item(Item<P>),
    InactiveItem(InactiveItem),
    Log(LogView),
    Shortcut(ShortcutBar),
    Browser(Browser<M>),
}

impl<M, P> Widget<M, P> {
    pub fn name(&self) -> &'static str {
        match self {
            Widget::Dummy => "dummy",
            Widget::Container(_) => "container",
            Widget::Item(_) => "item",
            Widget::InactiveItem(_) => "inactive item",
            Widget::Log(_) => "log",
            Widget::Shortcut(_) => "shortcut",
            Widget::Browser(_) => "browser",
        }
    }

    /// Rows belong in browsers and nowhere else.
    pub fn is_row(&self) -> bool {
        matches!(self, Widget::Item(_) | Widget::InactiveItem(_))
    }

    pub fn is_selectable(&self) -> bool {
        matches!(self, Widget::Item(_))
    }
}

fn base_style(theme: &Theme) -> Style {
    Style::default().fg(theme.colors.fg()).bg(theme.colors.bg())
}

pub fn blank(area: Rect, theme: &Theme, buf: &mut Buffer) {
    Clear.render(area, buf);
    buf.set_style(area, base_style(theme));
}

pub fn render_dummy(geometry: Geometry, area: Rect, theme: &Theme, buf: &mut Buffer) {
    blank(area, theme, buf);
    Block::bordered()
        .border_style(Style::default().fg(theme.colors.border()))
        .render(area, buf);
    let label = format!(
        "{}x{} - ({},{})",
        geometry.height, geometry.width, geometry.y, geometry.x
    );
    buf.set_stringn(
        area.x,
        area.y,
        fit_text(&label, area.width as usize),
        area.width as usize,
        Style::default().fg(theme.colors.dim()),
    );
}

#[derive(Clone, Debug, Default)]
pub struct Container {
    pub title: Option<String>,
    pub border: bool,
    pub centered: bool,
    pub emphasis: Modifier,
}

impl Container {
    pub fn new(border: bool, title: Option<&str>) -> Self {
        Self {
            title: title.map(str::to_string),
            border,
            centered: false,
            emphasis: Modifier::empty(),
        }
    }

    pub fn centered(mut self) -> Self {
        self.centered = true;
        self
    }

    pub fn emphasis(mut self, modifier: Modifier) -> Self {
        self.emphasis = modifier;
        self
    }

    /// Rectangle handed to the child after the frame and title take their share.
    pub fn content(&self, outer: Geometry) -> Geometry {
        if self.border {
            Geometry {
                x: outer.x + 1,
                y: outer.y + 1,
                width: outer.width - 2,
                height: outer.height - 2,
            }
        } else if self.title.is_some() {
            Geometry {
                x: outer.x,
                y: outer.y + 1,
                width: outer.width - 1,
                height: outer.height - 1,
            }
        } else {
            outer
        }
    }

    pub fn render(&self, area: Rect, focused: bool, theme: &Theme, buf: &mut Buffer) {
        let colors = &theme.colors;
        blank(area, theme, buf);
        if self.border {
            let border = if focused {
                colors.border_focused()
            } else {
                colors.border()
            };
            Block::bordered()
                .border_style(Style::default().fg(border))
                .render(area, buf);
        }
        if let Some(title) = &self.title {
            let inset = if self.border { 1 } else { 0 };
            let field = (area.width as usize).saturating_sub(2 * inset as usize);
            let text = if self.centered {
                centered_text(title, field)
            } else {
                fit_text(title, field)
            };
            buf.set_stringn(
                area.x + inset,
                area.y,
                text,
                field,
                Style::default()
                    .fg(colors.title())
                    .add_modifier(self.emphasis),
            );
        }
    }
}

#[derive(Clone, Debug)]
pub struct Item<P> {
    pub text: String,
    pub payload: P,
    pub default: bool,
    pub selected: bool,
}

impl<P> Item<P> {
    pub fn new(text: impl Into<String>, payload: P) -> Self {
        Self {
            text: text.into(),
            payload,
            default: false,
            selected: false,
        }
    }

    pub fn default_selection(mut self, default: bool) -> Self {
        self.default = default;
        self
    }

    pub fn render(&self, area: Rect, focused: bool, theme: &Theme, buf: &mut Buffer) {
        let colors = &theme.colors;
        let style = match (self.selected, focused) {
            (true, true) => Style::default()
                .fg(colors.selected_fg())
                .bg(colors.selected_bg())
                .add_modifier(Modifier::BOLD),
            (true, false) => Style::default()
                .fg(colors.fg())
                .bg(colors.selected_unfocused_bg()),
            (false, true) => base_style(theme),
            (false, false) => Style::default().fg(colors.dim()).bg(colors.bg()),
        };
        Clear.render(area, buf);
        buf.set_style(area, style);
        let width = area.width as usize;
        buf.set_stringn(area.x, area.y, fit_text(&self.text, width), width, style);
    }
}

/// A heading or separator row: occupies a list position but can never hold the selection.
#[derive(Clone, Debug)]
pub struct InactiveItem {
    pub text: String,
}

impl InactiveItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn render(&self, area: Rect, theme: &Theme, buf: &mut Buffer) {
        let style = Style::default()
            .fg(theme.colors.heading())
            .bg(theme.colors.bg())
            .add_modifier(Modifier::BOLD);
        Clear.render(area, buf);
        buf.set_style(area, style);
        let width = area.width as usize;
        buf.set_stringn(area.x, area.y, fit_text(&self.text, width), width, style);
    }
}

/// Bounded line buffer shown newest-last.
#[derive(Clone, Debug)]
pub struct LogView {
    lines: VecDeque<String>,
    capacity: usize,
}

impl LogView {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, line: &str) {
        self.lines.push_back(line.trim().to_string());
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn render(&self, area: Rect, theme: &Theme, buf: &mut Buffer) {
        blank(area, theme, buf);
        let height = area.height as usize;
        let width = area.width as usize;
        let skip = self.lines.len().saturating_sub(height);
        for (row, line) in self.lines.iter().skip(skip).enumerate() {
            buf.set_stringn(
                area.x,
                area.y + row as u16,
                fit_text(line, width),
                width,
                base_style(theme),
            );
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Legend {
    pub key: Key,
    pub description: String,
}

/// Key legend for whichever control is active; global entries are always appended.
#[derive(Clone, Debug, Default)]
pub struct ShortcutBar {
    targets: Vec<(NodeId, Vec<Legend>)>,
    global: Vec<Legend>,
    active: Option<NodeId>,
}

impl ShortcutBar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, target: NodeId, legend: Legend) {
        match self.targets.iter_mut().find(|(id, _)| *id == target) {
            Some((_, entries)) => entries.push(legend),
            None => self.targets.push((target, vec![legend])),
        }
    }

    pub fn add_global(&mut self, legend: Legend) {
        self.global.push(legend);
    }

    pub fn set_active(&mut self, target: NodeId) {
        self.active = Some(target);
    }

    pub fn active(&self) -> Option<NodeId> {
        self.active
    }

    pub fn visible(&self) -> Vec<&Legend> {
        let local = self
            .targets
            .iter()
            .find(|(id, _)| Some(*id) == self.active)
            .map(|(_, entries)| entries.as_slice())
            .unwrap_or(&[]);
        local.iter().chain(self.global.iter()).collect()
    }

    pub fn render(&self, area: Rect, theme: &Theme, buf: &mut Buffer) {
        let colors = &theme.colors;
        blank(area, theme, buf);
        let right = area.x.saturating_add(area.width);
        let mut x = area.x;
        for legend in self.visible() {
            if x >= right {
                break;
            }
            let key = format!(" {} ", legend.key.label());
            let (after_key, _) = buf.set_stringn(
                x,
                area.y,
                &key,
                (right - x) as usize,
                Style::default()
                    .fg(colors.shortcut_key())
                    .bg(colors.bg())
                    .add_modifier(Modifier::BOLD),
            );
            x = after_key;
            if x >= right {
                break;
            }
            let (after_desc, _) = buf.set_stringn(
                x,
                area.y,
                format!("{}  ", legend.description),
                (right - x) as usize,
                Style::default().fg(colors.dim()).bg(colors.bg()),
            );
            x = after_desc;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_text_short_text_unchanged() {
        assert_eq!(display_text("Naruto", 10), "Naruto");
        assert_eq!(display_text("exact", 5), "exact");
        assert_eq!(display_text("", 0), "");
    }

    #[test]
    fn test_display_text_truncates_with_ellipsis() {
        let out = display_text("Fullmetal Alchemist", 9);
        assert_eq!(out, "Fullmetal...");
        assert_eq!(out.chars().count(), 9 + ELLIPSIS.len());
        assert!(out.ends_with(ELLIPSIS));
    }

    #[test]
    fn test_display_text_idempotent_at_same_width() {
        for text in ["", "a", "abcdef", "Shingeki no Kyojin: The Final Season"] {
            for width in 0..12 {
                let once = display_text(text, width);
                assert_eq!(display_text(&once, width), once, "{text:?} at {width}");
            }
        }
    }

    #[test]
    fn test_display_text_counts_chars_not_bytes() {
        assert_eq!(display_text("\u{2713}\u{2713}\u{2713}", 3), "\u{2713}\u{2713}\u{2713}");
        assert_eq!(display_text("\u{2713}\u{2713}\u{2713}", 1), "\u{2713}...");
    }

    #[test]
    fn test_fit_text_never_exceeds_width() {
        for width in 3..20 {
            let fitted = fit_text("One Punch Man Season 2 Episode 12", width);
            assert!(fitted.chars().count() <= width);
        }
        assert_eq!(fit_text("abcdefgh", 6), "abc...");
    }

    #[test]
    fn test_centered_text_pads_symmetrically() {
        assert_eq!(centered_text("CR", 6), "  CR  ");
        assert_eq!(centered_text("CR", 7), "  CR   ");
        assert_eq!(centered_text("too long title", 8), "too l...");
    }

    #[test]
    fn test_container_content_insets() {
        let outer = Geometry { x: 2, y: 3, width: 20, height: 10 };
        let bordered = Container::new(true, Some("Anime"));
        assert_eq!(bordered.content(outer), Geometry { x: 3, y: 4, width: 18, height: 8 });
        let titled = Container::new(false, Some("App"));
        assert_eq!(titled.content(outer), Geometry { x: 2, y: 4, width: 19, height: 9 });
        let bare = Container::new(false, None);
        assert_eq!(bare.content(outer), outer);
    }

    #[test]
    fn test_log_view_bounded() {
        let mut log = LogView::new(3);
        for i in 0..5 {
            log.push(&format!("  line {i}\n"));
        }
        assert_eq!(log.lines().collect::<Vec<_>>(), vec!["line 2", "line 3", "line 4"]);
        log.clear();
        assert!(log.is_empty());
    }
}
