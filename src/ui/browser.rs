use crate::error::{LayoutError, LayoutResult};
use crate::event::Key;
use crate::ui::event_map::{EventMap, Handler};
use crate::ui::screen::{Geometry, NodeId, NodeKind, Screen, Slot};
use crate::ui::widget::{self, InactiveItem, Item, Widget};

/// Selection state of a scrollable list of rows.
///
/// `pos` is either `None` or the index of a selectable row among the browser's children.
/// Headings occupy positions and viewport rows but are skipped by navigation.
#[derive(Clone, Debug)]
pub struct Browser<M> {
    pos: Option<usize>,
    on_select: Option<M>,
}

impl<M> Default for Browser<M> {
    fn default() -> Self {
        Self {
            pos: None,
            on_select: None,
        }
    }
}

impl<M> Browser<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pos(&self) -> Option<usize> {
        self.pos
    }

    pub(crate) fn install_bindings(events: &mut EventMap<M>) {
        events.register(Key::Char('k'), Handler::CursorUp);
        events.register(Key::Up, Handler::CursorUp);
        events.register(Key::Char('j'), Handler::CursorDown);
        events.register(Key::Down, Handler::CursorDown);
        events.register(Key::Enter, Handler::Activate);
    }
}

/// First row of the viewport so that `pos` sits near the middle without scrolling past the end.
pub fn window_start(pos: usize, total: usize, height: usize) -> usize {
    pos.saturating_sub(height / 2)
        .min(total.saturating_sub(height))
}

#[derive(Clone, Copy)]
enum Direction {
    Forward,
    Backward,
}

impl<M: Clone, P> Screen<M, P> {
    pub fn browser(&self, id: NodeId) -> LayoutResult<&Browser<M>> {
        match self.widget(id)? {
            Widget::Browser(b) => Ok(b),
            other => Err(LayoutError::WidgetMismatch {
                expected: "browser",
                found: other.name(),
            }),
        }
    }

    fn browser_mut(&mut self, id: NodeId) -> LayoutResult<&mut Browser<M>> {
        match self.widget_mut(id)? {
            Widget::Browser(b) => Ok(b),
            other => Err(LayoutError::WidgetMismatch {
                expected: "browser",
                found: other.name(),
            }),
        }
    }

    pub fn item(&self, id: NodeId) -> LayoutResult<&Item<P>> {
        match self.widget(id)? {
            Widget::Item(item) => Ok(item),
            other => Err(LayoutError::WidgetMismatch {
                expected: "item",
                found: other.name(),
            }),
        }
    }

    fn item_mut(&mut self, id: NodeId) -> LayoutResult<&mut Item<P>> {
        match self.widget_mut(id)? {
            Widget::Item(item) => Ok(item),
            other => Err(LayoutError::WidgetMismatch {
                expected: "item",
                found: other.name(),
            }),
        }
    }

    fn is_selectable(&self, id: NodeId) -> bool {
        self.widget(id).is_ok_and(Widget::is_selectable)
    }

    pub fn browser_pos(&self, id: NodeId) -> LayoutResult<Option<usize>> {
        Ok(self.browser(id)?.pos)
    }

    pub fn add_item(&mut self, browser: NodeId, item: Item<P>) -> LayoutResult<NodeId> {
        self.add_widget(browser, Widget::Item(item))
    }

    pub fn add_heading(&mut self, browser: NodeId, text: &str) -> LayoutResult<NodeId> {
        self.add_widget(browser, Widget::InactiveItem(InactiveItem::new(text)))
    }

    /// Message queued when Enter is pressed on this browser while it has a selection.
    pub fn set_selection_callback(&mut self, browser: NodeId, message: M) -> LayoutResult<()> {
        self.browser_mut(browser)?.on_select = Some(message);
        Ok(())
    }

    pub fn selection_callback(&self, browser: NodeId) -> LayoutResult<Option<M>> {
        Ok(self.browser(browser)?.on_select.clone())
    }

    /// The row currently holding the selection, if any.
    pub fn selected_item(&self, browser: NodeId) -> LayoutResult<Option<(NodeId, &Item<P>)>> {
        let Some(pos) = self.browser(browser)?.pos else {
            return Ok(None);
        };
        let Some(&child) = self.children(browser)?.get(pos) else {
            return Ok(None);
        };
        Ok(Some((child, self.item(child)?)))
    }

    /// Payloads of every selectable row, in list order.
    pub fn items(&self, browser: NodeId) -> LayoutResult<Vec<&Item<P>>> {
        self.browser(browser)?;
        Ok(self
            .children(browser)?
            .iter()
            .filter_map(|&child| self.item(child).ok())
            .collect())
    }

    /// Called when a row is linked under a browser.
    pub(crate) fn adopt_default(&mut self, browser: NodeId, index: usize, child: NodeId) -> LayoutResult<()> {
        let wants_selection = self.browser(browser)?.pos.is_none()
            && self.item(child).is_ok_and(|item| item.default);
        if wants_selection {
            self.select_index(browser, index)?;
        }
        Ok(())
    }

    fn select_index(&mut self, browser: NodeId, index: usize) -> LayoutResult<()> {
        let children = self.children(browser)?.to_vec();
        if let Some(old) = self.browser(browser)?.pos.and_then(|p| children.get(p).copied()) {
            if let Ok(item) = self.item_mut(old) {
                item.selected = false;
            }
        }
        let child = children
            .get(index)
            .copied()
            .ok_or_else(|| LayoutError::UnknownNode(format!("row {index} of {browser}")))?;
        self.item_mut(child)?.selected = true;
        self.browser_mut(browser)?.pos = Some(index);
        Ok(())
    }

    fn scan(&self, browser: NodeId, from: Option<usize>, direction: Direction) -> LayoutResult<Option<usize>> {
        let children = self.children(browser)?;
        let found = match direction {
            Direction::Forward => {
                let start = from.unwrap_or(0);
                (start..children.len()).find(|&i| self.is_selectable(children[i]))
            }
            Direction::Backward => match (from, children.len().checked_sub(1)) {
                (Some(start), Some(last)) => (0..=start.min(last))
                    .rev()
                    .find(|&i| self.is_selectable(children[i])),
                _ => None,
            },
        };
        Ok(found)
    }

    fn step(&mut self, browser: NodeId, direction: Direction) -> LayoutResult<bool> {
        let pos = self.browser(browser)?.pos;
        let next = match (pos, direction) {
            (None, Direction::Forward) => self.scan(browser, None, Direction::Forward)?,
            (None, Direction::Backward) => None,
            (Some(p), Direction::Forward) => self.scan(browser, Some(p + 1), direction)?,
            (Some(0), Direction::Backward) => None,
            (Some(p), Direction::Backward) => self.scan(browser, Some(p - 1), direction)?,
        };
        match next {
            Some(index) => {
                self.select_index(browser, index)?;
                self.redraw(browser)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Move the selection to the next selectable row. Returns false at the end of the list.
    pub fn browser_down(&mut self, browser: NodeId) -> LayoutResult<bool> {
        self.step(browser, Direction::Forward)
    }

    /// Move the selection to the previous selectable row. Returns false at the top.
    pub fn browser_up(&mut self, browser: NodeId) -> LayoutResult<bool> {
        self.step(browser, Direction::Backward)
    }

    /// Remove every row and forget the selection.
    pub fn clear_browser(&mut self, browser: NodeId) -> LayoutResult<()> {
        self.browser_mut(browser)?.pos = None;
        self.drop_children(browser)
    }

    /// Remove the selected row, moving the selection to the next selectable row after it,
    /// or failing that the closest one before it.
    pub fn remove_selected(&mut self, browser: NodeId) -> LayoutResult<Option<Item<P>>> {
        let Some(pos) = self.browser(browser)?.pos else {
            return Ok(None);
        };
        let child = self.children(browser)?[pos];
        let node = self.take(child)?;
        self.browser_mut(browser)?.pos = None;

        let next = match self.scan(browser, Some(pos), Direction::Forward)? {
            Some(index) => Some(index),
            None if pos > 0 => self.scan(browser, Some(pos - 1), Direction::Backward)?,
            None => None,
        };
        if let Some(index) = next {
            self.select_index(browser, index)?;
        }

        Ok(match node.into_kind() {
            NodeKind::Widget(Widget::Item(mut item)) => {
                item.selected = false;
                Some(item)
            }
            _ => None,
        })
    }

    pub(crate) fn redraw_browser(&mut self, browser: NodeId, geometry: Geometry) -> LayoutResult<()> {
        if self.browser(browser)?.pos.is_none() {
            if let Some(first) = self.scan(browser, None, Direction::Forward)? {
                self.select_index(browser, first)?;
            }
        }

        let (canvas, theme) = self.canvas_and_theme();
        let bounds = canvas.area;
        if let Some(area) = geometry.clip(bounds) {
            widget::blank(area, theme, canvas);
        }

        let focused = self.is_focused(browser);
        let children = self.children(browser)?.to_vec();
        let height = geometry.height.max(0) as usize;
        let start = window_start(self.browser(browser)?.pos.unwrap_or(0), children.len(), height);

        for (index, child) in children.into_iter().enumerate() {
            self.set_focused(child, focused)?;
            if index < start || index >= start + height {
                self.set_geometry(child, None)?;
                continue;
            }
            let row = Slot {
                x: geometry.x,
                y: geometry.y + (index - start) as i32,
                width: geometry.width,
                height: 1,
                avail_width: geometry.width,
                avail_height: 1,
            };
            self.compute_dimensions(child, Some(row))?;
            self.redraw(child)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::screen::Node;
    use crate::ui::theme::Theme;
    use crate::ui::value::Value;

    type TestScreen = Screen<&'static str, u32>;

    fn list(rows: u16) -> (TestScreen, NodeId) {
        let mut s = Screen::new(20, rows, Theme::default());
        let root = s.root();
        let b = s.add_widget(root, Widget::Browser(Browser::new())).unwrap();
        (s, b)
    }

    #[test]
    fn test_window_start_centers_and_clamps() {
        assert_eq!(window_start(0, 100, 10), 0);
        assert_eq!(window_start(4, 100, 10), 0);
        assert_eq!(window_start(50, 100, 10), 45);
        assert_eq!(window_start(99, 100, 10), 90);
        assert_eq!(window_start(2, 3, 10), 0);
    }

    #[test]
    fn test_navigation_skips_headings_without_wrapping() {
        let (mut s, b) = list(10);
        s.add_heading(b, "Season 1").unwrap();
        for (i, name) in ["A", "B", "C"].into_iter().enumerate() {
            s.add_item(b, Item::new(name, i as u32)).unwrap();
        }
        assert_eq!(s.browser_pos(b).unwrap(), None);

        s.redraw(s.root()).unwrap();
        assert_eq!(s.browser_pos(b).unwrap(), Some(1));
        assert_eq!(s.selected_item(b).unwrap().unwrap().1.text, "A");

        assert!(s.browser_down(b).unwrap());
        assert!(s.browser_down(b).unwrap());
        assert_eq!(s.browser_pos(b).unwrap(), Some(3));
        assert!(!s.browser_down(b).unwrap());
        assert_eq!(s.browser_pos(b).unwrap(), Some(3));

        assert!(s.browser_up(b).unwrap());
        assert_eq!(s.selected_item(b).unwrap().unwrap().1.text, "B");
        assert!(s.browser_up(b).unwrap());
        assert!(!s.browser_up(b).unwrap());
        assert_eq!(s.browser_pos(b).unwrap(), Some(1));
    }

    #[test]
    fn test_moves_before_first_redraw() {
        let (mut s, b) = list(10);
        s.add_heading(b, "Season 1").unwrap();
        s.add_item(b, Item::new("A", 0)).unwrap();
        s.add_item(b, Item::new("B", 1)).unwrap();

        assert!(!s.browser_up(b).unwrap());
        assert_eq!(s.browser_pos(b).unwrap(), None);

        assert!(s.browser_down(b).unwrap());
        assert_eq!(s.browser_pos(b).unwrap(), Some(1));
    }

    #[test]
    fn test_only_one_row_is_marked_selected() {
        let (mut s, b) = list(10);
        for i in 0..4 {
            s.add_item(b, Item::new(format!("ep {i}"), i)).unwrap();
        }
        s.redraw(s.root()).unwrap();
        s.browser_down(b).unwrap();
        s.browser_down(b).unwrap();
        let marked: Vec<u32> = s
            .items(b)
            .unwrap()
            .into_iter()
            .filter(|i| i.selected)
            .map(|i| i.payload)
            .collect();
        assert_eq!(marked, vec![2]);
    }

    #[test]
    fn test_default_item_is_selected_on_add() {
        let (mut s, b) = list(10);
        s.add_item(b, Item::new("one", 1)).unwrap();
        s.add_item(b, Item::new("two", 2).default_selection(true)).unwrap();
        s.add_item(b, Item::new("three", 3).default_selection(true)).unwrap();
        assert_eq!(s.browser_pos(b).unwrap(), Some(1));
        assert_eq!(s.selected_item(b).unwrap().unwrap().1.payload, 2);
    }

    #[test]
    fn test_clear_resets_selection() {
        let (mut s, b) = list(10);
        let row = s.add_item(b, Item::new("one", 1).default_selection(true)).unwrap();
        s.clear_browser(b).unwrap();
        assert_eq!(s.browser_pos(b).unwrap(), None);
        assert!(s.children(b).unwrap().is_empty());
        assert!(!s.contains(row));
        assert!(s.selected_item(b).unwrap().is_none());
        s.redraw(s.root()).unwrap();
        assert_eq!(s.browser_pos(b).unwrap(), None);
    }

    #[test]
    fn test_remove_selected_prefers_following_row() {
        let (mut s, b) = list(10);
        for i in 0..3 {
            s.add_item(b, Item::new(format!("s{i}"), i)).unwrap();
        }
        s.redraw(s.root()).unwrap();
        s.browser_down(b).unwrap();

        let removed = s.remove_selected(b).unwrap().unwrap();
        assert_eq!(removed.payload, 1);
        assert_eq!(s.selected_item(b).unwrap().unwrap().1.payload, 2);

        let removed = s.remove_selected(b).unwrap().unwrap();
        assert_eq!(removed.payload, 2);
        assert_eq!(s.selected_item(b).unwrap().unwrap().1.payload, 0);

        s.remove_selected(b).unwrap();
        assert_eq!(s.browser_pos(b).unwrap(), None);
        assert!(s.remove_selected(b).unwrap().is_none());
    }

    #[test]
    fn test_viewport_follows_selection() {
        let (mut s, b) = list(4);
        for i in 0..10 {
            s.add_item(b, Item::new(format!("row {i}"), i)).unwrap();
        }
        s.redraw(s.root()).unwrap();
        assert_eq!(s.line(0), "row 0");
        for _ in 0..6 {
            s.browser_down(b).unwrap();
        }
        assert_eq!(s.line(0), "row 4");
        assert_eq!(s.line(2), "row 6");
        for _ in 0..3 {
            s.browser_down(b).unwrap();
        }
        assert_eq!(s.line(0), "row 6");
        assert_eq!(s.line(3), "row 9");
    }

    #[test]
    fn test_browser_rejects_non_rows() {
        let (mut s, b) = list(4);
        let err = s.add_widget(b, Widget::Dummy).unwrap_err();
        assert!(matches!(err, LayoutError::WrongChildType(_)));
        let col = s.insert(Node::vertical(Value::fill(), Value::fill()));
        assert!(matches!(s.add_child(b, col), Err(LayoutError::WrongChildType(_))));
    }

    #[test]
    fn test_default_bindings_route_to_browser() {
        let (s, b) = list(4);
        assert_eq!(s.route(b, &Key::Char('j')).unwrap(), Some((b, Handler::CursorDown)));
        assert_eq!(s.route(b, &Key::Up).unwrap(), Some((b, Handler::CursorUp)));
        assert_eq!(s.route(b, &Key::Enter).unwrap(), Some((b, Handler::Activate)));
    }

    #[test]
    fn test_operations_on_wrong_widget_fail() {
        let (mut s, _) = list(4);
        let root = s.root();
        assert!(matches!(s.browser_down(root), Err(LayoutError::WidgetMismatch { .. })));
    }
}
