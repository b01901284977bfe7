use std::fmt;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;

use crate::error::{LayoutError, LayoutResult};
use crate::event::Key;
use crate::ui::browser::Browser;
use crate::ui::event_map::{EventMap, Handler};
use crate::ui::theme::Theme;
use crate::ui::value::{Value, ValueKind};
use crate::ui::widget::{self, Widget};

/// Handle to a node owned by a [`Screen`]. Stale handles (to removed nodes) are rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// Resolved screen rectangle of a node, in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Geometry {
    /// The drawable part of this rectangle inside `bounds`, if any.
    pub fn clip(&self, bounds: Rect) -> Option<Rect> {
        if self.width <= 0 || self.height <= 0 {
            return None;
        }
        let left = self.x.max(bounds.x as i32);
        let top = self.y.max(bounds.y as i32);
        let right = (self.x + self.width).min(bounds.right() as i32);
        let bottom = (self.y + self.height).min(bounds.bottom() as i32);
        if right <= left || bottom <= top {
            return None;
        }
        Some(Rect::new(
            left as u16,
            top as u16,
            (right - left) as u16,
            (bottom - top) as u16,
        ))
    }
}

/// Space a parent offers one child: the parent's rectangle (origin already offset for
/// stacking) and the budget still unclaimed along each axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slot {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub avail_width: i32,
    pub avail_height: i32,
}

impl Slot {
    pub fn within(geometry: Geometry) -> Self {
        Self {
            x: geometry.x,
            y: geometry.y,
            width: geometry.width,
            height: geometry.height,
            avail_width: geometry.width,
            avail_height: geometry.height,
        }
    }
}

pub enum NodeKind<M, P> {
    /// At most one child, which receives the whole rectangle.
    Base,
    /// Any number of children, each receiving the whole rectangle.
    Stacked,
    /// Children laid out left to right.
    Horizontal,
    /// Children laid out top to bottom.
    Vertical,
    Widget(Widget<M, P>),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Arrangement {
    Overlay,
    Horizontal,
    Vertical,
    Widget,
}

impl<M, P> NodeKind<M, P> {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Base => "base layout",
            NodeKind::Stacked => "stacked layout",
            NodeKind::Horizontal => "horizontal layout",
            NodeKind::Vertical => "vertical layout",
            NodeKind::Widget(w) => w.name(),
        }
    }

    fn arrangement(&self) -> Arrangement {
        match self {
            NodeKind::Base | NodeKind::Stacked => Arrangement::Overlay,
            NodeKind::Horizontal => Arrangement::Horizontal,
            NodeKind::Vertical => Arrangement::Vertical,
            NodeKind::Widget(_) => Arrangement::Widget,
        }
    }
}

pub struct Node<M, P> {
    width: Value,
    height: Value,
    geometry: Option<Geometry>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    events: EventMap<M>,
    focused: bool,
    kind: NodeKind<M, P>,
}

impl<M, P> Node<M, P> {
    fn layout(width: Value, height: Value, kind: NodeKind<M, P>) -> Self {
        Self {
            width,
            height,
            geometry: None,
            parent: None,
            children: Vec::new(),
            events: EventMap::default(),
            focused: false,
            kind,
        }
    }

    pub fn base(width: Value, height: Value) -> Self {
        Self::layout(width, height, NodeKind::Base)
    }

    pub fn stacked(width: Value, height: Value) -> Self {
        Self::layout(width, height, NodeKind::Stacked)
    }

    pub fn horizontal(width: Value, height: Value) -> Self {
        Self::layout(width, height, NodeKind::Horizontal)
    }

    pub fn vertical(width: Value, height: Value) -> Self {
        Self::layout(width, height, NodeKind::Vertical)
    }

    /// Widgets take whatever rectangle their parent hands them, so their own size is unused.
    pub fn widget(widget: Widget<M, P>) -> Self {
        let mut node = Self::layout(Value::fill(), Value::fill(), NodeKind::Widget(widget));
        if matches!(node.kind, NodeKind::Widget(Widget::Browser(_))) {
            Browser::<M>::install_bindings(&mut node.events);
        }
        node
    }

    pub fn kind(&self) -> &NodeKind<M, P> {
        &self.kind
    }

    pub fn geometry(&self) -> Option<Geometry> {
        self.geometry
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn events(&self) -> &EventMap<M> {
        &self.events
    }

    pub(crate) fn into_kind(self) -> NodeKind<M, P> {
        self.kind
    }

    pub(crate) fn widget_ref(&self) -> Option<&Widget<M, P>> {
        match &self.kind {
            NodeKind::Widget(w) => Some(w),
            _ => None,
        }
    }

    pub(crate) fn widget_mut(&mut self) -> Option<&mut Widget<M, P>> {
        match &mut self.kind {
            NodeKind::Widget(w) => Some(w),
            _ => None,
        }
    }

    fn is_row(&self) -> bool {
        self.widget_ref().is_some_and(Widget::is_row)
    }
}

struct Entry<M, P> {
    generation: u32,
    node: Option<Node<M, P>>,
}

fn lookup<M, P>(entries: &[Entry<M, P>], id: NodeId) -> LayoutResult<&Node<M, P>> {
    entries
        .get(id.index as usize)
        .filter(|e| e.generation == id.generation)
        .and_then(|e| e.node.as_ref())
        .ok_or_else(|| LayoutError::UnknownNode(id.to_string()))
}

fn lookup_mut<M, P>(entries: &mut [Entry<M, P>], id: NodeId) -> LayoutResult<&mut Node<M, P>> {
    entries
        .get_mut(id.index as usize)
        .filter(|e| e.generation == id.generation)
        .and_then(|e| e.node.as_mut())
        .ok_or_else(|| LayoutError::UnknownNode(id.to_string()))
}

/// Root sizes come straight from the terminal and must be plain cell counts.
fn resolve_root(value: Value) -> LayoutResult<i32> {
    match value.kind {
        ValueKind::Absolute if value.cells() >= 0 => Ok(value.cells()),
        ValueKind::Absolute => Err(LayoutError::InvalidRootSizing),
        ValueKind::Relative => Err(LayoutError::MissingParentContext),
    }
}

/// Resolve one axis against the parent's extent, never exceeding the unclaimed budget.
fn resolve(value: Value, extent: i32, avail: i32) -> i32 {
    let cells = match value.kind {
        ValueKind::Absolute if value.cells() < 0 => avail + value.cells(),
        ValueKind::Absolute => value.cells(),
        ValueKind::Relative => value.fraction_of(extent),
    };
    cells.clamp(0, avail.max(0))
}

/// A retained layout tree plus the canvas it renders into.
///
/// `M` is the message type carried by key handlers, `P` the payload attached to list items.
pub struct Screen<M, P> {
    entries: Vec<Entry<M, P>>,
    free: Vec<u32>,
    root: NodeId,
    canvas: Buffer,
    theme: Theme,
}

impl<M: Clone, P> Screen<M, P> {
    pub fn new(width: u16, height: u16, theme: Theme) -> Self {
        let mut screen = Self {
            entries: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            canvas: Buffer::empty(Rect::new(0, 0, width, height)),
            theme,
        };
        screen.root = screen.insert(Node::base(
            Value::absolute(width as i32),
            Value::absolute(height as i32),
        ));
        screen
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn canvas(&self) -> &Buffer {
        &self.canvas
    }

    /// Current root size in cells.
    pub fn size(&self) -> (u16, u16) {
        (self.canvas.area.width, self.canvas.area.height)
    }

    /// Text of one canvas row, trailing blanks trimmed.
    pub fn line(&self, y: u16) -> String {
        let area = self.canvas.area;
        if y >= area.bottom() {
            return String::new();
        }
        let text: String = (area.left()..area.right())
            .map(|x| self.canvas[(x, y)].symbol())
            .collect();
        text.trim_end().to_string()
    }

    pub fn node(&self, id: NodeId) -> LayoutResult<&Node<M, P>> {
        lookup(&self.entries, id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> LayoutResult<&mut Node<M, P>> {
        lookup_mut(&mut self.entries, id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        lookup(&self.entries, id).is_ok()
    }

    pub fn geometry(&self, id: NodeId) -> Option<Geometry> {
        self.node(id).ok().and_then(Node::geometry)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).ok().and_then(Node::parent)
    }

    pub fn children(&self, id: NodeId) -> LayoutResult<&[NodeId]> {
        Ok(self.node(id)?.children())
    }

    pub fn is_focused(&self, id: NodeId) -> bool {
        self.node(id).is_ok_and(Node::is_focused)
    }

    pub fn widget(&self, id: NodeId) -> LayoutResult<&Widget<M, P>> {
        let node = self.node(id)?;
        node.widget_ref().ok_or(LayoutError::WidgetMismatch {
            expected: "leaf",
            found: node.kind.name(),
        })
    }

    pub fn widget_mut(&mut self, id: NodeId) -> LayoutResult<&mut Widget<M, P>> {
        let node = self.node_mut(id)?;
        let found = node.kind.name();
        node.widget_mut().ok_or(LayoutError::WidgetMismatch {
            expected: "leaf",
            found,
        })
    }

    /// Store a detached node and hand back its id.
    pub fn insert(&mut self, node: Node<M, P>) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                let entry = &mut self.entries[index as usize];
                entry.node = Some(node);
                NodeId {
                    index,
                    generation: entry.generation,
                }
            }
            None => {
                self.entries.push(Entry {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index: (self.entries.len() - 1) as u32,
                    generation: 0,
                }
            }
        }
    }

    /// Create `node` and attach it under `parent` in one step.
    pub fn attach(&mut self, parent: NodeId, node: Node<M, P>) -> LayoutResult<NodeId> {
        Self::check_child(self.node(parent)?, &node)?;
        let child = self.insert(node);
        self.link(parent, child)?;
        Ok(child)
    }

    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> LayoutResult<()> {
        if parent == child || child == self.root {
            return Err(LayoutError::WrongChildType(format!(
                "{child} cannot be placed under {parent}"
            )));
        }
        let child_node = self.node(child)?;
        if child_node.parent.is_some() {
            return Err(LayoutError::WrongChildType(format!(
                "{child} already has a parent"
            )));
        }
        Self::check_child(self.node(parent)?, child_node)?;
        self.link(parent, child)
    }

    pub fn base(&mut self, parent: NodeId, width: Value, height: Value) -> LayoutResult<NodeId> {
        self.attach(parent, Node::base(width, height))
    }

    pub fn stacked(&mut self, parent: NodeId, width: Value, height: Value) -> LayoutResult<NodeId> {
        self.attach(parent, Node::stacked(width, height))
    }

    pub fn horizontal(&mut self, parent: NodeId, width: Value, height: Value) -> LayoutResult<NodeId> {
        self.attach(parent, Node::horizontal(width, height))
    }

    pub fn vertical(&mut self, parent: NodeId, width: Value, height: Value) -> LayoutResult<NodeId> {
        self.attach(parent, Node::vertical(width, height))
    }

    pub fn add_widget(&mut self, parent: NodeId, widget: Widget<M, P>) -> LayoutResult<NodeId> {
        self.attach(parent, Node::widget(widget))
    }

    fn check_child(parent: &Node<M, P>, child: &Node<M, P>) -> LayoutResult<()> {
        match &parent.kind {
            NodeKind::Base if !parent.children.is_empty() => {
                Err(LayoutError::TooManyChildren(parent.kind.name()))
            }
            NodeKind::Base | NodeKind::Stacked | NodeKind::Horizontal | NodeKind::Vertical => {
                if child.is_row() {
                    Err(LayoutError::WrongChildType(format!(
                        "{} rows can only be placed in a browser",
                        child.kind.name()
                    )))
                } else {
                    Ok(())
                }
            }
            NodeKind::Widget(Widget::Container(_)) if !parent.children.is_empty() => {
                Err(LayoutError::TooManyChildren("container"))
            }
            NodeKind::Widget(Widget::Container(_)) => {
                if child.is_row() {
                    Err(LayoutError::WrongChildType(format!(
                        "{} rows can only be placed in a browser",
                        child.kind.name()
                    )))
                } else {
                    Ok(())
                }
            }
            NodeKind::Widget(Widget::Browser(_)) => {
                if child.is_row() {
                    Ok(())
                } else {
                    Err(LayoutError::WrongChildType(format!(
                        "a browser only holds item rows, not a {}",
                        child.kind.name()
                    )))
                }
            }
            NodeKind::Widget(w) => Err(LayoutError::LeafNodeViolation(w.name())),
        }
    }

    fn link(&mut self, parent: NodeId, child: NodeId) -> LayoutResult<()> {
        self.node_mut(child)?.parent = Some(parent);
        let parent_node = self.node_mut(parent)?;
        parent_node.children.push(child);
        let index = parent_node.children.len() - 1;
        if matches!(parent_node.kind, NodeKind::Widget(Widget::Browser(_))) {
            self.adopt_default(parent, index, child)?;
        }
        Ok(())
    }

    /// Drop `id` and everything below it. Handles to removed nodes become invalid.
    pub(crate) fn remove_subtree(&mut self, id: NodeId) -> LayoutResult<()> {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = self.node(current)?;
            stack.extend(node.children.iter().copied());
            let entry = &mut self.entries[current.index as usize];
            entry.node = None;
            entry.generation = entry.generation.wrapping_add(1);
            self.free.push(current.index);
        }
        Ok(())
    }

    /// Detach a childless node from its parent and hand it back.
    pub(crate) fn take(&mut self, id: NodeId) -> LayoutResult<Node<M, P>> {
        if let Some(parent) = self.node(id)?.parent {
            self.node_mut(parent)?.children.retain(|c| *c != id);
        }
        self.drop_children(id)?;
        let entry = &mut self.entries[id.index as usize];
        let node = entry
            .node
            .take()
            .ok_or_else(|| LayoutError::UnknownNode(id.to_string()))?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(id.index);
        Ok(node)
    }

    pub(crate) fn set_geometry(&mut self, id: NodeId, geometry: Option<Geometry>) -> LayoutResult<()> {
        self.node_mut(id)?.geometry = geometry;
        Ok(())
    }

    pub(crate) fn set_focused(&mut self, id: NodeId, focused: bool) -> LayoutResult<()> {
        self.node_mut(id)?.focused = focused;
        Ok(())
    }

    pub(crate) fn canvas_and_theme(&mut self) -> (&mut Buffer, &Theme) {
        (&mut self.canvas, &self.theme)
    }

    /// Detach and drop all children of `id`.
    pub(crate) fn drop_children(&mut self, id: NodeId) -> LayoutResult<()> {
        let children = std::mem::take(&mut self.node_mut(id)?.children);
        for child in children {
            self.remove_subtree(child)?;
        }
        Ok(())
    }

    /// Resolve the absolute rectangle of `id`.
    ///
    /// Without a slot the node is treated as a root: it sits at the origin and must be sized
    /// in absolute cells. Widgets copy the slot they are given verbatim.
    pub fn compute_dimensions(&mut self, id: NodeId, slot: Option<Slot>) -> LayoutResult<()> {
        let node = self.node_mut(id)?;
        let geometry = match (&node.kind, slot) {
            (NodeKind::Widget(_), None) => return Err(LayoutError::MissingParentContext),
            (NodeKind::Widget(_), Some(slot)) => Geometry {
                x: slot.x,
                y: slot.y,
                width: slot.avail_width,
                height: slot.avail_height,
            },
            (_, None) => Geometry {
                x: 0,
                y: 0,
                width: resolve_root(node.width)?,
                height: resolve_root(node.height)?,
            },
            (_, Some(slot)) => Geometry {
                x: slot.x,
                y: slot.y,
                width: resolve(node.width, slot.width, slot.avail_width),
                height: resolve(node.height, slot.height, slot.avail_height),
            },
        };
        node.geometry = Some(geometry);
        Ok(())
    }

    /// Redraw `id` and its subtree into the canvas.
    ///
    /// A parentless node first establishes its own geometry from its absolute size. Other
    /// nodes reuse the geometry from the last pass of their parent; nodes that were never
    /// laid out draw nothing.
    pub fn redraw(&mut self, id: NodeId) -> LayoutResult<()> {
        let node = self.node(id)?;
        if node.parent.is_none() {
            if node.width.is_relative() || node.height.is_relative() {
                return Err(LayoutError::InvalidRootSizing);
            }
            self.compute_dimensions(id, None)?;
            if id == self.root {
                self.canvas.reset();
            }
        }

        let node = self.node(id)?;
        let Some(geometry) = node.geometry else {
            return Ok(());
        };
        let arrangement = node.kind.arrangement();
        let children = node.children.clone();

        match arrangement {
            Arrangement::Overlay => {
                for child in children {
                    self.compute_dimensions(child, Some(Slot::within(geometry)))?;
                    self.redraw(child)?;
                }
            }
            Arrangement::Horizontal => {
                let mut used = 0;
                for child in children {
                    let slot = Slot {
                        x: geometry.x + used,
                        avail_width: geometry.width - used,
                        ..Slot::within(geometry)
                    };
                    self.compute_dimensions(child, Some(slot))?;
                    self.redraw(child)?;
                    used += self.geometry(child).map_or(0, |g| g.width);
                }
            }
            Arrangement::Vertical => {
                let mut used = 0;
                for child in children {
                    let slot = Slot {
                        y: geometry.y + used,
                        avail_height: geometry.height - used,
                        ..Slot::within(geometry)
                    };
                    self.compute_dimensions(child, Some(slot))?;
                    self.redraw(child)?;
                    used += self.geometry(child).map_or(0, |g| g.height);
                }
            }
            Arrangement::Widget => self.redraw_widget(id, geometry)?,
        }
        Ok(())
    }

    fn redraw_widget(&mut self, id: NodeId, geometry: Geometry) -> LayoutResult<()> {
        if matches!(self.widget(id)?, Widget::Browser(_)) {
            return self.redraw_browser(id, geometry);
        }
        let area = geometry.clip(self.canvas.area);
        let node = lookup(&self.entries, id)?;
        let focused = node.focused;
        let children = node.children.clone();
        let Some(widget) = node.widget_ref() else {
            return Ok(());
        };
        let theme = &self.theme;
        let canvas = &mut self.canvas;

        let content = match (widget, area) {
            (Widget::Container(container), area) => {
                if let Some(area) = area {
                    container.render(area, focused, theme, canvas);
                }
                Some(container.content(geometry))
            }
            (_, None) => None,
            (Widget::Dummy, Some(area)) => {
                widget::render_dummy(geometry, area, theme, canvas);
                None
            }
            (Widget::Item(item), Some(area)) => {
                item.render(area, focused, theme, canvas);
                None
            }
            (Widget::InactiveItem(item), Some(area)) => {
                item.render(area, theme, canvas);
                None
            }
            (Widget::Log(log), Some(area)) => {
                log.render(area, theme, canvas);
                None
            }
            (Widget::Shortcut(bar), Some(area)) => {
                bar.render(area, theme, canvas);
                None
            }
            (Widget::Browser(_), Some(_)) => None,
        };

        if let Some(content) = content {
            for child in children {
                self.compute_dimensions(child, Some(Slot::within(content)))?;
                self.redraw(child)?;
            }
        }
        Ok(())
    }

    /// Give the root a new absolute size, e.g. after the terminal was resized.
    pub fn resize(&mut self, width: u16, height: u16) -> LayoutResult<()> {
        let root = self.root;
        let node = self.node_mut(root)?;
        node.width = Value::absolute(width as i32);
        node.height = Value::absolute(height as i32);
        let area = Rect::new(0, 0, width, height);
        self.canvas.resize(area);
        self.canvas.reset();
        Ok(())
    }

    pub fn register_event(&mut self, id: NodeId, key: Key, handler: Handler<M>) -> LayoutResult<()> {
        self.node_mut(id)?.events.register(key, handler);
        Ok(())
    }

    pub fn unregister_event(&mut self, id: NodeId, key: &Key) -> LayoutResult<Option<Handler<M>>> {
        Ok(self.node_mut(id)?.events.unregister(key))
    }

    /// Find the node that handles `key` when it is sent to `from`.
    ///
    /// Nodes without a handler for the key pass it to their parent; a key that reaches the
    /// root unhandled resolves to nothing.
    pub fn route(&self, from: NodeId, key: &Key) -> LayoutResult<Option<(NodeId, Handler<M>)>> {
        let mut current = from;
        loop {
            let node = self.node(current)?;
            if let Some(handler) = node.events.get(key) {
                return Ok(Some((current, handler.clone())));
            }
            match node.parent {
                Some(parent) => current = parent,
                None => return Ok(None),
            }
        }
    }

    pub fn focus(&mut self, id: NodeId) -> LayoutResult<()> {
        self.set_focus(id, true)
    }

    pub fn unfocus(&mut self, id: NodeId) -> LayoutResult<()> {
        self.set_focus(id, false)
    }

    fn set_focus(&mut self, id: NodeId, focused: bool) -> LayoutResult<()> {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = self.node_mut(current)?;
            node.focused = focused;
            stack.extend(node.children.iter().copied());
        }
        Ok(())
    }
}
