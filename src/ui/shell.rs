use std::collections::VecDeque;
use std::io::Stdout;

use anyhow::Result;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;

use crate::event::{Key, KeySource};
use crate::logging::LogSink;
use crate::ui::event_map::Handler;
use crate::ui::screen::{NodeId, Screen};
use crate::ui::widget::{Legend, Widget};

/// Where a finished canvas ends up.
pub trait Surface {
    fn present(&mut self, canvas: &Buffer) -> Result<()>;
    fn size(&self) -> Result<(u16, u16)>;
}

/// The real terminal.
pub struct TerminalSurface {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalSurface {
    pub fn new(terminal: Terminal<CrosstermBackend<Stdout>>) -> Self {
        Self { terminal }
    }

    pub fn terminal_mut(&mut self) -> &mut Terminal<CrosstermBackend<Stdout>> {
        &mut self.terminal
    }
}

impl Surface for TerminalSurface {
    fn present(&mut self, canvas: &Buffer) -> Result<()> {
        self.terminal.draw(|frame| {
            let area = frame.area().intersection(canvas.area);
            copy_cells(canvas, frame.buffer_mut(), area);
        })?;
        Ok(())
    }

    fn size(&self) -> Result<(u16, u16)> {
        Ok(crossterm::terminal::size()?)
    }
}

fn copy_cells(from: &Buffer, to: &mut Buffer, area: Rect) {
    for y in area.top()..area.bottom() {
        for x in area.left()..area.right() {
            to[(x, y)] = from[(x, y)].clone();
        }
    }
}

/// Off-screen surface keeping the last presented frame; the terminal size can be changed
/// to simulate a resize.
#[derive(Debug)]
pub struct MemorySurface {
    frame: Buffer,
    size: (u16, u16),
    presents: usize,
}

impl MemorySurface {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            frame: Buffer::empty(Rect::new(0, 0, width, height)),
            size: (width, height),
            presents: 0,
        }
    }

    pub fn set_size(&mut self, width: u16, height: u16) {
        self.size = (width, height);
    }

    pub fn frame(&self) -> &Buffer {
        &self.frame
    }

    pub fn presents(&self) -> usize {
        self.presents
    }
}

impl Surface for MemorySurface {
    fn present(&mut self, canvas: &Buffer) -> Result<()> {
        self.frame.resize(canvas.area);
        let area = self.frame.area.intersection(canvas.area);
        copy_cells(canvas, &mut self.frame, area);
        self.presents += 1;
        Ok(())
    }

    fn size(&self) -> Result<(u16, u16)> {
        Ok(self.size)
    }
}

/// What the router does after a handler ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Keep offering the key to the handling node's ancestors.
    Propagate,
    Stop,
}

/// A message delivered to the application controller.
#[derive(Clone, Debug, PartialEq)]
pub struct Dispatch<M> {
    /// Node whose handler produced the message, or the new control for control listeners.
    pub node: NodeId,
    /// Selected row of `node` when it is a browser.
    pub selected: Option<NodeId>,
    pub message: M,
}

pub trait Controller<M, P> {
    fn update(&mut self, shell: &mut Shell<M, P>, dispatch: Dispatch<M>) -> Result<Flow>;
}

enum Listener<M> {
    /// Shortcut bar whose legend follows the active control.
    Shortcuts(NodeId),
    Emit(M),
}

/// Owns the screen, the current control and the main loop.
pub struct Shell<M, P> {
    screen: Screen<M, P>,
    surface: Box<dyn Surface>,
    control: NodeId,
    log_widget: Option<NodeId>,
    sink: LogSink,
    listeners: Vec<Listener<M>>,
    pending: VecDeque<Dispatch<M>>,
    running: bool,
}

impl<M: Clone, P> Shell<M, P> {
    pub fn new(screen: Screen<M, P>, surface: Box<dyn Surface>, sink: LogSink) -> Self {
        let control = screen.root();
        Self {
            screen,
            surface,
            control,
            log_widget: None,
            sink,
            listeners: Vec::new(),
            pending: VecDeque::new(),
            running: false,
        }
    }

    pub fn screen(&self) -> &Screen<M, P> {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut Screen<M, P> {
        &mut self.screen
    }

    pub fn surface(&self) -> &dyn Surface {
        self.surface.as_ref()
    }

    pub fn control(&self) -> NodeId {
        self.control
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Make `id` the node that receives keys first, and notify control listeners.
    pub fn set_control(&mut self, id: NodeId) -> Result<()> {
        self.control = id;
        for listener in &self.listeners {
            match listener {
                Listener::Shortcuts(bar) => {
                    if let Widget::Shortcut(shortcuts) = self.screen.widget_mut(*bar)? {
                        shortcuts.set_active(id);
                    }
                    self.screen.redraw(*bar)?;
                }
                Listener::Emit(message) => self.pending.push_back(Dispatch {
                    node: id,
                    selected: None,
                    message: message.clone(),
                }),
            }
        }
        Ok(())
    }

    /// Queue `message` for the controller every time the control changes.
    pub fn on_control_change(&mut self, message: M) {
        self.listeners.push(Listener::Emit(message));
    }

    /// Bind each `(key, description, message)` on `target` and list it on the shortcut bar.
    ///
    /// Bindings on the root are global and stay on the bar whatever the control.
    pub fn register_shortcuts(
        &mut self,
        bar: NodeId,
        target: NodeId,
        entries: Vec<(Key, &str, M)>,
    ) -> Result<()> {
        let global = target == self.screen.root();
        for (key, description, message) in entries {
            self.screen
                .register_event(target, key, Handler::Emit(message))?;
            let legend = Legend {
                key,
                description: description.to_string(),
            };
            match self.screen.widget_mut(bar)? {
                Widget::Shortcut(shortcuts) if global => shortcuts.add_global(legend),
                Widget::Shortcut(shortcuts) => shortcuts.add(target, legend),
                other => {
                    return Err(crate::error::LayoutError::WidgetMismatch {
                        expected: "shortcut",
                        found: other.name(),
                    }
                    .into());
                }
            }
        }
        let tracked = self
            .listeners
            .iter()
            .any(|l| matches!(l, Listener::Shortcuts(id) if *id == bar));
        if !tracked {
            self.listeners.push(Listener::Shortcuts(bar));
        }
        Ok(())
    }

    /// Log widget that receives lines from the log sink on every present.
    pub fn attach_log(&mut self, widget: NodeId) {
        self.log_widget = Some(widget);
    }

    /// Append a line to the log widget directly, bypassing the logger.
    pub fn log(&mut self, line: &str) -> Result<()> {
        self.sink.push(line);
        self.flush_log()
    }

    pub fn clear_log(&mut self) -> Result<()> {
        let Some(id) = self.log_widget else {
            return Ok(());
        };
        if let Widget::Log(log) = self.screen.widget_mut(id)? {
            log.clear();
        }
        self.screen.redraw(id)?;
        Ok(())
    }

    fn flush_log(&mut self) -> Result<()> {
        let Some(id) = self.log_widget else {
            return Ok(());
        };
        let lines = self.sink.drain();
        if lines.is_empty() {
            return Ok(());
        }
        if let Widget::Log(log) = self.screen.widget_mut(id)? {
            for line in &lines {
                log.push(line);
            }
        }
        self.screen.redraw(id)?;
        Ok(())
    }

    /// Push the canvas to the surface, picking up pending log lines first.
    pub fn present(&mut self) -> Result<()> {
        self.flush_log()?;
        self.surface.present(self.screen.canvas())
    }

    pub fn redraw_all(&mut self) -> Result<()> {
        let root = self.screen.root();
        self.screen.redraw(root)?;
        Ok(())
    }

    /// Follow the surface's size, redrawing everything if it changed.
    pub fn resize(&mut self) -> Result<()> {
        let (width, height) = self.surface.size()?;
        if (width, height) != self.screen.size() {
            self.screen.resize(width, height)?;
            self.redraw_all()?;
        }
        Ok(())
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Route `key` from the current control up through its ancestors.
    pub fn send_event(&mut self, app: &mut dyn Controller<M, P>, key: Key) -> Result<()> {
        let mut from = self.control;
        while let Some((node, handler)) = self.screen.route(from, &key)? {
            let flow = match handler {
                Handler::CursorUp => {
                    self.screen.browser_up(node)?;
                    Flow::Stop
                }
                Handler::CursorDown => {
                    self.screen.browser_down(node)?;
                    Flow::Stop
                }
                Handler::Activate => {
                    let selected = self.screen.selected_item(node)?.map(|(id, _)| id);
                    if let (Some(selected), Some(message)) =
                        (selected, self.screen.selection_callback(node)?)
                    {
                        app.update(
                            self,
                            Dispatch {
                                node,
                                selected: Some(selected),
                                message,
                            },
                        )?;
                    }
                    Flow::Stop
                }
                Handler::Emit(message) => {
                    let selected = self
                        .screen
                        .selected_item(node)
                        .ok()
                        .flatten()
                        .map(|(id, _)| id);
                    app.update(
                        self,
                        Dispatch {
                            node,
                            selected,
                            message,
                        },
                    )?
                }
            };
            self.drain_pending(app)?;
            match (flow, self.screen.parent(node)) {
                (Flow::Propagate, Some(parent)) => from = parent,
                _ => break,
            }
        }
        Ok(())
    }

    fn drain_pending(&mut self, app: &mut dyn Controller<M, P>) -> Result<()> {
        while let Some(dispatch) = self.pending.pop_front() {
            app.update(self, dispatch)?;
        }
        Ok(())
    }

    /// Draw once, then handle keys until the controller quits or the user interrupts.
    pub fn run(&mut self, app: &mut dyn Controller<M, P>, keys: &mut dyn KeySource) -> Result<()> {
        self.running = true;
        self.redraw_all()?;
        self.drain_pending(app)?;
        self.present()?;
        while self.running {
            match keys.next_key()? {
                Key::Interrupt => self.quit(),
                Key::Resize => self.resize()?,
                key => self.send_event(app, key)?,
            }
            self.present()?;
        }
        Ok(())
    }
}
