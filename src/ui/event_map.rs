use std::collections::HashMap;

use crate::event::Key;

/// What a node does when a key reaches it.
///
/// The cursor/activate variants are the built-in behaviour of selection lists; everything
/// application specific travels as an `Emit` message handled by the controller.
#[derive(Clone, Debug, PartialEq)]
pub enum Handler<M> {
    CursorUp,
    CursorDown,
    Activate,
    Emit(M),
}

/// Per-node key → handler table.
#[derive(Clone, Debug)]
pub struct EventMap<M> {
    handlers: HashMap<Key, Handler<M>>,
}

impl<M> Default for EventMap<M> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<M> EventMap<M> {
    pub fn register(&mut self, key: Key, handler: Handler<M>) {
        self.handlers.insert(key, handler);
    }

    pub fn unregister(&mut self, key: &Key) -> Option<Handler<M>> {
        self.handlers.remove(key)
    }

    pub fn get(&self, key: &Key) -> Option<&Handler<M>> {
        self.handlers.get(key)
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.handlers.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_replaces_previous_handler() {
        let mut map: EventMap<u8> = EventMap::default();
        map.register(Key::Enter, Handler::Activate);
        map.register(Key::Enter, Handler::Emit(7));
        assert_eq!(map.get(&Key::Enter), Some(&Handler::Emit(7)));
    }

    #[test]
    fn test_unregister_removes() {
        let mut map: EventMap<u8> = EventMap::default();
        map.register(Key::Char('j'), Handler::CursorDown);
        assert_eq!(map.unregister(&Key::Char('j')), Some(Handler::CursorDown));
        assert!(!map.contains(&Key::Char('j')));
        assert!(map.is_empty());
    }
}
