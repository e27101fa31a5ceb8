//! Typed handler registry: `Route → ordered handlers`.

use std::collections::HashMap;

use crate::events::{MessageKind, ServerMessage};

pub type Handler = Box<dyn FnMut(&ServerMessage)>;

/// Where a handler listens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Kind(MessageKind),
    /// Every dispatched message, after the typed handlers.
    Any,
}

impl From<MessageKind> for Route {
    fn from(kind: MessageKind) -> Self {
        Route::Kind(kind)
    }
}

#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<Route, Vec<Handler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, route: impl Into<Route>, handler: Handler) {
        self.handlers.entry(route.into()).or_default().push(handler);
    }

    pub fn handler_count(&self, route: Route) -> usize {
        self.handlers.get(&route).map_or(0, Vec::len)
    }

    /// Runs typed handlers in registration order, then wildcard handlers.
    /// `Unknown` messages reach wildcards only. Returns how many ran.
    pub fn dispatch(&mut self, msg: &ServerMessage) -> usize {
        let mut ran = 0;
        let kind = msg.kind();

        if kind != MessageKind::Unknown {
            if let Some(list) = self.handlers.get_mut(&Route::Kind(kind)) {
                for handler in list.iter_mut() {
                    handler(msg);
                    ran += 1;
                }
            }
        }
        if let Some(list) = self.handlers.get_mut(&Route::Any) {
            for handler in list.iter_mut() {
                handler(msg);
                ran += 1;
            }
        }
        ran
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn make_recorder(log: &Rc<RefCell<Vec<String>>>, tag: &'static str) -> Handler {
        let log = Rc::clone(log);
        Box::new(move |msg| log.borrow_mut().push(format!("{tag}:{:?}", msg.kind())))
    }

    #[test]
    fn test_typed_then_wildcard_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut d = Dispatcher::new();
        d.on(Route::Any, make_recorder(&log, "any"));
        d.on(MessageKind::ResetUi, make_recorder(&log, "a"));
        d.on(MessageKind::ResetUi, make_recorder(&log, "b"));

        assert_eq!(d.dispatch(&ServerMessage::ResetUi), 3);
        assert_eq!(*log.borrow(), vec!["a:ResetUi", "b:ResetUi", "any:ResetUi"]);
    }

    #[test]
    fn test_unknown_reaches_wildcard_only() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut d = Dispatcher::new();
        d.on(MessageKind::Unknown, make_recorder(&log, "typed"));
        d.on(Route::Any, make_recorder(&log, "any"));

        d.dispatch(&ServerMessage::Unknown);
        assert_eq!(*log.borrow(), vec!["any:Unknown"]);
    }

    #[test]
    fn test_no_handlers_is_fine() {
        let mut d = Dispatcher::new();
        assert_eq!(d.dispatch(&ServerMessage::Pong), 0);
        assert_eq!(d.handler_count(Route::Any), 0);
    }
}
