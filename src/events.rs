//! Listener registry for display-tree events.
//!
//! Listeners are keyed by node and [`EventType`]. [`EventDispatcher::emit`]
//! notifies the target only; [`EventDispatcher::dispatch`] walks a path from
//! the target to the root until a listener stops propagation.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::display::NodeId;
use crate::math::Point;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    /// The node was attached to a parent.
    Added,
    /// The node was detached from its parent.
    Removed,
    PointerDown,
    PointerUp,
    /// Released outside the node that received the matching `PointerDown`.
    PointerUpOutside,
    PointerMove,
    PointerOver,
    PointerOut,
    /// Down and up on the same node.
    Click,
    Custom(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventType,
    /// Node the event originated from.
    pub target: NodeId,
    /// Node whose listeners are currently running.
    pub current_target: NodeId,
    /// Pointer position in stage coordinates, zero for non-pointer events.
    pub global: Point,
    propagation_stopped: bool,
}

impl Event {
    pub fn new(kind: EventType, target: NodeId) -> Self {
        Self {
            kind,
            target,
            current_target: target,
            global: Point::ZERO,
            propagation_stopped: false,
        }
    }

    pub fn with_global(mut self, global: Point) -> Self {
        self.global = global;
        self
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

pub type ListenerId = u64;

type Callback = Rc<RefCell<dyn FnMut(&mut Event)>>;

struct Listener {
    id: ListenerId,
    once: bool,
    callback: Callback,
}

#[derive(Default)]
pub struct EventDispatcher {
    listeners: HashMap<(NodeId, EventType), Vec<Listener>>,
    next_id: ListenerId,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&mut self, node: NodeId, kind: EventType, once: bool, callback: Callback) -> ListenerId {
        self.next_id += 1;
        let id = self.next_id;
        self.listeners
            .entry((node, kind))
            .or_default()
            .push(Listener { id, once, callback });
        id
    }

    pub fn on<F>(&mut self, node: NodeId, kind: EventType, f: F) -> ListenerId
    where
        F: FnMut(&mut Event) + 'static,
    {
        self.add(node, kind, false, Rc::new(RefCell::new(f)))
    }

    /// Register a listener that is removed after its first call.
    pub fn once<F>(&mut self, node: NodeId, kind: EventType, f: F) -> ListenerId
    where
        F: FnMut(&mut Event) + 'static,
    {
        self.add(node, kind, true, Rc::new(RefCell::new(f)))
    }

    /// Returns whether a listener was removed.
    pub fn off(&mut self, node: NodeId, kind: &EventType, id: ListenerId) -> bool {
        let key = (node, kind.clone());
        let Some(list) = self.listeners.get_mut(&key) else {
            return false;
        };
        let before = list.len();
        list.retain(|l| l.id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.listeners.remove(&key);
        }
        removed
    }

    /// Drop every listener of `node`.
    pub fn remove_all(&mut self, node: NodeId) {
        self.listeners.retain(|(n, _), _| *n != node);
    }

    pub fn has_listeners(&self, node: NodeId, kind: &EventType) -> bool {
        self.listeners
            .get(&(node, kind.clone()))
            .is_some_and(|list| !list.is_empty())
    }

    /// Run the listeners of `event.current_target`. Returns how many ran.
    pub fn emit(&mut self, event: &mut Event) -> usize {
        let key = (event.current_target, event.kind.clone());
        let Some(list) = self.listeners.get_mut(&key) else {
            return 0;
        };

        // once-listeners are dropped before any callback runs
        let callbacks: Vec<Callback> = list.iter().map(|l| l.callback.clone()).collect();
        list.retain(|l| !l.once);
        if list.is_empty() {
            self.listeners.remove(&key);
        }

        for callback in &callbacks {
            match callback.try_borrow_mut() {
                Ok(mut f) => f(event),
                Err(_) => log::warn!("Skipping re-entrant listener for {:?}", event.kind),
            }
        }
        callbacks.len()
    }

    /// Emit along `path` (target first, then its ancestors) until propagation stops.
    pub fn dispatch(&mut self, path: &[NodeId], event: &mut Event) {
        for &node in path {
            event.current_target = node;
            self.emit(event);
            if event.is_propagation_stopped() {
                break;
            }
        }
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
