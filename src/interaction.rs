//! Pointer input routed through the display tree.
//!
//! [`InteractionManager`] turns raw pointer positions into bubbling
//! [`Event`]s on whichever node [`DisplayTree::hit_test`] reports, and keeps
//! enough state (hovered node, pressed node) to synthesize `PointerOver`,
//! `PointerOut`, `Click` and `PointerUpOutside`.

use crate::display::{DisplayTree, NodeId};
use crate::events::{Event, EventType};
use crate::math::Point;

#[derive(Debug, Default)]
pub struct InteractionManager {
    over: Option<NodeId>,
    pressed: Option<NodeId>,
    last_position: Option<Point>,
}

impl InteractionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node currently under the pointer.
    pub fn hovered(&self) -> Option<NodeId> {
        self.over
    }

    /// Node that received the last unmatched `PointerDown`.
    pub fn pressed(&self) -> Option<NodeId> {
        self.pressed
    }

    pub fn last_position(&self) -> Option<Point> {
        self.last_position
    }

    /// Returns the node that was hit, if any.
    pub fn pointer_down(
        &mut self,
        tree: &mut DisplayTree,
        root: NodeId,
        global: Point,
    ) -> Option<NodeId> {
        self.last_position = Some(global);
        let target = tree.hit_test(root, global);
        self.pressed = target;
        if let Some(target) = target {
            send(tree, EventType::PointerDown, target, global);
        }
        target
    }

    pub fn pointer_up(
        &mut self,
        tree: &mut DisplayTree,
        root: NodeId,
        global: Point,
    ) -> Option<NodeId> {
        self.last_position = Some(global);
        let target = tree.hit_test(root, global);
        let pressed = self.pressed.take().filter(|id| tree.contains(*id));

        if let Some(target) = target {
            send(tree, EventType::PointerUp, target, global);
        }

        if let Some(pressed) = pressed {
            match target {
                Some(target) if target == pressed => {
                    send(tree, EventType::Click, target, global);
                }
                // releasing over a descendant of the pressed node still counts as inside
                Some(target) if tree.is_ancestor(pressed, target) => {}
                _ => send(tree, EventType::PointerUpOutside, pressed, global),
            }
        }
        target
    }

    pub fn pointer_move(
        &mut self,
        tree: &mut DisplayTree,
        root: NodeId,
        global: Point,
    ) -> Option<NodeId> {
        self.last_position = Some(global);
        let target = tree.hit_test(root, global);
        let previous = self.over.filter(|id| tree.contains(*id));

        if previous != target {
            if let Some(previous) = previous {
                send(tree, EventType::PointerOut, previous, global);
            }
            if let Some(target) = target {
                send(tree, EventType::PointerOver, target, global);
            }
            self.over = target;
        }

        if let Some(target) = target {
            send(tree, EventType::PointerMove, target, global);
        }
        target
    }

    /// Forget hover and press state, e.g. when the pointer leaves the surface.
    pub fn pointer_leave(&mut self, tree: &mut DisplayTree) {
        if let Some(previous) = self.over.take().filter(|id| tree.contains(*id)) {
            let global = self.last_position.unwrap_or(Point::ZERO);
            send(tree, EventType::PointerOut, previous, global);
        }
        self.pressed = None;
        self.last_position = None;
    }
}

fn send(tree: &mut DisplayTree, kind: EventType, target: NodeId, global: Point) {
    log::trace!("{:?} on {:?}", kind, target);
    tree.dispatch_event(Event::new(kind, target).with_global(global));
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::display::DisplayObject;
    use crate::math::{Rectangle, Shape};

    fn button(tree: &mut DisplayTree, root: NodeId, x: f32) -> NodeId {
        let mut object = DisplayObject::container()
            .with_position(x, 0.0)
            .with_interactive(true);
        object.hit_area = Some(Shape::Rectangle(Rectangle::new(0.0, 0.0, 10.0, 10.0)));
        let id = tree.insert(object);
        tree.add_child(root, id).unwrap();
        id
    }

    fn record(
        tree: &mut DisplayTree,
        node: NodeId,
        kinds: &[EventType],
    ) -> Rc<RefCell<Vec<EventType>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        for kind in kinds {
            let log = log.clone();
            tree.events_mut()
                .on(node, kind.clone(), move |e| log.borrow_mut().push(e.kind.clone()));
        }
        log
    }

    fn setup() -> (DisplayTree, NodeId, NodeId, NodeId) {
        let mut tree = DisplayTree::new();
        let root = tree.create_container();
        let a = button(&mut tree, root, 0.0);
        let b = button(&mut tree, root, 50.0);
        tree.update_transform(root);
        (tree, root, a, b)
    }

    #[test]
    fn test_click_on_same_node() {
        let (mut tree, root, a, _) = setup();
        let log = record(
            &mut tree,
            a,
            &[EventType::PointerDown, EventType::PointerUp, EventType::Click],
        );
        let mut interaction = InteractionManager::new();
        assert_eq!(interaction.pointer_down(&mut tree, root, Point::new(5.0, 5.0)), Some(a));
        assert_eq!(interaction.pressed(), Some(a));
        interaction.pointer_up(&mut tree, root, Point::new(6.0, 6.0));
        assert_eq!(
            *log.borrow(),
            vec![EventType::PointerDown, EventType::PointerUp, EventType::Click]
        );
        assert_eq!(interaction.pressed(), None);
    }

    #[test]
    fn test_up_outside() {
        let (mut tree, root, a, b) = setup();
        let log_a = record(&mut tree, a, &[EventType::Click, EventType::PointerUpOutside]);
        let log_b = record(&mut tree, b, &[EventType::PointerUp, EventType::Click]);
        let mut interaction = InteractionManager::new();
        interaction.pointer_down(&mut tree, root, Point::new(5.0, 5.0));
        interaction.pointer_up(&mut tree, root, Point::new(55.0, 5.0));
        assert_eq!(*log_a.borrow(), vec![EventType::PointerUpOutside]);
        assert_eq!(*log_b.borrow(), vec![EventType::PointerUp]);
    }

    #[test]
    fn test_over_out_and_move() {
        let (mut tree, root, a, b) = setup();
        let log_a = record(
            &mut tree,
            a,
            &[EventType::PointerOver, EventType::PointerOut, EventType::PointerMove],
        );
        let log_b = record(&mut tree, b, &[EventType::PointerOver]);
        let mut interaction = InteractionManager::new();

        interaction.pointer_move(&mut tree, root, Point::new(1.0, 1.0));
        interaction.pointer_move(&mut tree, root, Point::new(2.0, 2.0));
        interaction.pointer_move(&mut tree, root, Point::new(52.0, 2.0));
        assert_eq!(
            *log_a.borrow(),
            vec![
                EventType::PointerOver,
                EventType::PointerMove,
                EventType::PointerMove,
                EventType::PointerOut,
            ]
        );
        assert_eq!(*log_b.borrow(), vec![EventType::PointerOver]);
        assert_eq!(interaction.hovered(), Some(b));

        interaction.pointer_move(&mut tree, root, Point::new(200.0, 200.0));
        assert_eq!(interaction.hovered(), None);
    }

    #[test]
    fn test_events_bubble_with_global_position() {
        let (mut tree, root, a, _) = setup();
        let seen = Rc::new(RefCell::new(None));
        let sink = seen.clone();
        tree.events_mut().on(root, EventType::PointerDown, move |e| {
            *sink.borrow_mut() = Some((e.target, e.current_target, e.global));
        });
        let mut interaction = InteractionManager::new();
        interaction.pointer_down(&mut tree, root, Point::new(3.0, 4.0));
        assert_eq!(*seen.borrow(), Some((a, root, Point::new(3.0, 4.0))));
    }

    #[test]
    fn test_pointer_leave_sends_out() {
        let (mut tree, root, a, _) = setup();
        let log = record(&mut tree, a, &[EventType::PointerOut]);
        let mut interaction = InteractionManager::new();
        interaction.pointer_move(&mut tree, root, Point::new(1.0, 1.0));
        interaction.pointer_leave(&mut tree);
        assert_eq!(*log.borrow(), vec![EventType::PointerOut]);
        assert_eq!(interaction.hovered(), None);
    }
}
