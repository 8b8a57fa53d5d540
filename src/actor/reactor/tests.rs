use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use test_log::test;

use super::*;
use crate::layout_engine::{Orientation, ResizeDirection};
use crate::sys::geometry::SameAs;
use crate::sys::window::RecordingWindowService;

fn h(id: u64) -> WindowHandle { WindowHandle(id) }

struct Harness {
    reactor: Reactor,
    service: RecordingWindowService,
    monitor: NodeId,
    workspace: NodeId,
    events: Rc<RefCell<Vec<String>>>,
}

impl Harness {
    fn new() -> Self {
        let service = RecordingWindowService::new();
        let mut state = WmState::new(LayoutSettings::default(), Box::new(service.clone()));
        let monitor = state
            .add_monitor("main", Rect::new(0, 0, 1000, 1000), &["1".to_string(), "2".to_string()])
            .unwrap();
        let workspace = monitor.children(state.tree.map()).next().unwrap();
        let mut reactor = Reactor::new(state);

        let events = Rc::new(RefCell::new(vec![]));
        let log = events.clone();
        reactor.bus_mut().subscribe(move |_: &Bus<WmState>, _: &mut WmState, e: &FocusChanged| {
            log.borrow_mut().push(format!("focus {:?}", e.container));
            Ok(())
        });
        let log = events.clone();
        reactor.bus_mut().subscribe(
            move |_: &Bus<WmState>, _: &mut WmState, e: &ContainersRedrawn| {
                log.borrow_mut().push(format!("redraw {:?}", e.containers));
                Ok(())
            },
        );

        Harness { reactor, service, monitor, workspace, events }
    }

    fn attach(&mut self, handle: WindowHandle) -> NodeId {
        let response = self
            .reactor
            .dispatch(AttachWindow {
                handle,
                parent: self.workspace,
                index: usize::MAX,
            })
            .unwrap();
        assert!(response.success, "{response:?}");
        response.subject.unwrap()
    }

    fn take_events(&self) -> Vec<String> { std::mem::take(&mut *self.events.borrow_mut()) }

    fn size(&self, id: NodeId) -> f64 { self.reactor.state().tree.size_percentage(id).unwrap() }
}

#[test]
fn first_window_takes_focus_and_whole_workspace() {
    let mut t = Harness::new();
    let w1 = t.attach(h(1));
    assert_eq!(Some(w1), t.reactor.state().focused);
    assert_eq!(Some(h(1)), t.reactor.state().focused_window());
    assert_eq!(Some(Rect::new(0, 0, 1000, 1000)), t.service.frame(h(1)));
    assert_eq!(
        vec![format!("focus {w1:?}"), format!("redraw [{:?}]", t.workspace)],
        t.take_events()
    );

    let w2 = t.attach(h(2));
    assert_eq!(Some(w1), t.reactor.state().focused);
    assert_eq!(0.5, t.size(w1));
    assert_eq!(0.5, t.size(w2));
    assert_eq!(
        vec![
            (h(1), Rect::new(0, 0, 500, 1000)),
            (h(2), Rect::new(500, 0, 500, 1000)),
        ],
        t.service.frames()
    );
}

#[test]
fn fresh_workspace_fills_its_monitor_without_a_full_redraw() {
    let service = RecordingWindowService::new();
    let mut state = WmState::new(LayoutSettings::default(), Box::new(service.clone()));
    let monitor = state
        .add_monitor("side", Rect::new(1000, 0, 800, 600), &["1".to_string()])
        .unwrap();
    let workspace = monitor.children(state.tree.map()).next().unwrap();
    let mut reactor = Reactor::new(state);

    reactor.dispatch(AttachWindow { handle: h(1), parent: workspace, index: 0 }).unwrap();
    assert_eq!(Some(Rect::new(1000, 0, 800, 600)), reactor.state().tree.rect(workspace));
    assert_eq!(Some(Rect::new(1000, 0, 800, 600)), service.frame(h(1)));

    reactor.dispatch(AttachWindow { handle: h(2), parent: workspace, index: 1 }).unwrap();
    assert_eq!(
        vec![
            (h(1), Rect::new(1000, 0, 400, 600)),
            (h(2), Rect::new(1400, 0, 400, 600)),
        ],
        service.frames()
    );
}

#[test]
fn attaching_a_managed_window_fails_softly() {
    let mut t = Harness::new();
    t.attach(h(1));
    let response = t
        .reactor
        .dispatch(AttachWindow { handle: h(1), parent: t.workspace, index: 0 })
        .unwrap();
    assert!(!response.success);
    assert_eq!(1, t.reactor.state().tree.windows().count());
}

#[test]
fn resize_applies_new_frames() {
    let mut t = Harness::new();
    let w1 = t.attach(h(1));
    t.attach(h(2));
    t.take_events();

    let response =
        t.reactor.dispatch(ResizeFocusedWindow { direction: ResizeDirection::GrowWidth }).unwrap();
    assert_eq!(CommandResponse::with_subject(w1), response);
    assert_eq!(Some(Rect::new(0, 0, 550, 1000)), t.service.frame(h(1)));
    assert_eq!(Some(Rect::new(550, 0, 450, 1000)), t.service.frame(h(2)));
    assert_eq!(vec![format!("redraw [{:?}]", t.workspace)], t.take_events());
}

#[test]
fn noop_resize_does_not_redraw() {
    let mut t = Harness::new();
    let w1 = t.attach(h(1));
    t.take_events();

    for direction in [ResizeDirection::GrowWidth, ResizeDirection::GrowHeight] {
        let response = t.reactor.dispatch(ResizeFocusedWindow { direction }).unwrap();
        assert!(response.success);
    }
    assert_eq!(1.0, t.size(w1));
    assert!(t.take_events().is_empty());
}

#[test]
fn resize_without_focus_is_a_noop() {
    let mut t = Harness::new();
    let response =
        t.reactor.dispatch(ResizeFocusedWindow { direction: ResizeDirection::GrowWidth }).unwrap();
    assert_eq!(CommandResponse::ok(), response);
}

#[test]
fn orthogonal_resize_moves_parent_split() {
    let mut t = Harness::new();
    let state = t.reactor.state_mut();
    let split = state.tree.insert_split(t.workspace, 0, Orientation::Vertical, 1.0).unwrap();
    let top = state.tree.insert_window(split, 0, h(1), 0.5).unwrap();
    state.tree.insert_window(split, 1, h(2), 0.5).unwrap();
    let right = t.attach(h(3));
    t.reactor.dispatch(FocusContainer { container: top }).unwrap();
    t.take_events();

    t.reactor.dispatch(ResizeFocusedWindow { direction: ResizeDirection::GrowWidth }).unwrap();
    assert!(t.size(split).same_as(0.55));
    assert!(t.size(right).same_as(0.45));
    assert_eq!(vec![format!("redraw [{:?}]", t.workspace)], t.take_events());
    assert_eq!(Some(Rect::new(0, 0, 550, 500)), t.service.frame(h(1)));
    assert_eq!(Some(Rect::new(550, 0, 450, 1000)), t.service.frame(h(3)));
}

#[test]
fn focus_events_translate_to_focus_changes() {
    let mut t = Harness::new();
    let w1 = t.attach(h(1));
    let w2 = t.attach(h(2));
    t.take_events();

    t.reactor.publish(WindowFocused { handle: h(2) }).unwrap();
    assert_eq!(Some(w2), t.reactor.state().focused);
    assert_eq!(vec![format!("focus {w2:?}")], t.take_events());
    assert_eq!(vec![w2, w1], t.workspace.focus_order(t.reactor.state().tree.map()).collect::<Vec<_>>());

    // Already focused: no second event.
    t.reactor.publish(WindowFocused { handle: h(2) }).unwrap();
    assert!(t.take_events().is_empty());

    // Unmanaged windows are ignored.
    t.reactor.publish(WindowFocused { handle: h(99) }).unwrap();
    assert_eq!(Some(w2), t.reactor.state().focused);
}

#[test]
fn focusing_records_the_whole_ancestor_chain() {
    let mut t = Harness::new();
    let w1 = t.attach(h(1));
    let map = t.reactor.state().tree.map();
    assert_eq!(Some(w1), t.workspace.last_focused_child(map));
    assert_eq!(Some(t.workspace), t.monitor.last_focused_child(map));
    assert_eq!(Some(w1), t.monitor.last_focused_descendant(map));
    assert_eq!(Some(t.workspace), t.reactor.state().active_workspace());
}

#[test]
fn closing_focused_window_focuses_previous_one() {
    let mut t = Harness::new();
    let w1 = t.attach(h(1));
    let w2 = t.attach(h(2));
    t.attach(h(3));
    t.reactor.publish(WindowFocused { handle: h(3) }).unwrap();
    t.take_events();

    t.reactor.publish(WindowClosed { handle: h(3) }).unwrap();
    assert_eq!(Some(w1), t.reactor.state().focused);
    assert_eq!(None, t.reactor.state().tree.find_window(h(3)));
    assert!(t.size(w1).same_as(0.5));
    assert!(t.size(w2).same_as(0.5));
    assert_eq!(Some(Rect::new(0, 0, 500, 1000)), t.service.frame(h(1)));
    assert_eq!(Some(Rect::new(500, 0, 500, 1000)), t.service.frame(h(2)));
    assert_eq!(
        vec![format!("focus {w1:?}"), format!("redraw [{:?}]", t.workspace)],
        t.take_events()
    );

    // A second notification for the same window is harmless.
    t.reactor.publish(WindowClosed { handle: h(3) }).unwrap();
    assert!(t.take_events().is_empty());
}

#[test]
fn closing_unfocused_window_keeps_focus() {
    let mut t = Harness::new();
    let w1 = t.attach(h(1));
    t.attach(h(2));
    t.reactor.publish(WindowClosed { handle: h(2) }).unwrap();
    assert_eq!(Some(w1), t.reactor.state().focused);
    assert_eq!(1.0, t.size(w1));
}

#[test]
fn closing_last_window_focuses_workspace() {
    let mut t = Harness::new();
    t.attach(h(1));
    t.reactor.publish(WindowClosed { handle: h(1) }).unwrap();
    assert_eq!(Some(t.workspace), t.reactor.state().focused);
    assert_eq!(None, t.reactor.state().focused_window());
}

#[test]
fn unknown_container_is_reported() {
    let mut t = Harness::new();
    let w1 = t.attach(h(1));
    t.reactor.dispatch(DetachContainer { container: w1 }).unwrap();

    let err = t.reactor.dispatch(FocusContainer { container: w1 }).unwrap_err();
    match err {
        BusError::Handler { source, .. } => {
            assert!(matches!(*source, ReactorError::ContainerNotFound(id) if id == w1));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn window_service_failures_are_reported_not_fatal() {
    let mut t = Harness::new();
    t.attach(h(1));
    t.attach(h(2));
    t.service.close(h(2));

    let response = t
        .reactor
        .dispatch(RedrawContainers { containers: RedrawSet::single(t.workspace) })
        .unwrap();
    assert!(!response.success);
    assert!(response.error.unwrap().contains("no longer exists"));

    let response =
        t.reactor.dispatch(ResizeFocusedWindow { direction: ResizeDirection::GrowWidth }).unwrap();
    assert!(response.success);
    assert_eq!(Some(Rect::new(0, 0, 550, 1000)), t.service.frame(h(1)));
}

#[test]
fn redraw_all_covers_every_monitor() {
    let mut t = Harness::new();
    t.attach(h(1));
    let second = t
        .reactor
        .state_mut()
        .add_monitor("side", Rect::new(1000, 0, 800, 600), &["3".to_string()])
        .unwrap();
    let workspace = second.children(t.reactor.state().tree.map()).next().unwrap();
    t.reactor.dispatch(AttachWindow { handle: h(2), parent: workspace, index: 0 }).unwrap();
    t.take_events();

    t.reactor.redraw_all().unwrap();
    assert_eq!(vec![format!("redraw [{:?}, {second:?}]", t.monitor)], t.take_events());
    assert_eq!(Some(Rect::new(1000, 0, 800, 600)), t.service.frame(h(2)));
}

#[test]
fn snapshot_round_trips_through_ron() {
    let mut t = Harness::new();
    t.attach(h(1));
    let w2 = t.attach(h(2));
    t.reactor.publish(WindowFocused { handle: h(2) }).unwrap();
    t.reactor.dispatch(ResizeFocusedWindow { direction: ResizeDirection::ShrinkWidth }).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("layout.ron");
    t.reactor.snapshot().save(&path).unwrap();

    let snapshot = LayoutSnapshot::load(&path).unwrap();
    let service = RecordingWindowService::new();
    let mut restored =
        Reactor::restore(snapshot, LayoutSettings::default(), Box::new(service.clone()));
    assert_eq!(Some(w2), restored.state().focused);
    assert_eq!(
        t.reactor.state().tree.draw_tree(t.monitor),
        restored.state().tree.draw_tree(t.monitor)
    );

    restored.redraw_all().unwrap();
    assert_eq!(t.service.frame(h(1)), service.frame(h(1)));
    assert_eq!(t.service.frame(h(2)), service.frame(h(2)));
}
