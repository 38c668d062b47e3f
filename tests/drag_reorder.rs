use list_reconciler::dom::Transition;
use list_reconciler::{
    apply_list_changes, bind, drag_on_hold, keyed_children, Event, EventType, HoldPhase, Key, NodeId, Observable,
    Stage,
};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn create_row(stage: &mut Stage, _: &Value) -> NodeId {
    let node = stage.document.create_element("li");
    stage.document[node].height = 10.0;
    stage.document.style_mut(node).transition = Some(Transition::new("top", 150));
    node
}

fn labels(items: &[Value]) -> Vec<String> {
    items.iter().map(|v| v["label"].as_str().unwrap_or_default().to_string()).collect()
}

fn child_keys(stage: &Stage, parent: NodeId) -> Vec<String> {
    stage
        .document
        .children(parent)
        .iter()
        .filter_map(|&c| stage.document.key_of(c))
        .map(|k| k.to_string())
        .collect()
}

#[test]
fn drag_reorders_bound_list_and_rerenders() {
    let mut stage = Stage::new();
    let root = stage.document.root();
    let list = stage.document.create_element("ul");
    stage.document.append_child(root, list);

    let items = Rc::new(Observable::new(
        ["a", "b", "c", "d"]
            .iter()
            .map(|k| json!({ "key": k, "label": k.to_uppercase() }))
            .collect::<Vec<_>>(),
    ));
    let dirty = Rc::new(Cell::new(false));
    let flag = Rc::clone(&dirty);
    bind(&items, move |_, _| flag.set(true));

    apply_list_changes(&mut stage, &items.get(), list, create_row);
    assert!(stage.run_until_idle());
    dirty.set(false);

    let b = keyed_children(&stage.document, list)[&Key::from("b")];
    let c = keyed_children(&stage.document, list)[&Key::from("c")];
    let moves = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&moves);
    stage.on(c, EventType::MoveItem, move |_, event| sink.borrow_mut().push(event.clone()));

    let hold = drag_on_hold(&mut stage, Rc::clone(&items), b);
    stage.pointer_down(b, 15.0);
    stage.advance_by(325);
    assert_eq!(hold.phase(), HoldPhase::Dragging);

    stage.pointer_move(None, 25.0);
    assert!(dirty.get());
    assert_eq!(labels(&items.get()), vec!["A", "C", "B", "D"]);
    assert_eq!(*moves.borrow(), vec![Event::MoveItem { old_index: 2, new_index: 1 }]);
    let dragged_top = stage.document.style(b).top;
    assert_eq!(dragged_top, 10.0);

    // Re-render while dragging: the dragged row keeps following the pointer.
    apply_list_changes(&mut stage, &items.get(), list, create_row);
    assert_eq!(child_keys(&stage, list), vec!["a", "c", "b", "d"]);
    assert_eq!(stage.document.style(b).top, dragged_top);
    assert_eq!(stage.document.style(c).top, 10.0);

    stage.pointer_move(None, 26.0);
    assert_eq!(stage.document.style(b).top, 1.0);
    assert_eq!(labels(&items.get()), vec!["A", "C", "B", "D"]);

    stage.pointer_up(None, 26.0);
    assert_eq!(hold.phase(), HoldPhase::Idle);
    assert!(stage.document.has_class(b, "moved-item"));
    assert!(stage.run_until_idle());
    for &child in stage.document.children(list) {
        assert_eq!(stage.document.style(child).top, 0.0);
        assert!(!stage.document.has_class(child, "drag-item"));
    }
}

#[test]
fn drag_without_hold_is_cancelled_by_leaving() {
    let mut stage = Stage::new();
    let list = stage.document.create_element("ul");
    let root = stage.document.root();
    stage.document.append_child(root, list);
    let items = Rc::new(Observable::new(vec![json!({"key": 1}), json!({"key": 2})]));
    apply_list_changes(&mut stage, &items.get(), list, create_row);

    let first = keyed_children(&stage.document, list)[&Key::from(1u32)];
    let hold = drag_on_hold(&mut stage, Rc::clone(&items), first);
    stage.pointer_down(first, 5.0);
    stage.pointer_leave(first);
    assert!(stage.run_until_idle());
    assert_eq!(hold.phase(), HoldPhase::Idle);
    assert!(hold.session().is_none());
    assert_eq!(stage.document_listener_count(EventType::PointerMove), 0);
}
