#![forbid(unsafe_code)]

//! `false` and `keepValid` dependencies: the view survives every event but
//! destruction.

use serde_json::json;
use vigil_harness::fixtures::{IGNORING_PAGE, IGNORING_VIEWS, Reference, child};
use vigil_harness::init_test_logging;
use vigil_runtime::View;

fn setup() -> (Reference, View) {
    init_test_logging();
    let reference = Reference::new().unwrap();
    reference.define_ignoring_views().unwrap();
    let root = reference.build(IGNORING_PAGE).unwrap();
    (reference, root)
}

fn assert_all(root: &View, valid: bool) {
    for name in IGNORING_VIEWS {
        let view = child(root, name).unwrap();
        assert_eq!(view.is_valid(), valid, "{name}: {:?}", view.validity());
    }
}

#[test]
fn valid_before_changes() {
    let (_reference, root) = setup();
    assert_all(&root, true);
}

#[test]
fn valid_after_model_changed() {
    let (reference, root) = setup();
    reference
        .model("season")
        .unwrap()
        .set_data(json!({"name": "winter", "year": 2024}))
        .unwrap();
    assert_all(&root, true);
}

#[test]
fn valid_after_path_change() {
    let (reference, root) = setup();
    reference.model("season").unwrap().set(".name", "winter").unwrap();
    assert_all(&root, true);
}

#[test]
fn valid_after_insert() {
    let (reference, root) = setup();
    reference.insert_person(4, "Brian May").unwrap();
    assert_all(&root, true);
}

#[test]
fn valid_after_remove() {
    let (reference, root) = setup();
    reference.remove_person(3).unwrap();
    assert_all(&root, true);
}

#[test]
fn invalid_after_destroy() {
    let (reference, root) = setup();
    reference.destroy("season").unwrap();
    assert_all(&root, false);
}

#[test]
fn validity_is_idempotent() {
    let (reference, root) = setup();
    reference.model("season").unwrap().touch().unwrap();
    for name in IGNORING_VIEWS {
        let view = child(&root, name).unwrap();
        let first = view.validity();
        assert_eq!(view.validity(), first);
        assert_eq!(view.validity(), first);
    }
}
