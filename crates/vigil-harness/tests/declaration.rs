#![forbid(unsafe_code)]

//! Declaration errors surface eagerly or through the update completion.

use serde_json::json;
use vigil_harness::fixtures::Reference;
use vigil_harness::init_test_logging;
use vigil_model::Params;
use vigil_runtime::{RuntimeError, ViewDefinition};

#[test]
fn unknown_handler_is_rejected_at_definition() {
    init_test_logging();
    let reference = Reference::new().unwrap();
    let app = reference.app();
    app.define_model(vigil_model::ModelDefinition::new("superModel"))
        .unwrap();
    reference.model("superModel").unwrap().set_data(json!({})).unwrap();

    let err = app
        .define_view(ViewDefinition::new("myView").model("superModel", "iDoNotExistButNobodyCares"))
        .unwrap_err();
    assert!(err.is_assertion());
    match err {
        RuntimeError::UnknownHandler { view, model, handler } => {
            assert_eq!(view, "myView");
            assert_eq!(model, "superModel");
            assert_eq!(handler, "iDoNotExistButNobodyCares");
        }
        other => panic!("expected UnknownHandler, got {other:?}"),
    }
    assert!(!app.views().is_defined("myView"));
}

#[test]
fn unresolved_model_rejects_the_update() {
    init_test_logging();
    let reference = Reference::new().unwrap();
    let app = reference.app();
    app.define_view(ViewDefinition::new("myView").model("superModel", true))
        .unwrap();
    app.define_layout("broken", &json!({"app": {"myView": true}}))
        .unwrap();

    let root = app.create_view("app", &Params::new()).unwrap();
    let done = app.update(&root, "broken", &Params::new());
    let Some(RuntimeError::Subtrees { failures }) = done.error() else {
        panic!("expected subtree failures");
    };
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].path, "app/myView");
    assert!(failures[0].error.is_assertion());
}

#[test]
fn unknown_event_name_is_rejected() {
    let reference = Reference::new().unwrap();
    let err = reference
        .app()
        .define_view(
            ViewDefinition::new("odd").model(
                "season",
                vigil_runtime::DependencyDecl::events([("ns-model-exploded", true)]),
            ),
        )
        .unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidDeclaration { .. }));
}

#[test]
fn direct_update_of_a_broken_view_rejects() {
    let reference = Reference::new().unwrap();
    let app = reference.app();
    app.define_view(ViewDefinition::new("lonely").model("superModel", true))
        .unwrap();
    let err = app.create_view("lonely", &Params::new()).unwrap_err();
    assert!(matches!(err, RuntimeError::UnresolvedModel { .. }));
}
