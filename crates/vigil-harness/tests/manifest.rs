#![forbid(unsafe_code)]

//! The reference world declared as data.

use serde_json::json;
use vigil_harness::CallCounter;
use vigil_harness::fixtures::{child, community_seed, season_seed};
use vigil_harness::init_test_logging;
use vigil_model::Params;
use vigil_runtime::{App, Manifest, MethodTable, RuntimeError};

const REFERENCE: &str = r#"
[models.season]

[models.person.params]
id = true

[models.community.split]
model_id = "person"
items = ".person"
params = { id = ".id" }

[views.app]

[views.timeflow.models]
season = { "ns-model-changed" = "keepValid", "ns-model-destroyed" = "keepValid" }
community = { "ns-model-insert" = "keepValid", "ns-model-remove" = "keepValid" }

[views.sales.models]
season = { "model-changed" = true, "model-destroyed" = true }
community = { "model-insert" = true, "model-remove" = true }

[views.weather.models]
season = { "model-changed.name" = "onRename" }

[layouts.index.app]
timeflow = true
sales = true
weather = true
"#;

fn install(renames: &CallCounter) -> App {
    init_test_logging();
    let manifest = Manifest::from_toml_str(REFERENCE).unwrap();
    let counter = renames.clone();
    let methods = MethodTable::new().method("weather", "onRename", move |_, _| counter.hit());
    let app = App::new();
    manifest.install(&app, &methods).unwrap();
    let models = app.models();
    models.get("season", &Params::new()).unwrap().set_data(season_seed()).unwrap();
    models
        .get("community", &Params::new())
        .unwrap()
        .set_data(community_seed())
        .unwrap();
    app
}

#[test]
fn manifest_world_behaves_like_code_world() {
    let renames = CallCounter::default();
    let app = install(&renames);
    let root = app.create_view("app", &Params::new()).unwrap();
    app.update(&root, "index", &Params::new()).value().unwrap();

    let community = app.models().get("community", &Params::new()).unwrap();
    let person = app.models().get("person", &vigil_model::params([("id", "4")])).unwrap();
    person.set_data(json!({"id": 4, "name": "Brian May"})).unwrap();
    community.insert(&person).unwrap();

    assert!(child(&root, "timeflow").unwrap().is_valid());
    assert!(!child(&root, "sales").unwrap().is_valid());
    assert!(child(&root, "weather").unwrap().is_valid());

    app.models()
        .get("season", &Params::new())
        .unwrap()
        .set(".name", "winter")
        .unwrap();
    assert_eq!(renames.count(), 1);
    assert!(child(&root, "weather").unwrap().is_valid());
}

#[test]
fn json_manifest_round_trips_through_serde() {
    let manifest = Manifest::from_toml_str(REFERENCE).unwrap();
    let text = serde_json::to_string(&manifest).unwrap();
    assert_eq!(Manifest::from_json_str(&text).unwrap(), manifest);
}

#[test]
fn manifest_without_methods_fails_eagerly() {
    let manifest = Manifest::from_toml_str(REFERENCE).unwrap();
    let err = manifest.install(&App::new(), &MethodTable::new()).unwrap_err();
    assert!(matches!(err, RuntimeError::UnknownHandler { ref handler, .. } if handler == "onRename"));
}

#[test]
fn malformed_policy_value_is_a_config_error() {
    let err = Manifest::from_toml_str("[views.x.models]\nseason = 3\n").unwrap_err();
    assert!(matches!(err, RuntimeError::Config { .. }));
}
