#![forbid(unsafe_code)]

//! Property tests: view validity under random mutation sequences.

use proptest::prelude::*;
use serde_json::json;
use vigil_model::{ModelStore, Params};
use vigil_runtime::{App, DependencyDecl, StaticDataSource, View, ViewDefinition};

#[derive(Debug, Clone, Copy)]
enum Target {
    Season,
    Elements,
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Touch(Target),
    SetName(Target, u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let target = prop_oneof![Just(Target::Season), Just(Target::Elements)];
    prop_oneof![
        target.clone().prop_map(Op::Touch),
        (target, any::<u8>()).prop_map(|(t, n)| Op::SetName(t, n)),
    ]
}

struct Fixture {
    app: App,
    root: View,
}

fn fixture() -> Fixture {
    let app = App::with_source(
        StaticDataSource::new()
            .with("season", json!({"name": "summer"}))
            .with("elements", json!({"name": "water"})),
    );
    app.define_model(vigil_model::ModelDefinition::new("season")).unwrap();
    app.define_model(vigil_model::ModelDefinition::new("elements")).unwrap();
    app.define_view(ViewDefinition::new("app")).unwrap();
    app.define_view(
        ViewDefinition::new("mixed")
            .model("season", "keepValid")
            .model("elements", false),
    )
    .unwrap();
    app.define_view(
        ViewDefinition::new("strict")
            .model("season", true)
            .model("elements", false),
    )
    .unwrap();
    app.define_view(
        ViewDefinition::new("partial")
            .model("season", DependencyDecl::events([("model-changed.name", "keepValid")])),
    )
    .unwrap();
    app.define_layout(
        "index",
        &json!({"app": {"mixed": true, "strict": true, "partial": true}}),
    )
    .unwrap();
    let root = app.create_view("app", &Params::new()).unwrap();
    app.update(&root, "index", &Params::new()).value().unwrap();
    Fixture { app, root }
}

fn apply(store: &ModelStore, op: Op) {
    let model = |target| {
        let name = match target {
            Target::Season => "season",
            Target::Elements => "elements",
        };
        store.get(name, &Params::new()).unwrap()
    };
    match op {
        Op::Touch(target) => {
            model(target).touch().unwrap();
        }
        Op::SetName(target, n) => {
            model(target).set(".name", format!("v{n}")).unwrap();
        }
    }
}

proptest! {
    #[test]
    fn validity_follows_policies(ops in prop::collection::vec(op_strategy(), 1..48)) {
        let Fixture { app, root } = fixture();
        let view = |name: &str| root.child(name).unwrap();

        let mut season_touched = false;
        let mut partial_valid = true;
        for op in ops {
            apply(app.models(), op);
            match op {
                Op::Touch(Target::Season) => {
                    season_touched = true;
                    partial_valid = false;
                }
                Op::SetName(Target::Season, _) => {
                    season_touched = true;
                    partial_valid = true;
                }
                _ => {}
            }

            for name in ["mixed", "strict", "partial"] {
                let first = view(name).validity();
                prop_assert_eq!(&first, &view(name).validity(), "validity of {} is not stable", name);
            }
            prop_assert!(view("mixed").is_valid());
            prop_assert_eq!(view("strict").is_valid(), !season_touched);
            prop_assert_eq!(view("partial").is_valid(), partial_valid);
        }

        // One refresh brings everything back.
        root.update(&app).value().unwrap();
        prop_assert!(root.walk().iter().all(|(_, v)| v.is_valid()));
    }
}
