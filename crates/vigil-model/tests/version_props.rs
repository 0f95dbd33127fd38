#![forbid(unsafe_code)]

//! Property tests for version stamping.
//!
//! Any interleaving of mutations across models must yield strictly increasing,
//! never repeated versions, and each model's own version must only grow.

use proptest::prelude::*;
use serde_json::json;
use vigil_model::{JPath, ModelDefinition, ModelStore, ParamSpec, Params, SplitSpec, params};

#[derive(Debug, Clone)]
enum Op {
    SetData(u8),
    SetName(u8),
    Touch,
    Insert(u8),
    Remove(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<u8>().prop_map(Op::SetData),
        any::<u8>().prop_map(Op::SetName),
        Just(Op::Touch),
        (0u8..6).prop_map(Op::Insert),
        (0u8..6).prop_map(Op::Remove),
    ]
}

fn store() -> ModelStore {
    let store = ModelStore::new();
    store.define(ModelDefinition::new("season")).unwrap();
    store
        .define(ModelDefinition::new("person").param("id", ParamSpec::Required))
        .unwrap();
    store
        .define(ModelDefinition::new("community").split(
            SplitSpec::new("person", JPath::parse(".person").unwrap())
                .param("id", JPath::parse(".id").unwrap()),
        ))
        .unwrap();
    store
}

proptest! {
    #[test]
    fn versions_never_repeat(ops in prop::collection::vec(op_strategy(), 1..64)) {
        let store = store();
        let season = store.get("season", &Params::new()).unwrap();
        let community = store.get("community", &Params::new()).unwrap();

        let mut last = 0u64;
        let mut season_last = season.version();
        for op in ops {
            let stamped = match op {
                Op::SetData(n) => Some(season.set_data(json!({"name": n})).unwrap()),
                Op::SetName(n) => Some(season.set(".name", n.to_string()).unwrap()),
                Op::Touch => Some(season.touch().unwrap()),
                Op::Insert(id) => {
                    let person = store.get("person", &params([("id", id.to_string())])).unwrap();
                    community.insert(&person).ok()
                }
                Op::Remove(id) => {
                    let person = store.get("person", &params([("id", id.to_string())])).unwrap();
                    community.remove(&person).ok()
                }
            };
            if let Some(version) = stamped {
                prop_assert!(version > last, "version {version} after {last}");
                last = version;
            }
            prop_assert!(season.version() >= season_last);
            season_last = season.version();
        }
        prop_assert_eq!(store.clock().current(), last);
    }
}
