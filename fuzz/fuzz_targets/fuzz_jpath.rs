#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use serde_json::{Value, json};
use vigil_model::JPath;

#[derive(Arbitrary, Debug)]
enum Seed {
    Null,
    Object,
    Array(u8),
    Text(String),
}

#[derive(Arbitrary, Debug)]
struct Input {
    path: String,
    seed: Seed,
    value: i64,
}

fuzz_target!(|input: Input| {
    let Ok(path) = JPath::parse(&input.path) else {
        return;
    };
    let mut target = match input.seed {
        Seed::Null => Value::Null,
        Seed::Object => json!({"a": {"b": [1, 2, 3]}}),
        Seed::Array(len) => Value::Array((0..u64::from(len % 8)).map(Value::from).collect()),
        Seed::Text(text) => Value::String(text),
    };
    let _ = path.get(&target);
    if path.set(&mut target, json!(input.value)).is_ok() {
        assert_eq!(path.get(&target), Some(&json!(input.value)));
    }
});
