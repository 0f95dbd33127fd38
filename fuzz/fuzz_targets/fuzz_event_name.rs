#![no_main]

use libfuzzer_sys::fuzz_target;
use vigil_model::EventName;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(name) = EventName::parse(text) {
        // The canonical rendering must parse back to the same name.
        let rendered = name.to_string();
        let reparsed = EventName::parse(&rendered).expect("canonical name parses");
        assert_eq!(reparsed, name);
        assert_eq!(reparsed.kind(), name.kind());
    }
});
