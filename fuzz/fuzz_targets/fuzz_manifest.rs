#![no_main]

use libfuzzer_sys::fuzz_target;
use vigil_runtime::{App, Manifest, MethodTable};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    for parsed in [Manifest::from_toml_str(text), Manifest::from_json_str(text)] {
        if let Ok(manifest) = parsed {
            // Installing may fail, but never panic.
            let app = App::new();
            let _ = manifest.install(&app, &MethodTable::new());
            app.teardown();
        }
    }
});
