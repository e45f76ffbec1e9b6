#![no_main]

use integration_broker::oauth::AuthorizationState;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(opaque) = std::str::from_utf8(data) {
        if let Ok(state) = AuthorizationState::decode(opaque) {
            // Whatever decodes must survive a re-encode unchanged
            let again = AuthorizationState::decode(&state.encode()).ok();
            assert_eq!(again.as_ref(), Some(&state));
            let _ = state.verify(Some(&state));
        }
    }
    let _ = AuthorizationState::from_json(data);
});
