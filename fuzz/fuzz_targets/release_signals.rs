#![no_main]

use libfuzzer_sys::fuzz_target;
use ferrous_components::{Component, ComponentCache, InjectRequest, ScopeReleaseSource};
use std::sync::Arc;

struct Screen;
impl Component for Screen {}

fuzz_target!(|data: &[u8]| {
    let cache = Arc::new(ComponentCache::new());

    for &byte in data {
        let source = ScopeReleaseSource::new();
        let retain = byte & 1 == 1;
        let restart = byte & 2 == 2;
        let key = format!("screen-{}", byte >> 4);

        InjectRequest::new(cache.clone(), source.clone())
            .retain_on_restart(retain)
            .allow_duplicates(key.clone())
            .build(|| Ok(Screen))
            .unwrap();

        let fired = if restart { source.restart() } else { source.finish() };
        assert!(fired);
        // A second signal never reaches the listener
        assert!(!source.finish());

        let kept = cache.get::<Screen>(&key).is_some();
        assert_eq!(kept, retain && restart);
    }
});
