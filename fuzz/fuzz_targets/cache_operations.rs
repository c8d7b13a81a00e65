#![no_main]

use libfuzzer_sys::fuzz_target;
use ferrous_components::ComponentCache;
use std::collections::HashSet;

struct Payload(u8);

fuzz_target!(|data: &[u8]| {
    let cache = ComponentCache::new();
    let mut live = HashSet::new();

    // Each pair of bytes is one operation on one of 16 keys
    for chunk in data.chunks_exact(2) {
        let key = format!("k{}", chunk[1] % 16);
        match chunk[0] % 4 {
            0 => {
                let value = chunk[1];
                let payload = cache.get_or_create_keyed(&key, || Ok(Payload(value))).unwrap();
                if live.insert(key.clone()) {
                    assert_eq!(payload.0, value);
                }
            }
            1 => {
                let result = cache.get_or_create_keyed::<Payload, _>(&key, || Err("fuzz failure".into()));
                assert_eq!(result.is_ok(), live.contains(&key));
            }
            2 => {
                assert_eq!(cache.release_keyed::<Payload>(&key), live.remove(&key));
            }
            _ => {
                assert_eq!(cache.clear(), live.len());
                live.clear();
            }
        }
        assert_eq!(cache.len(), live.len());
    }
});
