/// Concurrent access integration tests
///
/// These tests verify that a shared cache runs each factory once per key,
/// hands every thread the same instance, and keeps slow factories from
/// blocking unrelated keys.

use ferrous_components::{Component, ComponentCache, InjectRequest, ScopeReleaseSource};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct SessionComponent {
    created_by: String,
}
impl Component for SessionComponent {}

#[test]
fn test_concurrent_first_access_creates_once() {
    const THREADS: usize = 16;
    let cache = Arc::new(ComponentCache::new());
    let factory_calls = Arc::new(AtomicU32::new(0));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let cache = cache.clone();
            let factory_calls = factory_calls.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                cache
                    .get_or_create(move || {
                        factory_calls.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(20));
                        Ok(SessionComponent {
                            created_by: format!("{:?}", thread::current().id()),
                        })
                    })
                    .unwrap()
            })
        })
        .collect();

    let instances: Vec<Arc<SessionComponent>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(factory_calls.load(Ordering::SeqCst), 1);
    let first = &instances[0];
    assert!(instances.iter().all(|other| Arc::ptr_eq(first, other)));
    assert!(!first.created_by.is_empty());
    assert_eq!(cache.stats().creations, 1);
}

#[test]
fn test_slow_factory_does_not_block_other_keys() {
    let cache = Arc::new(ComponentCache::new());
    let started = Arc::new(Barrier::new(2));

    let slow = {
        let cache = cache.clone();
        let started = started.clone();
        thread::spawn(move || {
            cache
                .get_or_create_keyed("slow", move || {
                    started.wait();
                    thread::sleep(Duration::from_millis(300));
                    Ok(SessionComponent { created_by: "slow".into() })
                })
                .unwrap()
        })
    };

    // Wait until the slow factory is running before touching the same group
    started.wait();
    let begin = Instant::now();
    let fast = cache
        .get_or_create_keyed("fast", || Ok(SessionComponent { created_by: "fast".into() }))
        .unwrap();
    let elapsed = begin.elapsed();

    assert_eq!(fast.created_by, "fast");
    assert!(elapsed < Duration::from_millis(250), "fast key waited {elapsed:?}");
    assert_eq!(slow.join().unwrap().created_by, "slow");
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_concurrent_requests_share_one_instance_per_key() {
    const KEYS: usize = 4;
    const THREADS_PER_KEY: usize = 8;
    let cache = Arc::new(ComponentCache::new());
    let factory_calls = Arc::new(AtomicU32::new(0));

    crossbeam_utils::thread::scope(|scope| {
        for key in 0..KEYS {
            for _ in 0..THREADS_PER_KEY {
                let cache = cache.clone();
                let factory_calls = factory_calls.clone();
                scope.spawn(move |_| {
                    let source = ScopeReleaseSource::new();
                    InjectRequest::new(cache, source)
                        .allow_duplicates(format!("tab-{key}"))
                        .build(move || {
                            factory_calls.fetch_add(1, Ordering::SeqCst);
                            Ok(SessionComponent { created_by: format!("tab-{key}") })
                        })
                        .unwrap();
                });
            }
        }
    })
    .unwrap();

    assert_eq!(factory_calls.load(Ordering::SeqCst), KEYS as u32);
    assert_eq!(cache.len(), KEYS);
    for key in 0..KEYS {
        let component = cache.get::<SessionComponent>(&format!("tab-{key}")).unwrap();
        assert_eq!(component.created_by, format!("tab-{key}"));
    }
}

#[test]
fn test_concurrent_release_and_recreate_stays_consistent() {
    const ROUNDS: usize = 200;
    let cache = Arc::new(ComponentCache::new());

    crossbeam_utils::thread::scope(|scope| {
        let creator = cache.clone();
        scope.spawn(move |_| {
            for _ in 0..ROUNDS {
                let instance = creator
                    .get_or_create(|| Ok(SessionComponent { created_by: "creator".into() }))
                    .unwrap();
                assert_eq!(instance.created_by, "creator");
            }
        });

        let releaser = cache.clone();
        scope.spawn(move |_| {
            for _ in 0..ROUNDS {
                releaser.release::<SessionComponent>();
                thread::yield_now();
            }
        });
    })
    .unwrap();

    // Whatever interleaving happened, at most the canonical instance is left
    assert!(cache.len() <= 1);
    let stats = cache.stats();
    assert_eq!(stats.creations, stats.misses - stats.failures);
    assert!(stats.releases <= stats.creations);
}

#[test]
fn test_scopes_ending_concurrently_evict_their_own_keys() {
    const SCOPES: usize = 8;
    let cache = Arc::new(ComponentCache::new());

    let sources: Vec<Arc<ScopeReleaseSource>> = (0..SCOPES)
        .map(|i| {
            let source = ScopeReleaseSource::new();
            InjectRequest::new(cache.clone(), source.clone())
                .allow_duplicates(format!("scope-{i}"))
                .build(move || Ok(SessionComponent { created_by: format!("scope-{i}") }))
                .unwrap();
            source
        })
        .collect();
    assert_eq!(cache.len(), SCOPES);

    let barrier = Arc::new(Barrier::new(SCOPES / 2));
    let handles: Vec<_> = sources
        .iter()
        .take(SCOPES / 2)
        .cloned()
        .map(|source| {
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                source.finish()
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }

    assert_eq!(cache.len(), SCOPES / 2);
    for i in 0..SCOPES {
        let present = cache.get::<SessionComponent>(&format!("scope-{i}")).is_some();
        assert_eq!(present, i >= SCOPES / 2, "scope-{i}");
    }
}
