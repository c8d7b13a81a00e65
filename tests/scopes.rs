/// Scope lifecycle tests: built-in release sources driving an injector.

use ferrous_components::{
    Component, ComponentType, Injector, InjectorOptions, ReleaseState, ScopeEnd, ScopeGuard,
    ScopeReleaseSource,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct ScreenComponent {
    generation: u32,
}
impl Component for ScreenComponent {}

#[derive(Debug)]
struct DialogComponent;
impl Component for DialogComponent {}

fn screen_factory(
    counter: &Arc<AtomicU32>,
) -> impl FnOnce() -> Result<ScreenComponent, ferrous_components::BoxError> {
    let counter = counter.clone();
    move || {
        Ok(ScreenComponent {
            generation: counter.fetch_add(1, Ordering::SeqCst) + 1,
        })
    }
}

#[test]
fn test_source_state_progression() {
    let injector = Injector::new();
    let source = ScopeReleaseSource::new();
    assert_eq!(source.state(), ReleaseState::Idle);

    injector.with(source.clone()).build(|| Ok(DialogComponent)).unwrap();
    assert_eq!(source.state(), ReleaseState::Registered);

    assert!(source.end(ScopeEnd::Terminal));
    assert_eq!(source.state(), ReleaseState::Unregistered);
    assert!(!source.restart());
}

#[test]
fn test_rotation_keeps_component_when_retained() {
    let injector = Injector::new();
    let counter = Arc::new(AtomicU32::new(0));

    // Three rotations, then the screen closes
    let mut seen = Vec::new();
    for _ in 0..3 {
        let guard = ScopeGuard::new();
        let screen = injector
            .with(guard.source())
            .retain_on_restart(true)
            .build(screen_factory(&counter))
            .unwrap();
        seen.push(screen.generation);
        assert!(guard.restart());
    }
    assert_eq!(seen, vec![1, 1, 1]);
    assert_eq!(injector.cache().len(), 1);

    let last = ScopeGuard::new();
    injector
        .with(last.source())
        .retain_on_restart(true)
        .build(screen_factory(&counter))
        .unwrap();
    drop(last);

    assert!(injector.cache().is_empty());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_rotation_recreates_component_without_retain() {
    let injector = Injector::new();
    let counter = Arc::new(AtomicU32::new(0));

    for expected in 1..=3 {
        let guard = ScopeGuard::new();
        let screen = injector.with(guard.source()).build(screen_factory(&counter)).unwrap();
        assert_eq!(screen.generation, expected);
        guard.restart();
        assert!(injector.cache().is_empty());
    }
}

#[test]
fn test_injector_defaults_apply_to_every_request() {
    let injector = Injector::builder()
        .options(InjectorOptions { retain_on_restart: true, log_events: false })
        .build();
    assert!(injector.defaults().retain_on_restart);

    let guard = ScopeGuard::new();
    let first = injector.with(guard.source()).build(|| Ok(ScreenComponent { generation: 1 })).unwrap();
    guard.restart();

    let guard = ScopeGuard::new();
    let again = injector.with(guard.source()).build(|| Ok(ScreenComponent { generation: 2 })).unwrap();
    assert!(Arc::ptr_eq(&first, &again));

    // A request can still opt out of the default
    let opt_out = ScopeGuard::new();
    injector
        .with(opt_out.source())
        .retain_on_restart(false)
        .build(|| Ok(DialogComponent))
        .unwrap();
    opt_out.restart();
    assert!(injector.cache().get::<DialogComponent>(ComponentType::of::<DialogComponent>().canonical_key()).is_none());
}

#[test]
fn test_nested_scopes_release_independently() {
    let injector = Injector::new();

    let screen = ScopeGuard::new();
    injector.with(screen.source()).build(|| Ok(ScreenComponent { generation: 1 })).unwrap();

    {
        let dialog = ScopeGuard::new();
        injector.with(dialog.source()).build(|| Ok(DialogComponent)).unwrap();
        assert_eq!(injector.component_groups().len(), 2);
    }

    let groups = injector.component_groups();
    assert!(groups[&ComponentType::of::<DialogComponent>()].is_empty());
    assert_eq!(groups[&ComponentType::of::<ScreenComponent>()].len(), 1);

    drop(screen);
    assert!(injector.cache().is_empty());
}

#[test]
fn test_clear_components_then_late_release_is_noop() {
    let injector = Injector::new();
    let source = ScopeReleaseSource::new();
    injector.with(source.clone()).build(|| Ok(DialogComponent)).unwrap();

    assert_eq!(injector.clear_components(), 1);
    assert!(source.finish());
    assert_eq!(source.state(), ReleaseState::Unregistered);
    assert_eq!(injector.cache().stats().releases, 1);
}

mod observed {
    use super::*;
    use ferrous_components::{CacheObserver, DiError, LoggingObserver};
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct EventLog {
        events: Mutex<Vec<String>>,
    }

    impl EventLog {
        fn push(&self, event: &str, key: &str) {
            self.events.lock().push(format!("{event}:{key}"));
        }
    }

    impl CacheObserver for EventLog {
        fn created(&self, _ty: &ComponentType, key: &str, _duration: Duration) {
            self.push("created", key);
        }

        fn hit(&self, _ty: &ComponentType, key: &str) {
            self.push("hit", key);
        }

        fn creation_failed(&self, _ty: &ComponentType, key: &str, _error: &DiError) {
            self.push("failed", key);
        }

        fn released(&self, _ty: &ComponentType, key: &str) {
            self.push("released", key);
        }

        fn retained(&self, _ty: &ComponentType, key: &str) {
            self.push("retained", key);
        }
    }

    #[test]
    fn test_observer_sees_full_scope_lifecycle() {
        let log = Arc::new(EventLog::default());
        let injector = Injector::builder()
            .observer(log.clone())
            .observer(Arc::new(LoggingObserver::with_prefix("[scopes]")))
            .options(InjectorOptions { retain_on_restart: true, log_events: true })
            .build();

        let guard = ScopeGuard::new();
        let _ = injector
            .with(guard.source())
            .allow_duplicates("main")
            .build::<DialogComponent, _>(|| Err("not ready".into()));
        injector.with(guard.source()).allow_duplicates("main").build(|| Ok(DialogComponent)).unwrap();
        guard.restart();

        let guard = ScopeGuard::new();
        injector.with(guard.source()).allow_duplicates("main").build(|| Ok(DialogComponent)).unwrap();
        drop(guard);

        assert_eq!(
            *log.events.lock(),
            vec!["failed:main", "created:main", "retained:main", "hit:main", "released:main"]
        );
    }
}
