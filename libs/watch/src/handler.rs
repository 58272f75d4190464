//! Typed notification handlers and the filtering adapter.

use batchd_events::WatchEvent;

/// Receives typed notifications for one resource kind.
///
/// Handlers are invoked from the informer loop, one notification at a
/// time, and must not block on I/O.
pub trait ResourceHandler<T>: Send + Sync {
    fn on_add(&self, obj: T);

    fn on_update(&self, old: T, new: T);

    fn on_delete(&self, obj: T);
}

/// Routes one notification to the matching handler method.
///
/// `SyncComplete` carries no object and is ignored here; informers track
/// it themselves.
pub fn dispatch<T, H>(handler: &H, event: WatchEvent<T>)
where
    H: ResourceHandler<T> + ?Sized,
{
    match event {
        WatchEvent::Added(obj) => handler.on_add(obj),
        WatchEvent::Updated { old, new } => handler.on_update(old, new),
        WatchEvent::Deleted(obj) => handler.on_delete(obj),
        WatchEvent::SyncComplete => {}
    }
}

/// Forwards only notifications whose objects pass a predicate.
///
/// An update that crosses the predicate boundary is turned into the
/// matching add or delete, so the wrapped handler never holds an object
/// that currently fails the predicate:
///
/// | old passes | new passes | forwarded as |
/// |---|---|---|
/// | yes | yes | update |
/// | yes | no | delete(old) |
/// | no | yes | add(new) |
/// | no | no | dropped |
pub struct FilteringHandler<F, H> {
    filter: F,
    handler: H,
}

impl<F, H> FilteringHandler<F, H> {
    pub fn new(filter: F, handler: H) -> Self {
        Self { filter, handler }
    }

    /// The wrapped handler.
    pub fn inner(&self) -> &H {
        &self.handler
    }
}

impl<T, F, H> ResourceHandler<T> for FilteringHandler<F, H>
where
    F: Fn(&T) -> bool + Send + Sync,
    H: ResourceHandler<T>,
{
    fn on_add(&self, obj: T) {
        if (self.filter)(&obj) {
            self.handler.on_add(obj);
        }
    }

    fn on_update(&self, old: T, new: T) {
        match ((self.filter)(&old), (self.filter)(&new)) {
            (true, true) => self.handler.on_update(old, new),
            (true, false) => self.handler.on_delete(old),
            (false, true) => self.handler.on_add(new),
            (false, false) => {}
        }
    }

    fn on_delete(&self, obj: T) {
        if (self.filter)(&obj) {
            self.handler.on_delete(obj);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl Recorder {
        fn calls(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl ResourceHandler<i32> for Recorder {
        fn on_add(&self, obj: i32) {
            self.0.lock().unwrap().push(format!("add {obj}"));
        }

        fn on_update(&self, old: i32, new: i32) {
            self.0.lock().unwrap().push(format!("update {old}->{new}"));
        }

        fn on_delete(&self, obj: i32) {
            self.0.lock().unwrap().push(format!("delete {obj}"));
        }
    }

    fn even_only() -> FilteringHandler<impl Fn(&i32) -> bool + Send + Sync, Recorder> {
        FilteringHandler::new(|n: &i32| n % 2 == 0, Recorder::default())
    }

    #[test]
    fn test_add_and_delete_filtered() {
        let handler = even_only();
        handler.on_add(1);
        handler.on_add(2);
        handler.on_delete(3);
        handler.on_delete(4);
        assert_eq!(handler.inner().calls(), vec!["add 2", "delete 4"]);
    }

    #[test]
    fn test_update_transitions() {
        let handler = even_only();
        handler.on_update(2, 4);
        handler.on_update(2, 3);
        handler.on_update(3, 4);
        handler.on_update(3, 5);
        assert_eq!(
            handler.inner().calls(),
            vec!["update 2->4", "delete 2", "add 4"]
        );
    }

    #[test]
    fn test_dispatch_routes_events() {
        let recorder = Recorder::default();
        dispatch(&recorder, WatchEvent::Added(1));
        dispatch(&recorder, WatchEvent::Updated { old: 1, new: 2 });
        dispatch(&recorder, WatchEvent::SyncComplete);
        dispatch(&recorder, WatchEvent::Deleted(2));
        assert_eq!(recorder.calls(), vec!["add 1", "update 1->2", "delete 2"]);
    }
}
