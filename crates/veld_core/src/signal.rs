//! Signal dispatch
//!
//! A synchronous named-signal hub standing in for a full object system:
//! widgets and other targets are addressed by numeric id, handlers run in
//! registration order on the emitting thread, and `notify` is sugar for
//! the `notify::<property>` convention. The hub records an emission
//! history (for debugging and call-order assertions in tests).

use rustc_hash::FxHashMap;

/// Handler invoked with the target id and signal name
pub type SignalHandler = Box<dyn Fn(u64, &str) + Send + Sync>;

/// Dispatches named signals to registered handlers
#[derive(Default)]
pub struct SignalHub {
    handlers: FxHashMap<(u64, String), Vec<SignalHandler>>,
    history: Vec<(u64, String)>,
}

impl SignalHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a target and signal name
    pub fn connect<F>(&mut self, target: u64, signal: &str, handler: F)
    where
        F: Fn(u64, &str) + Send + Sync + 'static,
    {
        self.handlers
            .entry((target, signal.to_owned()))
            .or_default()
            .push(Box::new(handler));
    }

    /// Emit a signal, running handlers synchronously in registration order
    pub fn emit(&mut self, target: u64, signal: &str) {
        tracing::trace!(target_id = target, signal, "emit");
        self.history.push((target, signal.to_owned()));
        if let Some(handlers) = self.handlers.get(&(target, signal.to_owned())) {
            for handler in handlers {
                handler(target, signal);
            }
        }
    }

    /// Emit a `notify::<property>` signal
    pub fn notify(&mut self, target: u64, property: &str) {
        self.emit(target, &format!("notify::{property}"));
    }

    /// Emission history, oldest first
    pub fn history(&self) -> &[(u64, String)] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_handlers_run_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut hub = SignalHub::new();

        let first = order.clone();
        hub.connect(1, "show", move |_, _| first.lock().unwrap().push("first"));
        let second = order.clone();
        hub.connect(1, "show", move |_, _| second.lock().unwrap().push("second"));

        hub.emit(1, "show");
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_emit_is_target_scoped() {
        let count = Arc::new(Mutex::new(0));
        let mut hub = SignalHub::new();

        let counter = count.clone();
        hub.connect(1, "map", move |_, _| *counter.lock().unwrap() += 1);

        hub.emit(2, "map");
        assert_eq!(*count.lock().unwrap(), 0);
        hub.emit(1, "map");
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn test_history_records_notify() {
        let mut hub = SignalHub::new();
        hub.notify(7, "sensitive");
        assert_eq!(hub.history(), &[(7, "notify::sensitive".to_owned())]);
        hub.clear_history();
        assert!(hub.history().is_empty());
    }
}
