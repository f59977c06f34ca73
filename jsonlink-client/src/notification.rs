//! Notification handler registry
//!
//! Server notifications are routed by method name to the handlers registered
//! for that name. A name may carry several handlers:
//!
//! - handlers run in registration order
//! - registering the same handler twice under one name is a no-op
//! - a handler that returns an error or panics is logged and skipped; the
//!   remaining handlers still run
//! - notifications for names without handlers are dropped silently
//!
//! Dispatch works on a snapshot of the handler list, so a handler may add or
//! remove handlers (itself included) while it runs. Such changes apply from
//! the next notification on.
//!
//! Handler identity is the `Arc` inside [`NotificationHandler`]: keep a clone
//! of the handler you registered to remove it later.
//!
//! # Examples
//!
//! ```rust
//! use jsonlink_client::NotificationHandler;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct StatusChanged {
//!     status: String,
//! }
//!
//! let on_status = NotificationHandler::typed(|event: StatusChanged| {
//!     println!("workspace is now {}", event.status);
//!     Ok(())
//! });
//!
//! let raw = NotificationHandler::new(|params| {
//!     println!("raw params: {}", params);
//!     Ok(())
//! });
//! # let _ = (on_status, raw);
//! ```

use jsonlink_core::{Error, JsonRpcNotification, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

type HandlerFn = dyn Fn(&Value) -> Result<()> + Send + Sync;

/// A callback for one notification method
///
/// Cloning is cheap and preserves identity.
#[derive(Clone)]
pub struct NotificationHandler {
    callback: Arc<HandlerFn>,
}

impl NotificationHandler {
    /// Handler receiving the raw `params` (`null` when absent)
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(f),
        }
    }

    /// Handler receiving `params` deserialized into `T`
    ///
    /// Params that do not fit `T` count as a handler failure.
    pub fn typed<T, F>(f: F) -> Self
    where
        T: DeserializeOwned,
        F: Fn(T) -> Result<()> + Send + Sync + 'static,
    {
        Self::new(move |params| {
            let typed = T::deserialize(params).map_err(|e| Error::Serialization(e.to_string()))?;
            f(typed)
        })
    }

    /// Whether both values refer to the same registered callback
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback)
    }

    fn invoke(&self, params: &Value) -> Result<()> {
        match catch_unwind(AssertUnwindSafe(|| (self.callback)(params))) {
            Ok(outcome) => outcome,
            Err(panic) => Err(Error::Handler(panic_message(panic.as_ref()))),
        }
    }
}

impl fmt::Debug for NotificationHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationHandler")
            .field("callback", &Arc::as_ptr(&self.callback))
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}

/// What happened to one notification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Handlers that returned `Ok`
    pub delivered: usize,
    /// Handlers that returned an error or panicked
    pub failed: usize,
}

/// Method name to ordered handler list
#[derive(Clone, Default)]
pub struct NotificationRegistry {
    handlers: Arc<Mutex<HashMap<String, Vec<NotificationHandler>>>>,
}

impl NotificationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `name`
    ///
    /// Returns false if that exact handler was already registered there.
    pub fn add(&self, name: impl Into<String>, handler: NotificationHandler) -> bool {
        let mut handlers = crate::lock(&self.handlers);
        let list = handlers.entry(name.into()).or_default();
        if list.iter().any(|h| h.ptr_eq(&handler)) {
            return false;
        }
        list.push(handler);
        true
    }

    /// Remove one handler from `name`
    ///
    /// The name is forgotten once its last handler is gone.
    pub fn remove(&self, name: &str, handler: &NotificationHandler) -> bool {
        let mut handlers = crate::lock(&self.handlers);
        let Some(list) = handlers.get_mut(name) else {
            return false;
        };

        let before = list.len();
        list.retain(|h| !h.ptr_eq(handler));
        let removed = list.len() != before;

        if list.is_empty() {
            handlers.remove(name);
        }
        removed
    }

    /// Remove every handler for `name`, returning how many there were
    pub fn remove_all(&self, name: &str) -> usize {
        crate::lock(&self.handlers)
            .remove(name)
            .map_or(0, |list| list.len())
    }

    /// Number of handlers registered for `name`
    pub fn handler_count(&self, name: &str) -> usize {
        crate::lock(&self.handlers).get(name).map_or(0, Vec::len)
    }

    /// Names with at least one handler
    pub fn names(&self) -> Vec<String> {
        crate::lock(&self.handlers).keys().cloned().collect()
    }

    /// Run the handlers for a notification
    pub fn dispatch(&self, notification: &JsonRpcNotification) -> DispatchOutcome {
        let snapshot = match crate::lock(&self.handlers).get(&notification.method) {
            Some(list) => list.clone(),
            None => {
                tracing::trace!(method = %notification.method, "No handler for notification");
                return DispatchOutcome::default();
            }
        };

        let null = Value::Null;
        let params = notification.params.as_ref().unwrap_or(&null);
        let mut outcome = DispatchOutcome::default();

        for (index, handler) in snapshot.iter().enumerate() {
            match handler.invoke(params) {
                Ok(()) => outcome.delivered += 1,
                Err(e) => {
                    outcome.failed += 1;
                    tracing::warn!(
                        method = %notification.method,
                        handler = index,
                        error = %e,
                        "Notification handler failed"
                    );
                }
            }
        }
        outcome
    }
}
