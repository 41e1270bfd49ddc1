//! # Change Dispatcher
//!
//! Ordered registry of change listeners.
//!
//! Every fired change reaches every listener, synchronously and in registration
//! order. A listener that returns an error or panics is logged and skipped for
//! that change only; it keeps receiving later changes.

use std::panic::{self, AssertUnwindSafe};
use tracing::{error, warn};

use crate::controller::field::{Field, FieldValue};

/// Trait for reacting to announced input changes.
#[cfg_attr(test, mockall::automock)]
pub trait InputListener: Send {
    fn on_change(&mut self, field: Field, value: FieldValue) -> anyhow::Result<()>;
}

/// Adapter for plain closures that cannot fail.
struct FnListener<F>(F);

impl<F> InputListener for FnListener<F>
where
    F: FnMut(Field, FieldValue) + Send,
{
    fn on_change(&mut self, field: Field, value: FieldValue) -> anyhow::Result<()> {
        (self.0)(field, value);
        Ok(())
    }
}

/// Handle returned on registration, usable to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct ListenerEntry {
    id: ListenerId,
    listener: Box<dyn InputListener>,
}

/// Ordered list of listeners.
#[derive(Default)]
pub struct Dispatcher {
    next_id: u64,
    listeners: Vec<ListenerEntry>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener after all previously registered ones.
    pub fn add_listener(&mut self, listener: impl InputListener + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push(ListenerEntry {
            id,
            listener: Box::new(listener),
        });
        id
    }

    /// Registers a closure as a listener.
    ///
    /// # Examples
    ///
    /// ```
    /// use deck_input::dispatcher::Dispatcher;
    /// use deck_input::controller::field::{Field, FieldValue};
    ///
    /// let mut dispatcher = Dispatcher::new();
    /// dispatcher.add_fn(|field, value| println!("{} -> {}", field, value));
    /// dispatcher.dispatch(Field::A, FieldValue::Bool(true));
    /// ```
    pub fn add_fn<F>(&mut self, callback: F) -> ListenerId
    where
        F: FnMut(Field, FieldValue) + Send + 'static,
    {
        self.add_listener(FnListener(callback))
    }

    /// Unregisters a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|entry| entry.id != id);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Delivers one change to every listener in registration order.
    pub fn dispatch(&mut self, field: Field, value: FieldValue) {
        for entry in &mut self.listeners {
            invoke(entry, field, value);
        }
    }
}

/// Calls one listener, containing its errors and panics.
fn invoke(entry: &mut ListenerEntry, field: Field, value: FieldValue) {
    let listener = &mut entry.listener;
    match panic::catch_unwind(AssertUnwindSafe(|| listener.on_change(field, value))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Listener {:?} failed on {} = {}: {:#}", entry.id, field, value, e),
        Err(_) => error!("Listener {:?} panicked on {} = {}", entry.id, field, value),
    }
}
