//! Listener handles.
//!
//! Rust closures have no identity, so a [`Listener`] carries a unique id that
//! the registry keys on. Clones of a handle share the id: registering a clone
//! of an already-registered handle the same way (`on` or `once`) is a no-op,
//! and any clone can be passed to `off` to remove it.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use uuid::Uuid;

/// Identity of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The leading digits of a v7 UUID are its timestamp; the tail is random.
        let simple = self.0.simple().to_string();
        write!(f, "Listener({})", &simple[simple.len() - 8..])
    }
}

type SyncCallback<E> = dyn Fn(&E) -> anyhow::Result<()> + Send + Sync;
type AsyncCallback<E> = dyn Fn(E) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync;

pub(crate) enum Callback<E> {
    /// Runs to completion inside `emit`.
    Sync(Arc<SyncCallback<E>>),
    /// Produces a future that the dispatch adapter tracks.
    Async(Arc<AsyncCallback<E>>),
}

impl<E> Clone for Callback<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Sync(f) => Self::Sync(Arc::clone(f)),
            Self::Async(f) => Self::Async(Arc::clone(f)),
        }
    }
}

/// A callback invoked with the message event for every matching emit.
///
/// Returning `Err` (or panicking) is logged by the bus and does not stop the
/// remaining listeners from running.
pub struct Listener<E> {
    id: ListenerId,
    pub(crate) callback: Callback<E>,
    pub(crate) once: bool,
}

impl<E> Clone for Listener<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: self.callback.clone(),
            once: self.once,
        }
    }
}

impl<E: 'static> Listener<E> {
    /// Create a listener that runs synchronously during `emit`.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            id: ListenerId::new(),
            callback: Callback::Sync(Arc::new(callback)),
            once: false,
        }
    }

    /// Create a listener whose work continues after `emit` returns.
    ///
    /// The returned future is handed to the bus's dispatch adapter, which
    /// decides whether it is awaited (edge) or left to run on its own (client).
    pub fn new_async<F, Fut>(callback: F) -> Self
    where
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let callback: Arc<AsyncCallback<E>> =
            Arc::new(move |event: E| -> BoxFuture<'static, anyhow::Result<()>> {
                Box::pin(callback(event))
            });
        Self {
            id: ListenerId::new(),
            callback: Callback::Async(callback),
            once: false,
        }
    }
}

impl<E> Listener<E> {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub(crate) fn into_once(mut self) -> Self {
        self.once = true;
        self
    }
}

impl<E> std::fmt::Debug for Listener<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.callback {
            Callback::Sync(_) => "sync",
            Callback::Async(_) => "async",
        };
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("kind", &kind)
            .field("once", &self.once)
            .finish()
    }
}
