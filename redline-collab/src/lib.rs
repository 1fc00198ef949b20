//! # redline-collab: collaboration layer for redline
//!
//! Binds an editing session to a shared `yrs` document, tracks who else is
//! in the document, and keeps suggestion comment threads in step with the
//! suggestions in the text.
//!
//! ```text
//! ┌────────────────┐  sync_local   ┌───────────┐   v1 updates   ┌──────────┐
//! │ EditingSession │ ────────────► │  Binding  │ ◄────────────► │  peers   │
//! │ (redline-core) │ ◄──────────── │ (yrs Doc) │                └──────────┘
//! └───────┬────────┘  collaboration└───────────┘
//!         │ ThreadCreation / ReconcileBatch
//!         ▼
//! ┌──────────────────┐  tokio tasks  ┌───────────────┐
//! │ ThreadDispatcher │ ────────────► │ ThreadService │
//! └──────────────────┘ ◄──────────── └───────────────┘
//!                        ThreadEvent
//! ```
//!
//! ## Modules
//!
//! - [`binding`]: node records in the shared doc, remote update application
//! - [`presence`]: awareness messages and remote caret decorations
//! - [`thread`]: the thread backend interface and an in-memory backend
//! - [`dispatcher`]: background thread-service calls
//! - [`session`]: one peer, driven by a `select!` loop

pub mod binding;
pub mod dispatcher;
pub mod presence;
pub mod session;
pub mod thread;

pub use binding::{
    Binding, BindingConfig, BindingError, DocRegistry, LoadResult, LocalUser, UpdateOrigin,
};
pub use dispatcher::{ThreadDispatcher, ThreadEvent};
pub use presence::{AwarenessMessage, CursorColor, CursorDecoration, PresenceRoom, RemotePeer};
pub use session::{CollabSession, Incoming, Outgoing, ThreadBackend};
pub use thread::{
    ErrorReporter, InMemoryThreadService, LogReporter, Thread, ThreadService, ThreadServiceError,
    ThreadState,
};
