//! One peer of a collaborative document: an [`EditingSession`] bound to a
//! shared doc, with thread requests dispatched in the background.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use redline_core::{
    EditingSession, EditorCommand, NodeSpec, Selection, SessionConfig, SessionOutput,
};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::binding::{Binding, BindingConfig, BindingError, DocRegistry, LocalUser, UpdateOrigin};
use crate::dispatcher::{ThreadDispatcher, ThreadEvent};
use crate::thread::{ErrorReporter, ThreadService};

/// Messages a peer sends out.
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    Update { origin: UpdateOrigin, bytes: Vec<u8> },
    Awareness(Vec<u8>),
}

/// Inputs to [`CollabSession::run`].
#[derive(Debug, Clone)]
pub enum Incoming {
    Command(EditorCommand),
    Update { origin: UpdateOrigin, bytes: Vec<u8> },
    Awareness(Vec<u8>),
    Shutdown,
}

/// The thread backend a session talks to.
#[derive(Clone)]
pub struct ThreadBackend {
    pub service: Arc<dyn ThreadService>,
    pub reporter: Arc<dyn ErrorReporter>,
}

pub struct CollabSession {
    user_id: Uuid,
    editing: EditingSession,
    binding: Binding,
    dispatcher: ThreadDispatcher,
    thread_events: mpsc::UnboundedReceiver<ThreadEvent>,
    outgoing: mpsc::UnboundedSender<Outgoing>,
}

impl CollabSession {
    /// Binds a fresh editing session to `doc_id` and loads (or seeds) the
    /// shared document.
    pub fn open(
        doc_id: &str,
        user_id: Uuid,
        config: SessionConfig,
        binding_config: &BindingConfig,
        registry: &Rc<RefCell<DocRegistry>>,
        initial: Option<&[NodeSpec]>,
        backend: ThreadBackend,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Outgoing>), BindingError> {
        let user = LocalUser::from_config(user_id, &config);
        let mut editing = EditingSession::new(config);
        editing.delegate_history();
        let mut binding = Binding::start(doc_id, registry, user, binding_config);
        let seeded = binding.initialize(&mut editing, initial)?;
        let (dispatcher, thread_events) = ThreadDispatcher::new(backend.service, backend.reporter);
        let (outgoing, out_rx) = mpsc::unbounded_channel();

        let session = Self {
            user_id,
            editing,
            binding,
            dispatcher,
            thread_events,
            outgoing,
        };
        if let Some(bytes) = seeded {
            session.send_update(bytes);
        }
        session.send(Outgoing::Awareness(session.binding.join_message()?));
        Ok((session, out_rx))
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn editing(&self) -> &EditingSession {
        &self.editing
    }

    pub fn editing_mut(&mut self) -> &mut EditingSession {
        &mut self.editing
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    fn send(&self, msg: Outgoing) {
        if self.outgoing.send(msg).is_err() {
            log::debug!("outgoing channel closed, dropping message");
        }
    }

    fn send_update(&self, bytes: Vec<u8>) {
        self.send(Outgoing::Update {
            origin: self.binding.origin(),
            bytes,
        });
    }

    /// Ships committed updates to the shared doc and thread requests to the
    /// dispatcher, in commit order. Undo/redo runs on the shared history
    /// and is sent as an undo-manager update.
    fn publish(&mut self, out: &SessionOutput) -> Result<(), BindingError> {
        for report in &out.reports {
            if let Some(bytes) = self.binding.sync_local(report)? {
                self.send_update(bytes);
            }
        }
        self.request_creations(out);
        for request in &out.history {
            let (replayed, update) = self.binding.apply_history(&mut self.editing, *request)?;
            if let Some(bytes) = update {
                self.send(Outgoing::Update {
                    origin: UpdateOrigin::UndoManager,
                    bytes,
                });
            }
            self.request_creations(&replayed);
        }
        if let Some(bytes) = self.binding.broadcast_selection(self.editing.editor().state())? {
            self.send(Outgoing::Awareness(bytes));
        }
        Ok(())
    }

    fn request_creations(&self, out: &SessionOutput) {
        for creation in &out.thread_creations {
            self.dispatcher.request_creation(creation.clone());
        }
    }

    pub fn dispatch(&mut self, command: EditorCommand) -> Result<bool, BindingError> {
        let out = self.editing.dispatch(command)?;
        self.publish(&out)?;
        Ok(out.handled)
    }

    /// Moves the local selection and tells the other peers.
    pub fn select(&mut self, selection: Option<Selection>) -> Result<(), BindingError> {
        self.editing.select(selection)?;
        if let Some(bytes) = self.binding.broadcast_selection(self.editing.editor().state())? {
            self.send(Outgoing::Awareness(bytes));
        }
        Ok(())
    }

    pub fn set_focus(&mut self, focusing: bool) -> Result<(), BindingError> {
        let bytes = self.binding.set_focus(focusing)?;
        self.send(Outgoing::Awareness(bytes));
        Ok(())
    }

    pub fn apply_remote(&mut self, bytes: &[u8], origin: UpdateOrigin) -> Result<(), BindingError> {
        let out = self
            .binding
            .apply_remote_update(&mut self.editing, bytes, origin)?;
        self.publish(&out)
    }

    pub fn apply_awareness(&mut self, bytes: &[u8]) -> Result<(), BindingError> {
        self.binding.apply_awareness(bytes, self.editing.editor().state())
    }

    pub fn handle_thread_event(&mut self, event: ThreadEvent) {
        match event {
            ThreadEvent::Created { suggestion_id, .. } => self.editing.thread_created(&suggestion_id),
            ThreadEvent::CreationFailed { suggestion_id } => {
                self.editing.thread_creation_failed(&suggestion_id)
            }
            ThreadEvent::Reconciled { reopened, rejected } => {
                log::debug!("reconciled threads: {} reopened, {} rejected", reopened.len(), rejected.len());
            }
        }
    }

    /// Applies every thread result that has already arrived.
    pub fn drain_thread_events(&mut self) {
        while let Ok(event) = self.thread_events.try_recv() {
            self.handle_thread_event(event);
        }
    }

    /// Hands a due undo/redo batch to the dispatcher.
    pub fn flush_reconcile(&mut self, now: Instant) -> bool {
        match self.editing.poll_reconcile(now) {
            Some(batch) => {
                self.dispatcher.apply_batch(batch);
                true
            }
            None => false,
        }
    }

    /// Drives the session until `Shutdown` arrives or the input channel
    /// closes, then tears it down. Errors from single inputs are logged
    /// and do not stop the loop.
    pub async fn run(&mut self, mut incoming: mpsc::UnboundedReceiver<Incoming>) {
        loop {
            let deadline = self
                .editing
                .next_reconcile_deadline()
                .map(tokio::time::Instant::from_std);
            tokio::select! {
                msg = incoming.recv() => {
                    let result = match msg {
                        Some(Incoming::Command(command)) => self.dispatch(command).map(|_| ()),
                        Some(Incoming::Update { origin, bytes }) => self.apply_remote(&bytes, origin),
                        Some(Incoming::Awareness(bytes)) => self.apply_awareness(&bytes),
                        Some(Incoming::Shutdown) | None => break,
                    };
                    if let Err(e) = result {
                        log::warn!("session input failed: {e}");
                    }
                }
                Some(event) = self.thread_events.recv() => self.handle_thread_event(event),
                _ = sleep_until(deadline) => {
                    self.flush_reconcile(Instant::now());
                }
            }
        }
        self.destroy();
    }

    pub fn destroy(&mut self) {
        if self.binding.is_destroyed() {
            return;
        }
        if let Ok(bytes) = self.binding.leave_message() {
            self.send(Outgoing::Awareness(bytes));
        }
        self.dispatcher.shutdown();
        self.binding.destroy();
    }
}

impl Drop for CollabSession {
    fn drop(&mut self) {
        self.destroy();
    }
}

async fn sleep_until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
