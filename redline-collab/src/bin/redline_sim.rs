//! Replays a short two-peer session and prints what each peer sees.
//!
//! `RUST_LOG=debug cargo run --bin redline-sim` shows the binding and
//! reconciler logs as well.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use redline_collab::{
    BindingConfig, BindingError, CollabSession, DocRegistry, InMemoryThreadService, LogReporter,
    Outgoing, ThreadBackend,
};
use redline_core::router::Platform;
use redline_core::{
    generate_summary, EditorCommand, InputEvent, KeyEvent, NodeKey, NodeSpec, Point, Selection,
    SessionConfig,
};
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

const DOC: &str = "sim-doc";

fn config(name: &str) -> SessionConfig {
    SessionConfig {
        user_name: name.to_string(),
        platform: Platform::Other,
        debounce_ms: 50,
        ..SessionConfig::default()
    }
}

/// Delivers everything queued in `rx` to `to`.
fn pump(
    rx: &mut UnboundedReceiver<Outgoing>,
    to: &mut CollabSession,
) -> Result<(), BindingError> {
    while let Ok(msg) = rx.try_recv() {
        match msg {
            Outgoing::Update { origin, bytes } => to.apply_remote(&bytes, origin)?,
            Outgoing::Awareness(bytes) => to.apply_awareness(&bytes)?,
        }
    }
    Ok(())
}

/// The first child of the first block, if the document has one.
fn first_text(peer: &CollabSession) -> Option<NodeKey> {
    let state = peer.editing().editor().state();
    state
        .children(NodeKey::ROOT)
        .first()
        .and_then(|block| state.children(*block).first().copied())
}

fn describe(label: &str, peer: &CollabSession) {
    let state = peer.editing().editor().state();
    let summary = generate_summary(state, state.suggestion_nodes());
    println!("[{label}] mode={} text={:?}", peer.editing().mode(), state.text_content(NodeKey::ROOT));
    for item in summary {
        match item.replace_with {
            Some(with) => println!("[{label}]   {:?}: {:?} -> {:?}", item.summary_type, item.content, with),
            None => println!("[{label}]   {:?}: {:?}", item.summary_type, item.content),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), BindingError> {
    env_logger::init();
    info!("Starting redline simulator...");

    let service = InMemoryThreadService::shared();
    let backend = ThreadBackend {
        service: service.clone(),
        reporter: Arc::new(LogReporter),
    };
    let binding_config = BindingConfig::default();
    let initial = [NodeSpec::paragraph("The quick brown fox")];

    // Separate registries: each peer is its own client.
    let registry_a = DocRegistry::shared();
    let registry_b = DocRegistry::shared();
    let (mut alice, mut alice_out) = CollabSession::open(
        DOC,
        Uuid::new_v4(),
        config("Alice"),
        &binding_config,
        &registry_a,
        Some(&initial),
        backend.clone(),
    )?;
    let (mut bob, mut bob_out) = CollabSession::open(
        DOC,
        Uuid::new_v4(),
        config("Bob"),
        &binding_config,
        &registry_b,
        None,
        backend,
    )?;
    pump(&mut alice_out, &mut bob)?;
    pump(&mut bob_out, &mut alice)?;
    describe("bob", &bob);

    // Alice switches to suggest mode and replaces "quick" with "slow".
    alice.dispatch(EditorCommand::KeyDown(KeyEvent::new("s").ctrl().alt().shift()))?;
    let Some(text) = first_text(&alice) else {
        warn!("shared document has no text to edit, stopping");
        alice.destroy();
        bob.destroy();
        return Ok(());
    };
    alice.editing_mut().select(Some(Selection::range(Point::new(text, 4), Point::new(text, 9))))?;
    alice.dispatch(EditorCommand::BeforeInput(InputEvent::InsertText("slow".into())))?;
    pump(&mut alice_out, &mut bob)?;
    describe("alice", &alice);
    describe("bob", &bob);

    tokio::time::sleep(Duration::from_millis(20)).await;
    alice.drain_thread_events();
    for thread in service.threads().await {
        println!("thread {} for {} [{:?}]: {}", thread.id, thread.mark_id, thread.state, thread.content);
    }

    // Bob accepts it from edit mode; Alice receives the result.
    let id = bob.editing().mark_map().keys().next().cloned();
    if let Some(id) = id {
        bob.dispatch(EditorCommand::AcceptSuggestion(id))?;
        pump(&mut bob_out, &mut alice)?;
    }
    describe("alice", &alice);
    describe("bob", &bob);

    alice.destroy();
    bob.destroy();
    info!("simulation finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(initial: Option<&[NodeSpec]>) -> CollabSession {
        let backend = ThreadBackend {
            service: InMemoryThreadService::shared(),
            reporter: Arc::new(LogReporter),
        };
        let (session, _) = CollabSession::open(
            DOC,
            Uuid::new_v4(),
            config("Test"),
            &BindingConfig::default(),
            &DocRegistry::shared(),
            initial,
            backend,
        )
        .unwrap();
        session
    }

    #[test]
    fn test_first_text_of_empty_document_is_none() {
        assert_eq!(first_text(&open(None)), None);
        assert_eq!(first_text(&open(Some(&[NodeSpec::paragraph("")]))), None);
    }

    #[test]
    fn test_first_text_finds_the_leading_run() {
        let session = open(Some(&[NodeSpec::paragraph("one"), NodeSpec::paragraph("two")]));
        let text = first_text(&session).unwrap();
        assert_eq!(session.editing().editor().state().text(text).unwrap().text, "one");
    }
}
