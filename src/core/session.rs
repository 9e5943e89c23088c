//! Session state machine: single-flight turn sequencing and thread-identity
//! continuity.
//!
//! A session owns one [`SessionState`] for its whole lifetime. The state moves
//! between `Idle` and `Awaiting` (`pending == true`); the pending flag is the
//! sole concurrency guard, checked and set at the one submission entry point.
//! Reading the transcript while a request is in flight is always safe.

use std::fmt;

use tracing::debug;

use crate::api::client::{Backend, TransportError};
use crate::api::{validate_envelope, Message, MessageEnvelope, SchemaError};

/// The backend violated the thread-continuity contract. Indicates a
/// backend/client mismatch; not locally recoverable.
#[derive(Debug)]
pub enum ProtocolError {
    /// A successful exchange came back without a thread id. Thread identity
    /// must be established by the first successful exchange.
    MissingThreadId,
    /// The backend switched thread ids mid-session.
    ThreadIdChanged { established: String, received: String },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::MissingThreadId => {
                write!(f, "backend response carried no thread id")
            }
            ProtocolError::ThreadIdChanged {
                established,
                received,
            } => write!(
                f,
                "backend switched thread id mid-session (had {established}, got {received})"
            ),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Union of everything a turn can fail with. Leaf errors propagate through
/// unmodified; the session machine never swallows or retries them.
#[derive(Debug)]
pub enum ChatError {
    Schema(SchemaError),
    Transport(TransportError),
    Protocol(ProtocolError),
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::Schema(err) => write!(f, "schema error: {err}"),
            ChatError::Transport(err) => write!(f, "transport error: {err}"),
            ChatError::Protocol(err) => write!(f, "protocol error: {err}"),
        }
    }
}

impl std::error::Error for ChatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChatError::Schema(err) => Some(err),
            ChatError::Transport(err) => Some(err),
            ChatError::Protocol(err) => Some(err),
        }
    }
}

impl From<SchemaError> for ChatError {
    fn from(err: SchemaError) -> Self {
        ChatError::Schema(err)
    }
}

impl From<TransportError> for ChatError {
    fn from(err: TransportError) -> Self {
        ChatError::Transport(err)
    }
}

impl From<ProtocolError> for ChatError {
    fn from(err: ProtocolError) -> Self {
        ChatError::Protocol(err)
    }
}

/// Mutable conversation state for one session.
///
/// Created empty at session start; discarded with the session. There is no
/// terminal state and no persistence.
#[derive(Debug, Default)]
pub struct SessionState {
    transcript: Vec<Message>,
    thread_id: Option<String>,
    pending: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append-only view of the conversation so far.
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    /// True exactly while a request is in flight.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Enter the `Awaiting` state for one user submission.
    ///
    /// Returns `Ok(None)` without touching any state while a request is
    /// already in flight: concurrent submissions are a no-op, never a second
    /// network call. Otherwise the user message is appended immediately
    /// (optimistic echo), `pending` is set, and the validated outbound
    /// envelope is handed back for dispatch.
    ///
    /// Empty and whitespace-only text is forwarded as-is.
    pub fn begin_submit(&mut self, text: &str) -> Result<Option<MessageEnvelope>, ChatError> {
        if self.pending {
            debug!("submission rejected: a request is already in flight");
            return Ok(None);
        }

        let message = Message::user(text);
        self.transcript.push(message.clone());
        self.pending = true;

        let envelope = MessageEnvelope {
            thread_id: self.thread_id.clone(),
            message,
        };
        match Self::validate_outbound(&envelope) {
            Ok(validated) => Ok(Some(validated)),
            Err(err) => {
                // The optimistic message stays; only the in-flight marker rolls back.
                self.pending = false;
                Err(err)
            }
        }
    }

    fn validate_outbound(envelope: &MessageEnvelope) -> Result<MessageEnvelope, ChatError> {
        let value = serde_json::to_value(envelope)
            .map_err(|e| SchemaError::InvalidJson(e.to_string()))?;
        let validated = validate_envelope(&value)?;
        validated.ensure_outbound()?;
        Ok(validated)
    }

    /// Settle a successful exchange: `Awaiting -> Idle`.
    ///
    /// Thread identity may only ever be set, never cleared or changed. A
    /// response without a thread id, or with a different one than already
    /// established, fails with [`ProtocolError`]; the assistant message is
    /// then not appended, the thread id does not advance, and the optimistic
    /// user message stays in the transcript.
    pub fn complete(&mut self, envelope: MessageEnvelope) -> Result<(), ChatError> {
        self.pending = false;
        envelope.ensure_inbound()?;

        let received = match envelope.thread_id {
            Some(id) => id,
            None => return Err(ProtocolError::MissingThreadId.into()),
        };
        match &self.thread_id {
            Some(established) if *established != received => {
                return Err(ProtocolError::ThreadIdChanged {
                    established: established.clone(),
                    received,
                }
                .into());
            }
            Some(_) => {}
            None => {
                debug!(thread_id = %received, "thread identity established");
                self.thread_id = Some(received);
            }
        }

        self.transcript.push(envelope.message);
        Ok(())
    }

    /// Settle a failed exchange: `Awaiting -> Idle`.
    ///
    /// The optimistically appended user message is kept (no rollback) so
    /// nothing the user typed is silently lost; clearing `pending` makes a
    /// retry submission possible.
    pub fn fail(&mut self, error: &ChatError) {
        debug!(%error, "turn failed; transcript keeps the user message");
        self.pending = false;
    }
}

/// What a submission attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The exchange ran to completion and both turns are in the transcript.
    Completed,
    /// A request was already in flight; nothing happened.
    Rejected,
}

/// Run one full turn: submit, dispatch, settle.
///
/// Exactly one backend call per accepted submission. Errors from any layer
/// propagate unmodified after the state has been settled back to `Idle`.
pub async fn run_turn<B: Backend + ?Sized>(
    state: &mut SessionState,
    backend: &B,
    text: &str,
) -> Result<TurnOutcome, ChatError> {
    let envelope = match state.begin_submit(text)? {
        Some(envelope) => envelope,
        None => return Ok(TurnOutcome::Rejected),
    };

    match backend.send(&envelope).await {
        Ok(reply) => {
            state.complete(reply)?;
            Ok(TurnOutcome::Completed)
        }
        Err(err) => {
            state.fail(&err);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Role;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Backend that replays scripted results and counts calls.
    struct ScriptedBackend {
        replies: Mutex<VecDeque<Result<MessageEnvelope, ChatError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<Result<MessageEnvelope, ChatError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Backend for ScriptedBackend {
        async fn send(&self, _envelope: &MessageEnvelope) -> Result<MessageEnvelope, ChatError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .expect("replies lock")
                .pop_front()
                .expect("unexpected extra backend call")
        }
    }

    fn reply(thread_id: &str, content: &str) -> MessageEnvelope {
        MessageEnvelope {
            thread_id: Some(thread_id.to_string()),
            message: Message::assistant(content),
        }
    }

    #[test]
    fn new_sessions_start_idle_and_empty() {
        let state = SessionState::new();
        assert!(state.transcript().is_empty());
        assert_eq!(state.thread_id(), None);
        assert!(!state.is_pending());
    }

    #[test]
    fn begin_submit_echoes_optimistically_and_carries_thread_id() {
        let mut state = SessionState::new();
        let envelope = state
            .begin_submit("hello")
            .expect("valid submission")
            .expect("idle session accepts");

        assert!(state.is_pending());
        assert_eq!(state.transcript().len(), 1);
        assert_eq!(state.transcript()[0], Message::user("hello"));
        assert_eq!(envelope.thread_id, None);
        assert_eq!(envelope.message.role, Role::User);
    }

    #[test]
    fn submissions_while_pending_are_a_no_op() {
        let mut state = SessionState::new();
        state
            .begin_submit("first")
            .expect("valid")
            .expect("accepted");

        let second = state.begin_submit("second").expect("no error");
        assert!(second.is_none());
        assert_eq!(state.transcript().len(), 1);
        assert!(state.is_pending());
    }

    #[tokio::test]
    async fn pending_sessions_never_issue_a_second_network_call() {
        let backend = ScriptedBackend::new(vec![]);
        let mut state = SessionState::new();
        state
            .begin_submit("first")
            .expect("valid")
            .expect("accepted");

        let outcome = run_turn(&mut state, &backend, "second")
            .await
            .expect("rejection is not an error");
        assert_eq!(outcome, TurnOutcome::Rejected);
        assert_eq!(backend.calls(), 0);
        assert_eq!(state.transcript().len(), 1);
    }

    #[tokio::test]
    async fn successful_turn_appends_both_messages_and_installs_thread() {
        let backend = ScriptedBackend::new(vec![Ok(reply("t1", "hi **there**"))]);
        let mut state = SessionState::new();

        let outcome = run_turn(&mut state, &backend, "hello")
            .await
            .expect("turn succeeds");

        assert_eq!(outcome, TurnOutcome::Completed);
        assert_eq!(backend.calls(), 1);
        assert!(!state.is_pending());
        assert_eq!(state.thread_id(), Some("t1"));
        assert_eq!(
            state.transcript(),
            &[Message::user("hello"), Message::assistant("hi **there**")]
        );

        // The assistant turn renders with a strong inline wrapping "there".
        use crate::ui::markdown::{render_markdown, Block, Inline};
        let rendered = render_markdown(&state.transcript()[1].content);
        match &rendered[0] {
            Block::Paragraph(inlines) => {
                assert!(inlines.contains(&Inline::Strong(vec![Inline::Text("there".into())])));
            }
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn established_thread_id_rides_on_the_next_envelope() {
        let backend = ScriptedBackend::new(vec![Ok(reply("abc", "one"))]);
        let mut state = SessionState::new();
        run_turn(&mut state, &backend, "first")
            .await
            .expect("first turn");

        let envelope = state
            .begin_submit("second")
            .expect("valid")
            .expect("accepted");
        assert_eq!(envelope.thread_id.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn transport_failure_keeps_user_message_and_clears_pending() {
        let backend = ScriptedBackend::new(vec![Err(ChatError::Transport(
            TransportError::Request("connection refused".into()),
        ))]);
        let mut state = SessionState::new();

        let err = run_turn(&mut state, &backend, "x")
            .await
            .expect_err("transport failure surfaces");

        assert!(matches!(err, ChatError::Transport(_)));
        assert_eq!(state.transcript(), &[Message::user("x")]);
        assert!(!state.is_pending());
    }

    #[tokio::test]
    async fn missing_inbound_thread_id_is_a_protocol_error() {
        let backend = ScriptedBackend::new(vec![Ok(MessageEnvelope {
            thread_id: None,
            message: Message::assistant("hi"),
        })]);
        let mut state = SessionState::new();

        let err = run_turn(&mut state, &backend, "hello")
            .await
            .expect_err("null thread id violates the contract");

        assert!(matches!(
            err,
            ChatError::Protocol(ProtocolError::MissingThreadId)
        ));
        assert_eq!(state.thread_id(), None);
        assert_eq!(state.transcript(), &[Message::user("hello")]);
        assert!(!state.is_pending());
    }

    #[tokio::test]
    async fn mid_session_thread_id_change_is_a_protocol_error() {
        let backend = ScriptedBackend::new(vec![Ok(reply("t1", "one")), Ok(reply("t2", "two"))]);
        let mut state = SessionState::new();
        run_turn(&mut state, &backend, "first")
            .await
            .expect("first turn");

        let err = run_turn(&mut state, &backend, "second")
            .await
            .expect_err("switched thread id");

        assert!(matches!(
            err,
            ChatError::Protocol(ProtocolError::ThreadIdChanged { .. })
        ));
        // Identity is sticky: the established id survives the violation.
        assert_eq!(state.thread_id(), Some("t1"));
        assert_eq!(state.transcript().len(), 3);
        assert_eq!(state.transcript()[2], Message::user("second"));
        assert!(!state.is_pending());
    }

    #[tokio::test]
    async fn empty_submissions_are_forwarded() {
        let backend = ScriptedBackend::new(vec![Ok(reply("t1", "still here"))]);
        let mut state = SessionState::new();

        let outcome = run_turn(&mut state, &backend, "   ")
            .await
            .expect("permissive input");
        assert_eq!(outcome, TurnOutcome::Completed);
        assert_eq!(state.transcript()[0], Message::user("   "));
    }

    #[test]
    fn transcript_is_readable_while_awaiting() {
        let mut state = SessionState::new();
        state
            .begin_submit("hello")
            .expect("valid")
            .expect("accepted");

        assert!(state.is_pending());
        let snapshot: Vec<Message> = state.transcript().to_vec();
        assert_eq!(snapshot, vec![Message::user("hello")]);
    }
}
