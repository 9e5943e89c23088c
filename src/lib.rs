//! Felichat is a terminal chat client for a thread-based conversational API.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`api`] defines the message/envelope wire schema, its validation, and
//!   the transport client that performs one exchange with the backend.
//! - [`core`] owns the session state machine (transcript, thread identity,
//!   single-flight gating) and configuration.
//! - [`ui`] turns message content into a safe display tree and projects the
//!   transcript for a display collaborator; [`ui::plain`] is the bundled
//!   terminal one.
//! - [`utils`] holds URL handling and the transcript log writer.
//!
//! The runtime entrypoint lives in the binary crate (`src/main.rs`), which
//! wires configuration, the HTTP backend, and the interactive input loop
//! around [`core::session::run_turn`].

pub mod api;
pub mod core;
pub mod ui;
pub mod utils;
