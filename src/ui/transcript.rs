//! Projection of session state into the display collaborator's contract: an
//! ordered sequence of role-tagged rendered turns plus the awaiting flag.
//!
//! Each projection is a fresh immutable snapshot; diffing against what is
//! already on screen is the display collaborator's job, not the core's.

use crate::api::Role;
use crate::core::session::SessionState;
use crate::ui::markdown::{render_markdown, Block};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTurn {
    pub role: Role,
    pub content: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptView {
    pub turns: Vec<RenderedTurn>,
    pub is_awaiting: bool,
}

pub fn project(state: &SessionState) -> TranscriptView {
    TranscriptView {
        turns: state
            .transcript()
            .iter()
            .map(|message| RenderedTurn {
                role: message.role,
                content: render_markdown(&message.content),
            })
            .collect(),
        is_awaiting: state.is_pending(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::markdown::Inline;

    #[test]
    fn projection_preserves_order_roles_and_awaiting_flag() {
        let mut state = SessionState::new();
        state
            .begin_submit("hello **cat**")
            .expect("valid")
            .expect("accepted");

        let view = project(&state);
        assert!(view.is_awaiting);
        assert_eq!(view.turns.len(), 1);
        assert_eq!(view.turns[0].role, Role::User);
        match &view.turns[0].content[0] {
            Block::Paragraph(inlines) => {
                assert_eq!(inlines[1], Inline::Strong(vec![Inline::Text("cat".into())]));
            }
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn projecting_twice_yields_identical_views() {
        let mut state = SessionState::new();
        state
            .begin_submit("- a\n- b")
            .expect("valid")
            .expect("accepted");

        assert_eq!(project(&state), project(&state));
    }
}
