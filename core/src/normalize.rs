//! Preparation of a conversation before it goes over the wire.

use crate::types::{Role, Turn};

const MERGE_SEPARATOR: &str = "\n\n";

/// Normalizes a conversation for a model.
///
/// System turns become user turns when the model has no system role, runs of
/// same-role turns are merged with a blank line between them, and every
/// merged turn keeps only its trailing `context_budget` characters.
pub fn normalize(turns: &[Turn], supports_system_role: bool, context_budget: usize) -> Vec<Turn> {
    let mut merged: Vec<Turn> = Vec::with_capacity(turns.len());

    for turn in turns {
        let role = match turn.role {
            Role::System if !supports_system_role => Role::User,
            role => role,
        };

        match merged.last_mut() {
            Some(last) if last.role == role => {
                last.content.push_str(MERGE_SEPARATOR);
                last.content.push_str(&turn.content);
            }
            _ => merged.push(Turn {
                role,
                content: turn.content.clone(),
            }),
        }
    }

    for turn in &mut merged {
        truncate_to_tail(&mut turn.content, context_budget);
    }

    merged
}

/// Drops leading characters so at most `budget` characters remain.
fn truncate_to_tail(content: &mut String, budget: usize) {
    let len = content.chars().count();
    if len <= budget {
        return;
    }
    let skip = len - budget;
    let cut = content
        .char_indices()
        .nth(skip)
        .map(|(idx, _)| idx)
        .unwrap_or(content.len());
    content.drain(..cut);
}
