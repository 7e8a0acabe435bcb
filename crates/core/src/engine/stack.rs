//! Per-type stacks of unmatched open brackets.
//!
//! Each line owns a `BracketStack` holding the cumulative open stacks after
//! that line plus the brackets seen on the line itself. Stack entries refer
//! back to their open bracket by `(line, slot)` so that shifting one line's
//! columns never leaves another line holding a stale copy that matters:
//! pairs are always resolved through the reference.

use crate::models::{BracketToken, MatchedBracketPair};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Location of a bracket: its line and its index among that line's brackets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BracketRef {
    pub line: usize,
    pub slot: usize,
}

/// A bracket seen on the current line; closes remember the open they popped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketEvent {
    pub token: BracketToken,
    pub partner: Option<BracketRef>,
}

/// Digest of the ordered `(type_id, is_open)` sequence of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Fingerprint(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
struct OpenEntry {
    at: BracketRef,
    token: BracketToken,
}

#[derive(Debug, Clone, Default)]
pub struct BracketStack {
    /// Indexed by type id
    stacks: Vec<Vec<OpenEntry>>,
    line: usize,
    events: Vec<BracketEvent>,
}

impl BracketStack {
    pub fn new(line: usize) -> Self {
        Self {
            stacks: Vec::new(),
            line,
            events: Vec::new(),
        }
    }

    /// Independent copy of the open stacks, positioned on `next_line` with no brackets of its own.
    pub fn snapshot(&self, next_line: usize) -> Self {
        Self {
            stacks: self.stacks.clone(),
            line: next_line,
            events: Vec::new(),
        }
    }

    pub fn push_open(&mut self, token: BracketToken) {
        let at = BracketRef {
            line: self.line,
            slot: self.events.len(),
        };
        let type_index = usize::from(token.type_id);
        if self.stacks.len() <= type_index {
            self.stacks.resize_with(type_index + 1, Vec::new);
        }
        self.stacks[type_index].push(OpenEntry { at, token });
        self.events.push(BracketEvent {
            token,
            partner: None,
        });
    }

    /// Pop the top open of the same type; unmatched closes are recorded without a partner.
    pub fn push_close(&mut self, token: BracketToken) -> Option<MatchedBracketPair> {
        let popped = self
            .stacks
            .get_mut(usize::from(token.type_id))
            .and_then(|stack| stack.pop());

        self.events.push(BracketEvent {
            token,
            partner: popped.as_ref().map(|entry| entry.at),
        });

        popped.map(|entry| MatchedBracketPair {
            open: entry.token,
            close: token,
        })
    }

    /// Shift columns of this line's brackets at or after `from_column`.
    pub fn offset(&mut self, from_column: usize, delta: isize) {
        for event in &mut self.events {
            if event.token.column >= from_column {
                event.token.column = event.token.column.saturating_add_signed(delta);
            }
        }
        let line = self.line;
        for entry in self.stacks.iter_mut().flatten() {
            if entry.at.line == line && entry.token.column >= from_column {
                entry.token.column = entry.token.column.saturating_add_signed(delta);
            }
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = DefaultHasher::new();
        self.events.len().hash(&mut hasher);
        for event in &self.events {
            event.token.type_id.hash(&mut hasher);
            event.token.is_open.hash(&mut hasher);
        }
        Fingerprint(hasher.finish())
    }

    /// Brackets pushed on this line, in order.
    pub fn events(&self) -> &[BracketEvent] {
        &self.events
    }

    pub(crate) fn events_mut(&mut self) -> &mut [BracketEvent] {
        &mut self.events
    }
}
