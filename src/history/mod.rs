// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowforge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowforge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Undo/redo log of whole-flow snapshots.
//!
//! The cursor is the `seq` of the current snapshot. Pushing after an undo truncates the redo
//! branch; pushing a flow equal to the current snapshot is a no-op. The log is capped and
//! evicts oldest-first.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Flow;

pub const DEFAULT_HISTORY_CAP: usize = 50;

/// Who produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    User,
    Agent,
    Seed,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::User => "user",
            Self::Agent => "agent",
            Self::Seed => "seed",
        };
        f.write_str(name)
    }
}

/// Canonical fingerprint of a flow.
///
/// Serialized through `serde_json::Value`, whose maps are key-sorted, so two flows that differ
/// only in JSON key order share a fingerprint.
pub fn fingerprint(flow: &Flow) -> String {
    serde_json::to_value(flow).expect("flow serializes to a JSON value").to_string()
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    seq: u64,
    created_at: DateTime<Utc>,
    origin: Origin,
    fingerprint: String,
    flow: Flow,
}

impl Snapshot {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn flow(&self) -> &Flow {
        &self.flow
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Pushed { seq: u64 },
    /// The flow matched the current snapshot; nothing was recorded.
    Deduplicated { seq: u64 },
}

impl PushOutcome {
    pub fn seq(&self) -> u64 {
        match self {
            Self::Pushed { seq } | Self::Deduplicated { seq } => *seq,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStatus {
    pub can_undo: bool,
    pub can_redo: bool,
    pub snapshot_count: usize,
    pub current_index: Option<usize>,
    pub current_seq: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct History {
    snapshots: VecDeque<Snapshot>,
    cursor: Option<u64>,
    next_seq: u64,
    cap: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_cap(DEFAULT_HISTORY_CAP)
    }
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// A history keeping at most `cap` snapshots (at least one).
    pub fn with_cap(cap: usize) -> Self {
        Self { snapshots: VecDeque::new(), cursor: None, next_seq: 1, cap: cap.max(1) }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn snapshots(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }

    fn cursor_index(&self) -> Option<usize> {
        let cursor = self.cursor?;
        self.snapshots.binary_search_by_key(&cursor, Snapshot::seq).ok()
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.cursor_index().map(|index| &self.snapshots[index])
    }

    pub fn push(&mut self, flow: &Flow, origin: Origin) -> PushOutcome {
        let fingerprint = fingerprint(flow);
        if let Some(current) = self.current() {
            if current.fingerprint == fingerprint {
                tracing::debug!(seq = current.seq, %origin, "history push deduplicated");
                return PushOutcome::Deduplicated { seq: current.seq };
            }
        }

        if let Some(index) = self.cursor_index() {
            self.snapshots.truncate(index + 1);
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.snapshots.push_back(Snapshot {
            seq,
            created_at: Utc::now(),
            origin,
            fingerprint,
            flow: flow.clone(),
        });
        self.cursor = Some(seq);

        while self.snapshots.len() > self.cap {
            self.snapshots.pop_front();
        }

        PushOutcome::Pushed { seq }
    }

    /// Steps back one snapshot and returns its flow, or `None` at the oldest snapshot.
    pub fn undo(&mut self) -> Option<Flow> {
        let index = self.cursor_index()?;
        let previous = self.snapshots.get(index.checked_sub(1)?)?;
        self.cursor = Some(previous.seq);
        Some(previous.flow.clone())
    }

    /// Steps forward one snapshot and returns its flow, or `None` at the newest snapshot.
    pub fn redo(&mut self) -> Option<Flow> {
        let index = self.cursor_index()?;
        let next = self.snapshots.get(index + 1)?;
        self.cursor = Some(next.seq);
        Some(next.flow.clone())
    }

    pub fn status(&self) -> HistoryStatus {
        let current_index = self.cursor_index();
        HistoryStatus {
            can_undo: current_index.is_some_and(|index| index > 0),
            can_redo: current_index.is_some_and(|index| index + 1 < self.snapshots.len()),
            snapshot_count: self.snapshots.len(),
            current_index,
            current_seq: self.cursor,
        }
    }

    /// Drops every snapshot and re-seeds the log with `flow`.
    pub fn reset(&mut self, flow: &Flow, origin: Origin) -> PushOutcome {
        self.snapshots.clear();
        self.cursor = None;
        self.push(flow, origin)
    }
}
