// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowforge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowforge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Batch orchestration: store read, sequential op application, commit, history.
//!
//! A batch reads the persisted flow once, applies every operation in order (a failing operation
//! is reported and skipped, later operations still run against the last good flow), and, if the
//! result differs from what was read, writes it back once and pushes exactly one snapshot.
//! Undo/redo restore a snapshot through the store without pushing.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::history::{History, HistoryStatus, Origin, DEFAULT_HISTORY_CAP};
use crate::layout::{LayeredLayout, LayoutEngine};
use crate::model::{Flow, FlowId};
use crate::ops::{execute, execute_tool_call, Op, OpOutcome, ToolCall};
use crate::store::{FlowStore, StoreError};
use crate::visibility::visible_flow;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of one batch.
///
/// Per-operation outcomes do not repeat the intermediate flows; the final flow is in `flow`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub outcomes: Vec<OpOutcome>,
    /// Whether the batch changed the flow (and therefore wrote it and pushed a snapshot).
    pub committed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_seq: Option<u64>,
    pub flow: Flow,
    pub status: HistoryStatus,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.success).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Result of an undo/redo request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Restore {
    /// `false` when there was nothing to undo/redo; `flow` is then the unchanged current flow.
    pub restored: bool,
    pub flow: Flow,
    pub status: HistoryStatus,
}

pub struct FlowEngine<S> {
    store: S,
    layout: Box<dyn LayoutEngine + Send + Sync>,
    histories: BTreeMap<FlowId, History>,
    history_cap: usize,
}

impl<S: FlowStore> FlowEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            layout: Box::new(LayeredLayout::default()),
            histories: BTreeMap::new(),
            history_cap: DEFAULT_HISTORY_CAP,
        }
    }

    pub fn with_layout(mut self, layout: impl LayoutEngine + Send + Sync + 'static) -> Self {
        self.layout = Box::new(layout);
        self
    }

    /// Cap for histories created from now on.
    pub fn with_history_cap(mut self, cap: usize) -> Self {
        self.history_cap = cap.max(1);
        self
    }

    pub fn history_cap(&self) -> usize {
        self.history_cap
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn flow_ids(&self) -> Result<Vec<FlowId>, EngineError> {
        Ok(self.store.flow_ids()?)
    }

    /// The persisted flow, as stored (no derived visibility).
    pub fn read_flow(&self, flow_id: &FlowId) -> Result<Flow, EngineError> {
        Ok(self.store.read(flow_id)?)
    }

    /// The persisted flow with group/collapse visibility derived, ready for rendering.
    pub fn read_visible(&self, flow_id: &FlowId) -> Result<Flow, EngineError> {
        Ok(visible_flow(&self.store.read(flow_id)?))
    }

    pub fn run_batch(
        &mut self,
        flow_id: &FlowId,
        origin: Origin,
        ops: &[Op],
    ) -> Result<BatchReport, EngineError> {
        self.run(flow_id, origin, ops, |flow, op, layout| execute(flow, op, layout))
    }

    pub fn run_tool_calls(
        &mut self,
        flow_id: &FlowId,
        origin: Origin,
        calls: &[ToolCall],
    ) -> Result<BatchReport, EngineError> {
        self.run(flow_id, origin, calls, |flow, call, layout| execute_tool_call(flow, call, layout))
    }

    fn run<T>(
        &mut self,
        flow_id: &FlowId,
        origin: Origin,
        items: &[T],
        exec: impl Fn(&Flow, &T, &dyn LayoutEngine) -> OpOutcome,
    ) -> Result<BatchReport, EngineError> {
        let original = self.store.read(flow_id)?;
        seed_history(&mut self.histories, self.history_cap, flow_id, &original);

        let mut working = original.clone();
        let mut outcomes = Vec::with_capacity(items.len());
        for item in items {
            let mut outcome = exec(&working, item, self.layout.as_ref());
            if let Some(next) = outcome.updated_flow.take() {
                working = next;
            }
            outcomes.push(outcome);
        }

        let committed = working != original;
        let mut snapshot_seq = None;
        if committed {
            self.store.write(flow_id, &working)?;
            let history = seed_history(&mut self.histories, self.history_cap, flow_id, &original);
            let seq = history.push(&working, origin).seq();
            snapshot_seq = Some(seq);
            tracing::info!(
                flow_id = %flow_id,
                %origin,
                seq,
                ops = items.len(),
                failed = outcomes.iter().filter(|outcome| !outcome.success).count(),
                "batch committed"
            );
        } else {
            tracing::debug!(flow_id = %flow_id, %origin, ops = items.len(), "batch changed nothing");
        }

        let status = self.histories.get(flow_id).map(History::status).unwrap_or_default();
        Ok(BatchReport { outcomes, committed, snapshot_seq, flow: working, status })
    }

    pub fn undo(&mut self, flow_id: &FlowId) -> Result<Restore, EngineError> {
        self.restore(flow_id, History::undo, History::redo)
    }

    pub fn redo(&mut self, flow_id: &FlowId) -> Result<Restore, EngineError> {
        self.restore(flow_id, History::redo, History::undo)
    }

    /// Moves the cursor with `step` and writes the restored flow. If the write fails the cursor
    /// is moved back with `revert`.
    fn restore(
        &mut self,
        flow_id: &FlowId,
        step: fn(&mut History) -> Option<Flow>,
        revert: fn(&mut History) -> Option<Flow>,
    ) -> Result<Restore, EngineError> {
        let current = self.store.read(flow_id)?;
        let history = seed_history(&mut self.histories, self.history_cap, flow_id, &current);

        let Some(flow) = step(history) else {
            return Ok(Restore { restored: false, flow: current, status: history.status() });
        };
        if let Err(err) = self.store.write(flow_id, &flow) {
            let _ = revert(history);
            tracing::warn!(flow_id = %flow_id, error = %err, "history restore not persisted");
            return Err(err.into());
        }

        let status = history.status();
        tracing::info!(flow_id = %flow_id, seq = ?status.current_seq, "history restored");
        Ok(Restore { restored: true, flow, status })
    }

    pub fn status(&mut self, flow_id: &FlowId) -> Result<HistoryStatus, EngineError> {
        Ok(self.history(flow_id)?.status())
    }

    /// The history of `flow_id`, seeding it from the store on first use.
    pub fn history(&mut self, flow_id: &FlowId) -> Result<&History, EngineError> {
        if !self.histories.contains_key(flow_id) {
            let current = self.store.read(flow_id)?;
            seed_history(&mut self.histories, self.history_cap, flow_id, &current);
        }
        Ok(self.histories.get(flow_id).expect("history seeded above"))
    }

    /// Drops every snapshot of `flow_id` and re-seeds with the persisted flow.
    pub fn reset_history(&mut self, flow_id: &FlowId) -> Result<HistoryStatus, EngineError> {
        let current = self.store.read(flow_id)?;
        let history = seed_history(&mut self.histories, self.history_cap, flow_id, &current);
        history.reset(&current, Origin::Seed);
        tracing::info!(flow_id = %flow_id, "history reset");
        Ok(history.status())
    }
}

fn seed_history<'a>(
    histories: &'a mut BTreeMap<FlowId, History>,
    cap: usize,
    flow_id: &FlowId,
    flow: &Flow,
) -> &'a mut History {
    histories.entry(flow_id.clone()).or_insert_with(|| {
        let mut history = History::with_cap(cap);
        history.push(flow, Origin::Seed);
        tracing::debug!(flow_id = %flow_id, "history seeded");
        history
    })
}
