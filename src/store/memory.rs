// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowforge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowforge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;

use super::{FlowStore, StoreError};
use crate::model::{Flow, FlowId};

/// In-process store. Also counts writes, which tests use to check commit behaviour.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    flows: BTreeMap<FlowId, Flow>,
    write_count: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flow(mut self, flow_id: FlowId, flow: Flow) -> Self {
        self.flows.insert(flow_id, flow);
        self
    }

    pub fn write_count(&self) -> usize {
        self.write_count
    }
}

impl FlowStore for MemoryStore {
    fn read(&self, flow_id: &FlowId) -> Result<Flow, StoreError> {
        Ok(self.flows.get(flow_id).cloned().unwrap_or_default())
    }

    fn write(&mut self, flow_id: &FlowId, flow: &Flow) -> Result<(), StoreError> {
        self.flows.insert(flow_id.clone(), flow.clone());
        self.write_count += 1;
        Ok(())
    }

    fn flow_ids(&self) -> Result<Vec<FlowId>, StoreError> {
        Ok(self.flows.keys().cloned().collect())
    }
}
