// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowforge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowforge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Whole-document persistence for flows.
//!
//! Stores are read-whole/replace-whole: no partial patches. Reading an unknown flow id yields an
//! empty flow, so a flow exists from its first access.

use std::io;
use std::path::PathBuf;

use crate::model::{Flow, FlowId, IdError};

pub mod flow_folder;
pub mod memory;

pub use flow_folder::{FlowFolder, WriteDurability};
pub use memory::MemoryStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error at {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid flow JSON in {}: {source}", path.display())]
    Json { path: PathBuf, source: serde_json::Error },
    #[error("invalid flow id {value:?}: {source}")]
    InvalidId { value: String, source: IdError },
}

pub trait FlowStore {
    /// Returns the stored flow, or an empty flow if `flow_id` was never written.
    fn read(&self, flow_id: &FlowId) -> Result<Flow, StoreError>;

    /// Replaces the stored flow.
    fn write(&mut self, flow_id: &FlowId, flow: &Flow) -> Result<(), StoreError>;

    /// Ids of every flow written so far, sorted.
    fn flow_ids(&self) -> Result<Vec<FlowId>, StoreError>;
}

impl<T: FlowStore + ?Sized> FlowStore for Box<T> {
    fn read(&self, flow_id: &FlowId) -> Result<Flow, StoreError> {
        (**self).read(flow_id)
    }

    fn write(&mut self, flow_id: &FlowId, flow: &Flow) -> Result<(), StoreError> {
        (**self).write(flow_id, flow)
    }

    fn flow_ids(&self) -> Result<Vec<FlowId>, StoreError> {
        (**self).flow_ids()
    }
}
