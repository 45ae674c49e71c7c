// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowforge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowforge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Runtime configuration shared by the CLI and the MCP server.

use std::path::{Path, PathBuf};

use crate::engine::FlowEngine;
use crate::history::DEFAULT_HISTORY_CAP;
use crate::mcp::SharedEngine;
use crate::model::{FlowId, IdError};
use crate::store::{FlowFolder, FlowStore, WriteDurability};

pub const DEFAULT_MCP_HTTP_PORT: u16 = 27435;
pub const DEFAULT_FLOW_ID: &str = "main";
pub const DEFAULT_FLOW_DIR: &str = ".flowforge";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    flow_dir: PathBuf,
    durability: WriteDurability,
    history_cap: usize,
    mcp_http_port: u16,
    default_flow_id: FlowId,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            flow_dir: PathBuf::from(DEFAULT_FLOW_DIR),
            durability: WriteDurability::BestEffort,
            history_cap: DEFAULT_HISTORY_CAP,
            mcp_http_port: DEFAULT_MCP_HTTP_PORT,
            default_flow_id: FlowId::new(DEFAULT_FLOW_ID).expect("valid default flow id"),
        }
    }
}

impl Config {
    pub fn with_flow_dir(mut self, flow_dir: impl Into<PathBuf>) -> Self {
        self.flow_dir = flow_dir.into();
        self
    }

    pub fn with_durable_writes(mut self, durable: bool) -> Self {
        self.durability =
            if durable { WriteDurability::Durable } else { WriteDurability::BestEffort };
        self
    }

    /// Zero is raised to one; a history always holds the current snapshot.
    pub fn with_history_cap(mut self, history_cap: usize) -> Self {
        self.history_cap = history_cap.max(1);
        self
    }

    pub fn with_mcp_http_port(mut self, port: u16) -> Self {
        self.mcp_http_port = port;
        self
    }

    pub fn with_default_flow_id(mut self, flow_id: &str) -> Result<Self, IdError> {
        self.default_flow_id = FlowId::new(flow_id)?;
        Ok(self)
    }

    pub fn flow_dir(&self) -> &Path {
        &self.flow_dir
    }

    pub fn durability(&self) -> WriteDurability {
        self.durability
    }

    pub fn history_cap(&self) -> usize {
        self.history_cap
    }

    pub fn mcp_http_port(&self) -> u16 {
        self.mcp_http_port
    }

    pub fn default_flow_id(&self) -> &FlowId {
        &self.default_flow_id
    }

    pub fn flow_folder(&self) -> FlowFolder {
        FlowFolder::new(&self.flow_dir).with_durability(self.durability)
    }

    /// An engine over the configured flow folder.
    pub fn open_engine(&self) -> SharedEngine {
        let store: Box<dyn FlowStore + Send> = Box::new(self.flow_folder());
        FlowEngine::new(store).with_history_cap(self.history_cap)
    }
}
