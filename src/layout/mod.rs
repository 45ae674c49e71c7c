// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowforge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowforge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Node positioning.
//!
//! Layout is a pure function of the nodes/edges handed in. Mutations never depend on it; only
//! `autoLayout` consults a [`LayoutEngine`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::{Edge, Node, NodeId, Position};

pub mod layered;

pub use layered::LayeredLayout;

/// Direction in which layers advance.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema,
)]
pub enum LayoutDirection {
    #[default]
    #[serde(rename = "TB")]
    TopBottom,
    #[serde(rename = "BT")]
    BottomTop,
    #[serde(rename = "LR")]
    LeftRight,
    #[serde(rename = "RL")]
    RightLeft,
}

impl LayoutDirection {
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::LeftRight | Self::RightLeft)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TopBottom => "TB",
            Self::BottomTop => "BT",
            Self::LeftRight => "LR",
            Self::RightLeft => "RL",
        }
    }
}

impl fmt::Display for LayoutDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutDirection {
    type Err = LayoutError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "TB" | "TD" => Ok(Self::TopBottom),
            "BT" => Ok(Self::BottomTop),
            "LR" => Ok(Self::LeftRight),
            "RL" => Ok(Self::RightLeft),
            _ => Err(LayoutError::UnknownDirection { value: value.to_owned() }),
        }
    }
}

/// Footprint assumed for every node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeDims {
    pub width: f64,
    pub height: f64,
}

impl Default for NodeDims {
    fn default() -> Self {
        Self { width: 172.0, height: 36.0 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodePosition {
    pub node_id: NodeId,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("edge {edge_id} references unknown node {node_id}")]
    UnknownNode { edge_id: String, node_id: String },
    #[error("node dimensions must be finite and positive (width={width}, height={height})")]
    InvalidDims { width: f64, height: f64 },
    #[error("unknown layout direction {value:?} (expected TB, BT, LR or RL)")]
    UnknownDirection { value: String },
}

/// Positions nodes. Implementations return one entry per input node.
pub trait LayoutEngine {
    fn layout(
        &self,
        nodes: &[Node],
        edges: &[Edge],
        direction: LayoutDirection,
        dims: NodeDims,
    ) -> Result<Vec<NodePosition>, LayoutError>;
}
