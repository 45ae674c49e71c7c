// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowforge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowforge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data model.
//!
//! A [`Flow`] is the graph document (nodes + edges). Group membership is expressed through
//! `parentGroupId` references from member nodes to `group`-kind nodes.

#[cfg(test)]
pub(crate) mod fixtures;
pub mod flow;
pub mod ids;

pub use flow::{Edge, Flow, Node, NodeKind, Position};
pub use ids::{EdgeId, FlowId, Id, IdError, NodeId};
