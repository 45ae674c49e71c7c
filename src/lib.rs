// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowforge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowforge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Flowforge: flow graph editing with groups, derived visibility and undo/redo.
//!
//! Operations ([`ops`]) turn one [`model::Flow`] into the next; [`visibility`] derives what a
//! renderer should show; [`history`] keeps the undo log; [`engine::FlowEngine`] ties them to a
//! [`store::FlowStore`] in batches. [`mcp`] exposes the engine to agents.

pub mod config;
pub mod engine;
pub mod history;
pub mod layout;
pub mod mcp;
pub mod model;
pub mod ops;
pub mod query;
pub mod store;
pub mod visibility;
