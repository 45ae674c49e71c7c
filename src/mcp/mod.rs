// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowforge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowforge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Model Context Protocol (MCP) server surface.
//!
//! Agents read flows and submit operation batches through these tools; every batch goes through
//! the shared [`FlowEngine`](crate::engine::FlowEngine).

mod server;
mod types;

pub use server::{FlowforgeMcp, SharedEngine};
