// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowforge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowforge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Read-only traversals over flows.
//!
//! Two descendant models coexist: edge-based (directed reachability) and group-based
//! (`parentGroupId` containment). Both are cycle-safe and never mutate the flow.

pub mod descendants;

pub use descendants::{edge_descendants, group_ancestors, group_descendants, GroupChain};
