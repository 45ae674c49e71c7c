// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowforge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowforge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fs;
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use super::{FlowStore, StoreError};
use crate::model::{Flow, FlowId};

const FLOW_FILE_EXTENSION: &str = "json";
const TEMP_FILE_PREFIX: &str = ".flowforge.tmp.";

/// One JSON file per flow id under a root directory.
///
/// Writes go through a temp file and an atomic rename, so readers never observe a partially
/// written flow.
#[derive(Debug, Clone)]
pub struct FlowFolder {
    root: PathBuf,
    durability: WriteDurability,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WriteDurability {
    /// Temp file + rename, without fsync.
    #[default]
    BestEffort,

    /// Additionally syncs the file contents and the parent directory entry.
    ///
    /// Exact guarantees are platform/filesystem-dependent.
    Durable,
}

impl FlowFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), durability: WriteDurability::default() }
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }

    pub fn durability(&self) -> WriteDurability {
        self.durability
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn flow_path(&self, flow_id: &FlowId) -> PathBuf {
        self.root.join(format!("{}.{FLOW_FILE_EXTENSION}", encode_file_stem(flow_id.as_str())))
    }
}

impl FlowStore for FlowFolder {
    fn read(&self, flow_id: &FlowId) -> Result<Flow, StoreError> {
        let path = self.flow_path(flow_id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(flow_id = %flow_id, "flow file missing; starting empty");
                return Ok(Flow::default());
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        serde_json::from_slice(&bytes).map_err(|source| StoreError::Json { path, source })
    }

    fn write(&mut self, flow_id: &FlowId, flow: &Flow) -> Result<(), StoreError> {
        let path = self.flow_path(flow_id);
        let mut contents = serde_json::to_vec_pretty(flow)
            .map_err(|source| StoreError::Json { path: path.clone(), source })?;
        contents.push(b'\n');

        fs::create_dir_all(&self.root)
            .map_err(|source| StoreError::Io { path: self.root.clone(), source })?;
        write_atomic(&path, &contents, self.durability)?;

        tracing::debug!(
            flow_id = %flow_id,
            nodes = flow.nodes().len(),
            edges = flow.edges().len(),
            "flow written"
        );
        Ok(())
    }

    fn flow_ids(&self) -> Result<Vec<FlowId>, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Io { path: self.root.clone(), source }),
        };

        let mut flow_ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io { path: self.root.clone(), source })?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(FLOW_FILE_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if stem.starts_with('.') {
                continue;
            }
            let value = decode_file_stem(stem);
            let flow_id = FlowId::new(value.clone())
                .map_err(|source| StoreError::InvalidId { value, source })?;
            flow_ids.push(flow_id);
        }

        flow_ids.sort();
        Ok(flow_ids)
    }
}

/// Flow ids are free-form; anything that is not a plain portable file stem is hex-encoded
/// behind a `~` prefix.
fn encode_file_stem(flow_id: &str) -> String {
    if !needs_file_stem_encoding(flow_id) {
        return flow_id.to_owned();
    }

    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(1 + flow_id.len().saturating_mul(2));
    out.push('~');
    for &b in flow_id.as_bytes() {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0f) as usize] as char);
    }
    out
}

fn decode_file_stem(stem: &str) -> String {
    let Some(hex) = stem.strip_prefix('~') else {
        return stem.to_owned();
    };
    if !hex.is_ascii() || hex.len() % 2 != 0 {
        return stem.to_owned();
    }

    let bytes = (0..hex.len())
        .step_by(2)
        .map(|idx| u8::from_str_radix(&hex[idx..idx + 2], 16))
        .collect::<Result<Vec<_>, _>>();
    match bytes.ok().and_then(|bytes| String::from_utf8(bytes).ok()) {
        Some(decoded) => decoded,
        None => stem.to_owned(),
    }
}

fn needs_file_stem_encoding(flow_id: &str) -> bool {
    if flow_id.starts_with(['~', '.']) || flow_id.ends_with([' ', '.']) {
        return true;
    }
    flow_id.chars().any(|ch| {
        matches!(ch, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') || ch.is_control()
    })
}

fn rename_overwrite(from: &Path, to: &Path) -> io::Result<()> {
    #[cfg(windows)]
    {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::AlreadyExists | io::ErrorKind::PermissionDenied
                ) =>
            {
                let _ = fs::remove_file(to);
                fs::rename(from, to)
            }
            Err(err) => Err(err),
        }
    }

    #[cfg(not(windows))]
    {
        fs::rename(from, to)
    }
}

fn io_err(path: &Path, source: io::Error) -> StoreError {
    StoreError::Io { path: path.to_path_buf(), source }
}

fn write_atomic(path: &Path, contents: &[u8], durability: WriteDurability) -> Result<(), StoreError> {
    let (Some(parent), Some(file_name)) = (path.parent(), path.file_name()) else {
        return Err(io_err(path, io::Error::other("path has no parent or file name")));
    };

    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
    let tmp_path =
        parent.join(format!("{TEMP_FILE_PREFIX}{}.{nanos}", file_name.to_string_lossy()));

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp_path)
        .map_err(|source| io_err(&tmp_path, source))?;

    if let Err(source) = file.write_all(contents) {
        drop(file);
        let _ = fs::remove_file(&tmp_path);
        return Err(io_err(&tmp_path, source));
    }
    if durability == WriteDurability::Durable {
        file.sync_all().map_err(|source| io_err(&tmp_path, source))?;
    }
    drop(file);

    if let Err(source) = rename_overwrite(&tmp_path, path) {
        tracing::warn!(path = %path.display(), error = %source, "atomic rename failed");
        let _ = fs::remove_file(&tmp_path);
        return Err(io_err(path, source));
    }

    if durability == WriteDurability::Durable {
        #[cfg(unix)]
        {
            let dir = fs::File::open(parent).map_err(|source| io_err(parent, source))?;
            dir.sync_all().map_err(|source| io_err(parent, source))?;
        }
    }

    Ok(())
}
