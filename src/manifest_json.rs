//! `icons.json`: the icon part of a browser extension `manifest.json`
//!
//! The generated fragment is meant to be pasted into (or merged with) the
//! extension manifest. It lists every icon that was written, keyed by size,
//! with paths relative to the extension root.

use crate::error::RenderError;
use crate::icon_gen::BatchReport;
use serde::Serialize;
use std::{collections::BTreeMap, path::Path};
use tracing::info;

pub const MANIFEST_FILE: &str = "icons.json";

/// Root of the fragment.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct IconManifest {
    /// Size in pixels to icon path. Serialized with string keys, in numeric order.
    pub icons: BTreeMap<u32, String>,

    /// Toolbar icon set, same files as `icons`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub default_icon: BTreeMap<u32, String>,
}

impl IconManifest {
    pub fn new() -> Self {
        Self {
            icons: BTreeMap::new(),
            action: None,
        }
    }

    pub fn add_icon(&mut self, size: u32, path: String) {
        self.icons.insert(size, path);
    }

    /// Mirror `icons` into `action.default_icon`.
    pub fn with_action(mut self) -> Self {
        self.action = Some(Action {
            default_icon: self.icons.clone(),
        });
        self
    }

    /// Manifest listing the icons of `report` that were actually written.
    /// Paths are relative to the parent of `out_dir`.
    pub fn from_report(report: &BatchReport, out_dir: &Path) -> Self {
        let dir_name = out_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());

        let mut manifest = Self::new();
        for icon in report.written() {
            let Some(file_name) = icon.path.file_name() else {
                continue;
            };
            let file_name = file_name.to_string_lossy();
            let path = match &dir_name {
                Some(dir) => format!("{dir}/{file_name}"),
                None => file_name.into_owned(),
            };
            manifest.add_icon(icon.size, path);
        }
        manifest.with_action()
    }
}

impl Default for IconManifest {
    fn default() -> Self {
        Self::new()
    }
}

pub fn write_manifest(dir: &Path, manifest: &IconManifest) -> Result<(), RenderError> {
    let json = serde_json::to_string_pretty(manifest)?;
    let path = dir.join(MANIFEST_FILE);
    std::fs::write(&path, json).map_err(|err| RenderError::io(&path, err))?;

    info!("Created {}", path.display());
    Ok(())
}
