use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::document::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TabId(pub u64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persistence state of a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TabState {
    /// No file path yet
    UnboundUnsaved,
    /// Bound to a file whose content matches
    BoundClean,
    /// Bound to a file whose content differs
    BoundDirty,
}

/// Read-only snapshot of a tab for rendering a tab strip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabInfo {
    pub id: TabId,
    pub title: String,
    pub path: Option<PathBuf>,
    pub active: bool,
}

/// One open document. The stored document is a snapshot; while the tab is
/// active the live content is on the edit surface.
#[derive(Debug, Clone)]
pub struct Tab {
    pub(crate) id: TabId,
    pub(crate) title: String,
    pub(crate) path: Option<PathBuf>,
    pub(crate) document: Document,
}

impl Tab {
    pub(crate) fn blank(id: TabId, title: String) -> Self {
        Self {
            id,
            title,
            path: None,
            document: Document::from_text(""),
        }
    }

    #[inline]
    pub fn id(&self) -> TabId {
        self.id
    }

    #[inline]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[inline]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The stored snapshot.
    #[inline]
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn is_bound(&self) -> bool {
        self.path.is_some()
    }

    /// Unbound with no visible text; `bind_loaded` may reuse it.
    pub(crate) fn is_pristine(&self) -> bool {
        self.path.is_none() && self.document.is_blank()
    }

    /// Bind to `path`, taking the title from its file name.
    pub(crate) fn bind(&mut self, path: &Path) {
        self.title = title_for(path);
        self.path = Some(path.to_path_buf());
    }

    pub(crate) fn info(&self, active: TabId) -> TabInfo {
        TabInfo {
            id: self.id,
            title: self.title.clone(),
            path: self.path.clone(),
            active: self.id == active,
        }
    }
}

pub(crate) fn title_for(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
