//! Tab/document lifecycle.
//!
//! [`TabManager`] owns the open tabs and the [`EditSurface`] bound to the
//! active one. Every tab holds its own [`Document`] snapshot; the active
//! tab's snapshot is refreshed from the surface before a switch, close,
//! save or dirty check, and the incoming tab's snapshot is written to the
//! surface on activation. There is always at least one tab.
//!
//! Dirty state is not tracked incrementally. An unbound tab is dirty when
//! its text is not blank; a bound tab is dirty when its text differs from
//! the file on disk, trailing whitespace ignored. The file is read again on
//! every check.

mod prompt;
mod surface;
mod tab;

use std::path::{Path, PathBuf};

pub use prompt::{ClosePrompt, SaveChoice};
pub use surface::{BufferSurface, EditSurface};
pub use tab::{Tab, TabId, TabInfo, TabState};

use crate::codec::Codecs;
use crate::common::{Error, Result};
use crate::config::EditorOptions;
use crate::document::{Block, Document, Table};
use crate::layout::{AverageWidthMeasurer, TableLayout};

/// Result of [`TabManager::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(PathBuf),
    /// No destination was picked
    Cancelled,
}

/// Result of [`TabManager::close_tab`] and the bulk close operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    Cancelled,
}

pub struct TabManager<S: EditSurface = BufferSurface> {
    tabs: Vec<Tab>,
    active: TabId,
    next_id: u64,
    surface: S,
    codecs: Codecs,
    options: EditorOptions,
}

impl TabManager<BufferSurface> {
    /// Headless manager over an in-memory surface.
    pub fn headless() -> Self {
        Self::new(BufferSurface::new())
    }
}

impl<S: EditSurface> TabManager<S> {
    pub fn new(surface: S) -> Self {
        Self::with_options(surface, EditorOptions::default())
    }

    /// Codecs lay out tables with `options.layout` and the default measurer.
    pub fn with_options(surface: S, options: EditorOptions) -> Self {
        let layout = TableLayout::new(options.layout.clone(), AverageWidthMeasurer::default());
        Self::with_codecs(surface, options, Codecs::new(layout))
    }

    pub fn with_codecs(surface: S, options: EditorOptions, codecs: Codecs) -> Self {
        let mut manager = Self {
            tabs: Vec::new(),
            active: TabId(0),
            next_id: 1,
            surface,
            codecs,
            options,
        };
        manager.create_blank(None);
        manager
    }

    fn next_tab_id(&mut self) -> TabId {
        let id = TabId(self.next_id);
        self.next_id += 1;
        id
    }

    #[inline]
    pub fn codecs(&self) -> &Codecs {
        &self.codecs
    }

    #[inline]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// The live surface; edits land in the active tab on the next flush.
    #[inline]
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    #[inline]
    pub fn active_id(&self) -> TabId {
        self.active
    }

    pub fn count(&self) -> usize {
        self.tabs.len()
    }

    pub fn tabs(&self) -> Vec<TabInfo> {
        self.tabs.iter().map(|t| t.info(self.active)).collect()
    }

    pub fn tab(&self, id: TabId) -> Result<&Tab> {
        self.tabs
            .iter()
            .find(|t| t.id == id)
            .ok_or(Error::TabNotFound(id))
    }

    fn tab_mut(&mut self, id: TabId) -> Result<&mut Tab> {
        self.tabs
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(Error::TabNotFound(id))
    }

    fn position(&self, id: TabId) -> Result<usize> {
        self.tabs
            .iter()
            .position(|t| t.id == id)
            .ok_or(Error::TabNotFound(id))
    }

    /// Current content of a tab, flushing first if it is active.
    pub fn document(&mut self, id: TabId) -> Result<&Document> {
        if id == self.active {
            self.flush_active_edits();
        }
        Ok(&self.tab(id)?.document)
    }

    pub fn find_by_path(&self, path: &Path) -> Option<TabId> {
        self.tabs
            .iter()
            .find(|t| t.path.as_deref() == Some(path))
            .map(|t| t.id)
    }

    /// First of `base`, `base 2`, `base 3`, ... not used by an open tab.
    fn unique_title(&self, base: &str) -> String {
        let taken = |title: &str| self.tabs.iter().any(|t| t.title == title);
        if !taken(base) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{base} {n}"))
            .find(|title| !taken(title))
            .unwrap_or_else(|| base.to_string())
    }

    /// Open a new blank tab and make it active.
    pub fn create_blank(&mut self, title: Option<&str>) -> TabId {
        let base = title.unwrap_or(&self.options.untitled_title).to_string();
        let title = self.unique_title(&base);
        let id = self.next_tab_id();
        log::debug!("creating tab {id} \"{title}\"");
        self.tabs.push(Tab::blank(id, title));
        self.activate(id);
        id
    }

    /// Copy the surface content into the active tab's snapshot.
    pub fn flush_active_edits(&mut self) {
        let document = self.surface.read_document();
        if let Ok(tab) = self.tab_mut(self.active) {
            tab.document = document;
        }
    }

    fn activate(&mut self, id: TabId) {
        if id == self.active {
            return;
        }
        self.flush_active_edits();
        self.active = id;
        if let Ok(tab) = self.tab(id) {
            let document = tab.document.clone();
            self.surface.write_document(document);
        }
    }

    pub fn set_active(&mut self, id: TabId) -> Result<()> {
        self.position(id)?;
        self.activate(id);
        Ok(())
    }

    /// Activate the tab after the active one, wrapping around.
    pub fn next_tab(&mut self) -> TabId {
        if let Ok(idx) = self.position(self.active) {
            let id = self.tabs[(idx + 1) % self.tabs.len()].id;
            self.activate(id);
        }
        self.active
    }

    /// Activate the tab before the active one, wrapping around.
    pub fn previous_tab(&mut self) -> TabId {
        if let Ok(idx) = self.position(self.active) {
            let prev = if idx == 0 { self.tabs.len() - 1 } else { idx - 1 };
            let id = self.tabs[prev].id;
            self.activate(id);
        }
        self.active
    }

    /// Bind a loaded document to a tab and activate it.
    ///
    /// Reuses the tab already bound to `path`, else the active tab when it is
    /// an untouched blank, else opens a new tab.
    pub fn bind_loaded(&mut self, path: impl AsRef<Path>, document: Document) -> TabId {
        let path = path.as_ref();
        self.flush_active_edits();

        let reusable = self
            .tab(self.active)
            .is_ok_and(Tab::is_pristine)
            .then_some(self.active);
        let id = match self.find_by_path(path).or(reusable) {
            Some(id) => id,
            None => self.create_blank(None),
        };

        if let Ok(tab) = self.tab_mut(id) {
            tab.bind(path);
            tab.document = document;
            log::debug!("bound tab {id} to {}", path.display());
        }

        if id == self.active {
            if let Ok(tab) = self.tab(id) {
                let document = tab.document.clone();
                self.surface.write_document(document);
            }
        } else {
            self.activate(id);
        }
        id
    }

    /// Load `path` and bind it to a tab.
    ///
    /// # Errors
    ///
    /// [`Error::LoadFailure`]; no tab is touched.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<TabId> {
        let path = path.as_ref();
        let document = self.codecs.load(path)?;
        Ok(self.bind_loaded(path, document))
    }

    /// Whether the tab's content differs from its saved state.
    ///
    /// A bound file that cannot be read or decoded reports not dirty.
    pub fn is_dirty(&mut self, id: TabId) -> Result<bool> {
        if id == self.active {
            self.flush_active_edits();
        }
        let tab = self.tab(id)?;
        let text = tab.document.plain_text();

        let Some(path) = &tab.path else {
            return Ok(!text.trim().is_empty());
        };

        match self.codecs.load(path) {
            Ok(disk) => Ok(text.trim_end() != disk.plain_text().trim_end()),
            Err(err) if err.is_io() => {
                let err = Error::ResourceUnavailable {
                    path: path.clone(),
                    source: Box::new(err),
                };
                log::warn!("{err}; treating tab {id} as clean");
                Ok(false)
            },
            Err(err) => {
                log::warn!("{err}; bound file no longer decodes, treating tab {id} as clean");
                Ok(false)
            },
        }
    }

    pub fn state(&mut self, id: TabId) -> Result<TabState> {
        if !self.tab(id)?.is_bound() {
            return Ok(TabState::UnboundUnsaved);
        }
        Ok(if self.is_dirty(id)? {
            TabState::BoundDirty
        } else {
            TabState::BoundClean
        })
    }

    /// Save a tab to its path, asking for one if it has none.
    ///
    /// # Errors
    ///
    /// [`Error::SaveFailure`]; the tab keeps its path and title.
    pub fn save(&mut self, id: TabId, prompt: &mut dyn ClosePrompt) -> Result<SaveOutcome> {
        let tab = self.tab(id)?;
        let path = match &tab.path {
            Some(path) => path.clone(),
            None => match prompt.pick_save_path(&tab.info(self.active)) {
                Some(path) => path,
                None => return Ok(SaveOutcome::Cancelled),
            },
        };
        self.save_as(id, &path)?;
        Ok(SaveOutcome::Saved(path))
    }

    /// Save a tab to `path` (format by extension) and bind it there.
    pub fn save_as(&mut self, id: TabId, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if id == self.active {
            self.flush_active_edits();
        }
        let tab = self.tab(id)?;
        self.codecs.save(&tab.document, path)?;
        self.tab_mut(id)?.bind(path);
        Ok(())
    }

    /// Close a tab, negotiating unsaved changes through `prompt`.
    ///
    /// # Errors
    ///
    /// A failed save aborts the close and is returned; the tab stays open.
    pub fn close_tab(&mut self, id: TabId, prompt: &mut dyn ClosePrompt) -> Result<CloseOutcome> {
        if self.is_dirty(id)? {
            let info = self.tab(id)?.info(self.active);
            match prompt.confirm_close(&info) {
                SaveChoice::Cancel => return Ok(CloseOutcome::Cancelled),
                SaveChoice::DontSave => {},
                SaveChoice::Save => {
                    if self.save(id, prompt)? == SaveOutcome::Cancelled {
                        return Ok(CloseOutcome::Cancelled);
                    }
                },
            }
        }

        let idx = self.position(id)?;
        self.tabs.remove(idx);
        log::debug!("closed tab {id}");

        if self.tabs.is_empty() {
            self.create_blank(None);
        } else if id == self.active {
            // The removed tab's content is gone; write the neighbour without flushing.
            let neighbour = &self.tabs[idx.min(self.tabs.len() - 1)];
            self.active = neighbour.id;
            let document = neighbour.document.clone();
            self.surface.write_document(document);
        }
        Ok(CloseOutcome::Closed)
    }

    /// Close every tab except `keep`, stopping at the first cancel.
    pub fn close_others(&mut self, keep: TabId, prompt: &mut dyn ClosePrompt) -> Result<CloseOutcome> {
        self.position(keep)?;
        let ids: Vec<TabId> = self.tabs.iter().map(|t| t.id).filter(|id| *id != keep).collect();
        self.close_each(ids, prompt)
    }

    /// Close every tab, stopping at the first cancel. A fresh blank tab
    /// remains afterwards.
    pub fn close_all(&mut self, prompt: &mut dyn ClosePrompt) -> Result<CloseOutcome> {
        let ids: Vec<TabId> = self.tabs.iter().map(|t| t.id).collect();
        self.close_each(ids, prompt)
    }

    fn close_each(&mut self, ids: Vec<TabId>, prompt: &mut dyn ClosePrompt) -> Result<CloseOutcome> {
        for id in ids {
            if self.close_tab(id, prompt)? == CloseOutcome::Cancelled {
                return Ok(CloseOutcome::Cancelled);
            }
        }
        Ok(CloseOutcome::Closed)
    }

    /// Append a blank `rows` x `columns` table, laid out, to the active
    /// document.
    pub fn insert_table(&mut self, rows: usize, columns: usize) {
        let mut table = Table::with_size(rows, columns);
        self.codecs.layout().apply(&mut table);

        let mut document = self.surface.read_document();
        document.push(Block::Table(table));
        self.surface.write_document(document);
        self.flush_active_edits();
    }
}
