use std::path::PathBuf;

use super::TabInfo;

/// Answer to "save changes before closing?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveChoice {
    Save,
    DontSave,
    Cancel,
}

/// User decisions the manager needs while closing or saving.
pub trait ClosePrompt {
    /// Asked only for dirty tabs.
    fn confirm_close(&mut self, tab: &TabInfo) -> SaveChoice;

    /// Destination for a tab without a path; `None` cancels the save.
    fn pick_save_path(&mut self, tab: &TabInfo) -> Option<PathBuf>;
}
