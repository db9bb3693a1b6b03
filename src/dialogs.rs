//src/dialogs.rs
//! Dialog state for front ends. One enum per screen instead of a handful of
//! independent `show_*` flags, so two dialogs can never be open at once.

/// Create/edit/delete dialog over records of type `T`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialog<T> {
    Closed,
    Creating,
    Editing(T),
    ConfirmingDelete(T),
}

impl<T> Default for Dialog<T> {
    fn default() -> Self {
        Self::Closed
    }
}

impl<T> Dialog<T> {
    pub const fn is_open(&self) -> bool {
        !matches!(self, Self::Closed)
    }

    /// Record the dialog is about, if any.
    pub const fn target(&self) -> Option<&T> {
        match self {
            Self::Editing(item) | Self::ConfirmingDelete(item) => Some(item),
            Self::Closed | Self::Creating => None,
        }
    }

    /// Closes the dialog, handing back what it was showing.
    pub fn close(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Resolves a delete confirmation. Returns the record to delete when the
    /// answer is yes; the dialog is closed either way.
    pub fn answer_delete(&mut self, answer: &str) -> Option<T> {
        match self.close() {
            Self::ConfirmingDelete(item) if is_yes(answer) => Some(item),
            _ => None,
        }
    }
}

/// Prompt shown over the workout runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunnerPrompt {
    #[default]
    None,
    ConfirmStop,
}

impl RunnerPrompt {
    pub const fn text(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::ConfirmStop => Some("Stop this workout? Progress is not saved. [y/N]"),
        }
    }
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_one_dialog_state_at_a_time() {
        let mut dialog: Dialog<String> = Dialog::Creating;
        assert!(dialog.is_open());
        assert_eq!(dialog.target(), None);
        dialog = Dialog::Editing("legs".into());
        assert_eq!(dialog.target().map(String::as_str), Some("legs"));
        assert_eq!(dialog.close(), Dialog::Editing("legs".into()));
        assert!(!dialog.is_open());
    }

    #[test]
    fn delete_needs_a_yes() {
        let mut dialog = Dialog::ConfirmingDelete(7);
        assert_eq!(dialog.answer_delete("n"), None);
        assert_eq!(dialog, Dialog::Closed);

        dialog = Dialog::ConfirmingDelete(7);
        assert_eq!(dialog.answer_delete(" YES\n"), Some(7));

        let mut editing = Dialog::Editing(3);
        assert_eq!(editing.answer_delete("y"), None);
    }
}
