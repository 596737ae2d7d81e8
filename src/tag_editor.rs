use crate::api::ArchiveApi;
use crate::records::ImageRecord;
use crate::ui::{EventSink, Notice, UiEvent};
use serde::Serialize;

pub const TAGS_UPDATED_TEXT: &str = "Tags updated successfully";
pub const TAGS_REJECTED_TEXT: &str = "Failed to update tags";
pub const TAGS_ERROR_TEXT: &str = "An error occurred while updating tags";

/// An open tag-edit modal: the image it edits and the text being typed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagEditSession {
    pub target_path: String,
    pub draft: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The server stored the new tags
    Saved,
    /// The server answered but refused the update
    Rejected,
    /// The request never produced a usable answer
    Failed(String),
}

impl SaveOutcome {
    pub fn notice(&self) -> Notice {
        match self {
            SaveOutcome::Saved => Notice::info(TAGS_UPDATED_TEXT),
            SaveOutcome::Rejected => Notice::error(TAGS_REJECTED_TEXT),
            SaveOutcome::Failed(_) => Notice::error(TAGS_ERROR_TEXT),
        }
    }

    /// Only a stored update is worth re-querying for
    pub fn should_refresh(&self) -> bool {
        matches!(self, SaveOutcome::Saved)
    }
}

/// Holds at most one open modal
#[derive(Debug, Default)]
pub struct TagEditor {
    open: Option<TagEditSession>,
}

impl TagEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&TagEditSession> {
        self.open.as_ref()
    }

    /// Open the modal for `record`, replacing any modal already open. The
    /// draft starts as the record's current tags.
    pub fn open(&mut self, record: &ImageRecord, sink: &dyn EventSink) {
        let session = TagEditSession {
            target_path: record.path.clone(),
            draft: record.tags.clone(),
        };
        if let Some(previous) = self.open.replace(session.clone()) {
            log::debug!("[Tags] Discarding open editor for {}", previous.target_path);
        }
        sink.emit(UiEvent::TagEditorOpened { session });
    }

    pub fn set_draft(&mut self, draft: impl Into<String>) -> bool {
        match self.open.as_mut() {
            Some(session) => {
                session.draft = draft.into();
                true
            }
            None => false,
        }
    }

    pub fn cancel(&mut self, sink: &dyn EventSink) -> bool {
        let closed = self.open.take().is_some();
        if closed {
            sink.emit(UiEvent::TagEditorClosed);
        }
        closed
    }

    /// Close the modal and send the draft as the full replacement tag string.
    /// The modal is gone before the request settles; the outcome is shown to
    /// the user either way. None if no modal was open.
    pub async fn save<A: ArchiveApi + ?Sized>(
        &mut self,
        api: &A,
        sink: &dyn EventSink,
    ) -> Option<SaveOutcome> {
        let session = self.open.take()?;
        sink.emit(UiEvent::TagEditorClosed);

        let outcome = match api.update_tags(&session.target_path, &session.draft).await {
            Ok(response) if response.success => {
                log::info!("[Tags] Updated {}", session.target_path);
                SaveOutcome::Saved
            }
            Ok(response) => {
                log::warn!(
                    "[Tags] Server refused update for {}: {}",
                    session.target_path,
                    response.message.as_deref().unwrap_or("no message")
                );
                SaveOutcome::Rejected
            }
            Err(e) => {
                log::error!("[Tags] Error updating tags for {}: {}", session.target_path, e);
                SaveOutcome::Failed(e.to_string())
            }
        };

        sink.emit(UiEvent::Notify {
            notice: outcome.notice(),
        });
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{record, FakeArchive, RecordingSink, TagUpdateScript};

    #[test]
    fn test_open_snapshots_tags_and_replaces() {
        let sink = RecordingSink::default();
        let mut editor = TagEditor::new();

        editor.open(&record("a.jpg", "cat, fluffy", 1), &sink);
        assert!(editor.set_draft("cat"));
        editor.open(&record("b.jpg", "dog", 2), &sink);

        let session = editor.session().unwrap();
        assert_eq!(session.target_path, "b.jpg");
        assert_eq!(session.draft, "dog");
    }

    #[test]
    fn test_cancel_discards_draft() {
        let sink = RecordingSink::default();
        let mut editor = TagEditor::new();
        editor.open(&record("a.jpg", "cat", 1), &sink);
        editor.set_draft("changed");

        assert!(editor.cancel(&sink));
        assert!(editor.session().is_none());
        assert_eq!(sink.events().last(), Some(&UiEvent::TagEditorClosed));
        assert!(!editor.cancel(&sink));
        assert!(!editor.set_draft("nothing open"));
    }

    #[tokio::test]
    async fn test_save_sends_draft() {
        let api = FakeArchive::default();
        let sink = RecordingSink::default();
        let mut editor = TagEditor::new();
        editor.open(&record("a.jpg", "cat", 1), &sink);
        editor.set_draft("cat, sleeping");
        sink.clear();

        assert_eq!(editor.save(&api, &sink).await, Some(SaveOutcome::Saved));
        assert_eq!(
            api.tag_updates(),
            vec![("a.jpg".to_string(), "cat, sleeping".to_string())]
        );
        assert_eq!(
            sink.events(),
            vec![
                UiEvent::TagEditorClosed,
                UiEvent::Notify {
                    notice: Notice::info(TAGS_UPDATED_TEXT)
                },
            ]
        );
        assert!(editor.session().is_none());
    }

    #[tokio::test]
    async fn test_save_rejected_and_failed() {
        let api = FakeArchive::default();
        let sink = RecordingSink::default();
        let mut editor = TagEditor::new();

        api.script_tag_update(TagUpdateScript::Reject);
        editor.open(&record("a.jpg", "cat", 1), &sink);
        let outcome = editor.save(&api, &sink).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Rejected);
        assert!(!outcome.should_refresh());
        assert_eq!(outcome.notice(), Notice::error(TAGS_REJECTED_TEXT));

        api.script_tag_update(TagUpdateScript::Error);
        editor.open(&record("a.jpg", "cat", 1), &sink);
        let outcome = editor.save(&api, &sink).await.unwrap();
        assert!(matches!(outcome, SaveOutcome::Failed(_)));
        assert_eq!(outcome.notice(), Notice::error(TAGS_ERROR_TEXT));
    }

    #[tokio::test]
    async fn test_save_without_modal() {
        let api = FakeArchive::default();
        let sink = RecordingSink::default();
        let mut editor = TagEditor::new();
        assert_eq!(editor.save(&api, &sink).await, None);
        assert!(api.tag_updates().is_empty());
    }
}
