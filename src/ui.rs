//! Outbound side of the client: everything the view layer is told to do.
//!
//! The client never touches widgets directly. It emits [`UiEvent`]s into an
//! [`EventSink`], the same way a desktop shell forwards `upload:progress`
//! style events to its webview.

use crate::autocomplete::SuggestionPanel;
use crate::gallery::DisplayUnit;
use crate::tag_editor::TagEditSession;
use crate::upload_manager::{StagedPreview, UploadStatus};
use serde::Serialize;

pub const LOADING_TEXT: &str = "Loading...";
pub const NO_RESULTS_TEXT: &str = "No matching images found.";

/// Buttons whose state the client drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    Submit,
    Index,
    ProcessFolder,
}

impl Control {
    /// Label shown when the control is idle
    pub fn idle_label(&self) -> &'static str {
        match self {
            Control::Submit => "Upload Files",
            Control::Index => "Index images",
            Control::ProcessFolder => "Process Folder",
        }
    }

    /// Label shown while its request is in flight
    pub fn busy_label(&self) -> &'static str {
        match self {
            Control::Submit => "Uploading...",
            Control::Index => "Indexing...",
            Control::ProcessFolder => "Processing...",
        }
    }

    /// Label shown right after its request settles, before going idle
    pub fn done_label(&self) -> &'static str {
        match self {
            Control::Index => "Completed ✔️",
            _ => self.idle_label(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A message the user has to see (an alert in a browser)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiEvent {
    LoadingShown { message: String },
    LoadingHidden,
    ResultsCleared,
    NoResults { message: String },
    CardAppended { card: DisplayUnit },
    CardUpdated { index: usize, card: DisplayUnit },
    LoadMoreVisibility { visible: bool },
    SortSelected { order: String, label: String },
    OpenImage { url: String },

    SearchTextChanged { text: String },
    SearchFocused,
    SuggestionsShown { panel: SuggestionPanel },
    SuggestionsClosed,

    /// `replaced` is set when an entry with the same name was already listed
    FileStaged { preview: StagedPreview, replaced: bool },
    FileUnstaged { name: String },
    StagingCleared,
    UploadStatusChanged { name: String, status: UploadStatus },
    ControlChanged {
        control: Control,
        enabled: bool,
        visible: bool,
        label: String,
    },

    TagEditorOpened { session: TagEditSession },
    TagEditorClosed,

    Notify { notice: Notice },
}

impl UiEvent {
    /// Channel-style name, e.g. for forwarding over an IPC bridge
    pub fn name(&self) -> &'static str {
        match self {
            UiEvent::LoadingShown { .. } | UiEvent::LoadingHidden => "gallery:loading",
            UiEvent::ResultsCleared
            | UiEvent::NoResults { .. }
            | UiEvent::CardAppended { .. }
            | UiEvent::CardUpdated { .. } => "gallery:cards",
            UiEvent::LoadMoreVisibility { .. } => "gallery:load_more",
            UiEvent::SortSelected { .. } => "gallery:sort",
            UiEvent::OpenImage { .. } => "gallery:open_image",
            UiEvent::SearchTextChanged { .. } | UiEvent::SearchFocused => "search:input",
            UiEvent::SuggestionsShown { .. } | UiEvent::SuggestionsClosed => "search:suggestions",
            UiEvent::FileStaged { .. } | UiEvent::FileUnstaged { .. } | UiEvent::StagingCleared => {
                "upload:queue_changed"
            }
            UiEvent::UploadStatusChanged { .. } => "upload:progress",
            UiEvent::ControlChanged { .. } => "ui:control",
            UiEvent::TagEditorOpened { .. } | UiEvent::TagEditorClosed => "tags:editor",
            UiEvent::Notify { .. } => "ui:notify",
        }
    }
}

/// Receiver of view events. Implementations use interior mutability so the
/// client can hold scoped guards while it keeps emitting.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: UiEvent);
}

/// Sink that only logs, for headless use
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: UiEvent) {
        match &event {
            UiEvent::Notify { notice } => log::info!("[UI] {}", notice.text),
            other => log::debug!("[UI] {}", other.name()),
        }
    }
}

pub(crate) fn set_control(sink: &dyn EventSink, control: Control, enabled: bool, visible: bool, label: &str) {
    sink.emit(UiEvent::ControlChanged {
        control,
        enabled,
        visible,
        label: label.to_string(),
    });
}

/// Disables a control with its busy label for as long as it lives, and puts
/// it back to idle when dropped, on every exit path.
pub struct BusyControl<'a> {
    sink: &'a dyn EventSink,
    control: Control,
    visible_after: bool,
    label_after: &'static str,
}

impl<'a> BusyControl<'a> {
    pub fn acquire(sink: &'a dyn EventSink, control: Control) -> Self {
        set_control(sink, control, false, true, control.busy_label());
        Self {
            sink,
            control,
            visible_after: true,
            label_after: control.idle_label(),
        }
    }

    /// Re-enable with `label` instead of the idle label
    pub fn settle_with(&mut self, label: &'static str) {
        self.label_after = label;
    }

    /// Whether the control should still be shown once restored
    pub fn restore_visible(&mut self, visible: bool) {
        self.visible_after = visible;
    }
}

impl Drop for BusyControl<'_> {
    fn drop(&mut self) {
        set_control(
            self.sink,
            self.control,
            true,
            self.visible_after,
            self.label_after,
        );
    }
}

/// Shows the loading indicator until dropped
pub struct LoadingIndicator<'a> {
    sink: &'a dyn EventSink,
}

impl<'a> LoadingIndicator<'a> {
    pub fn show(sink: &'a dyn EventSink) -> Self {
        sink.emit(UiEvent::LoadingShown {
            message: LOADING_TEXT.to_string(),
        });
        Self { sink }
    }
}

impl Drop for LoadingIndicator<'_> {
    fn drop(&mut self) {
        self.sink.emit(UiEvent::LoadingHidden);
    }
}
