pub mod api;
pub mod autocomplete;
pub mod config;
pub mod file_filter;
pub mod gallery;
pub mod records;
pub mod session;
pub mod sort;
pub mod tag_cache;
pub mod tag_editor;
pub mod ui;
pub mod upload_manager;

#[cfg(test)]
mod testing;

pub use crate::api::{ApiError, ArchiveApi, HttpArchive};
pub use crate::autocomplete::{ClickTarget, EditorId, Key, SEARCH_EDITOR};
pub use crate::config::ClientConfig;
pub use crate::records::ImageRecord;
pub use crate::sort::SortOrder;
pub use crate::ui::{EventSink, LogSink, UiEvent};

use crate::autocomplete::{AutocompleteEditor, PanelSlot};
use crate::gallery::Gallery;
use crate::session::{RenderPlan, ResultSession, SearchOutcome};
use crate::tag_cache::TagIndexCache;
use crate::tag_editor::TagEditor;
use crate::ui::{BusyControl, Control, LoadingIndicator, Notice};
use crate::upload_manager::UploadManager;
use std::path::PathBuf;

pub const PROCESS_FOLDER_ERROR_TEXT: &str =
    "An error occurred while processing the folder. Please try again.";

/// Everything the view can report to the client
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Page loaded: fetch the tag index and show the whole archive
    Startup,
    /// The search field's text changed
    SearchInput(String),
    /// Search button pressed
    SearchSubmitted,
    /// Key pressed inside the search field
    KeyPressed(Key),
    /// Entry `index` of the suggestion panel was clicked
    SuggestionClicked(usize),
    DocumentClicked(ClickTarget),
    SortSelected(SortOrder),
    LoadMoreClicked,
    /// Files or directories dropped or picked
    FilesDropped(Vec<PathBuf>),
    FileRemoved(String),
    SubmitUploads,
    /// Tag line of the card for this path clicked
    TagsClicked(String),
    ImageOpened(String),
    EditTagsOpened(String),
    TagEditDraftChanged(String),
    TagEditSaved,
    TagEditCancelled,
    IndexRequested,
    ProcessFolderRequested,
}

/// The client controller. Owns every piece of session state and is the only
/// place it is mutated; the view talks to it through [`ClientEvent`]s and
/// hears back through its [`EventSink`].
pub struct ArchiveClient<A: ArchiveApi, S: EventSink> {
    config: ClientConfig,
    api: A,
    sink: S,
    session: ResultSession,
    gallery: Gallery,
    tags: TagIndexCache,
    search_editor: AutocompleteEditor,
    panels: PanelSlot,
    uploads: UploadManager,
    tag_editor: TagEditor,
}

impl<S: EventSink> ArchiveClient<HttpArchive, S> {
    /// Client talking to the archive described by `config`
    pub fn connect(config: ClientConfig, sink: S) -> Result<Self, ApiError> {
        let api = HttpArchive::new(&config)?;
        Ok(Self::new(config, api, sink))
    }
}

impl<A: ArchiveApi, S: EventSink> ArchiveClient<A, S> {
    pub fn new(config: ClientConfig, api: A, sink: S) -> Self {
        Self::with_session(config, api, sink, ResultSession::new())
    }

    /// Use a prepared session, e.g. one with a seeded shuffle
    pub fn with_session(config: ClientConfig, api: A, sink: S, session: ResultSession) -> Self {
        let uploads = UploadManager::new(config.upload_folder.clone());
        Self {
            config,
            api,
            sink,
            session,
            gallery: Gallery::new(),
            tags: TagIndexCache::new(),
            search_editor: AutocompleteEditor::new(SEARCH_EDITOR),
            panels: PanelSlot::default(),
            uploads,
            tag_editor: TagEditor::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn session(&self) -> &ResultSession {
        &self.session
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    pub fn tag_index(&self) -> &TagIndexCache {
        &self.tags
    }

    pub fn search_text(&self) -> &str {
        self.search_editor.value()
    }

    pub fn panels(&self) -> &PanelSlot {
        &self.panels
    }

    pub fn uploads(&self) -> &UploadManager {
        &self.uploads
    }

    pub fn tag_editor(&self) -> &TagEditor {
        &self.tag_editor
    }

    /// Handle one event from the view. Returns true when the view should
    /// suppress the event's default action (form submit, focus change).
    pub async fn dispatch(&mut self, event: ClientEvent) -> bool {
        match event {
            ClientEvent::Startup => {
                self.refresh_tags().await;
                self.search("").await;
                false
            }
            ClientEvent::SearchInput(text) => {
                self.search_editor.input(&text, &self.tags, &mut self.panels);
                self.emit_panel();
                false
            }
            ClientEvent::SearchSubmitted => {
                self.submit_search().await;
                true
            }
            ClientEvent::KeyPressed(key) => self.handle_key(key).await,
            ClientEvent::SuggestionClicked(index) => {
                if self
                    .search_editor
                    .click_suggestion(index, &mut self.panels)
                    .is_some()
                {
                    self.emit_selection();
                }
                false
            }
            ClientEvent::DocumentClicked(target) => {
                if self.panels.handle_click(target) {
                    self.sink.emit(UiEvent::SuggestionsClosed);
                }
                false
            }
            ClientEvent::SortSelected(order) => {
                self.apply_sort(order).await;
                false
            }
            ClientEvent::LoadMoreClicked => {
                self.load_more().await;
                false
            }
            ClientEvent::FilesDropped(paths) => {
                let staged = self.uploads.stage_all(&paths, &self.sink).await;
                log::info!("[Upload] Staged {} of {} dropped paths", staged, paths.len());
                true
            }
            ClientEvent::FileRemoved(name) => {
                self.uploads.unstage(&name, &self.sink);
                false
            }
            ClientEvent::SubmitUploads => {
                self.submit_uploads().await;
                true
            }
            ClientEvent::TagsClicked(path) => {
                self.gallery.toggle_tags(&path, &self.sink);
                false
            }
            ClientEvent::ImageOpened(path) => {
                self.sink.emit(UiEvent::OpenImage {
                    url: self.api.image_url(&path),
                });
                true
            }
            ClientEvent::EditTagsOpened(path) => {
                match self.session.find(&path) {
                    Some(record) => self.tag_editor.open(record, &self.sink),
                    None => log::warn!("[Tags] No record for {} in the current results", path),
                }
                false
            }
            ClientEvent::TagEditDraftChanged(draft) => {
                self.tag_editor.set_draft(draft);
                false
            }
            ClientEvent::TagEditSaved => {
                self.save_tags().await;
                false
            }
            ClientEvent::TagEditCancelled => {
                self.tag_editor.cancel(&self.sink);
                false
            }
            ClientEvent::IndexRequested => {
                self.index().await;
                false
            }
            ClientEvent::ProcessFolderRequested => {
                self.process_folder().await;
                false
            }
        }
    }

    // Search

    /// Replace the results with the archive's answer to `query`. Returns
    /// true if the response was installed and drawn.
    pub async fn search(&mut self, query: &str) -> bool {
        let ticket = self.session.begin_search(query);
        let _loading = LoadingIndicator::show(&self.sink);

        let records = match self.api.search(query).await {
            Ok(records) => records,
            Err(e) => {
                log::error!("[Search] Error fetching images for {:?}: {}", query, e);
                self.session.fail_search(ticket);
                return false;
            }
        };
        log::info!("[Search] {} results for {:?}", records.len(), query);

        match self.session.complete_search(ticket, records) {
            SearchOutcome::Installed(plan) => {
                let records = self.session.records_for(&plan);
                self.gallery
                    .render(&self.api, &self.sink, &plan, records)
                    .await;
                true
            }
            SearchOutcome::Stale => false,
        }
    }

    /// Search with whatever was searched last
    pub async fn refresh(&mut self) -> bool {
        let query = self.session.last_query().to_string();
        self.search(&query).await
    }

    async fn submit_search(&mut self) {
        if self.panels.close_all() {
            self.sink.emit(UiEvent::SuggestionsClosed);
        }
        let query = self.search_editor.value().to_string();
        self.search(&query).await;
    }

    pub async fn refresh_tags(&mut self) {
        // Failure is already logged and the old tags stay usable
        let _ = self.tags.refresh(&self.api).await;
    }

    async fn render(&mut self, plan: &RenderPlan) {
        let records = self.session.records_for(plan);
        self.gallery
            .render(&self.api, &self.sink, plan, records)
            .await;
    }

    pub async fn apply_sort(&mut self, order: SortOrder) {
        self.sink.emit(UiEvent::SortSelected {
            order: order.as_str().to_string(),
            label: order.label().to_string(),
        });
        if let Some(plan) = self.session.apply_sort(order) {
            self.render(&plan).await;
        }
    }

    pub async fn load_more(&mut self) -> bool {
        match self.session.load_more() {
            Some(plan) => {
                self.render(&plan).await;
                true
            }
            None => false,
        }
    }

    // Autocomplete

    fn emit_panel(&self) {
        match self.panels.panel() {
            Some(panel) => self.sink.emit(UiEvent::SuggestionsShown {
                panel: panel.clone(),
            }),
            None => self.sink.emit(UiEvent::SuggestionsClosed),
        }
    }

    fn emit_selection(&self) {
        self.sink.emit(UiEvent::SearchTextChanged {
            text: self.search_editor.value().to_string(),
        });
        self.sink.emit(UiEvent::SuggestionsClosed);
        self.sink.emit(UiEvent::SearchFocused);
    }

    async fn handle_key(&mut self, key: Key) -> bool {
        let outcome = self.search_editor.handle_key(key, &mut self.panels);
        if outcome.selected.is_some() {
            self.emit_selection();
            return outcome.prevent_default;
        }
        match key {
            Key::Up | Key::Down if self.panels.panel().is_some() => self.emit_panel(),
            Key::Enter => self.submit_search().await,
            _ => {}
        }
        outcome.prevent_default
    }

    // Uploads

    pub async fn submit_uploads(&mut self) -> bool {
        match self.uploads.submit_all(&self.api, &self.sink).await {
            Some(report) => {
                log::info!("[Upload] {}", report.message());
                self.refresh().await;
                true
            }
            None => false,
        }
    }

    // Tag editing

    pub async fn save_tags(&mut self) {
        let Some(outcome) = self.tag_editor.save(&self.api, &self.sink).await else {
            return;
        };
        if outcome.should_refresh() {
            self.refresh().await;
        }
    }

    // Maintenance

    /// Runs the indexer. The button reads "Completed" for a while once the
    /// request settles, whatever its outcome, then goes back to idle.
    pub async fn index(&mut self) {
        {
            let mut busy = BusyControl::acquire(&self.sink, Control::Index);
            busy.settle_with(Control::Index.done_label());
            match self.api.index().await {
                Ok(response) => log::info!("[Index] {}", response.message),
                Err(e) => log::error!("[Index] Error indexing images: {}", e),
            }
        }
        tokio::time::sleep(self.config.index_done_linger()).await;
        ui::set_control(&self.sink, Control::Index, true, true, Control::Index.idle_label());
    }

    pub async fn process_folder(&mut self) {
        let processed = {
            let _busy = BusyControl::acquire(&self.sink, Control::ProcessFolder);
            match self.api.process_folder().await {
                Ok(response) => {
                    log::info!("[Index] {}", response.message);
                    self.sink.emit(UiEvent::Notify {
                        notice: Notice::info(response.message),
                    });
                    true
                }
                Err(e) => {
                    log::error!("[Index] Error processing folder: {}", e);
                    self.sink.emit(UiEvent::Notify {
                        notice: Notice::error(PROCESS_FOLDER_ERROR_TEXT),
                    });
                    false
                }
            }
        };
        if processed {
            self.refresh().await;
        }
    }
}
