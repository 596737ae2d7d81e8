use crate::api::{ArchiveApi, FileUpload};
use crate::file_filter;
use crate::ui::{self, BusyControl, Control, EventSink, UiEvent};
use anyhow::{anyhow, Context, Result};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Done,
    Failed { error: String },
}

/// A staged file, keyed by its file name
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub path: PathBuf,
    pub name: String,
    pub mime: String,
    /// `data:` URL shown next to the name
    pub preview: String,
    pub status: UploadStatus,
    bytes: Vec<u8>,
}

impl UploadTask {
    /// Read the file and build its preview
    pub async fn load(path: &Path) -> Result<Self> {
        let name = file_filter::file_name(path)?;
        let bytes = file_filter::read_file(path).await?;
        let mime = file_filter::detect_mime(path, &bytes);
        let preview = file_filter::data_url(&mime, &bytes);

        Ok(Self {
            path: path.to_path_buf(),
            name,
            mime,
            preview,
            status: UploadStatus::Pending,
            bytes,
        })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn to_upload(&self) -> FileUpload {
        FileUpload {
            file_name: self.name.clone(),
            mime: self.mime.clone(),
            bytes: self.bytes.clone(),
        }
    }

    pub fn preview(&self) -> StagedPreview {
        StagedPreview {
            name: self.name.clone(),
            preview_url: self.preview.clone(),
            mime: self.mime.clone(),
            size: self.size(),
        }
    }
}

/// What the view needs to show a staged file
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StagedPreview {
    pub name: String,
    pub preview_url: String,
    pub mime: String,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueState {
    pub items: Vec<StagedPreview>,
    pub total_size: u64,
    pub pending_count: usize,
    pub submit_enabled: bool,
}

/// Outcome of one `submit_all`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    /// (file name, error) for each upload that failed
    pub failures: Vec<(String, String)>,
}

impl BatchReport {
    /// Fold per-file outcomes into a report. Errors if the outcomes do not
    /// cover exactly the submitted batch.
    fn aggregate(batch: &[String], outcomes: &[(String, Result<(), String>)]) -> Result<Self> {
        if outcomes.len() != batch.len() {
            return Err(anyhow!(
                "{} outcomes for {} submitted files",
                outcomes.len(),
                batch.len()
            ));
        }

        let mut failures = Vec::new();
        let mut succeeded = 0;
        for (name, outcome) in outcomes {
            match outcome {
                Ok(()) => succeeded += 1,
                Err(e) => failures.push((name.clone(), e.clone())),
            }
        }
        Ok(Self {
            total: batch.len(),
            succeeded,
            failures,
        })
    }

    pub fn message(&self) -> String {
        format!(
            "Successfully uploaded {} out of {} files.",
            self.succeeded, self.total
        )
    }
}

/// Files staged for upload. Insertion order is display order; staging a
/// name that is already present replaces that entry in place.
pub struct UploadManager {
    tasks: Vec<UploadTask>,
    folder: String,
}

impl UploadManager {
    pub fn new(folder: impl Into<String>) -> Self {
        Self {
            tasks: Vec::new(),
            folder: folder.into(),
        }
    }

    pub fn tasks(&self) -> &[UploadTask] {
        &self.tasks
    }

    pub fn get(&self, name: &str) -> Option<&UploadTask> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// The submit control is offered iff something is staged
    pub fn submit_enabled(&self) -> bool {
        !self.tasks.is_empty()
    }

    pub fn get_state(&self) -> QueueState {
        QueueState {
            items: self.tasks.iter().map(UploadTask::preview).collect(),
            total_size: self.tasks.iter().map(UploadTask::size).sum(),
            pending_count: self
                .tasks
                .iter()
                .filter(|t| t.status == UploadStatus::Pending)
                .count(),
            submit_enabled: self.submit_enabled(),
        }
    }

    fn emit_submit_state(&self, sink: &dyn EventSink) {
        ui::set_control(
            sink,
            Control::Submit,
            true,
            self.submit_enabled(),
            Control::Submit.idle_label(),
        );
    }

    /// Insert or replace a loaded task. A replaced entry keeps its position.
    pub fn insert(&mut self, task: UploadTask, sink: &dyn EventSink) {
        let preview = task.preview();
        let replaced = match self.tasks.iter_mut().find(|t| t.name == task.name) {
            Some(existing) => {
                log::info!("[Upload] Replacing staged {}", task.name);
                *existing = task;
                true
            }
            None => {
                self.tasks.push(task);
                false
            }
        };
        sink.emit(UiEvent::FileStaged { preview, replaced });
        self.emit_submit_state(sink);
    }

    /// Read one file, build its preview and stage it
    pub async fn stage(&mut self, path: &Path, sink: &dyn EventSink) -> Result<()> {
        let task = UploadTask::load(path)
            .await
            .with_context(|| format!("Failed to stage {}", path.display()))?;
        self.insert(task, sink);
        Ok(())
    }

    /// Stage dropped or picked paths, expanding directories. Files that
    /// cannot be read are logged and skipped. Returns how many were staged.
    pub async fn stage_all(&mut self, paths: &[PathBuf], sink: &dyn EventSink) -> usize {
        let mut staged = 0;
        for path in file_filter::collect_files(paths) {
            match self.stage(&path, sink).await {
                Ok(()) => staged += 1,
                Err(e) => log::warn!("[Upload] {:#}", e),
            }
        }
        staged
    }

    pub fn unstage(&mut self, name: &str, sink: &dyn EventSink) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.name != name);
        let removed = self.tasks.len() != before;
        if removed {
            sink.emit(UiEvent::FileUnstaged {
                name: name.to_string(),
            });
            self.emit_submit_state(sink);
        }
        removed
    }

    fn set_status(&mut self, name: &str, status: UploadStatus, sink: &dyn EventSink) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.name == name) {
            task.status = status.clone();
        }
        sink.emit(UiEvent::UploadStatusChanged {
            name: name.to_string(),
            status,
        });
    }

    /// Upload everything staged right now, all requests in flight at once.
    /// One file failing never stops the others. Once every upload settled
    /// the batch leaves the staging set whatever its outcome. The submit
    /// control is disabled for the duration and restored on every exit path.
    ///
    /// Returns None when nothing was staged or the outcomes could not be
    /// aggregated; the user has been told in both cases.
    pub async fn submit_all<A: ArchiveApi + ?Sized>(
        &mut self,
        api: &A,
        sink: &dyn EventSink,
    ) -> Option<BatchReport> {
        if self.tasks.is_empty() {
            return None;
        }
        let mut busy = BusyControl::acquire(sink, Control::Submit);

        let batch: Vec<FileUpload> = self.tasks.iter().map(UploadTask::to_upload).collect();
        let names: Vec<String> = batch.iter().map(|f| f.file_name.clone()).collect();
        for name in &names {
            self.set_status(name, UploadStatus::Uploading, sink);
        }
        log::info!("[Upload] Sending {} files to '{}'", batch.len(), self.folder);

        let folder = self.folder.as_str();
        let requests = batch.into_iter().map(|file| async move {
            let name = file.file_name.clone();
            let outcome = match api.upload(file, folder).await {
                Ok(receipt) => {
                    log::info!("[Upload {}] Stored at {:?}", name, receipt.path);
                    Ok(())
                }
                Err(e) => {
                    log::warn!("[Upload {}] Failed: {}", name, e);
                    Err(e.to_string())
                }
            };
            (name, outcome)
        });
        let outcomes = join_all(requests).await;

        for (name, outcome) in &outcomes {
            let status = match outcome {
                Ok(()) => UploadStatus::Done,
                Err(e) => UploadStatus::Failed { error: e.clone() },
            };
            self.set_status(name, status, sink);
        }

        let report = match BatchReport::aggregate(&names, &outcomes) {
            Ok(report) => report,
            Err(e) => {
                log::error!("[Upload] {:#}", e);
                sink.emit(UiEvent::Notify {
                    notice: ui::Notice::error("An error occurred during upload"),
                });
                busy.restore_visible(self.submit_enabled());
                return None;
            }
        };

        sink.emit(UiEvent::Notify {
            notice: ui::Notice::info(report.message()),
        });

        let submitted: HashSet<&str> = names.iter().map(String::as_str).collect();
        self.tasks.retain(|t| !submitted.contains(t.name.as_str()));
        if self.tasks.is_empty() {
            sink.emit(UiEvent::StagingCleared);
        } else {
            for name in &names {
                sink.emit(UiEvent::FileUnstaged { name: name.clone() });
            }
        }
        busy.restore_visible(self.submit_enabled());
        Some(report)
    }
}
