//! In-memory archive and recording sink shared by the unit tests.

use crate::api::{ApiError, ArchiveApi, FileUpload};
use crate::records::{ImageRecord, ServerMessage, UpdateTagsResponse, UploadReceipt};
use crate::ui::{EventSink, UiEvent};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;

pub const INDEX_MESSAGE: &str = "Indexing complete";
pub const PROCESS_MESSAGE: &str = "Processed 3 new images";

/// Record dated `day` days into 2024
pub fn record(path: &str, tags: &str, day: u32) -> ImageRecord {
    let date = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
        + chrono::Duration::days(day as i64);
    ImageRecord::new(path, tags, date)
}

/// A blank PNG of the given size
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let canvas = image::RgbImage::new(width, height);
    let mut out = Cursor::new(Vec::new());
    canvas.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<UiEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<UiEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    pub fn notices(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                UiEvent::Notify { notice } => Some(notice.text),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: UiEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TagUpdateScript {
    #[default]
    Accept,
    Reject,
    Error,
}

#[derive(Default)]
struct FakeState {
    corpus: Vec<ImageRecord>,
    tags: Vec<String>,
    images: HashMap<String, Vec<u8>>,
    fail_tags: bool,
    fail_search: bool,
    fail_maintenance: bool,
    failing_uploads: HashSet<String>,
    uploaded: Vec<(String, String)>,
    tag_script: TagUpdateScript,
    tag_updates: Vec<(String, String)>,
    searches: Vec<String>,
    index_calls: usize,
    upload_gate: Option<Arc<Barrier>>,
}

/// Scriptable stand-in for the archive backend. `/search` matches records
/// carrying every requested tag, ignoring case; an empty query returns all.
#[derive(Default)]
pub struct FakeArchive {
    state: Mutex<FakeState>,
}

impl FakeArchive {
    pub fn with_corpus(records: Vec<ImageRecord>) -> Self {
        let archive = Self::default();
        archive.set_corpus(records);
        archive
    }

    pub fn set_corpus(&self, records: Vec<ImageRecord>) {
        self.state.lock().unwrap().corpus = records;
    }

    pub fn set_tags(&self, tags: &[&str]) {
        self.state.lock().unwrap().tags = tags.iter().map(|t| t.to_string()).collect();
    }

    pub fn set_image(&self, path: &str, bytes: Vec<u8>) {
        self.state.lock().unwrap().images.insert(path.to_string(), bytes);
    }

    pub fn fail_tags(&self, fail: bool) {
        self.state.lock().unwrap().fail_tags = fail;
    }

    pub fn fail_search(&self, fail: bool) {
        self.state.lock().unwrap().fail_search = fail;
    }

    pub fn fail_maintenance(&self, fail: bool) {
        self.state.lock().unwrap().fail_maintenance = fail;
    }

    pub fn fail_upload(&self, file_name: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_uploads
            .insert(file_name.to_string());
    }

    /// Hold every upload until `n` of them are waiting at once
    pub fn gate_uploads(&self, n: usize) {
        self.state.lock().unwrap().upload_gate = Some(Arc::new(Barrier::new(n)));
    }

    pub fn script_tag_update(&self, script: TagUpdateScript) {
        self.state.lock().unwrap().tag_script = script;
    }

    /// (file name, folder) of every accepted upload
    pub fn uploaded(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().uploaded.clone()
    }

    /// (path, tags) of every update request received
    pub fn tag_updates(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().tag_updates.clone()
    }

    /// Query of every search request received
    pub fn searches(&self) -> Vec<String> {
        self.state.lock().unwrap().searches.clone()
    }

    pub fn index_calls(&self) -> usize {
        self.state.lock().unwrap().index_calls
    }
}

fn server_error(body: &str) -> ApiError {
    ApiError::Status {
        status: 500,
        body: body.to_string(),
    }
}

#[async_trait]
impl ArchiveApi for FakeArchive {
    async fn search(&self, tags: &str) -> Result<Vec<ImageRecord>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.searches.push(tags.to_string());
        if state.fail_search {
            return Err(server_error("search unavailable"));
        }
        let wanted: Vec<String> = tags
            .split(',')
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Ok(state
            .corpus
            .iter()
            .filter(|r| {
                let have: Vec<String> = r.tag_list().iter().map(|t| t.to_lowercase()).collect();
                wanted.iter().all(|w| have.contains(w))
            })
            .cloned()
            .collect())
    }

    async fn all_tags(&self) -> Result<Vec<String>, ApiError> {
        let state = self.state.lock().unwrap();
        if state.fail_tags {
            return Err(server_error("tags unavailable"));
        }
        Ok(state.tags.clone())
    }

    async fn fetch_image(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        self.state
            .lock()
            .unwrap()
            .images
            .get(path)
            .cloned()
            .ok_or(ApiError::Status {
                status: 404,
                body: format!("{} not found", path),
            })
    }

    async fn upload(&self, file: FileUpload, folder: &str) -> Result<UploadReceipt, ApiError> {
        let gate = self.state.lock().unwrap().upload_gate.clone();
        if let Some(gate) = gate {
            gate.wait().await;
        }

        let mut state = self.state.lock().unwrap();
        if state.failing_uploads.contains(&file.file_name) {
            return Err(server_error("disk full"));
        }
        let path = format!("{}/{}", folder, file.file_name);
        state
            .uploaded
            .push((file.file_name.clone(), folder.to_string()));
        state.corpus.push(record(&path, "", 300));
        Ok(UploadReceipt {
            success: Some(true),
            message: None,
            path: Some(path),
        })
    }

    async fn update_tags(&self, path: &str, tags: &str) -> Result<UpdateTagsResponse, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.tag_updates.push((path.to_string(), tags.to_string()));
        match state.tag_script {
            TagUpdateScript::Accept => {
                if let Some(r) = state.corpus.iter_mut().find(|r| r.path == path) {
                    r.tags = tags.to_string();
                }
                Ok(UpdateTagsResponse {
                    success: true,
                    message: None,
                })
            }
            TagUpdateScript::Reject => Ok(UpdateTagsResponse {
                success: false,
                message: Some("Image not found".to_string()),
            }),
            TagUpdateScript::Error => Err(server_error("database locked")),
        }
    }

    async fn index(&self) -> Result<ServerMessage, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.index_calls += 1;
        if state.fail_maintenance {
            return Err(server_error("indexer busy"));
        }
        Ok(ServerMessage {
            message: INDEX_MESSAGE.to_string(),
        })
    }

    async fn process_folder(&self) -> Result<ServerMessage, ApiError> {
        if self.state.lock().unwrap().fail_maintenance {
            return Err(server_error("processor busy"));
        }
        Ok(ServerMessage {
            message: PROCESS_MESSAGE.to_string(),
        })
    }

    fn image_url(&self, path: &str) -> String {
        format!("fake://image/{}", path)
    }
}
