use crate::api::ArchiveApi;
use crate::records::ImageRecord;
use crate::session::{RenderMode, RenderPlan};
use crate::ui::{EventSink, UiEvent, NO_RESULTS_TEXT};
use anyhow::{anyhow, Context, Result};
use image::ImageReader;
use serde::Serialize;
use std::io::Cursor;

/// Tag strings longer than this many characters start out truncated
const TAG_TRUNCATE_THRESHOLD: usize = 20;
/// Characters kept when truncating
const TAG_TRUNCATE_KEEP: usize = 25;
const ELLIPSIS: &str = "...";

pub fn truncate_tags(tags: &str) -> String {
    if tags.chars().count() > TAG_TRUNCATE_THRESHOLD {
        let head: String = tags.chars().take(TAG_TRUNCATE_KEEP).collect();
        format!("{}{}", head, ELLIPSIS)
    } else {
        tags.to_string()
    }
}

/// Tag line of a card. Toggling only changes what is shown, never the tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagLabel {
    pub full: String,
    pub expanded: bool,
    pub display: String,
}

impl TagLabel {
    pub fn new(tags: &str) -> Self {
        Self {
            full: tags.to_string(),
            expanded: false,
            display: truncate_tags(tags),
        }
    }

    pub fn toggle(&mut self) {
        self.expanded = !self.expanded;
        self.display = if self.expanded {
            self.full.clone()
        } else {
            truncate_tags(&self.full)
        };
    }
}

/// One gallery card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayUnit {
    pub path: String,
    pub image_url: String,
    /// height / width * 100, used as the container's top padding
    pub aspect_percent: Option<f32>,
    pub tags: TagLabel,
    pub date: String,
}

/// Natural dimensions of an encoded image, without decoding the pixels
pub fn image_dimensions(bytes: &[u8]) -> Result<(u32, u32)> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .context("Failed to read image header")?;
    reader
        .into_dimensions()
        .context("Failed to read image dimensions")
}

async fn read_aspect<A: ArchiveApi + ?Sized>(api: &A, path: &str) -> Result<f32> {
    let bytes = api
        .fetch_image(path)
        .await
        .with_context(|| format!("Failed to fetch image {}", path))?;
    let (width, height) = image_dimensions(&bytes)?;
    if width == 0 {
        return Err(anyhow!("Image {} has zero width", path));
    }
    Ok(height as f32 / width as f32 * 100.0)
}

/// Cards currently on screen, in display order
#[derive(Debug, Default)]
pub struct Gallery {
    cards: Vec<DisplayUnit>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cards(&self) -> &[DisplayUnit] {
        &self.cards
    }

    async fn build_card<A: ArchiveApi + ?Sized>(api: &A, record: &ImageRecord) -> DisplayUnit {
        let aspect_percent = match read_aspect(api, &record.path).await {
            Ok(aspect) => Some(aspect),
            Err(e) => {
                log::warn!("[Gallery] No layout size for {}: {:#}", record.path, e);
                None
            }
        };

        DisplayUnit {
            path: record.path.clone(),
            image_url: api.image_url(&record.path),
            aspect_percent,
            tags: TagLabel::new(&record.tags),
            date: record.date.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// Draw the records of a plan. Images are measured one after another so
    /// cards land in snapshot order.
    pub async fn render<A: ArchiveApi + ?Sized>(
        &mut self,
        api: &A,
        sink: &dyn EventSink,
        plan: &RenderPlan,
        records: &[ImageRecord],
    ) {
        if plan.mode == RenderMode::Replace {
            self.cards.clear();
            sink.emit(UiEvent::ResultsCleared);
            if records.is_empty() {
                sink.emit(UiEvent::NoResults {
                    message: NO_RESULTS_TEXT.to_string(),
                });
            }
        }

        for record in records {
            let card = Self::build_card(api, record).await;
            sink.emit(UiEvent::CardAppended { card: card.clone() });
            self.cards.push(card);
        }

        sink.emit(UiEvent::LoadMoreVisibility {
            visible: plan.has_more,
        });
        log::debug!("[Gallery] {} cards on screen", self.cards.len());
    }

    /// Flip the tag line of the card showing `path`
    pub fn toggle_tags(&mut self, path: &str, sink: &dyn EventSink) -> bool {
        let Some(index) = self.cards.iter().position(|c| c.path == path) else {
            return false;
        };
        let card = &mut self.cards[index];
        card.tags.toggle();
        sink.emit(UiEvent::CardUpdated {
            index,
            card: card.clone(),
        });
        true
    }
}
