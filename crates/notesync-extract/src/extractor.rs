//! Note extraction.
//!
//! [`Extractor::extract`] turns one [`PageContext`] into a [`NoteRecord`].
//! It never fails: every field that no source resolves keeps its default
//! and is listed in [`NoteRecord::unresolved`].

use std::collections::BTreeSet;
use std::time::Instant;

use chrono::{DateTime, FixedOffset, Utc};
use scraper::Html;
use tracing::{debug, info, instrument, trace};

use notesync_core::defaults::{ENV_UTC_OFFSET_HOURS, SITE_ORIGIN, UTC_OFFSET_HOURS};
use notesync_core::{derive_note_id, local_offset, NoteField, NoteRecord, NoteType};

use crate::content::{
    append_tags, detect_note_type, extract_content, extract_images, extract_tags, extract_topics,
    TagOrigin,
};
use crate::fields::sources_for;
use crate::hover::{attach_hover_card, HoverOptions, HoverProbe};
use crate::page::PageContext;
use crate::resolver::{as_count, as_millis, as_text, first_resolved, Probes, Raw};
use crate::state::{discover_state, find_note_object, json_ld_blocks};

/// Page-snapshot extractor.
#[derive(Debug, Clone)]
pub struct Extractor {
    offset: FixedOffset,
    hover: HoverOptions,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(local_offset(UTC_OFFSET_HOURS))
    }
}

impl Extractor {
    /// Extractor whose local calendar is `offset`.
    pub fn new(offset: FixedOffset) -> Self {
        Self {
            offset,
            hover: HoverOptions::default(),
        }
    }

    /// Read the local calendar offset from `UTC_OFFSET_HOURS`.
    pub fn from_env() -> Self {
        let hours = std::env::var(ENV_UTC_OFFSET_HOURS)
            .ok()
            .and_then(|v| v.parse::<i32>().ok())
            .unwrap_or(UTC_OFFSET_HOURS);
        Self::new(local_offset(hours))
    }

    pub fn with_hover_options(mut self, hover: HoverOptions) -> Self {
        self.hover = hover;
        self
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Capture the hover card through `probe`, then extract.
    pub async fn extract_with_probe(&self, mut ctx: PageContext, probe: &dyn HoverProbe) -> NoteRecord {
        attach_hover_card(&mut ctx, probe, self.hover).await;
        self.extract(&ctx)
    }

    /// Resolve every field of a note from one page snapshot.
    #[instrument(skip(self, ctx), fields(subsystem = "extract", component = "extractor", op = "extract", url = %ctx.url))]
    pub fn extract(&self, ctx: &PageContext) -> NoteRecord {
        let started = Instant::now();
        let now = ctx
            .now
            .unwrap_or_else(|| Utc::now().with_timezone(&self.offset));

        let document = Html::parse_document(&ctx.html);
        let hover = ctx.hover_card_html.as_deref().map(Html::parse_fragment);
        let state = discover_state(ctx, &document);
        let note = state.as_ref().and_then(find_note_object);
        let json_ld = json_ld_blocks(&document);
        if state.is_some() && note.is_none() {
            debug!("Page state found but no note object inside it");
        }

        let mut fields = FieldResolver {
            probes: Probes {
                note,
                globals: &ctx.state,
                document: &document,
                hover: hover.as_ref(),
                json_ld: &json_ld,
            },
            now,
            unresolved: BTreeSet::new(),
        };

        let mut record = NoteRecord::default();
        if let Some(title) = fields.text(NoteField::Title) {
            record.title = title;
        }
        if let Some(author) = fields.text(NoteField::Author) {
            record.author = author;
        }
        record.author_url = fields
            .text(NoteField::AuthorUrl)
            .map(|href| absolute_site_url(&href))
            .unwrap_or_default();
        record.author_bio = fields.text(NoteField::AuthorBio).unwrap_or_default();
        record.author_xhs_id = fields
            .text(NoteField::AuthorXhsId)
            .map(|id| strip_xhs_id_label(&id))
            .unwrap_or_default();

        record.likes = fields.count(NoteField::Likes).unwrap_or(0);
        record.comments = fields.count(NoteField::Comments).unwrap_or(0);
        record.shares = fields.count(NoteField::Shares).unwrap_or(0);
        record.collections = fields.count(NoteField::Collections).unwrap_or(0);
        record.follower_count = fields.count(NoteField::FollowerCount).unwrap_or(0);
        record.likes_and_collections = fields
            .text(NoteField::LikesAndCollections)
            .unwrap_or_default();

        record.publish_time = fields
            .millis(NoteField::PublishTime)
            .map(|ms| ms.to_string())
            .unwrap_or_default();
        record.update_time = fields
            .millis(NoteField::UpdateTime)
            .map(|ms| ms.to_string())
            .unwrap_or_default();

        let mut unresolved = fields.unresolved;

        let content = extract_content(&document, note).unwrap_or_default();
        let (tags, tag_origin) = extract_tags(&document, &content);
        record.content = match tag_origin {
            TagOrigin::Elements => append_tags(&content, &tags),
            TagOrigin::Content => content,
        };
        record.tags = tags;
        record.topics = extract_topics(&document);
        record.images = extract_images(&document, note);
        record.note_type = detect_note_type(&document, note);

        if record.note_type == NoteType::Video {
            let probes = Probes {
                note,
                globals: &ctx.state,
                document: &document,
                hover: hover.as_ref(),
                json_ld: &json_ld,
            };
            match first_resolved(sources_for(NoteField::VideoCover), |s| probes.probe(s).and_then(as_text)) {
                Some((_, cover)) => record.video_cover = absolute_site_url(&cover),
                None => {
                    unresolved.insert(NoteField::VideoCover);
                }
            }
        }

        for (empty, field) in [
            (record.content.is_empty(), NoteField::Content),
            (record.tags.is_empty(), NoteField::Tags),
            (record.topics.is_empty(), NoteField::Topics),
            (record.images.is_empty(), NoteField::Images),
        ] {
            if empty {
                unresolved.insert(field);
            }
        }

        record.note_url = ctx.url.clone();
        record.id = derive_note_id(&ctx.url, &record.title, &record.author);
        record.unresolved = unresolved;
        record.derive_scores();

        info!(
            note_id = %record.id,
            note_type = %record.note_type,
            unresolved = record.unresolved.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Note extracted"
        );
        record
    }
}

/// Walks one field's sources and records misses.
struct FieldResolver<'a> {
    probes: Probes<'a>,
    now: DateTime<FixedOffset>,
    unresolved: BTreeSet<NoteField>,
}

impl FieldResolver<'_> {
    fn text(&mut self, field: NoteField) -> Option<String> {
        self.resolve(field, as_text)
    }

    fn count(&mut self, field: NoteField) -> Option<u64> {
        self.resolve(field, as_count)
    }

    fn millis(&mut self, field: NoteField) -> Option<i64> {
        let now = self.now;
        self.resolve(field, move |raw| as_millis(raw, now))
    }

    fn resolve<T>(&mut self, field: NoteField, convert: impl Fn(Raw) -> Option<T>) -> Option<T> {
        let probes = &self.probes;
        match first_resolved(sources_for(field), |source| probes.probe(source).and_then(&convert)) {
            Some((source, value)) => {
                debug!(field = %field, source = source.kind(), "Field resolved");
                Some(value)
            }
            None => {
                trace!(field = %field, "No source resolved field");
                self.unresolved.insert(field);
                None
            }
        }
    }
}

/// Absolutize a site-relative or protocol-relative link.
fn absolute_site_url(href: &str) -> String {
    let href = href.trim();
    if let Some(rest) = href.strip_prefix("//") {
        format!("https://{}", rest)
    } else if href.starts_with('/') {
        format!("{}{}", SITE_ORIGIN, href)
    } else {
        href.to_string()
    }
}

/// Drop the `小红书号：` display label that profile cards put before the id.
fn strip_xhs_id_label(raw: &str) -> String {
    let raw = raw.trim();
    raw.strip_prefix("小红书号")
        .map(|rest| rest.trim_start_matches([':', '：', ' ']))
        .unwrap_or(raw)
        .trim()
        .to_string()
}
