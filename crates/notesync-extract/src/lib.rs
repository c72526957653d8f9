//! # notesync-extract
//!
//! Best-effort extraction of a [`NoteRecord`](notesync_core::NoteRecord)
//! from a note page snapshot.
//!
//! Each semantic field has an ordered table of sources (embedded state,
//! hover card, page selectors, class-name scan). The first source that
//! yields a usable value wins; fields nothing resolves keep their default
//! and are reported as unresolved.
//!
//! ```no_run
//! use notesync_extract::{Extractor, PageContext};
//!
//! let ctx = PageContext::new("https://www.xiaohongshu.com/explore/64a1b2c3d4e5f60718293a4b", "<html>...</html>");
//! let record = Extractor::from_env().extract(&ctx);
//! println!("{} by {}: {} likes", record.title, record.author, record.likes);
//! ```

pub mod content;
pub mod extractor;
pub mod fields;
pub mod hover;
pub mod page;
pub mod resolver;
pub mod session;
pub mod state;

pub use extractor::Extractor;
pub use hover::{attach_hover_card, capture_hover_card, poll_until, HoverOptions, HoverProbe, SnapshotProbe};
pub use page::PageContext;
pub use resolver::{first_resolved, Source};
pub use session::{NavigationOutcome, PageSession, SessionState};
