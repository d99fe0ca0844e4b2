//! The segmentation core: pure, synchronous, no I/O.
//!
//! ## Data Flow
//!
//! ```text
//! PageInput ──▶ classify ──▶ signals ──▶ assemble ──▶ normalize ──▶ Article
//!  (spans)      (roles)     (headlines,   (state      (prose)
//!                            markers)      machine)
//! ```
//!
//! 1. [`classify`] : label each span as headline, start marker, end marker
//!    or body using the [`crate::LayoutProfile`] thresholds
//! 2. [`signals`]  : fold a page's roles onto the lists carried from the
//!    previous pages of an open article
//! 3. [`assemble`] : the page-at-a-time state machine deciding when an
//!    article opens, continues, closes or is force-flushed
//! 4. [`normalize`]: re-join print-wrapped lines of the accumulated raw
//!    text between the anchoring start marker and the end glyph
//!
//! Nothing here suspends, logs above `warn!`, or touches the file system;
//! the issue driver in [`crate::issue`] owns all of that.

pub mod assemble;
pub mod classify;
pub mod normalize;
pub mod signals;

pub use assemble::{AccumulationState, ArticleAssembler, AssemblerState, PageOutcome, Step};
pub use classify::SpanClassifier;
pub use normalize::{Normalization, TextNormalizer};
pub use signals::SignalExtractor;
