//! Collaborators around the segmentation core.
//!
//! Each submodule owns one concern the core treats as an input or output.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ category ──▶ images ──▶ [segment] ──▶ publish
//! (URL/path) (pdfium)   (header      (image ids)              (sinks)
//!                        regions)
//! ```
//!
//! 1. [`input`]   : resolve a path or URL to a local PDF, read the issue
//!    number off its name
//! 2. [`extract`] : pdfium text layer per logical page; runs in
//!    `spawn_blocking` and splits spreads
//! 3. [`category`]: the running section name of each page
//! 4. [`images`]  : image references attached verbatim to articles
//! 5. [`publish`] : where finished articles go

pub mod category;
pub mod extract;
pub mod images;
pub mod input;
pub mod publish;
