//! Placeholder detection and filling for .docx templates.
//!
//! [`detect`] turns the markers scattered through a document (`{{NAME}}`,
//! `[Party]`, `$[____]`, bare `Address:` lines ...) into named fields;
//! [`fill`] writes answers back into a copy of the same document.

pub mod arbitrate;
pub mod config;
pub mod context;
pub mod detect;
pub mod document;
pub mod docx;
pub mod error;
pub mod fill;
pub mod filter;
pub mod labels;
pub mod locator;
pub mod normalize;
pub mod patterns;
pub mod preview;
pub mod questions;
pub mod scan;
pub mod validate;
pub mod xml;

pub use config::Settings;
pub use detect::{detect, detect_with, CanonicalField, DetectionResult, PlaceholderInstance};
pub use document::{EditableDocument, ParagraphSource, RunFormat, TextDocument};
pub use docx::WordDocument;
pub use error::{DocumentError, ReplacementError, ValidationError};
pub use fill::{fill, fill_with_report, Answers, FillReport};
pub use locator::{InstanceId, ParagraphPath};
pub use normalize::normalize;
pub use patterns::PatternKind;
