//! Escaping of code, math, templating syntax and verbatim elements so a
//! Markdown processor can run over Svelte-flavoured documents.
//!
//! The pipeline has four steps:
//!
//! 1. [`escape`] swaps every special region of the document for an opaque
//!    placeholder ID, padded so block content stays a block.
//! 2. The escaped document goes through an ordinary Markdown processor.
//! 3. [`process_snippets`] renders the hidden content of each snippet with a
//!    [`SnippetProcessor`].
//! 4. [`unescape`] splices the rendered snippets back over their IDs, dropping
//!    paragraph tags the Markdown processor wrapped around block snippets.
//!
//! ```
//! use weaver_escape::{EscapeConfig, Passthrough, escape, process_snippets, unescape};
//!
//! # futures_util::FutureExt::now_or_never(async {
//! let config = EscapeConfig::default();
//! let escaped = escape("Hello {name}, `x + 1`", &config);
//! assert_eq!(escaped.snippets.len(), 2);
//!
//! let processed = process_snippets(&Passthrough, &escaped.snippets, &config).await;
//! assert_eq!(unescape(&escaped.document, &processed), "Hello {name}, x + 1");
//! # })
//! # .expect("passthrough processing is immediately ready");
//! ```

pub mod classify;
pub mod colons;
pub mod config;
pub mod error;
pub mod escape;
pub mod lines;
pub mod padding;
pub mod parse;
pub mod processor;
pub mod ranges;
pub mod rewrite;
pub mod snippet;
pub mod tags;

pub use colons::{colon_snippets, escape_colons, unescape_colons};
pub use config::{
    BracePredicate, DirectiveSettings, DoubleDollarDisplay, EscapeConfig, MathSettings,
    VerbatimEnvironment, VerbatimKind,
};
pub use error::{EscapeError, ProcessError};
pub use escape::{Escaped, escape, escape_snippets, unescape, unescape_snippets};
pub use lines::LineIndex;
pub use padding::{Pad, Padding, pad_string};
pub use processor::{Passthrough, SnippetProcessor, process_snippet, process_snippets};
pub use ranges::outermost_ranges;
pub use snippet::{
    CodeOptions, EscapableSnippet, FrontmatterKind, FrontmatterOptions, MathOptions, Offset,
    ProcessedSnippet, ProcessorOptions, SnippetId, SnippetType, VerbatimOptions,
};
pub use tags::{AttributeValue, ParsedTag, TagMatcher, TagRegex, parse_tag};
