use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum EscapeError {
    #[error("range {start}..{end} is out of bounds for a document of length {len}")]
    #[diagnostic(code(weaver_escape::rewrite::out_of_bounds))]
    OutOfBounds { start: usize, end: usize, len: usize },

    #[error("range {start}..{end} does not fall on character boundaries")]
    #[diagnostic(code(weaver_escape::rewrite::char_boundary))]
    NotCharBoundary { start: usize, end: usize },

    #[error("overwrite of {start}..{end} overlaps an earlier overwrite")]
    #[diagnostic(code(weaver_escape::rewrite::overlap))]
    OverlappingEdit { start: usize, end: usize },

    #[error("<{tag}> opened at byte {offset} is never closed")]
    #[diagnostic(
        code(weaver_escape::parse::unclosed_element),
        help("close the element with </{tag}> or make it self-closing")
    )]
    UnclosedElement {
        tag: String,
        offset: usize,
        #[label("opened here")]
        span: SourceSpan,
        #[source_code]
        src: String,
    },
}

#[derive(Debug, Error, Diagnostic)]
pub enum ProcessError {
    #[error("{kind} processor failed: {message}")]
    #[diagnostic(code(weaver_escape::process::backend))]
    Backend { kind: &'static str, message: String },

    #[error("no {kind} processor is configured")]
    #[diagnostic(code(weaver_escape::process::unsupported))]
    Unsupported { kind: &'static str },
}
