//! Handing hidden snippet content to external renderers.
//!
//! Each snippet is processed independently, so a whole document's snippets
//! are processed concurrently and re-joined by ID afterwards.

use std::future::Future;

use futures_util::future::join_all;
use pulldown_cmark_escape::escape_html;
use tracing::{debug, instrument, warn};

use crate::config::{EscapeConfig, VerbatimKind};
use crate::error::ProcessError;
use crate::snippet::{
    CodeOptions, EscapableSnippet, FrontmatterOptions, MathOptions, ProcessedSnippet,
    ProcessorOptions, SnippetId, VerbatimOptions,
};
use crate::tags::opening_tag_len;

/// Renderer backends for each kind of processable content.
pub trait SnippetProcessor: Sync {
    /// Highlight a code span or block.
    fn code(
        &self,
        content: &str,
        options: &CodeOptions,
    ) -> impl Future<Output = Result<String, ProcessError>> + Send;

    /// Render TeX math.
    fn math(
        &self,
        content: &str,
        options: &MathOptions,
    ) -> impl Future<Output = Result<String, ProcessError>> + Send;

    fn frontmatter(
        &self,
        content: &str,
        options: &FrontmatterOptions,
    ) -> impl Future<Output = Result<String, ProcessError>> + Send;

    /// Compile the body of a `tex` verbatim environment.
    fn tex(
        &self,
        content: &str,
        options: &VerbatimOptions,
    ) -> impl Future<Output = Result<String, ProcessError>> + Send;
}

/// Hands every snippet's content back unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl SnippetProcessor for Passthrough {
    async fn code(&self, content: &str, _: &CodeOptions) -> Result<String, ProcessError> {
        Ok(content.to_owned())
    }

    async fn math(&self, content: &str, _: &MathOptions) -> Result<String, ProcessError> {
        Ok(content.to_owned())
    }

    async fn frontmatter(
        &self,
        content: &str,
        _: &FrontmatterOptions,
    ) -> Result<String, ProcessError> {
        Ok(content.to_owned())
    }

    async fn tex(&self, content: &str, _: &VerbatimOptions) -> Result<String, ProcessError> {
        Ok(content.to_owned())
    }
}

/// Process one snippet. Snippets with nothing to process yield their
/// original text.
pub async fn process_snippet<P: SnippetProcessor>(
    processor: &P,
    snippet: &EscapableSnippet,
    config: &EscapeConfig,
) -> Result<String, ProcessError> {
    let Some(processable) = &snippet.processable else {
        return Ok(snippet.outer_content().to_owned());
    };
    let content = processable.inner_content.as_str();
    match &processable.options_for_processor {
        ProcessorOptions::Code(options) => processor.code(content, options).await,
        ProcessorOptions::Math(options) => processor.math(content, options).await,
        ProcessorOptions::Frontmatter(options) => processor.frontmatter(content, options).await,
        ProcessorOptions::Verbatim(options) => {
            let kind = config
                .verbatim
                .get(&options.tag)
                .map(|environment| environment.kind)
                .unwrap_or_default();
            match kind {
                VerbatimKind::Code => {
                    let code_options = CodeOptions {
                        inline: options.inline,
                        lang: options.attributes.get("lang").map(ToString::to_string),
                        meta: None,
                    };
                    processor.code(content, &code_options).await
                }
                VerbatimKind::Tex => processor.tex(content, options).await,
                VerbatimKind::Escape => escape_verbatim(content, options),
                VerbatimKind::Noop => Ok(snippet.outer_content().to_owned()),
            }
        }
    }
}

/// Keep the element, HTML-escape its body and neutralise braces.
fn escape_verbatim(content: &str, options: &VerbatimOptions) -> Result<String, ProcessError> {
    if options.self_closing {
        return Ok(options.outer_content.clone());
    }
    let backend = |err: std::fmt::Error| ProcessError::Backend {
        kind: "escape",
        message: err.to_string(),
    };
    let opening_len = opening_tag_len(&options.outer_content).unwrap_or_default();
    let mut out = String::with_capacity(options.outer_content.len() + content.len());
    out.push_str(&options.outer_content[..opening_len]);
    let mut body = String::with_capacity(content.len());
    escape_html(&mut body, content).map_err(backend)?;
    for c in body.chars() {
        match c {
            '{' => out.push_str("&lbrace;"),
            '}' => out.push_str("&rbrace;"),
            c => out.push(c),
        }
    }
    out.push_str("</");
    out.push_str(&options.tag);
    out.push('>');
    Ok(out)
}

/// Process all snippets concurrently, in escape order.
///
/// A snippet whose processor fails falls back to its original text.
#[instrument(skip_all, fields(snippets = snippets.len()))]
pub async fn process_snippets<P: SnippetProcessor>(
    processor: &P,
    snippets: &[(SnippetId, EscapableSnippet)],
    config: &EscapeConfig,
) -> Vec<(SnippetId, ProcessedSnippet)> {
    let results = join_all(
        snippets
            .iter()
            .map(|(_, snippet)| process_snippet(processor, snippet, config)),
    )
    .await;

    let mut failed = 0usize;
    let processed = snippets
        .iter()
        .zip(results)
        .map(|((id, snippet), result)| {
            let processed = result.unwrap_or_else(|err| {
                failed += 1;
                warn!(
                    id = %id,
                    kind = %snippet.kind,
                    error = %err,
                    "snippet processing failed, keeping original text"
                );
                snippet.outer_content().to_owned()
            });
            (
                id.clone(),
                ProcessedSnippet {
                    processed,
                    unescape_options: snippet.unescape_options,
                },
            )
        })
        .collect();
    debug!(failed, "processed snippets");
    processed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VerbatimEnvironment;
    use crate::escape::escape;

    struct Upper;

    impl SnippetProcessor for Upper {
        async fn code(&self, content: &str, options: &CodeOptions) -> Result<String, ProcessError> {
            Ok(format!("{}:{}", options.lang.as_deref().unwrap_or("-"), content.to_uppercase()))
        }

        async fn math(&self, _: &str, _: &MathOptions) -> Result<String, ProcessError> {
            Err(ProcessError::Unsupported { kind: "math" })
        }

        async fn frontmatter(
            &self,
            content: &str,
            _: &FrontmatterOptions,
        ) -> Result<String, ProcessError> {
            Ok(content.len().to_string())
        }

        async fn tex(
            &self,
            content: &str,
            options: &VerbatimOptions,
        ) -> Result<String, ProcessError> {
            Ok(format!("tex@{}:{}", options.line_offset, content.trim()))
        }
    }

    fn config() -> EscapeConfig {
        EscapeConfig::default()
            .with_verbatim("Code", VerbatimEnvironment::defaults_for(VerbatimKind::Code))
            .with_verbatim("Tex", VerbatimEnvironment::defaults_for(VerbatimKind::Tex))
            .with_verbatim("Esc", VerbatimEnvironment::defaults_for(VerbatimKind::Escape))
            .with_verbatim("Raw", VerbatimEnvironment::defaults_for(VerbatimKind::Noop))
    }

    async fn run(doc: &str) -> Vec<String> {
        let config = config();
        let escaped = escape(doc, &config);
        process_snippets(&Upper, &escaped.snippets, &config)
            .await
            .into_iter()
            .map(|(_, p)| p.processed)
            .collect()
    }

    #[tokio::test]
    async fn dispatches_by_kind() {
        let doc = "`a` {b} $c$ <Code lang=\"rs\">d</Code> <Raw>{e}</Raw>\n\n<Tex>\nf\n</Tex>";
        let out = run(doc).await;
        assert_eq!(
            out,
            vec!["-:A", "{b}", "$c$", "rs:D", "<Raw>{e}</Raw>", "tex@3:f"]
        );
    }

    #[tokio::test]
    async fn escape_environment_escapes_body() {
        let out = run("<Esc class=\"x\">a<b> {c}</Esc>").await;
        assert_eq!(out, vec!["<Esc class=\"x\">a&lt;b&gt; &lbrace;c&rbrace;</Esc>"]);
    }

    #[tokio::test]
    async fn passthrough_returns_inner_content() {
        let config = EscapeConfig::default();
        let escaped = escape("x `y` z", &config);
        let processed = process_snippets(&Passthrough, &escaped.snippets, &config).await;
        assert_eq!(processed.len(), 1);
        assert_eq!(processed[0].1.processed, "y");
        assert_eq!(processed[0].0, escaped.snippets[0].0);
    }
}
