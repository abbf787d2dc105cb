use std::sync::LazyLock;

use regex::Regex;

use super::{block_padding, logic_block_padding, trim_one};
use crate::config::{DoubleDollarDisplay, EscapeConfig};
use crate::lines::LineIndex;
use crate::padding::Padding;
use crate::parse::{Node, NodeKind};
use crate::snippet::{
    CodeOptions, EscapableSnippet, FrontmatterOptions, MathOptions, ProcessorOptions, SnippetType,
};

static LOGIC_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[#/](?:if|each|await|key)|:(?:else|then|catch)|@)").expect("valid regex")
});
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*@html").expect("valid regex"));

/// Snippets for the nodes of one parse, at most one per node.
pub fn snippets(
    nodes: &[Node],
    document: &str,
    lines: &LineIndex,
    config: &EscapeConfig,
) -> Vec<EscapableSnippet> {
    nodes
        .iter()
        .filter_map(|node| classify(node, document, lines, config))
        .collect()
}

fn classify(
    node: &Node,
    document: &str,
    lines: &LineIndex,
    config: &EscapeConfig,
) -> Option<EscapableSnippet> {
    let loc = node.loc;
    match &node.kind {
        NodeKind::InlineCode => Some(EscapableSnippet::processable(
            SnippetType::Code,
            document,
            loc,
            node.value.as_str(),
            ProcessorOptions::Code(CodeOptions {
                inline: true,
                ..Default::default()
            }),
            Padding::from(false),
            false,
        )),
        NodeKind::Code { lang, meta } => Some(EscapableSnippet::processable(
            SnippetType::Code,
            document,
            loc,
            node.value.as_str(),
            ProcessorOptions::Code(CodeOptions {
                inline: false,
                lang: lang.clone(),
                meta: meta.clone(),
            }),
            block_padding(lines, loc),
            true,
        )),
        NodeKind::Math { double_dollar } => {
            if !double_dollar && !config.math.single_dollar {
                return None;
            }
            let display = *double_dollar
                && is_display(node, lines, config.math.double_dollar_signs_display);
            Some(EscapableSnippet::processable(
                SnippetType::Math,
                document,
                loc,
                trim_one(&node.value),
                ProcessorOptions::Math(MathOptions { inline: !display }),
                Padding::from(if display { 2usize } else { 0 }),
                display,
            ))
        }
        NodeKind::Expression => {
            if LOGIC_BLOCK.is_match(&node.value) && !HTML_TAG.is_match(&node.value) {
                Some(EscapableSnippet::passthrough(
                    SnippetType::Svelte,
                    document,
                    loc,
                    logic_block_padding(lines, loc),
                    true,
                ))
            } else if config.directives.absorbs(document, loc, &node.value) {
                None
            } else {
                Some(EscapableSnippet::passthrough(
                    SnippetType::MustacheTag,
                    document,
                    loc,
                    Padding::from(false),
                    false,
                ))
            }
        }
        NodeKind::Frontmatter { kind } => Some(EscapableSnippet::processable(
            SnippetType::Frontmatter,
            document,
            loc,
            node.value.as_str(),
            ProcessorOptions::Frontmatter(FrontmatterOptions { kind: *kind }),
            block_padding(lines, loc),
            true,
        )),
        NodeKind::Html => None,
    }
}

fn is_display(node: &Node, lines: &LineIndex, policy: DoubleDollarDisplay) -> bool {
    let own_lines = || {
        lines.before(node.loc.start).trim().is_empty()
            && lines.after(node.loc.end).trim().is_empty()
    };
    let value = node.value.as_str();
    let fenced_content =
        (value.starts_with('\n') || value.starts_with("\r\n")) && value.ends_with('\n');
    match policy {
        DoubleDollarDisplay::Always => true,
        DoubleDollarDisplay::Newline => own_lines(),
        DoubleDollarDisplay::Fenced => own_lines() && fenced_content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MathSettings;
    use crate::parse::parse;
    use crate::snippet::Offset;

    fn classify_doc(doc: &str, config: &EscapeConfig) -> Vec<EscapableSnippet> {
        let nodes = parse(doc, &[], &[]).unwrap();
        snippets(&nodes, doc, &LineIndex::new(doc), config)
    }

    fn with_policy(policy: DoubleDollarDisplay) -> EscapeConfig {
        EscapeConfig {
            math: MathSettings {
                double_dollar_signs_display: policy,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn inline_code_span() {
        let snippets = classify_doc("a `code` b", &EscapeConfig::default());
        assert_eq!(snippets.len(), 1);
        let snippet = &snippets[0];
        assert_eq!(snippet.kind, SnippetType::Code);
        assert_eq!(snippet.loc(), Offset::new(2, 8));
        let processable = snippet.processable.as_ref().unwrap();
        assert_eq!(processable.inner_content, "code");
        assert!(matches!(
            processable.options_for_processor,
            ProcessorOptions::Code(CodeOptions { inline: true, .. })
        ));
        assert!(!snippet.unescape_options.remove_paragraph_tag);
    }

    #[test]
    fn double_dollar_always_is_display() {
        let snippets = classify_doc("a$$b$$c", &with_policy(DoubleDollarDisplay::Always));
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].escape_options.pad, Some(Padding::from(2usize)));
        assert!(snippets[0].unescape_options.remove_paragraph_tag);
    }

    #[test]
    fn double_dollar_mid_line_stays_inline_under_newline_policy() {
        let snippets = classify_doc("a$$b$$c", &with_policy(DoubleDollarDisplay::Newline));
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].escape_options.pad, Some(Padding::from(0usize)));
        assert!(!snippets[0].unescape_options.remove_paragraph_tag);
    }

    #[test]
    fn fenced_policy_needs_content_on_its_own_lines() {
        let config = with_policy(DoubleDollarDisplay::Fenced);
        let fenced = classify_doc("$$\nx^2\n$$", &config);
        assert!(fenced[0].unescape_options.remove_paragraph_tag);
        assert_eq!(fenced[0].processable.as_ref().unwrap().inner_content, "x^2");

        let same_line = classify_doc("$$x^2$$", &config);
        assert!(!same_line[0].unescape_options.remove_paragraph_tag);
        assert!(classify_doc("$$x^2$$", &with_policy(DoubleDollarDisplay::Newline))[0]
            .unescape_options
            .remove_paragraph_tag);
    }

    #[test]
    fn single_dollar_can_be_disabled() {
        let mut config = EscapeConfig::default();
        config.math.single_dollar = false;
        assert!(classify_doc("cost $x$ here", &config).is_empty());
        assert_eq!(classify_doc("cost $x$ here", &EscapeConfig::default()).len(), 1);
    }

    #[test]
    fn expressions_split_into_logic_blocks_and_mustaches() {
        let doc = "{#if ok}\n\nhi {name} and {@html raw}\n\n{/if}";
        let kinds: Vec<_> = classify_doc(doc, &EscapeConfig::default())
            .iter()
            .map(|s| s.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                SnippetType::Svelte,
                SnippetType::MustacheTag,
                SnippetType::MustacheTag,
                SnippetType::Svelte
            ]
        );
    }

    #[test]
    fn every_logic_block_form_is_passed_through() {
        for expression in [
            "{#if a}", "{:else}", "{:else if b}", "{/if}", "{#each xs as x}", "{/each}",
            "{#await p}", "{:then v}", "{:catch e}", "{/await}", "{#key k}", "{/key}",
            "{@const y = 2}", "{@debug y}", "{ #if spaced}",
        ] {
            let snippets = classify_doc(expression, &EscapeConfig::default());
            assert_eq!(snippets.len(), 1, "{expression}");
            assert_eq!(snippets[0].kind, SnippetType::Svelte, "{expression}");
            assert!(snippets[0].unescape_options.remove_paragraph_tag, "{expression}");
        }
        for expression in ["{@html x}", "{ifx}", "{else}", "{: else}"] {
            let snippets = classify_doc(expression, &EscapeConfig::default());
            assert_eq!(snippets[0].kind, SnippetType::MustacheTag, "{expression}");
        }
    }

    #[test]
    fn directive_braces_are_skipped_when_enabled() {
        let doc = "a :abbr[x]{title=y} b";
        assert_eq!(classify_doc(doc, &EscapeConfig::default()).len(), 1);
        let config = EscapeConfig {
            directives: crate::config::DirectiveSettings::enabled(),
            ..Default::default()
        };
        assert!(classify_doc(doc, &config).is_empty());
    }

    #[test]
    fn fenced_code_block_options() {
        let doc = "intro\n```js title=x\nlet a;\n```\nouttro";
        let snippets = classify_doc(doc, &EscapeConfig::default());
        assert_eq!(snippets.len(), 1);
        let snippet = &snippets[0];
        assert!(snippet.unescape_options.remove_paragraph_tag);
        assert_eq!(snippet.escape_options.pad, Some(Padding::from(("\n", 1usize))));
        let processable = snippet.processable.as_ref().unwrap();
        assert_eq!(processable.inner_content, "let a;");
        assert_eq!(
            processable.options_for_processor,
            ProcessorOptions::Code(CodeOptions {
                inline: false,
                lang: Some("js".into()),
                meta: Some("title=x".into()),
            })
        );
    }
}
