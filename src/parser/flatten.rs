use scraper::{Html, Node};

/// Elements whose text content is never rendered.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Flatten an HTML body into its visible text nodes, in document order.
///
/// Each fragment is trimmed; whitespace-only nodes are dropped. The parser is
/// html5ever, so malformed markup never fails: unclosed tags are closed,
/// stray end tags are ignored, and text split across broken tags may come out
/// merged or split differently than the author intended.
pub fn flatten(html: &str) -> Vec<String> {
    let fragment = Html::parse_fragment(html);
    let root = fragment.root_element();

    let mut out = Vec::new();
    for node in root.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| HIDDEN_ELEMENTS.contains(&e.name()))
        });
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            out.push(trimmed.to_string());
        }
    }
    out
}
