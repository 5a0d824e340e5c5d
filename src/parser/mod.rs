pub mod fields;
pub mod flatten;
pub mod record;

use tracing::warn;

use crate::error::PipelineError;
use fields::Layout;
use record::{RawPost, TechnologyRecord};

/// Three-step pipeline for one post: HTML → text fragments → fields → record.
///
/// A body with no visible text is logged and extracted as empty; only a
/// missing envelope field fails the document.
pub fn process_post(post: &RawPost, layout: Layout) -> Result<TechnologyRecord, PipelineError> {
    let fragments = flatten::flatten(post.body());
    if fragments.is_empty() {
        let err = PipelineError::MalformedDocument { id: post.id };
        warn!("{}", err);
    }
    let extracted = fields::extract(&fragments, layout);
    record::build(post, extracted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(body: &str) -> RawPost {
        serde_json::from_value(serde_json::json!({
            "id": 10,
            "date_gmt": "2022-03-01T10:00:00",
            "modified_gmt": "2022-03-02T10:00:00",
            "slug": "tec",
            "link": "https://ufcinova.ufc.br/tec/",
            "title": { "rendered": "Tec" },
            "content": { "rendered": body }
        }))
        .unwrap()
    }

    #[test]
    fn fixture_post_end_to_end() {
        let html = std::fs::read_to_string("tests/fixtures/tecnologia.html").unwrap();
        let r = process_post(&post(&html), Layout::default()).unwrap();
        assert_eq!(r.status.as_deref(), Some("Vigente"));
        assert_eq!(r.inventors, vec!["Maria Silva", "João Souza"]);
        assert_eq!(r.contacts.len(), 2);
    }

    #[test]
    fn textless_body_builds_empty_record() {
        let r = process_post(&post("<div><img src=\"a.png\"></div>"), Layout::default()).unwrap();
        assert!(r.benefits.is_empty());
        assert_eq!(r.status, None);
        assert_eq!(r.department, None);
        assert!(r.contacts.is_empty());
    }

    #[test]
    fn missing_slug_fails_document() {
        let mut p = post("<p>Status Vigente.</p>");
        p.slug = None;
        assert!(matches!(
            process_post(&p, Layout::default()),
            Err(PipelineError::MissingEnvelopeField { id: Some(10), field: "slug" })
        ));
    }
}
