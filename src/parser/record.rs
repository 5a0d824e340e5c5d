use serde::{Deserialize, Serialize};

use super::fields::ExtractedFields;
use crate::error::PipelineError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Rendered {
    #[serde(default)]
    pub rendered: Option<String>,
}

/// One post as returned by the WordPress REST API. Every field is optional
/// here so that a missing one is reported per document instead of failing
/// the whole page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPost {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: Option<Rendered>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub date_gmt: Option<String>,
    #[serde(default)]
    pub modified_gmt: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub content: Option<Rendered>,
}

impl RawPost {
    pub fn body(&self) -> &str {
        self.content
            .as_ref()
            .and_then(|c| c.rendered.as_deref())
            .unwrap_or("")
    }
}

/// Metadata taken as-is from the post, checked for presence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub publish_date: String,
    pub modified_date: String,
    pub link: String,
}

impl TryFrom<&RawPost> for Envelope {
    type Error = PipelineError;

    fn try_from(post: &RawPost) -> Result<Self, Self::Error> {
        let id = post.id;
        let require = |value: Option<&String>, field: &'static str| {
            value
                .cloned()
                .ok_or(PipelineError::MissingEnvelopeField { id, field })
        };

        Ok(Envelope {
            id: id.ok_or(PipelineError::MissingEnvelopeField { id, field: "id" })?,
            title: require(
                post.title.as_ref().and_then(|t| t.rendered.as_ref()),
                "title",
            )?,
            slug: require(post.slug.as_ref(), "slug")?,
            publish_date: require(post.date_gmt.as_ref(), "date_gmt")?,
            modified_date: require(post.modified_gmt.as_ref(), "modified_gmt")?,
            link: require(post.link.as_ref(), "link")?,
        })
    }
}

/// A technology as published in the output file. Field names follow the
/// portal's Portuguese vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnologyRecord {
    pub id: i64,
    #[serde(rename = "titulo")]
    pub title: String,
    pub slug: String,
    #[serde(rename = "data_publicacao")]
    pub publish_date: String,
    #[serde(rename = "data_ultima_modificacao")]
    pub modified_date: String,
    #[serde(rename = "link_post_tecnologia")]
    pub source_link: String,
    pub status: Option<String>,
    pub trl: Option<String>,
    #[serde(rename = "beneficios", default)]
    pub benefits: Vec<String>,
    #[serde(rename = "descricao", default)]
    pub description: Vec<String>,
    #[serde(rename = "pessoas_inventoras", default)]
    pub inventors: Vec<String>,
    #[serde(rename = "departamento")]
    pub department: Option<String>,
    #[serde(rename = "contatos", default)]
    pub contacts: Vec<String>,
}

impl TechnologyRecord {
    pub fn new(envelope: Envelope, fields: ExtractedFields) -> Self {
        TechnologyRecord {
            id: envelope.id,
            title: envelope.title,
            slug: envelope.slug,
            publish_date: envelope.publish_date,
            modified_date: envelope.modified_date,
            source_link: envelope.link,
            status: fields.status,
            trl: fields.trl,
            benefits: fields.benefits,
            description: fields.description,
            inventors: fields.inventors,
            department: fields.department,
            contacts: fields.contacts,
        }
    }
}

/// Combine a post's envelope with its extracted fields.
pub fn build(post: &RawPost, fields: ExtractedFields) -> Result<TechnologyRecord, PipelineError> {
    let envelope = Envelope::try_from(post)?;
    Ok(TechnologyRecord::new(envelope, fields))
}
