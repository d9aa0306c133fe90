// ABOUTME: Domain model for the content block system: block kinds, property shapes,
// ABOUTME: metadata, versions, references, and the query/request types used by the API

use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::{AppError, Result};

// Block kinds and properties

/// Closed set of block kinds. Adding a kind means extending this enum,
/// `BlockProperties`, and every structural match over them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    Page,
    Section,
    Container,
    Heading,
    Paragraph,
    Image,
    Video,
    Form,
    Input,
    Select,
    Button,
    DynamicList,
    CustomComponent,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Page => "page",
            BlockKind::Section => "section",
            BlockKind::Container => "container",
            BlockKind::Heading => "heading",
            BlockKind::Paragraph => "paragraph",
            BlockKind::Image => "image",
            BlockKind::Video => "video",
            BlockKind::Form => "form",
            BlockKind::Input => "input",
            BlockKind::Select => "select",
            BlockKind::Button => "button",
            BlockKind::DynamicList => "dynamic-list",
            BlockKind::CustomComponent => "custom-component",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "page" => Ok(BlockKind::Page),
            "section" => Ok(BlockKind::Section),
            "container" => Ok(BlockKind::Container),
            "heading" => Ok(BlockKind::Heading),
            "paragraph" => Ok(BlockKind::Paragraph),
            "image" => Ok(BlockKind::Image),
            "video" => Ok(BlockKind::Video),
            "form" => Ok(BlockKind::Form),
            "input" => Ok(BlockKind::Input),
            "select" => Ok(BlockKind::Select),
            "button" => Ok(BlockKind::Button),
            "dynamic-list" => Ok(BlockKind::DynamicList),
            "custom-component" => Ok(BlockKind::CustomComponent),
            other => Err(AppError::Validation(format!("unknown block type: {other}"))),
        }
    }
}

/// Kind-specific block content. The `type` tag determines the shape of
/// `properties`, so malformed payloads are rejected at deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "properties", rename_all = "kebab-case")]
pub enum BlockProperties {
    Page(PageProps),
    Section(SectionProps),
    Container(ContainerProps),
    Heading(HeadingProps),
    Paragraph(ParagraphProps),
    Image(ImageProps),
    Video(VideoProps),
    Form(FormProps),
    Input(InputProps),
    Select(SelectProps),
    Button(ButtonProps),
    DynamicList(DynamicListProps),
    CustomComponent(CustomComponentProps),
}

impl BlockProperties {
    pub fn kind(&self) -> BlockKind {
        match self {
            BlockProperties::Page(_) => BlockKind::Page,
            BlockProperties::Section(_) => BlockKind::Section,
            BlockProperties::Container(_) => BlockKind::Container,
            BlockProperties::Heading(_) => BlockKind::Heading,
            BlockProperties::Paragraph(_) => BlockKind::Paragraph,
            BlockProperties::Image(_) => BlockKind::Image,
            BlockProperties::Video(_) => BlockKind::Video,
            BlockProperties::Form(_) => BlockKind::Form,
            BlockProperties::Input(_) => BlockKind::Input,
            BlockProperties::Select(_) => BlockKind::Select,
            BlockProperties::Button(_) => BlockKind::Button,
            BlockProperties::DynamicList(_) => BlockKind::DynamicList,
            BlockProperties::CustomComponent(_) => BlockKind::CustomComponent,
        }
    }

    /// Rebuilds typed content from the stored `type` column and properties blob.
    pub fn from_parts(block_type: &str, properties: serde_json::Value) -> Result<Self> {
        serde_json::from_value(json!({ "type": block_type, "properties": properties }))
            .map_err(|err| AppError::Validation(format!("invalid {block_type} properties: {err}")))
    }

    /// The properties payload alone, for the JSON column.
    pub fn props_json(&self) -> Result<serde_json::Value> {
        let mut value = serde_json::to_value(self)?;
        match value.as_object_mut().and_then(|obj| obj.remove("properties")) {
            Some(props) => Ok(props),
            None => Ok(json!({})),
        }
    }

    /// Semantic checks beyond what the type structure enforces.
    pub fn validate(&self) -> Result<()> {
        match self {
            BlockProperties::Page(props) => {
                if props.slug.is_empty() {
                    return Err(AppError::Validation("page slug must not be empty".into()));
                }
                if props.locale.is_empty() {
                    return Err(AppError::Validation("page locale must not be empty".into()));
                }
                if props.title.is_empty() {
                    return Err(AppError::Validation("page title must not be empty".into()));
                }
            }
            BlockProperties::Heading(props) => {
                if !(1..=6).contains(&props.level) {
                    return Err(AppError::Validation(format!(
                        "heading level must be between 1 and 6, got {}",
                        props.level
                    )));
                }
            }
            BlockProperties::Image(props) => {
                if props.dimensions.width == 0 || props.dimensions.height == 0 {
                    return Err(AppError::Validation(
                        "image dimensions must be non-zero".into(),
                    ));
                }
            }
            BlockProperties::Form(props) => {
                if props.identifier.is_empty() {
                    return Err(AppError::Validation(
                        "form identifier must not be empty".into(),
                    ));
                }
                if props.fields.iter().any(|field| field.name.is_empty()) {
                    return Err(AppError::Validation(
                        "form field names must not be empty".into(),
                    ));
                }
            }
            BlockProperties::DynamicList(props) => {
                if props.source.is_empty() {
                    return Err(AppError::Validation(
                        "dynamic list source must not be empty".into(),
                    ));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageProps {
    pub slug: String,
    pub locale: String,
    pub title: String,
    pub description: Option<String>,
    pub status: PageStatus,
    pub published_at: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Draft,
    Published,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionProps {
    pub identifier: Option<String>,
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerProps {
    pub identifier: Option<String>,
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadingProps {
    pub text: String,
    pub level: u8,
    pub identifier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParagraphProps {
    pub content: String,
    pub format: TextFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextFormat {
    Plain,
    Markdown,
    Html,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageProps {
    pub src: String,
    pub alt: String,
    pub caption: Option<String>,
    pub dimensions: Dimensions,
    pub metadata: Option<ImageMetadata>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub size: u64,
    pub mime_type: String,
    pub original_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoProps {
    pub src: String,
    #[serde(rename = "type")]
    pub source_type: VideoSourceType,
    pub poster: Option<String>,
    pub metadata: Option<VideoMetadata>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoSourceType {
    Upload,
    Embed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub duration: f64,
    pub size: Option<u64>,
    pub provider: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormProps {
    pub identifier: String,
    pub action: String,
    pub method: FormMethod,
    pub fields: Vec<FormField>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormMethod {
    #[serde(rename = "GET")]
    Get,
    #[serde(rename = "POST")]
    Post,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    #[serde(rename = "type")]
    pub field_type: FormFieldType,
    pub name: String,
    pub label: String,
    pub required: bool,
    pub validation: Option<FieldValidation>,
    pub default_value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormFieldType {
    Input,
    Select,
    Checkbox,
    Textarea,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValidation {
    #[serde(rename = "type")]
    pub rule: ValidationRule,
    pub pattern: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub custom_validation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationRule {
    String,
    Number,
    Email,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputProps {
    pub name: String,
    pub label: String,
    pub required: bool,
    pub placeholder: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectProps {
    pub name: String,
    pub label: String,
    pub required: bool,
    pub options: Vec<SelectOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonProps {
    pub label: String,
    pub action: Option<String>,
    pub variant: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicListProps {
    pub source_type: DynamicSourceType,
    pub source: String,
    pub filter: Option<serde_json::Value>,
    pub limit: Option<u32>,
    pub template: Box<BlockProperties>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DynamicSourceType {
    Api,
    Collection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomComponentProps {
    pub component_id: String,
    pub props: serde_json::Value,
}

// Domain objects

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub id: Uuid,
    #[serde(flatten)]
    pub content: BlockProperties,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,
    pub metadata: BlockMetadata,
}

/// Navigational back-reference to the owning block. Never an ownership relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRef {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub block_type: BlockKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockMetadata {
    pub created_at: i64,
    pub updated_at: i64,
    pub created_by: String,
    pub updated_by: String,
    pub version: i32,
    pub workspace: String,
    pub environment: Environment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Draft,
    Published,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Draft => "draft",
            Environment::Published => "published",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(Environment::Draft),
            "published" => Ok(Environment::Published),
            other => Err(AppError::Validation(format!("unknown environment: {other}"))),
        }
    }
}

/// Immutable snapshot of a block at a specific version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockVersion {
    pub block_id: Uuid,
    pub version: i32,
    pub content: ContentBlock,
    pub metadata: VersionMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionMetadata {
    pub created_at: i64,
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub workspace: String,
}

/// Recorded pointer from one block to another for reuse and audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockReference {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub ref_type: ReferenceType,
    pub source_id: Uuid,
    pub source_version: i32,
    pub metadata: ReferenceMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceType {
    Reference,
    Copy,
}

impl ReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::Reference => "reference",
            ReferenceType::Copy => "copy",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "reference" => Ok(ReferenceType::Reference),
            "copy" => Ok(ReferenceType::Copy),
            other => Err(AppError::Validation(format!(
                "unknown reference type: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceMetadata {
    pub created_at: i64,
    pub created_by: String,
    pub workspace: String,
}

// Query types

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockQuery {
    pub workspace: String,
    pub environment: Option<Environment>,
    #[serde(rename = "type")]
    pub block_type: Option<Vec<BlockKind>>,
    pub tags: Option<Vec<String>>,
    pub locale: Option<String>,
    pub created_by: Option<String>,
    pub created_after: Option<String>,
    pub created_before: Option<String>,
    pub full_text: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort: Option<SortSpec>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub order: SortOrder,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    Version,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockListResult {
    pub items: Vec<ContentBlock>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub has_more: bool,
}

// API request types

#[derive(Debug, Deserialize)]
pub struct CreateBlockRequest {
    #[serde(flatten)]
    pub content: BlockProperties,
    pub parent_id: Option<Uuid>,
    pub tags: Option<Vec<String>>,
    pub locale: Option<String>,
    pub workspace: String,
    // created_by comes from the authenticated claims, not from the request
}

#[derive(Debug, Default, Deserialize)]
pub struct BlockUpdate {
    #[serde(rename = "type")]
    pub block_type: Option<BlockKind>,
    pub properties: Option<serde_json::Value>,
    pub environment: Option<Environment>,
    pub tags: Option<Vec<String>>,
    pub locale: Option<String>,
    /// Compare-and-swap guard: the update is rejected when the stored
    /// version no longer matches.
    pub expected_version: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBlockRequest {
    #[serde(flatten)]
    pub updates: BlockUpdate,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReferenceRequest {
    #[serde(rename = "type")]
    pub ref_type: ReferenceType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_kind_round_trips_through_strings() {
        for kind in [
            BlockKind::Page,
            BlockKind::DynamicList,
            BlockKind::CustomComponent,
        ] {
            assert_eq!(BlockKind::parse(kind.as_str()).unwrap(), kind);
        }
        assert!(BlockKind::parse("carousel").is_err());
    }

    #[test]
    fn properties_deserialize_by_type_tag() {
        let content: BlockProperties = serde_json::from_value(serde_json::json!({
            "type": "heading",
            "properties": { "text": "Hello", "level": 1, "identifier": null }
        }))
        .unwrap();
        assert_eq!(content.kind(), BlockKind::Heading);
    }

    #[test]
    fn mismatched_properties_are_rejected() {
        // Image properties under the heading tag must not parse.
        let result = BlockProperties::from_parts(
            "heading",
            serde_json::json!({ "src": "/a.png", "alt": "a" }),
        );
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn heading_level_out_of_range_fails_validation() {
        let content = BlockProperties::Heading(HeadingProps {
            text: "too deep".into(),
            level: 9,
            identifier: None,
        });
        assert!(matches!(content.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn props_json_strips_the_type_tag() {
        let content = BlockProperties::Paragraph(ParagraphProps {
            content: "body".into(),
            format: TextFormat::Markdown,
        });
        let props = content.props_json().unwrap();
        assert_eq!(props["content"], "body");
        assert!(props.get("type").is_none());
    }
}
