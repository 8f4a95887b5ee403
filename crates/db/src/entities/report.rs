//! Report entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Report categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[sea_orm(string_value = "sanitation")]
    Sanitation,
    #[sea_orm(string_value = "public_works")]
    PublicWorks,
    #[sea_orm(string_value = "transportation")]
    Transportation,
    #[sea_orm(string_value = "parks_recreation")]
    ParksRecreation,
    #[sea_orm(string_value = "water_sewer")]
    WaterSewer,
    #[sea_orm(string_value = "other")]
    Other,
}

impl Category {
    /// Parse a category from its wire representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sanitation" => Some(Self::Sanitation),
            "public_works" => Some(Self::PublicWorks),
            "transportation" => Some(Self::Transportation),
            "parks_recreation" => Some(Self::ParksRecreation),
            "water_sewer" => Some(Self::WaterSewer),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    /// Wire representation of the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sanitation => "sanitation",
            Self::PublicWorks => "public_works",
            Self::Transportation => "transportation",
            Self::ParksRecreation => "parks_recreation",
            Self::WaterSewer => "water_sewer",
            Self::Other => "other",
        }
    }
}

/// Report severities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[sea_orm(string_value = "low")]
    Low,
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "high")]
    High,
    #[sea_orm(string_value = "critical")]
    Critical,
}

impl Severity {
    /// Parse a severity from its wire representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Wire representation of the severity.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// Report lifecycle statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[sea_orm(string_value = "reported")]
    Reported,
    #[sea_orm(string_value = "acknowledged")]
    Acknowledged,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "resolved")]
    Resolved,
    #[sea_orm(string_value = "closed")]
    Closed,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl Status {
    /// Parse a status from its wire representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "reported" => Some(Self::Reported),
            "acknowledged" => Some(Self::Acknowledged),
            "in_progress" => Some(Self::InProgress),
            "resolved" => Some(Self::Resolved),
            "closed" => Some(Self::Closed),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Wire representation of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reported => "reported",
            Self::Acknowledged => "acknowledged",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
            Self::Rejected => "rejected",
        }
    }

    /// Terminal statuses accept no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Rejected)
    }

    /// Statuses a report in this state may transition to.
    ///
    /// Non-terminal states are permissive (any other state, including
    /// backwards moves); terminal states accept nothing.
    #[must_use]
    pub fn allowed_targets(self) -> Vec<Self> {
        if self.is_terminal() {
            return Vec::new();
        }
        vec![
            Self::Reported,
            Self::Acknowledged,
            Self::InProgress,
            Self::Resolved,
            Self::Closed,
            Self::Rejected,
        ]
    }
}

/// Media attachment types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Image,
    Video,
    Audio,
}

impl MediaType {
    /// Derive the media type from a MIME content type.
    #[must_use]
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let main = content_type.split('/').next().unwrap_or("");
        match main {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            "audio" => Some(Self::Audio),
            _ => None,
        }
    }
}

/// A stored media attachment reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAttachment {
    /// Attachment type.
    pub media_type: MediaType,
    /// Durable URL in the media store.
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "report")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub category: Category,

    pub severity: Severity,

    pub status: Status,

    /// Latitude in degrees
    pub latitude: f64,

    /// Longitude in degrees
    pub longitude: f64,

    /// Human-readable location name
    pub location_name: String,

    /// Media attachments as `[{mediaType, url}]`
    #[sea_orm(column_type = "JsonBinary")]
    pub media: Json,

    /// Owning user ID
    #[sea_orm(indexed)]
    pub user_id: String,

    /// Upvote count (denormalized, maintained atomically)
    #[sea_orm(default_value = 0)]
    pub upvote_count: i32,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Decode the media attachments column.
    #[must_use]
    pub fn attachments(&self) -> Vec<MediaAttachment> {
        serde_json::from_value(self.media.clone()).unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,

    #[sea_orm(has_many = "super::report_history::Entity")]
    History,

    #[sea_orm(has_many = "super::upvote::Entity")]
    Upvotes,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::report_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::History.def()
    }
}

impl Related<super::upvote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Upvotes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminality() {
        assert!(Status::Closed.is_terminal());
        assert!(Status::Rejected.is_terminal());
        assert!(!Status::Reported.is_terminal());
        assert!(!Status::Resolved.is_terminal());
    }

    #[test]
    fn test_terminal_states_have_no_targets() {
        assert!(Status::Closed.allowed_targets().is_empty());
        assert!(Status::Rejected.allowed_targets().is_empty());
    }

    #[test]
    fn test_non_terminal_states_are_permissive() {
        let targets = Status::InProgress.allowed_targets();
        assert_eq!(targets.len(), 6);
        assert!(targets.contains(&Status::Reported)); // backwards moves allowed
        assert!(targets.contains(&Status::Rejected));
    }

    #[test]
    fn test_enum_wire_roundtrip() {
        for status in [
            Status::Reported,
            Status::Acknowledged,
            Status::InProgress,
            Status::Resolved,
            Status::Closed,
            Status::Rejected,
        ] {
            assert_eq!(Status::parse(status.as_str()), Some(status));
        }
        assert_eq!(Category::parse("public_works"), Some(Category::PublicWorks));
        assert_eq!(Category::parse("potholes"), None);
        assert_eq!(Severity::parse("critical"), Some(Severity::Critical));
    }

    #[test]
    fn test_media_type_from_content_type() {
        assert_eq!(
            MediaType::from_content_type("image/jpeg"),
            Some(MediaType::Image)
        );
        assert_eq!(
            MediaType::from_content_type("video/mp4"),
            Some(MediaType::Video)
        );
        assert_eq!(
            MediaType::from_content_type("audio/ogg"),
            Some(MediaType::Audio)
        );
        assert_eq!(MediaType::from_content_type("application/pdf"), None);
    }

    #[test]
    fn test_attachments_decode() {
        let model = Model {
            id: "r1".to_string(),
            title: "Pothole".to_string(),
            description: "Deep pothole on Main St".to_string(),
            category: Category::PublicWorks,
            severity: Severity::High,
            status: Status::Reported,
            latitude: 40.0,
            longitude: -74.0,
            location_name: "Main St".to_string(),
            media: serde_json::json!([{"mediaType": "image", "url": "/media/ab/x.jpg"}]),
            user_id: "u1".to_string(),
            upvote_count: 0,
            created_at: chrono::Utc::now().into(),
            updated_at: None,
        };

        let attachments = model.attachments();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].media_type, MediaType::Image);
    }
}
