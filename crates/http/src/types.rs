//! Request and response types for the Gather REST API
//!
//! The backend is not consistent about field names across endpoints (`id` vs
//! `gatheringId`, `imageUrl` vs `thumbnailUrl`, bare arrays vs paged
//! envelopes). Responses with that kind of drift are read as JSON values and
//! normalized here, taking the first present spelling of each field.

use chrono::{DateTime, Utc};
use gather_core::UserId;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

/// Body of login and reissue responses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
}

/// Email/password login
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gender {
    Male,
    Female,
}

/// Account creation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub nickname: String,
    pub age: u32,
    pub gender: Gender,
    pub enroll_number: u32,
    pub preferred_categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<ImageRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailVerificationRequest {
    pub email: String,
}

/// Location of an uploaded image in object storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUrlRequest {
    pub file_name: String,
    pub file_type: String,
}

/// Upload target handed out by the backend
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PresignedUpload {
    #[serde(rename = "uploadURL", alias = "uploadUrl")]
    pub upload_url: String,
    pub key: String,
    #[serde(default)]
    pub bucket: Option<String>,
}

/// Sort orders accepted by the gathering list endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatheringSort {
    Latest,
    Popular,
}

impl GatheringSort {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::Popular => "popular",
        }
    }
}

/// Filters for listing gatherings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatheringQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<GatheringSort>,
    pub category: Option<String>,
}

impl GatheringQuery {
    pub(crate) fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(sort) = self.sort {
            pairs.push(("sort", sort.as_str().to_string()));
        }
        if let Some(size) = self.size {
            pairs.push(("size", size.to_string()));
        }
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        pairs
    }
}

/// Entry of a gathering list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatheringSummary {
    pub id: i64,
    pub title: String,
    pub image_url: Option<String>,
    pub category: Option<String>,
}

impl GatheringSummary {
    pub(crate) fn from_value(value: &JsonValue) -> Option<Self> {
        let fields = Fields(value);
        Some(Self {
            id: fields.int(&["id", "gatheringId", "roomId"])?,
            title: fields.string(&["title", "name"]).unwrap_or_default(),
            image_url: fields.string(IMAGE_KEYS),
            category: fields.string(&["category", "categoryName"]),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostSummary {
    pub id: i64,
    pub nickname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: i64,
    pub nickname: String,
    pub profile_image_url: Option<String>,
    pub role: Option<String>,
    pub joined_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantsMeta {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(default)]
    pub total_elements: Option<u32>,
    #[serde(default)]
    pub sorted_by: Option<String>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Full view of one gathering
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatheringDetail {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub image_url: Option<String>,
    pub capacity: u32,
    /// Scheduled time as sent by the server (ISO 8601)
    pub date: String,
    pub location: String,
    pub host: HostSummary,
    pub participants: Vec<Participant>,
    pub participants_meta: ParticipantsMeta,
    pub open_chat_url: Option<String>,
    pub is_joined: bool,
}

impl GatheringDetail {
    pub(crate) fn from_value(value: &JsonValue, requested_id: i64) -> Self {
        let fields = Fields(value);

        let preview = value.get("participantsPreview");
        let participants: Vec<Participant> = preview
            .and_then(|p| p.get("data"))
            .and_then(JsonValue::as_array)
            .map(|list| {
                list.iter()
                    .map(|p| {
                        let p = Fields(p);
                        Participant {
                            user_id: p.int(&["userId", "id"]).unwrap_or_default(),
                            nickname: p.string(&["nickname"]).unwrap_or_default(),
                            profile_image_url: p.string(&["profileImageUrl"]),
                            role: p.string(&["role"]),
                            joined_at: p.string(&["joinedAt"]),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let participants_meta = preview
            .and_then(|p| p.get("meta"))
            .and_then(|meta| serde_json::from_value(meta.clone()).ok())
            .unwrap_or_else(|| {
                let count = u32::try_from(participants.len()).unwrap_or(u32::MAX);
                ParticipantsMeta {
                    page: Some(0),
                    size: Some(count),
                    total_elements: Some(count),
                    sorted_by: Some("joinedAt".to_string()),
                    next_cursor: None,
                }
            });

        let host = match value.get("host").filter(|h| h.is_object()) {
            Some(host) => {
                let host = Fields(host);
                HostSummary {
                    id: host.int(&["id"]).unwrap_or_default(),
                    nickname: host.string(&["nickname"]).unwrap_or_default(),
                }
            }
            None => HostSummary {
                id: fields.int(&["hostId"]).unwrap_or_default(),
                nickname: fields.string(&["hostNickname"]).unwrap_or_default(),
            },
        };

        Self {
            id: fields.int(&["id", "gatheringId"]).unwrap_or(requested_id),
            title: fields.string(&["title", "name"]).unwrap_or_default(),
            description: fields.string(&["description"]).unwrap_or_default(),
            category: fields
                .string(&["category", "categoryName"])
                .unwrap_or_default(),
            image_url: fields.string(IMAGE_KEYS),
            capacity: fields
                .int(&["capacity", "maxParticipants"])
                .and_then(|c| u32::try_from(c).ok())
                .unwrap_or_default(),
            date: fields.string(&["date", "scheduledAt"]).unwrap_or_default(),
            location: fields.string(&["location", "place"]).unwrap_or_default(),
            host,
            participants,
            participants_meta,
            open_chat_url: fields.string(&["openChatUrl", "chatUrl"]),
            is_joined: fields.bool(&["isJoined", "joined"]).unwrap_or(false),
        }
    }

    /// Parsed scheduled time, if the server sent a valid RFC 3339 timestamp
    pub fn scheduled_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.date)
            .ok()
            .map(|d| d.with_timezone(&Utc))
    }
}

/// New gathering
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGathering {
    pub title: String,
    pub category: String,
    pub capacity: u32,
    pub date: DateTime<Utc>,
    pub location: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gathering_image: Option<ImageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_chat_url: Option<String>,
}

/// Partial update of a gathering; unset fields are left unchanged
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatheringUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gathering_image: Option<ImageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_chat_url: Option<String>,
}

/// Input for generating a gathering description
#[derive(Debug, Clone, Serialize)]
pub struct IntroRequest {
    pub title: String,
    pub category: String,
    pub capacity: u32,
    pub date: DateTime<Utc>,
    pub location: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct IntroResponse {
    pub intro: String,
}

/// Which side of a gathering the current user is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatheringRole {
    Host,
    Guest,
}

impl GatheringRole {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Guest => "guest",
        }
    }
}

/// Gathering the current user hosts or joined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyGathering {
    #[serde(deserialize_with = "int_or_string")]
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, alias = "gatheringImageUrl")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub host_name: Option<String>,
    #[serde(default)]
    pub participant_count: u32,
    #[serde(default)]
    pub capacity: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// Review left on a user's profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(deserialize_with = "int_or_string")]
    pub id: i64,
    #[serde(deserialize_with = "int_or_string")]
    pub reviewer_id: i64,
    #[serde(default)]
    pub reviewer_profile_image_url: Option<String>,
    #[serde(default)]
    pub reviewer_nickname: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewsMeta {
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub sorted_by: String,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_next: bool,
}

/// One page of reviews
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewPage {
    #[serde(default)]
    pub data: Vec<Review>,
    #[serde(default)]
    pub meta: ReviewsMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub name: String,
}

/// Public profile of a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(deserialize_with = "user_id")]
    pub id: UserId,
    #[serde(default)]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub enroll_number: Option<u32>,
    #[serde(default)]
    pub preferred_categories: Vec<CategoryRef>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default = "default_true")]
    pub reviews_public: bool,
    #[serde(default)]
    pub reviews_preview: ReviewPage,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReviewSettingRequest {
    pub reviews_public: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct CategoriesResponse {
    #[serde(default)]
    pub categories: Vec<String>,
}

const IMAGE_KEYS: &[&str] = &["imageUrl", "thumbnailUrl", "mainImageUrl", "image"];

/// Pull the list out of a gathering listing, whatever envelope it came in
pub(crate) fn extract_list(value: JsonValue) -> Vec<JsonValue> {
    match value {
        JsonValue::Array(items) => items,
        JsonValue::Object(mut map) => ["content", "items", "data", "records", "results"]
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(JsonValue::Array(items)) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// First-present-wins accessor over a loosely shaped JSON object
struct Fields<'a>(&'a JsonValue);

impl Fields<'_> {
    fn first(&self, keys: &[&str]) -> Option<&JsonValue> {
        keys.iter()
            .filter_map(|key| self.0.get(*key))
            .find(|v| !v.is_null())
    }

    fn string(&self, keys: &[&str]) -> Option<String> {
        self.first(keys).and_then(|v| match v {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    fn int(&self, keys: &[&str]) -> Option<i64> {
        self.first(keys).and_then(parse_int)
    }

    fn bool(&self, keys: &[&str]) -> Option<bool> {
        self.first(keys).map(|v| match v {
            JsonValue::Bool(b) => *b,
            JsonValue::Number(n) => n.as_i64().is_some_and(|n| n != 0),
            JsonValue::String(s) => !s.is_empty(),
            _ => false,
        })
    }
}

fn parse_int(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => {
            let s = s.trim();
            s.strip_prefix("gath_").unwrap_or(s).parse().ok()
        }
        _ => None,
    }
}

fn int_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = JsonValue::deserialize(deserializer)?;
    parse_int(&value).ok_or_else(|| serde::de::Error::custom(format!("expected an id, got {value}")))
}

fn user_id<'de, D>(deserializer: D) -> Result<UserId, D::Error>
where
    D: Deserializer<'de>,
{
    int_or_string(deserializer).map(UserId)
}
