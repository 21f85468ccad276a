//! Zendesk wire types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Numeric identifier of a Zendesk custom field.
pub type FieldId = u64;

/// A ticket as returned by the search endpoint.
///
/// `created_at` is required. A hit without a parseable timestamp fails the
/// decode of its whole page, which in turn fails the aggregation, rather than
/// being dropped silently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTicket {
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subject: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub group_id: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub custom_fields: CustomFields,
}

/// One custom-field entry on a ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomField {
    pub id: FieldId,
    #[serde(default)]
    pub value: Value,
}

/// Ordered custom-field entries, looked up by field id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomFields(Vec<CustomField>);

impl CustomFields {
    pub fn new(fields: Vec<CustomField>) -> Self {
        Self(fields)
    }

    /// First entry carrying `field_id`.
    pub fn get(&self, field_id: FieldId) -> Option<&CustomField> {
        self.0.iter().find(|f| f.id == field_id)
    }

    /// Text form of the value stored under `field_id`, `None` when the field is
    /// missing or null.
    pub fn text(&self, field_id: FieldId) -> Option<String> {
        self.get(field_id).and_then(|f| value_text(&f.value))
    }

    pub fn iter(&self) -> impl Iterator<Item = &CustomField> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<CustomField> for CustomFields {
    fn from_iter<I: IntoIterator<Item = CustomField>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Render a custom-field value the way it is compared against office codes.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<RawTicket>,
    /// Cursor for the following page; absent on the last page.
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl SearchPage {
    /// The next cursor, treating an empty string like a missing one.
    pub fn next_cursor(&self) -> Option<&str> {
        self.next_page.as_deref().filter(|url| !url.is_empty())
    }
}

/// A Zendesk group (department).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: u64,
    /// Display name, empty when Zendesk omits it.
    pub name: String,
}

/// Body of `GET /groups/{id}.json`.
#[derive(Debug, Deserialize)]
pub(crate) struct GroupEnvelope {
    #[serde(default)]
    pub group: Option<GroupRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GroupRecord {
    #[serde(default)]
    pub name: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
