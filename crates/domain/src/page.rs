// crates/domain/src/page.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};

pub const DEFAULT_STATUS: &str = "In Progress";
pub const STATUS_OPTIONS: [&str; 3] = ["Not Started", "In Progress", "Done"];

const UNTITLED: &str = "Untitled";
const NO_STATUS: &str = "No Status";

/// The `Name` + `Status` property pair the page forms work with.
///
/// Callers that need other schemas send raw property JSON instead; the relay
/// forwards that untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageProperties {
    pub title: String,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    DEFAULT_STATUS.to_owned()
}

impl PageProperties {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status: default_status(),
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Upstream property JSON for the `Name`/`Status` schema.
    pub fn to_upstream(&self) -> Json {
        json!({
            "Name": { "title": [{ "text": { "content": self.title } }] },
            "Status": { "status": { "name": self.status } },
        })
    }

    /// Read the pair back out of an upstream page object.
    pub fn from_page(page: &Json) -> Self {
        Self {
            title: page_title(page).unwrap_or_default().to_owned(),
            status: page
                .pointer("/properties/Status/status/name")
                .and_then(Json::as_str)
                .unwrap_or(DEFAULT_STATUS)
                .to_owned(),
        }
    }
}

/// Read-only listing view of an upstream page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSummary {
    pub id: String,
    pub title: String,
    pub status: String,
    pub created_time: Option<DateTime<Utc>>,
    pub last_edited_time: Option<DateTime<Utc>>,
    pub archived: bool,
}

impl PageSummary {
    pub fn from_page(page: &Json) -> Self {
        Self {
            id: str_at(page, "/id").unwrap_or_default().to_owned(),
            title: page_title(page).unwrap_or(UNTITLED).to_owned(),
            status: str_at(page, "/properties/Status/status/name")
                .unwrap_or(NO_STATUS)
                .to_owned(),
            created_time: time_at(page, "/created_time"),
            last_edited_time: time_at(page, "/last_edited_time"),
            archived: page
                .get("archived")
                .and_then(Json::as_bool)
                .unwrap_or(false),
        }
    }

    /// Summaries for every page in a collection query result.
    pub fn from_query(result: &Json) -> Vec<Self> {
        result
            .get("results")
            .and_then(Json::as_array)
            .map(|pages| pages.iter().map(Self::from_page).collect())
            .unwrap_or_default()
    }
}

/// Title from `Name`, falling back to the default `title` property.
fn page_title(page: &Json) -> Option<&str> {
    str_at(page, "/properties/Name/title/0/plain_text")
        .or_else(|| str_at(page, "/properties/title/title/0/plain_text"))
}

fn str_at<'a>(value: &'a Json, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Json::as_str)
}

fn time_at(value: &Json, pointer: &str) -> Option<DateTime<Utc>> {
    str_at(value, pointer)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_serialize_to_name_status_schema() {
        let props = PageProperties::new("Groceries").with_status("Done");
        assert_eq!(
            props.to_upstream(),
            json!({
                "Name": { "title": [{ "text": { "content": "Groceries" } }] },
                "Status": { "status": { "name": "Done" } }
            })
        );
    }

    #[test]
    fn summary_reads_title_status_and_times() {
        let page = json!({
            "id": "p1",
            "created_time": "2024-03-01T10:00:00.000Z",
            "last_edited_time": "2024-03-02T11:30:00.000Z",
            "archived": false,
            "properties": {
                "Name": { "title": [{ "plain_text": "Trip notes" }] },
                "Status": { "status": { "name": "Not Started" } }
            }
        });
        let s = PageSummary::from_page(&page);
        assert_eq!(s.id, "p1");
        assert_eq!(s.title, "Trip notes");
        assert_eq!(s.status, "Not Started");
        assert_eq!(
            s.created_time.map(|t| t.to_rfc3339()),
            Some("2024-03-01T10:00:00+00:00".to_owned())
        );
        assert!(!s.archived);
    }

    #[test]
    fn summary_falls_back_for_missing_properties() {
        let s = PageSummary::from_page(&json!({ "id": "p2", "properties": {} }));
        assert_eq!(s.title, "Untitled");
        assert_eq!(s.status, "No Status");
        assert_eq!(s.created_time, None);

        let s = PageSummary::from_page(&json!({
            "properties": { "title": { "title": [{ "plain_text": "Default schema" }] } }
        }));
        assert_eq!(s.title, "Default schema");
    }

    #[test]
    fn properties_from_page_default_status() {
        let props = PageProperties::from_page(&json!({ "properties": {} }));
        assert_eq!(props, PageProperties::new(""));
    }

    #[test]
    fn from_query_tolerates_missing_results() {
        assert!(PageSummary::from_query(&json!({})).is_empty());
        let pages = PageSummary::from_query(&json!({ "results": [{ "id": "a" }, { "id": "b" }] }));
        assert_eq!(pages.len(), 2);
    }
}
