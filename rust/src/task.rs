//! Wire types for the profile and daily-task responses, plus the rating
//! payload. Ids are kept in whichever JSON form the server used so they are
//! echoed back unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Literal `customTags` value the rating endpoint expects: `[]`, percent-encoded.
pub const EMPTY_CUSTOM_TAGS: &str = "%5B%5D";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Number(u64),
    Text(String),
}

impl fmt::Display for WireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireId::Number(n) => write!(f, "{n}"),
            WireId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProfileEnvelope {
    pub profile: Option<Profile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub nickname: String,
}

#[derive(Debug, Deserialize)]
pub struct TaskEnvelope {
    pub data: TaskStatus,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaskStatus {
    pub id: WireId,
    #[serde(rename = "count")]
    pub total_count: u32,
    #[serde(rename = "completedCount")]
    pub completed_count: u32,
    #[serde(rename = "works", default)]
    pub items: Vec<WorkItem>,
}

impl TaskStatus {
    pub fn is_complete(&self) -> bool {
        self.completed_count == self.total_count
    }

    /// `[completed/total]`
    pub fn progress(&self) -> String {
        format!("[{}/{}]", self.completed_count, self.total_count)
    }
}

#[derive(Debug, Deserialize)]
struct RawWorkEntry {
    work: RawWork,
    completed: bool,
    #[serde(default)]
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWork {
    id: WireId,
    name: String,
    author_name: String,
}

/// One song awaiting (or already given) a rating.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawWorkEntry")]
pub struct WorkItem {
    pub id: WireId,
    pub name: String,
    pub author_name: String,
    pub already_completed: bool,
    pub prior_score: Option<f64>,
}

impl From<RawWorkEntry> for WorkItem {
    fn from(raw: RawWorkEntry) -> Self {
        Self {
            id: raw.work.id,
            name: raw.work.name,
            author_name: raw.work.author_name,
            already_completed: raw.completed,
            prior_score: raw.score,
        }
    }
}

impl WorkItem {
    /// `"name" by author`, the label used in log lines.
    pub fn label(&self) -> String {
        format!("\"{}\" by {}", self.name, self.author_name)
    }
}

/// Star rating and tag for an unrated item: 4 when the name or author holds an
/// ASCII letter, otherwise 3.
pub fn score_and_tag(item: &WorkItem) -> (u8, String) {
    let has_letter = item
        .name
        .chars()
        .chain(item.author_name.chars())
        .any(|c| c.is_ascii_alphabetic());
    let score = if has_letter { 4 } else { 3 };
    (score, format!("{score}-A-1"))
}

/// Plaintext of a rating request before encryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionPayload {
    #[serde(rename = "taskId")]
    pub task_id: WireId,
    #[serde(rename = "workId")]
    pub work_id: WireId,
    pub score: String,
    pub tags: String,
    #[serde(rename = "customTags")]
    pub custom_tags: String,
    pub comment: String,
    #[serde(rename = "syncYunCircle")]
    pub sync_circle: String,
    pub csrf_token: String,
}

impl SubmissionPayload {
    pub fn new(task_id: &WireId, item: &WorkItem, score: u8, tags: String, csrf: &str) -> Self {
        Self {
            task_id: task_id.clone(),
            work_id: item.id.clone(),
            score: score.to_string(),
            tags,
            custom_tags: EMPTY_CUSTOM_TAGS.to_string(),
            comment: String::new(),
            sync_circle: "true".to_string(),
            csrf_token: csrf.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RatingResponse {
    pub code: i64,
}

#[cfg(test)]
mod tests {
    use super::{score_and_tag, SubmissionPayload, TaskEnvelope, WireId, WorkItem};
    use serde_json::json;

    fn item(name: &str, author: &str) -> WorkItem {
        WorkItem {
            id: WireId::Number(7),
            name: name.to_string(),
            author_name: author.to_string(),
            already_completed: false,
            prior_score: None,
        }
    }

    #[test]
    fn parses_task_status() {
        let body = json!({
            "code": 200,
            "data": {
                "id": 1001,
                "count": 3,
                "completedCount": 1,
                "works": [
                    {"work": {"id": 1, "name": "Song", "authorName": "Band"}, "completed": true, "score": 4.0},
                    {"work": {"id": "2", "name": "歌", "authorName": "歌手"}, "completed": false, "score": null}
                ]
            }
        });
        let status = serde_json::from_value::<TaskEnvelope>(body).unwrap().data;
        assert_eq!(status.id, WireId::Number(1001));
        assert_eq!(status.progress(), "[1/3]");
        assert!(!status.is_complete());
        assert_eq!(status.items.len(), 2);
        assert_eq!(status.items[0].prior_score, Some(4.0));
        assert!(status.items[0].already_completed);
        assert_eq!(status.items[1].id, WireId::Text("2".to_string()));
        assert_eq!(status.items[1].label(), "\"歌\" by 歌手");
    }

    #[test]
    fn latin_names_score_four() {
        assert_eq!(score_and_tag(&item("Test", "Artist")), (4, "4-A-1".to_string()));
        assert_eq!(score_and_tag(&item("测试", "x")), (4, "4-A-1".to_string()));
    }

    #[test]
    fn non_latin_names_score_three() {
        assert_eq!(score_and_tag(&item("测试", "歌手")), (3, "3-A-1".to_string()));
        assert_eq!(score_and_tag(&item("123", "Ψυχή")), (3, "3-A-1".to_string()));
    }

    #[test]
    fn payload_uses_wire_field_names() {
        let payload = SubmissionPayload::new(&WireId::Number(1001), &item("Test", "A"), 4, "4-A-1".into(), "tok");
        assert_eq!(
            serde_json::to_string(&payload).unwrap(),
            r#"{"taskId":1001,"workId":7,"score":"4","tags":"4-A-1","customTags":"%5B%5D","comment":"","syncYunCircle":"true","csrf_token":"tok"}"#
        );
    }
}
