use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Posting {
    pub id: String,
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub posted_at: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source: String, // stamped by the adapter that fetched it
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub salary_min: Option<i64>,
    #[serde(default)]
    pub salary_max: Option<i64>,
    #[serde(default)]
    pub work_type: Option<String>, // "full-time", "contract", ...
    #[serde(default)]
    pub seniority: Option<String>,
    #[serde(default)]
    pub remote: Option<bool>,
    #[serde(default)]
    pub hybrid: Option<bool>,
}

impl Posting {
    /// Dedup identity: `(source, id)` is unique across all sources.
    pub fn key(&self) -> (&str, &str) {
        (&self.source, &self.id)
    }

    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }

    pub fn tag_list(&self) -> &[String] {
        self.tags.as_deref().unwrap_or(&[])
    }

    /// Best-known compensation figure: upper bound, then lower bound, then zero.
    pub fn best_salary(&self) -> i64 {
        self.salary_max.or(self.salary_min).unwrap_or(0)
    }

    pub fn is_remote_or_hybrid(&self) -> bool {
        self.remote.unwrap_or(false) || self.hybrid.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEvent {
    pub posting_id: String,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub liked: bool,
    pub notes: String,
    pub tags: Vec<String>,
    pub title: String, // denormalized for display
}

impl FeedbackEvent {
    pub fn new(posting: &Posting, liked: bool, notes: &str, tags: &[String]) -> Self {
        Self {
            posting_id: posting.id.clone(),
            source: posting.source.clone(),
            timestamp: Utc::now(),
            liked,
            notes: notes.to_string(),
            tags: tags.to_vec(),
            title: posting.title.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) fn posting(source: &str, id: &str, title: &str) -> Posting {
    Posting {
        id: id.to_string(),
        title: title.to_string(),
        company: "Acme Analytics".to_string(),
        location: String::new(),
        url: format!("https://jobs.example.com/{}/{}", source, id),
        posted_at: None,
        description: None,
        source: source.to_string(),
        tags: None,
        salary_min: None,
        salary_max: None,
        work_type: None,
        seniority: None,
        remote: None,
        hybrid: None,
    }
}
