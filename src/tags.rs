use crate::models::Posting;

pub const MAX_TAGS: usize = 12;

/// Controlled vocabulary. Extracted tags follow this order, not the order
/// in which terms appear in the text.
pub const VOCABULARY: &[&str] = &[
    "research",
    "policy",
    "data science",
    "machine learning",
    "statistics",
    "econometrics",
    "causal inference",
    "forecasting",
    "analytics",
    "visualization",
    "python",
    "sql",
    "survey",
    "evaluation",
    "economics",
    "public health",
    "climate",
    "energy",
    "education",
    "finance",
    "government",
    "nonprofit",
    "consulting",
    "university",
    "academic",
    "startup",
    "leadership",
    "management",
    "phd",
    "remote",
    "hybrid",
];

pub fn extract_tags(title: &str, description: &str) -> Vec<String> {
    let haystack = format!("{} {}", title, description).to_lowercase();
    VOCABULARY
        .iter()
        .filter(|term| haystack.contains(*term))
        .take(MAX_TAGS)
        .map(|term| term.to_string())
        .collect()
}

/// Fills in tags for a posting that has none. Existing tags are kept as-is.
pub fn ensure_tags(posting: &mut Posting) {
    if posting.tag_list().is_empty() {
        posting.tags = Some(extract_tags(&posting.title, posting.description_text()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::posting;

    #[test]
    fn test_extract_tags_follows_vocabulary_order() {
        let tags = extract_tags(
            "Python Developer",
            "Policy team needs SQL and Research experience",
        );
        assert_eq!(tags, vec!["research", "policy", "python", "sql"]);
    }

    #[test]
    fn test_extract_tags_is_case_insensitive_and_spans_title() {
        let tags = extract_tags("MACHINE LEARNING Lead", "");
        assert_eq!(tags, vec!["machine learning"]);
    }

    #[test]
    fn test_extract_tags_caps_at_max() {
        let everything = VOCABULARY.join(" ");
        let tags = extract_tags("", &everything);
        assert_eq!(tags.len(), MAX_TAGS);
        assert_eq!(tags[0], VOCABULARY[0]);
        assert_eq!(tags[MAX_TAGS - 1], VOCABULARY[MAX_TAGS - 1]);
    }

    #[test]
    fn test_extract_tags_empty_when_nothing_matches() {
        assert!(extract_tags("Forklift Operator", "Warehouse shifts").is_empty());
    }

    #[test]
    fn test_ensure_tags_keeps_existing_tags() {
        let mut job = posting("board", "1", "Statistics Lead");
        job.tags = Some(vec!["custom".to_string()]);
        ensure_tags(&mut job);
        assert_eq!(job.tags, Some(vec!["custom".to_string()]));
    }

    #[test]
    fn test_ensure_tags_fills_missing_or_empty() {
        let mut job = posting("board", "1", "Statistics Lead");
        job.description = Some("Government evaluation unit".to_string());
        ensure_tags(&mut job);
        assert_eq!(
            job.tags,
            Some(vec![
                "statistics".to_string(),
                "evaluation".to_string(),
                "government".to_string()
            ])
        );

        let mut empty = posting("board", "2", "Econometrics Fellow");
        empty.tags = Some(Vec::new());
        ensure_tags(&mut empty);
        assert_eq!(empty.tags, Some(vec!["econometrics".to_string()]));
    }
}
