use anyhow::{Result, anyhow};
use tracing::{debug, info};

use crate::learner::apply_feedback;
use crate::models::{FeedbackEvent, Posting};
use crate::prefs::{PreferenceEdit, Preferences};
use crate::ranker::{ScoredPosting, apply_filters, rank};
use crate::sources::{Registry, SearchTicket, SearchTracker, SourceConfig, aggregate};
use crate::store::{
    FEEDBACK_LOG_KEY, PREFERENCES_KEY, RESULTS_KEY, SAVED_KEY, SOURCES_KEY, Store,
};

/// Owns the profile and the displayed result set, and persists every change.
pub struct Dashboard {
    store: Store,
    prefs: Preferences,
    results: Vec<Posting>,
    searches: SearchTracker,
}

impl Dashboard {
    pub fn load(store: Store) -> Self {
        let prefs = store.load(PREFERENCES_KEY, Preferences::default());
        let results = store.load(RESULTS_KEY, Vec::new());
        Self {
            store,
            prefs,
            results,
            searches: SearchTracker::default(),
        }
    }

    pub fn prefs(&self) -> &Preferences {
        &self.prefs
    }

    pub fn results(&self) -> &[Posting] {
        &self.results
    }

    pub fn ranked(&self) -> Vec<ScoredPosting> {
        rank(&apply_filters(&self.results, &self.prefs), &self.prefs)
    }

    // --- Searching ---

    pub fn begin_search(&self) -> SearchTicket {
        self.searches.begin()
    }

    /// Replaces the result set unless a newer search has started since
    /// `ticket` was issued. Returns whether the results were applied.
    pub fn apply_results(&mut self, ticket: SearchTicket, postings: Vec<Posting>) -> Result<bool> {
        if !self.searches.is_current(ticket) {
            debug!(count = postings.len(), "discarding results from a superseded search");
            return Ok(false);
        }
        self.store.save(RESULTS_KEY, &postings)?;
        self.results = postings;
        Ok(true)
    }

    pub async fn search(&mut self, query: &str, location: &str) -> Result<usize> {
        let registry = Registry::from_configs(&self.sources());
        let ticket = self.begin_search();
        let postings = aggregate(query, location, &registry).await;
        let count = postings.len();
        self.apply_results(ticket, postings)?;
        Ok(count)
    }

    // --- Lookups ---

    pub fn find(&self, id: &str, source: Option<&str>) -> Result<Posting> {
        let mut matches = self.results.iter().filter(|p| {
            p.id == id && source.is_none_or(|s| p.source.eq_ignore_ascii_case(s))
        });
        let first = matches
            .next()
            .ok_or_else(|| anyhow!("Posting '{}' not found in current results", id))?;
        if matches.next().is_some() {
            return Err(anyhow!(
                "Posting '{}' exists in several sources; pass --source to pick one",
                id
            ));
        }
        Ok(first.clone())
    }

    // --- Feedback and edits ---

    pub fn submit_feedback(
        &mut self,
        posting: &Posting,
        liked: bool,
        notes: &str,
        tags: &[String],
    ) -> Result<FeedbackEvent> {
        let mut log: Vec<FeedbackEvent> = self
            .store
            .load_existing(FEEDBACK_LOG_KEY)?
            .unwrap_or_default();
        let next = apply_feedback(&self.prefs, posting, liked, notes, tags);
        let event = FeedbackEvent::new(posting, liked, notes, tags);
        log.push(event.clone());

        self.store.save_all(&[
            (PREFERENCES_KEY, serde_json::to_value(&next)?),
            (FEEDBACK_LOG_KEY, serde_json::to_value(&log)?),
        ])?;
        self.prefs = next;

        info!(id = %posting.id, source = %posting.source, liked, "feedback recorded");
        Ok(event)
    }

    pub fn edit_preferences(&mut self, edit: PreferenceEdit) -> Result<()> {
        let next = self.prefs.with_edit(edit);
        self.replace_preferences(next)
    }

    pub fn replace_preferences(&mut self, prefs: Preferences) -> Result<()> {
        self.store.save(PREFERENCES_KEY, &prefs)?;
        self.prefs = prefs;
        Ok(())
    }

    pub fn feedback_log(&self) -> Vec<FeedbackEvent> {
        self.store.load(FEEDBACK_LOG_KEY, Vec::new())
    }

    // --- Saved postings ---

    pub fn saved(&self) -> Vec<Posting> {
        self.store.load(SAVED_KEY, Vec::new())
    }

    fn saved_for_update(&self) -> Result<Vec<Posting>> {
        Ok(self.store.load_existing(SAVED_KEY)?.unwrap_or_default())
    }

    /// Returns false if the posting was already saved.
    pub fn save_posting(&self, posting: &Posting) -> Result<bool> {
        let mut saved = self.saved_for_update()?;
        if saved.iter().any(|p| p.key() == posting.key()) {
            return Ok(false);
        }
        saved.push(posting.clone());
        self.store.save(SAVED_KEY, &saved)?;
        Ok(true)
    }

    pub fn unsave_posting(&self, id: &str, source: Option<&str>) -> Result<bool> {
        let mut saved = self.saved_for_update()?;
        let before = saved.len();
        saved.retain(|p| !(p.id == id && source.is_none_or(|s| p.source.eq_ignore_ascii_case(s))));
        if saved.len() == before {
            return Ok(false);
        }
        self.store.save(SAVED_KEY, &saved)?;
        Ok(true)
    }

    // --- Source registry ---

    pub fn sources(&self) -> Vec<SourceConfig> {
        self.store.load(SOURCES_KEY, Vec::new())
    }

    pub fn set_sources(&self, sources: &[SourceConfig]) -> Result<()> {
        self.store.save(SOURCES_KEY, sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::posting;
    use crate::sources::SourceKind;
    use std::io::Write;

    fn dashboard() -> Dashboard {
        Dashboard::load(Store::open_in_memory().unwrap())
    }

    #[test]
    fn test_fresh_dashboard_uses_defaults() {
        let dash = dashboard();
        assert_eq!(dash.prefs(), &Preferences::default());
        assert!(dash.results().is_empty());
        assert!(dash.feedback_log().is_empty());
        assert!(dash.sources().is_empty());
    }

    #[test]
    fn test_superseded_search_results_are_discarded() {
        let mut dash = dashboard();
        let older = dash.begin_search();
        let newer = dash.begin_search();

        assert!(dash.apply_results(newer, vec![posting("a", "new", "Analyst")]).unwrap());
        assert!(!dash.apply_results(older, vec![posting("a", "old", "Analyst")]).unwrap());
        assert_eq!(dash.results().len(), 1);
        assert_eq!(dash.results()[0].id, "new");
    }

    #[test]
    fn test_feedback_updates_profile_and_appends_log() {
        let mut dash = dashboard();
        let mut job = posting("a", "1", "Policy Analyst");
        job.tags = Some(vec!["policy".into(), "economics".into()]);
        let before = dash.prefs().clone();

        let event = dash
            .submit_feedback(&job, true, "want remote", &[])
            .unwrap();
        assert!(event.liked);
        assert_eq!(event.title, "Policy Analyst");

        assert!(dash.prefs().keywords.contains(&"economics".to_string()));
        assert!(dash.prefs().weights.remote > before.weights.remote);

        dash.submit_feedback(&job, false, "", &["economics".to_string()])
            .unwrap();
        let log = dash.feedback_log();
        assert_eq!(log.len(), 2);
        assert!(log[0].liked);
        assert!(!log[1].liked);
        assert_eq!(log[1].tags, vec!["economics".to_string()]);
    }

    #[test]
    fn test_unreadable_log_is_never_overwritten() {
        let mut dash = dashboard();
        dash.store.put_raw(FEEDBACK_LOG_KEY, "garbage-not-a-list").unwrap();
        let before = dash.prefs().clone();

        let job = posting("a", "1", "Policy Analyst");
        assert!(dash.submit_feedback(&job, true, "", &[]).is_err());

        assert!(dash.store.load_existing::<Vec<FeedbackEvent>>(FEEDBACK_LOG_KEY).is_err());
        assert_eq!(dash.prefs(), &before);
        assert_eq!(dash.store.load(PREFERENCES_KEY, Preferences::default()), before);
    }

    #[test]
    fn test_unreadable_saved_list_is_never_overwritten() {
        let dash = dashboard();
        dash.store.put_raw(SAVED_KEY, "{broken").unwrap();
        assert!(dash.save_posting(&posting("a", "1", "Analyst")).is_err());
        assert!(dash.unsave_posting("1", None).is_err());
        assert!(dash.store.load_existing::<Vec<Posting>>(SAVED_KEY).is_err());
    }

    #[test]
    fn test_profile_and_results_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobscout.db");

        {
            let mut dash = Dashboard::load(Store::open(Some(&path)).unwrap());
            let ticket = dash.begin_search();
            dash.apply_results(ticket, vec![posting("a", "1", "Analyst")]).unwrap();
            dash.edit_preferences(PreferenceEdit {
                locations: Some(vec!["Lisbon".into()]),
                ..Default::default()
            })
            .unwrap();
        }

        let dash = Dashboard::load(Store::open(Some(&path)).unwrap());
        assert_eq!(dash.prefs().locations, vec!["Lisbon".to_string()]);
        assert_eq!(dash.results().len(), 1);
    }

    #[test]
    fn test_ranked_applies_exclusions() {
        let mut dash = dashboard();
        let mut berlin = posting("a", "1", "Research Analyst");
        berlin.location = "Berlin".into();
        let mut rome = posting("a", "2", "Clerk");
        rome.location = "Rome".into();
        let ticket = dash.begin_search();
        dash.apply_results(ticket, vec![berlin, rome]).unwrap();

        assert_eq!(dash.ranked()[0].posting.id, "1");

        dash.edit_preferences(PreferenceEdit {
            excluded_locations: Some(vec!["berlin".into()]),
            ..Default::default()
        })
        .unwrap();
        let ranked = dash.ranked();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].posting.id, "2");
    }

    #[test]
    fn test_find_requires_source_when_ambiguous() {
        let mut dash = dashboard();
        let ticket = dash.begin_search();
        dash.apply_results(
            ticket,
            vec![posting("board", "1", "Analyst"), posting("feed", "1", "Analyst")],
        )
        .unwrap();

        assert!(dash.find("1", None).is_err());
        assert_eq!(dash.find("1", Some("feed")).unwrap().source, "feed");
        assert!(dash.find("2", None).is_err());
    }

    #[test]
    fn test_save_posting_is_deduplicated() {
        let dash = dashboard();
        let job = posting("a", "1", "Analyst");
        assert!(dash.save_posting(&job).unwrap());
        assert!(!dash.save_posting(&job).unwrap());
        assert_eq!(dash.saved().len(), 1);

        assert!(dash.unsave_posting("1", None).unwrap());
        assert!(!dash.unsave_posting("1", None).unwrap());
        assert!(dash.saved().is_empty());
    }

    #[tokio::test]
    async fn test_search_uses_configured_sources() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"[{"id": "1", "title": "Survey Methodologist", "company": "Stats Office"},
                 {"id": "2", "title": "Chef", "company": "Bistro"}]"#,
        )
        .unwrap();

        let mut dash = dashboard();
        dash.set_sources(&[SourceConfig {
            name: "local".into(),
            enabled: true,
            kind: SourceKind::File {
                path: file.path().to_path_buf(),
            },
        }])
        .unwrap();

        let count = dash.search("survey", "").await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(dash.results()[0].source, "local");
    }
}
