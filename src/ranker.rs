use chrono::{Local, NaiveDate};
use std::cmp::Ordering;

use crate::models::Posting;
use crate::prefs::Preferences;
use crate::scoring::score_on;
use crate::tags::ensure_tags;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPosting {
    pub posting: Posting,
    pub score: f64,
}

pub fn rank(postings: &[Posting], prefs: &Preferences) -> Vec<ScoredPosting> {
    rank_on(postings, prefs, Local::now().date_naive())
}

/// Tags, scores and orders postings by descending score. Equal scores keep
/// their input order.
pub fn rank_on(postings: &[Posting], prefs: &Preferences, today: NaiveDate) -> Vec<ScoredPosting> {
    let mut scored: Vec<ScoredPosting> = postings
        .iter()
        .cloned()
        .map(|mut posting| {
            ensure_tags(&mut posting);
            let score = score_on(&posting, prefs, today);
            ScoredPosting { posting, score }
        })
        .collect();

    // sort_by is stable; only a strictly greater score moves a posting ahead
    scored.sort_by(|a, b| {
        if b.score > a.score {
            Ordering::Greater
        } else if a.score > b.score {
            Ordering::Less
        } else {
            Ordering::Equal
        }
    });
    scored
}

/// Hard filters for the profile's exclusion settings, applied before ranking.
pub fn apply_filters(postings: &[Posting], prefs: &Preferences) -> Vec<Posting> {
    let excluded: Vec<String> = prefs
        .excluded_locations
        .iter()
        .filter(|l| !l.is_empty())
        .map(|l| l.to_lowercase())
        .collect();

    postings
        .iter()
        .filter(|p| {
            let location = p.location.to_lowercase();
            !excluded.iter().any(|l| location.contains(l.as_str()))
        })
        .filter(|p| !prefs.remote_only || p.remote.unwrap_or(false))
        .cloned()
        .collect()
}
