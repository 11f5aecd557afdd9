use chrono::{Local, NaiveDate};

use crate::models::Posting;
use crate::prefs::{Factor, Preferences};

pub const RECENCY_WINDOW_DAYS: i64 = 21;

/// Age assumed for postings with no date. Far outside the recency window.
pub const UNKNOWN_AGE_DAYS: i64 = 9999;

/// Per-factor contributions for one posting. The score is their sum.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Breakdown {
    pub parts: Vec<(Factor, f64)>,
}

impl Breakdown {
    pub fn total(&self) -> f64 {
        self.parts.iter().map(|(_, v)| v).sum()
    }

    #[allow(dead_code)]
    pub fn get(&self, factor: Factor) -> f64 {
        self.parts
            .iter()
            .find(|(f, _)| *f == factor)
            .map(|(_, v)| *v)
            .unwrap_or(0.0)
    }
}

#[allow(dead_code)]
pub fn score(posting: &Posting, prefs: &Preferences) -> f64 {
    score_on(posting, prefs, Local::now().date_naive())
}

pub fn score_on(posting: &Posting, prefs: &Preferences, today: NaiveDate) -> f64 {
    breakdown_on(posting, prefs, today).total()
}

pub fn breakdown_on(posting: &Posting, prefs: &Preferences, today: NaiveDate) -> Breakdown {
    let w = &prefs.weights;
    let text = format!("{} {}", posting.title, posting.description_text()).to_lowercase();
    let location = posting.location.to_lowercase();

    let keyword_hits = count_hits(&text, &prefs.keywords);
    let blocked_hits = count_hits(&text, &prefs.blocked_keywords);

    let location_match = prefs
        .locations
        .iter()
        .filter(|l| !l.trim().is_empty())
        .any(|l| location.contains(&l.to_lowercase()));

    let salary_ok = posting.best_salary() >= prefs.min_salary.unwrap_or(0);

    let work_type_ok = posting
        .work_type
        .as_ref()
        .is_some_and(|t| prefs.work_types.contains(t));

    let industry_ok = posting.tag_list().iter().any(|tag| {
        let tag = tag.to_lowercase();
        prefs
            .industries
            .iter()
            .filter(|industry| !industry.trim().is_empty())
            .any(|industry| tag.contains(&industry.to_lowercase()))
    });

    let seniority_ok = posting
        .seniority
        .as_ref()
        .is_some_and(|s| prefs.seniority.contains(s));

    let age = age_in_days(posting.posted_at, today);
    let recency = if age < RECENCY_WINDOW_DAYS {
        w.recency * (RECENCY_WINDOW_DAYS - age) as f64 / RECENCY_WINDOW_DAYS as f64
    } else {
        0.0
    };

    Breakdown {
        parts: vec![
            (Factor::KeywordMatch, keyword_hits as f64 * w.keyword_match),
            (Factor::NegativeKeyword, blocked_hits as f64 * w.negative_keyword),
            (Factor::LocationMatch, gate(location_match, w.location_match)),
            (Factor::Salary, gate(salary_ok, w.salary)),
            (Factor::WorkType, gate(work_type_ok, w.work_type)),
            (Factor::Industry, gate(industry_ok, w.industry)),
            (Factor::Seniority, gate(seniority_ok, w.seniority)),
            (Factor::Remote, gate(posting.is_remote_or_hybrid(), w.remote)),
            (Factor::Recency, recency),
        ],
    }
}

/// Whole days since posting. Future dates count as today.
pub fn age_in_days(posted_at: Option<NaiveDate>, today: NaiveDate) -> i64 {
    match posted_at {
        Some(date) => (today - date).num_days().max(0),
        None => UNKNOWN_AGE_DAYS,
    }
}

fn count_hits(lowered_text: &str, terms: &[String]) -> usize {
    terms
        .iter()
        .filter(|t| !t.trim().is_empty() && lowered_text.contains(&t.to_lowercase()))
        .count()
}

fn gate(condition: bool, weight: f64) -> f64 {
    if condition { weight } else { 0.0 }
}
