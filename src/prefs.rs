use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Named scoring factors. Each one has exactly one weight in [`Weights`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Factor {
    KeywordMatch,
    NegativeKeyword,
    LocationMatch,
    Salary,
    WorkType,
    Industry,
    Seniority,
    Remote,
    Recency,
}

impl Factor {
    pub const ALL: [Factor; 9] = [
        Factor::KeywordMatch,
        Factor::NegativeKeyword,
        Factor::LocationMatch,
        Factor::Salary,
        Factor::WorkType,
        Factor::Industry,
        Factor::Seniority,
        Factor::Remote,
        Factor::Recency,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Factor::KeywordMatch => "keywordMatch",
            Factor::NegativeKeyword => "negativeKeyword",
            Factor::LocationMatch => "locationMatch",
            Factor::Salary => "salary",
            Factor::WorkType => "workType",
            Factor::Industry => "industry",
            Factor::Seniority => "seniority",
            Factor::Remote => "remote",
            Factor::Recency => "recency",
        }
    }

    pub fn parse(name: &str) -> Option<Factor> {
        Factor::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Weights {
    pub keyword_match: f64,
    pub negative_keyword: f64,
    pub location_match: f64,
    pub salary: f64,
    pub work_type: f64,
    pub industry: f64,
    pub seniority: f64,
    pub remote: f64,
    pub recency: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            keyword_match: 1.4,
            negative_keyword: -2.2,
            location_match: 1.0,
            salary: 1.2,
            work_type: 0.6,
            industry: 0.8,
            seniority: 1.0,
            remote: 0.6,
            recency: 0.8,
        }
    }
}

impl Weights {
    pub fn get(&self, factor: Factor) -> f64 {
        match factor {
            Factor::KeywordMatch => self.keyword_match,
            Factor::NegativeKeyword => self.negative_keyword,
            Factor::LocationMatch => self.location_match,
            Factor::Salary => self.salary,
            Factor::WorkType => self.work_type,
            Factor::Industry => self.industry,
            Factor::Seniority => self.seniority,
            Factor::Remote => self.remote,
            Factor::Recency => self.recency,
        }
    }

    pub fn get_mut(&mut self, factor: Factor) -> &mut f64 {
        match factor {
            Factor::KeywordMatch => &mut self.keyword_match,
            Factor::NegativeKeyword => &mut self.negative_keyword,
            Factor::LocationMatch => &mut self.location_match,
            Factor::Salary => &mut self.salary,
            Factor::WorkType => &mut self.work_type,
            Factor::Industry => &mut self.industry,
            Factor::Seniority => &mut self.seniority,
            Factor::Remote => &mut self.remote,
            Factor::Recency => &mut self.recency,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sector {
    Academia,
    Consulting,
    PublicSector,
    PrivateSector,
}

/// The user's learned taste. Replaced wholesale on every change, never patched
/// in place by the learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub keywords: Vec<String>,
    pub blocked_keywords: Vec<String>,
    pub locations: Vec<String>,
    pub excluded_locations: Vec<String>,
    pub min_salary: Option<i64>,
    pub work_types: BTreeSet<String>,
    pub industries: BTreeSet<String>,
    pub seniority: BTreeSet<String>,
    pub remote_only: bool,
    pub academia: bool,
    pub consulting: bool,
    pub public_sector: bool,
    pub private_sector: bool,
    pub weights: Weights,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            keywords: vec!["data".into(), "research".into(), "policy".into()],
            blocked_keywords: vec!["unpaid".into(), "commission only".into()],
            locations: Vec::new(),
            excluded_locations: Vec::new(),
            min_salary: None,
            work_types: BTreeSet::from(["full-time".to_string()]),
            industries: BTreeSet::new(),
            seniority: BTreeSet::new(),
            remote_only: false,
            academia: true,
            consulting: true,
            public_sector: true,
            private_sector: true,
            weights: Weights::default(),
        }
    }
}

impl Preferences {
    pub fn sector(&self, sector: Sector) -> bool {
        match sector {
            Sector::Academia => self.academia,
            Sector::Consulting => self.consulting,
            Sector::PublicSector => self.public_sector,
            Sector::PrivateSector => self.private_sector,
        }
    }

    pub fn set_sector(&mut self, sector: Sector, value: bool) {
        match sector {
            Sector::Academia => self.academia = value,
            Sector::Consulting => self.consulting = value,
            Sector::PublicSector => self.public_sector = value,
            Sector::PrivateSector => self.private_sector = value,
        }
    }

    /// Returns a copy with every field present in `edit` replaced.
    pub fn with_edit(&self, edit: PreferenceEdit) -> Preferences {
        let mut next = self.clone();
        if let Some(v) = edit.keywords {
            next.keywords = v;
        }
        if let Some(v) = edit.blocked_keywords {
            next.blocked_keywords = v;
        }
        if let Some(v) = edit.locations {
            next.locations = v;
        }
        if let Some(v) = edit.excluded_locations {
            next.excluded_locations = v;
        }
        if let Some(v) = edit.min_salary {
            next.min_salary = v;
        }
        if let Some(v) = edit.work_types {
            next.work_types = v;
        }
        if let Some(v) = edit.industries {
            next.industries = v;
        }
        if let Some(v) = edit.seniority {
            next.seniority = v;
        }
        if let Some(v) = edit.remote_only {
            next.remote_only = v;
        }
        for (sector, value) in edit.sectors {
            next.set_sector(sector, value);
        }
        for (factor, value) in edit.weights {
            *next.weights.get_mut(factor) = value;
        }
        next
    }
}

/// A direct user edit: any subset of the profile's fields.
#[derive(Debug, Clone, Default)]
pub struct PreferenceEdit {
    pub keywords: Option<Vec<String>>,
    pub blocked_keywords: Option<Vec<String>>,
    pub locations: Option<Vec<String>>,
    pub excluded_locations: Option<Vec<String>>,
    /// `Some(None)` clears the minimum.
    pub min_salary: Option<Option<i64>>,
    pub work_types: Option<BTreeSet<String>>,
    pub industries: Option<BTreeSet<String>>,
    pub seniority: Option<BTreeSet<String>>,
    pub remote_only: Option<bool>,
    pub sectors: Vec<(Sector, bool)>,
    pub weights: Vec<(Factor, f64)>,
}

impl PreferenceEdit {
    pub fn is_empty(&self) -> bool {
        self.keywords.is_none()
            && self.blocked_keywords.is_none()
            && self.locations.is_none()
            && self.excluded_locations.is_none()
            && self.min_salary.is_none()
            && self.work_types.is_none()
            && self.industries.is_none()
            && self.seniority.is_none()
            && self.remote_only.is_none()
            && self.sectors.is_empty()
            && self.weights.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_names_round_trip_through_parse() {
        for factor in Factor::ALL {
            assert_eq!(Factor::parse(factor.name()), Some(factor));
        }
        assert_eq!(Factor::parse("KEYWORDMATCH"), Some(Factor::KeywordMatch));
        assert_eq!(Factor::parse("vibes"), None);
    }

    #[test]
    fn test_weights_serialize_with_factor_names() {
        let json = serde_json::to_value(Weights::default()).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), Factor::ALL.len());
        for factor in Factor::ALL {
            assert!(obj.contains_key(factor.name()), "missing {}", factor.name());
        }
    }

    #[test]
    fn test_partial_stored_profile_fills_defaults() {
        let prefs: Preferences = serde_json::from_str(r#"{"keywords": ["economics"]}"#).unwrap();
        assert_eq!(prefs.keywords, vec!["economics".to_string()]);
        assert_eq!(prefs.weights, Weights::default());
        assert!(prefs.academia);
        assert_eq!(prefs.work_types, BTreeSet::from(["full-time".to_string()]));
    }

    #[test]
    fn test_partial_stored_weights_keep_other_defaults() {
        let prefs: Preferences =
            serde_json::from_str(r#"{"weights": {"recency": 2.0}}"#).unwrap();
        assert_eq!(prefs.weights.recency, 2.0);
        assert_eq!(prefs.weights.keyword_match, Weights::default().keyword_match);
    }

    #[test]
    fn test_with_edit_replaces_only_given_fields() {
        let base = Preferences::default();
        let edit = PreferenceEdit {
            locations: Some(vec!["Berlin".into()]),
            min_salary: Some(Some(70_000)),
            sectors: vec![(Sector::Consulting, false)],
            weights: vec![(Factor::Recency, 1.5)],
            ..Default::default()
        };
        assert!(!edit.is_empty());

        let next = base.with_edit(edit);
        assert_eq!(next.locations, vec!["Berlin".to_string()]);
        assert_eq!(next.min_salary, Some(70_000));
        assert!(!next.consulting);
        assert_eq!(next.weights.recency, 1.5);
        assert_eq!(next.keywords, base.keywords);
        assert_eq!(next.weights.salary, base.weights.salary);
    }

    #[test]
    fn test_with_edit_can_clear_min_salary() {
        let base = Preferences {
            min_salary: Some(50_000),
            ..Default::default()
        };
        let next = base.with_edit(PreferenceEdit {
            min_salary: Some(None),
            ..Default::default()
        });
        assert_eq!(next.min_salary, None);
    }
}
