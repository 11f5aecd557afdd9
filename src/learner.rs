use crate::models::Posting;
use crate::prefs::{Factor, Preferences, Sector};

pub const LIKE_STEP: f64 = 0.15;
pub const DISLIKE_STEP: f64 = -0.12;

/// Per-event adjustment of the keyword weights.
const KEYWORD_NUDGE: f64 = 0.05;
const KEYWORD_MATCH_RANGE: (f64, f64) = (0.6, 2.2);
const NEGATIVE_KEYWORD_RANGE: (f64, f64) = (-3.0, -0.6);

#[derive(Debug, Clone, Copy)]
enum NoteEffect {
    /// Move the factor's weight by the event step, then clamp.
    Nudge { factor: Factor, min: f64, max: f64 },
    /// Overwrite the sector flag with the liked flag.
    Sector(Sector),
}

#[derive(Debug, Clone, Copy)]
struct NoteRule {
    triggers: &'static [&'static str],
    effect: NoteEffect,
}

const NOTE_RULES: &[NoteRule] = &[
    NoteRule {
        triggers: &["salary", "pay"],
        effect: NoteEffect::Nudge { factor: Factor::Salary, min: 0.2, max: 2.4 },
    },
    NoteRule {
        triggers: &["remote", "hybrid"],
        effect: NoteEffect::Nudge { factor: Factor::Remote, min: 0.0, max: 1.4 },
    },
    NoteRule {
        triggers: &["leadership", "manager", "director"],
        effect: NoteEffect::Nudge { factor: Factor::Seniority, min: 0.2, max: 2.0 },
    },
    NoteRule {
        triggers: &["consult"],
        effect: NoteEffect::Sector(Sector::Consulting),
    },
    NoteRule {
        triggers: &["university", "academic"],
        effect: NoteEffect::Sector(Sector::Academia),
    },
];

/// Returns the profile that results from one like/dislike judgment.
///
/// Tags come from `selected_tags` when given, otherwise from the posting.
/// Learned tags are lowercased and appended to the allow-list (liked) or
/// block-list (disliked); neither list ever loses entries here.
pub fn apply_feedback(
    prefs: &Preferences,
    posting: &Posting,
    liked: bool,
    notes: &str,
    selected_tags: &[String],
) -> Preferences {
    let mut next = prefs.clone();
    let step = if liked { LIKE_STEP } else { DISLIKE_STEP };

    if liked {
        nudge(&mut next, Factor::KeywordMatch, KEYWORD_NUDGE, KEYWORD_MATCH_RANGE);
    } else {
        nudge(&mut next, Factor::NegativeKeyword, -KEYWORD_NUDGE, NEGATIVE_KEYWORD_RANGE);
    }

    let tags = if selected_tags.is_empty() {
        posting.tag_list()
    } else {
        selected_tags
    };
    let target = if liked {
        &mut next.keywords
    } else {
        &mut next.blocked_keywords
    };
    for tag in tags {
        let tag = tag.to_lowercase();
        if !target.contains(&tag) {
            target.push(tag);
        }
    }

    let notes = notes.to_lowercase();
    for rule in NOTE_RULES {
        if !rule.triggers.iter().any(|t| notes.contains(t)) {
            continue;
        }
        match rule.effect {
            NoteEffect::Nudge { factor, min, max } => nudge(&mut next, factor, step, (min, max)),
            NoteEffect::Sector(sector) => next.set_sector(sector, liked),
        }
    }

    next
}

fn nudge(prefs: &mut Preferences, factor: Factor, delta: f64, (min, max): (f64, f64)) {
    let weight = prefs.weights.get_mut(factor);
    *weight = (*weight + delta).clamp(min, max);
}
