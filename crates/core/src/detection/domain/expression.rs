use std::fmt;

/// Expression vocabulary reported by the classifier.
///
/// Declaration order is significant: when two expressions score equally,
/// the one declared first wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Expression {
    Neutral,
    Happy,
    Sad,
    Angry,
    Fearful,
    Disgusted,
    Surprised,
}

impl Expression {
    pub const ALL: [Expression; 7] = [
        Expression::Neutral,
        Expression::Happy,
        Expression::Sad,
        Expression::Angry,
        Expression::Fearful,
        Expression::Disgusted,
        Expression::Surprised,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Expression::Neutral => "neutral",
            Expression::Happy => "happy",
            Expression::Sad => "sad",
            Expression::Angry => "angry",
            Expression::Fearful => "fearful",
            Expression::Disgusted => "disgusted",
            Expression::Surprised => "surprised",
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Expression::Neutral => "\u{1F610}",   // 😐
            Expression::Happy => "\u{1F60A}",     // 😊
            Expression::Sad => "\u{1F61E}",       // 😞
            Expression::Angry => "\u{1F621}",     // 😡
            Expression::Fearful => "\u{1F631}",   // 😱
            Expression::Disgusted => "\u{1F922}", // 🤢
            Expression::Surprised => "\u{1F632}", // 😲
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|e| e.label().eq_ignore_ascii_case(label))
    }

    /// Position in the declaration order.
    pub fn rank(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-face score distribution, keyed by the label the classifier used.
///
/// Scores are comparable within one distribution but need not sum to 1.
/// Insertion order is preserved.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpressionScores {
    entries: Vec<(String, f64)>,
}

impl ExpressionScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `label` to `score`, replacing an earlier score for the same label.
    pub fn insert(&mut self, label: impl Into<String>, score: f64) {
        let label = label.into();
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = score,
            None => self.entries.push((label, score)),
        }
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, s)| *s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(l, s)| (l.as_str(), *s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest-scoring label.
    ///
    /// Ties resolve by vocabulary order; labels outside the vocabulary lose
    /// ties to known ones and otherwise keep insertion order. Non-finite
    /// scores never win.
    pub fn dominant(&self) -> Option<(&str, f64)> {
        let unknown_rank = Expression::ALL.len();
        let mut best: Option<(&str, f64, usize)> = None;

        for (label, score) in self.iter() {
            if !score.is_finite() {
                continue;
            }
            let rank = Expression::from_label(label).map_or(unknown_rank, Expression::rank);
            let better = match best {
                None => true,
                Some((_, best_score, best_rank)) => {
                    score > best_score || (score == best_score && rank < best_rank)
                }
            };
            if better {
                best = Some((label, score, rank));
            }
        }

        best.map(|(label, score, _)| (label, score))
    }

    /// Labels scoring above `min_score`, highest first.
    pub fn ranked_above(&self, min_score: f64) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self
            .iter()
            .filter(|(_, s)| s.is_finite() && *s > min_score)
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

impl<L: Into<String>> FromIterator<(L, f64)> for ExpressionScores {
    fn from_iter<I: IntoIterator<Item = (L, f64)>>(iter: I) -> Self {
        let mut scores = Self::new();
        for (label, score) in iter {
            scores.insert(label, score);
        }
        scores
    }
}
