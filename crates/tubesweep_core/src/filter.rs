use crate::Record;

/// Ordered, case-insensitive substring rules. Exclude always wins over include.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterSet {
    include: Vec<String>,
    exclude: Vec<String>,
}

/// Result of evaluating a [`FilterSet`] against one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    pub matched: bool,
    /// Last pattern that hit, include or exclude.
    pub substring: Option<String>,
}

impl FilterSet {
    pub fn new<I, E>(include: I, exclude: E) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        Self {
            include: clean(include),
            exclude: clean(exclude),
        }
    }

    pub fn include(&self) -> &[String] {
        &self.include
    }

    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    pub fn evaluate(&self, haystack: &str) -> MatchOutcome {
        let haystack = haystack.to_lowercase();
        let mut matched = true;
        let mut substring = None;

        if !self.include.is_empty() {
            substring = first_hit(&haystack, &self.include);
            matched = substring.is_some();
        }
        if let Some(hit) = first_hit(&haystack, &self.exclude) {
            matched = false;
            substring = Some(hit);
        }

        MatchOutcome { matched, substring }
    }

    /// Evaluates the record's searchable fields and stores the outcome on it.
    /// Placeholder records stay unmatched whatever the rules say.
    pub fn apply(&self, record: &mut Record) -> bool {
        if record.is_placeholder() {
            record.matched = false;
            record.matched_substring = None;
            return false;
        }
        let outcome = self.evaluate(&record.searchable_text());
        record.matched = outcome.matched;
        record.matched_substring = outcome.substring;
        outcome.matched
    }
}

fn clean<I>(patterns: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    patterns
        .into_iter()
        .map(Into::into)
        .filter(|pattern| !pattern.trim().is_empty())
        .collect()
}

fn first_hit(haystack: &str, patterns: &[String]) -> Option<String> {
    patterns
        .iter()
        .find(|pattern| haystack.contains(&pattern.to_lowercase()))
        .cloned()
}
