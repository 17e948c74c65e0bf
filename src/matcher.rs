use crate::model::Applet;
use nucleo_matcher::pattern::{CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Matcher, Utf32Str};

pub struct FuzzyMatcher {
    matcher: Matcher,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl FuzzyMatcher {
    pub fn new() -> Self {
        Self {
            matcher: Matcher::new(nucleo_matcher::Config::DEFAULT),
        }
    }

    /// Indices of the applets whose name matches `query`, best first. Equal
    /// scores keep collection order; an empty query keeps everything.
    pub fn rank(&mut self, query: &str, applets: &[Applet]) -> Vec<usize> {
        if query.trim().is_empty() {
            return (0..applets.len()).collect();
        }

        let pattern = Pattern::parse(query, CaseMatching::Smart, Normalization::Smart);
        let mut buf = Vec::new();

        let mut scored: Vec<(usize, u32)> = applets
            .iter()
            .enumerate()
            .filter_map(|(index, applet)| {
                let haystack = Utf32Str::new(&applet.name, &mut buf);
                pattern
                    .score(haystack, &mut self.matcher)
                    .map(|score| (index, score))
            })
            .collect();

        scored.sort_by(|a, b| b.1.cmp(&a.1));
        scored.into_iter().map(|(index, _)| index).collect()
    }
}
