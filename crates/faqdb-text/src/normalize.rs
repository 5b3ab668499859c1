use faqdb_core::traits::QueryRewriter;

/// Ordered surface-form → canonical-form substitutions.
///
/// Replacement is literal substring replacement applied pair by pair in
/// insertion order, so a later pair sees the output of earlier ones and a key
/// inside a longer word is still replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynonymTable {
    pairs: Vec<(String, String)>,
}

impl SynonymTable {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn apply(&self, query: &str) -> String {
        let mut out = query.to_string();
        for (from, to) in &self.pairs {
            // "" would match between every character.
            if from.is_empty() || !out.contains(from.as_str()) {
                continue;
            }
            out = out.replace(from.as_str(), to);
        }
        out.trim().to_string()
    }
}

impl QueryRewriter for SynonymTable {
    fn rewrite(&self, query: &str) -> String {
        self.apply(query)
    }
}
