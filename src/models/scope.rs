use serde::{Deserialize, Serialize};

/// Religion value meaning "no filter".
pub const ALL_RELIGIONS: &str = "all";

/// Religion (main-category) filter for a scope.
///
/// `All` means unfiltered; the gateway omits the religion query parameter
/// entirely rather than sending the sentinel literally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReligionFilter {
    All,
    Only(Vec<String>),
}

impl ReligionFilter {
    /// Build a filter from user selections. Values are trimmed and
    /// lowercased; an empty selection or any occurrence of `"all"`
    /// collapses to `All`.
    pub fn from_selections<I, S>(selections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cleaned: Vec<String> = selections
            .into_iter()
            .map(|s| s.as_ref().trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        if cleaned.is_empty() || cleaned.iter().any(|s| s == ALL_RELIGIONS) {
            ReligionFilter::All
        } else {
            ReligionFilter::Only(cleaned)
        }
    }

    /// CSV value for the `religion` query parameter. `None` means the
    /// parameter must be omitted.
    pub fn query_value(&self) -> Option<String> {
        match self {
            ReligionFilter::All => None,
            ReligionFilter::Only(values) => Some(values.join(",")),
        }
    }
}

/// The (category, religion-filter) pair that determines which serial
/// index and batch cache apply. Changing either invalidates both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub category: String,
    pub religions: ReligionFilter,
}

impl Scope {
    pub fn new(category: impl AsRef<str>, religions: ReligionFilter) -> Self {
        Self {
            category: category.as_ref().trim().to_lowercase(),
            religions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_selection_collapses() {
        assert_eq!(
            ReligionFilter::from_selections(["hindu", "All"]),
            ReligionFilter::All
        );
        assert_eq!(
            ReligionFilter::from_selections(Vec::<String>::new()),
            ReligionFilter::All
        );
    }

    #[test]
    fn selections_are_normalized() {
        let filter = ReligionFilter::from_selections([" Hindu ", "MUSLIM"]);
        assert_eq!(
            filter,
            ReligionFilter::Only(vec!["hindu".to_string(), "muslim".to_string()])
        );
        assert_eq!(filter.query_value().as_deref(), Some("hindu,muslim"));
    }

    #[test]
    fn all_omits_query_parameter() {
        assert_eq!(ReligionFilter::All.query_value(), None);
    }

    #[test]
    fn scope_lowercases_category() {
        let scope = Scope::new(" Congratulations ", ReligionFilter::All);
        assert_eq!(scope.category, "congratulations");
    }
}
