//! Product search filter.

use crate::Product;

/// Queries shorter than this many characters do not filter.
pub const MIN_SEARCH_LEN: usize = 3;

/// What the product list shows for a given search box value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchFilter {
    /// Every product
    All,
    /// Products whose title or description contains the needle. Case is
    /// ignored for ASCII letters only, as with SQLite `LIKE`.
    Contains(String),
}

impl SearchFilter {
    pub fn parse(query: &str) -> Self {
        if query.chars().count() < MIN_SEARCH_LEN {
            SearchFilter::All
        } else {
            SearchFilter::Contains(query.to_string())
        }
    }

    pub fn matches(&self, product: &Product) -> bool {
        match self {
            SearchFilter::All => true,
            SearchFilter::Contains(needle) => {
                let needle = needle.to_ascii_lowercase();
                product.title.to_ascii_lowercase().contains(&needle)
                    || product.description.to_ascii_lowercase().contains(&needle)
            }
        }
    }

    /// SQL `LIKE` pattern for this filter, using `\` as the escape character.
    pub fn like_pattern(&self) -> Option<String> {
        match self {
            SearchFilter::All => None,
            SearchFilter::Contains(needle) => {
                let mut pattern = String::with_capacity(needle.len() + 2);
                pattern.push('%');
                for c in needle.chars() {
                    if matches!(c, '%' | '_' | '\\') {
                        pattern.push('\\');
                    }
                    pattern.push(c);
                }
                pattern.push('%');
                Some(pattern)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn product(title: &str, description: &str) -> Product {
        Product {
            id: 1,
            title: title.into(),
            description: description.into(),
            category: "misc".into(),
            price: Decimal::ONE,
            rating: Decimal::ONE,
            images: vec![],
            thumbnail: String::new(),
            is_favorite: false,
        }
    }

    #[test]
    fn short_query_is_unfiltered() {
        assert_eq!(SearchFilter::parse(""), SearchFilter::All);
        assert_eq!(SearchFilter::parse("a"), SearchFilter::All);
        assert_eq!(SearchFilter::parse("la"), SearchFilter::All);
        assert_eq!(
            SearchFilter::parse("lap"),
            SearchFilter::Contains("lap".into())
        );
    }

    #[test]
    fn threshold_counts_characters() {
        assert_eq!(SearchFilter::parse("çé"), SearchFilter::All);
    }

    #[test]
    fn matches_title_or_description() {
        let filter = SearchFilter::parse("LAP");
        assert!(filter.matches(&product("Laptop", "")));
        assert!(filter.matches(&product("Stand", "fits any lapdesk")));
        assert!(!filter.matches(&product("Phone", "pocket sized")));
    }

    #[test]
    fn case_folding_is_ascii_only() {
        assert!(SearchFilter::parse("çAM").matches(&product("Çamlık çam", "")));
        assert!(!SearchFilter::parse("ÇAM").matches(&product("çam", "")));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(SearchFilter::All.like_pattern(), None);
        assert_eq!(
            SearchFilter::parse("50%_off").like_pattern().as_deref(),
            Some("%50\\%\\_off%")
        );
    }
}
