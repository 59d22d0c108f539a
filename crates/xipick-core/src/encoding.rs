// One-hot encoding of a categorical column with a dropped reference level.

use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("cannot fit an encoder on an empty column")]
    EmptyVocabulary,

    #[error("unseen category `{value}` (fitted vocabulary has {known} values)")]
    UnseenCategory { value: String, known: usize },
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// Fixed-vocabulary one-hot encoder.
///
/// Categories are sorted lexicographically at fit time and the first one is
/// dropped as the reference level, so the reference encodes to the all-zero
/// vector and every other category to a vector with a single `1.0`. The
/// encoded width is therefore `vocabulary size - 1`.
#[derive(Debug, Clone)]
pub struct OneHotEncoder {
    categories: Vec<String>,
    index: HashMap<String, usize>,
}

impl OneHotEncoder {
    /// Fit the vocabulary from the distinct values of a column.
    pub fn fit<'a, I>(values: I) -> Result<Self, EncodingError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let distinct: BTreeSet<&str> = values.into_iter().collect();
        if distinct.is_empty() {
            return Err(EncodingError::EmptyVocabulary);
        }
        let categories: Vec<String> = distinct.into_iter().map(str::to_string).collect();
        let index = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        Ok(Self { categories, index })
    }

    /// All fitted categories in encoding order, reference first.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// The dropped category, represented by the all-zero vector.
    pub fn reference(&self) -> &str {
        &self.categories[0]
    }

    /// Number of columns produced per encoded value.
    pub fn width(&self) -> usize {
        self.categories.len() - 1
    }

    pub fn contains(&self, value: &str) -> bool {
        self.index.contains_key(value)
    }

    /// Encode one value into a fresh vector.
    pub fn transform(&self, value: &str) -> Result<Vec<f64>, EncodingError> {
        let mut out = Vec::with_capacity(self.width());
        self.encode_into(value, &mut out)?;
        Ok(out)
    }

    /// Append the encoding of `value` to `out`. On error `out` is untouched.
    pub fn encode_into(&self, value: &str, out: &mut Vec<f64>) -> Result<(), EncodingError> {
        let idx = *self
            .index
            .get(value)
            .ok_or_else(|| EncodingError::UnseenCategory {
                value: value.to_string(),
                known: self.categories.len(),
            })?;
        let start = out.len();
        out.resize(start + self.width(), 0.0);
        if idx > 0 {
            out[start + idx - 1] = 1.0;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn teams() -> OneHotEncoder {
        OneHotEncoder::fit([
            "Rajasthan Royals",
            "Chennai Super Kings",
            "Sunrisers Hyderabad",
            "Chennai Super Kings",
        ])
        .unwrap()
    }

    #[test]
    fn vocabulary_is_sorted_and_deduplicated() {
        let enc = teams();
        assert_eq!(
            enc.categories(),
            &["Chennai Super Kings", "Rajasthan Royals", "Sunrisers Hyderabad"]
        );
        assert_eq!(enc.reference(), "Chennai Super Kings");
        assert_eq!(enc.width(), 2);
    }

    #[test]
    fn non_reference_has_exactly_one_hot() {
        let enc = teams();
        for name in ["Rajasthan Royals", "Sunrisers Hyderabad"] {
            let v = enc.transform(name).unwrap();
            assert_eq!(v.len(), enc.width());
            assert_eq!(v.iter().filter(|x| **x == 1.0).count(), 1);
            assert_eq!(v.iter().filter(|x| **x == 0.0).count(), enc.width() - 1);
        }
        assert_eq!(enc.transform("Sunrisers Hyderabad").unwrap(), vec![0.0, 1.0]);
    }

    #[test]
    fn reference_is_all_zero() {
        let enc = teams();
        assert_eq!(enc.transform("Chennai Super Kings").unwrap(), vec![0.0, 0.0]);
    }

    #[test]
    fn unseen_category_is_an_error() {
        let enc = teams();
        let err = enc.transform("Gujarat Titans").unwrap_err();
        assert_eq!(
            err,
            EncodingError::UnseenCategory {
                value: "Gujarat Titans".into(),
                known: 3,
            }
        );
    }

    #[test]
    fn failed_encode_leaves_buffer_untouched() {
        let enc = teams();
        let mut buf = vec![7.0];
        assert!(enc.encode_into("Nobody", &mut buf).is_err());
        assert_eq!(buf, vec![7.0]);
        enc.encode_into("Rajasthan Royals", &mut buf).unwrap();
        assert_eq!(buf, vec![7.0, 1.0, 0.0]);
    }

    #[test]
    fn single_category_encodes_to_empty_vector() {
        let enc = OneHotEncoder::fit(["Only Team"]).unwrap();
        assert_eq!(enc.width(), 0);
        assert!(enc.transform("Only Team").unwrap().is_empty());
    }

    #[test]
    fn empty_column_rejected() {
        let empty: [&str; 0] = [];
        assert_eq!(
            OneHotEncoder::fit(empty).unwrap_err(),
            EncodingError::EmptyVocabulary
        );
    }
}
