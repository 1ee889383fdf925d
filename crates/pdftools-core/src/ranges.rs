//! Page spec parsing
//!
//! A page spec is a comma separated list of 1-based pages (`5`) and
//! inclusive ranges (`1-3`). Order and repeats are kept: `"3,1-2,3"`
//! selects pages 3, 1, 2, 3.

use crate::error::{Result, TransformError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRange {
    Single(u32),
    /// Inclusive on both ends.
    Span(u32, u32),
}

impl PageRange {
    /// 0-based indices covered by this range, in ascending order.
    ///
    /// `Span(a, b)` yields exactly `b - a + 1` indices starting at `a - 1`.
    pub fn indices(self) -> impl Iterator<Item = usize> {
        let (start, end) = self.bounds();
        (start as usize).saturating_sub(1)..(end as usize)
    }

    /// First and last page, 1-based and inclusive.
    pub fn bounds(self) -> (u32, u32) {
        match self {
            PageRange::Single(page) => (page, page),
            PageRange::Span(start, end) => (start, end),
        }
    }
}

/// Parse a page spec like `"1-3, 5, 8-10"`.
pub fn parse_page_spec(input: &str) -> Result<Vec<PageRange>> {
    if input.trim().is_empty() {
        return Err(TransformError::Validation(
            "Please provide page numbers".into(),
        ));
    }

    input.split(',').map(|part| parse_part(part.trim())).collect()
}

fn parse_part(part: &str) -> Result<PageRange> {
    if part.is_empty() {
        return Err(TransformError::Validation(
            "Empty entry in page list".into(),
        ));
    }

    if let Some((start, end)) = part.split_once('-') {
        let start = parse_page(start.trim())?;
        let end = parse_page(end.trim())?;
        if start > end {
            return Err(TransformError::Validation(format!(
                "Invalid range {}: start {} > end {}",
                part, start, end
            )));
        }
        Ok(PageRange::Span(start, end))
    } else {
        Ok(PageRange::Single(parse_page(part)?))
    }
}

fn parse_page(raw: &str) -> Result<u32> {
    let page: u32 = raw
        .parse()
        .map_err(|_| TransformError::Validation(format!("Invalid page number: '{}'", raw)))?;
    if page == 0 {
        return Err(TransformError::Validation(
            "Page numbers start at 1".into(),
        ));
    }
    Ok(page)
}

/// Expand ranges into 0-based page indices for a document with
/// `page_count` pages. Any page past the end fails the whole selection.
pub fn resolve_indices(ranges: &[PageRange], page_count: usize) -> Result<Vec<usize>> {
    let mut indices = Vec::new();
    for range in ranges {
        let (start, end) = range.bounds();
        if start == 0 || start > end {
            return Err(TransformError::Validation(format!(
                "Invalid page range {}-{}",
                start, end
            )));
        }
        for index in range.indices() {
            if index >= page_count {
                return Err(TransformError::Validation(format!(
                    "Page {} does not exist (document has {} pages)",
                    index + 1,
                    page_count
                )));
            }
            indices.push(index);
        }
    }
    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn indices(spec: &str, page_count: usize) -> Result<Vec<usize>> {
        resolve_indices(&parse_page_spec(spec)?, page_count)
    }

    #[test]
    fn test_resolve_rejects_hand_built_zero_page() {
        for range in [PageRange::Single(0), PageRange::Span(0, 2), PageRange::Span(3, 1)] {
            let err = resolve_indices(&[range], 5).unwrap_err();
            assert!(err.is_validation());
        }
        assert_eq!(PageRange::Single(0).indices().count(), 0);
    }

    #[test]
    fn test_parse_single() {
        assert_eq!(parse_page_spec("5").unwrap(), vec![PageRange::Single(5)]);
    }

    #[test]
    fn test_parse_complex() {
        assert_eq!(
            parse_page_spec("1-3, 5, 8-10").unwrap(),
            vec![
                PageRange::Span(1, 3),
                PageRange::Single(5),
                PageRange::Span(8, 10)
            ]
        );
    }

    #[test]
    fn test_range_is_zero_based_and_inclusive() {
        assert_eq!(indices("1-3", 10).unwrap(), vec![0, 1, 2]);
        assert_eq!(indices("4-4", 10).unwrap(), vec![3]);
        assert_eq!(indices("1", 10).unwrap(), vec![0]);
    }

    #[test]
    fn test_order_and_repeats_preserved() {
        assert_eq!(indices("2,5", 10).unwrap(), vec![1, 4]);
        assert_eq!(indices("3,1-2,3", 3).unwrap(), vec![2, 0, 1, 2]);
    }

    #[test]
    fn test_rejects_malformed() {
        for spec in ["", "  ", "a", "1,,2", "1-", "-3", "3-1", "0", "0-2", "1-2-3", "1.5"] {
            let err = parse_page_spec(spec).unwrap_err();
            assert!(err.is_validation(), "{spec:?} should be rejected");
        }
    }

    #[test]
    fn test_out_of_range_fails_fast() {
        let err = indices("1,11", 10).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("Page 11 does not exist"));
        assert!(indices("9-11", 10).is_err());
        assert!(indices("1", 0).is_err());
    }

    proptest! {
        #[test]
        fn span_expands_to_exact_count(start in 1u32..500, len in 0u32..50) {
            let end = start + len;
            let spec = format!("{}-{}", start, end);
            let got = indices(&spec, 1000).unwrap();
            prop_assert_eq!(got.len(), (end - start + 1) as usize);
            prop_assert_eq!(got[0], (start - 1) as usize);
            prop_assert!(got.windows(2).all(|w| w[1] == w[0] + 1));
        }

        #[test]
        fn singles_subtract_one(pages in proptest::collection::vec(1u32..100, 1..10)) {
            let spec = pages.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(",");
            let got = indices(&spec, 100).unwrap();
            let expected: Vec<usize> = pages.iter().map(|p| (*p - 1) as usize).collect();
            prop_assert_eq!(got, expected);
        }
    }
}
