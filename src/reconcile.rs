//! Reconciliation of template placeholders against dataset columns
//!
//! Matching is presence-based and case-sensitive. Both inputs are ordered,
//! deduplicated sequences; order only affects how results are listed.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

fn dedup_preserving_order<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(Into::into)
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Placeholder tokens found in the template, in first-occurrence order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct PlaceholderSet(Vec<String>);

impl PlaceholderSet {
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(dedup_preserving_order(tokens))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.iter().any(|t| t == token)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }
}

impl From<Vec<String>> for PlaceholderSet {
    fn from(tokens: Vec<String>) -> Self {
        Self::from_tokens(tokens)
    }
}

impl From<PlaceholderSet> for Vec<String> {
    fn from(set: PlaceholderSet) -> Self {
        set.0
    }
}

/// Column headers from the dataset's first row, in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct HeaderSet(Vec<String>);

impl HeaderSet {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(dedup_preserving_order(names))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }
}

impl From<Vec<String>> for HeaderSet {
    fn from(names: Vec<String>) -> Self {
        Self::from_names(names)
    }
}

impl From<HeaderSet> for Vec<String> {
    fn from(set: HeaderSet) -> Self {
        set.0
    }
}

/// Verdict of comparing a template against a dataset.
///
/// `valid` is true exactly when `missing_in_excel` is empty. Extra columns
/// only produce a warning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default)]
    pub missing_in_excel: Vec<String>,
    #[serde(default)]
    pub extra_in_excel: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn has_extra_columns(&self) -> bool {
        !self.extra_in_excel.is_empty()
    }
}

/// Compare placeholders against headers.
pub fn reconcile(placeholders: &PlaceholderSet, headers: &HeaderSet) -> ValidationResult {
    let header_lookup: HashSet<&str> = headers.iter().map(String::as_str).collect();
    let placeholder_lookup: HashSet<&str> = placeholders.iter().map(String::as_str).collect();

    let missing_in_excel: Vec<String> = placeholders
        .iter()
        .filter(|p| !header_lookup.contains(p.as_str()))
        .cloned()
        .collect();

    let extra_in_excel: Vec<String> = headers
        .iter()
        .filter(|h| !placeholder_lookup.contains(h.as_str()))
        .cloned()
        .collect();

    let mut warnings = Vec::new();
    if !missing_in_excel.is_empty() {
        warnings.push(format!(
            "The following placeholders are in the template but not in Excel and will remain empty in generated documents: {}",
            missing_in_excel.join(", ")
        ));
    }
    if !extra_in_excel.is_empty() {
        warnings.push(format!(
            "The following Excel columns are not used in the template and will be ignored: {}",
            extra_in_excel.join(", ")
        ));
    }

    ValidationResult {
        valid: missing_in_excel.is_empty(),
        missing_in_excel,
        extra_in_excel,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placeholders(items: &[&str]) -> PlaceholderSet {
        PlaceholderSet::from_tokens(items.iter().copied())
    }

    fn headers(items: &[&str]) -> HeaderSet {
        HeaderSet::from_names(items.iter().copied())
    }

    #[test]
    fn test_exact_match_is_valid() {
        let result = reconcile(
            &placeholders(&["STUDENT_NAME", "AMOUNT"]),
            &headers(&["AMOUNT", "STUDENT_NAME"]),
        );
        assert!(result.valid);
        assert!(result.missing_in_excel.is_empty());
        assert!(result.extra_in_excel.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_missing_keeps_placeholder_order() {
        let result = reconcile(
            &placeholders(&["DATE", "NAME", "AMOUNT"]),
            &headers(&["NAME"]),
        );
        assert!(!result.valid);
        assert_eq!(result.missing_in_excel, vec!["DATE", "AMOUNT"]);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_extra_columns_only_warn() {
        let result = reconcile(
            &placeholders(&["NAME"]),
            &headers(&["EMAIL", "NAME", "PHONE"]),
        );
        assert!(result.valid);
        assert_eq!(result.extra_in_excel, vec!["EMAIL", "PHONE"]);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("EMAIL, PHONE"));
        assert!(result.warnings[0].contains("ignored"));
    }

    #[test]
    fn test_comparison_is_case_sensitive() {
        let result = reconcile(&placeholders(&["Name"]), &headers(&["NAME"]));
        assert!(!result.valid);
        assert_eq!(result.missing_in_excel, vec!["Name"]);
        assert_eq!(result.extra_in_excel, vec!["NAME"]);
    }

    #[test]
    fn test_no_trimming() {
        let result = reconcile(&placeholders(&["NAME"]), &headers(&["NAME "]));
        assert!(!result.valid);
    }

    #[test]
    fn test_empty_inputs() {
        let result = reconcile(&PlaceholderSet::default(), &HeaderSet::default());
        assert!(result.valid);
        assert!(result.warnings.is_empty());

        let result = reconcile(&placeholders(&["A", "B"]), &HeaderSet::default());
        assert!(!result.valid);
        assert_eq!(result.missing_in_excel, vec!["A", "B"]);

        let result = reconcile(&PlaceholderSet::default(), &headers(&["A"]));
        assert!(result.valid);
        assert_eq!(result.extra_in_excel, vec!["A"]);
    }

    #[test]
    fn test_duplicates_are_collapsed() {
        let set = placeholders(&["A", "B", "A", "C", "B"]);
        assert_eq!(set.as_slice(), &["A", "B", "C"]);

        let result = reconcile(&set, &headers(&["C", "C", "D", "D"]));
        assert_eq!(result.missing_in_excel, vec!["A", "B"]);
        assert_eq!(result.extra_in_excel, vec!["D"]);
    }

    #[test]
    fn test_sets_deserialize_with_dedup() {
        let set: PlaceholderSet = serde_json::from_str(r#"["X","Y","X"]"#).unwrap();
        assert_eq!(set.as_slice(), &["X", "Y"]);
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["X","Y"]"#);
    }

    #[test]
    fn test_validation_result_wire_format() {
        let json = r#"{"valid":false,"missingInExcel":["DATE"],"extraInExcel":[],"warnings":[]}"#;
        let result: ValidationResult = serde_json::from_str(json).unwrap();
        assert!(!result.valid);
        assert_eq!(result.missing_in_excel, vec!["DATE"]);
        assert_eq!(serde_json::to_string(&result).unwrap(), json);
    }
}
