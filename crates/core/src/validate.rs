use thiserror::Error;

use crate::field::FieldType;
use crate::view::Query;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },
    #[error("invalid {kind}: {value}")]
    InvalidEnum { kind: &'static str, value: String },
    #[error("invalid values: {field_type} type has no values")]
    OptionsNotAllowed { field_type: FieldType },
    #[error("invalid values: select type must have string values (index {index})")]
    NonStringOption { index: usize },
    #[error("invalid value: element {index} is not a string")]
    NonStringValue { index: usize },
    #[error("invalid value: {value} is not an option of property_field {field_id}")]
    OptionNotAllowed { field_id: String, value: String },
    #[error("invalid value: {field_type} field holds at most one value, got {count}")]
    TooManyValues { field_type: FieldType, count: usize },
    #[error("invalid value: {field_type} reference cannot be blank")]
    BlankReference { field_type: FieldType },
    #[error("query must have includes, excludes, or a channel_id")]
    UnconstrainedQuery,
    #[error("at least one of title, query or format must be set")]
    EmptyPatch,
}

/// Trimmed, non-blank field name.
pub fn validate_field_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField { field: "name" });
    }
    Ok(trimmed.to_string())
}

/// Check a field's option list against its type.
///
/// Options are only allowed on `select` fields, and every option must be a
/// JSON string.
pub fn validate_field_options(
    field_type: FieldType,
    raw: &[serde_json::Value],
) -> Result<Vec<String>, ValidationError> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    if !field_type.has_options() {
        return Err(ValidationError::OptionsNotAllowed { field_type });
    }
    raw.iter()
        .enumerate()
        .map(|(index, v)| {
            v.as_str()
                .map(str::to_string)
                .ok_or(ValidationError::NonStringOption { index })
        })
        .collect()
}

/// Trimmed, non-blank view title.
pub fn validate_view_title(title: &str) -> Result<String, ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField { field: "title" });
    }
    Ok(trimmed.to_string())
}

/// A stored view query must constrain something.
pub fn validate_view_query(query: &Query) -> Result<(), ValidationError> {
    if query.has_field_criteria() || query.channel_scope().is_some() {
        Ok(())
    } else {
        Err(ValidationError::UnconstrainedQuery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn select_options_must_be_strings() {
        let err = validate_field_options(FieldType::Select, &[json!("a"), json!(1)]).unwrap_err();
        assert_eq!(err, ValidationError::NonStringOption { index: 1 });
        assert_eq!(
            validate_field_options(FieldType::Select, &[json!("a"), json!("b")]).unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn options_rejected_for_non_select_types() {
        for t in [FieldType::Text, FieldType::User, FieldType::Post] {
            assert_eq!(
                validate_field_options(t, &[json!("a")]).unwrap_err(),
                ValidationError::OptionsNotAllowed { field_type: t }
            );
            assert!(validate_field_options(t, &[]).unwrap().is_empty());
        }
    }

    #[test]
    fn names_and_titles_are_trimmed() {
        assert_eq!(validate_field_name("  Status ").unwrap(), "Status");
        assert!(validate_field_name("   ").is_err());
        assert_eq!(validate_view_title(" Board").unwrap(), "Board");
        assert_eq!(
            validate_view_title("").unwrap_err(),
            ValidationError::MissingField { field: "title" }
        );
    }

    #[test]
    fn unconstrained_query_is_rejected() {
        assert_eq!(
            validate_view_query(&Query::default()).unwrap_err(),
            ValidationError::UnconstrainedQuery
        );
        let channel_only = Query {
            channel_id: Some("c1".into()),
            ..Default::default()
        };
        assert!(validate_view_query(&channel_only).is_ok());
        let mut with_field = Query::default();
        with_field.excludes.insert("f1".into(), vec![]);
        assert!(validate_view_query(&with_field).is_ok());
    }
}
