use crate::utils::error::{ExtractError, Result};
use regex::Regex;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field_name: &str, value: &str, reason: impl Into<String>) -> ExtractError {
    ExtractError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Absolute IRI with an http, https or file scheme.
pub fn validate_iri(field_name: &str, iri: &str) -> Result<()> {
    if iri.is_empty() {
        return Err(invalid(field_name, iri, "IRI cannot be empty"));
    }

    match Url::parse(iri) {
        Ok(url) => match url.scheme() {
            "http" | "https" | "file" => Ok(()),
            scheme => Err(invalid(
                field_name,
                iri,
                format!("Unsupported IRI scheme: {}", scheme),
            )),
        },
        Err(e) => Err(invalid(field_name, iri, format!("Invalid IRI format: {}", e))),
    }
}

/// `prefix:local`, e.g. `IAO:0000412` or `rdfs:subClassOf`.
pub fn validate_curie(field_name: &str, curie: &str) -> Result<()> {
    let pattern = Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*:[^\s:<>]\S*$")
        .map_err(|e| ExtractError::config(e.to_string()))?;
    if pattern.is_match(curie) {
        Ok(())
    } else {
        Err(invalid(field_name, curie, "Expected a CURIE such as IAO:0000412"))
    }
}

/// Accepts either a CURIE or an absolute IRI.
pub fn validate_term_ref(field_name: &str, value: &str) -> Result<()> {
    if value.contains("://") {
        validate_iri(field_name, value)
    } else {
        validate_curie(field_name, value)
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(invalid(field_name, path, "Path cannot be empty"));
    }

    if path.contains('\0') {
        return Err(invalid(field_name, path, "Path contains null bytes"));
    }

    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| ExtractError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(
            field_name,
            value,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

pub fn validate_one_of(field_name: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if allowed.iter().any(|a| a.eq_ignore_ascii_case(value)) {
        Ok(())
    } else {
        Err(invalid(
            field_name,
            value,
            format!("Expected one of: {}", allowed.join(", ")),
        ))
    }
}
