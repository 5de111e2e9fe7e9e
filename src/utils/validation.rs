use crate::utils::error::{ProvisionError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(ProvisionError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(ProvisionError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(ProvisionError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ProvisionError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(ProvisionError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

/// GCS bucket 命名規則: 3-63 字元，小寫英數、`-`、`_`、`.`，首尾須為英數
/// https://cloud.google.com/storage/docs/naming
pub fn validate_bucket_name(field_name: &str, name: &str) -> Result<()> {
    let invalid = |reason: &str| ProvisionError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: name.to_string(),
        reason: reason.to_string(),
    };

    if name.len() < 3 || name.len() > 63 {
        return Err(invalid("Bucket names must contain 3-63 characters"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
    {
        return Err(invalid(
            "Bucket names may only contain lowercase letters, digits, '-', '_' and '.'",
        ));
    }

    let is_alnum = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
    if !is_alnum(name.chars().next()) || !is_alnum(name.chars().last()) {
        return Err(invalid("Bucket names must start and end with a letter or digit"));
    }
    if name.starts_with("goog") {
        return Err(invalid("Bucket names cannot begin with the \"goog\" prefix"));
    }

    Ok(())
}

/// 區域格式如 `us-central1`
pub fn validate_region(field_name: &str, region: &str) -> Result<()> {
    let parts: Vec<&str> = region.split('-').collect();
    let well_formed = parts.len() == 2
        && parts[0].chars().all(|c| c.is_ascii_lowercase())
        && !parts[0].is_empty()
        && parts[1]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_lowercase())
        && parts[1].chars().last().is_some_and(|c| c.is_ascii_digit())
        && parts[1].chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());

    if !well_formed {
        return Err(ProvisionError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: region.to_string(),
            reason: "Expected a region such as us-central1".to_string(),
        });
    }
    Ok(())
}
