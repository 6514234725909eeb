use url::Url;
use validator::ValidationError;

/// Validates that a URL string is absolute, uses http/https and has a host
pub fn validate_url(url_str: &str) -> Result<(), ValidationError> {
    let url = Url::parse(url_str).map_err(|_| invalid("Invalid URL format"))?;

    if url.host().is_none() {
        return Err(invalid("URL must have a host"));
    }

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid("URL scheme must be http or https"));
    }

    Ok(())
}

fn invalid(message: &'static str) -> ValidationError {
    let mut err = ValidationError::new("url");
    err.message = Some(message.into());
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        // Valid URLs
        assert!(validate_url("https://example.com").is_ok());
        assert!(validate_url("http://example.com/path?query=value").is_ok());
        assert!(validate_url("http://127.0.0.1:3000/").is_ok());

        // Invalid URLs
        assert!(validate_url("not-a-url").is_err());
        assert!(validate_url("").is_err());
        assert!(validate_url("ftp://example.com").is_err()); // Not http/https
        assert!(validate_url("mailto:someone@example.com").is_err());
    }
}
