//! # Validation Module
//!
//! Field rules for the sign-up, profile and organization forms.
//!
//! Every validator takes the raw submitted value (`None` when the field was
//! absent) and returns the value as it should be stored: usernames and emails
//! lowercased, URLs normalised. Only the first failing rule is reported.

use phonenumber::country;
use phonenumber::{Mode, PhoneNumber};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;
use url::Url;

/// A rule a submitted field failed, with the message shown next to it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Free-mail providers whose domain says nothing about the user's company.
pub const EMAIL_DOMAINS: &[&str] = &[
    "gmail.com",
    "yahoo.com",
    "hotmail.com",
    "aol.com",
    "hotmail.co",
    "hotmail.co.uk",
    "hotmail.fr",
    "msn.com",
    "yahoo.fr",
    "wanadoo.fr",
    "orange.fr",
    "comcast.net",
    "yahoo.co.uk",
    "yahoo.com.br",
    "yahoo.co.in",
];

fn username_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("username pattern is valid"))
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*\.[A-Za-z]{2,}$")
            .expect("email pattern is valid")
    })
}

fn required<'a>(
    field: &'static str,
    value: Option<&'a str>,
    message: &str,
) -> Result<&'a str, ValidationError> {
    value.ok_or_else(|| ValidationError::new(field, message))
}

fn length(value: &str) -> usize {
    value.chars().count()
}

// =============================================================================
// CREDENTIALS
// =============================================================================
pub fn username(value: Option<&str>) -> Result<String, ValidationError> {
    let value = required("username", value, "Username is required")?;
    if length(value) < 3 {
        return Err(ValidationError::new("username", "Username is too short"));
    }
    if length(value) > 20 {
        return Err(ValidationError::new("username", "Username is too long"));
    }
    if !username_pattern().is_match(value) {
        return Err(ValidationError::new(
            "username",
            "Username can only include letters, numbers, and underscores",
        ));
    }
    Ok(value.to_lowercase())
}

pub fn password(value: Option<&str>) -> Result<String, ValidationError> {
    let value = required("password", value, "Password is required")?;
    if length(value) < 6 {
        return Err(ValidationError::new("password", "Password is too short"));
    }
    if length(value) > 100 {
        return Err(ValidationError::new("password", "Password is too long"));
    }
    Ok(value.to_string())
}

/// Both fields must be valid passwords and equal.
pub fn confirm_password(
    value: Option<&str>,
    confirmation: Option<&str>,
) -> Result<String, ValidationError> {
    let value = password(value)?;
    let confirmation = password(confirmation).map_err(|e| ValidationError {
        field: "confirmPassword",
        ..e
    })?;
    if value != confirmation {
        return Err(ValidationError::new("confirmPassword", "The passwords must match"));
    }
    Ok(value)
}

pub fn email(value: Option<&str>) -> Result<String, ValidationError> {
    let value = required("email", value, "Email is required")?;
    if !email_pattern().is_match(value) {
        return Err(ValidationError::new("email", "Email is invalid"));
    }
    if length(value) < 3 {
        return Err(ValidationError::new("email", "Email is too short"));
    }
    if length(value) > 100 {
        return Err(ValidationError::new("email", "Email is too long"));
    }
    Ok(value.to_lowercase())
}

// =============================================================================
// PROFILE
// =============================================================================
pub fn name(value: Option<&str>) -> Result<String, ValidationError> {
    let value = required("name", value, "Name is required")?;
    if length(value) > 40 {
        return Err(ValidationError::new("name", "Name is too long"));
    }
    Ok(value.to_string())
}

/// Region assumed for numbers entered without a `+` country code.
pub const PHONE_DEFAULT_REGION: country::Id = country::Id::US;

/// A dialable phone number, stored in international format (`+1 213-373-4253`).
pub fn phone(value: Option<&str>) -> Result<String, ValidationError> {
    let value = required("phone", value, "Phone is required")?;
    let number = phonenumber::parse(Some(PHONE_DEFAULT_REGION), value)
        .map_err(|e| ValidationError::new("phone", format!("Phone is invalid: {}", e)))?;
    if !phonenumber::is_valid(&number) {
        return Err(ValidationError::new(
            "phone",
            format!("Phone is invalid: {}", phone_length_issue(&number)),
        ));
    }
    Ok(number.format().mode(Mode::International).to_string())
}

/// Length verdict for a number that parsed but is not dialable.
fn phone_length_issue(number: &PhoneNumber) -> &'static str {
    let national = number.national().value().to_string().len();
    let total = number.code().value().to_string().len() + national;
    // E.164 caps a full number at 15 digits
    if total > 15 {
        "TOO_LONG"
    } else if national < 4 {
        "TOO_SHORT"
    } else {
        "INVALID_LENGTH"
    }
}

/// Personal LinkedIn profile URL.
pub fn linkedin_profile(value: Option<&str>) -> Result<String, ValidationError> {
    linkedin(value, "linkedin.com/in/", "URL should include https://linkedin.com/in/")
}

// =============================================================================
// ORGANIZATION
// =============================================================================
pub fn company_name(value: Option<&str>) -> Result<String, ValidationError> {
    name(value)
}

pub fn domain(value: Option<&str>) -> Result<String, ValidationError> {
    let value = required("domain", value, "Domain is required")?;
    if !value.contains('.') {
        return Err(ValidationError::new("domain", "Domain is invalid"));
    }
    if length(value) < 4 {
        return Err(ValidationError::new("domain", "Domain is too short"));
    }
    Ok(value.to_string())
}

pub fn website(value: Option<&str>) -> Result<String, ValidationError> {
    let value = required("website", value, "Website is required")?;
    Url::parse(value).map_err(|_| ValidationError::new("website", "Website is invalid"))?;
    normalize_url(value).map_err(|_| ValidationError::new("website", "Website is invalid"))
}

/// Company LinkedIn page URL.
pub fn linkedin_company(value: Option<&str>) -> Result<String, ValidationError> {
    linkedin(value, "linkedin.com/", "URL should include https://linkedin.com/")
}

fn linkedin(
    value: Option<&str>,
    must_include: &str,
    message: &str,
) -> Result<String, ValidationError> {
    let value = required("linkedin", value, "LinkedIn URL is required")?;
    Url::parse(value).map_err(|_| ValidationError::new("linkedin", "LinkedIn URL is invalid"))?;
    if !value.contains(must_include) {
        return Err(ValidationError::new("linkedin", message));
    }
    normalize_url(value).map_err(|_| ValidationError::new("linkedin", "LinkedIn URL is invalid"))
}

// =============================================================================
// URL NORMALISATION
// =============================================================================
/// Canonical form of a user-entered URL.
///
/// Defaults to `https` when no scheme is given, drops credentials, a leading
/// `www.`, `utm_*` tracking parameters and trailing slashes, and sorts the
/// remaining query parameters.
pub fn normalize_url(input: &str) -> Result<String, url::ParseError> {
    let trimmed = input.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed.trim_start_matches("//"))
    };

    let url = Url::parse(&with_scheme)?;
    let host = url.host_str().ok_or(url::ParseError::EmptyHost)?;
    let host = host.strip_prefix("www.").unwrap_or(host);

    let mut out = format!("{}://{}", url.scheme(), host);
    if let Some(port) = url.port() {
        out.push_str(&format!(":{}", port));
    }
    out.push_str(url.path().trim_end_matches('/'));

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !k.to_ascii_lowercase().starts_with("utm_"))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if !pairs.is_empty() {
        pairs.sort();
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        out.push('?');
        out.push_str(&query);
    }

    if let Some(fragment) = url.fragment() {
        out.push('#');
        out.push_str(fragment);
    }

    Ok(out)
}

// =============================================================================
// EMAIL DOMAIN
// =============================================================================
/// What an email address says about the user's organization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainElements {
    pub domain: Option<String>,
    pub website: Option<String>,
    /// Title-cased guess from the first domain label
    pub company: Option<String>,
}

/// Host part of an email address or URL, lowercased and without `www.`.
pub fn email_domain(email: &str) -> String {
    let host = email.rsplit('@').next().unwrap_or(email);
    normalize_url(host)
        .ok()
        .and_then(|u| u.split("://").nth(1).map(str::to_string))
        .unwrap_or_else(|| host.to_lowercase())
}

/// Derive organization hints from a work email. Free-mail domains yield none.
pub fn domain_elements(email: &str) -> DomainElements {
    let domain = email_domain(email);
    if domain.is_empty() || EMAIL_DOMAINS.contains(&domain.as_str()) {
        return DomainElements::default();
    }

    let company = domain.split('.').next().map(start_case);
    DomainElements {
        website: Some(format!("https://{}", domain)),
        company,
        domain: Some(domain),
    }
}

/// `"acme-labs"` -> `"Acme Labs"`
fn start_case(word: &str) -> String {
    word.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message<T: std::fmt::Debug>(result: Result<T, ValidationError>) -> String {
        result.unwrap_err().message
    }

    #[test]
    fn test_username_rules() {
        assert_eq!(username(Some("Kody_42")).unwrap(), "kody_42");
        assert_eq!(message(username(None)), "Username is required");
        assert_eq!(message(username(Some("ab"))), "Username is too short");
        assert_eq!(message(username(Some("a".repeat(21).as_str()))), "Username is too long");
        assert_eq!(
            message(username(Some("kody!"))),
            "Username can only include letters, numbers, and underscores"
        );
    }

    #[test]
    fn test_password_rules() {
        assert!(password(Some("hunter2")).is_ok());
        assert_eq!(message(password(Some("short"))), "Password is too short");
        assert_eq!(message(password(Some("x".repeat(101).as_str()))), "Password is too long");
    }

    #[test]
    fn test_confirm_password() {
        assert_eq!(confirm_password(Some("secret1"), Some("secret1")).unwrap(), "secret1");

        let err = confirm_password(Some("secret1"), Some("secret2")).unwrap_err();
        assert_eq!(err.field, "confirmPassword");
        assert_eq!(err.message, "The passwords must match");

        let err = confirm_password(Some("secret1"), Some("abc")).unwrap_err();
        assert_eq!(err.field, "confirmPassword");
    }

    #[test]
    fn test_email_rules() {
        assert_eq!(email(Some("Kody@Example.COM")).unwrap(), "kody@example.com");
        assert_eq!(message(email(Some("not-an-email"))), "Email is invalid");
        assert_eq!(message(email(None)), "Email is required");

        let long = format!("{}@example.com", "a".repeat(95));
        assert_eq!(message(email(Some(long.as_str()))), "Email is too long");
    }

    #[test]
    fn test_name_length() {
        assert!(name(Some("Ada Lovelace")).is_ok());
        assert!(name(Some("")).is_ok());
        assert_eq!(message(name(Some("n".repeat(41).as_str()))), "Name is too long");
        assert_eq!(message(company_name(Some("n".repeat(41).as_str()))), "Name is too long");
    }

    #[test]
    fn test_phone_formatted_international() {
        assert_eq!(phone(Some("(213) 373-4253")).unwrap(), "+1 213-373-4253");
        assert_eq!(phone(Some("+1 213 373 4253")).unwrap(), "+1 213-373-4253");
    }

    #[test]
    fn test_phone_rejections() {
        assert_eq!(message(phone(None)), "Phone is required");

        let err = phone(Some("call me")).unwrap_err();
        assert_eq!(err.field, "phone");
        assert!(err.message.starts_with("Phone is invalid: "), "{}", err.message);

        assert!(message(phone(Some("12"))).starts_with("Phone is invalid: "));
        assert!(message(phone(Some("+1 213 373 4253 1234 5678"))).starts_with("Phone is invalid: "));
    }

    #[test]
    fn test_linkedin_profile() {
        assert_eq!(
            linkedin_profile(Some("https://www.linkedin.com/in/kody/")).unwrap(),
            "https://linkedin.com/in/kody"
        );
        assert_eq!(message(linkedin_profile(Some("linkedin.com/in/kody"))), "LinkedIn URL is invalid");
        assert_eq!(
            message(linkedin_profile(Some("https://linkedin.com/company/acme"))),
            "URL should include https://linkedin.com/in/"
        );
        assert!(linkedin_company(Some("https://linkedin.com/company/acme")).is_ok());
    }

    #[test]
    fn test_domain_rules() {
        assert_eq!(domain(Some("acme.io")).unwrap(), "acme.io");
        assert_eq!(message(domain(Some("acme"))), "Domain is invalid");
        assert_eq!(message(domain(Some("a.b"))), "Domain is too short");
    }

    #[test]
    fn test_website_normalized() {
        assert_eq!(
            website(Some("https://www.Acme.io/?utm_source=x&b=2&a=1")).unwrap(),
            "https://acme.io?a=1&b=2"
        );
        assert_eq!(message(website(Some("acme"))), "Website is invalid");
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("acme.io").unwrap(), "https://acme.io");
        assert_eq!(normalize_url("//acme.io/docs/").unwrap(), "https://acme.io/docs");
        assert_eq!(normalize_url("http://user:pw@acme.io:8080").unwrap(), "http://acme.io:8080");
        assert_eq!(normalize_url("https://acme.io:443/").unwrap(), "https://acme.io");
    }

    #[test]
    fn test_domain_elements_for_work_email() {
        let elements = domain_elements("jane@acme-labs.io");
        assert_eq!(elements.domain.as_deref(), Some("acme-labs.io"));
        assert_eq!(elements.website.as_deref(), Some("https://acme-labs.io"));
        assert_eq!(elements.company.as_deref(), Some("Acme Labs"));
    }

    #[test]
    fn test_domain_elements_for_free_mail() {
        assert_eq!(domain_elements("jane@gmail.com"), DomainElements::default());
        assert_eq!(domain_elements("jane@Yahoo.co.uk"), DomainElements::default());
    }
}
