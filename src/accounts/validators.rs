// src/accounts/validators.rs

use regex::Regex;

use super::models::UpdateAccountRequest;
use crate::common::{ValidationResult, Validator};

pub struct AccountValidator;

impl Validator<UpdateAccountRequest> for AccountValidator {
    fn validate(&self, data: &UpdateAccountRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.name.trim().is_empty() {
            result.add_error("name", "Name is required");
        }
        if data.name.len() > 100 {
            result.add_error("name", "Name must not exceed 100 characters");
        }

        if let Some(email) = &data.email {
            if !email.is_empty() && !is_valid_email(email) {
                result.add_error("email", "Email address is not valid");
            }
        }

        if let Some(phone) = &data.phone {
            if !phone.is_empty() && !is_valid_phone(phone) {
                result.add_error("phone", "Phone number is not valid");
            }
        }

        if let Some(notes) = &data.notes {
            if notes.len() > 2000 {
                result.add_error("notes", "Notes must not exceed 2000 characters");
            }
        }

        result
    }
}

fn is_valid_email(email: &str) -> bool {
    // One @, something on both sides, a dot in the domain
    match Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$") {
        Ok(re) => re.is_match(email),
        Err(_) => false,
    }
}

fn is_valid_phone(phone: &str) -> bool {
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    if !(7..=15).contains(&digits) {
        return false;
    }
    match Regex::new(r"^\+?[0-9\s\-\(\)\.]+$") {
        Ok(re) => re.is_match(phone),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str) -> UpdateAccountRequest {
        UpdateAccountRequest {
            name: name.to_string(),
            email: None,
            phone: None,
            address: None,
            is_public: None,
            notes: None,
        }
    }

    #[test]
    fn test_name_is_required() {
        let result = AccountValidator.validate(&request("   "));
        assert!(!result.is_valid);
        assert_eq!(result.errors[0].field, "name");
    }

    #[test]
    fn test_name_length_limit() {
        let result = AccountValidator.validate(&request(&"x".repeat(101)));
        assert!(!result.is_valid);
    }

    #[test]
    fn test_valid_request_passes() {
        let mut req = request("Pat Volunteer");
        req.email = Some("pat@example.com".to_string());
        req.phone = Some("+1 (208) 555-0147".to_string());
        req.notes = Some("Available weekday mornings".to_string());
        assert!(AccountValidator.validate(&req).is_valid);
    }

    #[test]
    fn test_bad_email_is_rejected() {
        let mut req = request("Pat");
        req.email = Some("not-an-email".to_string());
        let result = AccountValidator.validate(&req);
        assert!(!result.is_valid);
        assert_eq!(result.errors[0].field, "email");
    }

    #[test]
    fn test_bad_phone_is_rejected() {
        let mut req = request("Pat");
        req.phone = Some("call me maybe".to_string());
        let result = AccountValidator.validate(&req);
        assert!(!result.is_valid);
        assert_eq!(result.errors[0].field, "phone");
    }

    #[test]
    fn test_notes_length_limit() {
        let mut req = request("Pat");
        req.notes = Some("n".repeat(2001));
        assert!(!AccountValidator.validate(&req).is_valid);
    }
}
