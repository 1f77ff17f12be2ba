// src/schools/validators.rs

use super::models::{is_known_level, CreateSchoolRequest};
use crate::common::{ValidationResult, Validator};

pub struct SchoolValidator;

impl Validator<CreateSchoolRequest> for SchoolValidator {
    fn validate(&self, data: &CreateSchoolRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.name.trim().is_empty() {
            result.add_error("name", "School name is required");
        }
        if data.name.len() > 200 {
            result.add_error("name", "School name must not exceed 200 characters");
        }

        if let Some(level) = data.level {
            if !is_known_level(level) {
                result.add_error("level", "Unknown school level code");
            }
        }

        if let Some(nces_id) = &data.nces_id {
            if !nces_id.is_empty() && !nces_id.chars().all(|c| c.is_ascii_alphanumeric()) {
                result.add_error("ncesId", "NCES id must be alphanumeric");
            }
        }

        if let Some(website) = &data.website {
            if !website.is_empty()
                && !(website.starts_with("http://") || website.starts_with("https://"))
            {
                result.add_error("website", "Website must start with http:// or https://");
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str) -> CreateSchoolRequest {
        CreateSchoolRequest {
            name: name.to_string(),
            level: None,
            nces_id: None,
            address: None,
            phone: None,
            website: None,
        }
    }

    #[test]
    fn test_name_is_required() {
        let result = SchoolValidator.validate(&request(""));
        assert!(!result.is_valid);
        assert_eq!(result.errors[0].field, "name");
    }

    #[test]
    fn test_unknown_level_is_rejected() {
        let mut req = request("Ridgeline High");
        req.level = Some(999);
        assert!(!SchoolValidator.validate(&req).is_valid);
    }

    #[test]
    fn test_known_levels_pass() {
        for level in [510, 520, 530, 540, 550, 555, 560, 570] {
            let mut req = request("Ridgeline High");
            req.level = Some(level);
            assert!(SchoolValidator.validate(&req).is_valid);
        }
    }

    #[test]
    fn test_bad_website_is_rejected() {
        let mut req = request("Ridgeline High");
        req.website = Some("ridgeline.example.com".to_string());
        let result = SchoolValidator.validate(&req);
        assert!(!result.is_valid);
        assert_eq!(result.errors[0].field, "website");
    }

    #[test]
    fn test_nces_id_must_be_alphanumeric() {
        let mut req = request("Ridgeline High");
        req.nces_id = Some("16-0480".to_string());
        assert!(!SchoolValidator.validate(&req).is_valid);
    }
}
