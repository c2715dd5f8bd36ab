use serde::{Deserialize, Serialize};

use super::ExtractedEntities;

pub const MISSING_NAME: &str = "name";
pub const MISSING_CONTACT: &str = "contact (email or phone)";

/// Contact details collected from the person chatting. Fields are
/// first-write-wins for the lifetime of the conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl UserProfile {
    /// Copies any newly extracted contact fields into empty slots and returns
    /// the names of the fields that changed.
    pub fn merge(&mut self, entities: &ExtractedEntities) -> Vec<&'static str> {
        let mut updated = Vec::new();
        if fill(&mut self.name, entities.name.as_deref()) {
            updated.push("name");
        }
        if fill(&mut self.email, entities.email.as_deref()) {
            updated.push("email");
        }
        if fill(&mut self.phone, entities.phone.as_deref()) {
            updated.push("phone");
        }
        updated
    }

    /// Name plus at least one way to reach the person.
    pub fn has_minimum(&self) -> bool {
        self.name.is_some() && (self.email.is_some() || self.phone.is_some())
    }

    pub fn has_ideal(&self) -> bool {
        self.name.is_some() && self.email.is_some() && self.phone.is_some()
    }

    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.is_none() {
            missing.push(MISSING_NAME);
        }
        if self.email.is_none() && self.phone.is_none() {
            missing.push(MISSING_CONTACT);
        }
        missing
    }

    pub fn missing_ideal(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.is_none() {
            missing.push("name");
        }
        if self.email.is_none() {
            missing.push("email");
        }
        if self.phone.is_none() {
            missing.push("phone");
        }
        missing
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none()
    }

    /// Rendered into the generator's system prompt so it knows what is still
    /// needed before a booking can go through.
    pub fn to_prompt(&self) -> String {
        if self.is_empty() {
            return "Current user information: nothing collected yet. A name and at least one \
                    contact method (email or phone) are required before booking."
                .to_string();
        }

        let mut lines = vec!["Current user information:".to_string()];
        if let Some(name) = &self.name {
            lines.push(format!("- Name: {name}"));
        }
        if let Some(email) = &self.email {
            lines.push(format!("- Email: {email}"));
        }
        if let Some(phone) = &self.phone {
            lines.push(format!("- Phone: {phone}"));
        }

        let missing = self.missing_required();
        if missing.is_empty() {
            lines.push("Required information is complete; booking is allowed.".to_string());
            if !self.has_ideal() {
                lines.push(format!(
                    "Optionally ask for: {}.",
                    self.missing_ideal().join(", ")
                ));
            }
        } else {
            lines.push(format!(
                "Missing before booking: {}. Do not promise a booking until it is provided.",
                missing.join(", ")
            ));
        }
        lines.join("\n")
    }
}

fn fill(slot: &mut Option<String>, value: Option<&str>) -> bool {
    match (slot.as_ref(), value) {
        (None, Some(v)) if !v.trim().is_empty() => {
            *slot = Some(v.trim().to_string());
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entities(name: Option<&str>, email: Option<&str>, phone: Option<&str>) -> ExtractedEntities {
        ExtractedEntities {
            name: name.map(String::from),
            email: email.map(String::from),
            phone: phone.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_write_wins() {
        let mut profile = UserProfile::default();
        let updated = profile.merge(&entities(None, None, Some("6308805488")));
        assert_eq!(updated, vec!["phone"]);
        assert_eq!(profile.phone.as_deref(), Some("6308805488"));

        let updated = profile.merge(&entities(None, None, Some("3125550000")));
        assert!(updated.is_empty());
        assert_eq!(profile.phone.as_deref(), Some("6308805488"));
    }

    #[test]
    fn test_minimum_requires_name_and_contact() {
        let mut profile = UserProfile::default();
        assert!(!profile.has_minimum());
        assert_eq!(profile.missing_required(), vec![MISSING_NAME, MISSING_CONTACT]);

        profile.merge(&entities(Some("Jane Doe"), None, None));
        assert!(!profile.has_minimum());
        assert_eq!(profile.missing_required(), vec![MISSING_CONTACT]);

        profile.merge(&entities(None, Some("jane@example.com"), None));
        assert!(profile.has_minimum());
        assert!(!profile.has_ideal());
        assert_eq!(profile.missing_ideal(), vec!["phone"]);
    }

    #[test]
    fn test_ideal_requires_all_three() {
        let mut profile = UserProfile::default();
        profile.merge(&entities(
            Some("Jane Doe"),
            Some("jane@example.com"),
            Some("6308805488"),
        ));
        assert!(profile.has_ideal());
        assert!(profile.missing_ideal().is_empty());
    }

    #[test]
    fn test_blank_values_ignored() {
        let mut profile = UserProfile::default();
        profile.merge(&entities(Some("   "), None, None));
        assert!(profile.name.is_none());
    }

    #[test]
    fn test_prompt_lists_missing_fields() {
        let mut profile = UserProfile::default();
        assert!(profile.to_prompt().contains("nothing collected yet"));

        profile.merge(&entities(Some("Jane Doe"), None, None));
        let prompt = profile.to_prompt();
        assert!(prompt.contains("Name: Jane Doe"));
        assert!(prompt.contains("contact (email or phone)"));
    }
}
