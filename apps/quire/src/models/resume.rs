use serde::{Deserialize, Serialize};

/// Structured resume content submitted by the user.
///
/// Serialized as-is into template data, so field names double as the placeholder
/// names LaTeX templates use (`{{contact.name}}`, `{{#experience}}`, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResumeData {
    pub contact: Contact,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub experience: Vec<Experience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub links: Vec<String>,
}

impl Contact {
    /// Non-empty contact details in display order.
    pub fn details(&self) -> Vec<&str> {
        [&self.email, &self.phone, &self.location]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .chain(self.links.iter().map(String::as_str))
            .filter(|s| !s.trim().is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Experience {
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Education {
    pub degree: String,
    pub institution: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub details: Vec<String>,
}

/// Formats a `start – end` range, tolerating either side missing.
pub fn date_range(start: Option<&str>, end: Option<&str>) -> Option<String> {
    match (start.filter(|s| !s.is_empty()), end.filter(|s| !s.is_empty())) {
        (Some(s), Some(e)) => Some(format!("{s} – {e}")),
        (Some(s), None) => Some(format!("{s} – Present")),
        (None, Some(e)) => Some(e.to_string()),
        (None, None) => None,
    }
}
