use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Longest title the `tutorials.title` column accepts.
pub const TITLE_MAX_CHARS: usize = 255;

/// A persisted tutorial record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tutorial {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single field-level validation failure, rendered inside `{"errors": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// `{"message": ...}` body used for mutation outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Payload accepted by `POST /api/tutorials`.
///
/// `title` is optional at the serde level so that a missing title is reported
/// as a validation error instead of a JSON rejection.
#[derive(Debug, Default, Deserialize)]
pub struct CreateTutorialRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub published: Option<bool>,
}

/// Payload accepted by `PUT /api/tutorials/:id`. Absent fields are left untouched.
///
/// `description` distinguishes absent (`None`) from an explicit `null`
/// (`Some(None)`), which clears the stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTutorialRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    pub published: Option<bool>,
}

// Wraps whatever was sent, including null, so only a missing key stays `None`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Validated, normalised values for a new tutorial.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTutorial {
    pub title: String,
    pub description: Option<String>,
    pub published: bool,
}

/// Validated, normalised partial update. `description: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TutorialChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub published: Option<bool>,
}

impl TutorialChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.published.is_none()
    }
}

impl Tutorial {
    /// Applies a partial update in place and refreshes `updated_at`.
    pub fn apply(&mut self, changes: &TutorialChanges) {
        if let Some(ref title) = changes.title {
            self.title = title.clone();
        }

        if let Some(ref description) = changes.description {
            self.description = description.clone();
        }

        if let Some(published) = changes.published {
            self.published = published;
        }

        self.updated_at = Utc::now();
    }
}

fn validate_title(title: &str) -> Result<String, FieldError> {
    let title = title.trim();

    if title.is_empty() {
        return Err(FieldError::new("title", "title can not be empty!"));
    }

    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(FieldError::new(
            "title",
            format!("title can not exceed {} characters", TITLE_MAX_CHARS),
        ));
    }

    Ok(title.to_string())
}

// Blank descriptions are stored as NULL.
fn normalize_description(description: Option<&String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

impl CreateTutorialRequest {
    /// Checks the request and produces the values to persist.
    /// `published` falls back to `false` when omitted or null.
    pub fn validate(&self) -> Result<NewTutorial, Vec<FieldError>> {
        let title = match self.title.as_deref() {
            Some(title) => validate_title(title).map_err(|e| vec![e])?,
            None => return Err(vec![FieldError::new("title", "title can not be empty!")]),
        };

        Ok(NewTutorial {
            title,
            description: normalize_description(self.description.as_ref()),
            published: self.published.unwrap_or(false),
        })
    }
}

impl UpdateTutorialRequest {
    pub fn validate(&self) -> Result<TutorialChanges, Vec<FieldError>> {
        let title = match self.title.as_deref() {
            Some(title) => Some(validate_title(title).map_err(|e| vec![e])?),
            None => None,
        };

        Ok(TutorialChanges {
            title,
            description: self
                .description
                .as_ref()
                .map(|d| normalize_description(d.as_ref())),
            published: self.published,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tutorial() -> Tutorial {
        let at = DateTime::parse_from_rfc3339("2022-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        Tutorial {
            id: 7,
            title: "Learn Rust".to_string(),
            description: None,
            published: true,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_create_request_requires_title() {
        let missing = CreateTutorialRequest::default();
        let errors = missing.validate().unwrap_err();
        assert_eq!(errors, vec![FieldError::new("title", "title can not be empty!")]);

        let blank = CreateTutorialRequest {
            title: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(blank.validate().is_err());

        let too_long = CreateTutorialRequest {
            title: Some("a".repeat(TITLE_MAX_CHARS + 1)),
            ..Default::default()
        };
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn test_create_request_defaults_published_to_false() {
        let request: CreateTutorialRequest =
            serde_json::from_str(r#"{"title":"  Learn X  ","description":"   "}"#).unwrap();
        let tutorial = request.validate().unwrap();

        assert_eq!(tutorial.title, "Learn X");
        assert_eq!(tutorial.description, None);
        assert!(!tutorial.published);

        let request: CreateTutorialRequest =
            serde_json::from_str(r#"{"title":"Learn X","published":null}"#).unwrap();
        assert!(!request.validate().unwrap().published);
    }

    #[test]
    fn test_update_request_partial_fields() {
        let empty: UpdateTutorialRequest = serde_json::from_str("{}").unwrap();
        assert!(empty.validate().unwrap().is_empty());

        let publish_only: UpdateTutorialRequest =
            serde_json::from_str(r#"{"published":true}"#).unwrap();
        let changes = publish_only.validate().unwrap();
        assert_eq!(changes.published, Some(true));
        assert_eq!(changes.title, None);

        let blank_title: UpdateTutorialRequest =
            serde_json::from_str(r#"{"title":""}"#).unwrap();
        assert!(blank_title.validate().is_err());
    }

    #[test]
    fn test_apply_changes() {
        let mut tutorial = sample_tutorial();
        let before = tutorial.updated_at;

        tutorial.apply(&TutorialChanges {
            title: Some("Learn Axum".to_string()),
            description: Some(Some("routing".to_string())),
            published: Some(false),
        });

        assert_eq!(tutorial.title, "Learn Axum");
        assert_eq!(tutorial.description.as_deref(), Some("routing"));
        assert!(!tutorial.published);
        assert!(tutorial.updated_at > before);

        tutorial.apply(&TutorialChanges {
            description: Some(None),
            ..Default::default()
        });
        assert_eq!(tutorial.description, None);
        assert_eq!(tutorial.title, "Learn Axum");
    }

    #[test]
    fn test_update_request_clears_description() {
        let absent: UpdateTutorialRequest = serde_json::from_str(r#"{"title":"A"}"#).unwrap();
        assert_eq!(absent.validate().unwrap().description, None);

        for body in [r#"{"description":null}"#, r#"{"description":""}"#, r#"{"description":"  "}"#] {
            let request: UpdateTutorialRequest = serde_json::from_str(body).unwrap();
            let changes = request.validate().unwrap();
            assert_eq!(changes.description, Some(None), "{}", body);
            assert!(!changes.is_empty());
        }

        let request: UpdateTutorialRequest =
            serde_json::from_str(r#"{"description":" new text "}"#).unwrap();
        assert_eq!(
            request.validate().unwrap().description,
            Some(Some("new text".to_string()))
        );
    }

    #[test]
    fn test_tutorial_serialization_uses_camel_case() {
        let json = serde_json::to_string(&sample_tutorial()).unwrap();
        let expected = r#"{"id":7,"title":"Learn Rust","description":null,"published":true,"createdAt":"2022-01-01T00:00:00Z","updatedAt":"2022-01-01T00:00:00Z"}"#;
        assert_eq!(json, expected);
    }
}
