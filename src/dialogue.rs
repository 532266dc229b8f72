//! Song dialogue module describing per-user conversation state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Song category as shown on the category keyboard
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Choir,
    NonChoir,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Choir, Category::NonChoir];

    /// Label used on buttons and stored in the catalog
    pub fn label(self) -> &'static str {
        match self {
            Category::Choir => "Choir",
            Category::NonChoir => "Non-Choir",
        }
    }

    /// Exact match against the category labels
    pub fn from_label(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == text)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Catalog field an admin can change in the edit flow
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditField {
    Title,
    Lyrics,
    Category,
    Image,
}

impl EditField {
    pub const ALL: [EditField; 4] = [
        EditField::Title,
        EditField::Lyrics,
        EditField::Category,
        EditField::Image,
    ];

    /// Normalized field name (`title`, `lyrics`, `category`, `image`)
    pub fn name(self) -> &'static str {
        match self {
            EditField::Title => "title",
            EditField::Lyrics => "lyrics",
            EditField::Category => "category",
            EditField::Image => "image",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Button label, e.g. "Edit Title"
    pub fn label(self) -> &'static str {
        match self {
            EditField::Title => "Edit Title",
            EditField::Lyrics => "Edit Lyrics",
            EditField::Category => "Edit Category",
            EditField::Image => "Edit Image",
        }
    }

    /// Field named by the lower-cased second word of a button label
    pub fn from_label(label: &str) -> Option<Self> {
        let mut words = label.split_whitespace();
        if words.next()? != "Edit" {
            return None;
        }
        let field = Self::from_name(&words.next()?.to_lowercase())?;
        match words.next() {
            None => Some(field),
            Some(_) => None,
        }
    }
}

impl fmt::Display for EditField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fully resolved value for a single-field catalog update
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Title(String),
    Lyrics(String),
    Category(Category),
    ImageUrl(String),
}

impl FieldValue {
    pub fn field(&self) -> EditField {
        match self {
            FieldValue::Title(_) => EditField::Title,
            FieldValue::Lyrics(_) => EditField::Lyrics,
            FieldValue::Category(_) => EditField::Category,
            FieldValue::ImageUrl(_) => EditField::Image,
        }
    }

    pub fn as_text(&self) -> &str {
        match self {
            FieldValue::Title(s) | FieldValue::Lyrics(s) | FieldValue::ImageUrl(s) => s,
            FieldValue::Category(c) => c.label(),
        }
    }
}

/// Input accepted by an image step
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageSource {
    /// Chat-native attachment that still has to be fetched and re-hosted
    RawMedia(String),
    /// URL supplied directly by the user, used verbatim
    DirectUrl(String),
}

/// Discrete step of a multi-turn flow. Each variant carries what the flow
/// has accumulated so far.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    AwaitingTitle,
    AwaitingCategory {
        title: String,
    },
    AwaitingLyrics {
        title: String,
        category: Category,
    },
    AwaitingImage {
        title: String,
        category: Category,
        lyrics: String,
    },
    EditSelectSong,
    EditSelectField {
        title: String,
    },
    EditEnterValue {
        title: String,
        field: EditField,
    },
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::AwaitingTitle => "awaiting_title",
            Stage::AwaitingCategory { .. } => "awaiting_category",
            Stage::AwaitingLyrics { .. } => "awaiting_lyrics",
            Stage::AwaitingImage { .. } => "awaiting_image",
            Stage::EditSelectSong => "edit_select_song",
            Stage::EditSelectField { .. } => "edit_select_field",
            Stage::EditEnterValue { .. } => "edit_enter_value",
        }
    }

    pub fn is_editing(&self) -> bool {
        matches!(
            self,
            Stage::EditSelectSong | Stage::EditSelectField { .. } | Stage::EditEnterValue { .. }
        )
    }
}

/// Active dialog of one user. Absence of a session is the idle state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub owner: u64,
    pub stage: Stage,
}

impl Session {
    pub fn new(owner: u64, stage: Stage) -> Self {
        Self { owner, stage }
    }

    /// Same owner, next stage
    pub fn advance(&self, stage: Stage) -> Self {
        Self::new(self.owner, stage)
    }

    pub fn title(&self) -> Option<&str> {
        match &self.stage {
            Stage::AwaitingCategory { title }
            | Stage::AwaitingLyrics { title, .. }
            | Stage::AwaitingImage { title, .. }
            | Stage::EditSelectField { title }
            | Stage::EditEnterValue { title, .. } => Some(title),
            Stage::AwaitingTitle | Stage::EditSelectSong => None,
        }
    }

    pub fn category(&self) -> Option<Category> {
        match &self.stage {
            Stage::AwaitingLyrics { category, .. } | Stage::AwaitingImage { category, .. } => {
                Some(*category)
            }
            _ => None,
        }
    }

    pub fn lyrics(&self) -> Option<&str> {
        match &self.stage {
            Stage::AwaitingImage { lyrics, .. } => Some(lyrics),
            _ => None,
        }
    }

    pub fn edit_field(&self) -> Option<EditField> {
        match &self.stage {
            Stage::EditEnterValue { field, .. } => Some(*field),
            _ => None,
        }
    }
}

/// Validates a song title input
pub fn validate_title(title: &str) -> Result<String, &'static str> {
    let trimmed = title.trim();

    if trimmed.is_empty() {
        return Err("empty");
    }

    if trimmed.len() > 255 {
        return Err("too_long");
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_validation() {
        assert!(validate_title("Night Song").is_ok());
        assert!(validate_title("  Amazing Grace  ").is_ok());

        assert_eq!(validate_title(""), Err("empty"));
        assert_eq!(validate_title("   "), Err("empty"));
        assert_eq!(validate_title(&"a".repeat(256)), Err("too_long"));
    }

    #[test]
    fn test_title_trimming() {
        assert_eq!(validate_title("  Night Song  ").unwrap(), "Night Song");
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(Category::from_label("Choir"), Some(Category::Choir));
        assert_eq!(Category::from_label("Non-Choir"), Some(Category::NonChoir));
        assert_eq!(Category::from_label("choir"), None);
        assert_eq!(Category::from_label("Gospel"), None);
    }

    #[test]
    fn test_edit_field_from_label() {
        assert_eq!(EditField::from_label("Edit Title"), Some(EditField::Title));
        assert_eq!(EditField::from_label("Edit Image"), Some(EditField::Image));
        assert_eq!(EditField::from_label("Edit Chorus"), None);
        assert_eq!(EditField::from_label("Title"), None);
        assert_eq!(EditField::from_label("Edit Title Now"), None);

        for field in EditField::ALL {
            assert_eq!(EditField::from_label(field.label()), Some(field));
        }
    }

    #[test]
    fn test_session_accessors() {
        let session = Session::new(
            7,
            Stage::AwaitingImage {
                title: "Night Song".to_string(),
                category: Category::Choir,
                lyrics: "La la la".to_string(),
            },
        );
        assert_eq!(session.title(), Some("Night Song"));
        assert_eq!(session.category(), Some(Category::Choir));
        assert_eq!(session.lyrics(), Some("La la la"));
        assert_eq!(session.edit_field(), None);
        assert!(!session.stage.is_editing());
    }
}
