//! Event Classifier: turns a raw inbound update into exactly one event kind

use crate::dialogue::EditField;

/// Transport-neutral inbound update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub sender_id: u64,
    pub chat_id: i64,
    pub kind: InboundKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundKind {
    Text(String),
    /// Largest photo size reference plus the optional caption
    Photo {
        reference: String,
        caption: Option<String>,
    },
    Callback {
        data: String,
    },
    /// Stickers, voice notes, documents and anything else without a handler
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandName {
    Start,
    Help,
    Lyrics,
    AddSong,
    UploadImage,
    Cancel,
    Unknown(String),
}

impl CommandName {
    fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "start" => CommandName::Start,
            "help" => CommandName::Help,
            "lyrics" => CommandName::Lyrics,
            "addsong" => CommandName::AddSong,
            "uploadimage" => CommandName::UploadImage,
            "cancel" => CommandName::Cancel,
            _ => CommandName::Unknown(name.to_string()),
        }
    }
}

/// Slash command with its argument text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: CommandName,
    pub args: String,
    /// The full message text, used when echoing unknown commands
    pub raw: String,
    /// Photo attached to the command message (command sent as a caption)
    pub photo: Option<String>,
}

/// Parse `/name[@bot] args` into a command
pub fn parse_command(text: &str) -> Option<Command> {
    let body = text.strip_prefix('/')?;
    let (head, args) = match body.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (body, ""),
    };
    let name = head.split('@').next().unwrap_or(head);
    if name.is_empty() {
        return None;
    }

    Some(Command {
        name: CommandName::parse(name),
        args: args.to_string(),
        raw: text.to_string(),
        photo: None,
    })
}

/// Reply keyboard labels, matched by exact string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuButton {
    SearchLyrics,
    ViewAllSongs,
    ChoirSongs,
    NonChoirSongs,
    RandomSong,
    UploadImage,
    AddSong,
    EditSong,
    Help,
    EditField(EditField),
    Cancel,
}

impl MenuButton {
    /// Main-menu buttons in keyboard order
    pub const MAIN_MENU: [MenuButton; 9] = [
        MenuButton::SearchLyrics,
        MenuButton::ViewAllSongs,
        MenuButton::ChoirSongs,
        MenuButton::NonChoirSongs,
        MenuButton::RandomSong,
        MenuButton::UploadImage,
        MenuButton::AddSong,
        MenuButton::EditSong,
        MenuButton::Help,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MenuButton::SearchLyrics => "🎵 Search Lyrics",
            MenuButton::ViewAllSongs => "📝 View All Songs",
            MenuButton::ChoirSongs => "👥 Choir Songs",
            MenuButton::NonChoirSongs => "🎵 Non-Choir Songs",
            MenuButton::RandomSong => "🎲 Random Song",
            MenuButton::UploadImage => "⬆️ Upload Image",
            MenuButton::AddSong => "➕ Add Song",
            MenuButton::EditSong => "✏️ Edit Song",
            MenuButton::Help => "❓ Help",
            MenuButton::EditField(field) => field.label(),
            MenuButton::Cancel => "Cancel",
        }
    }

    pub fn from_label(text: &str) -> Option<Self> {
        if text == MenuButton::Cancel.label() {
            return Some(MenuButton::Cancel);
        }
        if let Some(button) = Self::MAIN_MENU.into_iter().find(|b| b.label() == text) {
            return Some(button);
        }
        EditField::ALL
            .into_iter()
            .find(|field| field.label() == text)
            .map(MenuButton::EditField)
    }
}

/// One classified event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    Command(Command),
    MenuButton(MenuButton),
    FreeText(String),
    PhotoAttachment(String),
    InlineCallback(String),
    Unsupported,
}

/// Classify a raw update. Commands win over button labels, which win over
/// free text, so a label typed inside a flow is always read as the button.
pub fn classify(kind: &InboundKind) -> Classified {
    match kind {
        InboundKind::Text(text) => {
            if let Some(command) = parse_command(text) {
                Classified::Command(command)
            } else if let Some(button) = MenuButton::from_label(text) {
                Classified::MenuButton(button)
            } else {
                Classified::FreeText(text.clone())
            }
        }
        InboundKind::Photo { reference, caption } => {
            match caption.as_deref().and_then(parse_command) {
                Some(mut command) => {
                    command.photo = Some(reference.clone());
                    Classified::Command(command)
                }
                None => Classified::PhotoAttachment(reference.clone()),
            }
        }
        InboundKind::Callback { data } => Classified::InlineCallback(data.clone()),
        InboundKind::Other => Classified::Unsupported,
    }
}
