//! Dialogue Manager module: the Add/Edit conversation as a pure state machine
//!
//! [`transition`] looks only at the current session, the privilege of the
//! sender and one event. It returns the new session (or its removal) plus a
//! list of [`Effect`]s that the dispatcher carries out afterwards. Effects
//! that need an answer from the outside world (title lookups, image
//! re-hosting) are fed back in as follow-up events.

use crate::catalog::CatalogEntry;
use crate::dialogue::{validate_title, Category, EditField, FieldValue, ImageSource, Session, Stage};

use super::ui_builder::Keyboard;

/// Event understood by the dialogue machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogueEvent {
    StartAdd,
    StartEdit,
    /// `/cancel`
    CancelCommand,
    /// The "Cancel" keyboard button
    CancelButton,
    FieldChosen(EditField),
    Text(String),
    Photo(String),
    /// Result of an [`Effect::LookupTitle`]
    TitleChecked { title: String, found: bool },
    /// Result of an [`Effect::IngestMedia`]
    ImageResolved(String),
    ImageFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialogueContext {
    pub user_id: u64,
    pub privileged: bool,
}

/// Localized message to send, rendered by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub key: &'static str,
    pub args: Vec<(&'static str, String)>,
    pub keyboard: Option<Keyboard>,
}

impl Reply {
    pub fn new(key: &'static str) -> Self {
        Self {
            key,
            args: Vec::new(),
            keyboard: None,
        }
    }

    pub fn arg(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.args.push((name, value.into()));
        self
    }

    pub fn keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Reply(Reply),
    LookupTitle { title: String },
    IngestMedia { reference: String },
    InsertEntry(CatalogEntry),
    UpdateField { title: String, value: FieldValue },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    Unchanged,
    Put(Session),
    Delete,
}

/// Outcome of feeding one event to the machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub change: SessionChange,
    pub effects: Vec<Effect>,
}

impl Transition {
    pub fn unchanged() -> Self {
        Self {
            change: SessionChange::Unchanged,
            effects: Vec::new(),
        }
    }

    pub fn put(session: Session) -> Self {
        Self {
            change: SessionChange::Put(session),
            effects: Vec::new(),
        }
    }

    pub fn delete() -> Self {
        Self {
            change: SessionChange::Delete,
            effects: Vec::new(),
        }
    }

    pub fn reply(self, reply: Reply) -> Self {
        self.effect(Effect::Reply(reply))
    }

    pub fn effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn replies(&self) -> impl Iterator<Item = &Reply> {
        self.effects.iter().filter_map(|effect| match effect {
            Effect::Reply(reply) => Some(reply),
            _ => None,
        })
    }
}

/// Advance the dialog of one user.
///
/// Returns `None` when the event does not belong to a dialog: there is no
/// session, or the sender is no longer privileged. The caller then treats
/// the event as plain browsing.
pub fn transition(
    session: Option<&Session>,
    ctx: &DialogueContext,
    event: DialogueEvent,
) -> Option<Transition> {
    match event {
        DialogueEvent::CancelCommand => {
            return Some(match session {
                Some(session) => cancel(session),
                None => Transition::unchanged(),
            });
        }
        DialogueEvent::StartAdd => {
            return Some(if ctx.privileged {
                Transition::put(Session::new(ctx.user_id, Stage::AwaitingTitle))
                    .reply(Reply::new("prompt-title").keyboard(Keyboard::Remove))
            } else {
                Transition::unchanged().reply(Reply::new("not-authorized-add"))
            });
        }
        DialogueEvent::StartEdit => {
            return Some(if ctx.privileged {
                Transition::put(Session::new(ctx.user_id, Stage::EditSelectSong))
                    .reply(Reply::new("prompt-edit-song").keyboard(Keyboard::Remove))
            } else {
                Transition::unchanged().reply(Reply::new("not-authorized-edit"))
            });
        }
        _ => {}
    }

    let session = session?;
    if !ctx.privileged {
        return None;
    }

    Some(step(session, event))
}

fn step(session: &Session, event: DialogueEvent) -> Transition {
    match (&session.stage, event) {
        (_, DialogueEvent::CancelButton) => cancel(session),

        (Stage::AwaitingTitle, DialogueEvent::Text(text)) => match validate_title(&text) {
            Ok(title) => Transition::put(session.advance(Stage::AwaitingCategory { title }))
                .reply(Reply::new("prompt-category").keyboard(Keyboard::Categories)),
            Err("too_long") => Transition::unchanged().reply(Reply::new("title-too-long")),
            Err(_) => Transition::unchanged().reply(Reply::new("title-invalid")),
        },

        (Stage::AwaitingCategory { title }, DialogueEvent::Text(text)) => {
            match Category::from_label(text.trim()) {
                Some(category) => Transition::put(session.advance(Stage::AwaitingLyrics {
                    title: title.clone(),
                    category,
                }))
                .reply(Reply::new("prompt-lyrics").keyboard(Keyboard::Remove)),
                None => Transition::unchanged().reply(category_reprompt()),
            }
        }

        (Stage::AwaitingLyrics { title, category }, DialogueEvent::Text(lyrics)) => {
            Transition::put(session.advance(Stage::AwaitingImage {
                title: title.clone(),
                category: *category,
                lyrics,
            }))
            .reply(Reply::new("prompt-image"))
        }

        (Stage::AwaitingImage { .. }, DialogueEvent::Text(url)) => {
            add_image(session, ImageSource::DirectUrl(url.trim().to_string()))
        }
        (Stage::AwaitingImage { .. }, DialogueEvent::Photo(reference)) => {
            add_image(session, ImageSource::RawMedia(reference))
        }
        (Stage::AwaitingImage { .. }, DialogueEvent::ImageResolved(url)) => {
            add_image(session, ImageSource::DirectUrl(url))
        }

        (Stage::EditSelectSong, DialogueEvent::Text(text)) => {
            let title = text.trim();
            if title.is_empty() {
                Transition::unchanged().reply(stage_prompt(&session.stage))
            } else {
                Transition::unchanged().effect(Effect::LookupTitle {
                    title: title.to_string(),
                })
            }
        }
        (Stage::EditSelectSong, DialogueEvent::TitleChecked { title, found: true }) => {
            let reply = Reply::new("prompt-edit-field")
                .arg("title", title.clone())
                .keyboard(Keyboard::EditFields);
            Transition::put(session.advance(Stage::EditSelectField { title })).reply(reply)
        }
        (Stage::EditSelectSong, DialogueEvent::TitleChecked { title, found: false }) => {
            Transition::unchanged().reply(Reply::new("edit-song-not-found").arg("title", title))
        }

        (Stage::EditSelectField { title }, DialogueEvent::FieldChosen(field)) => {
            let next = Stage::EditEnterValue {
                title: title.clone(),
                field,
            };
            let reply = stage_prompt(&next);
            Transition::put(session.advance(next)).reply(reply)
        }

        (Stage::EditEnterValue { title, field }, DialogueEvent::Text(text)) => {
            match parse_field_value(*field, &text) {
                Ok(value) => finish_edit(title, value),
                Err(reply) => Transition::unchanged().reply(reply),
            }
        }
        (
            Stage::EditEnterValue {
                field: EditField::Image,
                ..
            },
            DialogueEvent::Photo(reference),
        ) => ingest(reference),
        (
            Stage::EditEnterValue {
                title,
                field: EditField::Image,
            },
            DialogueEvent::ImageResolved(url),
        ) => finish_edit(title, FieldValue::ImageUrl(url)),

        (
            Stage::AwaitingImage { .. }
            | Stage::EditEnterValue {
                field: EditField::Image,
                ..
            },
            DialogueEvent::ImageFailed(_),
        ) => Transition::unchanged().reply(Reply::new("image-upload-failed")),

        // Answers to requests the session has since moved past
        (
            _,
            DialogueEvent::TitleChecked { .. }
            | DialogueEvent::ImageResolved(_)
            | DialogueEvent::ImageFailed(_)
            | DialogueEvent::StartAdd
            | DialogueEvent::StartEdit
            | DialogueEvent::CancelCommand,
        ) => Transition::unchanged(),

        // Input the current stage cannot use
        (stage, DialogueEvent::Text(_) | DialogueEvent::Photo(_) | DialogueEvent::FieldChosen(_)) => {
            Transition::unchanged().reply(stage_prompt(stage))
        }
    }
}

fn cancel(session: &Session) -> Transition {
    let key = if session.stage.is_editing() {
        "edit-cancelled"
    } else {
        "add-cancelled"
    };
    Transition::delete().reply(Reply::new(key).keyboard(Keyboard::MainMenu))
}

fn ingest(reference: String) -> Transition {
    Transition::unchanged()
        .reply(Reply::new("image-uploading"))
        .effect(Effect::IngestMedia { reference })
}

fn add_image(session: &Session, source: ImageSource) -> Transition {
    let Stage::AwaitingImage {
        title,
        category,
        lyrics,
    } = &session.stage
    else {
        return Transition::unchanged().reply(stage_prompt(&session.stage));
    };

    match source {
        ImageSource::RawMedia(reference) => ingest(reference),
        ImageSource::DirectUrl(url) => Transition::delete().effect(Effect::InsertEntry(
            CatalogEntry::new(title.clone(), lyrics.clone(), Some(*category), url),
        )),
    }
}

fn finish_edit(title: &str, value: FieldValue) -> Transition {
    Transition::delete().effect(Effect::UpdateField {
        title: title.to_string(),
        value,
    })
}

fn parse_field_value(field: EditField, text: &str) -> Result<FieldValue, Reply> {
    match field {
        EditField::Title => match validate_title(text) {
            Ok(title) => Ok(FieldValue::Title(title)),
            Err("too_long") => Err(Reply::new("title-too-long")),
            Err(_) => Err(Reply::new("title-invalid")),
        },
        EditField::Lyrics => Ok(FieldValue::Lyrics(text.to_string())),
        EditField::Category => Category::from_label(text.trim())
            .map(FieldValue::Category)
            .ok_or_else(category_reprompt),
        EditField::Image => Ok(FieldValue::ImageUrl(text.trim().to_string())),
    }
}

fn category_reprompt() -> Reply {
    Reply::new("category-invalid").keyboard(Keyboard::Categories)
}

/// What to ask for again when the input does not fit the stage
pub fn stage_prompt(stage: &Stage) -> Reply {
    match stage {
        Stage::AwaitingTitle => Reply::new("prompt-title"),
        Stage::AwaitingCategory { .. } => category_reprompt(),
        Stage::AwaitingLyrics { .. } => Reply::new("prompt-lyrics"),
        Stage::AwaitingImage { .. } => Reply::new("prompt-image"),
        Stage::EditSelectSong => Reply::new("prompt-edit-song"),
        Stage::EditSelectField { title } => Reply::new("prompt-edit-field")
            .arg("title", title.clone())
            .keyboard(Keyboard::EditFields),
        Stage::EditEnterValue {
            field: EditField::Category,
            ..
        } => Reply::new("prompt-edit-category").keyboard(Keyboard::Categories),
        Stage::EditEnterValue {
            field: EditField::Image,
            ..
        } => Reply::new("prompt-edit-image").keyboard(Keyboard::Remove),
        Stage::EditEnterValue { field, .. } => Reply::new("prompt-edit-value")
            .arg("field", field.name())
            .keyboard(Keyboard::Remove),
    }
}
