//! Update dispatcher: routes classified updates to the catalog handlers or
//! the dialogue machine and carries out the effects the machine requests.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::auth::AdminGate;
use crate::catalog::{Catalog, CatalogEntry, UpdateOutcome};
use crate::dialogue::Category;
use crate::localization::{t, t_args};
use crate::media::MediaIngestion;
use crate::session::SessionStore;

use super::catalog_handler::{self, deliver};
use super::classifier::{classify, Classified, Command, CommandName, Inbound, MenuButton};
use super::dialogue_manager::{
    transition, DialogueContext, DialogueEvent, Effect, Reply, SessionChange,
};
use super::transport::ChatTransport;
use super::ui_builder::Keyboard;

/// Split `/addsong` arguments into exactly three trimmed parts
pub fn parse_addsong_args(args: &str) -> Option<(String, String, String)> {
    let parts: Vec<&str> = args.split('|').map(str::trim).collect();
    match parts.as_slice() {
        [title, lyrics, image_url] if !title.is_empty() => {
            Some((title.to_string(), lyrics.to_string(), image_url.to_string()))
        }
        _ => None,
    }
}

pub struct UpdateDispatcher {
    catalog: Arc<dyn Catalog>,
    media: Arc<dyn MediaIngestion>,
    transport: Arc<dyn ChatTransport>,
    sessions: Arc<SessionStore>,
    gate: AdminGate,
}

impl UpdateDispatcher {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        media: Arc<dyn MediaIngestion>,
        transport: Arc<dyn ChatTransport>,
        sessions: Arc<SessionStore>,
        gate: AdminGate,
    ) -> Self {
        Self {
            catalog,
            media,
            transport,
            sessions,
            gate,
        }
    }

    /// Handle one inbound update. Collaborator failures are logged and
    /// answered here, so nothing escapes to the update loop.
    pub async fn handle(&self, inbound: Inbound) {
        let classified = classify(&inbound.kind);
        debug!(
            user_id = inbound.sender_id,
            chat_id = inbound.chat_id,
            event = ?classified,
            "Dispatching update"
        );

        match classified {
            Classified::Command(command) => self.handle_command(&inbound, command).await,
            Classified::MenuButton(button) => self.handle_button(&inbound, button).await,
            Classified::FreeText(text) => {
                if !self.drive(&inbound, DialogueEvent::Text(text.clone())).await {
                    catalog_handler::browse_text(
                        self.catalog.as_ref(),
                        self.transport.as_ref(),
                        inbound.chat_id,
                        &text,
                    )
                    .await;
                }
            }
            Classified::PhotoAttachment(reference) => {
                if !self.drive(&inbound, DialogueEvent::Photo(reference.clone())).await {
                    self.upload_standalone(&inbound, Some(&reference)).await;
                }
            }
            Classified::InlineCallback(data) => {
                catalog_handler::handle_callback(
                    self.catalog.as_ref(),
                    self.transport.as_ref(),
                    inbound.chat_id,
                    &data,
                )
                .await;
            }
            Classified::Unsupported => {
                self.say(inbound.chat_id, &t("unsupported-message"), None).await;
            }
        }
    }

    async fn handle_command(&self, inbound: &Inbound, command: Command) {
        let chat_id = inbound.chat_id;
        match command.name {
            CommandName::Start => {
                self.say(chat_id, &t("welcome"), Some(&Keyboard::MainMenu)).await;
            }
            CommandName::Help => self.say(chat_id, &t("help"), None).await,
            CommandName::Lyrics => {
                if command.args.is_empty() {
                    self.say(chat_id, &t("lyrics-usage"), None).await;
                } else {
                    catalog_handler::show_song(
                        self.catalog.as_ref(),
                        self.transport.as_ref(),
                        chat_id,
                        &command.args,
                    )
                    .await;
                }
            }
            CommandName::AddSong => self.add_song_command(inbound, &command.args).await,
            CommandName::UploadImage => {
                self.upload_standalone(inbound, command.photo.as_deref()).await
            }
            CommandName::Cancel => {
                self.drive(inbound, DialogueEvent::CancelCommand).await;
            }
            CommandName::Unknown(_) => {
                catalog_handler::unknown_command(
                    self.catalog.as_ref(),
                    self.transport.as_ref(),
                    chat_id,
                    &command.raw,
                )
                .await;
            }
        }
    }

    async fn handle_button(&self, inbound: &Inbound, button: MenuButton) {
        let chat_id = inbound.chat_id;
        let catalog = self.catalog.as_ref();
        let transport = self.transport.as_ref();

        match button {
            MenuButton::SearchLyrics => self.say(chat_id, &t("search-prompt"), None).await,
            MenuButton::ViewAllSongs => self.say(chat_id, &t("alphabet-prompt"), None).await,
            MenuButton::ChoirSongs => {
                catalog_handler::list_category(catalog, transport, chat_id, Category::Choir).await
            }
            MenuButton::NonChoirSongs => {
                catalog_handler::list_category(catalog, transport, chat_id, Category::NonChoir)
                    .await
            }
            MenuButton::RandomSong => catalog_handler::random_song(catalog, transport, chat_id).await,
            MenuButton::Help => self.say(chat_id, &t("help"), None).await,
            MenuButton::UploadImage => {
                let key = if self.gate.is_privileged(inbound.sender_id) {
                    "upload-prompt"
                } else {
                    "not-authorized-upload"
                };
                self.say(chat_id, &t(key), None).await;
            }
            MenuButton::AddSong => {
                self.drive(inbound, DialogueEvent::StartAdd).await;
            }
            MenuButton::EditSong => {
                self.drive(inbound, DialogueEvent::StartEdit).await;
            }
            MenuButton::EditField(field) => {
                if !self.drive(inbound, DialogueEvent::FieldChosen(field)).await {
                    catalog_handler::browse_text(catalog, transport, chat_id, button.label()).await;
                }
            }
            MenuButton::Cancel => {
                if !self.drive(inbound, DialogueEvent::CancelButton).await {
                    catalog_handler::browse_text(catalog, transport, chat_id, button.label()).await;
                }
            }
        }
    }

    /// Feed an event (and any follow-ups it produces) through the dialogue
    /// machine. Returns false when the first event was not a dialog event.
    async fn drive(&self, inbound: &Inbound, event: DialogueEvent) -> bool {
        let ctx = DialogueContext {
            user_id: inbound.sender_id,
            privileged: self.gate.is_privileged(inbound.sender_id),
        };
        let mut pending = VecDeque::from([event]);
        let mut handled = false;

        while let Some(event) = pending.pop_front() {
            let session = self.sessions.get(ctx.user_id).await;
            let before = session.as_ref().map(|s| s.stage.name()).unwrap_or("idle");
            let Some(step) = transition(session.as_ref(), &ctx, event) else {
                break;
            };
            handled = true;

            match step.change {
                SessionChange::Unchanged => {}
                SessionChange::Put(next) => {
                    debug!(user_id = ctx.user_id, from = before, to = next.stage.name(), "Stage changed");
                    self.sessions.put(ctx.user_id, next).await;
                }
                SessionChange::Delete => {
                    debug!(user_id = ctx.user_id, from = before, to = "idle", "Session ended");
                    self.sessions.delete(ctx.user_id).await;
                }
            }

            for effect in step.effects {
                if let Some(follow_up) = self.run_effect(inbound.chat_id, effect).await {
                    pending.push_back(follow_up);
                }
            }
        }

        handled
    }

    async fn run_effect(&self, chat_id: i64, effect: Effect) -> Option<DialogueEvent> {
        match effect {
            Effect::Reply(reply) => {
                self.send_reply(chat_id, &reply).await;
                None
            }
            Effect::LookupTitle { title } => match self.catalog.find_by_title(&title).await {
                Ok(found) => Some(DialogueEvent::TitleChecked {
                    title,
                    found: found.is_some(),
                }),
                Err(e) => {
                    error!(chat_id, title = %title, error = %e, "Edit lookup failed");
                    self.say(chat_id, &t("catalog-unavailable"), None).await;
                    None
                }
            },
            Effect::IngestMedia { reference } => match self.media.ingest(&reference).await {
                Ok(url) => {
                    info!(chat_id, url = %url, "Image re-hosted");
                    Some(DialogueEvent::ImageResolved(url))
                }
                Err(e) => {
                    error!(chat_id, error = %e, "Image ingestion failed");
                    Some(DialogueEvent::ImageFailed(e.to_string()))
                }
            },
            Effect::InsertEntry(entry) => {
                self.insert_entry(chat_id, &entry).await;
                None
            }
            Effect::UpdateField { title, value } => {
                let key = match self.catalog.update_field(&title, &value).await {
                    Ok(UpdateOutcome::Updated) => {
                        info!(chat_id, title = %title, field = %value.field(), "Song updated");
                        "song-updated"
                    }
                    Ok(UpdateOutcome::NotFound) => "song-update-not-found",
                    Err(e) => {
                        error!(chat_id, title = %title, error = %e, "Song update failed");
                        "song-update-failed"
                    }
                };
                let text = t_args(key, &[("title", title.as_str()), ("field", value.field().name())]);
                self.say(chat_id, &text, Some(&Keyboard::MainMenu)).await;
                None
            }
        }
    }

    async fn insert_entry(&self, chat_id: i64, entry: &CatalogEntry) {
        let key = match self.catalog.insert(entry).await {
            Ok(()) => {
                info!(chat_id, title = %entry.title, "Song added");
                "song-added"
            }
            Err(e) => {
                error!(chat_id, title = %entry.title, error = %e, "Song insert failed");
                "song-add-failed"
            }
        };
        let text = t_args(key, &[("title", entry.title.as_str())]);
        self.say(chat_id, &text, Some(&Keyboard::MainMenu)).await;
    }

    async fn add_song_command(&self, inbound: &Inbound, args: &str) {
        if !self.gate.is_privileged(inbound.sender_id) {
            self.say(inbound.chat_id, &t("not-authorized-add"), None).await;
            return;
        }
        match parse_addsong_args(args) {
            Some((title, lyrics, image_url)) => {
                let entry = CatalogEntry::new(title, lyrics, None, image_url);
                self.insert_entry(inbound.chat_id, &entry).await;
            }
            None => self.say(inbound.chat_id, &t("addsong-usage"), None).await,
        }
    }

    /// Re-host a photo outside of any dialog and reply with its public URL
    async fn upload_standalone(&self, inbound: &Inbound, reference: Option<&str>) {
        let chat_id = inbound.chat_id;
        if !self.gate.is_privileged(inbound.sender_id) {
            self.say(chat_id, &t("not-authorized-upload"), None).await;
            return;
        }
        let Some(reference) = reference else {
            self.say(chat_id, &t("upload-prompt"), None).await;
            return;
        };

        self.say(chat_id, &t("image-uploading"), None).await;
        match self.media.ingest(reference).await {
            Ok(url) => {
                info!(chat_id, url = %url, "Standalone image uploaded");
                self.say(chat_id, &t_args("image-uploaded", &[("url", url.as_str())]), None).await;
            }
            Err(e) => {
                warn!(chat_id, error = %e, "Standalone image upload failed");
                self.say(chat_id, &t("image-upload-error"), None).await;
            }
        }
    }

    async fn send_reply(&self, chat_id: i64, reply: &Reply) {
        let args: Vec<(&str, &str)> = reply
            .args
            .iter()
            .map(|(name, value)| (*name, value.as_str()))
            .collect();
        let text = t_args(reply.key, &args);
        self.say(chat_id, &text, reply.keyboard.as_ref()).await;
    }

    async fn say(&self, chat_id: i64, text: &str, keyboard: Option<&Keyboard>) {
        deliver(self.transport.as_ref(), chat_id, text, keyboard).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_addsong_args() {
        assert_eq!(
            parse_addsong_args(" Night Song | La la la | https://x/y.png "),
            Some((
                "Night Song".to_string(),
                "La la la".to_string(),
                "https://x/y.png".to_string()
            ))
        );
        assert_eq!(parse_addsong_args("Night Song|La la la"), None);
        assert_eq!(parse_addsong_args("a|b|c|d"), None);
        assert_eq!(parse_addsong_args(" |b|c"), None);
        assert_eq!(parse_addsong_args(""), None);
    }
}
