//! In-memory collaborators for driving the dispatcher without Telegram,
//! Postgres or an image host.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lyrics_bot::auth::AdminGate;
use lyrics_bot::bot::classifier::{Inbound, InboundKind};
use lyrics_bot::bot::{ChatTransport, Keyboard, UpdateDispatcher};
use lyrics_bot::catalog::{Catalog, CatalogEntry, CatalogError, UpdateOutcome};
use lyrics_bot::dialogue::{Category, FieldValue};
use lyrics_bot::media::{MediaError, MediaIngestion};
use lyrics_bot::session::SessionStore;

pub const ADMIN: u64 = 100;
pub const OTHER_ADMIN: u64 = 101;
pub const GUEST: u64 = 200;

#[derive(Default)]
pub struct FakeCatalog {
    entries: Mutex<BTreeMap<String, CatalogEntry>>,
    pub inserts: Mutex<Vec<CatalogEntry>>,
    pub updates: Mutex<Vec<(String, FieldValue)>>,
    pub fail_writes: AtomicBool,
}

impl FakeCatalog {
    pub fn with_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let catalog = Self::default();
        {
            let mut map = catalog.entries.lock().unwrap();
            for entry in entries {
                map.insert(entry.title.clone(), entry);
            }
        }
        catalog
    }

    pub fn get(&self, title: &str) -> Option<CatalogEntry> {
        self.entries.lock().unwrap().get(title).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn find_by_title(&self, title: &str) -> Result<Option<CatalogEntry>, CatalogError> {
        Ok(self.get(title))
    }

    async fn search_by_prefix(&self, prefix: &str) -> Result<Vec<String>, CatalogError> {
        let prefix = prefix.to_lowercase();
        Ok(self
            .entries
            .lock()
            .unwrap()
            .keys()
            .filter(|title| title.to_lowercase().starts_with(&prefix))
            .cloned()
            .collect())
    }

    async fn find_by_category(&self, category: Category) -> Result<Vec<String>, CatalogError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .values()
            .filter(|entry| entry.category == Some(category))
            .map(|entry| entry.title.clone())
            .collect())
    }

    async fn random_one(&self) -> Result<Option<CatalogEntry>, CatalogError> {
        Ok(self.entries.lock().unwrap().values().next().cloned())
    }

    async fn insert(&self, entry: &CatalogEntry) -> Result<(), CatalogError> {
        self.inserts.lock().unwrap().push(entry.clone());
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CatalogError::Unavailable("write refused".to_string()));
        }
        self.entries
            .lock()
            .unwrap()
            .insert(entry.title.clone(), entry.clone());
        Ok(())
    }

    async fn update_field(
        &self,
        title: &str,
        value: &FieldValue,
    ) -> Result<UpdateOutcome, CatalogError> {
        self.updates
            .lock()
            .unwrap()
            .push((title.to_string(), value.clone()));
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CatalogError::Unavailable("write refused".to_string()));
        }

        let mut entries = self.entries.lock().unwrap();
        let Some(mut entry) = entries.remove(title) else {
            return Ok(UpdateOutcome::NotFound);
        };
        match value {
            FieldValue::Title(new_title) => entry.title = new_title.clone(),
            FieldValue::Lyrics(lyrics) => entry.lyrics = lyrics.clone(),
            FieldValue::Category(category) => entry.category = Some(*category),
            FieldValue::ImageUrl(url) => entry.image_url = url.clone(),
        }
        entries.insert(entry.title.clone(), entry);
        Ok(UpdateOutcome::Updated)
    }
}

/// Image host double: every upload of reference `r` yields `https://img.test/r.png`
#[derive(Default)]
pub struct FakeMedia {
    pub fail_uploads: AtomicBool,
    pub uploads: AtomicUsize,
}

#[async_trait]
impl MediaIngestion for FakeMedia {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, MediaError> {
        Ok(reference.as_bytes().to_vec())
    }

    async fn upload(&self, bytes: Vec<u8>) -> Result<String, MediaError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(MediaError::Upload("image host unreachable".to_string()));
        }
        Ok(format!("https://img.test/{}.png", String::from_utf8_lossy(&bytes)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text {
        chat_id: i64,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Photo {
        chat_id: i64,
        url: String,
    },
}

#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts_to(&self, chat_id: i64) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Text { chat_id: c, text, .. } if c == chat_id => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn last_text_to(&self, chat_id: i64) -> Option<String> {
        self.texts_to(chat_id).pop()
    }

    pub fn last_keyboard_to(&self, chat_id: i64) -> Option<Keyboard> {
        self.sent().into_iter().rev().find_map(|sent| match sent {
            Sent::Text {
                chat_id: c,
                keyboard,
                ..
            } if c == chat_id => Some(keyboard),
            _ => None,
        })?
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(Sent::Text {
            chat_id,
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(())
    }

    async fn send_photo(&self, chat_id: i64, url: &str) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(Sent::Photo {
            chat_id,
            url: url.to_string(),
        });
        Ok(())
    }
}

pub struct Harness {
    pub dispatcher: UpdateDispatcher,
    pub catalog: Arc<FakeCatalog>,
    pub media: Arc<FakeMedia>,
    pub transport: Arc<RecordingTransport>,
    pub sessions: Arc<SessionStore>,
}

impl Harness {
    pub fn new(catalog: FakeCatalog) -> Self {
        let catalog = Arc::new(catalog);
        let media = Arc::new(FakeMedia::default());
        let transport = Arc::new(RecordingTransport::default());
        let sessions = Arc::new(SessionStore::new(Duration::from_secs(1800)));
        let dispatcher = UpdateDispatcher::new(
            catalog.clone(),
            media.clone(),
            transport.clone(),
            sessions.clone(),
            AdminGate::new([ADMIN, OTHER_ADMIN]),
        );
        Self {
            dispatcher,
            catalog,
            media,
            transport,
            sessions,
        }
    }

    pub async fn text(&self, user: u64, text: &str) {
        self.dispatcher
            .handle(inbound(user, InboundKind::Text(text.to_string())))
            .await;
    }

    pub async fn photo(&self, user: u64, reference: &str) {
        let kind = InboundKind::Photo {
            reference: reference.to_string(),
            caption: None,
        };
        self.dispatcher.handle(inbound(user, kind)).await;
    }

    pub async fn callback(&self, user: u64, data: &str) {
        let kind = InboundKind::Callback {
            data: data.to_string(),
        };
        self.dispatcher.handle(inbound(user, kind)).await;
    }

    pub fn last_reply(&self, user: u64) -> String {
        self.transport
            .last_text_to(chat_of(user))
            .unwrap_or_default()
    }
}

/// Private chats share the user id
pub fn chat_of(user: u64) -> i64 {
    user as i64
}

pub fn inbound(user: u64, kind: InboundKind) -> Inbound {
    Inbound {
        sender_id: user,
        chat_id: chat_of(user),
        kind,
    }
}

pub fn song(title: &str, category: Option<Category>) -> CatalogEntry {
    CatalogEntry::new(title, format!("Lyrics of {title}"), category, "")
}
