//! Stateless catalog browsing: lookups, listings and suggestions that never
//! touch a user's session.

use tracing::{debug, error, warn};

use crate::catalog::{Catalog, CatalogEntry, CatalogError};
use crate::dialogue::Category;
use crate::localization::{t, t_args};

use super::transport::ChatTransport;
use super::ui_builder::{Keyboard, MAX_CALLBACK_DATA};

/// Inline callback tokens for catalog sections that are not built yet
pub const PLACEHOLDER_CALLBACKS: [&str; 6] = [
    "popular_series",
    "new_series",
    "popular_movies",
    "new_movies",
    "popular_anime",
    "new_anime",
];

/// Send a message, logging instead of failing when Telegram rejects it
pub async fn deliver(
    transport: &dyn ChatTransport,
    chat_id: i64,
    text: &str,
    keyboard: Option<&Keyboard>,
) {
    if let Err(e) = transport.send_text(chat_id, text, keyboard).await {
        warn!(chat_id, error = %e, "Failed to send message");
    }
}

/// The single A-Z letter a message consists of, if any
pub fn browse_letter(text: &str) -> Option<char> {
    let mut chars = text.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => Some(c.to_ascii_uppercase()),
        _ => None,
    }
}

/// Send the lyrics of a known entry, with its image first when it has one
pub async fn send_entry(transport: &dyn ChatTransport, chat_id: i64, entry: &CatalogEntry) {
    if entry.has_image() {
        if let Err(e) = transport.send_photo(chat_id, &entry.image_url).await {
            warn!(chat_id, title = %entry.title, error = %e, "Failed to send song image");
        }
    }
    let text = if entry.lyrics.trim().is_empty() {
        t_args("song-no-lyrics", &[("title", entry.title.as_str())])
    } else {
        entry.lyrics.clone()
    };
    deliver(transport, chat_id, &text, None).await;
}

/// Look up one song by exact title and show it
pub async fn show_song(
    catalog: &dyn Catalog,
    transport: &dyn ChatTransport,
    chat_id: i64,
    title: &str,
) {
    match catalog.find_by_title(title).await {
        Ok(Some(entry)) => send_entry(transport, chat_id, &entry).await,
        Ok(None) => {
            let text = t_args("song-not-found", &[("title", title)]);
            deliver(transport, chat_id, &text, None).await;
        }
        Err(e) => {
            error!(chat_id, title = %title, error = %e, "Song lookup failed");
            deliver(transport, chat_id, &t("catalog-unavailable"), None).await;
        }
    }
}

pub async fn list_category(
    catalog: &dyn Catalog,
    transport: &dyn ChatTransport,
    chat_id: i64,
    category: Category,
) {
    match catalog.find_by_category(category).await {
        Ok(titles) if titles.is_empty() => {
            let text = t_args("no-category-songs", &[("category", category.label())]);
            deliver(transport, chat_id, &text, None).await;
        }
        Ok(titles) => {
            let text = t_args("select-category-song", &[("category", category.label())]);
            deliver(transport, chat_id, &text, Some(&Keyboard::Songs(titles))).await;
        }
        Err(e) => {
            error!(chat_id, category = %category, error = %e, "Category listing failed");
            deliver(transport, chat_id, &t("catalog-unavailable"), None).await;
        }
    }
}

pub async fn random_song(catalog: &dyn Catalog, transport: &dyn ChatTransport, chat_id: i64) {
    match catalog.random_one().await {
        Ok(Some(entry)) => {
            debug!(chat_id, title = %entry.title, "Picked random song");
            let heading = t_args("random-song", &[("title", entry.title.as_str())]);
            deliver(transport, chat_id, &heading, None).await;
            send_entry(transport, chat_id, &entry).await;
        }
        Ok(None) => deliver(transport, chat_id, &t("catalog-empty"), None).await,
        Err(e) => {
            error!(chat_id, error = %e, "Random song lookup failed");
            deliver(transport, chat_id, &t("catalog-unavailable"), None).await;
        }
    }
}

/// Free text outside any dialog: a single letter lists the songs starting
/// with it, anything else is treated as the start of a title.
pub async fn browse_text(
    catalog: &dyn Catalog,
    transport: &dyn ChatTransport,
    chat_id: i64,
    text: &str,
) {
    if let Some(letter) = browse_letter(text) {
        let letter = letter.to_string();
        match catalog.search_by_prefix(&letter).await {
            Ok(titles) if titles.is_empty() => {
                let reply = t_args("no-songs-for-letter", &[("letter", letter.as_str())]);
                deliver(transport, chat_id, &reply, None).await;
            }
            Ok(titles) => {
                let reply = t_args("select-song", &[("letter", letter.as_str())]);
                deliver(transport, chat_id, &reply, Some(&Keyboard::Songs(titles))).await;
            }
            Err(e) => {
                error!(chat_id, letter = %letter, error = %e, "Letter listing failed");
                deliver(transport, chat_id, &t("catalog-unavailable"), None).await;
            }
        }
        return;
    }

    match catalog.search_by_prefix(text.trim()).await {
        Ok(titles) if titles.is_empty() => {
            deliver(transport, chat_id, &t("invalid-letter"), None).await;
        }
        Ok(titles) => {
            deliver(transport, chat_id, &t("did-you-mean"), Some(&Keyboard::Songs(titles))).await;
        }
        Err(e) => {
            error!(chat_id, error = %e, "Title suggestion lookup failed");
            deliver(transport, chat_id, &t("catalog-unavailable"), None).await;
        }
    }
}

/// Echo an unrecognised command and offer titles that start like it
pub async fn unknown_command(
    catalog: &dyn Catalog,
    transport: &dyn ChatTransport,
    chat_id: i64,
    raw: &str,
) {
    let echo = t_args("you-said", &[("text", raw)]);
    let query = raw.trim_start_matches('/').trim();
    let suggestions = if query.is_empty() {
        Vec::new()
    } else {
        match catalog.search_by_prefix(query).await {
            Ok(titles) => titles,
            Err(e) => {
                warn!(chat_id, error = %e, "Suggestion lookup failed");
                Vec::new()
            }
        }
    };

    if suggestions.is_empty() {
        deliver(transport, chat_id, &echo, None).await;
    } else {
        let text = format!("{}\n{}", echo, t("did-you-mean"));
        deliver(transport, chat_id, &text, Some(&Keyboard::Songs(suggestions))).await;
    }
}

/// Title behind an inline song button. Buttons for titles over the callback
/// limit carry a cut-down prefix, resolved when exactly one title starts with it.
pub async fn callback_title(catalog: &dyn Catalog, data: &str) -> Result<String, CatalogError> {
    // A cut on a char boundary drops at most 3 bytes
    if data.len() + 3 < MAX_CALLBACK_DATA || catalog.find_by_title(data).await?.is_some() {
        return Ok(data.to_string());
    }

    let candidates = catalog.search_by_prefix(data).await?;
    let mut matching = candidates.into_iter().filter(|title| title.starts_with(data));
    match (matching.next(), matching.next()) {
        (Some(title), None) => {
            debug!(data = %data, title = %title, "Resolved truncated callback title");
            Ok(title)
        }
        _ => Ok(data.to_string()),
    }
}

/// Inline button press: placeholder sections answer with a notice, anything
/// else is a song title.
pub async fn handle_callback(
    catalog: &dyn Catalog,
    transport: &dyn ChatTransport,
    chat_id: i64,
    data: &str,
) {
    if PLACEHOLDER_CALLBACKS.contains(&data) {
        let text = t_args("coming-soon", &[("choice", data)]);
        deliver(transport, chat_id, &text, None).await;
        return;
    }

    match callback_title(catalog, data).await {
        Ok(title) => show_song(catalog, transport, chat_id, &title).await,
        Err(e) => {
            error!(chat_id, error = %e, "Callback title lookup failed");
            deliver(transport, chat_id, &t("catalog-unavailable"), None).await;
        }
    }
}
