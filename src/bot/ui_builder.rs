//! UI Builder module for creating keyboards

use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, KeyboardRemove,
    ReplyMarkup,
};

use crate::dialogue::{Category, EditField};

use super::classifier::MenuButton;

/// Telegram limit on inline callback data, in bytes
pub const MAX_CALLBACK_DATA: usize = 64;

/// Keyboard attached to an outgoing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    MainMenu,
    Categories,
    EditFields,
    /// Hide whatever reply keyboard is showing
    Remove,
    /// One inline button per song title
    Songs(Vec<String>),
}

/// Main menu button labels in rows of two
pub fn main_menu_rows() -> Vec<Vec<&'static str>> {
    MenuButton::MAIN_MENU
        .chunks(2)
        .map(|row| row.iter().map(|button| button.label()).collect())
        .collect()
}

pub fn edit_field_rows() -> Vec<Vec<&'static str>> {
    vec![
        vec![EditField::Title.label(), EditField::Lyrics.label()],
        vec![EditField::Category.label(), EditField::Image.label()],
        vec![MenuButton::Cancel.label()],
    ]
}

pub fn category_rows() -> Vec<Vec<&'static str>> {
    vec![Category::ALL.iter().map(|c| c.label()).collect()]
}

fn reply_keyboard(rows: Vec<Vec<&'static str>>) -> KeyboardMarkup {
    let buttons = rows
        .into_iter()
        .map(|row| row.into_iter().map(KeyboardButton::new).collect::<Vec<_>>());
    KeyboardMarkup::new(buttons).resize_keyboard()
}

/// Cut `title` to the callback data limit on a char boundary
pub fn callback_data(title: &str) -> String {
    if title.len() <= MAX_CALLBACK_DATA {
        return title.to_string();
    }
    let mut end = MAX_CALLBACK_DATA;
    while !title.is_char_boundary(end) {
        end -= 1;
    }
    title[..end].to_string()
}

/// Create inline keyboard listing songs
pub fn create_song_keyboard(titles: &[String]) -> InlineKeyboardMarkup {
    let buttons = titles
        .iter()
        .map(|title| vec![InlineKeyboardButton::callback(title.clone(), callback_data(title))]);
    InlineKeyboardMarkup::new(buttons)
}

pub fn reply_markup(keyboard: &Keyboard) -> ReplyMarkup {
    match keyboard {
        Keyboard::MainMenu => reply_keyboard(main_menu_rows()).into(),
        Keyboard::Categories => reply_keyboard(category_rows()).one_time_keyboard().into(),
        Keyboard::EditFields => reply_keyboard(edit_field_rows()).into(),
        Keyboard::Remove => KeyboardRemove::new().into(),
        Keyboard::Songs(titles) => create_song_keyboard(titles).into(),
    }
}
