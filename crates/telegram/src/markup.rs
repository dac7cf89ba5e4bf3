//! Inline-keyboard conversion and link-button stripping.
//!
//! Buttons pointing at recognizable web links are dropped before the copy is
//! delivered; everything else (e.g. `tg://` deep links) survives. Rows left
//! empty disappear; callers drop keyboards that empty out entirely.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardButtonKind, InlineKeyboardMarkup};

use {
    tgrelay_common::types::{InlineKeyboard, KeyboardButton},
    tgrelay_pipeline::sanitize,
};

/// Map a Telegram inline keyboard into the platform-neutral form.
#[must_use]
pub fn to_common(markup: &InlineKeyboardMarkup) -> InlineKeyboard {
    InlineKeyboard {
        rows: markup
            .inline_keyboard
            .iter()
            .map(|row| {
                row.iter()
                    .map(|button| KeyboardButton {
                        text: button.text.clone(),
                        url: match &button.kind {
                            InlineKeyboardButtonKind::Url(url) => Some(url.to_string()),
                            _ => None,
                        },
                    })
                    .collect()
            })
            .collect(),
    }
}

/// Drop buttons whose URL is a recognizable web link.
///
/// The result may be empty; callers check [`InlineKeyboard::is_empty`]
/// before carrying it across.
#[must_use]
pub fn strip_link_buttons(keyboard: &InlineKeyboard) -> InlineKeyboard {
    let rows: Vec<Vec<KeyboardButton>> = keyboard
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .filter(|button| {
                    button
                        .url
                        .as_deref()
                        .is_none_or(|url| !sanitize::contains_link(url))
                })
                .cloned()
                .collect::<Vec<_>>()
        })
        .filter(|row| !row.is_empty())
        .collect();

    InlineKeyboard { rows }
}

/// Rebuild a Telegram keyboard for the delivered copy.
///
/// Only URL buttons can be carried across a copy (callback buttons would
/// dead-end at a bot that never registered them); buttons whose URL fails to
/// parse are dropped. Returns `None` when nothing remains.
#[must_use]
pub fn to_telegram(keyboard: &InlineKeyboard) -> Option<InlineKeyboardMarkup> {
    let rows: Vec<Vec<InlineKeyboardButton>> = keyboard
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .filter_map(|button| {
                    let url = url::Url::parse(button.url.as_deref()?).ok()?;
                    Some(InlineKeyboardButton::url(button.text.clone(), url))
                })
                .collect::<Vec<_>>()
        })
        .filter(|row| !row.is_empty())
        .collect();

    if rows.is_empty() {
        None
    } else {
        Some(InlineKeyboardMarkup::new(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button(text: &str, url: Option<&str>) -> KeyboardButton {
        KeyboardButton {
            text: text.into(),
            url: url.map(str::to_string),
        }
    }

    #[test]
    fn link_buttons_are_dropped() {
        let keyboard = InlineKeyboard {
            rows: vec![vec![
                button("join", Some("https://t.me/spamchannel")),
                button("open", Some("tg://user?id=1")),
            ]],
        };

        let cleaned = strip_link_buttons(&keyboard);
        assert_eq!(cleaned.rows.len(), 1);
        assert_eq!(cleaned.rows[0].len(), 1);
        assert_eq!(cleaned.rows[0][0].text, "open");
    }

    #[test]
    fn keyboard_of_only_links_empties_out() {
        let keyboard = InlineKeyboard {
            rows: vec![
                vec![button("a", Some("http://a.example.com"))],
                vec![button("b", Some("www.b.example"))],
            ],
        };
        assert!(strip_link_buttons(&keyboard).is_empty());
    }

    #[test]
    fn buttons_without_urls_survive() {
        let keyboard = InlineKeyboard {
            rows: vec![vec![button("vote", None)]],
        };
        let cleaned = strip_link_buttons(&keyboard);
        assert!(!cleaned.is_empty());
        assert_eq!(cleaned.rows[0][0].text, "vote");
    }

    #[test]
    fn to_telegram_keeps_only_parseable_url_buttons() {
        let keyboard = InlineKeyboard {
            rows: vec![vec![
                button("deep", Some("tg://resolve?domain=x")),
                button("callback", None),
                button("broken", Some("not a url")),
            ]],
        };

        let markup = to_telegram(&keyboard).unwrap();
        assert_eq!(markup.inline_keyboard.len(), 1);
        assert_eq!(markup.inline_keyboard[0].len(), 1);
        assert_eq!(markup.inline_keyboard[0][0].text, "deep");
    }

    #[test]
    fn to_telegram_of_callback_only_keyboard_is_none() {
        let keyboard = InlineKeyboard {
            rows: vec![vec![button("vote", None)]],
        };
        assert!(to_telegram(&keyboard).is_none());
    }
}
