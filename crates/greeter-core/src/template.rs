//! Welcome message template.
//!
//! The pattern is Telegram-flavoured HTML (`<b>`, `<i>`, `<a href>`).
//! Placeholders use the `{{NAME}}` form; every occurrence is replaced by the
//! HTML-escaped value, so configured names and URLs can never inject markup.

use std::sync::OnceLock;

use regex::Regex;

use crate::{errors::Error, Result};

pub const MENU_URL: &str = "MENU_URL";
pub const RESTAURANT_NAME: &str = "RESTAURANT_NAME";
pub const OPENING_HOURS: &str = "OPENING_HOURS";
pub const FOOD_EMOJI: &str = "FOOD_EMOJI";

const KNOWN_PLACEHOLDERS: [&str; 4] = [MENU_URL, RESTAURANT_NAME, OPENING_HOURS, FOOD_EMOJI];

pub const DEFAULT_WELCOME_TEMPLATE: &str = "Hello! {{FOOD_EMOJI}} Welcome to <b>{{RESTAURANT_NAME}}</b>!

We're really glad to hear from you! 😊

Here is our full digital menu with every dish we prepare for you:

🍽️ <b>Digital menu:</b> {{MENU_URL}}

📱 <b>Opening hours:</b>
{{OPENING_HOURS}}

🚚 <b>Delivery available!</b>

To place your order, open the menu link above. Any questions, our team is here to help!

Thank you for choosing <b>{{RESTAURANT_NAME}}</b>! ❤️";

/// Values substituted into the template. Configured once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateValues {
    pub menu_url: String,
    pub restaurant_name: String,
    pub opening_hours: String,
    pub food_emoji: String,
}

impl TemplateValues {
    fn get(&self, placeholder: &str) -> &str {
        match placeholder {
            MENU_URL => &self.menu_url,
            RESTAURANT_NAME => &self.restaurant_name,
            OPENING_HOURS => &self.opening_hours,
            FOOD_EMOJI => &self.food_emoji,
            _ => "",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    pattern: String,
}

impl Default for Template {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_WELCOME_TEMPLATE.to_string(),
        }
    }
}

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").expect("valid placeholder regex"))
}

impl Template {
    /// Parse a pattern, rejecting placeholders the renderer does not know.
    pub fn parse(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        if pattern.trim().is_empty() {
            return Err(Error::Template("template is empty".to_string()));
        }

        let unknown = placeholder_re()
            .captures_iter(&pattern)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .filter(|name| !KNOWN_PLACEHOLDERS.contains(name))
            .collect::<Vec<_>>();
        if !unknown.is_empty() {
            return Err(Error::Template(format!(
                "unknown placeholder(s): {}",
                unknown.join(", ")
            )));
        }

        Ok(Self { pattern })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Render to HTML. Markup in the pattern is kept as is; values are escaped.
    pub fn render(&self, values: &TemplateValues) -> String {
        placeholder_re()
            .replace_all(&self.pattern, |caps: &regex::Captures<'_>| {
                escape_html(values.get(&caps[1]))
            })
            .into_owned()
    }
}
