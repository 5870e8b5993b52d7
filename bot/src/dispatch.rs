use teloxide::types::Message;

pub const USAGE: &str =
    "Send me the name of a city, for example Moscow, and I will reply with the current weather there.";
pub const UNSUPPORTED: &str = "I only understand text messages with a city name.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pattern {
    /// Text starting with `/`.
    Command,
    /// Any text at all.
    Text,
}

impl Pattern {
    fn matches(&self, message: &Message) -> bool {
        match self {
            Pattern::Command => message.text().is_some_and(|t| t.starts_with('/')),
            Pattern::Text => message.text().is_some(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Usage,
    Weather,
    Unsupported,
}

/// Ordered message routing table; the first matching row wins.
#[derive(Clone, Debug)]
pub struct Router {
    routes: Vec<(Pattern, Action)>,
    fallback: Action,
}

impl Default for Router {
    fn default() -> Self {
        Router::new(Action::Unsupported)
            .on(Pattern::Command, Action::Usage)
            .on(Pattern::Text, Action::Weather)
    }
}

impl Router {
    pub fn new(fallback: Action) -> Self {
        Self {
            routes: Vec::new(),
            fallback,
        }
    }

    pub fn on(mut self, pattern: Pattern, action: Action) -> Self {
        self.routes.push((pattern, action));
        self
    }

    pub fn route(&self, message: &Message) -> Action {
        self.routes
            .iter()
            .find(|(pattern, _)| pattern.matches(message))
            .map(|(_, action)| *action)
            .unwrap_or(self.fallback)
    }
}
