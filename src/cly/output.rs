use colored::Colorize;

/// The kinds of text dispatch writes on its own behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emission {
    /// The full help text.
    Help,
    /// The unknown-command message.
    Unknown,
    /// One command's description, from the built-in help command.
    Description,
}

/// Destination for help and unknown-command text. Handlers print on their own.
pub trait Output {
    fn emit(&mut self, kind: Emission, text: &str);
}

/// Writes to stdout; the unknown-command message is highlighted.
#[derive(Debug, Default, Clone, Copy)]
pub struct Terminal;

impl Output for Terminal {
    fn emit(&mut self, kind: Emission, text: &str) {
        match kind {
            Emission::Unknown => println!("{}", text.yellow()),
            Emission::Help | Emission::Description => println!("{}", text),
        }
    }
}

/// Keeps everything in memory, in order.
#[derive(Debug, Default, Clone)]
pub struct Captured {
    pub emissions: Vec<(Emission, String)>,
}

impl Captured {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.emissions.iter().map(|(_, text)| text.as_str()).collect()
    }

    pub fn last(&self) -> Option<&(Emission, String)> {
        self.emissions.last()
    }

    pub fn is_empty(&self) -> bool {
        self.emissions.is_empty()
    }
}

impl Output for Captured {
    fn emit(&mut self, kind: Emission, text: &str) {
        self.emissions.push((kind, text.to_string()));
    }
}
