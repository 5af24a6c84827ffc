use std::fmt;

/// Output languages. The first entry of [`Language::ALL`] is the primary one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Language {
    En,
    El,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::En, Language::El];

    pub fn primary() -> Self {
        Self::ALL[0]
    }

    pub fn is_primary(self) -> bool {
        self == Self::primary()
    }

    /// Lowercase code used for the output namespace (`content/<code>/posts`).
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::El => "el",
        }
    }

    /// Upper-case code understood by the translation service.
    pub fn service_code(self) -> &'static str {
        match self {
            Language::En => "EN",
            Language::El => "EL",
        }
    }

    pub fn attribution_label(self) -> &'static str {
        match self {
            Language::En => "Source:",
            Language::El => "Πηγή:",
        }
    }

    /// Title used when the entry carries none.
    pub fn untitled(self) -> &'static str {
        match self {
            Language::En => "Update",
            Language::El => "Ενημέρωση",
        }
    }

    /// Instruction line telling the generative service which language to write.
    pub fn writing_instruction(self) -> &'static str {
        match self {
            Language::En => "Write the article in English.",
            Language::El => "Write the article in Greek, in clean journalistic Greek.",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
