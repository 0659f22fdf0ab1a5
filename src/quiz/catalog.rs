use serde::{Deserialize, Serialize};

/// Difficulty tier of a single catalog entry, and also the tier a player
/// picks for a whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// How many questions a session at this tier asks.
    pub fn question_count(self) -> usize {
        match self {
            Difficulty::Easy => 5,
            Difficulty::Medium => 10,
            Difficulty::Hard => 15,
        }
    }

    /// Which catalog tiers the candidate pool draws from. Cumulative: every
    /// tier includes all the tiers below it.
    pub fn included_levels(self) -> &'static [Difficulty] {
        match self {
            Difficulty::Easy => &[Difficulty::Easy],
            Difficulty::Medium => &[Difficulty::Easy, Difficulty::Medium],
            Difficulty::Hard => &[Difficulty::Easy, Difficulty::Medium, Difficulty::Hard],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Difficulty::ALL.into_iter().find(|d| d.label() == label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryEntry {
    pub name: String,
    /// ISO 3166-1 alpha-2 code, used for the flag emoji.
    pub code: String,
    pub language: String,
    pub difficulty: Difficulty,
}

/// The read-only country table. Built once at startup and shared behind an
/// `Arc`, never mutated afterwards.
pub struct Catalog {
    entries: Vec<CountryEntry>,
}

impl Catalog {
    pub fn builtin() -> Self {
        Self::from_entries(
            BUILTIN_COUNTRIES
                .iter()
                .map(|(name, code, language, difficulty)| CountryEntry {
                    name: name.to_string(),
                    code: code.to_string(),
                    language: language.to_string(),
                    difficulty: *difficulty,
                })
                .collect(),
        )
    }

    pub fn from_entries(entries: Vec<CountryEntry>) -> Self {
        Self { entries }
    }

    /// The candidate pool for a session: every entry whose tier is included
    /// by the chosen difficulty.
    pub fn pool(&self, difficulty: Difficulty) -> Vec<CountryEntry> {
        let levels = difficulty.included_levels();
        self.entries
            .iter()
            .filter(|entry| levels.contains(&entry.difficulty))
            .cloned()
            .collect()
    }
}

const BUILTIN_COUNTRIES: &[(&str, &str, &str, Difficulty)] = &[
    // Easy: countries most players place on a map without thinking.
    ("France", "FR", "French", Difficulty::Easy),
    ("Spain", "ES", "Spanish", Difficulty::Easy),
    ("Germany", "DE", "German", Difficulty::Easy),
    ("Italy", "IT", "Italian", Difficulty::Easy),
    ("Portugal", "PT", "Portuguese", Difficulty::Easy),
    ("Japan", "JP", "Japanese", Difficulty::Easy),
    ("China", "CN", "Mandarin Chinese", Difficulty::Easy),
    ("Russia", "RU", "Russian", Difficulty::Easy),
    ("Brazil", "BR", "Portuguese", Difficulty::Easy),
    ("Mexico", "MX", "Spanish", Difficulty::Easy),
    ("United Kingdom", "GB", "English", Difficulty::Easy),
    ("United States", "US", "English", Difficulty::Easy),
    ("Greece", "GR", "Greek", Difficulty::Easy),
    ("Turkey", "TR", "Turkish", Difficulty::Easy),
    ("Egypt", "EG", "Arabic", Difficulty::Easy),
    ("South Korea", "KR", "Korean", Difficulty::Easy),
    // Medium
    ("Netherlands", "NL", "Dutch", Difficulty::Medium),
    ("Sweden", "SE", "Swedish", Difficulty::Medium),
    ("Norway", "NO", "Norwegian", Difficulty::Medium),
    ("Denmark", "DK", "Danish", Difficulty::Medium),
    ("Finland", "FI", "Finnish", Difficulty::Medium),
    ("Poland", "PL", "Polish", Difficulty::Medium),
    ("Ukraine", "UA", "Ukrainian", Difficulty::Medium),
    ("Czech Republic", "CZ", "Czech", Difficulty::Medium),
    ("Hungary", "HU", "Hungarian", Difficulty::Medium),
    ("Romania", "RO", "Romanian", Difficulty::Medium),
    ("Vietnam", "VN", "Vietnamese", Difficulty::Medium),
    ("Thailand", "TH", "Thai", Difficulty::Medium),
    ("Indonesia", "ID", "Indonesian", Difficulty::Medium),
    ("Iran", "IR", "Persian", Difficulty::Medium),
    ("Israel", "IL", "Hebrew", Difficulty::Medium),
    ("India", "IN", "Hindi", Difficulty::Medium),
    // Hard
    ("Ethiopia", "ET", "Amharic", Difficulty::Hard),
    ("Kenya", "KE", "Swahili", Difficulty::Hard),
    ("Georgia", "GE", "Georgian", Difficulty::Hard),
    ("Armenia", "AM", "Armenian", Difficulty::Hard),
    ("Azerbaijan", "AZ", "Azerbaijani", Difficulty::Hard),
    ("Kazakhstan", "KZ", "Kazakh", Difficulty::Hard),
    ("Mongolia", "MN", "Mongolian", Difficulty::Hard),
    ("Nepal", "NP", "Nepali", Difficulty::Hard),
    ("Sri Lanka", "LK", "Sinhala", Difficulty::Hard),
    ("Cambodia", "KH", "Khmer", Difficulty::Hard),
    ("Laos", "LA", "Lao", Difficulty::Hard),
    ("Myanmar", "MM", "Burmese", Difficulty::Hard),
    ("Albania", "AL", "Albanian", Difficulty::Hard),
    ("Estonia", "EE", "Estonian", Difficulty::Hard),
    ("Latvia", "LV", "Latvian", Difficulty::Hard),
    ("Iceland", "IS", "Icelandic", Difficulty::Hard),
];
