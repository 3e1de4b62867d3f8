//! Everything the bot says, in every language it can say it.
//!
//! The conversation controller never hard-codes user-facing text; it asks the
//! session's [`Language`] for the line it needs. The closed set of number words
//! accepted at the age step lives here too, since it is language-specific.

use serde::{Deserialize, Serialize};

use crate::profile::Gender;

/// Grouping separator used for prices ("2 000 ₽"), a no-break space.
pub const PRICE_GROUP_SEPARATOR: char = '\u{a0}';
pub const CURRENCY_SIGN: &str = "₽";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    #[value(name = "en")]
    #[serde(rename = "en")]
    English,
    #[value(name = "ru")]
    #[serde(rename = "ru")]
    Russian,
}

const ENGLISH_NUMBER_WORDS: &[(&str, u32)] = &[
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
    ("thirteen", 13),
    ("fourteen", 14),
    ("fifteen", 15),
    ("sixteen", 16),
    ("seventeen", 17),
    ("eighteen", 18),
    ("nineteen", 19),
    ("twenty", 20),
    ("thirty", 30),
    ("forty", 40),
    ("fifty", 50),
    ("sixty", 60),
    ("seventy", 70),
    ("eighty", 80),
    ("ninety", 90),
    ("hundred", 100),
];

const RUSSIAN_NUMBER_WORDS: &[(&str, u32)] = &[
    ("один", 1),
    ("два", 2),
    ("три", 3),
    ("четыре", 4),
    ("пять", 5),
    ("шесть", 6),
    ("семь", 7),
    ("восемь", 8),
    ("девять", 9),
    ("десять", 10),
    ("одиннадцать", 11),
    ("двенадцать", 12),
    ("тринадцать", 13),
    ("четырнадцать", 14),
    ("пятнадцать", 15),
    ("шестнадцать", 16),
    ("семнадцать", 17),
    ("восемнадцать", 18),
    ("девятнадцать", 19),
    ("двадцать", 20),
    ("тридцать", 30),
    ("сорок", 40),
    ("пятьдесят", 50),
    ("шестьдесят", 60),
    ("семьдесят", 70),
    ("восемьдесят", 80),
    ("девяносто", 90),
    ("сто", 100),
];

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Russian => "ru",
        }
    }

    /// Name of the language as the model should read it in the prompt.
    pub fn prompt_name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Russian => "Russian",
        }
    }

    pub fn number_words(self) -> &'static [(&'static str, u32)] {
        match self {
            Language::English => ENGLISH_NUMBER_WORDS,
            Language::Russian => RUSSIAN_NUMBER_WORDS,
        }
    }

    /// True when the text contains any recognized number word, anywhere.
    pub fn contains_number_word(self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.number_words()
            .iter()
            .any(|(word, _)| lowered.contains(word))
    }

    /// Best-effort numeric reading of an age answer: digits first, then a
    /// sum of whole number words ("twenty five" -> 25). Zero when nothing fits.
    pub fn age_years(self, text: &str) -> u32 {
        let trimmed = text.trim();
        let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
        if let Ok(value) = digits.parse::<u32>() {
            return value;
        }

        let lowered = trimmed.to_lowercase();
        let mut total = 0u32;
        for token in lowered.split(|c: char| c.is_whitespace() || c == '-') {
            let Some((_, value)) = self.number_words().iter().find(|(word, _)| *word == token) else {
                continue;
            };
            if *value == 100 && total > 0 && total < 100 {
                total *= 100;
            } else {
                total += value;
            }
        }
        total
    }

    pub fn greeting(self) -> String {
        match self {
            Language::English => {
                "Hi! 🎁 I'll help you find the perfect gift. Let's get started!\n\nWhat's the birthday person's name?".to_string()
            }
            Language::Russian => {
                "Привет! 🎁 Я помогу подобрать идеальный подарок. Давай начнём!\n\nКак зовут именинника?".to_string()
            }
        }
    }

    pub fn name_ack(self, name: &str) -> String {
        match self {
            Language::English => format!("Great! Preparing a gift for {name} ✨\n\nHow old are they turning?"),
            Language::Russian => format!("Отлично! Готовлю подарок для {name} ✨\n\nСколько лет исполняется?"),
        }
    }

    pub fn age_correction(self) -> String {
        match self {
            Language::English => {
                "Please enter the age in digits or words (for example, \"25\" or \"twenty five\")".to_string()
            }
            Language::Russian => {
                "Пожалуйста, укажи возраст цифрами или словами (например, \"25\" или \"двадцать пять\")".to_string()
            }
        }
    }

    pub fn gender_prompt(self) -> String {
        match self {
            Language::English => "Got it! Now choose the gender:".to_string(),
            Language::Russian => "Понял! А теперь выбери пол:".to_string(),
        }
    }

    pub fn gender_label(self, gender: Gender) -> &'static str {
        match (self, gender) {
            (Language::English, Gender::Male) => "Male",
            (Language::English, Gender::Female) => "Female",
            (Language::Russian, Gender::Male) => "Мужчина",
            (Language::Russian, Gender::Female) => "Женщина",
        }
    }

    pub fn interests_prompt(self) -> String {
        match self {
            Language::English => "Awesome! Now tell me about their interests and hobbies 🎯".to_string(),
            Language::Russian => "Супер! Теперь расскажи об интересах и хобби именинника 🎯".to_string(),
        }
    }

    pub fn interests_summary(self, interests: &[String]) -> String {
        match self {
            Language::English => format!("Interests: {}", interests.join(", ")),
            Language::Russian => format!("Интересы: {}", interests.join(", ")),
        }
    }

    pub fn interest_suggestions(self) -> &'static [&'static str] {
        match self {
            Language::English => &[
                "Sport", "Music", "Books", "Travel", "Cooking", "Gaming", "Photography", "Art",
                "Fashion", "Technology", "Nature", "Movies",
            ],
            Language::Russian => &[
                "Спорт", "Музыка", "Книги", "Путешествия", "Кулинария", "Игры", "Фотография",
                "Искусство", "Мода", "Технологии", "Природа", "Кино",
            ],
        }
    }

    pub fn photos_prompt(self) -> String {
        match self {
            Language::English => {
                "If you have photos of their hobbies, upload them! It helps find more precise ideas 📸\n\nYou can skip this step.".to_string()
            }
            Language::Russian => {
                "Если есть фото увлечений или хобби — загрузи их! Это поможет подобрать более точные идеи 📸\n\nМожешь пропустить этот шаг.".to_string()
            }
        }
    }

    pub fn photos_summary(self, count: usize) -> String {
        match (self, count) {
            (Language::English, 0) => "Skipping photo upload".to_string(),
            (Language::English, n) => format!("Photos uploaded: {n}"),
            (Language::Russian, 0) => "Пропускаю загрузку фото".to_string(),
            (Language::Russian, n) => format!("Загружено фото: {n}"),
        }
    }

    /// Label of the button that leaves the photo step.
    pub fn photos_action(self, count: usize) -> &'static str {
        match (self, count) {
            (Language::English, 0) => "Skip",
            (Language::English, _) => "Continue",
            (Language::Russian, 0) => "Пропустить",
            (Language::Russian, _) => "Продолжить",
        }
    }

    pub fn budget_prompt(self) -> String {
        match self {
            Language::English => "Great! Last step: choose a budget for the gift 💰".to_string(),
            Language::Russian => "Отлично! Последний шаг — выбери бюджет на подарок 💰".to_string(),
        }
    }

    pub fn budget_summary(self, min: u32, max: u32) -> String {
        let label = match self {
            Language::English => "Budget",
            Language::Russian => "Бюджет",
        };
        format!("{label}: {} — {}", format_price(min), format_price(max))
    }

    pub fn generating(self) -> String {
        match self {
            Language::English => "Generating gift ideas... This will take a few seconds ✨".to_string(),
            Language::Russian => "Генерирую идеи подарков... Это займёт несколько секунд ✨".to_string(),
        }
    }

    pub fn generating_more(self) -> String {
        match self {
            Language::English => "Generating even more ideas for you... ✨".to_string(),
            Language::Russian => "Генерирую ещё больше идей для тебя... ✨".to_string(),
        }
    }

    pub fn generation_done(self, count: usize, name: &str, supplemental: bool) -> String {
        match self {
            Language::English => {
                let fresh = if supplemental { "new " } else { "" };
                format!("Done! Found {count} {fresh}gift ideas for {name} 🎉")
            }
            Language::Russian => {
                let fresh = if supplemental { "новых " } else { "" };
                format!("Готово! Нашёл {count} {fresh}идей подарков для {name} 🎉")
            }
        }
    }

    pub fn generation_failed(self) -> String {
        match self {
            Language::English => "Something went wrong while generating. Please try again!".to_string(),
            Language::Russian => "Произошла ошибка при генерации. Попробуй ещё раз!".to_string(),
        }
    }

    pub fn find_yourself(self) -> &'static str {
        match self {
            Language::English => "Find it yourself",
            Language::Russian => "Найти самостоятельно",
        }
    }
}

/// "2 000 ₽": thousands grouped with a no-break space, ruble sign appended.
pub fn format_price(value: u32) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + 4);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(PRICE_GROUP_SEPARATOR);
        }
        grouped.push(ch);
    }
    format!("{grouped} {CURRENCY_SIGN}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price_groups_thousands() {
        assert_eq!(format_price(500), "500 ₽");
        assert_eq!(format_price(2000), "2\u{a0}000 ₽");
        assert_eq!(format_price(100000), "100\u{a0}000 ₽");
        assert_eq!(format_price(1234567), "1\u{a0}234\u{a0}567 ₽");
    }

    #[test]
    fn test_budget_summary() {
        assert_eq!(
            Language::English.budget_summary(2000, 10000),
            "Budget: 2\u{a0}000 ₽ — 10\u{a0}000 ₽"
        );
        assert!(Language::Russian.budget_summary(500, 1000).starts_with("Бюджет: 500 ₽"));
    }

    #[test]
    fn test_number_words_are_language_specific() {
        assert!(Language::English.contains_number_word("twenty"));
        assert!(Language::English.contains_number_word("Twenty Five"));
        assert!(!Language::English.contains_number_word("двадцать"));
        assert!(Language::Russian.contains_number_word("двадцать пять"));
        assert!(!Language::English.contains_number_word("abc"));
    }

    #[test]
    fn test_age_years() {
        assert_eq!(Language::English.age_years("25"), 25);
        assert_eq!(Language::English.age_years("twenty five"), 25);
        assert_eq!(Language::English.age_years("forty-two"), 42);
        assert_eq!(Language::English.age_years("one hundred"), 100);
        assert_eq!(Language::Russian.age_years("тридцать три"), 33);
        assert_eq!(Language::English.age_years("unknown"), 0);
    }

    #[test]
    fn test_generation_done_mentions_new_only_for_supplemental() {
        let first = Language::English.generation_done(5, "Anna", false);
        let more = Language::English.generation_done(5, "Anna", true);
        assert_eq!(first, "Done! Found 5 gift ideas for Anna 🎉");
        assert_eq!(more, "Done! Found 5 new gift ideas for Anna 🎉");
    }
}
