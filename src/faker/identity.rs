//! One synthetic person per row.

use super::names::{initial, FEMALE_FIRST_NAMES, MALE_FIRST_NAMES, PATRONYMICS, SURNAMES};
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

/// Recognised gender token families as (male, female) pairs, compared lowercase
const GENDER_TOKENS: &[(&str, &str)] = &[
    ("male", "female"),
    ("m", "f"),
    ("м", "ж"),
    ("муж", "жен"),
    ("мужской", "женский"),
    ("мужчина", "женщина"),
];

impl Gender {
    /// Parse a recognised token, returning the gender and its family index
    pub fn parse_token(token: &str) -> Option<(Gender, usize)> {
        let lower = token.trim().to_lowercase();
        GENDER_TOKENS.iter().enumerate().find_map(|(i, (male, female))| {
            if lower == *male {
                Some((Gender::Male, i))
            } else if lower == *female {
                Some((Gender::Female, i))
            } else {
                None
            }
        })
    }

    /// Render this gender in the family and case style of `original`.
    ///
    /// Unrecognised tokens come back unchanged.
    pub fn render_like(self, original: &str) -> String {
        let Some((_, family)) = Gender::parse_token(original) else {
            return original.to_string();
        };
        let (male, female) = GENDER_TOKENS[family];
        let token = match self {
            Gender::Male => male,
            Gender::Female => female,
        };
        match case_style(original.trim()) {
            CaseStyle::Upper => token.to_uppercase(),
            CaseStyle::Capitalized => capitalize(token),
            CaseStyle::Lower => token.to_string(),
        }
    }
}

enum CaseStyle {
    Upper,
    Capitalized,
    Lower,
}

fn case_style(s: &str) -> CaseStyle {
    let letters: Vec<char> = s.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.is_empty() || letters.iter().all(|c| c.is_lowercase()) {
        return CaseStyle::Lower;
    }
    // single-letter tokens like "M" count as upper
    if letters.iter().all(|c| c.is_uppercase()) {
        return CaseStyle::Upper;
    }
    if letters[0].is_uppercase() {
        CaseStyle::Capitalized
    } else {
        CaseStyle::Lower
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Gender, surname, first name and patronymic that agree with each other
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub gender: Gender,
    pub surname: String,
    pub first_name: String,
    pub patronymic: String,
}

impl Identity {
    /// Draw a person. Every name component matches the drawn gender.
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        let gender = if rng.random_bool(0.5) {
            Gender::Male
        } else {
            Gender::Female
        };
        let (male_surname, female_surname) = SURNAMES[rng.random_range(0..SURNAMES.len())];
        let (male_patronymic, female_patronymic) =
            PATRONYMICS[rng.random_range(0..PATRONYMICS.len())];

        let (surname, first_name, patronymic) = match gender {
            Gender::Male => (
                male_surname,
                MALE_FIRST_NAMES[rng.random_range(0..MALE_FIRST_NAMES.len())],
                male_patronymic,
            ),
            Gender::Female => (
                female_surname,
                FEMALE_FIRST_NAMES[rng.random_range(0..FEMALE_FIRST_NAMES.len())],
                female_patronymic,
            ),
        };

        Self {
            gender,
            surname: surname.to_string(),
            first_name: first_name.to_string(),
            patronymic: patronymic.to_string(),
        }
    }

    /// `Surname First Patronymic`
    pub fn full_name(&self) -> String {
        format!("{} {} {}", self.surname, self.first_name, self.patronymic)
    }

    /// `Surname F.P.`
    pub fn short_name(&self) -> String {
        format!(
            "{} {}.{}.",
            self.surname,
            initial(&self.first_name),
            initial(&self.patronymic)
        )
    }

    /// `First Surname`
    pub fn name(&self) -> String {
        format!("{} {}", self.first_name, self.surname)
    }
}
