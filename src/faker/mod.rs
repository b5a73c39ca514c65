//! Deterministic PII substitution.
//!
//! Each row gets one synthetic [`Identity`] and every faked column of that
//! row is rendered from it, so names, email and gender stay consistent. The
//! identity is seeded from the row's original values of the faked columns
//! only: the same input values always produce the same output, whatever
//! table they come from.

mod detector;
mod identity;
mod names;

pub use detector::{PatternDetector, MIN_SAMPLES};
pub use identity::{Gender, Identity};
pub use names::transliterate;

use crate::config::{FakerColumns, FakerConfig, PatternType};
use crate::connection::{Row, Value};
use names::EMAIL_DOMAINS;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

const SEPARATOR: char = '\u{1f}';
const NULL_MARKER: &str = "\u{0}NULL\u{0}";

/// Applies a [`FakerConfig`] to fetched rows
pub struct Faker;

impl Faker {
    /// Replace configured columns of every row.
    ///
    /// Tables without faker entries are returned untouched. NULLs stay NULL
    /// and configured columns missing from a row are skipped.
    pub fn apply(schema: &str, table: &str, config: &FakerConfig, rows: Vec<Row>) -> Vec<Row> {
        let Some(columns) = config.columns(schema, table) else {
            return rows;
        };
        rows.into_iter()
            .map(|row| Self::fake_row(columns, row))
            .collect()
    }

    /// Fake one row with the given column patterns
    pub fn fake_row(columns: &FakerColumns, mut row: Row) -> Row {
        let mut rng = row_rng(columns, &row);
        let identity = Identity::generate(&mut rng);

        for (column, pattern) in columns {
            let Some(value) = row.get_mut(column) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            *value = render(*pattern, &identity, value, &mut rng);
        }
        row
    }
}

/// RNG seeded from the original values of the faked columns, in column-name order
fn row_rng(columns: &FakerColumns, row: &Row) -> ChaCha8Rng {
    let mut hasher = Sha256::new();
    for (i, column) in columns.keys().enumerate() {
        if i > 0 {
            hasher.update(SEPARATOR.to_string().as_bytes());
        }
        match row.get(column).and_then(Value::to_text) {
            Some(text) => hasher.update(text.as_bytes()),
            None => hasher.update(NULL_MARKER.as_bytes()),
        }
    }
    let digest = hasher.finalize();
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest[..8]);
    ChaCha8Rng::seed_from_u64(u64::from_le_bytes(seed))
}

fn render(pattern: PatternType, identity: &Identity, original: &Value, rng: &mut ChaCha8Rng) -> Value {
    match pattern {
        PatternType::FullName => Value::Text(identity.full_name()),
        PatternType::ShortName => Value::Text(identity.short_name()),
        PatternType::Name => Value::Text(identity.name()),
        PatternType::FirstName => Value::Text(identity.first_name.clone()),
        PatternType::LastName => Value::Text(identity.surname.clone()),
        PatternType::Patronymic => Value::Text(identity.patronymic.clone()),
        PatternType::Email => Value::Text(fake_email(identity, rng)),
        PatternType::Phone => fake_phone(original, rng),
        PatternType::Gender => match original {
            Value::Text(token) => Value::Text(identity.gender.render_like(token)),
            other => other.clone(),
        },
    }
}

fn fake_email(identity: &Identity, rng: &mut ChaCha8Rng) -> String {
    let number = rng.random_range(1..=999);
    let domain = EMAIL_DOMAINS[rng.random_range(0..EMAIL_DOMAINS.len())];
    format!(
        "{}.{}{}@{}",
        transliterate(&identity.first_name),
        transliterate(&identity.surname),
        number,
        domain
    )
}

/// Russian mobile number in the original's formatting template.
///
/// 10 or 11 digit originals keep every non-digit character in place; an 11
/// digit original keeps a leading 7 or 8. Other lengths become `79XXXXXXXXX`.
fn fake_phone(original: &Value, rng: &mut ChaCha8Rng) -> Value {
    let template = original.to_text().unwrap_or_default();
    let original_digits: Vec<char> = template.chars().filter(char::is_ascii_digit).collect();

    let mut body = String::from("9");
    for _ in 0..9 {
        body.push(char::from(b'0' + rng.random_range(0..10u8)));
    }

    let rendered = match original_digits.len() {
        10 => fill_template(&template, &body),
        11 => {
            let prefix = match original_digits[0] {
                '7' | '8' => original_digits[0],
                _ => '7',
            };
            fill_template(&template, &format!("{prefix}{body}"))
        }
        _ => format!("7{body}"),
    };

    match original {
        Value::Int(_) => rendered
            .parse::<i64>()
            .map(Value::Int)
            .unwrap_or(Value::Text(rendered)),
        _ => Value::Text(rendered),
    }
}

/// Replace each digit position of `template` with the next digit of `digits`
fn fill_template(template: &str, digits: &str) -> String {
    let mut digits = digits.chars();
    template
        .chars()
        .map(|c| {
            if c.is_ascii_digit() {
                digits.next().unwrap_or(c)
            } else {
                c
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn faker_config(columns: &[(&str, PatternType)]) -> FakerConfig {
        let mut config = FakerConfig::default();
        for (column, pattern) in columns {
            config.set("public", "users", column, *pattern);
        }
        config
    }

    fn row(values: &[(&str, Value)]) -> Row {
        values
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn text(row: &Row, column: &str) -> String {
        row[column].to_text().unwrap()
    }

    #[test]
    fn test_unconfigured_table_untouched() {
        let config = faker_config(&[("fio", PatternType::FullName)]);
        let rows = vec![row(&[("fio", Value::from("Петров Пётр Петрович"))])];
        let out = Faker::apply("public", "orders", &config, rows.clone());
        assert_eq!(out, rows);
    }

    #[test]
    fn test_same_input_same_output() {
        let config = faker_config(&[("fio", PatternType::FullName), ("mail", PatternType::Email)]);
        let input = row(&[
            ("id", Value::Int(1)),
            ("fio", Value::from("Петров Пётр Петрович")),
            ("mail", Value::from("petrov@corp.ru")),
        ]);
        let a = Faker::apply("public", "users", &config, vec![input.clone()]);
        let b = Faker::apply("public", "users", &config, vec![input.clone()]);
        assert_eq!(a, b);
        assert_eq!(a[0]["id"], Value::Int(1));
        assert_ne!(a[0]["fio"], input["fio"]);
    }

    #[test]
    fn test_unfaked_columns_do_not_affect_seed() {
        let config = faker_config(&[("fio", PatternType::FullName)]);
        let first = row(&[("id", Value::Int(1)), ("fio", Value::from("Петров Пётр Петрович"))]);
        let second = row(&[("id", Value::Int(2)), ("fio", Value::from("Петров Пётр Петрович"))]);
        let out = Faker::apply("public", "users", &config, vec![first, second]);
        assert_eq!(out[0]["fio"], out[1]["fio"]);
    }

    #[test]
    fn test_row_components_share_identity() {
        let config = faker_config(&[
            ("fio", PatternType::FullName),
            ("first", PatternType::FirstName),
            ("last", PatternType::LastName),
            ("short", PatternType::ShortName),
            ("mail", PatternType::Email),
            ("sex", PatternType::Gender),
        ]);
        for i in 0..50 {
            let input = row(&[
                ("fio", Value::Text(format!("Иванов Иван {i}"))),
                ("first", Value::from("x")),
                ("last", Value::from("y")),
                ("short", Value::from("z")),
                ("mail", Value::from("a@b.c")),
                ("sex", Value::from("м")),
            ]);
            let out = Faker::fake_row(config.columns("public", "users").unwrap(), input);
            let fio = text(&out, "fio");
            let parts: Vec<&str> = fio.split(' ').collect();
            assert_eq!(parts[0], text(&out, "last"));
            assert_eq!(parts[1], text(&out, "first"));
            assert!(text(&out, "short").starts_with(parts[0]));

            let local = text(&out, "mail");
            let expected = format!("{}.{}", transliterate(parts[1]), transliterate(parts[0]));
            assert!(local.starts_with(&expected), "{local} vs {expected}");

            let male = parts[2].ends_with("ич");
            assert_eq!(text(&out, "sex"), if male { "м" } else { "ж" });
        }
    }

    #[test]
    fn test_null_preserved_and_missing_column_skipped() {
        let config = faker_config(&[("fio", PatternType::FullName), ("phone", PatternType::Phone)]);
        let input = row(&[("fio", Value::Null)]);
        let out = Faker::apply("public", "users", &config, vec![input.clone()]);
        assert_eq!(out[0], input);
    }

    #[test]
    fn test_phone_keeps_template() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let faked = fake_phone(&Value::from("+7 (916) 123-45-67"), &mut rng);
        let s = faked.to_text().unwrap();
        assert_eq!(s.len(), "+7 (916) 123-45-67".len());
        assert!(s.starts_with("+7 (9"));
        assert_eq!(&s[7..9], ") ");
        assert_eq!(s.chars().filter(char::is_ascii_digit).count(), 11);

        let faked = fake_phone(&Value::from("8-916-123-45-67"), &mut rng);
        assert!(faked.to_text().unwrap().starts_with("8-9"));

        let faked = fake_phone(&Value::from("916 123 45 67"), &mut rng);
        let s = faked.to_text().unwrap();
        assert!(s.starts_with('9'));
        assert_eq!(s.len(), 13);
    }

    #[test]
    fn test_phone_fallback_and_integer() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let faked = fake_phone(&Value::from("12-34"), &mut rng).to_text().unwrap();
        assert_eq!(faked.len(), 11);
        assert!(faked.starts_with("79"));

        let faked = fake_phone(&Value::Int(79161234567), &mut rng);
        match faked {
            Value::Int(n) => assert!((79_000_000_000..80_000_000_000).contains(&n)),
            other => panic!("expected integer, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_gender_token_unchanged() {
        let config = faker_config(&[("sex", PatternType::Gender)]);
        let input = row(&[("sex", Value::from("unknown"))]);
        let out = Faker::apply("public", "users", &config, vec![input.clone()]);
        assert_eq!(out[0], input);
    }
}
