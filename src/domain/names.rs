//! Symptom name normalization.
//!
//! Symptom names double as URL segments (`/symptom/{name}`), so they are stored
//! lowercased with spaces replaced by underscores and turned back into a
//! title-cased label for display.

pub fn normalize_symptom_name(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

pub fn symptom_label(name: &str) -> String {
    title_case(&name.replace('_', " "))
}

/// Uppercase the first letter of every alphabetic run and lowercase the rest.
fn title_case(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut previous_alphabetic = false;
    for ch in input.chars() {
        if ch.is_alphabetic() {
            if previous_alphabetic {
                output.extend(ch.to_lowercase());
            } else {
                output.extend(ch.to_uppercase());
            }
            previous_alphabetic = true;
        } else {
            output.push(ch);
            previous_alphabetic = false;
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_spaces() {
        assert_eq!(normalize_symptom_name("High Temperature"), "high_temperature");
        assert_eq!(normalize_symptom_name("  Rash "), "rash");
        assert_eq!(normalize_symptom_name("already_normal"), "already_normal");
    }

    #[test]
    fn label_reverses_normalization() {
        assert_eq!(symptom_label("high_temperature"), "High Temperature");
        assert_eq!(symptom_label("rash"), "Rash");
        assert_eq!(symptom_label("ear_ache_2nd_day"), "Ear Ache 2Nd Day");
    }
}
