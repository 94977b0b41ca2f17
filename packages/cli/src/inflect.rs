//! English pluralization for table names.

const UNCOUNTABLE: &[&str] = &[
    "audio",
    "data",
    "deer",
    "equipment",
    "feedback",
    "fish",
    "information",
    "media",
    "metadata",
    "money",
    "news",
    "rice",
    "series",
    "sheep",
    "species",
];

const IRREGULAR: &[(&str, &str)] = &[
    ("child", "children"),
    ("foot", "feet"),
    ("goose", "geese"),
    ("man", "men"),
    ("mouse", "mice"),
    ("ox", "oxen"),
    ("person", "people"),
    ("tooth", "teeth"),
    ("woman", "women"),
];

/// Table name for a model: lowercased, with the last `_` segment pluralized.
pub fn table_name(model: &str) -> String {
    let lower = model.trim().to_lowercase();
    match lower.rsplit_once('_') {
        Some((head, last)) => format!("{head}_{}", pluralize(last)),
        None => pluralize(&lower),
    }
}

/// Plural of a lowercase English noun.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() || UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(singular, _)| *singular == word) {
        return (*plural).to_string();
    }

    let consonant_y = word
        .strip_suffix('y')
        .filter(|stem| stem.chars().last().is_some_and(|c| !is_vowel(c)));
    if let Some(stem) = consonant_y {
        return format!("{stem}ies");
    }

    if ["s", "x", "z", "ch", "sh"].iter().any(|s| word.ends_with(s)) {
        return format!("{word}es");
    }

    format!("{word}s")
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_nouns() {
        assert_eq!(pluralize("invoice"), "invoices");
        assert_eq!(pluralize("post"), "posts");
    }

    #[test]
    fn consonant_y() {
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("key"), "keys");
    }

    #[test]
    fn sibilants() {
        assert_eq!(pluralize("address"), "addresses");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("buzz"), "buzzes");
        assert_eq!(pluralize("match"), "matches");
        assert_eq!(pluralize("wish"), "wishes");
    }

    #[test]
    fn irregular_and_uncountable() {
        assert_eq!(pluralize("person"), "people");
        assert_eq!(pluralize("child"), "children");
        assert_eq!(pluralize("news"), "news");
        assert_eq!(pluralize("equipment"), "equipment");
    }

    #[test]
    fn table_name_lowercases_first() {
        assert_eq!(table_name("Invoice"), "invoices");
        assert_eq!(table_name("Person"), "people");
        assert_eq!(table_name("blog_Category"), "blog_categories");
        assert_eq!(table_name("  User "), "users");
    }
}
