use std::collections::HashSet;

use log::trace;
use rand::Rng;

static CHARACTERS: [char; 36] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9'
];

const MAX_ATTEMPTS: usize = 1000;

/// Generates field keys for copied forms.
pub struct FieldKeyGenerator {
    length: usize,
}

impl Default for FieldKeyGenerator {
    fn default() -> Self {
        Self::new(8)
    }
}

impl FieldKeyGenerator {
    pub fn new(length: usize) -> Self {
        Self { length: length.max(1) }
    }

    pub fn generate(&self) -> String {
        random_chars(self.length)
    }

    /// A random key not already in `existing`. Keys grow by one character
    /// whenever a length runs out of free keys.
    pub fn generate_unique(&self, existing: &HashSet<String>) -> String {
        self.unique_with_prefix("", existing)
    }

    /// Derives a key from `base`, appending random characters when it is taken.
    pub fn unique_from(&self, base: &str, existing: &HashSet<String>) -> String {
        let base: String = base
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        if base.is_empty() {
            return self.generate_unique(existing);
        }
        if !existing.contains(&base) {
            return base;
        }
        self.unique_with_prefix(&base, existing)
    }

    fn unique_with_prefix(&self, prefix: &str, existing: &HashSet<String>) -> String {
        let mut length = self.length;
        loop {
            for _ in 0..MAX_ATTEMPTS {
                let key = format!("{}{}", prefix, random_chars(length));
                if !existing.contains(&key) {
                    return key;
                }
            }
            trace!("No free key of length {} after {} attempts", length, MAX_ATTEMPTS);
            length += 1;
        }
    }
}

fn random_chars(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length).map(|_| CHARACTERS[rng.random_range(0..CHARACTERS.len())]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_lowercase_alphanumeric() {
        let key = FieldKeyGenerator::new(12).generate();
        assert_eq!(key.len(), 12);
        assert!(key.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn unique_keys_avoid_existing_ones() {
        let generator = FieldKeyGenerator::new(1);
        let existing: HashSet<String> = CHARACTERS[1..].iter().map(|c| c.to_string()).collect();
        assert_eq!(generator.generate_unique(&existing), "a");
    }

    #[test]
    fn exhausted_lengths_grow_the_key() {
        let generator = FieldKeyGenerator::new(1);
        let existing: HashSet<String> = CHARACTERS.iter().map(|c| c.to_string()).collect();
        let key = generator.generate_unique(&existing);
        assert_eq!(key.len(), 2);
        assert!(!existing.contains(&key));

        let taken: HashSet<String> = existing.iter().map(|c| format!("x{}", c)).chain(["x".to_string()]).collect();
        let key = generator.unique_from("x", &taken);
        assert_eq!(key.len(), 3);
        assert!(key.starts_with('x') && !taken.contains(&key));
    }

    #[test]
    fn derived_keys_keep_their_base() {
        let generator = FieldKeyGenerator::default();
        let existing: HashSet<String> = ["email".to_string()].into();
        assert_eq!(generator.unique_from("Phone No.", &existing), "phoneno");
        let taken = generator.unique_from("Email", &existing);
        assert!(taken.starts_with("email") && taken.len() == 13);
    }
}
