use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Generated names that read wrong when derived from the schema path alone.
    static ref NAME_OVERRIDES: HashMap<&'static str, &'static str> =
        [("StatusStatus", "StatusVersion")].into_iter().collect();
}

/// Turns schema supplied identifiers (`pop3_account`, `auth.api_tokens`, `ppp3g`)
/// into CamelCase identifiers.
///
/// A letter followed by a run of digits (and optionally one more letter) counts as
/// a word boundary on both sides of the digits, so `ppp3g` becomes `Ppp3G`.
#[derive(Debug, Clone)]
pub struct Namer {
    number_sequence: Regex,
}

impl Default for Namer {
    fn default() -> Self {
        Self::new()
    }
}

impl Namer {
    pub fn new() -> Self {
        Self {
            number_sequence: Regex::new(r"([a-zA-Z])(\d+)([a-zA-Z]?)")
                .expect("number boundary pattern is a valid regex"),
        }
    }

    fn add_word_boundaries_to_numbers(&self, s: &str) -> String {
        self.number_sequence.replace_all(s, "$1 $2 $3").into_owned()
    }

    /// Converts `s` to CamelCase. `init_case` decides whether the very first
    /// lower-case letter is capitalized too.
    pub fn camel(&self, s: &str, init_case: bool) -> String {
        let spaced = self.add_word_boundaries_to_numbers(s);
        let mut out = String::with_capacity(spaced.len());
        let mut cap_next = init_case;
        for c in spaced.trim_matches(' ').chars() {
            match c {
                'A'..='Z' | '0'..='9' => out.push(c),
                'a'..='z' if cap_next => out.push(c.to_ascii_uppercase()),
                'a'..='z' => out.push(c),
                _ => {}
            }
            cap_next = matches!(c, '_' | ' ' | '-');
        }
        out
    }

    /// Name of the subtype living under `definition` at path segment `segment`.
    pub fn subtype_name(&self, definition: &str, segment: &str) -> String {
        self.with_overrides(self.camel(&format!("{definition}_{segment}"), true))
    }

    /// Name for a type derived from a single identifier, e.g. a definition title.
    pub fn type_name(&self, s: &str) -> String {
        self.with_overrides(self.camel(s, true))
    }

    /// Name for a JSON key or a dotted node key (`auth.api_tokens` -> `AuthApiTokens`).
    pub fn key_name(&self, key: &str) -> String {
        self.camel(&key.replace('.', "_"), true)
    }

    fn with_overrides(&self, name: String) -> String {
        match NAME_OVERRIDES.get(name.as_str()) {
            Some(renamed) => renamed.to_string(),
            None => name,
        }
    }
}

/// `Pop3Account` -> `pop3_account`
pub(crate) fn snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_camel_fixed_pairs() {
        let namer = Namer::new();
        assert_eq!(namer.camel("pop3_account", true), "Pop3Account");
        assert_eq!(namer.camel("aws_instance_type", true), "AwsInstanceType");
        assert_eq!(namer.camel("webadmin", false), "webadmin");
        assert_eq!(namer.camel("user_preferences", false), "userPreferences");
    }

    #[test]
    fn test_camel_digit_boundaries() {
        let namer = Namer::new();
        assert_eq!(namer.camel("ppp3g", true), "Ppp3G");
        assert_eq!(namer.camel("interface_ppp3g", true), "InterfacePpp3G");
        assert_eq!(namer.camel("ipv6", true), "Ipv6");
        assert_eq!(namer.camel("sandbox_max_filesize_mb", true), "SandboxMaxFilesizeMb");
    }

    #[test]
    fn test_camel_drops_other_characters() {
        let namer = Namer::new();
        assert_eq!(namer.camel("", true), "");
        assert_eq!(namer.camel("_locked", true), "Locked");
        assert_eq!(namer.camel("{ref}", true), "ref");
        assert_eq!(namer.camel("already-Camel", true), "AlreadyCamel");
    }

    #[test]
    fn test_overrides_and_keys() {
        let namer = Namer::new();
        assert_eq!(namer.subtype_name("status", "status"), "StatusVersion");
        assert_eq!(namer.subtype_name("pop3", "account"), "Pop3Account");
        assert_eq!(namer.key_name("auth.api_tokens"), "AuthApiTokens");
        assert_eq!(namer.type_name("ipsec_connection"), "IpsecConnection");
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("Pop3Account"), "pop3_account");
        assert_eq!(snake_case("ObjectType"), "object_type");
        assert_eq!(snake_case(""), "");
        assert_eq!(snake_case("name"), "name");
    }
}
