// Collection path naming for generated REST backends.
//
// The code generator emits kebab-case, pluralized collection paths:
// `user` -> `users`, `verificationToken` -> `verification-tokens`.
// Pluralization can be turned off for backends generated without it.

use std::sync::LazyLock;

use regex::Regex;

/// Convert a camelCase model name to kebab-case.
///
/// Examples: "verificationToken" -> "verification-token"
pub fn to_kebab_case(s: &str) -> String {
    static RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").unwrap());
    RE.replace_all(s, "${1}-${2}").to_lowercase()
}

/// Simple English pluralization.
pub fn pluralize(name: &str) -> String {
    if name.ends_with('s') || name.ends_with("sh") || name.ends_with("ch") {
        format!("{name}es")
    } else if name.ends_with('y')
        && !name.ends_with("ay")
        && !name.ends_with("ey")
        && !name.ends_with("oy")
        && !name.ends_with("uy")
    {
        format!("{}ies", &name[..name.len() - 1])
    } else {
        format!("{name}s")
    }
}

/// Map a model name to its collection path segment.
pub fn collection_path(model: &str, use_plural: bool) -> String {
    let name = to_kebab_case(model);
    if use_plural {
        pluralize(&name)
    } else {
        name
    }
}

/// Canonicalize a model name (case-insensitive, tolerant of plural and
/// snake_case spellings). Returns `None` for models this adapter has no
/// specialized handling for; those pass through the generic paths.
pub fn canonical_model(model: &str) -> Option<&'static str> {
    let lowered = model.to_ascii_lowercase().replace(['_', '-'], "");
    match lowered.as_str() {
        "user" | "users" => Some("user"),
        "session" | "sessions" => Some("session"),
        "account" | "accounts" => Some("account"),
        "verificationtoken" | "verificationtokens" | "verification" | "verifications" => {
            Some("verificationToken")
        }
        _ => None,
    }
}
