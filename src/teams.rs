use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Bumped whenever an alias is added or retargeted.
pub const TEAM_ALIAS_VERSION: u32 = 1;

// Relocated franchises map to their current code; variant spellings map to the
// code used by the play-by-play feed.
static TEAM_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("SD", "LAC"),
        ("OAK", "LV"),
        ("STL", "LA"),
        ("LAR", "LA"),
        ("JAC", "JAX"),
        ("WSH", "WAS"),
    ])
});

/// Canonical team code for any raw team identifier. Applied once, when a team-keyed
/// table is ingested.
pub fn canonical_team(raw: &str) -> String {
    let upper = raw.trim().to_ascii_uppercase();
    match TEAM_ALIASES.get(upper.as_str()) {
        Some(current) => (*current).to_string(),
        None => upper,
    }
}

#[cfg(test)]
mod tests {
    use super::canonical_team;

    #[test]
    fn legacy_codes_map_to_current() {
        assert_eq!(canonical_team("SD"), "LAC");
        assert_eq!(canonical_team("oak"), "LV");
        assert_eq!(canonical_team(" STL "), "LA");
        assert_eq!(canonical_team("LAR"), "LA");
        assert_eq!(canonical_team("SEA"), "SEA");
    }
}
