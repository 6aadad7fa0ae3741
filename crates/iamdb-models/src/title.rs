/// Characters that cannot appear in a directory name on every platform.
/// They compare as word breaks so `Alien: Covenant` matches `Alien Covenant`.
const SEPARATORS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', ',', '|', '-', '·'];

/// Key used for title comparison.
///
/// Lowercases, turns path-hostile punctuation into spaces, drops
/// apostrophes and collapses whitespace.
pub fn normalize_title(title: &str) -> String {
    let folded: String = title
        .chars()
        .filter(|c| *c != '\'')
        .map(|c| if SEPARATORS.contains(&c) { ' ' } else { c })
        .collect();

    folded
        .split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}
