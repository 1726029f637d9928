use regex::Regex;

/// Terms refused locally before any moderation call is made. Deliberately
/// aggressive per product requirement: suggestive fitness, dance, and
/// swimwear contexts are refused alongside explicit content.
const BLOCKED_TERMS: &[&str] = &[
    // Explicit sexual content and services
    "porn",
    "porno",
    "pornhub",
    "xvideos",
    "xhamster",
    "pornography",
    "xxx",
    "nsfw",
    "hentai",
    "incest",
    "bestiality",
    "rape",
    "milf",
    "gilf",
    "teen",
    "lolita",
    "onlyfans",
    "fansly",
    "escort",
    "escorts",
    "prostitute",
    "prostitution",
    "hooker",
    "call girl",
    "camgirl",
    "camgirls",
    "camboy",
    "webcam",
    "camwhore",
    // Anatomy/sexual actions
    "sex",
    "sexual",
    "sexy",
    "hot girl",
    "hot girls",
    "hot woman",
    "hot women",
    "nude",
    "nudes",
    "nudity",
    "tits",
    "boobs",
    "breasts",
    "nipple",
    "nipples",
    "areola",
    "cleavage",
    "cameltoe",
    "ass",
    "butt",
    "butts",
    "buttocks",
    "booty",
    "anal",
    "deepthroat",
    "blowjob",
    "handjob",
    "fisting",
    "pegging",
    "gangbang",
    "cum",
    "orgasm",
    "edging",
    "kink",
    "kinky",
    "bdsm",
    "fetish",
    "dominatrix",
    "femdom",
    // Clothing and erotic content styles
    "lingerie",
    "underwear",
    "panties",
    "bra",
    "thong",
    "bikini",
    "swimsuit",
    "swimwear",
    "stockings",
    "fishnets",
    "yoga pants",
    "leggings",
    "sports bra",
    // Dance/strip-related
    "strip",
    "stripper",
    "strippers",
    "striptease",
    "lap dance",
    "lapdance",
    "pole dance",
    "pole dancing",
    "twerk",
    "twerking",
    "burlesque",
    // Fitness/athletic contexts (aggressive filter)
    "workout",
    "gym",
    "fitness",
    "athletic",
    "athletics",
    "yoga",
    "pilates",
    "zumba",
    "aerobics",
    "cheer",
    "cheerleader",
    "cheerleading",
    "gymnast",
    "gymnastics",
    // Casual/summer contexts with revealing outfits
    "beach",
    "swim",
    "swimming",
    "pool party",
    "sunbathing",
    // Performance/dance generic (aggressive filter)
    "dance",
    "dancer",
    "dancers",
    "dancing",
    // Suggestive descriptors
    "sensual",
    "seduce",
    "seductive",
    "seduction",
    "provocative",
    "thirst trap",
    "thirsttrap",
    "babe",
    "babes",
    "model",
    "supermodel",
];

/// Lowercase, trim, and collapse internal whitespace. The result is the sole
/// cache key for moderation verdicts, so queries differing only in case or
/// whitespace share one verdict.
pub fn normalize(query: &str) -> String {
    query
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone)]
pub struct Denylist {
    matcher: Regex,
}

impl Denylist {
    pub fn new() -> Self {
        Self::from_terms(BLOCKED_TERMS)
    }

    fn from_terms(terms: &[&str]) -> Self {
        // Terms are escaped so literal punctuation is not pattern syntax.
        let escaped = terms
            .iter()
            .map(|term| regex::escape(term))
            .collect::<Vec<_>>()
            .join("|");
        let matcher = Regex::new(&format!(r"(?i)\b(?:{})\b", escaped))
            .expect("compile denylist matcher");
        Self { matcher }
    }

    /// Whole-word match against the term set. Word-boundary semantics, so a
    /// blocked term never matches inside a longer word.
    pub fn matches(&self, text: &str) -> bool {
        self.matcher.is_match(&normalize(text))
    }
}

impl Default for Denylist {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_case_and_whitespace() {
        assert_eq!(normalize("  Hello   World "), "hello world");
        assert_eq!(normalize("hello world"), "hello world");
    }

    #[test]
    fn matches_whole_words_case_insensitively() {
        let denylist = Denylist::new();
        assert!(denylist.matches("yoga"));
        assert!(denylist.matches("YOGA for beginners"));
        assert!(denylist.matches("  best   Workout  routine "));
    }

    #[test]
    fn does_not_match_inside_longer_words() {
        let denylist = Denylist::new();
        assert!(!denylist.matches("assume the position paper"));
        assert!(!denylist.matches("classical music"));
        assert!(!denylist.matches("gymnasium-free curriculum"));
    }

    #[test]
    fn matches_multi_word_terms_as_phrases() {
        let denylist = Denylist::new();
        assert!(denylist.matches("call   girl hotline"));
        assert!(denylist.matches("thirst trap compilation"));
        assert!(!denylist.matches("callback girlfriend drama"));
    }

    #[test]
    fn escapes_pattern_metacharacters_in_terms() {
        let denylist = Denylist::from_terms(&["lo-fi.mix"]);
        assert!(denylist.matches("lo-fi.mix"));
        assert!(!denylist.matches("loXfiYmix"));
    }
}
