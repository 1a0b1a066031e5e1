//! Vendor detection from file names
//!
//! Each column role has its own ordered rule list. Rules are evaluated top
//! to bottom and the first match wins; some predicates overlap (every STING
//! VOD name is also a STING name), so the order is part of the behaviour.

/// Predicate on a file identity
#[derive(Debug, Clone, Copy)]
pub enum NameMatch {
    /// Case-sensitive substring
    Contains(&'static str),
    /// Substring of the lowercased name
    ContainsLower(&'static str),
    /// Substring of the uppercased name
    ContainsUpper(&'static str),
    /// Every predicate matches
    All(&'static [NameMatch]),
    /// At least one predicate matches
    Any(&'static [NameMatch]),
}

impl NameMatch {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NameMatch::Contains(token) => name.contains(token),
            NameMatch::ContainsLower(token) => name.to_lowercase().contains(token),
            NameMatch::ContainsUpper(token) => name.to_uppercase().contains(token),
            NameMatch::All(all) => all.iter().all(|m| m.matches(name)),
            NameMatch::Any(any) => any.iter().any(|m| m.matches(name)),
        }
    }
}

const PARTNER: NameMatch = NameMatch::Contains("פרטנר");
const YES: NameMatch = NameMatch::Contains("יס");
const SCREENIL: NameMatch = NameMatch::ContainsLower("screenil");
const STING_VOD: NameMatch = NameMatch::All(&[
    NameMatch::Contains("סטינג"),
    NameMatch::Any(&[NameMatch::ContainsLower("vod"), NameMatch::Contains("VOD")]),
]);
const STING: NameMatch = NameMatch::Contains("סטינג");
const CELLCOM: NameMatch = NameMatch::Contains("סלקום");
const HOT_LIBRARY: NameMatch = NameMatch::All(&[
    NameMatch::Contains("הוט"),
    NameMatch::Any(&[NameMatch::Contains("ספריה"), NameMatch::Contains("ספרייה")]),
]);
const NEXT: NameMatch = NameMatch::ContainsUpper("NEXT");

/// A (predicate, value) pair in a role table
#[derive(Debug, Clone, Copy)]
pub struct ColumnRule {
    /// Short vendor tag for logs
    pub vendor: &'static str,
    pub when: NameMatch,
    /// Column name (or label) selected when the predicate matches
    pub value: &'static str,
}

const fn rule(vendor: &'static str, when: NameMatch, value: &'static str) -> ColumnRule {
    ColumnRule {
        vendor,
        when,
        value,
    }
}

/// Program-name column used for name-based reconciliation
pub const RECONCILE_PROGRAM_COLUMNS: &[ColumnRule] = &[
    rule("partner", PARTNER, "שם תוכן"),
    rule("yes", YES, "תאור אירוע"),
    rule("screenil", SCREENIL, "Title Translation"),
    rule("sting-vod", STING_VOD, "שם מלא"),
    rule("sting", STING, "תוכן"),
];

/// Vendor house-key column used for identifier-based reconciliation
pub const HOUSE_KEY_COLUMNS: &[ColumnRule] = &[
    rule("cellcom", CELLCOM, "קוד מזהה"),
    rule("hot-library", HOT_LIBRARY, "מזהה ייחודי קשת"),
    rule("next", NEXT, "מזהה ייחודי קשת NP"),
];

/// Program column copied into the report
pub const REPORT_PROGRAM_COLUMNS: &[ColumnRule] = &[
    rule("partner", PARTNER, "שם תוכן"),
    rule("yes", YES, "תאור אירוע"),
    rule("screenil", SCREENIL, "Title Translation"),
    rule("sting-vod", STING_VOD, "שם מלא"),
    rule("sting", STING, "תוכן"),
    rule("cellcom", CELLCOM, "שם פריט"),
    rule("hot-library", HOT_LIBRARY, "שם כותר"),
    rule("next", NEXT, "שם כותר NP"),
];

/// Viewer-count column copied into the report
pub const REPORT_VIEWER_COLUMNS: &[ColumnRule] = &[
    rule("partner", PARTNER, "סה\"כ צפיות"),
    rule("yes", YES, "כמות הזמנות"),
    rule("screenil", SCREENIL, "Sessions"),
    rule("sting-vod", STING_VOD, "כמות צופים"),
    rule("sting", STING, "כמות צופים"),
    rule("cellcom", CELLCOM, "כמות הזמנות"),
    rule("hot-library", HOT_LIBRARY, "סהכ הזמנות VOD"),
    rule("next", NEXT, "כמות הזמנות"),
];

/// Human-readable platform label written into the report header
pub const PLATFORM_LABELS: &[ColumnRule] = &[
    rule("partner", PARTNER, "פרטנר"),
    rule("yes", YES, "YES"),
    rule("screenil", SCREENIL, "ScreenIL"),
    rule("sting-vod", STING_VOD, "YES"),
    rule("sting", STING, "YES"),
    rule("cellcom", CELLCOM, "סלקום"),
    rule("hot-library", HOT_LIBRARY, "HOT"),
    rule("next", NEXT, "NEXT"),
];

/// First rule in `rules` whose predicate matches `name`
pub fn first_match(rules: &'static [ColumnRule], name: &str) -> Option<&'static ColumnRule> {
    rules.iter().find(|r| r.when.matches(name))
}

/// Value of the first matching rule
pub fn resolve(rules: &'static [ColumnRule], name: &str) -> Option<&'static str> {
    first_match(rules, name).map(|r| r.value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sting_vod_precedes_sting() {
        assert_eq!(resolve(RECONCILE_PROGRAM_COLUMNS, "סטינג VOD ינואר"), Some("שם מלא"));
        assert_eq!(resolve(RECONCILE_PROGRAM_COLUMNS, "סטינג vod"), Some("שם מלא"));
        assert_eq!(resolve(RECONCILE_PROGRAM_COLUMNS, "סטינג ליניארי"), Some("תוכן"));
    }

    #[test]
    fn test_case_rules() {
        assert_eq!(resolve(RECONCILE_PROGRAM_COLUMNS, "ScreenIL_2025"), Some("Title Translation"));
        assert_eq!(resolve(HOUSE_KEY_COLUMNS, "report_next_jan"), Some("מזהה ייחודי קשת NP"));
        assert_eq!(resolve(HOUSE_KEY_COLUMNS, "nexus"), None);
    }

    #[test]
    fn test_hot_requires_library_token() {
        assert_eq!(resolve(HOUSE_KEY_COLUMNS, "הוט ספרייה"), Some("מזהה ייחודי קשת"));
        assert_eq!(resolve(HOUSE_KEY_COLUMNS, "הוט ספריה"), Some("מזהה ייחודי קשת"));
        assert_eq!(resolve(HOUSE_KEY_COLUMNS, "הוט ליניארי"), None);
    }

    #[test]
    fn test_roles_resolve_independently() {
        // Partner wins the program role while Cellcom still wins the house-key role
        let name = "פרטנר סלקום";
        assert_eq!(first_match(REPORT_PROGRAM_COLUMNS, name).unwrap().vendor, "partner");
        assert_eq!(first_match(HOUSE_KEY_COLUMNS, name).unwrap().vendor, "cellcom");
    }

    #[test]
    fn test_unknown_vendor() {
        assert!(first_match(PLATFORM_LABELS, "random_export").is_none());
    }
}
