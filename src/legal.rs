//! Thai legal lexicon
//!
//! Name normalisation for judges, the fixed case-type taxonomy, and the legal
//! concept vocabulary used to tag case summaries and queries.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Case type value used by the source data for "unspecified".
pub const UNSPECIFIED_CASE_TYPE: &str = "ไม่ระบุ";

/// Honorifics and judicial titles stripped from judge names, longest first so
/// that e.g. "นางสาว" is not mistaken for "นาง".
static JUDGE_PREFIXES: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    let mut prefixes = vec![
        "นาย",
        "นาง",
        "นางสาว",
        "ดร.",
        "ศาสตราจารย์",
        "รองศาสตราจารย์",
        "ผู้พิพากษา",
        "ผู้พิพากษาหัวหน้า",
        "ผู้พิพากษาที่ปรึกษา",
        "ประธานศาลฎีกา",
        "รองประธานศาลฎีกา",
        "ผู้พิพากษาศาลฎีกา",
    ];
    prefixes.sort_by_key(|p| std::cmp::Reverse(p.chars().count()));
    prefixes
});

static NAME_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\d.,()\-:]").expect("static pattern"));

/// Case number such as `123/2565`.
pub static CASE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\s*/\s*\d+").expect("static pattern"));

/// Judge mention introduced by the judicial title, e.g. `ผู้พิพากษา สมชาย`.
pub static JUDGE_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ผู้พิพากษา\s*(\S+)").expect("static pattern"));

/// Legal concepts recognised in case summaries and queries.
pub const LEGAL_CONCEPTS: &[&str] = &[
    "ลักทรัพย์", "บุกรุก", "เคหสถาน", "พยายาม", "ฆ่า", "ทำร้าย", "โจรกรรม",
    "ฉ้อโกง", "ยักยอก", "ข่มขืน", "ลูกหนี้", "เจ้าหนี้", "สัญญา", "ผิดสัญญา",
    "ค่าเสียหาย", "ดอกเบี้ย", "จำนอง", "จำนำ", "หย่า", "อุปการะ", "มรดก",
    "ที่ดิน", "กรรมสิทธิ์", "ข้าราชการ", "ทุจริต", "ประมูล", "ภาษี", "อากร",
    "ครอบครัว", "บุตร", "สมรส", "แรงงาน", "ลูกจ้าง", "นายจ้าง",
];

/// Collapse runs of whitespace and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalise a judge name so the same person spelled with or without a title
/// maps to one key.
pub fn normalize_judge_name(name: &str) -> String {
    let mut normalized = collapse_whitespace(name).to_lowercase();

    loop {
        let stripped = JUDGE_PREFIXES
            .iter()
            .find_map(|prefix| normalized.strip_prefix(prefix))
            .map(|rest| rest.trim_start().to_string());
        match stripped {
            Some(rest) if rest != normalized => normalized = rest,
            _ => break,
        }
    }

    collapse_whitespace(&NAME_NOISE.replace_all(&normalized, ""))
}

/// Normalise a concept, article or case-type label.
pub fn normalize_label(label: &str) -> String {
    collapse_whitespace(label).to_lowercase()
}

/// Normalise a case number: whitespace removed and `-` read as `/`.
pub fn normalize_case_number(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '-' { '/' } else { c })
        .collect()
}

/// Year suffix of a case number (`123/2565` -> 2565).
pub fn case_year(case_id: &str) -> Option<i32> {
    normalize_case_number(case_id)
        .rsplit_once('/')
        .and_then(|(_, year)| year.parse().ok())
}

/// Fixed taxonomy of case categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CaseType {
    Criminal,
    Civil,
    Administrative,
    Constitutional,
    Labor,
    Tax,
    IntellectualProperty,
    Family,
    Bankruptcy,
}

impl CaseType {
    pub const ALL: [CaseType; 9] = [
        CaseType::Criminal,
        CaseType::Civil,
        CaseType::Administrative,
        CaseType::Constitutional,
        CaseType::Labor,
        CaseType::Tax,
        CaseType::IntellectualProperty,
        CaseType::Family,
        CaseType::Bankruptcy,
    ];

    /// Thai label used in the source data
    pub fn label(&self) -> &'static str {
        match self {
            CaseType::Criminal => "อาญา",
            CaseType::Civil => "แพ่ง",
            CaseType::Administrative => "ปกครอง",
            CaseType::Constitutional => "รัฐธรรมนูญ",
            CaseType::Labor => "แรงงาน",
            CaseType::Tax => "ภาษี",
            CaseType::IntellectualProperty => "ทรัพย์สินทางปัญญา",
            CaseType::Family => "ครอบครัว",
            CaseType::Bankruptcy => "ล้มละลาย",
        }
    }

    /// Parse a case-type label, accepting the `คดี` ("case") prefix.
    pub fn parse(label: &str) -> Option<CaseType> {
        let label = normalize_label(label);
        let label = label.strip_prefix("คดี").unwrap_or(&label).trim();
        Self::ALL.into_iter().find(|t| t.label() == label)
    }

    /// First case-type token mentioned in free text.
    ///
    /// Longer labels are tried first so a query mentioning "ทรัพย์สินทางปัญญา" is not
    /// claimed by a shorter overlapping label.
    pub fn find_in(text: &str) -> Option<CaseType> {
        let text = normalize_label(text);
        let mut candidates = Self::ALL;
        candidates.sort_by_key(|t| std::cmp::Reverse(t.label().chars().count()));
        candidates.into_iter().find(|t| text.contains(t.label()))
    }
}

impl fmt::Display for CaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Legal concepts from [`LEGAL_CONCEPTS`] that occur in `text`, in vocabulary order.
pub fn extract_legal_concepts(text: &str) -> Vec<String> {
    let text = text.to_lowercase();
    LEGAL_CONCEPTS
        .iter()
        .filter(|term| text.contains(*term))
        .map(|term| term.to_string())
        .collect()
}

/// Case numbers mentioned in `text`, normalised.
pub fn extract_case_numbers(text: &str) -> Vec<String> {
    CASE_NUMBER
        .find_iter(text)
        .map(|m| normalize_case_number(m.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_judge_titles_are_stripped() {
        assert_eq!(normalize_judge_name("นายสมชาย"), "สมชาย");
        assert_eq!(normalize_judge_name("  นาย   สมชาย "), "สมชาย");
        assert_eq!(normalize_judge_name("สมชาย"), "สมชาย");
        assert_eq!(normalize_judge_name("นางสาวสมศรี"), "สมศรี");
        assert_eq!(normalize_judge_name("ผู้พิพากษาหัวหน้า นายสมชาย"), "สมชาย");
        assert_eq!(normalize_judge_name("Dr. Somchai (1)"), "dr somchai");
    }

    #[test]
    fn test_case_numbers() {
        assert_eq!(normalize_case_number("123 / 2565"), "123/2565");
        assert_eq!(normalize_case_number("123-2565"), "123/2565");
        assert_eq!(case_year("123/2565"), Some(2565));
        assert_eq!(case_year("no-year-here"), None);
        assert_eq!(extract_case_numbers("ฎีกาที่ 123/2565 และ 45/2560"), vec!["123/2565", "45/2560"]);
    }

    #[test]
    fn test_case_type_taxonomy() {
        assert_eq!(CaseType::parse("อาญา"), Some(CaseType::Criminal));
        assert_eq!(CaseType::parse("คดีแพ่ง"), Some(CaseType::Civil));
        assert_eq!(CaseType::parse(UNSPECIFIED_CASE_TYPE), None);
        assert_eq!(CaseType::find_in("ขอดูคดีแรงงานล่าสุด"), Some(CaseType::Labor));
        assert_eq!(CaseType::find_in("ละเมิดทรัพย์สินทางปัญญา"), Some(CaseType::IntellectualProperty));
        assert_eq!(CaseType::find_in("hello"), None);
    }

    #[test]
    fn test_concepts_from_text() {
        let concepts = extract_legal_concepts("จำเลยลักทรัพย์ในเคหสถาน");
        assert_eq!(concepts, vec!["ลักทรัพย์", "เคหสถาน"]);
    }
}
