//! Tag classification for platform invoices.
//!
//! Tags are free text entered by operators on the invoicing platform; the
//! matching vocabulary below is a fixed table, not a general text problem.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Substring marking an invoice as a recurring template (e.g. the
/// `指定フォーマット` tag).
const RECURRING_MARKER: &str = "フォーマット";

/// Closing-rule vocabulary, longest literal first.
const CLOSING_TAGS: [(&str, ClosingRule); 4] = [
    ("20日〆", ClosingRule::Day20),
    ("15日〆", ClosingRule::Day15),
    ("末日〆", ClosingRule::EndOfMonth),
    ("末〆", ClosingRule::EndOfMonth),
];

/// Delivery vocabulary, matched after width folding and ASCII uppercasing
/// (the platform sometimes sends full-width `ＰＤＦ`).
const DELIVERY_TAGS: [(&str, DeliveryMethod); 4] = [
    ("メール", DeliveryMethod::Email),
    ("郵送", DeliveryMethod::Mail),
    ("PDF", DeliveryMethod::Pdf),
    ("紙", DeliveryMethod::Paper),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosingRule {
    Day20,
    Day15,
    EndOfMonth,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    Email,
    Mail,
    Pdf,
    Paper,
    None,
}

/// Result of classifying one invoice's tag list. Pure function of the
/// tags; recomputed on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagClassification {
    pub is_recurring_template: bool,
    pub closing_rule: ClosingRule,
    pub delivery_method: DeliveryMethod,
    pub responsible_person: Option<String>,
    pub unmatched_tags: Vec<String>,
}

impl Default for TagClassification {
    fn default() -> Self {
        TagClassification {
            is_recurring_template: false,
            closing_rule: ClosingRule::None,
            delivery_method: DeliveryMethod::None,
            responsible_person: None,
            unmatched_tags: Vec::new(),
        }
    }
}

/// Classify a tag list into the billing policy it encodes.
///
/// Per tag the rules are tested in fixed precedence order: recurring
/// marker, closing rule, delivery method, person-name shape; the first
/// match claims the tag. Across tags, a later match for the same category
/// overwrites an earlier one (last-wins).
pub fn classify(tags: &[String]) -> TagClassification {
    let mut result = TagClassification::default();

    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }

        if tag.contains(RECURRING_MARKER) {
            result.is_recurring_template = true;
            continue;
        }

        if let Some(rule) = match_closing_rule(tag) {
            result.closing_rule = rule;
            continue;
        }

        if let Some(method) = match_delivery_method(tag) {
            result.delivery_method = method;
            continue;
        }

        if looks_like_person_name(tag) {
            result.responsible_person = Some(tag.to_string());
            continue;
        }

        if !result.unmatched_tags.iter().any(|t| t == tag) {
            result.unmatched_tags.push(tag.to_string());
        }
    }

    result
}

fn match_closing_rule(tag: &str) -> Option<ClosingRule> {
    CLOSING_TAGS
        .iter()
        .find(|(literal, _)| tag.contains(literal))
        .map(|(_, rule)| *rule)
}

fn match_delivery_method(tag: &str) -> Option<DeliveryMethod> {
    let folded = fold_fullwidth_ascii(tag).to_uppercase();
    DELIVERY_TAGS
        .iter()
        .find(|(literal, _)| folded.contains(literal))
        .map(|(_, method)| *method)
}

/// Fold full-width ASCII forms (U+FF01..U+FF5E) to their half-width
/// equivalents, and the ideographic space to a plain space.
fn fold_fullwidth_ascii(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '\u{FF01}'..='\u{FF5E}' => {
                char::from_u32(c as u32 - 0xFEE0).unwrap_or(c)
            }
            '\u{3000}' => ' ',
            _ => c,
        })
        .collect()
}

/// Short Japanese name shape: the whole tag is 2-4 kanji or kana
/// characters.
fn looks_like_person_name(tag: &str) -> bool {
    static NAME_RE: OnceLock<Regex> = OnceLock::new();
    let re = NAME_RE.get_or_init(|| {
        Regex::new(r"^[\p{Han}\p{Hiragana}\p{Katakana}]{2,4}$")
            .expect("person-name pattern is valid")
    });
    re.is_match(tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn classification_is_deterministic() {
        let input = tags(&["指定フォーマット", "20日〆", "メール", "鈴木", "謎タグです"]);
        let first = classify(&input);
        let second = classify(&input);
        assert_eq!(first, second);
    }

    #[test]
    fn last_closing_tag_wins() {
        let result = classify(&tags(&["指定フォーマット", "20日〆", "末〆"]));
        assert!(result.is_recurring_template);
        assert_eq!(result.closing_rule, ClosingRule::EndOfMonth);
    }

    #[test]
    fn end_of_month_variants_are_equivalent() {
        assert_eq!(
            classify(&tags(&["末日〆"])).closing_rule,
            ClosingRule::EndOfMonth
        );
        assert_eq!(
            classify(&tags(&["末〆"])).closing_rule,
            ClosingRule::EndOfMonth
        );
    }

    #[test]
    fn fullwidth_pdf_folds_to_pdf() {
        let result = classify(&tags(&["ＰＤＦ"]));
        assert_eq!(result.delivery_method, DeliveryMethod::Pdf);

        let lower = classify(&tags(&["pdf"]));
        assert_eq!(lower.delivery_method, DeliveryMethod::Pdf);
    }

    #[test]
    fn delivery_vocabulary() {
        assert_eq!(
            classify(&tags(&["メール"])).delivery_method,
            DeliveryMethod::Email
        );
        assert_eq!(
            classify(&tags(&["郵送"])).delivery_method,
            DeliveryMethod::Mail
        );
        assert_eq!(
            classify(&tags(&["紙"])).delivery_method,
            DeliveryMethod::Paper
        );
    }

    #[test]
    fn person_name_shape() {
        let result = classify(&tags(&["田中"]));
        assert_eq!(result.responsible_person, Some("田中".to_string()));

        // Too long, mixed scripts, or Latin text is not a name tag.
        assert_eq!(classify(&tags(&["田中太郎五郎"])).responsible_person, None);
        assert_eq!(classify(&tags(&["tanaka"])).responsible_person, None);
        assert_eq!(classify(&tags(&["田中X"])).responsible_person, None);
    }

    #[test]
    fn recurring_marker_takes_precedence_over_name_shape() {
        let result = classify(&tags(&["指定フォーマット"]));
        assert!(result.is_recurring_template);
        assert_eq!(result.responsible_person, None);
    }

    #[test]
    fn unmatched_tags_are_retained_without_duplicates() {
        let result = classify(&tags(&["謎タグです", "謎タグです", "お得意様向け"]));
        assert_eq!(
            result.unmatched_tags,
            vec!["謎タグです".to_string(), "お得意様向け".to_string()]
        );
    }

    #[test]
    fn empty_input_yields_defaults() {
        let result = classify(&[]);
        assert!(!result.is_recurring_template);
        assert_eq!(result.closing_rule, ClosingRule::None);
        assert_eq!(result.delivery_method, DeliveryMethod::None);
        assert_eq!(result.responsible_person, None);
        assert!(result.unmatched_tags.is_empty());
    }
}
