//! Stage 4: pull citation fragments out of raw OCR text.
//!
//! The pattern targets Vietnamese legal references such as
//! `Điều 5 Nghị định số 12/2020/NĐ-CP,`: an optional chain of
//! `điểm <letter>` / `khoản <n>` / `Điều <n>` qualifiers, an optional
//! document type followed by `số`, then a 2–5 digit number with `/` or `-`
//! separated issuer codes and a trailing comma or whitespace. Matches are
//! kept verbatim, trailing delimiter included, because existing cached
//! results were produced that way.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static RE_CITATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(điểm\s([a-z]|\x{0111})\s)*",
        r"(khoản\s([0-9]+)\s)*",
        r"(Điều\s([0-9]+)\s)*",
        r"((Nghị quyết|Nghị định|Thông tư|Thông tư liên tịch|Quyết định|Luật|Luật Tổ chức Quốc hội|Tờ trình|Báo cáo thẩm tra|Báo cáo)\ssố\s)*",
        r"[0-9]{2,5}(/[0-9]*)*(/|-)",
        r"([A-Za-z]*(Đ)*[A-Za-z]*(-|/)*)+",
        r"([0-9]*)(,|\s)",
    ))
    .expect("citation pattern is valid")
});

/// Extract unique citation fragments from `text`, in first-seen order.
///
/// Newlines are folded to spaces first so references broken across lines
/// still match. Fragments without any ASCII letter (bare number runs such as
/// `12345/`) are dropped as OCR noise.
pub fn extract_fragments(text: &str) -> Vec<String> {
    let normalised = text.replace('\n', " ");
    let mut seen = HashSet::new();
    RE_CITATION
        .find_iter(&normalised)
        .map(|m| m.as_str())
        .filter(|m| m.bytes().any(|b| b.is_ascii_alphabetic()))
        .filter(|m| seen.insert(*m))
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_reference_is_matched_verbatim() {
        let out = extract_fragments("căn cứ Điều 5 Nghị định số 12/2020/NĐ-CP ngày");
        assert_eq!(out, vec!["Điều 5 Nghị định số 12/2020/NĐ-CP "]);
    }

    #[test]
    fn qualifiers_chain() {
        let out = extract_fragments("theo điểm a khoản 2 Điều 7 Thông tư số 01/2019/TT-BTP, và");
        assert_eq!(out, vec!["điểm a khoản 2 Điều 7 Thông tư số 01/2019/TT-BTP,"]);
    }

    #[test]
    fn duplicates_collapse_and_numeric_noise_is_dropped() {
        let text = "Điều 5 Luật số 45/2019/QH14 và 12345/ rồi Điều 5 Luật số 45/2019/QH14 ";
        let out = extract_fragments(text);
        assert_eq!(out, vec!["Điều 5 Luật số 45/2019/QH14 "]);
        assert!(out.iter().all(|f| !f.starts_with("12345")));
    }

    #[test]
    fn first_seen_order_is_kept() {
        let text = "Quyết định số 99/QĐ-UBND, Nghị quyết số 10/NQ-HĐND, Quyết định số 99/QĐ-UBND,";
        let out = extract_fragments(text);
        assert_eq!(
            out,
            vec!["Quyết định số 99/QĐ-UBND,", "Nghị quyết số 10/NQ-HĐND,"]
        );
    }

    #[test]
    fn newline_split_reference_is_joined() {
        let out = extract_fragments("Nghị định\nsố 15/2020/NĐ-CP\n");
        assert_eq!(out, vec!["Nghị định số 15/2020/NĐ-CP "]);
    }

    #[test]
    fn bare_code_without_type_still_matches() {
        let out = extract_fragments("văn bản 123/BC-UBTP ");
        assert_eq!(out, vec!["123/BC-UBTP "]);
    }

    #[test]
    fn nothing_to_find() {
        assert!(extract_fragments("").is_empty());
        assert!(extract_fragments("no references on this page").is_empty());
        assert!(extract_fragments("2020-2021 ").is_empty());
    }
}
