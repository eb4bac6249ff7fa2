//! Label normalization
//!
//! Option captions and table labels are compared after folding case and
//! diacritics, so "São Paulo", "SAO PAULO" and "sao  paulo" are the same label.

use regex::{Regex, RegexBuilder};
use std::sync::OnceLock;

/// Caption of a link that opens a listing's detail view
///
/// A whole leading word, compared case-insensitively. The in-page scripts
/// compile the same source, so the boundary is spelled out as an ASCII class
/// that both regex dialects read alike.
pub const DETAIL_CAPTION_PATTERN: &str = r"^\s*(Detalhes?|Ver|Visualizar)([^A-Za-z0-9_]|$)";

/// Link target of a detail view, used when no caption matches
pub const DETAIL_HREF_PATTERN: &str = r"detal|imovel|imóvel";

static DETAIL_CAPTION: OnceLock<Option<Regex>> = OnceLock::new();

/// Returns true if an anchor caption marks a detail link
///
/// ```
/// use listing_crawler::text::is_detail_caption;
///
/// assert!(is_detail_caption(" Detalhes "));
/// assert!(!is_detail_caption("Governo Federal"));
/// ```
pub fn is_detail_caption(caption: &str) -> bool {
    DETAIL_CAPTION
        .get_or_init(|| {
            RegexBuilder::new(DETAIL_CAPTION_PATTERN)
                .case_insensitive(true)
                .build()
                .ok()
        })
        .as_ref()
        .map_or(false, |re| re.is_match(caption))
}

/// Normalizes a label for comparison
///
/// Strips diacritics, uppercases, collapses internal whitespace and trims.
/// The result is a fixed point: normalizing it again returns it unchanged.
///
/// # Examples
///
/// ```
/// use listing_crawler::text::normalize_label;
///
/// assert_eq!(normalize_label("  São   Paulo "), "SAO PAULO");
/// assert_eq!(normalize_label("Área Útil"), "AREA UTIL");
/// ```
pub fn normalize_label(s: &str) -> String {
    squash_whitespace(&fold_diacritics(s).to_uppercase())
}

/// Replaces accented Latin letters with their base letter
///
/// Precomposed letters are mapped one-to-one, so the character count is
/// preserved; stray combining marks (U+0300..U+036F) are dropped.
pub fn fold_diacritics(s: &str) -> String {
    s.chars()
        .filter(|c| !is_combining_mark(*c))
        .map(base_letter)
        .collect()
}

/// Collapses runs of whitespace into single spaces and trims the ends
pub fn squash_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns true if the trimmed text is a page number (ASCII digits only)
pub fn is_page_number(s: &str) -> bool {
    let t = s.trim();
    !t.is_empty() && t.chars().all(|c| c.is_ascii_digit())
}

/// Removes a leading label (and an optional colon) from a text
///
/// The comparison is case and accent insensitive; the returned remainder keeps
/// the original spelling. Text that does not start with the label is only
/// trimmed.
///
/// ```
/// use listing_crawler::text::strip_label_prefix;
///
/// assert_eq!(strip_label_prefix("Endereço: Rua A, 10", "ENDERECO"), "Rua A, 10");
/// assert_eq!(strip_label_prefix("Rua A, 10", "ENDERECO"), "Rua A, 10");
/// ```
pub fn strip_label_prefix(text: &str, label: &str) -> String {
    let text = text.trim();
    let wanted: Vec<char> = normalize_label(label).chars().collect();
    let mut matched = 0;

    for c in text.chars().take(wanted.len()) {
        let folded = base_letter(c).to_uppercase().next().unwrap_or(c);
        if folded != wanted[matched] {
            return text.to_string();
        }
        matched += 1;
    }

    if matched < wanted.len() {
        return text.to_string();
    }

    let consumed: usize = text
        .chars()
        .take(wanted.len())
        .map(char::len_utf8)
        .sum();
    let rest = text[consumed..].trim_start();
    rest.strip_prefix(':').unwrap_or(rest).trim().to_string()
}

fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036F}').contains(&c)
}

fn base_letter(c: char) -> char {
    match c {
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' | 'Ă' | 'Ą' => 'A',
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' | 'ª' => 'a',
        'Ç' | 'Ć' | 'Ĉ' | 'Ċ' | 'Č' => 'C',
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => 'c',
        'Ď' | 'Đ' => 'D',
        'ď' | 'đ' => 'd',
        'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ĕ' | 'Ė' | 'Ę' | 'Ě' => 'E',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => 'e',
        'Ĝ' | 'Ğ' | 'Ġ' | 'Ģ' => 'G',
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => 'g',
        'Ì' | 'Í' | 'Î' | 'Ï' | 'Ĩ' | 'Ī' | 'Ĭ' | 'Į' | 'İ' => 'I',
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => 'i',
        'Ñ' | 'Ń' | 'Ņ' | 'Ň' => 'N',
        'ñ' | 'ń' | 'ņ' | 'ň' => 'n',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' | 'Ō' | 'Ŏ' | 'Ő' => 'O',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ŏ' | 'ő' | 'º' => 'o',
        'Ś' | 'Ŝ' | 'Ş' | 'Š' => 'S',
        'ś' | 'ŝ' | 'ş' | 'š' => 's',
        'Ţ' | 'Ť' => 'T',
        'ţ' | 'ť' => 't',
        'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ũ' | 'Ū' | 'Ŭ' | 'Ů' | 'Ű' | 'Ų' => 'U',
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => 'u',
        'Ý' | 'Ÿ' => 'Y',
        'ý' | 'ÿ' => 'y',
        'Ź' | 'Ż' | 'Ž' => 'Z',
        'ź' | 'ż' | 'ž' => 'z',
        other => other,
    }
}
