//! Name normalization module
//!
//! Converts between URL slug style (`user-profile`) and identifier style
//! (`UserProfile`). The inbound path only needs [`dash_to_identifier`];
//! [`identifier_to_dash`] generates slugs from arbitrary display text.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Convert a dash-separated slug into an identifier
///
/// Every `-` separated piece gets its first character upper-cased and the
/// pieces are joined without a separator. The rest of each piece is left
/// untouched, so `"error-404"` becomes `"Error404"`.
pub fn dash_to_identifier(text: &str) -> String {
    text.split('-').map(capitalize).collect()
}

fn capitalize(piece: &str) -> String {
    let mut chars = piece.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Convert arbitrary display text into a lower-case ASCII slug
///
/// Text is transliterated to ASCII first (diacritics stripped, lower-cased),
/// then every run of non-word characters is replaced with a single `-`.
/// Characters without an ASCII approximation count as non-word characters.
pub fn identifier_to_dash(text: &str) -> String {
    let ascii = transliterate(text);
    let mut slug = String::with_capacity(ascii.len());
    let mut in_gap = false;

    for ch in ascii.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            slug.push(ch);
            in_gap = false;
        } else if !in_gap {
            slug.push('-');
            in_gap = true;
        }
    }

    slug
}

/// Best-effort transliteration to lower-case ASCII
fn transliterate(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for ch in text.to_lowercase().nfd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_ascii() {
            out.push(ch);
        } else if let Some(latin) = approximate(ch) {
            out.push_str(latin);
        } else {
            // Not representable, leave a separator behind
            out.push(' ');
        }
    }

    out
}

/// ASCII spelling for lower-case letters that do not decompose
const fn approximate(ch: char) -> Option<&'static str> {
    let latin = match ch {
        'ß' => "ss",
        'æ' => "ae",
        'œ' => "oe",
        'ø' => "o",
        'đ' | 'ð' => "d",
        'ł' => "l",
        'þ' => "th",
        'ı' => "i",
        'ħ' => "h",
        // Cyrillic (ё and й decompose before reaching this table)
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' | 'э' => "e",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "kh",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "shch",
        'ъ' | 'ь' => "",
        'ы' => "y",
        'ю' => "yu",
        'я' => "ya",
        'і' => "i",
        'ї' => "yi",
        'є' => "ye",
        _ => return None,
    };
    Some(latin)
}
