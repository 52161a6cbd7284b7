//! Byte-to-text decoding for text-like formats.
//!
//! The contract every decoder here satisfies: any byte slice decodes to a
//! `String` without failing, the same input always yields the same output,
//! byte-order marks select and are stripped from the result, valid UTF-8 is
//! taken as-is, and anything else is read as Windows-1252.

/// Text produced by [`decode_text`] and the encoding it was read as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding: &'static str,
}

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];

// 0x80..=0x9F in Windows-1252; undefined slots map to the C1 control of the same value.
const WINDOWS_1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}', '\u{017D}', '\u{008F}',
    '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
];

pub fn decode_text(bytes: &[u8]) -> DecodedText {
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        return DecodedText {
            text: String::from_utf8_lossy(rest).into_owned(),
            encoding: "utf-8",
        };
    }

    if let Some(rest) = bytes.strip_prefix(UTF16_LE_BOM) {
        return DecodedText {
            text: decode_utf16(rest, u16::from_le_bytes),
            encoding: "utf-16le",
        };
    }

    if let Some(rest) = bytes.strip_prefix(UTF16_BE_BOM) {
        return DecodedText {
            text: decode_utf16(rest, u16::from_be_bytes),
            encoding: "utf-16be",
        };
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => DecodedText {
            text: text.to_string(),
            encoding: "utf-8",
        },
        Err(_) => DecodedText {
            text: decode_windows_1252(bytes),
            encoding: "windows-1252",
        },
    }
}

/// Heuristic binary check: a NUL byte within the first 8 KiB.
pub fn looks_binary(bytes: &[u8]) -> bool {
    if bytes.starts_with(UTF16_LE_BOM) || bytes.starts_with(UTF16_BE_BOM) {
        return false;
    }
    bytes.iter().take(8 * 1024).any(|&b| b == 0)
}

fn decode_utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| to_unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

fn decode_windows_1252(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match b {
            0x80..=0x9F => WINDOWS_1252_HIGH[(b - 0x80) as usize],
            _ => b as char,
        })
        .collect()
}
