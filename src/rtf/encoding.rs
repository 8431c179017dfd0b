//! Windows code page lookup for `\ansicpg`.

use encoding_rs::Encoding;

/// Map a Windows code page number to an encoding.
///
/// Returns `None` for code pages without a close `encoding_rs` equivalent;
/// callers keep their current encoding in that case.
pub fn codepage_to_encoding(codepage: u32) -> Option<&'static Encoding> {
    match codepage {
        437 | 850 | 866 => Some(encoding_rs::IBM866),
        874 => Some(encoding_rs::WINDOWS_874),
        932 => Some(encoding_rs::SHIFT_JIS),
        936 => Some(encoding_rs::GBK),
        949 => Some(encoding_rs::EUC_KR),
        950 => Some(encoding_rs::BIG5),
        1250 => Some(encoding_rs::WINDOWS_1250),
        1251 => Some(encoding_rs::WINDOWS_1251),
        1252 => Some(encoding_rs::WINDOWS_1252),
        1253 => Some(encoding_rs::WINDOWS_1253),
        1254 => Some(encoding_rs::WINDOWS_1254),
        1255 => Some(encoding_rs::WINDOWS_1255),
        1256 => Some(encoding_rs::WINDOWS_1256),
        1257 => Some(encoding_rs::WINDOWS_1257),
        1258 => Some(encoding_rs::WINDOWS_1258),
        10000 => Some(encoding_rs::MACINTOSH),
        20932 => Some(encoding_rs::EUC_JP),
        28591 => Some(encoding_rs::WINDOWS_1252),
        28592 => Some(encoding_rs::ISO_8859_2),
        28595 => Some(encoding_rs::ISO_8859_5),
        54936 => Some(encoding_rs::GB18030),
        65001 => Some(encoding_rs::UTF_8),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codepages() {
        assert_eq!(codepage_to_encoding(1252), Some(encoding_rs::WINDOWS_1252));
        assert_eq!(codepage_to_encoding(1251).map(|e| e.name()), Some("windows-1251"));
        assert_eq!(codepage_to_encoding(936).map(|e| e.name()), Some("GBK"));
        assert!(codepage_to_encoding(1).is_none());
    }
}
