//! Text measurement.
//!
//! Layout only needs widths, so measurement is a single pure function of the
//! text and its font. A shell with access to real font metrics plugs in its
//! own [`TextMeasurer`]; the crate ships an average-glyph estimator.

/// Font description handed to a measurer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSpec<'a> {
    pub family: &'a str,
    /// Size in device-independent pixels.
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
}

/// Measures the rendered width of a run of text in device-independent pixels.
pub trait TextMeasurer {
    fn measure(&self, text: &str, font: &FontSpec<'_>) -> f32;
}

impl<F> TextMeasurer for F
where
    F: Fn(&str, &FontSpec<'_>) -> f32,
{
    #[inline]
    fn measure(&self, text: &str, font: &FontSpec<'_>) -> f32 {
        self(text, font)
    }
}

/// Estimates widths from an average glyph width proportional to the font size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AverageWidthMeasurer {
    /// Average glyph width as a fraction of the font size.
    pub char_width_ratio: f32,
    /// Multiplier applied to bold text.
    pub bold_factor: f32,
}

impl Default for AverageWidthMeasurer {
    fn default() -> Self {
        Self {
            char_width_ratio: 0.5,
            bold_factor: 1.1,
        }
    }
}

impl TextMeasurer for AverageWidthMeasurer {
    fn measure(&self, text: &str, font: &FontSpec<'_>) -> f32 {
        let average = font.size * self.char_width_ratio;
        let width = text.chars().count() as f32 * average;
        if font.bold { width * self.bold_factor } else { width }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FONT: FontSpec<'static> = FontSpec {
        family: "Segoe UI",
        size: 14.0,
        bold: false,
        italic: false,
    };

    #[test]
    fn test_average_width_counts_chars() {
        let m = AverageWidthMeasurer::default();
        assert_eq!(m.measure("abcd", &FONT), 28.0);
        assert_eq!(m.measure("äöüß", &FONT), 28.0);
        assert_eq!(m.measure("", &FONT), 0.0);
    }

    #[test]
    fn test_bold_is_wider() {
        let m = AverageWidthMeasurer::default();
        let bold = FontSpec { bold: true, ..FONT };
        assert!(m.measure("abcd", &bold) > m.measure("abcd", &FONT));
    }

    #[test]
    fn test_closure_measurer() {
        let m = |text: &str, font: &FontSpec<'_>| text.len() as f32 * font.size;
        assert_eq!(m.measure("ab", &FONT), 28.0);
    }
}
