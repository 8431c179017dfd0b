//! Paragraphs and their inline content.

use bitflags::bitflags;

use crate::common::RGBColor;

/// Horizontal alignment of a paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

bitflags! {
    /// Character emphasis flags carried by runs and spans.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextStyle: u8 {
        const BOLD = 0b001;
        const ITALIC = 0b010;
        const UNDERLINE = 0b100;
    }
}

/// Character formatting shared by [`Run`] and [`Span`].
///
/// `None` for family or size means "inherit the paragraph default".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CharFormat {
    pub font_family: Option<String>,
    /// Font size in device-independent pixels.
    pub font_size: Option<f32>,
    pub style: TextStyle,
    pub color: RGBColor,
}

impl CharFormat {
    #[inline]
    pub fn bold(&self) -> bool {
        self.style.contains(TextStyle::BOLD)
    }

    #[inline]
    pub fn italic(&self) -> bool {
        self.style.contains(TextStyle::ITALIC)
    }

    #[inline]
    pub fn underline(&self) -> bool {
        self.style.contains(TextStyle::UNDERLINE)
    }

    /// Font size if set to a usable (positive) value.
    #[inline]
    pub fn effective_size(&self) -> Option<f32> {
        self.font_size.filter(|s| *s > 0.0)
    }

    /// Resolve this format against an enclosing span's format.
    ///
    /// Values set on `self` win; emphasis flags accumulate; a black color
    /// takes the parent's color.
    pub fn inherit(&self, parent: &CharFormat) -> CharFormat {
        CharFormat {
            font_family: self
                .font_family
                .clone()
                .or_else(|| parent.font_family.clone()),
            font_size: self.effective_size().or(parent.effective_size()),
            style: self.style | parent.style,
            color: if self.color.is_black() {
                parent.color
            } else {
                self.color
            },
        }
    }

    /// True when nothing differs from the inherited defaults.
    pub fn is_default(&self) -> bool {
        self.font_family.is_none()
            && self.effective_size().is_none()
            && self.style.is_empty()
            && self.color.is_black()
    }
}

/// A stretch of uniformly formatted text without line breaks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Run {
    pub text: String,
    pub format: CharFormat,
}

impl Run {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: CharFormat::default(),
        }
    }

    pub fn with_format(text: impl Into<String>, format: CharFormat) -> Self {
        Self {
            text: text.into(),
            format,
        }
    }

    #[inline]
    pub fn with_style(mut self, style: TextStyle) -> Self {
        self.format.style = style;
        self
    }
}

/// Formatting applied over nested inlines.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Span {
    pub format: CharFormat,
    pub inlines: Vec<Inline>,
}

/// Inline content of a paragraph.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Run(Run),
    LineBreak,
    Span(Span),
}

impl Inline {
    /// Split `text` on line breaks into runs joined by [`Inline::LineBreak`].
    ///
    /// `\r\n`, `\n` and a lone `\r` all count as one break. The result always
    /// holds at least one run, possibly empty.
    pub fn runs_from_text(text: &str, format: &CharFormat) -> Vec<Inline> {
        let normalized;
        let text = if text.contains('\r') {
            normalized = text.replace("\r\n", "\n").replace('\r', "\n");
            normalized.as_str()
        } else {
            text
        };

        let mut inlines = Vec::new();
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                inlines.push(Inline::LineBreak);
            }
            inlines.push(Inline::Run(Run::with_format(line, format.clone())));
        }
        inlines
    }

    #[inline]
    pub fn as_run(&self) -> Option<&Run> {
        match self {
            Inline::Run(run) => Some(run),
            _ => None,
        }
    }

    fn push_text(&self, out: &mut String) {
        match self {
            Inline::Run(run) => out.push_str(&run.text),
            Inline::LineBreak => out.push('\n'),
            Inline::Span(span) => {
                for inline in &span.inlines {
                    inline.push_text(out);
                }
            },
        }
    }
}

/// A paragraph: inline content plus alignment and optional line spacing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Paragraph {
    pub inlines: Vec<Inline>,
    pub alignment: Alignment,
    /// Line height as a multiple of the paragraph's font size.
    pub line_spacing: Option<f32>,
}

impl Paragraph {
    /// Create an empty paragraph holding one empty run.
    pub fn new() -> Self {
        Self {
            inlines: vec![Inline::Run(Run::default())],
            ..Default::default()
        }
    }

    /// Create an unformatted paragraph, splitting line breaks into
    /// [`Inline::LineBreak`]s.
    pub fn from_text(text: &str) -> Self {
        Self {
            inlines: Inline::runs_from_text(text, &CharFormat::default()),
            ..Default::default()
        }
    }

    #[inline]
    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    #[inline]
    pub fn with_line_spacing(mut self, factor: f32) -> Self {
        self.line_spacing = Some(factor);
        self
    }

    pub fn push(&mut self, inline: Inline) {
        self.inlines.push(inline);
    }

    /// Guarantee at least one inline, adding an empty run if needed.
    pub fn ensure_inline(&mut self) {
        if self.inlines.is_empty() {
            self.inlines.push(Inline::Run(Run::default()));
        }
    }

    /// Plain text of this paragraph; line breaks become `\n`.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for inline in &self.inlines {
            inline.push_text(&mut out);
        }
        out
    }
}
