//! Language detection and the translation seam.

use whatlang::Lang;

use crate::embedding::CollaboratorError;

/// A detected non-English language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectedLanguage {
    /// ISO 639-3 code, e.g. `spa`.
    pub code: &'static str,
    /// English name, e.g. `Spanish`.
    pub name: &'static str,
}

/// Conservative English gate on top of `whatlang`.
///
/// Unreliable detections count as English; a remark is only flagged when the
/// detector is confident. Texts it cannot judge at all are reported by
/// [`LanguageDetector::is_undetectable`] and left to the caller.
#[derive(Debug, Clone)]
pub struct LanguageDetector {
    min_chars: usize,
}

impl LanguageDetector {
    /// Texts with fewer than `min_chars` non-whitespace characters are assumed English.
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars }
    }

    /// Too short for detection, or without a single letter.
    pub fn is_undetectable(&self, text: &str) -> bool {
        let non_space = text.chars().filter(|c| !c.is_whitespace()).count();
        non_space < self.min_chars || !text.chars().any(char::is_alphabetic)
    }

    /// `None` when the text is (or is treated as) English.
    pub fn detect(&self, text: &str) -> Option<DetectedLanguage> {
        if self.is_undetectable(text) {
            return None;
        }
        let info = whatlang::detect(text)?;
        if !info.is_reliable() || info.lang() == Lang::Eng {
            return None;
        }
        Some(DetectedLanguage {
            code: info.lang().code(),
            name: info.lang().eng_name(),
        })
    }
}

/// Translates text into English.
pub trait Translator {
    /// Translate `text` from `source` into English.
    ///
    /// Return [`CollaboratorError::Unsupported`] when the language cannot be handled;
    /// the pipeline treats that as "keep it aside" rather than as a failure.
    fn translate(&self, text: &str, source: DetectedLanguage) -> Result<String, CollaboratorError>;
}

impl<T: Translator + ?Sized> Translator for &T {
    fn translate(&self, text: &str, source: DetectedLanguage) -> Result<String, CollaboratorError> {
        (**self).translate(text, source)
    }
}

/// Translator that translates nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTranslation;

impl Translator for NoTranslation {
    fn translate(&self, _text: &str, source: DetectedLanguage) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::unsupported(format!(
            "no translator configured for {}",
            source.name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_and_letterless_texts_are_english() {
        let d = LanguageDetector::new(10);
        assert_eq!(d.detect("hola"), None);
        assert_eq!(d.detect("1234567890 1234567890"), None);
        assert!(d.is_undetectable("hola"));
        assert!(d.is_undetectable("1234567890 1234567890"));
        assert!(!d.is_undetectable("meter display blank"));
    }

    #[test]
    fn english_sentence_is_english() {
        let d = LanguageDetector::new(10);
        assert_eq!(
            d.detect("The electricity meter has not been working for three weeks and nobody came to check it."),
            None
        );
    }

    #[test]
    fn confident_foreign_text_is_flagged() {
        let d = LanguageDetector::new(10);
        let found = d
            .detect("Счетчик электроэнергии не работает уже три недели, и никто не пришел его проверить.")
            .unwrap();
        assert_ne!(found.code, "eng");
    }

    #[test]
    fn no_translation_is_unsupported() {
        let lang = DetectedLanguage {
            code: "spa",
            name: "Spanish",
        };
        assert!(matches!(
            NoTranslation.translate("hola", lang),
            Err(CollaboratorError::Unsupported { .. })
        ));
    }
}
