//! SSML payload construction for the synthesis provider
//!
//! Message text is embedded in a markup envelope carrying the session's
//! voice, style and the per-job prosody rate. Control characters and markup
//! metacharacters are numeric-escaped so arbitrary chat text cannot break
//! out of the envelope.

use crate::speech::synth::SpeechOptions;
use once_cell::sync::Lazy;
use regex::Regex;

/// Characters that must not appear literally in the markup payload:
/// markup metacharacters, control characters, and the non-ASCII range the
/// provider expects numeric-escaped.
static ESCAPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[<>&\x00-\x1f\u{00A0}-\u{9999}]").expect("escape pattern is valid")
});

/// Numeric-escape text for embedding in the SSML envelope
pub fn escape(text: &str) -> String {
    ESCAPE_RE
        .replace_all(text, |caps: &regex::Captures| {
            let ch = caps[0].chars().next().unwrap_or('\u{FFFD}');
            format!("&#{};", ch as u32)
        })
        .to_string()
}

/// Build the SSML payload for one speech request
pub fn build(text: &str, options: &SpeechOptions) -> String {
    format!(
        concat!(
            "<speak version=\"1.0\" ",
            "xmlns=\"http://www.w3.org/2001/10/synthesis\" ",
            "xmlns:mstts=\"https://www.w3.org/2001/mstts\" ",
            "xml:lang=\"{lang}\">",
            "<voice name=\"{voice}\">",
            "<mstts:express-as style=\"{style}\" styledegree=\"1\">",
            "<prosody rate=\"{rate}\">{text}</prosody>",
            "</mstts:express-as>",
            "</voice>",
            "</speak>"
        ),
        lang = options.language,
        voice = options.voice,
        style = options.style,
        rate = options.rate,
        text = escape(text),
    )
}
