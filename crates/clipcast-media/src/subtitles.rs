//! Subtitle segmentation and ASS track generation.
//!
//! Transcript segments are re-chunked into short captions: each segment is
//! split into sentences, each sentence greedily into chunks of at most
//! `max_words` words and roughly `max_chars` characters. The segment's
//! time span is divided evenly across all of its chunks, so the chunks of
//! one sentence are contiguous and a segment's chunks tile its span.

use clipcast_models::{SubtitleSegment, TranscriptSegment};
use regex::Regex;
use std::fmt::Write as _;
use std::sync::OnceLock;

/// Default maximum words per caption.
pub const DEFAULT_MAX_WORDS: usize = 7;

/// Default maximum characters per caption line.
pub const DEFAULT_MAX_CHARS: usize = 35;

/// Segments with shorter text are dropped.
const MIN_SEGMENT_CHARS: usize = 2;

/// Caption chunking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtitleSegmenter {
    pub max_words: usize,
    pub max_chars: usize,
}

impl Default for SubtitleSegmenter {
    fn default() -> Self {
        Self {
            max_words: DEFAULT_MAX_WORDS,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

impl SubtitleSegmenter {
    pub fn new(max_words: usize, max_chars: usize) -> Self {
        Self {
            max_words: max_words.max(1),
            max_chars,
        }
    }

    /// Re-chunk `segments` into caption windows, preserving input order.
    pub fn segment(&self, segments: &[TranscriptSegment]) -> Vec<SubtitleSegment> {
        let mut out = Vec::new();

        for seg in segments {
            let text = seg.text.trim();
            if text.chars().count() < MIN_SEGMENT_CHARS || seg.end <= seg.start {
                continue;
            }

            let chunks: Vec<String> = split_sentences(text)
                .into_iter()
                .flat_map(|sentence| self.chunk_sentence(sentence))
                .collect();
            if chunks.is_empty() {
                continue;
            }

            let step = (seg.end - seg.start) / chunks.len() as f64;
            let last = chunks.len() - 1;
            for (i, chunk) in chunks.into_iter().enumerate() {
                let start = seg.start + i as f64 * step;
                // Pin the final chunk to the segment end so the span is exact.
                let end = if i == last {
                    seg.end
                } else {
                    seg.start + (i + 1) as f64 * step
                };
                out.push(SubtitleSegment::new(start, end, chunk));
            }
        }

        out
    }

    /// Greedy word grouping for one sentence.
    fn chunk_sentence(&self, sentence: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_len = 0usize;

        for word in sentence.split_whitespace() {
            let word_len = word.chars().count();
            let full = current.len() >= self.max_words || current_len + word_len > self.max_chars;
            if full && !current.is_empty() {
                chunks.push(current.join(" "));
                current.clear();
                current_len = 0;
            }
            current.push(word);
            // Counts the separating space.
            current_len += word_len + 1;
        }

        if !current.is_empty() {
            chunks.push(current.join(" "));
        }
        chunks
    }
}

/// Chunk with the default limits.
pub fn segment(segments: &[TranscriptSegment]) -> Vec<SubtitleSegment> {
    SubtitleSegmenter::default().segment(segments)
}

/// Split at `.`, `!` or `?` followed by whitespace. Punctuation stays with
/// its sentence; empty sentences are dropped.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for boundary in sentence_boundary().find_iter(text) {
        // The terminator is a single ASCII byte.
        sentences.push(&text[start..boundary.start() + 1]);
        start = boundary.end();
    }
    sentences.push(&text[start..]);

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn sentence_boundary() -> &'static Regex {
    static BOUNDARY: OnceLock<Regex> = OnceLock::new();
    BOUNDARY.get_or_init(|| Regex::new(r"[.!?]\s+").expect("sentence boundary pattern is valid"))
}

/// Format seconds as an ASS timestamp, `h:mm:ss.cc`.
pub fn format_ass_time(seconds: f64) -> String {
    let total_cs = (seconds.max(0.0) * 100.0).round() as u64;
    let cs = total_cs % 100;
    let total_secs = total_cs / 100;
    format!(
        "{}:{:02}:{:02}.{:02}",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60,
        cs
    )
}

const ASS_HEADER: &str = "[Script Info]
ScriptType: v4.00+
PlayResX: 384
PlayResY: 288
ScaledBorderAndShadow: yes

[V4+ Styles]
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding
Style: Default,Arial,18,&H00FFFFFF,&H000000FF,&H00000000,&H80000000,-1,0,0,0,100,100,0,0,1,1.5,0.5,2,10,10,15,1

[Events]
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text
";

/// Make caption text safe for a Dialogue line.
///
/// Text is the last field, so commas need no escaping. Newlines would end
/// the event and braces would open an override block.
pub fn escape_ass_text(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
        .replace('{', "\\{")
        .replace('}', "\\}")
}

/// Render captions as a styled ASS document.
pub fn build_ass_document(segments: &[SubtitleSegment]) -> String {
    let mut doc = String::from(ASS_HEADER);
    for seg in segments {
        let text = escape_ass_text(&seg.text);
        let _ = writeln!(
            doc,
            "Dialogue: 0,{},{},Default,,0,0,0,,{}",
            format_ass_time(seg.start),
            format_ass_time(seg.end),
            text
        );
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f64, end: f64, text: &str) -> TranscriptSegment {
        TranscriptSegment::new(start, end, text)
    }

    #[test]
    fn test_split_sentences() {
        assert_eq!(
            split_sentences("This is an amazing demo. Watch closely!"),
            vec!["This is an amazing demo.", "Watch closely!"]
        );
        assert_eq!(split_sentences("v1.2 is out"), vec!["v1.2 is out"]);
        assert_eq!(split_sentences("Wait?!  Really.  "), vec!["Wait?!", "Really."]);
        assert!(split_sentences("   ").is_empty());
    }

    #[test]
    fn test_demo_segment_splits_by_sentence() {
        let out = segment(&[seg(0.0, 4.2, "This is an amazing demo. Watch closely!")]);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].text, "This is an amazing demo.");
        assert_eq!(out[1].text, "Watch closely!");
        assert_eq!(out[0].start, 0.0);
        assert_eq!(out[0].end, out[1].start);
        assert_eq!(out[1].end, 4.2);
        assert!((out[0].duration() - 2.1).abs() < 1e-9);
    }

    #[test]
    fn test_word_limit() {
        let text = "one two three four five six seven eight nine ten";
        let out = segment(&[seg(10.0, 15.0, text)]);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].text, "one two three four five six seven");
        assert_eq!(out[1].text, "eight nine ten");
        assert_eq!(out[0].start, 10.0);
        assert_eq!(out[0].end, 12.5);
        assert_eq!(out[1].start, 12.5);
        assert_eq!(out[1].end, 15.0);
    }

    #[test]
    fn test_char_limit() {
        let text = "extraordinarily magnificent unbelievable spectacular";
        let out = segment(&[seg(0.0, 3.0, text)]);

        assert!(out.len() >= 2);
        for chunk in &out {
            let words = chunk.text.split_whitespace().count();
            assert!(words == 1 || chunk.text.chars().count() <= DEFAULT_MAX_CHARS);
        }
    }

    #[test]
    fn test_overlong_word_gets_own_chunk() {
        let out = SubtitleSegmenter::new(7, 5).segment(&[seg(0.0, 2.0, "supercalifragilistic ok")]);
        let texts: Vec<_> = out.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["supercalifragilistic", "ok"]);
    }

    #[test]
    fn test_short_and_empty_segments_dropped() {
        let out = segment(&[
            seg(0.0, 1.0, "a"),
            seg(1.0, 2.0, "   "),
            seg(2.0, 3.0, "Hello there"),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "Hello there");
        assert_eq!(out[0].start, 2.0);
    }

    #[test]
    fn test_invariants_hold_across_inputs() {
        let inputs = [
            seg(0.0, 9.0, "The quick brown fox jumps over the lazy dog. It was not amused at all! Why would it be? Nobody knows."),
            seg(9.0, 9.5, "Short one."),
            seg(12.0, 20.0, "words words words words words words words words words words words words words words words"),
        ];
        let out = segment(&inputs);

        assert!(!out.is_empty());
        for chunk in &out {
            assert!(chunk.start < chunk.end);
            assert!(chunk.word_count() <= DEFAULT_MAX_WORDS);
        }
        for pair in out.windows(2) {
            assert!(pair[0].end <= pair[1].start + 1e-9);
        }
    }

    #[test]
    fn test_format_ass_time() {
        assert_eq!(format_ass_time(3725.5), "1:02:05.50");
        assert_eq!(format_ass_time(0.0), "0:00:00.00");
        assert_eq!(format_ass_time(0.29), "0:00:00.29");
        assert_eq!(format_ass_time(59.999), "0:01:00.00");
    }

    #[test]
    fn test_ass_document() {
        let doc = build_ass_document(&[SubtitleSegment::new(1.0, 2.5, "Hello, world")]);
        assert!(doc.starts_with("[Script Info]"));
        assert!(doc.contains("PlayResX: 384"));
        assert!(doc.contains("&H80000000"));
        assert!(doc.ends_with("Dialogue: 0,0:00:01.00,0:00:02.50,Default,,0,0,0,,Hello, world\n"));
    }

    #[test]
    fn test_escape_ass_text() {
        assert_eq!(escape_ass_text("one, two"), "one, two");
        assert_eq!(escape_ass_text("{\\b1}bold{\\b0}"), "\\{\\b1\\}bold\\{\\b0\\}");
        assert_eq!(escape_ass_text("line\nbreak"), "line break");

        let doc = build_ass_document(&[SubtitleSegment::new(0.0, 1.0, "a {tag}")]);
        assert!(doc.ends_with(",,a \\{tag\\}\n"));
    }
}
