use super::{ELLIPSIS, TextMeasure, shorten_once};
use serde::{Deserialize, Serialize};

/// One line of a node caption. `baseline` is the vertical offset from the node
/// centre, `remaining_width` the horizontal room left on the line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionLine {
    pub text: String,
    pub baseline: f32,
    pub remaining_width: f32,
}

impl CaptionLine {
    fn empty(line_count: usize, line_index: usize, radius: f32, line_height: f32) -> Self {
        let half = line_count as f32 / 2.0;
        let baseline = (1.0 + line_index as f32 - half) * line_height;
        let containing_height = if (line_index as f32) < half {
            baseline - line_height
        } else {
            baseline
        };
        let width = 2.0 * (radius * radius - containing_height * containing_height).max(0.0).sqrt();
        Self {
            text: String::new(),
            baseline,
            remaining_width: width,
        }
    }

    fn push_word(&mut self, word: &str, width: f32) {
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(word);
        self.remaining_width -= width;
    }

    pub fn is_truncated(&self) -> bool {
        self.text.ends_with(ELLIPSIS)
    }
}

/// Word-wrap `text` into the circle of `radius`.
///
/// Line counts are tried from one upward; the last arrangement without an empty
/// line is kept, stopping as soon as every word fits. Once every word is placed,
/// trailing empty lines are dropped. When words are left over the final line
/// ends with an ellipsis.
pub fn fit_caption_into_circle(
    text: &str,
    radius: f32,
    font_size: f32,
    measure: &dyn TextMeasure,
) -> Vec<CaptionLine> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() || radius <= 0.0 || font_size <= 0.0 {
        return Vec::new();
    }

    let line_height = font_size;
    let max_lines = (radius * 2.0 / font_size).floor().max(1.0) as usize;

    let mut best: Option<Vec<CaptionLine>> = None;
    for line_count in 1..=max_lines {
        let (mut lines, consumed) = fit_on_lines(&words, line_count, radius, line_height, font_size, measure);
        let complete = consumed >= words.len();
        if complete {
            while lines.last().is_some_and(|line| line.text.is_empty()) {
                lines.pop();
            }
        }
        if lines.is_empty() || lines.iter().any(|line| line.text.is_empty()) {
            continue;
        }
        best = Some(lines);
        if complete {
            break;
        }
    }

    best.unwrap_or_else(|| {
        // Nothing fits without an empty line, fall back to a single truncated line.
        fit_on_lines(&words, 1, radius, line_height, font_size, measure).0
    })
}

fn fit_on_lines(
    words: &[&str],
    line_count: usize,
    radius: f32,
    line_height: f32,
    font_size: f32,
    measure: &dyn TextMeasure,
) -> (Vec<CaptionLine>, usize) {
    let mut lines = Vec::with_capacity(line_count);
    let mut next_word = 0;
    for line_index in 0..line_count {
        let mut line = CaptionLine::empty(line_count, line_index, radius, line_height);
        while let Some(word) = words.get(next_word) {
            let width = measure.measure(&format!(" {word}"), font_size);
            if width >= line.remaining_width {
                break;
            }
            line.push_word(word, width);
            next_word += 1;
        }
        lines.push(line);
    }

    if next_word < words.len()
        && let Some(last) = lines.last_mut()
    {
        append_shortened_word(last, words[next_word], font_size, measure);
    }
    (lines, next_word)
}

fn append_shortened_word(
    line: &mut CaptionLine,
    word: &str,
    font_size: f32,
    measure: &dyn TextMeasure,
) {
    let mut candidate = word.to_string();
    while candidate.chars().count() > 2 {
        candidate = shorten_once(&candidate);
        let width = measure.measure(&candidate, font_size);
        if width < line.remaining_width {
            line.push_word(&candidate, width);
            return;
        }
    }
    // Leftover words are always marked, even when no prefix fits.
    let width = measure.measure(&ELLIPSIS.to_string(), font_size);
    if line.text.is_empty() {
        line.text.push(ELLIPSIS);
    } else {
        line.text.push(' ');
        line.text.push(ELLIPSIS);
    }
    line.remaining_width -= width;
}

/// Width of a relationship caption including padding on both sides.
pub fn measure_relationship_caption(
    caption: &str,
    font_size: f32,
    padding: f32,
    measure: &dyn TextMeasure,
) -> f32 {
    measure.measure(caption, font_size) + 2.0 * padding
}

/// Shorten `caption` until it is narrower than `target_width`.
/// Returns the shortened text and its width, or an empty caption if nothing fits.
pub fn shorten_caption(
    caption: &str,
    target_width: f32,
    font_size: f32,
    measure: &dyn TextMeasure,
) -> (String, f32) {
    let mut shortened = caption.to_string();
    loop {
        if shortened.chars().count() <= 2 {
            return (String::new(), 0.0);
        }
        shortened = shorten_once(&shortened);
        let width = measure.measure(&shortened, font_size);
        if width < target_width {
            return (shortened, width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ApproximateTextMeasure;
    use proptest::prelude::*;

    fn texts(lines: &[CaptionLine]) -> Vec<&str> {
        lines.iter().map(|line| line.text.as_str()).collect()
    }

    #[test]
    fn test_wraps_into_three_lines() {
        let measure = ApproximateTextMeasure::default();
        let lines = fit_caption_into_circle("alpha beta gamma", 25.0, 10.0, &measure);
        assert_eq!(texts(&lines), vec!["alpha", "beta", "gamma"]);
        assert!(lines.iter().all(|line| !line.is_truncated()));
        assert!(lines[0].baseline < lines[2].baseline);
    }

    #[test]
    fn test_larger_radius_needs_fewer_lines() {
        let measure = ApproximateTextMeasure::default();
        let small = fit_caption_into_circle("alpha beta gamma", 25.0, 10.0, &measure);
        let large = fit_caption_into_circle("alpha beta gamma", 40.0, 10.0, &measure);
        assert_eq!(texts(&large), vec!["alpha beta", "gamma"]);
        assert!(large.len() <= small.len());
    }

    #[test]
    fn test_words_placed_early_leave_no_trailing_empty_line() {
        let measure = ApproximateTextMeasure::default();
        let small = fit_caption_into_circle("xx xxxx xxxxxx xx", 28.75, 10.0, &measure);
        assert_eq!(texts(&small), vec!["xx xxxx", "xxxxxx", "xx"]);
        // three lines pack every word into the first two
        let large = fit_caption_into_circle("xx xxxx xxxxxx xx", 31.0, 10.0, &measure);
        assert_eq!(texts(&large), vec!["xx xxxx", "xxxxxx xx"]);
    }

    fn words() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-z]{1,12}", 1..8)
    }

    proptest! {
        #[test]
        fn prop_larger_radius_never_needs_more_lines(
            words in words(),
            radius in 5.0f32..80.0,
            growth in 0.0f32..60.0,
            font_size in prop::sample::select(vec![8.0f32, 10.0, 12.0, 14.0]),
        ) {
            let measure = ApproximateTextMeasure::default();
            let text = words.join(" ");
            let small = fit_caption_into_circle(&text, radius, font_size, &measure);
            prop_assume!(small.iter().all(|line| !line.is_truncated()));

            let large = fit_caption_into_circle(&text, radius + growth, font_size, &measure);
            prop_assert!(large.iter().all(|line| !line.is_truncated()));
            prop_assert!(large.len() <= small.len());
            prop_assert_eq!(texts(&large).join(" "), text);
        }
    }

    #[test]
    fn test_single_line_truncation() {
        let measure = ApproximateTextMeasure::default();
        let lines = fit_caption_into_circle("supercalifragilistic", 10.0, 10.0, &measure);
        assert_eq!(lines.len(), 1);
        assert!(!lines[0].text.is_empty());
        assert!(lines[0].is_truncated());
        assert_eq!(lines[0].text, "s\u{2026}");
    }

    #[test]
    fn test_single_line_without_truncation() {
        let measure = ApproximateTextMeasure::default();
        let lines = fit_caption_into_circle("a", 10.0, 10.0, &measure);
        assert_eq!(texts(&lines), vec!["a"]);
        assert!(!lines[0].is_truncated());
    }

    #[test]
    fn test_fitting_is_deterministic() {
        let measure = ApproximateTextMeasure::default();
        let text = "The Matrix Reloaded and Revolutions";
        assert_eq!(
            fit_caption_into_circle(text, 30.0, 10.0, &measure),
            fit_caption_into_circle(text, 30.0, 10.0, &measure)
        );
    }

    #[test]
    fn test_empty_caption_draws_nothing() {
        let measure = ApproximateTextMeasure::default();
        assert!(fit_caption_into_circle("   ", 25.0, 10.0, &measure).is_empty());
    }

    #[test]
    fn test_shorten_caption() {
        let measure = ApproximateTextMeasure::default();
        // "ACTED_IN" is 8 chars, 48px at 10px font
        let (text, width) = shorten_caption("ACTED_IN", 40.0, 10.0, &measure);
        assert_eq!(text, "ACTED\u{2026}");
        assert!((width - 36.0).abs() < 1e-4);

        assert_eq!(shorten_caption("ACTED_IN", 1.0, 10.0, &measure), (String::new(), 0.0));
        assert_eq!(shorten_caption("ab", 100.0, 10.0, &measure), (String::new(), 0.0));
    }

    #[test]
    fn test_relationship_caption_padding() {
        let measure = ApproximateTextMeasure::default();
        let width = measure_relationship_caption("KNOWS", 10.0, 3.0, &measure);
        assert!((width - 36.0).abs() < 1e-4);
    }
}
