//! Text layout – greedy line breaking of mixed-style runs.
//!
//! Runs are split into words and whitespace; a word moves to the next line
//! when it would overflow the available width, unless it is the first word on
//! the line (over-long words are never split). `\n` forces a break. Spaces at
//! the start and end of a wrapped line are dropped.

use crate::fonts::{FaceId, FontTable};
use crate::frame::PreparedRun;
use crate::page_layout::{TextFragment, TextLine};
use crate::style::EffectiveStyle;
use crate::tree::{RunContent, TextAlign};

const EPSILON: f32 = 0.001;

/// Values substituted for page tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageNumbers {
    pub current: usize,
    pub total: usize,
}

impl PageNumbers {
    fn resolve(&self, content: &RunContent) -> String {
        match content {
            RunContent::Literal(s) => s.clone(),
            RunContent::CurrentPageNumber => self.current.to_string(),
            RunContent::TotalPages => self.total.to_string(),
        }
    }
}

#[derive(Debug, PartialEq)]
enum Token<'s> {
    Word(&'s str),
    Space(&'s str),
    Newline,
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_space: Option<bool> = None;
    for (i, ch) in text.char_indices() {
        if ch == '\n' {
            if let Some(prev) = in_space {
                tokens.push(token(&text[start..i], prev));
            }
            tokens.push(Token::Newline);
            start = i + ch.len_utf8();
            in_space = None;
            continue;
        }
        let is_space = ch.is_whitespace();
        if let Some(prev) = in_space {
            if prev != is_space {
                tokens.push(token(&text[start..i], prev));
                start = i;
            }
        }
        in_space = Some(is_space);
    }
    if let Some(prev) = in_space {
        tokens.push(token(&text[start..], prev));
    }
    tokens
}

fn token(s: &str, is_space: bool) -> Token<'_> {
    if is_space {
        Token::Space(s)
    } else {
        Token::Word(s)
    }
}

/// Text of one style on the line being built.
struct Piece<'a> {
    run: usize,
    style: &'a EffectiveStyle,
    text: String,
    x: f32,
    width: f32,
}

struct LineBreaker<'a> {
    fonts: &'a FontTable,
    max_width: f32,
    lines: Vec<TextLine>,
    pieces: Vec<Piece<'a>>,
    width: f32,
    y: f32,
    /// Whitespace seen since the last word, with its run and width.
    pending_space: Option<(usize, &'a EffectiveStyle, String, f32)>,
    /// Style of the most recent run, used to size empty lines.
    last_style: Option<&'a EffectiveStyle>,
}

impl<'a> LineBreaker<'a> {
    fn measure(&self, face: FaceId, style: &EffectiveStyle, text: &str) -> f32 {
        self.fonts
            .measure_text_width(face, text, style.size, style.weight.is_bold())
    }

    fn append(&mut self, run: usize, style: &'a EffectiveStyle, text: &str, width: f32) {
        match self.pieces.last_mut() {
            Some(piece) if piece.run == run => {
                piece.text.push_str(text);
                piece.width += width;
            }
            _ => self.pieces.push(Piece {
                run,
                style,
                text: text.to_string(),
                x: self.width,
                width,
            }),
        }
        self.width += width;
    }

    fn space(&mut self, run: usize, style: &'a EffectiveStyle, face: FaceId, text: &str) {
        let width = self.measure(face, style, text);
        match &mut self.pending_space {
            Some((_, _, pending, w)) => {
                pending.push_str(text);
                *w += width;
            }
            None => self.pending_space = Some((run, style, text.to_string(), width)),
        }
    }

    fn word(&mut self, run: usize, style: &'a EffectiveStyle, face: FaceId, word: &str) {
        let word_width = self.measure(face, style, word);
        let space_width = self.pending_space.as_ref().map_or(0.0, |p| p.3);

        if !self.pieces.is_empty()
            && self.width + space_width + word_width > self.max_width + EPSILON
        {
            self.pending_space = None;
            self.finish_line();
        }
        if let Some((space_run, space_style, space, w)) = self.pending_space.take() {
            if !self.pieces.is_empty() {
                self.append(space_run, space_style, &space, w);
            }
        }
        self.append(run, style, word, word_width);
    }

    fn finish_line(&mut self) {
        let pieces: Vec<Piece<'a>> = self.pieces.drain(..).collect();

        let mut height = 0.0f32;
        let mut max_size = 0.0f32;
        let mut ascent = 0.0f32;
        if pieces.is_empty() {
            let style = self.last_style.cloned().unwrap_or_default();
            height = style.size * style.line_height;
            max_size = style.size;
            ascent = style.size * 0.75;
        }
        for piece in &pieces {
            let s = piece.style;
            height = height.max(s.size * s.line_height);
            max_size = max_size.max(s.size);
            let face_ascent = self
                .fonts
                .by_name(&s.font)
                .map_or(s.size * 0.75, |face| face.ascender_pt(s.size));
            ascent = ascent.max(face_ascent);
        }

        let fragments = pieces
            .into_iter()
            .map(|p| TextFragment {
                text: p.text,
                x_offset: p.x,
                width: p.width,
                font: p.style.font.clone(),
                size: p.style.size,
                weight: p.style.weight,
                italic: p.style.italic,
                color: p.style.color,
            })
            .collect();

        self.lines.push(TextLine {
            y_offset: self.y,
            height,
            baseline: (height - max_size) / 2.0 + ascent,
            width: self.width,
            fragments,
        });
        self.y += height;
        self.width = 0.0;
    }
}

/// Break `runs` into lines no wider than `max_width` (except over-long words).
///
/// Returns no lines when the runs contain no text at all.
pub fn layout_text(
    runs: &[PreparedRun<'_>],
    fonts: &FontTable,
    max_width: f32,
    numbers: PageNumbers,
) -> Vec<TextLine> {
    let mut breaker = LineBreaker {
        fonts,
        max_width,
        lines: Vec::new(),
        pieces: Vec::new(),
        width: 0.0,
        y: 0.0,
        pending_space: None,
        last_style: None,
    };

    let mut saw_text = false;
    for (idx, run) in runs.iter().enumerate() {
        let text = numbers.resolve(run.content);
        saw_text |= !text.is_empty();
        breaker.last_style = Some(run.style);
        for token in tokenize(&text) {
            match token {
                Token::Word(w) => breaker.word(idx, run.style, run.face, w),
                Token::Space(s) => breaker.space(idx, run.style, run.face, s),
                Token::Newline => {
                    breaker.pending_space = None;
                    breaker.finish_line();
                }
            }
        }
    }
    if saw_text && (!breaker.pieces.is_empty() || breaker.lines.is_empty()) {
        breaker.finish_line();
    }
    breaker.lines
}

/// Total height and widest line.
pub fn block_size(lines: &[TextLine]) -> (f32, f32) {
    let height = lines.iter().map(|l| l.height).sum();
    let width = lines.iter().map(|l| l.width).fold(0.0f32, f32::max);
    (width, height)
}

/// Shift fragments so each line sits according to `align` within `box_width`.
pub fn align_lines(lines: &mut [TextLine], box_width: f32, align: TextAlign) {
    for line in lines {
        let shift = match align {
            TextAlign::Left => 0.0,
            TextAlign::Center => ((box_width - line.width) / 2.0).max(0.0),
            TextAlign::Right => (box_width - line.width).max(0.0),
        };
        for fragment in &mut line.fragments {
            fragment.x_offset += shift;
        }
    }
}
