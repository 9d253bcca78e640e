use crate::error::IngestError;
use crate::models::ChunkingOptions;

/// Splits `text` into overlapping windows of at most `chunk_size` characters.
///
/// Boundaries prefer, in order, a paragraph break, a line break, and a word
/// break nearest below the target size, falling back to a hard cut. Every
/// chunk is a contiguous slice of `text` and consecutive chunks share exactly
/// `chunk_overlap` characters, so stripping the overlap and concatenating
/// reconstructs the input. Pure and deterministic.
pub fn split_text(text: &str, options: &ChunkingOptions) -> Result<Vec<String>, IngestError> {
    options.validate()?;

    if text.trim().is_empty() {
        return Err(IngestError::InvalidInput(
            "cannot chunk empty text".to_string(),
        ));
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= options.chunk_size {
        return Ok(vec![text.to_string()]);
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;

    loop {
        if chars.len() - start <= options.chunk_size {
            chunks.push(chars[start..].iter().collect());
            break;
        }

        let hard_end = start + options.chunk_size;
        // The floor keeps every boundary past the previous chunk's overlap
        // region, which guarantees forward progress.
        let floor = start + options.chunk_overlap + 1;
        let end = snap_break(&chars, floor, hard_end);

        chunks.push(chars[start..end].iter().collect());
        start = end - options.chunk_overlap;
    }

    Ok(chunks)
}

/// Picks the break position in `(floor, hard_end]` closest to `hard_end`,
/// preferring a paragraph break over a line break over a word break.
fn snap_break(chars: &[char], floor: usize, hard_end: usize) -> usize {
    let mut line_break = None;
    let mut word_break = None;

    let mut end = hard_end;
    while end > floor {
        if end >= 2 && chars[end - 1] == '\n' && chars[end - 2] == '\n' {
            return end;
        }
        if line_break.is_none() && chars[end - 1] == '\n' {
            line_break = Some(end);
        }
        if word_break.is_none() && chars[end - 1] == ' ' {
            word_break = Some(end);
        }
        end -= 1;
    }

    line_break.or(word_break).unwrap_or(hard_end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconstruct(chunks: &[String], overlap: usize) -> String {
        let mut rebuilt = String::new();
        for (position, chunk) in chunks.iter().enumerate() {
            if position == 0 {
                rebuilt.push_str(chunk);
            } else {
                rebuilt.extend(chunk.chars().skip(overlap));
            }
        }
        rebuilt
    }

    #[test]
    fn short_text_yields_a_single_identical_chunk() {
        let options = ChunkingOptions {
            chunk_size: 100,
            chunk_overlap: 20,
        };
        let chunks = split_text("a short note", &options).unwrap();
        assert_eq!(chunks, vec!["a short note".to_string()]);
    }

    #[test]
    fn empty_and_blank_text_are_rejected() {
        let options = ChunkingOptions::default();
        assert!(matches!(
            split_text("", &options),
            Err(IngestError::InvalidInput(_))
        ));
        assert!(matches!(
            split_text("   \n\t ", &options),
            Err(IngestError::InvalidInput(_))
        ));
    }

    #[test]
    fn invalid_geometry_is_rejected_before_splitting() {
        let options = ChunkingOptions {
            chunk_size: 0,
            chunk_overlap: 0,
        };
        assert!(matches!(
            split_text("text", &options),
            Err(IngestError::InvalidChunkConfig(_))
        ));
    }

    #[test]
    fn hard_cuts_produce_the_expected_window_count() {
        // 3000 chars with no break candidates: windows at 0, 800, 1600, 2400.
        let text = "a".repeat(3_000);
        let options = ChunkingOptions {
            chunk_size: 1_000,
            chunk_overlap: 200,
        };

        let chunks = split_text(&text, &options).unwrap();
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].len(), 1_000);
        assert_eq!(chunks[3].len(), 600);
    }

    #[test]
    fn overlap_removal_reconstructs_the_original_text() {
        let sentence = "The quick brown fox jumps over the lazy dog. ";
        let mut text = String::new();
        for paragraph in 0..12 {
            for _ in 0..paragraph + 1 {
                text.push_str(sentence);
            }
            text.push_str("\n\n");
        }

        let options = ChunkingOptions {
            chunk_size: 120,
            chunk_overlap: 30,
        };
        let chunks = split_text(&text, &options).unwrap();

        assert!(chunks.len() > 1);
        assert_eq!(reconstruct(&chunks, options.chunk_overlap), text);
    }

    #[test]
    fn splitting_is_deterministic() {
        let text = "alpha beta gamma delta ".repeat(100);
        let options = ChunkingOptions {
            chunk_size: 150,
            chunk_overlap: 40,
        };

        let first = split_text(&text, &options).unwrap();
        let second = split_text(&text, &options).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn paragraph_breaks_win_over_word_breaks() {
        let mut text = "x".repeat(60);
        text.push_str("\n\n");
        text.push_str(&"word ".repeat(40));

        let options = ChunkingOptions {
            chunk_size: 100,
            chunk_overlap: 10,
        };
        let chunks = split_text(&text, &options).unwrap();

        assert!(chunks[0].ends_with("\n\n"));
        assert_eq!(chunks[0].len(), 62);
    }

    #[test]
    fn chunks_never_exceed_the_target_size() {
        let text = "lorem ipsum dolor sit amet ".repeat(200);
        let options = ChunkingOptions {
            chunk_size: 250,
            chunk_overlap: 50,
        };

        for chunk in split_text(&text, &options).unwrap() {
            assert!(chunk.chars().count() <= options.chunk_size);
        }
    }
}
