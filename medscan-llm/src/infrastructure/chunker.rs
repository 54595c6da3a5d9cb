//! Project chunker
//!
//! Splits a project snapshot into chunks bounded by a backend's context
//! window. A source unit (one file) is the atomic boundary: units that fit
//! the window are never split. An oversized unit is split at line
//! boundaries near the window, and every resulting chunk is marked
//! `truncated` so the interpreter downgrades confidence for artifacts
//! derived from it. Splitting is deterministic and idempotent: identical
//! content and window always produce identical chunk ids and boundaries.

use medscan_core::domain::{Chunk, ChunkId, ProjectSnapshot, SourceSpan, SourceUnit};

/// Rough bytes-per-token ratio for window budgeting
const BYTES_PER_TOKEN: usize = 4;

/// Estimate the token count of a text for window budgeting.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(BYTES_PER_TOKEN)
}

/// Split a project into window-bounded chunks.
///
/// `window_tokens` is the per-chunk token budget. Source units with only
/// whitespace are skipped; there is nothing to analyze in them.
pub fn split_project(project: &ProjectSnapshot, window_tokens: usize) -> Vec<Chunk> {
    let window_tokens = window_tokens.max(1);
    let mut chunks = Vec::new();

    for unit in &project.units {
        if unit.content.trim().is_empty() {
            continue;
        }

        if estimate_tokens(&unit.content) <= window_tokens {
            let ordinal = chunks.len();
            chunks.push(Chunk {
                id: ChunkId::new(ordinal),
                source: SourceSpan {
                    path: unit.path.clone(),
                    start_line: 1,
                    end_line: unit.content.lines().count().max(1) as u32,
                },
                content: unit.content.clone(),
                truncated: false,
            });
        } else {
            split_oversized_unit(unit, window_tokens, &mut chunks);
        }
    }

    chunks
}

/// Split one unit that exceeds the window at line boundaries.
fn split_oversized_unit(unit: &SourceUnit, window_tokens: usize, chunks: &mut Vec<Chunk>) {
    let budget_bytes = window_tokens * BYTES_PER_TOKEN;

    let mut current = String::new();
    let mut start_line = 1u32;
    let mut line_no = 0u32;

    let flush = |content: &mut String, start: u32, end: u32, chunks: &mut Vec<Chunk>| {
        if content.is_empty() {
            return;
        }
        let ordinal = chunks.len();
        chunks.push(Chunk {
            id: ChunkId::new(ordinal),
            source: SourceSpan {
                path: unit.path.clone(),
                start_line: start,
                end_line: end,
            },
            content: std::mem::take(content),
            truncated: true,
        });
    };

    for line in unit.content.lines() {
        line_no += 1;

        // A single line larger than the whole window: flush what we have,
        // then hard-split the line at character boundaries.
        if line.len() > budget_bytes {
            flush(&mut current, start_line, line_no.saturating_sub(1), chunks);
            for piece in split_line(line, budget_bytes) {
                let ordinal = chunks.len();
                chunks.push(Chunk {
                    id: ChunkId::new(ordinal),
                    source: SourceSpan {
                        path: unit.path.clone(),
                        start_line: line_no,
                        end_line: line_no,
                    },
                    content: piece,
                    truncated: true,
                });
            }
            start_line = line_no + 1;
            continue;
        }

        if !current.is_empty() && current.len() + line.len() + 1 > budget_bytes {
            flush(&mut current, start_line, line_no.saturating_sub(1), chunks);
            start_line = line_no;
        }

        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }

    flush(&mut current, start_line, line_no, chunks);
}

/// Hard-split one line into budget-sized pieces at character boundaries.
fn split_line(line: &str, budget_bytes: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for ch in line.chars() {
        if !current.is_empty() && current.len() + ch.len_utf8() > budget_bytes {
            pieces.push(std::mem::take(&mut current));
        }
        current.push(ch);
    }
    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
}
