// Fuzzy lookup of produced clips by caption text.
use super::*;

const MATCH_SCORE: i64 = 1;
const CONSECUTIVE_BONUS: i64 = 5;
const WORD_START_BONUS: i64 = 3;
const FIRST_CHAR_BONUS: i64 = 10;
const GAP_PENALTY: i64 = 1;
const MAX_LEADING_PENALTY: i64 = 15;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub score: i64,
    pub gif: GifRecord,
}

/// Ranks produced clips whose text contains every character of `query` in
/// order. `max_matches == 0` returns every match.
pub fn search_gifs(
    store: &CheckpointStore,
    query: &str,
    max_matches: usize,
) -> Result<Vec<SearchHit>> {
    let needle: Vec<char> = query.trim().to_lowercase().chars().collect();
    if needle.is_empty() {
        return Ok(Vec::new());
    }

    let mut hits: Vec<SearchHit> = store
        .all_gifs()?
        .into_iter()
        .filter_map(|gif| {
            fuzzy_score(&needle, &gif.text).map(|score| SearchHit { score, gif })
        })
        .collect();
    hits.sort_by(|a, b| b.score.cmp(&a.score).then(a.gif.id.cmp(&b.gif.id)));
    if max_matches > 0 {
        hits.truncate(max_matches);
    }
    Ok(hits)
}

pub(super) fn fuzzy_score(needle: &[char], haystack: &str) -> Option<i64> {
    let chars: Vec<char> = haystack.to_lowercase().chars().collect();
    let mut score = 0_i64;
    let mut needle_pos = 0_usize;
    let mut last_match: Option<usize> = None;

    for (index, ch) in chars.iter().enumerate() {
        if needle_pos == needle.len() {
            break;
        }
        if *ch != needle[needle_pos] {
            continue;
        }
        score += MATCH_SCORE;
        match last_match {
            None => {
                score -= (index as i64 * GAP_PENALTY).min(MAX_LEADING_PENALTY);
                if index == 0 {
                    score += FIRST_CHAR_BONUS;
                }
            }
            Some(previous) if previous + 1 == index => score += CONSECUTIVE_BONUS,
            Some(previous) => score -= (index - previous - 1) as i64 * GAP_PENALTY,
        }
        let at_word_start = index > 0 && !chars[index - 1].is_alphanumeric();
        if at_word_start {
            score += WORD_START_BONUS;
        }
        last_match = Some(index);
        needle_pos += 1;
    }

    (needle_pos == needle.len()).then_some(score)
}
