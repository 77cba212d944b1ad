//! Word list fixtures.

use vocab_core::RawRow;

pub const HEADER: &str = "word,pinyin,meaning,example,audioLink";

/// CSV with `count` distinct, valid words.
pub fn sample_csv(count: usize) -> String {
    let mut csv = String::from(HEADER);
    csv.push('\n');
    for i in 0..count {
        csv.push_str(&format!(
            "词{i},cí {i},word number {i},这是第{i}个词,https://cdn.example.com/audio/{i}.mp3\n"
        ));
    }
    csv
}

/// CSV built from `(word, pinyin, meaning)` triples.
pub fn csv_from(rows: &[(&str, &str, &str)]) -> String {
    let mut csv = String::from("word,pinyin,meaning\n");
    for (word, pinyin, meaning) in rows {
        csv.push_str(&format!("{word},{pinyin},{meaning}\n"));
    }
    csv
}

pub fn row(word: &str, pinyin: &str, meaning: &str) -> RawRow {
    RawRow::new()
        .with("word", word)
        .with("pinyin", pinyin)
        .with("meaning", meaning)
}
