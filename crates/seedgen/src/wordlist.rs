//! Export of the English BIP-39 word list.

use bip39::Language;
use serde::Serialize;
use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

pub const WORDLIST_TXT: &str = "bip39_wordlist.txt";
pub const WORDLIST_JSON: &str = "bip39_wordlist.json";

#[derive(Serialize)]
struct WordList<'a> {
    words: &'a [&'static str],
}

/// The 2048 English words, in index order.
pub fn words() -> &'static [&'static str; 2048] {
    Language::English.word_list()
}

/// Writes `   1. abandon`, one word per line, numbered from 1.
pub fn write_numbered<W: Write>(out: &mut W) -> io::Result<()> {
    for (i, word) in words().iter().enumerate() {
        writeln!(out, "{:4}. {word}", i + 1)?;
    }
    Ok(())
}

/// Writes the numbered text list and a JSON document `{"words": [...]}`
/// into `dir`, creating it if needed. Existing files are replaced.
///
/// Returns the text and JSON paths.
///
/// # Errors
///
/// Returns any I/O error from creating the directory or writing either
/// file.
pub fn export(dir: &Path) -> io::Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(dir)?;

    let txt = dir.join(WORDLIST_TXT);
    let mut out = BufWriter::new(File::create(&txt)?);
    write_numbered(&mut out)?;
    out.flush()?;

    let json = dir.join(WORDLIST_JSON);
    let mut out = BufWriter::new(File::create(&json)?);
    serde_json::to_writer_pretty(&mut out, &WordList { words: words() })?;
    writeln!(out)?;
    out.flush()?;

    tracing::info!("Exported {} words to {}", words().len(), dir.display());
    Ok((txt, json))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_listing_is_right_aligned() {
        let mut out = Vec::new();
        write_numbered(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 2048);
        assert_eq!(lines[0], "   1. abandon");
        assert_eq!(lines[2047], "2048. zoo");
    }

    #[test]
    fn export_writes_text_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let (txt, json) = export(&dir.path().join("out")).unwrap();

        assert_eq!(fs::read_to_string(txt).unwrap().lines().count(), 2048);

        let doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(json).unwrap()).unwrap();
        let list = doc["words"].as_array().unwrap();
        assert_eq!(list.len(), 2048);
        assert_eq!(list[1], "ability");
    }
}
