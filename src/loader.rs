//! Parser for the textual program format: one binary byte literal per line,
//! with `#` starting a comment. Lines that hold no byte are skipped.

/// Extracts the program bytes from an `.ls8` source file.
pub fn parse_program(source: &str) -> Vec<u8> {
    source
        .lines()
        .filter_map(|line| {
            let code = line.split_once('#').map_or(line, |(code, _)| code).trim();
            u8::from_str_radix(code, 2).ok()
        })
        .collect()
}
