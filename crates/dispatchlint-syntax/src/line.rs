use std::io::{self, BufRead};

/// One physical line together with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
    pub text: String,
    pub number: usize,
}

pub fn read_lines<R: BufRead>(reader: &mut R) -> io::Result<Vec<LineRecord>> {
    let mut lines = Vec::new();
    let mut buffer = String::new();
    let mut number = 0usize;

    loop {
        buffer.clear();
        let bytes_read = reader.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        number += 1;

        let mut line = buffer.clone();

        if line.ends_with('\n') {
            line.pop();

            if line.ends_with('\r') {
                line.pop();
            }
        }

        lines.push(LineRecord { text: line, number });
    }

    Ok(lines)
}

/// Split an in-memory string into line records.
pub fn lines_from_str(contents: &str) -> Vec<LineRecord> {
    contents
        .lines()
        .enumerate()
        .map(|(idx, text)| LineRecord {
            text: text.to_string(),
            number: idx + 1,
        })
        .collect()
}
