/// Split one piece worth of bytes into lines, carrying the unterminated
/// tail in `current`. Relies on the tree never splitting a `\r\n` pair
/// across pieces: a `\r` at the end of a chunk is always a lone break.
pub(crate) fn push_lines(bytes: &[u8], current: &mut Vec<u8>, out: &mut Vec<String>) {
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\r' => {
                current.extend_from_slice(&bytes[start..i]);
                out.push(take_string(current));
                if i + 1 < bytes.len() && bytes[i + 1] == b'\n' {
                    i += 1;
                }
                start = i + 1;
            }
            b'\n' => {
                current.extend_from_slice(&bytes[start..i]);
                out.push(take_string(current));
                start = i + 1;
            }
            _ => {}
        }

        i += 1;
    }

    current.extend_from_slice(&bytes[start..]);
}

/// Strip a single trailing line break, if any.
pub(crate) fn trim_trailing_break(bytes: &[u8]) -> &[u8] {
    match bytes {
        [head @ .., b'\r', b'\n'] => head,
        [head @ .., b'\n'] | [head @ .., b'\r'] => head,
        _ => bytes,
    }
}

pub(crate) fn into_string(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes)
        .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned())
}

fn take_string(bytes: &mut Vec<u8>) -> String {
    into_string(std::mem::take(bytes))
}
