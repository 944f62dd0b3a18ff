/// Whether a character survives input cleaning: space, tab, printable ASCII,
/// or anything outside ASCII (so CJK and other scripts pass through).
fn is_kept(c: char) -> bool {
    c == ' ' || c == '\t' || (' '..='~').contains(&c) || u32::from(c) > 127
}

/// Normalizes a raw terminal line.
///
/// Control characters are dropped and whitespace runs collapse to a single
/// space. An empty result means the line carried nothing worth sending.
pub fn clean(raw: &str) -> String {
    let kept: String = raw.trim().chars().filter(|&c| is_kept(c)).collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}
