/// Parse a byte count with an optional `K`, `M` or `G` suffix (powers of 1024).
pub fn parse_size(input: &str) -> Result<usize, String> {
    let trimmed = input.trim();
    let (digits, multiplier) = match trimmed.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() => {
            let multiplier = match c.to_ascii_uppercase() {
                'K' => 1usize << 10,
                'M' => 1 << 20,
                'G' => 1 << 30,
                _ => return Err(format!("unknown size suffix '{c}' in '{input}'")),
            };
            (&trimmed[..i], multiplier)
        }
        _ => (trimmed, 1),
    };

    let value: usize = digits
        .trim()
        .parse()
        .map_err(|_| format!("'{input}' is not a size"))?;
    let bytes = value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("'{input}' is too large"))?;
    if bytes == 0 {
        return Err("size must be positive".to_string());
    }
    Ok(bytes)
}
