/// Parse a listen port, accepting both `8080` and the `:8080` form.
pub fn parse_port(value: &str) -> Result<u16, String> {
    let trimmed = value.trim();
    let digits = trimmed.strip_prefix(':').unwrap_or(trimmed);

    digits
        .parse::<u16>()
        .map_err(|_| format!("invalid port '{value}'"))
}
