/// Converts a p value into the conventional significance code.
///
/// | Range       | Code  |
/// |-------------|-------|
/// | < 0.001     | ***   |
/// | < 0.01      | **    |
/// | < 0.05      | *     |
/// | < 0.1       | .     |
/// | otherwise   |       |
pub fn signif_code(p: f64) -> &'static str {
    match p {
        p if p < 0.001 => "***",
        p if p < 0.01 => "**",
        p if p < 0.05 => "*",
        p if p < 0.1 => ".",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signif_boundaries() {
        assert_eq!(signif_code(0.0), "***");
        assert_eq!(signif_code(0.0009), "***");
        assert_eq!(signif_code(0.001), "**");
        assert_eq!(signif_code(0.0099), "**");
        assert_eq!(signif_code(0.01), "*");
        assert_eq!(signif_code(0.049), "*");
        assert_eq!(signif_code(0.05), ".");
        assert_eq!(signif_code(0.099), ".");
        assert_eq!(signif_code(0.1), "");
        assert_eq!(signif_code(1.0), "");
        assert_eq!(signif_code(f64::NAN), "");
    }
}
