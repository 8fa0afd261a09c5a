use anyhow::{Context, Result, bail};
use ruinseeker_game::numbers::usize_to_f64;

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Parse a comma-separated seed list. Negative values are folded to their
/// magnitude and hex literals (`0x...`) are accepted.
pub fn parse_seeds(s: &str) -> Result<Vec<u64>> {
    let mut seeds = Vec::new();
    for token in split_csv(s) {
        let seed = if let Some(hex) = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
        {
            u64::from_str_radix(&hex.replace('_', ""), 16)
                .with_context(|| format!("invalid hex seed `{token}`"))?
        } else if let Ok(value) = token.parse::<i64>() {
            value.unsigned_abs()
        } else {
            token
                .parse::<u64>()
                .with_context(|| format!("invalid seed `{token}`"))?
        };
        if !seeds.contains(&seed) {
            seeds.push(seed);
        }
    }
    if seeds.is_empty() {
        bail!("at least one seed is required");
    }
    Ok(seeds)
}

pub fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    usize_to_f64(count) / usize_to_f64(total) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_csv_trims_and_filters() {
        let parts = split_csv(" alpha, ,beta,  gamma ");
        assert_eq!(parts, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn parse_seeds_handles_formats_and_duplicates() {
        let seeds = parse_seeds("1337, -5, 0xFF, 1337").unwrap();
        assert_eq!(seeds, vec![1337, 5, 255]);
    }

    #[test]
    fn parse_seeds_rejects_garbage_and_empty() {
        assert!(parse_seeds("abc").is_err());
        assert!(parse_seeds(" , ").is_err());
    }

    #[test]
    fn percent_guards_zero_total() {
        assert!(percent(3, 0).abs() < f64::EPSILON);
        assert!((percent(1, 4) - 25.0).abs() < f64::EPSILON);
    }
}
