use factura_core::EngineConfig;

use crate::types::{Line, WordToken};

/// Group word tokens into horizontal text lines by vertical proximity.
///
/// Tokens are taken in input order; each attaches to the first existing
/// cluster whose key lies within `line_tolerance_px` of the token's y,
/// otherwise a new cluster opens keyed at that y. This approximates rows
/// without assuming a fixed row height. Clusters come back in ascending
/// vertical order, tokens within a line in ascending horizontal order, so
/// identical input always yields identical output.
pub fn cluster_lines(tokens: &[WordToken], cfg: &EngineConfig) -> Vec<Line> {
    let mut clusters: Vec<Line> = Vec::new();

    for token in tokens {
        let word = token.text.trim();
        if word.is_empty() || token.confidence < cfg.min_confidence {
            continue;
        }
        let mut token = token.clone();
        token.text = word.to_string();

        match clusters
            .iter_mut()
            .find(|c| (c.y - token.y).abs() <= cfg.line_tolerance_px)
        {
            Some(cluster) => cluster.tokens.push(token),
            None => clusters.push(Line { y: token.y, tokens: vec![token] }),
        }
    }

    clusters.sort_by_key(|c| c.y);
    for cluster in &mut clusters {
        cluster.tokens.sort_by_key(|t| t.x);
    }
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(text: &str, x: i32, y: i32, confidence: i32) -> WordToken {
        WordToken { text: text.to_string(), x, y, width: 10, height: 10, confidence }
    }

    #[test]
    fn tokens_within_tolerance_share_a_line() {
        let tokens = vec![tok("Teeth", 10, 400, 90), tok("LRPD", 80, 410, 90)];
        let lines = cluster_lines(&tokens, &EngineConfig::default());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text(), "Teeth LRPD");
    }

    #[test]
    fn tokens_beyond_tolerance_open_new_lines() {
        let tokens = vec![tok("Teeth", 10, 400, 90), tok("Total", 10, 430, 90)];
        let lines = cluster_lines(&tokens, &EngineConfig::default());
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn low_confidence_tokens_are_dropped() {
        let tokens = vec![tok("noise", 10, 400, 12), tok("Teeth", 80, 400, 90)];
        let lines = cluster_lines(&tokens, &EngineConfig::default());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text(), "Teeth");
    }

    #[test]
    fn empty_text_tokens_are_dropped() {
        let tokens = vec![tok("  ", 10, 400, 90)];
        assert!(cluster_lines(&tokens, &EngineConfig::default()).is_empty());
    }

    #[test]
    fn lines_sorted_by_y_and_tokens_by_x() {
        let tokens = vec![
            tok("second", 10, 500, 90),
            tok("right", 200, 100, 90),
            tok("left", 10, 105, 90),
        ];
        let lines = cluster_lines(&tokens, &EngineConfig::default());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text(), "left right");
        assert_eq!(lines[1].text(), "second");
    }

    #[test]
    fn tolerance_is_configurable() {
        let mut cfg = EngineConfig::default();
        cfg.line_tolerance_px = 5;
        let tokens = vec![tok("a", 10, 400, 90), tok("b", 80, 410, 90)];
        assert_eq!(cluster_lines(&tokens, &cfg).len(), 2);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let tokens = vec![
            tok("1.00", 10, 400, 90),
            tok("Teeth", 60, 404, 90),
            tok("$45.00", 300, 398, 90),
            tok("Total", 10, 900, 90),
        ];
        let cfg = EngineConfig::default();
        let a: Vec<String> = cluster_lines(&tokens, &cfg).iter().map(Line::text).collect();
        let b: Vec<String> = cluster_lines(&tokens, &cfg).iter().map(Line::text).collect();
        assert_eq!(a, b);
    }
}
