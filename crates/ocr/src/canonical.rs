use serde::{Deserialize, Serialize};

/// One substring → canonical product identity rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonRule {
    /// Lowercase substring to look for in reconstructed product text.
    pub pattern: String,
    pub product_number: String,
    pub product_name: String,
}

impl CanonRule {
    fn new(pattern: &str, number: &str, name: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            product_number: number.to_string(),
            product_name: name.to_string(),
        }
    }
}

/// Ordered first-match-wins mapping from noisy OCR product text to a
/// canonical `(product_number, product_name)` pair. Text that matches no
/// rule stands for itself.
pub struct Canonicalizer {
    rules: Vec<CanonRule>,
}

impl Canonicalizer {
    pub fn new(rules: Vec<CanonRule>) -> Self {
        Self { rules }
    }

    pub fn from_toml(toml_content: &str) -> Result<Self, toml::de::Error> {
        #[derive(Deserialize)]
        struct RuleFile {
            #[serde(default)]
            rules: Vec<CanonRule>,
        }
        let file: RuleFile = toml::from_str(toml_content)?;
        Ok(Self::new(file.rules))
    }

    /// The product vocabulary of the dental-lab invoices this engine was
    /// built against. Rule order matters: more specific phrases come before
    /// the generic ones they contain.
    pub fn with_defaults() -> Self {
        Self::new(vec![
            CanonRule::new("set of premium teeth", "Set of premium teeth", "Set of premium teeth"),
            CanonRule::new("set up/process", "Set up/Process LRPD", "Set up & process lower RPD to finish"),
            CanonRule::new("set lrpd", "Set LRPD", "Set LRPD for try-in"),
            CanonRule::new("set up lrpd", "Set LRPD", "Set LRPD for try-in"),
            CanonRule::new("set urpd", "Set URPD", "Set URPD for try-in"),
            CanonRule::new("set up urpd", "Set URPD", "Set URPD for try-in"),
            CanonRule::new("set-up fud", "Set-up FUD", "Set-up wax try in of FUD"),
            CanonRule::new("set up fud", "Set-up FUD", "Set-up wax try in of FUD"),
            CanonRule::new("teeth lrpd", "Teeth LRPD", "Teeth LRPD"),
            CanonRule::new("teeth urpd", "Teeth URPD", "Teeth URPD"),
            CanonRule::new("process fud", "Process FUD", "Process FUD to finish"),
            CanonRule::new("process lrpd", "Process LRPD", "Process lower partial to finish"),
            CanonRule::new("process lower partial", "Process LRPD", "Process lower partial to finish"),
            CanonRule::new("framework lrpd", "Framework LRPD", "Lower cast partial framework"),
            CanonRule::new("framework urpd", "Framework URPD", "Upper cast partial framework"),
            CanonRule::new("wax rim lower", "wax rim lower", "Lower wax bite rim"),
            // Frequent OCR misread of "wax rim lower" on these scans.
            CanonRule::new("waxrimiower", "wax rim lower", "Lower wax bite rim"),
            CanonRule::new("waxrimtower", "wax rim lower", "Lower wax bite rim"),
            CanonRule::new("wax bite rim", "Wax bite rim", "Upper wax bite rim"),
            CanonRule::new("id tag", "ID Tag", "ID Tag"),
            CanonRule::new("acrylic urpd", "Acrylic URPD", "Acrylic URPD (5-9 units)"),
        ])
    }

    /// Resolve product text to its canonical identity. Unmatched text is
    /// returned as both number and name.
    pub fn resolve(&self, product_text: &str) -> (String, String) {
        let lower = product_text.to_lowercase();
        for rule in &self.rules {
            if lower.contains(&rule.pattern) {
                return (rule.product_number.clone(), rule.product_name.clone());
            }
        }
        (product_text.to_string(), product_text.to_string())
    }
}
