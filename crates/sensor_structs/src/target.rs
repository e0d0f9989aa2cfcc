//! Mapping between the raw `class` labels and numeric targets.

/// The raw label has no numeric encoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown target label {label:?}")]
pub struct UnknownLabel {
    pub label: String,
}

/// Fixed two-value encoding of the target column: `neg` → 0, `pos` → 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetValueMapping;

impl TargetValueMapping {
    pub const NEG: u8 = 0;
    pub const POS: u8 = 1;

    /// Encodes a raw label.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownLabel`] for anything other than `neg` or `pos`.
    pub fn encode(self, label: &str) -> Result<u8, UnknownLabel> {
        match label.trim() {
            "neg" => Ok(Self::NEG),
            "pos" => Ok(Self::POS),
            other => Err(UnknownLabel {
                label: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_known_labels() {
        let mapping = TargetValueMapping;
        assert_eq!(mapping.encode("neg"), Ok(0));
        assert_eq!(mapping.encode(" pos "), Ok(1));
    }

    #[test]
    fn test_unknown_label_is_rejected() {
        let err = TargetValueMapping.encode("maybe").expect_err("must fail");
        assert_eq!(err.label, "maybe");
    }
}
