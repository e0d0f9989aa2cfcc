use strum::{Display, EnumIter};

/// One step of the training pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    DataIngestion,
    DataValidation,
    DataTransformation,
    ModelTrainer,
    ModelEvaluation,
    ModelPusher,
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_display_matches_artifact_dirs() {
        use config::constants::*;

        let names: Vec<String> = Stage::iter().map(|s| s.to_string()).collect();
        assert_eq!(
            names,
            vec![
                DATA_INGESTION_DIR_NAME,
                DATA_VALIDATION_DIR_NAME,
                DATA_TRANSFORMATION_DIR_NAME,
                MODEL_TRAINER_DIR_NAME,
                MODEL_EVALUATION_DIR_NAME,
                MODEL_PUSHER_DIR_NAME,
            ]
        );
    }
}
