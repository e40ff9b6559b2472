pub mod feature_creation_tests;
pub mod pipeline_tests;
pub mod preprocessing_tests;
