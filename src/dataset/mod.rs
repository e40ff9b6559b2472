//! Dataset preparation stages, in pipeline order.
//!
//! * `step_1_candle_source` - candle download and the candle frame
//! * `step_2_class_up` - forward-looking "up" labels
//! * `step_3_feature_creation` - technical indicator columns
//! * `step_4_preprocessing` - missing-row removal, outlier filtering, smoothing and scaling
//! * `step_5_sliding_windows` - fixed-size windows paired with their labels
//! * `step_6_split` - chronological train/validation/test split
//! * `step_7_persistence` - binary archive and JSON output
pub mod pipeline;
pub mod step_1_candle_source;
pub mod step_2_class_up;
pub mod step_3_feature_creation;
pub mod step_4_preprocessing;
pub mod step_5_sliding_windows;
pub mod step_6_split;
pub mod step_7_persistence;
