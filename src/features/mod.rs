//! Feature engine
//!
//! Turns a game state plus a candidate move into a fixed-size vector of
//! numbers in `[0, 1]` describing how safe and how rewarding the move is.
//! [`safety`] holds the adversary-reachability searches, [`extractor`]
//! assembles the vector, [`schema`] names its entries.

pub mod extractor;
pub mod safety;
pub mod schema;

pub use extractor::{FeatureExtractor, extend_features, minimum_distance};
pub use safety::{MAX_PATH_LENGTH, SafetyAnalyzer, SafetyConfig, junction_path};
pub use schema::{BASE_DIM, FEATURE_DIM, FEATURE_NAMES};
