//! Layout of the feature vector
//!
//! Twelve base entries describe one candidate move; ten derived entries
//! follow them. All base entries lie in `[0, 1]`.

/// Longest safe path length (two-phase search), normalised.
pub const SAFE_PATH_LENGTH: usize = 0;
/// Number of safe branches at the counting depth, normalised.
pub const SAFE_PATH_COUNT: usize = 1;
pub const JUNCTION_DISTANCE: usize = 2;
/// Fraction of nodes up to the next junction that still carry a pill.
pub const PILL_DENSITY: usize = 3;
pub const PILL_DISTANCE: usize = 4;
pub const POWER_PILL_DISTANCE: usize = 5;
pub const THREAT_DISTANCE: usize = 6;
pub const VULNERABLE_DISTANCE: usize = 7;
pub const VULNERABILITY_TIME: usize = 8;
pub const COMPLETABLE: usize = 9;
pub const REVERSAL: usize = 10;
pub const PILLS_REMAINING: usize = 11;

pub const BASE_DIM: usize = 12;
pub const EXTENDED_DIM: usize = 10;
pub const FEATURE_DIM: usize = BASE_DIM + EXTENDED_DIM;

/// Human-readable names, indexed like the full feature vector.
pub const FEATURE_NAMES: [&str; FEATURE_DIM] = [
    "safe_path_length",
    "safe_path_count",
    "junction_distance",
    "pill_density",
    "pill_distance",
    "power_pill_distance",
    "threat_distance",
    "vulnerable_distance",
    "vulnerability_time",
    "completable",
    "reversal",
    "pills_remaining",
    "safe_path_length_sq",
    "threat_distance_sq",
    "hunt_progress",
    "safety_past_junction",
    "danger",
    "eat_progress",
    "threat_minus_power_pill",
    "safety_minus_pill",
    "safety_minus_threat",
    "safety_minus_vulnerable",
];

/// Derived entries computed from a base vector.
pub(crate) fn derived(f: &[f64]) -> [f64; EXTENDED_DIM] {
    [
        f[SAFE_PATH_LENGTH] * f[SAFE_PATH_LENGTH],
        f[THREAT_DISTANCE] * f[THREAT_DISTANCE],
        (1.0 - f[VULNERABLE_DISTANCE]) * f[VULNERABILITY_TIME],
        f[SAFE_PATH_LENGTH] - f[JUNCTION_DISTANCE],
        f[THREAT_DISTANCE] - f[JUNCTION_DISTANCE],
        f[PILLS_REMAINING] - f[PILL_DENSITY],
        f[THREAT_DISTANCE] - f[POWER_PILL_DISTANCE],
        f[SAFE_PATH_LENGTH] - f[PILL_DISTANCE],
        f[SAFE_PATH_LENGTH] - f[THREAT_DISTANCE],
        f[SAFE_PATH_LENGTH] - f[VULNERABLE_DISTANCE],
    ]
}
