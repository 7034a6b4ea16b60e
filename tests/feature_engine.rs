//! Feature engine properties over positions from real playouts

mod common;

use pursuit::{
    Error,
    features::{
        BASE_DIM, FEATURE_DIM, FeatureExtractor, SafetyAnalyzer, SafetyConfig, extend_features,
        schema,
    },
    maze::{AdversaryState, Direction, Game},
    ports::{MazeQuery, Simulation},
    vector::Vector,
};

#[test]
fn features_stay_in_range_along_a_playout() {
    let extractor = FeatureExtractor::default();
    for game in common::random_positions("classic", 3, 60) {
        let node = game.agent_node();
        for direction in game.possible_directions(node) {
            let full = extractor.features(&game, node, direction).unwrap();
            assert_eq!(full.dimension(), FEATURE_DIM);
            for (i, value) in full.iter().enumerate() {
                let range = if i < BASE_DIM { 0.0..=1.0 } else { -1.0..=1.0 };
                assert!(range.contains(&value), "entry {i} = {value} at tick {}", game.tick());
            }
        }
    }
}

#[test]
fn extended_vector_starts_with_base_vector() {
    let extractor = FeatureExtractor::default();
    for game in common::random_positions("lattice", 11, 30) {
        let node = game.agent_node();
        for direction in game.possible_directions(node) {
            let base = extractor.base_features(&game, node, direction).unwrap();
            let full = extend_features(&base).unwrap();
            assert_eq!(&full.as_slice()[..BASE_DIM], base.as_slice());
            assert_eq!(full, extractor.features(&game, node, direction).unwrap());
        }
    }
}

#[test]
fn features_are_a_pure_function_of_the_position() {
    let extractor = FeatureExtractor::default();
    let positions = common::random_positions("classic", 21, 25);
    let game = positions.last().unwrap();
    let node = game.agent_node();
    for direction in game.possible_directions(node) {
        let a = extractor.features(game, node, direction).unwrap();
        let b = extractor.features(&game.clone(), node, direction).unwrap();
        assert_eq!(a, b);
    }
}

#[test]
fn blocked_directions_are_rejected_everywhere() {
    let extractor = FeatureExtractor::default();
    let game = Game::new(common::maze("classic"), 0);
    for node in 0..game.node_count() {
        let legal = game.possible_directions(node);
        for direction in Direction::MOVES {
            if legal.contains(&direction) {
                continue;
            }
            assert!(matches!(
                extractor.base_features(&game, node, direction),
                Err(Error::InvalidMove { .. })
            ));
        }
    }
}

#[test]
fn heading_into_a_threat_scores_lower_safety() {
    // Threat two cells to the right of the agent on the bottom corridor.
    let maze = common::maze("lattice");
    let agent = maze.node_at(5, 2).unwrap();
    let threat = maze.node_at(5, 4).unwrap();
    let game = Game::new(maze, 0)
        .with_agent(agent, Direction::Neutral)
        .unwrap()
        .with_adversaries(vec![AdversaryState::roaming(threat, Direction::Left)])
        .unwrap();

    let analyzer = SafetyAnalyzer::new(&game, SafetyConfig::default()).unwrap();
    let toward = analyzer.longest_safe_path(agent, Direction::Right).unwrap();
    let away = analyzer.longest_safe_path(agent, Direction::Left).unwrap();
    assert!(toward < away, "toward {toward} away {away}");

    let extractor = FeatureExtractor::default();
    let right = extractor.base_features(&game, agent, Direction::Right).unwrap();
    let left = extractor.base_features(&game, agent, Direction::Left).unwrap();
    assert!(right[schema::THREAT_DISTANCE] < left[schema::THREAT_DISTANCE]);
}

#[test]
fn extend_features_rejects_extended_input() {
    assert!(matches!(
        extend_features(&Vector::zeros(FEATURE_DIM)),
        Err(Error::DimensionMismatch { expected: BASE_DIM, got: FEATURE_DIM })
    ));
}
