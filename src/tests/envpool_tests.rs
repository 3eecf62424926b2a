use crate::envpool::{EnvAction, EnvConfig, EnvPool, GomokuEnv};

#[test]
fn default_config_test() {
    let config = EnvConfig::default();
    assert_eq!(config.board_size, 15);
    assert_eq!(config.win_length, 5);
    assert_eq!(config.num_player_planes, 4);
    assert_eq!(config.num_search, 1000);
    assert!(!config.verbose_output);
}

#[test]
fn reset_observation_test() {
    let config = EnvConfig {
        num_search: 50,
        ..EnvConfig::default()
    };
    let mut pool = EnvPool::new(config, 2);
    assert_eq!(pool.num_envs(), 2);

    let observations = pool.reset();
    assert_eq!(observations.len(), 2);
    for (env_id, observation) in observations.iter().enumerate() {
        assert_eq!(observation.env_id, env_id);
        assert_eq!(observation.state.len(), (2 * 4 + 1) * 15 * 15);
        assert!(!observation.is_player_done);
        assert!(!observation.done);
        assert_eq!(observation.winner, -1);
        assert_eq!(observation.player_step_count, 0);
        assert!(observation.mcts_result.iter().all(|&visits| visits == -1));
    }
}

#[test]
fn single_env_small_board_test() {
    let config = EnvConfig {
        board_size: 3,
        win_length: 3,
        num_player_planes: 3,
        num_search: 20_000,
        ..EnvConfig::default()
    };
    let num_search = config.num_search;
    let mut pool = EnvPool::new(config, 1);
    let mut observation = pool.reset().remove(0);

    let mut step_count = 0;
    let mut player_step = 0;
    let mut best_action = 0;
    loop {
        if observation.is_player_done {
            player_step += 1;
            let (action, _) = observation
                .mcts_result
                .iter()
                .enumerate()
                .max_by_key(|&(_, visits)| *visits)
                .unwrap();
            best_action = action;
        }
        if observation.done {
            assert_eq!(player_step, 3 * 3);
            assert_eq!(observation.player_step_count, 3 * 3);
            assert_eq!(observation.winner, -1);
            break;
        }
        let action = EnvAction {
            env_id: 0,
            prior_probs: vec![0.1; 3 * 3],
            value: 0.0,
            selected_action: best_action,
        };
        observation = pool.step(&[action]).remove(0);
        step_count += 1;
    }
    assert!(step_count < num_search * 3 * 3);
}

#[test]
fn single_env_adapter_test() {
    let config = EnvConfig {
        board_size: 5,
        win_length: 4,
        num_player_planes: 2,
        num_search: 100,
        ..EnvConfig::default()
    };
    let mut env = GomokuEnv::new(config, 3);
    assert_eq!(env.env_id(), 3);

    let observation = env.reset();
    assert!(!env.is_done());
    assert!(!observation.is_player_done);
    assert_eq!(observation.state.len(), (2 * 2 + 1) * 5 * 5);

    let action = EnvAction {
        env_id: 3,
        prior_probs: vec![0.1; 5 * 5],
        value: 0.0,
        selected_action: 0,
    };
    let observation = env.step(&action);
    assert!(!observation.done);
    assert_eq!(observation.player_step_count, 0);
}

#[test]
fn multi_env_independent_test() {
    let config = EnvConfig {
        board_size: 3,
        win_length: 3,
        num_player_planes: 2,
        num_search: 100,
        ..EnvConfig::default()
    };
    let mut pool = EnvPool::new(config, 2);
    let observations = pool.reset();
    assert_eq!(observations.len(), 2);

    // Stepping only the second env leaves the first suspended
    for _ in 0..5 {
        let action = EnvAction {
            env_id: 1,
            prior_probs: vec![0.1; 3 * 3],
            value: 0.0,
            selected_action: 0,
        };
        let observations = pool.step(&[action]);
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].env_id, 1);
    }
}
