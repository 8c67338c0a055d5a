//! Throughput microbenchmark: drives a handful of episodes end to end with
//! random actions and reports steps/sec. Useful for catching accidental
//! per-step allocations or O(n^2) regressions without pulling in a full
//! training harness.

use drone_arena_core::config::EngineConfig;
use drone_arena_core::env::Env;
use drone_arena_core::math::RandState;
use std::time::Instant;

const NUM_DRONES: usize = 4;
const NUM_EPISODES: u32 = 20;
const MAX_STEPS_PER_EPISODE: u32 = 2000;

fn main() {
    env_logger::init();

    let mut env = Env::new(NUM_DRONES, NUM_DRONES, false, 1, EngineConfig::default())
        .expect("valid drone/agent counts");
    let mut rng = RandState::new(1);

    let map_obs_len = env.map_obs_len();
    let scalar_obs_len = env.scalar_obs_len();
    let mut map_obs = vec![0u8; NUM_DRONES * map_obs_len];
    let mut scalar_obs = vec![0.0f32; NUM_DRONES * scalar_obs_len];
    let mut rewards = vec![0.0f32; NUM_DRONES];
    let mut terminals = vec![0u8; NUM_DRONES];
    let mut truncations = vec![0u8; NUM_DRONES];
    let mut cont_actions = vec![0.0f32; NUM_DRONES * drone_arena_core::constants::CONTINUOUS_ACTION_SIZE];

    let mut total_steps: u64 = 0;
    let start = Instant::now();

    for episode in 0..NUM_EPISODES {
        env.reset();
        for _ in 0..MAX_STEPS_PER_EPISODE {
            for v in cont_actions.iter_mut() {
                *v = rng.range_f32(-1.0, 1.0);
            }
            env.step(
                Some(&cont_actions),
                None,
                &mut map_obs,
                &mut scalar_obs,
                &mut rewards,
                &mut terminals,
                &mut truncations,
            )
            .expect("buffers sized correctly");
            total_steps += 1;
            if env.terminated() {
                break;
            }
        }
        log::info!("episode {episode} done, total_steps={total_steps}");
    }

    let elapsed = start.elapsed();
    let steps_per_sec = total_steps as f64 / elapsed.as_secs_f64();
    println!("{total_steps} steps in {elapsed:?} ({steps_per_sec:.0} steps/sec)");
}
