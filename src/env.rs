//! Env Facade (§6): the single entry point external callers — training
//! harnesses, the renderer, human input, or a scripted-bot policy — drive.
//! Owns the live episode's physics world, entity store and bookkeeping;
//! everything past construction follows §7's fatal/recoverable/logged split
//! rather than `EnvError`.

use crate::config::EngineConfig;
use crate::constants::*;
use crate::entities::log::{LogBuffer, LogEntry};
use crate::entities::{Drone, EntityRef, EntityStore, ProjectileId, Shield, WeaponPickup};
use crate::error::EnvError;
use crate::map::{category, Map};
use crate::mapbank;
use crate::math::{RandState, Vec2};
use crate::observation::{self, ObsContext};
use crate::physics::native::NativeWorld;
use crate::physics::{BodyDef, BodyKind, PhysicsWorld, Shape, ShapeDef, ShapeFilter};
use crate::reward;
use crate::spawner::{self, SpawnKind, SpawnerState};
use crate::step::{self, DroneAction};
use crate::sudden_death::SuddenDeathState;
use crate::weapons;

/// One live episode. `num_drones` bodies occupy the arena; the first
/// `num_agents` of them are externally controlled each `step`, the rest
/// (if any) sit idle — the core has no bot policy of its own (§1 Non-goals).
pub struct Env {
    world: NativeWorld,
    store: EntityStore,
    map: Map,
    rng: RandState,
    seed: u64,
    spawner_state: SpawnerState,
    sudden_death_state: SuddenDeathState,
    log_buffer: LogBuffer,
    config: EngineConfig,

    num_drones: usize,
    num_agents: usize,
    discrete_actions: bool,

    steps_left: u32,
    elapsed_steps: u32,
    exploding_queue: Vec<ProjectileId>,
    round_over: bool,
    truncated: bool,
}

impl Env {
    /// `num_drones` must be in `2..=MAX_DRONES`; `num_agents` in
    /// `1..=num_drones`. Construction is the only place this type returns
    /// `Result` — everything past it is infallible by the time it runs.
    pub fn new(
        num_drones: usize,
        num_agents: usize,
        discrete_actions: bool,
        seed: u64,
        config: EngineConfig,
    ) -> Result<Self, EnvError> {
        if !(2..=MAX_DRONES).contains(&num_drones) {
            return Err(EnvError::InvalidDroneCount(num_drones));
        }
        if num_agents == 0 || num_agents > num_drones {
            return Err(EnvError::InvalidAgentCount {
                num_agents,
                num_drones,
            });
        }

        let mut world = NativeWorld::new();
        let mut store = EntityStore::new(0, 0);
        let map = Map::load(mapbank::built_in_maps().remove(0), CELL_SIZE, &mut world, &mut store);

        let mut env = Env {
            world,
            store,
            map,
            rng: RandState::new(seed),
            seed,
            spawner_state: SpawnerState::default(),
            sudden_death_state: SuddenDeathState::new(),
            log_buffer: LogBuffer::new(LOG_BUFFER_CAPACITY),
            config,
            num_drones,
            num_agents,
            discrete_actions,
            steps_left: SUDDEN_DEATH_INITIAL_STEPS as u32,
            elapsed_steps: 0,
            exploding_queue: Vec::new(),
            round_over: false,
            truncated: false,
        };
        env.reset();
        Ok(env)
    }

    /// Total length of the per-agent scalar observation vector.
    pub fn scalar_obs_len(&self) -> usize {
        observation::scalar_len(self.num_drones)
    }

    pub fn map_obs_len(&self) -> usize {
        MAP_OBS_SIZE
    }

    pub fn num_drones(&self) -> usize {
        self.num_drones
    }

    pub fn num_agents(&self) -> usize {
        self.num_agents
    }

    pub fn terminated(&self) -> bool {
        self.round_over
    }

    /// Tears the episode's world down; buffers borrowed by the last `step`
    /// call are the caller's own, nothing further to release here.
    pub fn destroy(self) {}
}

// --- Episode lifecycle -------------------------------------------------

impl Env {
    /// Tears down and rebuilds the whole live world: fresh map pick, fresh
    /// drones/pickups/floating walls, fresh bookkeeping. Called once by
    /// `new` and again whenever the caller starts a new episode.
    pub fn reset(&mut self) {
        self.rng = RandState::new(self.seed);
        let mut maps = mapbank::built_in_maps();
        let map_idx = self.rng.range_usize(0, maps.len() - 1);
        let def = maps.swap_remove(map_idx);

        self.world = NativeWorld::new();
        self.store = EntityStore::new(0, 0);
        self.map = Map::load(def, CELL_SIZE, &mut self.world, &mut self.store);
        self.spawner_state = SpawnerState::default();
        self.sudden_death_state = SuddenDeathState::new();
        self.exploding_queue.clear();
        self.steps_left = self.config.sudden_death_initial_steps as u32;
        self.elapsed_steps = 0;
        self.round_over = false;
        self.truncated = false;

        self.spawn_drones();
        self.spawn_floating_walls();
        self.spawn_pickups();
    }

    fn spawn_drones(&mut self) {
        let default_weapon = self.map.def.default_weapon;
        for idx in 0..self.num_drones {
            let pos = spawner::find_open_pos(&mut self.rng, &self.map, &self.store, &self.world, SpawnKind::Drone, Some(idx))
                .or_else(|| spawner::find_open_pos(&mut self.rng, &self.map, &self.store, &self.world, SpawnKind::Drone, None))
                .unwrap_or(Vec2::new(
                    (idx as f32 + 0.5) * CELL_SIZE,
                    0.5 * CELL_SIZE,
                ));

            let body = self.world.create_body(BodyDef {
                kind: BodyKind::Dynamic,
                position: pos,
                linear_damping: self.config.drone_linear_damping,
                can_sleep: false,
                ..Default::default()
            });
            let shape = self.world.create_shape(
                body,
                ShapeDef {
                    shape: Shape::Circle { radius: DRONE_RADIUS },
                    filter: ShapeFilter::new(
                        category::DRONE,
                        category::WALL | category::FLOATING_WALL | category::PROJECTILE | category::DRONE | category::PICKUP,
                    ),
                    enable_contact_events: true,
                    ..Default::default()
                },
            );

            let shield = Some(self.create_shield(pos));

            let drone_idx = self.store.drones.len();
            self.store.drones.push(Drone {
                body,
                shape,
                idx: drone_idx,
                team: drone_idx as u8,
                weapon: default_weapon,
                ammo: weapons::weapon_ammo(default_weapon, default_weapon),
                weapon_cooldown: 0.0,
                weapon_charge: 0.0,
                heat: 0,
                pos,
                last_pos: pos,
                initial_pos: pos,
                velocity: Vec2::ZERO,
                last_velocity: Vec2::ZERO,
                last_move: Vec2::ZERO,
                last_aim: Vec2::new(0.0, -1.0),
                energy_left: self.config.drone_energy_max,
                burst_charge: 0.0,
                burst_cooldown: 0.0,
                energy_refill_wait: 0.0,
                energy_fully_depleted: false,
                energy_fully_depleted_this_step: false,
                charging_weapon: false,
                charging_burst: false,
                braking: false,
                shot_this_step: false,
                dead: false,
                died_this_step: false,
                shield,
                step_info: Default::default(),
                stats: Default::default(),
                in_line_of_sight: [false; MAX_DRONES],
            });

            let shield_ids = self.store.drones[drone_idx]
                .shield
                .as_ref()
                .map(|s| (s.body, s.buffer_shape));
            self.store.register_body(body, EntityRef::Drone(drone_idx));
            self.store.register_shape(shape, EntityRef::Drone(drone_idx));
            if let Some((shield_body, shield_shape)) = shield_ids {
                self.store.register_body(shield_body, EntityRef::Drone(drone_idx));
                self.store.register_shape(shield_shape, EntityRef::Drone(drone_idx));
            }
        }
    }

    /// A fresh shield rides along with every drone from the moment it
    /// spawns (§3 "Shield created at drone creation with a start duration").
    fn create_shield(&mut self, pos: Vec2) -> Shield {
        let body = self.world.create_body(BodyDef {
            kind: BodyKind::Kinematic,
            position: pos,
            ..Default::default()
        });
        let buffer_shape = self.world.create_shape(
            body,
            ShapeDef {
                shape: Shape::Circle { radius: SHIELD_RADIUS },
                filter: ShapeFilter::new(category::SHIELD, category::PROJECTILE),
                enable_contact_events: true,
                ..Default::default()
            },
        );
        Shield {
            body,
            buffer_shape,
            pos,
            health: self.config.shield_start_health,
            duration: self.config.shield_start_duration,
        }
    }

    fn spawn_floating_walls(&mut self) {
        use crate::entities::{Wall, WallKind};

        let counts = [
            (WallKind::Standard, self.map.def.floating_standard_walls),
            (WallKind::Bouncy, self.map.def.floating_bouncy_walls),
            (WallKind::Death, self.map.def.floating_death_walls),
        ];
        for (kind, count) in counts {
            for _ in 0..count {
                let Some(pos) = spawner::find_open_pos(&mut self.rng, &self.map, &self.store, &self.world, SpawnKind::Wall, None) else {
                    continue;
                };
                let half_extent = Vec2::new(self.map.cell_size / 2.0, self.map.cell_size / 2.0);
                let body = self.world.create_body(BodyDef {
                    kind: BodyKind::Dynamic,
                    position: pos,
                    ..Default::default()
                });
                let shape = self.world.create_shape(
                    body,
                    ShapeDef {
                        shape: Shape::Box { half_extent },
                        filter: ShapeFilter::new(category::FLOATING_WALL, u32::MAX),
                        restitution: if kind == WallKind::Bouncy { 1.0 } else { 0.0 },
                        enable_contact_events: true,
                        ..Default::default()
                    },
                );
                let Some((row, col)) = self.map.cell_of(pos) else { continue };
                let cell_idx = self.store.cell_index(row, col);
                let wall_idx = self.store.walls.len();
                self.store.walls.push(Wall {
                    kind,
                    body,
                    shape,
                    pos,
                    extent: half_extent,
                    cell_idx,
                    floating: true,
                    sudden_death: false,
                    rot: 0.0,
                    velocity: Vec2::ZERO,
                });
                self.store.register_body(body, EntityRef::Wall(wall_idx));
                self.store.register_shape(shape, EntityRef::Wall(wall_idx));
                self.store.set_cell_occupant(cell_idx, Some(EntityRef::Wall(wall_idx)));
            }
        }
    }

    fn spawn_pickups(&mut self) {
        let default_weapon = self.map.def.default_weapon;
        for _ in 0..self.map.def.weapon_pickups {
            let Some(pos) = spawner::find_open_pos(&mut self.rng, &self.map, &self.store, &self.world, SpawnKind::Pickup, None) else {
                continue;
            };
            let weapon = spawner::rand_weapon_pickup_type(&mut self.rng, &self.spawner_state, default_weapon);
            self.spawner_state.on_pickup_spawned(weapon);
            let (body, shape) = spawner::spawn_pickup_shape(&mut self.world, pos);
            let Some((row, col)) = self.map.cell_of(pos) else { continue };
            let cell_idx = self.store.cell_index(row, col);
            let pickup_idx = self.store.pickups.len();
            self.store.pickups.push(WeaponPickup {
                body: Some(body),
                shape: Some(shape),
                pos,
                cell_idx,
                weapon,
                respawn_wait: 0.0,
                floating_walls_touching: 0,
                body_destroyed: false,
            });
            self.store.register_body(body, EntityRef::Pickup(pickup_idx));
            self.store.register_shape(shape, EntityRef::Pickup(pickup_idx));
            self.store.set_cell_occupant(cell_idx, Some(EntityRef::Pickup(pickup_idx)));
        }
    }
}

// --- Stepping ------------------------------------------------------------

impl Env {
    /// Runs `frameskip` substeps, decoding `cont_actions`/`disc_actions`
    /// (exactly one of which must carry data, per `discrete_actions`) for
    /// the first `num_agents` drones. Writes `scalar_obs`/`map_obs`,
    /// `rewards`, `terminals` and `truncations` — all sized for
    /// `num_agents` (scalar/map observations: `num_agents * {scalar,map}_obs_len()`
    /// contiguous blocks). Returns `Err` only if a buffer is undersized.
    #[allow(clippy::too_many_arguments)]
    pub fn step(
        &mut self,
        cont_actions: Option<&[f32]>,
        disc_actions: Option<&[i32]>,
        map_obs: &mut [u8],
        scalar_obs: &mut [f32],
        rewards: &mut [f32],
        terminals: &mut [u8],
        truncations: &mut [u8],
    ) -> Result<(), EnvError> {
        let scalar_len = self.scalar_obs_len();
        let map_len = self.map_obs_len();
        self.check_buffer(map_obs.len(), self.num_agents * map_len)?;
        self.check_buffer(scalar_obs.len(), self.num_agents * scalar_len)?;
        self.check_buffer(rewards.len(), self.num_drones)?;
        self.check_buffer(terminals.len(), self.num_agents)?;
        self.check_buffer(truncations.len(), self.num_agents)?;

        let actions = self.decode_actions(cont_actions, disc_actions);
        let default_weapon = self.map.def.default_weapon;
        let single_agent_timeout = self.num_agents == 1;

        for _ in 0..self.config.frameskip {
            let report = step::run_substep(
                &mut self.store,
                &mut self.world,
                &self.map,
                &mut self.rng,
                &mut self.spawner_state,
                &mut self.sudden_death_state,
                &mut self.exploding_queue,
                default_weapon,
                &actions,
                &mut self.steps_left,
                single_agent_timeout,
            );
            reward::accumulate_rewards(&mut self.store, default_weapon, report.winner, rewards);
            self.elapsed_steps += 1;
            if report.round_over {
                self.round_over = true;
                self.truncated = report.truncated;
                break;
            }
        }

        for agent_idx in 0..self.num_agents {
            let ctx = ObsContext {
                store: &self.store,
                map: &self.map,
                agent_idx,
                steps_left_frac: self.steps_left as f32 / self.config.sudden_death_initial_steps.max(1) as f32,
            };
            let map_slice = &mut map_obs[agent_idx * map_len..(agent_idx + 1) * map_len];
            let scalar_slice = &mut scalar_obs[agent_idx * scalar_len..(agent_idx + 1) * scalar_len];
            observation::compute_obs(&ctx, map_slice, scalar_slice);

            terminals[agent_idx] = if self.round_over && !self.truncated { 1 } else { 0 };
            truncations[agent_idx] = if self.truncated { 1 } else { 0 };
        }

        if self.round_over {
            self.log_buffer.push(self.build_log_entry());
        }

        Ok(())
    }

    fn check_buffer(&self, actual: usize, expected: usize) -> Result<(), EnvError> {
        if actual < expected {
            Err(EnvError::BufferTooSmall { expected, actual })
        } else {
            Ok(())
        }
    }

    /// Decodes every agent-controlled drone's action; drones beyond
    /// `num_agents` get the zero action (no scripted-bot policy, §1).
    fn decode_actions(&self, cont_actions: Option<&[f32]>, disc_actions: Option<&[i32]>) -> Vec<DroneAction> {
        let mut actions = vec![DroneAction::default(); self.num_drones];
        if self.discrete_actions {
            if let Some(raw) = disc_actions {
                for agent_idx in 0..self.num_agents {
                    let start = agent_idx * DISCRETE_ACTION_SIZE;
                    if start + DISCRETE_ACTION_SIZE <= raw.len() {
                        actions[agent_idx] = step::decode_discrete(&raw[start..start + DISCRETE_ACTION_SIZE]);
                    }
                }
            }
        } else if let Some(raw) = cont_actions {
            for agent_idx in 0..self.num_agents {
                let start = agent_idx * CONTINUOUS_ACTION_SIZE;
                if start + CONTINUOUS_ACTION_SIZE <= raw.len() {
                    actions[agent_idx] = step::decode_continuous(&raw[start..start + CONTINUOUS_ACTION_SIZE]);
                }
            }
        }
        actions
    }

    fn build_log_entry(&self) -> LogEntry {
        let mut entry = LogEntry {
            length: self.elapsed_steps as f32,
            stats: Default::default(),
        };
        for (i, drone) in self.store.drones.iter().enumerate() {
            if i >= MAX_DRONES {
                break;
            }
            entry.stats[i] = drone.stats.clone();
        }
        entry
    }

    pub fn log_buffer(&self) -> &LogBuffer {
        &self.log_buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_env(num_drones: usize, num_agents: usize) -> Env {
        Env::new(num_drones, num_agents, false, 42, EngineConfig::default()).unwrap()
    }

    #[test]
    fn rejects_out_of_range_drone_count() {
        let err = Env::new(1, 1, false, 0, EngineConfig::default()).unwrap_err();
        assert!(matches!(err, EnvError::InvalidDroneCount(1)));
        let err = Env::new(5, 1, false, 0, EngineConfig::default()).unwrap_err();
        assert!(matches!(err, EnvError::InvalidDroneCount(5)));
    }

    #[test]
    fn rejects_agent_count_above_drone_count() {
        let err = Env::new(2, 3, false, 0, EngineConfig::default()).unwrap_err();
        assert!(matches!(err, EnvError::InvalidAgentCount { .. }));
    }

    #[test]
    fn construction_spawns_every_drone_alive() {
        let env = default_env(3, 2);
        assert_eq!(env.store.drones.len(), 3);
        assert!(env.store.drones.iter().all(|d| !d.dead));
        assert!(env.store.drones.iter().all(|d| d.shield.is_some()));
    }

    #[test]
    fn zero_action_step_fills_observation_and_reward_buffers() {
        let mut env = default_env(2, 2);
        let map_len = env.map_obs_len();
        let scalar_len = env.scalar_obs_len();
        let mut map_obs = vec![0u8; 2 * map_len];
        let mut scalar_obs = vec![0f32; 2 * scalar_len];
        let mut rewards = vec![0f32; 2];
        let mut terminals = vec![0u8; 2];
        let mut truncations = vec![0u8; 2];
        let cont = vec![0f32; 2 * CONTINUOUS_ACTION_SIZE];

        env.step(Some(&cont), None, &mut map_obs, &mut scalar_obs, &mut rewards, &mut terminals, &mut truncations)
            .unwrap();

        assert_eq!(terminals, vec![0, 0]);
    }

    #[test]
    fn undersized_buffer_is_rejected() {
        let mut env = default_env(2, 2);
        let mut map_obs = vec![0u8; 1];
        let mut scalar_obs = vec![0f32; env.scalar_obs_len() * 2];
        let mut rewards = vec![0f32; 2];
        let mut terminals = vec![0u8; 2];
        let mut truncations = vec![0u8; 2];
        let err = env
            .step(None, None, &mut map_obs, &mut scalar_obs, &mut rewards, &mut terminals, &mut truncations)
            .unwrap_err();
        assert!(matches!(err, EnvError::BufferTooSmall { .. }));
    }

    #[test]
    fn reset_rebuilds_a_full_roster() {
        let mut env = default_env(4, 4);
        env.reset();
        assert_eq!(env.store.drones.len(), 4);
        assert!(!env.round_over);
    }
}
