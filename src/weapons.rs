//! The weapon-table external collaborator (§6). Read-only per-weapon
//! constants plus the handful of pure functions the spec names
//! (`weaponAmmo`, `weaponCharge`, `weaponFire`, `weaponAdjustAim`,
//! `weaponExplosion`). Grounded on `enum weaponType` in
//! `examples/original_source/src/types.h`.

use crate::math::{RandState, Vec2};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum WeaponKind {
    Standard,
    Machinegun,
    Sniper,
    Shotgun,
    Imploder,
}

impl WeaponKind {
    pub const ALL: [WeaponKind; crate::constants::NUM_WEAPONS] = [
        WeaponKind::Standard,
        WeaponKind::Machinegun,
        WeaponKind::Sniper,
        WeaponKind::Shotgun,
        WeaponKind::Imploder,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Copy, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ExplosionInfo {
    pub radius: f32,
    pub falloff: f32,
    pub impulse_per_length: f32,
}

#[derive(Copy, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct WeaponInfo {
    pub kind: WeaponKind,
    pub is_physics_bullet: bool,
    pub num_projectiles: u8,
    pub recoil_magnitude: f32,
    pub cool_down: f32,
    pub charge: f32,
    pub max_distance: f32,
    pub radius: f32,
    pub density: f32,
    pub inv_mass: f32,
    pub max_bounces: u8,
    pub damping: f32,
    pub can_sleep: bool,
    pub explosive: bool,
    pub proximity_detonates: bool,
    pub destroyed_on_drone_hit: bool,
    pub explodes_on_drone_hit: bool,
    pub spawn_weight: f32,
    pub energy_refill: f32,
    pub explosion: ExplosionInfo,
    pub fire_speed: f32,
}

pub const WEAPON_TABLE: [WeaponInfo; crate::constants::NUM_WEAPONS] = [
    WeaponInfo {
        kind: WeaponKind::Standard,
        is_physics_bullet: true,
        num_projectiles: 1,
        recoil_magnitude: 1.0,
        cool_down: 0.5,
        charge: 0.0,
        max_distance: 30.0,
        radius: 0.12,
        density: 1.0,
        inv_mass: 1.0,
        max_bounces: 2,
        damping: 0.0,
        can_sleep: false,
        explosive: false,
        proximity_detonates: false,
        destroyed_on_drone_hit: true,
        explodes_on_drone_hit: false,
        spawn_weight: 0.0,
        energy_refill: 5.0,
        explosion: ExplosionInfo {
            radius: 0.0,
            falloff: 0.0,
            impulse_per_length: 0.0,
        },
        fire_speed: 25.0,
    },
    WeaponInfo {
        kind: WeaponKind::Machinegun,
        is_physics_bullet: true,
        num_projectiles: 1,
        recoil_magnitude: 0.6,
        cool_down: 0.12,
        charge: 0.0,
        max_distance: 20.0,
        radius: 0.08,
        density: 0.7,
        inv_mass: 1.4,
        max_bounces: 1,
        damping: 0.0,
        can_sleep: false,
        explosive: false,
        proximity_detonates: false,
        destroyed_on_drone_hit: true,
        explodes_on_drone_hit: false,
        spawn_weight: 3.0,
        energy_refill: 2.0,
        explosion: ExplosionInfo {
            radius: 0.0,
            falloff: 0.0,
            impulse_per_length: 0.0,
        },
        fire_speed: 30.0,
    },
    WeaponInfo {
        kind: WeaponKind::Sniper,
        is_physics_bullet: true,
        num_projectiles: 1,
        recoil_magnitude: 3.0,
        cool_down: 1.2,
        charge: 0.6,
        max_distance: 60.0,
        radius: 0.1,
        density: 1.4,
        inv_mass: 0.7,
        max_bounces: 0,
        damping: 0.0,
        can_sleep: false,
        explosive: false,
        proximity_detonates: false,
        destroyed_on_drone_hit: true,
        explodes_on_drone_hit: false,
        spawn_weight: 2.0,
        energy_refill: 10.0,
        explosion: ExplosionInfo {
            radius: 0.0,
            falloff: 0.0,
            impulse_per_length: 0.0,
        },
        fire_speed: 55.0,
    },
    WeaponInfo {
        kind: WeaponKind::Shotgun,
        is_physics_bullet: true,
        num_projectiles: 6,
        recoil_magnitude: 2.5,
        cool_down: 0.9,
        charge: 0.0,
        max_distance: 10.0,
        radius: 0.07,
        density: 0.5,
        inv_mass: 2.0,
        max_bounces: 0,
        damping: 0.0,
        can_sleep: false,
        explosive: false,
        proximity_detonates: false,
        destroyed_on_drone_hit: true,
        explodes_on_drone_hit: false,
        spawn_weight: 2.0,
        energy_refill: 3.0,
        explosion: ExplosionInfo {
            radius: 0.0,
            falloff: 0.0,
            impulse_per_length: 0.0,
        },
        fire_speed: 22.0,
    },
    WeaponInfo {
        kind: WeaponKind::Imploder,
        is_physics_bullet: true,
        num_projectiles: 1,
        recoil_magnitude: 1.5,
        cool_down: 1.5,
        charge: 1.0,
        max_distance: 40.0,
        radius: 0.15,
        density: 1.2,
        inv_mass: 0.8,
        max_bounces: 3,
        damping: 0.0,
        can_sleep: true,
        explosive: true,
        proximity_detonates: true,
        destroyed_on_drone_hit: false,
        explodes_on_drone_hit: true,
        spawn_weight: 1.0,
        energy_refill: 8.0,
        explosion: ExplosionInfo {
            radius: 2.5,
            falloff: 1.25,
            impulse_per_length: 8.0,
        },
        fire_speed: 18.0,
    },
];

pub fn weapon_info(kind: WeaponKind) -> &'static WeaponInfo {
    &WEAPON_TABLE[kind.index()]
}

/// Starting ammo for `kind` given the map's `default` weapon:
/// `ammo == INFINITE` iff `kind == default` (§8 invariant).
pub fn weapon_ammo(default: WeaponKind, kind: WeaponKind) -> i8 {
    if kind == default {
        crate::constants::INFINITE_AMMO
    } else {
        match kind {
            WeaponKind::Machinegun => 40,
            WeaponKind::Sniper => 6,
            WeaponKind::Shotgun => 10,
            WeaponKind::Imploder => 4,
            WeaponKind::Standard => crate::constants::INFINITE_AMMO,
        }
    }
}

pub fn weapon_charge_required(kind: WeaponKind) -> f32 {
    weapon_info(kind).charge
}

/// Muzzle speed of a freshly-fired projectile.
pub fn weapon_fire_speed(rng: &mut RandState, kind: WeaponKind) -> f32 {
    let info = weapon_info(kind);
    info.fire_speed * rng.range_f32(0.95, 1.05)
}

/// Perturbs `aim` based on accumulated `heat`; heat widens the cone.
pub fn weapon_adjust_aim(rng: &mut RandState, kind: WeaponKind, heat: u32, aim: Vec2) -> Vec2 {
    let info = weapon_info(kind);
    if info.kind == WeaponKind::Sniper {
        return aim;
    }
    let spread = (heat as f32 * 0.01).min(0.35);
    if spread <= 0.0 {
        return aim;
    }
    let jitter = rng.range_f32(-spread, spread);
    aim.rotated(jitter)
}

pub fn weapon_explosion(kind: WeaponKind) -> Option<ExplosionInfo> {
    let info = weapon_info(kind);
    if info.explosive {
        Some(info.explosion)
    } else {
        None
    }
}
