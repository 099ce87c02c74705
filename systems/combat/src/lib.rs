#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Damage rolls and attack gating for hostiles and the player.
//!
//! Nothing here mutates the world: attacks are emitted as
//! [`Command::ResolveHostileAttack`] and [`Command::ResolvePlayerAttack`],
//! and experience is forwarded to an injected [`ExperienceSink`].

use std::time::Duration;

use rand::Rng;
use realmwalk_core::{
    AgentSnapshot, CombatStats, Command, Event, ExperienceSink, PlayerSnapshot, Skill,
};
use serde::{Deserialize, Serialize};

/// Tunables shared by hostile and player attacks.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatTuning {
    /// Probability that a roll is critical.
    pub critical_chance: f32,
    /// Damage multiplier of a critical roll.
    pub critical_multiplier: f32,
    /// Lower bound of the variance multiplier, inclusive.
    pub variance_min: f32,
    /// Upper bound of the variance multiplier, exclusive.
    pub variance_max: f32,
    /// Chebyshev range within which attacks are considered at all.
    pub attack_range: u32,
    /// Cooldown a hostile waits after attacking, in milliseconds.
    pub hostile_cooldown_ms: u64,
    /// Melee reach and cooldown.
    pub melee: StyleTuning,
    /// Ranged reach and cooldown.
    pub ranged: StyleTuning,
    /// Magic reach and cooldown.
    pub magic: StyleTuning,
}

impl CombatTuning {
    /// Cooldown a hostile waits after attacking.
    #[must_use]
    pub fn hostile_cooldown(&self) -> Duration {
        Duration::from_millis(self.hostile_cooldown_ms)
    }

    fn style(&self, style: AttackStyle) -> StyleTuning {
        match style {
            AttackStyle::Melee => self.melee,
            AttackStyle::Ranged => self.ranged,
            AttackStyle::Magic => self.magic,
        }
    }
}

impl Default for CombatTuning {
    fn default() -> Self {
        Self {
            critical_chance: 0.1,
            critical_multiplier: 2.0,
            variance_min: 0.8,
            variance_max: 1.2,
            attack_range: 5,
            hostile_cooldown_ms: 1_000,
            melee: StyleTuning {
                range: 1,
                cooldown_ms: 1_000,
            },
            ranged: StyleTuning {
                range: 5,
                cooldown_ms: 2_000,
            },
            magic: StyleTuning {
                range: 3,
                cooldown_ms: 3_000,
            },
        }
    }
}

/// Reach and cooldown of one player attack style.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleTuning {
    /// Chebyshev range in tiles.
    pub range: u32,
    /// Global cooldown started by the attack, in milliseconds.
    pub cooldown_ms: u64,
}

/// Way the player attacks the targeted hostile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttackStyle {
    /// Adjacent strike scaled by attack and strength.
    Melee,
    /// Projectile scaled by the ranged skill.
    Ranged,
    /// Spell scaled by the magic skill.
    Magic,
}

impl AttackStyle {
    /// First style, in melee, ranged, magic order, that reaches `distance`.
    ///
    /// Ranged and magic are only available once their skill exceeds one.
    #[must_use]
    pub fn select(distance: u32, stats: &CombatStats, tuning: &CombatTuning) -> Option<Self> {
        if distance <= tuning.melee.range {
            Some(Self::Melee)
        } else if distance <= tuning.ranged.range && stats.ranged > 1 {
            Some(Self::Ranged)
        } else if distance <= tuning.magic.range && stats.magic > 1 {
            Some(Self::Magic)
        } else {
            None
        }
    }

    /// Damage before critical and variance multipliers.
    #[must_use]
    pub fn base_damage(self, stats: &CombatStats) -> f32 {
        let base = match self {
            Self::Melee => (stats.attack + stats.strength) / 2,
            Self::Ranged => stats.ranged.saturating_mul(2),
            Self::Magic => stats.magic.saturating_mul(3),
        };
        base as f32
    }
}

/// Outcome of a single damage roll.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DamageRoll {
    /// Damage dealt, never negative.
    pub damage: u32,
    /// Indicates whether the roll was critical.
    pub critical: bool,
}

/// Rolls damage from `base`: critical first, then the variance multiplier.
///
/// An empty variance range applies `variance_min` unchanged.
pub fn roll_damage<R: Rng + ?Sized>(base: f32, rng: &mut R, tuning: &CombatTuning) -> DamageRoll {
    let critical = rng.gen::<f32>() < tuning.critical_chance;
    let multiplier = if critical {
        tuning.critical_multiplier
    } else {
        1.0
    };
    let variance = if tuning.variance_max > tuning.variance_min {
        rng.gen_range(tuning.variance_min..tuning.variance_max)
    } else {
        tuning.variance_min
    };
    let damage = (base.max(0.0) * multiplier * variance).max(0.0) as u32;
    DamageRoll { damage, critical }
}

/// Rolls a hostile's damage against the player's defense.
///
/// Defense reduces damage by one percent per point, so 100 or more
/// negates the hit entirely.
pub fn roll_hostile_damage<R: Rng + ?Sized>(
    attack: u32,
    defense: u32,
    rng: &mut R,
    tuning: &CombatTuning,
) -> DamageRoll {
    let mitigated = attack as f32 * (1.0 - defense as f32 / 100.0);
    roll_damage(mitigated, rng, tuning)
}

/// Reports whether `hostile` may attack the player this tick.
///
/// The hostile must share a row or column with the player, stand within
/// `attack_range`, have its own cooldown elapsed, and the player must be
/// alive and not immune.
#[must_use]
pub fn hostile_can_attack(
    hostile: &AgentSnapshot,
    player: &PlayerSnapshot,
    tuning: &CombatTuning,
) -> bool {
    player.is_vulnerable()
        && hostile.attack_ready_in.is_zero()
        && hostile.tile.is_aligned_with(player.tile)
        && hostile.tile.chebyshev_distance(player.tile) <= tuning.attack_range
}

/// Resolves a hostile attack against the player, if one is possible.
///
/// Defense experience of half the hostile's experience value is awarded
/// whenever an attack is rolled, regardless of the damage.
pub fn hostile_attack<R, X>(
    hostile: &AgentSnapshot,
    player: &PlayerSnapshot,
    rng: &mut R,
    tuning: &CombatTuning,
    experience: &mut X,
) -> Option<Command>
where
    R: Rng + ?Sized,
    X: ExperienceSink + ?Sized,
{
    if !hostile_can_attack(hostile, player, tuning) {
        return None;
    }

    let roll = roll_hostile_damage(hostile.attack, player.stats.defense, rng, tuning);
    experience.add_experience(Skill::Defense, hostile.experience / 2);
    tracing::trace!(
        target: "realmwalk::combat",
        attacker = hostile.id.get(),
        damage = roll.damage,
        critical = roll.critical,
        "hostile attack rolled"
    );

    Some(Command::ResolveHostileAttack {
        attacker: hostile.id,
        damage: roll.damage,
        critical: roll.critical,
        cooldown: tuning.hostile_cooldown(),
    })
}

/// Attacks the player's targeted hostile under a global cooldown.
#[derive(Debug, Default)]
pub struct PlayerCombat {
    tuning: CombatTuning,
    cooldown: Duration,
}

impl PlayerCombat {
    /// Creates the system with the provided tuning.
    #[must_use]
    pub fn new(tuning: CombatTuning) -> Self {
        Self {
            tuning,
            cooldown: Duration::ZERO,
        }
    }

    /// Time left before the player may attack again.
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Counts down the cooldown from `TimeAdvanced` events and attacks the target.
    ///
    /// `target` is the snapshot of the hostile in `player.target`, when it
    /// still exists. A target beyond `attack_range` is cleared instead.
    pub fn handle<R, X>(
        &mut self,
        events: &[Event],
        player: &PlayerSnapshot,
        target: Option<&AgentSnapshot>,
        rng: &mut R,
        experience: &mut X,
        out: &mut Vec<Command>,
    ) where
        R: Rng + ?Sized,
        X: ExperienceSink + ?Sized,
    {
        for event in events {
            if let Event::TimeAdvanced { dt } = event {
                self.cooldown = self.cooldown.saturating_sub(*dt);
            }
        }

        if player.dead {
            return;
        }
        let Some(target) = target.filter(|target| Some(target.id) == player.target) else {
            return;
        };

        let distance = player.tile.chebyshev_distance(target.tile);
        let ready = self.cooldown.is_zero() && !player.is_immune();
        let style = ready
            .then(|| AttackStyle::select(distance, &player.stats, &self.tuning))
            .flatten();

        let Some(style) = style else {
            if distance > self.tuning.attack_range {
                tracing::debug!(
                    target: "realmwalk::combat",
                    agent = target.id.get(),
                    distance,
                    "target out of range"
                );
                out.push(Command::SetPlayerTarget { target: None });
            }
            return;
        };

        let roll = roll_damage(style.base_damage(&player.stats), rng, &self.tuning);
        self.cooldown = Duration::from_millis(self.tuning.style(style).cooldown_ms);

        let reward = target.experience / 2;
        experience.add_experience(Skill::Attack, reward);
        experience.add_experience(Skill::Strength, reward);
        if roll.damage >= target.health.current() {
            experience.add_experience(Skill::Strength, reward);
            experience.add_experience(Skill::Hitpoints, reward);
        }

        tracing::trace!(
            target: "realmwalk::combat",
            agent = target.id.get(),
            ?style,
            damage = roll.damage,
            critical = roll.critical,
            "player attack rolled"
        );
        out.push(Command::ResolvePlayerAttack {
            target: target.id,
            damage: roll.damage,
            critical: roll.critical,
        });
    }
}
