//! The closed set of npc tasks and what each one does per tick

use super::memory::CombatMemory;
use super::policy::HuntPolicy;
use crate::area::Area;
use crate::error::SimulationError;
use crate::game::GameState;
use rand::Rng;
use shared::{Actor, ActorId, NpcType, Vector};
use std::time::Duration;

/// Length of one pacifist idle or wander slice
pub const PACIFIST_SLICE: Duration = Duration::from_secs(5);

/// Patrol waypoints count as reached within this distance
const PATROL_ARRIVAL: f32 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub enum NpcTask {
    /// Does nothing until `until`, forever when `None`
    Idle { until: Option<Duration> },
    /// Walks to random nodes until `until`
    Wander { until: Option<Duration> },
    /// Walks the patrol waypoints back and forth
    Patrol { index: usize, forward: bool },
    Hunt { policy: HuntPolicy },
}

impl NpcTask {
    /// Starting task for an npc of the given temperament
    pub fn initial<R: Rng>(npc_type: NpcType, has_patrol: bool, now: Duration, rng: &mut R) -> Self {
        match npc_type {
            NpcType::Static => NpcTask::Idle { until: None },
            NpcType::Patrol if has_patrol => NpcTask::Patrol {
                index: 0,
                forward: true,
            },
            NpcType::Patrol => NpcTask::Idle { until: None },
            NpcType::Pacifist => pacifist_slice(now, rng),
            NpcType::Aggressive => NpcTask::Hunt {
                policy: HuntPolicy::Aggressive,
            },
            NpcType::Defensive => NpcTask::Hunt {
                policy: HuntPolicy::Defensive,
            },
            NpcType::Protective => NpcTask::Hunt {
                policy: HuntPolicy::Protective,
            },
        }
    }
}

/// Idle or wander for the next slice, picked at random
fn pacifist_slice<R: Rng>(now: Duration, rng: &mut R) -> NpcTask {
    let until = Some(now + PACIFIST_SLICE);
    if rng.gen_bool(0.5) {
        NpcTask::Idle { until }
    } else {
        NpcTask::Wander { until }
    }
}

/// Change a task wants applied to its npc
#[derive(Debug, Clone, PartialEq)]
pub enum NpcAction {
    Nothing,
    MoveTo(Vector),
    Attack(ActorId),
    DropAggro,
}

pub struct TaskContext<'a, R: Rng> {
    pub npc: &'a Actor,
    pub state: &'a GameState,
    pub area: &'a Area,
    pub memory: Option<&'a CombatMemory>,
    pub rng: &'a mut R,
}

impl NpcTask {
    /// Runs one tick of the task. Returns the action to apply and the task
    /// to run next tick.
    pub fn run<R: Rng>(
        self,
        ctx: &mut TaskContext<'_, R>,
    ) -> Result<(NpcAction, NpcTask), SimulationError> {
        let now = ctx.state.time;
        match self {
            NpcTask::Idle { until } => {
                if until.is_some_and(|t| now >= t) {
                    return Ok((NpcAction::Nothing, pacifist_slice(now, ctx.rng)));
                }
                Ok((NpcAction::Nothing, self))
            }
            NpcTask::Wander { until } => {
                if until.is_some_and(|t| now >= t) {
                    return Ok((NpcAction::Nothing, pacifist_slice(now, ctx.rng)));
                }
                Ok((wander(ctx)?, self))
            }
            NpcTask::Patrol { index, forward } => {
                let (action, index, forward) = patrol(ctx.npc, index, forward);
                Ok((action, NpcTask::Patrol { index, forward }))
            }
            NpcTask::Hunt { policy } => Ok((hunt(policy, ctx)?, self)),
        }
    }
}

fn is_busy_moving(npc: &Actor) -> bool {
    npc.movement.is_moving() || npc.movement.move_target.is_some()
}

fn wander<R: Rng>(ctx: &mut TaskContext<'_, R>) -> Result<NpcAction, SimulationError> {
    if is_busy_moving(ctx.npc) {
        return Ok(NpcAction::Nothing);
    }
    let destination = ctx.area.random_position(ctx.rng, None)?;
    Ok(NpcAction::MoveTo(destination))
}

fn patrol(npc: &Actor, index: usize, forward: bool) -> (NpcAction, usize, bool) {
    let Some(waypoints) = npc.as_npc().and_then(|info| info.patrol.as_ref()) else {
        return (NpcAction::Nothing, index, forward);
    };
    if waypoints.is_empty() || is_busy_moving(npc) {
        return (NpcAction::Nothing, index, forward);
    }

    let mut index = index.min(waypoints.len() - 1);
    let mut forward = forward;
    if npc
        .movement
        .coords
        .is_within_distance(waypoints[index], PATROL_ARRIVAL)
    {
        if waypoints.len() == 1 {
            return (NpcAction::Nothing, index, forward);
        }
        if forward && index + 1 >= waypoints.len() {
            forward = false;
        } else if !forward && index == 0 {
            forward = true;
        }
        index = if forward { index + 1 } else { index - 1 };
    }
    (NpcAction::MoveTo(waypoints[index]), index, forward)
}

fn hunt<R: Rng>(policy: HuntPolicy, ctx: &mut TaskContext<'_, R>) -> Result<NpcAction, SimulationError> {
    let npc = ctx.npc;
    let aggro_range = npc.as_npc().map_or(0.0, |info| info.aggro_range);

    if let Some(target_id) = npc.combat.attack_target_id {
        let keep = ctx.state.actor(&target_id).is_some_and(|target| {
            npc.can_target(target)
                && npc.movement.coords.distance(target.movement.coords) <= aggro_range
        });
        return Ok(if keep {
            NpcAction::Nothing
        } else {
            NpcAction::DropAggro
        });
    }

    match policy.find_target(npc, ctx.memory, ctx.state) {
        Some(target_id) => Ok(NpcAction::Attack(target_id)),
        None => wander(ctx),
    }
}
