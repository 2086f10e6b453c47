#[cfg(test)]
#[path = "../../tests/planner.rs"]
mod planner_test;

use std::cmp::max;

use lazy_static::lazy_static;
use log::{debug, trace, warn};
use simple_error::bail;

use crate::bytes::{total_size, AllocationFailure, PacketBuffer, HEADER_OVERHEAD};
use crate::crypto::MAC_LEN;
use crate::tap::MONITOR_HEADER_LEN;
use crate::utils::parse_env;
use crate::DynResult;


/// Trailer room reserved for an authentication tag.
pub const TAIL_MAX: usize = MAC_LEN;

/// Header bytes that must be privately owned before a shared buffer may be grown in place.
pub const LINK_HEADER_LEN: usize = 14;

const DEFAULT_TRANSPORT_HEADROOM: usize = 0;
const DEFAULT_HARDWARE_HEADROOM: usize = 0;
const DEFAULT_MONITOR_HEADROOM: usize = HEADER_OVERHEAD;

lazy_static! {
    pub static ref PLANNER_CONFIG: PlannerConfig = match PlannerConfig::from_env() {
        Ok(res) => res,
        Err(err) => {
            warn!("Invalid planner configuration, falling back to defaults: {err}");
            PlannerConfig::default()
        }
    };
}


/// Fixed headroom floors applied on top of every requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerConfig {
    pub transport_headroom: usize,
    pub hardware_headroom: usize,
    pub monitor_headroom: usize
}

impl PlannerConfig {
    pub fn new(transport_headroom: usize, hardware_headroom: usize, monitor_headroom: usize) -> DynResult<Self> {
        if monitor_headroom < MONITOR_HEADER_LEN {
            bail!("Monitor headroom should fit the capture header ({monitor_headroom} < {MONITOR_HEADER_LEN})!");
        }
        Ok(PlannerConfig { transport_headroom, hardware_headroom, monitor_headroom })
    }

    pub fn from_env() -> DynResult<Self> {
        let transport = parse_env("TXROOM_TRANSPORT_HEADROOM", Some(DEFAULT_TRANSPORT_HEADROOM))?;
        let hardware = parse_env("TXROOM_HARDWARE_HEADROOM", Some(DEFAULT_HARDWARE_HEADROOM))?;
        let monitor = parse_env("TXROOM_MONITOR_HEADROOM", Some(DEFAULT_MONITOR_HEADROOM))?;
        Self::new(transport, hardware, monitor)
    }

    #[inline]
    pub fn floor(&self) -> usize {
        max(self.transport_headroom, self.hardware_headroom)
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            transport_headroom: DEFAULT_TRANSPORT_HEADROOM,
            hardware_headroom: DEFAULT_HARDWARE_HEADROOM,
            monitor_headroom: DEFAULT_MONITOR_HEADROOM
        }
    }
}


/// Space a caller declares before writing headers and trailers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Transmit path: `header_need` is written right away, `header_extra` is reserved for headers
    /// added further down the path, `may_need_tail` asks for an authentication tag trailer.
    Primary {
        header_need: usize,
        header_extra: usize,
        may_need_tail: bool
    },
    /// Duplicate prepared for a passive observer.
    MonitorOnly
}

impl Requirement {
    #[inline]
    pub fn primary(header_need: usize, header_extra: usize, may_need_tail: bool) -> Self {
        Requirement::Primary { header_need, header_extra, may_need_tail }
    }

    /// Room the buffer has to end up with; fails if the headroom sum does not fit in `usize`.
    pub fn targets(&self, config: &PlannerConfig) -> Result<Targets, AllocationFailure> {
        match *self {
            Requirement::Primary { header_need, header_extra, may_need_tail } => Ok(Targets {
                head: total_size(&[header_need, header_extra, config.floor()])?,
                tail: if may_need_tail { TAIL_MAX } else { 0 }
            }),
            Requirement::MonitorOnly => Ok(Targets {
                head: config.monitor_headroom,
                tail: 0
            })
        }
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Targets {
    pub head: usize,
    pub tail: usize
}


/// What [`plan_and_grow`] is going to do with a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    Keep,
    Grow { head: usize, tail: usize },
    Fork { head: usize, tail: usize }
}


#[inline]
fn must_fork<B: PacketBuffer>(buffer: &B, targets: &Targets) -> bool {
    buffer.is_shared() && (!buffer.clone_is_header_writable(LINK_HEADER_LEN) || targets.tail > 0)
}

/// Decide how `buffer` has to change to satisfy `targets`, without touching it.
///
/// `Grow` carries the shortfall to add to the current room, `Fork` the absolute room of the
/// private copy, which never drops below what the buffer already has.
pub fn plan<B: PacketBuffer>(buffer: &B, targets: &Targets) -> Plan {
    let (headroom, tailroom) = (buffer.headroom(), buffer.tailroom());
    if must_fork(buffer, targets) {
        Plan::Fork {
            head: max(targets.head, headroom),
            tail: max(targets.tail, tailroom)
        }
    } else if headroom < targets.head || tailroom < targets.tail {
        Plan::Grow {
            head: targets.head.saturating_sub(headroom),
            tail: targets.tail.saturating_sub(tailroom)
        }
    } else {
        Plan::Keep
    }
}

/// Make sure `buffer` has the room `requirement` asks for.
///
/// Correctly sized private buffers are left alone. Shared buffers that would have to be
/// written outside their own window are replaced by a private copy; the other owners keep the
/// original allocation. On failure the buffer is unchanged.
pub fn plan_and_grow<B: PacketBuffer>(buffer: &mut B, requirement: &Requirement, config: &PlannerConfig) -> Result<(), AllocationFailure> {
    let targets = requirement.targets(config)?;
    match plan(buffer, &targets) {
        Plan::Keep => {
            trace!("Buffer already fits {targets:?} (headroom {}, tailroom {})", buffer.headroom(), buffer.tailroom());
            Ok(())
        },
        Plan::Grow { head, tail } => {
            debug!("Growing buffer by {head} head and {tail} tail bytes to fit {targets:?}");
            buffer.grow_in_place(head, tail)
        },
        Plan::Fork { head, tail } => {
            debug!("Forking shared buffer with {head} head and {tail} tail bytes to fit {targets:?}");
            *buffer = buffer.reallocate(head, tail)?;
            Ok(())
        }
    }
}
