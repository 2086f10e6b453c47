#[cfg(test)]
#[path = "../../tests/assembler.rs"]
mod assembler_test;

use log::debug;
use simple_error::bail;

use crate::bytes::{AllocationFailure, ByteBuffer, PacketBuffer};
use crate::crypto::{Sealer, ENCRYPT_HEADROOM};
use crate::planner::{plan_and_grow, PlannerConfig, Requirement, TAIL_MAX};
use crate::DynResult;


/// Every header a frame is going to acquire on its way out, known up front.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramePath {
    pub link_header: usize,
    pub relay_header: usize,
    pub encapsulation: usize,
    pub encrypted: bool,
    pub downstream_reserve: usize
}

impl FramePath {
    /// Saturates, so absurd paths fail in planning instead of wrapping.
    #[inline]
    pub fn header_need(&self) -> usize {
        self.link_header.saturating_add(self.relay_header).saturating_add(self.encapsulation)
    }

    /// Single requirement covering the whole path, so the frame grows at most once.
    pub fn requirement(&self) -> Requirement {
        let encryption = if self.encrypted { ENCRYPT_HEADROOM } else { 0 };
        Requirement::primary(self.header_need(), self.downstream_reserve.saturating_add(encryption), self.encrypted)
    }
}


#[derive(Debug, Clone, Copy, Default)]
pub struct FrameHeaders<'h> {
    pub link: &'h [u8],
    pub relay: Option<&'h [u8]>,
    pub encapsulation: Option<&'h [u8]>
}

impl FrameHeaders<'_> {
    fn check(&self, path: &FramePath) -> DynResult<()> {
        let relay = self.relay.map_or(0, <[u8]>::len);
        let encapsulation = self.encapsulation.map_or(0, <[u8]>::len);
        if self.link.len() != path.link_header || relay != path.relay_header || encapsulation != path.encapsulation {
            bail!("Frame headers ({}, {relay}, {encapsulation}) do not match frame path ({}, {}, {})!", self.link.len(), path.link_header, path.relay_header, path.encapsulation);
        }
        Ok(())
    }
}


pub struct FrameAssembler {
    config: PlannerConfig
}

impl FrameAssembler {
    pub fn new(config: PlannerConfig) -> Self {
        FrameAssembler { config }
    }

    #[inline]
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Reserve room for everything `path` is going to write into `buffer`.
    #[inline]
    pub fn prepare<B: PacketBuffer>(&self, buffer: &mut B, path: &FramePath) -> Result<(), AllocationFailure> {
        plan_and_grow(buffer, &path.requirement(), &self.config)
    }

    /// Plan, seal the payload if the path is encrypted, then prepend encapsulation, relay and
    /// link-layer headers, outermost last.
    ///
    /// Mismatching headers or a missing sealer are rejected before the buffer is touched.
    pub fn assemble(&self, buffer: &mut ByteBuffer<'_>, path: &FramePath, headers: &FrameHeaders<'_>, sealer: Option<&dyn Sealer>) -> DynResult<()> {
        headers.check(path)?;
        let sealer = match (path.encrypted, sealer) {
            (true, Some(res)) if res.headroom() > ENCRYPT_HEADROOM || res.tailroom() > TAIL_MAX => bail!("Sealer overhead ({}, {}) exceeds reserved room!", res.headroom(), res.tailroom()),
            (true, Some(res)) => Some(res),
            (true, None) => bail!("Encrypted frame path requires a sealer!"),
            (false, _) => None
        };

        self.prepare(buffer, path)?;
        debug!("Assembling frame of {} bytes with {} header bytes (headroom {}, tailroom {})", buffer.len(), path.header_need(), buffer.headroom(), buffer.tailroom());

        if let Some(res) = sealer {
            res.seal(buffer)?;
        }
        if let Some(res) = headers.encapsulation {
            buffer.push_front(res)?;
        }
        if let Some(res) = headers.relay {
            buffer.push_front(res)?;
        }
        buffer.push_front(headers.link)?;
        Ok(())
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        FrameAssembler::new(PlannerConfig::default())
    }
}
