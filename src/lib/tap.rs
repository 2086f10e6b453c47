#[cfg(test)]
#[path = "../../tests/tap.rs"]
mod tap_test;

use log::debug;
use simple_error::bail;

use crate::bytes::ByteBuffer;
use crate::planner::{plan_and_grow, PlannerConfig, Requirement};
use crate::DynResult;


pub const MONITOR_HEADER_LEN: usize = 8;
const MONITOR_HEADER_VERSION: u8 = 0;


/// Passive observer receiving copies of transmitted frames.
pub trait MonitorSink {
    fn observe(&mut self, frame: ByteBuffer<'_>);
}


/// Capture framing: version, flags, header length (LE u16) and total frame length (LE u32).
pub fn capture_header(flags: u8, payload_length: usize) -> DynResult<[u8; MONITOR_HEADER_LEN]> {
    let header_length = (MONITOR_HEADER_LEN as u16).to_le_bytes();
    let total_length = match payload_length.checked_add(MONITOR_HEADER_LEN).map(u32::try_from) {
        Some(Ok(res)) => res.to_le_bytes(),
        _ => bail!("Captured frame too long ({payload_length} bytes)!")
    };
    let mut header = [0u8; MONITOR_HEADER_LEN];
    header[0] = MONITOR_HEADER_VERSION;
    header[1] = flags;
    header[2..4].copy_from_slice(&header_length);
    header[4..8].copy_from_slice(&total_length);
    Ok(header)
}


pub struct MonitorTap {
    config: PlannerConfig,
    flags: u8
}

impl MonitorTap {
    pub fn new(config: PlannerConfig, flags: u8) -> Self {
        MonitorTap { config, flags }
    }

    /// Echo `original` to `sink` with capture framing prepended.
    ///
    /// Works on a duplicate handle, the original is never modified. Returns whether the frame
    /// was delivered: if the duplicate can not be made room for, delivery is skipped silently.
    pub fn deliver<S: MonitorSink + ?Sized>(&self, original: &ByteBuffer<'_>, sink: &mut S) -> bool {
        let mut duplicate = original.share();
        if let Err(err) = plan_and_grow(&mut duplicate, &Requirement::MonitorOnly, &self.config) {
            debug!("Skipping monitor delivery of {} bytes: {err}", original.len());
            return false;
        }
        let pushed = capture_header(self.flags, duplicate.len()).and_then(|header| duplicate.push_front(&header));
        if let Err(err) = pushed {
            debug!("Skipping monitor delivery of {} bytes: {err}", original.len());
            return false;
        }
        sink.observe(duplicate);
        true
    }
}
