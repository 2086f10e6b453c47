#[cfg(test)]
#[path = "../../tests/transmit.rs"]
mod transmit_test;

use log::{debug, warn};

use crate::assembler::{FrameAssembler, FrameHeaders, FramePath};
use crate::bytes::ByteBuffer;
use crate::crypto::Sealer;
use crate::planner::{PlannerConfig, PLANNER_CONFIG};
use crate::tap::{MonitorSink, MonitorTap};
use crate::DynResult;


/// Hardware queue consuming finished frames.
pub trait Transmitter {
    fn submit(&mut self, frame: ByteBuffer<'_>) -> DynResult<()>;
}


#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TxReport {
    pub monitors_delivered: usize,
    pub monitors_skipped: usize
}


pub struct TxPipeline {
    assembler: FrameAssembler,
    tap: MonitorTap
}

impl TxPipeline {
    pub fn new(config: PlannerConfig, monitor_flags: u8) -> Self {
        TxPipeline {
            assembler: FrameAssembler::new(config),
            tap: MonitorTap::new(config, monitor_flags)
        }
    }

    pub fn from_env(monitor_flags: u8) -> Self {
        Self::new(*PLANNER_CONFIG, monitor_flags)
    }

    /// Assemble `frame`, hand it to `transmitter` and echo it to every monitor.
    ///
    /// A frame that can not be assembled or submitted is dropped and the error returned.
    /// Monitor failures only show up in the report.
    pub fn send<T: Transmitter + ?Sized>(&self, mut frame: ByteBuffer<'_>, path: &FramePath, headers: &FrameHeaders<'_>, sealer: Option<&dyn Sealer>, transmitter: &mut T, monitors: &mut [&mut dyn MonitorSink]) -> DynResult<TxReport> {
        if let Err(err) = self.assembler.assemble(&mut frame, path, headers, sealer) {
            warn!("Dropping frame of {} bytes: {err}", frame.len());
            return Err(err);
        }

        let echo = if monitors.is_empty() { None } else { Some(frame.share()) };
        debug!("Submitting frame of {} bytes", frame.len());
        transmitter.submit(frame)?;

        let mut report = TxReport::default();
        if let Some(original) = echo {
            for sink in monitors.iter_mut() {
                if self.tap.deliver(&original, &mut **sink) {
                    report.monitors_delivered += 1;
                } else {
                    report.monitors_skipped += 1;
                }
            }
        }
        Ok(report)
    }
}
