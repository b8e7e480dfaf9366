use std::io;

use futures_util::StreamExt;
use tracing::debug;

use crate::{ByteSink, ByteStream, WriteStatus};

/// Whether the network source is currently being pulled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Flowing,
    /// The sink reported saturation; nothing is pulled until it drains
    Suspended,
}

/// What a completed pump moved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowStats {
    pub bytes: u64,
    /// Number of flowing -> suspended transitions
    pub suspensions: u32,
}

/// Which side of the pump failed
#[derive(Debug)]
pub enum PumpError {
    Source(io::Error),
    Sink(io::Error),
}

/// Move every chunk of `source` into `sink` without overrunning it.
///
/// A `Saturated` write suspends the source: the next chunk is not pulled
/// until the sink drains. Since end of stream can only be observed by a
/// pull, a transfer that ends on a saturating write still waits for the
/// drain before returning. The sink is left open.
pub async fn pump<S>(source: &mut ByteStream, sink: &mut S) -> Result<FlowStats, PumpError>
where
    S: ByteSink + ?Sized,
{
    let mut state = FlowState::Flowing;
    let mut stats = FlowStats::default();

    loop {
        if state == FlowState::Suspended {
            sink.drained().await.map_err(PumpError::Sink)?;
            debug!("Sink drained after {} bytes, resuming source", stats.bytes);
            state = FlowState::Flowing;
        }

        match source.next().await {
            Some(Ok(chunk)) => {
                if chunk.is_empty() {
                    continue;
                }
                stats.bytes += chunk.len() as u64;
                if sink.write(chunk).map_err(PumpError::Sink)? == WriteStatus::Saturated {
                    debug!("Sink saturated at {} bytes, suspending source", stats.bytes);
                    stats.suspensions += 1;
                    state = FlowState::Suspended;
                }
            }
            Some(Err(e)) => return Err(PumpError::Source(e)),
            None => break,
        }
    }

    debug!("Source exhausted after {} bytes ({} suspensions)", stats.bytes, stats.suspensions);
    Ok(stats)
}
