// THEORY:
// The frame queue is the one place where the engine meets another thread. A
// network task decodes frames and pushes them in; the single tick loop pulls them
// out at the start of each tick without ever blocking. Everything downstream of
// `drain` is single-threaded and needs no locking.
//
// Two drain policies exist because a slow tick can find several frames waiting:
// - `ProcessAll` replays each frame in arrival order, so nothing the sensor said
//   is lost (an empty frame between two full ones still tears the ring down).
// - `LatestOnly` coalesces to the newest frame and discards the rest. It keeps
//   the tick cheap under bursts, at the price of missing short-lived signals.

use crate::error::FrameQueueError;
use crate::frame::Frame;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrainPolicy {
    #[default]
    ProcessAll,
    LatestOnly,
}

/// Producer half. Deliberately not `Clone`: the queue has exactly one producer.
#[derive(Debug)]
pub struct FrameSender {
    tx: mpsc::UnboundedSender<Frame>,
}

/// Consumer half, owned by the tick loop.
#[derive(Debug)]
pub struct FrameReceiver {
    rx: mpsc::UnboundedReceiver<Frame>,
    closed: bool,
}

pub fn frame_queue() -> (FrameSender, FrameReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (FrameSender { tx }, FrameReceiver { rx, closed: false })
}

impl FrameSender {
    pub fn send(&self, frame: Frame) -> Result<(), FrameQueueError> {
        self.tx.send(frame).map_err(|_| FrameQueueError::Closed)
    }
}

impl FrameReceiver {
    /// Takes every frame currently waiting, without blocking.
    pub fn drain(&mut self, policy: DrainPolicy) -> Vec<Frame> {
        let mut frames = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(frame) => frames.push(frame),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.closed {
                        tracing::info!("frame producer disconnected");
                    }
                    self.closed = true;
                    break;
                }
            }
        }

        match policy {
            DrainPolicy::ProcessAll => frames,
            DrainPolicy::LatestOnly => {
                let skipped = frames.len().saturating_sub(1);
                if skipped > 0 {
                    tracing::debug!(skipped, "coalescing frame burst to the latest frame");
                }
                frames.pop().into_iter().collect()
            }
        }
    }

    /// True once the producer is gone and the queue has been emptied.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with_angle(angle: f32) -> Frame {
        Frame::new(vec![angle], vec![0.0])
    }

    #[test]
    fn process_all_preserves_arrival_order() {
        let (tx, mut rx) = frame_queue();
        for angle in [1.0, 2.0, 3.0] {
            tx.send(frame_with_angle(angle)).expect("queue open");
        }
        let frames = rx.drain(DrainPolicy::ProcessAll);
        let angles: Vec<f32> = frames.iter().map(|f| f.angles[0]).collect();
        assert_eq!(angles, vec![1.0, 2.0, 3.0]);
        assert!(rx.drain(DrainPolicy::ProcessAll).is_empty());
    }

    #[test]
    fn latest_only_keeps_newest() {
        let (tx, mut rx) = frame_queue();
        for angle in [1.0, 2.0, 3.0] {
            tx.send(frame_with_angle(angle)).expect("queue open");
        }
        let frames = rx.drain(DrainPolicy::LatestOnly);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].angles[0], 3.0);
    }

    #[test]
    fn send_after_consumer_dropped_fails() {
        let (tx, rx) = frame_queue();
        drop(rx);
        assert_eq!(tx.send(Frame::empty()), Err(FrameQueueError::Closed));
    }

    #[test]
    fn drain_reports_disconnected_producer() {
        let (tx, mut rx) = frame_queue();
        tx.send(frame_with_angle(7.0)).expect("queue open");
        drop(tx);
        assert_eq!(rx.drain(DrainPolicy::ProcessAll).len(), 1);
        assert!(rx.is_closed());
    }

    #[tokio::test]
    async fn frames_from_a_producer_task_arrive_in_order() {
        let (tx, mut rx) = frame_queue();
        let producer = tokio::spawn(async move {
            for i in 0..50 {
                tx.send(frame_with_angle(i as f32)).expect("queue open");
                tokio::task::yield_now().await;
            }
        });
        producer.await.expect("producer finished");

        let frames = rx.drain(DrainPolicy::ProcessAll);
        assert_eq!(frames.len(), 50);
        assert!(frames.windows(2).all(|w| w[0].angles[0] < w[1].angles[0]));
    }
}
