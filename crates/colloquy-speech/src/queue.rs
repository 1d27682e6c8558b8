//! Priority request queue.
//!
//! A pure synchronous structure: three FIFO tiers drained High → Normal →
//! Low. No async, no I/O, no callbacks; the coordinator owns the only
//! instance and performs every side effect itself.

use std::collections::VecDeque;

use colloquy_core::{Priority, RequestId, RequestStatus, SpeechError, TierCounts};

use crate::request::SpeechRequest;

/// Tiered FIFO of requests waiting for the speech capability.
#[derive(Debug)]
pub struct RequestQueue {
    high: VecDeque<SpeechRequest>,
    normal: VecDeque<SpeechRequest>,
    low: VecDeque<SpeechRequest>,
    max_size: u32,
}

impl RequestQueue {
    /// Create an empty queue holding at most `max_size` requests.
    pub const fn new(max_size: u32) -> Self {
        Self {
            high: VecDeque::new(),
            normal: VecDeque::new(),
            low: VecDeque::new(),
            max_size,
        }
    }

    pub const fn max_size(&self) -> u32 {
        self.max_size
    }

    /// Change the capacity. Requests already queued are kept.
    pub const fn set_max_size(&mut self, size: u32) {
        self.max_size = size;
    }

    pub fn len(&self) -> usize {
        self.high.len() + self.normal.len() + self.low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether one more request fits.
    pub fn check_capacity(&self) -> Result<(), SpeechError> {
        if self.len() >= self.max_size as usize {
            Err(SpeechError::invalid(format!(
                "Speech queue is full ({} requests)",
                self.max_size
            )))
        } else {
            Ok(())
        }
    }

    /// Append `request` to the tail of its priority tier and mark it `Queued`.
    ///
    /// Returns the 1-based dispatch position.
    pub fn enqueue(&mut self, mut request: SpeechRequest) -> Result<usize, SpeechError> {
        self.check_capacity()?;
        request.set_status(RequestStatus::Queued);
        let id = request.id();
        self.tier_mut(request.priority()).push_back(request);
        Ok(self.position(id).unwrap_or_else(|| self.len()))
    }

    /// Remove the head of the highest non-empty tier.
    pub fn dequeue_next(&mut self) -> Option<SpeechRequest> {
        self.high
            .pop_front()
            .or_else(|| self.normal.pop_front())
            .or_else(|| self.low.pop_front())
    }

    /// Remove a specific queued request. `None` if it is not queued.
    pub fn remove(&mut self, id: RequestId) -> Option<SpeechRequest> {
        for tier in [&mut self.high, &mut self.normal, &mut self.low] {
            if let Some(index) = tier.iter().position(|r| r.id() == id) {
                return tier.remove(index);
            }
        }
        None
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.iter().any(|r| r.id() == id)
    }

    /// 1-based position in dispatch order.
    pub fn position(&self, id: RequestId) -> Option<usize> {
        self.iter().position(|r| r.id() == id).map(|p| p + 1)
    }

    /// Drop every queued request, marking each `Cancelled`.
    ///
    /// The removed requests are returned in dispatch order so the caller can
    /// record their final status. Their callbacks are never invoked.
    pub fn clear(&mut self) -> Vec<SpeechRequest> {
        let mut cleared: Vec<SpeechRequest> = self
            .high
            .drain(..)
            .chain(self.normal.drain(..))
            .chain(self.low.drain(..))
            .collect();
        for request in &mut cleared {
            request.set_status(RequestStatus::Cancelled);
        }
        cleared
    }

    /// Queued requests per tier.
    pub fn tier_counts(&self) -> TierCounts {
        TierCounts {
            high: self.high.len(),
            normal: self.normal.len(),
            low: self.low.len(),
        }
    }

    /// Queued requests in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = &SpeechRequest> {
        self.high.iter().chain(self.normal.iter()).chain(self.low.iter())
    }

    const fn tier_mut(&mut self, priority: Priority) -> &mut VecDeque<SpeechRequest> {
        match priority {
            Priority::High => &mut self.high,
            Priority::Normal => &mut self.normal,
            Priority::Low => &mut self.low,
        }
    }
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new(colloquy_core::DEFAULT_MAX_QUEUE_SIZE)
    }
}
