//! Queue of route requests sharing one frame quota
//!
//! Requests are parked in a fixed number of slots and advanced round robin by
//! [`RouteQueue::update`]. A finished result stays available for a few updates
//! and is then dropped if nobody collected it.

use std::fmt;

use crate::frame_quota::{Clock, FrameQuota};
use crate::route_search::{
    RouteRequest, RouteSearch, RouteSearchConfig, RouteSearchState, SearchContext, WayFace,
};
use meshnav_common::Result;

/// Default number of concurrent requests
pub const DEFAULT_ROUTE_QUEUE_SLOTS: usize = 8;

/// Handle of a queued request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteHandle(u32);

impl RouteHandle {
    pub const INVALID: RouteHandle = RouteHandle(0);

    pub fn id(&self) -> u32 {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl fmt::Display for RouteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration of a route queue
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct RouteQueueConfig {
    /// Number of request slots
    pub slots: usize,
    /// Steps one request may take per update, zero for no limit
    pub max_steps_per_update: usize,
    /// Updates a finished result survives without being collected
    pub keep_alive_updates: u32,
    pub search: RouteSearchConfig,
}

impl Default for RouteQueueConfig {
    fn default() -> Self {
        Self {
            slots: DEFAULT_ROUTE_QUEUE_SLOTS,
            max_steps_per_update: 0,
            keep_alive_updates: 2,
            search: RouteSearchConfig::default(),
        }
    }
}

/// Collected outcome of a queued request
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResult {
    pub state: RouteSearchState,
    /// Empty unless the goal was reached
    pub route: Vec<WayFace>,
    pub cost: Option<f32>,
}

#[derive(Debug)]
struct RouteSlot {
    handle: RouteHandle,
    search: RouteSearch,
    keep_alive: u32,
}

/// Fixed set of route searches advanced under one frame quota
#[derive(Debug)]
pub struct RouteQueue {
    slots: Vec<RouteSlot>,
    next_handle: u32,
    head: usize,
    config: RouteQueueConfig,
}

impl RouteQueue {
    pub fn new(config: RouteQueueConfig) -> Self {
        let slots = (0..config.slots.max(1))
            .map(|_| RouteSlot {
                handle: RouteHandle::INVALID,
                search: RouteSearch::new(config.search.clone()),
                keep_alive: 0,
            })
            .collect();
        Self {
            slots,
            next_handle: 1,
            head: 0,
            config,
        }
    }

    pub fn config(&self) -> &RouteQueueConfig {
        &self.config
    }

    /// Queues a request.
    ///
    /// Returns [`RouteHandle::INVALID`] when every slot is busy, and an error
    /// when the request names faces the mesh does not have.
    pub fn request(
        &mut self,
        context: &SearchContext<'_>,
        request: RouteRequest,
    ) -> Result<RouteHandle> {
        let Some(slot) = self.slots.iter_mut().find(|s| !s.handle.is_valid()) else {
            log::warn!("route queue full, request dropped");
            return Ok(RouteHandle::INVALID);
        };

        slot.search.set_up_for_search(context, request)?;

        let handle = RouteHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        if self.next_handle == RouteHandle::INVALID.0 {
            self.next_handle = 1;
        }

        slot.handle = handle;
        slot.keep_alive = self.config.keep_alive_updates;
        Ok(handle)
    }

    /// Advances pending requests while the frame quota allows
    pub fn update<C: Clock>(&mut self, context: &SearchContext<'_>, quota: &mut FrameQuota<C>) {
        let slot_count = self.slots.len();
        for _ in 0..slot_count {
            let index = self.head;
            self.head = (self.head + 1) % slot_count;

            let slot = &mut self.slots[index];
            if !slot.handle.is_valid() {
                continue;
            }

            if slot.search.state().is_terminal() {
                slot.keep_alive = slot.keep_alive.saturating_sub(1);
                if slot.keep_alive == 0 {
                    log::debug!("route request {} expired uncollected", slot.handle);
                    slot.handle = RouteHandle::INVALID;
                    slot.search.reset();
                }
                continue;
            }

            if !quota.has_budget() {
                break;
            }

            let mut steps = 0;
            while slot.search.can_do_step(quota)
                && (self.config.max_steps_per_update == 0
                    || steps < self.config.max_steps_per_update)
            {
                steps += 1;
                if slot.search.step(context, quota).is_terminal() {
                    break;
                }
            }
        }
    }

    /// Gets the state of a request
    pub fn status(&self, handle: RouteHandle) -> Option<RouteSearchState> {
        self.find(handle).map(|slot| slot.search.state())
    }

    /// Takes the result of a finished request, freeing its slot
    pub fn take_result(&mut self, handle: RouteHandle) -> Option<RouteResult> {
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.handle.is_valid() && s.handle == handle)?;
        let state = slot.search.state();
        if !state.is_terminal() {
            return None;
        }

        let result = RouteResult {
            state,
            route: slot.search.route().unwrap_or_default(),
            cost: slot.search.route_cost(),
        };
        slot.handle = RouteHandle::INVALID;
        slot.search.reset();
        Some(result)
    }

    /// Drops a request whatever its state
    pub fn cancel(&mut self, handle: RouteHandle) -> bool {
        match self
            .slots
            .iter_mut()
            .find(|s| s.handle.is_valid() && s.handle == handle)
        {
            Some(slot) => {
                slot.handle = RouteHandle::INVALID;
                slot.search.reset();
                true
            }
            None => false,
        }
    }

    /// Number of occupied slots
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.handle.is_valid()).count()
    }

    fn find(&self, handle: RouteHandle) -> Option<&RouteSlot> {
        self.slots
            .iter()
            .find(|s| s.handle.is_valid() && s.handle == handle)
    }
}
