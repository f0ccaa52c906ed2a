//! Locomotion notifications.
//!
//! Every occurrence the controller reports is a variant of [`LocomotionEvent`]. Events
//! are queued in firing order and drained by the host. A compact flag set of the
//! events fired since the last [`EventQueue::begin_update`] is kept alongside, which is
//! what edge-detection tests and cheap per-frame polling want.

use num_traits::{One, PrimInt};

/// Something that occupies one bit of a flag set.
pub trait FlagBit {
    type Storage: PrimInt;

    fn bit_index(&self) -> u8;

    fn mask(&self) -> Self::Storage {
        // NOTE: `bit_index()` must be < number of bits in `Storage`.
        Self::Storage::one() << (self.bit_index() as usize)
    }
}

/// Flag set over a primitive integer.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub struct EventFlags<T: PrimInt> {
    pub bits: T,
}

impl<T: PrimInt> EventFlags<T> {
    pub fn new(bits: T) -> Self {
        Self { bits }
    }

    pub fn insert<U: FlagBit<Storage = T>>(&mut self, flag: U) {
        self.bits = self.bits | flag.mask();
    }

    pub fn contains<U: FlagBit<Storage = T>>(&self, flag: U) -> bool {
        (self.bits & flag.mask()) != T::zero()
    }

    pub fn contains_any<U: FlagBit<Storage = T> + Copy>(&self, flags: &[U]) -> bool {
        let combined = flags.iter().fold(T::zero(), |acc, f| acc | f.mask());
        (self.bits & combined) != T::zero()
    }

    pub fn len(&self) -> u32 {
        self.bits.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.bits == T::zero()
    }

    pub fn clear(&mut self) {
        self.bits = T::zero();
    }
}

/// Closed set of locomotion occurrences.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LocomotionEvent {
    GroundHit,
    GroundSoonHit,
    Ungrounded,
    StartedFalling,
    StartedMoving,
    TargetVelocityReached,
    Stopped,
    TopWalkSpeedReached,
    TopSprintSpeedReached,
    HeadHit,
    HitSomething,
    GravityPrevented,
    Crouched,
    StoodUp,
    StandPrevented,
    StartedCrouching,
    StartedStanding,
    FirstJump,
    SecondJump,
    StaminaCapped,
    StaminaReachedZero,
    SprintStarted,
    CooldownStarted,
    CooldownDone,
}

impl FlagBit for LocomotionEvent {
    type Storage = u32;

    fn bit_index(&self) -> u8 {
        *self as u8
    }
}

/// Ordered event queue plus the flag set of what fired during the current update.
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    pending: Vec<LocomotionEvent>,
    fired: EventFlags<u32>,
}

impl EventQueue {
    /// Reset the per-update flag set. Pending events are kept until drained.
    pub fn begin_update(&mut self) {
        self.fired.clear();
    }

    pub fn emit(&mut self, event: LocomotionEvent) {
        log::trace!("locomotion event: {:?}", event);
        self.pending.push(event);
        self.fired.insert(event);
    }

    /// Events fired since the last `begin_update`.
    pub fn fired(&self) -> EventFlags<u32> {
        self.fired
    }

    pub fn pending(&self) -> &[LocomotionEvent] {
        &self.pending
    }

    /// Take all queued events in firing order.
    pub fn drain(&mut self) -> Vec<LocomotionEvent> {
        std::mem::take(&mut self.pending)
    }

    pub fn count(&self, event: LocomotionEvent) -> usize {
        self.pending.iter().filter(|e| **e == event).count()
    }
}
