//! Short press, hold and repeating hold classification.

use core::cell::RefCell;

use crate::{Clock, RegisterScanner, Sample};

/// Where a tracker is in its gesture cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureState {
    /// No press in flight.
    Idle,

    /// Pressed; waiting to see whether it's released before the hold
    /// threshold (a short press) or not (a hold).
    AwaitingHoldDecision,

    /// The hold fired and the button is still down; the hold fires
    /// again every repeat interval.
    Repeating,
}

/// A gesture recognized by [`run()`](GestureTracker#method.run).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// Released before the hold threshold.
    Press,

    /// Held past the hold threshold, or past another repeat interval.
    Hold,
}

/// Timing of the gesture classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureConfig {
    /// How long the button must stay down, in milliseconds, before a
    /// press counts as a hold.
    pub hold_threshold_ms: u16,

    /// Interval between repeated holds while the button stays down, in
    /// milliseconds.  Zero fires the hold only once per press.
    pub hold_repeat_ms: u16,
}

impl Default for GestureConfig {
    /// Half a second to hold, no repeat.
    fn default() -> Self {
        GestureConfig {
            hold_threshold_ms: 500,
            hold_repeat_ms: 0,
        }
    }
}

/// A gesture classifier for one button.
///
/// The tracker borrows a shared [`RegisterScanner`](RegisterScanner),
/// which must outlive it.  Any number of trackers may share one
/// scanner, since edges are consumed bit by bit.
///
/// Nothing happens in the background: the tracker only advances when
/// [`run()`](#method.run) is called.  On each call, in order:
///
/// 1. A fresh press edge restarts the cycle, whatever the state.
/// 2. While awaiting the hold decision, a release fires the press
///    handler, and staying down past the threshold fires the hold
///    handler.
/// 3. While repeating, staying down past the repeat interval fires the
///    hold handler again, and a release just ends the cycle.
///
/// Handlers are called after the scanner borrow is released, so they
/// are free to query the scanner themselves.
pub struct GestureTracker<'a, S, C, const N: usize> {
    scanner: &'a RefCell<RegisterScanner<S, N>>,
    clock: C,
    register: usize,
    position: u8,
    config: GestureConfig,
    scan_on_run: bool,
    state: GestureState,
    reference_ms: u32,
    on_press: Option<&'a mut dyn FnMut()>,
    on_hold: Option<&'a mut dyn FnMut()>,
}

impl<'a, S: Sample, C: Clock, const N: usize> GestureTracker<'a, S, C, N> {
    /// Create a tracker for bit `position` of register `register`, with
    /// the default configuration.
    pub fn new(scanner: &'a RefCell<RegisterScanner<S, N>>, clock: C, register: usize, position: u8) -> Self {
        Self::with_config(scanner, clock, register, position, GestureConfig::default())
    }

    /// Create a tracker with the given timing.
    pub fn with_config(
        scanner: &'a RefCell<RegisterScanner<S, N>>,
        clock: C,
        register: usize,
        position: u8,
        config: GestureConfig,
    ) -> Self {
        GestureTracker {
            scanner,
            clock,
            register,
            position,
            config,
            scan_on_run: true,
            state: GestureState::Idle,
            reference_ms: 0,
            on_press: None,
            on_hold: None,
        }
    }

    /// Advance the classifier, firing at most one handler.
    ///
    /// Each call scans the chain at most once, and not at all if
    /// [`scan_on_run()`](#method.scan_on_run) is turned off.
    ///
    /// Returns the gesture that fired, if any, whether or not a handler
    /// was registered for it.
    pub fn run(&mut self) -> Result<Option<Gesture>, S::Error> {
        let now = self.clock.now_ms();
        let gesture = self.advance(now)?;

        let handler = match gesture {
            Some(Gesture::Press) => self.on_press.as_deref_mut(),
            Some(Gesture::Hold) => self.on_hold.as_deref_mut(),
            None => None,
        };
        if let Some(handler) = handler {
            handler();
        }

        Ok(gesture)
    }

    fn advance(&mut self, now: u32) -> Result<Option<Gesture>, S::Error> {
        let scanner = self.scanner;
        let mut scanner = scanner.borrow_mut();

        if scanner.pressed(self.register, self.position, !self.scan_on_run)? {
            self.reference_ms = now;
            self.enter(GestureState::AwaitingHoldDecision);
            return Ok(None);
        }

        let elapsed = now.wrapping_sub(self.reference_ms);

        match self.state {
            GestureState::Idle => Ok(None),
            GestureState::AwaitingHoldDecision => {
                if !scanner.held(self.register, self.position, true)? {
                    self.enter(GestureState::Idle);
                    return Ok(Some(Gesture::Press));
                }

                if elapsed > u32::from(self.config.hold_threshold_ms) {
                    if self.config.hold_repeat_ms > 0 {
                        self.reference_ms = now;
                        self.enter(GestureState::Repeating);
                    } else {
                        self.enter(GestureState::Idle);
                    }
                    return Ok(Some(Gesture::Hold));
                }

                Ok(None)
            }
            GestureState::Repeating => {
                if !scanner.held(self.register, self.position, true)? {
                    self.enter(GestureState::Idle);
                    return Ok(None);
                }

                if elapsed > u32::from(self.config.hold_repeat_ms) {
                    self.reference_ms = now;
                    return Ok(Some(Gesture::Hold));
                }

                Ok(None)
            }
        }
    }

    fn enter(&mut self, state: GestureState) {
        log::trace!(
            "button {}.{}: {:?} -> {:?}",
            self.register,
            self.position,
            self.state,
            state
        );
        self.state = state;
    }

    /// Set how long the button must stay down before a press counts as
    /// a hold.
    pub fn set_hold_threshold(&mut self, ms: u16) {
        self.config.hold_threshold_ms = ms;
    }

    /// Set the interval between repeated holds.  Zero disables repeat.
    pub fn set_hold_repeat(&mut self, ms: u16) {
        self.config.hold_repeat_ms = ms;
    }

    /// Set the handler for a short press.
    ///
    /// It runs when the button is released before the hold threshold,
    /// not when it first goes down.
    pub fn press_handler(&mut self, handler: &'a mut dyn FnMut()) {
        self.on_press = Some(handler);
    }

    /// Set the handler for a hold, and optionally the hold threshold.
    ///
    /// A `threshold_ms` of zero leaves the current threshold as it is,
    /// so a zero threshold can only be set with
    /// [`set_hold_threshold()`](#method.set_hold_threshold).
    pub fn hold_handler(&mut self, handler: &'a mut dyn FnMut(), threshold_ms: u16) {
        self.on_hold = Some(handler);
        if threshold_ms != 0 {
            self.set_hold_threshold(threshold_ms);
        }
    }

    /// Choose whether [`run()`](#method.run) scans the chain first.
    ///
    /// Defaults to true.  Turn it off when the control loop scans once
    /// for all trackers.
    pub fn scan_on_run(&mut self, scan: bool) {
        self.scan_on_run = scan;
    }

    /// The current state of the classifier.
    pub fn state(&self) -> GestureState {
        self.state
    }

    /// The register this tracker watches.
    pub fn register(&self) -> usize {
        self.register
    }

    /// The bit position this tracker watches.
    pub fn position(&self) -> u8 {
        self.position
    }

    /// The current hold threshold, in milliseconds.
    pub fn hold_threshold(&self) -> u16 {
        self.config.hold_threshold_ms
    }

    /// The current repeat interval, in milliseconds.
    pub fn hold_repeat(&self) -> u16 {
        self.config.hold_repeat_ms
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use core::cell::Cell;

    use crate::testing::{Levels, Unplugged};

    type Scanner = RefCell<RegisterScanner<Levels<1>, 1>>;

    fn scanner() -> Scanner {
        let mut scanner = RegisterScanner::new(Levels::new());
        scanner.begin().unwrap();
        RefCell::new(scanner)
    }

    fn press(scanner: &Scanner, position: u8) {
        let mut scanner = scanner.borrow_mut();
        let levels = scanner.bus().levels[0];
        scanner.bus_mut().set(0, levels | 1 << position);
    }

    fn release(scanner: &Scanner, position: u8) {
        let mut scanner = scanner.borrow_mut();
        let levels = scanner.bus().levels[0];
        scanner.bus_mut().set(0, levels & !(1 << position));
    }

    #[test]
    fn short_press() {
        let scanner = scanner();
        let now = Cell::new(0u32);
        let presses = Cell::new(0);
        let holds = Cell::new(0);
        let mut on_press = || presses.set(presses.get() + 1);
        let mut on_hold = || holds.set(holds.get() + 1);

        let mut tracker = GestureTracker::new(&scanner, || now.get(), 0, 2);
        tracker.press_handler(&mut on_press);
        tracker.hold_handler(&mut on_hold, 500);

        press(&scanner, 2);
        assert_eq!(None, tracker.run().unwrap());
        assert_eq!(GestureState::AwaitingHoldDecision, tracker.state());

        now.set(100);
        assert_eq!(None, tracker.run().unwrap());

        now.set(200);
        release(&scanner, 2);
        assert_eq!(Some(Gesture::Press), tracker.run().unwrap());
        assert_eq!(GestureState::Idle, tracker.state());

        now.set(1000);
        assert_eq!(None, tracker.run().unwrap());

        assert_eq!(1, presses.get());
        assert_eq!(0, holds.get());
    }

    #[test]
    fn repeating_hold() {
        let scanner = scanner();
        let now = Cell::new(0u32);
        let presses = Cell::new(0);
        let holds = Cell::new(0);
        let mut on_press = || presses.set(presses.get() + 1);
        let mut on_hold = || holds.set(holds.get() + 1);

        let mut tracker = GestureTracker::new(&scanner, || now.get(), 0, 0);
        tracker.press_handler(&mut on_press);
        tracker.hold_handler(&mut on_hold, 500);
        tracker.set_hold_repeat(200);

        press(&scanner, 0);
        tracker.run().unwrap();

        now.set(500);
        assert_eq!(None, tracker.run().unwrap());

        now.set(600);
        assert_eq!(Some(Gesture::Hold), tracker.run().unwrap());
        assert_eq!(GestureState::Repeating, tracker.state());
        assert_eq!(1, holds.get());

        now.set(800);
        assert_eq!(None, tracker.run().unwrap());

        now.set(850);
        assert_eq!(Some(Gesture::Hold), tracker.run().unwrap());
        assert_eq!(2, holds.get());

        now.set(1051);
        assert_eq!(Some(Gesture::Hold), tracker.run().unwrap());
        assert_eq!(3, holds.get());

        now.set(1100);
        release(&scanner, 0);
        assert_eq!(None, tracker.run().unwrap());
        assert_eq!(GestureState::Idle, tracker.state());

        assert_eq!(3, holds.get());
        assert_eq!(0, presses.get());
    }

    #[test]
    fn hold_without_repeat() {
        let scanner = scanner();
        let now = Cell::new(0u32);
        let holds = Cell::new(0);
        let mut on_hold = || holds.set(holds.get() + 1);

        let mut tracker = GestureTracker::new(&scanner, || now.get(), 0, 5);
        tracker.hold_handler(&mut on_hold, 500);
        assert_eq!(0, tracker.hold_repeat());

        press(&scanner, 5);
        tracker.run().unwrap();

        now.set(501);
        assert_eq!(Some(Gesture::Hold), tracker.run().unwrap());
        assert_eq!(GestureState::Idle, tracker.state());

        for t in [700, 1200, 5000].iter() {
            now.set(*t);
            assert_eq!(None, tracker.run().unwrap());
        }
        assert_eq!(1, holds.get());

        // a new press starts a new cycle
        release(&scanner, 5);
        tracker.run().unwrap();
        press(&scanner, 5);
        tracker.run().unwrap();
        now.set(5600);
        assert_eq!(Some(Gesture::Hold), tracker.run().unwrap());
        assert_eq!(2, holds.get());
    }

    #[test]
    fn clock_wraparound() {
        let scanner = scanner();
        let now = Cell::new(u32::MAX - 100);

        let config = GestureConfig {
            hold_threshold_ms: 500,
            hold_repeat_ms: 0,
        };
        let mut tracker = GestureTracker::with_config(&scanner, || now.get(), 0, 1, config);

        press(&scanner, 1);
        tracker.run().unwrap();

        now.set(now.get().wrapping_add(300));
        assert_eq!(None, tracker.run().unwrap());

        now.set(now.get().wrapping_add(201));
        assert_eq!(Some(Gesture::Hold), tracker.run().unwrap());
    }

    #[test]
    fn new_press_restarts_cycle() {
        let scanner = scanner();
        let now = Cell::new(0u32);
        let holds = Cell::new(0);
        let mut on_hold = || holds.set(holds.get() + 1);

        let mut tracker = GestureTracker::new(&scanner, || now.get(), 0, 3);
        tracker.hold_handler(&mut on_hold, 500);
        tracker.set_hold_repeat(100);
        tracker.scan_on_run(false);

        press(&scanner, 3);
        scanner.borrow_mut().scan().unwrap();
        tracker.run().unwrap();

        now.set(600);
        tracker.run().unwrap();
        assert_eq!(GestureState::Repeating, tracker.state());

        // released and pressed again between two runs
        release(&scanner, 3);
        scanner.borrow_mut().scan().unwrap();
        press(&scanner, 3);
        scanner.borrow_mut().scan().unwrap();

        now.set(800);
        assert_eq!(None, tracker.run().unwrap());
        assert_eq!(GestureState::AwaitingHoldDecision, tracker.state());

        // the threshold counts from the new press
        now.set(1200);
        assert_eq!(None, tracker.run().unwrap());
        now.set(1301);
        assert_eq!(Some(Gesture::Hold), tracker.run().unwrap());
        assert_eq!(2, holds.get());
    }

    #[test]
    fn shared_scanner() {
        let scanner = scanner();
        let now = Cell::new(0u32);
        let clock = || now.get();

        let mut left = GestureTracker::new(&scanner, clock, 0, 0);
        let mut right = GestureTracker::new(&scanner, clock, 0, 7);
        left.scan_on_run(false);
        right.scan_on_run(false);

        press(&scanner, 0);
        press(&scanner, 7);
        scanner.borrow_mut().scan().unwrap();
        left.run().unwrap();
        right.run().unwrap();
        assert_eq!(GestureState::AwaitingHoldDecision, left.state());
        assert_eq!(GestureState::AwaitingHoldDecision, right.state());

        now.set(50);
        release(&scanner, 7);
        scanner.borrow_mut().scan().unwrap();
        assert_eq!(None, left.run().unwrap());
        assert_eq!(Some(Gesture::Press), right.run().unwrap());

        now.set(501);
        scanner.borrow_mut().scan().unwrap();
        assert_eq!(Some(Gesture::Hold), left.run().unwrap());
        assert_eq!(GestureState::Idle, right.state());

        assert_eq!(3, scanner.borrow().bus().samples);
    }

    #[test]
    fn one_scan_per_run() {
        let scanner = scanner();
        let now = Cell::new(0u32);

        let mut tracker = GestureTracker::new(&scanner, || now.get(), 0, 0);

        press(&scanner, 0);
        tracker.run().unwrap();
        now.set(100);
        tracker.run().unwrap();
        assert_eq!(GestureState::AwaitingHoldDecision, tracker.state());
        assert_eq!(2, scanner.borrow().bus().samples);
    }

    #[test]
    fn bus_error_leaves_state() {
        let scanner = scanner();
        let now = Cell::new(0u32);
        let presses = Cell::new(0);
        let mut on_press = || presses.set(presses.get() + 1);

        let mut tracker = GestureTracker::new(&scanner, || now.get(), 0, 2);
        tracker.press_handler(&mut on_press);

        press(&scanner, 2);
        tracker.run().unwrap();

        release(&scanner, 2);
        scanner.borrow_mut().bus_mut().unplugged = true;
        now.set(100);
        assert_eq!(Err(Unplugged), tracker.run());
        assert_eq!(GestureState::AwaitingHoldDecision, tracker.state());
        assert_eq!(0, presses.get());

        scanner.borrow_mut().bus_mut().unplugged = false;
        assert_eq!(Ok(Some(Gesture::Press)), tracker.run());
        assert_eq!(1, presses.get());
    }

    #[test]
    fn missing_handlers_are_skipped() {
        let scanner = scanner();
        let now = Cell::new(0u32);

        let mut tracker = GestureTracker::new(&scanner, || now.get(), 0, 4);

        press(&scanner, 4);
        tracker.run().unwrap();
        release(&scanner, 4);
        assert_eq!(Some(Gesture::Press), tracker.run().unwrap());
    }

    #[test]
    fn handlers_may_use_the_scanner() {
        let scanner = scanner();
        let now = Cell::new(0u32);
        let seen = Cell::new(0xffu8);
        let mut on_press = || seen.set(scanner.borrow_mut().get_register(0, true).unwrap());

        let mut tracker = GestureTracker::new(&scanner, || now.get(), 0, 6);
        tracker.press_handler(&mut on_press);

        press(&scanner, 6);
        tracker.run().unwrap();
        release(&scanner, 6);
        tracker.run().unwrap();

        assert_eq!(0, seen.get());
    }

    #[test]
    fn zero_threshold_from_hold_handler_keeps_threshold() {
        let scanner = scanner();
        let mut on_hold = || {};

        let mut tracker = GestureTracker::new(&scanner, || 0u32, 0, 0);
        tracker.set_hold_threshold(1200);
        tracker.hold_handler(&mut on_hold, 0);
        assert_eq!(1200, tracker.hold_threshold());

        tracker.set_hold_threshold(0);
        assert_eq!(0, tracker.hold_threshold());
        assert_eq!(0, tracker.register());
        assert_eq!(0, tracker.position());
    }

    #[test]
    fn replacing_a_handler() {
        let scanner = scanner();
        let now = Cell::new(0u32);
        let first = Cell::new(0);
        let second = Cell::new(0);
        let mut on_first = || first.set(first.get() + 1);
        let mut on_second = || second.set(second.get() + 1);

        let mut tracker = GestureTracker::new(&scanner, || now.get(), 0, 1);
        tracker.press_handler(&mut on_first);

        press(&scanner, 1);
        tracker.run().unwrap();
        release(&scanner, 1);
        tracker.run().unwrap();

        tracker.press_handler(&mut on_second);
        press(&scanner, 1);
        tracker.run().unwrap();
        release(&scanner, 1);
        tracker.run().unwrap();

        assert_eq!(1, first.get());
        assert_eq!(1, second.get());
    }
}
