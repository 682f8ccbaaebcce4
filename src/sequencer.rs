// src/sequencer.rs

use crate::event::{TriggerEvent, TriggerSource};
use crate::groove::GrooveModel;
use crate::state::{Pattern, TrackTable, DEFAULT_STEP_VELOCITY, MAX_STEPS, NUM_TRACKS};
use crate::transport::Transport;

/// Pending onsets one track can hold.
pub const MAX_PENDING_PER_TRACK: usize = 32;

/// Released steps remembered for playhead readback.
const STEP_MARK_CAPACITY: usize = 32;

/// Lifecycle of the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    /// Not prepared yet; nothing is released
    Idle,
    /// Advancing with the host clock
    Running,
    /// Rewound; re-armed at step 0 by the next block
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingTrigger {
    /// Absolute sample position
    position: u64,
    velocity: f32,
    source: TriggerSource,
}

const NO_TRIGGER: PendingTrigger = PendingTrigger {
    position: 0,
    velocity: 0.0,
    source: TriggerSource::Manual,
};

/// Fixed-capacity queue kept sorted by position.
#[derive(Debug, Clone)]
struct TriggerQueue {
    items: [PendingTrigger; MAX_PENDING_PER_TRACK],
    len: usize,
}

impl TriggerQueue {
    const fn new() -> Self {
        Self {
            items: [NO_TRIGGER; MAX_PENDING_PER_TRACK],
            len: 0,
        }
    }

    /// Insert after any entry with the same position. `false` when full.
    fn push(&mut self, trigger: PendingTrigger) -> bool {
        if self.len == MAX_PENDING_PER_TRACK {
            return false;
        }
        let mut i = self.len;
        while i > 0 && self.items[i - 1].position > trigger.position {
            self.items[i] = self.items[i - 1];
            i -= 1;
        }
        self.items[i] = trigger;
        self.len += 1;
        true
    }

    #[inline]
    fn front(&self) -> Option<&PendingTrigger> {
        self.items[..self.len].first()
    }

    fn pop_front(&mut self) -> Option<PendingTrigger> {
        if self.len == 0 {
            return None;
        }
        let front = self.items[0];
        self.items.copy_within(1..self.len, 0);
        self.len -= 1;
        Some(front)
    }

    #[inline]
    fn clear(&mut self) {
        self.len = 0;
    }
}

/// Ring of `(nominal position, step)` for released steps the playhead has
/// not reached yet.
#[derive(Debug, Clone)]
struct StepMarks {
    items: [(f64, usize); STEP_MARK_CAPACITY],
    head: usize,
    len: usize,
}

impl StepMarks {
    const fn new() -> Self {
        Self {
            items: [(0.0, 0); STEP_MARK_CAPACITY],
            head: 0,
            len: 0,
        }
    }

    fn push(&mut self, mark: (f64, usize)) {
        if self.len == STEP_MARK_CAPACITY {
            self.head = (self.head + 1) % STEP_MARK_CAPACITY;
            self.len -= 1;
        }
        let tail = (self.head + self.len) % STEP_MARK_CAPACITY;
        self.items[tail] = mark;
        self.len += 1;
    }

    /// Drop every mark before `position`, returning the last one dropped.
    fn pass(&mut self, position: f64) -> Option<usize> {
        let mut last = None;
        while self.len > 0 {
            let (nominal, step) = self.items[self.head];
            if nominal >= position {
                break;
            }
            last = Some(step);
            self.head = (self.head + 1) % STEP_MARK_CAPACITY;
            self.len -= 1;
        }
        last
    }

    fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

/// Sample-accurate step sequencer.
///
/// This struct runs on the audio thread and never allocates.
///
/// The nominal onset of the next unreleased step is an absolute `f64`
/// sample position, so rounding never accumulates. Steps are released one
/// groove look-ahead early; each active track's humanized onset is queued
/// and handed out once the block containing it is processed.
///
/// A released step is fixed. Tempo, swing and humanization changes only
/// reach steps not yet released, so they take effect up to
/// `dillaMaxDrift` seconds plus one block after they are written. Blocks
/// must not exceed [`max_block_frames`](Self::max_block_frames) or the
/// per-track queues can overflow.
#[derive(Debug, Clone)]
pub struct StepSequencer {
    state: SequencerState,
    transport: Transport,

    /// Index of the next step to release
    next_step: usize,

    /// Nominal absolute position of `next_step`
    next_step_pos: f64,

    /// Pending onsets per track
    queues: [TriggerQueue; NUM_TRACKS],

    marks: StepMarks,

    /// Last step whose nominal position the playhead has crossed
    current_step: Option<usize>,

    block_start: u64,
    block_end: u64,

    /// Triggers lost to full queues
    dropped: u32,
}

impl StepSequencer {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            state: SequencerState::Idle,
            transport: Transport::new(sample_rate),
            next_step: 0,
            next_step_pos: 0.0,
            queues: [const { TriggerQueue::new() }; NUM_TRACKS],
            marks: StepMarks::new(),
            current_step: None,
            block_start: 0,
            block_end: 0,
            dropped: 0,
        }
    }

    /// Adopt a sample rate and rewind. Leaves the sequencer `Stopped`.
    pub fn prepare(&mut self, sample_rate: f64) {
        self.transport.set_sample_rate(sample_rate);
        self.state = SequencerState::Stopped;
        self.rewind();
    }

    /// Zero transport and pending triggers. An unprepared sequencer stays
    /// `Idle`.
    pub fn reset(&mut self) {
        if self.state != SequencerState::Idle {
            self.state = SequencerState::Stopped;
        }
        self.rewind();
    }

    fn rewind(&mut self) {
        self.transport.rewind();
        self.next_step = 0;
        self.next_step_pos = 0.0;
        for queue in &mut self.queues {
            queue.clear();
        }
        self.marks.clear();
        self.current_step = None;
        self.block_start = 0;
        self.block_end = 0;
    }

    // -------------------------------
    // MARK: Block processing
    // -------------------------------

    /// Longest block `begin_block` can take without overflowing a track
    /// queue: half a queue of steps, less the groove look-ahead.
    pub fn max_block_frames(&self, groove: &GrooveModel) -> usize {
        let sample_rate = self.transport.sample_rate();
        let span = groove.step_duration_samples(sample_rate) * (MAX_PENDING_PER_TRACK / 2) as f64
            - groove.max_offset_samples(sample_rate);
        span.floor().max(1.0) as usize
    }

    /// Open a block of `frames` samples and release every step whose
    /// earliest possible onset falls before the block end.
    pub fn begin_block(
        &mut self,
        frames: usize,
        pattern: &Pattern,
        groove: &GrooveModel,
        table: &TrackTable,
    ) {
        match self.state {
            SequencerState::Idle => return,
            SequencerState::Stopped => {
                self.next_step = 0;
                self.next_step_pos = self.transport.sample_position() as f64;
                self.state = SequencerState::Running;
            }
            SequencerState::Running => {}
        }

        let settings = groove.settings();
        self.transport.set_tempo(settings.tempo);

        self.block_start = self.transport.sample_position();
        self.block_end = self.block_start + frames as u64;

        let length = settings.pattern_length.clamp(1, MAX_STEPS);
        if self.next_step >= length {
            self.next_step = 0;
        }

        let sample_rate = self.transport.sample_rate();
        let lookahead = groove.max_offset_samples(sample_rate);
        let step_duration = self.transport.step_duration();
        let block_end = self.block_end as f64;

        while self.next_step_pos - lookahead < block_end {
            self.release_step(pattern, groove, table);
            self.marks.push((self.next_step_pos, self.next_step));
            self.next_step_pos += step_duration;
            self.next_step = (self.next_step + 1) % length;
        }
    }

    /// Queue each active track of the pending step at its humanized onset.
    fn release_step(&mut self, pattern: &Pattern, groove: &GrooveModel, table: &TrackTable) {
        let step = self.next_step;
        let nominal = self.next_step_pos;
        let sample_rate = self.transport.sample_rate();
        let floor = self.block_start as f64;

        for slot in table.slots() {
            if !pattern.is_active(slot.index, step) {
                continue;
            }
            let Some(scale) = groove.shape_hit(step, slot.index) else {
                continue;
            };
            let offset = groove.compute_offset_samples(step, slot, sample_rate);
            let onset = (nominal + offset).round().max(floor) as u64;

            let queued = self.queues[slot.index].push(PendingTrigger {
                position: onset,
                velocity: DEFAULT_STEP_VELOCITY * scale,
                source: TriggerSource::Step(step),
            });
            if !queued {
                self.dropped = self.dropped.wrapping_add(1);
            }
        }
    }

    /// Queue a live trigger `offset` frames after the current block start.
    ///
    /// Returns `false` for out-of-range tracks, an unprepared sequencer, or
    /// a full queue.
    pub fn trigger(&mut self, track: usize, velocity: f32, offset: usize) -> bool {
        if self.state == SequencerState::Idle || track >= NUM_TRACKS {
            return false;
        }
        let queued = self.queues[track].push(PendingTrigger {
            position: self.transport.sample_position() + offset as u64,
            velocity,
            source: TriggerSource::Manual,
        });
        if !queued {
            self.dropped = self.dropped.wrapping_add(1);
        }
        queued
    }

    /// Earliest queued trigger inside the current block, if any.
    pub fn pop_due(&mut self) -> Option<TriggerEvent> {
        let mut best: Option<(usize, u64)> = None;
        for (track, queue) in self.queues.iter().enumerate() {
            if let Some(front) = queue.front() {
                let earlier = best.is_none_or(|(_, pos)| front.position < pos);
                if front.position < self.block_end && earlier {
                    best = Some((track, front.position));
                }
            }
        }

        let (track, _) = best?;
        let pending = self.queues[track].pop_front()?;
        Some(TriggerEvent {
            track,
            offset: pending.position.saturating_sub(self.block_start) as usize,
            velocity: pending.velocity,
            source: pending.source,
        })
    }

    /// Close the block: advance the transport and the playhead.
    pub fn end_block(&mut self) {
        if self.state != SequencerState::Running {
            return;
        }
        let frames = (self.block_end - self.block_start) as usize;
        self.transport.advance(frames);
        if let Some(step) = self.marks.pass(self.block_end as f64) {
            self.current_step = Some(step);
        }
    }

    // -------------------------------
    // MARK: Readback
    // -------------------------------

    #[inline]
    pub fn state(&self) -> SequencerState {
        self.state
    }

    #[inline]
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Absolute position of the current (or next) block.
    #[inline]
    pub fn sample_position(&self) -> u64 {
        self.transport.sample_position()
    }

    #[inline]
    pub fn block_start(&self) -> u64 {
        self.block_start
    }

    /// Step under the playhead, `None` before the first step is reached.
    #[inline]
    pub fn current_step(&self) -> Option<usize> {
        self.current_step
    }

    /// Triggers queued but not yet fired.
    #[cfg(test)]
    pub fn pending_count(&self) -> usize {
        self.queues.iter().map(|q| q.len).sum()
    }

    #[inline]
    pub fn dropped_triggers(&self) -> u32 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groove::SwingGrid;
    use crate::state::ParamId;

    const SR: f64 = 48_000.0;

    struct Rig {
        seq: StepSequencer,
        groove: GrooveModel,
        pattern: Pattern,
        table: TrackTable,
    }

    impl Rig {
        fn new() -> Self {
            let mut seq = StepSequencer::new(SR);
            seq.prepare(SR);
            Self {
                seq,
                groove: GrooveModel::new(99, SwingGrid::Sixteenth),
                pattern: Pattern::new(),
                table: TrackTable::standard(),
            }
        }

        /// Zero swing, role offsets and humanization.
        fn straight() -> Self {
            let mut rig = Self::new();
            rig.set(ParamId::DillaMaxDrift, 0.0);
            rig
        }

        fn set(&mut self, id: ParamId, value: f32) {
            self.groove.set_param(id, id.info().clamp(value));
        }

        /// Run blocks, returning `(absolute position, track, source)`.
        fn run(&mut self, block: usize, total: usize) -> Vec<(u64, usize, TriggerSource)> {
            let mut fired = Vec::new();
            let mut done = 0;
            while done < total {
                let frames = block.min(total - done);
                self.seq
                    .begin_block(frames, &self.pattern, &self.groove, &self.table);
                while let Some(event) = self.seq.pop_due() {
                    assert!(event.offset < frames);
                    fired.push((self.seq.block_start() + event.offset as u64, event.track, event.source));
                }
                self.seq.end_block();
                done += frames;
            }
            fired
        }
    }

    #[test]
    fn test_one_trigger_per_cycle_at_block_offset_zero() {
        let mut rig = Rig::straight();
        rig.pattern.set(0, 0, true);

        let mut offsets = Vec::new();
        let mut start = 0u64;
        let mut starts = Vec::new();
        for _ in 0..(96_000 * 3 / 500) {
            rig.seq.begin_block(500, &rig.pattern, &rig.groove, &rig.table);
            while let Some(event) = rig.seq.pop_due() {
                offsets.push(event.offset);
                starts.push(start);
            }
            rig.seq.end_block();
            start += 500;
        }

        assert_eq!(offsets, vec![0, 0, 0]);
        assert_eq!(starts, vec![0, 96_000, 192_000]);
    }

    #[test]
    fn test_no_drift_over_many_steps() {
        for &tempo in &[60.0f32, 97.3, 133.0, 200.0] {
            for &block in &[1usize, 64, 333, 1024] {
                let mut rig = Rig::straight();
                rig.set(ParamId::Tempo, tempo);
                for step in 0..MAX_STEPS {
                    rig.pattern.set(0, step, true);
                }

                let step_duration = crate::groove::step_duration_samples(tempo as f64, SR);
                let steps = 64;
                let total = (step_duration * steps as f64) as usize;
                let fired = rig.run(block, total);

                assert!(fired.len() >= steps - 1, "tempo {tempo} block {block}");
                for (n, &(pos, track, source)) in fired.iter().enumerate() {
                    assert_eq!(track, 0);
                    assert_eq!(source, TriggerSource::Step(n % MAX_STEPS));
                    let ideal = n as f64 * step_duration;
                    assert!((pos as f64 - ideal).abs() <= 1.0, "step {n}: {pos} vs {ideal}");
                }
            }
        }
    }

    #[test]
    fn test_block_size_does_not_change_timing() {
        let reference = {
            let mut rig = Rig::new();
            rig.pattern = Pattern::basic_beat();
            rig.set(ParamId::Swing, 0.5);
            rig.run(4096, 96_000 * 2)
        };
        assert!(!reference.is_empty());

        for &block in &[7usize, 128, 1000] {
            let mut rig = Rig::new();
            rig.pattern = Pattern::basic_beat();
            rig.set(ParamId::Swing, 0.5);
            let mut fired = rig.run(block, 96_000 * 2);
            let mut expected = reference.clone();
            fired.sort_by_key(|&(pos, track, _)| (pos, track));
            expected.sort_by_key(|&(pos, track, _)| (pos, track));
            assert_eq!(fired, expected, "block {block}");
        }
    }

    #[test]
    fn test_every_step_fires_exactly_once_with_groove() {
        let mut rig = Rig::new();
        rig.set(ParamId::DillaAmount, 1.0);
        rig.set(ParamId::DillaMaxDrift, 0.3);
        rig.set(ParamId::Swing, 1.0);
        rig.set(ParamId::Tempo, 200.0);
        for step in 0..MAX_STEPS {
            rig.pattern.set(2, step, true);
        }

        let hat = *rig.table.slot(2).expect("hat slot");
        let step_duration = rig.groove.step_duration_samples(SR);
        let total = 3_600 * 64;

        // Independent expectation: one onset per nominal step
        let mut expected = Vec::new();
        let mut nominal = 0.0;
        for n in 0..80 {
            let offset = rig.groove.compute_offset_samples(n % 16, &hat, SR);
            let onset = (nominal + offset).round().max(0.0) as u64;
            if onset < total as u64 {
                expected.push((onset, 2, TriggerSource::Step(n % 16)));
            }
            nominal += step_duration;
        }
        expected.sort_by_key(|&(pos, _, _)| pos);

        for &block in &[64usize, 256, 3000] {
            let mut run = Rig::new();
            run.groove = rig.groove.clone();
            run.pattern = rig.pattern.clone();
            let mut fired = run.run(block, total);
            fired.sort_by_key(|&(pos, _, _)| pos);
            assert_eq!(fired, expected, "block {block}");
        }
    }

    #[test]
    fn test_inactive_steps_never_fire() {
        let mut rig = Rig::new();
        rig.pattern = Pattern::basic_beat();
        let fired = rig.run(512, 96_000 * 2);
        for (_, track, source) in fired {
            assert!(track <= 3, "track {track} has no active steps");
            if let TriggerSource::Step(step) = source {
                assert!(rig.pattern.is_active(track, step));
            }
        }
    }

    #[test]
    fn test_pattern_length_round_trip() {
        let mut rig = Rig::straight();
        for step in 0..MAX_STEPS {
            rig.pattern.set(4, step, true);
        }

        rig.set(ParamId::PatternLength, 4.0);
        let short = rig.run(500, 48_000);
        assert_eq!(short.len(), 8);
        assert!(short.iter().all(|f| matches!(f.2, TriggerSource::Step(s) if s < 4)));

        rig.set(ParamId::PatternLength, 16.0);
        let long = rig.run(500, 96_000);
        assert!(long.iter().any(|f| f.2 == TriggerSource::Step(15)));
        assert_eq!(rig.pattern.active_count(4, MAX_STEPS), 16);
    }

    #[test]
    fn test_tempo_change_applies_at_next_step() {
        let mut rig = Rig::straight();
        rig.pattern.set(0, 0, true);
        rig.pattern.set(0, 1, true);
        rig.pattern.set(0, 2, true);

        // Step 0 at 0 releases; step 1 is nominally at 6000
        rig.seq.begin_block(100, &rig.pattern, &rig.groove, &rig.table);
        assert!(rig.seq.pop_due().is_some());
        rig.seq.end_block();

        rig.set(ParamId::Tempo, 60.0);
        let fired = rig.run(100, 24_000);
        let positions: Vec<u64> = fired.iter().map(|f| f.0).collect();
        // Step 1 keeps its boundary, step 2 follows at the new step length
        assert_eq!(positions, vec![6_000, 18_000]);
    }

    #[test]
    fn test_tempo_change_waits_for_lookahead() {
        let mut rig = Rig::new();
        rig.set(ParamId::DillaAmount, 0.0);
        rig.set(ParamId::DillaMaxDrift, 0.3);
        rig.set(ParamId::Tempo, 200.0);
        for step in 0..MAX_STEPS {
            rig.pattern.set(0, step, true);
        }

        // 14400 frames of look-ahead release steps 0..=4 (3600 apart)
        rig.seq.begin_block(100, &rig.pattern, &rig.groove, &rig.table);
        assert_eq!(rig.seq.pop_due().map(|e| e.source), Some(TriggerSource::Step(0)));
        rig.seq.end_block();
        assert_eq!(rig.seq.pending_count(), 4);

        rig.set(ParamId::Tempo, 100.0);
        let fired = rig.run(100, 30_000);
        let positions: Vec<u64> = fired.iter().map(|f| f.0).collect();
        // Step 5 was scheduled before the change; step 6 is the first 7200 apart
        assert_eq!(positions, vec![3_600, 7_200, 10_800, 14_400, 18_000, 25_200]);
        assert_eq!(fired[5].2, TriggerSource::Step(6));
    }

    #[test]
    fn test_max_block_frames_keeps_queues_bounded() {
        let mut rig = Rig::new();
        rig.set(ParamId::DillaMaxDrift, 0.3);
        rig.set(ParamId::Tempo, 200.0);
        // 0.3 is stored as f32, so the look-ahead sits a hair above 14400
        assert!((43_199..=43_200).contains(&rig.seq.max_block_frames(&rig.groove)));

        rig.set(ParamId::DillaMaxDrift, 0.0);
        rig.set(ParamId::Tempo, 60.0);
        assert_eq!(rig.seq.max_block_frames(&rig.groove), 16 * 12_000);

        for step in 0..MAX_STEPS {
            rig.pattern.set(0, step, true);
        }
        rig.set(ParamId::Tempo, 200.0);
        let block = rig.seq.max_block_frames(&rig.groove);
        let fired = rig.run(block, block * 4);
        assert_eq!(fired.len(), (block * 4).div_ceil(3_600));
        assert_eq!(rig.seq.dropped_triggers(), 0);
    }

    #[test]
    fn test_manual_trigger_lands_at_offset() {
        let mut rig = Rig::straight();
        rig.run(1000, 1000);

        assert!(rig.seq.trigger(3, 0.9, 100));
        assert!(!rig.seq.trigger(16, 0.9, 0));
        rig.seq.begin_block(256, &rig.pattern, &rig.groove, &rig.table);
        let event = rig.seq.pop_due().expect("manual trigger");
        assert_eq!(event.track, 3);
        assert_eq!(event.offset, 100);
        assert_eq!(event.velocity, 0.9);
        assert_eq!(event.source, TriggerSource::Manual);
        assert!(rig.seq.pop_due().is_none());
    }

    #[test]
    fn test_unprepared_sequencer_is_idle() {
        let mut seq = StepSequencer::new(SR);
        let pattern = Pattern::basic_beat();
        let groove = GrooveModel::new(1, SwingGrid::Sixteenth);
        let table = TrackTable::standard();

        seq.begin_block(512, &pattern, &groove, &table);
        assert!(seq.pop_due().is_none());
        assert!(!seq.trigger(0, 1.0, 0));
        seq.end_block();
        assert_eq!(seq.state(), SequencerState::Idle);
        assert_eq!(seq.sample_position(), 0);
    }

    #[test]
    fn test_reset_rewinds_to_step_zero() {
        let mut rig = Rig::straight();
        rig.pattern.set(0, 0, true);
        rig.pattern.set(0, 5, true);
        rig.run(500, 40_000);
        assert_eq!(rig.seq.current_step(), Some(6));

        rig.seq.reset();
        assert_eq!(rig.seq.state(), SequencerState::Stopped);
        assert_eq!(rig.seq.sample_position(), 0);
        assert_eq!(rig.seq.pending_count(), 0);

        let fired = rig.run(500, 500);
        assert_eq!(fired, vec![(0, 0, TriggerSource::Step(0))]);
        assert_eq!(rig.seq.state(), SequencerState::Running);
    }
}
