/// A note with absolute start time and length in seconds.
#[derive(Clone, Debug, PartialEq)]
pub struct NoteEvent {
    pub track: u8,
    pub channel: u8,
    pub pitch: u8,
    pub start: f64,
    pub duration: f64,
    pub velocity: u8,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProgramChange {
    pub track: u8,
    pub channel: u8,
    pub time: f64,
    pub program: u8,
}

/// Notes and program changes in emission order. Events may overlap.
#[derive(Clone, Debug, Default)]
pub struct MidiEventList {
    pub notes: Vec<NoteEvent>,
    pub program_changes: Vec<ProgramChange>,
}

impl MidiEventList {
    pub fn add_note(&mut self, track: u8, channel: u8, pitch: u8, start: f64, duration: f64, velocity: u8) {
        self.notes.push(NoteEvent {
            track,
            channel: channel.min(15),
            pitch: pitch.min(127),
            start: start.max(0.0),
            duration: duration.max(0.0),
            velocity: velocity.min(127),
        });
    }

    pub fn add_program_change(&mut self, track: u8, channel: u8, time: f64, program: u8) {
        self.program_changes.push(ProgramChange {
            track,
            channel: channel.min(15),
            time: time.max(0.0),
            program: program.min(127),
        });
    }

    pub fn notes_on(&self, channel: u8) -> impl Iterator<Item = &NoteEvent> {
        self.notes.iter().filter(move |n| n.channel == channel)
    }

    pub fn program_changes_on(&self, channel: u8) -> impl Iterator<Item = &ProgramChange> {
        self.program_changes.iter().filter(move |p| p.channel == channel)
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.program_changes.is_empty()
    }

    /// Latest note end or program-change time.
    pub fn end_time(&self) -> f64 {
        let notes = self.notes.iter().map(|n| n.start + n.duration);
        let programs = self.program_changes.iter().map(|p| p.time);
        notes.chain(programs).fold(0.0, f64::max)
    }

    pub fn max_track(&self) -> Option<u8> {
        let notes = self.notes.iter().map(|n| n.track);
        let programs = self.program_changes.iter().map(|p| p.track);
        notes.chain(programs).max()
    }
}
