/// Sound engine: procedural chiptune effects via rodio.
///
/// Every effect is synthesised once at start-up into an in-memory WAV
/// buffer and played fire-and-forget on its own Sink.
///
/// Build without the "sound" feature to get a silent stub with the same API.

use crate::sim::event::GameEvent;

/// One playable effect.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Sfx {
    Start,
    Chomp,
    PowerUp,
    GhostEaten,
    Death,
    Clear,
}

/// Which effect (if any) an event triggers.
pub fn sfx_for(event: &GameEvent) -> Option<Sfx> {
    match event {
        GameEvent::Started => Some(Sfx::Start),
        GameEvent::PelletEaten { .. } => Some(Sfx::Chomp),
        GameEvent::PowerPelletEaten { .. } => Some(Sfx::PowerUp),
        GameEvent::GhostCaptured { .. } => Some(Sfx::GhostEaten),
        GameEvent::PlayerCaught { .. } | GameEvent::GameOver => Some(Sfx::Death),
        GameEvent::LevelCleared => Some(Sfx::Clear),
        GameEvent::Paused | GameEvent::Resumed => None,
    }
}

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use super::Sfx;

    const SAMPLE_RATE: u32 = 22050;
    const TAU: f32 = std::f32::consts::TAU;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        start: Arc<Vec<u8>>,
        chomp: [Arc<Vec<u8>>; 2],
        power: Arc<Vec<u8>>,
        ghost: Arc<Vec<u8>>,
        death: Arc<Vec<u8>>,
        clear: Arc<Vec<u8>>,
        /// Alternates the two chomp halves.
        waka: std::cell::Cell<bool>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(error = %e, "no audio output, running silent");
                    return None;
                }
            };

            Some(SoundEngine {
                _stream: stream,
                handle,
                start: Arc::new(make_wav(&gen_start())),
                chomp: [
                    Arc::new(make_wav(&gen_sweep(480.0, 260.0, 0.06, 0.2))),
                    Arc::new(make_wav(&gen_sweep(260.0, 480.0, 0.06, 0.2))),
                ],
                power: Arc::new(make_wav(&gen_sweep(200.0, 900.0, 0.25, 0.25))),
                ghost: Arc::new(make_wav(&gen_sweep(300.0, 1600.0, 0.18, 0.25))),
                death: Arc::new(make_wav(&gen_death())),
                clear: Arc::new(make_wav(&gen_clear())),
                waka: std::cell::Cell::new(false),
            })
        }

        fn play_buf(&self, buf: &Arc<Vec<u8>>) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }

        pub fn play(&self, sfx: Sfx) {
            match sfx {
                Sfx::Start => self.play_buf(&self.start),
                Sfx::Chomp => {
                    let half = self.waka.get();
                    self.waka.set(!half);
                    self.play_buf(&self.chomp[half as usize]);
                }
                Sfx::PowerUp => self.play_buf(&self.power),
                Sfx::GhostEaten => self.play_buf(&self.ghost),
                Sfx::Death => self.play_buf(&self.death),
                Sfx::Clear => self.play_buf(&self.clear),
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators — all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn square(phase: f32) -> f32 {
        if phase.fract() < 0.5 { 1.0 } else { -1.0 }
    }

    /// Linear frequency sweep on a soft square wave.
    fn gen_sweep(from: f32, to: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                phase += (from + (to - from) * t) / SAMPLE_RATE as f32;
                let env = 1.0 - t;
                (square(phase) * 0.6 + (phase * TAU).sin() * 0.4) * env * volume
            })
            .collect()
    }

    fn notes(seq: &[(f32, f32)], volume: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &(freq, dur) in seq {
            let n = (SAMPLE_RATE as f32 * dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * 0.4;
                samples.push(square(t * freq) * env * volume);
            }
        }
        samples
    }

    /// Start jingle: short rising run B4 → B5
    fn gen_start() -> Vec<f32> {
        notes(&[(494.0, 0.08), (988.0, 0.08), (740.0, 0.08), (622.0, 0.08), (988.0, 0.16)], 0.15)
    }

    /// Death: three falling sweeps, each lower than the last
    fn gen_death() -> Vec<f32> {
        let mut samples = gen_sweep(800.0, 500.0, 0.2, 0.25);
        samples.extend(gen_sweep(600.0, 350.0, 0.2, 0.25));
        samples.extend(gen_sweep(400.0, 120.0, 0.35, 0.25));
        samples
    }

    /// Level clear: C5 → E5 → G5 → C6, last note held
    fn gen_clear() -> Vec<f32> {
        notes(&[(523.0, 0.1), (659.0, 0.1), (784.0, 0.1), (1047.0, 0.3)], 0.18)
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder — wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }

}

// ════════════════════════════════════════════════════════════
//  Public API — compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _sfx: Sfx) {}
}

impl SoundEngine {
    /// Play whatever the tick's events call for; one chomp per tick at most.
    pub fn on_events(&self, events: &[GameEvent]) {
        let mut chomped = false;
        for sfx in events.iter().filter_map(sfx_for) {
            if sfx == Sfx::Chomp {
                if chomped {
                    continue;
                }
                chomped = true;
            }
            self.play(sfx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_map_to_effects() {
        assert_eq!(sfx_for(&GameEvent::PelletEaten { x: 1, y: 1 }), Some(Sfx::Chomp));
        assert_eq!(sfx_for(&GameEvent::GhostCaptured { index: 0 }), Some(Sfx::GhostEaten));
        assert_eq!(sfx_for(&GameEvent::PlayerCaught { lives: 2 }), Some(Sfx::Death));
        assert_eq!(sfx_for(&GameEvent::LevelCleared), Some(Sfx::Clear));
        assert_eq!(sfx_for(&GameEvent::Paused), None);
    }
}
