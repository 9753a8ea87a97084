/// Sound engine: procedural chiptune effects via rodio.
///
/// All sounds are generated as in-memory WAV buffers at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile with `--no-default-features` or without "sound" feature
/// to disable audio entirely (the stub SoundEngine does nothing).

#[cfg(feature = "sound")]
mod inner {
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    const SAMPLE_RATE: u32 = 22050;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_slide: Arc<Vec<u8>>,
        sfx_merge: Arc<Vec<u8>>,
        sfx_undo: Arc<Vec<u8>>,
        sfx_refused: Arc<Vec<u8>>,
        sfx_game_over: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    log::info!("no audio output, sound disabled: {e}");
                    return None;
                }
            };

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_slide: Arc::new(make_wav(&gen_slide())),
                sfx_merge: Arc::new(make_wav(&gen_merge())),
                sfx_undo: Arc::new(make_wav(&gen_undo())),
                sfx_refused: Arc::new(make_wav(&gen_refused())),
                sfx_game_over: Arc::new(make_wav(&gen_game_over())),
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }

        pub fn play_slide(&self) { self.play(&self.sfx_slide); }
        pub fn play_merge(&self) { self.play(&self.sfx_merge); }
        pub fn play_undo(&self) { self.play(&self.sfx_undo); }
        pub fn play_refused(&self) { self.play(&self.sfx_refused); }
        pub fn play_game_over(&self) { self.play(&self.sfx_game_over); }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn sample_count(duration: f32) -> usize {
        (SAMPLE_RATE as f32 * duration) as usize
    }

    /// Frequency sweep from `from` to `to` Hz with a linear fade.
    /// Phase is accumulated so the sweep stays click-free.
    fn sweep(from: f32, to: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = sample_count(duration);
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                phase += (from + (to - from) * t) / SAMPLE_RATE as f32;
                (phase * TAU).sin() * (1.0 - t) * volume
            })
            .collect()
    }

    /// Notes played back to back, sine plus a little octave for brightness.
    fn arpeggio(notes: &[f32], note_dur: f32, volume: f32) -> Vec<f32> {
        let n = sample_count(note_dur);
        notes
            .iter()
            .flat_map(|&freq| {
                (0..n).map(move |i| {
                    let t = i as f32 / SAMPLE_RATE as f32;
                    let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                    let wave = (t * freq * TAU).sin() * 0.75 + (t * freq * 2.0 * TAU).sin() * 0.25;
                    wave * env * volume
                })
            })
            .collect()
    }

    /// Slide: soft downward swish
    fn gen_slide() -> Vec<f32> {
        sweep(520.0, 260.0, 0.06, 0.18)
    }

    /// Merge: bright two-note chime G5→C6
    fn gen_merge() -> Vec<f32> {
        arpeggio(&[784.0, 1047.0], 0.05, 0.25)
    }

    /// Undo: rising whistle, a slide played backwards
    fn gen_undo() -> Vec<f32> {
        sweep(260.0, 700.0, 0.12, 0.22)
    }

    /// Refused undo: low square buzz
    fn gen_refused() -> Vec<f32> {
        let n = sample_count(0.18);
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let square = if (t * 110.0 * TAU).sin() >= 0.0 { 1.0 } else { -1.0 };
                square * (1.0 - i as f32 / n as f32) * 0.15
            })
            .collect()
    }

    /// Game over: descending A4→F#4→Eb4→C4
    fn gen_game_over() -> Vec<f32> {
        arpeggio(&[440.0, 370.0, 311.0, 261.0], 0.14, 0.3)
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a 16-bit PCM WAV buffer
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_size).to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        buf.extend_from_slice(&1u16.to_le_bytes());  // PCM
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
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_slide(&self) {}
    pub fn play_merge(&self) {}
    pub fn play_undo(&self) {}
    pub fn play_refused(&self) {}
    pub fn play_game_over(&self) {}
}
