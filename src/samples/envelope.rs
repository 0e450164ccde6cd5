// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Linear ADSR envelope.

/// Envelope times in seconds and the sustain level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdsrParameters {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl AdsrParameters {
    pub fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> AdsrParameters {
        AdsrParameters {
            attack,
            decay,
            sustain,
            release,
        }
    }
}

impl Default for AdsrParameters {
    fn default() -> Self {
        AdsrParameters::new(0.1, 0.1, 1.0, 0.1)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// A linear attack/decay/sustain/release envelope, advanced one sample at a time.
///
/// Rates are expressed as the change in level per sample. A rate of -1 marks a stage with
/// zero duration, which is skipped.
#[derive(Clone, Debug)]
pub struct Adsr {
    parameters: AdsrParameters,
    sample_rate: f64,
    stage: Stage,
    level: f32,
    attack_rate: f32,
    decay_rate: f32,
    release_rate: f32,
}

impl Default for Adsr {
    fn default() -> Self {
        let mut adsr = Adsr {
            parameters: AdsrParameters::default(),
            sample_rate: 44100.0,
            stage: Stage::Idle,
            level: 0.0,
            attack_rate: 0.0,
            decay_rate: 0.0,
            release_rate: 0.0,
        };
        adsr.recalculate_rates();
        adsr
    }
}

impl Adsr {
    pub fn new() -> Adsr {
        Adsr::default()
    }

    /// Sets the sample rate the envelope is clocked at.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        if sample_rate > 0.0 {
            self.sample_rate = sample_rate;
            self.recalculate_rates();
        }
    }

    /// Sets the envelope parameters. Sustain is clamped to [0, 1] and negative times to zero.
    pub fn set_parameters(&mut self, parameters: AdsrParameters) {
        self.parameters = AdsrParameters {
            attack: parameters.attack.max(0.0),
            decay: parameters.decay.max(0.0),
            sustain: parameters.sustain.clamp(0.0, 1.0),
            release: parameters.release.max(0.0),
        };
        self.recalculate_rates();
    }

    pub fn parameters(&self) -> AdsrParameters {
        self.parameters
    }

    /// Returns to idle with a zero level.
    pub fn reset(&mut self) {
        self.level = 0.0;
        self.stage = Stage::Idle;
    }

    /// Starts the envelope from its current level.
    pub fn note_on(&mut self) {
        if self.attack_rate > 0.0 {
            self.stage = Stage::Attack;
        } else if self.decay_rate > 0.0 {
            self.level = 1.0;
            self.stage = Stage::Decay;
        } else {
            self.level = self.parameters.sustain;
            self.stage = Stage::Sustain;
        }
    }

    /// Moves to the release stage. The release always takes the configured time, starting
    /// from whatever level the envelope is at.
    pub fn note_off(&mut self) {
        if self.stage == Stage::Idle {
            return;
        }
        if self.parameters.release > 0.0 {
            self.release_rate =
                (self.level as f64 / (self.parameters.release as f64 * self.sample_rate)) as f32;
            self.stage = Stage::Release;
        } else {
            self.reset();
        }
    }

    /// Whether the envelope is producing a non-idle level.
    pub fn is_active(&self) -> bool {
        self.stage != Stage::Idle
    }

    /// Whether the envelope is in its release stage.
    pub fn is_releasing(&self) -> bool {
        self.stage == Stage::Release
    }

    /// Advances by one sample and returns the new level.
    pub fn next_sample(&mut self) -> f32 {
        match self.stage {
            Stage::Idle => return 0.0,
            Stage::Attack => {
                self.level += self.attack_rate;
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.advance_stage();
                }
            }
            Stage::Decay => {
                self.level -= self.decay_rate;
                if self.level <= self.parameters.sustain {
                    self.level = self.parameters.sustain;
                    self.advance_stage();
                }
            }
            Stage::Sustain => {
                self.level = self.parameters.sustain;
            }
            Stage::Release => {
                self.level -= self.release_rate;
                if self.level <= 0.0 {
                    self.advance_stage();
                }
            }
        }
        self.level
    }

    fn rate(&self, distance: f32, time: f32) -> f32 {
        if time > 0.0 {
            (distance as f64 / (time as f64 * self.sample_rate)) as f32
        } else {
            -1.0
        }
    }

    fn recalculate_rates(&mut self) {
        self.attack_rate = self.rate(1.0, self.parameters.attack);
        self.decay_rate = self.rate(1.0 - self.parameters.sustain, self.parameters.decay);
        self.release_rate = self.rate(self.parameters.sustain, self.parameters.release);

        let skip = match self.stage {
            Stage::Attack => self.attack_rate <= 0.0,
            Stage::Decay => self.decay_rate <= 0.0 || self.level <= self.parameters.sustain,
            Stage::Release => self.release_rate <= 0.0,
            Stage::Idle | Stage::Sustain => false,
        };
        if skip {
            self.advance_stage();
        }
    }

    fn advance_stage(&mut self) {
        match self.stage {
            Stage::Attack => {
                self.stage = if self.decay_rate > 0.0 {
                    Stage::Decay
                } else {
                    Stage::Sustain
                };
            }
            Stage::Decay => self.stage = Stage::Sustain,
            Stage::Release => self.reset(),
            Stage::Idle | Stage::Sustain => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // At 128Hz a 0.0625 second stage lasts exactly 8 samples.
    const STAGE: f32 = 0.0625;

    fn envelope(attack: f32, decay: f32, sustain: f32, release: f32) -> Adsr {
        let mut adsr = Adsr::new();
        adsr.set_sample_rate(128.0);
        adsr.set_parameters(AdsrParameters::new(attack, decay, sustain, release));
        adsr
    }

    #[test]
    fn test_idle_is_silent() {
        let mut adsr = envelope(STAGE, STAGE, 0.5, STAGE);
        assert!(!adsr.is_active());
        assert_eq!(0.0, adsr.next_sample());
        adsr.note_off();
        assert!(!adsr.is_active());
    }

    #[test]
    fn test_full_cycle() {
        let mut adsr = envelope(STAGE, STAGE, 0.5, STAGE);
        adsr.note_on();

        let attack: Vec<f32> = (0..8).map(|_| adsr.next_sample()).collect();
        assert_eq!(0.125, attack[0]);
        assert_eq!(1.0, attack[7]);
        assert!(attack.windows(2).all(|w| w[0] < w[1]));

        let decay: Vec<f32> = (0..8).map(|_| adsr.next_sample()).collect();
        assert_eq!(0.9375, decay[0]);
        assert_eq!(0.5, decay[7]);

        // Sustain holds.
        for _ in 0..100 {
            assert_eq!(0.5, adsr.next_sample());
        }

        adsr.note_off();
        assert!(adsr.is_releasing());
        let mut samples = 0;
        while adsr.is_active() {
            adsr.next_sample();
            samples += 1;
            assert!(samples <= 8, "release should end after 8 samples");
        }
        assert_eq!(8, samples);
        assert_eq!(0.0, adsr.next_sample());
    }

    #[test]
    fn test_zero_attack_jumps_to_sustain() {
        // Full sustain makes the decay stage empty as well.
        let mut adsr = envelope(0.0, STAGE, 1.0, 10.0);
        adsr.note_on();
        assert_eq!(1.0, adsr.next_sample());
        assert_eq!(1.0, adsr.next_sample());
        assert!(!adsr.is_releasing());
    }

    #[test]
    fn test_zero_attack_with_decay() {
        let mut adsr = envelope(0.0, STAGE, 0.0, STAGE);
        adsr.note_on();
        assert_eq!(0.875, adsr.next_sample());
    }

    #[test]
    fn test_release_from_attack_level() {
        let mut adsr = envelope(1.0, 0.0, 1.0, STAGE);
        adsr.note_on();
        for _ in 0..64 {
            adsr.next_sample();
        }

        // Halfway through the attack the release still takes 8 samples.
        adsr.note_off();
        assert_eq!(0.4375, adsr.next_sample());
        for _ in 0..7 {
            adsr.next_sample();
        }
        assert!(!adsr.is_active());
    }

    #[test]
    fn test_zero_release_stops_immediately() {
        let mut adsr = envelope(0.0, 0.0, 1.0, 0.0);
        adsr.note_on();
        assert_eq!(1.0, adsr.next_sample());
        adsr.note_off();
        assert!(!adsr.is_active());
        assert_eq!(0.0, adsr.next_sample());
    }
}
