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

//! The five built-in drum instruments and the WAV data behind them.
use std::{borrow::Cow, fmt};

use rust_embed::RustEmbed;
use serde::Deserialize;

/// The WAV files compiled into the binary.
#[derive(RustEmbed)]
#[folder = "assets/samples/"]
struct SampleAssets;

/// A built-in drum instrument. Each maps to one position of the sound choice parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Instrument {
    Kick,
    Snare,
    HiHat,
    Conga,
    Tom,
}

impl Instrument {
    /// Every instrument in selector order.
    pub const ALL: [Instrument; 5] = [
        Instrument::Kick,
        Instrument::Snare,
        Instrument::HiHat,
        Instrument::Conga,
        Instrument::Tom,
    ];

    /// Returns the instrument's position in the selector.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Returns the instrument at the given selector position.
    pub fn from_index(index: usize) -> Option<Instrument> {
        Self::ALL.get(index).copied()
    }

    /// The display name. This is also the name given to the loaded sound.
    pub fn name(self) -> &'static str {
        match self {
            Instrument::Kick => "Kick",
            Instrument::Snare => "Snare",
            Instrument::HiHat => "Hi-Hat",
            Instrument::Conga => "Conga",
            Instrument::Tom => "Tom",
        }
    }

    /// The file name of the embedded WAV.
    pub fn asset_name(self) -> &'static str {
        match self {
            Instrument::Kick => "kick.wav",
            Instrument::Snare => "snare.wav",
            Instrument::HiHat => "hihat.wav",
            Instrument::Conga => "conga.wav",
            Instrument::Tom => "tom.wav",
        }
    }

    /// Maps a sound choice value to an instrument.
    ///
    /// With [SelectionPolicy::Exact], only the values 0.0, 1.0, 2.0, 3.0 and 4.0 select an
    /// instrument and everything else selects nothing. With [SelectionPolicy::Nearest], the
    /// value is rounded (halves away from zero) and clamped into range. NaN never selects.
    pub fn from_selector(value: f32, policy: SelectionPolicy) -> Option<Instrument> {
        if value.is_nan() {
            return None;
        }
        match policy {
            SelectionPolicy::Exact => Self::ALL
                .iter()
                .copied()
                .find(|instrument| instrument.index() as f32 == value),
            SelectionPolicy::Nearest => {
                let max = (Self::ALL.len() - 1) as f32;
                let index = value.round().clamp(0.0, max) as usize;
                Self::from_index(index)
            }
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How a sound choice value is mapped to an instrument.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Only exact integral values select an instrument.
    #[default]
    Exact,
    /// The value is rounded to the closest instrument.
    Nearest,
}

/// A source of raw WAV data for instruments.
pub trait SampleLibrary: Send + Sync {
    /// Returns the encoded WAV data for the instrument, if the library has it.
    fn sample_data(&self, instrument: Instrument) -> Option<Cow<'static, [u8]>>;
}

/// The library of WAV files compiled into the binary.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbeddedLibrary;

impl SampleLibrary for EmbeddedLibrary {
    fn sample_data(&self, instrument: Instrument) -> Option<Cow<'static, [u8]>> {
        SampleAssets::get(instrument.asset_name()).map(|file| file.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_selection() {
        for (i, instrument) in Instrument::ALL.iter().enumerate() {
            assert_eq!(
                Some(*instrument),
                Instrument::from_selector(i as f32, SelectionPolicy::Exact)
            );
        }

        for value in [0.5, 2.5, 3.999, -1.0, 4.0001, 5.0, f32::NAN, f32::INFINITY] {
            assert_eq!(
                None,
                Instrument::from_selector(value, SelectionPolicy::Exact),
                "value {} should select nothing",
                value
            );
        }
    }

    #[test]
    fn test_nearest_selection() {
        let cases = [
            (2.4, Some(Instrument::HiHat)),
            (2.5, Some(Instrument::Conga)),
            (2.6, Some(Instrument::Conga)),
            (0.49, Some(Instrument::Kick)),
            (-3.0, Some(Instrument::Kick)),
            (9.0, Some(Instrument::Tom)),
            (f32::NAN, None),
        ];
        for (value, expected) in cases {
            assert_eq!(
                expected,
                Instrument::from_selector(value, SelectionPolicy::Nearest),
                "value {}",
                value
            );
        }
    }

    #[test]
    fn test_names() {
        let names: Vec<&str> = Instrument::ALL.iter().map(|i| i.name()).collect();
        assert_eq!(vec!["Kick", "Snare", "Hi-Hat", "Conga", "Tom"], names);
        assert_eq!("Hi-Hat", Instrument::HiHat.to_string());
        assert_eq!(Some(Instrument::Tom), Instrument::from_index(4));
        assert_eq!(None, Instrument::from_index(5));
    }

    #[test]
    fn test_embedded_library_has_every_instrument() {
        let library = EmbeddedLibrary;
        for instrument in Instrument::ALL {
            let data = library
                .sample_data(instrument)
                .unwrap_or_else(|| panic!("missing asset for {}", instrument));
            let decoded = crate::audio::wav::decode(&data).expect("embedded asset should decode");
            assert!(decoded.frames() > 0);
            assert_eq!(decoded.sample_rate(), 44100);
        }
    }
}
