//! Signal synthesis: baseline + anomaly effects + noise, per sensor per tick.
//!
//! Each [`AnomalyKind`] maps to one environmental and one acoustic effect
//! function through [`environmental_effect_fn`] and [`acoustic_effect_fn`].
//! Effects of simultaneously active anomalies are additive and applied before
//! noise. Missing data is `None`; synthesis never fails.

use std::f64::consts::PI;
use std::ops::AddAssign;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::anomaly::{Anomaly, AnomalyKind};
use crate::topology::{Sensor, Zone};

// ---

/// Full width of the uniform noise band per environmental field.
const TEMPERATURE_NOISE_F: f64 = 1.5;
const HUMIDITY_NOISE_PERCENT: f64 = 3.0;
const CO2_NOISE_PPM: f64 = 200.0;
const NH3_NOISE_PPM: f64 = 3.0;

const CO2_FLOOR_PPM: f64 = 400.0;

/// Probability per tick that a failing sensor drops its climate fields.
const EQUIPMENT_DROPOUT_PROBABILITY: f64 = 0.3;

const SOUND_BASELINE_DB: f64 = 55.0;
const SOUND_NOISE_DB: f64 = 4.0;
const VOCAL_BASELINE_PER_MIN: f64 = 18.0;
const VOCAL_NOISE_PER_MIN: f64 = 6.0;
const STRESS_BASELINE: f64 = 0.16;
const STRESS_NOISE: f64 = 0.08;
const SOUND_RANGE_DB: (f64, f64) = (35.0, 95.0);

/// Inputs every effect function sees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectContext {
    // ---
    pub progress: f64,
    pub zone_ordinal: u8,
    pub origin_zone: Option<u8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnvironmentalDelta {
    // ---
    pub temperature_f: f64,
    pub humidity_percent: f64,
    pub co2_ppm: f64,
    pub nh3_ppm: f64,
}

impl AddAssign for EnvironmentalDelta {
    fn add_assign(&mut self, rhs: Self) {
        self.temperature_f += rhs.temperature_f;
        self.humidity_percent += rhs.humidity_percent;
        self.co2_ppm += rhs.co2_ppm;
        self.nh3_ppm += rhs.nh3_ppm;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnvironmentalEffect {
    Shift(EnvironmentalDelta),
    /// Temperature and humidity go missing with the given probability.
    Dropout { probability: f64 },
    /// Every climate field goes missing.
    Outage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AcousticDelta {
    // ---
    pub sound_db: f64,
    pub vocalization_rate_per_min: f64,
    pub stress_score: f64,
}

impl AcousticDelta {
    fn scaled(sound_db: f64, vocalization_rate_per_min: f64, stress_score: f64, k: f64) -> Self {
        Self {
            sound_db: sound_db * k,
            vocalization_rate_per_min: vocalization_rate_per_min * k,
            stress_score: stress_score * k,
        }
    }
}

impl AddAssign for AcousticDelta {
    fn add_assign(&mut self, rhs: Self) {
        self.sound_db += rhs.sound_db;
        self.vocalization_rate_per_min += rhs.vocalization_rate_per_min;
        self.stress_score += rhs.stress_score;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AcousticEffect {
    Shift(AcousticDelta),
    /// Microphone offline, the whole sample is missing.
    Offline,
}

pub type EnvironmentalEffectFn = fn(&EffectContext) -> EnvironmentalEffect;
pub type AcousticEffectFn = fn(&EffectContext) -> AcousticEffect;

pub fn environmental_effect_fn(kind: AnomalyKind) -> EnvironmentalEffectFn {
    match kind {
        AnomalyKind::HeatStress => heat_stress_env,
        AnomalyKind::HvacMalfunction => hvac_env,
        AnomalyKind::DiseaseOutbreak => disease_env,
        AnomalyKind::VentilationFailure => ventilation_env,
        AnomalyKind::EquipmentFailure => |_: &EffectContext| EnvironmentalEffect::Dropout {
            probability: EQUIPMENT_DROPOUT_PROBABILITY,
        },
        AnomalyKind::ZoneSensorOutage => |_: &EffectContext| EnvironmentalEffect::Outage,
    }
}

pub fn acoustic_effect_fn(kind: AnomalyKind) -> AcousticEffectFn {
    match kind {
        AnomalyKind::HeatStress => |c: &EffectContext| {
            AcousticEffect::Shift(AcousticDelta::scaled(10.0, 8.0, 0.65, c.progress))
        },
        AnomalyKind::VentilationFailure => |c: &EffectContext| {
            AcousticEffect::Shift(AcousticDelta::scaled(7.0, 5.0, 0.5, c.progress))
        },
        AnomalyKind::DiseaseOutbreak => |c: &EffectContext| {
            AcousticEffect::Shift(AcousticDelta::scaled(3.0, 2.0, 0.25, c.progress))
        },
        AnomalyKind::HvacMalfunction => |c: &EffectContext| {
            let swing = (c.progress * 4.0 * PI).sin().abs();
            AcousticEffect::Shift(AcousticDelta::scaled(6.0, 4.0, 0.35, swing))
        },
        AnomalyKind::EquipmentFailure => {
            |_: &EffectContext| AcousticEffect::Shift(AcousticDelta::default())
        }
        AnomalyKind::ZoneSensorOutage => |_: &EffectContext| AcousticEffect::Offline,
    }
}

fn heat_stress_env(c: &EffectContext) -> EnvironmentalEffect {
    let k = c.progress * f64::from(c.zone_ordinal) / 6.0;
    EnvironmentalEffect::Shift(EnvironmentalDelta {
        temperature_f: 12.0 * k,
        humidity_percent: -10.0 * k,
        ..Default::default()
    })
}

fn hvac_env(c: &EffectContext) -> EnvironmentalEffect {
    let rear = if c.zone_ordinal >= 4 { 1.5 } else { 1.0 };
    let spike = (c.progress * 4.0 * PI).sin() * 15.0 * rear;
    EnvironmentalEffect::Shift(EnvironmentalDelta {
        temperature_f: spike,
        humidity_percent: -0.5 * spike,
        ..Default::default()
    })
}

fn disease_env(c: &EffectContext) -> EnvironmentalEffect {
    let weight = match c.origin_zone.map(|o| o.abs_diff(c.zone_ordinal)) {
        Some(0) => 1.0,
        Some(1) => 0.5,
        _ => 0.0,
    };
    EnvironmentalEffect::Shift(EnvironmentalDelta {
        nh3_ppm: 20.0 * weight * c.progress,
        co2_ppm: 500.0 * weight * c.progress,
        ..Default::default()
    })
}

fn ventilation_env(c: &EffectContext) -> EnvironmentalEffect {
    let middle = if (3..=4).contains(&c.zone_ordinal) { 1.5 } else { 1.0 };
    EnvironmentalEffect::Shift(EnvironmentalDelta {
        co2_ppm: 2000.0 * c.progress * middle,
        nh3_ppm: 40.0 * c.progress * middle,
        temperature_f: 8.0 * c.progress,
        ..Default::default()
    })
}

/// Climate reading of one sensor for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    // ---
    pub sensor_id: String,
    pub zone_id: String,
    pub temperature_f: Option<f64>,
    pub humidity_percent: Option<f64>,
    pub co2_ppm: Option<f64>,
    pub nh3_ppm: Option<f64>,
}

/// Microphone-derived aggregates for one zone for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSample {
    // ---
    pub sensor_id: String,
    pub zone_id: String,
    pub sound_db: Option<f64>,
    pub vocalization_rate_per_min: Option<f64>,
    pub stress_score: Option<f64>,
}

/// Centered uniform noise of the given full width.
fn noise<R: Rng + ?Sized>(rng: &mut R, width: f64) -> f64 {
    (rng.gen::<f64>() - 0.5) * width
}

fn contexts<'a>(
    zone: &'a Zone,
    anomalies: &'a [Anomaly],
    now: DateTime<Utc>,
) -> impl Iterator<Item = (AnomalyKind, EffectContext)> + 'a {
    anomalies
        .iter()
        .filter(move |a| a.affects(zone.ordinal))
        .map(move |a| {
            (
                a.kind,
                EffectContext {
                    progress: a.progress(now),
                    zone_ordinal: zone.ordinal,
                    origin_zone: a.origin_zone,
                },
            )
        })
}

pub fn synthesize_reading<R: Rng + ?Sized>(
    zone: &Zone,
    sensor: &Sensor,
    anomalies: &[Anomaly],
    now: DateTime<Utc>,
    rng: &mut R,
) -> SensorReading {
    // ---
    let mut delta = EnvironmentalDelta::default();
    let mut dropout = false;
    let mut outage = false;

    for (kind, ctx) in contexts(zone, anomalies, now) {
        match environmental_effect_fn(kind)(&ctx) {
            EnvironmentalEffect::Shift(d) => delta += d,
            EnvironmentalEffect::Dropout { probability } => {
                if rng.gen_bool(probability) {
                    dropout = true;
                }
            }
            EnvironmentalEffect::Outage => outage = true,
        }
    }

    let mut reading = SensorReading {
        sensor_id: sensor.id.clone(),
        zone_id: zone.id.clone(),
        temperature_f: None,
        humidity_percent: None,
        co2_ppm: None,
        nh3_ppm: None,
    };
    if outage {
        return reading;
    }

    let temperature = sensor.baseline_temperature_f
        + delta.temperature_f
        + noise(rng, TEMPERATURE_NOISE_F);
    let humidity = sensor.baseline_humidity_percent
        + delta.humidity_percent
        + noise(rng, HUMIDITY_NOISE_PERCENT);
    let co2 = sensor.baseline_co2_ppm + delta.co2_ppm + noise(rng, CO2_NOISE_PPM);
    let nh3 = sensor.baseline_nh3_ppm + delta.nh3_ppm + noise(rng, NH3_NOISE_PPM);

    if !dropout {
        reading.temperature_f = Some(temperature.max(0.0));
        reading.humidity_percent = Some(humidity.clamp(0.0, 100.0));
    }
    reading.co2_ppm = Some(co2.max(CO2_FLOOR_PPM));
    reading.nh3_ppm = Some(nh3.max(0.0));
    reading
}

pub fn synthesize_audio<R: Rng + ?Sized>(
    zone: &Zone,
    anomalies: &[Anomaly],
    now: DateTime<Utc>,
    rng: &mut R,
) -> AudioSample {
    // ---
    let mut sample = AudioSample {
        sensor_id: format!("{}-mic", zone.id),
        zone_id: zone.id.clone(),
        sound_db: None,
        vocalization_rate_per_min: None,
        stress_score: None,
    };

    let mut delta = AcousticDelta::default();
    for (kind, ctx) in contexts(zone, anomalies, now) {
        match acoustic_effect_fn(kind)(&ctx) {
            AcousticEffect::Shift(d) => delta += d,
            AcousticEffect::Offline => return sample,
        }
    }

    let sound = SOUND_BASELINE_DB + delta.sound_db + noise(rng, SOUND_NOISE_DB);
    let vocal = VOCAL_BASELINE_PER_MIN
        + delta.vocalization_rate_per_min
        + noise(rng, VOCAL_NOISE_PER_MIN);
    let stress = STRESS_BASELINE + delta.stress_score + noise(rng, STRESS_NOISE);

    sample.sound_db = Some(sound.clamp(SOUND_RANGE_DB.0, SOUND_RANGE_DB.1));
    sample.vocalization_rate_per_min = Some(vocal.max(0.0));
    sample.stress_score = Some(stress.clamp(0.0, 1.0));
    sample
}
