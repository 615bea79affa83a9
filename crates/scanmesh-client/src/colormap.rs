use std::str::FromStr;

/// Sequential color scales used to color the preview by height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorScheme {
    #[default]
    Viridis,
    Plasma,
    Cividis,
    Inferno,
    Magma,
    Rainbow,
    Jet,
}

type Stops = &'static [(f64, [u8; 3])];

const VIRIDIS: Stops = &[
    (0.0, [68, 1, 84]),
    (0.111, [72, 40, 120]),
    (0.222, [62, 73, 137]),
    (0.333, [49, 104, 142]),
    (0.444, [38, 130, 142]),
    (0.556, [31, 158, 137]),
    (0.667, [53, 183, 121]),
    (0.778, [110, 206, 88]),
    (0.889, [181, 222, 43]),
    (1.0, [253, 231, 37]),
];

const PLASMA: Stops = &[
    (0.0, [13, 8, 135]),
    (0.111, [70, 3, 159]),
    (0.222, [114, 1, 168]),
    (0.333, [156, 23, 158]),
    (0.444, [189, 55, 134]),
    (0.556, [216, 87, 107]),
    (0.667, [237, 121, 83]),
    (0.778, [251, 159, 58]),
    (0.889, [253, 202, 38]),
    (1.0, [240, 249, 33]),
];

const CIVIDIS: Stops = &[
    (0.0, [0, 32, 76]),
    (0.125, [0, 52, 110]),
    (0.25, [60, 74, 107]),
    (0.375, [91, 95, 109]),
    (0.5, [117, 117, 117]),
    (0.625, [146, 140, 120]),
    (0.75, [176, 165, 114]),
    (0.875, [209, 191, 102]),
    (1.0, [255, 233, 69]),
];

const INFERNO: Stops = &[
    (0.0, [0, 0, 4]),
    (0.111, [27, 12, 65]),
    (0.222, [74, 12, 107]),
    (0.333, [120, 28, 109]),
    (0.444, [165, 44, 96]),
    (0.556, [207, 68, 70]),
    (0.667, [237, 105, 37]),
    (0.778, [251, 155, 6]),
    (0.889, [247, 209, 61]),
    (1.0, [252, 255, 164]),
];

const MAGMA: Stops = &[
    (0.0, [0, 0, 4]),
    (0.111, [24, 15, 61]),
    (0.222, [68, 15, 118]),
    (0.333, [114, 31, 129]),
    (0.444, [158, 47, 127]),
    (0.556, [205, 64, 113]),
    (0.667, [241, 96, 93]),
    (0.778, [253, 150, 104]),
    (0.889, [254, 202, 141]),
    (1.0, [252, 253, 191]),
];

const RAINBOW: Stops = &[
    (0.0, [150, 0, 90]),
    (0.125, [0, 0, 200]),
    (0.25, [0, 25, 255]),
    (0.375, [0, 152, 255]),
    (0.5, [44, 255, 150]),
    (0.625, [151, 255, 0]),
    (0.75, [255, 234, 0]),
    (0.875, [255, 111, 0]),
    (1.0, [255, 0, 0]),
];

const JET: Stops = &[
    (0.0, [0, 0, 131]),
    (0.125, [0, 60, 170]),
    (0.375, [5, 255, 255]),
    (0.625, [255, 255, 0]),
    (0.875, [250, 0, 0]),
    (1.0, [128, 0, 0]),
];

impl ColorScheme {
    fn stops(&self) -> Stops {
        match self {
            ColorScheme::Viridis => VIRIDIS,
            ColorScheme::Plasma => PLASMA,
            ColorScheme::Cividis => CIVIDIS,
            ColorScheme::Inferno => INFERNO,
            ColorScheme::Magma => MAGMA,
            ColorScheme::Rainbow => RAINBOW,
            ColorScheme::Jet => JET,
        }
    }

    /// Color at `t` in `[0, 1]`, values outside are clamped.
    pub fn sample(&self, t: f64) -> [u8; 3] {
        let stops = self.stops();
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };

        let upper = stops
            .iter()
            .position(|(pos, _)| *pos >= t)
            .unwrap_or(stops.len() - 1);
        if upper == 0 {
            return stops[0].1;
        }

        let (p0, c0) = stops[upper - 1];
        let (p1, c1) = stops[upper];
        let w = if p1 > p0 { (t - p0) / (p1 - p0) } else { 0.0 };
        let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * w).round() as u8;
        [lerp(c0[0], c1[0]), lerp(c0[1], c1[1]), lerp(c0[2], c1[2])]
    }
}

impl FromStr for ColorScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "viridis" => Ok(ColorScheme::Viridis),
            "plasma" => Ok(ColorScheme::Plasma),
            "cividis" => Ok(ColorScheme::Cividis),
            "inferno" => Ok(ColorScheme::Inferno),
            "magma" => Ok(ColorScheme::Magma),
            "rainbow" => Ok(ColorScheme::Rainbow),
            "jet" => Ok(ColorScheme::Jet),
            other => Err(format!(
                "unknown color scheme '{other}', expected one of viridis, plasma, cividis, inferno, magma, rainbow, jet"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        assert_eq!(ColorScheme::Viridis.sample(0.0), [68, 1, 84]);
        assert_eq!(ColorScheme::Viridis.sample(1.0), [253, 231, 37]);
        assert_eq!(ColorScheme::Jet.sample(-3.0), [0, 0, 131]);
        assert_eq!(ColorScheme::Jet.sample(7.0), [128, 0, 0]);
        assert_eq!(ColorScheme::Magma.sample(f64::NAN), [0, 0, 4]);
    }

    #[test]
    fn test_interpolation() {
        // halfway between the 0.375 and 0.625 stops
        assert_eq!(ColorScheme::Jet.sample(0.5), [130, 255, 128]);
        assert_eq!(ColorScheme::Cividis.sample(0.5), [117, 117, 117]);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("Viridis".parse::<ColorScheme>(), Ok(ColorScheme::Viridis));
        assert_eq!("JET".parse::<ColorScheme>(), Ok(ColorScheme::Jet));
        assert!("turbo".parse::<ColorScheme>().is_err());
    }
}
