//! Logarithmic level meter for the status line.

use crate::config::MeterConfig;

/// Converts peak amplitudes to dBFS and renders a fixed-width bar.
#[derive(Clone, Copy, Debug)]
pub struct LevelMeter {
    floor_db: f32,
    segments: usize,
}

impl LevelMeter {
    pub fn new(config: &MeterConfig) -> Self {
        Self {
            floor_db: config.floor_db.min(-f32::EPSILON),
            segments: config.segments,
        }
    }

    /// Peak amplitude in dBFS, never below the floor.
    pub fn to_dbfs(&self, peak: f32) -> f32 {
        if peak.is_nan() || peak <= 0.0 {
            return self.floor_db;
        }
        (20.0 * peak.log10()).max(self.floor_db)
    }

    /// How many segments a level lights up.
    ///
    /// The floor maps to 0 and 0 dBFS (or hotter) to every segment.
    pub fn segments_lit(&self, db: f32) -> usize {
        let fraction = ((db - self.floor_db) / -self.floor_db).clamp(0.0, 1.0);
        (fraction * self.segments as f32).round() as usize
    }

    /// `[#####.....] -12.3 dB`
    pub fn render(&self, peak: f32) -> String {
        let db = self.to_dbfs(peak);
        let lit = self.segments_lit(db);

        let mut bar = String::with_capacity(self.segments + 16);
        bar.push('[');
        bar.extend(std::iter::repeat('#').take(lit));
        bar.extend(std::iter::repeat('.').take(self.segments - lit));
        bar.push(']');
        bar.push_str(&format!(" {:>5.1} dB", db));
        bar
    }
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new(&MeterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn meter(segments: usize) -> LevelMeter {
        LevelMeter::new(&MeterConfig {
            floor_db: -60.0,
            segments,
            lookback: 256,
        })
    }

    #[test]
    fn full_scale_is_zero_db() {
        assert_abs_diff_eq!(meter(10).to_dbfs(1.0), 0.0);
        assert_abs_diff_eq!(meter(10).to_dbfs(0.1), -20.0, epsilon = 1e-4);
    }

    #[test]
    fn silence_sits_on_the_floor() {
        let m = meter(10);
        assert_eq!(m.to_dbfs(0.0), -60.0);
        assert_eq!(m.to_dbfs(1e-9), -60.0);
        assert_eq!(m.to_dbfs(f32::NAN), -60.0);
    }

    #[test]
    fn segments_map_linearly_in_db() {
        let m = meter(30);
        assert_eq!(m.segments_lit(-60.0), 0);
        assert_eq!(m.segments_lit(-30.0), 15);
        assert_eq!(m.segments_lit(0.0), 30);
        assert_eq!(m.segments_lit(9.5), 30);
    }

    #[test]
    fn render_is_fixed_width() {
        let m = meter(10);
        let quiet = m.render(0.0);
        let loud = m.render(1.0);
        assert_eq!(quiet, "[..........] -60.0 dB");
        assert_eq!(loud, "[##########]   0.0 dB");
        assert_eq!(quiet.len(), loud.len());
    }
}
