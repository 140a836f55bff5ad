//! Genetic inheritance: heritable numeric DNA and bird visual genes.
//!
//! Numeric traits blend via random-weighted interpolation and mutate within
//! declared per-trait ranges. Bird visual genes interpolate the whole body
//! with one shared weight, with a small chance of a discrete "saltation"
//! mutation that swaps the beak or tail for a different base shape.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::components::{AgentKind, Vec2};

/// Probability that an inherited trait mutates.
pub const MUTATION_RATE: f32 = 0.1;
/// Mutation magnitude as a fraction of the trait's declared range.
pub const MUTATION_AMOUNT: f32 = 0.15;
/// Probability that a beak or tail jumps to a different base shape.
pub const SALTATION_RATE: f32 = 0.05;
/// Probability of an extra random color perturbation on top of blending.
pub const COLOR_JITTER_RATE: f32 = 0.1;

/// Heritable numeric traits. One shared vocabulary for both kinds; the
/// inactive factor per kind (hunt for bees, evade for birds) carries a
/// zero-width range and stays inert through inheritance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trait {
    MaxSpeed,
    VisualRange,
    SeparationDistance,
    SeparationFactor,
    AlignmentFactor,
    CohesionFactor,
    TurnFactor,
    EvadeFactor,
    HuntFactor,
    MaxLifetime,
}

pub const TRAIT_COUNT: usize = 10;

impl Trait {
    pub const ALL: [Trait; TRAIT_COUNT] = [
        Trait::MaxSpeed,
        Trait::VisualRange,
        Trait::SeparationDistance,
        Trait::SeparationFactor,
        Trait::AlignmentFactor,
        Trait::CohesionFactor,
        Trait::TurnFactor,
        Trait::EvadeFactor,
        Trait::HuntFactor,
        Trait::MaxLifetime,
    ];

    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|t| t == self).unwrap_or(0)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Trait::MaxSpeed => "max_speed",
            Trait::VisualRange => "visual_range",
            Trait::SeparationDistance => "separation_distance",
            Trait::SeparationFactor => "separation_factor",
            Trait::AlignmentFactor => "alignment_factor",
            Trait::CohesionFactor => "cohesion_factor",
            Trait::TurnFactor => "turn_factor",
            Trait::EvadeFactor => "evade_factor",
            Trait::HuntFactor => "hunt_factor",
            Trait::MaxLifetime => "max_lifetime",
        }
    }
}

/// Declared bounds and the species default for one trait.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TraitRange {
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl TraitRange {
    const fn new(min: f32, max: f32, default: f32) -> Self {
        Self { min, max, default }
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    pub fn span(&self) -> f32 {
        self.max - self.min
    }
}

const BEE_RANGES: [TraitRange; TRAIT_COUNT] = [
    TraitRange::new(1.2, 3.0, 2.0),        // max_speed
    TraitRange::new(30.0, 80.0, 50.0),     // visual_range
    TraitRange::new(8.0, 25.0, 15.0),      // separation_distance
    TraitRange::new(0.02, 0.1, 0.05),      // separation_factor
    TraitRange::new(0.01, 0.08, 0.03),     // alignment_factor
    TraitRange::new(0.0005, 0.006, 0.002), // cohesion_factor
    TraitRange::new(0.1, 0.5, 0.3),        // turn_factor
    TraitRange::new(0.005, 0.05, 0.02),    // evade_factor
    TraitRange::new(0.0, 0.0, 0.0),        // hunt_factor (inert for bees)
    TraitRange::new(4000.0, 9000.0, 6000.0), // max_lifetime
];

const BIRD_RANGES: [TraitRange; TRAIT_COUNT] = [
    TraitRange::new(2.0, 4.5, 3.0),         // max_speed
    TraitRange::new(50.0, 110.0, 75.0),     // visual_range
    TraitRange::new(12.0, 32.0, 20.0),      // separation_distance
    TraitRange::new(0.02, 0.1, 0.05),       // separation_factor
    TraitRange::new(0.02, 0.1, 0.05),       // alignment_factor
    TraitRange::new(0.001, 0.01, 0.005),    // cohesion_factor
    TraitRange::new(0.1, 0.4, 0.2),         // turn_factor
    TraitRange::new(0.0, 0.0, 0.0),         // evade_factor (inert for birds)
    TraitRange::new(0.0004, 0.003, 0.001),  // hunt_factor
    TraitRange::new(6000.0, 14000.0, 9000.0), // max_lifetime
];

/// Trait bounds for a given agent kind.
pub fn trait_ranges(kind: AgentKind) -> &'static [TraitRange; TRAIT_COUNT] {
    match kind {
        AgentKind::Bee => &BEE_RANGES,
        AgentKind::Bird => &BIRD_RANGES,
    }
}

/// The heritable subset of an agent's settings: one value per trait, always
/// within the trait's declared range for the owning kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dna {
    values: [f32; TRAIT_COUNT],
}

impl Dna {
    /// Species-default DNA.
    pub fn preset(kind: AgentKind) -> Self {
        let ranges = trait_ranges(kind);
        let mut values = [0.0; TRAIT_COUNT];
        for (v, r) in values.iter_mut().zip(ranges.iter()) {
            *v = r.default;
        }
        Self { values }
    }

    /// Random DNA uniformly sampled within each trait's range.
    pub fn random(kind: AgentKind, rng: &mut impl Rng) -> Self {
        let ranges = trait_ranges(kind);
        let mut values = [0.0; TRAIT_COUNT];
        for (v, r) in values.iter_mut().zip(ranges.iter()) {
            *v = if r.span() > 0.0 {
                rng.gen_range(r.min..=r.max)
            } else {
                r.min
            };
        }
        Self { values }
    }

    pub fn get(&self, t: Trait) -> f32 {
        self.values[t.index()]
    }

    pub fn set(&mut self, kind: AgentKind, t: Trait, value: f32) {
        self.values[t.index()] = trait_ranges(kind)[t.index()].clamp(value);
    }

    /// Blend two parents trait-by-trait with a random weight per trait, then
    /// independently mutate each trait with probability [`MUTATION_RATE`].
    pub fn inherit(kind: AgentKind, a: &Dna, b: &Dna, rng: &mut impl Rng) -> Self {
        let ranges = trait_ranges(kind);
        let mut values = [0.0; TRAIT_COUNT];
        for i in 0..TRAIT_COUNT {
            let w = rng.gen::<f32>();
            let blended = a.values[i] * w + b.values[i] * (1.0 - w);
            values[i] = ranges[i].clamp(blended);
        }
        let mut child = Self { values };
        child.mutate(kind, rng);
        child
    }

    /// Perturb traits in place with probability [`MUTATION_RATE`] each, by up
    /// to [`MUTATION_AMOUNT`] of the trait's range, clamped to bounds.
    pub fn mutate(&mut self, kind: AgentKind, rng: &mut impl Rng) {
        let ranges = trait_ranges(kind);
        for (v, r) in self.values.iter_mut().zip(ranges.iter()) {
            if rng.gen::<f32>() < MUTATION_RATE {
                let delta = (rng.gen::<f32>() * 2.0 - 1.0) * MUTATION_AMOUNT * r.span();
                *v = r.clamp(*v + delta);
            }
        }
    }

    /// True if every trait lies within its declared range.
    pub fn within_bounds(&self, kind: AgentKind) -> bool {
        let ranges = trait_ranges(kind);
        self.values
            .iter()
            .zip(ranges.iter())
            .all(|(v, r)| *v >= r.min && *v <= r.max)
    }
}

/// Running sum of forager DNA, used by hives to average contributors between
/// brood events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DnaPool {
    sums: [f32; TRAIT_COUNT],
    pub contributors: u32,
}

impl DnaPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulate(&mut self, dna: &Dna) {
        for (s, v) in self.sums.iter_mut().zip(dna.values.iter()) {
            *s += v;
        }
        self.contributors += 1;
    }

    /// Average of the accumulated DNA, clamped to the kind's trait ranges.
    /// None until at least one contributor has been recorded.
    pub fn average(&self, kind: AgentKind) -> Option<Dna> {
        if self.contributors == 0 {
            return None;
        }
        let ranges = trait_ranges(kind);
        let mut values = [0.0; TRAIT_COUNT];
        for i in 0..TRAIT_COUNT {
            values[i] = ranges[i].clamp(self.sums[i] / self.contributors as f32);
        }
        Some(Dna { values })
    }

    pub fn reset(&mut self) {
        self.sums = [0.0; TRAIT_COUNT];
        self.contributors = 0;
    }
}

// ---------------------------------------------------------------------------
// Visual genes (birds only)
// ---------------------------------------------------------------------------

/// RGB color used for plumage genes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Outline color, held fixed across generations for contrast.
pub const OUTLINE_COLOR: Rgb = Rgb { r: 38, g: 34, b: 30 };
/// Beak color, held fixed across generations.
pub const BEAK_COLOR: Rgb = Rgb { r: 52, g: 44, b: 36 };

const FALLBACK_PLUMAGE: Rgb = Rgb { r: 160, g: 160, b: 160 };

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a `#rrggbb` hex string. Returns None on malformed input.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if digits.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&digits[0..2], 16).ok()?;
        let g = u8::from_str_radix(&digits[2..4], 16).ok()?;
        let b = u8::from_str_radix(&digits[4..6], 16).ok()?;
        Some(Self { r, g, b })
    }

    /// Per-channel average of two colors.
    pub fn blend(a: Rgb, b: Rgb) -> Rgb {
        Rgb {
            r: ((a.r as u16 + b.r as u16) / 2) as u8,
            g: ((a.g as u16 + b.g as u16) / 2) as u8,
            b: ((a.b as u16 + b.b as u16) / 2) as u8,
        }
    }

    fn jitter(self, rng: &mut impl Rng) -> Rgb {
        let mut nudge = |c: u8| -> u8 {
            let d: i16 = rng.gen_range(-24..=24);
            (c as i16 + d).clamp(0, 255) as u8
        };
        Rgb {
            r: nudge(self.r),
            g: nudge(self.g),
            b: nudge(self.b),
        }
    }
}

/// Resolve a palette hex entry, defaulting (with a diagnostic) on bad data.
/// Malformed preset colors must never crash a spawn.
pub fn resolve_color(hex: &str) -> Rgb {
    match Rgb::from_hex(hex) {
        Some(c) => c,
        None => {
            log::warn!("unresolvable plumage color {:?}, using fallback", hex);
            FALLBACK_PLUMAGE
        }
    }
}

pub const BODY_POINTS: usize = 6;
pub const BEAK_POINTS: usize = 3;
pub const TAIL_POINTS: usize = 4;

/// Base body outlines. All variants share a point count so blending stays
/// point-wise across the catalog.
pub const BODY_SHAPES: [(&str, [Vec2; BODY_POINTS]); 3] = [
    (
        "round",
        [
            Vec2::new(10.0, 0.0),
            Vec2::new(4.0, -5.0),
            Vec2::new(-5.0, -4.0),
            Vec2::new(-8.0, 0.0),
            Vec2::new(-5.0, 4.0),
            Vec2::new(4.0, 5.0),
        ],
    ),
    (
        "sleek",
        [
            Vec2::new(12.0, 0.0),
            Vec2::new(5.0, -3.0),
            Vec2::new(-6.0, -2.0),
            Vec2::new(-10.0, 0.0),
            Vec2::new(-6.0, 2.0),
            Vec2::new(5.0, 3.0),
        ],
    ),
    (
        "plump",
        [
            Vec2::new(8.0, 0.0),
            Vec2::new(3.0, -6.0),
            Vec2::new(-4.0, -6.0),
            Vec2::new(-7.0, 0.0),
            Vec2::new(-4.0, 6.0),
            Vec2::new(3.0, 6.0),
        ],
    ),
];

pub const BEAK_SHAPES: [(&str, [Vec2; BEAK_POINTS]); 3] = [
    ("short", [Vec2::new(8.0, -2.0), Vec2::new(14.0, 0.0), Vec2::new(8.0, 2.0)]),
    ("long", [Vec2::new(8.0, -1.5), Vec2::new(18.0, 0.0), Vec2::new(8.0, 1.5)]),
    ("hooked", [Vec2::new(8.0, -2.0), Vec2::new(14.0, 2.0), Vec2::new(8.0, 2.0)]),
];

pub const TAIL_SHAPES: [(&str, [Vec2; TAIL_POINTS]); 3] = [
    (
        "fan",
        [Vec2::new(-8.0, 0.0), Vec2::new(-14.0, -4.0), Vec2::new(-16.0, 0.0), Vec2::new(-14.0, 4.0)],
    ),
    (
        "forked",
        [Vec2::new(-8.0, 0.0), Vec2::new(-16.0, -5.0), Vec2::new(-12.0, 0.0), Vec2::new(-16.0, 5.0)],
    ),
    (
        "pointed",
        [Vec2::new(-8.0, 0.0), Vec2::new(-15.0, -2.0), Vec2::new(-17.0, 0.0), Vec2::new(-15.0, 2.0)],
    ),
];

/// Look up a catalog body shape by key. None for unknown keys; callers
/// default and log rather than fail the spawn.
pub fn body_shape(name: &str) -> Option<&'static [Vec2; BODY_POINTS]> {
    BODY_SHAPES.iter().find(|(n, _)| *n == name).map(|(_, s)| s)
}

pub fn beak_shape(name: &str) -> Option<&'static [Vec2; BEAK_POINTS]> {
    BEAK_SHAPES.iter().find(|(n, _)| *n == name).map(|(_, s)| s)
}

pub fn tail_shape(name: &str) -> Option<&'static [Vec2; TAIL_POINTS]> {
    TAIL_SHAPES.iter().find(|(n, _)| *n == name).map(|(_, s)| s)
}

/// Heritable visual description of a bird: body/beak/tail vertex sets plus
/// plumage colors. Distinct from [`Dna`], which holds the numeric traits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genes {
    pub body: Vec<Vec2>,
    pub beak: Vec<Vec2>,
    pub tail: Vec<Vec2>,
    pub body_color: Rgb,
    pub accent_color: Rgb,
}

impl Genes {
    /// Random genes drawn from the shape catalog and a palette.
    pub fn random(palette: &[Rgb], rng: &mut impl Rng) -> Self {
        let body = BODY_SHAPES[rng.gen_range(0..BODY_SHAPES.len())].1.to_vec();
        let beak = BEAK_SHAPES[rng.gen_range(0..BEAK_SHAPES.len())].1.to_vec();
        let tail = TAIL_SHAPES[rng.gen_range(0..TAIL_SHAPES.len())].1.to_vec();
        let body_color = if palette.is_empty() {
            FALLBACK_PLUMAGE
        } else {
            palette[rng.gen_range(0..palette.len())]
        };
        let accent_color = if palette.is_empty() {
            FALLBACK_PLUMAGE
        } else {
            palette[rng.gen_range(0..palette.len())]
        };
        Self {
            body,
            beak,
            tail,
            body_color,
            accent_color,
        }
    }

    /// Blend two parents' genes. One shared weight interpolates every vertex
    /// set so the whole silhouette blends coherently; beak and tail each have
    /// an independent chance to saltate into a different base shape instead.
    pub fn inherit(a: &Genes, b: &Genes, rng: &mut impl Rng) -> Self {
        let w = rng.gen::<f32>();
        let lerp_part = |pa: &[Vec2], pb: &[Vec2]| -> Vec<Vec2> {
            pa.iter().zip(pb.iter()).map(|(p, q)| q.lerp(p, w)).collect()
        };

        let body = lerp_part(&a.body, &b.body);

        let beak = if rng.gen::<f32>() < SALTATION_RATE {
            BEAK_SHAPES[rng.gen_range(0..BEAK_SHAPES.len())].1.to_vec()
        } else {
            lerp_part(&a.beak, &b.beak)
        };

        let tail = if rng.gen::<f32>() < SALTATION_RATE {
            TAIL_SHAPES[rng.gen_range(0..TAIL_SHAPES.len())].1.to_vec()
        } else {
            lerp_part(&a.tail, &b.tail)
        };

        let mut body_color = Rgb::blend(a.body_color, b.body_color);
        let mut accent_color = Rgb::blend(a.accent_color, b.accent_color);
        if rng.gen::<f32>() < COLOR_JITTER_RATE {
            body_color = body_color.jitter(rng);
            accent_color = accent_color.jitter(rng);
        }

        Self {
            body,
            beak,
            tail,
            body_color,
            accent_color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_dna_inherit_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for kind in [AgentKind::Bee, AgentKind::Bird] {
            let mut a = Dna::random(kind, &mut rng);
            let mut b = Dna::random(kind, &mut rng);
            for _ in 0..1000 {
                let child = Dna::inherit(kind, &a, &b, &mut rng);
                assert!(child.within_bounds(kind));
                a = b;
                b = child;
            }
        }
    }

    #[test]
    fn test_dna_inactive_trait_stays_zero() {
        let mut rng = StdRng::seed_from_u64(11);
        let a = Dna::random(AgentKind::Bee, &mut rng);
        let b = Dna::random(AgentKind::Bee, &mut rng);
        for _ in 0..100 {
            let child = Dna::inherit(AgentKind::Bee, &a, &b, &mut rng);
            assert_eq!(child.get(Trait::HuntFactor), 0.0);
        }
    }

    #[test]
    fn test_dna_pool_average() {
        let mut pool = DnaPool::new();
        assert!(pool.average(AgentKind::Bee).is_none());

        let mut a = Dna::preset(AgentKind::Bee);
        let mut b = Dna::preset(AgentKind::Bee);
        a.set(AgentKind::Bee, Trait::MaxSpeed, 1.5);
        b.set(AgentKind::Bee, Trait::MaxSpeed, 2.5);
        pool.accumulate(&a);
        pool.accumulate(&b);

        let avg = pool.average(AgentKind::Bee).unwrap();
        assert!((avg.get(Trait::MaxSpeed) - 2.0).abs() < 1e-5);
        assert!(avg.within_bounds(AgentKind::Bee));

        pool.reset();
        assert!(pool.average(AgentKind::Bee).is_none());
        assert_eq!(pool.contributors, 0);
    }

    #[test]
    fn test_rgb_hex_parsing() {
        assert_eq!(Rgb::from_hex("#ffadad"), Some(Rgb::new(255, 173, 173)));
        assert_eq!(Rgb::from_hex("ffadad"), None);
        assert_eq!(Rgb::from_hex("#zzadad"), None);
        assert_eq!(Rgb::from_hex("#fff"), None);
        // Bad data defaults instead of failing the spawn
        assert_eq!(resolve_color("#nothex"), FALLBACK_PLUMAGE);
    }

    #[test]
    fn test_genes_blend_uses_shared_weight() {
        let mut rng = StdRng::seed_from_u64(3);
        let palette = [Rgb::new(200, 100, 100), Rgb::new(100, 200, 100)];
        let a = Genes {
            body: vec![Vec2::new(0.0, 0.0); BODY_POINTS],
            beak: vec![Vec2::new(0.0, 0.0); BEAK_POINTS],
            tail: vec![Vec2::new(0.0, 0.0); TAIL_POINTS],
            body_color: palette[0],
            accent_color: palette[1],
        };
        let b = Genes {
            body: vec![Vec2::new(10.0, 10.0); BODY_POINTS],
            beak: vec![Vec2::new(10.0, 10.0); BEAK_POINTS],
            tail: vec![Vec2::new(10.0, 10.0); TAIL_POINTS],
            body_color: palette[1],
            accent_color: palette[0],
        };

        for _ in 0..50 {
            let child = Genes::inherit(&a, &b, &mut rng);
            // Every body vertex must sit at the same interpolation weight.
            let w = child.body[0].x / 10.0;
            for p in &child.body {
                assert!((p.x / 10.0 - w).abs() < 1e-5);
                assert!((p.y / 10.0 - w).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_shape_catalog_lookup() {
        assert!(body_shape("round").is_some());
        assert!(beak_shape("hooked").is_some());
        assert!(tail_shape("forked").is_some());
        assert!(body_shape("nonexistent").is_none());
    }
}
