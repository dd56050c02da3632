//! # Gradient Noise
//!
//! Deterministic 2D simplex noise for terrain shaping.
//!
//! ## Determinism Guarantee
//!
//! Given the same seed, this implementation produces **exactly** the same
//! values on any platform, any time. Reseeding rebuilds the permutation
//! table in place.

/// World seed for deterministic generation.
///
/// All procedural randomness derives from this seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorldSeed(u64);

impl WorldSeed {
    /// Creates a new world seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Returns the raw seed value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Derives a sub-seed for a specific purpose (noise, object placement...).
    ///
    /// Uses a hash function to create independent streams from one seed.
    #[inline]
    #[must_use]
    pub const fn derive(self, purpose: u64) -> Self {
        let mut hash = self.0;
        hash ^= purpose;
        hash = hash.wrapping_mul(0x517c_c1b7_2722_0a95);
        hash ^= hash >> 32;
        Self(hash)
    }
}

impl From<u32> for WorldSeed {
    fn from(seed: u32) -> Self {
        Self(u64::from(seed))
    }
}

/// Sub-stream used for the permutation table.
const NOISE_STREAM: u64 = 0x4E4F_4953_45;

/// Fallback xorshift state; xorshift never leaves zero.
const NONZERO_STATE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Builds the doubled 256-entry permutation table.
fn permutation(seed: u32) -> [u8; 512] {
    let mut perm = [0u8; 512];
    for (i, p) in perm.iter_mut().take(256).enumerate() {
        *p = i as u8;
    }

    // Fisher-Yates shuffle driven by xorshift64
    let mut state = WorldSeed::from(seed).derive(NOISE_STREAM).value();
    if state == 0 {
        state = NONZERO_STATE;
    }
    for i in (1..256).rev() {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;

        let j = (state % (i as u64 + 1)) as usize;
        perm.swap(i, j);
    }

    // Double the table to avoid index wrapping
    perm.copy_within(0..256, 256);
    perm
}

/// Reseedable 2D gradient noise.
///
/// Produces smooth, continuous noise values in the range [-1, 1].
///
/// # Example
///
/// ```rust,ignore
/// let mut noise = NoiseField::new(42);
/// let value = noise.sample(100.5, 200.3);
/// assert!((-1.0..=1.0).contains(&value));
///
/// noise.reseed(7);
/// ```
#[derive(Clone)]
pub struct NoiseField {
    seed: u32,
    perm: [u8; 512],
}

impl std::fmt::Debug for NoiseField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseField").field("seed", &self.seed).finish()
    }
}

impl NoiseField {
    /// Skewing factor for 2D simplex grid.
    const F2: f32 = 0.366_025_42; // (sqrt(3) - 1) / 2
    /// Unskewing factor for 2D simplex grid.
    const G2: f32 = 0.211_324_87; // (3 - sqrt(3)) / 6
    /// Normalizes the corner sum to roughly [-1, 1].
    const SCALE: f32 = 40.0;

    /// Creates a noise field from a seed.
    #[must_use]
    pub fn new(seed: u32) -> Self {
        Self {
            seed,
            perm: permutation(seed),
        }
    }

    /// Replaces the seed, rebuilding the permutation table.
    pub fn reseed(&mut self, seed: u32) {
        self.seed = seed;
        self.perm = permutation(seed);
    }

    /// Current seed.
    #[inline]
    #[must_use]
    pub const fn seed(&self) -> u32 {
        self.seed
    }

    #[inline]
    fn hash(&self, index: usize) -> u8 {
        self.perm[index & 511]
    }

    /// Samples the noise at the given coordinates.
    ///
    /// # Returns
    ///
    /// A value in the range [-1, 1].
    #[must_use]
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        // Skew input coordinates to simplex grid
        let skew = (x + y) * Self::F2;
        let i = fast_floor(x + skew);
        let j = fast_floor(y + skew);

        // Unskew to get first corner in simplex
        let unskew = (i + j) as f32 * Self::G2;
        let x0 = x - (i as f32 - unskew);
        let y0 = y - (j as f32 - unskew);

        // Upper or lower triangle
        let (i1, j1) = if x0 > y0 { (1, 0) } else { (0, 1) };

        let x1 = x0 - i1 as f32 + Self::G2;
        let y1 = y0 - j1 as f32 + Self::G2;
        let x2 = x0 - 1.0 + 2.0 * Self::G2;
        let y2 = y0 - 1.0 + 2.0 * Self::G2;

        let ii = (i & 255) as usize;
        let jj = (j & 255) as usize;

        let h0 = self.hash(ii + self.hash(jj) as usize);
        let h1 = self.hash(ii + i1 + self.hash(jj + j1) as usize);
        let h2 = self.hash(ii + 1 + self.hash(jj + 1) as usize);

        let n = contribution(x0, y0, h0) + contribution(x1, y1, h1) + contribution(x2, y2, h2);
        (Self::SCALE * n).clamp(-1.0, 1.0)
    }

    /// Generates octaved (fractal) noise.
    ///
    /// # Arguments
    ///
    /// * `x`, `y` - Coordinates
    /// * `octaves` - Number of noise layers; 0 is treated as 1
    /// * `persistence` - Amplitude decay per octave (typically 0.5)
    /// * `lacunarity` - Frequency increase per octave (typically 2.0)
    ///
    /// # Returns
    ///
    /// A value in the range [-1, 1].
    #[must_use]
    pub fn octaved(&self, x: f32, y: f32, octaves: u32, persistence: f32, lacunarity: f32) -> f32 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut max_amplitude = 0.0;

        for _ in 0..octaves.max(1) {
            total += self.sample(x * frequency, y * frequency) * amplitude;
            max_amplitude += amplitude;
            amplitude *= persistence;
            frequency *= lacunarity;
        }

        if max_amplitude > 0.0 {
            (total / max_amplitude).clamp(-1.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Contribution of one simplex corner.
#[inline]
fn contribution(x: f32, y: f32, hash: u8) -> f32 {
    let t = 0.5 - x * x - y * y;
    if t < 0.0 {
        0.0
    } else {
        let t2 = t * t;
        t2 * t2 * gradient(hash, x, y)
    }
}

/// Dot product with one of 8 gradient directions picked by the low 3 bits.
#[inline]
fn gradient(hash: u8, x: f32, y: f32) -> f32 {
    let h = hash & 7;
    let (u, v) = if h < 4 { (x, y) } else { (y, x) };
    let u = if h & 1 == 0 { u } else { -u };
    let v = if h & 2 == 0 { 2.0 * v } else { -2.0 * v };
    u + v
}

/// Fast floor function.
#[inline]
fn fast_floor(x: f32) -> i32 {
    let xi = x as i32;
    if x < xi as f32 {
        xi - 1
    } else {
        xi
    }
}
